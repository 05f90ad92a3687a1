//! Flames is a terminal client for a multi-provider LLM chat backend that
//! also runs commands on a private development server.
//!
//! The crate is organized around a small set of collaborating layers:
//! - [`core::stream`] turns a streaming HTTP body into typed events and folds
//!   them into observable stores, one session at a time.
//! - [`core`] also owns the chat transcript, the remote exec log, the services
//!   that start sessions, configuration, providers and the agent roster.
//! - [`api`] defines backend payloads and the HTTP client used as transport.
//! - [`cli`] is the command-line front end that renders store updates.
//!
//! Runtime entrypoints live in the binary crate (`src/main.rs`) and route
//! through [`crate::cli::main`].

pub mod api;
pub mod cli;
pub mod core;
pub mod logging;
pub mod utils;
