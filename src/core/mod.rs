pub mod agents;
pub mod chat;
pub mod config;
pub mod exec;
pub mod exec_log;
pub mod providers;
pub mod stream;
pub mod transcript;
