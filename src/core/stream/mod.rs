//! Incremental consumption of `data:` event streams.
//!
//! Bytes flow through [`FrameDecoder`] → [`parse_frame`] → a
//! [`StreamStore`] reconciler, driven by a [`StreamSession`] that owns one
//! request/response cycle. Chat and remote exec share this pipeline and only
//! differ in their event vocabulary and store.

pub mod error;
pub mod event;
pub mod frame;
pub mod session;
pub mod store;

pub use error::{StreamError, TransportError};
pub use event::{parse_frame, ChatEvent, ExecEvent, MalformedFrame, StreamEvent};
pub use frame::{FrameDecoder, TrailingFrame};
pub use session::{launch, ByteStream, SessionHandle, SessionOptions, StreamSession, Transport};
pub use store::{Applied, SessionState, SessionTicket, SharedStore, StoreState, StreamStore};
