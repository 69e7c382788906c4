//! Analysis API client and chat session.
//!
//! This module talks to the remote analysis backend and keeps the chat
//! transcript, revealing agent answers progressively.

pub mod client;
pub mod session;
pub mod stream;

pub use client::{AnalysisBackend, AnalysisClient, ClientConfig};
pub use session::{BackendStatus, ChatSession, SendOutcome};
pub use stream::{spawn_stream, StreamEvent, StreamMode, StreamOptions};
