//! Channel-agnostic conversation handling.
//!
//! Channel adapters call `start_session` for the start command and
//! `process_message` for every plain text message, then deliver the
//! returned text in their own way.

pub mod context;
pub mod process;

pub use context::MessageContext;
pub use process::{
    process_message, render_user_message, render_welcome, start_session, ProcessedMessage,
};
