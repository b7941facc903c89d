//! Incremental decoder for LLM responses that interleave prose with tool calls.
//!
//! Feed response chunks to a [`core::StreamDecoder`] as they arrive; it returns
//! terminal-ready text right away and collects structured tool calls as their
//! tags close. Parameters carrying JSON are additionally reconstructed from
//! their partial text and diffed, see [`json`].

pub mod core;
pub mod error;
pub mod json;
pub mod tools;
pub mod utils;

pub use crate::core::{EnvelopeDecoder, StreamDecoder, TagStreamDecoder};
pub use crate::error::{Result, StreamError};
pub use crate::tools::{JsonParamUpdate, ParamSnapshot, ToolCallSnapshot};
