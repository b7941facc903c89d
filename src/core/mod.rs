pub mod decoder;
pub mod envelope;
pub mod state;
pub mod tag;

pub use decoder::{StreamDecoder, TagStreamDecoder};
pub use envelope::EnvelopeDecoder;
pub use state::{DecoderState, ParserState, ToolParams};

#[macro_export]
macro_rules! log_info {
    ($($arg:tt)*) => {
        {
            tracing::info!($($arg)*);
        }
    };
}

#[macro_export]
macro_rules! log_warn {
    ($($arg:tt)*) => {
        {
            tracing::warn!($($arg)*);
        }
    };
}

#[macro_export]
macro_rules! log_error {
    ($($arg:tt)*) => {
        {
            tracing::error!($($arg)*);
        }
    };
}

#[macro_export]
macro_rules! log_debug {
    ($($arg:tt)*) => {
        {
            tracing::debug!($($arg)*);
        }
    };
}
