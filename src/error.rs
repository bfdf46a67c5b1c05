//! Error handling for the stack map codecs
//!
//! Every failure aborts the current measurement run. The variants mirror the
//! three ways a run can go wrong: malformed encoded input, a caller passing a
//! value outside an encoder's domain, and an alphabet too small to build a
//! prefix code from.

use thiserror::Error;

/// Main error type for the stackmap-compress library
#[derive(Error, Debug)]
pub enum StackMapError {
    /// I/O related errors (reading dumps, writing configuration files)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Encoded data is truncated or structurally invalid
    #[error("Malformed input: {message}")]
    MalformedInput {
        /// What the decoder was doing when it gave up
        message: String,
    },

    /// A value outside the encoder's domain
    #[error("Invalid argument: {message}")]
    InvalidArgument {
        /// Description of the rejected value
        message: String,
    },

    /// Prefix code requested for fewer than two distinct symbols
    #[error("Degenerate alphabet: {symbols} distinct symbol(s), need at least 2")]
    DegenerateAlphabet {
        /// Number of distinct symbols seen
        symbols: usize,
    },

    /// Configuration or parameter errors
    #[error("Invalid configuration: {message}")]
    Configuration {
        /// Configuration error message
        message: String,
    },
}

impl StackMapError {
    /// Create a malformed input error
    pub fn malformed<S: Into<String>>(message: S) -> Self {
        Self::MalformedInput {
            message: message.into(),
        }
    }

    /// Create an invalid argument error
    pub fn invalid_argument<S: Into<String>>(message: S) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    /// Create a degenerate alphabet error
    pub fn degenerate_alphabet(symbols: usize) -> Self {
        Self::DegenerateAlphabet { symbols }
    }

    /// Create a configuration error
    pub fn configuration<S: Into<String>>(message: S) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Create an I/O error from a message
    pub fn io_error<S: Into<String>>(message: S) -> Self {
        Self::Io(std::io::Error::new(std::io::ErrorKind::Other, message.into()))
    }

    /// Whether the error lies in the input data or the parameters.
    ///
    /// False only for I/O failures, which come from the environment. Either
    /// way the run stops at the first error.
    pub fn is_data_error(&self) -> bool {
        match self {
            Self::Io(_) => false,
            Self::MalformedInput { .. } => true,
            Self::InvalidArgument { .. } => true,
            Self::DegenerateAlphabet { .. } => true,
            Self::Configuration { .. } => true,
        }
    }

    /// Get the error category for logging
    pub fn category(&self) -> &'static str {
        match self {
            Self::Io(_) => "io",
            Self::MalformedInput { .. } => "malformed",
            Self::InvalidArgument { .. } => "argument",
            Self::DegenerateAlphabet { .. } => "alphabet",
            Self::Configuration { .. } => "config",
        }
    }
}

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, StackMapError>;

/// Assert that `needed` more bytes are available at `position` in a buffer of `len` bytes
#[inline]
pub fn check_remaining(position: usize, needed: usize, len: usize) -> Result<()> {
    match position.checked_add(needed) {
        Some(end) if end <= len => Ok(()),
        _ => Err(StackMapError::malformed(format!(
            "read of {} byte(s) at offset {} past end of {}-byte buffer",
            needed, position, len
        ))),
    }
}
