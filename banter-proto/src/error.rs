//! IRC protocol errors.

use std::io::Error as IoError;

use thiserror::Error;

/// A `Result` type for IRC `ProtocolError`s.
pub type Result<T> = ::std::result::Result<T, ProtocolError>;

/// An IRC protocol error.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// An internal I/O error.
    #[error("an io error occurred")]
    Io(#[from] IoError),

    /// Error for lines that could not be parsed as messages.
    #[error("invalid message: {string}")]
    InvalidMessage {
        /// The line that failed to parse.
        string: String,
        /// The detailed message parsing error.
        #[source]
        cause: MessageParseError,
    },
}

/// Errors that occur when parsing messages.
#[derive(Debug, Error)]
pub enum MessageParseError {
    /// The message was empty.
    #[error("empty message")]
    EmptyMessage,

    /// No command could be found in the message.
    #[error("missing command")]
    MissingCommand,

    /// The command was neither alphabetic nor a three-digit numeric.
    #[error("invalid command: {command}")]
    InvalidCommand {
        /// The invalid command.
        command: String,
    },
}
