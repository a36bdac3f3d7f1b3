//! Errors for the client.

use std::io::Error as IoError;

use thiserror::Error;

use crate::proto::error::ProtocolError;
use crate::proto::Message;

/// A specialized `Result` type for the client.
pub type Result<T> = ::std::result::Result<T, Error>;

/// The main crate-wide error type.
#[derive(Debug, Error)]
pub enum Error {
    /// An underlying transport failure. Fatal; forces disconnection.
    #[error("a transport error occurred")]
    Io(#[from] IoError),

    /// An error from the TLS layer. Fatal; forces disconnection.
    #[cfg(feature = "tls-native")]
    #[error("a TLS error occurred")]
    Tls(#[from] native_tls::Error),

    /// A line could not be parsed or serialized as an IRC message.
    #[error("a protocol error occurred")]
    MalformedLine(#[from] ProtocolError),

    /// An argument contained characters the wire form cannot carry, or was
    /// out of range.
    #[error("invalid argument {argument}: {reason}")]
    InvalidArgument {
        /// The offending argument.
        argument: String,
        /// Why it was rejected.
        reason: &'static str,
    },

    /// The operation requires the session to have completed registration.
    #[error("not yet registered with the server")]
    NotRegistered,

    /// The operation requires a capability or ISUPPORT token the network
    /// does not advertise.
    #[error("the network does not support {feature}")]
    NotSupported {
        /// The missing capability or token.
        feature: &'static str,
    },

    /// A pending request terminated via a matched error numeric.
    #[error("request failed: {response}")]
    AsyncRequestError {
        /// The error line sent by the server.
        response: Message,
    },

    /// A pending request was aborted by connection loss.
    #[error("connection was lost")]
    Disconnected,

    /// A pending request was aborted by the caller.
    #[error("request was cancelled")]
    Cancelled,

    /// The server failed to answer our pings in time. Fatal.
    #[error("connection timed out awaiting PONG")]
    PingTimeout,

    /// The configured encoding label is not a known codec.
    #[error("unknown codec: {codec}")]
    UnknownCodec {
        /// The unrecognized label.
        codec: String,
    },

    /// A required configuration field was absent.
    #[error("missing required config field: {field}")]
    MissingConfigField {
        /// The absent field.
        field: &'static str,
    },

    /// TLS was requested but the crate was built without TLS support.
    #[error("tls was requested but is not compiled in")]
    TlsNotCompiled,

    /// The client's event stream was already taken.
    #[error("stream was already configured")]
    StreamAlreadyConfigured,

    /// Failed to load or decode a configuration file.
    #[cfg(feature = "toml_config")]
    #[error("failed to decode config file")]
    InvalidConfigFile(#[from] toml::de::Error),
}
