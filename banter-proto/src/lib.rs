//! The IRC client protocol distilled: wire messages, numerics, capabilities,
//! ISUPPORT, and case mapping, with Tokio codecs for framing.

#![warn(missing_docs)]

pub mod caps;
pub mod casemap;
pub mod chan;
pub mod ctcp;
pub mod error;
#[cfg(feature = "tokio")]
pub mod irc;
pub mod isupport;
#[cfg(feature = "tokio")]
pub mod line;
pub mod message;
pub mod mode;
pub mod prefix;
pub mod response;

pub use self::caps::{Capability, NegotiationVersion};
pub use self::casemap::CaseMapping;
pub use self::chan::ChannelExt;
#[cfg(feature = "tokio")]
pub use self::irc::IrcCodec;
pub use self::isupport::{ChannelModeKind, Isupport};
pub use self::message::{Message, Tag};
pub use self::mode::ModeChange;
pub use self::prefix::Prefix;
pub use self::response::{Response, ResponseCategory};
