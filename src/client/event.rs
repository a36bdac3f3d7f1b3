//! The events a client session emits to its host.
//!
//! Events are delivered in wire-arrival order through the client stream; for
//! any line, state updates complete before its events are yielded.
use crate::proto::{Message, ModeChange, Prefix};

/// One client event, tagged by kind.
#[derive(Clone, Debug, PartialEq)]
pub enum Event {
    /// The transport is open and registration has begun.
    Connected,
    /// Every inbound line, parsed, before interpretation.
    Raw(Message),
    /// An inbound line the codec could not parse. The session continues.
    InvalidLine {
        /// The offending line.
        line: String,
    },
    /// The server accepted registration (001); carries the server-assigned
    /// nickname.
    Registered {
        /// Our nickname, as the server knows it.
        nick: String,
    },
    /// End of MOTD (or no MOTD); the session is fully online.
    Ready,
    /// The session has been torn down; all state has been cleared.
    Disconnected,
    /// A PRIVMSG, addressed to a channel or to us.
    Privmsg {
        /// Who sent it.
        source: Option<Prefix>,
        /// The channel or our nickname, possibly with a STATUSMSG prefix.
        target: String,
        /// The message text.
        text: String,
    },
    /// A NOTICE.
    Notice {
        /// Who sent it.
        source: Option<Prefix>,
        /// The channel or our nickname.
        target: String,
        /// The notice text.
        text: String,
    },
    /// A CTCP query carried in a PRIVMSG.
    #[cfg(feature = "ctcp")]
    CtcpQuery {
        /// Who sent it.
        source: Option<Prefix>,
        /// The channel or our nickname.
        target: String,
        /// The CTCP verb, e.g. `VERSION`.
        verb: String,
        /// The argument text after the verb, if any.
        argument: Option<String>,
    },
    /// A CTCP reply carried in a NOTICE.
    #[cfg(feature = "ctcp")]
    CtcpReply {
        /// Who sent it.
        source: Option<Prefix>,
        /// The channel or our nickname.
        target: String,
        /// The CTCP verb.
        verb: String,
        /// The argument text after the verb, if any.
        argument: Option<String>,
    },
    /// Someone joined a channel we are in (or we joined one).
    Join {
        /// The joining nickname.
        nick: String,
        /// The channel joined.
        channel: String,
    },
    /// Someone left a channel.
    Part {
        /// The parting nickname.
        nick: String,
        /// The channel left.
        channel: String,
        /// The part reason, if given.
        reason: Option<String>,
    },
    /// Someone was kicked from a channel.
    Kick {
        /// The channel.
        channel: String,
        /// The nickname kicked.
        nick: String,
        /// Who performed the kick.
        by: Option<String>,
        /// The kick reason, if given.
        reason: Option<String>,
    },
    /// Someone quit the network.
    Quit {
        /// The quitting nickname.
        nick: String,
        /// The quit reason, if given.
        reason: Option<String>,
    },
    /// A nickname changed.
    NickChange {
        /// The previous nickname.
        old: String,
        /// The new nickname.
        new: String,
    },
    /// Channel modes changed.
    ChannelModeChange {
        /// The channel.
        channel: String,
        /// Who changed them.
        by: Option<String>,
        /// The classified changes, in order.
        changes: Vec<ModeChange>,
    },
    /// Our own user modes changed.
    UserModeChange {
        /// The changes as `(added, mode letter)` pairs.
        changes: Vec<(bool, char)>,
    },
    /// A channel topic changed or was first learned.
    TopicChange {
        /// The channel.
        channel: String,
        /// The new topic text; empty when cleared.
        topic: String,
        /// Who set it, when known.
        by: Option<String>,
    },
    /// A user became visible: first sighting in a shared channel, or a
    /// monitored nickname coming online.
    UserAppeared {
        /// The nickname.
        nick: String,
    },
    /// A user is gone: no shared channels and not monitored, or a monitored
    /// nickname going offline.
    UserDisappeared {
        /// The nickname.
        nick: String,
    },
}
