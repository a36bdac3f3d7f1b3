//! Data for tracking user information.
use std::collections::HashSet;

/// One user visible to the session: ourselves, anyone sharing a channel with
/// us, or a monitored nickname.
#[derive(Clone, Debug, PartialEq)]
pub struct User {
    /// The user's nickname, in its display case.
    pub nickname: String,
    /// The user's ident, when learned from a prefix, WHO, or WHOIS.
    pub username: Option<String>,
    /// The user's hostname, when learned.
    pub hostname: Option<String>,
    /// The user's real name, when learned.
    pub realname: Option<String>,
    /// The account the user is logged into, when known. `None` means
    /// logged out or unknown.
    pub account: Option<String>,
    /// Whether the user is marked away.
    pub away: bool,
    /// Whether the user is a network operator.
    pub oper: bool,
    /// Whether this user is the local user.
    pub is_self: bool,
    /// Whether this nickname is on the monitor list.
    pub monitored: bool,
    /// Case-folded names of the channels we share with this user.
    pub channels: HashSet<String>,
}

impl User {
    pub(crate) fn new(nickname: &str) -> User {
        User {
            nickname: nickname.to_owned(),
            username: None,
            hostname: None,
            realname: None,
            account: None,
            away: false,
            oper: false,
            is_self: false,
            monitored: false,
            channels: HashSet::new(),
        }
    }
}
