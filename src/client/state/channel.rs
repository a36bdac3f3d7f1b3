//! Data for tracking channel information.
use std::collections::{BTreeSet, HashMap};

use chrono::{DateTime, Utc};

use crate::proto::Isupport;

/// A channel topic with its provenance.
#[derive(Clone, Debug, PartialEq)]
pub struct Topic {
    /// The topic text.
    pub text: String,
    /// Who set the topic, when known.
    pub set_by: Option<String>,
    /// When the topic was set, when known.
    pub set_at: Option<DateTime<Utc>>,
}

/// One membership entry: a user's presence in a channel with the status
/// prefixes they hold there.
#[derive(Clone, Debug, PartialEq)]
pub struct ChannelUser {
    /// The member's nickname, in its display case.
    pub nickname: String,
    /// Status mode letters held in this channel (e.g. `o`, `v`). Prefix
    /// symbols the server never advertised are kept as-is and rank below
    /// every advertised status.
    pub statuses: BTreeSet<char>,
}

impl ChannelUser {
    pub(crate) fn new(nickname: &str) -> ChannelUser {
        ChannelUser {
            nickname: nickname.to_owned(),
            statuses: BTreeSet::new(),
        }
    }

    /// The rank of a single status under the active PREFIX table; 0 is the
    /// highest. Unknown statuses rank below everything advertised.
    pub fn status_rank(isupport: &Isupport, status: char) -> usize {
        isupport
            .status_rank(status)
            .unwrap_or(isupport.status_prefixes().len())
    }

    /// The member's highest status, or `None` for a plain member.
    pub fn highest_status(&self, isupport: &Isupport) -> Option<char> {
        self.statuses
            .iter()
            .copied()
            .min_by_key(|&s| ChannelUser::status_rank(isupport, s))
    }
}

/// A channel the local user is in.
#[derive(Clone, Debug, PartialEq)]
pub struct Channel {
    /// The channel name, in its display case.
    pub name: String,
    /// The topic, when one is set and known.
    pub topic: Option<Topic>,
    /// The channel creation time, when learned from numeric 329.
    pub created_at: Option<DateTime<Utc>>,
    /// Channel modes currently in effect, with their arguments where modes
    /// carry one. List (type A) modes are not stored here.
    pub modes: HashMap<char, Option<String>>,
    /// The membership map, keyed by case-folded nickname.
    pub members: HashMap<String, ChannelUser>,
}

impl Channel {
    pub(crate) fn new(name: &str) -> Channel {
        Channel {
            name: name.to_owned(),
            topic: None,
            created_at: None,
            modes: HashMap::new(),
            members: HashMap::new(),
        }
    }
}

#[cfg(test)]
mod test {
    use super::ChannelUser;
    use crate::proto::Isupport;

    #[test]
    fn highest_status_follows_prefix_order() {
        let mut isupport = Isupport::default();
        isupport.apply(&["PREFIX=(qaohv)~&@%+"]);

        let mut member = ChannelUser::new("dave");
        assert_eq!(member.highest_status(&isupport), None);

        member.statuses.insert('v');
        member.statuses.insert('o');
        assert_eq!(member.highest_status(&isupport), Some('o'));

        member.statuses.insert('q');
        assert_eq!(member.highest_status(&isupport), Some('q'));
    }

    #[test]
    fn unknown_statuses_rank_last() {
        let isupport = Isupport::default();
        let mut member = ChannelUser::new("dave");
        member.statuses.insert('!');
        member.statuses.insert('v');
        assert_eq!(member.highest_status(&isupport), Some('v'));
    }
}
