//! The authoritative in-memory model of users, channels, memberships, and
//! modes, kept consistent across every inbound message.
//!
//! Every keyed container here is keyed by the case-folded form of the
//! identifier under the active CASEMAPPING; when the mapping changes
//! mid-session, everything is rehashed. Two invariants are maintained after
//! every update: membership is bijective (a user's channel set and the
//! channel's member map always agree), and no user survives with zero shared
//! channels unless monitored or ourselves.
pub mod channel;
pub mod user;

use std::collections::HashMap;
use std::mem;

use chrono::{TimeZone, Utc};

use crate::client::event::Event;
use crate::client::session::Outbox;
use crate::proto::isupport::ChannelModeKind;
use crate::proto::mode::{self, ModeChange};
use crate::proto::{CaseMapping, Isupport, Message, Prefix};

pub use self::channel::{Channel, ChannelUser, Topic};
pub use self::user::User;

/// The capabilities the server acknowledged, as flags the tracker consults.
#[derive(Clone, Copy, Debug, Default)]
pub(crate) struct EnabledCaps {
    pub multi_prefix: bool,
    pub extended_join: bool,
    pub userhost_in_names: bool,
    pub account_notify: bool,
    pub sasl: bool,
}

/// The state tracker. Owned by the session; mutated only from the reader.
#[derive(Debug)]
pub(crate) struct Tracker {
    isupport: Isupport,
    users: HashMap<String, User>,
    channels: HashMap<String, Channel>,
    /// Monitored nicknames: folded key to display form.
    monitored: HashMap<String, String>,
    local_nick: String,
    pub caps: EnabledCaps,
}

impl Tracker {
    pub fn new() -> Tracker {
        Tracker {
            isupport: Isupport::default(),
            users: HashMap::new(),
            channels: HashMap::new(),
            monitored: HashMap::new(),
            local_nick: String::new(),
            caps: EnabledCaps::default(),
        }
    }

    pub fn isupport(&self) -> &Isupport {
        &self.isupport
    }

    pub fn casemapping(&self) -> CaseMapping {
        self.isupport.casemapping()
    }

    pub fn fold(&self, s: &str) -> String {
        self.casemapping().fold(s)
    }

    /// Applies one 005 line, rehashing every keyed container when the
    /// CASEMAPPING changed.
    pub fn apply_isupport<S: AsRef<str>>(&mut self, tokens: &[S]) {
        if self.isupport.apply(tokens) {
            self.rehash();
        }
    }

    pub fn local_nick(&self) -> &str {
        &self.local_nick
    }

    pub fn is_self(&self, nick: &str) -> bool {
        !self.local_nick.is_empty() && self.casemapping().eq(nick, &self.local_nick)
    }

    /// Records the server-assigned nickname and materializes the local user.
    pub fn set_local_nick(&mut self, nick: &str) {
        if !self.local_nick.is_empty() {
            let old_key = self.fold(&self.local_nick);
            if let Some(mut user) = self.users.remove(&old_key) {
                user.nickname = nick.to_owned();
                self.users.insert(self.fold(nick), user);
            }
        }
        self.local_nick = nick.to_owned();
        let key = self.fold(nick);
        let user = self
            .users
            .entry(key)
            .or_insert_with(|| User::new(nick));
        user.is_self = true;
    }

    pub fn user(&self, nick: &str) -> Option<&User> {
        self.users.get(&self.fold(nick))
    }

    pub fn channel(&self, name: &str) -> Option<&Channel> {
        self.channels.get(&self.fold(name))
    }

    pub fn channel_names(&self) -> Vec<String> {
        let mut names: Vec<_> = self.channels.values().map(|c| c.name.clone()).collect();
        names.sort();
        names
    }

    pub fn monitored_contains(&self, nick: &str) -> bool {
        self.monitored.contains_key(&self.fold(nick))
    }

    pub fn monitored_nicks(&self) -> Vec<String> {
        let mut nicks: Vec<_> = self.monitored.values().cloned().collect();
        nicks.sort();
        nicks
    }

    /// Adds a nickname to the monitored set; returns false if already there.
    pub fn monitor_insert(&mut self, nick: &str) -> bool {
        let key = self.fold(nick);
        let added = self.monitored.insert(key.clone(), nick.to_owned()).is_none();
        if let Some(user) = self.users.get_mut(&key) {
            user.monitored = true;
        }
        added
    }

    /// Removes a nickname from the monitored set; returns false if absent.
    pub fn monitor_remove(&mut self, nick: &str, out: &mut Outbox) -> bool {
        let key = self.fold(nick);
        let removed = self.monitored.remove(&key).is_some();
        if let Some(user) = self.users.get_mut(&key) {
            user.monitored = false;
        }
        if removed {
            self.sweep(out);
        }
        removed
    }

    pub fn monitor_clear(&mut self, out: &mut Outbox) {
        let keys: Vec<_> = self.monitored.keys().cloned().collect();
        self.monitored.clear();
        for key in keys {
            if let Some(user) = self.users.get_mut(&key) {
                user.monitored = false;
            }
        }
        self.sweep(out);
    }

    fn ensure_user(&mut self, nick: &str, out: &mut Outbox) -> String {
        let key = self.fold(nick);
        if !self.users.contains_key(&key) {
            let mut user = User::new(nick);
            user.monitored = self.monitored.contains_key(&key);
            user.is_self = self.is_self(nick);
            self.users.insert(key.clone(), user);
            out.events.push(Event::UserAppeared {
                nick: nick.to_owned(),
            });
        }
        key
    }

    /// Notes the sender of a chat message: fills ident and host for a user
    /// we already track. A stranger messaging us from no shared channel is
    /// not materialized, which is what keeps the disappearance invariant
    /// trivially true for chat traffic.
    pub fn note_sender(&mut self, msg: &Message) {
        self.update_user_from_prefix(msg.prefix.as_ref());
    }

    /// Updates ident and host for an already-tracked user from a message
    /// prefix. Never creates a user.
    fn update_user_from_prefix(&mut self, prefix: Option<&Prefix>) {
        if let Some(Prefix::Nickname(nick, username, hostname)) = prefix {
            let key = self.fold(nick);
            if let Some(user) = self.users.get_mut(&key) {
                if !username.is_empty() {
                    user.username = Some(username.clone());
                }
                if !hostname.is_empty() {
                    user.hostname = Some(hostname.clone());
                }
            }
        }
    }

    fn add_member(&mut self, channel_key: &str, nick: &str, user_key: &str) {
        if let Some(channel) = self.channels.get_mut(channel_key) {
            channel
                .members
                .entry(user_key.to_owned())
                .or_insert_with(|| ChannelUser::new(nick));
        }
        if let Some(user) = self.users.get_mut(user_key) {
            user.channels.insert(channel_key.to_owned());
        }
    }

    fn remove_member(&mut self, channel_key: &str, user_key: &str) {
        if let Some(channel) = self.channels.get_mut(channel_key) {
            channel.members.remove(user_key);
        }
        if let Some(user) = self.users.get_mut(user_key) {
            user.channels.remove(channel_key);
        }
    }

    /// Drops every user that no longer shares a channel with us, is not
    /// monitored, and is not ourselves.
    pub fn sweep(&mut self, out: &mut Outbox) {
        let mut gone: Vec<String> = self
            .users
            .iter()
            .filter(|(key, user)| {
                user.channels.is_empty() && !user.is_self && !self.monitored.contains_key(*key)
            })
            .map(|(key, _)| key.clone())
            .collect();
        gone.sort();
        for key in gone {
            if let Some(user) = self.users.remove(&key) {
                out.events.push(Event::UserDisappeared {
                    nick: user.nickname,
                });
            }
        }
    }

    /// The `Disconnected` cleanup: clears channels, fires disappearances for
    /// every remaining user, and forgets the monitor list.
    pub fn clear(&mut self, out: &mut Outbox) {
        self.channels.clear();
        self.monitored.clear();
        let mut nicks: Vec<_> = self
            .users
            .drain()
            .map(|(_, user)| user.nickname)
            .collect();
        nicks.sort();
        for nick in nicks {
            out.events.push(Event::UserDisappeared { nick });
        }
        self.local_nick.clear();
    }

    /// Rebuilds every keyed container under the current CASEMAPPING,
    /// preserving values. Membership sets are rebuilt from the channel side,
    /// which is authoritative.
    fn rehash(&mut self) {
        let cm = self.casemapping();

        let users = mem::take(&mut self.users);
        self.users = users
            .into_iter()
            .map(|(_, mut user)| {
                user.channels.clear();
                (cm.fold(&user.nickname), user)
            })
            .collect();

        let channels = mem::take(&mut self.channels);
        self.channels = channels
            .into_iter()
            .map(|(_, mut channel)| {
                let members = mem::take(&mut channel.members);
                channel.members = members
                    .into_iter()
                    .map(|(_, member)| (cm.fold(&member.nickname), member))
                    .collect();
                (cm.fold(&channel.name), channel)
            })
            .collect();

        for (channel_key, channel) in &self.channels {
            for member_key in channel.members.keys() {
                if let Some(user) = self.users.get_mut(member_key) {
                    user.channels.insert(channel_key.clone());
                }
            }
        }

        let monitored = mem::take(&mut self.monitored);
        self.monitored = monitored
            .into_iter()
            .map(|(_, display)| (cm.fold(&display), display))
            .collect();
    }

    pub fn handle_join(&mut self, msg: &Message, out: &mut Outbox) {
        let nick = match msg.source_nickname() {
            Some(nick) => nick.to_owned(),
            None => return,
        };
        let channel_name = match msg.param(0) {
            Some(name) => name.to_owned(),
            None => return,
        };
        let channel_key = self.fold(&channel_name);

        if self.is_self(&nick) {
            self.channels
                .entry(channel_key.clone())
                .or_insert_with(|| Channel::new(&channel_name));
            // Learn the channel's modes and membership right away.
            out.messages
                .push(Message::new(None, "MODE", vec![&channel_name]));
            out.messages
                .push(Message::new(None, "NAMES", vec![&channel_name]));
        }

        if !self.channels.contains_key(&channel_key) {
            return;
        }

        let user_key = self.ensure_user(&nick, out);
        self.update_user_from_prefix(msg.prefix.as_ref());

        if self.caps.extended_join && msg.params.len() >= 3 {
            if let Some(user) = self.users.get_mut(&user_key) {
                user.account = match msg.param(1) {
                    Some("*") | Some("") | None => None,
                    Some(account) => Some(account.to_owned()),
                };
                user.realname = msg.param(2).map(|s| s.to_owned());
            }
        }

        self.add_member(&channel_key, &nick, &user_key);
        out.events.push(Event::Join {
            nick,
            channel: channel_name,
        });
    }

    pub fn handle_part(&mut self, msg: &Message, out: &mut Outbox) {
        let nick = match msg.source_nickname() {
            Some(nick) => nick.to_owned(),
            None => return,
        };
        let channel_name = match msg.param(0) {
            Some(name) => name.to_owned(),
            None => return,
        };
        let reason = msg.param(1).map(|s| s.to_owned());
        let channel_key = self.fold(&channel_name);

        if self.is_self(&nick) {
            self.drop_channel(&channel_key);
        } else {
            let user_key = self.fold(&nick);
            self.remove_member(&channel_key, &user_key);
        }

        out.events.push(Event::Part {
            nick,
            channel: channel_name,
            reason,
        });
        self.sweep(out);
    }

    pub fn handle_kick(&mut self, msg: &Message, out: &mut Outbox) {
        let (channel_name, victim) = match (msg.param(0), msg.param(1)) {
            (Some(channel), Some(victim)) => (channel.to_owned(), victim.to_owned()),
            _ => return,
        };
        let reason = msg.param(2).map(|s| s.to_owned());
        let channel_key = self.fold(&channel_name);

        if self.is_self(&victim) {
            self.drop_channel(&channel_key);
        } else {
            let victim_key = self.fold(&victim);
            self.remove_member(&channel_key, &victim_key);
        }

        out.events.push(Event::Kick {
            channel: channel_name,
            nick: victim,
            by: msg.source_nickname().map(|s| s.to_owned()),
            reason,
        });
        self.sweep(out);
    }

    fn drop_channel(&mut self, channel_key: &str) {
        if let Some(channel) = self.channels.remove(channel_key) {
            for member_key in channel.members.keys() {
                if let Some(user) = self.users.get_mut(member_key) {
                    user.channels.remove(channel_key);
                }
            }
        }
    }

    pub fn handle_quit(&mut self, msg: &Message, out: &mut Outbox) {
        let nick = match msg.source_nickname() {
            Some(nick) => nick.to_owned(),
            None => return,
        };
        let user_key = self.fold(&nick);

        let channel_keys: Vec<String> = self
            .users
            .get(&user_key)
            .map(|user| user.channels.iter().cloned().collect())
            .unwrap_or_default();
        for channel_key in channel_keys {
            self.remove_member(&channel_key, &user_key);
        }

        out.events.push(Event::Quit {
            nick,
            reason: msg.param(0).map(|s| s.to_owned()),
        });
        self.sweep(out);
    }

    /// Renames a user everywhere without reallocating the user record.
    pub fn handle_nick(&mut self, msg: &Message, out: &mut Outbox) {
        let old = match msg.source_nickname() {
            Some(nick) => nick.to_owned(),
            None => return,
        };
        let new = match msg.param(0) {
            Some(nick) => nick.to_owned(),
            None => return,
        };
        let old_key = self.fold(&old);
        let new_key = self.fold(&new);

        if let Some(mut user) = self.users.remove(&old_key) {
            user.nickname = new.clone();
            let channel_keys: Vec<String> = user.channels.iter().cloned().collect();
            self.users.insert(new_key.clone(), user);
            for channel_key in channel_keys {
                if let Some(channel) = self.channels.get_mut(&channel_key) {
                    if let Some(mut member) = channel.members.remove(&old_key) {
                        member.nickname = new.clone();
                        channel.members.insert(new_key.clone(), member);
                    }
                }
            }
        }

        if self.is_self(&old) {
            self.local_nick = new.clone();
        }

        out.events.push(Event::NickChange { old, new });
    }

    pub fn handle_mode(&mut self, msg: &Message, out: &mut Outbox) {
        let target = match msg.param(0) {
            Some(target) => target.to_owned(),
            None => return,
        };
        if self.isupport.is_channel_name(&target) {
            let changes = mode::channel_mode_changes(&self.isupport, &msg.params[1..]);
            self.apply_channel_modes(&target, &changes);
            out.events.push(Event::ChannelModeChange {
                channel: target,
                by: msg.source_nickname().map(|s| s.to_owned()),
                changes,
            });
        } else if self.is_self(&target) {
            let changes = mode::user_mode_changes(&msg.params[1..]);
            out.events.push(Event::UserModeChange { changes });
        }
    }

    fn apply_channel_modes(&mut self, channel_name: &str, changes: &[ModeChange]) {
        let channel_key = self.fold(channel_name);
        for change in changes {
            match change.kind {
                ChannelModeKind::Status => {
                    let nick = match &change.arg {
                        Some(nick) => nick,
                        None => continue,
                    };
                    let member_key = self.fold(nick);
                    if let Some(member) = self
                        .channels
                        .get_mut(&channel_key)
                        .and_then(|c| c.members.get_mut(&member_key))
                    {
                        if change.plus {
                            member.statuses.insert(change.mode);
                        } else {
                            member.statuses.remove(&change.mode);
                        }
                    }
                }
                // List (type A) modes are surfaced through the event only.
                ChannelModeKind::List => {}
                _ => {
                    if let Some(channel) = self.channels.get_mut(&channel_key) {
                        if change.plus {
                            channel.modes.insert(change.mode, change.arg.clone());
                        } else {
                            channel.modes.remove(&change.mode);
                        }
                    }
                }
            }
        }
    }

    /// Handles one 353 reply: `<me> ( "=" / "*" / "@" ) <channel> :<names>`.
    pub fn handle_namreply(&mut self, msg: &Message, out: &mut Outbox) {
        let channel_name = match msg.param(2) {
            Some(name) => name.to_owned(),
            None => return,
        };
        let names = match msg.param(3) {
            Some(names) => names.to_owned(),
            None => return,
        };
        let channel_key = self.fold(&channel_name);
        if !self.channels.contains_key(&channel_key) {
            return;
        }

        let multi_prefix = self.caps.multi_prefix || self.isupport.namesx();
        let userhost_in_names = self.caps.userhost_in_names || self.isupport.uhnames();

        for token in names.split(' ').filter(|t| !t.is_empty()) {
            let mut statuses = Vec::new();
            let mut rest = token;
            while let Some(c) = rest.chars().next() {
                // Unadvertised prefix symbols (some servers use `!`) are kept
                // as-is and rank below everything advertised.
                let status = if self.isupport.is_status_symbol(c) {
                    self.isupport.symbol_to_mode(c)
                } else if "~&@%+!".contains(c) {
                    Some(c)
                } else {
                    None
                };
                match status {
                    Some(status) => {
                        statuses.push(status);
                        rest = &rest[c.len_utf8()..];
                        if !multi_prefix {
                            break;
                        }
                    }
                    None => break,
                }
            }

            let (nick, username, hostname) = if userhost_in_names {
                match Prefix::new_from_str(rest) {
                    Prefix::Nickname(nick, username, hostname) => (nick, username, hostname),
                    Prefix::ServerName(name) => (name, String::new(), String::new()),
                }
            } else {
                (rest.to_owned(), String::new(), String::new())
            };
            if nick.is_empty() {
                continue;
            }

            let user_key = self.ensure_user(&nick, out);
            if let Some(user) = self.users.get_mut(&user_key) {
                if !username.is_empty() {
                    user.username = Some(username);
                }
                if !hostname.is_empty() {
                    user.hostname = Some(hostname);
                }
            }
            self.add_member(&channel_key, &nick, &user_key);
            if let Some(member) = self
                .channels
                .get_mut(&channel_key)
                .and_then(|c| c.members.get_mut(&user_key))
            {
                member.statuses = statuses.iter().copied().collect();
            }
        }
    }

    pub fn handle_topic_command(&mut self, msg: &Message, out: &mut Outbox) {
        let channel_name = match msg.param(0) {
            Some(name) => name.to_owned(),
            None => return,
        };
        let text = msg.param(1).unwrap_or("").to_owned();
        let by = msg.source_nickname().map(|s| s.to_owned());
        let channel_key = self.fold(&channel_name);
        if let Some(channel) = self.channels.get_mut(&channel_key) {
            if text.is_empty() {
                channel.topic = None;
            } else {
                channel.topic = Some(Topic {
                    text: text.clone(),
                    set_by: by.clone(),
                    set_at: Some(Utc::now()),
                });
            }
        }
        out.events.push(Event::TopicChange {
            channel: channel_name,
            topic: text,
            by,
        });
    }

    /// 332: the topic text.
    pub fn handle_topic_text(&mut self, msg: &Message, out: &mut Outbox) {
        let (channel_name, text) = match (msg.param(1), msg.param(2)) {
            (Some(channel), Some(text)) => (channel.to_owned(), text.to_owned()),
            _ => return,
        };
        let channel_key = self.fold(&channel_name);
        if let Some(channel) = self.channels.get_mut(&channel_key) {
            match &mut channel.topic {
                Some(topic) => topic.text = text.clone(),
                None => {
                    channel.topic = Some(Topic {
                        text: text.clone(),
                        set_by: None,
                        set_at: None,
                    })
                }
            }
        }
        out.events.push(Event::TopicChange {
            channel: channel_name,
            topic: text,
            by: None,
        });
    }

    /// 333: who set the topic, and when.
    pub fn handle_topic_whotime(&mut self, msg: &Message) {
        let (channel_name, set_by, set_at) = match (msg.param(1), msg.param(2), msg.param(3)) {
            (Some(channel), Some(set_by), Some(set_at)) => (channel, set_by.to_owned(), set_at),
            _ => return,
        };
        let set_at = set_at
            .parse::<i64>()
            .ok()
            .and_then(|secs| Utc.timestamp_opt(secs, 0).single());
        let channel_key = self.fold(channel_name);
        if let Some(topic) = self
            .channels
            .get_mut(&channel_key)
            .and_then(|c| c.topic.as_mut())
        {
            topic.set_by = Some(set_by);
            topic.set_at = set_at;
        }
    }

    /// 331: no topic is set.
    pub fn handle_no_topic(&mut self, msg: &Message) {
        if let Some(channel_name) = msg.param(1) {
            let channel_key = self.fold(channel_name);
            if let Some(channel) = self.channels.get_mut(&channel_key) {
                channel.topic = None;
            }
        }
    }

    /// 324: the channel's current modes.
    pub fn handle_channel_mode_is(&mut self, msg: &Message) {
        if let Some(channel_name) = msg.param(1) {
            let channel_name = channel_name.to_owned();
            let changes = mode::channel_mode_changes(&self.isupport, &msg.params[2..]);
            self.apply_channel_modes(&channel_name, &changes);
        }
    }

    /// 329: the channel's creation time.
    pub fn handle_creation_time(&mut self, msg: &Message) {
        let (channel_name, timestamp) = match (msg.param(1), msg.param(2)) {
            (Some(channel), Some(ts)) => (channel, ts),
            _ => return,
        };
        let created = timestamp
            .parse::<i64>()
            .ok()
            .and_then(|secs| Utc.timestamp_opt(secs, 0).single());
        let channel_key = self.fold(channel_name);
        if let Some(channel) = self.channels.get_mut(&channel_key) {
            channel.created_at = created;
        }
    }

    /// 352: one WHO reply line. Fills fields of users we already track.
    pub fn handle_who_reply(&mut self, msg: &Message) {
        if msg.params.len() < 8 {
            return;
        }
        let nick_key = self.fold(&msg.params[5]);
        let flags = msg.params[6].clone();
        if let Some(user) = self.users.get_mut(&nick_key) {
            user.username = Some(msg.params[2].clone());
            user.hostname = Some(msg.params[3].clone());
            user.away = flags.contains('G');
            user.oper = flags.contains('*');
            if let Some((_hops, realname)) = msg.params[7].split_once(' ') {
                user.realname = Some(realname.to_owned());
            }
        }
    }

    /// 311: the WHOIS identity line.
    pub fn handle_whois_user(&mut self, msg: &Message) {
        if msg.params.len() < 6 {
            return;
        }
        let nick_key = self.fold(&msg.params[1]);
        if let Some(user) = self.users.get_mut(&nick_key) {
            user.username = Some(msg.params[2].clone());
            user.hostname = Some(msg.params[3].clone());
            user.realname = Some(msg.params[5].clone());
        }
    }

    /// 313: the target is an operator.
    pub fn handle_whois_operator(&mut self, msg: &Message) {
        if let Some(nick) = msg.param(1) {
            let nick_key = self.fold(nick);
            if let Some(user) = self.users.get_mut(&nick_key) {
                user.oper = true;
            }
        }
    }

    /// 301: the target is away.
    pub fn handle_whois_away(&mut self, msg: &Message) {
        if let Some(nick) = msg.param(1) {
            let nick_key = self.fold(nick);
            if let Some(user) = self.users.get_mut(&nick_key) {
                user.away = true;
            }
        }
    }

    /// 330: the account the target is logged in as.
    pub fn handle_whois_account(&mut self, msg: &Message) {
        let (nick, account) = match (msg.param(1), msg.param(2)) {
            (Some(nick), Some(account)) => (nick, account.to_owned()),
            _ => return,
        };
        let nick_key = self.fold(nick);
        if let Some(user) = self.users.get_mut(&nick_key) {
            user.account = Some(account);
        }
    }

    /// ACCOUNT, with account-notify: login and logout notifications.
    pub fn handle_account(&mut self, msg: &Message) {
        let nick = match msg.source_nickname() {
            Some(nick) => nick.to_owned(),
            None => return,
        };
        self.update_user_from_prefix(msg.prefix.as_ref());
        let nick_key = self.fold(&nick);
        if let Some(user) = self.users.get_mut(&nick_key) {
            user.account = match msg.param(0) {
                Some("*") | Some("") | None => None,
                Some(account) => Some(account.to_owned()),
            };
        }
    }

    /// CHGHOST: ident and host changed.
    pub fn handle_chghost(&mut self, msg: &Message) {
        let nick = match msg.source_nickname() {
            Some(nick) => nick.to_owned(),
            None => return,
        };
        let (username, hostname) = match (msg.param(0), msg.param(1)) {
            (Some(username), Some(hostname)) => (username.to_owned(), hostname.to_owned()),
            _ => return,
        };
        let nick_key = self.fold(&nick);
        if let Some(user) = self.users.get_mut(&nick_key) {
            user.username = Some(username);
            user.hostname = Some(hostname);
        }
    }

    /// AWAY, with away-notify: away state changed.
    pub fn handle_away_notify(&mut self, msg: &Message) {
        let nick = match msg.source_nickname() {
            Some(nick) => nick.to_owned(),
            None => return,
        };
        let nick_key = self.fold(&nick);
        if let Some(user) = self.users.get_mut(&nick_key) {
            user.away = msg.param(0).map(|m| !m.is_empty()).unwrap_or(false);
        }
    }

    /// 305/306: our own away state.
    pub fn set_self_away(&mut self, away: bool) {
        let key = self.fold(&self.local_nick);
        if let Some(user) = self.users.get_mut(&key) {
            user.away = away;
        }
    }

    /// 900: we are logged in.
    pub fn set_self_account(&mut self, account: Option<String>) {
        let key = self.fold(&self.local_nick);
        if let Some(user) = self.users.get_mut(&key) {
            user.account = account;
        }
    }

    /// 730, or WATCH 600/604: monitored nicknames came online. Targets may
    /// carry a full `nick!user@host`.
    pub fn handle_monitor_online(&mut self, targets: &str, out: &mut Outbox) {
        for target in targets.split(',').filter(|t| !t.is_empty()) {
            let (nick, username, hostname) = match Prefix::new_from_str(target) {
                Prefix::Nickname(nick, username, hostname) => (nick, username, hostname),
                Prefix::ServerName(name) => (name, String::new(), String::new()),
            };
            let user_key = self.ensure_user(&nick, out);
            if let Some(user) = self.users.get_mut(&user_key) {
                user.monitored = true;
                if !username.is_empty() {
                    user.username = Some(username);
                }
                if !hostname.is_empty() {
                    user.hostname = Some(hostname);
                }
            }
            // ensure_user already announced the appearance for new users;
            // announce explicitly for ones we were tracking offline.
            if !out
                .events
                .iter()
                .any(|e| matches!(e, Event::UserAppeared { nick: n } if *n == nick))
            {
                out.events.push(Event::UserAppeared { nick });
            }
        }
    }

    /// 731, or WATCH 601/605: monitored nicknames went offline.
    pub fn handle_monitor_offline(&mut self, targets: &str, out: &mut Outbox) {
        for target in targets.split(',').filter(|t| !t.is_empty()) {
            let nick = match Prefix::new_from_str(target) {
                Prefix::Nickname(nick, _, _) => nick,
                Prefix::ServerName(name) => name,
            };
            out.events.push(Event::UserDisappeared { nick });
        }
    }
}

#[cfg(test)]
mod test {
    use super::Tracker;
    use crate::client::session::Outbox;
    use crate::proto::Message;

    fn tracker() -> Tracker {
        let mut tracker = Tracker::new();
        tracker.set_local_nick("me");
        tracker.apply_isupport(&["PREFIX=(ov)@+", "CHANMODES=b,k,l,imnpst"]);
        tracker
    }

    fn join(tracker: &mut Tracker, nick: &str, chan: &str) {
        let msg = Message {
            tags: None,
            prefix: Some(format!("{}!u@h", nick).as_str().into()),
            command: "JOIN".into(),
            params: vec![chan.into()],
        };
        tracker.handle_join(&msg, &mut Outbox::default());
    }

    #[test]
    fn membership_is_bijective() {
        let mut tracker = tracker();
        join(&mut tracker, "me", "#test");
        join(&mut tracker, "alice", "#test");

        let chan = tracker.channel("#test").unwrap().clone();
        for member_key in chan.members.keys() {
            let member = &chan.members[member_key];
            let user = tracker.user(&member.nickname).unwrap();
            assert!(user.channels.contains(&tracker.fold("#test")));
        }
        assert_eq!(chan.members.len(), 2);
    }

    #[test]
    fn quit_removes_from_every_channel_and_drops() {
        let mut tracker = tracker();
        join(&mut tracker, "me", "#a");
        join(&mut tracker, "me", "#b");
        join(&mut tracker, "alice", "#a");
        join(&mut tracker, "alice", "#b");

        let quit = Message {
            tags: None,
            prefix: Some("alice!u@h".into()),
            command: "QUIT".into(),
            params: vec!["bye".into()],
        };
        let mut out = Outbox::default();
        tracker.handle_quit(&quit, &mut out);

        assert!(tracker.user("alice").is_none());
        assert!(tracker.channel("#a").unwrap().members.len() == 1);
        assert!(tracker.channel("#b").unwrap().members.len() == 1);
    }

    #[test]
    fn nick_change_rekeys_everything() {
        let mut tracker = tracker();
        join(&mut tracker, "me", "#test");
        join(&mut tracker, "alice", "#test");

        let nick = Message {
            tags: None,
            prefix: Some("alice!u@h".into()),
            command: "NICK".into(),
            params: vec!["eve".into()],
        };
        tracker.handle_nick(&nick, &mut Outbox::default());

        assert!(tracker.user("alice").is_none());
        assert_eq!(tracker.user("eve").unwrap().nickname, "eve");
        assert!(tracker.channel("#test").unwrap().members.contains_key("eve"));
    }

    #[test]
    fn monitored_users_survive_with_no_channels() {
        let mut tracker = tracker();
        tracker.monitor_insert("friend");
        let mut out = Outbox::default();
        tracker.handle_monitor_online("friend!u@h", &mut out);
        assert!(tracker.user("friend").unwrap().monitored);

        tracker.sweep(&mut out);
        assert!(tracker.user("friend").is_some());

        tracker.monitor_remove("friend", &mut out);
        assert!(tracker.user("friend").is_none());
    }

    #[test]
    fn rehash_preserves_values_under_new_fold() {
        let mut tracker = Tracker::new();
        tracker.set_local_nick("me");
        tracker.apply_isupport(&["CASEMAPPING=ascii"]);
        join(&mut tracker, "me", "#test");
        join(&mut tracker, "foo[", "#test");
        assert!(tracker.user("FOO{").is_none());

        tracker.apply_isupport(&["CASEMAPPING=rfc1459"]);
        assert_eq!(tracker.user("FOO{").unwrap().nickname, "foo[");
        assert!(tracker
            .channel("#test")
            .unwrap()
            .members
            .contains_key(&tracker.fold("foo[")));
    }
}
