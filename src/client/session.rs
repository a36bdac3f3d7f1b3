//! The session state machine: capability negotiation, SASL PLAIN,
//! registration, and the transitions between connection phases.
//!
//! Progression is strictly monotonic, `Connecting` through `Online`, with
//! the single exception that any state may fall to `Disconnected`, which is
//! the one place session resources are released.
use crate::client::data::Config;
use crate::client::event::Event;
use crate::client::state::Tracker;
use crate::proto::{Message, Response};

/// The connection phase of a client session.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum SessionState {
    /// No transport. The terminal state until the next connect.
    Disconnected,
    /// The transport is open; CAP LS has been sent.
    Connecting,
    /// The server acknowledged `sasl` and the AUTHENTICATE exchange is in
    /// flight.
    SaslAuthenticating,
    /// Capability negotiation ended; awaiting RPL_WELCOME.
    Registering,
    /// Welcomed; ingesting 002–005 and the MOTD.
    ReceivingServerInfo,
    /// Fully registered and ready for traffic.
    Online,
    /// A quit or fatal error is in flight; awaiting transport close.
    Disconnecting,
}

/// Everything one inbound line produced: events for the host, and messages
/// the session itself needs to send.
#[derive(Default)]
pub(crate) struct Outbox {
    pub events: Vec<Event>,
    pub messages: Vec<Message>,
}

/// Capabilities this client asks for when the server advertises them.
const REQUESTED_CAPS: &[&str] = &[
    "account-notify",
    "extended-join",
    "multi-prefix",
    "userhost-in-names",
];

const SASL_CHUNK_SIZE: usize = 400;

pub(crate) struct Session {
    pub state: SessionState,
    pub tracker: Tracker,
    attempted_nick: String,
    alt_nick_index: usize,
    advertised_caps: Vec<String>,
}

impl Session {
    pub fn new() -> Session {
        Session {
            state: SessionState::Disconnected,
            tracker: Tracker::new(),
            attempted_nick: String::new(),
            alt_nick_index: 0,
            advertised_caps: Vec::new(),
        }
    }

    /// Whether commands that mutate server state may be sent.
    pub fn is_registered(&self) -> bool {
        self.state >= SessionState::ReceivingServerInfo
    }

    /// Records that the transport opened and registration is starting with
    /// the given nickname.
    pub fn begin(&mut self, nick: &str) {
        self.state = SessionState::Connecting;
        self.attempted_nick = nick.to_owned();
    }

    /// Updates state for one inbound message. State mutations here complete
    /// before the line's events are delivered to the host.
    pub fn apply(&mut self, config: &Config, msg: &Message, out: &mut Outbox) {
        match msg.command.as_str() {
            "CAP" => self.handle_cap(config, msg, out),
            "AUTHENTICATE" => self.handle_authenticate(config, out),
            "JOIN" => self.tracker.handle_join(msg, out),
            "PART" => self.tracker.handle_part(msg, out),
            "KICK" => self.tracker.handle_kick(msg, out),
            "QUIT" => self.tracker.handle_quit(msg, out),
            "NICK" => self.tracker.handle_nick(msg, out),
            "MODE" => self.tracker.handle_mode(msg, out),
            "TOPIC" => self.tracker.handle_topic_command(msg, out),
            "ACCOUNT" => self.tracker.handle_account(msg),
            "CHGHOST" => self.tracker.handle_chghost(msg),
            "AWAY" => self.tracker.handle_away_notify(msg),
            "PRIVMSG" => self.handle_chat(false, msg, out),
            "NOTICE" => self.handle_chat(true, msg, out),
            "ERROR" => {
                log::warn!("Server error: {}", msg.param(0).unwrap_or(""));
            }
            _ => {
                if let Some(resp) = msg.response() {
                    self.handle_numeric(config, resp, msg, out);
                }
            }
        }
    }

    /// The `Disconnected` cleanup; the single authority for resource
    /// release.
    pub fn handle_disconnect(&mut self, out: &mut Outbox) {
        if self.state == SessionState::Disconnected {
            return;
        }
        self.state = SessionState::Disconnected;
        self.tracker.clear(out);
        out.events.push(Event::Disconnected);
    }

    fn handle_chat(&mut self, notice: bool, msg: &Message, out: &mut Outbox) {
        let target = match msg.param(0) {
            Some(target) => target.to_owned(),
            None => return,
        };
        let text = msg.param(1).unwrap_or("").to_owned();
        self.tracker.note_sender(msg);

        #[cfg(feature = "ctcp")]
        {
            use crate::proto::ctcp;
            if ctcp::is_ctcp(&text) {
                // Nesting is not supported; one frame per message.
                if let Some((verb, argument)) = ctcp::split_ctcp(&text) {
                    let verb = verb.to_owned();
                    let argument = argument.map(|s| s.to_owned());
                    let source = msg.prefix.clone();
                    out.events.push(if notice {
                        Event::CtcpReply {
                            source,
                            target,
                            verb,
                            argument,
                        }
                    } else {
                        Event::CtcpQuery {
                            source,
                            target,
                            verb,
                            argument,
                        }
                    });
                }
                return;
            }
        }

        let source = msg.prefix.clone();
        out.events.push(if notice {
            Event::Notice {
                source,
                target,
                text,
            }
        } else {
            Event::Privmsg {
                source,
                target,
                text,
            }
        });
    }

    fn handle_cap(&mut self, config: &Config, msg: &Message, out: &mut Outbox) {
        match msg.param(1) {
            Some("LS") => {
                let (more, list) = if msg.param(2) == Some("*") {
                    (true, msg.param(3))
                } else {
                    (false, msg.param(2))
                };
                if let Some(list) = list {
                    for token in list.split(' ').filter(|t| !t.is_empty()) {
                        // Values like `sasl=PLAIN,EXTERNAL` carry the name up
                        // front.
                        let name = match token.split_once('=') {
                            Some((name, _)) => name,
                            None => token,
                        };
                        self.advertised_caps.push(name.to_owned());
                    }
                }
                if !more {
                    self.request_caps(config, out);
                }
            }
            Some("ACK") => {
                for cap in msg.param(2).unwrap_or("").split(' ') {
                    match cap {
                        "multi-prefix" => self.tracker.caps.multi_prefix = true,
                        "extended-join" => self.tracker.caps.extended_join = true,
                        "userhost-in-names" => self.tracker.caps.userhost_in_names = true,
                        "account-notify" => self.tracker.caps.account_notify = true,
                        "sasl" => self.tracker.caps.sasl = true,
                        _ => {}
                    }
                }
                if self.tracker.caps.sasl && config.sasl_credentials().is_some() {
                    self.state = SessionState::SaslAuthenticating;
                    out.messages
                        .push(Message::new(None, "AUTHENTICATE", vec!["PLAIN"]));
                } else {
                    self.cap_end(out);
                }
            }
            Some("NAK") => {
                log::warn!(
                    "Capability request rejected: {}",
                    msg.param(2).unwrap_or("")
                );
                self.cap_end(out);
            }
            _ => {}
        }
    }

    fn request_caps(&mut self, config: &Config, out: &mut Outbox) {
        let mut wanted: Vec<&str> = REQUESTED_CAPS
            .iter()
            .copied()
            .filter(|cap| self.advertised_caps.iter().any(|a| a == cap))
            .collect();
        if config.sasl_credentials().is_some() && self.advertised_caps.iter().any(|a| a == "sasl")
        {
            wanted.push("sasl");
        }
        if wanted.is_empty() {
            self.cap_end(out);
        } else {
            out.messages
                .push(Message::new(None, "CAP", vec!["REQ", &wanted.join(" ")]));
        }
    }

    fn cap_end(&mut self, out: &mut Outbox) {
        out.messages.push(Message::new(None, "CAP", vec!["END"]));
        if self.state < SessionState::Registering {
            self.state = SessionState::Registering;
        }
    }

    /// Answers the server's AUTHENTICATE challenge with the PLAIN payload:
    /// `base64(authzid NUL authcid NUL password)`, split into 400-byte
    /// chunks, with `+` standing in for an empty payload.
    fn handle_authenticate(&mut self, config: &Config, out: &mut Outbox) {
        if self.state != SessionState::SaslAuthenticating {
            return;
        }
        let (account, password) = match config.sasl_credentials() {
            Some(credentials) => credentials,
            None => return,
        };
        let payload = base64::encode(format!("\0{}\0{}", account, password));
        let bytes = payload.as_bytes();
        if bytes.is_empty() {
            out.messages.push(Message::new(None, "AUTHENTICATE", vec!["+"]));
            return;
        }
        for chunk in bytes.chunks(SASL_CHUNK_SIZE) {
            let chunk = String::from_utf8_lossy(chunk);
            out.messages
                .push(Message::new(None, "AUTHENTICATE", vec![&chunk]));
        }
        if bytes.len() % SASL_CHUNK_SIZE == 0 {
            out.messages.push(Message::new(None, "AUTHENTICATE", vec!["+"]));
        }
    }

    fn handle_numeric(
        &mut self,
        config: &Config,
        resp: Response,
        msg: &Message,
        out: &mut Outbox,
    ) {
        use crate::proto::Response::*;

        match resp {
            RPL_WELCOME => {
                if let Some(nick) = msg.param(0) {
                    self.tracker.set_local_nick(nick);
                    out.events.push(Event::Registered {
                        nick: nick.to_owned(),
                    });
                }
                self.state = SessionState::ReceivingServerInfo;
            }
            RPL_ISUPPORT => {
                if msg.params.len() > 1 {
                    self.tracker.apply_isupport(&msg.params[1..]);
                }
            }
            ERR_NICKNAMEINUSE | ERR_ERRONEOUSNICKNAME if !self.is_registered() => {
                self.try_next_nick(config, out);
            }
            RPL_ENDOFMOTD | ERR_NOMOTD => self.go_online(config, out),
            RPL_SASLSUCCESS => {
                log::info!("SASL authentication succeeded");
                self.cap_end(out);
            }
            ERR_SASLFAIL | ERR_SASLTOOLONG | ERR_SASLABORTED | ERR_SASLALREADY
            | ERR_NICKLOCKED => {
                if config.sasl_fail_is_fatal() {
                    log::error!("SASL authentication failed; disconnecting");
                    out.messages
                        .push(Message::new(None, "QUIT", vec!["SASL authentication failed"]));
                    self.state = SessionState::Disconnecting;
                } else {
                    log::warn!("SASL authentication failed; continuing unauthenticated");
                    self.cap_end(out);
                }
            }
            RPL_LOGGEDIN => {
                self.tracker
                    .set_self_account(msg.param(2).map(|s| s.to_owned()));
            }
            RPL_LOGGEDOUT => self.tracker.set_self_account(None),
            RPL_NAMREPLY => self.tracker.handle_namreply(msg, out),
            RPL_TOPIC => self.tracker.handle_topic_text(msg, out),
            RPL_TOPICWHOTIME => self.tracker.handle_topic_whotime(msg),
            RPL_NOTOPIC => self.tracker.handle_no_topic(msg),
            RPL_CHANNELMODEIS => self.tracker.handle_channel_mode_is(msg),
            RPL_CREATIONTIME => self.tracker.handle_creation_time(msg),
            RPL_WHOREPLY => self.tracker.handle_who_reply(msg),
            RPL_WHOISUSER => self.tracker.handle_whois_user(msg),
            RPL_WHOISOPERATOR => self.tracker.handle_whois_operator(msg),
            RPL_AWAY => self.tracker.handle_whois_away(msg),
            RPL_WHOISACCOUNT => self.tracker.handle_whois_account(msg),
            RPL_UNAWAY => self.tracker.set_self_away(false),
            RPL_NOWAWAY => self.tracker.set_self_away(true),
            RPL_MONONLINE => {
                if let Some(targets) = msg.param(1) {
                    let targets = targets.to_owned();
                    self.tracker.handle_monitor_online(&targets, out);
                }
            }
            RPL_MONOFFLINE => {
                if let Some(targets) = msg.param(1) {
                    let targets = targets.to_owned();
                    self.tracker.handle_monitor_offline(&targets, out);
                }
            }
            RPL_LOGON | RPL_NOWON => {
                if let Some(target) = watch_target(msg) {
                    self.tracker.handle_monitor_online(&target, out);
                }
            }
            RPL_LOGOFF | RPL_NOWOFF => {
                if let Some(target) = watch_target(msg) {
                    self.tracker.handle_monitor_offline(&target, out);
                }
            }
            _ => {}
        }
    }

    fn try_next_nick(&mut self, config: &Config, out: &mut Outbox) {
        let alts = config.alternate_nicknames();
        let next = if self.alt_nick_index < alts.len() {
            alts[self.alt_nick_index].clone()
        } else {
            format!("{}_", self.attempted_nick)
        };
        self.alt_nick_index += 1;
        log::warn!("Nickname in use; trying {}", next);
        self.attempted_nick = next.clone();
        out.messages.push(Message::new(None, "NICK", vec![&next]));
    }

    fn go_online(&mut self, config: &Config, out: &mut Outbox) {
        if self.state >= SessionState::Online {
            return;
        }
        self.state = SessionState::Online;
        out.events.push(Event::Ready);
        if let Some(umodes) = config.umodes() {
            let nick = self.tracker.local_nick().to_owned();
            if !nick.is_empty() {
                out.messages
                    .push(Message::new(None, "MODE", vec![&nick, umodes]));
            }
        }
        for channel in config.channels() {
            out.messages.push(Message::new(None, "JOIN", vec![channel]));
        }
    }
}

/// Builds a `nick!user@host` target from the WATCH numerics' split fields.
fn watch_target(msg: &Message) -> Option<String> {
    let nick = msg.param(1)?;
    match (msg.param(2), msg.param(3)) {
        (Some(user), Some(host)) if user != "*" => Some(format!("{}!{}@{}", nick, user, host)),
        _ => Some(nick.to_owned()),
    }
}
