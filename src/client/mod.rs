//! A simple, thread-safe, and async-friendly IRC client library.
//!
//! The [`Client`] owns the session: it tracks users, channels, memberships,
//! and modes across every inbound message, negotiates IRCv3 capabilities and
//! SASL, matches multi-line replies to the requests that provoked them, and
//! paces outbound traffic through a flood bucket.
//!
//! Two logical execution contexts touch a session. The reader is the
//! [`ClientStream`] returned by [`Client::stream`]: polling it parses
//! inbound lines, applies every state mutation, and yields [`Event`]s in
//! wire-arrival order. The writer is driven from the same stream and drains
//! the ordered outbound queue into the transport. Application calls from any
//! context only enqueue.
//!
//! [`Client`]: struct.Client.html
//! [`ClientStream`]: struct.ClientStream.html
//! [`Client::stream`]: struct.Client.html#method.stream
//! [`Event`]: event/enum.Event.html
pub mod conn;
pub mod data;
pub mod event;
pub mod mock;
pub mod prelude;
pub mod requests;
mod session;
pub mod state;
pub mod transport;

mod monitor;

use std::collections::VecDeque;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures_util::sink::Sink;
use futures_util::stream::{SplitSink, SplitStream, StreamExt};
use parking_lot::Mutex;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio_stream::Stream;

use crate::client::conn::Connection;
use crate::client::data::Config;
use crate::client::event::Event;
use crate::client::monitor::{self as presence, PresenceProtocol};
use crate::client::requests::{
    parse_banlist, parse_list, parse_monitor_list, parse_names, parse_who, parse_whois, BanMask,
    ChannelListing, PendingReply, PendingRequests, RequestKind, WhoEntry, Whois,
};
use crate::client::session::{Outbox, Session};
use crate::client::state::{Channel, ChannelUser, User};
use crate::client::transport::LogView;
use crate::error::{self, Error};
use crate::proto::error::ProtocolError;
use crate::proto::{Isupport, Message};

pub use crate::client::session::SessionState;

/// Commands a server accepts before registration completes. Everything else
/// is gated behind `ReceivingServerInfo`.
fn requires_registration(command: &str) -> bool {
    !matches!(
        command.to_ascii_uppercase().as_str(),
        "CAP" | "PASS" | "NICK" | "USER" | "PING" | "PONG" | "QUIT" | "AUTHENTICATE"
    )
}

/// A thread-safe sender for the outbound queue. Does not gate on session
/// state; prefer [`Client::send`] unless bypassing gating on purpose.
///
/// [`Client::send`]: struct.Client.html#method.send
#[derive(Clone, Debug)]
pub struct Sender {
    tx: UnboundedSender<Message>,
}

impl Sender {
    /// Enqueues the given message for the writer.
    pub fn send<M: Into<Message>>(&self, msg: M) -> error::Result<()> {
        let msg = msg.into();
        log::debug!("Sent: {}", msg.to_string().trim_end());
        self.tx.send(msg).map_err(|_| Error::Disconnected)
    }
}

/// Shared state between the client handle and its stream.
struct ClientState {
    sender: Sender,
    config: Config,
    session: Mutex<Session>,
    pending: Arc<Mutex<PendingRequests>>,
    /// Events produced outside the reader (e.g. monitor-list edits); the
    /// stream drains these ahead of new lines.
    queued: Mutex<VecDeque<Event>>,
}

impl ClientState {
    /// Applies one inbound line: session and tracker mutations first, then
    /// the request matcher, then any session-originated sends. The returned
    /// events fire only after all of that is done.
    fn handle_message(&self, msg: &Message) -> Vec<Event> {
        log::debug!("Received: {}", msg.to_string().trim_end());
        let mut out = Outbox::default();
        out.events.push(Event::Raw(msg.clone()));

        let cm = {
            let mut session = self.session.lock();
            session.apply(&self.config, msg, &mut out);
            session.tracker.casemapping()
        };
        self.pending.lock().handle(msg, cm);

        for message in out.messages.drain(..) {
            let _ = self.sender.send(message);
        }
        out.events
    }

    /// Runs the `Disconnected` cleanup exactly once.
    fn handle_disconnect(&self) -> Vec<Event> {
        let mut out = Outbox::default();
        self.session.lock().handle_disconnect(&mut out);
        self.pending.lock().fail_all();
        out.events
    }
}

/// The future that drains the outbound queue into the transport, honoring
/// the transport's flood pacing. Driven by the client stream.
pub struct Outgoing {
    sink: SplitSink<Connection, Message>,
    rx: UnboundedReceiver<Message>,
    buffered: Option<Message>,
}

impl Future for Outgoing {
    type Output = error::Result<()>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();
        loop {
            if let Some(msg) = this.buffered.take() {
                match Pin::new(&mut this.sink).poll_ready(cx)? {
                    Poll::Ready(()) => Pin::new(&mut this.sink).start_send(msg)?,
                    Poll::Pending => {
                        this.buffered = Some(msg);
                        return Poll::Pending;
                    }
                }
            }
            match this.rx.poll_recv(cx) {
                Poll::Ready(Some(msg)) => this.buffered = Some(msg),
                Poll::Ready(None) => {
                    futures_util::ready!(Pin::new(&mut this.sink).poll_flush(cx))?;
                    return Poll::Ready(Ok(()));
                }
                Poll::Pending => {
                    let _ = Pin::new(&mut this.sink).poll_flush(cx)?;
                    return Poll::Pending;
                }
            }
        }
    }
}

/// The stream of session events. Polling this drives the whole session:
/// inbound parsing, state tracking, request matching, and outbound flushes.
pub struct ClientStream {
    state: Arc<ClientState>,
    stream: SplitStream<Connection>,
    outgoing: Option<Outgoing>,
    queue: VecDeque<Event>,
    fatal: Option<Error>,
    done: bool,
}

impl Stream for ClientStream {
    type Item = error::Result<Event>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        loop {
            {
                let mut queued = this.state.queued.lock();
                this.queue.extend(queued.drain(..));
            }
            if let Some(event) = this.queue.pop_front() {
                return Poll::Ready(Some(Ok(event)));
            }
            if let Some(err) = this.fatal.take() {
                this.done = true;
                return Poll::Ready(Some(Err(err)));
            }
            if this.done {
                return Poll::Ready(None);
            }

            if let Some(outgoing) = &mut this.outgoing {
                match Pin::new(outgoing).poll(cx) {
                    Poll::Ready(Ok(())) => this.outgoing = None,
                    Poll::Ready(Err(err)) => {
                        this.queue.extend(this.state.handle_disconnect());
                        this.fatal = Some(err);
                        continue;
                    }
                    Poll::Pending => {}
                }
            }

            match Pin::new(&mut this.stream).poll_next(cx) {
                Poll::Ready(Some(Ok(msg))) => {
                    this.queue.extend(this.state.handle_message(&msg));
                }
                Poll::Ready(Some(Err(Error::MalformedLine(ProtocolError::InvalidMessage {
                    string,
                    ..
                })))) => {
                    // Unparseable lines are reported and discarded; the
                    // session continues.
                    this.queue.push_back(Event::InvalidLine { line: string });
                }
                Poll::Ready(Some(Err(err))) => {
                    this.queue.extend(this.state.handle_disconnect());
                    this.fatal = Some(err);
                }
                Poll::Ready(None) => {
                    this.queue.extend(this.state.handle_disconnect());
                    this.done = true;
                }
                Poll::Pending => return Poll::Pending,
            }
        }
    }
}

/// The IRC client handle.
pub struct Client {
    state: Arc<ClientState>,
    incoming: Option<SplitStream<Connection>>,
    outgoing: Option<Outgoing>,
    sender: Sender,
    view: Option<LogView>,
}

impl Client {
    /// Creates a client from the given configuration and connects
    /// immediately. Call [`identify`] and then [`stream`] to register and
    /// start processing.
    ///
    /// [`identify`]: #method.identify
    /// [`stream`]: #method.stream
    pub async fn from_config(config: Config) -> error::Result<Client> {
        let conn = Connection::new(&config).await?;
        let view = conn.log_view();
        let (sink, incoming) = conn.split();
        let (tx, rx) = mpsc::unbounded_channel();
        let sender = Sender { tx };
        let state = Arc::new(ClientState {
            sender: sender.clone(),
            config,
            session: Mutex::new(Session::new()),
            pending: Arc::new(Mutex::new(PendingRequests::default())),
            queued: Mutex::new(VecDeque::new()),
        });
        Ok(Client {
            state,
            incoming: Some(incoming),
            outgoing: Some(Outgoing {
                sink,
                rx,
                buffered: None,
            }),
            sender,
            view,
        })
    }

    /// Sends the registration sequence: `CAP LS 302`, optional `PASS`,
    /// `NICK`, and `USER`. Capability negotiation and SASL proceed
    /// automatically as the server answers.
    pub fn identify(&self) -> error::Result<()> {
        let config = &self.state.config;
        let nick = config.nickname()?.to_owned();
        self.state.session.lock().begin(&nick);

        self.sender
            .send(Message::new(None, "CAP", vec!["LS", "302"]))?;
        if !config.password().is_empty() {
            self.sender
                .send(Message::new(None, "PASS", vec![config.password()]))?;
        }
        self.sender.send(Message::new(None, "NICK", vec![&nick]))?;
        self.sender.send(Message::new(
            None,
            "USER",
            vec![config.username(), "0", "*", config.real_name()],
        ))?;
        Ok(())
    }

    /// Takes the event stream. The stream drives all session processing and
    /// can be taken exactly once.
    pub fn stream(&mut self) -> error::Result<ClientStream> {
        let stream = self
            .incoming
            .take()
            .ok_or(Error::StreamAlreadyConfigured)?;
        let mut queue = VecDeque::new();
        queue.push_back(Event::Connected);
        Ok(ClientStream {
            state: Arc::clone(&self.state),
            stream,
            outgoing: self.outgoing.take(),
            queue,
            fatal: None,
            done: false,
        })
    }

    /// Gets a cloneable handle onto the outbound queue.
    pub fn sender(&self) -> Sender {
        self.sender.clone()
    }

    /// Sends a message, enforcing registration gating for commands that
    /// mutate server state.
    pub fn send<M: Into<Message>>(&self, msg: M) -> error::Result<()> {
        let msg = msg.into();
        if requires_registration(&msg.command) && !self.state.session.lock().is_registered() {
            return Err(Error::NotRegistered);
        }
        self.sender.send(msg)
    }

    /// Parses and sends a raw line; the escape hatch for custom commands.
    pub fn send_raw(&self, line: &str) -> error::Result<()> {
        let msg: Message = line
            .parse()
            .map_err(|cause| ProtocolError::InvalidMessage {
                string: line.to_owned(),
                cause,
            })?;
        self.send(msg)
    }

    /// Joins the given comma-separated channel list. Names are validated
    /// against the network's advertised CHANTYPES.
    pub fn send_join(&self, chanlist: &str) -> error::Result<()> {
        {
            let session = self.state.session.lock();
            let isupport = session.tracker.isupport();
            if chanlist.split(',').any(|chan| !isupport.is_channel_name(chan)) {
                return Err(Error::InvalidArgument {
                    argument: chanlist.to_owned(),
                    reason: "not a channel name",
                });
            }
        }
        self.send(Message::new(None, "JOIN", vec![chanlist]))
    }

    /// Parts the given channel.
    pub fn send_part(&self, channel: &str) -> error::Result<()> {
        self.send(Message::new(None, "PART", vec![channel]))
    }

    /// Sends a PRIVMSG, splitting the text so every physical line fits the
    /// 512-byte envelope with our own prefix accounted for.
    pub fn send_privmsg(&self, target: &str, text: &str) -> error::Result<()> {
        for chunk in split_for_wire(&self.current_nickname(), target, text) {
            self.send(Message::new(None, "PRIVMSG", vec![target, chunk]))?;
        }
        Ok(())
    }

    /// Sends a NOTICE, split like [`send_privmsg`].
    ///
    /// [`send_privmsg`]: #method.send_privmsg
    pub fn send_notice(&self, target: &str, text: &str) -> error::Result<()> {
        for chunk in split_for_wire(&self.current_nickname(), target, text) {
            self.send(Message::new(None, "NOTICE", vec![target, chunk]))?;
        }
        Ok(())
    }

    /// Sends a MODE change; `modes` is the mode string followed by its
    /// arguments, e.g. `"+o dave"`.
    pub fn send_mode(&self, target: &str, modes: &str) -> error::Result<()> {
        let mut params = vec![target];
        params.extend(modes.split_whitespace());
        self.send(Message::new(None, "MODE", params))
    }

    /// Kicks a user from a channel.
    pub fn send_kick(&self, channel: &str, nick: &str, reason: &str) -> error::Result<()> {
        if reason.is_empty() {
            self.send(Message::new(None, "KICK", vec![channel, nick]))
        } else {
            self.send(Message::new(None, "KICK", vec![channel, nick, reason]))
        }
    }

    /// Bans a mask from a channel.
    pub fn send_ban(&self, channel: &str, mask: &str) -> error::Result<()> {
        self.send(Message::new(None, "MODE", vec![channel, "+b", mask]))
    }

    /// Sets a channel topic.
    pub fn send_topic(&self, channel: &str, topic: &str) -> error::Result<()> {
        self.send(Message::new(None, "TOPIC", vec![channel, topic]))
    }

    /// Sends a CTCP query inside a PRIVMSG.
    #[cfg(feature = "ctcp")]
    pub fn send_ctcp(&self, target: &str, verb: &str, argument: Option<&str>) -> error::Result<()> {
        let framed = crate::proto::ctcp::wrap_ctcp(verb, argument);
        self.send(Message::new(None, "PRIVMSG", vec![target, &framed]))
    }

    /// Sends a CTCP ACTION ("/me").
    #[cfg(feature = "ctcp")]
    pub fn send_action(&self, target: &str, text: &str) -> error::Result<()> {
        self.send_ctcp(target, "ACTION", Some(text))
    }

    /// Quits the session. The transport closes when the server answers (or
    /// drops us), at which point the stream runs the disconnect cleanup.
    pub fn send_quit(&self, message: &str) -> error::Result<()> {
        let msg = if message.is_empty() {
            Message::new(None, "QUIT", vec![])
        } else {
            Message::new(None, "QUIT", vec![message])
        };
        self.sender.send(msg)?;
        self.state.session.lock().state = SessionState::Disconnecting;
        Ok(())
    }

    /// Looks up a user and aggregates the WHOIS reply set into one result.
    pub fn whois(&self, nick: &str) -> error::Result<PendingReply<Whois>> {
        presence::validate_nickname(nick)?;
        self.request(
            RequestKind::Whois,
            nick,
            Message::new(None, "WHOIS", vec![nick]),
            parse_whois,
        )
    }

    /// Runs WHO against a mask or channel and collects the reply lines.
    pub fn who(&self, target: &str) -> error::Result<PendingReply<Vec<WhoEntry>>> {
        self.request(
            RequestKind::Who,
            target,
            Message::new(None, "WHO", vec![target]),
            parse_who,
        )
    }

    /// Runs LIST, optionally filtered, and collects the channel listings.
    pub fn list(&self, filter: Option<&str>) -> error::Result<PendingReply<Vec<ChannelListing>>> {
        let msg = match filter {
            Some(filter) => Message::new(None, "LIST", vec![filter]),
            None => Message::new(None, "LIST", vec![]),
        };
        self.request(RequestKind::List, "", msg, parse_list)
    }

    /// Requests NAMES for a channel and returns the raw name tokens, status
    /// prefixes included. The tracker ingests the reply as well.
    pub fn names(&self, channel: &str) -> error::Result<PendingReply<Vec<String>>> {
        self.request(
            RequestKind::Names,
            channel,
            Message::new(None, "NAMES", vec![channel]),
            parse_names,
        )
    }

    /// Requests a channel's ban list.
    pub fn banlist(&self, channel: &str) -> error::Result<PendingReply<Vec<BanMask>>> {
        self.request(
            RequestKind::BanList,
            channel,
            Message::new(None, "MODE", vec![channel, "+b"]),
            parse_banlist,
        )
    }

    fn request<T>(
        &self,
        kind: RequestKind,
        target: &str,
        command: Message,
        parse: fn(Vec<Message>) -> error::Result<T>,
    ) -> error::Result<PendingReply<T>> {
        let folded = self.state.session.lock().tracker.fold(target);
        // Registered before the provoking command is written, so the reply
        // cannot race past us.
        let (id, rx) = self.state.pending.lock().register(kind, folded);
        match self.send(command) {
            Ok(()) => Ok(PendingReply::new(
                rx,
                parse,
                Arc::clone(&self.state.pending),
                id,
            )),
            Err(err) => {
                self.state.pending.lock().cancel(id);
                Err(err)
            }
        }
    }

    fn presence_protocol(&self) -> error::Result<(PresenceProtocol, Option<u32>)> {
        let session = self.state.session.lock();
        if !session.is_registered() {
            return Err(Error::NotRegistered);
        }
        let isupport = session.tracker.isupport();
        if let Some(cap) = isupport.monitor() {
            Ok((PresenceProtocol::Monitor, Some(cap)))
        } else if let Some(cap) = isupport.watch() {
            Ok((PresenceProtocol::Watch, Some(cap)))
        } else {
            Err(Error::NotSupported {
                feature: "MONITOR or WATCH",
            })
        }
    }

    /// Adds nicknames to the presence list, batched under both the
    /// advertised target cap and the wire line cap.
    pub fn monitor_add(&self, nicks: &[&str]) -> error::Result<()> {
        for nick in nicks {
            presence::validate_nickname(nick)?;
        }
        let (protocol, cap) = self.presence_protocol()?;
        let fresh: Vec<String> = {
            let mut session = self.state.session.lock();
            nicks
                .iter()
                .filter(|nick| session.tracker.monitor_insert(nick))
                .map(|nick| nick.to_string())
                .collect()
        };
        for command in presence::batch_commands(protocol, true, &fresh, cap) {
            self.sender.send(command)?;
        }
        Ok(())
    }

    /// Removes nicknames from the presence list.
    pub fn monitor_remove(&self, nicks: &[&str]) -> error::Result<()> {
        for nick in nicks {
            presence::validate_nickname(nick)?;
        }
        let (protocol, cap) = self.presence_protocol()?;
        let mut out = Outbox::default();
        let removed: Vec<String> = {
            let mut session = self.state.session.lock();
            nicks
                .iter()
                .filter(|nick| session.tracker.monitor_remove(nick, &mut out))
                .map(|nick| nick.to_string())
                .collect()
        };
        self.state.queued.lock().extend(out.events);
        for command in presence::batch_commands(protocol, false, &removed, cap) {
            self.sender.send(command)?;
        }
        Ok(())
    }

    /// Clears the presence list.
    pub fn monitor_clear(&self) -> error::Result<()> {
        let (protocol, _) = self.presence_protocol()?;
        let mut out = Outbox::default();
        self.state.session.lock().tracker.monitor_clear(&mut out);
        self.state.queued.lock().extend(out.events);
        self.sender.send(presence::clear_command(protocol))
    }

    /// Replaces the presence list with the union of itself and `nicks`.
    pub fn monitor_union(&self, nicks: &[&str]) -> error::Result<()> {
        self.monitor_add(nicks)
    }

    /// Removes every element of `nicks` from the presence list.
    pub fn monitor_except(&self, nicks: &[&str]) -> error::Result<()> {
        self.monitor_remove(nicks)
    }

    /// Intersects the presence list with `nicks`.
    pub fn monitor_intersect(&self, nicks: &[&str]) -> error::Result<()> {
        let keep: Vec<String> = {
            let session = self.state.session.lock();
            nicks
                .iter()
                .map(|n| session.tracker.fold(n))
                .collect()
        };
        let drop: Vec<String> = {
            let session = self.state.session.lock();
            session
                .tracker
                .monitored_nicks()
                .into_iter()
                .filter(|n| !keep.contains(&session.tracker.fold(n)))
                .collect()
        };
        let drop_refs: Vec<&str> = drop.iter().map(|s| &s[..]).collect();
        self.monitor_remove(&drop_refs)
    }

    /// Symmetric difference: elements in exactly one of the presence list
    /// and `nicks`.
    pub fn monitor_symmetric_except(&self, nicks: &[&str]) -> error::Result<()> {
        let (in_both, fresh): (Vec<&str>, Vec<&str>) = {
            let session = self.state.session.lock();
            nicks
                .iter()
                .copied()
                .partition(|n| session.tracker.monitored_contains(n))
        };
        self.monitor_remove(&in_both)?;
        self.monitor_add(&fresh)
    }

    /// Whether the presence list contains the nickname.
    pub fn monitor_contains(&self, nick: &str) -> bool {
        self.state.session.lock().tracker.monitored_contains(nick)
    }

    /// Whether the presence list is a subset of `nicks`.
    pub fn monitor_is_subset(&self, nicks: &[&str]) -> bool {
        let session = self.state.session.lock();
        let given: Vec<String> = nicks.iter().map(|n| session.tracker.fold(n)).collect();
        session
            .tracker
            .monitored_nicks()
            .iter()
            .all(|n| given.contains(&session.tracker.fold(n)))
    }

    /// Whether the presence list equals `nicks` as a set.
    pub fn monitor_eq(&self, nicks: &[&str]) -> bool {
        self.monitor_is_subset(nicks)
            && nicks.len()
                == self.state.session.lock().tracker.monitored_nicks().len()
    }

    /// The current contents of the presence list, sorted.
    pub fn monitors(&self) -> Vec<String> {
        self.state.session.lock().tracker.monitored_nicks()
    }

    /// Queries online status of the whole presence list. MONITOR only; the
    /// WATCH listing has no clean terminator.
    pub fn monitor_status(&self) -> error::Result<PendingReply<Vec<String>>> {
        let (protocol, _) = self.presence_protocol()?;
        let command = presence::status_command(protocol).ok_or(Error::NotSupported {
            feature: "MONITOR status listing",
        })?;
        self.request(RequestKind::MonitorStatus, "", command, parse_monitor_list)
    }

    /// Our nickname as the server currently knows it.
    pub fn current_nickname(&self) -> String {
        self.state.session.lock().tracker.local_nick().to_owned()
    }

    /// The session's connection phase.
    pub fn session_state(&self) -> SessionState {
        self.state.session.lock().state
    }

    /// The network name from ISUPPORT, when advertised.
    pub fn network_name(&self) -> Option<String> {
        self.state
            .session
            .lock()
            .tracker
            .isupport()
            .network()
            .map(|s| s.to_owned())
    }

    /// A snapshot of the server's ISUPPORT registry.
    pub fn isupport(&self) -> Isupport {
        self.state.session.lock().tracker.isupport().clone()
    }

    /// The names of the channels we are currently in, sorted.
    pub fn channels(&self) -> Vec<String> {
        self.state.session.lock().tracker.channel_names()
    }

    /// A snapshot of one channel's state.
    pub fn channel(&self, name: &str) -> Option<Channel> {
        self.state.session.lock().tracker.channel(name).cloned()
    }

    /// A snapshot of one user's state.
    pub fn user(&self, nick: &str) -> Option<User> {
        self.state.session.lock().tracker.user(nick).cloned()
    }

    /// A snapshot of a channel's membership, sorted by nickname.
    pub fn channel_users(&self, name: &str) -> Option<Vec<ChannelUser>> {
        let mut members: Vec<ChannelUser> = self
            .state
            .session
            .lock()
            .tracker
            .channel(name)?
            .members
            .values()
            .cloned()
            .collect();
        members.sort_by(|a, b| a.nickname.cmp(&b.nickname));
        Some(members)
    }

    /// Gets a view of the messages sent and received, if and only if this
    /// client uses a mock connection. Used for unit testing.
    pub fn log_view(&self) -> Option<LogView> {
        self.view.clone()
    }
}

/// Splits message text so each physical line fits in 512 bytes once the
/// server prepends our full prefix. Splits at character boundaries.
fn split_for_wire<'a>(nick: &str, target: &str, text: &'a str) -> Vec<&'a str> {
    // ":" nick "!" ident "@" host " PRIVMSG " target " :" text "\r\n", with
    // worst-case ident and host lengths when we don't know our own mask.
    let overhead = 1 + nick.len() + 1 + 10 + 1 + 63 + 9 + 1 + target.len() + 2 + 2;
    let budget = 512usize.saturating_sub(overhead).max(1);

    let mut chunks = Vec::new();
    let mut rest = text;
    while rest.len() > budget {
        let mut cut = budget;
        while !rest.is_char_boundary(cut) {
            cut -= 1;
        }
        chunks.push(&rest[..cut]);
        rest = &rest[cut..];
    }
    chunks.push(rest);
    chunks
}

#[cfg(test)]
mod test {
    use std::time::Duration;

    use futures::prelude::*;

    use super::{Client, ClientStream};
    use crate::client::data::Config;
    use crate::client::event::Event;
    use crate::client::session::SessionState;
    use crate::error::Error;
    use crate::proto::CaseMapping;

    fn test_config(mock_lines: &str) -> Config {
        Config {
            nickname: Some("test".to_owned()),
            alt_nicks: vec!["test2".to_owned()],
            server: Some("irc.test.net".to_owned()),
            use_mock_connection: Some(true),
            mock_initial_value: Some(mock_lines.to_owned()),
            max_messages_in_burst: Some(100),
            ..Default::default()
        }
    }

    async fn connected(lines: &str) -> (Client, ClientStream) {
        let mut client = Client::from_config(test_config(lines)).await.unwrap();
        client.identify().unwrap();
        let stream = client.stream().unwrap();
        (client, stream)
    }

    /// Drives the stream until the predicate matches an event. Returns false
    /// when the stream ended first.
    async fn drive_until<F>(stream: &mut ClientStream, f: F) -> bool
    where
        F: Fn(&Event) -> bool,
    {
        while let Some(item) = stream.next().await {
            if f(&item.unwrap()) {
                return true;
            }
        }
        false
    }

    async fn drain(stream: &mut ClientStream) -> Vec<Event> {
        let mut events = Vec::new();
        while let Some(item) = stream.next().await {
            events.push(item.unwrap());
        }
        events
    }

    fn raw_command_is(event: &Event, command: &str) -> bool {
        matches!(event, Event::Raw(msg) if msg.command == command)
    }

    const WELCOME: &str = ":server 001 Nick :Welcome\r\n\
                           :server 005 Nick PREFIX=(ov)@+ CHANMODES=b,k,l,imnpst CASEMAPPING=rfc1459 :are supported\r\n\
                           :server 376 Nick :End of MOTD\r\n";

    #[tokio::test]
    async fn welcome_brings_the_session_online() {
        let (client, mut stream) = connected(WELCOME).await;
        assert!(drive_until(&mut stream, |e| matches!(e, Event::Ready)).await);

        assert_eq!(client.session_state(), SessionState::Online);
        assert_eq!(client.current_nickname(), "Nick");
        let cm = client.isupport().casemapping();
        assert_eq!(cm, CaseMapping::Rfc1459);
        assert_eq!(cm.fold("["), "{");
        assert!(client.user("Nick").unwrap().is_self);
    }

    #[tokio::test]
    async fn join_and_names_populate_the_channel() {
        let lines = format!(
            "{}{}",
            WELCOME,
            ":Nick!u@h JOIN #Chan\r\n\
             :server 353 Nick = #Chan :@Nick +Bob Carol\r\n\
             :server 366 Nick #Chan :End of /NAMES\r\n"
        );
        let (client, mut stream) = connected(&lines).await;
        assert!(drive_until(&mut stream, |e| raw_command_is(e, "366")).await);

        let channel = client.channel("#Chan").unwrap();
        assert_eq!(channel.name, "#Chan");
        let users = client.channel_users("#chan").unwrap();
        let statuses: Vec<(String, Vec<char>)> = users
            .iter()
            .map(|u| (u.nickname.clone(), u.statuses.iter().copied().collect()))
            .collect();
        assert!(statuses.contains(&("Nick".to_owned(), vec!['o'])));
        assert!(statuses.contains(&("Bob".to_owned(), vec!['v'])));
        assert!(statuses.contains(&("Carol".to_owned(), vec![])));
    }

    #[tokio::test]
    async fn multi_prefix_names_keep_every_status() {
        let lines = format!(
            ":server CAP * LS :multi-prefix sasl\r\n\
             :server CAP * ACK :multi-prefix\r\n\
             {}\
             :Nick!u@h JOIN #Chan\r\n\
             :server 353 Nick = #Chan :@+Dave\r\n\
             :server 366 Nick #Chan :End of /NAMES\r\n",
            WELCOME
        );
        let (client, mut stream) = connected(&lines).await;
        assert!(drive_until(&mut stream, |e| raw_command_is(e, "366")).await);

        let users = client.channel_users("#Chan").unwrap();
        let dave = users.iter().find(|u| u.nickname == "Dave").unwrap();
        let statuses: Vec<char> = dave.statuses.iter().copied().collect();
        assert_eq!(statuses, vec!['o', 'v']);
        assert_eq!(dave.highest_status(&client.isupport()), Some('o'));
        assert_eq!(
            crate::client::state::ChannelUser::status_rank(&client.isupport(), 'o'),
            0
        );
    }

    #[tokio::test]
    async fn whois_aggregates_until_the_terminator() {
        let lines = format!(
            "{}\
             :server 311 Nick Bob ident bob.host * :Bob Person\r\n\
             :server 312 Nick Bob srv.example :A server\r\n\
             :server 317 Nick Bob 42 :seconds idle\r\n\
             :server 318 Nick Bob :End of WHOIS\r\n",
            WELCOME
        );
        let (client, mut stream) = connected(&lines).await;
        assert!(drive_until(&mut stream, |e| matches!(e, Event::Ready)).await);

        let reply = client.whois("Bob").unwrap();
        let (whois, _) = tokio::join!(reply, drain(&mut stream));
        let whois = whois.unwrap();
        assert_eq!(whois.nickname, "Bob");
        assert_eq!(whois.username.as_deref(), Some("ident"));
        assert_eq!(whois.hostname.as_deref(), Some("bob.host"));
        assert_eq!(whois.realname.as_deref(), Some("Bob Person"));
        assert_eq!(whois.server.as_deref(), Some("srv.example"));
        assert_eq!(whois.idle_secs, Some(42));
    }

    #[tokio::test]
    async fn whois_error_numeric_fails_the_request() {
        let lines = format!("{}:server 401 Nick Bob :No such nick\r\n", WELCOME);
        let (client, mut stream) = connected(&lines).await;
        assert!(drive_until(&mut stream, |e| matches!(e, Event::Ready)).await);

        let reply = client.whois("Bob").unwrap();
        let (outcome, _) = tokio::join!(reply, drain(&mut stream));
        match outcome {
            Err(Error::AsyncRequestError { response }) => assert_eq!(response.command, "401"),
            other => panic!("expected AsyncRequestError, got {:?}", other.map(|w| w.nickname)),
        }
    }

    #[tokio::test]
    async fn monitor_add_batches_per_isupport_and_line_cap() {
        let lines = ":server 001 Nick :Welcome\r\n\
                     :server 005 Nick MONITOR=3 :are supported\r\n\
                     :server 376 Nick :End of MOTD\r\n";
        let (client, mut stream) = connected(lines).await;
        assert!(drive_until(&mut stream, |e| matches!(e, Event::Ready)).await);

        client.monitor_add(&["a", "b", "c", "d"]).unwrap();
        assert_eq!(client.monitors(), vec!["a", "b", "c", "d"]);
        assert!(client.monitor_contains("a"));
        assert!(client.monitor_is_subset(&["a", "b", "c", "d", "e"]));
        assert!(client.monitor_eq(&["d", "c", "b", "a"]));

        drain(&mut stream).await;
        let sent: Vec<String> = client
            .log_view()
            .unwrap()
            .sent()
            .iter()
            .map(|m| m.to_string())
            .filter(|l| l.starts_with("MONITOR"))
            .collect();
        assert_eq!(sent, vec!["MONITOR + a,b,c\r\n", "MONITOR + d\r\n"]);
    }

    #[tokio::test]
    async fn monitor_requires_server_support() {
        let (client, mut stream) = connected(WELCOME).await;
        assert!(drive_until(&mut stream, |e| matches!(e, Event::Ready)).await);
        assert!(matches!(
            client.monitor_add(&["a"]),
            Err(Error::NotSupported { .. })
        ));
    }

    #[tokio::test]
    async fn monitor_rejects_unsendable_nicknames() {
        let lines = ":server 001 Nick :Welcome\r\n\
                     :server 005 Nick MONITOR=100 :are supported\r\n\
                     :server 376 Nick :End of MOTD\r\n";
        let (client, mut stream) = connected(lines).await;
        assert!(drive_until(&mut stream, |e| matches!(e, Event::Ready)).await);
        assert!(matches!(
            client.monitor_add(&["a b"]),
            Err(Error::InvalidArgument { .. })
        ));
    }

    #[tokio::test]
    async fn casemapping_change_rehashes_lookups() {
        let lines = ":server 001 Nick :Welcome\r\n\
                     :server 005 Nick CASEMAPPING=ascii PREFIX=(ov)@+ :are supported\r\n\
                     :server 376 Nick :End of MOTD\r\n\
                     :Nick!u@h JOIN #Chan\r\n\
                     :server 353 Nick = #Chan :foo[\r\n\
                     :server 366 Nick #Chan :End of /NAMES\r\n\
                     :server 005 Nick CASEMAPPING=rfc1459 :are supported\r\n";
        let (client, mut stream) = connected(lines).await;

        assert!(drive_until(&mut stream, |e| raw_command_is(e, "366")).await);
        assert!(client.user("foo[").is_some());
        assert!(client.user("FOO{").is_none());

        assert!(
            drive_until(&mut stream, |e| matches!(
                e,
                Event::Raw(m) if m.command == "005" && m.params.iter().any(|p| p == "CASEMAPPING=rfc1459")
            ))
            .await
        );
        assert!(client.user("FOO{").is_some());
    }

    #[tokio::test]
    async fn state_mutating_commands_are_gated_until_registration() {
        let (client, _stream) = connected(WELCOME).await;
        assert!(matches!(
            client.send_privmsg("#chan", "hello"),
            Err(Error::NotRegistered)
        ));
        assert!(matches!(
            client.monitor_add(&["a"]),
            Err(Error::NotRegistered)
        ));
        // Registration commands themselves pass.
        client.send_raw("NICK other").unwrap();
    }

    #[tokio::test]
    async fn send_join_honors_advertised_chantypes() {
        let lines = ":server 001 Nick :Welcome\r\n\
                     :server 005 Nick CHANTYPES=#~ :are supported\r\n\
                     :server 376 Nick :End of MOTD\r\n";
        let (client, mut stream) = connected(lines).await;
        assert!(drive_until(&mut stream, |e| matches!(e, Event::Ready)).await);

        client.send_join("#ordinary,~tilde").unwrap();
        assert!(matches!(
            client.send_join("&unadvertised"),
            Err(Error::InvalidArgument { .. })
        ));
    }

    #[tokio::test]
    async fn disconnect_fails_pending_requests_and_clears_state() {
        let lines = format!("{}:Nick!u@h JOIN #Chan\r\n", WELCOME);
        let (client, mut stream) = connected(&lines).await;
        assert!(drive_until(&mut stream, |e| raw_command_is(e, "JOIN")).await);
        assert!(client.channel("#Chan").is_some());

        let reply = client.whois("Bob").unwrap();
        let (outcome, events) = tokio::join!(reply, drain(&mut stream));
        assert!(matches!(outcome, Err(Error::Disconnected)));
        assert!(events.iter().any(|e| matches!(e, Event::Disconnected)));
        assert!(client.channel("#Chan").is_none());
        assert!(client.user("Nick").is_none());
        assert_eq!(client.session_state(), SessionState::Disconnected);
    }

    #[tokio::test]
    async fn sasl_plain_flows_through_authenticate() {
        let lines = ":server CAP * LS :multi-prefix sasl\r\n\
                     :server CAP * ACK :multi-prefix sasl\r\n\
                     AUTHENTICATE +\r\n\
                     :server 903 test :SASL authentication successful\r\n\
                     :server 001 Nick :Welcome\r\n\
                     :server 376 Nick :End of MOTD\r\n";
        let mut config = test_config(lines);
        config.sasl_account = Some("acct".to_owned());
        config.sasl_password = Some("hunter2".to_owned());
        let mut client = Client::from_config(config).await.unwrap();
        client.identify().unwrap();
        let mut stream = client.stream().unwrap();

        assert!(drive_until(&mut stream, |e| matches!(e, Event::Ready)).await);
        drain(&mut stream).await;

        let sent: Vec<String> = client
            .log_view()
            .unwrap()
            .sent()
            .iter()
            .map(|m| m.to_string())
            .collect();
        assert!(sent.iter().any(|l| l == "AUTHENTICATE PLAIN\r\n"));
        let expected = base64::encode("\0acct\0hunter2");
        assert!(sent.iter().any(|l| *l == format!("AUTHENTICATE {}\r\n", expected)));
        assert!(sent.iter().any(|l| l == "CAP END\r\n"));
    }

    #[tokio::test]
    async fn extended_join_fills_account_and_realname() {
        let lines = format!(
            ":server CAP * LS :extended-join\r\n\
             :server CAP * ACK :extended-join\r\n\
             {}\
             :Nick!u@h JOIN #Chan\r\n\
             :alice!a@host JOIN #Chan accountname :Alice A.\r\n",
            WELCOME
        );
        let (client, mut stream) = connected(&lines).await;
        assert!(
            drive_until(&mut stream, |e| matches!(
                e,
                Event::Join { nick, .. } if nick == "alice"
            ))
            .await
        );

        let alice = client.user("alice").unwrap();
        assert_eq!(alice.account.as_deref(), Some("accountname"));
        assert_eq!(alice.realname.as_deref(), Some("Alice A."));
    }

    #[cfg(feature = "ctcp")]
    #[tokio::test]
    async fn ctcp_frames_are_redispatched() {
        let lines = format!(
            "{}:bob!b@h PRIVMSG Nick :\u{1}PING 12345\u{1}\r\n",
            WELCOME
        );
        let (_client, mut stream) = connected(&lines).await;
        assert!(
            drive_until(&mut stream, |e| matches!(
                e,
                Event::CtcpQuery { verb, argument, .. }
                    if verb == "PING" && argument.as_deref() == Some("12345")
            ))
            .await
        );
    }

    #[tokio::test]
    async fn nickname_in_use_steps_through_alternatives() {
        let lines = ":server 433 * test :Nickname is already in use.\r\n\
                     :server 001 test2 :Welcome\r\n\
                     :server 376 test2 :End of MOTD\r\n";
        let (client, mut stream) = connected(lines).await;
        assert!(drive_until(&mut stream, |e| matches!(e, Event::Ready)).await);
        drain(&mut stream).await;

        assert_eq!(client.current_nickname(), "test2");
        let sent: Vec<String> = client
            .log_view()
            .unwrap()
            .sent()
            .iter()
            .map(|m| m.to_string())
            .collect();
        assert!(sent.iter().any(|l| l == "NICK test2\r\n"));
    }

    #[tokio::test]
    async fn quits_and_parts_apply_the_disappearance_policy() {
        let lines = format!(
            "{}\
             :Nick!u@h JOIN #Chan\r\n\
             :server 353 Nick = #Chan :@Nick Bob\r\n\
             :server 366 Nick #Chan :End of /NAMES\r\n\
             :Bob!b@h QUIT :bye\r\n",
            WELCOME
        );
        let (client, mut stream) = connected(&lines).await;
        assert!(
            drive_until(&mut stream, |e| matches!(
                e,
                Event::UserDisappeared { nick } if nick == "Bob"
            ))
            .await
        );
        assert!(client.user("Bob").is_none());
        assert!(!client
            .channel("#Chan")
            .unwrap()
            .members
            .contains_key("bob"));
    }

    #[tokio::test]
    async fn mode_changes_update_memberships_and_channel_modes() {
        let lines = format!(
            "{}\
             :Nick!u@h JOIN #Chan\r\n\
             :server 353 Nick = #Chan :@Nick Bob\r\n\
             :server 366 Nick #Chan :End of /NAMES\r\n\
             :Nick!u@h MODE #Chan +ov-o Bob Bob Nick\r\n\
             :Nick!u@h MODE #Chan +kl secret 25\r\n",
            WELCOME
        );
        let (client, mut stream) = connected(&lines).await;
        assert!(
            drive_until(&mut stream, |e| matches!(
                e,
                Event::ChannelModeChange { changes, .. } if changes.iter().any(|c| c.mode == 'k')
            ))
            .await
        );

        let channel = client.channel("#Chan").unwrap();
        let bob = &channel.members["bob"];
        assert!(bob.statuses.contains(&'o'));
        assert!(bob.statuses.contains(&'v'));
        let nick = &channel.members["nick"];
        assert!(!nick.statuses.contains(&'o'));
        assert_eq!(channel.modes.get(&'k'), Some(&Some("secret".to_owned())));
        assert_eq!(channel.modes.get(&'l'), Some(&Some("25".to_owned())));
    }

    #[tokio::test]
    async fn topic_numerics_fill_the_topic() {
        let lines = format!(
            "{}\
             :Nick!u@h JOIN #Chan\r\n\
             :server 332 Nick #Chan :the topic\r\n\
             :server 333 Nick #Chan alice 1600000000\r\n",
            WELCOME
        );
        let (client, mut stream) = connected(&lines).await;
        assert!(drive_until(&mut stream, |e| raw_command_is(e, "333")).await);

        let topic = client.channel("#Chan").unwrap().topic.unwrap();
        assert_eq!(topic.text, "the topic");
        assert_eq!(topic.set_by.as_deref(), Some("alice"));
        assert!(topic.set_at.is_some());
    }

    #[tokio::test]
    async fn split_for_wire_respects_budget() {
        let long_message = "x".repeat(1000);
        let chunks = super::split_for_wire("nick", "#chan", &long_message);
        assert!(chunks.len() > 1);
        for chunk in &chunks {
            assert!(chunk.len() <= 512);
        }
        assert_eq!(chunks.concat(), "x".repeat(1000));
    }

    #[tokio::test(start_paused = true)]
    async fn flood_bucket_delays_but_preserves_order() {
        use crate::client::mock::MockStream;
        use crate::client::transport::Transport;
        use crate::proto::IrcCodec;
        use crate::proto::Message;
        use tokio_util::codec::Decoder;

        let config = Config {
            max_messages_in_burst: Some(2),
            messages_per_second: Some(2),
            ..Default::default()
        };
        let stream = MockStream::new(b"");
        let handle = stream.handle();
        let framed = IrcCodec::new("utf-8").unwrap().framed(stream);
        let mut transport = Transport::new(&config, framed);

        for i in 0..4 {
            let text = format!("message {}", i);
            transport
                .send(Message::new(None, "PRIVMSG", vec!["#chan", &text]))
                .await
                .unwrap();
        }

        let written = String::from_utf8(handle.written()).unwrap();
        let lines: Vec<&str> = written.lines().collect();
        assert_eq!(lines.len(), 4);
        for (i, line) in lines.iter().enumerate() {
            assert!(line.ends_with(&format!("message {}", i)));
        }
    }

    #[tokio::test]
    async fn pings_are_answered_from_inside_the_transport() {
        use crate::client::mock::MockStream;
        use crate::client::transport::Transport;
        use crate::proto::IrcCodec;
        use tokio_util::codec::Decoder;

        let config = Config::default();
        let stream = MockStream::new(b"PING :irc.test.net\r\n");
        let handle = stream.handle();
        let framed = IrcCodec::new("utf-8").unwrap().framed(stream);
        let mut transport = Transport::new(&config, framed);

        let msg = transport.next().await.unwrap().unwrap();
        assert_eq!(msg.command, "PING");
        assert_eq!(
            String::from_utf8(handle.written()).unwrap(),
            "PONG irc.test.net\r\n"
        );
    }

    #[tokio::test(start_paused = true)]
    async fn ping_timeout_is_fatal() {
        use std::pin::Pin;
        use std::task::Poll;

        use crate::client::mock::MockStream;
        use crate::client::transport::Transport;
        use crate::proto::IrcCodec;
        use tokio_util::codec::Decoder;

        let config = Config {
            ping_time: Some(1),
            ping_timeout: Some(1),
            ..Default::default()
        };
        let stream = MockStream::new(b"");
        let handle = stream.handle();
        let framed = IrcCodec::new("utf-8").unwrap().framed(stream);
        let mut transport = Transport::new(&config, framed);

        // Poll the ping machinery by hand: the first poll after the interval
        // fires our PING; once the timeout passes with no PONG, the next
        // poll reports the failure.
        tokio::time::sleep(Duration::from_millis(1100)).await;
        let first =
            futures::future::poll_fn(|cx| Poll::Ready(Pin::new(&mut transport).poll_next(cx)))
                .await;
        assert!(matches!(first, Poll::Ready(None)));
        assert!(String::from_utf8(handle.written()).unwrap().starts_with("PING"));

        tokio::time::sleep(Duration::from_millis(1100)).await;
        let second =
            futures::future::poll_fn(|cx| Poll::Ready(Pin::new(&mut transport).poll_next(cx)))
                .await;
        assert!(matches!(
            second,
            Poll::Ready(Some(Err(Error::PingTimeout)))
        ));
    }
}
