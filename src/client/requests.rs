//! The async request-response matcher.
//!
//! A request is registered *before* its provoking command is written, so the
//! server's reply can never race past it. Matching numerics accumulate into
//! the request's buffer until a terminator or a matched error numeric
//! resolves the one-shot completion slot; which of the three a numeric is
//! comes from the reply numeric table's classification. Dropping or
//! cancelling the caller side removes the request silently.
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use parking_lot::Mutex;
use tokio::sync::oneshot;

use crate::error::Error;
use crate::proto::{CaseMapping, Message, Response, ResponseCategory};

pub(crate) type RequestOutcome = Result<Vec<Message>, Error>;

/// The kinds of aggregated requests the matcher understands.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum RequestKind {
    Whois,
    Who,
    List,
    Names,
    BanList,
    MonitorStatus,
}

impl RequestKind {
    /// Whether this numeric belongs to this request's reply set at all.
    /// What it does to the request, accumulate, terminate, or fail, is
    /// decided by the numeric's `ResponseCategory`.
    fn concerns(self, resp: Response) -> bool {
        use crate::proto::Response::*;
        match self {
            RequestKind::Whois => matches!(
                resp,
                RPL_AWAY
                    | RPL_WHOISREGNICK
                    | RPL_WHOISUSER
                    | RPL_WHOISSERVER
                    | RPL_WHOISOPERATOR
                    | RPL_WHOISIDLE
                    | RPL_WHOISCHANNELS
                    | RPL_WHOISACCOUNT
                    | RPL_WHOISACTUALLY
                    | RPL_WHOISSECURE
                    | RPL_ENDOFWHOIS
                    | ERR_NOSUCHNICK
                    | ERR_NOSUCHSERVER
            ),
            RequestKind::Who => {
                matches!(resp, RPL_WHOREPLY | RPL_WHOSPCRPL | RPL_ENDOFWHO | RPL_TRYAGAIN)
            }
            RequestKind::List => {
                matches!(resp, RPL_LISTSTART | RPL_LIST | RPL_LISTEND | RPL_TRYAGAIN)
            }
            RequestKind::Names => matches!(
                resp,
                RPL_NAMREPLY | RPL_ENDOFNAMES | ERR_NOSUCHNICK | ERR_NOSUCHCHANNEL
            ),
            RequestKind::BanList => matches!(
                resp,
                RPL_BANLIST
                    | RPL_ENDOFBANLIST
                    | ERR_NOSUCHCHANNEL
                    | ERR_NOTONCHANNEL
                    | ERR_BADCHANNAME
                    | ERR_CHANOPRIVSNEEDED
            ),
            RequestKind::MonitorStatus => {
                matches!(resp, RPL_MONLIST | RPL_ENDOFMONLIST | ERR_MONLISTFULL)
            }
        }
    }
}

/// Which parameter names the request target in a given numeric, when one
/// does.
fn target_param(resp: Response, msg: &Message) -> Option<&str> {
    use crate::proto::Response::*;
    match resp {
        RPL_NAMREPLY => msg.param(2),
        RPL_TRYAGAIN | RPL_LISTSTART | RPL_LIST | RPL_LISTEND | RPL_MONLIST
        | RPL_ENDOFMONLIST | ERR_MONLISTFULL => None,
        _ => msg.param(1),
    }
}

struct Entry {
    id: u64,
    kind: RequestKind,
    /// Case-folded target, or empty for target-less request kinds.
    target: String,
    buf: Vec<Message>,
    tx: oneshot::Sender<RequestOutcome>,
}

enum Action {
    Accumulate,
    Terminate,
    Fail,
}

/// The pending-request registry. Entries are kept in registration order, so
/// when several requests of one kind are outstanding, the oldest wins.
#[derive(Default)]
pub(crate) struct PendingRequests {
    next_id: u64,
    entries: Vec<Entry>,
}

impl PendingRequests {
    pub fn register(
        &mut self,
        kind: RequestKind,
        target: String,
    ) -> (u64, oneshot::Receiver<RequestOutcome>) {
        let (tx, rx) = oneshot::channel();
        let id = self.next_id;
        self.next_id += 1;
        self.entries.push(Entry {
            id,
            kind,
            target,
            buf: Vec::new(),
            tx,
        });
        (id, rx)
    }

    /// Removes a request without resolving it.
    pub fn cancel(&mut self, id: u64) {
        self.entries.retain(|entry| entry.id != id);
    }

    /// Offers one inbound numeric to the registry.
    pub fn handle(&mut self, msg: &Message, cm: CaseMapping) {
        let resp = match msg.response() {
            Some(resp) => resp,
            None => return,
        };

        // Callers that dropped their receiver cancelled implicitly; their
        // entries must not shadow younger requests of the same kind.
        self.entries.retain(|entry| !entry.tx.is_closed());

        // The reply numeric table decides what a matched numeric does.
        let action = match resp.category() {
            ResponseCategory::Error => Action::Fail,
            ResponseCategory::EndMarker => Action::Terminate,
            _ => Action::Accumulate,
        };

        let mut matched = None;
        for (i, entry) in self.entries.iter().enumerate() {
            if !entry.kind.concerns(resp) {
                continue;
            }
            if !entry.target.is_empty() {
                if let Some(target) = target_param(resp, msg) {
                    if cm.fold(target) != entry.target {
                        continue;
                    }
                }
            }
            matched = Some(i);
            break;
        }

        let i = match matched {
            Some(i) => i,
            None => return,
        };
        match action {
            Action::Accumulate => self.entries[i].buf.push(msg.clone()),
            Action::Terminate => {
                let entry = self.entries.remove(i);
                let mut buf = entry.buf;
                buf.push(msg.clone());
                let _ = entry.tx.send(Ok(buf));
            }
            Action::Fail => {
                let entry = self.entries.remove(i);
                let _ = entry.tx.send(Err(Error::AsyncRequestError {
                    response: msg.clone(),
                }));
            }
        }
    }

    /// Fails every outstanding request; used on disconnect.
    pub fn fail_all(&mut self) {
        for entry in self.entries.drain(..) {
            let _ = entry.tx.send(Err(Error::Disconnected));
        }
    }
}

/// An in-flight aggregated request. Awaiting it yields the parsed result;
/// [`cancel`] withdraws it so later matching numerics are ignored.
///
/// [`cancel`]: #method.cancel
pub struct PendingReply<T> {
    rx: oneshot::Receiver<RequestOutcome>,
    parse: fn(Vec<Message>) -> Result<T, Error>,
    registry: Arc<Mutex<PendingRequests>>,
    id: u64,
    cancelled: bool,
}

impl<T> PendingReply<T> {
    pub(crate) fn new(
        rx: oneshot::Receiver<RequestOutcome>,
        parse: fn(Vec<Message>) -> Result<T, Error>,
        registry: Arc<Mutex<PendingRequests>>,
        id: u64,
    ) -> PendingReply<T> {
        PendingReply {
            rx,
            parse,
            registry,
            id,
            cancelled: false,
        }
    }

    /// Cancels the request. The registry entry is removed silently and the
    /// future resolves with `Cancelled`.
    pub fn cancel(&mut self) {
        if !self.cancelled {
            self.cancelled = true;
            self.registry.lock().cancel(self.id);
        }
    }
}

impl<T> Future for PendingReply<T> {
    type Output = Result<T, Error>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();
        if this.cancelled {
            return Poll::Ready(Err(Error::Cancelled));
        }
        match Pin::new(&mut this.rx).poll(cx) {
            Poll::Ready(Ok(outcome)) => Poll::Ready(outcome.and_then(this.parse)),
            // The registry went away wholesale; only disconnection does that.
            Poll::Ready(Err(_)) => Poll::Ready(Err(Error::Disconnected)),
            Poll::Pending => Poll::Pending,
        }
    }
}

/// An aggregated WHOIS result.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Whois {
    /// The nickname the reply describes.
    pub nickname: String,
    /// The target's ident.
    pub username: Option<String>,
    /// The target's host.
    pub hostname: Option<String>,
    /// The target's real name.
    pub realname: Option<String>,
    /// The server the target is connected to.
    pub server: Option<String>,
    /// The server's description line.
    pub server_info: Option<String>,
    /// Whether the target is an operator.
    pub operator: bool,
    /// Seconds the target has been idle.
    pub idle_secs: Option<u64>,
    /// The channels the target is visible in, with status prefixes intact.
    pub channels: Vec<String>,
    /// The account the target is logged into.
    pub account: Option<String>,
    /// Whether the target uses a secure connection.
    pub secure: bool,
    /// The away message, when the target is away.
    pub away_message: Option<String>,
}

pub(crate) fn parse_whois(buf: Vec<Message>) -> Result<Whois, Error> {
    let mut whois = Whois::default();
    for msg in &buf {
        if whois.nickname.is_empty() {
            if let Some(nick) = msg.param(1) {
                whois.nickname = nick.to_owned();
            }
        }
        match msg.response() {
            Some(Response::RPL_WHOISUSER) => {
                whois.username = msg.param(2).map(|s| s.to_owned());
                whois.hostname = msg.param(3).map(|s| s.to_owned());
                whois.realname = msg.param(5).map(|s| s.to_owned());
            }
            Some(Response::RPL_WHOISSERVER) => {
                whois.server = msg.param(2).map(|s| s.to_owned());
                whois.server_info = msg.param(3).map(|s| s.to_owned());
            }
            Some(Response::RPL_WHOISOPERATOR) => whois.operator = true,
            Some(Response::RPL_WHOISIDLE) => {
                whois.idle_secs = msg.param(2).and_then(|s| s.parse().ok());
            }
            Some(Response::RPL_WHOISCHANNELS) => {
                if let Some(channels) = msg.param(2) {
                    whois
                        .channels
                        .extend(channels.split(' ').filter(|c| !c.is_empty()).map(String::from));
                }
            }
            Some(Response::RPL_WHOISACCOUNT) => {
                whois.account = msg.param(2).map(|s| s.to_owned());
            }
            Some(Response::RPL_WHOISSECURE) => whois.secure = true,
            Some(Response::RPL_AWAY) => {
                whois.away_message = msg.param(2).map(|s| s.to_owned());
            }
            _ => {}
        }
    }
    Ok(whois)
}

/// One WHO reply line.
#[derive(Clone, Debug, PartialEq)]
pub struct WhoEntry {
    /// The channel context, or `*`.
    pub channel: String,
    /// The target's ident.
    pub username: String,
    /// The target's host.
    pub hostname: String,
    /// The server the target is connected to.
    pub server: String,
    /// The target's nickname.
    pub nickname: String,
    /// Whether the target is away.
    pub away: bool,
    /// Whether the target is an operator.
    pub oper: bool,
    /// Hop count, when the server provided one.
    pub hops: Option<u32>,
    /// The target's real name.
    pub realname: String,
}

pub(crate) fn parse_who(buf: Vec<Message>) -> Result<Vec<WhoEntry>, Error> {
    let mut entries = Vec::new();
    for msg in &buf {
        if msg.response() != Some(Response::RPL_WHOREPLY) || msg.params.len() < 8 {
            continue;
        }
        let flags = &msg.params[6];
        let (hops, realname) = match msg.params[7].split_once(' ') {
            Some((hops, realname)) => (hops.parse().ok(), realname.to_owned()),
            None => (None, msg.params[7].clone()),
        };
        entries.push(WhoEntry {
            channel: msg.params[1].clone(),
            username: msg.params[2].clone(),
            hostname: msg.params[3].clone(),
            server: msg.params[4].clone(),
            nickname: msg.params[5].clone(),
            away: flags.contains('G'),
            oper: flags.contains('*'),
            hops,
            realname,
        });
    }
    Ok(entries)
}

/// One LIST reply line.
#[derive(Clone, Debug, PartialEq)]
pub struct ChannelListing {
    /// The channel name.
    pub name: String,
    /// The advertised number of visible users.
    pub visible: u32,
    /// The channel topic.
    pub topic: String,
}

pub(crate) fn parse_list(buf: Vec<Message>) -> Result<Vec<ChannelListing>, Error> {
    let mut listings = Vec::new();
    for msg in &buf {
        if msg.response() != Some(Response::RPL_LIST) {
            continue;
        }
        if let Some(name) = msg.param(1) {
            listings.push(ChannelListing {
                name: name.to_owned(),
                visible: msg.param(2).and_then(|s| s.parse().ok()).unwrap_or(0),
                topic: msg.param(3).unwrap_or("").to_owned(),
            });
        }
    }
    Ok(listings)
}

/// One ban-list entry.
#[derive(Clone, Debug, PartialEq)]
pub struct BanMask {
    /// The banned mask.
    pub mask: String,
    /// Who set the ban, when the server reports it.
    pub set_by: Option<String>,
    /// The Unix time the ban was set, when reported.
    pub set_at: Option<i64>,
}

pub(crate) fn parse_banlist(buf: Vec<Message>) -> Result<Vec<BanMask>, Error> {
    let mut masks = Vec::new();
    for msg in &buf {
        if msg.response() != Some(Response::RPL_BANLIST) {
            continue;
        }
        if let Some(mask) = msg.param(2) {
            masks.push(BanMask {
                mask: mask.to_owned(),
                set_by: msg.param(3).map(|s| s.to_owned()),
                set_at: msg.param(4).and_then(|s| s.parse().ok()),
            });
        }
    }
    Ok(masks)
}

pub(crate) fn parse_names(buf: Vec<Message>) -> Result<Vec<String>, Error> {
    let mut names = Vec::new();
    for msg in &buf {
        if msg.response() != Some(Response::RPL_NAMREPLY) {
            continue;
        }
        if let Some(tokens) = msg.param(3) {
            names.extend(
                tokens
                    .split(' ')
                    .filter(|t| !t.is_empty())
                    .map(String::from),
            );
        }
    }
    Ok(names)
}

pub(crate) fn parse_monitor_list(buf: Vec<Message>) -> Result<Vec<String>, Error> {
    let mut nicks = Vec::new();
    for msg in &buf {
        if msg.response() != Some(Response::RPL_MONLIST) {
            continue;
        }
        if let Some(targets) = msg.param(1) {
            nicks.extend(
                targets
                    .split(',')
                    .filter(|t| !t.is_empty())
                    .map(|t| t.split('!').next().unwrap_or(t).to_owned()),
            );
        }
    }
    Ok(nicks)
}

#[cfg(test)]
mod test {
    use super::{PendingRequests, RequestKind};
    use crate::error::Error;
    use crate::proto::{CaseMapping, Message};

    fn msg(line: &str) -> Message {
        line.parse().unwrap()
    }

    #[test]
    fn accumulates_then_terminates() {
        let mut pending = PendingRequests::default();
        let (_, mut rx) = pending.register(RequestKind::Whois, "bob".into());

        let cm = CaseMapping::Rfc1459;
        pending.handle(&msg(":s 311 me Bob ident host * :Bob B."), cm);
        pending.handle(&msg(":s 312 me Bob srv :the server"), cm);
        pending.handle(&msg(":s 318 me Bob :End of WHOIS"), cm);

        let buf = rx.try_recv().unwrap().unwrap();
        assert_eq!(buf.len(), 3);
    }

    #[test]
    fn error_numeric_fails_the_request() {
        let mut pending = PendingRequests::default();
        let (_, mut rx) = pending.register(RequestKind::Whois, "bob".into());
        pending.handle(
            &msg(":s 401 me Bob :No such nick"),
            CaseMapping::Rfc1459,
        );
        match rx.try_recv().unwrap() {
            Err(Error::AsyncRequestError { response }) => assert_eq!(response.command, "401"),
            other => panic!("unexpected outcome: {:?}", other.map(|b| b.len())),
        }
    }

    #[test]
    fn try_again_fails_the_request() {
        let mut pending = PendingRequests::default();
        let (_, mut rx) = pending.register(RequestKind::List, String::new());
        pending.handle(
            &msg(":s 263 me LIST :Please wait a while and try again."),
            CaseMapping::Rfc1459,
        );
        assert!(matches!(
            rx.try_recv().unwrap(),
            Err(Error::AsyncRequestError { .. })
        ));
    }

    #[test]
    fn target_matching_is_case_folded() {
        let mut pending = PendingRequests::default();
        let (_, mut rx) = pending.register(RequestKind::Whois, "nick{a}".into());
        pending.handle(
            &msg(":s 318 me NICK[A] :End of WHOIS"),
            CaseMapping::Rfc1459,
        );
        assert!(rx.try_recv().unwrap().is_ok());
    }

    #[test]
    fn oldest_request_of_a_kind_wins() {
        let mut pending = PendingRequests::default();
        let (_, mut first) = pending.register(RequestKind::List, String::new());
        let (_, mut second) = pending.register(RequestKind::List, String::new());

        pending.handle(&msg(":s 323 me :End of LIST"), CaseMapping::Rfc1459);
        assert!(first.try_recv().unwrap().is_ok());
        assert!(second.try_recv().is_err());
    }

    #[test]
    fn mismatched_targets_are_ignored() {
        let mut pending = PendingRequests::default();
        let (_, mut rx) = pending.register(RequestKind::Whois, "bob".into());
        pending.handle(&msg(":s 318 me carol :End of WHOIS"), CaseMapping::Rfc1459);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn dropped_receivers_are_pruned() {
        let mut pending = PendingRequests::default();
        let (_, rx) = pending.register(RequestKind::List, String::new());
        drop(rx);
        let (_, mut live) = pending.register(RequestKind::List, String::new());
        pending.handle(&msg(":s 323 me :End of LIST"), CaseMapping::Rfc1459);
        assert!(live.try_recv().unwrap().is_ok());
    }

    #[test]
    fn fail_all_reports_disconnection() {
        let mut pending = PendingRequests::default();
        let (_, mut rx) = pending.register(RequestKind::Who, "#chan".into());
        pending.fail_all();
        assert!(matches!(
            rx.try_recv().unwrap(),
            Err(Error::Disconnected)
        ));
    }
}
