//! An IRC transport that wraps an IRC-framed stream to provide a number of
//! features including automatic PING replies, automatic sending of PINGs,
//! and flood protection.
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;

use chrono::prelude::*;
use futures_util::{ready, Sink, Stream};
use parking_lot::RwLock;
use pin_project::pin_project;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::time::{self, Instant, Interval, Sleep};
use tokio_util::codec::Framed;

use crate::client::data::Config;
use crate::error;
use crate::proto::{IrcCodec, Message};

/// An IRC transport that handles core functionality for the client.
///
/// Outbound messages pass through a token bucket: a configurable burst
/// allowance refilled at a sustained line rate. PING and PONG are exempt
/// from the accounting; replies to server PINGs are written here directly,
/// ahead of whatever the application has queued.
#[pin_project]
pub struct Transport<T> {
    #[pin]
    inner: Framed<T, IrcCodec>,
    burst_capacity: f64,
    tokens: f64,
    refill_per_sec: f64,
    last_refill: Instant,
    rate_delay: Option<Pin<Box<Sleep>>>,
    ping_interval: Interval,
    ping_timeout: Duration,
    last_ping_data: String,
    last_ping_sent: Option<Instant>,
    last_pong_received: Option<Instant>,
}

impl<T> Transport<T>
where
    T: AsyncRead + AsyncWrite + Unpin,
{
    /// Creates a new `Transport` from the given framed stream.
    pub fn new(config: &Config, inner: Framed<T, IrcCodec>) -> Transport<T> {
        let ping_time = Duration::from_secs(u64::from(config.ping_time()));
        Transport {
            inner,
            burst_capacity: f64::from(config.max_messages_in_burst()),
            tokens: f64::from(config.max_messages_in_burst()),
            refill_per_sec: f64::from(config.messages_per_second()),
            last_refill: Instant::now(),
            rate_delay: None,
            ping_interval: time::interval_at(Instant::now() + ping_time, ping_time),
            ping_timeout: Duration::from_secs(u64::from(config.ping_timeout())),
            last_ping_data: String::new(),
            last_ping_sent: None,
            last_pong_received: None,
        }
    }

    /// Gets the inner stream underlying the `Transport`.
    pub fn into_inner(self) -> Framed<T, IrcCodec> {
        self.inner
    }

    fn ping_timed_out(&self) -> bool {
        let sent = match self.last_ping_sent {
            Some(sent) => sent,
            None => return false,
        };
        let answered = match self.last_pong_received {
            Some(received) => received >= sent,
            None => false,
        };
        !answered && sent.elapsed() >= self.ping_timeout
    }
}

impl<T> Stream for Transport<T>
where
    T: AsyncRead + AsyncWrite + Unpin,
{
    type Item = error::Result<Message>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        if self.ping_timed_out() {
            return Poll::Ready(Some(Err(error::Error::PingTimeout)));
        }

        let mut this = self.project();

        // Keep the connection alive from our side.
        if this.ping_interval.poll_tick(cx).is_ready() {
            let data = Local::now().timestamp().to_string();
            let ping = Message::new(None, "PING", vec![&data]);
            if this.inner.as_mut().poll_ready(cx)?.is_ready() {
                this.inner.as_mut().start_send(ping)?;
                let _ = this.inner.as_mut().poll_flush(cx)?;
                *this.last_ping_sent = Some(Instant::now());
                *this.last_ping_data = data;
            }
        }

        match ready!(this.inner.as_mut().poll_next(cx)) {
            Some(Ok(msg)) => {
                match msg.command.as_str() {
                    // Answer server PINGs without involving the application
                    // queue; these jump ahead of any throttled traffic.
                    "PING" => {
                        let params: Vec<&str> = msg.params.iter().map(|p| &p[..]).collect();
                        let pong = Message::new(None, "PONG", params);
                        if this.inner.as_mut().poll_ready(cx)?.is_ready() {
                            this.inner.as_mut().start_send(pong)?;
                            let _ = this.inner.as_mut().poll_flush(cx)?;
                        }
                    }
                    "PONG" => {
                        if msg
                            .params
                            .iter()
                            .any(|p| p.as_str() == this.last_ping_data.as_str())
                        {
                            *this.last_pong_received = Some(Instant::now());
                        }
                    }
                    _ => (),
                }
                Poll::Ready(Some(Ok(msg)))
            }
            Some(Err(e)) => Poll::Ready(Some(Err(e.into()))),
            None => Poll::Ready(None),
        }
    }
}

impl<T> Sink<Message> for Transport<T>
where
    T: AsyncRead + AsyncWrite + Unpin,
{
    type Error = error::Error;

    fn poll_ready(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        if self.ping_timed_out() {
            return Poll::Ready(Err(error::Error::PingTimeout));
        }

        let this = self.project();

        loop {
            let now = Instant::now();
            let elapsed = now.duration_since(*this.last_refill).as_secs_f64();
            *this.tokens =
                (*this.tokens + elapsed * *this.refill_per_sec).min(*this.burst_capacity);
            *this.last_refill = now;

            if *this.tokens >= 1.0 {
                *this.rate_delay = None;
                break;
            }

            let wait = Duration::from_secs_f64((1.0 - *this.tokens) / *this.refill_per_sec)
                + Duration::from_millis(1);
            let deadline = now + wait;
            let delay = this
                .rate_delay
                .get_or_insert_with(|| Box::pin(time::sleep_until(deadline)));
            delay.as_mut().reset(deadline);
            ready!(delay.as_mut().poll(cx));
            *this.rate_delay = None;
        }

        this.inner.poll_ready(cx).map_err(Into::into)
    }

    fn start_send(self: Pin<&mut Self>, item: Message) -> Result<(), Self::Error> {
        let this = self.project();
        if item.command != "PING" && item.command != "PONG" {
            *this.tokens = (*this.tokens - 1.0).max(0.0);
        }
        this.inner.start_send(item).map_err(Into::into)
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.project().inner.poll_flush(cx).map_err(Into::into)
    }

    fn poll_close(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.project().inner.poll_close(cx).map_err(Into::into)
    }
}

/// A view of the logs from a particular `Logged` transport.
#[derive(Clone, Debug)]
pub struct LogView {
    sent: Arc<RwLock<Vec<Message>>>,
    received: Arc<RwLock<Vec<Message>>>,
}

impl LogView {
    /// Gets a copy of all the messages sent on the transport so far.
    pub fn sent(&self) -> Vec<Message> {
        self.sent.read().clone()
    }

    /// Gets a copy of all the messages received on the transport so far.
    pub fn received(&self) -> Vec<Message> {
        self.received.read().clone()
    }
}

/// A logged version of the `Transport` that records all sent and received
/// messages. Note: this will introduce some performance overhead by cloning
/// all messages.
#[pin_project]
pub struct Logged<T> {
    #[pin]
    inner: Transport<T>,
    view: LogView,
}

impl<T> Logged<T>
where
    T: AsyncRead + AsyncWrite + Unpin,
{
    /// Wraps the given `Transport` in logging.
    pub fn wrap(inner: Transport<T>) -> Logged<T> {
        Logged {
            inner,
            view: LogView {
                sent: Arc::new(RwLock::new(vec![])),
                received: Arc::new(RwLock::new(vec![])),
            },
        }
    }

    /// Gets a view of the logging for this transport.
    pub fn view(&self) -> LogView {
        self.view.clone()
    }
}

impl<T> Stream for Logged<T>
where
    T: AsyncRead + AsyncWrite + Unpin,
{
    type Item = error::Result<Message>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.project();
        match ready!(this.inner.poll_next(cx)) {
            Some(Ok(msg)) => {
                this.view.received.write().push(msg.clone());
                Poll::Ready(Some(Ok(msg)))
            }
            other => Poll::Ready(other),
        }
    }
}

impl<T> Sink<Message> for Logged<T>
where
    T: AsyncRead + AsyncWrite + Unpin,
{
    type Error = error::Error;

    fn poll_ready(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.project().inner.poll_ready(cx)
    }

    fn start_send(self: Pin<&mut Self>, item: Message) -> Result<(), Self::Error> {
        let this = self.project();
        this.view.sent.write().push(item.clone());
        this.inner.start_send(item)
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.project().inner.poll_flush(cx)
    }

    fn poll_close(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.project().inner.poll_close(cx)
    }
}
