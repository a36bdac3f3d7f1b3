//! A module providing IRC connections for use by `Client`s.
use std::{
    fmt,
    pin::Pin,
    task::{Context, Poll},
};

use futures_util::{sink::Sink, stream::Stream};
use tokio::net::TcpStream;
use tokio_util::codec::Decoder;

#[cfg(feature = "tls-native")]
use tokio_native_tls::{self, TlsStream};

use crate::{
    client::{
        data::Config,
        mock::MockStream,
        transport::{LogView, Logged, Transport},
    },
    error,
    proto::{IrcCodec, Message},
};

/// An IRC connection used internally by `Client`.
pub enum Connection {
    #[doc(hidden)]
    Unsecured(Transport<TcpStream>),
    #[cfg(feature = "tls-native")]
    #[doc(hidden)]
    Secured(Transport<TlsStream<TcpStream>>),
    #[doc(hidden)]
    Mock(Logged<MockStream>),
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{}",
            match *self {
                Connection::Unsecured(_) => "Connection::Unsecured(...)",
                #[cfg(feature = "tls-native")]
                Connection::Secured(_) => "Connection::Secured(...)",
                Connection::Mock(_) => "Connection::Mock(...)",
            }
        )
    }
}

impl Connection {
    /// Creates a new `Connection` using the specified `Config`.
    pub(crate) async fn new(config: &Config) -> error::Result<Connection> {
        if config.use_mock_connection() {
            use encoding::{label::encoding_from_whatwg_label, EncoderTrap};

            let encoding = encoding_from_whatwg_label(config.encoding()).ok_or_else(|| {
                error::Error::UnknownCodec {
                    codec: config.encoding().to_owned(),
                }
            })?;

            let init_str = config.mock_initial_value();
            let initial =
                encoding
                    .encode(init_str, EncoderTrap::Replace)
                    .map_err(|_| error::Error::UnknownCodec {
                        codec: encoding.name().to_owned(),
                    })?;

            let stream = MockStream::new(&initial);
            let framed = IrcCodec::new(config.encoding())?.framed(stream);
            let transport = Transport::new(config, framed);
            return Ok(Connection::Mock(Logged::wrap(transport)));
        }

        let socket = Self::new_socket(config).await?;

        if config.use_tls() {
            Self::wrap_tls(config, socket).await
        } else {
            let framed = IrcCodec::new(config.encoding())?.framed(socket);
            Ok(Connection::Unsecured(Transport::new(config, framed)))
        }
    }

    async fn new_socket(config: &Config) -> error::Result<TcpStream> {
        let server = config.server()?;
        let port = config.port();

        log::info!(
            "Connecting to {}:{} (tls: {})",
            server,
            port,
            config.use_tls()
        );

        Ok(TcpStream::connect((server, port)).await?)
    }

    #[cfg(feature = "tls-native")]
    async fn wrap_tls(config: &Config, socket: TcpStream) -> error::Result<Connection> {
        let connector: tokio_native_tls::TlsConnector =
            native_tls::TlsConnector::builder().build()?.into();
        let stream = connector
            .connect(config.server()?, socket)
            .await
            .map_err(error::Error::Tls)?;
        let framed = IrcCodec::new(config.encoding())?.framed(stream);
        Ok(Connection::Secured(Transport::new(config, framed)))
    }

    #[cfg(not(feature = "tls-native"))]
    async fn wrap_tls(_config: &Config, _socket: TcpStream) -> error::Result<Connection> {
        Err(error::Error::TlsNotCompiled)
    }

    /// Gets a view of the internal logging if and only if this connection is
    /// using a mock stream. Otherwise, this will always return `None`. This
    /// is used for unit testing.
    pub fn log_view(&self) -> Option<LogView> {
        match self {
            Connection::Mock(inner) => Some(inner.view()),
            _ => None,
        }
    }
}

impl Stream for Connection {
    type Item = error::Result<Message>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        match &mut *self {
            Connection::Unsecured(inner) => Pin::new(inner).poll_next(cx),
            #[cfg(feature = "tls-native")]
            Connection::Secured(inner) => Pin::new(inner).poll_next(cx),
            Connection::Mock(inner) => Pin::new(inner).poll_next(cx),
        }
    }
}

impl Sink<Message> for Connection {
    type Error = error::Error;

    fn poll_ready(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        match &mut *self {
            Connection::Unsecured(inner) => Pin::new(inner).poll_ready(cx),
            #[cfg(feature = "tls-native")]
            Connection::Secured(inner) => Pin::new(inner).poll_ready(cx),
            Connection::Mock(inner) => Pin::new(inner).poll_ready(cx),
        }
    }

    fn start_send(mut self: Pin<&mut Self>, item: Message) -> Result<(), Self::Error> {
        match &mut *self {
            Connection::Unsecured(inner) => Pin::new(inner).start_send(item),
            #[cfg(feature = "tls-native")]
            Connection::Secured(inner) => Pin::new(inner).start_send(item),
            Connection::Mock(inner) => Pin::new(inner).start_send(item),
        }
    }

    fn poll_flush(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        match &mut *self {
            Connection::Unsecured(inner) => Pin::new(inner).poll_flush(cx),
            #[cfg(feature = "tls-native")]
            Connection::Secured(inner) => Pin::new(inner).poll_flush(cx),
            Connection::Mock(inner) => Pin::new(inner).poll_flush(cx),
        }
    }

    fn poll_close(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        match &mut *self {
            Connection::Unsecured(inner) => Pin::new(inner).poll_close(cx),
            #[cfg(feature = "tls-native")]
            Connection::Secured(inner) => Pin::new(inner).poll_close(cx),
            Connection::Mock(inner) => Pin::new(inner).poll_close(cx),
        }
    }
}
