//! A usable, async IRC session library for Rust.
//!
//! The crate is split in two: [`proto`] distills the wire protocol
//! (messages, numerics, ISUPPORT, case mapping), while [`client`] maintains
//! a live session on top of it: registration and capability negotiation,
//! state tracking for users and channels, request/response matching, a
//! monitor list, and flood-controlled output.
//!
//! ```no_run
//! use banter::client::prelude::*;
//! use futures_util::stream::StreamExt;
//!
//! # async fn run() -> banter::error::Result<()> {
//! let config = Config {
//!     nickname: Some("ferris".to_owned()),
//!     server: Some("irc.example.com".to_owned()),
//!     channels: vec!["#rust".to_owned()],
//!     ..Default::default()
//! };
//!
//! let mut client = Client::from_config(config).await?;
//! client.identify()?;
//! let mut stream = client.stream()?;
//!
//! while let Some(event) = stream.next().await.transpose()? {
//!     if let Event::Privmsg { target, text, .. } = event {
//!         if text.contains("hello") {
//!             client.send_privmsg(&target, "hi there")?;
//!         }
//!     }
//! }
//! # Ok(())
//! # }
//! ```
//!
//! [`proto`]: ../banter_proto/index.html
//! [`client`]: client/index.html

#![warn(missing_docs)]

pub mod client;
pub mod error;

pub use banter_proto as proto;
