//! A client-side IRC prelude, re-exporting all the necessary basics.
pub use crate::client::data::Config;
pub use crate::client::event::Event;
pub use crate::client::requests::{BanMask, ChannelListing, PendingReply, WhoEntry, Whois};
pub use crate::client::state::{Channel, ChannelUser, Topic, User};
pub use crate::client::{Client, ClientStream, Sender, SessionState};
pub use crate::proto::{
    Capability, CaseMapping, ChannelExt, Isupport, Message, Prefix, Response,
};
