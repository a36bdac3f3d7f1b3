//! Enumeration of the IRCv3 capability extensions the client negotiates.
use std::str::FromStr;
use std::string;

/// An IRCv3 capability extension from the
/// [IRCv3 specifications](https://ircv3.net/irc/).
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Capability {
    /// [multi-prefix](https://ircv3.net/specs/extensions/multi-prefix)
    MultiPrefix,
    /// [sasl](https://ircv3.net/specs/extensions/sasl-3.1)
    Sasl,
    /// [account-notify](https://ircv3.net/specs/extensions/account-notify)
    AccountNotify,
    /// [extended-join](https://ircv3.net/specs/extensions/extended-join)
    ExtendedJoin,
    /// [userhost-in-names](https://ircv3.net/specs/extensions/userhost-in-names)
    UserhostInNames,
    /// [away-notify](https://ircv3.net/specs/extensions/away-notify)
    AwayNotify,
    /// [chghost](https://ircv3.net/specs/extensions/chghost)
    ChgHost,
    /// Any other capability extension.
    Custom(String),
}

impl AsRef<str> for Capability {
    fn as_ref(&self) -> &str {
        match self {
            Capability::MultiPrefix => "multi-prefix",
            Capability::Sasl => "sasl",
            Capability::AccountNotify => "account-notify",
            Capability::ExtendedJoin => "extended-join",
            Capability::UserhostInNames => "userhost-in-names",
            Capability::AwayNotify => "away-notify",
            Capability::ChgHost => "chghost",
            Capability::Custom(s) => s,
        }
    }
}

impl FromStr for Capability {
    type Err = string::ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "multi-prefix" => Capability::MultiPrefix,
            "sasl" => Capability::Sasl,
            "account-notify" => Capability::AccountNotify,
            "extended-join" => Capability::ExtendedJoin,
            "userhost-in-names" => Capability::UserhostInNames,
            "away-notify" => Capability::AwayNotify,
            "chghost" => Capability::ChgHost,
            other => Capability::Custom(other.to_owned()),
        })
    }
}

/// IRCv3 capability negotiation versions.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NegotiationVersion {
    /// [IRCv3.1](https://ircv3.net/specs/extensions/capability-negotiation)
    V301,
    /// [IRCv3.2](https://ircv3.net/specs/extensions/capability-negotiation)
    V302,
}

#[cfg(test)]
mod test {
    use super::Capability::*;

    #[test]
    fn to_str() {
        assert_eq!(MultiPrefix.as_ref(), "multi-prefix");
        assert_eq!(Sasl.as_ref(), "sasl");
        assert_eq!(AccountNotify.as_ref(), "account-notify");
        assert_eq!(ExtendedJoin.as_ref(), "extended-join");
        assert_eq!(UserhostInNames.as_ref(), "userhost-in-names");
        assert_eq!(Custom("example".into()).as_ref(), "example");
    }

    #[test]
    fn round_trip() {
        for name in &["multi-prefix", "sasl", "account-notify", "server-time"] {
            let cap: super::Capability = name.parse().unwrap();
            assert_eq!(&cap.as_ref(), name);
        }
    }
}
