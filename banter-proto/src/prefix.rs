//! A module providing an enum for a message prefix.
use std::fmt;
use std::str::FromStr;
use std::string;

/// The prefix indicates the true origin of a message, according to the server.
#[derive(Clone, Eq, PartialEq, Debug)]
pub enum Prefix {
    /// servername
    ServerName(String),
    /// nickname [ ["!" username] "@" hostname ]
    Nickname(String, String, String),
}

impl Prefix {
    /// Creates a prefix by parsing a string.
    ///
    /// A word containing a `.` before any `!` is taken to be a server name;
    /// everything else is a user prefix whose username and hostname fields may
    /// be empty.
    ///
    /// # Example
    /// ```
    /// # use banter_proto::Prefix;
    /// Prefix::new_from_str("nickname!username@hostname");
    /// Prefix::new_from_str("irc.example.com");
    /// ```
    pub fn new_from_str(s: &str) -> Prefix {
        match s.split_once('!') {
            Some((nick, rest)) => match rest.split_once('@') {
                Some((user, host)) => {
                    Prefix::Nickname(nick.to_owned(), user.to_owned(), host.to_owned())
                }
                None => Prefix::Nickname(nick.to_owned(), rest.to_owned(), String::new()),
            },
            None if s.contains('.') => Prefix::ServerName(s.to_owned()),
            None => match s.split_once('@') {
                Some((nick, host)) => {
                    Prefix::Nickname(nick.to_owned(), String::new(), host.to_owned())
                }
                None => Prefix::Nickname(s.to_owned(), String::new(), String::new()),
            },
        }
    }

    /// Returns the nickname of a user prefix, or `None` for a server prefix.
    pub fn nickname(&self) -> Option<&str> {
        match self {
            Prefix::ServerName(_) => None,
            Prefix::Nickname(nick, _, _) => Some(nick),
        }
    }
}

/// This implementation never returns an error and is isomorphic with `Display`.
impl FromStr for Prefix {
    type Err = string::ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Prefix::new_from_str(s))
    }
}

/// This is isomorphic with `FromStr`.
impl fmt::Display for Prefix {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Prefix::ServerName(name) => write!(f, "{}", name),
            Prefix::Nickname(name, user, host) => {
                write!(f, "{}", name)?;
                if !user.is_empty() {
                    write!(f, "!{}", user)?;
                }
                if !host.is_empty() {
                    write!(f, "@{}", host)?;
                }
                Ok(())
            }
        }
    }
}

impl<'a> From<&'a str> for Prefix {
    fn from(s: &str) -> Self {
        Prefix::new_from_str(s)
    }
}

#[cfg(test)]
mod test {
    use super::Prefix::{self, Nickname, ServerName};

    // Checks that str -> parsed -> Display doesn't lose data.
    fn test_parse(s: &str) -> Prefix {
        let prefix = Prefix::new_from_str(s);
        assert_eq!(s, &format!("{}", prefix));
        prefix
    }

    #[test]
    fn parse_word() {
        assert_eq!(
            test_parse("only_nick"),
            Nickname("only_nick".into(), String::new(), String::new())
        )
    }

    #[test]
    fn parse_server() {
        assert_eq!(test_parse("irc.host.tld"), ServerName("irc.host.tld".into()))
    }

    #[test]
    fn parse_nick_user() {
        assert_eq!(
            test_parse("test!user"),
            Nickname("test".into(), "user".into(), String::new())
        )
    }

    #[test]
    fn parse_nick_user_host() {
        assert_eq!(
            test_parse("test!user@host"),
            Nickname("test".into(), "user".into(), "host".into())
        )
    }

    #[test]
    fn parse_nick_host_without_user() {
        assert_eq!(
            test_parse("test@host"),
            Nickname("test".into(), String::new(), "host".into())
        )
    }

    #[test]
    fn parse_danger_cases() {
        assert_eq!(
            test_parse("name@name!user"),
            Nickname("name@name".into(), "user".into(), String::new())
        );
        assert_eq!(
            Prefix::new_from_str("name!user.user"),
            Nickname("name".into(), "user.user".into(), String::new())
        );
        assert_eq!(
            Prefix::new_from_str("name!user@host.host"),
            Nickname("name".into(), "user".into(), "host.host".into())
        );
        assert_eq!(
            Prefix::new_from_str("test.net@something"),
            ServerName("test.net@something".into())
        );
        assert_eq!(
            Prefix::new_from_str("!user"),
            Nickname("".into(), "user".into(), String::new())
        );
    }

    #[test]
    fn nickname_accessor() {
        assert_eq!(Prefix::new_from_str("irc.example.com").nickname(), None);
        assert_eq!(Prefix::new_from_str("dave!d@host").nickname(), Some("dave"));
    }
}
