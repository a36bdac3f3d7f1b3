//! A module providing a data structure for messages to and from IRC servers.
use std::fmt;
use std::str::FromStr;

use crate::error::MessageParseError;
use crate::prefix::Prefix;
use crate::response::Response;

/// The maximum number of bytes in a serialized message, including `\r\n`.
pub const MAX_LINE_BYTES: usize = 512;

/// An IRCv3 message tag: a key and an optional, already-unescaped value.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Tag(pub String, pub Option<String>);

/// A parsed IRC message.
///
/// The command is kept in its wire form: either an alphabetic verb such as
/// `PRIVMSG` or a three-digit numeric such as `001`. Parameters are stored
/// without the trailing `:` marker; whether the last parameter is serialized
/// in trailing form is decided again at serialization time.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Message {
    /// Message tags, if any were present.
    pub tags: Option<Vec<Tag>>,
    /// The message prefix, if one was present.
    pub prefix: Option<Prefix>,
    /// The command or three-digit numeric.
    pub command: String,
    /// The command parameters, at most fifteen.
    pub params: Vec<String>,
}

impl Message {
    /// Creates a new message without tags.
    pub fn new(prefix: Option<&str>, command: &str, params: Vec<&str>) -> Message {
        Message {
            tags: None,
            prefix: prefix.map(Prefix::new_from_str),
            command: command.to_owned(),
            params: params.into_iter().map(|s| s.to_owned()).collect(),
        }
    }

    /// Creates a new message with the specified tags.
    pub fn with_tags(
        tags: Vec<Tag>,
        prefix: Option<&str>,
        command: &str,
        params: Vec<&str>,
    ) -> Message {
        Message {
            tags: Some(tags),
            ..Message::new(prefix, command, params)
        }
    }

    /// Gets the nickname of the message source, if it was sent by a user.
    pub fn source_nickname(&self) -> Option<&str> {
        self.prefix.as_ref().and_then(Prefix::nickname)
    }

    /// Interprets the command as a known numeric reply, if it is one.
    pub fn response(&self) -> Option<Response> {
        self.command.parse().ok()
    }

    /// Gets the parameter at the given position, if present.
    pub fn param(&self, index: usize) -> Option<&str> {
        self.params.get(index).map(|s| &s[..])
    }

    /// Gets the value of the given message tag, if the tag is present.
    ///
    /// Returns `Some(None)` for a tag present without a value.
    pub fn tag(&self, key: &str) -> Option<Option<&str>> {
        self.tags
            .as_ref()?
            .iter()
            .find(|Tag(k, _)| k == key)
            .map(|Tag(_, v)| v.as_deref())
    }
}

impl FromStr for Message {
    type Err = MessageParseError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let line = line.trim_end_matches('\n').trim_end_matches('\r');
        if line.is_empty() {
            return Err(MessageParseError::EmptyMessage);
        }

        let mut rest = line;

        let tags = match rest.strip_prefix('@') {
            Some(tagged) => {
                let (raw, after) = tagged
                    .split_once(' ')
                    .ok_or(MessageParseError::MissingCommand)?;
                rest = after;
                Some(parse_tags(raw))
            }
            None => None,
        };

        rest = rest.trim_start_matches(' ');
        let prefix = match rest.strip_prefix(':') {
            Some(prefixed) => {
                let (raw, after) = prefixed
                    .split_once(' ')
                    .ok_or(MessageParseError::MissingCommand)?;
                rest = after;
                Some(Prefix::new_from_str(raw))
            }
            None => None,
        };

        rest = rest.trim_start_matches(' ');
        let command = match rest.find(' ') {
            Some(i) => {
                let command = &rest[..i];
                rest = &rest[i..];
                command
            }
            None => {
                let command = rest;
                rest = "";
                command
            }
        };
        if command.is_empty() {
            return Err(MessageParseError::MissingCommand);
        }
        let alphabetic = command.chars().all(|c| c.is_ascii_alphabetic());
        let numeric = command.len() == 3 && command.chars().all(|c| c.is_ascii_digit());
        if !alphabetic && !numeric {
            return Err(MessageParseError::InvalidCommand {
                command: command.to_owned(),
            });
        }

        let mut params = Vec::new();
        loop {
            rest = rest.trim_start_matches(' ');
            if rest.is_empty() {
                break;
            }
            if let Some(trailing) = rest.strip_prefix(':') {
                params.push(trailing.to_owned());
                break;
            }
            // The fifteenth parameter swallows the remainder of the line.
            if params.len() == 14 {
                params.push(rest.to_owned());
                break;
            }
            match rest.find(' ') {
                Some(i) => {
                    params.push(rest[..i].to_owned());
                    rest = &rest[i..];
                }
                None => {
                    params.push(rest.to_owned());
                    rest = "";
                }
            }
        }

        Ok(Message {
            tags,
            prefix,
            command: command.to_owned(),
            params,
        })
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if let Some(tags) = &self.tags {
            if !tags.is_empty() {
                f.write_str("@")?;
                for (i, Tag(key, value)) in tags.iter().enumerate() {
                    if i > 0 {
                        f.write_str(";")?;
                    }
                    f.write_str(key)?;
                    if let Some(value) = value {
                        write!(f, "={}", escape_tag_value(value))?;
                    }
                }
                f.write_str(" ")?;
            }
        }
        if let Some(prefix) = &self.prefix {
            write!(f, ":{} ", prefix)?;
        }
        f.write_str(&self.command)?;
        let last = self.params.len().wrapping_sub(1);
        for (i, param) in self.params.iter().enumerate() {
            if i == last && (param.is_empty() || param.contains(' ') || param.starts_with(':')) {
                write!(f, " :{}", param)?;
            } else {
                write!(f, " {}", param)?;
            }
        }
        f.write_str("\r\n")
    }
}

fn parse_tags(raw: &str) -> Vec<Tag> {
    raw.split(';')
        .filter(|part| !part.is_empty())
        .map(|part| match part.split_once('=') {
            Some((key, value)) => Tag(key.to_owned(), Some(unescape_tag_value(value))),
            None => Tag(part.to_owned(), None),
        })
        .collect()
}

fn unescape_tag_value(value: &str) -> String {
    let mut unescaped = String::with_capacity(value.len());
    let mut chars = value.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            unescaped.push(c);
            continue;
        }
        match chars.next() {
            Some(':') => unescaped.push(';'),
            Some('s') => unescaped.push(' '),
            Some('\\') => unescaped.push('\\'),
            Some('r') => unescaped.push('\r'),
            Some('n') => unescaped.push('\n'),
            // A backslash before any other character is dropped, as is a
            // backslash at the end of the value.
            Some(other) => unescaped.push(other),
            None => {}
        }
    }
    unescaped
}

fn escape_tag_value(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            ';' => escaped.push_str("\\:"),
            ' ' => escaped.push_str("\\s"),
            '\\' => escaped.push_str("\\\\"),
            '\r' => escaped.push_str("\\r"),
            '\n' => escaped.push_str("\\n"),
            c => escaped.push(c),
        }
    }
    escaped
}

#[cfg(test)]
mod test {
    use super::{Message, Tag};
    use crate::prefix::Prefix;

    fn parse(line: &str) -> Message {
        line.parse().unwrap()
    }

    #[test]
    fn parse_simple() {
        let msg = parse("PRIVMSG #rust :Hello Rustaceans!\r\n");
        assert_eq!(msg.tags, None);
        assert_eq!(msg.prefix, None);
        assert_eq!(msg.command, "PRIVMSG");
        assert_eq!(msg.params, vec!["#rust", "Hello Rustaceans!"]);
    }

    #[test]
    fn parse_prefixed() {
        let msg = parse(":nick!ident@host.com PRIVMSG me :Hello\r\n");
        assert_eq!(
            msg.prefix,
            Some(Prefix::Nickname(
                "nick".into(),
                "ident".into(),
                "host.com".into()
            ))
        );
        assert_eq!(msg.source_nickname(), Some("nick"));
    }

    #[test]
    fn parse_tags() {
        let msg = parse("@aaa=bbb;ccc;example.com/ddd=eee :nick PRIVMSG me :Hello\r\n");
        assert_eq!(
            msg.tags,
            Some(vec![
                Tag("aaa".into(), Some("bbb".into())),
                Tag("ccc".into(), None),
                Tag("example.com/ddd".into(), Some("eee".into())),
            ])
        );
        assert_eq!(msg.tag("ccc"), Some(None));
        assert_eq!(msg.tag("aaa"), Some(Some("bbb")));
        assert_eq!(msg.tag("zzz"), None);
    }

    #[test]
    fn unescapes_tag_values() {
        let msg = parse("@k=a\\:b\\sc\\\\d\\r\\n\\x;v=\\ PING :x\r\n");
        assert_eq!(msg.tag("k"), Some(Some("a;b c\\d\r\nx")));
        assert_eq!(msg.tag("v"), Some(Some("")));
    }

    #[test]
    fn escapes_tag_values_on_display() {
        let msg = Message {
            tags: Some(vec![Tag("time".into(), Some("a;b c".into()))]),
            prefix: None,
            command: "PING".into(),
            params: vec!["x".into()],
        };
        assert_eq!(msg.to_string(), "@time=a\\:b\\sc PING x\r\n");
    }

    #[test]
    fn parse_colon_within_middle_param() {
        // UnrealIRCd and friends send colons inside individual parameters.
        let msg = parse(":test!test@test COMMAND ARG:test :Testing!\r\n");
        assert_eq!(msg.params, vec!["ARG:test", "Testing!"]);
    }

    #[test]
    fn parse_empty_trailing() {
        let msg = parse("TOPIC #chan :\r\n");
        assert_eq!(msg.params, vec!["#chan", ""]);
    }

    #[test]
    fn parse_atypical_endings() {
        for line in &[
            "PRIVMSG test :Testing!\r",
            "PRIVMSG test :Testing!\n",
            "PRIVMSG test :Testing!",
        ] {
            let msg = parse(line);
            assert_eq!(msg.command, "PRIVMSG");
            assert_eq!(msg.params, vec!["test", "Testing!"]);
        }
    }

    #[test]
    fn parse_fifteenth_param_swallows_rest() {
        let line = "CMD a b c d e f g h i j k l m n o p q\r\n";
        let msg = parse(line);
        assert_eq!(msg.params.len(), 15);
        assert_eq!(msg.params[14], "o p q");
    }

    #[test]
    fn rejects_missing_command() {
        assert!(":prefix.only".parse::<Message>().is_err());
        assert!("".parse::<Message>().is_err());
        assert!("@tag=1 ".parse::<Message>().is_err());
        assert!("123456 x".parse::<Message>().is_err());
    }

    #[test]
    fn numeric_commands() {
        let msg = parse(":server 001 Nick :Welcome\r\n");
        assert_eq!(msg.command, "001");
        assert!(msg.response().is_some());
    }

    #[test]
    fn round_trips() {
        for line in &[
            ":test!test@test PRIVMSG test :Still testing!\r\n",
            "@aaa=bbb;ccc;example.com/ddd=eee :test!test@test PRIVMSG test :Testing with tags!\r\n",
            ":irc.example.com 005 nick PREFIX=(ov)@+ CHANTYPES=# :are supported by this server\r\n",
            "QUIT\r\n",
            "JOIN #chan\r\n",
        ] {
            assert_eq!(&parse(line).to_string(), line);
        }
    }

    #[test]
    fn reparse_is_identity() {
        let msg = Message::new(Some("n!u@h"), "PRIVMSG", vec!["#chan", "hello world"]);
        assert_eq!(parse(&msg.to_string()), msg);
    }

    #[test]
    fn trailing_form_may_change_but_meaning_does_not() {
        // A one-word trailing parameter reserializes without the colon; the
        // parsed form is unchanged.
        let msg = parse("PRIVMSG test :Testing!\r\n");
        assert_eq!(msg.to_string(), "PRIVMSG test Testing!\r\n");
        assert_eq!(parse(&msg.to_string()), msg);
    }
}
