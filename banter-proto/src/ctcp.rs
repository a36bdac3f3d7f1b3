//! CTCP framing: extraction of the `\x01`-delimited inner message.
//!
//! Only the framing lives here. What a `VERSION` or `PING` query means is up
//! to the host; nested frames are not supported.

/// The CTCP delimiter byte.
pub const DELIMITER: char = '\u{1}';

/// Whether a PRIVMSG/NOTICE payload is a CTCP frame.
pub fn is_ctcp(text: &str) -> bool {
    text.starts_with(DELIMITER)
}

/// Splits a CTCP payload into its verb and optional argument text.
///
/// The closing delimiter is optional, as many clients omit it. Returns `None`
/// when the text is not a CTCP frame or the frame is empty.
pub fn split_ctcp(text: &str) -> Option<(&str, Option<&str>)> {
    let inner = text.strip_prefix(DELIMITER)?;
    let inner = inner.strip_suffix(DELIMITER).unwrap_or(inner);
    if inner.is_empty() {
        return None;
    }
    match inner.split_once(' ') {
        Some((verb, args)) => Some((verb, Some(args))),
        None => Some((inner, None)),
    }
}

/// Wraps a verb and optional argument text into a CTCP frame.
pub fn wrap_ctcp(verb: &str, args: Option<&str>) -> String {
    match args {
        Some(args) => format!("{}{} {}{}", DELIMITER, verb, args, DELIMITER),
        None => format!("{}{}{}", DELIMITER, verb, DELIMITER),
    }
}

#[cfg(test)]
mod test {
    use super::{is_ctcp, split_ctcp, wrap_ctcp};

    #[test]
    fn splits_verb_and_args() {
        assert_eq!(
            split_ctcp("\u{1}PING 12345\u{1}"),
            Some(("PING", Some("12345")))
        );
        assert_eq!(split_ctcp("\u{1}VERSION\u{1}"), Some(("VERSION", None)));
    }

    #[test]
    fn closing_delimiter_is_optional() {
        assert_eq!(split_ctcp("\u{1}ACTION waves"), Some(("ACTION", Some("waves"))));
    }

    #[test]
    fn rejects_plain_text_and_empty_frames() {
        assert_eq!(split_ctcp("hello"), None);
        assert_eq!(split_ctcp("\u{1}\u{1}"), None);
        assert!(!is_ctcp("hello"));
    }

    #[test]
    fn wrap_round_trips() {
        let framed = wrap_ctcp("PING", Some("x"));
        assert_eq!(split_ctcp(&framed), Some(("PING", Some("x"))));
    }
}
