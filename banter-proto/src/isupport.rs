//! The ISUPPORT (numeric 005) registry.
//!
//! Servers advertise their parameters across one or more 005 lines. The
//! registry keeps a typed view of the tokens the client acts on and retains
//! everything else verbatim for introspection.
use std::collections::HashMap;

use crate::casemap::CaseMapping;

/// How a channel mode consumes parameters, per the four CHANMODES groups and
/// the PREFIX status modes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChannelModeKind {
    /// Type A: a list mode such as `+b`; the parameter is a mask.
    List,
    /// Type B: always takes a parameter, such as `+k`.
    Parameterized,
    /// Type C: takes a parameter only when set, such as `+l`.
    SetParameter,
    /// Type D: a flag with no parameter, such as `+i`.
    Flag,
    /// A PREFIX status mode; the parameter is a nickname.
    Status,
}

/// The four comma-separated CHANMODES groups.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChanModeGroups {
    /// Type A (list) modes.
    pub list: String,
    /// Type B (always parameterized) modes.
    pub parameterized: String,
    /// Type C (parameter on set only) modes.
    pub set_parameter: String,
    /// Type D (flag) modes.
    pub flag: String,
}

impl Default for ChanModeGroups {
    fn default() -> ChanModeGroups {
        ChanModeGroups {
            list: "b".to_owned(),
            parameterized: "k".to_owned(),
            set_parameter: "l".to_owned(),
            flag: "imnpst".to_owned(),
        }
    }
}

/// A typed, incrementally-updated view of the server's ISUPPORT tokens.
#[derive(Clone, Debug)]
pub struct Isupport {
    /// Status modes in rank order: `(mode letter, prefix symbol)`, index 0
    /// being the highest rank.
    prefix: Vec<(char, char)>,
    chanmodes: ChanModeGroups,
    chantypes: String,
    casemapping: CaseMapping,
    network: Option<String>,
    statusmsg: String,
    monitor: Option<u32>,
    watch: Option<u32>,
    namesx: bool,
    uhnames: bool,
    raw: HashMap<String, Option<String>>,
}

impl Default for Isupport {
    fn default() -> Isupport {
        Isupport {
            prefix: vec![('o', '@'), ('v', '+')],
            chanmodes: ChanModeGroups::default(),
            chantypes: "#&".to_owned(),
            casemapping: CaseMapping::default(),
            network: None,
            statusmsg: String::new(),
            monitor: None,
            watch: None,
            namesx: false,
            uhnames: false,
            raw: HashMap::new(),
        }
    }
}

impl Isupport {
    /// Applies the tokens of one 005 line. Tokens are `KEY`, `KEY=VALUE`, or
    /// `-KEY`; values may contain `\xHH` escapes. The trailing
    /// "are supported by this server" parameter is recognized by its spaces
    /// and skipped.
    ///
    /// Returns `true` when the CASEMAPPING changed, in which case every
    /// fold-keyed container must be rehashed.
    pub fn apply<S: AsRef<str>>(&mut self, tokens: &[S]) -> bool {
        let mut remapped = false;
        for token in tokens {
            let token = token.as_ref();
            if token.is_empty() || token.contains(' ') {
                continue;
            }
            if let Some(key) = token.strip_prefix('-') {
                self.remove(&key.to_ascii_uppercase());
                continue;
            }
            let (key, value) = match token.split_once('=') {
                Some((key, value)) => (key, Some(unescape_value(value))),
                None => (token, None),
            };
            let key = key.to_ascii_uppercase();
            remapped |= self.set(&key, value.as_deref());
            self.raw.insert(key, value);
        }
        remapped
    }

    fn set(&mut self, key: &str, value: Option<&str>) -> bool {
        match key {
            "PREFIX" => self.prefix = parse_prefix(value.unwrap_or("")),
            "CHANMODES" => {
                if let Some(groups) = parse_chanmodes(value.unwrap_or("")) {
                    self.chanmodes = groups;
                }
            }
            "CHANTYPES" => self.chantypes = value.unwrap_or("").to_owned(),
            "CASEMAPPING" => {
                if let Some(mapping) = value.and_then(CaseMapping::from_value) {
                    if mapping != self.casemapping {
                        self.casemapping = mapping;
                        return true;
                    }
                }
            }
            "NETWORK" => self.network = value.map(|v| v.to_owned()),
            "STATUSMSG" => self.statusmsg = value.unwrap_or("").to_owned(),
            // An advertised cap without a value means "present, no limit".
            "MONITOR" => self.monitor = Some(value.and_then(|v| v.parse().ok()).unwrap_or(0)),
            "WATCH" => self.watch = Some(value.and_then(|v| v.parse().ok()).unwrap_or(0)),
            "NAMESX" => self.namesx = true,
            "UHNAMES" => self.uhnames = true,
            _ => {}
        }
        false
    }

    fn remove(&mut self, key: &str) {
        let defaults = Isupport::default();
        match key {
            "PREFIX" => self.prefix = defaults.prefix,
            "CHANMODES" => self.chanmodes = defaults.chanmodes,
            "CHANTYPES" => self.chantypes = defaults.chantypes,
            "CASEMAPPING" => self.casemapping = defaults.casemapping,
            "NETWORK" => self.network = None,
            "STATUSMSG" => self.statusmsg = defaults.statusmsg,
            "MONITOR" => self.monitor = None,
            "WATCH" => self.watch = None,
            "NAMESX" => self.namesx = false,
            "UHNAMES" => self.uhnames = false,
            _ => {}
        }
        self.raw.remove(key);
    }

    /// Gets a retained token verbatim. Returns `Some(None)` for a token that
    /// was advertised without a value.
    pub fn get(&self, key: &str) -> Option<Option<&str>> {
        self.raw
            .get(&key.to_ascii_uppercase())
            .map(|v| v.as_deref())
    }

    /// The active case mapping.
    pub fn casemapping(&self) -> CaseMapping {
        self.casemapping
    }

    /// The network display name, when advertised.
    pub fn network(&self) -> Option<&str> {
        self.network.as_deref()
    }

    /// The channel-name prefix characters.
    pub fn chantypes(&self) -> &str {
        &self.chantypes
    }

    /// Prefix symbols accepted for status-targeted messages.
    pub fn statusmsg(&self) -> &str {
        &self.statusmsg
    }

    /// The MONITOR target cap: `None` when MONITOR is not advertised,
    /// `Some(0)` when it is advertised without a limit.
    pub fn monitor(&self) -> Option<u32> {
        self.monitor
    }

    /// The WATCH target cap, with the same convention as [`monitor`].
    ///
    /// [`monitor`]: #method.monitor
    pub fn watch(&self) -> Option<u32> {
        self.watch
    }

    /// Whether the server advertises NAMESX (multi-prefix without the cap).
    pub fn namesx(&self) -> bool {
        self.namesx
    }

    /// Whether the server advertises UHNAMES (userhost-in-names without the
    /// cap).
    pub fn uhnames(&self) -> bool {
        self.uhnames
    }

    /// The status table in rank order as `(mode letter, prefix symbol)`.
    pub fn status_prefixes(&self) -> &[(char, char)] {
        &self.prefix
    }

    /// The rank of a status mode letter; 0 is the highest rank.
    pub fn status_rank(&self, mode: char) -> Option<usize> {
        self.prefix.iter().position(|&(m, _)| m == mode)
    }

    /// Maps a prefix symbol such as `@` to its mode letter.
    pub fn symbol_to_mode(&self, symbol: char) -> Option<char> {
        self.prefix
            .iter()
            .find(|&&(_, s)| s == symbol)
            .map(|&(m, _)| m)
    }

    /// Whether the character is an advertised prefix symbol.
    pub fn is_status_symbol(&self, symbol: char) -> bool {
        self.prefix.iter().any(|&(_, s)| s == symbol)
    }

    /// Classifies a channel mode letter for the MODE parser.
    pub fn channel_mode_kind(&self, mode: char) -> ChannelModeKind {
        if self.status_rank(mode).is_some() {
            ChannelModeKind::Status
        } else if self.chanmodes.list.contains(mode) {
            ChannelModeKind::List
        } else if self.chanmodes.parameterized.contains(mode) {
            ChannelModeKind::Parameterized
        } else if self.chanmodes.set_parameter.contains(mode) {
            ChannelModeKind::SetParameter
        } else {
            // Unknown modes are assumed parameterless; anything else would
            // desynchronize every later mode in the same message anyway.
            ChannelModeKind::Flag
        }
    }

    /// Whether the given name starts with an advertised channel prefix.
    pub fn is_channel_name(&self, name: &str) -> bool {
        name.chars()
            .next()
            .map(|c| self.chantypes.contains(c))
            .unwrap_or(false)
    }
}

fn parse_prefix(value: &str) -> Vec<(char, char)> {
    // The form is `(modes)symbols`, position i of each side pairing up.
    let value = match value.strip_prefix('(') {
        Some(rest) => rest,
        None => return Vec::new(),
    };
    let (modes, symbols) = match value.split_once(')') {
        Some(split) => split,
        None => return Vec::new(),
    };
    modes.chars().zip(symbols.chars()).collect()
}

fn parse_chanmodes(value: &str) -> Option<ChanModeGroups> {
    let mut groups = value.splitn(4, ',');
    Some(ChanModeGroups {
        list: groups.next()?.to_owned(),
        parameterized: groups.next()?.to_owned(),
        set_parameter: groups.next()?.to_owned(),
        flag: groups.next()?.to_owned(),
    })
}

fn unescape_value(value: &str) -> String {
    let mut unescaped = String::with_capacity(value.len());
    let mut chars = value.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '\\' || chars.peek() != Some(&'x') {
            unescaped.push(c);
            continue;
        }
        let rest: String = chars.clone().skip(1).take(2).collect();
        match u8::from_str_radix(&rest, 16) {
            Ok(byte) if rest.len() == 2 => {
                unescaped.push(byte as char);
                chars.next();
                chars.next();
                chars.next();
            }
            _ => unescaped.push(c),
        }
    }
    unescaped
}

#[cfg(test)]
mod test {
    use super::{ChannelModeKind, Isupport};
    use crate::casemap::CaseMapping;

    fn apply(tokens: &[&str]) -> Isupport {
        let mut isupport = Isupport::default();
        isupport.apply(tokens);
        isupport
    }

    #[test]
    fn parses_prefix_table() {
        let isupport = apply(&["PREFIX=(qaohv)~&@%+"]);
        assert_eq!(isupport.status_rank('q'), Some(0));
        assert_eq!(isupport.status_rank('v'), Some(4));
        assert_eq!(isupport.symbol_to_mode('%'), Some('h'));
        assert!(isupport.is_status_symbol('~'));
        assert!(!isupport.is_status_symbol('!'));
    }

    #[test]
    fn classifies_channel_modes() {
        let isupport = apply(&["CHANMODES=eIbq,k,flj,imnpst", "PREFIX=(ov)@+"]);
        assert_eq!(isupport.channel_mode_kind('b'), ChannelModeKind::List);
        assert_eq!(
            isupport.channel_mode_kind('k'),
            ChannelModeKind::Parameterized
        );
        assert_eq!(
            isupport.channel_mode_kind('l'),
            ChannelModeKind::SetParameter
        );
        assert_eq!(isupport.channel_mode_kind('i'), ChannelModeKind::Flag);
        assert_eq!(isupport.channel_mode_kind('o'), ChannelModeKind::Status);
        assert_eq!(isupport.channel_mode_kind('Z'), ChannelModeKind::Flag);
    }

    #[test]
    fn casemapping_change_is_reported() {
        let mut isupport = Isupport::default();
        assert!(isupport.apply(&["CASEMAPPING=ascii"]));
        assert_eq!(isupport.casemapping(), CaseMapping::Ascii);
        assert!(!isupport.apply(&["CASEMAPPING=ascii"]));
        assert!(isupport.apply(&["CASEMAPPING=rfc1459"]));
    }

    #[test]
    fn retains_unknown_tokens() {
        let isupport = apply(&["SILENCE=32", "EXCEPTS"]);
        assert_eq!(isupport.get("silence"), Some(Some("32")));
        assert_eq!(isupport.get("EXCEPTS"), Some(None));
        assert_eq!(isupport.get("INVEX"), None);
    }

    #[test]
    fn removes_with_dash() {
        let mut isupport = apply(&["NETWORK=Example", "MONITOR=100"]);
        assert_eq!(isupport.network(), Some("Example"));
        assert_eq!(isupport.monitor(), Some(100));
        isupport.apply(&["-NETWORK", "-MONITOR"]);
        assert_eq!(isupport.network(), None);
        assert_eq!(isupport.monitor(), None);
    }

    #[test]
    fn monitor_without_value_means_unlimited() {
        assert_eq!(apply(&["MONITOR"]).monitor(), Some(0));
        assert_eq!(apply(&["WATCH=128"]).watch(), Some(128));
    }

    #[test]
    fn unescapes_hex_values() {
        let isupport = apply(&["NETWORK=Example\\x20Net"]);
        assert_eq!(isupport.network(), Some("Example Net"));
    }

    #[test]
    fn skips_trailing_text() {
        let mut isupport = Isupport::default();
        isupport.apply(&["NETWORK=Lib", "are supported by this server"]);
        assert_eq!(isupport.network(), Some("Lib"));
        assert_eq!(isupport.get("are"), None);
    }
}
