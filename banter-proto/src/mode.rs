//! Parsing of MODE change strings against the server's advertised tables.
//!
//! Whether a mode letter consumes a parameter, and what that parameter means,
//! is not fixed by the protocol: it comes from the CHANMODES and PREFIX
//! ISUPPORT tokens. The parser here walks a mode string with a sign cursor
//! and classifies every change accordingly.
use std::fmt;

use crate::isupport::{ChannelModeKind, Isupport};

/// One channel mode change, classified by the active ISUPPORT tables.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ModeChange {
    /// `true` for `+`, `false` for `-`.
    pub plus: bool,
    /// The mode letter.
    pub mode: char,
    /// The consumed parameter, when the mode takes one.
    pub arg: Option<String>,
    /// How the mode was classified.
    pub kind: ChannelModeKind,
}

impl fmt::Display for ModeChange {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let sign = if self.plus { '+' } else { '-' };
        match &self.arg {
            Some(arg) => write!(f, "{}{} {}", sign, self.mode, arg),
            None => write!(f, "{}{}", sign, self.mode),
        }
    }
}

/// Parses the MODE parameters for a channel target.
///
/// `params` is the parameter list after the channel name: the mode string
/// followed by its arguments. The sign cursor defaults to `+` and persists
/// across letters until changed.
pub fn channel_mode_changes(isupport: &Isupport, params: &[String]) -> Vec<ModeChange> {
    let mut changes = Vec::new();
    let (modestr, args) = match params.split_first() {
        Some(split) => split,
        None => return changes,
    };
    let mut args = args.iter();
    let mut plus = true;
    for c in modestr.chars() {
        match c {
            '+' => plus = true,
            '-' => plus = false,
            _ => {
                let kind = isupport.channel_mode_kind(c);
                let takes_arg = match kind {
                    ChannelModeKind::List
                    | ChannelModeKind::Parameterized
                    | ChannelModeKind::Status => true,
                    ChannelModeKind::SetParameter => plus,
                    ChannelModeKind::Flag => false,
                };
                let arg = if takes_arg { args.next().cloned() } else { None };
                changes.push(ModeChange {
                    plus,
                    mode: c,
                    arg,
                    kind,
                });
            }
        }
    }
    changes
}

/// Parses the MODE parameters for a user target. User modes never take
/// arguments from the client's perspective.
pub fn user_mode_changes(params: &[String]) -> Vec<(bool, char)> {
    let mut changes = Vec::new();
    let mut plus = true;
    for modestr in params {
        for c in modestr.chars() {
            match c {
                '+' => plus = true,
                '-' => plus = false,
                _ => changes.push((plus, c)),
            }
        }
    }
    changes
}
