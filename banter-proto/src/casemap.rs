//! Identifier case folding per the server-advertised CASEMAPPING.
//!
//! IRC nicknames and channel names compare case-insensitively, but which
//! characters count as case pairs depends on the network. RFC 1459 treats
//! `{}|^` as the lowercase forms of `[]\~` because of its Scandinavian
//! heritage; `strict-rfc1459` drops the `^`/`~` pair; `ascii` folds letters
//! only. Every keyed lookup in the client derives equality and hashing from
//! the active fold.
use std::fmt;

/// A case mapping advertised via `CASEMAPPING` in ISUPPORT.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CaseMapping {
    /// `A-Z` maps to `a-z`.
    Ascii,
    /// ASCII plus `[]\~` mapping to `{}|^`.
    Rfc1459,
    /// ASCII plus `[]\` mapping to `{}|`, without the `~`/`^` pair.
    StrictRfc1459,
}

impl Default for CaseMapping {
    // RFC 1459 is the mapping of record when the server advertises nothing.
    fn default() -> CaseMapping {
        CaseMapping::Rfc1459
    }
}

impl CaseMapping {
    /// Parses an ISUPPORT `CASEMAPPING` value. Unknown values yield `None`.
    pub fn from_value(value: &str) -> Option<CaseMapping> {
        match value {
            v if v.eq_ignore_ascii_case("ascii") => Some(CaseMapping::Ascii),
            v if v.eq_ignore_ascii_case("rfc1459") => Some(CaseMapping::Rfc1459),
            v if v.eq_ignore_ascii_case("strict-rfc1459") => Some(CaseMapping::StrictRfc1459),
            _ => None,
        }
    }

    /// Returns the value name as it appears on the wire.
    pub fn value(self) -> &'static str {
        match self {
            CaseMapping::Ascii => "ascii",
            CaseMapping::Rfc1459 => "rfc1459",
            CaseMapping::StrictRfc1459 => "strict-rfc1459",
        }
    }

    /// Folds a single character to its canonical (lower) form.
    pub fn fold_char(self, c: char) -> char {
        match (self, c) {
            (_, 'A'..='Z') => c.to_ascii_lowercase(),
            (CaseMapping::Ascii, _) => c,
            (_, '[') => '{',
            (_, ']') => '}',
            (_, '\\') => '|',
            (CaseMapping::Rfc1459, '~') => '^',
            _ => c,
        }
    }

    /// Folds an identifier to its canonical form for keying and comparison.
    pub fn fold(self, s: &str) -> String {
        s.chars().map(|c| self.fold_char(c)).collect()
    }

    /// Compares two identifiers under this mapping.
    pub fn eq(self, a: &str, b: &str) -> bool {
        a.chars()
            .map(|c| self.fold_char(c))
            .eq(b.chars().map(|c| self.fold_char(c)))
    }
}

impl fmt::Display for CaseMapping {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.value())
    }
}
