//! Case-folding schemes as declared by a server's `CASEMAPPING` ISUPPORT token.

use std::fmt;

/// A case-folding scheme. Determines how nicknames and channel names are
/// compared for equality and used as map keys.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CaseMapping {
    /// Plain ASCII: only `a-z` fold to `A-Z`.
    Ascii,
    /// RFC 1459: ASCII plus `{}|^` fold to `[]\~`.
    Rfc1459,
    /// RFC 1459 minus the `~`/`^` pair (some IRCds advertise this variant).
    StrictRfc1459,
}

impl Default for CaseMapping {
    /// RFC 1459 is the default absent an ISUPPORT `CASEMAPPING` token, per
    /// the RFC 2812 / modern ircdocs guidance.
    fn default() -> Self {
        CaseMapping::Rfc1459
    }
}

impl CaseMapping {
    /// Parses the value of an ISUPPORT `CASEMAPPING=` token. Unknown values
    /// fall back to the default rather than erroring, since the rest of the
    /// protocol degrades gracefully under the wrong mapping.
    pub fn parse(value: &str) -> CaseMapping {
        match value {
            "ascii" => CaseMapping::Ascii,
            "strict-rfc1459" => CaseMapping::StrictRfc1459,
            _ => CaseMapping::Rfc1459,
        }
    }

    /// Folds a single character to its canonical (uppercase-preferred) form.
    pub fn fold_char(self, c: char) -> char {
        if !c.is_ascii() {
            return c;
        }
        let upper = c.to_ascii_uppercase();
        match self {
            CaseMapping::Ascii => upper,
            CaseMapping::Rfc1459 => match c {
                '{' => '[',
                '}' => ']',
                '|' => '\\',
                '^' => '~',
                _ => upper,
            },
            CaseMapping::StrictRfc1459 => match c {
                '{' => '[',
                '}' => ']',
                '|' => '\\',
                _ => upper,
            },
        }
    }

    /// Folds an entire string into its canonical form, suitable for use as a
    /// map key.
    pub fn fold(self, s: &str) -> String {
        s.chars().map(|c| self.fold_char(c)).collect()
    }

    /// Returns whether two strings are equal under this mapping.
    pub fn eq(self, a: &str, b: &str) -> bool {
        if a.len() != b.len() {
            return false;
        }
        a.chars()
            .zip(b.chars())
            .all(|(x, y)| self.fold_char(x) == self.fold_char(y))
    }
}

impl fmt::Display for CaseMapping {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            CaseMapping::Ascii => "ascii",
            CaseMapping::Rfc1459 => "rfc1459",
            CaseMapping::StrictRfc1459 => "strict-rfc1459",
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rfc1459_folds_braces_to_brackets() {
        let cm = CaseMapping::Rfc1459;
        assert_eq!(cm.fold("Alice{}"), "ALICE[]");
        assert!(cm.eq("alice^", "ALICE~"));
    }

    #[test]
    fn ascii_leaves_braces_alone() {
        let cm = CaseMapping::Ascii;
        assert_eq!(cm.fold("Alice{}"), "ALICE{}");
    }

    #[test]
    fn strict_rfc1459_does_not_fold_caret() {
        let cm = CaseMapping::StrictRfc1459;
        assert!(!cm.eq("alice^", "ALICE~"));
    }

    #[test]
    fn default_is_rfc1459() {
        assert_eq!(CaseMapping::default(), CaseMapping::Rfc1459);
    }
}
