//! Corpus naming convention.
//!
//! A vector's expected behavior is encoded in its file name. The prefix is the only authoritative source of
//! expectation; nothing inside the vector is inspected.
//!
//! ## Notes
//! - Matching is **case-sensitive** and applies to the bare file name, never to directories.

/// Expected behavior of a parser on a vector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ExpectedTag {
    /// `y_`: the input is valid and must be accepted.
    MustPass,
    /// `n_`: the input is invalid and must be rejected.
    MustFail,
    /// `i_`: acceptance is implementation-defined.
    Undefined,
    /// Any other name. Only timeouts and crashes are notable for these.
    Unspecified,
}

/// Prefix spellings, in lookup order.
pub const PREFIXES: &[(&str, ExpectedTag)] = &[
    ("y_", ExpectedTag::MustPass),
    ("n_", ExpectedTag::MustFail),
    ("i_", ExpectedTag::Undefined),
];

impl ExpectedTag {
    /// Derive the tag from a vector file name.
    pub fn from_name(name: &str) -> Self {
        PREFIXES
            .iter()
            .find(|(prefix, _)| name.starts_with(prefix))
            .map(|(_, tag)| *tag)
            .unwrap_or(ExpectedTag::Unspecified)
    }

    /// Return the prefix that selects this tag, if any.
    pub fn prefix(self) -> Option<&'static str> {
        PREFIXES.iter().find(|(_, tag)| *tag == self).map(|(prefix, _)| *prefix)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_prefixes() {
        assert_eq!(ExpectedTag::from_name("y_valid.json"), ExpectedTag::MustPass);
        assert_eq!(ExpectedTag::from_name("n_bad.json"), ExpectedTag::MustFail);
        assert_eq!(ExpectedTag::from_name("i_ambiguous.json"), ExpectedTag::Undefined);
    }

    #[test]
    fn test_unknown_prefix_is_unspecified() {
        assert_eq!(ExpectedTag::from_name("x_other.json"), ExpectedTag::Unspecified);
        assert_eq!(ExpectedTag::from_name("valid.json"), ExpectedTag::Unspecified);
        assert_eq!(ExpectedTag::from_name(""), ExpectedTag::Unspecified);
    }

    #[test]
    fn test_prefix_is_case_sensitive() {
        assert_eq!(ExpectedTag::from_name("Y_valid.json"), ExpectedTag::Unspecified);
        assert_eq!(ExpectedTag::from_name("N_bad.json"), ExpectedTag::Unspecified);
    }

    #[test]
    fn test_prefix_round_trips() {
        for (prefix, tag) in PREFIXES {
            assert_eq!(tag.prefix(), Some(*prefix));
        }
        assert_eq!(ExpectedTag::Unspecified.prefix(), None);
    }
}
