//! Diff suppression predicates.

/// Rules under which a planned change to a string attribute is ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiffSuppress {
    /// The directory treats the value case-insensitively (GUIDs, client IDs).
    CaseDifference,
}

impl DiffSuppress {
    /// Returns true if changing `old` to `new` is not a real change.
    #[must_use]
    pub fn suppresses(&self, old: &str, new: &str) -> bool {
        match self {
            Self::CaseDifference => case_difference(old, new),
        }
    }
}

/// `old` and `new` differ only in ASCII case.
#[must_use]
pub fn case_difference(old: &str, new: &str) -> bool {
    old.eq_ignore_ascii_case(new)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_case_difference() {
        assert!(case_difference(
            "00000003-0000-0000-C000-000000000000",
            "00000003-0000-0000-c000-000000000000"
        ));
        assert!(case_difference("", ""));
        assert!(!case_difference("abc", "abcd"));
        assert!(DiffSuppress::CaseDifference.suppresses("Graph", "GRAPH"));
    }
}
