//! Aggregate root trait and optimistic concurrency expectations.

/// Aggregate root marker + minimal interface.
///
/// This is intentionally small: stores only need identity and a version to
/// enforce optimistic concurrency.
pub trait AggregateRoot {
    /// Strongly-typed aggregate identifier.
    type Id: Clone + Eq + core::hash::Hash + core::fmt::Debug;

    /// Returns the aggregate identifier.
    fn id(&self) -> &Self::Id;

    /// Monotonically increasing version of the persisted state.
    ///
    /// `0` means "never persisted"; a store assigns `1` on create and `+1` on
    /// every successful write.
    fn version(&self) -> u64;
}

/// Optimistic concurrency expectation for an aggregate.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ExpectedVersion {
    /// Skip version checking (useful for migrations and administrative repair).
    Any,
    /// Require the aggregate to be at an exact version.
    Exact(u64),
}

impl ExpectedVersion {
    pub fn matches(self, actual: u64) -> bool {
        match self {
            ExpectedVersion::Any => true,
            ExpectedVersion::Exact(v) => v == actual,
        }
    }

    /// Expect whatever version `aggregate` was loaded at.
    pub fn of<A: AggregateRoot>(aggregate: &A) -> Self {
        ExpectedVersion::Exact(aggregate.version())
    }
}

impl core::fmt::Display for ExpectedVersion {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            ExpectedVersion::Any => f.write_str("any"),
            ExpectedVersion::Exact(v) => write!(f, "{v}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    struct Stub(u64);

    impl AggregateRoot for Stub {
        type Id = u8;

        fn id(&self) -> &u8 {
            &0
        }

        fn version(&self) -> u64 {
            self.0
        }
    }

    #[test]
    fn expected_version_of_aggregate_uses_loaded_version() {
        assert_eq!(ExpectedVersion::of(&Stub(7)), ExpectedVersion::Exact(7));
    }

    #[test]
    fn display_is_human_readable() {
        assert_eq!(ExpectedVersion::Any.to_string(), "any");
        assert_eq!(ExpectedVersion::Exact(3).to_string(), "3");
    }

    proptest! {
        #[test]
        fn exact_matches_only_itself(expected in 0u64..1_000, actual in 0u64..1_000) {
            prop_assert_eq!(ExpectedVersion::Exact(expected).matches(actual), expected == actual);
            prop_assert!(ExpectedVersion::Any.matches(actual));
        }
    }
}
