//! Upstream account binding for the photo search.

use chrono::NaiveDate;

/// The upstream account/filter the photo search is currently bound to.
///
/// Stored as a singleton row next to the image records. Compared against the
/// live configuration every time a provider is constructed; a mismatch means
/// the operator reconfigured the upstream identity and every cached record
/// is scoped to the wrong account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityBinding {
    /// Configured account filter, empty when searches run unscoped.
    pub filter_value: String,
    /// Resolved external account id for the filter, empty when unscoped.
    pub external_uid: String,
    /// Date the binding was written.
    pub created_at: NaiveDate,
}

impl IdentityBinding {
    /// Creates a binding for the given filter and resolved uid.
    #[must_use]
    pub fn new(
        filter_value: impl Into<String>,
        external_uid: impl Into<String>,
        created_at: NaiveDate,
    ) -> Self {
        Self {
            filter_value: filter_value.into(),
            external_uid: external_uid.into(),
            created_at,
        }
    }

    /// Creates the unscoped binding (no account filter configured).
    #[must_use]
    pub fn unscoped(created_at: NaiveDate) -> Self {
        Self::new("", "", created_at)
    }

    /// Whether this binding targets the given configured filter value.
    #[must_use]
    pub fn matches(&self, filter_value: &str) -> bool {
        self.filter_value == filter_value
    }

    /// Whether searches under this binding are scoped to one account.
    #[must_use]
    pub fn is_scoped(&self) -> bool {
        !self.filter_value.is_empty()
    }
}
