//! Species key used by the session memo.

/// Normalized common-name token keying the session memo.
///
/// Lowercased, apostrophes stripped, whitespace runs collapsed to a single
/// underscore, so "Swainson's Thrush" and "swainsons  thrush" memoize to the
/// same slot.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SpeciesKey(String);

impl SpeciesKey {
    /// Builds the memo key from a display name.
    #[must_use]
    pub fn from_common_name(name: &str) -> Self {
        let mut token = String::with_capacity(name.len());
        let mut pending_separator = false;
        for ch in name.trim().chars() {
            if ch.is_whitespace() {
                pending_separator = !token.is_empty();
            } else if ch != '\'' && ch != '\u{2019}' {
                if pending_separator {
                    token.push('_');
                    pending_separator = false;
                }
                token.extend(ch.to_lowercase());
            }
        }
        Self(token)
    }

    /// Returns the inner token.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for SpeciesKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
