//! Cached species image entity.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// A cached illustrative photograph for one species.
///
/// The persistent store holds at most one record per scientific name;
/// `external_id` is unique per provider and is what the blacklist matches
/// against.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageRecord {
    /// Binomial taxonomic key, the store's primary key.
    pub sci_name: String,
    /// Display label resolved from the local taxonomy table.
    pub common_name: String,
    /// Direct link to the image asset.
    pub image_url: String,
    /// Provider-supplied caption, may be empty.
    pub title: String,
    /// Provider-specific photo identifier.
    pub external_id: String,
    /// Attribution link to the photographer or uploader.
    pub author_url: String,
    /// Link to the applicable license terms.
    pub license_url: String,
    /// Date this record was last (re)fetched.
    pub created_at: NaiveDate,
}

impl ImageRecord {
    /// Age of the record in whole days relative to `today`.
    #[must_use]
    pub fn age_days(&self, today: NaiveDate) -> i64 {
        (today - self.created_at).num_days()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(created_at: NaiveDate) -> ImageRecord {
        ImageRecord {
            sci_name: "Turdus migratorius".to_string(),
            common_name: "American Robin".to_string(),
            image_url: "https://example.com/robin.jpg".to_string(),
            title: "robin".to_string(),
            external_id: "42".to_string(),
            author_url: "https://example.com/people/someone".to_string(),
            license_url: "https://example.com/license".to_string(),
            created_at,
        }
    }

    #[test]
    fn test_age_in_days() {
        let created = NaiveDate::from_ymd_opt(2026, 1, 1).unwrap();
        let today = NaiveDate::from_ymd_opt(2026, 1, 21).unwrap();
        assert_eq!(record(created).age_days(today), 20);
    }

    #[test]
    fn test_age_is_zero_on_fetch_day() {
        let day = NaiveDate::from_ymd_opt(2026, 3, 5).unwrap();
        assert_eq!(record(day).age_days(day), 0);
    }
}
