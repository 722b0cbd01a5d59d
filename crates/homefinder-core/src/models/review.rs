use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::property::Property;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct Favorite {
    pub id: i64,
    pub property: Property,
    #[cfg_attr(feature = "ts", ts(type = "string"))]
    pub created_at: DateTime<Utc>,
}

/// Body echoed back when a favorite is created.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct FavoriteCreated {
    pub property: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct Review {
    pub id: i64,
    pub property: i64,
    pub rating: u32,
    #[cfg_attr(feature = "ts", ts(type = "string"))]
    pub created_at: DateTime<Utc>,
    #[cfg_attr(feature = "ts", ts(type = "string"))]
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct NewReview {
    pub property: i64,
    pub rating: u32,
}

/// Aggregate shown next to a listing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct ReviewSummary {
    pub average_rating: f64,
    pub review_count: usize,
}

impl ReviewSummary {
    /// Summarize the reviews that belong to `property_id`; other entries
    /// are ignored in case the backend did not filter.
    pub fn for_property(property_id: i64, reviews: &[Review]) -> Self {
        let ratings: Vec<u32> = reviews
            .iter()
            .filter(|r| r.property == property_id)
            .map(|r| r.rating)
            .collect();
        if ratings.is_empty() {
            return Self::default();
        }
        let total: u32 = ratings.iter().sum();
        Self {
            average_rating: total as f64 / ratings.len() as f64,
            review_count: ratings.len(),
        }
    }
}
