use serde::{Deserialize, Serialize};

use super::property::ListingType;

/// Server-side search filters for the property list. Unset, empty and zero
/// values are left out of the query.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct PropertyFilters {
    pub min_price: Option<u64>,
    pub max_price: Option<u64>,
    pub bedrooms: Option<u32>,
    pub bathrooms: Option<u32>,
    pub property_type: Option<String>,
    pub listing_type: Option<ListingType>,
    pub city: Option<String>,
    pub owner: Option<i64>,
}

impl PropertyFilters {
    /// Query parameters in the order the backend documents them.
    pub fn to_query(&self) -> Vec<(String, String)> {
        let mut params = Vec::new();

        push_number(&mut params, "min_price", self.min_price);
        push_number(&mut params, "max_price", self.max_price);
        push_number(&mut params, "bedrooms", self.bedrooms.map(u64::from));
        push_number(&mut params, "bathrooms", self.bathrooms.map(u64::from));
        push_text(&mut params, "property_type", self.property_type.as_deref());
        push_text(&mut params, "listing_type", self.listing_type.map(|l| l.as_str()));
        push_text(&mut params, "city", self.city.as_deref());
        if let Some(owner) = self.owner.filter(|o| *o > 0) {
            params.push(("owner".to_string(), owner.to_string()));
        }

        params
    }

    pub fn is_empty(&self) -> bool {
        self.to_query().is_empty()
    }
}

fn push_number(params: &mut Vec<(String, String)>, name: &str, value: Option<u64>) {
    if let Some(v) = value.filter(|v| *v > 0) {
        params.push((name.to_string(), v.to_string()));
    }
}

fn push_text(params: &mut Vec<(String, String)>, name: &str, value: Option<&str>) {
    if let Some(v) = value.map(str::trim).filter(|v| !v.is_empty()) {
        params.push((name.to_string(), v.to_string()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_set_filters_are_emitted() {
        let filters = PropertyFilters {
            min_price: Some(500000),
            bedrooms: Some(3),
            city: Some("   ".to_string()),
            bathrooms: Some(0),
            ..Default::default()
        };
        assert_eq!(
            filters.to_query(),
            vec![
                ("min_price".to_string(), "500000".to_string()),
                ("bedrooms".to_string(), "3".to_string()),
            ]
        );
    }

    #[test]
    fn test_all_filters_in_order() {
        let filters = PropertyFilters {
            min_price: Some(1),
            max_price: Some(2),
            bedrooms: Some(3),
            bathrooms: Some(4),
            property_type: Some("Condo".to_string()),
            listing_type: Some(ListingType::Rent),
            city: Some("Austin".to_string()),
            owner: Some(12),
        };
        let names: Vec<String> = filters.to_query().into_iter().map(|(k, _)| k).collect();
        assert_eq!(
            names,
            [
                "min_price",
                "max_price",
                "bedrooms",
                "bathrooms",
                "property_type",
                "listing_type",
                "city",
                "owner"
            ]
        );
    }

    #[test]
    fn test_default_filters_are_empty() {
        assert!(PropertyFilters::default().is_empty());
    }
}
