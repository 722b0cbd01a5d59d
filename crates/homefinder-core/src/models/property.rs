use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::user::User;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
#[serde(rename_all = "lowercase")]
pub enum ListingType {
    Rent,
    Sale,
}

impl ListingType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ListingType::Rent => "rent",
            ListingType::Sale => "sale",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
#[serde(rename_all = "lowercase")]
pub enum SaleStatus {
    #[default]
    Available,
    Pending,
    Sold,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct PropertyType {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct PropertyImage {
    pub id: i64,
    pub property: i64,
    /// URL of the stored image
    pub image: String,
    #[serde(default)]
    pub is_primary: bool,
}

/// A listing as returned by the properties endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct Property {
    pub id: i64,
    pub title: String,
    #[serde(default)]
    pub description: String,
    /// The backend sends decimals as strings ("450000.00").
    #[serde(deserialize_with = "deserialize_decimal")]
    pub price: f64,
    pub property_type: Option<PropertyType>,
    pub listing_type: ListingType,
    pub bedrooms: u32,
    #[serde(deserialize_with = "deserialize_decimal")]
    pub bathrooms: f64,
    pub square_feet: u32,
    pub address: String,
    pub city: String,
    pub state: String,
    pub zip_code: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    #[serde(default)]
    pub status: SaleStatus,
    #[serde(default)]
    pub is_verified: bool,
    pub owner: Option<User>,
    #[cfg_attr(feature = "ts", ts(type = "string"))]
    pub created_at: DateTime<Utc>,
    #[cfg_attr(feature = "ts", ts(type = "string"))]
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub images: Vec<PropertyImage>,
}

impl Property {
    /// Single-line address for list rows.
    pub fn full_address(&self) -> String {
        let parts: Vec<&str> = [
            self.address.as_str(),
            self.city.as_str(),
            self.state.as_str(),
            self.zip_code.as_str(),
        ]
        .into_iter()
        .filter(|p| !p.is_empty())
        .collect();
        parts.join(", ")
    }

    pub fn primary_image(&self) -> Option<&PropertyImage> {
        self.images
            .iter()
            .find(|i| i.is_primary)
            .or_else(|| self.images.first())
    }

    pub fn coordinates(&self) -> Option<(f64, f64)> {
        match (self.latitude, self.longitude) {
            (Some(lat), Some(lon)) => Some((lat, lon)),
            _ => None,
        }
    }
}

/// Write shape for creating or replacing a listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct PropertyInput {
    pub title: String,
    pub description: String,
    pub price: f64,
    pub property_type_id: i64,
    pub listing_type: ListingType,
    pub bedrooms: u32,
    pub bathrooms: f64,
    pub square_feet: u32,
    pub address: String,
    pub city: String,
    pub state: String,
    pub zip_code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latitude: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub longitude: Option<f64>,
    #[serde(default)]
    pub status: SaleStatus,
}

impl From<&Property> for PropertyInput {
    fn from(p: &Property) -> Self {
        Self {
            title: p.title.clone(),
            description: p.description.clone(),
            price: p.price,
            property_type_id: p.property_type.as_ref().map(|t| t.id).unwrap_or_default(),
            listing_type: p.listing_type,
            bedrooms: p.bedrooms,
            bathrooms: p.bathrooms,
            square_feet: p.square_feet,
            address: p.address.clone(),
            city: p.city.clone(),
            state: p.state.clone(),
            zip_code: p.zip_code.clone(),
            latitude: p.latitude,
            longitude: p.longitude,
            status: p.status,
        }
    }
}

/// An image to attach to a listing. Held in memory so the upload can be
/// replayed after a token refresh.
#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub property: i64,
    pub is_primary: bool,
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

// Helper to deserialize decimal strings ("450000.00") or plain numbers
fn deserialize_decimal<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: serde::Deserializer<'de>,
{
    use serde::de;

    struct DecimalVisitor;

    impl<'de> de::Visitor<'de> for DecimalVisitor {
        type Value = f64;

        fn expecting(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
            formatter.write_str("a number or decimal string")
        }

        fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            v.trim()
                .parse::<f64>()
                .map_err(|_| E::custom(format!("invalid decimal: {}", v)))
        }

        fn visit_i64<E>(self, v: i64) -> Result<Self::Value, E> {
            Ok(v as f64)
        }

        fn visit_u64<E>(self, v: u64) -> Result<Self::Value, E> {
            Ok(v as f64)
        }

        fn visit_f64<E>(self, v: f64) -> Result<Self::Value, E> {
            Ok(v)
        }
    }

    deserializer.deserialize_any(DecimalVisitor)
}

#[cfg(test)]
mod tests {
    use super::*;

    const PROPERTY_JSON: &str = r#"{
        "id": 1,
        "title": "Lake house",
        "description": "Quiet street",
        "price": "450000.00",
        "property_type": {"id": 2, "name": "House"},
        "listing_type": "sale",
        "property_type_id": 2,
        "bedrooms": 3,
        "bathrooms": "2",
        "square_feet": 1800,
        "address": "12 Shore Rd",
        "city": "Kingston",
        "state": "ON",
        "zip_code": "K7L 1A1",
        "latitude": 44.23,
        "longitude": -76.48,
        "status": "available",
        "owner": {"id": 9, "username": "maria", "email": "m@example.com"},
        "created_at": "2024-11-02T10:00:00Z",
        "updated_at": "2024-11-03T10:00:00Z",
        "images": [
            {"property": 1, "image": "/media/a.jpg", "is_primary": false, "id": 4},
            {"property": 1, "image": "/media/b.jpg", "is_primary": true, "id": 5}
        ]
    }"#;

    #[test]
    fn test_parse_property_with_decimal_strings() {
        let property: Property = serde_json::from_str(PROPERTY_JSON).unwrap();
        assert_eq!(property.price, 450000.0);
        assert_eq!(property.bathrooms, 2.0);
        assert_eq!(property.listing_type, ListingType::Sale);
        assert_eq!(property.status, SaleStatus::Available);
        assert_eq!(property.owner.as_ref().unwrap().username, "maria");
        assert_eq!(property.primary_image().unwrap().id, 5);
        assert_eq!(property.coordinates(), Some((44.23, -76.48)));
        assert_eq!(property.full_address(), "12 Shore Rd, Kingston, ON, K7L 1A1");
    }

    #[test]
    fn test_input_from_property_uses_type_id() {
        let property: Property = serde_json::from_str(PROPERTY_JSON).unwrap();
        let input = PropertyInput::from(&property);
        let json = serde_json::to_value(&input).unwrap();
        assert_eq!(json["property_type_id"], 2);
        assert_eq!(json["listing_type"], "sale");
        assert!(json.get("property_type").is_none());
    }
}
