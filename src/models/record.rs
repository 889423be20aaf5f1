//! Harvested record types.

use serde::{Deserialize, Serialize};

/// Stock status classified from the free-form availability text on the page.
///
/// Serialized with the same strings the source displays, so artifacts stay
/// human-readable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Availability {
    #[serde(rename = "In Stock")]
    InStock,
    #[serde(rename = "Sold Out")]
    SoldOut,
    #[default]
    Unknown,
}

/// One harvested product.
///
/// `name` is the natural key: the ledger never holds two records with the
/// same name, and a raw item without a name is rejected before it can enter
/// the ledger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub name: String,
    /// None when the page showed no price or the text did not parse.
    pub price: Option<f64>,
    /// Trimmed of surrounding whitespace.
    pub description: Option<String>,
    /// Reserved; the source does not currently expose ratings. Must
    /// round-trip as absent, never coerced to 0.
    #[serde(default)]
    pub rating: Option<f64>,
    /// Fixed classification for the harvest source, not derived per item.
    pub category: String,
    #[serde(default)]
    pub availability: Availability,
    /// Absolute URL; protocol-relative URLs are rewritten at extraction.
    pub image_url: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_availability_serializes_as_display_strings() {
        assert_eq!(
            serde_json::to_string(&Availability::InStock).unwrap(),
            "\"In Stock\""
        );
        assert_eq!(
            serde_json::to_string(&Availability::SoldOut).unwrap(),
            "\"Sold Out\""
        );
        assert_eq!(
            serde_json::to_string(&Availability::Unknown).unwrap(),
            "\"Unknown\""
        );
    }

    #[test]
    fn test_absent_rating_round_trips_as_absent() {
        let record = Record {
            name: "Basmati Rice 5kg".to_string(),
            price: Some(19.99),
            description: None,
            rating: None,
            category: "All Products".to_string(),
            availability: Availability::InStock,
            image_url: None,
        };
        let json = serde_json::to_string(&record).unwrap();
        let back: Record = serde_json::from_str(&json).unwrap();
        assert_eq!(back.rating, None);
        assert_eq!(back, record);

        // A record written without the rating field at all still loads
        let legacy = r#"{
            "name": "Ghee 1L",
            "price": null,
            "description": null,
            "category": "All Products",
            "availability": "Unknown",
            "image_url": null
        }"#;
        let back: Record = serde_json::from_str(legacy).unwrap();
        assert_eq!(back.rating, None);
    }
}
