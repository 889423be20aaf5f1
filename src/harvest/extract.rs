//! Record extraction from one raw visible item.

use crate::config::SourceConfig;
use crate::driver::ElementHandle;
use crate::harvest::normalize::{absolutize_image_url, classify_availability, parse_price};
use crate::models::{Availability, Record};

/// Builds typed records from raw item elements.
///
/// Holds no state beyond the selector set and the fixed category for this
/// source; all reads go through the element handle.
pub struct RecordExtractor {
    source: SourceConfig,
}

impl RecordExtractor {
    pub fn new(source: SourceConfig) -> Self {
        Self { source }
    }

    /// Read just the identity of an item.
    ///
    /// The loop checks this against the ledger before paying for a full
    /// extraction; known items are skipped without reading their other
    /// fields.
    pub async fn identity(&self, item: &dyn ElementHandle) -> Option<String> {
        self.text_of(item, &self.source.name_selector).await
    }

    /// Extract one record, or None when the item has no name.
    ///
    /// The name is read first: without it there is no dedup key and the item
    /// is skipped entirely - no partial record. Every other field is built
    /// independently, so a missing sub-field degrades that field to
    /// absent/`Unknown` instead of failing the record.
    pub async fn extract(&self, item: &dyn ElementHandle) -> Option<Record> {
        let name = self.text_of(item, &self.source.name_selector).await?;

        // Sale price takes precedence over the regular listing price
        let raw_price = match self.text_of(item, &self.source.sale_price_selector).await {
            Some(price) => Some(price),
            None => self.text_of(item, &self.source.price_selector).await,
        };

        let description = self
            .text_of(item, &self.source.description_selector)
            .await
            .map(|d| d.trim().to_string())
            .filter(|d| !d.is_empty());

        let availability = classify_availability(
            self.text_of(item, &self.source.availability_selector)
                .await
                .as_deref(),
        )
        .unwrap_or(Availability::Unknown);

        let image_url = match item.query(&self.source.image_selector).await {
            Some(img) => absolutize_image_url(
                img.attribute(&self.source.image_attribute).await.as_deref(),
                &self.source.image_width_token,
                &self.source.image_width,
            ),
            None => None,
        };

        Some(Record {
            name,
            price: parse_price(raw_price.as_deref()),
            description,
            rating: None, // source does not expose ratings
            category: self.source.category.clone(),
            availability,
            image_url,
        })
    }

    async fn text_of(&self, item: &dyn ElementHandle, selector: &str) -> Option<String> {
        let element = item.query(selector).await?;
        element.text().await.filter(|t| !t.is_empty())
    }
}
