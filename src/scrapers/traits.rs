use crate::models::Listing;
use anyhow::Result;
use async_trait::async_trait;

/// Common trait for all listing scrapers
/// This allows easy addition of new classifieds sites in the future
#[async_trait]
pub trait ListingSource: Send + Sync {
    /// Scrape all configured search pages and return every candidate listing
    async fn scrape(&self) -> Result<Vec<Listing>>;

    /// Get the name of the scraper source
    fn source_name(&self) -> &'static str;
}
