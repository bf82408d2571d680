use serde::{Deserialize, Serialize};

/// A single scraped classified listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Listing {
    /// External identifier taken from the page DOM; empty when the row
    /// carried no `amp-state` element
    pub id: String,
    pub title: String,
    /// URL of the listing detail page
    pub link: String,
    /// Free-text price label as shown on the site, e.g. "$ 120.000"
    pub price: String,
}
