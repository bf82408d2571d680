use anyhow::{Context, Result};
use reqwest::Url;
use serde::{Deserialize, Serialize};

const SEARCH_BASE: &str = "https://clasificados.lavoz.com.ar/inmuebles/todo";

/// One search-result page to poll: a neighborhood filter plus a page number
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchFilter {
    /// Neighborhood slug as used by the site, e.g. "nueva-cordoba"
    pub barrio: String,
    /// Bedroom-count filter slug
    pub bedrooms: String,
    /// Operation filter slug (rentals vs sales)
    pub operation: String,
    /// 1-based result page number
    pub page: u32,
}

impl SearchFilter {
    /// Rental search for one-bedroom apartments in the given neighborhood
    pub fn rentals(barrio: &str, page: u32) -> Self {
        Self {
            barrio: barrio.to_string(),
            bedrooms: "1-dormitorio".to_string(),
            operation: "alquileres".to_string(),
            page,
        }
    }

    /// Build the full search URL for this filter.
    /// The site accepts both the bare `barrio=` form and the indexed
    /// `barrio[0]=` form its own pages emit; the bare form is used for
    /// every page here.
    pub fn url(&self) -> Result<Url> {
        Url::parse_with_params(
            SEARCH_BASE,
            [
                ("list", "true"),
                ("cantidad-de-dormitorios[0]", self.bedrooms.as_str()),
                ("operacion", self.operation.as_str()),
                ("provincia", "cordoba"),
                ("ciudad", "cordoba"),
                ("barrio", self.barrio.as_str()),
                ("page", &self.page.to_string()),
            ],
        )
        .context("Failed to build search URL")
    }
}

/// The fixed set of search pages polled on every run
pub fn default_watchlist() -> Vec<SearchFilter> {
    vec![
        SearchFilter::rentals("general-paz", 1),
        SearchFilter::rentals("nueva-cordoba", 1),
        SearchFilter::rentals("nueva-cordoba", 2),
        SearchFilter::rentals("centro", 1),
    ]
}
