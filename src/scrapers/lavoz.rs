use crate::models::Listing;
use crate::scrapers::traits::ListingSource;
use crate::scrapers::types::SearchFilter;
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use futures::future::try_join_all;
use reqwest::Client;
use scraper::{ElementRef, Html, Selector};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Result rows live under the 3rd child of `.col-9` on page 1 of a search,
/// but under the 1st child on every later page. Positional, fragile, and
/// matches the site's current markup.
const ROWS_FIRST_PAGE: &str =
    ".clearfix > div > :nth-child(2) > div > .col-9 > :nth-child(3) > .flex-wrap > .col-12";
const ROWS_LATER_PAGE: &str =
    ".clearfix > div > :nth-child(2) > div > .col-9 > :nth-child(1) > .flex-wrap > .col-12";

const TITLE: &str = ".col-7 > .flex-auto > a > div";
const LINK: &str = ".col-7 > .flex-auto > a";
const PRICE: &str = ".col-7 > .flex-auto > .py1 > div > p";
const ID: &str = ".col-5 > amp-state";

/// Listing id as published in the DOM, e.g. `id="selected_12345"`
const ID_PREFIX: &str = "selected_";

struct RowSelectors {
    rows_first_page: Selector,
    rows_later_page: Selector,
    title: Selector,
    link: Selector,
    price: Selector,
    id: Selector,
}

/// La Voz classifieds scraper implementation
pub struct LavozScraper {
    client: Client,
    watchlist: Vec<SearchFilter>,
    selectors: RowSelectors,
}

fn selector(css: &str) -> Result<Selector> {
    Selector::parse(css).map_err(|e| anyhow!("Invalid selector `{}`: {}", css, e))
}

fn text_of(el: ElementRef) -> String {
    el.text().collect::<String>().trim().to_string()
}

impl LavozScraper {
    /// Create a new scraper polling the given search pages
    pub fn new(watchlist: Vec<SearchFilter>) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent("Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36")
            .build()
            .context("Failed to create HTTP client")?;

        let selectors = RowSelectors {
            rows_first_page: selector(ROWS_FIRST_PAGE)?,
            rows_later_page: selector(ROWS_LATER_PAGE)?,
            title: selector(TITLE)?,
            link: selector(LINK)?,
            price: selector(PRICE)?,
            id: selector(ID)?,
        };

        Ok(Self {
            client,
            watchlist,
            selectors,
        })
    }

    async fn fetch_page(&self, filter: &SearchFilter) -> Result<Vec<Listing>> {
        let url = filter.url()?;
        debug!(%url, "Fetching search page");

        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .with_context(|| format!("Failed to fetch {}", url))?;

        if !response.status().is_success() {
            anyhow::bail!("HTTP {} for {}", response.status(), url);
        }

        let html = response.text().await.context("Failed to read response body")?;
        debug!(bytes = html.len(), "Downloaded search page");

        let listings = self.parse_listings(&html, filter.page);
        if listings.is_empty() {
            warn!(barrio = %filter.barrio, page = filter.page, "No listings parsed from page");
        }
        Ok(listings)
    }

    /// Extract listing candidates from one search-result page.
    /// Missing fields extract as empty strings; a row without an id is kept
    /// here and dropped later by the dedup filter.
    fn parse_listings(&self, html: &str, page: u32) -> Vec<Listing> {
        let document = Html::parse_document(html);
        let rows = if page <= 1 {
            &self.selectors.rows_first_page
        } else {
            &self.selectors.rows_later_page
        };

        document
            .select(rows)
            .map(|row| {
                let title = row
                    .select(&self.selectors.title)
                    .next()
                    .map(text_of)
                    .unwrap_or_default();
                let link = row
                    .select(&self.selectors.link)
                    .next()
                    .and_then(|a| a.value().attr("href"))
                    .unwrap_or_default()
                    .to_string();
                let price = row
                    .select(&self.selectors.price)
                    .next()
                    .map(text_of)
                    .unwrap_or_default();
                let id = row
                    .select(&self.selectors.id)
                    .next()
                    .and_then(|el| el.value().attr("id"))
                    .map(|raw| raw.strip_prefix(ID_PREFIX).unwrap_or(raw).to_string())
                    .unwrap_or_default();

                Listing {
                    id,
                    title,
                    link,
                    price,
                }
            })
            .collect()
    }
}

#[async_trait]
impl ListingSource for LavozScraper {
    async fn scrape(&self) -> Result<Vec<Listing>> {
        // All pages fetched concurrently; one failed fetch fails the whole
        // batch and the next timer tick retries from scratch.
        let fetches = self.watchlist.iter().map(|filter| self.fetch_page(filter));
        let pages = try_join_all(fetches).await?;

        let listings: Vec<Listing> = pages.into_iter().flatten().collect();
        info!(
            pages = self.watchlist.len(),
            candidates = listings.len(),
            "Scrape finished"
        );
        Ok(listings)
    }

    fn source_name(&self) -> &'static str {
        "clasificados.lavoz.com.ar"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(id_attr: &str, title: &str, href: &str, price: &str) -> String {
        format!(
            r#"<div class="col-12">
                 <div class="col-7">
                   <div class="flex-auto">
                     <a href="{href}"><div>{title}</div></a>
                     <div class="py1"><div><p>{price}</p></div></div>
                   </div>
                 </div>
                 <div class="col-5">{id_attr}</div>
               </div>"#
        )
    }

    /// Wrap rows in the page-1 markup: results under the 3rd child of .col-9
    fn first_page(rows: &str) -> String {
        format!(
            r#"<html><body>
               <div class="clearfix">
                 <div>
                   <span>filters</span>
                   <div>
                     <div>
                       <div class="col-9">
                         <div>header</div>
                         <div>sort bar</div>
                         <div><div class="flex-wrap">{rows}</div></div>
                       </div>
                     </div>
                   </div>
                 </div>
               </div>
               </body></html>"#
        )
    }

    /// Later pages put the results under the 1st child of .col-9
    fn later_page(rows: &str) -> String {
        format!(
            r#"<html><body>
               <div class="clearfix">
                 <div>
                   <span>filters</span>
                   <div>
                     <div>
                       <div class="col-9">
                         <div><div class="flex-wrap">{rows}</div></div>
                       </div>
                     </div>
                   </div>
                 </div>
               </div>
               </body></html>"#
        )
    }

    fn scraper() -> LavozScraper {
        LavozScraper::new(Vec::new()).unwrap()
    }

    #[test]
    fn extracts_all_fields_and_strips_id_prefix() {
        let html = first_page(&row(
            r#"<amp-state id="selected_12345"></amp-state>"#,
            "Depto un dormitorio Nueva Cordoba",
            "https://clasificados.lavoz.com.ar/inmuebles/depto-12345",
            "$ 120.000",
        ));

        let listings = scraper().parse_listings(&html, 1);
        assert_eq!(listings.len(), 1);
        assert_eq!(
            listings[0],
            Listing {
                id: "12345".to_string(),
                title: "Depto un dormitorio Nueva Cordoba".to_string(),
                link: "https://clasificados.lavoz.com.ar/inmuebles/depto-12345".to_string(),
                price: "$ 120.000".to_string(),
            }
        );
    }

    #[test]
    fn row_without_amp_state_yields_empty_id() {
        let html = first_page(&row(
            "",
            "Sin estado",
            "https://clasificados.lavoz.com.ar/inmuebles/x",
            "$ 90.000",
        ));

        let listings = scraper().parse_listings(&html, 1);
        assert_eq!(listings.len(), 1);
        assert_eq!(listings[0].id, "");
        assert_eq!(listings[0].title, "Sin estado");
    }

    #[test]
    fn preserves_row_order() {
        let rows = [
            row(r#"<amp-state id="selected_a"></amp-state>"#, "A", "a", "$1"),
            row(r#"<amp-state id="selected_b"></amp-state>"#, "B", "b", "$2"),
            row(r#"<amp-state id="selected_c"></amp-state>"#, "C", "c", "$3"),
        ]
        .concat();

        let listings = scraper().parse_listings(&first_page(&rows), 1);
        let ids: Vec<&str> = listings.iter().map(|l| l.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
    }

    #[test]
    fn later_pages_use_the_first_child_row_selector() {
        let rows = row(
            r#"<amp-state id="selected_777"></amp-state>"#,
            "Pagina dos",
            "https://clasificados.lavoz.com.ar/inmuebles/777",
            "$ 150.000",
        );

        // Page-2 markup is invisible to the page-1 selector and vice versa
        assert_eq!(scraper().parse_listings(&later_page(&rows), 2).len(), 1);
        assert_eq!(scraper().parse_listings(&later_page(&rows), 1).len(), 0);
        assert_eq!(scraper().parse_listings(&first_page(&rows), 2).len(), 0);
    }
}
