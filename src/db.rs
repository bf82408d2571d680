use crate::models::Listing;
use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::{PgPool, Postgres, QueryBuilder};
use std::collections::HashSet;

/// Data-access seam for the persisted listing set
#[async_trait]
pub trait ListingRepo: Send + Sync {
    /// Fetch the set of listing ids seen on previous runs
    async fn known_ids(&self) -> Result<HashSet<String>>;

    /// Bulk-insert new listings, returning the number of rows written
    async fn insert(&self, listings: &[Listing]) -> Result<u64>;
}

/// Persisted listing store backed by the `deptos` table
#[derive(Clone)]
pub struct ListingStore {
    pool: PgPool,
}

/// Column values persisted for one listing: (id, name, url)
fn insert_row(listing: &Listing) -> (&str, &str, &str) {
    (&listing.id, &listing.title, &listing.link)
}

impl ListingStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ListingRepo for ListingStore {
    async fn known_ids(&self) -> Result<HashSet<String>> {
        let rows: Vec<(String,)> = sqlx::query_as("SELECT id FROM deptos")
            .fetch_all(&self.pool)
            .await
            .context("Failed to load known listing ids")?;

        Ok(rows.into_iter().map(|(id,)| id).collect())
    }

    /// The primary key plus ON CONFLICT makes the write idempotent when two
    /// overlapping runs race on the same batch.
    async fn insert(&self, listings: &[Listing]) -> Result<u64> {
        if listings.is_empty() {
            return Ok(0);
        }

        let mut builder: QueryBuilder<Postgres> =
            QueryBuilder::new("INSERT INTO deptos (id, name, url) ");
        builder.push_values(listings, |mut b, listing| {
            let (id, name, url) = insert_row(listing);
            b.push_bind(id.to_string())
                .push_bind(name.to_string())
                .push_bind(url.to_string());
        });
        builder.push(" ON CONFLICT (id) DO NOTHING");

        let result = builder
            .build()
            .execute(&self.pool)
            .await
            .context("Failed to insert new listings")?;

        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn row_derives_exactly_id_title_link() {
        let listing = Listing {
            id: "12345".to_string(),
            title: "Depto centro".to_string(),
            link: "https://clasificados.lavoz.com.ar/inmuebles/12345".to_string(),
            price: "$ 120.000".to_string(),
        };

        assert_eq!(
            insert_row(&listing),
            (
                "12345",
                "Depto centro",
                "https://clasificados.lavoz.com.ar/inmuebles/12345"
            )
        );
    }
}
