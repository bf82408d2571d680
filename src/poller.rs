use crate::db::ListingRepo;
use crate::models::Listing;
use crate::notify::DigestSender;
use crate::scrapers::ListingSource;
use anyhow::Result;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{error, info};

/// Timer-driven fetch→parse→diff→notify loop
pub struct Poller {
    source: Arc<dyn ListingSource>,
    store: Arc<dyn ListingRepo>,
    mailer: Arc<dyn DigestSender>,
}

/// Keep candidates whose id is non-empty and not yet persisted.
/// Order is preserved, so merged multi-page results stay in fetch order.
pub fn filter_new(candidates: Vec<Listing>, known: &HashSet<String>) -> Vec<Listing> {
    candidates
        .into_iter()
        .filter(|l| !l.id.is_empty() && !known.contains(&l.id))
        .collect()
}

impl Poller {
    pub fn new(
        source: Arc<dyn ListingSource>,
        store: Arc<dyn ListingRepo>,
        mailer: Arc<dyn DigestSender>,
    ) -> Self {
        Self {
            source,
            store,
            mailer,
        }
    }

    /// Run batches forever. The first batch waits one full interval, and
    /// batches are serialized on this task, so at most one run executes at a
    /// time no matter how long a run takes.
    pub async fn run(self, every: Duration) {
        let mut ticker = interval_at(Instant::now() + every, every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            if let Err(e) = self.run_once().await {
                // No retry within a batch; the next tick starts from scratch
                error!(error = %e, "Poll run failed");
            }
        }
    }

    /// One batch run. Returns the number of newly discovered listings.
    pub async fn run_once(&self) -> Result<usize> {
        info!(source = self.source.source_name(), "Running...");

        let known = self.store.known_ids().await?;
        let candidates = self.source.scrape().await?;
        let new = filter_new(candidates, &known);

        if new.is_empty() {
            info!("Nada nuevo.");
            return Ok(0);
        }

        let inserted = self.store.insert(&new).await?;
        self.mailer.send_digest(&new).await?;

        info!(found = new.len(), inserted, "New listings persisted and mailed");
        Ok(new.len())
    }
}
