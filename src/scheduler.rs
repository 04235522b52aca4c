//! Periodic feed refresh.
//!
//! Each tick claims the stalest `batch_size` feeds and spawns one task per
//! feed. Tasks are detached: the next tick does not wait for them, and
//! cancelling the scheduler does not cancel them.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::db::{Database, Feed};
use crate::fetcher::Fetcher;
use crate::ingest::{self, IngestReport};

/// Terminal state of one feed's handling within a tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedOutcome {
    Ingested(IngestReport),
    Abandoned,
}

pub struct Scheduler {
    db: Arc<Database>,
    fetcher: Arc<Fetcher>,
    interval: Duration,
    batch_size: u32,
}

impl Scheduler {
    pub fn new(
        db: Arc<Database>,
        fetcher: Arc<Fetcher>,
        interval: Duration,
        batch_size: u32,
    ) -> Self {
        Self {
            db,
            fetcher,
            interval,
            batch_size,
        }
    }

    /// Loop until `shutdown` is cancelled. The first tick fires immediately.
    pub async fn run(self, shutdown: CancellationToken) {
        info!(
            interval_secs = self.interval.as_secs(),
            batch_size = self.batch_size,
            "Starting feed scheduler"
        );

        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    info!("Feed scheduler stopped");
                    return;
                }
                _ = ticker.tick() => {
                    if let Err(e) = self.tick().await {
                        error!("Error claiming feeds: {}", e);
                    }
                }
            }
        }
    }

    /// Claim one batch and dispatch it. Dropping the handles detaches the tasks.
    pub async fn tick(&self) -> anyhow::Result<Vec<JoinHandle<FeedOutcome>>> {
        let feeds = self.db.claim_next_feeds_to_fetch(self.batch_size).await?;
        info!("Claimed {} feeds to fetch", feeds.len());

        Ok(feeds
            .into_iter()
            .map(|feed| {
                let db = self.db.clone();
                let fetcher = self.fetcher.clone();
                tokio::spawn(async move { process_feed(&db, &fetcher, feed).await })
            })
            .collect())
    }
}

/// Mark the feed fetched, then fetch and ingest it.
///
/// The timestamp moves before the fetch so a feed that hangs or fails is
/// not claimed again until the rest of the rotation has had a turn.
pub async fn process_feed(db: &Database, fetcher: &Fetcher, feed: Feed) -> FeedOutcome {
    let feed = match db.mark_feed_fetched(feed.id).await {
        Ok(feed) => feed,
        Err(e) => {
            error!("Couldn't mark feed '{}' fetched: {}", feed.name, e);
            return FeedOutcome::Abandoned;
        }
    };

    let items = match fetcher.fetch(&feed.url).await {
        Ok(items) => items,
        Err(e) => {
            warn!("Couldn't collect feed '{}' ({}): {}", feed.name, feed.url, e);
            return FeedOutcome::Abandoned;
        }
    };

    let report = ingest::ingest_items(db, &feed, &items).await;
    info!(
        inserted = report.inserted,
        already_present = report.already_present,
        failed = report.failed,
        "Feed '{}' collected, {} posts found",
        feed.name,
        items.len()
    );

    FeedOutcome::Ingested(report)
}
