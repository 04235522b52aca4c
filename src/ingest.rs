//! Turns fetched feed items into stored posts.

use chrono::{DateTime, Utc, Weekday};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::db::{Database, Feed, NewPost, PostInsert};
use crate::fetcher::FeedItem;

/// RFC 1123 with a numeric zone, e.g. `Mon, 02 Jan 2006 15:04:05 -0700`.
pub const PUB_DATE_FORMAT: &str = "%a, %d %b %Y %H:%M:%S %z";

/// [`PUB_DATE_FORMAT`] after the leading weekday.
const PUB_DATE_BODY_FORMAT: &str = "%d %b %Y %H:%M:%S %z";

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct IngestReport {
    pub inserted: usize,
    pub already_present: usize,
    pub failed: usize,
}

impl IngestReport {
    pub fn total(&self) -> usize {
        self.inserted + self.already_present + self.failed
    }
}

/// `None` when the string does not match [`PUB_DATE_FORMAT`]. The weekday
/// must be a valid abbreviation but need not agree with the date; feeds get
/// it wrong often enough.
pub fn parse_pub_date(raw: &str) -> Option<DateTime<Utc>> {
    let (weekday, body) = raw.trim().split_once(", ")?;
    if weekday.len() != 3 || weekday.parse::<Weekday>().is_err() {
        return None;
    }

    DateTime::parse_from_str(body, PUB_DATE_BODY_FORMAT)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

pub fn new_post(feed_id: Uuid, item: &FeedItem) -> NewPost {
    let now = Utc::now();
    NewPost {
        id: Uuid::new_v4(),
        created_at: now,
        updated_at: now,
        title: item.title.clone().unwrap_or_default(),
        url: item.link.clone().unwrap_or_default(),
        description: item.description.clone().unwrap_or_default(),
        published_at: item.pub_date.as_deref().and_then(parse_pub_date),
        feed_id,
    }
}

/// Writes every item in order. A failed write only skips that item.
pub async fn ingest_items(db: &Database, feed: &Feed, items: &[FeedItem]) -> IngestReport {
    let mut report = IngestReport::default();

    for item in items {
        let post = new_post(feed.id, item);
        match db.create_post(&post).await {
            Ok(PostInsert::Inserted(_)) => report.inserted += 1,
            Ok(PostInsert::AlreadyExists) => {
                debug!(feed = %feed.name, url = %post.url, "post already stored");
                report.already_present += 1;
            }
            Err(e) => {
                warn!(feed = %feed.name, url = %post.url, "Couldn't create post: {}", e);
                report.failed += 1;
            }
        }
    }

    report
}
