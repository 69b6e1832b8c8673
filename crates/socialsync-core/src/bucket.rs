use chrono::{NaiveDate, Timelike};
use chrono_tz::Tz;
use tracing::trace;

use crate::datetime::to_local_date;
use crate::post::Post;

pub const HOURS_PER_DAY: usize = 24;
pub const MONTH_CELL_PREVIEW_LIMIT: usize = 3;
pub const MONTH_CELL_CONTENT_CHARS: usize = 20;

/// Posts whose instant falls on `date` in `tz`, earliest first.
///
/// Day bounds are wall-clock midnight to midnight in `tz`. Equal timestamps
/// keep their input order.
#[tracing::instrument(skip(posts, tz), fields(total = posts.len()))]
pub fn posts_for_day<'a>(posts: &'a [Post], date: NaiveDate, tz: &Tz) -> Vec<&'a Post> {
    let mut day_posts: Vec<&Post> = posts
        .iter()
        .filter(|post| to_local_date(post.scheduled_for, tz) == date)
        .collect();
    day_posts.sort_by_key(|post| post.scheduled_for);
    trace!(count = day_posts.len(), "collected posts for day");
    day_posts
}

/// A day's posts split into the 24 local hours.
#[derive(Debug, Clone)]
pub struct HourBuckets<'a> {
    buckets: [Vec<&'a Post>; HOURS_PER_DAY],
}

impl<'a> HourBuckets<'a> {
    pub fn get(&self, hour: usize) -> &[&'a Post] {
        self.buckets
            .get(hour)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Non-empty buckets in hour order.
    pub fn occupied(&self) -> impl Iterator<Item = (usize, &[&'a Post])> {
        self.buckets
            .iter()
            .enumerate()
            .filter(|(_, bucket)| !bucket.is_empty())
            .map(|(hour, bucket)| (hour, bucket.as_slice()))
    }

    pub fn total(&self) -> usize {
        self.buckets.iter().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }
}

#[tracing::instrument(skip(posts, tz), fields(total = posts.len()))]
pub fn posts_by_hour<'a>(posts: &'a [Post], date: NaiveDate, tz: &Tz) -> HourBuckets<'a> {
    let mut buckets: [Vec<&'a Post>; HOURS_PER_DAY] = std::array::from_fn(|_| Vec::new());

    for post in posts_for_day(posts, date, tz) {
        let hour = post.scheduled_for.with_timezone(tz).hour() as usize;
        buckets[hour].push(post);
    }

    HourBuckets { buckets }
}

/// What a month-view cell has room for.
#[derive(Debug, Clone, PartialEq)]
pub struct CellPreview<'a> {
    pub shown: Vec<&'a Post>,
    pub overflow: usize,
}

impl<'a> CellPreview<'a> {
    pub fn of(day_posts: &[&'a Post], limit: usize) -> Self {
        let shown: Vec<&Post> = day_posts.iter().take(limit).copied().collect();
        Self {
            overflow: day_posts.len() - shown.len(),
            shown,
        }
    }
}

/// Shortens `content` to `max` characters, marking the cut with `...`.
pub fn truncate_content(content: &str, max: usize) -> String {
    match content.char_indices().nth(max) {
        Some((byte_idx, _)) => format!("{}...", &content[..byte_idx]),
        None => content.to_string(),
    }
}
