use std::str::FromStr;

use anyhow::anyhow;
use chrono::{
  DateTime,
  Utc
};
use tracing::trace;

use crate::post::{
  Platform,
  Post,
  PostStatus
};

pub const UPCOMING_LIMIT: usize = 5;
pub const UPCOMING_CONTENT_CHARS: usize =
  60;

#[derive(
  Debug,
  Clone,
  Copy,
  Default,
  PartialEq,
  Eq,
)]
pub enum StatusFilter {
  #[default]
  All,
  Scheduled,
  Published,
  Draft
}

impl StatusFilter {
  fn admits(
    self,
    status: PostStatus
  ) -> bool {
    match self {
      | StatusFilter::All => true,
      | StatusFilter::Scheduled => {
        status == PostStatus::Scheduled
      }
      | StatusFilter::Published => {
        status == PostStatus::Published
      }
      | StatusFilter::Draft => {
        status == PostStatus::Draft
      }
    }
  }
}

impl FromStr for StatusFilter {
  type Err = anyhow::Error;

  fn from_str(
    s: &str
  ) -> Result<Self, Self::Err> {
    match s
      .trim()
      .to_ascii_lowercase()
      .as_str()
    {
      | "all" => Ok(StatusFilter::All),
      | "scheduled" => {
        Ok(StatusFilter::Scheduled)
      }
      | "published" => {
        Ok(StatusFilter::Published)
      }
      | "draft" | "drafts" => {
        Ok(StatusFilter::Draft)
      }
      | other => {
        Err(anyhow!(
          "unknown status filter: \
           {other} (expected all, \
           scheduled, published or \
           draft)"
        ))
      }
    }
  }
}

/// Content-library selection: status,
/// target platform and a free-text query.
#[derive(Debug, Clone, Default)]
pub struct PostFilter {
  pub status:   StatusFilter,
  pub platform: Option<Platform>,
  pub query:    String
}

impl PostFilter {
  pub fn matches(
    &self,
    post: &Post
  ) -> bool {
    if !self.status.admits(post.status)
    {
      return false;
    }

    if let Some(platform) =
      self.platform.as_ref()
      && !post.targets(platform)
    {
      return false;
    }

    if !self.query.is_empty() {
      let q = self.query.to_lowercase();
      if !post
        .content
        .to_lowercase()
        .contains(&q)
      {
        return false;
      }
    }

    true
  }
}

/// Posts passing `filter`, latest
/// scheduled first.
#[tracing::instrument(skip(
  posts, filter
))]
pub fn visible_posts<'a>(
  posts: &'a [Post],
  filter: &PostFilter
) -> Vec<&'a Post> {
  let mut visible: Vec<&Post> = posts
    .iter()
    .filter(|post| filter.matches(post))
    .collect();
  visible.sort_by(|a, b| {
    b.scheduled_for
      .cmp(&a.scheduled_for)
  });

  trace!(
    total = posts.len(),
    visible = visible.len(),
    status = ?filter.status,
    platform = ?filter.platform,
    "filtered content library"
  );
  visible
}

/// Every platform targeted by at least
/// one post, in order of first use.
pub fn library_platforms(
  posts: &[Post]
) -> Vec<Platform> {
  let mut out: Vec<Platform> = Vec::new();
  for platform in posts
    .iter()
    .flat_map(|post| post.platforms.iter())
  {
    if !out.contains(platform) {
      out.push(platform.clone());
    }
  }
  out
}

pub fn upcoming_posts(
  posts: &[Post],
  now: DateTime<Utc>,
  limit: usize
) -> Vec<&Post> {
  let mut upcoming: Vec<&Post> = posts
    .iter()
    .filter(|post| {
      post.status == PostStatus::Scheduled
        && post.scheduled_for > now
    })
    .collect();
  upcoming
    .sort_by_key(|post| post.scheduled_for);
  upcoming.truncate(limit);
  upcoming
}

/// A view's data as the caller sees it:
/// still loading, or a (possibly empty)
/// result.
#[derive(Debug, Clone, PartialEq)]
pub enum ViewState<T> {
  Loading,
  Ready(T)
}

impl<T> ViewState<T> {
  pub fn is_loading(&self) -> bool {
    matches!(self, ViewState::Loading)
  }

  pub fn ready(self) -> Option<T> {
    match self {
      | ViewState::Loading => None,
      | ViewState::Ready(value) => {
        Some(value)
      }
    }
  }
}
