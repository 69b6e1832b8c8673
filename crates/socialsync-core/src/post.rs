use std::fmt;

use anyhow::anyhow;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum PostStatus {
    Draft,
    Scheduled,
    Published,
    Failed,
}

impl PostStatus {
    pub fn as_key(self) -> &'static str {
        match self {
            PostStatus::Draft => "draft",
            PostStatus::Scheduled => "scheduled",
            PostStatus::Published => "published",
            PostStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for PostStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_key())
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Engagement {
    pub likes: u64,
    pub comments: u64,
    pub shares: u64,
}

/// Lowercase identifier of a social network a post targets.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(transparent)]
pub struct Platform(String);

impl Platform {
    /// Builds an identifier without consulting a registry.
    pub fn new(id: &str) -> Self {
        Self(id.trim().to_lowercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone)]
pub struct PlatformEntry {
    pub platform: Platform,
    pub display_name: String,
}

/// Set of platforms posts may be created for.
#[derive(Debug, Clone)]
pub struct PlatformRegistry {
    entries: Vec<PlatformEntry>,
}

impl Default for PlatformRegistry {
    fn default() -> Self {
        let entries = [
            ("facebook", "Facebook"),
            ("instagram", "Instagram"),
            ("twitter", "Twitter"),
            ("linkedin", "LinkedIn"),
            ("tiktok", "TikTok"),
            ("pinterest", "Pinterest"),
        ]
        .into_iter()
        .map(|(id, name)| PlatformEntry {
            platform: Platform(id.to_string()),
            display_name: name.to_string(),
        })
        .collect();

        Self { entries }
    }
}

impl PlatformRegistry {
    pub fn entries(&self) -> &[PlatformEntry] {
        &self.entries
    }

    pub fn resolve(&self, raw: &str) -> anyhow::Result<Platform> {
        let key = Platform::new(raw);
        self.entries
            .iter()
            .find(|entry| entry.platform == key)
            .map(|entry| entry.platform.clone())
            .ok_or_else(|| {
                let known = self
                    .entries
                    .iter()
                    .map(|entry| entry.platform.as_str())
                    .collect::<Vec<_>>()
                    .join(", ");
                anyhow!("unsupported platform: {raw} (expected one of: {known})")
            })
    }

    pub fn display_name<'a>(&'a self, platform: &'a Platform) -> &'a str {
        self.entries
            .iter()
            .find(|entry| &entry.platform == platform)
            .map(|entry| entry.display_name.as_str())
            .unwrap_or(platform.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    pub id: String,
    pub content: String,
    pub platforms: Vec<Platform>,
    pub scheduled_for: DateTime<Utc>,
    pub status: PostStatus,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub media: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub engagement: Option<Engagement>,
}

impl Post {
    pub fn cover_media(&self) -> Option<&str> {
        self.media.first().map(String::as_str)
    }

    pub fn targets(&self, platform: &Platform) -> bool {
        self.platforms.iter().any(|p| p == platform)
    }
}

/// Unvalidated input of the create-post form.
#[derive(Debug, Clone)]
pub struct NewPost {
    pub content: String,
    pub platforms: Vec<String>,
    pub scheduled_for: DateTime<Utc>,
    pub media: Vec<String>,
}

impl NewPost {
    /// Checks the form against `registry` and builds a scheduled post.
    ///
    /// Content must not be blank and at least one registered platform must
    /// be selected. Repeated platforms collapse onto their first occurrence.
    #[tracing::instrument(skip_all)]
    pub fn validate(self, registry: &PlatformRegistry) -> anyhow::Result<Post> {
        if self.content.trim().is_empty() {
            return Err(anyhow!("post content cannot be empty"));
        }
        if self.platforms.is_empty() {
            return Err(anyhow!("select at least one platform"));
        }

        let mut platforms: Vec<Platform> = Vec::with_capacity(self.platforms.len());
        for raw in &self.platforms {
            let platform = registry.resolve(raw)?;
            if !platforms.contains(&platform) {
                platforms.push(platform);
            }
        }

        Ok(Post {
            id: format!("post-{}", Uuid::new_v4()),
            content: self.content,
            platforms,
            scheduled_for: self.scheduled_for,
            status: PostStatus::Scheduled,
            media: self.media,
            engagement: None,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SocialAccount {
    pub id: String,
    pub name: String,
    pub username: String,
    pub connected: bool,
}

pub fn connected_accounts(accounts: &[SocialAccount]) -> Vec<&SocialAccount> {
    accounts.iter().filter(|account| account.connected).collect()
}
