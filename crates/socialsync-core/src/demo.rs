use chrono::{DateTime, Duration, Utc};

use crate::analytics::{Analytics, AnalyticsOverview, TimelinePoint};
use crate::post::{Engagement, Platform, Post, PostStatus, SocialAccount};

const TIMELINE_DAYS: i64 = 30;

/// Everything the dashboard shows for the demo account.
#[derive(Debug, Clone)]
pub struct DashboardData {
    pub posts: Vec<Post>,
    pub analytics: Analytics,
    pub social_accounts: Vec<SocialAccount>,
}

#[tracing::instrument]
pub fn demo_dashboard(now: DateTime<Utc>) -> DashboardData {
    DashboardData {
        posts: demo_posts(now),
        analytics: demo_analytics(now),
        social_accounts: demo_accounts(),
    }
}

pub fn demo_posts(now: DateTime<Utc>) -> Vec<Post> {
    vec![
        Post {
            id: "post-1".to_string(),
            content: "Check out our latest product launch!".to_string(),
            platforms: platforms(&["twitter", "linkedin"]),
            scheduled_for: now + Duration::days(1),
            status: PostStatus::Scheduled,
            media: vec![],
            engagement: None,
        },
        Post {
            id: "post-2".to_string(),
            content: "We're hiring! Join our team of passionate professionals.".to_string(),
            platforms: platforms(&["linkedin", "facebook"]),
            scheduled_for: now + Duration::days(2),
            status: PostStatus::Draft,
            media: vec![],
            engagement: None,
        },
        Post {
            id: "post-3".to_string(),
            content: "Thanks to everyone who attended our webinar yesterday!".to_string(),
            platforms: platforms(&["twitter", "facebook", "instagram"]),
            scheduled_for: now - Duration::days(1),
            status: PostStatus::Published,
            media: vec![],
            engagement: Some(Engagement {
                likes: 45,
                comments: 12,
                shares: 8,
            }),
        },
    ]
}

pub fn demo_analytics(now: DateTime<Utc>) -> Analytics {
    let today = now.date_naive();
    // Fixed wave in [20, 119] so the placeholder chart is stable across runs.
    let timeline = (0..TIMELINE_DAYS)
        .rev()
        .map(|days_ago| TimelinePoint {
            date: today - Duration::days(days_ago),
            engagement: 20 + ((days_ago as u64 * 37 + 11) % 100),
        })
        .collect();

    Analytics {
        overview: AnalyticsOverview {
            total_posts: 24,
            total_engagement: 1250,
            reach_growth: 15.8,
            followers_growth: 7.2,
        },
        timeline,
    }
}

pub fn demo_accounts() -> Vec<SocialAccount> {
    [
        ("account-1", "Twitter", "@yourbrand", true),
        ("account-2", "LinkedIn", "Your Brand", true),
        ("account-3", "Facebook", "Your Brand Page", true),
        ("account-4", "Instagram", "@yourbrand", false),
    ]
    .into_iter()
    .map(|(id, name, username, connected)| SocialAccount {
        id: id.to_string(),
        name: name.to_string(),
        username: username.to_string(),
        connected,
    })
    .collect()
}

fn platforms(ids: &[&str]) -> Vec<Platform> {
    ids.iter().map(|id| Platform::new(id)).collect()
}
