use std::str::FromStr;

use anyhow::anyhow;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

pub const CHART_MIN_CEILING: u64 = 10;

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsOverview {
    pub total_posts: u64,
    pub total_engagement: u64,
    pub reach_growth: f64,
    pub followers_growth: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TimelinePoint {
    pub date: NaiveDate,
    pub engagement: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeRange {
    SevenDays,
    ThirtyDays,
}

impl TimeRange {
    pub fn days(self) -> usize {
        match self {
            TimeRange::SevenDays => 7,
            TimeRange::ThirtyDays => 30,
        }
    }
}

impl FromStr for TimeRange {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "7d" | "7days" => Ok(TimeRange::SevenDays),
            "30d" | "30days" => Ok(TimeRange::ThirtyDays),
            other => Err(anyhow!("unknown time range: {other} (expected 7d or 30d)")),
        }
    }
}

/// Placeholder dashboard figures; nothing here is derived from real activity.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Analytics {
    pub overview: AnalyticsOverview,
    pub timeline: Vec<TimelinePoint>,
}

impl Analytics {
    /// Trailing points of the timeline covering `range`.
    pub fn window(&self, range: TimeRange) -> &[TimelinePoint] {
        let start = self.timeline.len().saturating_sub(range.days());
        &self.timeline[start..]
    }

    pub fn post_created(&mut self) {
        self.overview.total_posts = self.overview.total_posts.saturating_add(1);
    }

    pub fn post_deleted(&mut self) {
        self.overview.total_posts = self.overview.total_posts.saturating_sub(1);
    }
}

/// Top of the engagement chart's y-axis.
pub fn chart_ceiling(points: &[TimelinePoint]) -> u64 {
    points
        .iter()
        .map(|point| point.engagement)
        .max()
        .unwrap_or(0)
        .max(CHART_MIN_CEILING)
}
