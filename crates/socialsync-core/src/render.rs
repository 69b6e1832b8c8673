use std::io::{self, IsTerminal, Write};

use anyhow::anyhow;
use chrono::NaiveDate;
use chrono_tz::Tz;
use unicode_width::UnicodeWidthStr;

use crate::analytics::{Analytics, TimeRange, chart_ceiling};
use crate::bucket::{
    CellPreview, HourBuckets, MONTH_CELL_CONTENT_CHARS, MONTH_CELL_PREVIEW_LIMIT, posts_for_day,
    truncate_content,
};
use crate::calendar::MonthGrid;
use crate::config::Config;
use crate::datetime::format_local_time;
use crate::filter::UPCOMING_CONTENT_CHARS;
use crate::i18n::Dictionary;
use crate::post::{Platform, PlatformRegistry, Post, SocialAccount, connected_accounts};

const WEEKDAY_KEYS: [&str; 7] = ["mon", "tue", "wed", "thu", "fri", "sat", "sun"];
const LIBRARY_CONTENT_CHARS: usize = 40;
const CHART_WIDTH: usize = 30;

/// Writes dashboard views as terminal text, labelled through a dictionary.
#[derive(Debug, Clone)]
pub struct Renderer {
    color: bool,
    tz: Tz,
    dict: Dictionary,
    registry: PlatformRegistry,
}

impl Renderer {
    pub fn new(cfg: &Config, tz: Tz, dict: Dictionary) -> anyhow::Result<Self> {
        let color_cfg = cfg.get("color").unwrap_or_else(|| "on".to_string());
        let color = match color_cfg.to_ascii_lowercase().as_str() {
            "on" | "yes" | "true" | "1" => true,
            "off" | "no" | "false" | "0" => false,
            other => return Err(anyhow!("invalid color setting: {other}")),
        };

        Ok(Self {
            color,
            tz,
            dict,
            registry: PlatformRegistry::default(),
        })
    }

    pub fn dictionary(&self) -> &Dictionary {
        &self.dict
    }

    pub fn timezone(&self) -> &Tz {
        &self.tz
    }

    /// Month grid with per-day counts, then a preview of each busy day.
    #[tracing::instrument(
        skip(self, out, grid, posts),
        fields(year = grid.year(), month0 = grid.month0())
    )]
    pub fn month<W: Write>(
        &self,
        out: &mut W,
        grid: &MonthGrid,
        posts: &[Post],
    ) -> anyhow::Result<()> {
        writeln!(
            out,
            "{} {}",
            self.dict.t("calendar.title"),
            grid.first_of_month().format("%Y-%m")
        )?;

        let header = WEEKDAY_KEYS
            .iter()
            .map(|key| pad(&self.dict.t(&format!("calendar.weekday.{key}")), 7))
            .collect::<String>();
        writeln!(out, "{}", header.trim_end())?;

        for week in grid.weeks() {
            let mut line = String::new();
            for day in week {
                let count = posts_for_day(posts, day.date, &self.tz).len();
                let mut cell = day.date.format("%e").to_string();
                if count > 0 {
                    cell.push_str(&format!("({count})"));
                }
                let cell = pad(&cell, 7);
                let cell = if day.is_today {
                    self.paint(&cell, "7")
                } else if !day.is_current_month {
                    self.paint(&cell, "2")
                } else {
                    cell
                };
                line.push_str(&cell);
            }
            writeln!(out, "{}", line.trim_end())?;
        }

        for day in grid.days().iter().filter(|day| day.is_current_month) {
            let day_posts = posts_for_day(posts, day.date, &self.tz);
            if day_posts.is_empty() {
                continue;
            }
            writeln!(out)?;
            writeln!(out, "{}", self.paint(&day.date.format("%Y-%m-%d").to_string(), "1"))?;

            let preview = CellPreview::of(&day_posts, MONTH_CELL_PREVIEW_LIMIT);
            for post in preview.shown {
                writeln!(
                    out,
                    "  {} - {}",
                    format_local_time(post.scheduled_for, &self.tz),
                    truncate_content(&post.content, MONTH_CELL_CONTENT_CHARS)
                )?;
            }
            if preview.overflow > 0 {
                writeln!(out, "  +{} {}", preview.overflow, self.dict.t("dashboard.morePosts"))?;
            }
        }

        Ok(())
    }

    /// Posts of one day grouped under their hour.
    #[tracing::instrument(skip(self, out, buckets), fields(total = buckets.total()))]
    pub fn day<W: Write>(
        &self,
        out: &mut W,
        date: NaiveDate,
        buckets: &HourBuckets<'_>,
    ) -> anyhow::Result<()> {
        writeln!(out, "{}", self.paint(&date.format("%Y-%m-%d").to_string(), "1"))?;

        if buckets.is_empty() {
            writeln!(out, "{}", self.dict.t("dashboard.noPostsScheduled"))?;
            writeln!(out, "{}", self.dict.t("dashboard.getStartedByCreatingPost"))?;
            return Ok(());
        }

        for (hour, posts) in buckets.occupied() {
            writeln!(out, "{hour}:00")?;
            for post in posts {
                let mut line = format!(
                    "  {}  {}  {}",
                    format_local_time(post.scheduled_for, &self.tz),
                    self.platform_names(post),
                    post.content
                );
                if let Some(media) = post.cover_media() {
                    line.push_str(&format!("  [{}: {media}]", self.dict.t("dashboard.media")));
                }
                writeln!(out, "{line}")?;
            }
        }

        Ok(())
    }

    /// Library table followed by every platform in use.
    #[tracing::instrument(skip(self, out, posts, in_use), fields(count = posts.len()))]
    pub fn library<W: Write>(
        &self,
        out: &mut W,
        posts: &[&Post],
        in_use: &[Platform],
    ) -> anyhow::Result<()> {
        if posts.is_empty() {
            writeln!(out, "{}", self.dict.t("dashboard.noPostsFound"))?;
            writeln!(out, "{}", self.dict.t("dashboard.tryDifferentFilters"))?;
            return Ok(());
        }

        let headers = vec![
            self.dict.t("dashboard.id"),
            self.dict.t("dashboard.status"),
            self.dict.t("dashboard.scheduledFor"),
            self.dict.t("dashboard.platforms"),
            self.dict.t("dashboard.content"),
        ];

        let rows = posts
            .iter()
            .map(|post| {
                vec![
                    self.paint(&post.id, "33"),
                    self.dict.t(&format!("status.{}", post.status.as_key())),
                    post.scheduled_for
                        .with_timezone(&self.tz)
                        .format("%Y-%m-%d %H:%M")
                        .to_string(),
                    self.platform_names(post),
                    truncate_content(&post.content, LIBRARY_CONTENT_CHARS),
                ]
            })
            .collect();

        write_table(&mut *out, headers, rows)?;

        let names = in_use
            .iter()
            .map(|platform| self.registry.display_name(platform))
            .collect::<Vec<_>>()
            .join(", ");
        writeln!(out, "{}: {names}", self.dict.t("dashboard.platforms"))?;
        Ok(())
    }

    /// Stat cards, the engagement chart, upcoming posts and accounts.
    #[tracing::instrument(skip(self, out, analytics, upcoming, accounts))]
    pub fn overview<W: Write>(
        &self,
        out: &mut W,
        analytics: &Analytics,
        range: TimeRange,
        upcoming: &[&Post],
        accounts: &[SocialAccount],
    ) -> anyhow::Result<()> {
        let stats = &analytics.overview;
        let cards = [
            ("dashboard.totalPosts", stats.total_posts.to_string()),
            ("dashboard.totalEngagement", stats.total_engagement.to_string()),
            ("dashboard.reachGrowth", format!("+{:.1}%", stats.reach_growth)),
            ("dashboard.followersGrowth", format!("+{:.1}%", stats.followers_growth)),
        ];
        let label_width = cards
            .iter()
            .map(|(key, _)| UnicodeWidthStr::width(self.dict.t(key).as_str()))
            .max()
            .unwrap_or(0);
        for (key, value) in &cards {
            writeln!(out, "{}  {}", pad(&self.dict.t(key), label_width), self.paint(value, "1"))?;
        }

        writeln!(out)?;
        writeln!(out, "{} ({}d)", self.dict.t("dashboard.activityOverview"), range.days())?;
        let window = analytics.window(range);
        let ceiling = chart_ceiling(window);
        for point in window {
            let width = (point.engagement.min(ceiling) as usize * CHART_WIDTH) / ceiling as usize;
            writeln!(
                out,
                "{} {:>4} {}",
                point.date.format("%m-%d"),
                point.engagement,
                "#".repeat(width)
            )?;
        }

        writeln!(out)?;
        writeln!(out, "{}", self.dict.t("dashboard.upcomingPosts"))?;
        if upcoming.is_empty() {
            writeln!(out, "  {}", self.dict.t("dashboard.noPostsScheduled"))?;
        }
        for post in upcoming {
            writeln!(
                out,
                "  {}  {}  {}",
                post.scheduled_for.with_timezone(&self.tz).format("%Y-%m-%d %H:%M"),
                self.platform_names(post),
                truncate_content(&post.content, UPCOMING_CONTENT_CHARS)
            )?;
        }

        writeln!(out)?;
        writeln!(
            out,
            "{} ({}/{})",
            self.dict.t("dashboard.connectedAccounts"),
            connected_accounts(accounts).len(),
            accounts.len()
        )?;
        for account in accounts {
            let state = if account.connected {
                self.paint(&self.dict.t("dashboard.connected"), "32")
            } else {
                self.dict.t("dashboard.connect")
            };
            writeln!(out, "  {}  {}  {}", account.name, account.username, state)?;
        }

        Ok(())
    }

    pub fn scheduled<W: Write>(&self, out: &mut W, post: &Post) -> anyhow::Result<()> {
        writeln!(
            out,
            "{}",
            self.dict
                .translate("dashboard.postCreated", &[("id", post.id.as_str())])
        )?;
        writeln!(
            out,
            "  {}  {}  {}",
            post.scheduled_for.with_timezone(&self.tz).format("%Y-%m-%d %H:%M"),
            self.platform_names(post),
            post.content
        )?;
        Ok(())
    }

    fn platform_names(&self, post: &Post) -> String {
        post.platforms
            .iter()
            .map(|platform| self.registry.display_name(platform))
            .collect::<Vec<_>>()
            .join(", ")
    }

    fn paint(&self, text: &str, code: &str) -> String {
        if !self.color || !io::stdout().is_terminal() {
            return text.to_string();
        }
        format!("\x1b[{code}m{text}\x1b[0m")
    }
}

fn pad(text: &str, width: usize) -> String {
    let visible = UnicodeWidthStr::width(strip_ansi(text).as_str());
    format!("{text}{}", " ".repeat(width.saturating_sub(visible)))
}

fn write_table<W: Write>(
    mut writer: W,
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
) -> anyhow::Result<()> {
    let column_count = headers.len();
    let mut widths = vec![0usize; column_count];

    for (idx, header) in headers.iter().enumerate() {
        widths[idx] = widths[idx].max(UnicodeWidthStr::width(header.as_str()));
    }

    for row in &rows {
        for (idx, cell) in row.iter().enumerate() {
            widths[idx] = widths[idx].max(UnicodeWidthStr::width(strip_ansi(cell).as_str()));
        }
    }

    for idx in 0..column_count {
        write!(writer, "{} ", pad(&headers[idx], widths[idx]))?;
    }
    writeln!(writer)?;

    for width in &widths {
        write!(writer, "{:-<width$} ", "", width = *width)?;
    }
    writeln!(writer)?;

    for row in rows {
        for (idx, cell) in row.iter().enumerate() {
            write!(writer, "{} ", pad(cell, widths[idx]))?;
        }
        writeln!(writer)?;
    }

    Ok(())
}

fn strip_ansi(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut escaped = false;

    for ch in s.chars() {
        if escaped {
            if ch == 'm' {
                escaped = false;
            }
            continue;
        }

        if ch == '\x1b' {
            escaped = true;
            continue;
        }

        out.push(ch);
    }

    out
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::*;
    use crate::bucket::posts_by_hour;
    use crate::calendar::build_month_grid;
    use crate::demo::{demo_accounts, demo_analytics};
    use crate::filter::{PostFilter, library_platforms, visible_posts};
    use crate::post::PostStatus;

    fn renderer() -> Renderer {
        let mut cfg = Config::default();
        cfg.apply_overrides(vec![("color".to_string(), "off".to_string())]);
        Renderer::new(&cfg, chrono_tz::UTC, Dictionary::for_locale("fr").expect("dictionary"))
            .expect("renderer")
    }

    fn post(id: &str, content: &str, day: u32, hour: u32) -> Post {
        Post {
            id: id.to_string(),
            content: content.to_string(),
            platforms: vec![Platform::new("twitter"), Platform::new("linkedin")],
            scheduled_for: Utc
                .with_ymd_and_hms(2024, 3, day, hour, 0, 0)
                .single()
                .expect("valid instant"),
            status: PostStatus::Scheduled,
            media: vec![],
            engagement: None,
        }
    }

    fn render<F>(f: F) -> String
    where
        F: FnOnce(&mut Vec<u8>) -> anyhow::Result<()>,
    {
        let mut buf = Vec::new();
        f(&mut buf).expect("render");
        String::from_utf8(buf).expect("utf8")
    }

    #[test]
    fn rejects_unknown_color_setting() {
        let mut cfg = Config::default();
        cfg.apply_overrides(vec![("color".to_string(), "sometimes".to_string())]);
        assert!(Renderer::new(&cfg, chrono_tz::UTC, Dictionary::default()).is_err());
    }

    #[test]
    fn month_shows_counts_and_overflow() {
        let posts: Vec<Post> = (0..5)
            .map(|i| post(&format!("p{i}"), "A rather long announcement text", 10, 8 + i))
            .collect();
        let today = NaiveDate::from_ymd_opt(2024, 3, 1).expect("valid date");
        let grid = build_month_grid(2024, 2, today).expect("grid");
        let text = render(|out| renderer().month(out, &grid, &posts));

        assert!(text.starts_with("Calendrier 2024-03"));
        assert!(text.contains("Lun"));
        assert!(text.contains("10(5)"));
        assert!(text.contains("  08:00 - A rather long announ..."));
        assert!(text.contains("+2 autres publications"));
        assert_eq!(text.matches(" - A rather").count(), 3);
    }

    #[test]
    fn empty_day_prints_placeholder() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 12).expect("valid date");
        let buckets = posts_by_hour(&[], date, &chrono_tz::UTC);
        let text = render(|out| renderer().day(out, date, &buckets));
        assert!(text.contains("Aucune publication programmée"));
    }

    #[test]
    fn day_groups_posts_by_hour() {
        let posts = vec![post("a", "Morning", 10, 9), post("b", "Later", 10, 14)];
        let date = NaiveDate::from_ymd_opt(2024, 3, 10).expect("valid date");
        let buckets = posts_by_hour(&posts, date, &chrono_tz::UTC);
        let text = render(|out| renderer().day(out, date, &buckets));

        assert!(text.contains("9:00\n  09:00  Twitter, LinkedIn  Morning"));
        assert!(text.contains("14:00\n"));
    }

    #[test]
    fn library_table_and_empty_state() {
        let posts = vec![post("s1", "Hello World", 5, 12)];
        let visible = visible_posts(&posts, &PostFilter::default());
        let in_use = library_platforms(&posts);
        let text = render(|out| renderer().library(out, &visible, &in_use));
        assert!(text.contains("Programmée"));
        assert!(text.contains("s1"));
        assert!(text.ends_with("Plateformes: Twitter, LinkedIn\n"));

        let text = render(|out| renderer().library(out, &[], &in_use));
        assert!(text.contains("Aucune publication trouvée"));
    }

    #[test]
    fn overview_lists_accounts_and_chart() {
        let now = Utc
            .with_ymd_and_hms(2024, 3, 10, 12, 0, 0)
            .single()
            .expect("valid now");
        let analytics = demo_analytics(now);
        let upcoming = vec![post("s1", "Hello World", 11, 9)];
        let upcoming: Vec<&Post> = upcoming.iter().collect();
        let text = render(|out| {
            renderer().overview(out, &analytics, TimeRange::SevenDays, &upcoming, &demo_accounts())
        });

        assert!(text.contains("Publications totales"));
        assert!(text.contains("(7d)"));
        assert!(text.contains("Comptes connectés (3/4)"));
        assert!(text.contains("@yourbrand  Connecter"));
    }
}
