use std::io::Write;

use anyhow::{Context as _, anyhow};
use chrono::{DateTime, Datelike, Utc};
use tracing::{debug, info};

use crate::bucket::posts_by_hour;
use crate::calendar::{build_month_grid, first_day_of_month, shift_months};
use crate::cli::{Command, Toggle};
use crate::datetime::{parse_day_arg, parse_month_arg, parse_schedule_expr, to_local_date};
use crate::filter::{
    PostFilter, UPCOMING_LIMIT, library_platforms, upcoming_posts, visible_posts,
};
use crate::post::NewPost;
use crate::render::Renderer;
use crate::repository::{InMemoryPostRepository, PostRepository};
use crate::session::Session;

/// Everything a command needs, resolved once per invocation.
pub struct Context<'a> {
    pub session: &'a mut Session,
    pub repository: &'a InMemoryPostRepository,
    pub renderer: &'a Renderer,
    pub now: DateTime<Utc>,
}

/// Runs one command, writing its output to `out`.
#[tracing::instrument(skip(ctx, command, out), fields(command = command.name()))]
pub async fn dispatch<W: Write>(
    mut ctx: Context<'_>,
    command: Command,
    out: &mut W,
) -> anyhow::Result<()> {
    if command.needs_dashboard() && !ctx.session.can_view_dashboard() {
        return Err(anyhow!(
            "the dashboard needs a session: \
             run `socialsync login <email>` or `socialsync demo on`"
        ));
    }

    debug!("dispatching command");
    match command {
        Command::Calendar { month, shift } => {
            cmd_calendar(&ctx, out, month.as_deref(), shift).await
        }
        Command::Day { date } => cmd_day(&ctx, out, date.as_deref()).await,
        Command::Library {
            status,
            platform,
            search,
        } => {
            let platform = platform
                .map(|raw| ctx.repository.registry().resolve(&raw))
                .transpose()?;
            let filter = PostFilter {
                status,
                platform,
                query: search.unwrap_or_default(),
            };
            let posts = ctx.repository.list().await?;
            let visible = visible_posts(&posts, &filter);
            let in_use = library_platforms(&posts);
            ctx.renderer.library(out, &visible, &in_use)
        }
        Command::Overview { range } => {
            let posts = ctx.repository.list().await?;
            let upcoming = upcoming_posts(&posts, ctx.now, UPCOMING_LIMIT);
            ctx.renderer.overview(
                out,
                &ctx.repository.analytics(),
                range,
                &upcoming,
                &ctx.repository.accounts(),
            )
        }
        Command::Schedule {
            content,
            platforms,
            at,
            media,
        } => {
            let scheduled_for = parse_schedule_expr(&at, ctx.now, ctx.renderer.timezone())
                .with_context(|| format!("invalid --at value: {at}"))?;
            let post = ctx
                .repository
                .create(NewPost {
                    content,
                    platforms,
                    scheduled_for,
                    media,
                })
                .await?;
            ctx.renderer.scheduled(out, &post)
        }
        Command::Delete { id } => {
            ctx.repository.delete(&id).await?;
            let dict = ctx.renderer.dictionary();
            writeln!(
                out,
                "{}",
                dict.translate("dashboard.postDeleted", &[("id", id.as_str())])
            )?;
            Ok(())
        }
        Command::Login { email, password } => {
            if !ctx.session.login(&email, &password)? {
                return Err(anyhow!(ctx.renderer.dictionary().t("session.loginFailed")));
            }
            print_whoami(&ctx, out)
        }
        Command::Signup {
            name,
            email,
            password,
        } => {
            if !ctx.session.signup(&name, &email, &password)? {
                return Err(anyhow!(
                    ctx.renderer
                        .dictionary()
                        .translate("session.signupFailed", &[("email", email.as_str())])
                ));
            }
            print_whoami(&ctx, out)
        }
        Command::Logout => {
            ctx.session.logout()?;
            writeln!(out, "{}", ctx.renderer.dictionary().t("session.signedOut"))?;
            Ok(())
        }
        Command::Demo { state } => {
            let enabled = state == Toggle::On;
            ctx.session.set_demo_mode(enabled)?;
            let key = if enabled {
                "session.demoEnabled"
            } else {
                "session.demoDisabled"
            };
            info!(enabled, "demo mode changed");
            writeln!(out, "{}", ctx.renderer.dictionary().t(key))?;
            Ok(())
        }
        Command::Whoami => print_whoami(&ctx, out),
    }
}

async fn cmd_calendar<W: Write>(
    ctx: &Context<'_>,
    out: &mut W,
    month: Option<&str>,
    shift: i32,
) -> anyhow::Result<()> {
    let today = to_local_date(ctx.now, ctx.renderer.timezone());
    let (year, month0) = match month {
        Some(raw) => parse_month_arg(raw)?,
        None => (today.year(), today.month0()),
    };
    let shown = shift_months(first_day_of_month(year, month0 + 1)?, shift)?;

    let grid = build_month_grid(shown.year(), shown.month0(), today)?;
    let posts = ctx.repository.list().await?;
    ctx.renderer.month(out, &grid, &posts)
}

async fn cmd_day<W: Write>(
    ctx: &Context<'_>,
    out: &mut W,
    date: Option<&str>,
) -> anyhow::Result<()> {
    let tz = ctx.renderer.timezone();
    let date = match date {
        Some(raw) => parse_day_arg(raw, ctx.now, tz)?,
        None => to_local_date(ctx.now, tz),
    };

    let posts = ctx.repository.list().await?;
    let buckets = posts_by_hour(&posts, date, tz);
    ctx.renderer.day(out, date, &buckets)
}

fn print_whoami<W: Write>(ctx: &Context<'_>, out: &mut W) -> anyhow::Result<()> {
    let dict = ctx.renderer.dictionary();
    match ctx.session.user() {
        Some(user) => writeln!(
            out,
            "{}",
            dict.translate(
                "session.signedInAs",
                &[("name", user.name.as_str()), ("email", user.email.as_str())],
            )
        )?,
        None => writeln!(out, "{}", dict.t("session.notSignedIn"))?,
    }
    if ctx.session.is_demo_mode() {
        writeln!(out, "{}", dict.t("session.demoEnabled"))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use chrono::TimeZone;
    use tempfile::{TempDir, tempdir};

    use super::*;
    use crate::config::Config;
    use crate::demo::demo_dashboard;
    use crate::filter::StatusFilter;
    use crate::i18n::Dictionary;
    use crate::session::SessionStore;

    struct Fixture {
        _dir: TempDir,
        session: Session,
        repository: InMemoryPostRepository,
        renderer: Renderer,
        now: DateTime<Utc>,
    }

    impl Fixture {
        fn new() -> Self {
            let dir = tempdir().expect("tempdir");
            let session = Session::init(SessionStore::open(dir.path())).expect("session");
            let now = Utc
                .with_ymd_and_hms(2024, 3, 10, 12, 0, 0)
                .single()
                .expect("valid instant");
            let mut cfg = Config::default();
            cfg.apply_overrides(vec![("color".to_string(), "off".to_string())]);
            let dict = Dictionary::for_locale("fr").expect("dictionary");
            let renderer = Renderer::new(&cfg, chrono_tz::UTC, dict).expect("renderer");

            Self {
                _dir: dir,
                session,
                repository: InMemoryPostRepository::from_dashboard(
                    demo_dashboard(now),
                    Duration::ZERO,
                ),
                renderer,
                now,
            }
        }

        fn signed_in() -> Self {
            let mut fixture = Self::new();
            fixture.session.set_demo_mode(true).expect("demo on");
            fixture
        }

        async fn run(&mut self, command: Command) -> anyhow::Result<String> {
            let mut out = Vec::new();
            dispatch(
                Context {
                    session: &mut self.session,
                    repository: &self.repository,
                    renderer: &self.renderer,
                    now: self.now,
                },
                command,
                &mut out,
            )
            .await?;
            Ok(String::from_utf8(out)?)
        }
    }

    fn library(platform: Option<&str>) -> Command {
        Command::Library {
            status: StatusFilter::All,
            platform: platform.map(str::to_string),
            search: None,
        }
    }

    fn calendar(month: Option<&str>, shift: i32) -> Command {
        Command::Calendar {
            month: month.map(str::to_string),
            shift,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn dashboard_commands_need_a_session() {
        let mut fixture = Fixture::new();
        for command in [library(None), calendar(None, 0), Command::Day { date: None }] {
            let err = fixture.run(command).await.expect_err("gated");
            let message = err.to_string();
            assert!(message.contains("socialsync login"), "{message}");
            assert!(message.contains("socialsync demo on"), "{message}");
        }

        let out = fixture.run(Command::Whoami).await.expect("whoami");
        assert!(out.contains("Non connecté"));
    }

    #[tokio::test(start_paused = true)]
    async fn demo_toggle_opens_the_dashboard() {
        let mut fixture = Fixture::new();
        let out = fixture
            .run(Command::Demo { state: Toggle::On })
            .await
            .expect("demo on");
        assert!(out.contains("Mode démo activé"));
        assert!(fixture.session.can_view_dashboard());

        let out = fixture.run(library(None)).await.expect("library");
        assert!(out.contains("post-1"));
    }

    #[tokio::test(start_paused = true)]
    async fn library_filters_by_resolved_platform() {
        let mut fixture = Fixture::signed_in();
        let out = fixture.run(library(Some("LinkedIn"))).await.expect("library");
        assert!(out.contains("post-1"));
        assert!(out.contains("post-2"));
        assert!(!out.contains("post-3"));

        let err = fixture
            .run(library(Some("myspace")))
            .await
            .expect_err("unknown platform");
        assert!(err.to_string().contains("unsupported platform"));
    }

    #[tokio::test(start_paused = true)]
    async fn delete_reports_unknown_ids() {
        let mut fixture = Fixture::signed_in();
        let err = fixture
            .run(Command::Delete {
                id: "post-404".to_string(),
            })
            .await
            .expect_err("missing post");
        assert!(err.to_string().contains("post-404"));

        let out = fixture
            .run(Command::Delete {
                id: "post-1".to_string(),
            })
            .await
            .expect("delete");
        assert!(out.contains("post-1"));
        assert!(fixture.repository.snapshot().iter().all(|p| p.id != "post-1"));
    }

    #[tokio::test(start_paused = true)]
    async fn calendar_shift_moves_across_years() {
        let mut fixture = Fixture::signed_in();
        let out = fixture
            .run(calendar(Some("2024-12"), 1))
            .await
            .expect("calendar");
        assert!(out.contains("2025-01"));

        let out = fixture.run(calendar(None, -3)).await.expect("calendar");
        assert!(out.contains("2023-12"));
    }

    #[tokio::test(start_paused = true)]
    async fn calendar_rejects_out_of_range_months() {
        let mut fixture = Fixture::signed_in();
        for shift in [i32::MAX, i32::MIN, 2_000_000_000] {
            let err = fixture
                .run(calendar(None, shift))
                .await
                .expect_err("shift out of range");
            assert!(err.to_string().contains("out of range"), "{err}");
        }

        let err = fixture
            .run(calendar(Some("999999-01"), 0))
            .await
            .expect_err("year out of range");
        assert!(err.to_string().contains("999999"));
    }

    #[tokio::test(start_paused = true)]
    async fn schedule_rejects_oversized_offsets() {
        let mut fixture = Fixture::signed_in();
        let before = fixture.repository.snapshot().len();
        let err = fixture
            .run(Command::Schedule {
                content: "Launch day".to_string(),
                platforms: vec!["twitter".to_string()],
                at: "+100000000d".to_string(),
                media: vec![],
            })
            .await
            .expect_err("offset out of range");
        assert!(format!("{err:#}").contains("out of range"), "{err:#}");
        assert_eq!(fixture.repository.snapshot().len(), before);

        fixture
            .run(Command::Schedule {
                content: "Launch day".to_string(),
                platforms: vec!["twitter".to_string()],
                at: "+2h".to_string(),
                media: vec![],
            })
            .await
            .expect("schedule");
        let created = fixture
            .repository
            .snapshot()
            .into_iter()
            .find(|p| p.content == "Launch day")
            .expect("created post");
        assert_eq!(created.scheduled_for, fixture.now + chrono::Duration::hours(2));
    }
}
