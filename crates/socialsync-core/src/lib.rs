pub mod analytics;
pub mod bucket;
pub mod calendar;
pub mod cli;
pub mod commands;
pub mod config;
pub mod datetime;
pub mod demo;
pub mod filter;
pub mod i18n;
pub mod post;
pub mod render;
pub mod repository;
pub mod session;

use std::ffi::OsString;
use std::io;

use anyhow::Context;
use chrono::Utc;
use clap::Parser;
use tracing::{
  debug,
  info
};

#[tracing::instrument(skip_all)]
pub async fn run(
  raw_args: Vec<OsString>
) -> anyhow::Result<()> {
  let pre =
    cli::preprocess_args(&raw_args)?;
  let cli = cli::GlobalCli::parse_from(
    pre.cleaned_args
  );

  cli::init_tracing(
    cli.verbose,
    cli.quiet
  )?;

  info!(
    verbose = cli.verbose,
    quiet = cli.quiet,
    command = cli.command.name(),
    "starting socialsync CLI"
  );
  debug!(?pre.rc_overrides, "preprocessed rc overrides");

  let mut cfg = config::Config::load(
    cli.rc_file.as_deref()
  )?;
  cfg.apply_overrides(
    pre.rc_overrides.into_iter().chain(
      cli
        .rc_overrides
        .into_iter()
        .map(|kv| (kv.key, kv.value))
    )
  );

  let session_dir =
    config::resolve_session_dir(
      &cfg,
      cli.session_dir.as_deref()
    )
    .context(
      "failed to resolve session \
       directory"
    )?;

  let mut session =
    session::Session::init(
      session::SessionStore::open(
        &session_dir
      )
    )
    .with_context(|| {
      format!(
        "failed to load session from {}",
        session_dir.display()
      )
    })?;

  let locale = cfg.locale();
  let dict = match cfg.dictionary_path()
  {
    | Some(path) => {
      i18n::Dictionary::load(
        &locale, &path
      )?
    }
    | None => {
      i18n::Dictionary::for_locale(
        &locale
      )?
    }
  };

  let tz =
    datetime::resolve_display_timezone(
      &cfg
    );
  let renderer =
    render::Renderer::new(&cfg, tz, dict)?;

  let now = Utc::now();
  let repository =
    repository::InMemoryPostRepository::from_dashboard(
      demo::demo_dashboard(now),
      cfg.repository_latency()?
    );

  let mut stdout = io::stdout().lock();
  commands::dispatch(
    commands::Context {
      session: &mut session,
      repository: &repository,
      renderer: &renderer,
      now
    },
    cli.command,
    &mut stdout
  )
  .await?;

  session.teardown()?;
  info!("done");
  Ok(())
}
