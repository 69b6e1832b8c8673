use std::ffi::OsString;
use std::io::IsTerminal;
use std::path::PathBuf;

use anyhow::anyhow;
use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use crate::analytics::TimeRange;
use crate::filter::StatusFilter;

#[derive(Debug, Clone)]
pub struct PreprocessedArgs {
    pub cleaned_args: Vec<OsString>,
    pub rc_overrides: Vec<(String, String)>,
}

#[derive(Debug, Clone)]
pub struct KeyVal {
    pub key: String,
    pub value: String,
}

impl std::str::FromStr for KeyVal {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (k, v) = s
            .split_once('=')
            .ok_or_else(|| anyhow!("expected KEY=VALUE, got: {s}"))?;
        Ok(Self {
            key: k.trim().to_string(),
            value: v.trim().to_string(),
        })
    }
}

#[derive(Parser, Debug, Clone)]
#[command(
    name = "socialsync",
    version,
    about = "SocialSync: plan and review social media posts from the terminal",
    disable_help_subcommand = true
)]
pub struct GlobalCli {
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[arg(short = 'q', long = "quiet", action = ArgAction::Count, global = true)]
    pub quiet: u8,

    #[arg(
        long = "rc",
        value_parser = clap::builder::ValueParser::new(|s: &str| s.parse::<KeyVal>()),
        action = ArgAction::Append
    )]
    pub rc_overrides: Vec<KeyVal>,

    #[arg(long = "rc-file")]
    pub rc_file: Option<PathBuf>,

    #[arg(long = "session-dir")]
    pub session_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Month grid with the posts of each day.
    Calendar {
        /// Month to show, as YYYY-MM. Defaults to the current month.
        #[arg(long)]
        month: Option<String>,

        /// Months to move from the selected one, e.g. `-1` or `2`.
        #[arg(long, default_value_t = 0, allow_hyphen_values = true)]
        shift: i32,
    },
    /// Posts of a single day, hour by hour.
    Day {
        /// YYYY-MM-DD or a relative word such as `tomorrow`.
        date: Option<String>,
    },
    /// Content library, newest first.
    Library {
        #[arg(
            long,
            default_value = "all",
            value_parser = clap::builder::ValueParser::new(|s: &str| s.parse::<StatusFilter>())
        )]
        status: StatusFilter,

        #[arg(long)]
        platform: Option<String>,

        #[arg(long)]
        search: Option<String>,
    },
    /// Stats, engagement chart, upcoming posts and accounts.
    Overview {
        #[arg(
            long,
            default_value = "7d",
            value_parser = clap::builder::ValueParser::new(|s: &str| s.parse::<TimeRange>())
        )]
        range: TimeRange,
    },
    /// Schedule a new post.
    Schedule {
        #[arg(long)]
        content: String,

        #[arg(short = 'p', long = "platform", action = ArgAction::Append, required = true)]
        platforms: Vec<String>,

        /// When to publish, e.g. `2024-03-10 09:00`, `tomorrow` or `+2h`.
        #[arg(long)]
        at: String,

        #[arg(long, action = ArgAction::Append)]
        media: Vec<String>,
    },
    /// Delete a post by id.
    Delete { id: String },
    Login {
        email: String,

        #[arg(long, default_value = "")]
        password: String,
    },
    Signup {
        name: String,

        email: String,

        #[arg(long, default_value = "")]
        password: String,
    },
    Logout,
    /// Switch demo mode on or off.
    Demo { state: Toggle },
    Whoami,
}

impl Command {
    pub fn name(&self) -> &'static str {
        match self {
            Command::Calendar { .. } => "calendar",
            Command::Day { .. } => "day",
            Command::Library { .. } => "library",
            Command::Overview { .. } => "overview",
            Command::Schedule { .. } => "schedule",
            Command::Delete { .. } => "delete",
            Command::Login { .. } => "login",
            Command::Signup { .. } => "signup",
            Command::Logout => "logout",
            Command::Demo { .. } => "demo",
            Command::Whoami => "whoami",
        }
    }

    /// Whether the command shows or changes dashboard data.
    pub fn needs_dashboard(&self) -> bool {
        matches!(
            self,
            Command::Calendar { .. }
                | Command::Day { .. }
                | Command::Library { .. }
                | Command::Overview { .. }
                | Command::Schedule { .. }
                | Command::Delete { .. }
        )
    }
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Toggle {
    On,
    Off,
}

pub fn init_tracing(verbose: u8, quiet: u8) -> anyhow::Result<()> {
    let default_level = if quiet >= 2 {
        "error"
    } else if quiet == 1 {
        "warn"
    } else if verbose >= 3 {
        "trace"
    } else if verbose == 2 {
        "debug"
    } else if verbose == 1 {
        "info"
    } else {
        "warn"
    };

    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_level))
        .map_err(|e| anyhow!("invalid RUST_LOG / log filter: {e}"))?;

    let init_result = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(true)
        .with_level(true)
        .with_writer(std::io::stderr)
        .with_ansi(std::io::stderr().is_terminal())
        .try_init();

    if let Err(err) = init_result {
        debug!(error = %err, "tracing subscriber already set, continuing");
    }

    Ok(())
}

/// Pulls positional `rc.key=value` and `rc.key:value` tokens out of the
/// argument list before clap sees it.
#[tracing::instrument(skip_all)]
pub fn preprocess_args(raw: &[OsString]) -> anyhow::Result<PreprocessedArgs> {
    let mut cleaned = Vec::with_capacity(raw.len());
    let mut overrides: Vec<(String, String)> = Vec::new();

    let mut iter = raw.iter().cloned();
    if let Some(bin) = iter.next() {
        cleaned.push(bin);
    }

    for arg in iter {
        let s = arg.to_string_lossy();
        if let Some(rest) = s.strip_prefix("rc.") {
            let parsed = if let Some((k, v)) = rest.split_once('=') {
                Some((format!("rc.{k}"), v.to_string()))
            } else if let Some((k, v)) = rest.split_once(':') {
                Some((format!("rc.{k}"), v.to_string()))
            } else {
                None
            };

            if let Some((k, v)) = parsed {
                debug!(key = %k, value = %v, "captured positional rc override");
                overrides.push((k, v));
                continue;
            }
        }

        cleaned.push(arg);
    }

    Ok(PreprocessedArgs {
        cleaned_args: cleaned,
        rc_overrides: overrides,
    })
}
