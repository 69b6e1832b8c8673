use std::sync::OnceLock;

use anyhow::{
  Context,
  anyhow
};
use chrono::{
  DateTime,
  Duration,
  LocalResult,
  NaiveDate,
  NaiveDateTime,
  TimeZone,
  Utc
};
use chrono_tz::Tz;
use regex::Regex;

use crate::config::Config;

pub const TIMEZONE_ENV_VAR: &str =
  "SOCIALSYNC_TIMEZONE";
pub const DEFAULT_DISPLAY_TIMEZONE:
  &str = "Europe/Paris";

/// Resolves the wall-clock timezone used
/// for day boundaries: environment first,
/// then the `timezone` config key, then
/// the product default.
pub fn resolve_display_timezone(
  cfg: &Config
) -> Tz {
  if let Ok(raw) =
    std::env::var(TIMEZONE_ENV_VAR)
    && let Some(tz) =
      parse_timezone(&raw, TIMEZONE_ENV_VAR)
  {
    return tz;
  }

  if let Some(raw) = cfg.get("timezone")
    && let Some(tz) =
      parse_timezone(&raw, "config")
  {
    return tz;
  }

  parse_timezone(
    DEFAULT_DISPLAY_TIMEZONE,
    "DEFAULT_DISPLAY_TIMEZONE"
  )
  .unwrap_or_else(|| {
    tracing::error!(
      "failed to parse fallback \
       timezone; using UTC"
    );
    chrono_tz::UTC
  })
}

pub fn parse_timezone(
  raw: &str,
  source: &str
) -> Option<Tz> {
  let trimmed = raw.trim();
  if trimmed.is_empty() {
    tracing::warn!(
      source,
      "timezone source was empty"
    );
    return None;
  }

  match trimmed.parse::<Tz>() {
    | Ok(tz) => {
      tracing::debug!(
        source,
        timezone = %trimmed,
        "configured display timezone"
      );
      Some(tz)
    }
    | Err(err) => {
      tracing::error!(
        source,
        timezone = %trimmed,
        error = %err,
        "failed to parse timezone id"
      );
      None
    }
  }
}

#[must_use]
pub fn to_local_date(
  dt: DateTime<Utc>,
  tz: &Tz
) -> NaiveDate {
  dt.with_timezone(tz).date_naive()
}

#[must_use]
pub fn format_local_time(
  dt: DateTime<Utc>,
  tz: &Tz
) -> String {
  dt.with_timezone(tz)
    .format("%H:%M")
    .to_string()
}

fn to_utc_from_local(
  local_naive: NaiveDateTime,
  tz: &Tz,
  context: &str
) -> anyhow::Result<DateTime<Utc>> {
  match tz
    .from_local_datetime(&local_naive)
  {
    | LocalResult::Single(local_dt) => {
      Ok(local_dt.with_timezone(&Utc))
    }
    | LocalResult::Ambiguous(
      first,
      second
    ) => {
      tracing::warn!(
        context,
        first = %first,
        second = %second,
        "ambiguous local datetime; using earliest"
      );
      let chosen = if first <= second {
        first
      } else {
        second
      };
      Ok(chosen.with_timezone(&Utc))
    }
    | LocalResult::None => {
      Err(anyhow!(
        "local datetime does not \
         exist in timezone {tz}: \
         {context}"
      ))
    }
  }
}

fn local_midnight(
  date: NaiveDate,
  tz: &Tz,
  context: &str
) -> anyhow::Result<DateTime<Utc>> {
  let midnight = date
    .and_hms_opt(0, 0, 0)
    .ok_or_else(|| {
      anyhow!(
        "failed to construct \
         midnight for {context}"
      )
    })?;
  to_utc_from_local(midnight, tz, context)
}

/// Parses the "when" of a post being
/// scheduled. Calendar forms are read as
/// wall-clock time in `tz`.
#[tracing::instrument(skip(now, tz), fields(input = input))]
pub fn parse_schedule_expr(
  input: &str,
  now: DateTime<Utc>,
  tz: &Tz
) -> anyhow::Result<DateTime<Utc>> {
  let token = input.trim();
  let lower =
    token.to_ascii_lowercase();
  let local_today =
    to_local_date(now, tz);

  match lower.as_str() {
    | "now" => return Ok(now),
    | "today" => {
      return local_midnight(
        local_today,
        tz,
        "today"
      );
    }
    | "tomorrow" => {
      return local_midnight(
        local_today
          .succ_opt()
          .ok_or_else(|| {
            anyhow!(
              "no day after {local_today}"
            )
          })?,
        tz,
        "tomorrow"
      );
    }
    | "yesterday" => {
      return local_midnight(
        local_today
          .pred_opt()
          .ok_or_else(|| {
            anyhow!(
              "no day before {local_today}"
            )
          })?,
        tz,
        "yesterday"
      );
    }
    | _ => {}
  }

  if let Some(caps) =
    relative_offset_re()?.captures(token)
  {
    let sign = caps
      .name("sign")
      .map(|m| m.as_str())
      .ok_or_else(|| {
        anyhow!("missing relative sign")
      })?;
    let num: i64 = caps
      .name("num")
      .map(|m| m.as_str())
      .ok_or_else(|| {
        anyhow!(
          "missing relative amount"
        )
      })?
      .parse()
      .context(
        "invalid relative number"
      )?;
    let unit = caps
      .name("unit")
      .map(|m| m.as_str())
      .ok_or_else(|| {
        anyhow!("missing relative unit")
      })?;

    let duration = match unit {
      | "d" => Duration::try_days(num),
      | "h" => Duration::try_hours(num),
      | "m" => Duration::try_minutes(num),
      | _ => {
        return Err(anyhow!(
          "unknown relative unit: \
           {unit}"
        ));
      }
    }
    .ok_or_else(|| {
      anyhow!(
        "relative offset out of range: \
         {token}"
      )
    })?;

    let shifted = if sign == "-" {
      now.checked_sub_signed(duration)
    } else {
      now.checked_add_signed(duration)
    };
    return shifted.ok_or_else(|| {
      anyhow!(
        "relative offset out of range: \
         {token}"
      )
    });
  }

  if let Ok(dt) =
    DateTime::parse_from_rfc3339(token)
  {
    return Ok(dt.with_timezone(&Utc));
  }

  if let Ok(date) =
    NaiveDate::parse_from_str(
      token, "%Y-%m-%d"
    )
  {
    return local_midnight(
      date, tz, "date"
    );
  }

  for fmt in
    ["%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M"]
  {
    if let Ok(ndt) =
      NaiveDateTime::parse_from_str(
        token, fmt
      )
    {
      return to_utc_from_local(
        ndt, tz, fmt
      );
    }
  }

  Err(anyhow!(
    "unrecognized schedule \
     expression: {input}"
  ))
  .with_context(|| {
    "supported formats: \
     now/today/tomorrow/yesterday, \
     +Nd/+Nh/+Nm, RFC3339, \
     YYYY-MM-DD, YYYY-MM-DDTHH:MM, \
     YYYY-MM-DD HH:MM"
  })
}

fn relative_offset_re(
) -> anyhow::Result<&'static Regex> {
  static RELATIVE_OFFSET: OnceLock<
    Result<Regex, regex::Error>
  > = OnceLock::new();
  RELATIVE_OFFSET
    .get_or_init(|| {
      Regex::new(
        r"^(?P<sign>[+-])(?P<num>\d+)(?P<unit>[dhm])$"
      )
    })
    .as_ref()
    .map_err(|e| {
      anyhow!(
        "internal regex compile \
         failure: {e}"
      )
    })
}

/// Parses a `YYYY-MM` month selector into
/// `(year, zero-based month)`.
pub fn parse_month_arg(
  input: &str
) -> anyhow::Result<(i32, u32)> {
  let (year_raw, month_raw) = input
    .trim()
    .split_once('-')
    .ok_or_else(|| {
      anyhow!(
        "expected YYYY-MM, got: {input}"
      )
    })?;
  let year: i32 = year_raw
    .parse()
    .with_context(|| {
      format!("invalid year in {input}")
    })?;
  let month: u32 = month_raw
    .parse()
    .with_context(|| {
      format!("invalid month in {input}")
    })?;
  if !(1..=12).contains(&month) {
    return Err(anyhow!(
      "month must be between 1 and \
       12: {input}"
    ));
  }
  if NaiveDate::from_ymd_opt(year, month, 1)
    .is_none()
  {
    return Err(anyhow!(
      "year out of range: {input}"
    ));
  }
  Ok((year, month - 1))
}

/// Parses a calendar day, accepting the
/// same relative words as scheduling.
pub fn parse_day_arg(
  input: &str,
  now: DateTime<Utc>,
  tz: &Tz
) -> anyhow::Result<NaiveDate> {
  if let Ok(date) =
    NaiveDate::parse_from_str(
      input.trim(),
      "%Y-%m-%d"
    )
  {
    return Ok(date);
  }
  parse_schedule_expr(input, now, tz)
    .map(|dt| to_local_date(dt, tz))
}
