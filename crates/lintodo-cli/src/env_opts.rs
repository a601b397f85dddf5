//! Run switches sourced from the process environment.
//!
//! | variable             | effect                                   |
//! |----------------------|------------------------------------------|
//! | `UPDATE_TODO`        | create/refresh todos                     |
//! | `INCLUDE_TODO`       | show todo-level violations               |
//! | `CLEAN_TODO`         | purge stale todos (outside CI)           |
//! | `COMPACT_TODO`       | compact the store after writing          |
//! | `TODO_DAYS_TO_WARN`  | warn-day override (update mode only)     |
//! | `TODO_DAYS_TO_ERROR` | error-day override (update mode only)    |
//! | `TODO_CREATED_DATE`  | creation date for new todos              |
//! | `CI`                 | running unattended                       |
//!
//! Lookups go through a closure so tests never touch the real environment.

use anyhow::{Context, Result, bail};
use chrono::{DateTime, NaiveDate, Utc};
use lintodo_core::decay::EnvOverrides;

/// Environment-derived switches, before flags are layered on.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EnvSwitches {
    pub update: bool,
    pub include_todo: bool,
    pub clean: bool,
    pub compact: bool,
    pub ci: bool,
    pub overrides: EnvOverrides,
    pub created_at: Option<DateTime<Utc>>,
}

/// `1`, `true`, `yes` and `on` (any case) are truthy.
pub fn is_truthy(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

fn parse_days(name: &str, value: &str) -> Result<u32> {
    value
        .trim()
        .parse::<u32>()
        .with_context(|| format!("{name} must be a whole number of days, got `{value}`"))
}

/// Parse an RFC 3339 timestamp or a bare `YYYY-MM-DD` date (midnight UTC).
pub fn parse_created_date(value: &str) -> Result<DateTime<Utc>> {
    let value = value.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(value) {
        return Ok(ts.with_timezone(&Utc));
    }
    let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d") else {
        bail!("TODO_CREATED_DATE must be YYYY-MM-DD or RFC 3339, got `{value}`");
    };
    match date.and_hms_opt(0, 0, 0) {
        Some(midnight) => Ok(midnight.and_utc()),
        None => bail!("TODO_CREATED_DATE `{value}` is out of range"),
    }
}

/// Read the switches through `lookup` (normally `std::env::var(..).ok()`).
pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<EnvSwitches> {
    let flag = |name: &str| lookup(name).is_some_and(|v| is_truthy(&v));
    let days = |name: &str| lookup(name).map(|v| parse_days(name, &v)).transpose();

    Ok(EnvSwitches {
        update: flag("UPDATE_TODO"),
        include_todo: flag("INCLUDE_TODO"),
        clean: flag("CLEAN_TODO"),
        compact: flag("COMPACT_TODO"),
        ci: flag("CI"),
        overrides: EnvOverrides {
            warn: days("TODO_DAYS_TO_WARN")?,
            error: days("TODO_DAYS_TO_ERROR")?,
        },
        created_at: lookup("TODO_CREATED_DATE")
            .map(|v| parse_created_date(&v))
            .transpose()?,
    })
}

/// Read the switches from the process environment.
pub fn from_env() -> Result<EnvSwitches> {
    from_lookup(|name| std::env::var(name).ok())
}
