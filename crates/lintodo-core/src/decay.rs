//! Decay policy resolution.
//!
//! A todo's decay schedule comes from three places, highest precedence first:
//!
//! 1. explicit environment overrides (`TODO_DAYS_TO_WARN` / `TODO_DAYS_TO_ERROR`),
//!    which replace the schedule for every rule;
//! 2. a per-rule entry (`daysToDecayByRule`);
//! 3. the global entry (`daysToDecay`).
//!
//! Each scope is taken as a whole object: a rule entry with only `warn` set
//! does not inherit the global `error`. Resolution is pure; sourcing the inputs
//! from files or the process environment is the caller's job.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ErrorCode;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Day counts after creation at which a todo decays to warn / error.
///
/// `None` means "never decays to that level".
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DaysToDecay {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub warn: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<u32>,
}

impl DaysToDecay {
    #[must_use]
    pub const fn new(warn: Option<u32>, error: Option<u32>) -> Self {
        Self { warn, error }
    }

    /// True when neither level is configured.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.warn.is_none() && self.error.is_none()
    }

    /// Reject schedules where warn does not come strictly before error.
    ///
    /// # Errors
    ///
    /// Returns [`DecayError::InvalidDecayConfig`] naming `scope` when
    /// `warn >= error`.
    pub fn validate(&self, scope: &DecayScope) -> Result<(), DecayError> {
        if let (Some(warn), Some(error)) = (self.warn, self.error) {
            if warn >= error {
                return Err(DecayError::InvalidDecayConfig {
                    scope: scope.clone(),
                    warn,
                    error,
                });
            }
        }
        Ok(())
    }

    /// Concrete decay dates for a todo created at `created`.
    #[must_use]
    pub fn dates_from(&self, created: DateTime<Utc>) -> DecayDates {
        let after = |days: u32| created.checked_add_signed(TimeDelta::days(i64::from(days)));
        DecayDates {
            warn: self.warn.and_then(after),
            error: self.error.and_then(after),
        }
    }
}

/// Absolute decay dates carried by a todo record.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct DecayDates {
    pub warn: Option<DateTime<Utc>>,
    pub error: Option<DateTime<Utc>>,
}

impl DecayDates {
    /// True when both dates are set and warn is not strictly before error.
    #[must_use]
    pub fn is_inverted(&self) -> bool {
        matches!((self.warn, self.error), (Some(warn), Some(error)) if warn >= error)
    }
}

/// Decay settings as they appear in a configuration source.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DecaySettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub days_to_decay: Option<DaysToDecay>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub days_to_decay_by_rule: BTreeMap<String, DaysToDecay>,
}

/// A full todo configuration: shorthand settings for every engine plus
/// optional per-engine tables that take precedence for their engine.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TodoConfig {
    #[serde(flatten)]
    pub shorthand: DecaySettings,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub engines: BTreeMap<String, DecaySettings>,
}

impl TodoConfig {
    /// Settings that apply to `engine`: its own table layered over the shorthand.
    #[must_use]
    pub fn for_engine(&self, engine: &str) -> DecaySettings {
        let mut settings = self.shorthand.clone();
        if let Some(specific) = self.engines.get(engine) {
            if specific.days_to_decay.is_some() {
                settings.days_to_decay = specific.days_to_decay;
            }
            settings.days_to_decay_by_rule.extend(
                specific
                    .days_to_decay_by_rule
                    .iter()
                    .map(|(rule, days)| (rule.clone(), *days)),
            );
        }
        settings
    }
}

/// Decay-day overrides supplied for this run (usually from the environment).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EnvOverrides {
    pub warn: Option<u32>,
    pub error: Option<u32>,
}

impl EnvOverrides {
    /// True when either override is present.
    #[must_use]
    pub const fn is_set(&self) -> bool {
        self.warn.is_some() || self.error.is_some()
    }
}

/// Where a decay schedule came from; used in error messages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecayScope {
    Global,
    Rule(String),
    Environment,
}

impl fmt::Display for DecayScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Global => f.write_str("global daysToDecay"),
            Self::Rule(rule) => write!(f, "daysToDecayByRule `{rule}`"),
            Self::Environment => f.write_str("TODO_DAYS_TO_WARN/TODO_DAYS_TO_ERROR"),
        }
    }
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors raised while resolving the decay policy. All are fatal for a run
/// and surface before the store is touched.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecayError {
    /// A scope configures `warn` at or after `error`.
    #[error(
        "The todo configuration ({scope}) contains invalid values. The `warn` value ({warn}) must be less than the `error` value ({error})."
    )]
    InvalidDecayConfig {
        scope: DecayScope,
        warn: u32,
        error: u32,
    },

    /// Overrides were supplied while not creating or refreshing todos.
    #[error(
        "Using `TODO_DAYS_TO_WARN` or `TODO_DAYS_TO_ERROR` is only valid when the `UPDATE_TODO` environment variable is being used."
    )]
    MisusedDecayOverride,
}

impl DecayError {
    /// Machine-readable code for this error.
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::InvalidDecayConfig { .. } => ErrorCode::InvalidDecayConfig,
            Self::MisusedDecayOverride => ErrorCode::MisusedDecayOverride,
        }
    }
}

// ---------------------------------------------------------------------------
// Resolution
// ---------------------------------------------------------------------------

/// The effective decay policy for one engine and one run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedDecay {
    /// Schedule for rules without their own entry.
    pub global: DaysToDecay,
    /// Per-rule schedules. Empty when environment overrides are in force.
    pub by_rule: BTreeMap<String, DaysToDecay>,
    /// Whether the schedule came from environment overrides.
    pub from_environment: bool,
}

impl ResolvedDecay {
    /// The schedule that applies to `rule_id`.
    #[must_use]
    pub fn for_rule(&self, rule_id: &str) -> DaysToDecay {
        self.by_rule.get(rule_id).copied().unwrap_or(self.global)
    }

    /// True when any scope configures a decay day count.
    #[must_use]
    pub fn is_configured(&self) -> bool {
        !self.global.is_empty() || self.by_rule.values().any(|days| !days.is_empty())
    }
}

/// Merge global, per-rule and override settings into the effective policy.
///
/// # Errors
///
/// - [`DecayError::MisusedDecayOverride`] when `env` carries overrides but
///   `update_mode` is off.
/// - [`DecayError::InvalidDecayConfig`] when any applicable scope has
///   `warn >= error`.
pub fn resolve(
    global: Option<DaysToDecay>,
    per_rule: &BTreeMap<String, DaysToDecay>,
    env: EnvOverrides,
    update_mode: bool,
) -> Result<ResolvedDecay, DecayError> {
    if env.is_set() {
        if !update_mode {
            return Err(DecayError::MisusedDecayOverride);
        }
        let days = DaysToDecay::new(env.warn, env.error);
        days.validate(&DecayScope::Environment)?;
        tracing::debug!(warn = ?days.warn, error = ?days.error, "decay taken from environment overrides");
        return Ok(ResolvedDecay {
            global: days,
            by_rule: BTreeMap::new(),
            from_environment: true,
        });
    }

    let global = global.unwrap_or_default();
    global.validate(&DecayScope::Global)?;
    for (rule, days) in per_rule {
        days.validate(&DecayScope::Rule(rule.clone()))?;
    }

    Ok(ResolvedDecay {
        global,
        by_rule: per_rule.clone(),
        from_environment: false,
    })
}

/// Resolve the policy for `engine` from a loaded [`TodoConfig`].
///
/// # Errors
///
/// Same as [`resolve`].
pub fn resolve_for_engine(
    config: Option<&TodoConfig>,
    engine: &str,
    env: EnvOverrides,
    update_mode: bool,
) -> Result<ResolvedDecay, DecayError> {
    let settings = config.map(|c| c.for_engine(engine)).unwrap_or_default();
    resolve(
        settings.days_to_decay,
        &settings.days_to_decay_by_rule,
        env,
        update_mode,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn days(warn: Option<u32>, error: Option<u32>) -> DaysToDecay {
        DaysToDecay::new(warn, error)
    }

    #[test]
    fn global_applies_without_rule_entry() {
        let resolved = resolve(Some(days(Some(5), Some(10))), &BTreeMap::new(), EnvOverrides::default(), false)
            .expect("resolve");
        assert_eq!(resolved.for_rule("no-var"), days(Some(5), Some(10)));
        assert!(resolved.is_configured());
    }

    #[test]
    fn rule_entry_beats_global_as_a_whole() {
        let mut per_rule = BTreeMap::new();
        per_rule.insert("no-console".to_string(), days(Some(2), None));
        let resolved = resolve(Some(days(Some(5), Some(10))), &per_rule, EnvOverrides::default(), false)
            .expect("resolve");
        assert_eq!(resolved.for_rule("no-console"), days(Some(2), None));
        assert_eq!(resolved.for_rule("no-var"), days(Some(5), Some(10)));
    }

    #[test]
    fn environment_beats_rule_and_global() {
        let mut per_rule = BTreeMap::new();
        per_rule.insert("no-console".to_string(), days(Some(2), Some(4)));
        let env = EnvOverrides {
            warn: Some(1),
            error: None,
        };
        let resolved = resolve(Some(days(Some(5), Some(10))), &per_rule, env, true).expect("resolve");
        assert!(resolved.from_environment);
        assert_eq!(resolved.for_rule("no-console"), days(Some(1), None));
        assert_eq!(resolved.for_rule("no-var"), days(Some(1), None));
    }

    #[test]
    fn override_without_update_mode_is_rejected() {
        let env = EnvOverrides {
            warn: Some(10),
            error: None,
        };
        let err = resolve(None, &BTreeMap::new(), env, false).expect_err("must fail");
        assert_eq!(err, DecayError::MisusedDecayOverride);
        assert_eq!(err.code(), ErrorCode::MisusedDecayOverride);
        assert!(err.to_string().contains("UPDATE_TODO"));
    }

    #[test]
    fn warn_equal_to_error_is_invalid() {
        let err = resolve(Some(days(Some(10), Some(10))), &BTreeMap::new(), EnvOverrides::default(), false)
            .expect_err("must fail");
        assert!(matches!(
            err,
            DecayError::InvalidDecayConfig {
                scope: DecayScope::Global,
                warn: 10,
                error: 10
            }
        ));
    }

    #[test]
    fn invalid_rule_scope_is_named() {
        let mut per_rule = BTreeMap::new();
        per_rule.insert("no-var".to_string(), days(Some(9), Some(3)));
        let err = resolve(None, &per_rule, EnvOverrides::default(), false).expect_err("must fail");
        assert!(err.to_string().contains("no-var"), "{err}");
    }

    #[test]
    fn invalid_environment_scope_is_rejected() {
        let env = EnvOverrides {
            warn: Some(10),
            error: Some(5),
        };
        let err = resolve(None, &BTreeMap::new(), env, true).expect_err("must fail");
        assert!(matches!(
            err,
            DecayError::InvalidDecayConfig {
                scope: DecayScope::Environment,
                ..
            }
        ));
    }

    #[test]
    fn engine_table_overrides_shorthand() {
        let mut config = TodoConfig::default();
        config.shorthand.days_to_decay = Some(days(Some(30), Some(60)));
        config
            .shorthand
            .days_to_decay_by_rule
            .insert("a".to_string(), days(Some(1), Some(2)));
        let mut eslint = DecaySettings {
            days_to_decay: Some(days(Some(5), Some(10))),
            ..DecaySettings::default()
        };
        eslint
            .days_to_decay_by_rule
            .insert("b".to_string(), days(Some(3), Some(4)));
        config.engines.insert("eslint".to_string(), eslint);

        let resolved = resolve_for_engine(Some(&config), "eslint", EnvOverrides::default(), false)
            .expect("resolve");
        assert_eq!(resolved.global, days(Some(5), Some(10)));
        assert_eq!(resolved.for_rule("a"), days(Some(1), Some(2)));
        assert_eq!(resolved.for_rule("b"), days(Some(3), Some(4)));

        let other = resolve_for_engine(Some(&config), "stylelint", EnvOverrides::default(), false)
            .expect("resolve");
        assert_eq!(other.global, days(Some(30), Some(60)));
        assert_eq!(other.for_rule("b"), days(Some(30), Some(60)));
    }

    #[test]
    fn no_config_means_no_decay() {
        let resolved = resolve_for_engine(None, "eslint", EnvOverrides::default(), false)
            .expect("resolve");
        assert!(!resolved.is_configured());
    }

    #[test]
    fn dates_are_offset_from_creation() {
        let created = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).single().expect("valid date");
        let dates = days(Some(5), None).dates_from(created);
        assert_eq!(
            dates.warn,
            Utc.with_ymd_and_hms(2024, 1, 6, 0, 0, 0).single()
        );
        assert_eq!(dates.error, None);
        assert!(!dates.is_inverted());
    }

    #[test]
    fn huge_day_counts_never_decay() {
        let created = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).single().expect("valid date");
        let dates = days(None, Some(u32::MAX)).dates_from(created);
        assert_eq!(dates.error, None);
    }
}
