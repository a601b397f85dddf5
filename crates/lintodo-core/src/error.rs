use std::fmt;

/// Machine-readable error codes for scripted callers and CI annotations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    InvalidDecayConfig,
    ConflictingConfigSources,
    MisusedDecayOverride,
    ConfigParseError,
    StoreCorrupt,
    StoreWriteFailed,
    LockContention,
    InternalUnexpected,
}

impl ErrorCode {
    /// Stable code identifier (`E####`) for machine parsing.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::InvalidDecayConfig => "E1001",
            Self::ConflictingConfigSources => "E1002",
            Self::MisusedDecayOverride => "E1003",
            Self::ConfigParseError => "E1004",
            Self::StoreCorrupt => "E3001",
            Self::StoreWriteFailed => "E5001",
            Self::LockContention => "E5002",
            Self::InternalUnexpected => "E9001",
        }
    }

    /// Short human-facing summary for logs and terminal output.
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::InvalidDecayConfig => "Invalid decay configuration",
            Self::ConflictingConfigSources => "Conflicting todo configuration sources",
            Self::MisusedDecayOverride => "Decay override used without update mode",
            Self::ConfigParseError => "Config file parse error",
            Self::StoreCorrupt => "Corrupt todo store",
            Self::StoreWriteFailed => "Todo store write failed",
            Self::LockContention => "Lock contention",
            Self::InternalUnexpected => "Internal unexpected error",
        }
    }

    /// Optional remediation hint that can be surfaced to operators.
    #[must_use]
    pub const fn hint(self) -> Option<&'static str> {
        match self {
            Self::InvalidDecayConfig => {
                Some("The `warn` value must be less than the `error` value.")
            }
            Self::ConflictingConfigSources => Some(
                "Keep the todo configuration in either package.json or .lint-todorc.toml, not both.",
            ),
            Self::MisusedDecayOverride => Some(
                "Set UPDATE_TODO=1 (or pass --update) when using TODO_DAYS_TO_WARN or TODO_DAYS_TO_ERROR.",
            ),
            Self::ConfigParseError => Some("Fix the syntax of the todo configuration and retry."),
            Self::StoreCorrupt => {
                Some("Repair or delete the reported line in .lint-todo, then rerun with UPDATE_TODO=1.")
            }
            Self::StoreWriteFailed => Some("Check disk space and write permissions."),
            Self::LockContention => {
                Some("Retry after the other lintodo process releases the store lock.")
            }
            Self::InternalUnexpected => Some("Retry once. If persistent, report a bug with logs."),
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}
