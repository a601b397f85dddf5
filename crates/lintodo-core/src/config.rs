use std::io;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::decay::TodoConfig;
use crate::error::ErrorCode;

/// Dedicated todo configuration file, relative to the base directory.
pub const RC_FILE: &str = ".lint-todorc.toml";

/// Package manifest whose `lintTodo` key may hold the configuration instead.
pub const PACKAGE_JSON: &str = "package.json";

/// Errors raised while loading the todo configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Both sources carry a todo configuration.
    #[error(
        "You cannot have todo configurations in both {} and {}. Please move the configuration from the package.json to the .lint-todorc.toml",
        .package_json.display(),
        .rc_file.display()
    )]
    ConflictingConfigSources {
        package_json: PathBuf,
        rc_file: PathBuf,
    },

    #[error("failed to read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to parse {}: {message}", .path.display())]
    Parse { path: PathBuf, message: String },
}

impl ConfigError {
    /// Machine-readable code for this error.
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::ConflictingConfigSources { .. } => ErrorCode::ConflictingConfigSources,
            Self::Read { .. } | Self::Parse { .. } => ErrorCode::ConfigParseError,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PackageManifest {
    #[serde(default)]
    lint_todo: Option<TodoConfig>,
}

/// Load the todo configuration for `base_dir`.
///
/// Returns `Ok(None)` when neither source configures anything. A missing or
/// unrelated `package.json` is not an error.
///
/// # Errors
///
/// [`ConfigError::ConflictingConfigSources`] when both `package.json#lintTodo`
/// and `.lint-todorc.toml` are present; read/parse errors otherwise.
pub fn load_todo_config(base_dir: &Path) -> Result<Option<TodoConfig>, ConfigError> {
    let package_path = base_dir.join(PACKAGE_JSON);
    let rc_path = base_dir.join(RC_FILE);

    let from_package = load_package_config(&package_path)?;
    let from_rc = load_rc_config(&rc_path)?;

    match (from_package, from_rc) {
        (Some(_), Some(_)) => Err(ConfigError::ConflictingConfigSources {
            package_json: package_path,
            rc_file: rc_path,
        }),
        (Some(config), None) => {
            tracing::debug!(path = %package_path.display(), "todo config loaded from package.json");
            Ok(Some(config))
        }
        (None, Some(config)) => {
            tracing::debug!(path = %rc_path.display(), "todo config loaded from rc file");
            Ok(Some(config))
        }
        (None, None) => Ok(None),
    }
}

fn read_optional(path: &Path) -> Result<Option<String>, ConfigError> {
    match std::fs::read_to_string(path) {
        Ok(content) => Ok(Some(content)),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(source) => Err(ConfigError::Read {
            path: path.to_path_buf(),
            source,
        }),
    }
}

fn load_package_config(path: &Path) -> Result<Option<TodoConfig>, ConfigError> {
    let Some(content) = read_optional(path)? else {
        return Ok(None);
    };
    let manifest: PackageManifest =
        serde_json::from_str(&content).map_err(|err| ConfigError::Parse {
            path: path.to_path_buf(),
            message: err.to_string(),
        })?;
    Ok(manifest.lint_todo)
}

fn load_rc_config(path: &Path) -> Result<Option<TodoConfig>, ConfigError> {
    let Some(content) = read_optional(path)? else {
        return Ok(None);
    };
    toml::from_str::<TodoConfig>(&content)
        .map(Some)
        .map_err(|err| ConfigError::Parse {
            path: path.to_path_buf(),
            message: err.to_string(),
        })
}
