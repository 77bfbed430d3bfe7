//! Layered settings for a lint run.
//!
//! Sources, lowest precedence first:
//!
//! 1. built-in defaults ([`Config::default`])
//! 2. the user file, `config.<ext>` in the platform config dir
//!    (`~/.config/doi-lint/` on Linux)
//! 3. project files from the nearest directory at or above the search
//!    root holding `.doi-lint.<ext>` or `doi-lint.<ext>`; the walk gives up
//!    above a directory containing `.git`
//! 4. files passed with [`ConfigLoader::with_file`], in call order
//! 5. `DOI_LINT_*` environment variables
//!
//! `<ext>` is `toml`, `yaml`, `yml` or `json`; the format follows the
//! extension. Within one directory dotfiles load before plain names.
//!
//! ```no_run
//! use camino::Utf8Path;
//! use doi_lint_core::config::ConfigLoader;
//!
//! let (config, sources) = ConfigLoader::new()
//!     .with_project_search(Utf8Path::new("docs/paper"))
//!     .load()
//!     .unwrap();
//! println!("{} via {:?}", config.registry_url, sources.primary_file());
//! ```

use camino::{Utf8Path, Utf8PathBuf};
use figment::Figment;
use figment::providers::{Env, Format, Json, Serialized, Toml, Yaml};
use serde::{Deserialize, Serialize};

use crate::error::ConfigResult;

/// Default DOI resolver base URL.
pub const DEFAULT_RESOLVER_URL: &str = "https://doi.org";

/// Default Crossref API base URL (the `/works/<doi>` path is appended).
pub const DEFAULT_REGISTRY_URL: &str = "https://api.crossref.org";

/// Default `User-Agent` sent with every request.
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (compatible; BibliographyChecker/1.0)";

/// Default per-request timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Default pause after each metadata lookup, in milliseconds.
pub const DEFAULT_REQUEST_DELAY_MS: u64 = 500;

/// The configuration for doi-lint.
///
/// Deserialized from config files found during discovery (TOML, YAML, or
/// JSON) and `DOI_LINT_*` environment variables.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct Config {
    /// Log level for the application (e.g., "debug", "info", "warn", "error").
    pub log_level: LogLevel,
    /// Directory for log files (falls back to platform defaults if unset).
    pub log_dir: Option<Utf8PathBuf>,
    /// Base URL of the DOI resolver.
    pub resolver_url: String,
    /// Base URL of the Crossref works API.
    pub registry_url: String,
    /// `User-Agent` header for resolver and registry requests.
    pub user_agent: String,
    /// Timeout for each HTTP request, in seconds.
    pub timeout_secs: u64,
    /// Pause after each metadata lookup, in milliseconds.
    pub request_delay_ms: u64,
    /// Cross-check entries against registry metadata.
    ///
    /// `--no-metadata-check` forces this off for a single run.
    pub verify_metadata: bool,
    /// Maximum bibliography file size in bytes (default: 5 MiB).
    ///
    /// Omit to use the default. Use `disable_input_limit` to remove the
    /// limit entirely.
    pub max_input_bytes: Option<u64>,
    /// Disable the input size limit entirely.
    pub disable_input_limit: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: LogLevel::default(),
            log_dir: None,
            resolver_url: DEFAULT_RESOLVER_URL.to_string(),
            registry_url: DEFAULT_REGISTRY_URL.to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            request_delay_ms: DEFAULT_REQUEST_DELAY_MS,
            verify_metadata: true,
            max_input_bytes: None,
            disable_input_limit: false,
        }
    }
}

impl Config {
    /// The effective input size limit, or `None` when disabled.
    pub fn input_limit(&self) -> Option<u64> {
        if self.disable_input_limit {
            None
        } else {
            Some(self.max_input_bytes.unwrap_or(crate::DEFAULT_MAX_INPUT_BYTES))
        }
    }
}

/// Log level configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Verbose output for debugging and development.
    Debug,
    /// Standard operational information (default).
    #[default]
    Info,
    /// Warnings about potential issues.
    Warn,
    /// Errors that indicate failures.
    Error,
}

impl LogLevel {
    /// Returns the log level as a lowercase string slice.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }
}

/// The files that fed a loaded [`Config`].
#[derive(Debug, Clone, Default, Serialize)]
pub struct ConfigSources {
    /// Files from the nearest project directory, dotfiles first.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub project_files: Vec<Utf8PathBuf>,
    /// The user-level file, if one exists.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_file: Option<Utf8PathBuf>,
    /// Files named on the command line.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub explicit_files: Vec<Utf8PathBuf>,
}

impl ConfigSources {
    /// The file whose values won last: explicit, then project, then user.
    pub fn primary_file(&self) -> Option<&Utf8Path> {
        self.explicit_files
            .last()
            .or_else(|| self.project_files.last())
            .map(Utf8PathBuf::as_path)
            .or(self.user_file.as_deref())
    }
}

const APP_NAME: &str = "doi-lint";
const EXTENSIONS: &[&str] = &["toml", "yaml", "yml", "json"];

/// A directory holding this entry ends the upward project search.
const REPO_MARKER: &str = ".git";

/// Collects config sources and merges them into a [`Config`].
#[derive(Debug)]
pub struct ConfigLoader {
    search_root: Option<Utf8PathBuf>,
    user_config: bool,
    files: Vec<Utf8PathBuf>,
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigLoader {
    /// A loader that reads the user file and nothing else until configured.
    pub const fn new() -> Self {
        Self {
            search_root: None,
            user_config: true,
            files: Vec::new(),
        }
    }

    /// Look for project files starting at `dir` and moving up.
    pub fn with_project_search(mut self, dir: impl AsRef<Utf8Path>) -> Self {
        self.search_root = Some(dir.as_ref().to_path_buf());
        self
    }

    /// Toggle the user-level config file.
    pub const fn with_user_config(mut self, include: bool) -> Self {
        self.user_config = include;
        self
    }

    /// Layer `path` above everything discovered.
    pub fn with_file(mut self, path: impl AsRef<Utf8Path>) -> Self {
        self.files.push(path.as_ref().to_path_buf());
        self
    }

    /// Merge every source and deserialize the result.
    #[tracing::instrument(skip(self), fields(search_root = ?self.search_root))]
    pub fn load(self) -> ConfigResult<(Config, ConfigSources)> {
        let sources = ConfigSources {
            user_file: self.user_config.then(user_config_file).flatten(),
            project_files: self
                .search_root
                .as_deref()
                .map(project_config_files)
                .unwrap_or_default(),
            explicit_files: self.files,
        };

        let layered = sources
            .user_file
            .iter()
            .chain(&sources.project_files)
            .chain(&sources.explicit_files)
            .fold(
                Figment::from(Serialized::defaults(Config::default())),
                |figment, path| merge_file(figment, path),
            );

        let config: Config = layered
            .merge(Env::prefixed("DOI_LINT_").lowercase(true))
            .extract()
            .map_err(Box::new)?;

        tracing::info!(
            log_level = config.log_level.as_str(),
            resolver = %config.resolver_url,
            registry = %config.registry_url,
            files = sources.explicit_files.len() + sources.project_files.len(),
            "configuration loaded"
        );
        Ok((config, sources))
    }
}

/// Config files in the nearest directory at or above `start` that has any.
///
/// The walk ends at the first directory holding [`REPO_MARKER`], after
/// that directory's own files are considered.
fn project_config_files(start: &Utf8Path) -> Vec<Utf8PathBuf> {
    for dir in start.ancestors() {
        let found: Vec<_> = [format!(".{APP_NAME}"), APP_NAME.to_string()]
            .iter()
            .flat_map(|stem| {
                EXTENSIONS
                    .iter()
                    .map(move |ext| dir.join(format!("{stem}.{ext}")))
            })
            .filter(|path| path.is_file())
            .collect();
        if !found.is_empty() {
            tracing::debug!(%dir, count = found.len(), "found project config");
            return found;
        }
        if dir.join(REPO_MARKER).exists() {
            break;
        }
    }
    Vec::new()
}

fn user_config_file() -> Option<Utf8PathBuf> {
    let dirs = project_dirs()?;
    let dir = Utf8Path::from_path(dirs.config_dir())?;
    EXTENSIONS
        .iter()
        .map(|ext| dir.join(format!("config.{ext}")))
        .find(|path| path.is_file())
}

fn merge_file(figment: Figment, path: &Utf8Path) -> Figment {
    match path.extension() {
        Some("yaml" | "yml") => figment.merge(Yaml::file_exact(path)),
        Some("json") => figment.merge(Json::file_exact(path)),
        _ => figment.merge(Toml::file_exact(path)),
    }
}

fn project_dirs() -> Option<directories::ProjectDirs> {
    directories::ProjectDirs::from("", "", APP_NAME)
}

/// Machine-local data directory (`~/.local/share/doi-lint/` on Linux).
pub fn user_data_local_dir() -> Option<Utf8PathBuf> {
    let dirs = project_dirs()?;
    Utf8Path::from_path(dirs.data_local_dir()).map(Utf8Path::to_path_buf)
}
