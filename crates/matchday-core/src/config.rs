// Configuration loading and parsing (league.toml, credentials.toml).

use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("failed to parse config file {path}: {source}")]
    ParseError {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("validation error for field `{field}`: {message}")]
    ValidationError { field: String, message: String },

    #[error("failed to initialize config from defaults: {message}")]
    DefaultsCopyError { message: String },
}

// ---------------------------------------------------------------------------
// Assembled config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct Config {
    pub league: LeagueConfig,
    pub fetch: FetchConfig,
    pub cache: CacheConfig,
    pub paths: PathsConfig,
    pub credentials: CredentialsConfig,
}

impl Config {
    /// Last completed matchweek. Zero before the season starts.
    pub fn completed_week(&self) -> u32 {
        self.league.current_week.saturating_sub(1)
    }

    pub fn roster_cache_path(&self) -> PathBuf {
        self.paths.data_dir.join("roster_cache.json")
    }

    pub fn state_path(&self) -> PathBuf {
        self.paths.data_dir.join("league_state.json")
    }

    pub fn stats_detail_path(&self) -> PathBuf {
        self.paths.data_dir.join("stats_cache.json")
    }
}

// ---------------------------------------------------------------------------
// league.toml structs
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
struct LeagueFile {
    league: LeagueConfig,
    #[serde(default)]
    fetch: FetchConfig,
    #[serde(default)]
    cache: CacheConfig,
    paths: PathsConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LeagueConfig {
    pub name: String,
    pub league_id: String,
    /// First matchweek not yet played.
    pub current_week: u32,
    pub season_weeks: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FetchConfig {
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
    #[serde(default = "default_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_concurrency() -> usize {
    4
}

fn default_timeout_secs() -> u64 {
    30
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            concurrency: default_concurrency(),
            request_timeout_secs: default_timeout_secs(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
    /// Drop cached current-week rosters before fetching.
    #[serde(default = "default_true")]
    pub refetch_current_week: bool,
}

fn default_true() -> bool {
    true
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            refetch_current_week: true,
        }
    }
}

/// Data locations. Relative paths are resolved against the directory the
/// config was loaded from.
#[derive(Debug, Clone, Deserialize)]
pub struct PathsConfig {
    pub data_dir: PathBuf,
    pub stats_csv: PathBuf,
    #[serde(default)]
    pub predictions: Option<PathBuf>,
}

impl PathsConfig {
    fn resolved(self, base_dir: &Path) -> Self {
        let resolve = |p: PathBuf| if p.is_absolute() { p } else { base_dir.join(p) };
        Self {
            data_dir: resolve(self.data_dir),
            stats_csv: resolve(self.stats_csv),
            predictions: self.predictions.map(resolve),
        }
    }
}

// ---------------------------------------------------------------------------
// credentials.toml structs
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize, Default)]
pub struct CredentialsConfig {
    /// Cookie header sent with every league request. Only private leagues
    /// need one.
    pub session_cookie: Option<String>,
}

// ---------------------------------------------------------------------------
// Loading logic
// ---------------------------------------------------------------------------

/// Load and validate configuration from `config/league.toml` and the
/// optional `config/credentials.toml` under `base_dir`. Relative data paths
/// resolve against `base_dir`.
///
/// Defaults are not copied here; see [`load_config`].
pub fn load_config_from(base_dir: &Path) -> Result<Config, ConfigError> {
    let config_dir = base_dir.join("config");

    let league: LeagueFile = parse_toml(&config_dir.join("league.toml"))?;
    let credentials_path = config_dir.join("credentials.toml");
    let credentials: CredentialsConfig = if credentials_path.exists() {
        parse_toml(&credentials_path)?
    } else {
        CredentialsConfig::default()
    };

    let config = Config {
        league: league.league,
        fetch: league.fetch,
        cache: league.cache,
        paths: league.paths.resolved(base_dir),
        credentials,
    };
    validate(&config)?;
    Ok(config)
}

/// Seed `config/` from `defaults/`, copying each default file that has no
/// counterpart yet. `.example` files are templates and stay behind. Returns
/// the paths that were created.
pub fn ensure_config_files(base_dir: &Path) -> Result<Vec<PathBuf>, ConfigError> {
    let defaults_dir = base_dir.join("defaults");
    let config_dir = base_dir.join("config");

    if !defaults_dir.is_dir() {
        return if config_dir.is_dir() {
            Ok(Vec::new())
        } else {
            Err(defaults_error(format!(
                "no defaults/ or config/ directory under {}",
                base_dir.display()
            )))
        };
    }

    std::fs::create_dir_all(&config_dir)
        .map_err(|e| defaults_error(format!("cannot create {}: {e}", config_dir.display())))?;
    let listing = std::fs::read_dir(&defaults_dir)
        .map_err(|e| defaults_error(format!("cannot list {}: {e}", defaults_dir.display())))?;

    let mut created = Vec::new();
    for item in listing {
        let source = item
            .map_err(|e| defaults_error(format!("cannot list {}: {e}", defaults_dir.display())))?
            .path();
        let Some(name) = source.file_name().filter(|_| source.is_file()) else {
            continue;
        };
        if Path::new(name).extension().is_some_and(|ext| ext == "example") {
            continue;
        }
        let target = config_dir.join(name);
        if copy_if_absent(&source, &target)? {
            created.push(target);
        }
    }
    Ok(created)
}

/// Config for the process: seeds `config/` in the working directory, then
/// loads it.
pub fn load_config() -> Result<Config, ConfigError> {
    let cwd = std::env::current_dir().map_err(|_| ConfigError::FileNotFound {
        path: PathBuf::from("."),
    })?;
    ensure_config_files(&cwd)?;
    load_config_from(&cwd)
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn parse_toml<T: DeserializeOwned>(path: &Path) -> Result<T, ConfigError> {
    let text = std::fs::read_to_string(path).map_err(|_| ConfigError::FileNotFound {
        path: path.to_path_buf(),
    })?;
    toml::from_str(&text).map_err(|source| ConfigError::ParseError {
        path: path.to_path_buf(),
        source,
    })
}

/// Copy `source` to `target` unless `target` exists. `create_new` makes the
/// existence check and the create a single step.
fn copy_if_absent(source: &Path, target: &Path) -> Result<bool, ConfigError> {
    let mut dest = match std::fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(target)
    {
        Ok(file) => file,
        Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => return Ok(false),
        Err(e) => return Err(defaults_error(format!("cannot create {}: {e}", target.display()))),
    };
    let mut src = std::fs::File::open(source)
        .map_err(|e| defaults_error(format!("cannot open {}: {e}", source.display())))?;
    std::io::copy(&mut src, &mut dest)
        .map_err(|e| defaults_error(format!("cannot write {}: {e}", target.display())))?;
    Ok(true)
}

fn defaults_error(message: String) -> ConfigError {
    ConfigError::DefaultsCopyError { message }
}

fn invalid(field: &str, message: impl Into<String>) -> ConfigError {
    ConfigError::ValidationError {
        field: field.into(),
        message: message.into(),
    }
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

fn validate(config: &Config) -> Result<(), ConfigError> {
    let league = &config.league;
    if league.league_id.trim().is_empty() {
        return Err(invalid("league.league_id", "must not be empty"));
    }
    if league.current_week == 0 {
        return Err(invalid("league.current_week", "must be at least 1"));
    }
    if league.season_weeks == 0 {
        return Err(invalid("league.season_weeks", "must be at least 1"));
    }
    if league.current_week > league.season_weeks + 1 {
        return Err(invalid(
            "league.current_week",
            format!(
                "must not exceed season_weeks + 1 ({}), got {}",
                league.season_weeks + 1,
                league.current_week
            ),
        ));
    }

    if config.fetch.concurrency == 0 {
        return Err(invalid("fetch.concurrency", "must be > 0"));
    }
    if config.fetch.request_timeout_secs == 0 {
        return Err(invalid("fetch.request_timeout_secs", "must be > 0"));
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
