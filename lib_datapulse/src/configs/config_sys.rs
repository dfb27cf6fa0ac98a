use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::Parser;
use serde::{Deserialize, Serialize};

use crate::error::{PipelineError, Result};

const DEFAULT_CONFIG_FILE: &str = "datapulse.json";

/// Raw configuration as it arrives from one layer.
///
/// Every field is optional so layers can be merged: defaults, then the JSON
/// file, then command line arguments and `DATAPULSE_*` environment variables.
#[derive(Parser, Deserialize, Serialize, Debug, Clone, Default, PartialEq)]
#[clap(about = "Public API snapshot pipeline", version)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    #[clap(long, env = "DATAPULSE_CONFIG_PATH", help = "Path to the JSON configuration file.")]
    pub config_path: Option<PathBuf>,

    #[clap(
        long,
        env = "DATAPULSE_DATA_DIR",
        help = "Root of the raw/processed/archive directories.",
    )]
    pub data_dir: Option<PathBuf>,

    #[clap(long, env = "DATAPULSE_README", help = "Status document rewritten by update_readme.")]
    pub readme_path: Option<PathBuf>,

    #[clap(long, env = "DATAPULSE_LOG_DIR", help = "Directory for log files.")]
    pub log_dir: Option<PathBuf>,

    #[clap(
        long,
        env = "DATAPULSE_LOG_LEVEL",
        help = "Logging level (trace, debug, info, warn, error).",
    )]
    pub log_level: Option<String>,

    #[clap(
        long,
        env = "DATAPULSE_HTTP_TIMEOUT_SECS",
        help = "Per-request HTTP timeout in seconds.",
    )]
    pub http_timeout_secs: Option<u64>,

    #[clap(long, env = "DATAPULSE_GITHUB_QUERY", help = "GitHub repository search query.")]
    pub github_query: Option<String>,

    #[clap(long, env = "DATAPULSE_GITHUB_PER_PAGE", help = "Number of repositories to collect.")]
    pub github_per_page: Option<u32>,

    #[clap(
        long,
        env = "DATAPULSE_WEATHER_CITIES",
        value_delimiter = ',',
        help = "Comma separated list of cities.",
    )]
    pub weather_cities: Option<Vec<String>>,

    #[clap(
        long,
        env = "DATAPULSE_CRYPTO_IDS",
        value_delimiter = ',',
        help = "Comma separated CoinGecko coin ids.",
    )]
    pub crypto_ids: Option<Vec<String>>,

    #[clap(long, env = "DATAPULSE_TABLE_ROWS", help = "Maximum rows shown per status table.")]
    pub table_rows: Option<usize>,

    #[clap(
        long,
        env = "DATAPULSE_DESCRIPTION_CHARS",
        help = "Truncation length for repository descriptions.",
    )]
    pub description_chars: Option<usize>,

    #[clap(
        long,
        env = "DATAPULSE_ARCHIVE_KEEP",
        help = "Keep this many newest files per source; older ones move to archive.",
    )]
    pub archive_keep: Option<usize>,

    #[clap(
        long,
        env = "DATAPULSE_SCHEDULE",
        help = "Cron expression (with seconds) for repeated runs.",
    )]
    pub schedule: Option<String>,
}

impl Config {
    /// Loads `.env`, then parses the command line (which also reads the
    /// environment).
    pub fn from_env_and_args() -> Self {
        dotenvy::dotenv().ok();
        Config::parse()
    }

    /// Built-in defaults.
    pub fn defaults() -> Self {
        Config {
            config_path: None,
            data_dir: Some(PathBuf::from("data")),
            readme_path: Some(PathBuf::from("README.md")),
            log_dir: Some(PathBuf::from("logs")),
            log_level: Some("info".to_string()),
            http_timeout_secs: Some(10),
            github_query: Some("stars:>1000".to_string()),
            github_per_page: Some(10),
            weather_cities: Some(
                ["Vancouver", "Toronto", "Seattle", "San Francisco", "New York"]
                    .into_iter()
                    .map(String::from)
                    .collect(),
            ),
            crypto_ids: Some(
                ["bitcoin", "ethereum", "cardano", "solana", "polkadot"]
                    .into_iter()
                    .map(String::from)
                    .collect(),
            ),
            table_rows: Some(5),
            description_chars: Some(80),
            archive_keep: None,
            schedule: None,
        }
    }

    /// Reads one layer from a JSON file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|e| PipelineError::io(path, e))?;
        serde_json::from_str(&text).map_err(|e| PipelineError::json(path, e))
    }

    // Merge two Config structs, where 'other' overrides 'self' for Some values
    pub fn merge(self, other: Config) -> Config {
        Config {
            config_path: other.config_path.or(self.config_path),
            data_dir: other.data_dir.or(self.data_dir),
            readme_path: other.readme_path.or(self.readme_path),
            log_dir: other.log_dir.or(self.log_dir),
            log_level: other.log_level.or(self.log_level),
            http_timeout_secs: other.http_timeout_secs.or(self.http_timeout_secs),
            github_query: other.github_query.or(self.github_query),
            github_per_page: other.github_per_page.or(self.github_per_page),
            weather_cities: other.weather_cities.or(self.weather_cities),
            crypto_ids: other.crypto_ids.or(self.crypto_ids),
            table_rows: other.table_rows.or(self.table_rows),
            description_chars: other.description_chars.or(self.description_chars),
            archive_keep: other.archive_keep.or(self.archive_keep),
            schedule: other.schedule.or(self.schedule),
        }
    }
}

/// Fully resolved configuration handed to every stage.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub data_dir: PathBuf,
    pub readme_path: PathBuf,
    pub log_dir: PathBuf,
    pub log_level: String,
    pub http_timeout: Duration,
    pub github_query: String,
    pub github_per_page: u32,
    pub weather_cities: Vec<String>,
    pub crypto_ids: Vec<String>,
    pub table_rows: usize,
    pub description_chars: usize,
    pub archive_keep: Option<usize>,
    pub schedule: Option<String>,
}

impl Settings {
    /// Resolves a merged [`Config`], filling gaps from [`Config::defaults`]
    /// and rejecting values no stage can work with.
    pub fn resolve(config: Config) -> Result<Self> {
        let c = Config::defaults().merge(config);
        let missing = |name: &str| PipelineError::Config(format!("missing value for `{name}`"));

        let settings = Settings {
            data_dir: c.data_dir.ok_or_else(|| missing("dataDir"))?,
            readme_path: c.readme_path.ok_or_else(|| missing("readmePath"))?,
            log_dir: c.log_dir.ok_or_else(|| missing("logDir"))?,
            log_level: c.log_level.ok_or_else(|| missing("logLevel"))?,
            http_timeout: Duration::from_secs(
                c.http_timeout_secs.ok_or_else(|| missing("httpTimeoutSecs"))?,
            ),
            github_query: c.github_query.ok_or_else(|| missing("githubQuery"))?,
            github_per_page: c.github_per_page.ok_or_else(|| missing("githubPerPage"))?,
            weather_cities: clean_list(c.weather_cities.unwrap_or_default()),
            crypto_ids: clean_list(c.crypto_ids.unwrap_or_default()),
            table_rows: c.table_rows.ok_or_else(|| missing("tableRows"))?,
            description_chars: c.description_chars.ok_or_else(|| missing("descriptionChars"))?,
            archive_keep: c.archive_keep,
            schedule: c.schedule.filter(|s| !s.trim().is_empty()),
        };
        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> Result<()> {
        if self.http_timeout.is_zero() {
            return Err(PipelineError::Config("httpTimeoutSecs must be greater than zero".into()));
        }
        if self.table_rows == 0 {
            return Err(PipelineError::Config("tableRows must be greater than zero".into()));
        }
        if self.github_per_page == 0 || self.github_per_page > 100 {
            return Err(PipelineError::Config("githubPerPage must be within 1..=100".into()));
        }
        if self.weather_cities.is_empty() {
            return Err(PipelineError::Config("weatherCities must name at least one city".into()));
        }
        if self.crypto_ids.is_empty() {
            return Err(PipelineError::Config("cryptoIds must name at least one coin".into()));
        }
        if self.archive_keep == Some(0) {
            return Err(PipelineError::Config("archiveKeep must be greater than zero".into()));
        }
        Ok(())
    }
}

impl fmt::Display for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Settings
    Data dir: {},
    Readme: {},
    Log dir: {} ({}),
    HTTP timeout: {}s,
    GitHub: `{}` x{},
    Cities: {:?},
    Coins: {:?},
    Table rows: {}, description chars: {},
    Archive keep: {:?},
    Schedule: {:?}
",
            self.data_dir.display(),
            self.readme_path.display(),
            self.log_dir.display(),
            self.log_level,
            self.http_timeout.as_secs(),
            self.github_query,
            self.github_per_page,
            self.weather_cities,
            self.crypto_ids,
            self.table_rows,
            self.description_chars,
            self.archive_keep,
            self.schedule
        )
    }
}

fn clean_list(items: Vec<String>) -> Vec<String> {
    items
        .into_iter()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

/// Merges defaults, the JSON config file and `cli` (command line plus
/// environment) into [`Settings`].
///
/// The file is `cli.config_path` or `datapulse.json` in the working
/// directory. A missing default file is fine; a missing explicit file or an
/// unparsable one is an error.
pub fn load_settings(cli: Config) -> Result<Settings> {
    let explicit = cli.config_path.is_some();
    let config_file_path = cli
        .config_path
        .clone()
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));

    let mut current_config = Config::defaults();

    if config_file_path.exists() {
        current_config = current_config.merge(Config::from_file(&config_file_path)?);
        tracing::debug!("Loaded config file {}", config_file_path.display());
    } else if explicit {
        return Err(PipelineError::Config(format!(
            "config file not found: {}",
            config_file_path.display()
        )));
    } else {
        tracing::debug!(
            "Config file not found at {}. Using defaults and environment/CLI variables.",
            config_file_path.display()
        );
    }

    Settings::resolve(current_config.merge(cli))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn later_layers_override_earlier_ones() {
        let file = Config {
            table_rows: Some(3),
            log_level: Some("debug".into()),
            ..Default::default()
        };
        let cli = Config {
            table_rows: Some(7),
            ..Default::default()
        };
        let merged = Config::defaults().merge(file).merge(cli);
        assert_eq!(merged.table_rows, Some(7));
        assert_eq!(merged.log_level.as_deref(), Some("debug"));
        assert_eq!(merged.description_chars, Some(80));
    }

    #[test]
    fn defaults_resolve() {
        let s = Settings::resolve(Config::default()).unwrap();
        assert_eq!(s.data_dir, PathBuf::from("data"));
        assert_eq!(s.http_timeout, Duration::from_secs(10));
        assert_eq!(s.weather_cities.len(), 5);
        assert_eq!(s.table_rows, 5);
        assert!(s.archive_keep.is_none());
    }

    #[test]
    fn invalid_values_are_rejected() {
        let zero_rows = Config {
            table_rows: Some(0),
            ..Default::default()
        };
        assert!(matches!(Settings::resolve(zero_rows), Err(PipelineError::Config(_))));

        let blank_cities = Config {
            weather_cities: Some(vec![" ".into(), "".into()]),
            ..Default::default()
        };
        assert!(matches!(Settings::resolve(blank_cities), Err(PipelineError::Config(_))));
    }

    #[test]
    fn file_layer_is_camel_case_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("datapulse.json");
        fs::write(&path, r#"{ "weatherCities": ["Oslo"], "archiveKeep": 2 }"#).unwrap();

        let cli = Config {
            config_path: Some(path),
            ..Default::default()
        };
        let s = load_settings(cli).unwrap();
        assert_eq!(s.weather_cities, vec!["Oslo".to_string()]);
        assert_eq!(s.archive_keep, Some(2));
    }

    #[test]
    fn explicit_missing_file_is_an_error() {
        let cli = Config {
            config_path: Some(PathBuf::from("/definitely/not/here.json")),
            ..Default::default()
        };
        assert!(load_settings(cli).is_err());
    }
}
