use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use tracing::warn;

use crate::filter::FilterConfig;
use crate::model::record::{RecordField, RecordKind};
use crate::util::time::{validate_strftime, TimeNormalizer};

const LOCAL_CONFIG: &str = "taiga.toml";

#[derive(Debug, Deserialize)]
pub struct AppConfig {
    pub global: GlobalConfig,
    #[serde(default)]
    pub filters: FiltersConfig,
    #[serde(default)]
    pub files: BTreeMap<String, String>,
    #[serde(default)]
    pub links: BTreeMap<String, String>,
}

#[derive(Debug, Deserialize)]
pub struct GlobalConfig {
    pub fields: Vec<String>,
    #[serde(default)]
    pub read_from_files: bool,
    #[serde(default)]
    pub read_from_links: bool,
    #[serde(default = "default_input_fmt")]
    pub datetime_input_fmt: String,
    #[serde(default = "default_output_fmt")]
    pub datetime_output_fmt: String,
    #[serde(default = "default_timezone")]
    pub datetime_timezone: String,
    #[serde(default = "default_output_filename")]
    pub output_filename: String,
    pub output_dir: Option<PathBuf>,
    pub http_timeout_secs: Option<u64>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct FiltersConfig {
    pub filter_user: String,
    pub not_paid_only: bool,
    pub with_filled_time_only: bool,
    pub closed_only: bool,
    pub closed_statuses: Vec<String>,
}

fn default_input_fmt() -> String {
    "%Y-%m-%d %H:%M:%S%.f%z".to_string()
}

fn default_output_fmt() -> String {
    "%Y-%m-%d %H:%M:%S".to_string()
}

fn default_timezone() -> String {
    "Europe/Moscow".to_string()
}

fn default_output_filename() -> String {
    "taiga_%Y-%m-%d_%H-%M".to_string()
}

impl AppConfig {
    /// Allow-listed CSV column names, trimmed, blanks dropped.
    pub fn allow_list(&self) -> HashSet<String> {
        self.global
            .fields
            .iter()
            .map(|f| f.trim())
            .filter(|f| !f.is_empty())
            .map(String::from)
            .collect()
    }

    pub fn normalizer(&self) -> Result<TimeNormalizer> {
        let normalizer = TimeNormalizer::new(
            &self.global.datetime_input_fmt,
            &self.global.datetime_timezone,
            &self.global.datetime_output_fmt,
        )?;
        Ok(normalizer)
    }

    pub fn filter_config(&self) -> FilterConfig {
        let user = self.filters.filter_user.trim();
        FilterConfig {
            assignee: (!user.is_empty()).then(|| user.to_string()),
            not_paid_only: self.filters.not_paid_only,
            with_filled_time_only: self.filters.with_filled_time_only,
            closed_only: self.filters.closed_only,
            closed_statuses: self
                .filters
                .closed_statuses
                .iter()
                .map(|s| s.trim().to_string())
                .collect(),
        }
    }

    /// Configured file paths, each listed once.
    pub fn file_paths(&self) -> Vec<String> {
        unique_values(&self.files)
    }

    /// Configured export URLs, each listed once.
    pub fn link_urls(&self) -> Vec<String> {
        unique_values(&self.links)
    }

    /// Catch misconfiguration before any source is read.
    pub fn validate(&self) -> Result<()> {
        let allow_list = self.allow_list();
        if allow_list.is_empty() {
            bail!("global.fields must list at least one CSV column");
        }
        self.normalizer()?;
        validate_strftime("output_filename", &self.global.output_filename)?;

        let known: HashSet<&str> = RecordKind::ALL
            .iter()
            .flat_map(|kind| kind.layout())
            .map(RecordField::as_str)
            .collect();
        for field in &allow_list {
            if !known.contains(field.as_str()) {
                warn!(field = %field, "allow-listed column is not a known record field");
            }
        }

        if self.global.read_from_files && self.files.is_empty() {
            warn!("read_from_files is enabled but [files] is empty");
        }
        if self.global.read_from_links && self.links.is_empty() {
            warn!("read_from_links is enabled but [links] is empty");
        }
        if self.filters.closed_only && self.filters.closed_statuses.is_empty() {
            warn!("closed_only is enabled but closed_statuses is empty; nothing will match");
        }
        Ok(())
    }
}

fn unique_values(map: &BTreeMap<String, String>) -> Vec<String> {
    let mut seen = HashSet::new();
    map.values()
        .map(|v| v.trim())
        .filter(|v| !v.is_empty() && seen.insert(*v))
        .map(String::from)
        .collect()
}

/// Explicit path first, then `./taiga.toml`, then the per-user config directory.
pub fn config_path(explicit: Option<&Path>) -> Result<PathBuf> {
    if let Some(path) = explicit {
        return Ok(path.to_path_buf());
    }
    let local = PathBuf::from(LOCAL_CONFIG);
    if local.exists() {
        return Ok(local);
    }
    let user = dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("taiga-report")
        .join("config.toml");
    if user.exists() {
        return Ok(user);
    }
    bail!(
        "No config found. Create {LOCAL_CONFIG} or {} (see taiga.example.toml)",
        user.display()
    )
}

pub fn parse_config(contents: &str) -> Result<AppConfig> {
    let config: AppConfig = toml::from_str(contents).context("Failed to parse config")?;
    config.validate()?;
    Ok(config)
}

pub fn load_config(path: &Path) -> Result<AppConfig> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config from {}", path.display()))?;
    parse_config(&contents).with_context(|| format!("Invalid config {}", path.display()))
}
