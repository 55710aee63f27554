// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, anyhow, bail};
use mprsummary_app::Theme;
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

pub const APP_NAME: &str = "mprsummary";
const CONFIG_VERSION: i64 = 1;
const DEFAULT_BASE_URL: &str = "http://localhost:9090";
const DEFAULT_TIMEOUT: &str = "5s";
const CONFIG_PATH_ENV: &str = "MPRSUMMARY_CONFIG_PATH";
const BASE_URL_ENV: &str = "MPRSUMMARY_BASE_URL";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub version: i64,
    #[serde(default)]
    pub backend: Backend,
    #[serde(default)]
    pub ui: Ui,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION,
            backend: Backend::default(),
            ui: Ui::default(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Backend {
    pub base_url: Option<String>,
    pub timeout: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Ui {
    pub theme: Option<String>,
    pub show_total: Option<bool>,
}

impl Default for Ui {
    fn default() -> Self {
        Self {
            theme: Some(Theme::Dark.as_str().to_owned()),
            show_total: Some(true),
        }
    }
}

impl Config {
    pub fn default_path() -> Result<PathBuf> {
        if let Some(path) = env::var_os(CONFIG_PATH_ENV) {
            return Ok(PathBuf::from(path));
        }

        let config_root = dirs::config_dir().ok_or_else(|| {
            anyhow!("cannot resolve config directory; set {CONFIG_PATH_ENV} to the config file")
        })?;

        let app_dir = config_root.join(APP_NAME);
        fs::create_dir_all(&app_dir)
            .with_context(|| format!("create config directory {}", app_dir.display()))?;
        Ok(app_dir.join("config.toml"))
    }

    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let raw = fs::read_to_string(path)
            .with_context(|| format!("read config file {}", path.display()))?;
        let value: toml::Value = toml::from_str(&raw)
            .with_context(|| format!("parse TOML config {}", path.display()))?;

        let version = value
            .get("version")
            .and_then(toml::Value::as_integer)
            .ok_or_else(|| {
                anyhow!(
                    "config file {} is not versioned. Add `version = 1` and put values under [backend] and [ui]",
                    path.display()
                )
            })?;

        if version != CONFIG_VERSION {
            bail!(
                "unsupported config version {} in {}; expected version = 1",
                version,
                path.display()
            );
        }

        let config: Config = value
            .try_into()
            .with_context(|| format!("decode config {}", path.display()))?;
        config.validate(path)?;
        Ok(config)
    }

    fn validate(&self, path: &Path) -> Result<()> {
        if let Some(base_url) = &self.backend.base_url {
            validate_base_url(base_url)
                .with_context(|| format!("backend.base_url in {}", path.display()))?;
        }

        if let Some(timeout) = &self.backend.timeout {
            let parsed = parse_duration(timeout)?;
            if parsed <= Duration::ZERO {
                bail!(
                    "backend.timeout in {} must be positive, got {}",
                    path.display(),
                    timeout
                );
            }
        }

        if let Some(theme) = &self.ui.theme {
            Theme::parse(theme).with_context(|| format!("ui.theme in {}", path.display()))?;
        }

        Ok(())
    }

    /// Resolution order: `[backend].base_url`, then `MPRSUMMARY_BASE_URL`,
    /// then the default local service address.
    pub fn base_url(&self) -> String {
        let raw = match &self.backend.base_url {
            Some(url) => url.clone(),
            None => env::var(BASE_URL_ENV).unwrap_or_else(|_| DEFAULT_BASE_URL.to_owned()),
        };
        raw.trim_end_matches('/').to_owned()
    }

    pub fn timeout(&self) -> Result<Duration> {
        parse_duration(self.backend.timeout.as_deref().unwrap_or(DEFAULT_TIMEOUT))
    }

    pub fn theme(&self) -> Result<Theme> {
        Theme::parse(self.ui.theme.as_deref().unwrap_or(Theme::Dark.as_str()))
    }

    pub fn show_total(&self) -> bool {
        self.ui.show_total.unwrap_or(true)
    }

    pub fn example_config(path: &Path) -> String {
        format!(
            "# mprsummary config\n# Place this file at: {}\n\nversion = 1\n\n[backend]\n# Or set {} when this key is absent.\nbase_url = \"{}\"\ntimeout = \"{}\"\n\n[ui]\n# \"dark\" or \"light\"\ntheme = \"dark\"\n# Fetch /totalprcount after the breakdown and show the total row\nshow_total = true\n",
            path.display(),
            BASE_URL_ENV,
            DEFAULT_BASE_URL,
            DEFAULT_TIMEOUT,
        )
    }
}

fn validate_base_url(raw: &str) -> Result<()> {
    let url = Url::parse(raw).with_context(|| format!("invalid URL {raw:?}"))?;
    if !matches!(url.scheme(), "http" | "https") {
        bail!("{raw:?} must use http or https");
    }
    Ok(())
}

pub fn parse_duration(raw: &str) -> Result<Duration> {
    if let Some(value) = raw.strip_suffix("ms") {
        let millis: u64 = value
            .parse()
            .with_context(|| format!("invalid timeout duration {raw:?}"))?;
        return Ok(Duration::from_millis(millis));
    }
    if let Some(value) = raw.strip_suffix('s') {
        let secs: u64 = value
            .parse()
            .with_context(|| format!("invalid timeout duration {raw:?}"))?;
        return Ok(Duration::from_secs(secs));
    }
    if let Some(value) = raw.strip_suffix('m') {
        let mins: u64 = value
            .parse()
            .with_context(|| format!("invalid timeout duration {raw:?}"))?;
        return Ok(Duration::from_secs(mins * 60));
    }

    bail!("invalid duration {raw:?}; use one of: <N>ms, <N>s, <N>m (for example 500ms or 5s)")
}
