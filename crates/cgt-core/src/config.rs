//! Configuration management for CGT tool.
//!
//! This module provides configuration loading with embedded defaults
//! and optional override files: the Annual Exempt Amount table and the
//! mid-year CGT rate-change events (only the 2024/25 change exists today,
//! but the table is open-ended).

use crate::CgtError;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::PathBuf;

/// Embedded default configuration.
static EMBEDDED_CONFIG: &str = include_str!("../data/config.toml");

#[derive(Debug, Clone, Deserialize)]
struct RawRateChangeEvent {
    date: String,
    basic_before: Decimal,
    basic_after: Decimal,
    higher_before: Decimal,
    higher_after: Decimal,
}

/// Raw configuration as parsed from TOML (uses string keys).
#[derive(Debug, Clone, Deserialize)]
struct RawConfig {
    #[serde(default)]
    exemptions: HashMap<String, Decimal>,
    #[serde(default)]
    rate_change_events: Vec<RawRateChangeEvent>,
}

/// A mid-year change in CGT rates, e.g. the 30 October 2024 basic/higher
/// rate increase that split 2024/25 into pre- and post-change segments.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RateChangeEvent {
    pub date: NaiveDate,
    pub basic_before: Decimal,
    pub basic_after: Decimal,
    pub higher_before: Decimal,
    pub higher_after: Decimal,
}

/// CGT tool configuration.
#[derive(Debug, Clone, Default)]
pub struct Config {
    /// Tax exemption amounts by year.
    pub exemptions: HashMap<u16, Decimal>,
    /// Mid-year rate-change events, unordered.
    pub rate_change_events: Vec<RateChangeEvent>,
}

impl Config {
    /// Load the embedded default configuration.
    ///
    /// This configuration is compiled into the binary and provides
    /// default exemption values for supported tax years.
    pub fn embedded() -> Self {
        Self::from_toml(EMBEDDED_CONFIG).unwrap_or_else(|e| {
            eprintln!("Warning: Failed to parse embedded config: {e}");
            Self::default()
        })
    }

    /// Parse configuration from TOML string.
    fn from_toml(content: &str) -> Result<Self, toml::de::Error> {
        let raw: RawConfig = toml::from_str(content)?;
        let exemptions = raw
            .exemptions
            .into_iter()
            .filter_map(|(k, v)| k.parse::<u16>().ok().map(|year| (year, v)))
            .collect();
        let rate_change_events = raw
            .rate_change_events
            .into_iter()
            .filter_map(|e| {
                let date = NaiveDate::parse_from_str(&e.date, "%Y-%m-%d").ok()?;
                Some(RateChangeEvent {
                    date,
                    basic_before: e.basic_before,
                    basic_after: e.basic_after,
                    higher_before: e.higher_before,
                    higher_after: e.higher_after,
                })
            })
            .collect();
        Ok(Self {
            exemptions,
            rate_change_events,
        })
    }

    /// Load configuration with override support.
    ///
    /// Checks for override files in the following order:
    /// 1. `./config.toml` (current directory)
    /// 2. `~/.config/cgt-tool/config.toml` (user config directory)
    ///
    /// Override files are merged with embedded defaults. Values from
    /// override files take precedence; rate-change events from an override
    /// are appended rather than replacing the embedded list.
    pub fn load_with_overrides() -> Self {
        let mut config = Self::embedded();

        for path in Self::override_paths() {
            if path.exists()
                && let Ok(content) = std::fs::read_to_string(&path)
                && let Ok(override_config) = Self::from_toml(&content)
            {
                config.exemptions.extend(override_config.exemptions);
                config
                    .rate_change_events
                    .extend(override_config.rate_change_events);
            }
        }

        config
    }

    /// Get potential override file paths.
    fn override_paths() -> Vec<PathBuf> {
        let mut paths = Vec::new();

        paths.push(PathBuf::from("config.toml"));

        if let Some(home) = dirs_home() {
            paths.push(home.join(".config").join("cgt-tool").join("config.toml"));
        }

        paths
    }

    /// Get the exemption amount for a tax year.
    ///
    /// # Arguments
    /// * `year` - The calendar year when the tax year starts (e.g., 2023 for 2023/24)
    pub fn get_exemption(&self, year: u16) -> Result<Decimal, CgtError> {
        self.exemptions
            .get(&year)
            .copied()
            .ok_or(CgtError::UnsupportedExemptionYear(year))
    }

    /// Rate-change events whose date falls within the tax year starting
    /// 6 April of `year`.
    pub fn rate_change_events_for(&self, year: u16) -> Vec<RateChangeEvent> {
        self.rate_change_events
            .iter()
            .copied()
            .filter(|event| crate::models::tax_year_start(event.date) == year)
            .collect()
    }
}

/// Get the user's home directory without external dependencies.
fn dirs_home() -> Option<PathBuf> {
    std::env::var_os("HOME").map(PathBuf::from)
}
