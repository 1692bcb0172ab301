//! Resolves parsed [`crate::cli::Cli`] args into the pipeline's internal
//! configuration, rejecting combinations the CLI surface alone can't catch
//! (conflicting lookback flags, malformed date ranges, unknown LLM
//! provider letters).

use chrono::NaiveDate;
use std::time::Duration;
use thiserror::Error;

use crate::cli::Cli;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("--lookback-hours and --date-range are mutually exclusive")]
    ConflictingLookback,
    #[error("one of --lookback-hours or --date-range is required")]
    MissingLookback,
    #[error("invalid --date-range {0:?}, expected YYYY-MM-DD:YYYY-MM-DD")]
    InvalidDateRange(String),
    #[error("unknown LLM provider letter {0:?} in --llm-providers")]
    UnknownProvider(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lookback {
    Hours(u32),
    DateRange(NaiveDate, NaiveDate),
}

/// Which LLM providers (if any) back the optional relevance/district
/// consensus layer, parsed from a `"none" | "a" | "b" | "c" | "a+b" | ...`
/// selection string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LlmSelection {
    None,
    Providers(Vec<char>),
}

fn parse_llm_providers(selection: &str) -> Result<LlmSelection, ConfigError> {
    let selection = selection.trim();
    if selection.eq_ignore_ascii_case("none") || selection.is_empty() {
        return Ok(LlmSelection::None);
    }
    let mut letters = Vec::new();
    for part in selection.split('+') {
        let letter = part.trim().to_ascii_lowercase();
        match letter.as_str() {
            "a" | "b" | "c" => {
                let c = letter.chars().next().unwrap();
                if !letters.contains(&c) {
                    letters.push(c);
                }
            }
            _ => return Err(ConfigError::UnknownProvider(part.to_string())),
        }
    }
    Ok(LlmSelection::Providers(letters))
}

fn parse_date_range(raw: &str) -> Result<Lookback, ConfigError> {
    let (start, end) = raw
        .split_once(':')
        .ok_or_else(|| ConfigError::InvalidDateRange(raw.to_string()))?;
    let start = NaiveDate::parse_from_str(start, "%Y-%m-%d")
        .map_err(|_| ConfigError::InvalidDateRange(raw.to_string()))?;
    let end = NaiveDate::parse_from_str(end, "%Y-%m-%d")
        .map_err(|_| ConfigError::InvalidDateRange(raw.to_string()))?;
    Ok(Lookback::DateRange(start, end))
}

/// Resolved pipeline configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub output_dir: String,
    pub regions: Option<Vec<String>>,
    pub districts: Option<Vec<String>>,
    pub sources: Option<Vec<String>>,
    pub lookback: Lookback,
    pub extraction_cap: usize,
    pub pipeline_timeout: Option<Duration>,
    pub llm: LlmSelection,
    pub rss_aggregator_key: Option<String>,
    pub json_api_a_key: Option<String>,
    pub json_api_b_key: Option<String>,
    pub provider_a_key: Option<String>,
    pub provider_b_key: Option<String>,
    pub provider_c_key: Option<String>,
    pub checkpoint_path: String,
}

impl Config {
    pub fn resolve(cli: Cli) -> Result<Config, ConfigError> {
        let lookback = match (cli.lookback_hours, cli.date_range.as_deref()) {
            (Some(_), Some(_)) => return Err(ConfigError::ConflictingLookback),
            (Some(hours), None) => Lookback::Hours(hours),
            (None, Some(range)) => parse_date_range(range)?,
            (None, None) => return Err(ConfigError::MissingLookback),
        };

        let llm = parse_llm_providers(&cli.llm_providers)?;

        let pipeline_timeout = if cli.pipeline_timeout_minutes == 0 {
            None
        } else {
            Some(Duration::from_secs(cli.pipeline_timeout_minutes * 60))
        };

        Ok(Config {
            output_dir: cli.output_dir,
            regions: none_if_empty(cli.regions),
            districts: none_if_empty(cli.districts),
            sources: none_if_empty(cli.sources),
            lookback,
            extraction_cap: cli.extraction_cap,
            pipeline_timeout,
            llm,
            rss_aggregator_key: cli.rss_aggregator_key,
            json_api_a_key: cli.json_api_a_key,
            json_api_b_key: cli.json_api_b_key,
            provider_a_key: cli.provider_a_key,
            provider_b_key: cli.provider_b_key,
            provider_c_key: cli.provider_c_key,
            checkpoint_path: cli.checkpoint_path,
        })
    }
}

fn none_if_empty(v: Vec<String>) -> Option<Vec<String>> {
    if v.is_empty() {
        None
    } else {
        Some(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_cli() -> Cli {
        Cli {
            output_dir: "./output".into(),
            regions: vec![],
            districts: vec![],
            sources: vec![],
            lookback_hours: Some(24),
            date_range: None,
            extraction_cap: 5000,
            pipeline_timeout_minutes: 0,
            llm_providers: "none".into(),
            rss_aggregator_key: None,
            json_api_a_key: None,
            json_api_b_key: None,
            provider_a_key: None,
            provider_b_key: None,
            provider_c_key: None,
            checkpoint_path: "checkpoint.json".into(),
        }
    }

    #[test]
    fn conflicting_lookback_flags_are_rejected() {
        let mut cli = base_cli();
        cli.date_range = Some("2026-01-01:2026-01-02".into());
        assert!(matches!(
            Config::resolve(cli),
            Err(ConfigError::ConflictingLookback)
        ));
    }

    #[test]
    fn missing_lookback_is_rejected() {
        let mut cli = base_cli();
        cli.lookback_hours = None;
        assert!(matches!(Config::resolve(cli), Err(ConfigError::MissingLookback)));
    }

    #[test]
    fn valid_date_range_parses() {
        let mut cli = base_cli();
        cli.lookback_hours = None;
        cli.date_range = Some("2026-01-01:2026-01-31".into());
        let config = Config::resolve(cli).unwrap();
        assert_eq!(
            config.lookback,
            Lookback::DateRange(
                NaiveDate::from_ymd_opt(2026, 1, 1).unwrap(),
                NaiveDate::from_ymd_opt(2026, 1, 31).unwrap(),
            )
        );
    }

    #[test]
    fn malformed_date_range_is_rejected() {
        let mut cli = base_cli();
        cli.lookback_hours = None;
        cli.date_range = Some("not-a-range".into());
        assert!(matches!(Config::resolve(cli), Err(ConfigError::InvalidDateRange(_))));
    }

    #[test]
    fn consensus_provider_selection_parses_unique_letters() {
        let mut cli = base_cli();
        cli.llm_providers = "a+b+a".into();
        let config = Config::resolve(cli).unwrap();
        assert_eq!(config.llm, LlmSelection::Providers(vec!['a', 'b']));
    }

    #[test]
    fn unknown_provider_letter_is_rejected() {
        let mut cli = base_cli();
        cli.llm_providers = "a+z".into();
        assert!(matches!(Config::resolve(cli), Err(ConfigError::UnknownProvider(_))));
    }

    #[test]
    fn zero_timeout_minutes_means_no_timeout() {
        let cli = base_cli();
        let config = Config::resolve(cli).unwrap();
        assert_eq!(config.pipeline_timeout, None);
    }

    #[test]
    fn nonzero_timeout_minutes_converts_to_duration() {
        let mut cli = base_cli();
        cli.pipeline_timeout_minutes = 30;
        let config = Config::resolve(cli).unwrap();
        assert_eq!(config.pipeline_timeout, Some(Duration::from_secs(1800)));
    }
}
