//! Command-line interface definitions for the heat-news collection
//! pipeline.
//!
//! This module defines the CLI arguments and options using the `clap`
//! crate. Every option can be provided via a command-line flag or an
//! environment variable.

use clap::Parser;

/// Command-line arguments for the heat-news collection pipeline.
///
/// # Examples
///
/// ```sh
/// # Basic usage, all regions/sources enabled, default lookback
/// heatwatch_india -o ./output
///
/// # Restrict to two states, with API keys for the REST backends
/// heatwatch_india -o ./output --regions rajasthan,tamil-nadu \
///     --json-api-a-key YOUR_KEY --json-api-b-key YOUR_KEY
///
/// # Enable LLM consensus relevance checking across two providers
/// heatwatch_india -o ./output --llm-providers a+b \
///     --provider-a-key YOUR_KEY --provider-b-key YOUR_KEY
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Root output directory for articles.json/articles.csv/_metadata.json
    #[arg(short, long)]
    pub output_dir: String,

    /// Comma-separated region slugs to collect for (default: all regions)
    #[arg(long, value_delimiter = ',')]
    pub regions: Vec<String>,

    /// Comma-separated district slugs to restrict Phase 2 collection to
    /// (default: all districts of an active region)
    #[arg(long, value_delimiter = ',')]
    pub districts: Vec<String>,

    /// Comma-separated source names to enable (default: all three)
    #[arg(long, value_delimiter = ',')]
    pub sources: Vec<String>,

    /// Lookback window in hours (mutually exclusive with `--date-range`)
    #[arg(long)]
    pub lookback_hours: Option<u32>,

    /// Lookback window as `YYYY-MM-DD:YYYY-MM-DD` (mutually exclusive with
    /// `--lookback-hours`)
    #[arg(long)]
    pub date_range: Option<String>,

    /// Maximum number of article refs to run through extraction
    #[arg(long, default_value_t = 5000)]
    pub extraction_cap: usize,

    /// Overall pipeline timeout in minutes. `0` means no timeout.
    #[arg(long, default_value_t = 0)]
    pub pipeline_timeout_minutes: u64,

    /// LLM provider selection: "none", a single provider ("a", "b", "c"),
    /// or a consensus combination ("a+b", "a+b+c").
    #[arg(long, default_value = "none")]
    pub llm_providers: String,

    /// API key for the RSS aggregator backend, if it requires one
    #[arg(long, env = "RSS_AGGREGATOR_API_KEY")]
    pub rss_aggregator_key: Option<String>,

    /// API key for JSON API A
    #[arg(long, env = "JSON_API_A_KEY")]
    pub json_api_a_key: Option<String>,

    /// API key for JSON API B
    #[arg(long, env = "JSON_API_B_KEY")]
    pub json_api_b_key: Option<String>,

    /// API key for LLM provider A
    #[arg(long, env = "PROVIDER_A_API_KEY")]
    pub provider_a_key: Option<String>,

    /// API key for LLM provider B
    #[arg(long, env = "PROVIDER_B_API_KEY")]
    pub provider_b_key: Option<String>,

    /// API key for LLM provider C
    #[arg(long, env = "PROVIDER_C_API_KEY")]
    pub provider_c_key: Option<String>,

    /// Path to the checkpoint file used for resumability
    #[arg(long, default_value = "checkpoint.json")]
    pub checkpoint_path: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parsing_minimal() {
        let cli = Cli::parse_from(["heatwatch_india", "--output-dir", "./output"]);
        assert_eq!(cli.output_dir, "./output");
        assert_eq!(cli.extraction_cap, 5000);
        assert_eq!(cli.pipeline_timeout_minutes, 0);
        assert_eq!(cli.llm_providers, "none");
    }

    #[test]
    fn test_cli_short_flag() {
        let cli = Cli::parse_from(["heatwatch_india", "-o", "/tmp/out"]);
        assert_eq!(cli.output_dir, "/tmp/out");
    }

    #[test]
    fn test_cli_region_list_parsing() {
        let cli = Cli::parse_from([
            "heatwatch_india",
            "-o",
            "./output",
            "--regions",
            "rajasthan,tamil-nadu",
        ]);
        assert_eq!(cli.regions, vec!["rajasthan", "tamil-nadu"]);
    }

    #[test]
    fn test_cli_llm_consensus_selection() {
        let cli = Cli::parse_from(["heatwatch_india", "-o", "./output", "--llm-providers", "a+b"]);
        assert_eq!(cli.llm_providers, "a+b");
    }
}
