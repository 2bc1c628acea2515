use anyhow::{Context, Result};
use clap::Parser;

use crate::kind::RequestKind;
use crate::params::{RequestParams, LIMIT, USERNAME, VIDEO_URL};
use crate::query::EncodingMode;

/// TikTok lookup client
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct CliArgs {
    /// Lookup to perform (profile, full_profile, stories, domain, following, comments, account_info)
    pub kind: RequestKind,

    /// Account to look up (comment filter for `comments`)
    #[arg(short, long)]
    pub username: Option<String>,

    /// Video link for `comments`
    #[arg(short = 'v', long)]
    pub video_url: Option<String>,

    /// Following-list size, or "full" for all (default 100)
    #[arg(short, long)]
    pub limit: Option<String>,

    /// Base URL of the lookup API
    #[arg(short = 'b', long, env = "LOOKUP_BASE_URL")]
    pub base_url: Option<String>,

    /// API key sent with every request
    #[arg(short = 'k', long, env = "LOOKUP_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Query encoding (uniform, legacy)
    #[arg(long, env = "QUERY_ENCODING", default_value = "uniform")]
    pub encoding: String,

    /// Return the JSON body of non-2xx responses instead of failing
    #[arg(
        long,
        env = "ACCEPT_ERROR_STATUS",
        default_value = "false",
        value_parser = clap::builder::BoolishValueParser::new()
    )]
    pub accept_error_status: bool,

    /// HTTP request timeout in seconds (transport default if unset)
    #[arg(long, env = "HTTP_REQUEST_TIMEOUT")]
    pub http_timeout: Option<u64>,

    /// HTTP connect timeout in seconds (transport default if unset)
    #[arg(long, env = "HTTP_CONNECT_TIMEOUT")]
    pub connect_timeout: Option<u64>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Log format (text, json)
    #[arg(long, env = "LOG_FORMAT", default_value = "text")]
    pub log_format: String,
}

impl CliArgs {
    /// Parameters for the requested lookup, as given on the command line
    pub fn request_params(&self) -> RequestParams {
        let mut params = RequestParams::new();
        if let Some(username) = &self.username {
            params.insert(USERNAME, username.as_str());
        }
        if let Some(video_url) = &self.video_url {
            params.insert(VIDEO_URL, video_url.as_str());
        }
        if let Some(limit) = &self.limit {
            params.insert(LIMIT, limit.as_str());
        }
        params
    }
}

#[derive(Clone, Debug)]
pub struct Config {
    // Upstream
    pub base_url: String,
    pub api_key: String,

    // Request shaping
    pub encoding: EncodingMode,
    pub accept_error_status: bool,

    // HTTP client
    pub http_connect_timeout: Option<u64>,
    pub http_request_timeout: Option<u64>,

    // Logging
    pub log_level: String,
    pub log_format: LogFormat,
}

#[derive(Clone, Debug, PartialEq)]
pub enum LogFormat {
    Text,
    Json,
}

impl Config {
    /// Load configuration with priority: CLI > ENV > .env file.
    ///
    /// Returns the parsed arguments too, since they carry the request.
    pub fn load() -> Result<(Self, CliArgs)> {
        // Load .env file if it exists
        dotenvy::dotenv().ok();

        let args = CliArgs::parse();
        let config = Self::from_args(&args)?;
        Ok((config, args))
    }

    /// Build configuration from already-parsed arguments
    pub fn from_args(args: &CliArgs) -> Result<Self> {
        Ok(Config {
            base_url: args
                .base_url
                .clone()
                .context("LOOKUP_BASE_URL is required (use -b or set LOOKUP_BASE_URL env var)")?,

            api_key: args
                .api_key
                .clone()
                .context("LOOKUP_API_KEY is required (use -k or set LOOKUP_API_KEY env var)")?,

            encoding: parse_encoding_mode(&args.encoding),
            accept_error_status: args.accept_error_status,

            http_connect_timeout: args.connect_timeout,
            http_request_timeout: args.http_timeout,

            log_level: args.log_level.clone(),
            log_format: parse_log_format(&args.log_format),
        })
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.api_key.trim().is_empty() {
            anyhow::bail!("LOOKUP_API_KEY cannot be empty");
        }

        let url = reqwest::Url::parse(&self.base_url)
            .with_context(|| format!("LOOKUP_BASE_URL is not a valid URL: {}", self.base_url))?;

        match url.scheme() {
            "https" => {}
            "http" => tracing::warn!(
                base_url = %self.base_url,
                "Base URL is not HTTPS; the API key will travel in plaintext"
            ),
            other => anyhow::bail!("LOOKUP_BASE_URL has unsupported scheme: {}", other),
        }

        // The query is appended to the base URL; after a fragment it would never be sent
        if url.fragment().is_some() {
            anyhow::bail!(
                "LOOKUP_BASE_URL must not contain a fragment: {}",
                self.base_url
            );
        }

        Ok(())
    }
}

/// Parse encoding mode from string
fn parse_encoding_mode(s: &str) -> EncodingMode {
    match s.to_lowercase().as_str() {
        "legacy" => EncodingMode::Legacy,
        _ => EncodingMode::Uniform,
    }
}

/// Parse log format from string
fn parse_log_format(s: &str) -> LogFormat {
    match s.to_lowercase().as_str() {
        "json" => LogFormat::Json,
        _ => LogFormat::Text,
    }
}
