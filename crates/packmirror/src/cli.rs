use std::path::PathBuf;

use clap::Parser;
use serde::Serialize;

/// Build and refresh a local mirror of a Composer package registry.
#[derive(Parser, Debug)]
#[command(name = "packmirror")]
#[command(version, about, long_about = None)]
pub struct Args {
    /// Path to configuration file
    #[arg(short, long, env = "PACKMIRROR_CONFIG", default_value = "packmirror.toml")]
    pub config: PathBuf,

    /// Keep crawling, sleeping `interval` seconds between runs
    #[arg(short, long)]
    pub watch: bool,

    #[command(flatten)]
    pub overrides: Overrides,
}

/// Command-line values that take precedence over file and environment
/// configuration. Unset options are not serialized, so they never mask a
/// lower layer.
#[derive(clap::Args, Serialize, Debug, Default)]
pub struct Overrides {
    /// Upstream registry base URL
    #[arg(long)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mirror: Option<String>,

    /// Outbound HTTP proxy
    #[arg(long)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub proxy: Option<String>,

    /// Attempts per request, including the first
    #[arg(long)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attempts: Option<u32>,

    /// Request timeout in seconds
    #[arg(long)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout: Option<u64>,

    /// Concurrent package fetches per shard
    #[arg(short = 'j', long)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub concurrency: Option<usize>,

    /// Seconds between runs in watch mode
    #[arg(long)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interval: Option<u64>,

    /// Checkpoint and output directory
    #[arg(long)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<PathBuf>,

    /// Log every package fetch
    #[arg(short, long)]
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub verbose: bool,

    /// Write raw shard and package documents under the data directory
    #[arg(long)]
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub dump: bool,

    /// Only take this many packages from each shard
    #[arg(long)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shard_package_limit: Option<usize>,

    /// dist-url advertised by the generated index
    #[arg(long)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dist_url: Option<String>,

    /// metadata-url advertised by the generated index
    #[arg(long)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata_url: Option<String>,

    /// providers-url advertised by the generated index
    #[arg(long)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub providers_url: Option<String>,

    #[command(flatten)]
    pub redis: RedisOverrides,
}

#[derive(clap::Args, Serialize, Debug, Default)]
pub struct RedisOverrides {
    /// Publish dist references to Redis
    #[arg(long = "redis-enabled", value_name = "BOOL")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,

    #[arg(long = "redis-host")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,

    #[arg(long = "redis-port")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,

    #[arg(long = "redis-password")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,

    #[arg(long = "redis-db")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub db: Option<i64>,
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn verify_cli() { Args::command().debug_assert(); }

    #[test]
    fn test_parse_overrides() {
        let args = Args::try_parse_from([
            "packmirror",
            "--watch",
            "-j",
            "8",
            "--data-dir",
            "/srv/mirror",
            "--redis-enabled",
            "false",
        ])
        .unwrap();

        assert!(args.watch);
        assert_eq!(args.overrides.concurrency, Some(8));
        assert_eq!(args.overrides.data_dir, Some(PathBuf::from("/srv/mirror")));
        assert_eq!(args.overrides.redis.enabled, Some(false));
        assert_eq!(args.overrides.mirror, None);
    }
}
