use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, ensure};
use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use packmirror_crawl::CrawlConfig;
use packmirror_fetch::{ClientSettings, FetchOptions};
use packmirror_registry::MirrorTemplates;
use packmirror_state::RedisSettings;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::cli::Args;

const ENV_PREFIX: &str = "PACKMIRROR_";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MirrorConfig {
    /// Upstream registry base URL.
    pub mirror:              String,
    pub proxy:               Option<String>,
    pub attempts:            u32,
    /// Request timeout, seconds.
    pub timeout:             u64,
    pub concurrency:         usize,
    /// Watch-mode pause between runs, seconds.
    pub interval:            u64,
    pub data_dir:            PathBuf,
    pub verbose:             bool,
    pub dump:                bool,
    pub shard_package_limit: Option<usize>,
    pub dist_url:            String,
    pub metadata_url:        String,
    pub providers_url:       String,
    pub redis:               RedisConfig,
}

impl Default for MirrorConfig {
    fn default() -> Self {
        let templates = MirrorTemplates::default();
        Self {
            mirror:              "https://packagist.org".to_string(),
            proxy:               None,
            attempts:            5,
            timeout:             30,
            concurrency:         30,
            interval:            60,
            data_dir:            PathBuf::from("./data"),
            verbose:             false,
            dump:                false,
            shard_package_limit: None,
            dist_url:            templates.dist_url,
            metadata_url:        templates.metadata_url,
            providers_url:       templates.providers_url,
            redis:               RedisConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RedisConfig {
    pub enabled:  bool,
    pub host:     String,
    pub port:     u16,
    pub password: Option<String>,
    pub db:       i64,
}

impl Default for RedisConfig {
    fn default() -> Self {
        let settings = RedisSettings::default();
        Self {
            enabled:  true,
            host:     settings.host,
            port:     settings.port,
            password: settings.password,
            db:       settings.db,
        }
    }
}

impl MirrorConfig {
    /// Defaults, then the TOML file, then `PACKMIRROR_*` environment
    /// variables (`__` separates nested keys), then command-line flags.
    pub fn figment(config_path: &Path, args: &Args) -> Figment {
        Figment::from(Serialized::defaults(MirrorConfig::default()))
            .merge(Toml::file(config_path))
            .merge(Env::prefixed(ENV_PREFIX).split("__").ignore(&["config"]))
            .merge(Serialized::defaults(&args.overrides))
    }

    pub fn load(args: &Args) -> Result<Self> {
        let config: MirrorConfig = Self::figment(&args.config, args)
            .extract()
            .context("failed to load configuration")?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        ensure!(self.concurrency >= 1, "concurrency must be at least 1");
        ensure!(self.attempts >= 1, "attempts must be at least 1");
        let url = Url::parse(&self.mirror)
            .with_context(|| format!("mirror is not a valid URL: {}", self.mirror))?;
        ensure!(
            matches!(url.scheme(), "http" | "https"),
            "mirror must be an http(s) URL, got {}",
            self.mirror
        );
        Ok(())
    }

    pub fn interval(&self) -> Duration { Duration::from_secs(self.interval) }

    pub fn client_settings(&self) -> ClientSettings {
        ClientSettings {
            timeout:    Some(Duration::from_secs(self.timeout)),
            proxy:      self.proxy.clone(),
            user_agent: None,
        }
    }

    pub fn fetch_options(&self) -> FetchOptions { FetchOptions::default().attempts(self.attempts) }

    pub fn crawl_config(&self) -> CrawlConfig {
        CrawlConfig::new(self.mirror.as_str(), self.data_dir.as_path())
            .concurrency(self.concurrency)
            .shard_package_limit(self.shard_package_limit)
            .dump(self.dump)
            .verbose(self.verbose)
            .templates(MirrorTemplates {
                dist_url:      self.dist_url.clone(),
                metadata_url:  self.metadata_url.clone(),
                providers_url: self.providers_url.clone(),
            })
    }

    pub fn redis_settings(&self) -> RedisSettings {
        RedisSettings {
            host:     self.redis.host.clone(),
            port:     self.redis.port,
            password: self.redis.password.clone(),
            db:       self.redis.db,
        }
    }
}
