use crate::core::cache::{AssetSource, ReversalStrategy, DEFAULT_BASE_URL, DEFAULT_REVERSED_PREFIX};
use crate::core::divination::{FailurePolicy, DEFAULT_MIN_SPACING};
use crate::core::draw::DEFAULT_REVERSAL_PROBABILITY;
use crate::core::fetcher::{
    Backoff, RetryPolicy, DEFAULT_INITIAL_DELAY, DEFAULT_MAX_RETRIES, DEFAULT_TIMEOUT,
};
use crate::utils::error::{Result, TarotError};
use crate::utils::validation::{self, Validate};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TarotConfig {
    pub catalog: CatalogConfig,
    #[serde(default)]
    pub source: SourceConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub draw: DrawConfig,
    #[serde(default)]
    pub delivery: DeliveryConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogConfig {
    pub cards_path: Option<String>,
    pub formations_path: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SourceConfig {
    pub base_url: Option<String>,
    pub reversed_prefix: Option<String>,
    pub proxy: Option<String>,
    pub timeout_seconds: Option<u64>,
    pub retry_attempts: Option<u32>,
    pub retry_delay_seconds: Option<u64>,
    pub backoff: Option<BackoffKind>,
    pub backoff_base: Option<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackoffKind {
    Multiplicative,
    Power,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CacheConfig {
    pub dir: Option<String>,
    pub reversal_strategy: Option<StrategyKind>,
    pub cache_derived: Option<bool>,
    pub prime_concurrency: Option<usize>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    Derive,
    DualFetch,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DrawConfig {
    pub reversal_probability: Option<f64>,
    pub seed: Option<u64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeliveryConfig {
    pub min_spacing_ms: Option<u64>,
    pub failure_policy: Option<FailurePolicy>,
}

impl TarotConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(TarotError::IoError)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| TarotError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${TAROT_PROXY})
    fn substitute_env_vars(content: &str) -> Result<String> {
        use regex::Regex;
        let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| TarotError::ConfigError {
            message: format!("invalid substitution pattern: {}", e),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    /// 驗證配置的合理性
    pub fn validate_config(&self) -> Result<()> {
        let cards = validation::validate_required_field("catalog.cards_path", &self.catalog.cards_path)?;
        validation::validate_json_file("catalog.cards_path", cards)?;
        let formations = validation::validate_required_field(
            "catalog.formations_path",
            &self.catalog.formations_path,
        )?;
        validation::validate_json_file("catalog.formations_path", formations)?;

        validation::validate_base_url("source.base_url", &self.base_url())?;
        if let Some(proxy) = &self.source.proxy {
            validation::validate_url("source.proxy", proxy)?;
        }
        if let Some(prefix) = &self.source.reversed_prefix {
            validation::validate_non_empty_string("source.reversed_prefix", prefix)?;
        }
        if let Some(attempts) = self.source.retry_attempts {
            validation::validate_positive_number("source.retry_attempts", attempts as usize, 1)?;
        }
        if let Some(timeout) = self.source.timeout_seconds {
            validation::validate_positive_number("source.timeout_seconds", timeout as usize, 1)?;
        }
        if let Some(base) = self.source.backoff_base {
            validation::validate_positive_number("source.backoff_base", base as usize, 1)?;
        }

        validation::validate_path("cache.dir", &self.cache_dir())?;
        if let Some(concurrency) = self.cache.prime_concurrency {
            validation::validate_positive_number("cache.prime_concurrency", concurrency, 1)?;
        }

        validation::validate_range(
            "draw.reversal_probability",
            self.reversal_probability(),
            0.0,
            1.0,
        )?;

        Ok(())
    }

    pub fn cards_path(&self) -> &str {
        self.catalog.cards_path.as_deref().unwrap_or_default()
    }

    pub fn formations_path(&self) -> &str {
        self.catalog.formations_path.as_deref().unwrap_or_default()
    }

    pub fn base_url(&self) -> String {
        self.source
            .base_url
            .clone()
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
    }

    pub fn asset_source(&self) -> AssetSource {
        AssetSource {
            base_url: self.base_url(),
            reversed_prefix: self
                .source
                .reversed_prefix
                .clone()
                .unwrap_or_else(|| DEFAULT_REVERSED_PREFIX.to_string()),
        }
    }

    pub fn proxy(&self) -> Option<&str> {
        self.source.proxy.as_deref()
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        let backoff = match self.source.backoff.unwrap_or(BackoffKind::Multiplicative) {
            BackoffKind::Multiplicative => Backoff::Multiplicative {
                base: self.source.backoff_base.unwrap_or(2),
            },
            BackoffKind::Power => Backoff::Power,
        };

        RetryPolicy {
            max_retries: self.source.retry_attempts.unwrap_or(DEFAULT_MAX_RETRIES),
            initial_delay: self
                .source
                .retry_delay_seconds
                .map(Duration::from_secs)
                .unwrap_or(DEFAULT_INITIAL_DELAY),
            timeout: self
                .source
                .timeout_seconds
                .map(Duration::from_secs)
                .unwrap_or(DEFAULT_TIMEOUT),
            backoff,
        }
    }

    pub fn cache_dir(&self) -> String {
        self.cache
            .dir
            .clone()
            .unwrap_or_else(|| "./tarots_cache".to_string())
    }

    pub fn reversal_strategy(&self) -> ReversalStrategy {
        match self.cache.reversal_strategy.unwrap_or(StrategyKind::Derive) {
            StrategyKind::Derive => ReversalStrategy::DeriveOnRead {
                cache_derived: self.cache.cache_derived.unwrap_or(false),
            },
            StrategyKind::DualFetch => ReversalStrategy::DualFetch,
        }
    }

    pub fn prime_concurrency(&self) -> usize {
        self.cache.prime_concurrency.unwrap_or(4)
    }

    pub fn reversal_probability(&self) -> f64 {
        self.draw
            .reversal_probability
            .unwrap_or(DEFAULT_REVERSAL_PROBABILITY)
    }

    pub fn seed(&self) -> Option<u64> {
        self.draw.seed
    }

    pub fn min_spacing(&self) -> Duration {
        self.delivery
            .min_spacing_ms
            .map(Duration::from_millis)
            .unwrap_or(DEFAULT_MIN_SPACING)
    }

    pub fn failure_policy(&self) -> FailurePolicy {
        self.delivery.failure_policy.unwrap_or_default()
    }
}

impl Validate for TarotConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}
