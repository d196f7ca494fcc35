//! 帶重試與完整性檢查的圖片下載器。所有下載路徑（抽牌、預先快取）共用這一份。

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use crate::core::integrity::IntegrityValidator;
use crate::domain::ports::ImageTransport;
use crate::utils::error::{Result, TarotError};

pub const DEFAULT_MAX_RETRIES: u32 = 3;
pub const DEFAULT_INITIAL_DELAY: Duration = Duration::from_secs(2);
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Backoff {
    /// `initial_delay * base^(attempt-1)`
    Multiplicative { base: u32 },
    /// `initial_delay^attempt`（以秒計），與舊版計時一致
    Power,
}

impl Default for Backoff {
    fn default() -> Self {
        Backoff::Multiplicative { base: 2 }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub initial_delay: Duration,
    pub timeout: Duration,
    pub backoff: Backoff,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            initial_delay: DEFAULT_INITIAL_DELAY,
            timeout: DEFAULT_TIMEOUT,
            backoff: Backoff::default(),
        }
    }
}

impl RetryPolicy {
    /// 第 `attempt` 次（從 1 起算）失敗後、下一次嘗試前的等待時間
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1);
        match self.backoff {
            Backoff::Multiplicative { base } => {
                let factor = base.max(1).saturating_pow(exponent);
                self.initial_delay.saturating_mul(factor)
            }
            Backoff::Power => {
                let secs = self.initial_delay.as_secs_f64().powi(attempt.max(1) as i32);
                Duration::try_from_secs_f64(secs).unwrap_or(Duration::MAX)
            }
        }
    }
}

pub struct ImageFetcher {
    transport: Arc<dyn ImageTransport>,
    validator: IntegrityValidator,
    policy: RetryPolicy,
}

impl ImageFetcher {
    pub fn new(transport: Arc<dyn ImageTransport>, policy: RetryPolicy) -> Self {
        Self {
            transport,
            validator: IntegrityValidator::new(),
            policy,
        }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// 下載 `url` 到 `dest`。內容先寫入同目錄的 `.part` 檔，通過檢查後才 rename 到位，
    /// 讀取端不會看到寫到一半的檔案。重試用盡時回傳 `FetchExhausted`。
    pub async fn download(&self, url: &str, dest: &Path) -> Result<()> {
        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let part_path = part_path_for(dest);
        let max_retries = self.policy.max_retries.max(1);

        for attempt in 1..=max_retries {
            tracing::info!("⬇️ Download attempt {}/{} - {}", attempt, max_retries, url);

            match self.try_once(url, &part_path, dest).await {
                Ok(()) => {
                    tracing::info!(
                        "✅ Downloaded and verified {} (attempt {})",
                        dest.display(),
                        attempt
                    );
                    return Ok(());
                }
                Err(e) if e.is_transient() => {
                    tracing::warn!(
                        "⚠️ Download attempt {}/{} failed: {}",
                        attempt,
                        max_retries,
                        e
                    );
                }
                Err(e) => {
                    // 本地錯誤（例如快取目錄無法寫入）重試也無法恢復
                    tracing::error!("❌ Download of {} failed, not retrying: {}", url, e);
                    let _ = tokio::fs::remove_file(&part_path).await;
                    return Err(e);
                }
            }

            if attempt < max_retries {
                let delay = self.policy.delay_after(attempt);
                tracing::debug!("Retrying {} in {:?}", url, delay);
                tokio::time::sleep(delay).await;
            }
        }

        tracing::error!(
            "❌ Giving up on {} after {} attempts",
            url,
            max_retries
        );
        Err(TarotError::FetchExhausted {
            url: url.to_string(),
            attempts: max_retries,
        })
    }

    async fn try_once(&self, url: &str, part_path: &Path, dest: &Path) -> Result<()> {
        let response = self.transport.get(url, self.policy.timeout).await?;

        if response.status != 200 {
            return Err(TarotError::FetchTransient {
                message: format!("unexpected status {}", response.status),
            });
        }

        tokio::fs::write(part_path, &response.body).await?;

        if !self.validator.validate_async(part_path).await? {
            tracing::warn!(
                "⚠️ Integrity check failed, deleting {}",
                part_path.display()
            );
            if let Err(e) = tokio::fs::remove_file(part_path).await {
                tracing::error!("Failed to delete corrupt file {}: {}", part_path.display(), e);
            }
            return Err(TarotError::IntegrityError {
                path: dest.display().to_string(),
            });
        }

        tokio::fs::rename(part_path, dest).await?;
        Ok(())
    }
}

fn part_path_for(dest: &Path) -> PathBuf {
    let mut name = dest
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".part");
    dest.with_file_name(name)
}
