//! 卡牌圖片的本地快取。以 (card id, 正逆位) 為鍵，同一個鍵同時只會有一個下載在進行。

use std::collections::HashMap;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use image::ImageFormat;
use tokio::sync::{Mutex, Semaphore};
use tokio::task::JoinSet;

use crate::catalog::Catalog;
use crate::core::fetcher::ImageFetcher;
use crate::domain::model::{CacheKey, Card, Orientation};
use crate::utils::error::{Result, TarotError};

pub const DEFAULT_BASE_URL: &str = "https://raw.githubusercontent.com/FloatTech/zbpdata/main/Tarot/";
pub const DEFAULT_REVERSED_PREFIX: &str = "Reverse/";

/// 逆位圖片的取得方式，同一個部署應固定使用一種
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReversalStrategy {
    /// 逆位圖另外從遠端 `Reverse/` 路徑下載並快取
    DualFetch,
    /// 只下載正位圖，逆位時在記憶體中旋轉 180 度
    DeriveOnRead { cache_derived: bool },
}

impl Default for ReversalStrategy {
    fn default() -> Self {
        ReversalStrategy::DeriveOnRead {
            cache_derived: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetSource {
    pub base_url: String,
    pub reversed_prefix: String,
}

impl Default for AssetSource {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            reversed_prefix: DEFAULT_REVERSED_PREFIX.to_string(),
        }
    }
}

impl AssetSource {
    pub fn url_for(&self, card: &Card, orientation: Orientation) -> String {
        match orientation {
            Orientation::Upright => format!("{}{}", self.base_url, card.image_ref),
            Orientation::Reversed => format!(
                "{}{}{}",
                self.base_url, self.reversed_prefix, card.image_ref
            ),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PrimeReport {
    pub succeeded: usize,
    pub attempted: usize,
    pub failures: Vec<String>,
}

pub struct ImageCache {
    root: PathBuf,
    catalog: Arc<Catalog>,
    fetcher: ImageFetcher,
    source: AssetSource,
    strategy: ReversalStrategy,
    key_locks: Mutex<HashMap<CacheKey, Arc<Mutex<()>>>>,
}

impl ImageCache {
    pub fn new(
        root: impl Into<PathBuf>,
        catalog: Arc<Catalog>,
        fetcher: ImageFetcher,
        source: AssetSource,
        strategy: ReversalStrategy,
    ) -> Self {
        Self {
            root: root.into(),
            catalog,
            fetcher,
            source,
            strategy,
            key_locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn strategy(&self) -> ReversalStrategy {
        self.strategy
    }

    pub fn path_for(&self, key: &CacheKey) -> PathBuf {
        self.root.join(key.file_name())
    }

    pub async fn is_cached(&self, card_id: &str, orientation: Orientation) -> bool {
        let path = self.path_for(&CacheKey::new(card_id, orientation));
        tokio::fs::try_exists(&path).await.unwrap_or(false)
    }

    /// 取得卡牌圖片的 bytes。快取命中時不做網路請求也不重新檢查。
    pub async fn get(&self, card_id: &str, orientation: Orientation) -> Result<Vec<u8>> {
        let card = self.catalog.require_card(card_id)?;

        match (orientation, self.strategy) {
            (Orientation::Reversed, ReversalStrategy::DeriveOnRead { cache_derived }) => {
                self.get_derived(card, cache_derived).await
            }
            _ => {
                let path = self.ensure_cached(card, orientation).await?;
                Ok(tokio::fs::read(&path).await?)
            }
        }
    }

    async fn get_derived(&self, card: &Card, cache_derived: bool) -> Result<Vec<u8>> {
        let reversed_key = CacheKey::new(card.id.clone(), Orientation::Reversed);
        let reversed_path = self.path_for(&reversed_key);

        if cache_derived && tokio::fs::try_exists(&reversed_path).await? {
            tracing::debug!("Cache hit for {}", reversed_key);
            return Ok(tokio::fs::read(&reversed_path).await?);
        }

        let upright_path = self.ensure_cached(card, Orientation::Upright).await?;
        let upright = tokio::fs::read(&upright_path).await?;

        let rotated = tokio::task::spawn_blocking(move || rotate_180(&upright).map_err(|e| (e, upright)))
            .await
            .map_err(|e| TarotError::ProcessingError {
                message: format!("rotation task failed: {}", e),
            })?;

        match rotated {
            Ok(rotated) => {
                if cache_derived {
                    self.store_derived(&reversed_key, &reversed_path, &rotated)
                        .await;
                }
                Ok(rotated)
            }
            Err((e, upright)) => {
                tracing::error!(
                    "❌ Failed to rotate card {}, serving upright image: {}",
                    card.id,
                    e
                );
                Ok(upright)
            }
        }
    }

    /// 寫入失敗只記錄，下次讀取會重新旋轉
    async fn store_derived(&self, key: &CacheKey, path: &Path, bytes: &[u8]) {
        let lock = self.lock_for(key).await;
        let _guard = lock.lock().await;

        let part = path.with_extension("png.part");
        let result = async {
            tokio::fs::write(&part, bytes).await?;
            tokio::fs::rename(&part, path).await
        }
        .await;

        if let Err(e) = result {
            tracing::warn!("⚠️ Could not cache derived image {}: {}", key, e);
            let _ = tokio::fs::remove_file(&part).await;
        }
    }

    /// 確保鍵對應的檔案存在並回傳路徑；未命中時在鍵鎖內下載
    async fn ensure_cached(&self, card: &Card, orientation: Orientation) -> Result<PathBuf> {
        let key = CacheKey::new(card.id.clone(), orientation);
        let path = self.path_for(&key);

        if tokio::fs::try_exists(&path).await? {
            tracing::debug!("Cache hit for {}", key);
            return Ok(path);
        }

        let lock = self.lock_for(&key).await;
        let _guard = lock.lock().await;

        // 等鎖期間可能已由另一個請求下載完成
        if tokio::fs::try_exists(&path).await? {
            tracing::debug!("Cache filled by concurrent request for {}", key);
            return Ok(path);
        }

        tracing::info!("📥 Cache miss for {}, fetching", key);
        let url = self.source.url_for(card, orientation);
        self.fetcher.download(&url, &path).await?;
        Ok(path)
    }

    async fn lock_for(&self, key: &CacheKey) -> Arc<Mutex<()>> {
        let mut locks = self.key_locks.lock().await;
        locks
            .entry(key.clone())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// 預先快取目錄中所有卡牌。個別失敗只記錄，不中斷整批。
    pub async fn prime(self: &Arc<Self>, concurrency: usize) -> PrimeReport {
        let orientations: &'static [Orientation] = match self.strategy {
            ReversalStrategy::DualFetch => &[Orientation::Upright, Orientation::Reversed],
            ReversalStrategy::DeriveOnRead { .. } => &[Orientation::Upright],
        };
        let semaphore = Arc::new(Semaphore::new(concurrency.max(1)));
        let mut tasks = JoinSet::new();

        for card in self.catalog.cards() {
            let cache = Arc::clone(self);
            let semaphore = Arc::clone(&semaphore);
            let card_id = card.id.clone();

            tasks.spawn(async move {
                let _permit = semaphore.acquire_owned().await;
                let result = async {
                    let card = cache.catalog.require_card(&card_id)?;
                    for &orientation in orientations {
                        cache.ensure_cached(card, orientation).await?;
                    }
                    Ok::<(), TarotError>(())
                }
                .await;
                (card_id, result)
            });
        }

        let mut report = PrimeReport {
            attempted: self.catalog.len(),
            ..PrimeReport::default()
        };

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((card_id, Ok(()))) => {
                    tracing::debug!("Primed card {}", card_id);
                    report.succeeded += 1;
                }
                Ok((card_id, Err(e))) => {
                    tracing::warn!("⚠️ Failed to cache card {}: {}", card_id, e);
                    report.failures.push(format!("{}: {}", card_id, e));
                }
                Err(e) => {
                    tracing::error!("❌ Prime task aborted: {}", e);
                    report.failures.push(e.to_string());
                }
            }
        }

        tracing::info!(
            "📦 Cache primed: {}/{} cards",
            report.succeeded,
            report.attempted
        );
        report
    }
}

/// 將圖片旋轉 180 度並以 PNG 重新編碼
pub fn rotate_180(bytes: &[u8]) -> Result<Vec<u8>> {
    let rotated = image::load_from_memory(bytes)?.rotate180();
    let mut buffer = Vec::new();
    rotated.write_to(&mut Cursor::new(&mut buffer), ImageFormat::Png)?;
    Ok(buffer)
}
