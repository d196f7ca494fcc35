use std::sync::Arc;

use crate::adapters::http::ReqwestTransport;
use crate::catalog::Catalog;
use crate::config::TarotConfig;
use crate::core::cache::{ImageCache, PrimeReport};
use crate::core::divination::{deliver, DivinationRequest, Diviner};
use crate::core::draw::DrawEngine;
use crate::core::fetcher::ImageFetcher;
use crate::domain::model::Reading;
use crate::domain::ports::{ImageTransport, MessageSink};
use crate::utils::error::Result;

/// 由配置組裝的完整服務：目錄、快取與占卜流程共用同一份唯讀目錄
pub struct TarotService {
    config: TarotConfig,
    catalog: Arc<Catalog>,
    cache: Arc<ImageCache>,
    diviner: Diviner,
}

impl TarotService {
    /// 載入資料表並以 reqwest 作為圖片來源
    pub fn from_config(config: TarotConfig) -> Result<Self> {
        let catalog = Arc::new(Catalog::from_files(
            config.cards_path(),
            config.formations_path(),
        )?);
        let transport = Arc::new(ReqwestTransport::with_proxy(config.proxy())?);
        Self::with_parts(config, catalog, transport)
    }

    pub fn with_parts(
        config: TarotConfig,
        catalog: Arc<Catalog>,
        transport: Arc<dyn ImageTransport>,
    ) -> Result<Self> {
        let fetcher = ImageFetcher::new(transport, config.retry_policy());
        let cache = Arc::new(ImageCache::new(
            config.cache_dir(),
            Arc::clone(&catalog),
            fetcher,
            config.asset_source(),
            config.reversal_strategy(),
        ));
        let engine = DrawEngine::new(config.reversal_probability())?;
        let diviner = Diviner::new(
            Arc::clone(&catalog),
            Arc::clone(&cache),
            engine,
            config.failure_policy(),
            config.seed(),
        );

        tracing::debug!(
            "Service ready: cache at {}, strategy {:?}",
            cache.root().display(),
            cache.strategy()
        );

        Ok(Self {
            config,
            catalog,
            cache,
            diviner,
        })
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn cache(&self) -> &Arc<ImageCache> {
        &self.cache
    }

    pub async fn divine(&self, request: &DivinationRequest) -> Result<Reading> {
        self.diviner.divine(request).await
    }

    /// 占卜並依序交給傳送端，回傳送出的訊息數
    pub async fn divine_and_deliver<S: MessageSink>(
        &self,
        request: &DivinationRequest,
        sink: &S,
    ) -> Result<usize> {
        let reading = self.diviner.divine(request).await?;
        tracing::info!(
            "✨ Reading ready: {} cards for '{}'",
            reading.items.len(),
            reading.formation
        );
        deliver(reading.into_messages(), sink, self.config.min_spacing()).await
    }

    pub async fn prime(&self, concurrency: Option<usize>) -> PrimeReport {
        let concurrency = concurrency.unwrap_or_else(|| self.config.prime_concurrency());
        tracing::info!(
            "📦 Priming cache for {} cards ({} parallel)",
            self.catalog.len(),
            concurrency
        );
        self.cache.prime(concurrency).await
    }
}
