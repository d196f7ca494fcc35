//! 抽牌到取圖的完整流程。對外只輸出依牌陣順序排列的 `Reading`，
//! 文字生成與平台傳送由外部負責。

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::catalog::Catalog;
use crate::core::cache::ImageCache;
use crate::core::draw::DrawEngine;
use crate::domain::model::{OutboundMessage, PoolScope, Reading, ReadingItem};
use crate::domain::ports::MessageSink;
use crate::utils::error::{Result, TarotError};

/// 描述文字截斷長度（字元數）
pub const DESCRIPTION_SNIPPET_CHARS: usize = 100;

/// 傳送端兩則訊息之間的建議最小間隔
pub const DEFAULT_MIN_SPACING: Duration = Duration::from_millis(300);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// 任一張圖取得失敗即中止整次占卜
    #[default]
    FailFast,
    /// 取圖失敗的卡牌仍輸出文字，只是沒有圖片
    BestEffort,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DivinationRequest {
    pub scope: String,
    pub formation: String,
}

impl DivinationRequest {
    pub fn new(scope: impl Into<String>, formation: impl Into<String>) -> Self {
        Self {
            scope: scope.into(),
            formation: formation.into(),
        }
    }
}

pub struct Diviner {
    catalog: Arc<Catalog>,
    cache: Arc<ImageCache>,
    engine: DrawEngine,
    failure_policy: FailurePolicy,
    rng: Mutex<ChaCha8Rng>,
}

impl Diviner {
    pub fn new(
        catalog: Arc<Catalog>,
        cache: Arc<ImageCache>,
        engine: DrawEngine,
        failure_policy: FailurePolicy,
        seed: Option<u64>,
    ) -> Self {
        let rng = match seed {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_entropy(),
        };
        Self {
            catalog,
            cache,
            engine,
            failure_policy,
            rng: Mutex::new(rng),
        }
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub async fn divine(&self, request: &DivinationRequest) -> Result<Reading> {
        let scope: PoolScope = request.scope.parse()?;
        let formation = self.catalog.formation(&request.formation)?;
        let pool = self.catalog.pool(scope)?;

        tracing::info!(
            "🔮 Drawing '{}' from {} pool ({} cards)",
            formation.name,
            scope,
            pool.len()
        );

        let draw = {
            let mut rng = self.rng.lock().await;
            self.engine.draw(&pool, formation, &mut *rng)?
        };

        // 各張圖片並行取得。JoinHandle 被丟棄時任務不會中止，
        // 呼叫端放棄請求後下載仍會完成並寫入快取
        let handles: Vec<_> = draw
            .cards
            .iter()
            .map(|drawn| {
                let cache = Arc::clone(&self.cache);
                let card_id = drawn.card_id.clone();
                let orientation = drawn.orientation;
                tokio::spawn(async move { cache.get(&card_id, orientation).await })
            })
            .collect();

        let mut images: Vec<Option<Vec<u8>>> = Vec::with_capacity(handles.len());
        for (drawn, handle) in draw.cards.iter().zip(handles) {
            let result = handle.await.map_err(|e| TarotError::ProcessingError {
                message: format!("image task failed: {}", e),
            })?;
            match result {
                Ok(bytes) => images.push(Some(bytes)),
                Err(e) => match self.failure_policy {
                    FailurePolicy::FailFast => {
                        tracing::error!(
                            "❌ Divination aborted, image for {} unavailable: {}",
                            drawn.card_id,
                            e
                        );
                        return Err(e);
                    }
                    FailurePolicy::BestEffort => {
                        tracing::warn!("⚠️ Delivering {} without image: {}", drawn.card_id, e);
                        images.push(None);
                    }
                },
            }
        }

        let mut items = Vec::with_capacity(draw.len());
        for (drawn, image) in draw.cards.into_iter().zip(images) {
            let card = self.catalog.require_card(&drawn.card_id)?;
            items.push(ReadingItem {
                position: drawn.position,
                card_id: card.id.clone(),
                card_name: card.name.clone(),
                orientation: drawn.orientation,
                description: snippet(card.description(drawn.orientation)),
                image,
            });
        }

        Ok(Reading {
            formation: draw.formation,
            scope,
            drawn_at: Utc::now(),
            items,
        })
    }
}

fn snippet(description: &str) -> String {
    let truncated: String = description.chars().take(DESCRIPTION_SNIPPET_CHARS).collect();
    format!("{}...", truncated)
}

impl Reading {
    /// 交給外部文字生成的原始結果
    pub fn summary_text(&self) -> String {
        let mut text = format!("[{}]\n", self.formation);
        for item in &self.items {
            text.push_str(&format!(
                "\n{} - {} {}\n{}\n",
                item.position, item.orientation, item.card_name, item.description
            ));
        }
        text
    }

    /// 依牌陣順序輸出：每張牌的圖片，最後是文字結果
    pub fn into_messages(self) -> Vec<OutboundMessage> {
        let summary = self.summary_text();
        let mut messages: Vec<OutboundMessage> = self
            .items
            .into_iter()
            .enumerate()
            .filter_map(|(index, item)| {
                item.image.map(|bytes| OutboundMessage::Image {
                    slot: index + 1,
                    bytes,
                })
            })
            .collect();
        messages.push(OutboundMessage::Text(summary));
        messages
    }
}

/// 依序送出訊息，兩則之間至少間隔 `min_spacing`
pub async fn deliver<S: MessageSink>(
    messages: Vec<OutboundMessage>,
    sink: &S,
    min_spacing: Duration,
) -> Result<usize> {
    let total = messages.len();
    for (index, message) in messages.into_iter().enumerate() {
        if index > 0 && !min_spacing.is_zero() {
            tokio::time::sleep(min_spacing).await;
        }
        tracing::debug!("Sending {} message {}/{}", message.kind(), index + 1, total);
        sink.send(message).await?;
    }
    Ok(total)
}
