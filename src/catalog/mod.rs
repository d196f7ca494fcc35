//! 卡牌與牌陣資料表。啟動時載入一次，之後唯讀共享（`Arc<Catalog>`）。

pub mod tables;

use std::collections::HashMap;
use std::path::Path;

use crate::domain::model::{
    is_major_arcana_id, Card, CardPool, Formation, PoolScope, FULL_DECK_SIZE,
};
use crate::utils::error::{Result, TarotError};
use tables::{CardTable, FormationTable};

#[derive(Debug, Clone)]
pub struct Catalog {
    cards: Vec<Card>,
    card_index: HashMap<String, usize>,
    formations: HashMap<String, Formation>,
}

impl Catalog {
    /// 由已建好的卡牌與牌陣建立目錄，並檢查資料是否合理
    pub fn from_parts(mut cards: Vec<Card>, formations: Vec<Formation>) -> Result<Self> {
        if cards.is_empty() {
            return Err(TarotError::CatalogError {
                message: "card table is empty".to_string(),
            });
        }
        if formations.is_empty() {
            return Err(TarotError::CatalogError {
                message: "formation table is empty".to_string(),
            });
        }

        cards.sort_by(|a, b| id_sort_key(&a.id).cmp(&id_sort_key(&b.id)));

        let mut card_index = HashMap::with_capacity(cards.len());
        for (position, card) in cards.iter().enumerate() {
            if card_index.insert(card.id.clone(), position).is_some() {
                return Err(TarotError::CatalogError {
                    message: format!("duplicate card id '{}'", card.id),
                });
            }
        }

        let mut formation_map = HashMap::with_capacity(formations.len());
        for formation in formations {
            if formation.card_count == 0 {
                return Err(TarotError::CatalogError {
                    message: format!("formation '{}' draws zero cards", formation.name),
                });
            }
            if formation.position_labels.len() < formation.card_count {
                tracing::warn!(
                    "⚠️ Formation '{}' has {} position labels for {} cards, missing labels fall back to 'Position N'",
                    formation.name,
                    formation.position_labels.len(),
                    formation.card_count
                );
            }
            if formation_map
                .insert(formation.name.clone(), formation)
                .is_some()
            {
                return Err(TarotError::CatalogError {
                    message: "duplicate formation name".to_string(),
                });
            }
        }

        Ok(Self {
            cards,
            card_index,
            formations: formation_map,
        })
    }

    /// 從 JSON 字串解析兩張資料表
    pub fn from_json_strs(cards_json: &str, formations_json: &str) -> Result<Self> {
        let card_table: CardTable =
            serde_json::from_str(cards_json).map_err(|e| TarotError::CatalogError {
                message: format!("invalid card table: {}", e),
            })?;
        let formation_table: FormationTable =
            serde_json::from_str(formations_json).map_err(|e| TarotError::CatalogError {
                message: format!("invalid formation table: {}", e),
            })?;

        let cards = card_table
            .into_iter()
            .map(|(id, record)| record.into_card(id))
            .collect();
        let formations = formation_table
            .into_iter()
            .map(|(name, record)| record.into_formation(name))
            .collect();

        Self::from_parts(cards, formations)
    }

    /// 從檔案載入；任何錯誤都應視為啟動失敗
    pub fn from_files<P: AsRef<Path>, Q: AsRef<Path>>(
        cards_path: P,
        formations_path: Q,
    ) -> Result<Self> {
        let read = |path: &Path| {
            std::fs::read_to_string(path).map_err(|e| TarotError::CatalogError {
                message: format!("cannot read {}: {}", path.display(), e),
            })
        };
        let cards_json = read(cards_path.as_ref())?;
        let formations_json = read(formations_path.as_ref())?;

        let catalog = Self::from_json_strs(&cards_json, &formations_json)?;
        if catalog.len() != FULL_DECK_SIZE {
            tracing::warn!(
                "⚠️ Card table has {} cards, a full deck has {}",
                catalog.len(),
                FULL_DECK_SIZE
            );
        }
        tracing::info!(
            "📚 Loaded {} cards and {} formations",
            catalog.len(),
            catalog.formations.len()
        );
        Ok(catalog)
    }

    pub fn len(&self) -> usize {
        self.cards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    pub fn cards(&self) -> &[Card] {
        &self.cards
    }

    pub fn card(&self, id: &str) -> Option<&Card> {
        self.card_index.get(id).map(|&position| &self.cards[position])
    }

    pub fn require_card(&self, id: &str) -> Result<&Card> {
        self.card(id).ok_or_else(|| TarotError::CardNotFound {
            card_id: id.to_string(),
        })
    }

    pub fn formation(&self, name: &str) -> Result<&Formation> {
        self.formations
            .get(name.trim())
            .ok_or_else(|| TarotError::UnknownFormation {
                name: name.to_string(),
            })
    }

    pub fn formation_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.formations.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// 依範圍取得候選卡牌；小阿卡納為全部扣除大阿卡納
    pub fn pool(&self, scope: PoolScope) -> Result<CardPool> {
        let ids: Vec<String> = self
            .cards
            .iter()
            .filter(|card| match scope {
                PoolScope::All => true,
                PoolScope::Major => is_major_arcana_id(&card.id),
                PoolScope::Minor => !is_major_arcana_id(&card.id),
            })
            .map(|card| card.id.clone())
            .collect();

        if ids.is_empty() {
            return Err(TarotError::EmptyPool {
                scope: scope.to_string(),
            });
        }

        Ok(CardPool::new(scope, ids))
    }
}

fn id_sort_key(id: &str) -> (u8, u32, &str) {
    match id.parse::<u32>() {
        Ok(n) => (0, n, ""),
        Err(_) => (1, 0, id),
    }
}
