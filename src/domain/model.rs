use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::utils::error::TarotError;

/// 大阿卡納共 22 張，id 0..22
pub const MAJOR_ARCANA_COUNT: u32 = 22;

/// 一副完整塔羅牌的張數
pub const FULL_DECK_SIZE: usize = 78;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Card {
    pub id: String,
    pub name: String,
    pub upright_description: String,
    pub reversed_description: String,
    pub image_ref: String,
}

impl Card {
    /// 依 id 範圍判斷是否屬於大阿卡納；非數字 id 一律視為小阿卡納
    pub fn is_major_arcana(&self) -> bool {
        is_major_arcana_id(&self.id)
    }

    pub fn description(&self, orientation: Orientation) -> &str {
        match orientation {
            Orientation::Upright => &self.upright_description,
            Orientation::Reversed => &self.reversed_description,
        }
    }
}

pub fn is_major_arcana_id(id: &str) -> bool {
    id.parse::<u32>()
        .map(|n| n < MAJOR_ARCANA_COUNT)
        .unwrap_or(false)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Formation {
    pub name: String,
    pub card_count: usize,
    /// 即 `is_cut`：是否允許逆位
    pub allows_reversal: bool,
    pub position_labels: Vec<String>,
}

impl Formation {
    /// 第 `index` 張牌的位置名稱；標籤不足時退回 "Position N"
    pub fn position_label(&self, index: usize) -> String {
        self.position_labels
            .get(index)
            .cloned()
            .unwrap_or_else(|| format!("Position {}", index + 1))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PoolScope {
    All,
    Major,
    Minor,
}

impl PoolScope {
    pub fn as_str(&self) -> &'static str {
        match self {
            PoolScope::All => "all",
            PoolScope::Major => "major",
            PoolScope::Minor => "minor",
        }
    }
}

impl fmt::Display for PoolScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PoolScope {
    type Err = TarotError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "all" | "全部" => Ok(PoolScope::All),
            "major" | "大阿卡纳" | "大阿卡納" => Ok(PoolScope::Major),
            "minor" | "小阿卡纳" | "小阿卡納" => Ok(PoolScope::Minor),
            other => Err(TarotError::UnknownPool {
                scope: other.to_string(),
            }),
        }
    }
}

/// 某個抽牌範圍內的合法卡牌 id，依 id 數值排序
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CardPool {
    scope: PoolScope,
    ids: Vec<String>,
}

impl CardPool {
    pub fn new(scope: PoolScope, ids: Vec<String>) -> Self {
        Self { scope, ids }
    }

    pub fn scope(&self) -> PoolScope {
        self.scope
    }

    pub fn ids(&self) -> &[String] {
        &self.ids
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.ids.iter().any(|candidate| candidate == id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Orientation {
    Upright,
    Reversed,
}

impl Orientation {
    pub fn from_reversed(is_reversed: bool) -> Self {
        if is_reversed {
            Orientation::Reversed
        } else {
            Orientation::Upright
        }
    }

    pub fn is_reversed(&self) -> bool {
        matches!(self, Orientation::Reversed)
    }

    /// 快取檔名後綴，與舊版快取目錄相容
    pub fn file_suffix(&self) -> &'static str {
        match self {
            Orientation::Upright => "norm",
            Orientation::Reversed => "rev",
        }
    }
}

impl fmt::Display for Orientation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Orientation::Upright => f.write_str("Upright"),
            Orientation::Reversed => f.write_str("Reversed"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DrawnCard {
    pub card_id: String,
    pub orientation: Orientation,
    pub position: String,
}

impl DrawnCard {
    pub fn is_reversed(&self) -> bool {
        self.orientation.is_reversed()
    }
}

/// 一次抽牌的結果，順序即牌陣位置順序，不含重複卡牌
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DrawResult {
    pub formation: String,
    pub cards: Vec<DrawnCard>,
}

impl DrawResult {
    pub fn len(&self) -> usize {
        self.cards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    pub fn pairs(&self) -> impl Iterator<Item = (&str, bool)> + '_ {
        self.cards
            .iter()
            .map(|card| (card.card_id.as_str(), card.is_reversed()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub card_id: String,
    pub orientation: Orientation,
}

impl CacheKey {
    pub fn new(card_id: impl Into<String>, orientation: Orientation) -> Self {
        Self {
            card_id: card_id.into(),
            orientation,
        }
    }

    pub fn file_name(&self) -> String {
        format!("{}_{}.png", self.card_id, self.orientation.file_suffix())
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.card_id, self.orientation.file_suffix())
    }
}

#[derive(Debug, Clone)]
pub struct ReadingItem {
    pub position: String,
    pub card_id: String,
    pub card_name: String,
    pub orientation: Orientation,
    pub description: String,
    /// BestEffort 模式下下載失敗時為 None
    pub image: Option<Vec<u8>>,
}

#[derive(Debug, Clone)]
pub struct Reading {
    pub formation: String,
    pub scope: PoolScope,
    pub drawn_at: DateTime<Utc>,
    pub items: Vec<ReadingItem>,
}

/// 交給訊息傳送端的項目
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutboundMessage {
    Text(String),
    /// `slot` 為牌陣中的位置（從 1 起算），缺圖的位置不會出現
    Image { slot: usize, bytes: Vec<u8> },
}

impl OutboundMessage {
    pub fn kind(&self) -> &'static str {
        match self {
            OutboundMessage::Text(_) => "text",
            OutboundMessage::Image { .. } => "image",
        }
    }
}
