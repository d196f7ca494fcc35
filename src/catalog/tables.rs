//! JSON 資料表格式（tarots.json / formation.json）

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::domain::model::{Card, Formation};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CardRecord {
    pub name: String,
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
    pub info: CardInfo,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CardInfo {
    pub description: String,
    #[serde(rename = "reverseDescription")]
    pub reverse_description: String,
    #[serde(rename = "imgUrl")]
    pub img_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FormationRecord {
    pub cards_num: usize,
    pub is_cut: bool,
    /// 第一組即各位置的名稱
    #[serde(default)]
    pub represent: Vec<Vec<String>>,
}

pub type CardTable = HashMap<String, CardRecord>;
pub type FormationTable = HashMap<String, FormationRecord>;

impl CardRecord {
    pub fn into_card(self, id: String) -> Card {
        Card {
            id,
            name: self.name,
            upright_description: self.info.description,
            reversed_description: self.info.reverse_description,
            image_ref: self.info.img_url,
        }
    }
}

impl FormationRecord {
    pub fn into_formation(self, name: String) -> Formation {
        Formation {
            name,
            card_count: self.cards_num,
            allows_reversal: self.is_cut,
            position_labels: self.represent.into_iter().next().unwrap_or_default(),
        }
    }
}
