use rand::seq::index;
use rand::Rng;

use crate::domain::model::{CardPool, DrawResult, DrawnCard, Formation, Orientation};
use crate::utils::error::{Result, TarotError};
use crate::utils::validation::validate_range;

pub const DEFAULT_REVERSAL_PROBABILITY: f64 = 0.5;

/// 抽牌引擎：不放回抽樣，並依牌陣設定決定正逆位。隨機來源由呼叫端注入。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DrawEngine {
    reversal_probability: f64,
}

impl Default for DrawEngine {
    fn default() -> Self {
        Self {
            reversal_probability: DEFAULT_REVERSAL_PROBABILITY,
        }
    }
}

impl DrawEngine {
    pub fn new(reversal_probability: f64) -> Result<Self> {
        validate_range(
            "draw.reversal_probability",
            reversal_probability,
            0.0,
            1.0,
        )?;
        Ok(Self {
            reversal_probability,
        })
    }

    pub fn reversal_probability(&self) -> f64 {
        self.reversal_probability
    }

    pub fn draw<R: Rng + ?Sized>(
        &self,
        pool: &CardPool,
        formation: &Formation,
        rng: &mut R,
    ) -> Result<DrawResult> {
        if pool.is_empty() {
            return Err(TarotError::EmptyPool {
                scope: pool.scope().to_string(),
            });
        }
        if pool.len() < formation.card_count {
            return Err(TarotError::InsufficientPool {
                formation: formation.name.clone(),
                required: formation.card_count,
                available: pool.len(),
            });
        }

        // index::sample 回傳的順序本身就是隨機的
        let picks = index::sample(rng, pool.len(), formation.card_count);

        let cards = picks
            .into_iter()
            .enumerate()
            .map(|(position, pick)| {
                let reversed =
                    formation.allows_reversal && rng.gen_bool(self.reversal_probability);
                DrawnCard {
                    card_id: pool.ids()[pick].clone(),
                    orientation: Orientation::from_reversed(reversed),
                    position: formation.position_label(position),
                }
            })
            .collect();

        Ok(DrawResult {
            formation: formation.name.clone(),
            cards,
        })
    }
}
