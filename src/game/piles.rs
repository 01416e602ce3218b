//! 抽牌堆、手牌、弃牌堆、消耗堆之间的移动。
//!
//! 每个实例 id 在四个牌堆中恰好出现一次，所有移动都是“取出再放入”。

use serde::{Deserialize, Serialize};

use super::rng::{shuffle, BattleRng};
use super::state::{CardInstance, InstanceId, PileKind};

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Piles {
    #[serde(default)]
    pub draw: Vec<CardInstance>,
    #[serde(default)]
    pub hand: Vec<CardInstance>,
    #[serde(default)]
    pub discard: Vec<CardInstance>,
    #[serde(default)]
    pub exhaust: Vec<CardInstance>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DrawReport {
    pub drawn: Vec<InstanceId>,
    /// 手牌已满时直接进入弃牌堆的牌。
    pub overflow: Vec<InstanceId>,
    pub reshuffled: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EndOfTurnReport {
    pub retained: Vec<InstanceId>,
    pub discarded: Vec<InstanceId>,
    /// 虚无牌，已经移入消耗堆，调用方负责触发消耗效果。
    pub exhausted: Vec<InstanceId>,
}

impl Piles {
    pub fn with_draw_pile(cards: Vec<CardInstance>) -> Self {
        Self {
            draw: cards,
            ..Self::default()
        }
    }

    pub fn pile(&self, kind: PileKind) -> &Vec<CardInstance> {
        match kind {
            PileKind::Draw => &self.draw,
            PileKind::Hand => &self.hand,
            PileKind::Discard => &self.discard,
            PileKind::Exhaust => &self.exhaust,
        }
    }

    pub fn pile_mut(&mut self, kind: PileKind) -> &mut Vec<CardInstance> {
        match kind {
            PileKind::Draw => &mut self.draw,
            PileKind::Hand => &mut self.hand,
            PileKind::Discard => &mut self.discard,
            PileKind::Exhaust => &mut self.exhaust,
        }
    }

    pub fn total(&self) -> usize {
        self.draw.len() + self.hand.len() + self.discard.len() + self.exhaust.len()
    }

    pub fn instance_ids(&self) -> Vec<InstanceId> {
        self.draw
            .iter()
            .chain(self.hand.iter())
            .chain(self.discard.iter())
            .chain(self.exhaust.iter())
            .map(|card| card.instance_id)
            .collect()
    }

    pub fn locate(&self, instance_id: InstanceId) -> Option<PileKind> {
        [PileKind::Hand, PileKind::Draw, PileKind::Discard, PileKind::Exhaust]
            .into_iter()
            .find(|kind| {
                self.pile(*kind)
                    .iter()
                    .any(|card| card.instance_id == instance_id)
            })
    }

    pub fn find(&self, kind: PileKind, instance_id: InstanceId) -> Option<&CardInstance> {
        self.pile(kind)
            .iter()
            .find(|card| card.instance_id == instance_id)
    }

    pub fn find_mut(&mut self, kind: PileKind, instance_id: InstanceId) -> Option<&mut CardInstance> {
        self.pile_mut(kind)
            .iter_mut()
            .find(|card| card.instance_id == instance_id)
    }

    pub fn take(&mut self, kind: PileKind, instance_id: InstanceId) -> Option<CardInstance> {
        let pile = self.pile_mut(kind);
        let index = pile.iter().position(|card| card.instance_id == instance_id)?;
        Some(pile.remove(index))
    }

    /// 移到目标牌堆末尾；抽牌堆则放到顶端。
    pub fn move_card(&mut self, instance_id: InstanceId, from: PileKind, to: PileKind) -> bool {
        match self.take(from, instance_id) {
            Some(card) => {
                self.put(to, card);
                true
            }
            None => false,
        }
    }

    pub fn put(&mut self, kind: PileKind, card: CardInstance) {
        match kind {
            PileKind::Draw => self.draw.insert(0, card),
            other => self.pile_mut(other).push(card),
        }
    }

    /// 弃牌堆洗入抽牌堆。
    pub fn reshuffle(&mut self, rng: &mut dyn BattleRng) {
        let mut cards = std::mem::take(&mut self.discard);
        shuffle(rng, &mut cards);
        self.draw.extend(cards);
    }

    /// 从抽牌堆顶端抽最多 `count` 张；抽空时洗入弃牌堆，两者都空时少抽，不报错。
    pub fn draw(&mut self, count: u32, max_hand_size: usize, rng: &mut dyn BattleRng) -> DrawReport {
        let mut report = DrawReport::default();
        for _ in 0..count {
            if self.draw.is_empty() {
                if self.discard.is_empty() {
                    break;
                }
                self.reshuffle(rng);
                report.reshuffled = true;
            }
            if self.draw.is_empty() {
                break;
            }
            let card = self.draw.remove(0);
            if self.hand.len() >= max_hand_size {
                report.overflow.push(card.instance_id);
                self.discard.push(card);
            } else {
                report.drawn.push(card.instance_id);
                self.hand.push(card);
            }
        }
        report
    }

    /// 回合结束：保留牌留在手中，虚无牌消耗，其余进入弃牌堆。
    pub fn end_of_turn_discard(&mut self) -> EndOfTurnReport {
        let mut report = EndOfTurnReport::default();
        let hand = std::mem::take(&mut self.hand);
        for card in hand {
            if card.card.retain {
                report.retained.push(card.instance_id);
                self.hand.push(card);
            } else if card.card.ethereal {
                report.exhausted.push(card.instance_id);
                self.exhaust.push(card);
            } else {
                report.discarded.push(card.instance_id);
                self.discard.push(card);
            }
        }
        report
    }

    /// 先天牌移到抽牌堆顶端，保持相对顺序。
    pub fn hoist_innate(&mut self) {
        let (innate, rest): (Vec<_>, Vec<_>) =
            std::mem::take(&mut self.draw).into_iter().partition(|card| card.card.innate);
        self.draw = innate;
        self.draw.extend(rest);
    }
}
