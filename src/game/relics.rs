//! 遗物触发注册表。
//!
//! `trigger` 不修改输入：返回累加后的效果包与更新后的遗物运行时状态。

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::math::DEFAULT_VULNERABLE_PERCENT;
use super::orbs::OrbKind;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub enum RelicEvent {
    CombatStart,
    CombatEnd,
    TurnStart,
    TurnEnd,
    AttackPlayed,
    SkillPlayed,
    StrikePlayed,
    FirstTurn,
    FirstHpLoss,
    DamageTaken,
    CardExhausted,
    Passive,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum RelicEffect {
    Heal { amount: i32 },
    HealIfLowHp { amount: i32, threshold_percent: i32 },
    Block { amount: i32 },
    BlockIfNone { amount: i32 },
    Strength { amount: i32 },
    Dexterity { amount: i32 },
    Energy { amount: i32 },
    Draw { amount: u32 },
    /// 对当前目标追加伤害。
    Damage { amount: i32 },
    DamageAll { amount: i32 },
    VulnerableAll { amount: i32 },
    WeakAll { amount: i32 },
    Intangible { amount: i32 },
    DoubleDamage,
    Thorns { amount: i32 },
    BlockNextTurn { amount: i32 },
    ChannelOrb { orb: OrbKind },
    AddCardToHand { card_id: String },
    AddRandomCard,
    StrengthPerCurse { amount: i32 },
    PreventDeath { heal_percent: i32 },
    ExtraEnergy { amount: i32 },
    ExtraDraw { amount: u32 },
    VulnerableMultiplier { percent: i32 },
    HideIntents,
    CardLimit { limit: u32 },
    ConserveEnergy,
    RetainBlock { loss: Option<i32> },
    ReduceLowDamage,
    ReduceHpLoss { amount: i32 },
}

/// 遗物模板，来自外部内容表。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RelicTemplate {
    pub id: String,
    pub name: String,
    pub trigger: RelicEvent,
    pub effect: RelicEffect,
    /// 计数型遗物：每触发 N 次生效一次。
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub threshold: Option<u32>,
    #[serde(default)]
    pub once_per_combat: bool,
    /// 只在指定回合生效。
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub turn: Option<u32>,
}

impl RelicTemplate {
    pub fn new(id: impl Into<String>, name: impl Into<String>, trigger: RelicEvent, effect: RelicEffect) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            trigger,
            effect,
            threshold: None,
            once_per_combat: false,
            turn: None,
        }
    }

    pub fn every(mut self, threshold: u32) -> Self {
        self.threshold = Some(threshold);
        self
    }

    pub fn once_per_combat(mut self) -> Self {
        self.once_per_combat = true;
        self
    }

    pub fn on_turn(mut self, turn: u32) -> Self {
        self.turn = Some(turn);
        self
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct RelicState {
    pub counter: u32,
    pub used_this_combat: bool,
    /// 整局只能生效一次的遗物（例如免死）。
    pub used: bool,
}

/// 遗物 id 到运行时状态的映射。
pub type RelicStates = BTreeMap<String, RelicState>;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelicContext {
    pub turn: u32,
    pub hp: i32,
    pub max_hp: i32,
    pub block: i32,
    pub curses_in_deck: i32,
}

impl RelicContext {
    fn hp_percent(&self) -> i32 {
        if self.max_hp <= 0 {
            return 0;
        }
        self.hp * 100 / self.max_hp
    }
}

/// 一次触发累加出的效果，全部默认为 0/false。
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelicEffects {
    pub heal: i32,
    pub block: i32,
    pub strength: i32,
    pub dexterity: i32,
    pub energy: i32,
    pub draw: u32,
    pub damage: i32,
    pub damage_all: i32,
    pub vulnerable_all: i32,
    pub weak_all: i32,
    pub intangible: i32,
    pub double_damage: bool,
    pub thorns: i32,
    pub block_next_turn: i32,
    pub channel: Vec<OrbKind>,
    pub add_cards: Vec<String>,
    pub random_cards: u32,
}

impl RelicEffects {
    pub fn is_empty(&self) -> bool {
        *self == RelicEffects::default()
    }

    fn accumulate(&mut self, effect: &RelicEffect, ctx: &RelicContext) {
        match effect {
            RelicEffect::Heal { amount } => self.heal += amount,
            RelicEffect::HealIfLowHp {
                amount,
                threshold_percent,
            } => {
                if ctx.hp_percent() <= *threshold_percent {
                    self.heal += amount;
                }
            }
            RelicEffect::Block { amount } => self.block += amount,
            RelicEffect::BlockIfNone { amount } => {
                if ctx.block == 0 {
                    self.block += amount;
                }
            }
            RelicEffect::Strength { amount } => self.strength += amount,
            RelicEffect::Dexterity { amount } => self.dexterity += amount,
            RelicEffect::Energy { amount } => self.energy += amount,
            RelicEffect::Draw { amount } => self.draw += amount,
            RelicEffect::Damage { amount } => self.damage += amount,
            RelicEffect::DamageAll { amount } => self.damage_all += amount,
            RelicEffect::VulnerableAll { amount } => self.vulnerable_all += amount,
            RelicEffect::WeakAll { amount } => self.weak_all += amount,
            RelicEffect::Intangible { amount } => self.intangible += amount,
            RelicEffect::DoubleDamage => self.double_damage = true,
            RelicEffect::Thorns { amount } => self.thorns += amount,
            RelicEffect::BlockNextTurn { amount } => self.block_next_turn += amount,
            RelicEffect::ChannelOrb { orb } => self.channel.push(*orb),
            RelicEffect::AddCardToHand { card_id } => self.add_cards.push(card_id.clone()),
            RelicEffect::AddRandomCard => self.random_cards += 1,
            RelicEffect::StrengthPerCurse { amount } => self.strength += amount * ctx.curses_in_deck,
            // 被动与免死不经由事件触发。
            RelicEffect::PreventDeath { .. }
            | RelicEffect::ExtraEnergy { .. }
            | RelicEffect::ExtraDraw { .. }
            | RelicEffect::VulnerableMultiplier { .. }
            | RelicEffect::HideIntents
            | RelicEffect::CardLimit { .. }
            | RelicEffect::ConserveEnergy
            | RelicEffect::RetainBlock { .. }
            | RelicEffect::ReduceLowDamage
            | RelicEffect::ReduceHpLoss { .. } => {}
        }
    }
}

pub fn trigger(
    relics: &[RelicTemplate],
    states: &RelicStates,
    event: RelicEvent,
    ctx: &RelicContext,
) -> (RelicEffects, RelicStates) {
    let mut effects = RelicEffects::default();
    let mut updated = states.clone();

    for relic in relics.iter().filter(|relic| relic.trigger == event) {
        let mut state = states.get(&relic.id).cloned().unwrap_or_default();

        if let Some(threshold) = relic.threshold {
            state.counter += 1;
            if state.counter < threshold {
                updated.insert(relic.id.clone(), state);
                continue;
            }
            state.counter = 0;
        }

        if state.used_this_combat {
            updated.insert(relic.id.clone(), state);
            continue;
        }
        if relic.turn.is_some_and(|turn| turn != ctx.turn) {
            updated.insert(relic.id.clone(), state);
            continue;
        }
        if relic.once_per_combat || event == RelicEvent::FirstHpLoss {
            state.used_this_combat = true;
        }

        tracing::debug!(relic = %relic.id, ?event, "relic fired");
        effects.accumulate(&relic.effect, ctx);
        updated.insert(relic.id.clone(), state);
    }

    (effects, updated)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum BlockRetention {
    #[default]
    None,
    All,
    Partial { loss: i32 },
}

/// 常驻被动汇总。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PassiveEffects {
    pub extra_energy: i32,
    pub extra_draw: u32,
    pub vulnerable_percent: i32,
    pub hide_intents: bool,
    pub card_limit: Option<u32>,
    pub conserve_energy: bool,
    pub block_retention: BlockRetention,
    pub low_damage_floor: bool,
    pub hp_loss_reduction: i32,
}

impl Default for PassiveEffects {
    fn default() -> Self {
        Self {
            extra_energy: 0,
            extra_draw: 0,
            vulnerable_percent: DEFAULT_VULNERABLE_PERCENT,
            hide_intents: false,
            card_limit: None,
            conserve_energy: false,
            block_retention: BlockRetention::None,
            low_damage_floor: false,
            hp_loss_reduction: 0,
        }
    }
}

pub fn passive_effects(relics: &[RelicTemplate]) -> PassiveEffects {
    let mut passives = PassiveEffects::default();
    for relic in relics {
        match &relic.effect {
            RelicEffect::ExtraEnergy { amount } => passives.extra_energy += amount,
            RelicEffect::ExtraDraw { amount } => passives.extra_draw += amount,
            RelicEffect::VulnerableMultiplier { percent } => {
                passives.vulnerable_percent = passives.vulnerable_percent.max(*percent)
            }
            RelicEffect::HideIntents => passives.hide_intents = true,
            RelicEffect::CardLimit { limit } => {
                passives.card_limit = Some(passives.card_limit.map_or(*limit, |current| current.min(*limit)))
            }
            RelicEffect::ConserveEnergy => passives.conserve_energy = true,
            RelicEffect::RetainBlock { loss } => {
                passives.block_retention = match (passives.block_retention, loss) {
                    (BlockRetention::All, _) | (_, None) => BlockRetention::All,
                    (_, Some(loss)) => BlockRetention::Partial { loss: *loss },
                }
            }
            RelicEffect::ReduceLowDamage => passives.low_damage_floor = true,
            RelicEffect::ReduceHpLoss { amount } => passives.hp_loss_reduction += amount,
            _ => {}
        }
    }
    passives
}

/// 新一场战斗：清除本场已用标记，保留计数与整局标记。
pub fn reset_for_combat(relics: &[RelicTemplate], states: &RelicStates) -> RelicStates {
    relics
        .iter()
        .map(|relic| {
            let mut state = states.get(&relic.id).cloned().unwrap_or_default();
            state.used_this_combat = false;
            (relic.id.clone(), state)
        })
        .collect()
}

/// 找到第一个尚未使用的免死遗物，返回回复百分比与更新后的状态。
pub fn try_prevent_death(relics: &[RelicTemplate], states: &RelicStates) -> Option<(String, i32, RelicStates)> {
    relics.iter().find_map(|relic| {
        let RelicEffect::PreventDeath { heal_percent } = relic.effect else {
            return None;
        };
        let mut state = states.get(&relic.id).cloned().unwrap_or_default();
        if state.used {
            return None;
        }
        state.used = true;
        let mut updated = states.clone();
        updated.insert(relic.id.clone(), state);
        Some((relic.name.clone(), heal_percent, updated))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx(turn: u32) -> RelicContext {
        RelicContext {
            turn,
            hp: 40,
            max_hp: 80,
            block: 0,
            curses_in_deck: 0,
        }
    }

    fn nunchaku() -> RelicTemplate {
        RelicTemplate::new("nunchaku", "Nunchaku", RelicEvent::AttackPlayed, RelicEffect::Energy { amount: 1 })
            .every(3)
    }

    #[test]
    fn unmatched_event_is_a_no_op() {
        let relics = vec![nunchaku()];
        let states = RelicStates::new();
        let (effects, updated) = trigger(&relics, &states, RelicEvent::TurnEnd, &ctx(1));
        assert!(effects.is_empty());
        assert_eq!(updated, states);
    }

    #[test]
    fn counter_relic_fires_on_threshold_and_resets() {
        let relics = vec![nunchaku()];
        let mut states = RelicStates::new();
        for _ in 0..2 {
            let (effects, updated) = trigger(&relics, &states, RelicEvent::AttackPlayed, &ctx(1));
            assert!(effects.is_empty());
            states = updated;
        }
        assert_eq!(states["nunchaku"].counter, 2);

        let (effects, updated) = trigger(&relics, &states, RelicEvent::AttackPlayed, &ctx(1));
        assert_eq!(effects.energy, 1);
        assert_eq!(updated["nunchaku"].counter, 0);
    }

    #[test]
    fn blocked_counter_relic_still_resets_its_counter() {
        let spent = vec![nunchaku().once_per_combat()];
        let mut states = RelicStates::new();
        states.insert(
            "nunchaku".into(),
            RelicState {
                counter: 2,
                used_this_combat: true,
                used: false,
            },
        );
        let (effects, updated) = trigger(&spent, &states, RelicEvent::AttackPlayed, &ctx(1));
        assert!(effects.is_empty());
        assert_eq!(updated["nunchaku"].counter, 0);

        let late = vec![nunchaku().on_turn(1)];
        states.insert("nunchaku".into(), RelicState { counter: 2, ..RelicState::default() });
        let (effects, updated) = trigger(&late, &states, RelicEvent::AttackPlayed, &ctx(3));
        assert!(effects.is_empty());
        assert_eq!(updated["nunchaku"].counter, 0);
        assert!(!updated["nunchaku"].used_this_combat);
    }

    #[test]
    fn first_hp_loss_fires_once_per_combat() {
        let relics = vec![RelicTemplate::new(
            "centennial_puzzle",
            "Centennial Puzzle",
            RelicEvent::FirstHpLoss,
            RelicEffect::Draw { amount: 3 },
        )];
        let (first, states) = trigger(&relics, &RelicStates::new(), RelicEvent::FirstHpLoss, &ctx(1));
        assert_eq!(first.draw, 3);
        let (second, _) = trigger(&relics, &states, RelicEvent::FirstHpLoss, &ctx(2));
        assert!(second.is_empty(), "puzzle must not fire twice in one combat");

        let reset = reset_for_combat(&relics, &states);
        let (third, _) = trigger(&relics, &reset, RelicEvent::FirstHpLoss, &ctx(1));
        assert_eq!(third.draw, 3);
    }

    #[test]
    fn turn_specific_relic_waits_for_its_turn() {
        let relics = vec![RelicTemplate::new(
            "horn_cleat",
            "Horn Cleat",
            RelicEvent::TurnStart,
            RelicEffect::Block { amount: 14 },
        )
        .on_turn(2)];
        let (turn_one, _) = trigger(&relics, &RelicStates::new(), RelicEvent::TurnStart, &ctx(1));
        let (turn_two, _) = trigger(&relics, &RelicStates::new(), RelicEvent::TurnStart, &ctx(2));
        assert_eq!(turn_one.block, 0);
        assert_eq!(turn_two.block, 14);
    }

    #[test]
    fn effects_accumulate_across_relics() {
        let relics = vec![
            RelicTemplate::new("anchor", "Anchor", RelicEvent::CombatStart, RelicEffect::Block { amount: 10 }),
            RelicTemplate::new("vajra", "Vajra", RelicEvent::CombatStart, RelicEffect::Strength { amount: 1 }),
            RelicTemplate::new("bag", "Bag of Preparation", RelicEvent::CombatStart, RelicEffect::Draw { amount: 2 }),
            RelicTemplate::new(
                "blood_vial",
                "Blood Vial",
                RelicEvent::CombatStart,
                RelicEffect::HealIfLowHp {
                    amount: 2,
                    threshold_percent: 25,
                },
            ),
        ];
        let (effects, _) = trigger(&relics, &RelicStates::new(), RelicEvent::CombatStart, &ctx(1));
        assert_eq!((effects.block, effects.strength, effects.draw), (10, 1, 2));
        assert_eq!(effects.heal, 0, "player is above the heal threshold");
    }

    #[test]
    fn prevent_death_is_single_use() {
        let relics = vec![RelicTemplate::new(
            "lizard_tail",
            "Lizard Tail",
            RelicEvent::Passive,
            RelicEffect::PreventDeath { heal_percent: 50 },
        )];
        let (name, percent, states) =
            try_prevent_death(&relics, &RelicStates::new()).expect("tail should be available");
        assert_eq!((name.as_str(), percent), ("Lizard Tail", 50));
        assert!(try_prevent_death(&relics, &states).is_none());
        assert!(reset_for_combat(&relics, &states)["lizard_tail"].used);
    }

    #[test]
    fn passives_merge() {
        let relics = vec![
            RelicTemplate::new("paper_phrog", "Paper Phrog", RelicEvent::Passive, RelicEffect::VulnerableMultiplier { percent: 175 }),
            RelicTemplate::new("calipers", "Calipers", RelicEvent::Passive, RelicEffect::RetainBlock { loss: Some(15) }),
            RelicTemplate::new("torii", "Torii", RelicEvent::Passive, RelicEffect::ReduceLowDamage),
        ];
        let passives = passive_effects(&relics);
        assert_eq!(passives.vulnerable_percent, 175);
        assert_eq!(passives.block_retention, BlockRetention::Partial { loss: 15 });
        assert!(passives.low_damage_floor);
        assert_eq!(passives.extra_energy, 0);
    }
}
