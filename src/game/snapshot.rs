//! 基于 id 的战斗存档。
//!
//! 卡牌、遗物、敌人只记录 id 与运行时数值，模板在恢复时重新查表。

use serde::{Deserialize, Serialize};

use super::content::{ContentError, ContentTables};
use super::piles::Piles;
use super::relics::{RelicState, RelicStates};
use super::state::{
    BattlePhase, BattleState, CardInstance, Combatant, CombatLog, Enemy, EnemyFlags, EnemyId, InstanceId, Player,
    Statuses, TurnCounters,
};
use crate::ai::Intent;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CardRef {
    pub id: String,
    pub instance_id: InstanceId,
    #[serde(default)]
    pub upgraded: bool,
    #[serde(default, skip_serializing_if = "is_zero")]
    pub times_upgraded: u32,
    #[serde(default, skip_serializing_if = "is_zero")]
    pub bonus_damage: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cost_override: Option<i32>,
}

fn is_zero<T: Default + PartialEq>(value: &T) -> bool {
    *value == T::default()
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RelicRef {
    pub id: String,
    #[serde(default)]
    pub counter: u32,
    #[serde(default)]
    pub used: bool,
    #[serde(default)]
    pub used_this_combat: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EnemySnapshot {
    pub instance_id: EnemyId,
    pub archetype: String,
    pub hp: i32,
    pub max_hp: i32,
    #[serde(default)]
    pub block: i32,
    #[serde(default)]
    pub statuses: Statuses,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub intent: Option<Intent>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_move: Option<String>,
    #[serde(default)]
    pub flags: EnemyFlags,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct PileSnapshot {
    pub draw: Vec<CardRef>,
    pub hand: Vec<CardRef>,
    pub discard: Vec<CardRef>,
    pub exhaust: Vec<CardRef>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BattleSnapshot {
    pub phase: BattlePhase,
    pub turn: u32,
    pub player: Player,
    pub enemies: Vec<EnemySnapshot>,
    pub piles: PileSnapshot,
    #[serde(default)]
    pub relics: Vec<RelicRef>,
    #[serde(default)]
    pub log: CombatLog,
    #[serde(default)]
    pub counters: TurnCounters,
    #[serde(default)]
    pub pending_block: i32,
    #[serde(default)]
    pub conserved_energy: i32,
    #[serde(default)]
    pub hp_lost_this_combat: bool,
    #[serde(default)]
    pub times_hp_lost: u32,
    pub next_instance_id: InstanceId,
    pub next_enemy_id: EnemyId,
}

fn card_refs(cards: &[CardInstance]) -> Vec<CardRef> {
    cards
        .iter()
        .map(|card| CardRef {
            id: card.id().to_string(),
            instance_id: card.instance_id,
            upgraded: card.upgraded,
            times_upgraded: card.times_upgraded,
            bonus_damage: card.bonus_damage,
            cost_override: card.cost_override,
        })
        .collect()
}

fn restore_cards(refs: &[CardRef], content: &dyn ContentTables) -> Result<Vec<CardInstance>, ContentError> {
    refs.iter()
        .map(|card| {
            let mut instance = CardInstance::new(card.instance_id, content.card(&card.id)?);
            instance.upgraded = card.upgraded;
            instance.times_upgraded = card.times_upgraded;
            instance.bonus_damage = card.bonus_damage;
            instance.cost_override = card.cost_override;
            Ok(instance)
        })
        .collect()
}

impl BattleSnapshot {
    pub fn capture(state: &BattleState) -> Self {
        let piles = &state.piles;
        Self {
            phase: state.phase.clone(),
            turn: state.turn,
            player: state.player.clone(),
            enemies: state
                .enemies
                .iter()
                .map(|enemy| EnemySnapshot {
                    instance_id: enemy.instance_id,
                    archetype: enemy.archetype.clone(),
                    hp: enemy.body.hp,
                    max_hp: enemy.body.max_hp,
                    block: enemy.body.block,
                    statuses: enemy.body.statuses.clone(),
                    intent: enemy.intent.clone(),
                    last_move: enemy.last_move.clone(),
                    flags: enemy.flags.clone(),
                })
                .collect(),
            piles: PileSnapshot {
                draw: card_refs(&piles.draw),
                hand: card_refs(&piles.hand),
                discard: card_refs(&piles.discard),
                exhaust: card_refs(&piles.exhaust),
            },
            relics: state
                .relics
                .iter()
                .map(|relic| {
                    let runtime = state.relic_states.get(&relic.id).cloned().unwrap_or_default();
                    RelicRef {
                        id: relic.id.clone(),
                        counter: runtime.counter,
                        used: runtime.used,
                        used_this_combat: runtime.used_this_combat,
                    }
                })
                .collect(),
            log: state.log.clone(),
            counters: state.counters.clone(),
            pending_block: state.pending_block,
            conserved_energy: state.conserved_energy,
            hp_lost_this_combat: state.hp_lost_this_combat,
            times_hp_lost: state.times_hp_lost,
            next_instance_id: state.next_instance_id,
            next_enemy_id: state.next_enemy_id,
        }
    }

    /// 通过内容表还原完整状态；任何 id 查不到都返回 `ContentError::NotFound`。
    pub fn restore(&self, content: &dyn ContentTables) -> Result<BattleState, ContentError> {
        let piles = Piles {
            draw: restore_cards(&self.piles.draw, content)?,
            hand: restore_cards(&self.piles.hand, content)?,
            discard: restore_cards(&self.piles.discard, content)?,
            exhaust: restore_cards(&self.piles.exhaust, content)?,
        };

        let mut relics = Vec::with_capacity(self.relics.len());
        let mut relic_states = RelicStates::new();
        for relic in &self.relics {
            relics.push(content.relic(&relic.id)?);
            insert_relic_state(&mut relic_states, relic);
        }

        let enemies = self
            .enemies
            .iter()
            .map(|snapshot| {
                let template = content.enemy(&snapshot.archetype)?;
                Ok(Enemy {
                    instance_id: snapshot.instance_id,
                    archetype: template.archetype.clone(),
                    name: template.name.clone(),
                    body: Combatant {
                        block: snapshot.block,
                        statuses: snapshot.statuses.clone(),
                        ..Combatant::new(snapshot.hp, snapshot.max_hp)
                    },
                    intent: snapshot.intent.clone(),
                    last_move: snapshot.last_move.clone(),
                    flags: snapshot.flags.clone(),
                    retain_block: template.retain_block,
                    on_death: template.on_death.clone(),
                })
            })
            .collect::<Result<Vec<_>, ContentError>>()?;
        for id in self.player.potions.iter().flatten() {
            content.potion(id)?;
        }

        Ok(BattleState {
            phase: self.phase.clone(),
            turn: self.turn,
            player: self.player.clone(),
            enemies,
            piles,
            relics,
            relic_states,
            log: self.log.clone(),
            counters: self.counters.clone(),
            pending_block: self.pending_block,
            conserved_energy: self.conserved_energy,
            hp_lost_this_combat: self.hp_lost_this_combat,
            times_hp_lost: self.times_hp_lost,
            next_instance_id: self.next_instance_id,
            next_enemy_id: self.next_enemy_id,
        })
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

fn insert_relic_state(states: &mut RelicStates, relic: &RelicRef) {
    states.insert(
        relic.id.clone(),
        RelicState {
            counter: relic.counter,
            used: relic.used,
            used_this_combat: relic.used_this_combat,
        },
    );
}
