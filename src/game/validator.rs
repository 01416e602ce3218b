//! 战斗状态结构校验。
//!
//! 只在边界使用（动作提交后、外部载入时），不参与结算流程。
//! 宽松模式下只修正玩家数值字段，牌堆与敌人列表保持原样。

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::potions::MAX_POTION_SLOTS;
use super::state::{BattleOutcome, BattlePhase, BattleState, EnemyId, InstanceId, PileKind};
use crate::config::ValidationMode;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Warning,
    Error,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Error)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum InvariantViolation {
    #[error("player {field} is negative ({value})")]
    NegativePlayerValue { field: String, value: i32 },
    #[error("player hp {hp} exceeds max hp {max_hp}")]
    HpAboveMax { hp: i32, max_hp: i32 },
    #[error("enemy {enemy} has hp {hp}/{max_hp}")]
    EnemyHpOutOfBounds { enemy: EnemyId, hp: i32, max_hp: i32 },
    #[error("enemy {enemy} has negative block {block}")]
    EnemyNegativeBlock { enemy: EnemyId, block: i32 },
    #[error("enemy id {enemy} appears more than once")]
    DuplicateEnemy { enemy: EnemyId },
    #[error("defeated enemy {enemy} is still listed")]
    DeadEnemyListed { enemy: EnemyId },
    #[error("card instance {instance_id} appears {count} times across piles")]
    DuplicateCard { instance_id: InstanceId, count: usize },
    #[error("card instance {instance_id} is not below the id counter {next}")]
    StaleInstanceCounter { instance_id: InstanceId, next: InstanceId },
    #[error("targeting card {card} is not in hand")]
    TargetingCardMissing { card: InstanceId },
    #[error("selection lists card {card} missing from the {pile:?} pile")]
    SelectionCardMissing { card: InstanceId, pile: PileKind },
    #[error("selection has no eligible cards")]
    EmptySelection,
    #[error("phase says {outcome:?} but the battle state disagrees")]
    OutcomeMismatch { outcome: BattleOutcome },
    #[error("player carries {count} potion slots, more than {max}")]
    TooManyPotionSlots { count: usize, max: usize },
    #[error("relic {id} is listed more than once")]
    DuplicateRelic { id: String },
    #[error("state could not be decoded: {message}")]
    InvalidEncoding { message: String },
}

impl InvariantViolation {
    pub fn severity(&self) -> Severity {
        match self {
            InvariantViolation::HpAboveMax { .. }
            | InvariantViolation::DuplicateRelic { .. }
            | InvariantViolation::DeadEnemyListed { .. } => Severity::Warning,
            _ => Severity::Error,
        }
    }

    /// 宽松模式可以直接修正的问题。
    pub fn is_correctable(&self) -> bool {
        matches!(
            self,
            InvariantViolation::NegativePlayerValue { .. } | InvariantViolation::HpAboveMax { .. }
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Error)]
#[serde(tag = "type")]
pub enum ValidationError {
    #[error("{} invariant violation(s): {}", .violations.len(), summary(.violations))]
    Violations { violations: Vec<InvariantViolation> },
}

fn summary(violations: &[InvariantViolation]) -> String {
    violations
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

fn check_player(state: &BattleState, out: &mut Vec<InvariantViolation>) {
    let player = &state.player;
    let fields = [
        ("hp", player.body.hp),
        ("max_hp", player.body.max_hp),
        ("block", player.body.block),
        ("energy", player.energy),
        ("max_energy", player.max_energy),
        ("gold", player.gold),
        ("mantra", player.mantra),
    ];
    for (field, value) in fields {
        if value < 0 {
            out.push(InvariantViolation::NegativePlayerValue {
                field: field.to_string(),
                value,
            });
        }
    }
    if player.body.hp > player.body.max_hp {
        out.push(InvariantViolation::HpAboveMax {
            hp: player.body.hp,
            max_hp: player.body.max_hp,
        });
    }
    if player.potions.len() > MAX_POTION_SLOTS {
        out.push(InvariantViolation::TooManyPotionSlots {
            count: player.potions.len(),
            max: MAX_POTION_SLOTS,
        });
    }
}

fn check_enemies(state: &BattleState, out: &mut Vec<InvariantViolation>) {
    let mut seen = BTreeSet::new();
    for enemy in &state.enemies {
        let body = &enemy.body;
        if body.hp < 0 || body.max_hp <= 0 || body.hp > body.max_hp {
            out.push(InvariantViolation::EnemyHpOutOfBounds {
                enemy: enemy.instance_id,
                hp: body.hp,
                max_hp: body.max_hp,
            });
        }
        if body.block < 0 {
            out.push(InvariantViolation::EnemyNegativeBlock {
                enemy: enemy.instance_id,
                block: body.block,
            });
        }
        if !seen.insert(enemy.instance_id) {
            out.push(InvariantViolation::DuplicateEnemy {
                enemy: enemy.instance_id,
            });
        }
        if !enemy.is_alive() && !state.is_finished() {
            out.push(InvariantViolation::DeadEnemyListed {
                enemy: enemy.instance_id,
            });
        }
    }
}

fn check_piles(state: &BattleState, out: &mut Vec<InvariantViolation>) {
    let mut counts: BTreeMap<InstanceId, usize> = BTreeMap::new();
    for id in state.piles.instance_ids() {
        *counts.entry(id).or_default() += 1;
    }
    for (&instance_id, &count) in &counts {
        if count > 1 {
            out.push(InvariantViolation::DuplicateCard { instance_id, count });
        }
    }
    if let Some((&highest, _)) = counts.last_key_value() {
        if highest >= state.next_instance_id {
            out.push(InvariantViolation::StaleInstanceCounter {
                instance_id: highest,
                next: state.next_instance_id,
            });
        }
    }
}

fn check_phase(state: &BattleState, out: &mut Vec<InvariantViolation>) {
    match &state.phase {
        BattlePhase::Targeting { card } => {
            if state.piles.find(PileKind::Hand, *card).is_none() {
                out.push(InvariantViolation::TargetingCardMissing { card: *card });
            }
        }
        BattlePhase::CardSelection { selection } => {
            if selection.eligible.is_empty() {
                out.push(InvariantViolation::EmptySelection);
            }
            for card in &selection.eligible {
                if state.piles.find(selection.source, *card).is_none() {
                    out.push(InvariantViolation::SelectionCardMissing {
                        card: *card,
                        pile: selection.source,
                    });
                }
            }
        }
        BattlePhase::Resolved { outcome } => {
            let consistent = match outcome {
                BattleOutcome::Victory => state.living_enemies().next().is_none(),
                BattleOutcome::Defeat => !state.player.body.is_alive(),
            };
            if !consistent {
                out.push(InvariantViolation::OutcomeMismatch { outcome: *outcome });
            }
        }
        BattlePhase::PlayerTurn | BattlePhase::EnemyTurn => {}
    }
}

fn check_relics(state: &BattleState, out: &mut Vec<InvariantViolation>) {
    let mut seen = BTreeSet::new();
    for relic in &state.relics {
        if !seen.insert(relic.id.as_str()) {
            out.push(InvariantViolation::DuplicateRelic { id: relic.id.clone() });
        }
    }
}

/// 返回全部违规项，按检查顺序排列。
pub fn validate(state: &BattleState) -> Vec<InvariantViolation> {
    let mut violations = Vec::new();
    check_player(state, &mut violations);
    check_enemies(state, &mut violations);
    check_piles(state, &mut violations);
    check_phase(state, &mut violations);
    check_relics(state, &mut violations);
    violations
}

/// 安全修正：把玩家数值夹到合法范围。
pub fn correct(state: &mut BattleState) {
    let player = &mut state.player;
    player.body.max_hp = player.body.max_hp.max(1);
    player.body.hp = player.body.hp.clamp(0, player.body.max_hp);
    player.body.block = player.body.block.max(0);
    player.energy = player.energy.max(0);
    player.max_energy = player.max_energy.max(0);
    player.gold = player.gold.max(0);
    player.mantra = player.mantra.max(0);
}

/// 严格模式：存在错误级违规即失败。宽松模式：记录并做安全修正，始终通过。
///
/// 成功时返回剩余的违规项（警告，或宽松模式下未能修正的问题）。
pub fn enforce(state: &mut BattleState, mode: ValidationMode) -> Result<Vec<InvariantViolation>, ValidationError> {
    let violations = validate(state);
    if violations.is_empty() {
        return Ok(violations);
    }

    match mode {
        ValidationMode::Strict => {
            if violations
                .iter()
                .any(|violation| violation.severity() == Severity::Error)
            {
                return Err(ValidationError::Violations { violations });
            }
            Ok(violations)
        }
        ValidationMode::Lenient => {
            for violation in &violations {
                tracing::warn!(%violation, severity = ?violation.severity(), "invariant violation");
            }
            if violations.iter().any(InvariantViolation::is_correctable) {
                correct(state);
                tracing::warn!("applied safe corrections to player values");
            }
            Ok(violations
                .into_iter()
                .filter(|violation| !violation.is_correctable())
                .collect())
        }
    }
}

/// 从外部 JSON 载入状态并校验。
pub fn load_checked(json: &str, mode: ValidationMode) -> Result<BattleState, ValidationError> {
    let mut state: BattleState = serde_json::from_str(json).map_err(|err| ValidationError::Violations {
        violations: vec![InvariantViolation::InvalidEncoding {
            message: err.to_string(),
        }],
    })?;
    enforce(&mut state, mode)?;
    Ok(state)
}
