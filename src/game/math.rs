//! 伤害与格挡的纯函数计算。
//!
//! 每个乘法步骤之后都向下取整，结果最终截断为非负数。

use serde::{Deserialize, Serialize};

use super::state::{Combatant, Fighter, Status};

pub const DEFAULT_VULNERABLE_PERCENT: i32 = 150;
const WEAK_PERCENT: i32 = 75;
const FRAIL_PERCENT: i32 = 75;

fn scale(value: i32, percent: i32) -> i32 {
    (value * percent).div_euclid(100)
}

/// 计算一次攻击的出手伤害：力量、姿态、虚弱、易伤，顺序固定。
pub fn compute_damage<A, D>(base: i32, attacker: &A, defender: &D) -> i32
where
    A: Fighter + ?Sized,
    D: Fighter + ?Sized,
{
    compute_damage_with(base, attacker, defender, DEFAULT_VULNERABLE_PERCENT)
}

/// 与 [`compute_damage`] 相同，但易伤倍率可由遗物覆盖。
pub fn compute_damage_with<A, D>(base: i32, attacker: &A, defender: &D, vulnerable_percent: i32) -> i32
where
    A: Fighter + ?Sized,
    D: Fighter + ?Sized,
{
    let attacker_statuses = &attacker.body().statuses;
    let mut damage = base + attacker_statuses.get(Status::Strength);
    damage *= attacker.stance().outgoing_multiplier();
    if attacker_statuses.has(Status::Weak) {
        damage = scale(damage, WEAK_PERCENT);
    }
    if defender.body().statuses.has(Status::Vulnerable) {
        damage = scale(damage, vulnerable_percent);
    }
    damage.max(0)
}

/// 敏捷（加法）后再结算脆弱。
pub fn compute_block<A: Fighter + ?Sized>(base: i32, actor: &A) -> i32 {
    let statuses = &actor.body().statuses;
    let mut block = base + statuses.get(Status::Dexterity);
    if statuses.has(Status::Frail) {
        block = scale(block, FRAIL_PERCENT);
    }
    block.max(0)
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DamageOutcome {
    pub blocked: i32,
    pub hp_lost: i32,
}

impl DamageOutcome {
    pub fn total(&self) -> i32 {
        self.blocked + self.hp_lost
    }
}

/// 先扣格挡，剩余部分扣生命，生命最低为 0。
pub fn apply_damage(target: &mut Combatant, amount: i32) -> DamageOutcome {
    apply_damage_reduced(target, amount, 0)
}

/// `hp_loss_reduction` 只作用于穿透格挡后的生命损失。
pub fn apply_damage_reduced(target: &mut Combatant, amount: i32, hp_loss_reduction: i32) -> DamageOutcome {
    if amount <= 0 {
        return DamageOutcome::default();
    }
    let blocked = amount.min(target.block);
    target.block -= blocked;
    let through = (amount - blocked - hp_loss_reduction.max(0)).max(0);
    let hp_lost = through.min(target.hp.max(0));
    target.hp = (target.hp - through).max(0);
    DamageOutcome { blocked, hp_lost }
}

/// 受击方被动带来的减伤。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IncomingModifiers {
    /// 2..=5 的伤害降为 1。
    pub low_damage_floor: bool,
    /// 每次生命损失减少的数值。
    pub hp_loss_reduction: i32,
    pub vulnerable_percent: i32,
}

impl IncomingModifiers {
    pub fn new() -> Self {
        Self {
            low_damage_floor: false,
            hp_loss_reduction: 0,
            vulnerable_percent: DEFAULT_VULNERABLE_PERCENT,
        }
    }
}

/// 攻击命中时的完整伤害：出手伤害，再依次结算受击方姿态、飞行、无实体、低伤害下限。
pub fn compute_incoming_damage<A, D>(
    base: i32,
    attacker: &A,
    defender: &D,
    modifiers: &IncomingModifiers,
) -> i32
where
    A: Fighter + ?Sized,
    D: Fighter + ?Sized,
{
    let vulnerable_percent = if modifiers.vulnerable_percent > 0 {
        modifiers.vulnerable_percent
    } else {
        DEFAULT_VULNERABLE_PERCENT
    };
    let outgoing = compute_damage_with(base, attacker, defender, vulnerable_percent);
    finish_incoming(outgoing, defender, modifiers)
}

/// 已算好的伤害值进入受击方的减伤流程。
pub fn finish_incoming<D: Fighter + ?Sized>(damage: i32, defender: &D, modifiers: &IncomingModifiers) -> i32 {
    let statuses = &defender.body().statuses;
    let mut damage = damage * defender.stance().incoming_multiplier();
    if statuses.has(Status::Flight) {
        damage = damage.div_euclid(2);
    }
    if damage > 0 && statuses.has(Status::Intangible) {
        damage = 1;
    }
    if modifiers.low_damage_floor && (2..=5).contains(&damage) {
        damage = 1;
    }
    damage.max(0)
}
