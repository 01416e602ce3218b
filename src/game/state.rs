use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::orbs::Orb;
use super::piles::Piles;
use super::relics::{RelicStates, RelicTemplate};
use crate::ai::{DeathRule, Intent};

/// 卡牌实例的全局唯一标识。
pub type InstanceId = u32;
/// 敌人实例标识。
pub type EnemyId = u32;

/// 玩家姿态。
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum Stance {
    #[default]
    None,
    Calm,
    Wrath,
    Divinity,
}

impl Stance {
    pub fn outgoing_multiplier(self) -> i32 {
        match self {
            Stance::None | Stance::Calm => 1,
            Stance::Wrath => 2,
            Stance::Divinity => 3,
        }
    }

    pub fn incoming_multiplier(self) -> i32 {
        match self {
            Stance::Wrath => 2,
            _ => 1,
        }
    }
}

impl FromStr for Stance {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "none" | "" => Ok(Stance::None),
            "calm" => Ok(Stance::Calm),
            "wrath" => Ok(Stance::Wrath),
            "divinity" => Ok(Stance::Divinity),
            _ => Err(()),
        }
    }
}

impl fmt::Display for Stance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stance::None => "none",
            Stance::Calm => "Calm",
            Stance::Wrath => "Wrath",
            Stance::Divinity => "Divinity",
        };
        f.write_str(name)
    }
}

/// 具名状态计数器。能力牌（恶魔形态、腐化等）也记录在这里。
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "camelCase")]
pub enum Status {
    Strength,
    Dexterity,
    Vulnerable,
    Weak,
    Frail,
    Artifact,
    Intangible,
    Thorns,
    Metallicize,
    Regen,
    PlatedArmor,
    Ritual,
    Enrage,
    Flight,
    Entangled,
    DrawReduction,
    NoDraw,
    TempStrength,
    DoubleDamage,
    DemonForm,
    DarkEmbrace,
    FeelNoPain,
    Juggernaut,
    Rupture,
    Corruption,
    Barricade,
    Brutality,
    FlameBarrier,
    Rage,
    Combust,
    /// 燃烧叠加后每回合额外的生命流失。
    CombustHpLoss,
    Evolve,
    FireBreathing,
    Berserk,
    /// 敌人本回合被暂时削去的力量，敌方回合结束时归还。
    Shackled,
}

impl Status {
    pub fn is_debuff(self) -> bool {
        matches!(
            self,
            Status::Vulnerable
                | Status::Weak
                | Status::Frail
                | Status::Entangled
                | Status::DrawReduction
        )
    }

    /// 每回合开始时递减的持续型减益。
    pub const DURATIONS: [Status; 5] = [
        Status::Vulnerable,
        Status::Weak,
        Status::Frail,
        Status::Intangible,
        Status::DrawReduction,
    ];
}

/// 施加的减益会被人工制品抵消；负力量与负敏捷同样算减益。
pub fn is_debuff_application(status: Status, amount: i32) -> bool {
    status.is_debuff() || (matches!(status, Status::Strength | Status::Dexterity) && amount < 0)
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct Statuses(BTreeMap<Status, i32>);

impl Statuses {
    pub fn get(&self, status: Status) -> i32 {
        self.0.get(&status).copied().unwrap_or(0)
    }

    pub fn has(&self, status: Status) -> bool {
        self.get(status) > 0
    }

    pub fn set(&mut self, status: Status, value: i32) {
        if value == 0 {
            self.0.remove(&status);
        } else {
            self.0.insert(status, value);
        }
    }

    pub fn add(&mut self, status: Status, amount: i32) {
        let value = self.get(status) + amount;
        self.set(status, value);
    }

    pub fn clear(&mut self, status: Status) {
        self.0.remove(&status);
    }

    /// 正值减一，返回递减后的值。
    pub fn decrement(&mut self, status: Status) -> i32 {
        let value = self.get(status);
        if value > 0 {
            self.set(status, value - 1);
        }
        self.get(status)
    }

    pub fn iter(&self) -> impl Iterator<Item = (Status, i32)> + '_ {
        self.0.iter().map(|(status, value)| (*status, *value))
    }

    pub fn with(mut self, status: Status, value: i32) -> Self {
        self.set(status, value);
        self
    }
}

/// 玩家与敌人共享的战斗数值。
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Combatant {
    pub hp: i32,
    pub max_hp: i32,
    #[serde(default)]
    pub block: i32,
    #[serde(default)]
    pub statuses: Statuses,
}

impl Combatant {
    pub fn new(hp: i32, max_hp: i32) -> Self {
        Self {
            hp,
            max_hp,
            block: 0,
            statuses: Statuses::default(),
        }
    }

    pub fn is_alive(&self) -> bool {
        self.hp > 0
    }

    pub fn heal(&mut self, amount: i32) -> i32 {
        if amount <= 0 {
            return 0;
        }
        let before = self.hp;
        self.hp = (self.hp + amount).min(self.max_hp);
        self.hp - before
    }

    pub fn gain_block(&mut self, amount: i32) {
        if amount > 0 {
            self.block += amount;
        }
    }
}

pub trait Fighter {
    fn body(&self) -> &Combatant;
    fn body_mut(&mut self) -> &mut Combatant;

    fn stance(&self) -> Stance {
        Stance::None
    }
}

/// 玩家状态：能量、姿态、真言、充能球。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Player {
    #[serde(flatten)]
    pub body: Combatant,
    pub energy: i32,
    pub max_energy: i32,
    #[serde(default)]
    pub stance: Stance,
    #[serde(default)]
    pub mantra: i32,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub orbs: Vec<Orb>,
    #[serde(default)]
    pub orb_slots: usize,
    #[serde(default)]
    pub focus: i32,
    #[serde(default)]
    pub gold: i32,
    /// 药水槽，存药水 id。
    #[serde(default = "super::potions::empty_slots")]
    pub potions: Vec<Option<String>>,
}

impl Player {
    pub fn new(hp: i32, max_hp: i32, max_energy: i32) -> Self {
        Self {
            body: Combatant::new(hp, max_hp),
            energy: max_energy,
            max_energy,
            stance: Stance::None,
            mantra: 0,
            orbs: Vec::new(),
            orb_slots: 0,
            focus: 0,
            gold: 0,
            potions: super::potions::empty_slots(),
        }
    }
}

impl Fighter for Player {
    fn body(&self) -> &Combatant {
        &self.body
    }

    fn body_mut(&mut self) -> &mut Combatant {
        &mut self.body
    }

    fn stance(&self) -> Stance {
        self.stance
    }
}

/// 招式表可读写的敌人标记。
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct EnemyFlags {
    pub asleep: bool,
    pub has_split: bool,
    pub reborn: bool,
    pub defensive: bool,
    pub counter: i32,
    pub escalation: i32,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub used_moves: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Enemy {
    pub instance_id: EnemyId,
    pub archetype: String,
    pub name: String,
    #[serde(flatten)]
    pub body: Combatant,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub intent: Option<Intent>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_move: Option<String>,
    #[serde(default)]
    pub flags: EnemyFlags,
    #[serde(default)]
    pub retain_block: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub on_death: Option<DeathRule>,
}

impl Fighter for Enemy {
    fn body(&self) -> &Combatant {
        &self.body
    }

    fn body_mut(&mut self) -> &mut Combatant {
        &mut self.body
    }
}

impl Enemy {
    pub fn is_alive(&self) -> bool {
        self.body.is_alive()
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum CardKind {
    #[default]
    Attack,
    Skill,
    Power,
    Status,
    Curse,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub enum CardTarget {
    #[default]
    SingleEnemy,
    AllEnemies,
    RandomEnemy,
    None,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub enum EffectTarget {
    #[default]
    Enemy,
    AllEnemies,
    Player,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StatusApplication {
    pub status: Status,
    pub amount: i32,
    #[serde(default)]
    pub target: EffectTarget,
}

impl StatusApplication {
    pub fn new(status: Status, amount: i32, target: EffectTarget) -> Self {
        Self {
            status,
            amount,
            target,
        }
    }
}

/// 卡牌模板，由外部内容表提供，引擎只读。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(default)]
pub struct CardTemplate {
    pub id: String,
    pub name: String,
    pub kind: CardKind,
    pub cost: i32,
    pub x_cost: bool,
    pub unplayable: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub damage: Option<i32>,
    pub hits: u32,
    pub target: CardTarget,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub block: Option<i32>,
    pub draw: u32,
    pub energy: i32,
    pub hp_cost: i32,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub effects: Vec<StatusApplication>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub special: Option<String>,
    pub magic: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stance: Option<Stance>,
    pub mantra: i32,
    pub exhaust: bool,
    pub retain: bool,
    pub ethereal: bool,
    pub innate: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub upgrade: Option<String>,
}

impl CardTemplate {
    pub fn new(id: impl Into<String>, name: impl Into<String>, kind: CardKind, cost: i32) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            kind,
            cost,
            hits: 1,
            target: match kind {
                CardKind::Attack => CardTarget::SingleEnemy,
                _ => CardTarget::None,
            },
            ..Self::default()
        }
    }

    pub fn damage(mut self, amount: i32) -> Self {
        self.damage = Some(amount);
        self
    }

    pub fn hits(mut self, hits: u32) -> Self {
        self.hits = hits.max(1);
        self
    }

    pub fn block(mut self, amount: i32) -> Self {
        self.block = Some(amount);
        self
    }

    pub fn target(mut self, target: CardTarget) -> Self {
        self.target = target;
        self
    }

    pub fn draw(mut self, count: u32) -> Self {
        self.draw = count;
        self
    }

    pub fn energy(mut self, amount: i32) -> Self {
        self.energy = amount;
        self
    }

    pub fn hp_cost(mut self, amount: i32) -> Self {
        self.hp_cost = amount;
        self
    }

    pub fn effect(mut self, status: Status, amount: i32, target: EffectTarget) -> Self {
        self.effects.push(StatusApplication::new(status, amount, target));
        self
    }

    pub fn special(mut self, tag: impl Into<String>, magic: i32) -> Self {
        self.special = Some(tag.into());
        self.magic = magic;
        self
    }

    pub fn stance(mut self, stance: Stance) -> Self {
        self.stance = Some(stance);
        self
    }

    pub fn mantra(mut self, amount: i32) -> Self {
        self.mantra = amount;
        self
    }

    pub fn exhaust(mut self) -> Self {
        self.exhaust = true;
        self
    }

    pub fn retain(mut self) -> Self {
        self.retain = true;
        self
    }

    pub fn ethereal(mut self) -> Self {
        self.ethereal = true;
        self
    }

    pub fn innate(mut self) -> Self {
        self.innate = true;
        self
    }

    pub fn unplayable(mut self) -> Self {
        self.unplayable = true;
        self
    }

    pub fn x_cost(mut self) -> Self {
        self.x_cost = true;
        self
    }

    pub fn upgrades_to(mut self, id: impl Into<String>) -> Self {
        self.upgrade = Some(id.into());
        self
    }

    pub fn is_strike(&self) -> bool {
        self.name.to_ascii_lowercase().contains("strike")
    }
}

fn is_default<T: Default + PartialEq>(value: &T) -> bool {
    *value == T::default()
}

/// 模板加实例 id，以及只属于这一张牌的战斗内数值。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CardInstance {
    pub instance_id: InstanceId,
    #[serde(flatten)]
    pub card: CardTemplate,
    #[serde(default)]
    pub upgraded: bool,
    #[serde(default, skip_serializing_if = "is_default")]
    pub times_upgraded: u32,
    /// 本场战斗累积的额外伤害。
    #[serde(default, skip_serializing_if = "is_default")]
    pub bonus_damage: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cost_override: Option<i32>,
}

impl CardInstance {
    pub fn new(instance_id: InstanceId, card: CardTemplate) -> Self {
        Self {
            instance_id,
            card,
            upgraded: false,
            times_upgraded: 0,
            bonus_damage: 0,
            cost_override: None,
        }
    }

    pub fn damage(&self) -> Option<i32> {
        self.card.damage.map(|damage| damage + self.bonus_damage)
    }

    pub fn cost(&self) -> i32 {
        self.cost_override.unwrap_or(self.card.cost)
    }

    pub fn id(&self) -> &str {
        &self.card.id
    }

    pub fn name(&self) -> &str {
        &self.card.name
    }

    pub fn kind(&self) -> CardKind {
        self.card.kind
    }
}

/// 选牌子流程的种类。
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum SelectionKind {
    DiscardToDrawTop,
    HandToDrawTop,
    UpgradeInHand,
    CopyInHand,
    RetrieveExhausted,
    ExhaustChoose,
    ExhaustForDraw,
    Scry,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PileKind {
    Draw,
    Hand,
    Discard,
    Exhaust,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SelectionRequest {
    pub kind: SelectionKind,
    pub source: PileKind,
    pub remaining: u32,
    #[serde(default)]
    pub select_all: bool,
    pub eligible: Vec<InstanceId>,
    /// 选择完成后额外的数值（复制份数、抽牌数）。
    #[serde(default)]
    pub amount: u32,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum BattleOutcome {
    Victory,
    Defeat,
}

/// 战斗阶段。所有变更入口都先检查阶段。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(tag = "type")]
pub enum BattlePhase {
    #[default]
    PlayerTurn,
    Targeting {
        card: InstanceId,
    },
    CardSelection {
        selection: SelectionRequest,
    },
    EnemyTurn,
    Resolved {
        outcome: BattleOutcome,
    },
}

impl BattlePhase {
    pub fn name(&self) -> &'static str {
        match self {
            BattlePhase::PlayerTurn => "player-turn",
            BattlePhase::Targeting { .. } => "targeting",
            BattlePhase::CardSelection { .. } => "card-selection",
            BattlePhase::EnemyTurn => "enemy-turn",
            BattlePhase::Resolved { .. } => "resolved",
        }
    }
}

/// 面向人的战斗日志。
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct CombatLog(Vec<String>);

impl CombatLog {
    pub fn push(&mut self, entry: impl Into<String>) {
        let entry = entry.into();
        tracing::debug!(target: "battle_core::log", "{entry}");
        self.0.push(entry);
    }

    pub fn entries(&self) -> &[String] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, needle: &str) -> bool {
        self.0.iter().any(|entry| entry.contains(needle))
    }

    pub fn since(&self, start: usize) -> &[String] {
        self.0.get(start..).unwrap_or(&[])
    }
}

/// 本回合内的计数，回合开始时清零。
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct TurnCounters {
    pub cards_played: u32,
    pub attacks_played: u32,
    pub skills_played: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BattleState {
    pub phase: BattlePhase,
    pub turn: u32,
    pub player: Player,
    pub enemies: Vec<Enemy>,
    pub piles: Piles,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub relics: Vec<RelicTemplate>,
    #[serde(default)]
    pub relic_states: RelicStates,
    #[serde(default)]
    pub log: CombatLog,
    #[serde(default)]
    pub counters: TurnCounters,
    /// 下回合开始时获得的格挡。
    #[serde(default)]
    pub pending_block: i32,
    #[serde(default)]
    pub conserved_energy: i32,
    #[serde(default)]
    pub hp_lost_this_combat: bool,
    /// 本场战斗中生命流失的次数。
    #[serde(default)]
    pub times_hp_lost: u32,
    pub next_instance_id: InstanceId,
    pub next_enemy_id: EnemyId,
}

impl BattleState {
    pub fn new(player: Player) -> Self {
        Self {
            phase: BattlePhase::PlayerTurn,
            turn: 0,
            player,
            enemies: Vec::new(),
            piles: Piles::default(),
            relics: Vec::new(),
            relic_states: RelicStates::default(),
            log: CombatLog::default(),
            counters: TurnCounters::default(),
            pending_block: 0,
            conserved_energy: 0,
            hp_lost_this_combat: false,
            times_hp_lost: 0,
            next_instance_id: 1,
            next_enemy_id: 1,
        }
    }

    pub fn note(&mut self, entry: impl Into<String>) {
        self.log.push(entry);
    }

    pub fn alloc_instance_id(&mut self) -> InstanceId {
        let id = self.next_instance_id;
        self.next_instance_id += 1;
        id
    }

    pub fn alloc_enemy_id(&mut self) -> EnemyId {
        let id = self.next_enemy_id;
        self.next_enemy_id += 1;
        id
    }

    pub fn instantiate(&mut self, card: CardTemplate) -> CardInstance {
        let id = self.alloc_instance_id();
        CardInstance::new(id, card)
    }

    pub fn outcome(&self) -> Option<BattleOutcome> {
        match self.phase {
            BattlePhase::Resolved { outcome } => Some(outcome),
            _ => None,
        }
    }

    pub fn is_finished(&self) -> bool {
        self.outcome().is_some()
    }

    pub fn living_enemies(&self) -> impl Iterator<Item = (usize, &Enemy)> {
        self.enemies
            .iter()
            .enumerate()
            .filter(|(_, enemy)| enemy.is_alive())
    }

    pub fn living_enemy_indices(&self) -> Vec<usize> {
        self.living_enemies().map(|(index, _)| index).collect()
    }

    pub fn all_enemies_defeated(&self) -> bool {
        self.enemies.iter().all(|enemy| !enemy.is_alive())
    }

    pub fn find_enemy(&self, instance_id: EnemyId) -> Option<usize> {
        self.enemies
            .iter()
            .position(|enemy| enemy.instance_id == instance_id)
    }

    pub fn has_relic(&self, id: &str) -> bool {
        self.relics.iter().any(|relic| relic.id == id)
    }
}
