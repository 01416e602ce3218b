use serde::{Deserialize, Serialize};

use crate::game::rng::BattleRng;
use crate::game::state::{Enemy, EnemyFlags, PileKind, Status, Statuses};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum IntentKind {
    Attack,
    AttackBuff,
    AttackDebuff,
    AttackDefend,
    Buff,
    Debuff,
    Defend,
    DefendBuff,
    StrongDebuff,
    Unknown,
    Sleeping,
    Stun,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum MoveTarget {
    Player,
    Own,
    Allies,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MoveEffect {
    pub status: Status,
    pub amount: i32,
    pub on: MoveTarget,
}

/// 招式附带的特殊行动。召唤、分裂、逃跑在敌人回合循环结束后统一结算。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum EnemySpecial {
    AddCards {
        card_id: String,
        count: u32,
        pile: PileKind,
    },
    Summon {
        archetype: String,
        count: u32,
        max_allies: u32,
    },
    Split,
    Escape,
    Explode,
    HealSelf {
        amount: i32,
    },
    BuffAllies {
        status: Status,
        amount: i32,
    },
    RemoveDebuffs,
    StealGold {
        amount: i32,
    },
}

/// 招式结算后对敌人标记的修改，下一次选招时可见。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum FlagUpdate {
    IncrementCounter,
    ResetCounter,
    Escalate { amount: i32 },
    SetDefensive { value: bool },
    Wake,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EnemyMove {
    pub id: String,
    pub name: String,
    pub kind: IntentKind,
    #[serde(default)]
    pub damage: i32,
    #[serde(default)]
    pub hits: u32,
    /// 攻击段数额外加上 `flags.escalation`。
    #[serde(default)]
    pub escalating_hits: bool,
    #[serde(default)]
    pub block: i32,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub effects: Vec<MoveEffect>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub special: Option<EnemySpecial>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub after: Vec<FlagUpdate>,
    /// 只能使用一次的招式。
    #[serde(default)]
    pub once: bool,
}

impl EnemyMove {
    pub fn new(id: impl Into<String>, name: impl Into<String>, kind: IntentKind) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            kind,
            damage: 0,
            hits: 0,
            escalating_hits: false,
            block: 0,
            effects: Vec::new(),
            special: None,
            after: Vec::new(),
            once: false,
        }
    }

    pub fn attack(mut self, damage: i32, hits: u32) -> Self {
        self.damage = damage;
        self.hits = hits.max(1);
        self
    }

    pub fn escalating(mut self) -> Self {
        self.escalating_hits = true;
        self
    }

    pub fn block(mut self, amount: i32) -> Self {
        self.block = amount;
        self
    }

    pub fn apply(mut self, status: Status, amount: i32, on: MoveTarget) -> Self {
        self.effects.push(MoveEffect { status, amount, on });
        self
    }

    pub fn special(mut self, special: EnemySpecial) -> Self {
        self.special = Some(special);
        self
    }

    pub fn then(mut self, update: FlagUpdate) -> Self {
        self.after.push(update);
        self
    }

    pub fn once(mut self) -> Self {
        self.once = true;
        self
    }

    /// 有伤害却没写段数的招式按一段计算。
    pub fn hit_count(&self) -> u32 {
        if self.damage > 0 {
            self.hits.max(1)
        } else {
            self.hits
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum MoveCondition {
    TurnIs { turn: u32 },
    TurnAtLeast { turn: u32 },
    TurnEvery { every: u32, offset: u32 },
    HpBelowPercent { percent: i32 },
    Asleep,
    Defensive,
    NotDefensive,
    CounterAtLeast { value: i32 },
    LastMoveNot { id: String },
    NotUsed { id: String },
    Used { id: String },
    NotSplit,
}

impl MoveCondition {
    fn holds(&self, enemy: &Enemy, turn: u32) -> bool {
        let flags = &enemy.flags;
        match self {
            MoveCondition::TurnIs { turn: expected } => turn == *expected,
            MoveCondition::TurnAtLeast { turn: min } => turn >= *min,
            MoveCondition::TurnEvery { every, offset } => *every > 0 && turn % every == *offset,
            MoveCondition::HpBelowPercent { percent } => {
                enemy.body.max_hp > 0 && enemy.body.hp * 100 <= enemy.body.max_hp * percent
            }
            MoveCondition::Asleep => flags.asleep,
            MoveCondition::Defensive => flags.defensive,
            MoveCondition::NotDefensive => !flags.defensive,
            MoveCondition::CounterAtLeast { value } => flags.counter >= *value,
            MoveCondition::LastMoveNot { id } => enemy.last_move.as_deref() != Some(id.as_str()),
            MoveCondition::NotUsed { id } => !flags.used_moves.contains(id),
            MoveCondition::Used { id } => flags.used_moves.contains(id),
            MoveCondition::NotSplit => !flags.has_split,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct WeightedMove {
    pub weight: u32,
    #[serde(rename = "move")]
    pub action: EnemyMove,
    /// 上一回合用过则本回合跳过。
    #[serde(default)]
    pub no_repeat: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum MoveChoice {
    Fixed { action: EnemyMove },
    Weighted { options: Vec<WeightedMove> },
}

/// 招式表中的一条规则：条件全部满足时选择该招式。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MoveRule {
    #[serde(default)]
    pub when: Vec<MoveCondition>,
    pub choice: MoveChoice,
}

impl MoveRule {
    pub fn always(action: EnemyMove) -> Self {
        Self {
            when: Vec::new(),
            choice: MoveChoice::Fixed { action },
        }
    }

    pub fn when(when: Vec<MoveCondition>, action: EnemyMove) -> Self {
        Self {
            when,
            choice: MoveChoice::Fixed { action },
        }
    }

    pub fn weighted(when: Vec<MoveCondition>, options: Vec<(u32, EnemyMove, bool)>) -> Self {
        Self {
            when,
            choice: MoveChoice::Weighted {
                options: options
                    .into_iter()
                    .map(|(weight, action, no_repeat)| WeightedMove {
                        weight,
                        action,
                        no_repeat,
                    })
                    .collect(),
            },
        }
    }

    fn first_move(&self) -> Option<&EnemyMove> {
        match &self.choice {
            MoveChoice::Fixed { action } => Some(action),
            MoveChoice::Weighted { options } => options.first().map(|option| &option.action),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum SplitHp {
    /// 父体最大生命的一半。
    HalfParentMax,
    /// 父体当前生命。
    ParentCurrent,
    /// 使用子体模板的生命。
    Template,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum DeathRule {
    Split { into: Vec<String>, hp: SplitHp },
    Rebirth { hp_percent: i32 },
}

/// 敌人模板：数值与招式表。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EnemyTemplate {
    pub archetype: String,
    pub name: String,
    pub hp: (i32, i32),
    #[serde(default)]
    pub statuses: Statuses,
    #[serde(default)]
    pub asleep: bool,
    #[serde(default)]
    pub retain_block: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub on_death: Option<DeathRule>,
    pub moves: Vec<MoveRule>,
}

impl EnemyTemplate {
    pub fn new(archetype: impl Into<String>, name: impl Into<String>, hp: (i32, i32), moves: Vec<MoveRule>) -> Self {
        Self {
            archetype: archetype.into(),
            name: name.into(),
            hp,
            statuses: Statuses::default(),
            asleep: false,
            retain_block: false,
            on_death: None,
            moves,
        }
    }

    pub fn status(mut self, status: Status, amount: i32) -> Self {
        self.statuses.set(status, amount);
        self
    }

    pub fn asleep(mut self) -> Self {
        self.asleep = true;
        self
    }

    pub fn retains_block(mut self) -> Self {
        self.retain_block = true;
        self
    }

    pub fn on_death(mut self, rule: DeathRule) -> Self {
        self.on_death = Some(rule);
        self
    }

    pub fn initial_flags(&self) -> EnemyFlags {
        EnemyFlags {
            asleep: self.asleep,
            ..EnemyFlags::default()
        }
    }
}

/// 敌人当前回合将执行的行动，回合内保持不变。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Intent {
    pub move_id: String,
    pub name: String,
    pub kind: IntentKind,
    pub damage: i32,
    pub hits: u32,
    pub block: i32,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub effects: Vec<MoveEffect>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub special: Option<EnemySpecial>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub after: Vec<FlagUpdate>,
    #[serde(default)]
    pub once: bool,
}

impl Intent {
    pub fn from_move(action: &EnemyMove, flags: &EnemyFlags) -> Self {
        let mut hits = action.hit_count();
        if action.escalating_hits {
            hits = (hits as i32 + flags.escalation).max(1) as u32;
        }
        Self {
            move_id: action.id.clone(),
            name: action.name.clone(),
            kind: action.kind,
            damage: action.damage,
            hits,
            block: action.block,
            effects: action.effects.clone(),
            special: action.special.clone(),
            after: action.after.clone(),
            once: action.once,
        }
    }

    pub fn stunned() -> Self {
        Self::from_move(
            &EnemyMove::new("stunned", "Stunned", IntentKind::Stun),
            &EnemyFlags::default(),
        )
    }

    pub fn is_attack(&self) -> bool {
        self.hits > 0
    }
}

fn roll_weighted<'a>(
    options: &'a [WeightedMove],
    enemy: &Enemy,
    rng: &mut dyn BattleRng,
) -> Option<&'a EnemyMove> {
    let fresh: Vec<&WeightedMove> = options
        .iter()
        .filter(|option| {
            !(option.no_repeat && enemy.last_move.as_deref() == Some(option.action.id.as_str()))
        })
        .collect();
    let pool: Vec<&WeightedMove> = if fresh.is_empty() {
        options.iter().collect()
    } else {
        fresh
    };
    let total: u32 = pool.iter().map(|option| option.weight).sum();
    if total == 0 {
        return pool.first().map(|option| &option.action);
    }
    let mut roll = rng.below(total as usize) as u32;
    for option in &pool {
        if roll < option.weight {
            return Some(&option.action);
        }
        roll -= option.weight;
    }
    pool.last().map(|option| &option.action)
}

/// 依次匹配招式规则，返回第一条满足条件的招式。
///
/// 除了规则本身声明的加权随机之外，相同的招式表、回合与标记总是得到相同的意图。
/// 没有规则匹配时退回表中的第一个招式。
pub fn get_intent(enemy: &Enemy, rules: &[MoveRule], turn: u32, rng: &mut dyn BattleRng) -> Intent {
    let chosen = rules
        .iter()
        .find(|rule| rule.when.iter().all(|condition| condition.holds(enemy, turn)))
        .and_then(|rule| match &rule.choice {
            MoveChoice::Fixed { action } => Some(action),
            MoveChoice::Weighted { options } => roll_weighted(options, enemy, rng),
        })
        .or_else(|| rules.first().and_then(MoveRule::first_move));

    match chosen {
        Some(action) => {
            tracing::debug!(enemy = %enemy.name, turn, intent = %action.id, "intent selected");
            Intent::from_move(action, &enemy.flags)
        }
        None => Intent::stunned(),
    }
}

/// 行动结算后更新招式历史与标记。
pub fn record_move(enemy: &mut Enemy, intent: &Intent) {
    for update in &intent.after {
        match update {
            FlagUpdate::IncrementCounter => enemy.flags.counter += 1,
            FlagUpdate::ResetCounter => enemy.flags.counter = 0,
            FlagUpdate::Escalate { amount } => enemy.flags.escalation += amount,
            FlagUpdate::SetDefensive { value } => enemy.flags.defensive = *value,
            FlagUpdate::Wake => enemy.flags.asleep = false,
        }
    }
    if intent.once && !enemy.flags.used_moves.contains(&intent.move_id) {
        enemy.flags.used_moves.push(intent.move_id.clone());
    }
    enemy.last_move = Some(intent.move_id.clone());
}
