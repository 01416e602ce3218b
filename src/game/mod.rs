//! 战斗核心逻辑模块（数据模型、结算、回合状态机、校验等）。

pub mod content;
pub mod effects;
pub mod enemy_phase;
pub mod math;
pub mod orbs;
pub mod piles;
pub mod potions;
pub mod relics;
pub mod rng;
pub mod rules;
pub mod snapshot;
pub mod specials;
pub mod state;
pub mod validator;

pub use content::{ContentCatalog, ContentError, ContentKind, ContentTables};
pub use effects::{play_card, PlayOptions, ResolutionContext};
pub use enemy_phase::PendingEnemyAction;
pub use math::{apply_damage, compute_block, compute_damage, DamageOutcome, IncomingModifiers};
pub use orbs::{Orb, OrbKind};
pub use piles::Piles;
pub use potions::{PotionEffect, PotionTarget, PotionTemplate, PotionUse, MAX_POTION_SLOTS};
pub use relics::{PassiveEffects, RelicEffect, RelicEvent, RelicState, RelicStates, RelicTemplate};
pub use rng::{BattleRng, SeededRng};
pub use rules::{BattleAction, BattleSetup, PlayerSetup, RuleEngine, RuleError, RuleResolution};
pub use snapshot::BattleSnapshot;
pub use state::{
    BattleOutcome, BattlePhase, BattleState, CardInstance, CardKind, CardTarget, CardTemplate, Combatant, Enemy,
    InstanceId, Player, SelectionRequest, Stance, Status,
};
pub use validator::{InvariantViolation, Severity, ValidationError};
