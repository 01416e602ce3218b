//! 敌人意图引擎（招式表、意图选择）。

pub mod intent;

pub use intent::{
    get_intent, record_move, DeathRule, EnemyMove, EnemySpecial, EnemyTemplate, FlagUpdate, Intent,
    IntentKind, MoveChoice, MoveCondition, MoveEffect, MoveRule, MoveTarget, SplitHp, WeightedMove,
};
