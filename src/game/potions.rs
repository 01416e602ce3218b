//! 药水：模板、槽位与饮用结算。
//!
//! 槽位里只存药水 id，模板在使用时再查内容表。

use serde::{Deserialize, Serialize};

use super::content::ContentTables;
use super::effects::ResolutionContext;
use super::state::{Player, Status};

pub const MAX_POTION_SLOTS: usize = 3;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum PotionTarget {
    Enemy,
    Player,
    AllEnemies,
    Untargeted,
}

/// 使用时机。
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum PotionUse {
    #[default]
    Combat,
    Anytime,
    /// 不能主动饮用，条件满足时自动生效。
    Instant,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum PotionEffect {
    Damage { amount: i32 },
    DamageAll { amount: i32 },
    Block { amount: i32 },
    Energy { amount: i32 },
    Heal { amount: i32 },
    Buff { status: Status, amount: i32 },
    Debuff { status: Status, amount: i32 },
    Draw { amount: u32 },
    DoubleDamage { amount: i32 },
    /// 死亡时以最大生命的百分比复活。
    Revive { percent: i32 },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PotionTemplate {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub usage: PotionUse,
    pub target: PotionTarget,
    pub effect: PotionEffect,
}

impl PotionTemplate {
    pub fn new(id: impl Into<String>, name: impl Into<String>, target: PotionTarget, effect: PotionEffect) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            usage: PotionUse::Combat,
            target,
            effect,
        }
    }

    pub fn anytime(mut self) -> Self {
        self.usage = PotionUse::Anytime;
        self
    }

    pub fn instant(mut self) -> Self {
        self.usage = PotionUse::Instant;
        self
    }
}

pub fn empty_slots() -> Vec<Option<String>> {
    vec![None; MAX_POTION_SLOTS]
}

/// 放进第一个空槽；槽满时返回 false，药水丢弃。
pub fn add_potion(player: &mut Player, id: &str) -> bool {
    if player.potions.len() < MAX_POTION_SLOTS {
        player.potions.resize(MAX_POTION_SLOTS, None);
    }
    match player.potions.iter_mut().find(|slot| slot.is_none()) {
        Some(slot) => {
            *slot = Some(id.to_string());
            true
        }
        None => {
            tracing::debug!(potion = id, "potion slots full, potion discarded");
            false
        }
    }
}

/// 自动生效的药水不能主动喝；满血时治疗药水无效。
pub fn can_drink(potion: &PotionTemplate, player: &Player) -> bool {
    match (potion.usage, &potion.effect) {
        (PotionUse::Instant, _) => false,
        (_, PotionEffect::Heal { .. }) => player.body.hp < player.body.max_hp,
        _ => true,
    }
}

/// 结算一瓶药水。目标合法性由调用方保证。
pub fn drink(ctx: &mut ResolutionContext<'_>, potion: &PotionTemplate) {
    ctx.note(format!("Used {}", potion.name));
    match &potion.effect {
        PotionEffect::Damage { amount } => {
            if let Some(index) = ctx.target {
                ctx.damage_enemy_flat(index, *amount, &potion.name);
            }
        }
        PotionEffect::DamageAll { amount } => {
            for index in ctx.state.living_enemy_indices() {
                ctx.damage_enemy_flat(index, *amount, &potion.name);
            }
        }
        PotionEffect::Block { amount } => {
            ctx.state.player.body.gain_block(*amount);
            ctx.note(format!("Gained {amount} Block"));
        }
        PotionEffect::Energy { amount } => {
            ctx.state.player.energy += amount;
            ctx.note(format!("Gained {amount} Energy"));
        }
        PotionEffect::Heal { amount } => {
            let healed = ctx.state.player.body.heal(*amount);
            ctx.note(format!("Healed {healed} HP"));
        }
        PotionEffect::Buff { status, amount } => {
            ctx.apply_status_to_player(*status, *amount);
        }
        PotionEffect::Debuff { status, amount } => {
            let targets = match (potion.target, ctx.target) {
                (PotionTarget::AllEnemies, _) => ctx.state.living_enemy_indices(),
                (_, Some(index)) => vec![index],
                (_, None) => Vec::new(),
            };
            for index in targets {
                ctx.apply_status_to_enemy(index, *status, *amount);
            }
        }
        PotionEffect::Draw { amount } => {
            ctx.draw(*amount);
        }
        PotionEffect::DoubleDamage { amount } => {
            ctx.state.player.body.statuses.add(Status::DoubleDamage, *amount);
            ctx.note(format!("Next {amount} attack(s) deal double damage"));
        }
        PotionEffect::Revive { .. } => {}
    }
}

/// 玩家死亡时找第一瓶复活药水，喝掉并回血；没有则返回 false。
pub fn try_revive(ctx: &mut ResolutionContext<'_>) -> bool {
    let content: &dyn ContentTables = ctx.content;
    let found = ctx.state.player.potions.iter().enumerate().find_map(|(slot, id)| {
        let potion = content.potion_template(id.as_deref()?)?;
        match potion.effect {
            PotionEffect::Revive { percent } => Some((slot, potion.name.clone(), percent)),
            _ => None,
        }
    });
    let Some((slot, name, percent)) = found else {
        return false;
    };
    ctx.state.player.potions[slot] = None;
    let body = &mut ctx.state.player.body;
    body.hp = (body.max_hp * percent / 100).max(1);
    let hp = body.hp;
    tracing::info!(potion = %name, hp, "death prevented");
    ctx.note(format!("{name} revived you at {hp} HP"));
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::game::content::ContentCatalog;
    use crate::game::rng::SeededRng;
    use crate::game::state::{BattleState, Combatant, Enemy, EnemyFlags};

    fn enemy(id: u32, hp: i32) -> Enemy {
        Enemy {
            instance_id: id,
            archetype: "dummy".into(),
            name: format!("Dummy {id}"),
            body: Combatant::new(hp, hp),
            intent: None,
            last_move: None,
            flags: EnemyFlags::default(),
            retain_block: false,
            on_death: None,
        }
    }

    fn potion(id: &str) -> PotionTemplate {
        ContentCatalog::standard()
            .potion(id)
            .expect("potion should exist in the standard catalog")
    }

    #[test]
    fn slots_fill_in_order_and_overflow_is_dropped() {
        let mut player = Player::new(80, 80, 3);
        assert_eq!(player.potions, empty_slots());
        for id in ["fire_potion", "block_potion", "energy_potion"] {
            assert!(add_potion(&mut player, id));
        }
        assert!(!add_potion(&mut player, "weak_potion"));
        player.potions[1] = None;
        assert!(add_potion(&mut player, "weak_potion"));
        assert_eq!(player.potions[1].as_deref(), Some("weak_potion"));
    }

    #[test]
    fn fairy_and_full_hp_healing_cannot_be_drunk() {
        let mut player = Player::new(80, 80, 3);
        assert!(!can_drink(&potion("fairy_potion"), &player));
        assert!(!can_drink(&potion("health_potion"), &player));
        player.body.hp = 50;
        assert!(can_drink(&potion("health_potion"), &player));
        assert!(can_drink(&potion("fire_potion"), &player));
    }

    #[test]
    fn fire_potion_ignores_strength_but_not_block() {
        let mut state = BattleState::new(Player::new(80, 80, 3));
        state.enemies = vec![enemy(1, 40)];
        state.enemies[0].body.block = 5;
        state.player.body.statuses.set(Status::Strength, 4);
        let (content, config, mut rng) = (ContentCatalog::standard(), EngineConfig::default(), SeededRng::from_seed(1));
        let mut ctx = ResolutionContext::new(&mut state, &mut rng, &content, &config).with_target(Some(0));

        drink(&mut ctx, &potion("fire_potion"));
        assert_eq!(state.enemies[0].body.hp, 25);
        assert_eq!(state.enemies[0].body.block, 0);
    }

    #[test]
    fn debuff_potions_respect_artifact() {
        let mut state = BattleState::new(Player::new(80, 80, 3));
        state.enemies = vec![enemy(1, 40), enemy(2, 40)];
        state.enemies[1].body.statuses.set(Status::Artifact, 1);
        let (content, config, mut rng) = (ContentCatalog::standard(), EngineConfig::default(), SeededRng::from_seed(1));
        let mut ctx = ResolutionContext::new(&mut state, &mut rng, &content, &config);

        drink(&mut ctx, &potion("weak_potion"));
        assert_eq!(state.enemies[0].body.statuses.get(Status::Weak), 3);
        assert_eq!(state.enemies[1].body.statuses.get(Status::Weak), 0);
        assert!(!state.enemies[1].body.statuses.has(Status::Artifact));
    }

    #[test]
    fn self_potions_buff_the_player() {
        let mut state = BattleState::new(Player::new(80, 80, 3));
        let (content, config, mut rng) = (ContentCatalog::standard(), EngineConfig::default(), SeededRng::from_seed(1));
        let mut ctx = ResolutionContext::new(&mut state, &mut rng, &content, &config);

        for id in ["block_potion", "energy_potion", "strength_potion", "heart_of_iron", "duplication_potion"] {
            drink(&mut ctx, &potion(id));
        }
        let player = &state.player;
        assert_eq!(player.body.block, 12);
        assert_eq!(player.energy, 5);
        assert_eq!(player.body.statuses.get(Status::Strength), 2);
        assert_eq!(player.body.statuses.get(Status::Metallicize), 6);
        assert_eq!(player.body.statuses.get(Status::DoubleDamage), 1);
    }

    #[test]
    fn fairy_revives_and_empties_its_slot() {
        let mut state = BattleState::new(Player::new(80, 80, 3));
        state.player.potions[2] = Some("fairy_potion".to_string());
        state.player.body.hp = 0;
        let (content, config, mut rng) = (ContentCatalog::standard(), EngineConfig::default(), SeededRng::from_seed(1));
        let mut ctx = ResolutionContext::new(&mut state, &mut rng, &content, &config);

        assert!(try_revive(&mut ctx));
        assert!(!try_revive(&mut ctx), "the bottle is gone");
        assert_eq!(state.player.body.hp, 24);
        assert_eq!(state.player.potions, empty_slots());
    }
}
