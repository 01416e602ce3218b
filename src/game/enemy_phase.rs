//! 敌人回合：执行意图、死亡规则与召唤队列。
//!
//! 生成、分裂、逃跑、复活都先进入待处理队列，在敌人循环结束后
//! 或每张牌结算后统一处理，循环过程中敌人列表保持稳定。

use super::content::{ContentError, ContentTables};
use super::effects::ResolutionContext;
use super::math::compute_incoming_damage;
use super::rng::BattleRng;
use super::state::{BattleState, Combatant, Enemy, EnemyId, Status};
use crate::ai::{get_intent, record_move, DeathRule, EnemySpecial, Intent, IntentKind, MoveTarget, SplitHp};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PendingEnemyAction {
    Spawn { archetype: String, hp: Option<i32> },
    /// 按死亡规则分裂并移除原敌人。
    Split { enemy: EnemyId },
    Escape { enemy: EnemyId },
    Revive { enemy: EnemyId, hp_percent: i32 },
}

/// 招式表使用的回合序号从 0 开始。
pub fn intent_turn(state: &BattleState) -> u32 {
    state.turn.saturating_sub(1)
}

/// 按模板生成敌人；`hp` 指定时覆盖模板的生命区间。
pub fn spawn_enemy(
    state: &mut BattleState,
    content: &dyn ContentTables,
    rng: &mut dyn BattleRng,
    archetype: &str,
    hp: Option<i32>,
) -> Result<Enemy, ContentError> {
    let template = content.enemy(archetype)?;
    let (low, high) = template.hp;
    let high = high.max(low);
    let max_hp = hp
        .unwrap_or_else(|| low + rng.below((high - low + 1) as usize) as i32)
        .max(1);
    Ok(Enemy {
        instance_id: state.alloc_enemy_id(),
        archetype: template.archetype.clone(),
        name: template.name.clone(),
        body: Combatant {
            statuses: template.statuses.clone(),
            ..Combatant::new(max_hp, max_hp)
        },
        intent: None,
        last_move: None,
        flags: template.initial_flags(),
        retain_block: template.retain_block,
        on_death: template.on_death.clone(),
    })
}

pub fn assign_intent(content: &dyn ContentTables, rng: &mut dyn BattleRng, enemy: &mut Enemy, turn: u32) {
    let rules = content.enemy_move_table(&enemy.archetype).unwrap_or(&[]);
    enemy.intent = Some(get_intent(enemy, rules, turn, rng));
}

/// 玩家回合开始时为每个存活敌人重新选择意图。
pub fn refresh_intents(ctx: &mut ResolutionContext<'_>) {
    let turn = intent_turn(ctx.state);
    let content = ctx.content;
    for enemy in ctx.state.enemies.iter_mut().filter(|enemy| enemy.is_alive()) {
        assign_intent(content, ctx.rng, enemy, turn);
    }
}

/// 依次执行存活敌人的意图；玩家死亡或敌人全灭时立即停止。
pub fn run_enemy_turn(ctx: &mut ResolutionContext<'_>) {
    let acting: Vec<EnemyId> = ctx
        .state
        .living_enemies()
        .map(|(_, enemy)| enemy.instance_id)
        .collect();
    for id in acting {
        if ctx.player_dead() || ctx.battle_won() {
            break;
        }
        let Some(index) = ctx.state.find_enemy(id) else {
            continue;
        };
        if ctx.state.enemies[index].is_alive() {
            act(ctx, index);
        }
    }
}

fn act(ctx: &mut ResolutionContext<'_>, index: usize) {
    let enemy = &mut ctx.state.enemies[index];
    if !enemy.retain_block {
        enemy.body.block = 0;
    }
    let intent = enemy.intent.clone().unwrap_or_else(Intent::stunned);
    let name = enemy.name.clone();
    let woken = intent.kind == IntentKind::Sleeping && !enemy.flags.asleep;

    if intent.kind == IntentKind::Stun || woken {
        ctx.note(format!("{name} is stunned"));
        end_of_action(ctx, index, &intent);
        return;
    }
    ctx.note(format!("{name} uses {}", intent.name));

    if intent.is_attack() {
        for _ in 0..intent.hits {
            if ctx.player_dead() || !ctx.state.enemies[index].is_alive() {
                break;
            }
            let modifiers = ctx.player_incoming();
            let damage = compute_incoming_damage(
                intent.damage,
                &ctx.state.enemies[index],
                &ctx.state.player,
                &modifiers,
            );
            ctx.note(format!("{name} attacks for {damage}"));
            ctx.damage_player(damage);
            retaliate(ctx, index);
        }
    }

    if !ctx.state.enemies[index].is_alive() {
        return;
    }
    if intent.block > 0 {
        ctx.state.enemies[index].body.gain_block(intent.block);
        ctx.note(format!("{name} gained {} Block", intent.block));
    }
    for effect in &intent.effects {
        match effect.on {
            MoveTarget::Player => {
                ctx.apply_status_to_player(effect.status, effect.amount);
            }
            MoveTarget::Own => {
                ctx.state.enemies[index]
                    .body
                    .statuses
                    .add(effect.status, effect.amount);
                ctx.note(format!("{name} gained {} {:?}", effect.amount, effect.status));
            }
            MoveTarget::Allies => {
                for ally in ctx.state.living_enemy_indices() {
                    ctx.state.enemies[ally].body.statuses.add(effect.status, effect.amount);
                }
                ctx.note(format!("Enemies gained {} {:?}", effect.amount, effect.status));
            }
        }
    }
    if let Some(special) = &intent.special {
        apply_special(ctx, index, special);
    }
    record_move(&mut ctx.state.enemies[index], &intent);
    end_of_action(ctx, index, &intent);
}

/// 火焰屏障与荆棘对攻击者的反伤。
fn retaliate(ctx: &mut ResolutionContext<'_>, index: usize) {
    let statuses = &ctx.state.player.body.statuses;
    let flame_barrier = statuses.get(Status::FlameBarrier);
    let thorns = statuses.get(Status::Thorns);
    if flame_barrier > 0 {
        ctx.damage_enemy_flat(index, flame_barrier, "Flame Barrier");
    }
    if thorns > 0 {
        ctx.damage_enemy_flat(index, thorns, "Thorns");
    }
}

fn apply_special(ctx: &mut ResolutionContext<'_>, index: usize, special: &EnemySpecial) {
    let enemy = &ctx.state.enemies[index];
    let (id, name) = (enemy.instance_id, enemy.name.clone());
    match special {
        EnemySpecial::AddCards { card_id, count, pile } => {
            for _ in 0..*count {
                ctx.add_card(card_id, *pile);
            }
        }
        EnemySpecial::Summon {
            archetype,
            count,
            max_allies,
        } => {
            let allies = ctx.state.living_enemies().filter(|(other, _)| *other != index).count();
            let queued = ctx
                .pending
                .iter()
                .filter(|action| matches!(action, PendingEnemyAction::Spawn { .. }))
                .count();
            let room = (*max_allies as usize).saturating_sub(allies + queued);
            let summoned = (*count as usize).min(room);
            for _ in 0..summoned {
                ctx.pending.push(PendingEnemyAction::Spawn {
                    archetype: archetype.clone(),
                    hp: None,
                });
            }
            ctx.note(format!("{name} summons {summoned} {archetype}"));
        }
        EnemySpecial::Split => {
            ctx.state.enemies[index].flags.has_split = true;
            ctx.pending.push(PendingEnemyAction::Split { enemy: id });
        }
        EnemySpecial::Escape => {
            ctx.pending.push(PendingEnemyAction::Escape { enemy: id });
        }
        EnemySpecial::Explode => {
            ctx.state.enemies[index].body.hp = 0;
            ctx.note(format!("{name} exploded"));
        }
        EnemySpecial::HealSelf { amount } => {
            let healed = ctx.state.enemies[index].body.heal(*amount);
            ctx.note(format!("{name} healed {healed} HP"));
        }
        EnemySpecial::BuffAllies { status, amount } => {
            for ally in ctx.state.living_enemy_indices() {
                ctx.state.enemies[ally].body.statuses.add(*status, *amount);
            }
            ctx.note(format!("{name} granted {amount} {status:?} to all enemies"));
        }
        EnemySpecial::RemoveDebuffs => {
            let statuses = &mut ctx.state.enemies[index].body.statuses;
            let debuffs: Vec<Status> = statuses
                .iter()
                .filter(|(status, value)| status.is_debuff() || (*status == Status::Strength && *value < 0))
                .map(|(status, _)| status)
                .collect();
            for status in debuffs {
                statuses.clear(status);
            }
        }
        EnemySpecial::StealGold { amount } => {
            let player = &mut ctx.state.player;
            let stolen = (*amount).min(player.gold).max(0);
            player.gold -= stolen;
            ctx.note(format!("{name} stole {stolen} Gold"));
        }
    }
}

/// 行动后结算仪式、金属化与多层护甲；本回合刚获得的仪式不生效。
fn end_of_action(ctx: &mut ResolutionContext<'_>, index: usize, intent: &Intent) {
    let enemy = &mut ctx.state.enemies[index];
    if !enemy.is_alive() {
        return;
    }
    let statuses = &enemy.body.statuses;
    let ritual = statuses.get(Status::Ritual);
    let armor = statuses.get(Status::Metallicize) + statuses.get(Status::PlatedArmor);
    let fresh_ritual = intent.effects.iter().any(|effect| effect.status == Status::Ritual);
    if ritual > 0 && !fresh_ritual {
        enemy.body.statuses.add(Status::Strength, ritual);
    }
    enemy.body.gain_block(armor);
}

/// 敌人回合结束时持续型减益递减，暂时削去的力量归还。
pub fn end_of_enemy_turn(ctx: &mut ResolutionContext<'_>) {
    for enemy in ctx.state.enemies.iter_mut().filter(|enemy| enemy.is_alive()) {
        let statuses = &mut enemy.body.statuses;
        for status in Status::DURATIONS {
            statuses.decrement(status);
        }
        let shackled = statuses.get(Status::Shackled);
        if shackled > 0 {
            statuses.add(Status::Strength, shackled);
            statuses.clear(Status::Shackled);
        }
    }
}

/// 为刚死亡且带死亡规则的敌人排队分裂或复活。
fn queue_deaths(ctx: &mut ResolutionContext<'_>) {
    for enemy in ctx.state.enemies.iter_mut().filter(|enemy| !enemy.is_alive()) {
        match &enemy.on_death {
            Some(DeathRule::Split { .. }) if !enemy.flags.has_split => {
                enemy.flags.has_split = true;
                ctx.pending.push(PendingEnemyAction::Split {
                    enemy: enemy.instance_id,
                });
            }
            Some(DeathRule::Rebirth { hp_percent }) if !enemy.flags.reborn => {
                enemy.flags.reborn = true;
                ctx.pending.push(PendingEnemyAction::Revive {
                    enemy: enemy.instance_id,
                    hp_percent: *hp_percent,
                });
            }
            _ => {}
        }
    }
}

fn split_children(ctx: &mut ResolutionContext<'_>, index: usize) -> Vec<Enemy> {
    let parent = &ctx.state.enemies[index];
    let Some(DeathRule::Split { into, hp }) = parent.on_death.clone() else {
        return Vec::new();
    };
    let child_hp = match hp {
        SplitHp::HalfParentMax => Some(parent.body.max_hp / 2),
        SplitHp::ParentCurrent => Some(parent.body.hp),
        SplitHp::Template => None,
    };
    if child_hp == Some(0) {
        return Vec::new();
    }
    let name = parent.name.clone();
    let children: Vec<Enemy> = into
        .iter()
        .filter_map(|archetype| {
            spawn_enemy(ctx.state, ctx.content, ctx.rng, archetype, child_hp)
                .map_err(|error| tracing::warn!(%error, "split child skipped"))
                .ok()
        })
        .collect();
    ctx.note(format!("{name} split into {} enemies", children.len()));
    children
}

/// 处理待处理队列：复活、逃跑、分裂、召唤；随后移除死亡与离场的敌人，新敌人追加到末尾。
pub fn settle_enemies(ctx: &mut ResolutionContext<'_>) {
    queue_deaths(ctx);
    if ctx.pending.is_empty() && ctx.state.enemies.iter().all(|enemy| enemy.is_alive()) {
        return;
    }

    let mut departed: Vec<EnemyId> = Vec::new();
    let mut arrivals: Vec<Enemy> = Vec::new();
    for action in std::mem::take(&mut ctx.pending) {
        match action {
            PendingEnemyAction::Revive { enemy, hp_percent } => {
                if let Some(index) = ctx.state.find_enemy(enemy) {
                    let revived = &mut ctx.state.enemies[index];
                    revived.body.hp = (revived.body.max_hp * hp_percent / 100).max(1);
                    revived.body.block = 0;
                    revived.body.statuses = Default::default();
                    let name = revived.name.clone();
                    ctx.note(format!("{name} rose again"));
                }
            }
            PendingEnemyAction::Escape { enemy } => {
                if let Some(index) = ctx.state.find_enemy(enemy) {
                    let name = ctx.state.enemies[index].name.clone();
                    ctx.note(format!("{name} escaped"));
                }
                departed.push(enemy);
            }
            PendingEnemyAction::Split { enemy } => {
                if let Some(index) = ctx.state.find_enemy(enemy) {
                    arrivals.extend(split_children(ctx, index));
                }
                departed.push(enemy);
            }
            PendingEnemyAction::Spawn { archetype, hp } => {
                match spawn_enemy(ctx.state, ctx.content, ctx.rng, &archetype, hp) {
                    Ok(enemy) => arrivals.push(enemy),
                    Err(error) => tracing::warn!(%error, "spawn skipped"),
                }
            }
        }
    }

    ctx.state
        .enemies
        .retain(|enemy| enemy.is_alive() && !departed.contains(&enemy.instance_id));
    let turn = intent_turn(ctx.state);
    for mut enemy in arrivals {
        assign_intent(ctx.content, ctx.rng, &mut enemy, turn);
        ctx.note(format!("{} appeared", enemy.name));
        ctx.state.enemies.push(enemy);
    }
}
