//! 卡牌特殊效果注册表：标签 -> 处理器。
//!
//! 未注册的标签不会报错，只记一条 debug 日志。

use std::collections::HashMap;

use once_cell::sync::Lazy;

use super::effects::{play_card, PlayOptions, ResolutionContext};
use super::orbs::OrbKind;
use super::rng::pick;
use super::state::{
    BattleState, CardInstance, CardKind, InstanceId, PileKind, SelectionKind, SelectionRequest, Status,
};

pub type SpecialFn = fn(&mut ResolutionContext<'_>, &CardInstance) -> Option<SelectionRequest>;

/// 被消耗时返还能量的标签，消耗钩子直接识别它。
pub const SENTINEL_TAG: &str = "gainEnergyOnExhaust";

/// 可以无限次升级的牌。
pub const MULTI_UPGRADE_TAG: &str = "multiUpgrade";

/// 不可打出的牌上的标签：在抽到或回合结束时由钩子结算，不走处理器。
pub const PASSIVE_TAGS: [&str; 6] = [
    "burnDamage",
    "regretCurse",
    "decayCurse",
    "doubtCurse",
    "voidCard",
    "painCurse",
];

pub enum SpecialHandler {
    Effect {
        resolve: SpecialFn,
        /// 自行结算伤害，卡牌的常规伤害步骤跳过。
        deals_damage: bool,
    },
    /// 打出后给玩家加一个能力状态。
    Power { status: Status, stacking: bool },
    /// 每次打出后这张牌本场战斗的伤害增加 magic。
    Escalating,
}

impl SpecialHandler {
    fn effect(resolve: SpecialFn) -> Self {
        SpecialHandler::Effect {
            resolve,
            deals_damage: false,
        }
    }

    fn damage(resolve: SpecialFn) -> Self {
        SpecialHandler::Effect {
            resolve,
            deals_damage: true,
        }
    }

    fn stacking(status: Status) -> Self {
        SpecialHandler::Power { status, stacking: true }
    }

    fn flag(status: Status) -> Self {
        SpecialHandler::Power {
            status,
            stacking: false,
        }
    }

    pub fn deals_damage(&self) -> bool {
        matches!(self, SpecialHandler::Effect { deals_damage: true, .. })
    }

    pub fn resolve(&self, ctx: &mut ResolutionContext<'_>, card: &mut CardInstance) -> Option<SelectionRequest> {
        match self {
            SpecialHandler::Effect { resolve, .. } => resolve(ctx, card),
            SpecialHandler::Power { status, stacking } => {
                let statuses = &mut ctx.state.player.body.statuses;
                if *stacking {
                    statuses.add(*status, card.card.magic.max(1));
                } else {
                    statuses.set(*status, 1);
                }
                let value = statuses.get(*status);
                ctx.note(format!("{} is now {value}", status_label(*status)));
                None
            }
            SpecialHandler::Escalating => {
                card.bonus_damage += card.card.magic;
                let damage = card.damage().unwrap_or(0);
                ctx.note(format!("{} now deals {damage} damage", card.name()));
                None
            }
        }
    }
}

fn status_label(status: Status) -> String {
    format!("{status:?}")
}

static HANDLERS: Lazy<HashMap<&'static str, SpecialHandler>> = Lazy::new(|| {
    HashMap::from([
        // 自带伤害
        ("damageEqualBlock", SpecialHandler::damage(damage_equal_block)),
        ("bonusPerStrike", SpecialHandler::damage(bonus_per_strike)),
        ("xCost", SpecialHandler::damage(x_cost)),
        ("exhaustHandDamage", SpecialHandler::damage(exhaust_hand_damage)),
        ("lifesteal", SpecialHandler::damage(lifesteal)),
        ("damagePerStatus", SpecialHandler::damage(damage_per_status)),
        (MULTI_UPGRADE_TAG, SpecialHandler::damage(searing_blow)),
        // 选牌
        ("discardToDrawTop", SpecialHandler::effect(discard_to_draw_top)),
        ("handToDrawTop", SpecialHandler::effect(hand_to_draw_top)),
        ("upgradeInHand", SpecialHandler::effect(upgrade_in_hand)),
        ("copyCardInHand", SpecialHandler::effect(copy_card_in_hand)),
        ("retrieveExhausted", SpecialHandler::effect(retrieve_exhausted)),
        ("exhaustChoose", SpecialHandler::effect(exhaust_choose)),
        ("exhaustForDraw", SpecialHandler::effect(exhaust_for_draw)),
        ("scry", SpecialHandler::effect(scry)),
        // 即时效果
        ("upgradeAll", SpecialHandler::effect(upgrade_all)),
        ("addWound", SpecialHandler::effect(add_wound)),
        ("addDaze", SpecialHandler::effect(add_daze)),
        ("addShivs", SpecialHandler::effect(add_shivs)),
        ("bonusIfVulnerable", SpecialHandler::effect(bonus_if_vulnerable)),
        ("killForMaxHp", SpecialHandler::effect(kill_for_max_hp)),
        ("severSoul", SpecialHandler::effect(sever_soul)),
        ("exhaustRandom", SpecialHandler::effect(exhaust_random)),
        ("exhaustNonAttacksBlock", SpecialHandler::effect(exhaust_non_attacks_block)),
        ("doubleBlock", SpecialHandler::effect(double_block)),
        ("doubleStrength", SpecialHandler::effect(double_strength)),
        ("hpForEnergy", SpecialHandler::effect(hp_for_energy)),
        ("playTopCard", SpecialHandler::effect(play_top_card)),
        (SENTINEL_TAG, SpecialHandler::effect(|_, _| None)),
        ("channelLightning", SpecialHandler::effect(channel_lightning)),
        ("channelFrost", SpecialHandler::effect(channel_frost)),
        ("channelDark", SpecialHandler::effect(channel_dark)),
        ("channelPlasma", SpecialHandler::effect(channel_plasma)),
        ("dualcast", SpecialHandler::effect(dualcast)),
        ("evokeOrb", SpecialHandler::effect(evoke_orb)),
        ("strIfAttacking", SpecialHandler::effect(strength_if_attacking)),
        ("removeStrength", SpecialHandler::effect(remove_strength)),
        ("tempStrengthDown", SpecialHandler::effect(shackle)),
        ("gainStrengthOnKill", SpecialHandler::effect(strength_on_kill)),
        ("addRandomAttack", SpecialHandler::effect(add_random_attack)),
        ("addCopyToDiscard", SpecialHandler::effect(add_copy_to_discard)),
        ("addWoundsToHand", SpecialHandler::effect(add_wounds_to_hand)),
        ("addBurn", SpecialHandler::effect(add_burn)),
        ("combustStack", SpecialHandler::effect(combust_stack)),
        // 出牌条件与费用由规则层检查
        ("onlyAttacks", SpecialHandler::effect(|_, _| None)),
        ("costReduceOnHpLoss", SpecialHandler::effect(|_, _| None)),
        // 本场战斗成长
        ("escalatingDamage", SpecialHandler::Escalating),
        ("escalatingDamage8", SpecialHandler::Escalating),
        // 能力
        ("strengthEachTurn", SpecialHandler::stacking(Status::DemonForm)),
        ("drawOnExhaust", SpecialHandler::stacking(Status::DarkEmbrace)),
        ("blockOnExhaust", SpecialHandler::stacking(Status::FeelNoPain)),
        ("damageOnBlock", SpecialHandler::stacking(Status::Juggernaut)),
        ("strengthOnSelfHpLoss", SpecialHandler::stacking(Status::Rupture)),
        ("hpForDraw", SpecialHandler::stacking(Status::Brutality)),
        ("metallicize", SpecialHandler::stacking(Status::Metallicize)),
        ("hpForAoeDamage", SpecialHandler::stacking(Status::Combust)),
        ("retaliateOnHit", SpecialHandler::stacking(Status::FlameBarrier)),
        ("blockPerAttack", SpecialHandler::stacking(Status::Rage)),
        ("blockPerAttackEvolved", SpecialHandler::stacking(Status::Rage)),
        ("doubleNextAttack", SpecialHandler::stacking(Status::DoubleDamage)),
        ("doubleNextAttacks2", SpecialHandler::stacking(Status::DoubleDamage)),
        ("doubleNextAttacks3", SpecialHandler::stacking(Status::DoubleDamage)),
        ("drawOnStatus", SpecialHandler::stacking(Status::Evolve)),
        ("aoeOnStatus", SpecialHandler::stacking(Status::FireBreathing)),
        ("selfVulnForEnergy", SpecialHandler::stacking(Status::Berserk)),
        ("flexStrength", SpecialHandler::stacking(Status::TempStrength)),
        ("freeSkillsExhaust", SpecialHandler::flag(Status::Corruption)),
        ("retainAllBlock", SpecialHandler::flag(Status::Barricade)),
        ("cantDraw", SpecialHandler::flag(Status::NoDraw)),
    ])
});

pub fn lookup(tag: &str) -> Option<&'static SpecialHandler> {
    HANDLERS.get(tag)
}

pub fn is_registered(tag: &str) -> bool {
    HANDLERS.contains_key(tag)
}

/// 出牌条件：冲突只能在手牌全是攻击时打出。
pub fn play_condition_met(state: &BattleState, card: &CardInstance) -> bool {
    match card.card.special.as_deref() {
        Some("onlyAttacks") => state
            .piles
            .hand
            .iter()
            .all(|other| other.instance_id == card.instance_id || other.kind() == CardKind::Attack),
        _ => true,
    }
}

/// 费用减免：以血还血每失去一次生命便宜 1 点。
pub fn cost_reduction(state: &BattleState, card: &CardInstance) -> i32 {
    match card.card.special.as_deref() {
        Some("costReduceOnHpLoss") => state.times_hp_lost as i32,
        _ => 0,
    }
}

/// 技能牌也可能需要选定一个敌人。
pub fn targets_enemy(tag: &str) -> bool {
    matches!(tag, "strIfAttacking" | "removeStrength" | "tempStrengthDown")
}

fn magic(card: &CardInstance) -> u32 {
    card.card.magic.max(0) as u32
}

fn ids_where(cards: &[CardInstance], keep: impl Fn(&CardInstance) -> bool) -> Vec<InstanceId> {
    cards
        .iter()
        .filter(|card| keep(card))
        .map(|card| card.instance_id)
        .collect()
}

/// 没有可选的牌时不进入选牌阶段。
fn request(
    kind: SelectionKind,
    source: PileKind,
    remaining: u32,
    eligible: Vec<InstanceId>,
    amount: u32,
) -> Option<SelectionRequest> {
    if eligible.is_empty() || remaining == 0 {
        return None;
    }
    Some(SelectionRequest {
        kind,
        source,
        remaining: remaining.min(eligible.len() as u32),
        select_all: false,
        eligible,
        amount,
    })
}

fn live_target(ctx: &ResolutionContext<'_>) -> Option<usize> {
    ctx.target
        .filter(|index| ctx.state.enemies.get(*index).is_some_and(|enemy| enemy.is_alive()))
}

fn base_damage(card: &CardInstance) -> i32 {
    card.damage().unwrap_or(0)
}

fn damage_equal_block(ctx: &mut ResolutionContext<'_>, _card: &CardInstance) -> Option<SelectionRequest> {
    let block = ctx.state.player.body.block;
    if let Some(index) = live_target(ctx) {
        ctx.attack_enemy(index, block);
    }
    None
}

/// 打出的牌本身已离开牌堆，计数时补上它。
fn bonus_per_strike(ctx: &mut ResolutionContext<'_>, card: &CardInstance) -> Option<SelectionRequest> {
    let piles = &ctx.state.piles;
    let strikes = [&piles.draw, &piles.hand, &piles.discard, &piles.exhaust]
        .into_iter()
        .flatten()
        .filter(|other| other.card.is_strike())
        .count() as i32
        + i32::from(card.card.is_strike());
    let damage = base_damage(card) + strikes * card.card.magic;
    if let Some(index) = live_target(ctx) {
        ctx.attack_enemy(index, damage);
    }
    None
}

fn x_cost(ctx: &mut ResolutionContext<'_>, card: &CardInstance) -> Option<SelectionRequest> {
    for _ in 0..ctx.energy_spent.max(0) {
        for index in ctx.state.living_enemy_indices() {
            ctx.attack_enemy(index, base_damage(card));
        }
        if ctx.battle_won() {
            break;
        }
    }
    None
}

fn exhaust_hand_damage(ctx: &mut ResolutionContext<'_>, card: &CardInstance) -> Option<SelectionRequest> {
    let hand = ids_where(&ctx.state.piles.hand, |_| true);
    let exhausted = hand
        .into_iter()
        .filter(|id| ctx.exhaust_card(PileKind::Hand, *id))
        .count();
    for _ in 0..exhausted {
        let Some(index) = live_target(ctx) else {
            break;
        };
        ctx.attack_enemy(index, base_damage(card));
    }
    None
}

fn lifesteal(ctx: &mut ResolutionContext<'_>, card: &CardInstance) -> Option<SelectionRequest> {
    let stolen: i32 = ctx
        .state
        .living_enemy_indices()
        .into_iter()
        .filter_map(|index| ctx.attack_enemy(index, base_damage(card)))
        .map(|outcome| outcome.hp_lost)
        .sum();
    let healed = ctx.state.player.body.heal(stolen);
    if healed > 0 {
        ctx.note(format!("Healed {healed} HP"));
    }
    None
}

/// 手中每张状态或诅咒牌让伤害多一份。
fn damage_per_status(ctx: &mut ResolutionContext<'_>, card: &CardInstance) -> Option<SelectionRequest> {
    let statuses = ctx
        .state
        .piles
        .hand
        .iter()
        .filter(|other| matches!(other.kind(), CardKind::Status | CardKind::Curse))
        .count() as i32;
    if statuses == 0 {
        ctx.note(format!("{} found no Status cards in hand", card.name()));
        return None;
    }
    for index in ctx.state.living_enemy_indices() {
        ctx.attack_enemy(index, base_damage(card) * statuses);
    }
    None
}

/// 第 n 次升级额外 n*4 + n(n-1)/2 伤害。
fn searing_blow(ctx: &mut ResolutionContext<'_>, card: &CardInstance) -> Option<SelectionRequest> {
    let times = card.times_upgraded as i32;
    let damage = base_damage(card) + times * 4 + times * (times - 1) / 2;
    if let Some(index) = live_target(ctx) {
        ctx.attack_enemy(index, damage);
    }
    None
}

fn discard_to_draw_top(ctx: &mut ResolutionContext<'_>, card: &CardInstance) -> Option<SelectionRequest> {
    let eligible = ids_where(&ctx.state.piles.discard, |_| true);
    request(
        SelectionKind::DiscardToDrawTop,
        PileKind::Discard,
        magic(card).max(1),
        eligible,
        0,
    )
}

fn hand_to_draw_top(ctx: &mut ResolutionContext<'_>, card: &CardInstance) -> Option<SelectionRequest> {
    let eligible = ids_where(&ctx.state.piles.hand, |_| true);
    request(SelectionKind::HandToDrawTop, PileKind::Hand, magic(card).max(1), eligible, 0)
}

pub fn upgradable(card: &CardInstance) -> bool {
    card.card.upgrade.is_some()
        && (!card.upgraded || card.card.special.as_deref() == Some(MULTI_UPGRADE_TAG))
}

fn upgrade_in_hand(ctx: &mut ResolutionContext<'_>, card: &CardInstance) -> Option<SelectionRequest> {
    let eligible = ids_where(&ctx.state.piles.hand, upgradable);
    request(SelectionKind::UpgradeInHand, PileKind::Hand, magic(card).max(1), eligible, 0)
}

fn upgrade_all(ctx: &mut ResolutionContext<'_>, _card: &CardInstance) -> Option<SelectionRequest> {
    for id in ids_where(&ctx.state.piles.hand, upgradable) {
        ctx.upgrade_card(PileKind::Hand, id);
    }
    None
}

fn copy_card_in_hand(ctx: &mut ResolutionContext<'_>, card: &CardInstance) -> Option<SelectionRequest> {
    let eligible = ids_where(&ctx.state.piles.hand, |other| {
        matches!(other.kind(), CardKind::Attack | CardKind::Power)
    });
    request(SelectionKind::CopyInHand, PileKind::Hand, 1, eligible, magic(card).max(1))
}

fn retrieve_exhausted(ctx: &mut ResolutionContext<'_>, card: &CardInstance) -> Option<SelectionRequest> {
    let own_id = card.id().to_string();
    let eligible = ids_where(&ctx.state.piles.exhaust, |other| other.id() != own_id);
    request(
        SelectionKind::RetrieveExhausted,
        PileKind::Exhaust,
        magic(card).max(1),
        eligible,
        0,
    )
}

fn exhaust_choose(ctx: &mut ResolutionContext<'_>, card: &CardInstance) -> Option<SelectionRequest> {
    let eligible = ids_where(&ctx.state.piles.hand, |_| true);
    request(SelectionKind::ExhaustChoose, PileKind::Hand, magic(card).max(1), eligible, 0)
}

fn exhaust_for_draw(ctx: &mut ResolutionContext<'_>, card: &CardInstance) -> Option<SelectionRequest> {
    let eligible = ids_where(&ctx.state.piles.hand, |_| true);
    request(SelectionKind::ExhaustForDraw, PileKind::Hand, 1, eligible, magic(card))
}

/// 预见：抽牌堆顶 N 张，逐张选择丢弃。
fn scry(ctx: &mut ResolutionContext<'_>, card: &CardInstance) -> Option<SelectionRequest> {
    let eligible: Vec<InstanceId> = ctx
        .state
        .piles
        .draw
        .iter()
        .take(magic(card) as usize)
        .map(|other| other.instance_id)
        .collect();
    let remaining = eligible.len() as u32;
    request(SelectionKind::Scry, PileKind::Draw, remaining, eligible, 0)
}

fn add_copies(ctx: &mut ResolutionContext<'_>, card_id: &str, count: u32, pile: PileKind) {
    for _ in 0..count {
        ctx.add_card(card_id, pile);
    }
}

fn add_wound(ctx: &mut ResolutionContext<'_>, card: &CardInstance) -> Option<SelectionRequest> {
    add_copies(ctx, "wound", magic(card).max(1), PileKind::Draw);
    None
}

fn add_daze(ctx: &mut ResolutionContext<'_>, card: &CardInstance) -> Option<SelectionRequest> {
    add_copies(ctx, "dazed", magic(card).max(1), PileKind::Draw);
    None
}

fn add_shivs(ctx: &mut ResolutionContext<'_>, card: &CardInstance) -> Option<SelectionRequest> {
    add_copies(ctx, "shiv", magic(card), PileKind::Hand);
    None
}

fn add_wounds_to_hand(ctx: &mut ResolutionContext<'_>, card: &CardInstance) -> Option<SelectionRequest> {
    add_copies(ctx, "wound", magic(card).max(1), PileKind::Hand);
    None
}

fn add_burn(ctx: &mut ResolutionContext<'_>, card: &CardInstance) -> Option<SelectionRequest> {
    add_copies(ctx, "burn", magic(card).max(1), PileKind::Discard);
    None
}

fn add_copy_to_discard(ctx: &mut ResolutionContext<'_>, card: &CardInstance) -> Option<SelectionRequest> {
    ctx.copy_card(card, PileKind::Discard);
    ctx.note(format!("Added a copy of {} to Discard", card.name()));
    None
}

/// 随机一张攻击牌进手牌，本场战斗费用为 0。
fn add_random_attack(ctx: &mut ResolutionContext<'_>, _card: &CardInstance) -> Option<SelectionRequest> {
    let content = ctx.content;
    let attacks: Vec<String> = content
        .random_card_pool()
        .into_iter()
        .filter(|id| content.card_template(id).is_some_and(|template| template.kind == CardKind::Attack))
        .map(str::to_string)
        .collect();
    if let Some(card_id) = pick(ctx.rng, &attacks).cloned() {
        ctx.add_card_costing(&card_id, PileKind::Hand, Some(0));
    }
    None
}

fn strength_if_attacking(ctx: &mut ResolutionContext<'_>, card: &CardInstance) -> Option<SelectionRequest> {
    let attacking = live_target(ctx)
        .and_then(|index| ctx.state.enemies[index].intent.as_ref())
        .is_some_and(|intent| intent.is_attack());
    if attacking {
        ctx.apply_status_to_player(Status::Strength, card.card.magic);
    }
    None
}

fn remove_strength(ctx: &mut ResolutionContext<'_>, card: &CardInstance) -> Option<SelectionRequest> {
    if let Some(index) = live_target(ctx) {
        ctx.apply_status_to_enemy(index, Status::Strength, -card.card.magic);
    }
    None
}

/// 削去的力量记在 `Shackled` 上，敌方回合结束时归还。
fn shackle(ctx: &mut ResolutionContext<'_>, card: &CardInstance) -> Option<SelectionRequest> {
    let Some(index) = live_target(ctx) else {
        return None;
    };
    let amount = card.card.magic;
    if ctx.apply_status_to_enemy(index, Status::Strength, -amount) {
        ctx.state.enemies[index].body.statuses.add(Status::Shackled, amount);
    }
    None
}

fn strength_on_kill(ctx: &mut ResolutionContext<'_>, card: &CardInstance) -> Option<SelectionRequest> {
    let killed = ctx
        .target
        .and_then(|index| ctx.state.enemies.get(index))
        .is_some_and(|enemy| !enemy.is_alive());
    if killed {
        ctx.state.player.body.statuses.add(Status::Strength, card.card.magic);
        ctx.note(format!("Gained {} Strength from the kill", card.card.magic));
    }
    None
}

/// 已有燃烧时再叠加，每回合的生命流失也多 1。
fn combust_stack(ctx: &mut ResolutionContext<'_>, card: &CardInstance) -> Option<SelectionRequest> {
    let statuses = &mut ctx.state.player.body.statuses;
    if statuses.has(Status::Combust) {
        statuses.add(Status::CombustHpLoss, 1);
    }
    statuses.add(Status::Combust, card.card.magic.max(1));
    let damage = statuses.get(Status::Combust);
    ctx.note(format!("Combust stacked: {damage} damage per turn"));
    None
}

fn bonus_if_vulnerable(ctx: &mut ResolutionContext<'_>, card: &CardInstance) -> Option<SelectionRequest> {
    let vulnerable = live_target(ctx)
        .is_some_and(|index| ctx.state.enemies[index].body.statuses.has(Status::Vulnerable));
    if vulnerable {
        ctx.state.player.energy += card.card.magic;
        ctx.draw(magic(card));
    }
    None
}

fn kill_for_max_hp(ctx: &mut ResolutionContext<'_>, card: &CardInstance) -> Option<SelectionRequest> {
    let killed = ctx
        .target
        .and_then(|index| ctx.state.enemies.get(index))
        .is_some_and(|enemy| !enemy.is_alive());
    if killed {
        let body = &mut ctx.state.player.body;
        body.max_hp += card.card.magic;
        body.hp += card.card.magic;
        ctx.note(format!("Gained {} Max HP", card.card.magic));
    }
    None
}

fn exhaust_matching(ctx: &mut ResolutionContext<'_>, keep: impl Fn(&CardInstance) -> bool) -> usize {
    ids_where(&ctx.state.piles.hand, keep)
        .into_iter()
        .filter(|id| ctx.exhaust_card(PileKind::Hand, *id))
        .count()
}

fn sever_soul(ctx: &mut ResolutionContext<'_>, _card: &CardInstance) -> Option<SelectionRequest> {
    exhaust_matching(ctx, |other| other.kind() != CardKind::Attack);
    None
}

fn exhaust_random(ctx: &mut ResolutionContext<'_>, _card: &CardInstance) -> Option<SelectionRequest> {
    let hand = ids_where(&ctx.state.piles.hand, |_| true);
    if let Some(&id) = pick(ctx.rng, &hand) {
        ctx.exhaust_card(PileKind::Hand, id);
    }
    None
}

fn exhaust_non_attacks_block(ctx: &mut ResolutionContext<'_>, card: &CardInstance) -> Option<SelectionRequest> {
    let exhausted = exhaust_matching(ctx, |other| other.kind() != CardKind::Attack) as i32;
    if exhausted > 0 {
        ctx.gain_block(exhausted * card.card.magic);
    }
    None
}

fn double_block(ctx: &mut ResolutionContext<'_>, _card: &CardInstance) -> Option<SelectionRequest> {
    let block = ctx.state.player.body.block;
    ctx.state.player.body.gain_block(block);
    None
}

fn double_strength(ctx: &mut ResolutionContext<'_>, _card: &CardInstance) -> Option<SelectionRequest> {
    let strength = ctx.state.player.body.statuses.get(Status::Strength);
    if strength > 0 {
        ctx.state.player.body.statuses.add(Status::Strength, strength);
        ctx.note(format!("Strength doubled to {}", strength * 2));
    }
    None
}

/// 生命代价由模板的 `hp_cost` 在结算前支付。
fn hp_for_energy(ctx: &mut ResolutionContext<'_>, card: &CardInstance) -> Option<SelectionRequest> {
    let energy = card.card.magic;
    ctx.state.player.energy += energy;
    ctx.note(format!("{} granted {energy} Energy", card.name()));
    None
}

/// 打出抽牌堆顶的牌并消耗它；不可打出的牌直接消耗。
fn play_top_card(ctx: &mut ResolutionContext<'_>, _card: &CardInstance) -> Option<SelectionRequest> {
    if ctx.state.piles.draw.is_empty() {
        return None;
    }
    let top = ctx.state.piles.draw.remove(0);
    if top.card.unplayable {
        ctx.note(format!("Exhausted {}", top.name()));
        ctx.state.piles.exhaust.push(top.clone());
        ctx.on_card_exhausted(&top);
        return None;
    }

    let living = ctx.state.living_enemy_indices();
    let target = pick(ctx.rng, &living).copied();
    let previous = std::mem::replace(&mut ctx.target, target);
    let spent = ctx.energy_spent;
    play_card(
        ctx,
        top,
        PlayOptions {
            energy_spent: 0,
            force_exhaust: true,
        },
    );
    ctx.target = previous;
    ctx.energy_spent = spent;
    None
}

fn channel_times(ctx: &mut ResolutionContext<'_>, card: &CardInstance, kind: OrbKind) {
    for _ in 0..magic(card).max(1) {
        ctx.channel(kind);
    }
}

fn channel_lightning(ctx: &mut ResolutionContext<'_>, card: &CardInstance) -> Option<SelectionRequest> {
    channel_times(ctx, card, OrbKind::Lightning);
    None
}

fn channel_frost(ctx: &mut ResolutionContext<'_>, card: &CardInstance) -> Option<SelectionRequest> {
    channel_times(ctx, card, OrbKind::Frost);
    None
}

fn channel_dark(ctx: &mut ResolutionContext<'_>, card: &CardInstance) -> Option<SelectionRequest> {
    channel_times(ctx, card, OrbKind::Dark);
    None
}

fn channel_plasma(ctx: &mut ResolutionContext<'_>, card: &CardInstance) -> Option<SelectionRequest> {
    channel_times(ctx, card, OrbKind::Plasma);
    None
}

fn dualcast(ctx: &mut ResolutionContext<'_>, _card: &CardInstance) -> Option<SelectionRequest> {
    ctx.dualcast();
    None
}

fn evoke_orb(ctx: &mut ResolutionContext<'_>, card: &CardInstance) -> Option<SelectionRequest> {
    ctx.evoke(magic(card).max(1));
    None
}

/// 回合结束仍在手中的状态牌与诅咒。
pub fn end_of_turn_in_hand(ctx: &mut ResolutionContext<'_>, card: &CardInstance, hand_size: usize) {
    let amount = card.card.magic;
    match card.card.special.as_deref() {
        Some("burnDamage") | Some("decayCurse") => {
            ctx.lose_hp(amount, card.name());
        }
        Some("regretCurse") => {
            ctx.lose_hp(hand_size as i32, card.name());
        }
        Some("doubtCurse") => {
            ctx.apply_status_to_player(Status::Weak, amount.max(1));
        }
        _ => {}
    }
}

/// 抽到一张牌时的钩子：进化、火焰吐息、虚空、疼痛。
pub fn on_draw(ctx: &mut ResolutionContext<'_>, card: &CardInstance) {
    let kind = card.kind();
    let evolve = ctx.state.player.body.statuses.get(Status::Evolve);
    if kind == CardKind::Status && evolve > 0 {
        ctx.note(format!("Evolve drew {evolve} card(s)"));
        ctx.draw(evolve as u32);
    }
    let fire_breathing = ctx.state.player.body.statuses.get(Status::FireBreathing);
    if matches!(kind, CardKind::Status | CardKind::Curse) && fire_breathing > 0 {
        for index in ctx.state.living_enemy_indices() {
            ctx.damage_enemy_flat(index, fire_breathing, "Fire Breathing");
        }
    }
    match card.card.special.as_deref() {
        Some("voidCard") => {
            let drained = card.card.magic.max(1).min(ctx.state.player.energy.max(0));
            ctx.state.player.energy -= drained;
            ctx.note(format!("{} drained {drained} Energy", card.name()));
        }
        Some("painCurse") => {
            ctx.lose_hp(card.card.magic.max(1), card.name());
        }
        _ => {}
    }
}

/// 处理一次选牌；返回仍需继续的请求。
pub fn apply_selection(
    ctx: &mut ResolutionContext<'_>,
    request: &SelectionRequest,
    chosen: InstanceId,
) -> Option<SelectionRequest> {
    let targets = if request.select_all {
        request.eligible.clone()
    } else {
        vec![chosen]
    };
    for id in targets {
        apply_choice(ctx, request, id);
    }
    if request.select_all {
        return None;
    }

    let mut next = request.clone();
    next.remaining = next.remaining.saturating_sub(1);
    next.eligible
        .retain(|id| *id != chosen && ctx.state.piles.find(next.source, *id).is_some());
    (next.remaining > 0 && !next.eligible.is_empty()).then_some(next)
}

fn apply_choice(ctx: &mut ResolutionContext<'_>, request: &SelectionRequest, id: InstanceId) {
    let piles = &mut ctx.state.piles;
    match request.kind {
        SelectionKind::DiscardToDrawTop => {
            piles.move_card(id, PileKind::Discard, PileKind::Draw);
            ctx.note("Put a card on top of the draw pile");
        }
        SelectionKind::HandToDrawTop => {
            piles.move_card(id, PileKind::Hand, PileKind::Draw);
            ctx.note("Put a card on top of the draw pile");
        }
        SelectionKind::UpgradeInHand => {
            ctx.upgrade_card(PileKind::Hand, id);
        }
        SelectionKind::CopyInHand => {
            let Some(source) = piles.find(PileKind::Hand, id).cloned() else {
                return;
            };
            for _ in 0..request.amount.max(1) {
                ctx.copy_card(&source, PileKind::Hand);
            }
            ctx.note(format!("Copied {}", source.name()));
        }
        SelectionKind::RetrieveExhausted => {
            let destination = if piles.hand.len() >= ctx.config.max_hand_size {
                PileKind::Discard
            } else {
                PileKind::Hand
            };
            if piles.move_card(id, PileKind::Exhaust, destination) {
                ctx.note("Returned a card from the exhaust pile");
            }
        }
        SelectionKind::ExhaustChoose => {
            ctx.exhaust_card(PileKind::Hand, id);
        }
        SelectionKind::ExhaustForDraw => {
            if ctx.exhaust_card(PileKind::Hand, id) {
                ctx.draw(request.amount);
            }
        }
        SelectionKind::Scry => {
            if piles.move_card(id, PileKind::Draw, PileKind::Discard) {
                ctx.note("Scried a card into the discard pile");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::game::content::{ContentCatalog, ContentTables};
    use crate::game::enemy_phase::end_of_enemy_turn;
    use crate::game::rng::SeededRng;
    use crate::game::state::{BattleState, Combatant, Enemy, EnemyFlags, Player};

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

    fn battle(enemies: Vec<Enemy>) -> BattleState {
        let mut state = BattleState::new(Player::new(80, 80, 3));
        state.enemies = enemies;
        state.turn = 1;
        state
    }

    fn card(state: &mut BattleState, id: &str) -> CardInstance {
        let template = ContentCatalog::standard()
            .card(id)
            .expect("card should exist in the standard catalog");
        state.instantiate(template)
    }

    fn hand(state: &mut BattleState, ids: &[&str]) -> Vec<InstanceId> {
        ids.iter()
            .map(|id| {
                let instance = card(state, id);
                let instance_id = instance.instance_id;
                state.piles.hand.push(instance);
                instance_id
            })
            .collect()
    }

    #[test]
    fn every_catalog_special_is_registered_or_passive() {
        let catalog = ContentCatalog::standard();
        for id in catalog.cards.keys() {
            let template = catalog.card_template(id).expect("listed card should resolve");
            if let Some(tag) = template.special.as_deref() {
                assert!(
                    is_registered(tag) || PASSIVE_TAGS.contains(&tag),
                    "{id} uses unregistered tag {tag}"
                );
            }
        }
    }

    #[test]
    fn perfected_strike_counts_itself_and_every_pile() {
        let mut state = battle(vec![enemy(1, 60)]);
        hand(&mut state, &["strike", "defend"]);
        let extra = card(&mut state, "twin_strike");
        state.piles.discard.push(extra);
        let perfected = card(&mut state, "perfected_strike");
        let (content, config, mut rng) = (ContentCatalog::standard(), EngineConfig::default(), SeededRng::from_seed(1));
        let mut ctx = ResolutionContext::new(&mut state, &mut rng, &content, &config).with_target(Some(0));

        play_card(&mut ctx, perfected, PlayOptions::default());
        assert_eq!(state.enemies[0].body.hp, 60 - (6 + 3 * 2), "strike, twin strike and itself");
    }

    #[test]
    fn body_slam_uses_current_block_once() {
        let mut state = battle(vec![enemy(1, 60)]);
        state.player.body.block = 11;
        let slam = card(&mut state, "body_slam");
        let (content, config, mut rng) = (ContentCatalog::standard(), EngineConfig::default(), SeededRng::from_seed(1));
        let mut ctx = ResolutionContext::new(&mut state, &mut rng, &content, &config).with_target(Some(0));

        play_card(&mut ctx, slam, PlayOptions::default());
        assert_eq!(state.enemies[0].body.hp, 49);
    }

    #[test]
    fn whirlwind_hits_once_per_energy_spent() {
        let mut state = battle(vec![enemy(1, 40), enemy(2, 40)]);
        let whirlwind = card(&mut state, "whirlwind");
        let (content, config, mut rng) = (ContentCatalog::standard(), EngineConfig::default(), SeededRng::from_seed(1));
        let mut ctx = ResolutionContext::new(&mut state, &mut rng, &content, &config);

        play_card(
            &mut ctx,
            whirlwind,
            PlayOptions {
                energy_spent: 3,
                force_exhaust: false,
            },
        );
        assert_eq!(state.enemies[0].body.hp, 25);
        assert_eq!(state.enemies[1].body.hp, 25);
    }

    #[test]
    fn fiend_fire_exhausts_hand_and_hits_per_card() {
        let mut state = battle(vec![enemy(1, 60)]);
        hand(&mut state, &["strike", "defend", "wound"]);
        let fiend = card(&mut state, "fiend_fire");
        let (content, config, mut rng) = (ContentCatalog::standard(), EngineConfig::default(), SeededRng::from_seed(1));
        let mut ctx = ResolutionContext::new(&mut state, &mut rng, &content, &config).with_target(Some(0));

        play_card(&mut ctx, fiend, PlayOptions::default());
        assert_eq!(state.enemies[0].body.hp, 60 - 21);
        assert!(state.piles.hand.is_empty());
        assert_eq!(state.piles.exhaust.len(), 4, "three from hand plus fiend fire itself");
    }

    #[test]
    fn selection_skips_when_nothing_is_eligible() {
        let mut state = battle(vec![enemy(1, 60)]);
        let headbutt = card(&mut state, "headbutt");
        let (content, config, mut rng) = (ContentCatalog::standard(), EngineConfig::default(), SeededRng::from_seed(1));
        let mut ctx = ResolutionContext::new(&mut state, &mut rng, &content, &config).with_target(Some(0));

        assert!(play_card(&mut ctx, headbutt, PlayOptions::default()).is_none());
    }

    #[test]
    fn played_card_is_never_eligible_for_its_own_selection() {
        let mut state = battle(vec![enemy(1, 60)]);
        let existing = card(&mut state, "defend");
        let existing_id = existing.instance_id;
        state.piles.discard.push(existing);
        let headbutt = card(&mut state, "headbutt");
        let headbutt_id = headbutt.instance_id;
        let (content, config, mut rng) = (ContentCatalog::standard(), EngineConfig::default(), SeededRng::from_seed(1));
        let mut ctx = ResolutionContext::new(&mut state, &mut rng, &content, &config).with_target(Some(0));

        let selection = play_card(&mut ctx, headbutt, PlayOptions::default()).expect("discard has a card");
        assert_eq!(selection.eligible, vec![existing_id]);
        assert!(state.piles.discard.iter().any(|c| c.instance_id == headbutt_id));
    }

    #[test]
    fn exhaust_choose_continues_until_remaining_runs_out() {
        let mut state = battle(vec![enemy(1, 60)]);
        let ids = hand(&mut state, &["strike", "defend", "bash"]);
        let (content, config, mut rng) = (ContentCatalog::standard(), EngineConfig::default(), SeededRng::from_seed(1));
        let mut ctx = ResolutionContext::new(&mut state, &mut rng, &content, &config);
        let selection = request(SelectionKind::ExhaustChoose, PileKind::Hand, 2, ids.clone(), 0)
            .expect("hand has cards");

        let next = apply_selection(&mut ctx, &selection, ids[0]).expect("one more pick remains");
        assert_eq!(next.remaining, 1);
        assert_eq!(next.eligible, vec![ids[1], ids[2]]);
        assert!(apply_selection(&mut ctx, &next, ids[2]).is_none());
        assert_eq!(state.piles.exhaust.len(), 2);
        assert_eq!(state.piles.hand.len(), 1);
    }

    #[test]
    fn select_all_applies_to_every_eligible_card() {
        let mut state = battle(vec![enemy(1, 60)]);
        let ids = hand(&mut state, &["strike", "defend"]);
        let (content, config, mut rng) = (ContentCatalog::standard(), EngineConfig::default(), SeededRng::from_seed(1));
        let mut ctx = ResolutionContext::new(&mut state, &mut rng, &content, &config);
        let mut selection = request(SelectionKind::UpgradeInHand, PileKind::Hand, 1, ids.clone(), 0)
            .expect("hand has cards");
        selection.select_all = true;

        assert!(apply_selection(&mut ctx, &selection, ids[0]).is_none());
        assert!(state.piles.hand.iter().all(|c| c.upgraded));
        assert_eq!(state.piles.hand[0].id(), "strike+");
    }

    #[test]
    fn upgrade_all_does_not_suspend() {
        let mut state = battle(vec![enemy(1, 60)]);
        hand(&mut state, &["strike", "bash", "wound"]);
        let armaments = card(&mut state, "armaments+");
        let (content, config, mut rng) = (ContentCatalog::standard(), EngineConfig::default(), SeededRng::from_seed(1));
        let mut ctx = ResolutionContext::new(&mut state, &mut rng, &content, &config);

        assert!(play_card(&mut ctx, armaments, PlayOptions::default()).is_none());
        let upgraded: Vec<&str> = state.piles.hand.iter().map(|c| c.id()).collect();
        assert_eq!(upgraded, vec!["strike+", "bash+", "wound"]);
    }

    #[test]
    fn scry_discards_chosen_cards_from_the_top() {
        let mut state = battle(vec![enemy(1, 60)]);
        let top: Vec<CardInstance> = ["strike", "defend", "bash", "cleave"]
            .iter()
            .map(|id| card(&mut state, id))
            .collect();
        let top_ids: Vec<InstanceId> = top.iter().map(|c| c.instance_id).collect();
        state.piles.draw = top;
        let third_eye = card(&mut state, "third_eye");
        let (content, config, mut rng) = (ContentCatalog::standard(), EngineConfig::default(), SeededRng::from_seed(1));
        let mut ctx = ResolutionContext::new(&mut state, &mut rng, &content, &config);

        let selection = play_card(&mut ctx, third_eye, PlayOptions::default()).expect("draw pile has cards");
        assert_eq!(selection.eligible, top_ids[..3].to_vec());
        let next = apply_selection(&mut ctx, &selection, top_ids[1]).expect("two scried cards remain");
        assert_eq!(next.remaining, 2);
        assert!(state.piles.discard.iter().any(|c| c.instance_id == top_ids[1]));
    }

    #[test]
    fn havoc_plays_and_exhausts_the_top_card() {
        let mut state = battle(vec![enemy(1, 60)]);
        let top = card(&mut state, "strike");
        state.piles.draw.push(top);
        let havoc = card(&mut state, "havoc");
        let (content, config, mut rng) = (ContentCatalog::standard(), EngineConfig::default(), SeededRng::from_seed(1));
        let mut ctx = ResolutionContext::new(&mut state, &mut rng, &content, &config);

        play_card(&mut ctx, havoc, PlayOptions::default());
        assert_eq!(state.enemies[0].body.hp, 54);
        assert_eq!(state.piles.exhaust.len(), 1);
        assert_eq!(state.piles.discard.len(), 1, "havoc itself is discarded");
    }

    #[test]
    fn power_tags_stack_or_flag() {
        let mut state = battle(vec![enemy(1, 60)]);
        let first = card(&mut state, "demon_form");
        let second = card(&mut state, "demon_form");
        let barricade = card(&mut state, "barricade");
        let (content, config, mut rng) = (ContentCatalog::standard(), EngineConfig::default(), SeededRng::from_seed(1));
        let mut ctx = ResolutionContext::new(&mut state, &mut rng, &content, &config);

        play_card(&mut ctx, first, PlayOptions::default());
        play_card(&mut ctx, second, PlayOptions::default());
        play_card(&mut ctx, barricade, PlayOptions::default());
        assert_eq!(state.player.body.statuses.get(Status::DemonForm), 4);
        assert_eq!(state.player.body.statuses.get(Status::Barricade), 1);
    }

    #[test]
    fn burns_in_hand_ignore_block() {
        let mut state = battle(vec![enemy(1, 60)]);
        state.player.body.block = 10;
        let burns: Vec<CardInstance> = (0..5).map(|_| card(&mut state, "burn")).collect();
        let (content, config, mut rng) = (ContentCatalog::standard(), EngineConfig::default(), SeededRng::from_seed(1));
        let mut ctx = ResolutionContext::new(&mut state, &mut rng, &content, &config);

        for burn in &burns {
            end_of_turn_in_hand(&mut ctx, burn, burns.len());
        }
        assert_eq!(state.player.body.hp, 70);
        assert_eq!(state.player.body.block, 10);
    }

    #[test]
    fn lethal_decay_ends_the_run_through_hp_loss() {
        let mut state = battle(vec![enemy(1, 60)]);
        state.player.body.hp = 2;
        state.player.body.block = 30;
        let decay = card(&mut state, "decay");
        let (content, config, mut rng) = (ContentCatalog::standard(), EngineConfig::default(), SeededRng::from_seed(1));
        let mut ctx = ResolutionContext::new(&mut state, &mut rng, &content, &config);

        end_of_turn_in_hand(&mut ctx, &decay, 1);
        assert!(ctx.player_dead());
    }

    #[test]
    fn bloodletting_cost_comes_from_the_template() {
        let mut state = battle(vec![enemy(1, 60)]);
        let mut bloodletting = card(&mut state, "bloodletting");
        assert_eq!(bloodletting.card.hp_cost, 3);
        bloodletting.card.hp_cost = 5;
        let (content, config, mut rng) = (ContentCatalog::standard(), EngineConfig::default(), SeededRng::from_seed(1));
        let mut ctx = ResolutionContext::new(&mut state, &mut rng, &content, &config);

        play_card(&mut ctx, bloodletting, PlayOptions::default());
        assert_eq!(state.player.body.hp, 75);
        assert_eq!(state.player.energy, 5);
    }

    #[test]
    fn regret_costs_hp_per_card_in_hand() {
        let mut state = battle(vec![enemy(1, 60)]);
        let regret = card(&mut state, "regret");
        let (content, config, mut rng) = (ContentCatalog::standard(), EngineConfig::default(), SeededRng::from_seed(1));
        let mut ctx = ResolutionContext::new(&mut state, &mut rng, &content, &config);

        end_of_turn_in_hand(&mut ctx, &regret, 4);
        assert_eq!(state.player.body.hp, 76);
    }

    #[test]
    fn double_tap_variants_stack_double_damage() {
        let mut state = battle(vec![enemy(1, 60)]);
        let tap = card(&mut state, "double_tap");
        let strikes = [card(&mut state, "strike"), card(&mut state, "strike")];
        let (content, config, mut rng) = (ContentCatalog::standard(), EngineConfig::default(), SeededRng::from_seed(1));
        let mut ctx = ResolutionContext::new(&mut state, &mut rng, &content, &config).with_target(Some(0));

        play_card(&mut ctx, tap, PlayOptions::default());
        assert_eq!(ctx.state.player.body.statuses.get(Status::DoubleDamage), 1);
        for strike in strikes {
            play_card(&mut ctx, strike, PlayOptions::default());
        }
        assert_eq!(state.enemies[0].body.hp, 60 - 12 - 6, "only the first strike is doubled");

        for (id, stacks) in [("double_tap+", 2), ("double_tap_plus+", 3)] {
            let mut state = battle(vec![enemy(1, 60)]);
            let tap = card(&mut state, id);
            let mut rng = SeededRng::from_seed(1);
            let mut ctx = ResolutionContext::new(&mut state, &mut rng, &content, &config);
            play_card(&mut ctx, tap, PlayOptions::default());
            assert_eq!(state.player.body.statuses.get(Status::DoubleDamage), stacks, "{id}");
        }
    }

    #[test]
    fn rampage_grows_every_time_it_is_played() {
        let mut state = battle(vec![enemy(1, 60)]);
        let rampage = card(&mut state, "rampage");
        let (content, config, mut rng) = (ContentCatalog::standard(), EngineConfig::default(), SeededRng::from_seed(1));
        let mut ctx = ResolutionContext::new(&mut state, &mut rng, &content, &config).with_target(Some(0));

        play_card(&mut ctx, rampage, PlayOptions::default());
        let again = ctx.state.piles.discard.pop().expect("rampage should be discarded");
        assert_eq!(again.bonus_damage, 5);
        play_card(&mut ctx, again, PlayOptions::default());
        assert_eq!(state.enemies[0].body.hp, 60 - 8 - 13);
        assert_eq!(state.piles.discard[0].bonus_damage, 10);
    }

    #[test]
    fn searing_blow_upgrades_repeatedly() {
        let mut state = battle(vec![enemy(1, 60)]);
        let ids = hand(&mut state, &["searing_blow", "bash"]);
        let (content, config, mut rng) = (ContentCatalog::standard(), EngineConfig::default(), SeededRng::from_seed(1));
        let mut ctx = ResolutionContext::new(&mut state, &mut rng, &content, &config).with_target(Some(0));

        assert!(ctx.upgrade_card(PileKind::Hand, ids[0]));
        assert!(ctx.upgrade_card(PileKind::Hand, ids[0]));
        assert!(ctx.upgrade_card(PileKind::Hand, ids[1]));
        assert!(!ctx.upgrade_card(PileKind::Hand, ids[1]), "ordinary cards upgrade once");

        let blow = ctx.state.piles.take(PileKind::Hand, ids[0]).expect("searing blow in hand");
        assert_eq!(blow.times_upgraded, 2);
        play_card(&mut ctx, blow, PlayOptions::default());
        assert_eq!(state.enemies[0].body.hp, 60 - (12 + 8 + 1));
    }

    #[test]
    fn fire_breath_scales_with_status_cards_in_hand() {
        let mut state = battle(vec![enemy(1, 40), enemy(2, 40)]);
        hand(&mut state, &["wound", "burn", "strike"]);
        let breath = card(&mut state, "fire_breath");
        let (content, config, mut rng) = (ContentCatalog::standard(), EngineConfig::default(), SeededRng::from_seed(1));
        let mut ctx = ResolutionContext::new(&mut state, &mut rng, &content, &config);

        play_card(&mut ctx, breath, PlayOptions::default());
        assert_eq!(state.enemies[0].body.hp, 28);
        assert_eq!(state.enemies[1].body.hp, 28);
    }

    #[test]
    fn demon_strike_grants_strength_only_on_a_kill() {
        let mut state = battle(vec![enemy(1, 10), enemy(2, 40)]);
        let first = card(&mut state, "demon_strike");
        let second = card(&mut state, "demon_strike");
        let (content, config, mut rng) = (ContentCatalog::standard(), EngineConfig::default(), SeededRng::from_seed(1));
        let mut ctx = ResolutionContext::new(&mut state, &mut rng, &content, &config).with_target(Some(1));

        play_card(&mut ctx, first, PlayOptions::default());
        assert_eq!(ctx.state.player.body.statuses.get(Status::Strength), 0);
        ctx.target = Some(0);
        play_card(&mut ctx, second, PlayOptions::default());
        assert_eq!(state.player.body.statuses.get(Status::Strength), 3);
        assert!(!state.enemies[0].is_alive());
    }

    #[test]
    fn generated_cards_land_in_their_piles() {
        let mut state = battle(vec![enemy(1, 80), enemy(2, 80)]);
        let anger = card(&mut state, "anger");
        let anger_id = anger.instance_id;
        let power_through = card(&mut state, "power_through");
        let immolate = card(&mut state, "immolate");
        let (content, config, mut rng) = (ContentCatalog::standard(), EngineConfig::default(), SeededRng::from_seed(1));
        let mut ctx = ResolutionContext::new(&mut state, &mut rng, &content, &config).with_target(Some(0));

        play_card(&mut ctx, anger, PlayOptions::default());
        play_card(&mut ctx, power_through, PlayOptions::default());
        play_card(&mut ctx, immolate, PlayOptions::default());

        let angers: Vec<InstanceId> = state
            .piles
            .discard
            .iter()
            .filter(|c| c.id() == "anger")
            .map(|c| c.instance_id)
            .collect();
        assert_eq!(angers.len(), 2);
        assert!(angers.contains(&anger_id));
        assert_eq!(state.piles.hand.iter().filter(|c| c.id() == "wound").count(), 2);
        assert_eq!(state.player.body.block, 15);
        assert_eq!(state.piles.discard.iter().filter(|c| c.id() == "burn").count(), 1);
        assert_eq!(state.enemies[0].body.hp, 80 - 6 - 21);
        assert_eq!(state.enemies[1].body.hp, 80 - 21);
    }

    #[test]
    fn infernal_blade_adds_a_free_attack() {
        let mut state = battle(vec![enemy(1, 60)]);
        let blade = card(&mut state, "infernal_blade");
        let (content, config, mut rng) = (ContentCatalog::standard(), EngineConfig::default(), SeededRng::from_seed(1));
        let mut ctx = ResolutionContext::new(&mut state, &mut rng, &content, &config);

        play_card(&mut ctx, blade, PlayOptions::default());
        assert_eq!(state.piles.hand.len(), 1);
        let generated = &state.piles.hand[0];
        assert_eq!(generated.kind(), CardKind::Attack);
        assert_eq!(generated.cost(), 0);
        assert_eq!(generated.cost_override, Some(0));
    }

    #[test]
    fn strength_tags_read_and_change_enemy_strength() {
        let mut state = battle(vec![enemy(1, 60)]);
        let disarm = card(&mut state, "disarm");
        let shackles = card(&mut state, "dark_shackles");
        let (content, config, mut rng) = (ContentCatalog::standard(), EngineConfig::default(), SeededRng::from_seed(1));
        let mut ctx = ResolutionContext::new(&mut state, &mut rng, &content, &config).with_target(Some(0));

        play_card(&mut ctx, disarm, PlayOptions::default());
        assert_eq!(ctx.state.enemies[0].body.statuses.get(Status::Strength), -2);
        play_card(&mut ctx, shackles, PlayOptions::default());
        assert_eq!(ctx.state.enemies[0].body.statuses.get(Status::Strength), -11);
        assert_eq!(ctx.state.enemies[0].body.statuses.get(Status::Shackled), 9);

        end_of_enemy_turn(&mut ctx);
        assert_eq!(state.enemies[0].body.statuses.get(Status::Strength), -2, "shackled strength returns");
        assert!(!state.enemies[0].body.statuses.has(Status::Shackled));
    }

    #[test]
    fn artifact_blocks_dark_shackles_entirely() {
        let mut state = battle(vec![enemy(1, 60)]);
        state.enemies[0].body.statuses.set(Status::Artifact, 1);
        let shackles = card(&mut state, "dark_shackles");
        let (content, config, mut rng) = (ContentCatalog::standard(), EngineConfig::default(), SeededRng::from_seed(1));
        let mut ctx = ResolutionContext::new(&mut state, &mut rng, &content, &config).with_target(Some(0));

        play_card(&mut ctx, shackles, PlayOptions::default());
        let statuses = &state.enemies[0].body.statuses;
        assert_eq!(statuses.get(Status::Strength), 0);
        assert!(!statuses.has(Status::Shackled));
        assert!(!statuses.has(Status::Artifact));
    }

    #[test]
    fn new_powers_set_their_statuses() {
        let mut state = battle(vec![enemy(1, 60)]);
        let cards: Vec<CardInstance> = ["evolved_rage", "evolve", "fire_breathing", "berserk", "combust", "combust+"]
            .iter()
            .map(|id| card(&mut state, id))
            .collect();
        let strike = card(&mut state, "strike");
        let (content, config, mut rng) = (ContentCatalog::standard(), EngineConfig::default(), SeededRng::from_seed(1));
        let mut ctx = ResolutionContext::new(&mut state, &mut rng, &content, &config).with_target(Some(0));

        for played in cards {
            play_card(&mut ctx, played, PlayOptions::default());
        }
        play_card(&mut ctx, strike, PlayOptions::default());

        let statuses = &state.player.body.statuses;
        assert_eq!(statuses.get(Status::Rage), 5);
        assert_eq!(statuses.get(Status::Evolve), 1);
        assert_eq!(statuses.get(Status::FireBreathing), 6);
        assert_eq!(statuses.get(Status::Berserk), 1);
        assert_eq!(statuses.get(Status::Vulnerable), 2);
        assert_eq!(statuses.get(Status::Combust), 10);
        assert_eq!(statuses.get(Status::CombustHpLoss), 1);
        assert_eq!(state.player.body.block, 5, "rage blocks on the attack");
    }

    #[test]
    fn evolve_draws_again_on_a_status_draw() {
        let mut state = battle(vec![enemy(1, 60)]);
        state.player.body.statuses.set(Status::Evolve, 1);
        let top: Vec<CardInstance> = ["wound", "strike", "defend"].iter().map(|id| card(&mut state, id)).collect();
        state.piles.draw = top;
        let (content, config, mut rng) = (ContentCatalog::standard(), EngineConfig::default(), SeededRng::from_seed(1));
        let mut ctx = ResolutionContext::new(&mut state, &mut rng, &content, &config);

        ctx.draw(1);
        let drawn: Vec<&str> = state.piles.hand.iter().map(|c| c.id()).collect();
        assert_eq!(drawn, vec!["wound", "strike"]);
    }

    #[test]
    fn fire_breathing_hits_all_enemies_per_status_draw() {
        let mut state = battle(vec![enemy(1, 40), enemy(2, 40)]);
        state.player.body.statuses.set(Status::FireBreathing, 6);
        let top: Vec<CardInstance> = ["dazed", "regret", "strike"].iter().map(|id| card(&mut state, id)).collect();
        state.piles.draw = top;
        let (content, config, mut rng) = (ContentCatalog::standard(), EngineConfig::default(), SeededRng::from_seed(1));
        let mut ctx = ResolutionContext::new(&mut state, &mut rng, &content, &config);

        ctx.draw(3);
        assert_eq!(state.enemies[0].body.hp, 28);
        assert_eq!(state.enemies[1].body.hp, 28);
    }

    #[test]
    fn void_and_pain_trigger_when_drawn() {
        let mut state = battle(vec![enemy(1, 60)]);
        let top: Vec<CardInstance> = ["void", "pain"].iter().map(|id| card(&mut state, id)).collect();
        state.piles.draw = top;
        let (content, config, mut rng) = (ContentCatalog::standard(), EngineConfig::default(), SeededRng::from_seed(1));
        let mut ctx = ResolutionContext::new(&mut state, &mut rng, &content, &config);

        ctx.draw(2);
        assert_eq!(state.player.energy, 2);
        assert_eq!(state.player.body.hp, 79);
        assert_eq!(state.times_hp_lost, 1);
    }

    #[test]
    fn doubt_weakens_at_end_of_turn() {
        let mut state = battle(vec![enemy(1, 60)]);
        let doubt = card(&mut state, "doubt");
        let (content, config, mut rng) = (ContentCatalog::standard(), EngineConfig::default(), SeededRng::from_seed(1));
        let mut ctx = ResolutionContext::new(&mut state, &mut rng, &content, &config);

        end_of_turn_in_hand(&mut ctx, &doubt, 1);
        assert_eq!(state.player.body.statuses.get(Status::Weak), 1);
    }

    #[test]
    fn clash_needs_an_all_attack_hand() {
        let mut state = battle(vec![enemy(1, 60)]);
        let ids = hand(&mut state, &["clash", "strike", "defend"]);
        let clash = state.piles.hand[0].clone();
        assert!(!play_condition_met(&state, &clash));
        state.piles.take(PileKind::Hand, ids[2]);
        assert!(play_condition_met(&state, &clash));
    }
}
