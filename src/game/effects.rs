//! 卡牌结算。
//!
//! `ResolutionContext` 只在一次动作内存在：它借用战斗状态、随机源和内容表，
//! 所有伤害、格挡、状态、抽牌、消耗都经由它完成，确保被动与遗物钩子按固定顺序触发。

use super::content::ContentTables;
use super::enemy_phase::PendingEnemyAction;
use super::math::{
    apply_damage, apply_damage_reduced, compute_block, compute_damage_with, finish_incoming, DamageOutcome,
    IncomingModifiers,
};
use super::orbs::{self, OrbKind, OrbOutput};
use super::piles::DrawReport;
use super::potions;
use super::relics::{self, PassiveEffects, RelicContext, RelicEffects, RelicEvent};
use super::rng::{pick, BattleRng};
use super::specials;
use super::state::{
    is_debuff_application, BattleState, CardInstance, CardKind, CardTarget, EffectTarget, InstanceId, PileKind,
    SelectionRequest, Stance, Status,
};
use crate::ai::{DeathRule, SplitHp};
use crate::config::EngineConfig;

pub struct ResolutionContext<'a> {
    pub state: &'a mut BattleState,
    pub rng: &'a mut dyn BattleRng,
    pub content: &'a dyn ContentTables,
    pub config: &'a EngineConfig,
    pub passives: PassiveEffects,
    /// 当前卡牌选定的敌人下标。
    pub target: Option<usize>,
    /// X 费卡实际消耗的能量。
    pub energy_spent: i32,
    /// 本次攻击是否享受双倍伤害。
    pub double_damage: bool,
    pub pending: Vec<PendingEnemyAction>,
}

impl<'a> ResolutionContext<'a> {
    pub fn new(
        state: &'a mut BattleState,
        rng: &'a mut dyn BattleRng,
        content: &'a dyn ContentTables,
        config: &'a EngineConfig,
    ) -> Self {
        let passives = relics::passive_effects(&state.relics);
        Self {
            state,
            rng,
            content,
            config,
            passives,
            target: None,
            energy_spent: 0,
            double_damage: false,
            pending: Vec::new(),
        }
    }

    pub fn with_target(mut self, target: Option<usize>) -> Self {
        self.target = target;
        self
    }

    pub fn note(&mut self, entry: impl Into<String>) {
        self.state.note(entry);
    }

    fn enemy_name(&self, index: usize) -> String {
        self.state
            .enemies
            .get(index)
            .map(|enemy| enemy.name.clone())
            .unwrap_or_default()
    }

    fn target_alive(&self) -> Option<usize> {
        self.target
            .filter(|index| self.state.enemies.get(*index).is_some_and(|enemy| enemy.is_alive()))
    }

    /// 没有存活敌人，也没有待复活或待分裂的敌人。
    pub fn battle_won(&self) -> bool {
        let waiting = self.pending.iter().any(|action| !matches!(action, PendingEnemyAction::Escape { .. }));
        !waiting
            && self.state.enemies.iter().all(|enemy| {
                if enemy.is_alive() {
                    return false;
                }
                match &enemy.on_death {
                    Some(DeathRule::Rebirth { .. }) => enemy.flags.reborn,
                    Some(DeathRule::Split { into, hp }) => {
                        enemy.flags.has_split || into.is_empty() || matches!(hp, SplitHp::ParentCurrent)
                    }
                    None => true,
                }
            })
    }

    pub fn player_dead(&self) -> bool {
        !self.state.player.body.is_alive()
    }

    /// 玩家受到敌人攻击时使用的减伤参数。
    pub fn player_incoming(&self) -> IncomingModifiers {
        IncomingModifiers {
            low_damage_floor: self.passives.low_damage_floor,
            hp_loss_reduction: self.passives.hp_loss_reduction,
            vulnerable_percent: IncomingModifiers::new().vulnerable_percent,
        }
    }

    fn enemy_incoming(&self) -> IncomingModifiers {
        IncomingModifiers {
            vulnerable_percent: self.passives.vulnerable_percent,
            ..IncomingModifiers::new()
        }
    }

    /// 玩家的一段攻击：完整伤害流程，之后结算荆棘反伤。
    pub fn attack_enemy(&mut self, index: usize, base: i32) -> Option<DamageOutcome> {
        let enemy = self.state.enemies.get(index).filter(|enemy| enemy.is_alive())?;
        let modifiers = self.enemy_incoming();
        let mut damage = compute_damage_with(base, &self.state.player, enemy, modifiers.vulnerable_percent);
        if self.double_damage {
            damage *= 2;
        }
        let damage = finish_incoming(damage, enemy, &modifiers);
        let thorns = enemy.body.statuses.get(Status::Thorns);
        let name = enemy.name.clone();

        let outcome = self.hit_enemy(index, damage);
        self.note(format!("Dealt {damage} damage to {name}"));
        if thorns > 0 {
            self.note(format!("{name}'s Thorns dealt {thorns} damage back"));
            self.damage_player(thorns);
        }
        Some(outcome)
    }

    /// 不经过力量与易伤的固定伤害（遗物、充能球、反伤）。
    pub fn damage_enemy_flat(&mut self, index: usize, amount: i32, source: &str) -> Option<DamageOutcome> {
        if !self.state.enemies.get(index).is_some_and(|enemy| enemy.is_alive()) || amount <= 0 {
            return None;
        }
        let outcome = self.hit_enemy(index, amount);
        let name = self.enemy_name(index);
        self.note(format!("{source} dealt {amount} damage to {name}"));
        Some(outcome)
    }

    fn hit_enemy(&mut self, index: usize, amount: i32) -> DamageOutcome {
        let Some(enemy) = self.state.enemies.get_mut(index) else {
            return DamageOutcome::default();
        };
        let outcome = apply_damage(&mut enemy.body, amount);
        if amount > 0 && enemy.body.statuses.has(Status::Flight) {
            enemy.body.statuses.decrement(Status::Flight);
        }
        if outcome.hp_lost > 0 {
            if enemy.body.statuses.has(Status::PlatedArmor) {
                enemy.body.statuses.decrement(Status::PlatedArmor);
            }
            if enemy.flags.asleep {
                enemy.flags.asleep = false;
                enemy.flags.counter = 0;
                let name = enemy.name.clone();
                self.note(format!("{name} woke up"));
            }
        }
        outcome
    }

    /// 已经算好的伤害作用到玩家身上（先格挡，再扣除生命损失减免）。
    pub fn damage_player(&mut self, amount: i32) -> DamageOutcome {
        let outcome = apply_damage_reduced(&mut self.state.player.body, amount, self.passives.hp_loss_reduction);
        if outcome.blocked > 0 {
            self.note(format!("Blocked {} damage", outcome.blocked));
        }
        if outcome.hp_lost > 0 {
            self.note(format!("Took {} damage", outcome.hp_lost));
            self.after_player_hp_loss(outcome.hp_lost);
        }
        outcome
    }

    /// 无视格挡的生命流失。
    pub fn lose_hp(&mut self, amount: i32, source: &str) -> i32 {
        if amount <= 0 {
            return 0;
        }
        let body = &mut self.state.player.body;
        let lost = amount.min(body.hp);
        body.hp -= lost;
        self.note(format!("Lost {lost} HP from {source}"));
        if lost > 0 {
            self.after_player_hp_loss(lost);
        }
        lost
    }

    /// 卡牌的生命代价：最多扣到 1，触发撕裂。
    pub fn pay_hp(&mut self, amount: i32, source: &str) {
        let payable = amount.min(self.state.player.body.hp - 1).max(0);
        self.lose_hp(payable, source);
        let rupture = self.state.player.body.statuses.get(Status::Rupture);
        if payable > 0 && rupture > 0 {
            self.state.player.body.statuses.add(Status::Strength, rupture);
            self.note(format!("Rupture granted {rupture} Strength"));
        }
    }

    fn after_player_hp_loss(&mut self, _lost: i32) {
        if self.state.player.body.statuses.has(Status::PlatedArmor) {
            self.state.player.body.statuses.decrement(Status::PlatedArmor);
        }
        self.state.hp_lost_this_combat = true;
        self.state.times_hp_lost += 1;
        self.fire_relics(RelicEvent::FirstHpLoss);
        self.fire_relics(RelicEvent::DamageTaken);

        if self.player_dead() {
            let prevented = relics::try_prevent_death(&self.state.relics, &self.state.relic_states);
            if let Some((name, percent, states)) = prevented {
                self.state.relic_states = states;
                let body = &mut self.state.player.body;
                body.hp = (body.max_hp * percent / 100).max(1);
                let hp = body.hp;
                tracing::info!(relic = %name, hp, "death prevented");
                self.note(format!("{name} prevented death, healed to {hp} HP"));
            } else {
                potions::try_revive(self);
            }
        }
    }

    /// 卡牌格挡：敏捷与脆弱，之后触发势不可挡。
    pub fn gain_block(&mut self, base: i32) -> i32 {
        let block = compute_block(base, &self.state.player);
        self.state.player.body.gain_block(block);
        self.note(format!("Gained {block} Block"));

        let juggernaut = self.state.player.body.statuses.get(Status::Juggernaut);
        if block > 0 && juggernaut > 0 {
            let living = self.state.living_enemy_indices();
            if let Some(&index) = pick(self.rng, &living) {
                self.damage_enemy_flat(index, juggernaut, "Juggernaut");
            }
        }
        block
    }

    /// 对敌人施加状态，减益会先被人工制品抵消。
    pub fn apply_status_to_enemy(&mut self, index: usize, status: Status, amount: i32) -> bool {
        let Some(enemy) = self.state.enemies.get_mut(index).filter(|enemy| enemy.is_alive()) else {
            return false;
        };
        let name = enemy.name.clone();
        if is_debuff_application(status, amount) && enemy.body.statuses.has(Status::Artifact) {
            enemy.body.statuses.decrement(Status::Artifact);
            self.note(format!("{name}'s Artifact blocked {status:?}"));
            return false;
        }
        enemy.body.statuses.add(status, amount);
        self.note(format!("Applied {amount} {status:?} to {name}"));
        true
    }

    pub fn apply_status_to_player(&mut self, status: Status, amount: i32) -> bool {
        let statuses = &mut self.state.player.body.statuses;
        if is_debuff_application(status, amount) && statuses.has(Status::Artifact) {
            statuses.decrement(Status::Artifact);
            self.note(format!("Artifact blocked {status:?}"));
            return false;
        }
        statuses.add(status, amount);
        self.note(format!("Gained {amount} {status:?}"));
        true
    }

    /// 切换姿态：离开平静 +2 能量，进入神性 +3 能量。
    pub fn change_stance(&mut self, stance: Stance) {
        let previous = self.state.player.stance;
        if previous == stance {
            return;
        }
        if previous == Stance::Calm {
            self.state.player.energy += 2;
            self.note("Left Calm, gained 2 Energy");
        }
        self.state.player.stance = stance;
        if stance == Stance::Divinity {
            self.state.player.energy += 3;
            self.note("Entered Divinity, gained 3 Energy");
        } else if stance == Stance::None {
            self.note(format!("Left {previous}"));
        } else {
            self.note(format!("Entered {stance}"));
        }
    }

    pub fn gain_mantra(&mut self, amount: i32) {
        if amount <= 0 {
            return;
        }
        self.state.player.mantra += amount;
        self.note(format!("Gained {amount} Mantra"));
        let threshold = self.config.mantra_threshold.max(1);
        if self.state.player.mantra >= threshold {
            self.state.player.mantra -= threshold;
            self.change_stance(Stance::Divinity);
        }
    }

    pub fn draw(&mut self, count: u32) -> DrawReport {
        if count == 0 {
            return DrawReport::default();
        }
        if self.state.player.body.statuses.has(Status::NoDraw) {
            self.note("Cannot draw more cards this turn");
            return DrawReport::default();
        }
        let report = self
            .state
            .piles
            .draw(count, self.config.max_hand_size, self.rng);
        if report.reshuffled {
            self.note("Shuffled discard pile into draw pile");
        }
        if !report.drawn.is_empty() {
            self.note(format!("Drew {} card(s)", report.drawn.len()));
        }
        if !report.overflow.is_empty() {
            self.note(format!("Hand full, discarded {} card(s)", report.overflow.len()));
        }
        for id in &report.drawn {
            if let Some(card) = self.state.piles.find(PileKind::Hand, *id).cloned() {
                specials::on_draw(self, &card);
            }
        }
        report
    }

    /// 按 id 生成一张新牌放入指定牌堆；查不到模板时跳过。
    pub fn add_card(&mut self, card_id: &str, pile: PileKind) -> Option<InstanceId> {
        self.add_card_costing(card_id, pile, None)
    }

    /// 同 `add_card`，可覆盖新牌在本场战斗中的费用。
    pub fn add_card_costing(&mut self, card_id: &str, pile: PileKind, cost: Option<i32>) -> Option<InstanceId> {
        let template = match self.content.card(card_id) {
            Ok(template) => template,
            Err(error) => {
                tracing::warn!(%error, "skipping card creation");
                return None;
            }
        };
        let mut card = self.state.instantiate(template);
        card.cost_override = cost;
        let id = card.instance_id;
        let name = card.name().to_string();
        self.place_new_card(card, pile);
        self.note(format!("Added {name} to {pile:?}"));
        Some(id)
    }

    fn place_new_card(&mut self, card: CardInstance, pile: PileKind) {
        match pile {
            PileKind::Hand if self.state.piles.hand.len() >= self.config.max_hand_size => {
                self.state.piles.discard.push(card)
            }
            PileKind::Draw => {
                let position = self.rng.below(self.state.piles.draw.len() + 1);
                self.state.piles.draw.insert(position, card);
            }
            other => self.state.piles.put(other, card),
        }
    }

    /// 复制一张已有的牌（新实例 id，保留升级与成长）放入指定牌堆。
    pub fn copy_card(&mut self, source: &CardInstance, pile: PileKind) -> InstanceId {
        let mut copy = source.clone();
        copy.instance_id = self.state.alloc_instance_id();
        let id = copy.instance_id;
        self.place_new_card(copy, pile);
        id
    }

    pub fn add_random_card(&mut self) -> Option<InstanceId> {
        let pool: Vec<String> = self
            .content
            .random_card_pool()
            .into_iter()
            .map(str::to_string)
            .collect();
        let card_id = pick(self.rng, &pool)?.clone();
        self.add_card(&card_id, PileKind::Hand)
    }

    /// 通过升级指针替换模板，保留实例 id。
    pub fn upgrade_card(&mut self, pile: PileKind, instance_id: InstanceId) -> bool {
        let Some(upgrade_id) = self
            .state
            .piles
            .find(pile, instance_id)
            .filter(|card| specials::upgradable(card))
            .and_then(|card| card.card.upgrade.clone())
        else {
            return false;
        };
        let Some(template) = self.content.card_template(&upgrade_id).cloned() else {
            tracing::warn!(card = %upgrade_id, "upgrade target missing");
            return false;
        };
        if let Some(card) = self.state.piles.find_mut(pile, instance_id) {
            card.card = template;
            card.upgraded = true;
            card.times_upgraded += 1;
            let name = card.name().to_string();
            self.note(format!("Upgraded {name}"));
            return true;
        }
        false
    }

    /// 把牌移入消耗堆并触发消耗钩子。
    pub fn exhaust_card(&mut self, from: PileKind, instance_id: InstanceId) -> bool {
        let Some(card) = self.state.piles.take(from, instance_id) else {
            return false;
        };
        self.note(format!("Exhausted {}", card.name()));
        self.state.piles.exhaust.push(card.clone());
        self.on_card_exhausted(&card);
        true
    }

    /// 消耗钩子，顺序固定：哨卫能量、黑暗之拥抽牌、无痛格挡、消耗遗物。
    pub fn on_card_exhausted(&mut self, card: &CardInstance) {
        if card.card.special.as_deref() == Some(specials::SENTINEL_TAG) && card.card.magic > 0 {
            self.state.player.energy += card.card.magic;
            self.note(format!("{} granted {} Energy", card.name(), card.card.magic));
        }
        let dark_embrace = self.state.player.body.statuses.get(Status::DarkEmbrace);
        if dark_embrace > 0 {
            self.draw(dark_embrace as u32);
        }
        let feel_no_pain = self.state.player.body.statuses.get(Status::FeelNoPain);
        if feel_no_pain > 0 {
            self.state.player.body.gain_block(feel_no_pain);
            self.note(format!("Feel No Pain granted {feel_no_pain} Block"));
        }
        self.fire_relics(RelicEvent::CardExhausted);
    }

    pub fn channel(&mut self, kind: OrbKind) {
        if self.state.player.orb_slots == 0 {
            self.note(format!("No orb slots to channel {kind}"));
            return;
        }
        let evoked = orbs::channel(&mut self.state.player, kind);
        self.note(format!("Channeled {kind}"));
        if let Some(output) = evoked {
            self.apply_orb_output(output, "Evoked orb");
        }
    }

    pub fn evoke(&mut self, count: u32) {
        for _ in 0..count {
            let Some(output) = orbs::evoke_first(&mut self.state.player) else {
                break;
            };
            self.apply_orb_output(output, "Evoked orb");
        }
    }

    /// 最左侧的球激发两次。
    pub fn dualcast(&mut self) {
        if let Some(output) = orbs::peek_evoke(&self.state.player) {
            self.apply_orb_output(output, "Dualcast");
            self.evoke(1);
        }
    }

    pub fn apply_orb_output(&mut self, output: OrbOutput, source: &str) {
        match output {
            OrbOutput::DamageRandom(amount) => {
                let living = self.state.living_enemy_indices();
                if let Some(&index) = pick(self.rng, &living) {
                    self.damage_enemy_flat(index, amount, source);
                }
            }
            OrbOutput::DamageLowest(amount) => {
                let lowest = self
                    .state
                    .living_enemies()
                    .min_by_key(|(_, enemy)| enemy.body.hp)
                    .map(|(index, _)| index);
                if let Some(index) = lowest {
                    self.damage_enemy_flat(index, amount, source);
                }
            }
            OrbOutput::Block(amount) => {
                self.state.player.body.gain_block(amount);
                self.note(format!("{source} granted {amount} Block"));
            }
            OrbOutput::Energy(amount) => {
                self.state.player.energy += amount;
                self.note(format!("{source} granted {amount} Energy"));
            }
            OrbOutput::Charge(_) => {}
        }
    }

    /// 回合结束从左到右结算被动；等离子球在回合开始结算。
    pub fn orb_end_of_turn(&mut self) {
        let focus = self.state.player.focus;
        for index in 0..self.state.player.orbs.len() {
            let Some(orb) = self.state.player.orbs.get(index).cloned() else {
                break;
            };
            match orbs::passive_value(&orb, focus) {
                OrbOutput::Charge(amount) => {
                    if let Some(dark) = self.state.player.orbs.get_mut(index) {
                        dark.stored += amount;
                    }
                }
                OrbOutput::Energy(_) => {}
                output => self.apply_orb_output(output, &format!("{} Orb", orb.kind)),
            }
        }
    }

    pub fn orb_start_of_turn(&mut self) {
        let plasma = self
            .state
            .player
            .orbs
            .iter()
            .filter(|orb| orb.kind == OrbKind::Plasma)
            .count() as i32;
        if plasma > 0 {
            self.apply_orb_output(OrbOutput::Energy(plasma), "Plasma Orb");
        }
    }

    fn relic_context(&self) -> RelicContext {
        let curses = [PileKind::Draw, PileKind::Hand, PileKind::Discard, PileKind::Exhaust]
            .into_iter()
            .flat_map(|kind| self.state.piles.pile(kind).iter())
            .filter(|card| card.kind() == CardKind::Curse)
            .count() as i32;
        let body = &self.state.player.body;
        RelicContext {
            turn: self.state.turn,
            hp: body.hp,
            max_hp: body.max_hp,
            block: body.block,
            curses_in_deck: curses,
        }
    }

    pub fn fire_relics(&mut self, event: RelicEvent) -> RelicEffects {
        if self.state.relics.is_empty() {
            return RelicEffects::default();
        }
        let ctx = self.relic_context();
        let (effects, states) = relics::trigger(&self.state.relics, &self.state.relic_states, event, &ctx);
        self.state.relic_states = states;
        if !effects.is_empty() {
            self.apply_relic_effects(&effects);
        }
        effects
    }

    pub fn apply_relic_effects(&mut self, effects: &RelicEffects) {
        if effects.heal > 0 {
            let healed = self.state.player.body.heal(effects.heal);
            self.note(format!("Relic healed {healed} HP"));
        }
        if effects.block > 0 {
            self.state.player.body.gain_block(effects.block);
            self.note(format!("Relic granted {} Block", effects.block));
        }
        if effects.strength != 0 {
            self.state.player.body.statuses.add(Status::Strength, effects.strength);
            self.note(format!("Relic granted {} Strength", effects.strength));
        }
        if effects.dexterity != 0 {
            self.state.player.body.statuses.add(Status::Dexterity, effects.dexterity);
            self.note(format!("Relic granted {} Dexterity", effects.dexterity));
        }
        if effects.energy > 0 {
            self.state.player.energy += effects.energy;
            self.note(format!("Relic granted {} Energy", effects.energy));
        }
        if effects.intangible > 0 {
            self.state.player.body.statuses.add(Status::Intangible, effects.intangible);
        }
        if effects.thorns > 0 {
            self.state.player.body.statuses.add(Status::Thorns, effects.thorns);
        }
        if effects.double_damage {
            self.state.player.body.statuses.add(Status::DoubleDamage, 1);
            self.note("Next attack deals double damage");
        }
        if effects.block_next_turn > 0 {
            self.state.pending_block += effects.block_next_turn;
        }
        if effects.damage > 0 {
            if let Some(index) = self.target_alive() {
                self.damage_enemy_flat(index, effects.damage, "Relic");
            }
        }
        if effects.damage_all > 0 {
            for index in self.state.living_enemy_indices() {
                self.damage_enemy_flat(index, effects.damage_all, "Relic");
            }
        }
        for index in self.state.living_enemy_indices() {
            if effects.vulnerable_all > 0 {
                self.apply_status_to_enemy(index, Status::Vulnerable, effects.vulnerable_all);
            }
            if effects.weak_all > 0 {
                self.apply_status_to_enemy(index, Status::Weak, effects.weak_all);
            }
        }
        for kind in &effects.channel {
            self.channel(*kind);
        }
        for card_id in &effects.add_cards {
            self.add_card(card_id, PileKind::Hand);
        }
        for _ in 0..effects.random_cards {
            self.add_random_card();
        }
        if effects.draw > 0 {
            self.draw(effects.draw);
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PlayOptions {
    pub energy_spent: i32,
    /// 结算后强制消耗（例如被浩劫打出的牌）。
    pub force_exhaust: bool,
}

fn apply_card_effects(ctx: &mut ResolutionContext<'_>, card: &CardInstance) {
    for effect in &card.card.effects {
        match effect.target {
            EffectTarget::Player => {
                ctx.apply_status_to_player(effect.status, effect.amount);
            }
            EffectTarget::Enemy => {
                if let Some(index) = ctx.target_alive() {
                    ctx.apply_status_to_enemy(index, effect.status, effect.amount);
                }
            }
            EffectTarget::AllEnemies => {
                for index in ctx.state.living_enemy_indices() {
                    ctx.apply_status_to_enemy(index, effect.status, effect.amount);
                }
            }
        }
    }
}

fn deal_card_damage(ctx: &mut ResolutionContext<'_>, card: &CardInstance, base: i32) {
    for _ in 0..card.card.hits.max(1) {
        match card.card.target {
            CardTarget::AllEnemies => {
                for index in ctx.state.living_enemy_indices() {
                    ctx.attack_enemy(index, base);
                }
            }
            CardTarget::RandomEnemy => {
                let living = ctx.state.living_enemy_indices();
                if let Some(&index) = pick(ctx.rng, &living) {
                    ctx.attack_enemy(index, base);
                }
            }
            CardTarget::SingleEnemy | CardTarget::None => {
                if let Some(index) = ctx.target_alive() {
                    ctx.attack_enemy(index, base);
                }
            }
        }
        if ctx.battle_won() || ctx.player_dead() {
            break;
        }
    }
}

fn place_played_card(ctx: &mut ResolutionContext<'_>, card: CardInstance, exhaust: bool) {
    if exhaust {
        ctx.note(format!("Exhausted {}", card.name()));
        ctx.state.piles.exhaust.push(card.clone());
        ctx.on_card_exhausted(&card);
    } else {
        ctx.state.piles.discard.push(card);
    }
}

/// 结算一张已离开手牌的牌，返回需要进入选牌阶段的请求。
///
/// 顺序：计数与敌方反应、伤害、格挡、状态、抽牌、能量、生命代价、姿态与真言、
/// 特殊效果、出牌遗物，最后决定进入弃牌堆还是消耗堆。
pub fn play_card(
    ctx: &mut ResolutionContext<'_>,
    mut card: CardInstance,
    options: PlayOptions,
) -> Option<SelectionRequest> {
    let kind = card.kind();
    ctx.energy_spent = options.energy_spent;
    ctx.note(format!("Played {}", card.name()));

    ctx.state.counters.cards_played += 1;
    match kind {
        CardKind::Attack => ctx.state.counters.attacks_played += 1,
        CardKind::Skill => {
            ctx.state.counters.skills_played += 1;
            for index in ctx.state.living_enemy_indices() {
                let enemy = &mut ctx.state.enemies[index];
                let enrage = enemy.body.statuses.get(Status::Enrage);
                if enrage > 0 {
                    enemy.body.statuses.add(Status::Strength, enrage);
                    let name = enemy.name.clone();
                    ctx.note(format!("{name} gained {enrage} Strength from Enrage"));
                }
            }
        }
        _ => {}
    }

    if kind == CardKind::Attack {
        let rage = ctx.state.player.body.statuses.get(Status::Rage);
        if rage > 0 {
            ctx.state.player.body.gain_block(rage);
        }
        if ctx.state.player.body.statuses.has(Status::DoubleDamage) {
            ctx.state.player.body.statuses.decrement(Status::DoubleDamage);
            ctx.double_damage = true;
        }
    }

    let handler = card.card.special.as_deref().and_then(specials::lookup);
    let handles_damage = handler.is_some_and(|handler| handler.deals_damage());
    if let Some(base) = card.damage().filter(|_| !handles_damage) {
        deal_card_damage(ctx, &card, base);
    }

    let exhaust = card.card.exhaust
        || options.force_exhaust
        || (kind == CardKind::Skill && ctx.state.player.body.statuses.has(Status::Corruption));

    if ctx.battle_won() {
        ctx.double_damage = false;
        place_played_card(ctx, card, exhaust);
        return None;
    }

    if let Some(block) = card.card.block {
        ctx.gain_block(block);
    }
    apply_card_effects(ctx, &card);
    if card.card.draw > 0 {
        ctx.draw(card.card.draw);
    }
    if card.card.energy > 0 {
        ctx.state.player.energy += card.card.energy;
        ctx.note(format!("Gained {} Energy", card.card.energy));
    }
    if card.card.hp_cost > 0 {
        ctx.pay_hp(card.card.hp_cost, card.name());
    }
    if let Some(stance) = card.card.stance {
        ctx.change_stance(stance);
    }
    ctx.gain_mantra(card.card.mantra);

    let tag = card.card.special.clone();
    let selection = match (handler, tag.as_deref()) {
        (Some(handler), _) => handler.resolve(ctx, &mut card),
        (None, Some(tag)) if !specials::PASSIVE_TAGS.contains(&tag) => {
            tracing::debug!(tag, card = card.id(), "unknown special tag ignored");
            None
        }
        (None, _) => None,
    };
    ctx.double_damage = false;

    match kind {
        CardKind::Attack => {
            ctx.fire_relics(RelicEvent::AttackPlayed);
        }
        CardKind::Skill => {
            ctx.fire_relics(RelicEvent::SkillPlayed);
        }
        _ => {}
    }
    if card.card.is_strike() {
        ctx.fire_relics(RelicEvent::StrikePlayed);
    }

    place_played_card(ctx, card, exhaust);
    selection
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::content::ContentCatalog;
    use crate::game::relics::{RelicEffect, RelicTemplate};
    use crate::game::rng::SeededRng;
    use crate::game::state::{CardTemplate, Combatant, Enemy, EnemyFlags, Player};

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

    #[test]
    fn strike_deals_six_and_overflows_block() {
        let mut state = battle(vec![enemy(1, 40)]);
        state.enemies[0].body.block = 4;
        let strike = card(&mut state, "strike");
        let (content, config, mut rng) = (ContentCatalog::standard(), EngineConfig::default(), SeededRng::from_seed(1));
        let mut ctx = ResolutionContext::new(&mut state, &mut rng, &content, &config).with_target(Some(0));

        play_card(&mut ctx, strike, PlayOptions::default());
        assert_eq!(state.enemies[0].body.block, 0);
        assert_eq!(state.enemies[0].body.hp, 38, "4 absorbed by block, 2 through");
        assert_eq!(state.piles.discard.len(), 1);
    }

    #[test]
    fn wrath_doubles_strike() {
        let mut state = battle(vec![enemy(1, 40)]);
        state.player.stance = Stance::Wrath;
        let strike = card(&mut state, "strike");
        let (content, config, mut rng) = (ContentCatalog::standard(), EngineConfig::default(), SeededRng::from_seed(1));
        let mut ctx = ResolutionContext::new(&mut state, &mut rng, &content, &config).with_target(Some(0));

        play_card(&mut ctx, strike, PlayOptions::default());
        assert_eq!(state.enemies[0].body.hp, 28);
    }

    #[test]
    fn artifact_blocks_first_vulnerable_only() {
        let mut state = battle(vec![enemy(1, 80)]);
        state.enemies[0].body.statuses.set(Status::Artifact, 1);
        let first = card(&mut state, "bash");
        let second = card(&mut state, "bash");
        let (content, config, mut rng) = (ContentCatalog::standard(), EngineConfig::default(), SeededRng::from_seed(1));
        let mut ctx = ResolutionContext::new(&mut state, &mut rng, &content, &config).with_target(Some(0));

        play_card(&mut ctx, first, PlayOptions::default());
        assert_eq!(ctx.state.enemies[0].body.statuses.get(Status::Artifact), 0);
        assert_eq!(ctx.state.enemies[0].body.statuses.get(Status::Vulnerable), 0);

        play_card(&mut ctx, second, PlayOptions::default());
        assert_eq!(state.enemies[0].body.statuses.get(Status::Vulnerable), 2);
        assert!(state.log.contains("Artifact blocked"));
    }

    #[test]
    fn multi_hit_triggers_thorns_per_hit() {
        let mut state = battle(vec![enemy(1, 40)]);
        state.enemies[0].body.statuses.set(Status::Thorns, 3);
        let twin = card(&mut state, "twin_strike");
        let (content, config, mut rng) = (ContentCatalog::standard(), EngineConfig::default(), SeededRng::from_seed(1));
        let mut ctx = ResolutionContext::new(&mut state, &mut rng, &content, &config).with_target(Some(0));

        play_card(&mut ctx, twin, PlayOptions::default());
        assert_eq!(state.enemies[0].body.hp, 30);
        assert_eq!(state.player.body.hp, 74, "two hits reflect 3 each");
    }

    #[test]
    fn multi_hit_stops_once_every_enemy_is_dead() {
        let mut state = battle(vec![enemy(1, 5)]);
        state.enemies[0].body.statuses.set(Status::Thorns, 3);
        let twin = card(&mut state, "twin_strike");
        let (content, config, mut rng) = (ContentCatalog::standard(), EngineConfig::default(), SeededRng::from_seed(1));
        let mut ctx = ResolutionContext::new(&mut state, &mut rng, &content, &config).with_target(Some(0));

        play_card(&mut ctx, twin, PlayOptions::default());
        assert!(ctx.battle_won());
        assert_eq!(state.player.body.hp, 77, "second hit never lands");
    }

    #[test]
    fn aoe_skips_dead_enemies() {
        let mut state = battle(vec![enemy(1, 0), enemy(2, 20)]);
        let cleave = card(&mut state, "cleave");
        let (content, config, mut rng) = (ContentCatalog::standard(), EngineConfig::default(), SeededRng::from_seed(1));
        let mut ctx = ResolutionContext::new(&mut state, &mut rng, &content, &config);

        play_card(&mut ctx, cleave, PlayOptions::default());
        assert_eq!(state.enemies[0].body.hp, 0);
        assert_eq!(state.enemies[1].body.hp, 12);
        assert_eq!(state.log.entries().iter().filter(|e| e.starts_with("Dealt")).count(), 1);
    }

    #[test]
    fn exhaust_triggers_draw_and_block_powers_together() {
        let mut state = battle(vec![enemy(1, 40)]);
        state.player.body.statuses.set(Status::DarkEmbrace, 1);
        state.player.body.statuses.set(Status::FeelNoPain, 3);
        let draw_pile: Vec<CardInstance> = (0..3).map(|_| card(&mut state, "defend")).collect();
        state.piles.draw = draw_pile;
        let offering = card(&mut state, "offering");
        let (content, config, mut rng) = (ContentCatalog::standard(), EngineConfig::default(), SeededRng::from_seed(1));
        let mut ctx = ResolutionContext::new(&mut state, &mut rng, &content, &config);

        play_card(&mut ctx, offering, PlayOptions::default());
        assert_eq!(state.piles.hand.len(), 3, "offering draws 3 (pile has 3); dark embrace finds nothing left");
        assert_eq!(state.player.body.block, 3);
        assert_eq!(state.piles.exhaust.len(), 1);
    }

    #[test]
    fn exhaust_hooks_fire_in_order_with_dead_branch() {
        let mut state = battle(vec![enemy(1, 40)]);
        state.player.body.statuses.set(Status::DarkEmbrace, 1);
        state.player.body.statuses.set(Status::FeelNoPain, 4);
        state.relics = vec![RelicTemplate::new(
            "dead_branch",
            "Dead Branch",
            RelicEvent::CardExhausted,
            RelicEffect::AddRandomCard,
        )];
        let extra = card(&mut state, "strike");
        state.piles.draw = vec![extra];
        let sentinel = card(&mut state, "sentinel");
        let id = sentinel.instance_id;
        state.piles.hand.push(sentinel);
        let (content, config, mut rng) = (ContentCatalog::standard(), EngineConfig::default(), SeededRng::from_seed(4));
        let mut ctx = ResolutionContext::new(&mut state, &mut rng, &content, &config);

        assert!(ctx.exhaust_card(PileKind::Hand, id));
        assert_eq!(state.player.energy, 5, "sentinel refunds 2 energy");
        assert_eq!(state.piles.hand.len(), 2, "dark embrace draw plus dead branch card");
        assert_eq!(state.player.body.block, 4);
    }

    #[test]
    fn corruption_makes_skills_exhaust() {
        let mut state = battle(vec![enemy(1, 40)]);
        state.player.body.statuses.set(Status::Corruption, 1);
        let defend = card(&mut state, "defend");
        let (content, config, mut rng) = (ContentCatalog::standard(), EngineConfig::default(), SeededRng::from_seed(1));
        let mut ctx = ResolutionContext::new(&mut state, &mut rng, &content, &config);

        play_card(&mut ctx, defend, PlayOptions::default());
        assert_eq!(state.piles.exhaust.len(), 1);
        assert!(state.piles.discard.is_empty());
    }

    #[test]
    fn leaving_calm_and_entering_divinity_grant_energy() {
        let mut state = battle(vec![enemy(1, 40)]);
        state.player.stance = Stance::Calm;
        state.player.energy = 0;
        let (content, config, mut rng) = (ContentCatalog::standard(), EngineConfig::default(), SeededRng::from_seed(1));
        let mut ctx = ResolutionContext::new(&mut state, &mut rng, &content, &config);

        ctx.change_stance(Stance::Wrath);
        assert_eq!(ctx.state.player.energy, 2);
        ctx.gain_mantra(10);
        assert_eq!(state.player.stance, Stance::Divinity);
        assert_eq!(state.player.energy, 5);
        assert_eq!(state.player.mantra, 0);
    }

    #[test]
    fn prevent_death_relic_heals_once() {
        let mut state = battle(vec![enemy(1, 40)]);
        state.player.body.hp = 5;
        state.relics = vec![RelicTemplate::new(
            "lizard_tail",
            "Lizard Tail",
            RelicEvent::Passive,
            RelicEffect::PreventDeath { heal_percent: 50 },
        )];
        let (content, config, mut rng) = (ContentCatalog::standard(), EngineConfig::default(), SeededRng::from_seed(1));
        let mut ctx = ResolutionContext::new(&mut state, &mut rng, &content, &config);

        ctx.damage_player(20);
        assert_eq!(ctx.state.player.body.hp, 40);
        ctx.damage_player(60);
        assert_eq!(state.player.body.hp, 0, "second lethal hit is not prevented");
    }

    #[test]
    fn flight_halves_and_loses_a_stack_per_hit() {
        let mut state = battle(vec![enemy(1, 40)]);
        state.enemies[0].body.statuses.set(Status::Flight, 3);
        let (content, config, mut rng) = (ContentCatalog::standard(), EngineConfig::default(), SeededRng::from_seed(1));
        let mut ctx = ResolutionContext::new(&mut state, &mut rng, &content, &config);

        ctx.attack_enemy(0, 10);
        assert_eq!(state.enemies[0].body.hp, 35);
        assert_eq!(state.enemies[0].body.statuses.get(Status::Flight), 2);
    }

    #[test]
    fn split_enemy_keeps_battle_going() {
        let mut dead = enemy(1, 0);
        dead.on_death = Some(DeathRule::Split {
            into: vec!["acid_slime_m".into()],
            hp: SplitHp::HalfParentMax,
        });
        let mut state = battle(vec![dead]);
        let (content, config, mut rng) = (ContentCatalog::standard(), EngineConfig::default(), SeededRng::from_seed(1));
        let ctx = ResolutionContext::new(&mut state, &mut rng, &content, &config);
        assert!(!ctx.battle_won());
    }

    #[test]
    fn unknown_special_tag_is_a_no_op() {
        let mut state = battle(vec![enemy(1, 40)]);
        let odd = state.instantiate(
            CardTemplate::new("odd", "Odd", CardKind::Skill, 1)
                .block(3)
                .special("notARealTag", 0),
        );
        let (content, config, mut rng) = (ContentCatalog::standard(), EngineConfig::default(), SeededRng::from_seed(1));
        let mut ctx = ResolutionContext::new(&mut state, &mut rng, &content, &config);

        assert!(play_card(&mut ctx, odd, PlayOptions::default()).is_none());
        assert_eq!(state.player.body.block, 3);
    }
}
