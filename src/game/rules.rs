//! 回合控制器：战斗阶段状态机。
//!
//! 每个外部动作对应一次状态迁移。非法动作返回原状态并在 `rejected` 中说明原因，
//! 从不部分修改状态。

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::content::{ContentCatalog, ContentError, ContentTables};
use super::effects::{play_card, PlayOptions, ResolutionContext};
use super::enemy_phase::{
    assign_intent, end_of_enemy_turn, intent_turn, refresh_intents, run_enemy_turn, settle_enemies, spawn_enemy,
};
use super::piles::Piles;
use super::potions::{self, PotionTarget};
use super::relics::{self, BlockRetention, PassiveEffects, RelicEvent, RelicStates};
use super::rng::{shuffle, BattleRng, SeededRng};
use super::specials;
use super::state::{
    BattleOutcome, BattlePhase, BattleState, CardInstance, CardKind, CardTarget, EffectTarget, InstanceId, PileKind,
    Player, SelectionRequest, Stance, Status, TurnCounters,
};
use super::validator::{self, InvariantViolation, ValidationError};
use crate::config::EngineConfig;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct PlayerSetup {
    pub hp: i32,
    pub max_hp: i32,
    pub gold: i32,
    /// 缺省时使用配置中的基础能量。
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_energy: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub orb_slots: Option<usize>,
}

impl Default for PlayerSetup {
    fn default() -> Self {
        Self {
            hp: 80,
            max_hp: 80,
            gold: 99,
            max_energy: None,
            orb_slots: None,
        }
    }
}

/// 开战参数：敌人原型、牌组与遗物都用 id 表示。
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct BattleSetup {
    pub player: PlayerSetup,
    pub enemies: Vec<String>,
    /// 为空时使用标准起始牌组。
    pub deck: Vec<String>,
    pub relics: Vec<String>,
    /// 上一场战斗留下的遗物状态（计数、整局标记）。
    pub relic_states: RelicStates,
    /// 携带的药水 id，超出槽位的部分丢弃。
    pub potions: Vec<String>,
}

impl BattleSetup {
    pub fn new<S: Into<String>>(enemies: impl IntoIterator<Item = S>) -> Self {
        Self {
            enemies: enemies.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    pub fn with_deck<S: Into<String>>(mut self, deck: impl IntoIterator<Item = S>) -> Self {
        self.deck = deck.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_relics<S: Into<String>>(mut self, relics: impl IntoIterator<Item = S>) -> Self {
        self.relics = relics.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_potions<S: Into<String>>(mut self, potions: impl IntoIterator<Item = S>) -> Self {
        self.potions = potions.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_player(mut self, player: PlayerSetup) -> Self {
        self.player = player;
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum BattleAction {
    BeginBattle { setup: BattleSetup },
    SelectCard { card: InstanceId },
    ConfirmTarget { card: InstanceId, target: usize },
    CancelTargeting,
    EndTurn,
    MakeSelection { card: InstanceId },
    CancelSelection,
    /// 敌人目标药水在多个敌人存活时必须带 `target`。
    UsePotion {
        slot: usize,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        target: Option<usize>,
    },
    DiscardPotion { slot: usize },
    /// 脚本场景直接加入敌人。
    ForceSpawn { enemies: Vec<String> },
}

impl BattleAction {
    pub fn name(&self) -> &'static str {
        match self {
            BattleAction::BeginBattle { .. } => "begin-battle",
            BattleAction::SelectCard { .. } => "select-card",
            BattleAction::ConfirmTarget { .. } => "confirm-target",
            BattleAction::CancelTargeting => "cancel-targeting",
            BattleAction::EndTurn => "end-turn",
            BattleAction::MakeSelection { .. } => "make-selection",
            BattleAction::CancelSelection => "cancel-selection",
            BattleAction::UsePotion { .. } => "use-potion",
            BattleAction::DiscardPotion { .. } => "discard-potion",
            BattleAction::ForceSpawn { .. } => "force-spawn",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Error)]
#[serde(tag = "type")]
pub enum RuleError {
    #[error("battle is already resolved")]
    BattleFinished,
    #[error("expected phase {expected}, found {actual}")]
    InvalidPhase { expected: String, actual: String },
    #[error("card {card} is not in hand")]
    CardNotInHand { card: InstanceId },
    #[error("card {card} cannot be played")]
    Unplayable { card: InstanceId },
    #[error("not enough energy: need {required}, have {available}")]
    InsufficientEnergy { required: i32, available: i32 },
    #[error("attacks cannot be played while entangled")]
    Entangled,
    #[error("card {card} can only be played when every card in hand is an attack")]
    HandNotAllAttacks { card: InstanceId },
    #[error("card play limit of {limit} reached this turn")]
    CardLimitReached { limit: u32 },
    #[error("enemy slot {target} is not a living enemy")]
    InvalidTarget { target: usize },
    #[error("card {card} cannot be chosen for this selection")]
    NotEligible { card: InstanceId },
    #[error("targeting is pending for card {expected}, not {card}")]
    TargetMismatch { expected: InstanceId, card: InstanceId },
    #[error("potion slot {slot} is empty")]
    EmptyPotionSlot { slot: usize },
    #[error("potion `{potion}` cannot be used now")]
    PotionNotUsable { potion: String },
    #[error("potion `{potion}` needs an enemy target")]
    PotionNeedsTarget { potion: String },
    #[error("{error}")]
    Content {
        #[from]
        error: ContentError,
    },
    #[error("resulting state violates {} invariant(s)", .violations.len())]
    IntegrityViolation { violations: Vec<InvariantViolation> },
}

impl From<ValidationError> for RuleError {
    fn from(error: ValidationError) -> Self {
        let ValidationError::Violations { violations } = error;
        RuleError::IntegrityViolation { violations }
    }
}

/// 一次动作的结果：新状态、本次新增的战斗日志、被拒绝的原因。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleResolution {
    pub state: BattleState,
    pub log: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rejected: Option<RuleError>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outcome: Option<BattleOutcome>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<InvariantViolation>,
}

impl RuleResolution {
    pub fn new(state: BattleState, log_start: usize) -> Self {
        let log = state.log.since(log_start).to_vec();
        let outcome = state.outcome();
        Self {
            state,
            log,
            rejected: None,
            outcome,
            warnings: Vec::new(),
        }
    }

    pub fn rejected(state: BattleState, error: RuleError) -> Self {
        let outcome = state.outcome();
        Self {
            state,
            log: Vec::new(),
            rejected: Some(error),
            outcome,
            warnings: Vec::new(),
        }
    }

    pub fn is_rejected(&self) -> bool {
        self.rejected.is_some()
    }
}

pub struct RuleEngine {
    content: Box<dyn ContentTables>,
    rng: Box<dyn BattleRng>,
    config: EngineConfig,
}

impl RuleEngine {
    pub fn new(content: impl ContentTables + 'static, config: EngineConfig) -> Self {
        Self {
            content: Box::new(content),
            rng: Box::new(SeededRng::new(config.seed)),
            config,
        }
    }

    /// 标准内容表。
    pub fn standard(config: EngineConfig) -> Self {
        Self::new(ContentCatalog::standard(), config)
    }

    pub fn with_rng(mut self, rng: impl BattleRng + 'static) -> Self {
        self.rng = Box::new(rng);
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn content(&self) -> &dyn ContentTables {
        self.content.as_ref()
    }

    fn context<'a>(&'a mut self, state: &'a mut BattleState) -> ResolutionContext<'a> {
        ResolutionContext::new(state, self.rng.as_mut(), self.content.as_ref(), &self.config)
    }

    /// 唯一的外部入口。失败时返回原状态，不抛错。
    pub fn dispatch(&mut self, state: &BattleState, action: BattleAction) -> RuleResolution {
        let name = action.name();
        let mut next = state.clone();
        let log_start = match action {
            BattleAction::BeginBattle { .. } => 0,
            _ => next.log.len(),
        };

        let result = self
            .apply(&mut next, action)
            .and_then(|()| validator::enforce(&mut next, self.config.validation).map_err(RuleError::from));
        match result {
            Ok(warnings) => {
                tracing::debug!(action = name, phase = next.phase.name(), "action applied");
                let mut resolution = RuleResolution::new(next, log_start);
                resolution.warnings = warnings;
                resolution
            }
            Err(error) => {
                tracing::warn!(action = name, %error, "action rejected");
                RuleResolution::rejected(state.clone(), error)
            }
        }
    }

    fn apply(&mut self, state: &mut BattleState, action: BattleAction) -> Result<(), RuleError> {
        match action {
            BattleAction::BeginBattle { setup } => {
                *state = self.begin_battle(setup)?;
                Ok(())
            }
            BattleAction::SelectCard { card } => self.select_card(state, card),
            BattleAction::ConfirmTarget { card, target } => self.confirm_target(state, card, target),
            BattleAction::CancelTargeting => Self::cancel_targeting(state),
            BattleAction::EndTurn => self.end_turn(state),
            BattleAction::MakeSelection { card } => self.make_selection(state, card),
            BattleAction::CancelSelection => Self::cancel_selection(state),
            BattleAction::UsePotion { slot, target } => self.use_potion(state, slot, target),
            BattleAction::DiscardPotion { slot } => Self::discard_potion(state, slot),
            BattleAction::ForceSpawn { enemies } => self.force_spawn(state, &enemies),
        }
    }

    /// 构造新战斗：实例化并洗牌、载入遗物、生成敌人，随后进入第一个玩家回合。
    pub fn begin_battle(&mut self, setup: BattleSetup) -> Result<BattleState, RuleError> {
        let max_energy = setup.player.max_energy.unwrap_or(self.config.base_energy);
        let mut player = Player::new(setup.player.hp, setup.player.max_hp, max_energy);
        player.gold = setup.player.gold;
        player.orb_slots = setup.player.orb_slots.unwrap_or(self.config.default_orb_slots);
        let mut state = BattleState::new(player);

        let deck_ids = if setup.deck.is_empty() {
            ContentCatalog::starter_deck()
        } else {
            setup.deck
        };
        let mut deck = Vec::with_capacity(deck_ids.len());
        for id in &deck_ids {
            let template = self.content.card(id)?;
            deck.push(state.instantiate(template));
        }
        shuffle(self.rng.as_mut(), &mut deck);
        state.piles = Piles::with_draw_pile(deck);
        state.piles.hoist_innate();

        state.relics = setup
            .relics
            .iter()
            .map(|id| self.content.relic(id))
            .collect::<Result<_, _>>()?;
        state.relic_states = relics::reset_for_combat(&state.relics, &setup.relic_states);

        for id in &setup.potions {
            self.content.potion(id)?;
            if !potions::add_potion(&mut state.player, id) {
                tracing::warn!(potion = %id, "no free potion slot, potion dropped");
            }
        }

        for archetype in &setup.enemies {
            let enemy = spawn_enemy(&mut state, self.content.as_ref(), self.rng.as_mut(), archetype, None)?;
            state.enemies.push(enemy);
        }
        let names: Vec<&str> = state.enemies.iter().map(|enemy| enemy.name.as_str()).collect();
        let opening = format!("Battle started against {}", names.join(", "));
        state.note(opening);
        tracing::info!(
            enemies = state.enemies.len(),
            deck = state.piles.draw.len(),
            relics = state.relics.len(),
            "battle started"
        );

        let mut ctx = self.context(&mut state);
        ctx.fire_relics(RelicEvent::CombatStart);
        settle_enemies(&mut ctx);
        if !finish_if_over(&mut ctx) {
            start_player_turn(&mut ctx);
            settle_enemies(&mut ctx);
            finish_if_over(&mut ctx);
        }
        Ok(state)
    }

    fn select_card(&mut self, state: &mut BattleState, id: InstanceId) -> Result<(), RuleError> {
        ensure_active(state)?;
        ensure_phase(state, "player-turn", matches!(state.phase, BattlePhase::PlayerTurn))?;
        let card = hand_card(state, id)?;
        ensure_playable(state, &relics::passive_effects(&state.relics), card)?;

        let living = state.living_enemy_indices();
        if requires_target(card) && living.len() >= 2 {
            let name = card.name().to_string();
            state.phase = BattlePhase::Targeting { card: id };
            state.note(format!("Choose a target for {name}"));
            return Ok(());
        }
        self.play(state, id, living.first().copied())
    }

    fn confirm_target(&mut self, state: &mut BattleState, id: InstanceId, target: usize) -> Result<(), RuleError> {
        ensure_active(state)?;
        let pending = match &state.phase {
            BattlePhase::Targeting { card } => *card,
            _ => return Err(invalid_phase(state, "targeting")),
        };
        if pending != id {
            return Err(RuleError::TargetMismatch {
                expected: pending,
                card: id,
            });
        }
        if !state.enemies.get(target).is_some_and(|enemy| enemy.is_alive()) {
            return Err(RuleError::InvalidTarget { target });
        }
        self.play(state, id, Some(target))
    }

    fn cancel_targeting(state: &mut BattleState) -> Result<(), RuleError> {
        ensure_active(state)?;
        ensure_phase(state, "targeting", matches!(state.phase, BattlePhase::Targeting { .. }))?;
        state.phase = BattlePhase::PlayerTurn;
        state.note("Targeting cancelled");
        Ok(())
    }

    /// 支付能量并结算；若结算要求选牌则进入选牌阶段。
    fn play(&mut self, state: &mut BattleState, id: InstanceId, target: Option<usize>) -> Result<(), RuleError> {
        let cost = ensure_playable(state, &relics::passive_effects(&state.relics), hand_card(state, id)?)?;
        let card = state
            .piles
            .take(PileKind::Hand, id)
            .ok_or(RuleError::CardNotInHand { card: id })?;
        let energy_spent = if card.card.x_cost {
            state.player.energy.max(0)
        } else {
            cost
        };
        state.player.energy -= energy_spent;
        state.phase = BattlePhase::PlayerTurn;

        let mut ctx = self.context(state).with_target(target);
        let selection = play_card(
            &mut ctx,
            card,
            PlayOptions {
                energy_spent,
                force_exhaust: false,
            },
        );
        settle_enemies(&mut ctx);
        if finish_if_over(&mut ctx) {
            return Ok(());
        }
        if let Some(selection) = selection.and_then(|selection| still_eligible(ctx.state, selection)) {
            ctx.state.phase = BattlePhase::CardSelection { selection };
        }
        Ok(())
    }

    /// 喝药水：只在玩家回合；敌人目标与出牌使用同样的目标规则。
    fn use_potion(&mut self, state: &mut BattleState, slot: usize, target: Option<usize>) -> Result<(), RuleError> {
        ensure_active(state)?;
        ensure_phase(state, "player-turn", matches!(state.phase, BattlePhase::PlayerTurn))?;
        let id = state
            .player
            .potions
            .get(slot)
            .cloned()
            .flatten()
            .ok_or(RuleError::EmptyPotionSlot { slot })?;
        let potion = self.content.potion(&id)?;
        if !potions::can_drink(&potion, &state.player) {
            return Err(RuleError::PotionNotUsable { potion: id });
        }
        let target = match potion.target {
            PotionTarget::Enemy => Some(potion_target(state, &id, target)?),
            _ => None,
        };

        state.player.potions[slot] = None;
        tracing::debug!(potion = %id, slot, "potion used");
        let mut ctx = self.context(state).with_target(target);
        potions::drink(&mut ctx, &potion);
        settle_enemies(&mut ctx);
        finish_if_over(&mut ctx);
        Ok(())
    }

    fn discard_potion(state: &mut BattleState, slot: usize) -> Result<(), RuleError> {
        ensure_active(state)?;
        let id = state
            .player
            .potions
            .get_mut(slot)
            .and_then(Option::take)
            .ok_or(RuleError::EmptyPotionSlot { slot })?;
        state.note(format!("Discarded {id}"));
        Ok(())
    }

    fn make_selection(&mut self, state: &mut BattleState, id: InstanceId) -> Result<(), RuleError> {
        ensure_active(state)?;
        let BattlePhase::CardSelection { selection } = &state.phase else {
            return Err(invalid_phase(state, "card-selection"));
        };
        let selection = selection.clone();
        if !selection.eligible.contains(&id) {
            return Err(RuleError::NotEligible { card: id });
        }
        state.phase = BattlePhase::PlayerTurn;

        let mut ctx = self.context(state);
        let next = specials::apply_selection(&mut ctx, &selection, id);
        settle_enemies(&mut ctx);
        if finish_if_over(&mut ctx) {
            return Ok(());
        }
        if let Some(selection) = next.and_then(|selection| still_eligible(ctx.state, selection)) {
            ctx.state.phase = BattlePhase::CardSelection { selection };
        }
        Ok(())
    }

    /// 已经生效的部分（格挡、抽牌）不回滚。
    fn cancel_selection(state: &mut BattleState) -> Result<(), RuleError> {
        ensure_active(state)?;
        ensure_phase(state, "card-selection", matches!(state.phase, BattlePhase::CardSelection { .. }))?;
        state.phase = BattlePhase::PlayerTurn;
        state.note("Selection cancelled");
        Ok(())
    }

    fn end_turn(&mut self, state: &mut BattleState) -> Result<(), RuleError> {
        ensure_active(state)?;
        ensure_phase(state, "player-turn", matches!(state.phase, BattlePhase::PlayerTurn))?;
        tracing::debug!(turn = state.turn, "ending player turn");

        let mut ctx = self.context(state);
        end_player_turn(&mut ctx);
        settle_enemies(&mut ctx);
        if finish_if_over(&mut ctx) {
            return Ok(());
        }

        ctx.state.phase = BattlePhase::EnemyTurn;
        run_enemy_turn(&mut ctx);
        settle_enemies(&mut ctx);
        if finish_if_over(&mut ctx) {
            return Ok(());
        }
        end_of_enemy_turn(&mut ctx);

        start_player_turn(&mut ctx);
        settle_enemies(&mut ctx);
        finish_if_over(&mut ctx);
        Ok(())
    }

    /// 全部生成成功才加入战场。
    fn force_spawn(&mut self, state: &mut BattleState, archetypes: &[String]) -> Result<(), RuleError> {
        ensure_active(state)?;
        let mut spawned = Vec::with_capacity(archetypes.len());
        for archetype in archetypes {
            spawned.push(spawn_enemy(state, self.content.as_ref(), self.rng.as_mut(), archetype, None)?);
        }
        let turn = intent_turn(state);
        for mut enemy in spawned {
            assign_intent(self.content.as_ref(), self.rng.as_mut(), &mut enemy, turn);
            state.note(format!("{} joined the battle", enemy.name));
            state.enemies.push(enemy);
        }
        Ok(())
    }
}

/// 显式目标必须是存活敌人；未给目标时只有一个敌人存活才自动选中。
fn potion_target(state: &BattleState, potion: &str, target: Option<usize>) -> Result<usize, RuleError> {
    let living = state.living_enemy_indices();
    match target {
        Some(index) if living.contains(&index) => Ok(index),
        Some(index) => Err(RuleError::InvalidTarget { target: index }),
        None if living.len() == 1 => Ok(living[0]),
        None => Err(RuleError::PotionNeedsTarget {
            potion: potion.to_string(),
        }),
    }
}

fn ensure_active(state: &BattleState) -> Result<(), RuleError> {
    if state.is_finished() {
        return Err(RuleError::BattleFinished);
    }
    Ok(())
}

fn invalid_phase(state: &BattleState, expected: &str) -> RuleError {
    RuleError::InvalidPhase {
        expected: expected.to_string(),
        actual: state.phase.name().to_string(),
    }
}

fn ensure_phase(state: &BattleState, expected: &str, ok: bool) -> Result<(), RuleError> {
    if ok {
        Ok(())
    } else {
        Err(invalid_phase(state, expected))
    }
}

fn hand_card(state: &BattleState, id: InstanceId) -> Result<&CardInstance, RuleError> {
    state
        .piles
        .find(PileKind::Hand, id)
        .ok_or(RuleError::CardNotInHand { card: id })
}

/// 本次打出实际需要的能量。X 费牌在支付时消耗全部能量。
pub fn effective_cost(state: &BattleState, card: &CardInstance) -> i32 {
    if card.card.x_cost {
        return 0;
    }
    if card.kind() == CardKind::Skill && state.player.body.statuses.has(Status::Corruption) {
        return 0;
    }
    (card.cost() - specials::cost_reduction(state, card)).max(0)
}

fn ensure_playable(state: &BattleState, passives: &PassiveEffects, card: &CardInstance) -> Result<i32, RuleError> {
    if card.card.unplayable {
        return Err(RuleError::Unplayable {
            card: card.instance_id,
        });
    }
    if card.kind() == CardKind::Attack && state.player.body.statuses.has(Status::Entangled) {
        return Err(RuleError::Entangled);
    }
    if !specials::play_condition_met(state, card) {
        return Err(RuleError::HandNotAllAttacks {
            card: card.instance_id,
        });
    }
    if let Some(limit) = passives.card_limit {
        if state.counters.cards_played >= limit {
            return Err(RuleError::CardLimitReached { limit });
        }
    }
    let cost = effective_cost(state, card);
    if cost > state.player.energy {
        return Err(RuleError::InsufficientEnergy {
            required: cost,
            available: state.player.energy,
        });
    }
    Ok(cost)
}

/// 单体攻击、对单个敌人施加状态或带指向性特殊效果的牌需要明确目标。
pub fn requires_target(card: &CardInstance) -> bool {
    let single = card.card.target == CardTarget::SingleEnemy;
    let attacks_one = single && (card.kind() == CardKind::Attack || card.card.damage.is_some());
    let special_one = single && card.card.special.as_deref().is_some_and(specials::targets_enemy);
    attacks_one
        || special_one
        || card
            .card
            .effects
            .iter()
            .any(|effect| effect.target == EffectTarget::Enemy)
}

fn still_eligible(state: &BattleState, mut selection: SelectionRequest) -> Option<SelectionRequest> {
    selection
        .eligible
        .retain(|id| state.piles.find(selection.source, *id).is_some());
    (!selection.eligible.is_empty()).then_some(selection)
}

/// 判定胜负。胜利时触发战斗结束遗物。
fn finish_if_over(ctx: &mut ResolutionContext<'_>) -> bool {
    if ctx.player_dead() {
        ctx.state.phase = BattlePhase::Resolved {
            outcome: BattleOutcome::Defeat,
        };
        ctx.note("Defeat");
        tracing::info!(turn = ctx.state.turn, "battle lost");
        return true;
    }
    if ctx.battle_won() {
        ctx.fire_relics(RelicEvent::CombatEnd);
        ctx.state.phase = BattlePhase::Resolved {
            outcome: BattleOutcome::Victory,
        };
        ctx.note("Victory");
        tracing::info!(turn = ctx.state.turn, hp = ctx.state.player.body.hp, "battle won");
        return true;
    }
    false
}

/// 玩家回合开始：格挡、能量、减益、回合开始能力与遗物、抽牌、敌人意图。
fn start_player_turn(ctx: &mut ResolutionContext<'_>) {
    ctx.state.turn += 1;
    ctx.state.counters = TurnCounters::default();
    let turn = ctx.state.turn;
    ctx.note(format!("Turn {turn}"));

    let retention = ctx.passives.block_retention;
    let body = &mut ctx.state.player.body;
    if !body.statuses.has(Status::Barricade) {
        body.block = match retention {
            BlockRetention::None => 0,
            BlockRetention::All => body.block,
            BlockRetention::Partial { loss } => (body.block - loss).max(0),
        };
    }
    let pending_block = std::mem::take(&mut ctx.state.pending_block);
    if pending_block > 0 {
        ctx.state.player.body.gain_block(pending_block);
        ctx.note(format!("Gained {pending_block} Block carried over"));
    }

    let conserved = std::mem::take(&mut ctx.state.conserved_energy);
    ctx.state.player.energy = ctx.state.player.max_energy + ctx.passives.extra_energy + conserved;
    let berserk = ctx.state.player.body.statuses.get(Status::Berserk);
    if berserk > 0 {
        ctx.state.player.energy += berserk;
        ctx.note(format!("Berserk granted {berserk} Energy"));
    }

    let statuses = &mut ctx.state.player.body.statuses;
    let draw_reduction = statuses.get(Status::DrawReduction).max(0) as u32;
    for status in Status::DURATIONS {
        statuses.decrement(status);
    }
    statuses.clear(Status::DrawReduction);
    statuses.clear(Status::FlameBarrier);

    let brutality = ctx.state.player.body.statuses.get(Status::Brutality);
    if brutality > 0 {
        ctx.pay_hp(brutality, "Brutality");
    }
    let demon_form = ctx.state.player.body.statuses.get(Status::DemonForm);
    if demon_form > 0 {
        ctx.state.player.body.statuses.add(Status::Strength, demon_form);
        ctx.note(format!("Demon Form granted {demon_form} Strength"));
    }
    let regen = ctx.state.player.body.statuses.get(Status::Regen);
    if regen > 0 {
        let healed = ctx.state.player.body.heal(regen);
        ctx.state.player.body.statuses.decrement(Status::Regen);
        ctx.note(format!("Regen healed {healed} HP"));
    }

    ctx.fire_relics(RelicEvent::TurnStart);
    if turn == 1 {
        ctx.fire_relics(RelicEvent::FirstTurn);
    }
    ctx.orb_start_of_turn();

    let draw = (ctx.config.base_hand_size + ctx.passives.extra_draw + brutality.max(0) as u32)
        .saturating_sub(draw_reduction);
    ctx.draw(draw);

    refresh_intents(ctx);
    ctx.state.phase = BattlePhase::PlayerTurn;
}

/// 玩家回合结束：回合结束遗物与手牌效果、弃牌、回合结束能力、充能球被动。
fn end_player_turn(ctx: &mut ResolutionContext<'_>) {
    ctx.fire_relics(RelicEvent::TurnEnd);

    let hand = ctx.state.piles.hand.clone();
    for card in &hand {
        specials::end_of_turn_in_hand(ctx, card, hand.len());
    }

    let report = ctx.state.piles.end_of_turn_discard();
    for id in report.exhausted {
        if let Some(card) = ctx.state.piles.find(PileKind::Exhaust, id).cloned() {
            ctx.note(format!("{} faded away", card.name()));
            ctx.on_card_exhausted(&card);
        }
    }

    let combust = ctx.state.player.body.statuses.get(Status::Combust);
    if combust > 0 {
        let hp_loss = 1 + ctx.state.player.body.statuses.get(Status::CombustHpLoss).max(0);
        ctx.lose_hp(hp_loss, "Combust");
        for index in ctx.state.living_enemy_indices() {
            ctx.damage_enemy_flat(index, combust, "Combust");
        }
    }
    let statuses = &ctx.state.player.body.statuses;
    let armor = statuses.get(Status::Metallicize) + statuses.get(Status::PlatedArmor);
    if armor > 0 {
        ctx.state.player.body.gain_block(armor);
        ctx.note(format!("Gained {armor} Block from armor"));
    }
    ctx.orb_end_of_turn();

    let statuses = &mut ctx.state.player.body.statuses;
    let temp = statuses.get(Status::TempStrength);
    if temp != 0 {
        statuses.add(Status::Strength, -temp);
        statuses.clear(Status::TempStrength);
    }
    statuses.clear(Status::Entangled);
    statuses.clear(Status::NoDraw);
    statuses.clear(Status::Rage);

    ctx.state.conserved_energy = if ctx.passives.conserve_energy {
        ctx.state.player.energy.max(0)
    } else {
        0
    };
    if ctx.state.player.stance == Stance::Divinity {
        ctx.change_stance(Stance::None);
    }
}

/// 符文圆顶：对外展示时隐藏敌人意图。
pub fn redact_intents(state: &mut BattleState) {
    if relics::passive_effects(&state.relics).hide_intents {
        for enemy in &mut state.enemies {
            enemy.intent = None;
        }
    }
}
