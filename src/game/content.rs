//! 卡牌、遗物、敌人的查表契约与内置内容。
//!
//! 引擎只读取模板并复制出运行时实例，从不修改模板本身。

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use once_cell::sync::Lazy;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::orbs::OrbKind;
use super::potions::PotionTemplate;
use super::relics::{RelicEffect, RelicEvent, RelicTemplate};
use super::state::{CardKind, CardTemplate, PileKind, Status};
use crate::ai::{
    DeathRule, EnemyMove, EnemySpecial, EnemyTemplate, FlagUpdate, IntentKind, MoveCondition, MoveRule,
    MoveTarget, SplitHp,
};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ContentKind {
    Card,
    Relic,
    Enemy,
    Potion,
}

impl fmt::Display for ContentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ContentKind::Card => "card",
            ContentKind::Relic => "relic",
            ContentKind::Enemy => "enemy",
            ContentKind::Potion => "potion",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Error)]
#[serde(tag = "type")]
pub enum ContentError {
    #[error("{kind} `{id}` not found")]
    NotFound { kind: ContentKind, id: String },
}

impl ContentError {
    pub fn not_found(kind: ContentKind, id: &str) -> Self {
        tracing::warn!(%kind, id, "content lookup miss");
        ContentError::NotFound {
            kind,
            id: id.to_string(),
        }
    }
}

/// 外部内容表的只读查询接口。
pub trait ContentTables {
    fn card_template(&self, id: &str) -> Option<&CardTemplate>;
    fn relic_template(&self, id: &str) -> Option<&RelicTemplate>;
    fn enemy_template(&self, archetype: &str) -> Option<&EnemyTemplate>;

    /// 随机加入手牌时的候选卡牌 id。
    fn random_card_pool(&self) -> Vec<&str>;

    fn potion_template(&self, _id: &str) -> Option<&PotionTemplate> {
        None
    }

    fn enemy_move_table(&self, archetype: &str) -> Option<&[MoveRule]> {
        self.enemy_template(archetype)
            .map(|template| template.moves.as_slice())
    }

    fn card(&self, id: &str) -> Result<CardTemplate, ContentError> {
        self.card_template(id)
            .cloned()
            .ok_or_else(|| ContentError::not_found(ContentKind::Card, id))
    }

    fn relic(&self, id: &str) -> Result<RelicTemplate, ContentError> {
        self.relic_template(id)
            .cloned()
            .ok_or_else(|| ContentError::not_found(ContentKind::Relic, id))
    }

    fn enemy(&self, archetype: &str) -> Result<EnemyTemplate, ContentError> {
        self.enemy_template(archetype)
            .cloned()
            .ok_or_else(|| ContentError::not_found(ContentKind::Enemy, archetype))
    }

    fn potion(&self, id: &str) -> Result<PotionTemplate, ContentError> {
        self.potion_template(id)
            .cloned()
            .ok_or_else(|| ContentError::not_found(ContentKind::Potion, id))
    }
}

/// 基于有序映射的内容表，可以从 JSON 载入，也提供一套标准内容。
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ContentCatalog {
    pub cards: BTreeMap<String, CardTemplate>,
    pub relics: BTreeMap<String, RelicTemplate>,
    pub enemies: BTreeMap<String, EnemyTemplate>,
    pub potions: BTreeMap<String, PotionTemplate>,
}

impl ContentCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn with_card(mut self, card: CardTemplate) -> Self {
        self.cards.insert(card.id.clone(), card);
        self
    }

    pub fn with_relic(mut self, relic: RelicTemplate) -> Self {
        self.relics.insert(relic.id.clone(), relic);
        self
    }

    pub fn with_enemy(mut self, enemy: EnemyTemplate) -> Self {
        self.enemies.insert(enemy.archetype.clone(), enemy);
        self
    }

    pub fn with_potion(mut self, potion: PotionTemplate) -> Self {
        self.potions.insert(potion.id.clone(), potion);
        self
    }

    /// 标准内容：卡牌与药水来自内置数据文件，遗物与敌人在代码中定义。
    pub fn standard() -> Self {
        STANDARD.clone()
    }

    /// 标准起始牌组：5 打击、4 防御、1 重击。
    pub fn starter_deck() -> Vec<String> {
        let mut deck = vec!["strike".to_string(); 5];
        deck.extend(vec!["defend".to_string(); 4]);
        deck.push("bash".to_string());
        deck
    }
}

impl ContentTables for ContentCatalog {
    fn card_template(&self, id: &str) -> Option<&CardTemplate> {
        self.cards.get(id)
    }

    fn relic_template(&self, id: &str) -> Option<&RelicTemplate> {
        self.relics.get(id)
    }

    fn enemy_template(&self, archetype: &str) -> Option<&EnemyTemplate> {
        self.enemies.get(archetype)
    }

    fn potion_template(&self, id: &str) -> Option<&PotionTemplate> {
        self.potions.get(id)
    }

    fn random_card_pool(&self) -> Vec<&str> {
        let upgraded: BTreeSet<&str> = self
            .cards
            .values()
            .filter_map(|card| card.upgrade.as_deref())
            .collect();
        self.cards
            .values()
            .filter(|card| matches!(card.kind, CardKind::Attack | CardKind::Skill | CardKind::Power))
            .filter(|card| !upgraded.contains(card.id.as_str()))
            .map(|card| card.id.as_str())
            .collect()
    }
}

static STANDARD: Lazy<ContentCatalog> = Lazy::new(|| {
    let mut catalog = ContentCatalog::new();
    for card in bundled::<CardTemplate>("cards.json", include_str!("../../data/cards.json")) {
        catalog = catalog.with_card(card);
    }
    for potion in bundled::<PotionTemplate>("potions.json", include_str!("../../data/potions.json")) {
        catalog = catalog.with_potion(potion);
    }
    for relic in standard_relics() {
        catalog = catalog.with_relic(relic);
    }
    for enemy in standard_enemies() {
        catalog = catalog.with_enemy(enemy);
    }
    catalog
});

/// 解析内置数据文件；损坏时记录错误并返回空表。
fn bundled<T: DeserializeOwned>(file: &str, json: &str) -> Vec<T> {
    serde_json::from_str(json).unwrap_or_else(|error| {
        tracing::error!(file, %error, "bundled content failed to parse");
        Vec::new()
    })
}

fn standard_relics() -> Vec<RelicTemplate> {
    use RelicEffect as E;
    use RelicEvent as On;

    vec![
        RelicTemplate::new("burning_blood", "Burning Blood", On::CombatEnd, E::Heal { amount: 6 }),
        RelicTemplate::new(
            "meat_on_the_bone",
            "Meat on the Bone",
            On::CombatEnd,
            E::HealIfLowHp {
                amount: 12,
                threshold_percent: 50,
            },
        ),
        RelicTemplate::new("anchor", "Anchor", On::CombatStart, E::Block { amount: 10 }),
        RelicTemplate::new("vajra", "Vajra", On::CombatStart, E::Strength { amount: 1 }),
        RelicTemplate::new("oddly_smooth_stone", "Oddly Smooth Stone", On::CombatStart, E::Dexterity { amount: 1 }),
        RelicTemplate::new("bronze_scales", "Bronze Scales", On::CombatStart, E::Thorns { amount: 3 }),
        RelicTemplate::new("bag_of_marbles", "Bag of Marbles", On::CombatStart, E::VulnerableAll { amount: 1 }),
        RelicTemplate::new("red_mask", "Red Mask", On::CombatStart, E::WeakAll { amount: 1 }),
        RelicTemplate::new("cracked_core", "Cracked Core", On::CombatStart, E::ChannelOrb { orb: OrbKind::Lightning }),
        RelicTemplate::new(
            "ninja_scroll",
            "Ninja Scroll",
            On::CombatStart,
            E::AddCardToHand {
                card_id: "shiv".to_string(),
            },
        ),
        RelicTemplate::new("du_vu_doll", "Du-Vu Doll", On::CombatStart, E::StrengthPerCurse { amount: 1 }),
        RelicTemplate::new("fossilized_helix", "Fossilized Helix", On::CombatStart, E::Intangible { amount: 1 }),
        RelicTemplate::new("bag_of_preparation", "Bag of Preparation", On::FirstTurn, E::Draw { amount: 2 }),
        RelicTemplate::new("lantern", "Lantern", On::FirstTurn, E::Energy { amount: 1 }),
        RelicTemplate::new("horn_cleat", "Horn Cleat", On::TurnStart, E::Block { amount: 14 }).on_turn(2),
        RelicTemplate::new("happy_flower", "Happy Flower", On::TurnStart, E::Energy { amount: 1 }).every(3),
        RelicTemplate::new("mercury_hourglass", "Mercury Hourglass", On::TurnStart, E::DamageAll { amount: 3 }),
        RelicTemplate::new("orichalcum", "Orichalcum", On::TurnEnd, E::BlockIfNone { amount: 6 }),
        RelicTemplate::new("nunchaku", "Nunchaku", On::AttackPlayed, E::Energy { amount: 1 }).every(10),
        RelicTemplate::new("pen_nib", "Pen Nib", On::AttackPlayed, E::DoubleDamage).every(10),
        RelicTemplate::new("kunai", "Kunai", On::AttackPlayed, E::Dexterity { amount: 1 }).every(3),
        RelicTemplate::new("letter_opener", "Letter Opener", On::SkillPlayed, E::DamageAll { amount: 5 }).every(3),
        RelicTemplate::new("strike_dummy", "Strike Dummy", On::StrikePlayed, E::Damage { amount: 3 }),
        RelicTemplate::new("centennial_puzzle", "Centennial Puzzle", On::FirstHpLoss, E::Draw { amount: 3 }),
        RelicTemplate::new("self_forming_clay", "Self-Forming Clay", On::DamageTaken, E::BlockNextTurn { amount: 3 }),
        RelicTemplate::new("dead_branch", "Dead Branch", On::CardExhausted, E::AddRandomCard),
        RelicTemplate::new("lizard_tail", "Lizard Tail", On::Passive, E::PreventDeath { heal_percent: 50 }),
        RelicTemplate::new("torii", "Torii", On::Passive, E::ReduceLowDamage),
        RelicTemplate::new("tungsten_rod", "Tungsten Rod", On::Passive, E::ReduceHpLoss { amount: 1 }),
        RelicTemplate::new("paper_phrog", "Paper Phrog", On::Passive, E::VulnerableMultiplier { percent: 175 }),
        RelicTemplate::new("calipers", "Calipers", On::Passive, E::RetainBlock { loss: Some(15) }),
        RelicTemplate::new("ice_cream", "Ice Cream", On::Passive, E::ConserveEnergy),
        RelicTemplate::new("velvet_choker", "Velvet Choker", On::Passive, E::CardLimit { limit: 6 }),
        RelicTemplate::new("runic_dome", "Runic Dome", On::Passive, E::HideIntents),
        RelicTemplate::new("coffee_dripper", "Coffee Dripper", On::Passive, E::ExtraEnergy { amount: 1 }),
        RelicTemplate::new("ring_of_the_serpent", "Ring of the Serpent", On::Passive, E::ExtraDraw { amount: 1 }),
    ]
}

fn mv(id: &str, name: &str, kind: IntentKind) -> EnemyMove {
    EnemyMove::new(id, name, kind)
}

fn turn_is(turn: u32) -> MoveCondition {
    MoveCondition::TurnIs { turn }
}

fn every(every: u32, offset: u32) -> MoveCondition {
    MoveCondition::TurnEvery { every, offset }
}

fn standard_enemies() -> Vec<EnemyTemplate> {
    use MoveTarget::{Allies, Own, Player};

    let slimed = |count: u32| EnemySpecial::AddCards {
        card_id: "slimed".to_string(),
        count,
        pile: PileKind::Discard,
    };

    vec![
        EnemyTemplate::new(
            "cultist",
            "Cultist",
            (48, 54),
            vec![
                MoveRule::when(
                    vec![turn_is(0)],
                    mv("incantation", "Incantation", IntentKind::Buff).apply(Status::Ritual, 3, Own),
                ),
                MoveRule::always(mv("dark_strike", "Dark Strike", IntentKind::Attack).attack(6, 1)),
            ],
        ),
        EnemyTemplate::new(
            "jaw_worm",
            "Jaw Worm",
            (40, 44),
            vec![
                MoveRule::when(vec![turn_is(0)], mv("chomp", "Chomp", IntentKind::Attack).attack(11, 1)),
                MoveRule::weighted(
                    vec![],
                    vec![
                        (25, mv("chomp", "Chomp", IntentKind::Attack).attack(11, 1), true),
                        (30, mv("thrash", "Thrash", IntentKind::AttackDefend).attack(7, 1).block(5), false),
                        (
                            45,
                            mv("bellow", "Bellow", IntentKind::DefendBuff)
                                .block(6)
                                .apply(Status::Strength, 3, Own),
                            true,
                        ),
                    ],
                ),
            ],
        ),
        EnemyTemplate::new(
            "acid_slime_l",
            "Acid Slime (L)",
            (65, 69),
            vec![MoveRule::weighted(
                vec![],
                vec![
                    (
                        30,
                        mv("corrosive_spit", "Corrosive Spit", IntentKind::AttackDebuff)
                            .attack(11, 1)
                            .special(slimed(2)),
                        true,
                    ),
                    (40, mv("tackle", "Tackle", IntentKind::Attack).attack(16, 1), true),
                    (30, mv("lick", "Lick", IntentKind::Debuff).apply(Status::Weak, 2, Player), true),
                ],
            )],
        )
        .on_death(DeathRule::Split {
            into: vec!["acid_slime_m".to_string(), "acid_slime_m".to_string()],
            hp: SplitHp::HalfParentMax,
        }),
        EnemyTemplate::new(
            "acid_slime_m",
            "Acid Slime (M)",
            (28, 32),
            vec![MoveRule::weighted(
                vec![],
                vec![
                    (
                        30,
                        mv("corrosive_spit", "Corrosive Spit", IntentKind::AttackDebuff)
                            .attack(7, 1)
                            .special(slimed(1)),
                        true,
                    ),
                    (40, mv("tackle", "Tackle", IntentKind::Attack).attack(10, 1), true),
                    (30, mv("lick", "Lick", IntentKind::Debuff).apply(Status::Weak, 1, Player), true),
                ],
            )],
        ),
        EnemyTemplate::new(
            "slime_boss",
            "Slime Boss",
            (140, 140),
            vec![
                MoveRule::when(
                    vec![MoveCondition::HpBelowPercent { percent: 50 }, MoveCondition::NotSplit],
                    mv("split", "Split", IntentKind::Unknown).special(EnemySpecial::Split),
                ),
                MoveRule::when(
                    vec![every(3, 0)],
                    mv("goop_spray", "Goop Spray", IntentKind::StrongDebuff).special(slimed(3)),
                ),
                MoveRule::when(vec![every(3, 1)], mv("preparing", "Preparing", IntentKind::Unknown)),
                MoveRule::always(mv("slam", "Slam", IntentKind::Attack).attack(35, 1)),
            ],
        )
        .on_death(DeathRule::Split {
            into: vec!["acid_slime_l".to_string(), "acid_slime_l".to_string()],
            hp: SplitHp::ParentCurrent,
        }),
        EnemyTemplate::new(
            "lagavulin",
            "Lagavulin",
            (109, 111),
            vec![
                MoveRule::when(
                    vec![MoveCondition::Asleep, MoveCondition::CounterAtLeast { value: 3 }],
                    mv("stir", "Stir", IntentKind::Unknown)
                        .then(FlagUpdate::Wake)
                        .then(FlagUpdate::ResetCounter),
                ),
                MoveRule::when(
                    vec![MoveCondition::Asleep],
                    mv("sleep", "Sleeping", IntentKind::Sleeping).then(FlagUpdate::IncrementCounter),
                ),
                MoveRule::when(
                    vec![MoveCondition::CounterAtLeast { value: 2 }],
                    mv("siphon_soul", "Siphon Soul", IntentKind::StrongDebuff)
                        .apply(Status::Strength, -1, Player)
                        .apply(Status::Dexterity, -1, Player)
                        .then(FlagUpdate::ResetCounter),
                ),
                MoveRule::always(
                    mv("attack", "Attack", IntentKind::Attack)
                        .attack(18, 1)
                        .then(FlagUpdate::IncrementCounter),
                ),
            ],
        )
        .status(Status::Metallicize, 8)
        .asleep(),
        EnemyTemplate::new(
            "book_of_stabbing",
            "Book of Stabbing",
            (160, 164),
            vec![
                MoveRule::when(
                    vec![every(3, 2)],
                    mv("single_stab", "Single Stab", IntentKind::Attack).attack(21, 1),
                ),
                MoveRule::always(
                    mv("multi_stab", "Multi-Stab", IntentKind::Attack)
                        .attack(6, 2)
                        .escalating()
                        .then(FlagUpdate::Escalate { amount: 1 }),
                ),
            ],
        ),
        EnemyTemplate::new(
            "gremlin_leader",
            "Gremlin Leader",
            (140, 148),
            vec![
                MoveRule::when(
                    vec![every(3, 0)],
                    mv("rally", "Rally!", IntentKind::Unknown).special(EnemySpecial::Summon {
                        archetype: "mad_gremlin".to_string(),
                        count: 2,
                        max_allies: 3,
                    }),
                ),
                MoveRule::weighted(
                    vec![],
                    vec![
                        (
                            50,
                            mv("encourage", "Encourage", IntentKind::DefendBuff)
                                .block(6)
                                .special(EnemySpecial::BuffAllies {
                                    status: Status::Strength,
                                    amount: 3,
                                }),
                            true,
                        ),
                        (50, mv("stab", "Stab", IntentKind::Attack).attack(6, 3), true),
                    ],
                ),
            ],
        ),
        EnemyTemplate::new(
            "mad_gremlin",
            "Mad Gremlin",
            (20, 24),
            vec![MoveRule::always(mv("scratch", "Scratch", IntentKind::Attack).attack(4, 1))],
        )
        .status(Status::Enrage, 1),
        EnemyTemplate::new(
            "slaver_blue",
            "Blue Slaver",
            (46, 50),
            vec![MoveRule::weighted(
                vec![],
                vec![
                    (60, mv("stab", "Stab", IntentKind::Attack).attack(12, 1), true),
                    (
                        40,
                        mv("rake", "Rake", IntentKind::AttackDebuff)
                            .attack(7, 1)
                            .apply(Status::Weak, 1, Player),
                        true,
                    ),
                ],
            )],
        ),
        EnemyTemplate::new(
            "the_guardian",
            "The Guardian",
            (240, 240),
            vec![
                MoveRule::when(
                    vec![MoveCondition::Defensive, MoveCondition::CounterAtLeast { value: 1 }],
                    mv("twin_slam", "Twin Slam", IntentKind::AttackBuff)
                        .attack(8, 2)
                        .apply(Status::Thorns, -3, Own)
                        .then(FlagUpdate::SetDefensive { value: false })
                        .then(FlagUpdate::ResetCounter),
                ),
                MoveRule::when(
                    vec![MoveCondition::Defensive],
                    mv("roll_attack", "Roll Attack", IntentKind::Attack)
                        .attack(9, 1)
                        .then(FlagUpdate::IncrementCounter),
                ),
                MoveRule::when(
                    vec![every(4, 3)],
                    mv("defensive_mode", "Defensive Mode", IntentKind::DefendBuff)
                        .block(20)
                        .apply(Status::Thorns, 3, Own)
                        .then(FlagUpdate::SetDefensive { value: true }),
                ),
                MoveRule::when(vec![every(4, 0)], mv("charging_up", "Charging Up", IntentKind::Defend).block(9)),
                MoveRule::when(vec![every(4, 1)], mv("fierce_bash", "Fierce Bash", IntentKind::Attack).attack(32, 1)),
                MoveRule::always(
                    mv("vent_steam", "Vent Steam", IntentKind::StrongDebuff)
                        .apply(Status::Weak, 2, Player)
                        .apply(Status::Vulnerable, 2, Player),
                ),
            ],
        ),
        EnemyTemplate::new(
            "exploder",
            "Exploder",
            (30, 30),
            vec![
                MoveRule::when(
                    vec![turn_is(2)],
                    mv("explode", "Explode!", IntentKind::Attack)
                        .attack(30, 1)
                        .special(EnemySpecial::Explode),
                ),
                MoveRule::always(mv("slam", "Slam", IntentKind::Attack).attack(9, 1)),
            ],
        ),
        EnemyTemplate::new(
            "looter",
            "Looter",
            (44, 48),
            vec![
                MoveRule::when(
                    vec![MoveCondition::Used { id: "smoke_bomb".into() }],
                    mv("escape", "Escape", IntentKind::Unknown).special(EnemySpecial::Escape),
                ),
                MoveRule::when(
                    vec![MoveCondition::CounterAtLeast { value: 2 }],
                    mv("smoke_bomb", "Smoke Bomb", IntentKind::Defend).block(6).once(),
                ),
                MoveRule::always(
                    mv("mug", "Mug", IntentKind::Attack)
                        .attack(10, 1)
                        .special(EnemySpecial::StealGold { amount: 15 })
                        .then(FlagUpdate::IncrementCounter),
                ),
            ],
        ),
        EnemyTemplate::new(
            "darkling",
            "Darkling",
            (48, 56),
            vec![
                MoveRule::when(
                    vec![MoveCondition::LastMoveNot { id: "harden".into() }, every(2, 1)],
                    mv("harden", "Harden", IntentKind::DefendBuff)
                        .block(12)
                        .special(EnemySpecial::RemoveDebuffs),
                ),
                MoveRule::always(mv("nip", "Nip", IntentKind::Attack).attack(8, 1)),
            ],
        )
        .on_death(DeathRule::Rebirth { hp_percent: 50 }),
        EnemyTemplate::new(
            "sentry",
            "Sentry",
            (38, 42),
            vec![
                MoveRule::when(
                    vec![every(2, 0)],
                    mv("bolt", "Bolt", IntentKind::Debuff).special(EnemySpecial::AddCards {
                        card_id: "dazed".to_string(),
                        count: 2,
                        pile: PileKind::Discard,
                    }),
                ),
                MoveRule::always(mv("beam", "Beam", IntentKind::Attack).attack(9, 1)),
            ],
        )
        .status(Status::Artifact, 1),
        EnemyTemplate::new(
            "byrd",
            "Byrd",
            (25, 31),
            vec![
                MoveRule::when(
                    vec![every(2, 1)],
                    mv("caw", "Caw", IntentKind::Buff).apply(Status::Strength, 1, Own),
                ),
                MoveRule::always(mv("peck", "Peck", IntentKind::Attack).attack(1, 5)),
            ],
        )
        .status(Status::Flight, 3),
        EnemyTemplate::new(
            "fungi_beast",
            "Fungi Beast",
            (22, 28),
            vec![
                MoveRule::when(
                    vec![every(3, 2)],
                    mv("grow", "Grow", IntentKind::Buff).apply(Status::Strength, 3, Own),
                ),
                MoveRule::always(mv("bite", "Bite", IntentKind::Attack).attack(6, 1)),
            ],
        ),
        EnemyTemplate::new(
            "mystic",
            "Mystic",
            (48, 56),
            vec![
                MoveRule::when(
                    vec![MoveCondition::HpBelowPercent { percent: 50 }],
                    mv("heal", "Heal", IntentKind::Buff).special(EnemySpecial::HealSelf { amount: 16 }),
                ),
                MoveRule::always(
                    mv("attack_debuff", "Attack Debuff", IntentKind::AttackDebuff)
                        .attack(8, 1)
                        .apply(Status::Frail, 2, Player),
                ),
            ],
        )
        .status(Status::Regen, 2),
        EnemyTemplate::new(
            "shelled_parasite",
            "Shelled Parasite",
            (68, 72),
            vec![
                MoveRule::when(
                    vec![every(2, 0)],
                    mv("double_strike", "Double Strike", IntentKind::Attack).attack(6, 2),
                ),
                MoveRule::always(
                    mv("fell", "Fell", IntentKind::AttackDebuff)
                        .attack(18, 1)
                        .apply(Status::Frail, 2, Player),
                ),
            ],
        )
        .status(Status::PlatedArmor, 14),
        EnemyTemplate::new(
            "spiker",
            "Spiker",
            (42, 56),
            vec![
                MoveRule::when(
                    vec![every(2, 1)],
                    mv("spike", "Spike", IntentKind::Buff).apply(Status::Thorns, 2, Own),
                ),
                MoveRule::always(mv("cut", "Cut", IntentKind::Attack).attack(7, 1)),
            ],
        )
        .status(Status::Thorns, 3)
        .retains_block(),
        EnemyTemplate::new(
            "hexaghost_orb",
            "Orb Walker",
            (90, 96),
            vec![
                MoveRule::when(
                    vec![every(2, 0)],
                    mv("laser", "Laser", IntentKind::AttackDebuff)
                        .attack(10, 1)
                        .special(EnemySpecial::AddCards {
                            card_id: "burn".to_string(),
                            count: 1,
                            pile: PileKind::Discard,
                        }),
                ),
                MoveRule::always(mv("claw", "Claw", IntentKind::AttackBuff).attack(15, 1).apply(
                    Status::Strength,
                    1,
                    Allies,
                )),
            ],
        ),
    ]
}
