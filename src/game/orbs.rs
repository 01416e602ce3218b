//! 充能球：引导、被动与激发。

use std::fmt;

use serde::{Deserialize, Serialize};

use super::state::Player;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum OrbKind {
    Lightning,
    Frost,
    Dark,
    Plasma,
}

impl fmt::Display for OrbKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            OrbKind::Lightning => "Lightning",
            OrbKind::Frost => "Frost",
            OrbKind::Dark => "Dark",
            OrbKind::Plasma => "Plasma",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Orb {
    pub kind: OrbKind,
    /// 黑暗球累积的伤害。
    #[serde(default)]
    pub stored: i32,
}

impl Orb {
    pub fn new(kind: OrbKind) -> Self {
        let stored = if kind == OrbKind::Dark { 6 } else { 0 };
        Self { kind, stored }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrbOutput {
    DamageRandom(i32),
    DamageLowest(i32),
    Block(i32),
    Energy(i32),
    Charge(i32),
}

pub fn passive_value(orb: &Orb, focus: i32) -> OrbOutput {
    match orb.kind {
        OrbKind::Lightning => OrbOutput::DamageRandom((3 + focus).max(0)),
        OrbKind::Frost => OrbOutput::Block((2 + focus).max(0)),
        OrbKind::Dark => OrbOutput::Charge((6 + focus).max(0)),
        OrbKind::Plasma => OrbOutput::Energy(1),
    }
}

pub fn evoke_value(orb: &Orb, focus: i32) -> OrbOutput {
    match orb.kind {
        OrbKind::Lightning => OrbOutput::DamageRandom((8 + focus).max(0)),
        OrbKind::Frost => OrbOutput::Block((5 + focus).max(0)),
        OrbKind::Dark => OrbOutput::DamageLowest((orb.stored + focus).max(0)),
        OrbKind::Plasma => OrbOutput::Energy(2),
    }
}

/// 槽位满时先激发最左侧的球，返回其效果。
pub fn channel(player: &mut Player, kind: OrbKind) -> Option<OrbOutput> {
    let mut evoked = None;
    if player.orb_slots == 0 {
        return None;
    }
    if player.orbs.len() >= player.orb_slots {
        let first = player.orbs.remove(0);
        evoked = Some(evoke_value(&first, player.focus));
    }
    player.orbs.push(Orb::new(kind));
    evoked
}

pub fn evoke_first(player: &mut Player) -> Option<OrbOutput> {
    if player.orbs.is_empty() {
        return None;
    }
    let orb = player.orbs.remove(0);
    Some(evoke_value(&orb, player.focus))
}

/// 激发但不移除（双重施法的第一次）。
pub fn peek_evoke(player: &Player) -> Option<OrbOutput> {
    player.orbs.first().map(|orb| evoke_value(orb, player.focus))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn defect() -> Player {
        let mut player = Player::new(75, 75, 3);
        player.orb_slots = 3;
        player
    }

    #[test]
    fn channel_into_full_slots_evokes_leftmost() {
        let mut player = defect();
        assert_eq!(channel(&mut player, OrbKind::Frost), None);
        assert_eq!(channel(&mut player, OrbKind::Lightning), None);
        assert_eq!(channel(&mut player, OrbKind::Dark), None);

        let evoked = channel(&mut player, OrbKind::Plasma);
        assert_eq!(evoked, Some(OrbOutput::Block(5)));
        let kinds: Vec<OrbKind> = player.orbs.iter().map(|orb| orb.kind).collect();
        assert_eq!(kinds, vec![OrbKind::Lightning, OrbKind::Dark, OrbKind::Plasma]);
    }

    #[test]
    fn focus_scales_everything_but_plasma() {
        let lightning = Orb::new(OrbKind::Lightning);
        let plasma = Orb::new(OrbKind::Plasma);
        assert_eq!(passive_value(&lightning, 2), OrbOutput::DamageRandom(5));
        assert_eq!(evoke_value(&lightning, -10), OrbOutput::DamageRandom(0));
        assert_eq!(evoke_value(&plasma, 5), OrbOutput::Energy(2));
    }

    #[test]
    fn dark_orb_evokes_stored_damage() {
        let mut orb = Orb::new(OrbKind::Dark);
        orb.stored += 6;
        assert_eq!(evoke_value(&orb, 1), OrbOutput::DamageLowest(13));
    }
}
