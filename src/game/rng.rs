//! 可注入的随机源。洗牌、随机目标、随机卡牌与敌人随机招式都经由这里。

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

pub trait BattleRng {
    /// 返回 `[0, upper)` 内的整数；`upper == 0` 时返回 0。
    fn below(&mut self, upper: usize) -> usize;

    /// 以 `percent`% 的概率返回 true。
    fn chance(&mut self, percent: u32) -> bool {
        (self.below(100) as u32) < percent
    }
}

pub struct SeededRng {
    rng: SmallRng,
}

impl SeededRng {
    pub fn new(seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => SmallRng::seed_from_u64(seed),
            None => SmallRng::from_entropy(),
        };
        Self { rng }
    }

    pub fn from_seed(seed: u64) -> Self {
        Self::new(Some(seed))
    }
}

impl BattleRng for SeededRng {
    fn below(&mut self, upper: usize) -> usize {
        if upper == 0 {
            return 0;
        }
        self.rng.gen_range(0..upper)
    }
}

/// Fisher-Yates，保证结果是输入的一个排列。
pub fn shuffle<T>(rng: &mut dyn BattleRng, items: &mut [T]) {
    for i in (1..items.len()).rev() {
        let j = rng.below(i + 1);
        items.swap(i, j);
    }
}

pub fn pick<'a, T>(rng: &mut dyn BattleRng, items: &'a [T]) -> Option<&'a T> {
    if items.is_empty() {
        None
    } else {
        items.get(rng.below(items.len()))
    }
}

/// 按给定序列循环返回结果的测试随机源。
#[cfg(test)]
pub(crate) struct ScriptedRng {
    values: Vec<usize>,
    cursor: usize,
}

#[cfg(test)]
impl ScriptedRng {
    pub(crate) fn new(values: Vec<usize>) -> Self {
        Self { values, cursor: 0 }
    }
}

#[cfg(test)]
impl BattleRng for ScriptedRng {
    fn below(&mut self, upper: usize) -> usize {
        if upper == 0 || self.values.is_empty() {
            return 0;
        }
        let value = self.values[self.cursor % self.values.len()];
        self.cursor += 1;
        value % upper
    }
}
