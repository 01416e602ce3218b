//! 引擎配置：校验模式、手牌与能量等基础数值。

use std::str::FromStr;

use serde::{Deserialize, Serialize};

pub const DEFAULT_HAND_SIZE: u32 = 5;
pub const DEFAULT_MAX_HAND_SIZE: usize = 10;
pub const DEFAULT_MANTRA_THRESHOLD: i32 = 10;
pub const DEFAULT_BASE_ENERGY: i32 = 3;
pub const DEFAULT_ORB_SLOTS: usize = 3;

/// 状态校验失败时的处理方式。
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ValidationMode {
    /// 开发环境：返回完整诊断列表，不做修正。
    #[default]
    Strict,
    /// 生产环境：记录日志并只做安全修正。
    Lenient,
}

impl FromStr for ValidationMode {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "strict" | "dev" | "development" => Ok(ValidationMode::Strict),
            "lenient" | "prod" | "production" => Ok(ValidationMode::Lenient),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct EngineConfig {
    pub validation: ValidationMode,
    pub base_hand_size: u32,
    pub max_hand_size: usize,
    pub mantra_threshold: i32,
    pub base_energy: i32,
    pub default_orb_slots: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
}

impl EngineConfig {
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_validation(mut self, mode: ValidationMode) -> Self {
        self.validation = mode;
        self
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            validation: ValidationMode::default(),
            base_hand_size: DEFAULT_HAND_SIZE,
            max_hand_size: DEFAULT_MAX_HAND_SIZE,
            mantra_threshold: DEFAULT_MANTRA_THRESHOLD,
            base_energy: DEFAULT_BASE_ENERGY,
            default_orb_slots: DEFAULT_ORB_SLOTS,
            seed: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_mode_accepts_environment_aliases() {
        assert_eq!(ValidationMode::from_str("dev"), Ok(ValidationMode::Strict));
        assert_eq!(ValidationMode::from_str("Production"), Ok(ValidationMode::Lenient));
        assert!(ValidationMode::from_str("paranoid").is_err());
    }

    #[test]
    fn partial_json_falls_back_to_defaults() {
        let config: EngineConfig =
            serde_json::from_str(r#"{"validation":"lenient","seed":7}"#).expect("config should parse");
        assert_eq!(config.validation, ValidationMode::Lenient);
        assert_eq!(config.seed, Some(7));
        assert_eq!(config.base_hand_size, DEFAULT_HAND_SIZE);
        assert_eq!(config.mantra_threshold, DEFAULT_MANTRA_THRESHOLD);
    }
}
