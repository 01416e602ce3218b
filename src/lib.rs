pub mod ai;
pub mod config;
pub mod game;
pub mod logging;

use serde::Serialize;
use serde_wasm_bindgen::{from_value, to_value};
use wasm_bindgen::prelude::*;

pub use ai::{DeathRule, EnemyTemplate, Intent, IntentKind, MoveRule};
pub use config::{EngineConfig, ValidationMode};
pub use game::{
    BattleAction, BattleOutcome, BattlePhase, BattleSetup, BattleSnapshot, BattleState, CardInstance, CardTemplate,
    ContentCatalog, ContentError, ContentTables, InvariantViolation, Player, PlayerSetup, PotionTemplate, RelicTemplate,
    RuleEngine, RuleError, RuleResolution, SeededRng, Stance, Status, ValidationError,
};

use game::rules::redact_intents;
use game::validator;

#[cfg(feature = "wee_alloc")]
#[global_allocator]
static ALLOC: wee_alloc::WeeAlloc = wee_alloc::WeeAlloc::INIT;

#[wasm_bindgen(start)]
pub fn start() {
    set_panic_hook();
    #[cfg(target_arch = "wasm32")]
    logging::init_console_logging(tracing::Level::INFO);
}

fn serde_to_js_error<E: std::fmt::Display>(error: E) -> JsValue {
    JsValue::from_str(&error.to_string())
}

fn to_js_error<E: Serialize + std::fmt::Display>(error: E) -> JsValue {
    to_value(&error).unwrap_or_else(|_| JsValue::from_str(&error.to_string()))
}

fn parse_config(config_json: Option<String>) -> Result<EngineConfig, JsValue> {
    match config_json {
        Some(json) if !json.trim().is_empty() => serde_json::from_str(&json).map_err(serde_to_js_error),
        _ => Ok(EngineConfig::default()),
    }
}

/// 对外展示的状态：符文圆顶隐藏意图。
fn view(state: &BattleState) -> BattleState {
    let mut view = state.clone();
    redact_intents(&mut view);
    view
}

/// 面向前端的战斗引擎。状态保存在实例内，每个动作返回结算结果 JSON。
#[wasm_bindgen]
pub struct BattleEngine {
    engine: RuleEngine,
    state: BattleState,
}

#[wasm_bindgen]
impl BattleEngine {
    #[wasm_bindgen(constructor)]
    pub fn new(config_json: Option<String>) -> Result<BattleEngine, JsValue> {
        let config = parse_config(config_json)?;
        Ok(Self::from_engine(RuleEngine::standard(config)))
    }

    /// 使用外部内容表（JSON 形式的 `ContentCatalog`）。
    #[wasm_bindgen(js_name = "withContent")]
    pub fn with_content(content_json: &str, config_json: Option<String>) -> Result<BattleEngine, JsValue> {
        let content = ContentCatalog::from_json(content_json).map_err(serde_to_js_error)?;
        let config = parse_config(config_json)?;
        Ok(Self::from_engine(RuleEngine::new(content, config)))
    }

    fn from_engine(engine: RuleEngine) -> Self {
        let max_energy = engine.config().base_energy;
        Self {
            engine,
            state: BattleState::new(Player::new(80, 80, max_energy)),
        }
    }

    pub fn begin_json(&mut self, setup_json: &str) -> Result<String, JsValue> {
        let setup: BattleSetup = serde_json::from_str(setup_json).map_err(serde_to_js_error)?;
        self.apply(BattleAction::BeginBattle { setup })
    }

    /// 执行一个动作。非法动作不会报错，结果中的 `rejected` 说明原因。
    pub fn dispatch_json(&mut self, action_json: &str) -> Result<String, JsValue> {
        let action: BattleAction = serde_json::from_str(action_json).map_err(serde_to_js_error)?;
        self.apply(action)
    }

    fn apply(&mut self, action: BattleAction) -> Result<String, JsValue> {
        let mut resolution = self.engine.dispatch(&self.state, action);
        self.state = resolution.state.clone();
        redact_intents(&mut resolution.state);
        serde_json::to_string(&resolution).map_err(serde_to_js_error)
    }

    pub fn state_json(&self) -> Result<String, JsValue> {
        serde_json::to_string(&view(&self.state)).map_err(serde_to_js_error)
    }

    /// 载入外部状态，按配置的校验模式检查。
    pub fn set_state_json(&mut self, json: &str) -> Result<(), JsValue> {
        let state = validator::load_checked(json, self.engine.config().validation).map_err(to_js_error)?;
        self.state = state;
        Ok(())
    }

    pub fn snapshot_json(&self) -> Result<String, JsValue> {
        BattleSnapshot::capture(&self.state)
            .to_json()
            .map_err(serde_to_js_error)
    }

    pub fn restore_snapshot_json(&mut self, json: &str) -> Result<(), JsValue> {
        let snapshot = BattleSnapshot::from_json(json).map_err(serde_to_js_error)?;
        let state = snapshot.restore(self.engine.content()).map_err(to_js_error)?;
        self.state = state;
        Ok(())
    }

    pub fn is_finished(&self) -> bool {
        self.state.is_finished()
    }
}

/// 对任意状态执行一个动作，使用标准内容表。
#[wasm_bindgen(js_name = "dispatchAction")]
pub fn dispatch_action(state: JsValue, action: JsValue, config: JsValue) -> Result<JsValue, JsValue> {
    let state: BattleState = from_value(state).map_err(JsValue::from)?;
    let action: BattleAction = from_value(action).map_err(JsValue::from)?;
    let config: EngineConfig = if config.is_undefined() || config.is_null() {
        EngineConfig::default()
    } else {
        from_value(config).map_err(JsValue::from)?
    };
    let mut engine = RuleEngine::standard(config);
    let mut resolution = engine.dispatch(&state, action);
    redact_intents(&mut resolution.state);
    to_value(&resolution).map_err(JsValue::from)
}

/// 返回全部结构违规项，不修改状态。
#[wasm_bindgen(js_name = "validateState")]
pub fn validate_state(state: JsValue) -> Result<JsValue, JsValue> {
    let state: BattleState = from_value(state).map_err(JsValue::from)?;
    to_value(&validator::validate(&state)).map_err(JsValue::from)
}

#[wasm_bindgen(js_name = "standardContent")]
pub fn standard_content() -> Result<JsValue, JsValue> {
    to_value(&ContentCatalog::standard()).map_err(JsValue::from)
}

#[wasm_bindgen(js_name = "starterDeck")]
pub fn starter_deck() -> Result<JsValue, JsValue> {
    to_value(&ContentCatalog::starter_deck()).map_err(JsValue::from)
}

#[cfg(feature = "console_error_panic_hook")]
fn set_panic_hook() {
    console_error_panic_hook::set_once();
}

#[cfg(not(feature = "console_error_panic_hook"))]
fn set_panic_hook() {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn engine_runs_a_battle_through_json() {
        let mut engine = BattleEngine::new(Some(r#"{"seed":5}"#.to_string())).expect("config should parse");
        let begun = engine
            .begin_json(r#"{"enemies":["jaw_worm"],"deck":["strike","strike","strike","strike","strike"]}"#)
            .expect("setup should parse");
        let resolution: serde_json::Value = serde_json::from_str(&begun).expect("resolution is json");
        assert_eq!(resolution["state"]["turn"], 1);
        assert!(resolution.get("rejected").is_none());

        let ended = engine
            .dispatch_json(r#"{"type":"endTurn"}"#)
            .expect("action should parse");
        let resolution: serde_json::Value = serde_json::from_str(&ended).expect("resolution is json");
        assert_eq!(resolution["state"]["turn"], 2);
        assert!(resolution["log"]
            .as_array()
            .is_some_and(|log| log.iter().any(|entry| entry.as_str() == Some("Turn 2"))));
    }

    #[test]
    fn rejected_actions_report_the_reason() {
        let mut engine = BattleEngine::new(None).expect("default config");
        engine
            .begin_json(r#"{"enemies":["cultist"]}"#)
            .expect("setup should parse");
        let json = engine
            .dispatch_json(r#"{"type":"cancelSelection"}"#)
            .expect("action should parse");
        let resolution: serde_json::Value = serde_json::from_str(&json).expect("resolution is json");
        assert_eq!(resolution["rejected"]["type"], "InvalidPhase");
    }

    #[test]
    fn snapshots_restore_into_the_engine() {
        let mut engine = BattleEngine::new(Some(r#"{"seed":9}"#.to_string())).expect("config should parse");
        engine
            .begin_json(r#"{"enemies":["cultist"],"relics":["anchor"]}"#)
            .expect("setup should parse");
        let before = engine.state_json().expect("state serializes");
        let snapshot = engine.snapshot_json().expect("snapshot serializes");

        engine.dispatch_json(r#"{"type":"endTurn"}"#).expect("action should parse");
        engine.restore_snapshot_json(&snapshot).expect("snapshot restores");
        assert_eq!(engine.state_json().expect("state serializes"), before);
    }
}
