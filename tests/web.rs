//! 浏览器环境下的冒烟测试：`wasm-pack test --headless --firefox`。

#![cfg(target_arch = "wasm32")]

use battle_core::BattleEngine;
use wasm_bindgen_test::*;

wasm_bindgen_test_configure!(run_in_browser);

#[wasm_bindgen_test]
fn battle_starts_and_ends_a_turn() {
    let mut engine = BattleEngine::new(Some(r#"{"seed":1}"#.to_string())).expect("config should parse");
    let begun = engine
        .begin_json(r#"{"enemies":["jaw_worm"]}"#)
        .expect("setup should parse");
    assert!(begun.contains("\"turn\":1"));

    let ended = engine
        .dispatch_json(r#"{"type":"endTurn"}"#)
        .expect("action should parse");
    assert!(ended.contains("\"turn\":2"));
    assert!(!engine.is_finished());
}

#[wasm_bindgen_test]
fn standard_content_crosses_the_boundary() {
    let deck = battle_core::starter_deck().expect("starter deck serializes");
    assert!(deck.is_object());
}
