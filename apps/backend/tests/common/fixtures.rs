//! Test fixtures and factory functions for creating test data.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde_json::json;

use learnflow_core::Task;

/// Parse a task from its upstream wire form.
pub fn task(value: serde_json::Value) -> Task {
    serde_json::from_value(value).unwrap()
}

pub fn translation_task(id: &str, attempts: u32) -> Task {
    task(json!({
        "id": id,
        "kind": "translation",
        "type": "eng-ru",
        "word": "cat",
        "variants": ["пёс", "кот", "корова"],
        "correct": 1,
        "attempts": attempts
    }))
}

pub fn spelling_task(id: &str, en: &str, mistakes: u32) -> Task {
    task(json!({
        "id": id,
        "kind": "spelling",
        "en": en,
        "ru": "кот",
        "mistakes": mistakes
    }))
}

pub fn pronunciation_task(id: &str, en: &str) -> Task {
    task(json!({"id": id, "kind": "pronunciation", "en": en, "ru": "кот"}))
}

pub fn context_task(id: &str, sentence: &str) -> Task {
    task(json!({
        "id": id,
        "kind": "context",
        "en": sentence,
        "ru": "кот спит",
        "level": "A"
    }))
}

pub fn matching_task(id: &str, pairs: &[(&str, &str)]) -> Task {
    let pairs: Vec<_> = pairs.iter().map(|(en, ru)| json!({"en": en, "ru": ru})).collect();
    task(json!({"id": id, "kind": "matching", "pairs": pairs}))
}

/// One task of every kind.
pub fn full_batch() -> Vec<Task> {
    vec![
        translation_task("t1", 3),
        spelling_task("s1", "cat", 0),
        pronunciation_task("p1", "cat"),
        context_task("c1", "the cat sleeps"),
        matching_task("m1", &[("cat", "кот"), ("dog", "пёс")]),
    ]
}

/// Create a session request body for learn mode.
pub fn create_learn_request(collection_id: i64, word_ids: &[i64]) -> serde_json::Value {
    json!({"collectionId": collection_id, "mode": "learn", "wordIds": word_ids})
}

/// Create a session request body for repeat mode.
pub fn create_repeat_request(collection_id: i64) -> serde_json::Value {
    json!({"collectionId": collection_id, "mode": "repeat"})
}

/// Stop-recording request body carrying `clip`.
pub fn stop_recording_request(clip: &[u8]) -> serde_json::Value {
    json!({"audioBase64": STANDARD.encode(clip)})
}
