//! Content-derived deduplication signatures.
//!
//! Two crawlers that observe the same listing in the same time bucket must
//! produce the same signature even if they assign different event ids, so the
//! hash covers only normalized content: store, game, kind, rounded price,
//! rounded discount, stock flag, and the bucket of `created_at`.

use sha2::{Digest, Sha256};

use crate::event::Event;

/// Filler words that crawlers attach to listing titles inconsistently.
const JUNK_WORDS: &[&str] = &[
    "настольная игра",
    "настольные игры",
    "издание",
    "делюкс",
    "эксклюзив",
    "board game",
];

/// Granularity of the time component of a signature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TimeBucket {
    Hour,
    #[default]
    Day,
}

/// Lowercase, drop filler words and punctuation, collapse whitespace.
pub fn normalize_text(text: &str) -> String {
    let mut text = text.to_lowercase();
    for word in JUNK_WORDS {
        text = text.replace(word, " ");
    }
    let cleaned: String = text
        .chars()
        .filter(|c| c.is_alphanumeric() || c.is_whitespace() || *c == '-')
        .collect();
    cleaned.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn rounded(value: Option<f64>) -> String {
    match value {
        Some(v) if v.is_finite() => format!("{}", v.round() as i64),
        _ => "null".to_string(),
    }
}

/// Compute the hex SHA-256 signature of an event.
pub fn compute(event: &Event, bucket: TimeBucket) -> String {
    let game = event
        .game_title
        .as_deref()
        .map(normalize_text)
        .filter(|g| !g.is_empty())
        .or_else(|| event.game_id.clone())
        .unwrap_or_else(|| normalize_text(&event.title));

    let stock = match event.in_stock {
        Some(true) => "1",
        Some(false) => "0",
        None => "null",
    };

    let bucket = match bucket {
        TimeBucket::Hour => event.created_at.format("%Y-%m-%dT%H").to_string(),
        TimeBucket::Day => event.created_at.format("%Y-%m-%d").to_string(),
    };

    let base = format!(
        "{}|{}|{}|{}|{}|{}|{}",
        event.store_id.as_deref().unwrap_or(""),
        game,
        event.kind.as_str(),
        rounded(event.price),
        rounded(event.discount_pct),
        stock,
        bucket,
    );

    hex::encode(Sha256::digest(base.as_bytes()))
}
