use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::signature::{self, TimeBucket};

/// Lifecycle stage of a marketplace observation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    Announce,
    Preorder,
    Release,
    Discount,
    Price,
}

impl EventKind {
    pub const ALL: [EventKind; 5] = [
        EventKind::Announce,
        EventKind::Preorder,
        EventKind::Release,
        EventKind::Discount,
        EventKind::Price,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::Announce => "announce",
            EventKind::Preorder => "preorder",
            EventKind::Release => "release",
            EventKind::Discount => "discount",
            EventKind::Price => "price",
        }
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for EventKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EventKind::ALL
            .into_iter()
            .find(|k| k.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown event kind: '{s}'"))
    }
}

fn default_currency() -> String {
    "RUB".to_string()
}

/// One normalized marketplace observation, as produced by a crawler agent.
///
/// Immutable once built. `signature` identifies the real-world observation and
/// is what deduplication keys on; `id` is only a record identifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub id: String,
    #[serde(default, alias = "gameId")]
    pub game_id: Option<String>,
    #[serde(default, alias = "gameTitle")]
    pub game_title: Option<String>,
    #[serde(default, alias = "storeId")]
    pub store_id: Option<String>,
    pub kind: EventKind,
    pub title: String,
    #[serde(default)]
    pub edition: Option<String>,
    #[serde(default)]
    pub price: Option<f64>,
    #[serde(default = "default_currency")]
    pub currency: String,
    #[serde(default, alias = "discountPct")]
    pub discount_pct: Option<f64>,
    #[serde(default, alias = "inStock")]
    pub in_stock: Option<bool>,
    #[serde(default)]
    pub publisher: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default, alias = "startAt")]
    pub start_at: Option<DateTime<Utc>>,
    #[serde(default, alias = "endAt")]
    pub end_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default, alias = "sourceId")]
    pub source_id: Option<String>,
    #[serde(alias = "createdAt")]
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub signature: String,
}

impl Event {
    /// Start an event with only the required fields set; the signature is
    /// left empty until [`Event::with_computed_signature`] or
    /// [`Event::with_signature`] is called.
    pub fn new(id: impl Into<String>, kind: EventKind, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            game_id: None,
            game_title: None,
            store_id: None,
            kind,
            title: title.into(),
            edition: None,
            price: None,
            currency: default_currency(),
            discount_pct: None,
            in_stock: None,
            publisher: None,
            tags: Vec::new(),
            start_at: None,
            end_at: None,
            url: None,
            source_id: None,
            created_at: Utc::now(),
            signature: String::new(),
        }
    }

    pub fn with_store(mut self, store_id: impl Into<String>) -> Self {
        self.store_id = Some(store_id.into());
        self
    }

    pub fn with_game(mut self, game_id: impl Into<String>, game_title: impl Into<String>) -> Self {
        self.game_id = Some(game_id.into());
        self.game_title = Some(game_title.into());
        self
    }

    pub fn with_price(mut self, price: f64) -> Self {
        self.price = Some(price);
        self
    }

    pub fn with_discount(mut self, discount_pct: f64) -> Self {
        self.discount_pct = Some(discount_pct);
        self
    }

    pub fn with_stock(mut self, in_stock: bool) -> Self {
        self.in_stock = Some(in_stock);
        self
    }

    pub fn with_publisher(mut self, publisher: impl Into<String>) -> Self {
        self.publisher = Some(publisher.into());
        self
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    pub fn at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = created_at;
        self
    }

    pub fn with_signature(mut self, signature: impl Into<String>) -> Self {
        self.signature = signature.into();
        self
    }

    /// Fill an empty signature from the event's content (day bucket).
    /// A signature supplied by the normalizer is kept as is.
    pub fn with_computed_signature(mut self) -> Self {
        if self.signature.is_empty() {
            self.signature = signature::compute(&self, TimeBucket::Day);
        }
        self
    }

    /// Check the producer-side contract: non-empty id and signature, and a
    /// discount percentage inside 0..=100 when present.
    pub fn validate(&self) -> Result<(), CoreError> {
        let invalid = |reason: &str| CoreError::InvalidEvent {
            id: self.id.clone(),
            reason: reason.to_string(),
        };

        if self.id.trim().is_empty() {
            return Err(invalid("id must not be empty"));
        }
        if self.signature.trim().is_empty() {
            return Err(invalid("signature must not be empty"));
        }
        if let Some(pct) = self.discount_pct {
            if !(0.0..=100.0).contains(&pct) {
                return Err(invalid("discount_pct must be within 0..=100"));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_round_trips_through_str() {
        for kind in EventKind::ALL {
            assert_eq!(kind.as_str().parse::<EventKind>().unwrap(), kind);
        }
        assert!("restock".parse::<EventKind>().is_err());
    }

    #[test]
    fn deserializes_snake_and_camel_case() {
        let snake: Event = serde_json::from_str(
            r#"{"id":"e1","kind":"discount","title":"Sale","store_id":"lavkaigr",
                "discount_pct":25,"created_at":"2024-01-15T09:15:00Z","signature":"abc"}"#,
        )
        .unwrap();
        let camel: Event = serde_json::from_str(
            r#"{"id":"e1","kind":"discount","title":"Sale","storeId":"lavkaigr",
                "discountPct":25,"createdAt":"2024-01-15T09:15:00Z","signature":"abc"}"#,
        )
        .unwrap();
        assert_eq!(snake, camel);
        assert_eq!(snake.currency, "RUB");
        assert_eq!(snake.discount_pct, Some(25.0));
    }

    #[test]
    fn validate_rejects_missing_signature() {
        let event = Event::new("e1", EventKind::Price, "Dune");
        let err = event.validate().unwrap_err().to_string();
        assert!(err.contains("signature"));
    }

    #[test]
    fn validate_rejects_out_of_range_discount() {
        let event = Event::new("e1", EventKind::Discount, "Dune")
            .with_discount(140.0)
            .with_signature("sig");
        assert!(event.validate().is_err());
    }

    #[test]
    fn computed_signature_keeps_supplied_value() {
        let event = Event::new("e1", EventKind::Price, "Dune")
            .with_signature("from-normalizer")
            .with_computed_signature();
        assert_eq!(event.signature, "from-normalizer");

        let event = Event::new("e2", EventKind::Price, "Dune").with_computed_signature();
        assert_eq!(event.signature.len(), 64);
    }
}
