//! Event fields addressable by conditions.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::Operator;

/// An event field a condition can test.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    /// Game title, falling back to the game id.
    Game,
    Title,
    Price,
    #[serde(alias = "discountPct")]
    DiscountPct,
    #[serde(alias = "storeId")]
    StoreId,
    Kind,
    #[serde(alias = "inStock")]
    InStock,
    Publisher,
    Tags,
}

impl Field {
    pub const ALL: [Field; 9] = [
        Field::Game,
        Field::Title,
        Field::Price,
        Field::DiscountPct,
        Field::StoreId,
        Field::Kind,
        Field::InStock,
        Field::Publisher,
        Field::Tags,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Field::Game => "game",
            Field::Title => "title",
            Field::Price => "price",
            Field::DiscountPct => "discount_pct",
            Field::StoreId => "store_id",
            Field::Kind => "kind",
            Field::InStock => "in_stock",
            Field::Publisher => "publisher",
            Field::Tags => "tags",
        }
    }

    /// The operators a rule author may pair with this field.
    pub fn allowed_operators(&self) -> &'static [Operator] {
        use Operator::*;
        match self {
            Field::Game => &[In, Contains, ContainsAny, Equals],
            Field::Title => &[Contains, ContainsAny, Equals, StartsWith],
            Field::Price | Field::DiscountPct => &[Gte, Lte, Equals, Between],
            Field::StoreId | Field::Kind => &[In, Equals],
            Field::InStock => &[Equals],
            Field::Publisher => &[Contains, Equals, In],
            Field::Tags => &[ContainsAny, ContainsAll],
        }
    }

    pub fn allows(&self, operator: Operator) -> bool {
        self.allowed_operators().contains(&operator)
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, Field::Price | Field::DiscountPct)
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
