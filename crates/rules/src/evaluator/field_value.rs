//! Resolution of a condition's field against an event.

use boardwatch_core::Event;

use crate::schema::Field;

/// The shape of an event field as seen by an operator.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FieldValue<'a> {
    Text(&'a str),
    Number(f64),
    Bool(bool),
    List(&'a [String]),
    /// Optional field not set on this event. Matches nothing.
    Missing,
}

impl<'a> FieldValue<'a> {
    fn text(value: Option<&'a String>) -> Self {
        value.map_or(FieldValue::Missing, |s| FieldValue::Text(s.as_str()))
    }

    fn number(value: Option<f64>) -> Self {
        value.map_or(FieldValue::Missing, FieldValue::Number)
    }
}

/// Read `field` from `event`.
pub fn resolve(field: Field, event: &Event) -> FieldValue<'_> {
    match field {
        Field::Game => FieldValue::text(event.game_title.as_ref().or(event.game_id.as_ref())),
        Field::Title => FieldValue::Text(&event.title),
        Field::Price => FieldValue::number(event.price),
        Field::DiscountPct => FieldValue::number(event.discount_pct),
        Field::StoreId => FieldValue::text(event.store_id.as_ref()),
        Field::Kind => FieldValue::Text(event.kind.as_str()),
        Field::InStock => event.in_stock.map_or(FieldValue::Missing, FieldValue::Bool),
        Field::Publisher => FieldValue::text(event.publisher.as_ref()),
        Field::Tags => FieldValue::List(&event.tags),
    }
}
