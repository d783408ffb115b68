//! Broadcast payload grammar.
//!
//! A broadcast is either the literal [`SAVE_TRIGGER`] or a `;`-separated
//! list of `key=value` pairs, one of which is `event`.

use std::collections::HashMap;

use crate::event::Event;

/// Literal broadcast meaning "flush the dataset immediately".
pub const SAVE_TRIGGER: &str = "minebackup save";

/// One classified inbound broadcast.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Broadcast {
    /// The literal save trigger; bypasses the key/value parser.
    SaveTrigger,
    /// A structured event carrying an `event` key.
    Event(Event),
    /// Key/value content without an `event` key.
    Unrouted(HashMap<String, String>),
}

impl Broadcast {
    pub fn classify(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed == SAVE_TRIGGER {
            return Self::SaveTrigger;
        }
        let fields = parse_payload(trimmed);
        match Event::from_fields(fields) {
            Ok(event) => Self::Event(event),
            Err(fields) => Self::Unrouted(fields),
        }
    }
}

/// Split `key=value;key=value` into a map. Pairs without `=` are dropped;
/// the first `=` separates key from value. Later duplicates win.
pub fn parse_payload(raw: &str) -> HashMap<String, String> {
    let mut fields = HashMap::new();
    for pair in raw.split(';') {
        if pair.is_empty() {
            continue;
        }
        let Some((key, value)) = pair.split_once('=') else {
            tracing::debug!(pair, "dropping payload pair without '='");
            continue;
        };
        fields.insert(key.trim().to_string(), value.trim().to_string());
    }
    fields
}
