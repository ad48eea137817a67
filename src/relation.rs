//! Naming-convention relation lookup for [`Record::resolve`].
//!
//! No schema is consulted. A name is checked against each [`Strategy`] in
//! [`RESOLUTION_ORDER`] and the first one that applies decides what the name
//! means.

use serde::Deserialize;
use serde::Serialize;

use crate::query::Select;
use crate::record::Record;
use crate::value::Value;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Strategy {
    /// The name is a field of the record.
    RawField,
    /// The name was registered with [`Record::map_foreign_key`].
    ExplicitForeignKey,
    /// The record has a `<name>Id` field pointing at a `<name>` row.
    ImplicitBelongsTo,
    /// `<name>` rows carry a `<entity>Id` field pointing back at this record.
    ImplicitHasMany,
}

pub const RESOLUTION_ORDER: [Strategy; 4] =
    [Strategy::RawField, Strategy::ExplicitForeignKey, Strategy::ImplicitBelongsTo, Strategy::ImplicitHasMany];

impl Strategy {
    pub fn applies(&self, record: &Record, name: &str) -> bool {
        match self {
            Strategy::RawField => record.contains(name),
            Strategy::ExplicitForeignKey => record.foreign_key(name).is_some(),
            Strategy::ImplicitBelongsTo => record.contains(&foreign_key_column(name)),
            Strategy::ImplicitHasMany => true,
        }
    }
}

/// The strategy `name` resolves with on `record`.
pub fn strategy_for(record: &Record, name: &str) -> Strategy {
    RESOLUTION_ORDER.into_iter().find(|strategy| strategy.applies(record, name)).unwrap_or(Strategy::ImplicitHasMany)
}

/// `customer` → `customerId`.
pub fn foreign_key_column(entity: &str) -> String {
    format!("{}Id", entity)
}

/// Registered relation: rows of `entity` whose `id` equals the local `column`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForeignKey {
    pub entity: String,
    pub column: String,
}

/// What a resolved name turned out to be.
#[derive(Clone, Debug)]
pub enum Resolved {
    Value(Value),
    /// Related rows, not yet fetched.
    Query(Select),
    /// The single related row of a belongs-to relation.
    Record(Option<Record>),
}

impl Resolved {
    pub fn into_value(self) -> Option<Value> {
        match self {
            Resolved::Value(value) => Some(value),
            _ => None,
        }
    }

    pub fn into_query(self) -> Option<Select> {
        match self {
            Resolved::Query(query) => Some(query),
            _ => None,
        }
    }

    pub fn into_record(self) -> Option<Record> {
        match self {
            Resolved::Record(record) => record,
            _ => None,
        }
    }
}
