//! Active record over one row.

use std::collections::BTreeMap;

use serde::Deserialize;
use serde::Serialize;

use crate::context::Context;
use crate::entity::Entity;
use crate::error::Error;
use crate::error::Result;
use crate::events::Dispatch;
use crate::events::EventName;
use crate::events::Payload;
use crate::query::Condition;
use crate::query::Delete;
use crate::query::Insert;
use crate::query::Update;
use crate::relation::ForeignKey;
use crate::relation::Resolved;
use crate::relation::Strategy;
use crate::relation::foreign_key_column;
use crate::relation::strategy_for;
use crate::value::FromValue;
use crate::value::IntoValue;
use crate::value::Row;
use crate::value::Value;
use crate::value::column_key;
use crate::value::lookup;

static NULL: Value = Value::Null;

/// One row of an entity, with the snapshot it was loaded from.
///
/// Persistence methods never fail loudly: they return `false` and keep the
/// reason in [`message`](Record::message).
///
/// Serializes as `{entity, row}`. The primary key name, foreign-key mappings
/// and context are not part of the serialized form and must be set again
/// after deserializing.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(from = "Snapshot", into = "Snapshot")]
pub struct Record {
    entity:       String,
    current:      Row,
    original:     Row,
    pk:           String,
    context:      Option<Context>,
    error:        Option<String>,
    foreign_keys: BTreeMap<String, ForeignKey>,
}

#[derive(Serialize, Deserialize)]
struct Snapshot {
    entity: String,
    row:    Row,
}

impl From<Snapshot> for Record {
    fn from(snapshot: Snapshot) -> Self {
        Record::new(snapshot.entity, snapshot.row)
    }
}

impl From<Record> for Snapshot {
    fn from(record: Record) -> Self {
        Snapshot { entity: record.entity, row: record.current }
    }
}

impl Record {
    pub fn new(entity: impl Into<String>, row: Row) -> Self {
        Self {
            entity:       entity.into(),
            original:     row.clone(),
            current:      row,
            pk:           "id".to_string(),
            context:      None,
            error:        None,
            foreign_keys: BTreeMap::new(),
        }
    }

    pub fn from_entity<E: Entity>(entity: E) -> Self {
        Self::new(E::entity_name(), entity.into_row()).with_pk(E::primary_key())
    }

    pub fn with_pk(mut self, pk: impl Into<String>) -> Self {
        self.pk = pk.into();
        self
    }

    pub fn attach(mut self, context: Context) -> Self {
        self.context = Some(context);
        self
    }

    pub fn is_attached(&self) -> bool {
        self.context.is_some()
    }

    pub fn context(&self) -> Option<&Context> {
        self.context.as_ref()
    }

    pub fn entity(&self) -> &str {
        &self.entity
    }

    pub fn pk(&self) -> &str {
        &self.pk
    }

    /// Field names match ASCII case-insensitively, see [`column_key`].
    pub fn get(&self, field: &str) -> Option<&Value> {
        lookup(&self.current, field)
    }

    pub fn get_as<T: FromValue>(&self, field: &str) -> Result<T> {
        match lookup(&self.current, field) {
            Some(value) => T::from_value(value.clone()),
            None => Err(Error::ColumnNotFound(field.to_string())),
        }
    }

    /// Overwrites an existing field under its stored name, whatever case
    /// `field` is given in.
    pub fn set<V: IntoValue>(&mut self, field: impl Into<String>, value: V) -> &mut Self {
        self.put(field.into(), value.into_value());
        self
    }

    pub fn remove(&mut self, field: &str) -> Option<Value> {
        let key = column_key(&self.current, field)?.to_string();
        self.current.remove(&key)
    }

    pub fn contains(&self, field: &str) -> bool {
        lookup(&self.current, field).is_some()
    }

    fn put(&mut self, field: String, value: Value) {
        let key = column_key(&self.current, &field).map(str::to_string).unwrap_or(field);
        self.current.insert(key, value);
    }

    /// Copy every field of `data` over the current row.
    pub fn merge<K, V, I>(&mut self, data: I) -> &mut Self
    where
        K: Into<String>,
        V: IntoValue,
        I: IntoIterator<Item = (K, V)>,
    {
        for (field, value) in data {
            self.put(field.into(), value.into_value());
        }
        self
    }

    /// Whether the row differs from the snapshot taken at construction or the
    /// last [`reset`](Record::reset), compared by canonical JSON.
    pub fn is_modified(&self) -> bool {
        canonical(&self.current) != canonical(&self.original)
    }

    /// Take the current row as the new snapshot.
    pub fn reset(&mut self) -> &mut Self {
        self.original = self.current.clone();
        self
    }

    pub fn row(&self) -> &Row {
        &self.current
    }

    pub fn into_row(self) -> Row {
        self.current
    }

    pub fn to_entity<E: Entity>(&self) -> Result<E> {
        E::from_row(&self.current)
    }

    /// Last persistence failure, if any.
    pub fn message(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Register `alias` (or `entity` itself) as the rows of `entity` whose
    /// `id` equals this record's `column`.
    pub fn map_foreign_key(mut self, column: impl Into<String>, entity: impl Into<String>, alias: Option<&str>) -> Self {
        let entity = entity.into();
        let name = alias.map(str::to_string).unwrap_or_else(|| entity.clone());
        self.foreign_keys.insert(name, ForeignKey { entity, column: column.into() });
        self
    }

    pub fn foreign_key(&self, name: &str) -> Option<&ForeignKey> {
        self.foreign_keys.get(name)
    }

    fn require_context(&self) -> Result<&Context> {
        self.context.as_ref().ok_or(Error::Detached)
    }

    /// Resolve `name` as a field or a relation.
    ///
    /// Only a belongs-to relation touches the database; has-many and mapped
    /// relations come back as unexecuted queries.
    pub fn resolve(&self, name: &str) -> Result<Resolved> {
        match strategy_for(self, name) {
            Strategy::RawField => Ok(Resolved::Value(self[name].clone())),
            Strategy::ExplicitForeignKey => {
                let context = self.require_context()?;
                let mapping = self.foreign_keys.get(name).ok_or_else(|| Error::ColumnNotFound(name.to_string()))?;
                let id = self[mapping.column.as_str()].clone();
                let query = context.set(mapping.entity.clone()).filter(Condition::eq("id", id));
                Ok(Resolved::Query(query))
            }
            Strategy::ImplicitBelongsTo => {
                let context = self.require_context()?;
                let id = &self[foreign_key_column(name).as_str()];
                if id.is_null() {
                    return Ok(Resolved::Record(None));
                }
                let related = context.set(name).filter(Condition::eq("id", id.clone())).first()?;
                Ok(Resolved::Record(related))
            }
            Strategy::ImplicitHasMany => {
                let context = self.require_context()?;
                let column = foreign_key_column(&self.entity);
                let query = context.set(name).filter(Condition::eq(column, self[self.pk.as_str()].clone()));
                Ok(Resolved::Query(query))
            }
        }
    }

    fn has_pk(&self) -> bool {
        lookup(&self.current, &self.pk).is_some_and(Value::is_truthy)
    }

    /// Update when the primary key is set, insert otherwise.
    #[must_use]
    pub fn save(&mut self) -> bool {
        if self.has_pk() { self.update() } else { self.create() }
    }

    #[must_use]
    pub fn create(&mut self) -> bool {
        self.error = None;
        let context = match self.require_context() {
            Ok(context) => context.clone(),
            Err(err) => return self.fail("insert", err),
        };

        let Some(row) = self.before(&context, EventName::BeforeInsert) else {
            return self.vetoed("insert");
        };

        let generated = !lookup(&row, &self.pk).is_some_and(Value::is_truthy);
        let table = context.table(&self.entity).physical_name();
        let handle = match Insert::new(table, row, self.pk.clone()).exec(context.manager()) {
            Ok(handle) => handle,
            Err(err) => return self.fail("insert", err),
        };

        if generated {
            if let Some(id) = handle.last_insert_id {
                self.put(self.pk.clone(), Value::Integer(id));
            }
        }

        self.after(&context, EventName::AfterInsert);
        true
    }

    #[must_use]
    pub fn update(&mut self) -> bool {
        self.error = None;
        if !self.has_pk() {
            return self.fail("update", Error::Validation(format!("primary key `{}` is not set", self.pk)));
        }
        let context = match self.require_context() {
            Ok(context) => context.clone(),
            Err(err) => return self.fail("update", err),
        };

        let Some(row) = self.before(&context, EventName::BeforeUpdate) else {
            return self.vetoed("update");
        };

        let table = context.table(&self.entity).physical_name();
        if let Err(err) = Update::new(table, row, self.pk.clone()).exec(context.manager()) {
            return self.fail("update", err);
        }

        self.after(&context, EventName::AfterUpdate);
        true
    }

    #[must_use]
    pub fn delete(&mut self) -> bool {
        self.error = None;
        if !self.has_pk() {
            return self.fail("delete", Error::Validation(format!("primary key `{}` is not set", self.pk)));
        }
        let context = match self.require_context() {
            Ok(context) => context.clone(),
            Err(err) => return self.fail("delete", err),
        };

        if self.before(&context, EventName::BeforeDelete).is_none() {
            return self.vetoed("delete");
        }

        let table = context.table(&self.entity).physical_name();
        let id = self[self.pk.as_str()].clone();
        if let Err(err) = Delete::new(table, self.pk.clone(), id).exec(context.manager()) {
            return self.fail("delete", err);
        }

        self.after(&context, EventName::AfterDelete);
        true
    }

    /// The row to persist after `event` handlers ran, `None` on abort.
    fn before(&self, context: &Context, event: EventName) -> Option<Row> {
        let payload = Payload::Record { entity: self.entity.clone(), row: self.current.clone() };
        match context.events().notify(event, payload) {
            Dispatch::Abort => None,
            Dispatch::Proceed(Payload::Record { row, .. }) => Some(row),
            Dispatch::Proceed(_) => Some(self.current.clone()),
        }
    }

    fn after(&mut self, context: &Context, event: EventName) {
        let events = context.events();
        if !events.has_handlers(event) {
            return;
        }
        let payload = Payload::Record { entity: self.entity.clone(), row: self.current.clone() };
        if let Dispatch::Proceed(Payload::Record { row, .. }) = events.notify(event, payload) {
            self.current = row;
        }
    }

    fn vetoed(&mut self, operation: &str) -> bool {
        tracing::debug!(entity = %self.entity, operation, "persistence aborted by handler");
        self.error = Some(format!("{} aborted by handler", operation));
        false
    }

    fn fail(&mut self, operation: &str, err: Error) -> bool {
        tracing::warn!(entity = %self.entity, operation, error = %err, "persistence failed");
        self.error = Some(err.to_string());
        false
    }
}

fn canonical(row: &Row) -> String {
    serde_json::to_string(row).unwrap_or_default()
}

impl std::ops::Index<&str> for Record {
    type Output = Value;

    /// `Value::Null` for a missing field.
    fn index(&self, field: &str) -> &Self::Output {
        lookup(&self.current, field).unwrap_or(&NULL)
    }
}
