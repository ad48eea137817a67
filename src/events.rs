//! Named hooks around connections, statements and record persistence.
//!
//! Handlers run in registration order. Each one sees the payload as left by
//! the previous handler and answers with a [`Reply`]: pass it on unchanged,
//! replace it, or abort the whole dispatch.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::PoisonError;
use std::sync::RwLock;

use crate::connection::Executed;
use crate::query::Select;
use crate::result::ResultSet;
use crate::value::Params;
use crate::value::Row;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EventName {
    ConnectionOpened,
    ConnectionClosed,
    ExecutingQuery,
    QueryExecuted,
    BeforeSelect,
    AfterSelect,
    BeforeInsert,
    AfterInsert,
    BeforeUpdate,
    AfterUpdate,
    BeforeDelete,
    AfterDelete,
}

impl EventName {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventName::ConnectionOpened => "connection-opened",
            EventName::ConnectionClosed => "connection-closed",
            EventName::ExecutingQuery => "executing-query",
            EventName::QueryExecuted => "query-executed",
            EventName::BeforeSelect => "before-select",
            EventName::AfterSelect => "after-select",
            EventName::BeforeInsert => "before-insert",
            EventName::AfterInsert => "after-insert",
            EventName::BeforeUpdate => "before-update",
            EventName::AfterUpdate => "after-update",
            EventName::BeforeDelete => "before-delete",
            EventName::AfterDelete => "after-delete",
        }
    }
}

impl std::fmt::Display for EventName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Data handed to handlers.
#[derive(Clone, Debug)]
pub enum Payload {
    /// Connection lifecycle; `key` is the credentials fingerprint.
    Connection { key: String },
    /// A statement about to run.
    Statement { sql: String, params: Params },
    Executed { sql: String, params: Params, result: Executed },
    /// Snapshot of a builder about to fetch.
    Select(Select),
    Selected { query: Select, result: ResultSet },
    /// A result set offered in place of running the query.
    Results(ResultSet),
    Record { entity: String, row: Row },
}

pub enum Reply {
    Pass,
    Replace(Payload),
    Abort,
}

/// Outcome of [`Events::notify`].
#[derive(Debug)]
pub enum Dispatch {
    /// Every handler ran; carries the payload after replacements.
    Proceed(Payload),
    Abort,
}

impl Dispatch {
    pub fn is_abort(&self) -> bool {
        matches!(self, Dispatch::Abort)
    }

    pub fn into_payload(self) -> Option<Payload> {
        match self {
            Dispatch::Proceed(payload) => Some(payload),
            Dispatch::Abort => None,
        }
    }
}

pub type Handler = Arc<dyn Fn(&Payload) -> Reply + Send + Sync>;

#[derive(Default)]
pub struct Events {
    handlers: RwLock<HashMap<EventName, Vec<Handler>>>,
}

impl Events {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on<F>(&self, name: EventName, handler: F)
    where F: Fn(&Payload) -> Reply + Send + Sync + 'static {
        let mut handlers = self.handlers.write().unwrap_or_else(PoisonError::into_inner);
        handlers.entry(name).or_default().push(Arc::new(handler));
    }

    pub fn has_handlers(&self, name: EventName) -> bool {
        let handlers = self.handlers.read().unwrap_or_else(PoisonError::into_inner);
        handlers.get(&name).is_some_and(|list| !list.is_empty())
    }

    pub fn clear(&self, name: EventName) {
        let mut handlers = self.handlers.write().unwrap_or_else(PoisonError::into_inner);
        handlers.remove(&name);
    }

    pub fn notify(&self, name: EventName, payload: Payload) -> Dispatch {
        // Handlers may register further handlers, so the lock is released
        // before any of them runs.
        let list = {
            let handlers = self.handlers.read().unwrap_or_else(PoisonError::into_inner);
            match handlers.get(&name) {
                Some(list) => list.clone(),
                None => return Dispatch::Proceed(payload),
            }
        };

        let mut current = payload;
        for handler in list {
            match handler(&current) {
                Reply::Pass => {}
                Reply::Replace(replacement) => current = replacement,
                Reply::Abort => {
                    tracing::debug!(event = %name, "dispatch aborted");
                    return Dispatch::Abort;
                }
            }
        }
        Dispatch::Proceed(current)
    }
}

impl std::fmt::Debug for Events {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let handlers = self.handlers.read().unwrap_or_else(PoisonError::into_inner);
        let counts: HashMap<&'static str, usize> =
            handlers.iter().map(|(name, list)| (name.as_str(), list.len())).collect();
        f.debug_struct("Events").field("handlers", &counts).finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;
    use std::sync::atomic::Ordering;

    use super::*;
    use crate::value::Value;

    fn record(name: &str) -> Payload {
        Payload::Record { entity: "order".to_string(), row: Row::from([("name".to_string(), Value::Text(name.into()))]) }
    }

    #[test]
    fn test_event_names() {
        assert_eq!(EventName::ExecutingQuery.as_str(), "executing-query");
        assert_eq!(EventName::AfterDelete.to_string(), "after-delete");
    }

    #[test]
    fn test_notify_without_handlers_proceeds() {
        let events = Events::new();
        assert!(!events.has_handlers(EventName::BeforeInsert));

        let dispatch = events.notify(EventName::BeforeInsert, record("a"));
        assert!(matches!(dispatch.into_payload(), Some(Payload::Record { .. })));
    }

    #[test]
    fn test_replacement_is_seen_by_later_handlers() {
        let events = Events::new();
        events.on(EventName::BeforeInsert, |_| Reply::Replace(record("replaced")));
        events.on(EventName::BeforeInsert, |payload| match payload {
            Payload::Record { row, .. } if row["name"] == Value::Text("replaced".into()) => Reply::Pass,
            _ => Reply::Abort,
        });

        let dispatch = events.notify(EventName::BeforeInsert, record("original"));
        match dispatch.into_payload() {
            Some(Payload::Record { row, .. }) => assert_eq!(row["name"], Value::Text("replaced".into())),
            other => panic!("unexpected dispatch: {:?}", other),
        }
    }

    #[test]
    fn test_abort_stops_dispatch() {
        let events = Events::new();
        let calls = Arc::new(AtomicUsize::new(0));

        events.on(EventName::BeforeDelete, |_| Reply::Abort);
        let counter = calls.clone();
        events.on(EventName::BeforeDelete, move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            Reply::Pass
        });

        assert!(events.notify(EventName::BeforeDelete, record("a")).is_abort());
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_clear_removes_handlers() {
        let events = Events::new();
        events.on(EventName::AfterUpdate, |_| Reply::Abort);
        assert!(events.has_handlers(EventName::AfterUpdate));

        events.clear(EventName::AfterUpdate);
        assert!(!events.has_handlers(EventName::AfterUpdate));
        assert!(format!("{:?}", events).contains("Events"));
    }
}
