//! Commonly used types and traits.
//!
//! ```ignore
//! use dbset::prelude::*;
//! ```

pub use dbset_macros::Entity;

pub use crate::config::Configuration;
pub use crate::connection::Credentials;
pub use crate::context::Context;
pub use crate::entity::Entity;
pub use crate::error::Error;
pub use crate::error::Result;
pub use crate::events::EventName;
pub use crate::events::Payload;
pub use crate::events::Reply;
pub use crate::query::Condition;
pub use crate::query::KeyPolicy;
pub use crate::query::Select;
pub use crate::record::Record;
pub use crate::relation::Resolved;
pub use crate::result::ResultSet;
pub use crate::value::FromValue;
pub use crate::value::IntoValue;
pub use crate::value::Json;
pub use crate::value::Row;
pub use crate::value::Value;
