//! # dbset
//!
//! A small data-access layer over [Turso](https://turso.tech): logical
//! entities are mapped to tables by naming convention, queried through a
//! fluent builder, paged through result sets and changed through active
//! records.
//!
//! ## Features
//!
//! - Camel-case entity names mapped to prefixed snake-case tables
//! - Fluent `SELECT` builder with named parameters and paging
//! - Result sets with page-link generation
//! - Active records with dirty tracking and relation lookup by naming
//!   convention (`customerId` → `customer`)
//! - Hooks around connections, statements and persistence
//! - Optional typed entities via `#[derive(Entity)]`
//!
//! ## Quick Start
//!
//! ```ignore
//! use dbset::prelude::*;
//!
//! fn main() -> Result<()> {
//!     let configuration = Configuration::from_toml(
//!         r#"
//!         [db]
//!         database = "shop.db"
//!         prefix = "shop_"
//!         "#,
//!     )?;
//!     let context = Context::connect(configuration)?;
//!
//!     // Insert
//!     let mut customer = context.record("customer", Row::new());
//!     customer.set("name", "Ada");
//!     if !customer.save() {
//!         eprintln!("{:?}", customer.message());
//!     }
//!
//!     // Query a page
//!     let orders = context
//!         .set("order")
//!         .filter(Condition::eq("customerId", customer["id"].clone()))
//!         .order_by("`id` DESC")
//!         .quantity(20)
//!         .fetch()?;
//!
//!     for order in &orders {
//!         println!("{}", order["total"].as_integer().unwrap_or_default());
//!     }
//!     for link in orders.pagination("/orders?page={page}") {
//!         println!("{} -> {}", link.label, link.link);
//!     }
//!
//!     // Relations
//!     let Some(order) = orders.first() else { return Ok(()) };
//!     let owner = order.resolve("customer")?.into_record();
//!     let items = order.resolve("orderItem")?.into_query();
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Configuration keys
//!
//! See [`config`] for the full table. `db.database` is the turso database
//! file, `db.prefix` is prepended to every table name and `db.page_size` is
//! the default page size of a new builder.

pub mod config;
pub mod connection;
pub mod context;
pub mod entity;
pub mod error;
pub mod events;
pub mod prelude;
pub mod query;
pub mod record;
pub mod relation;
pub mod result;
pub mod table;
pub mod value;

pub use config::Configuration;
pub use connection::Builder;
pub use connection::Credentials;
pub use connection::Driver;
pub use connection::DriverConnection;
pub use connection::Executed;
pub use connection::Manager;
#[cfg(any(test, feature = "test-util"))]
pub use connection::MockDriver;
pub use connection::Registry;
pub use connection::TursoDriver;
pub use context::Context;
pub use dbset_macros::Entity;
pub use entity::Entity;
pub use error::Error;
pub use error::Result;
pub use events::Dispatch;
pub use events::EventName;
pub use events::Events;
pub use events::Payload;
pub use events::Reply;
pub use query::Condition;
pub use query::KeyPolicy;
pub use query::Select;
pub use record::Record;
pub use relation::Resolved;
pub use relation::Strategy;
pub use result::PageLabel;
pub use result::PageLink;
pub use result::ResultSet;
pub use table::Table;
pub use value::FromValue;
pub use value::IntoValue;
pub use value::Json;
pub use value::Params;
pub use value::Row;
pub use value::Value;
