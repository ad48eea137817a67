//! Typed access over untyped rows.
//!
//! Rows stay plain column maps everywhere in the crate; an [`Entity`] is an
//! optional typed view, usually derived with `#[derive(Entity)]`:
//!
//! ```ignore
//! #[derive(Entity)]
//! #[dbset(entity = "orderItem")]
//! struct OrderItem {
//!     id:       Option<i64>,
//!     order_id: i64,
//!     #[dbset(column = "sku")]
//!     code:     String,
//! }
//! ```
//!
//! Field columns default to the lower camel-case field name (`order_id` →
//! `orderId`), the entity name to the lower camel-case struct name.

use crate::error::Result;
use crate::value::Row;

pub trait Entity: Sized {
    /// Logical entity name, e.g. `"orderItem"`.
    fn entity_name() -> &'static str;

    fn primary_key() -> &'static str {
        "id"
    }

    /// # Errors
    ///
    /// [`Error::ColumnNotFound`](crate::Error::ColumnNotFound) when a
    /// required column is missing, or a conversion error.
    fn from_row(row: &Row) -> Result<Self>;

    fn into_row(self) -> Row;
}
