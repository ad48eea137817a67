//! Query construction: the fluent [`Select`] builder, its [`Condition`]
//! predicates and the fixed write statements used by records.

pub(crate) mod condition;
pub(crate) mod delete;
pub(crate) mod insert;
pub(crate) mod select;
pub(crate) mod update;

pub use condition::Condition;
pub use delete::Delete;
pub use insert::Insert;
pub use select::Select;
pub use update::Update;

use crate::value::Params;
use crate::value::Value;

/// What happens when two predicates want the same parameter key.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum KeyPolicy {
    /// Later keys get a numeric suffix: `:price`, `:price_2`, `:price_3`.
    #[default]
    Unique,
    /// The later binding replaces the earlier one.
    Overwrite,
}

impl KeyPolicy {
    /// Bind `value` under `key` (leading `:` included) and return the key
    /// actually used.
    pub(crate) fn bind(&self, params: &mut Params, key: String, value: Value) -> String {
        let key = match self {
            KeyPolicy::Overwrite => key,
            KeyPolicy::Unique if !params.contains_key(&key) => key,
            KeyPolicy::Unique => {
                let mut suffix = 2;
                while params.contains_key(&format!("{}_{}", key, suffix)) {
                    suffix += 1;
                }
                format!("{}_{}", key, suffix)
            }
        };
        params.insert(key.clone(), value);
        key
    }
}

/// `` `name` `` with embedded backticks doubled.
pub(crate) fn quote(name: &str) -> String {
    format!("`{}`", name.replace('`', "``"))
}

/// Placeholder key for `column`: `:` followed by the column name with every
/// character outside `[A-Za-z0-9_]` replaced by `_`.
pub(crate) fn placeholder(column: &str) -> String {
    let mut key = String::with_capacity(column.len() + 1);
    key.push(':');
    key.extend(column.chars().map(|ch| if ch.is_ascii_alphanumeric() || ch == '_' { ch } else { '_' }));
    key
}
