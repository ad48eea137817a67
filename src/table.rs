//! Logical entity names to physical table names.

/// Converts a camel-case entity name to its lower snake-case table name.
///
/// Every upper-case ASCII letter after the first character is preceded by an
/// underscore; all other characters are kept as they are.
///
/// ```
/// assert_eq!(dbset::table::camel_to_snake("orderItem"), "order_item");
/// assert_eq!(dbset::table::camel_to_snake("Customer"), "customer");
/// ```
pub fn camel_to_snake(name: &str) -> String {
    let mut result = String::with_capacity(name.len() + 4);
    for (idx, ch) in name.chars().enumerate() {
        if ch.is_ascii_uppercase() {
            if idx > 0 {
                result.push('_');
            }
            result.push(ch.to_ascii_lowercase());
        } else {
            result.push(ch);
        }
    }
    result
}

/// Physical table name for `entity`, with the configured prefix prepended verbatim.
pub fn physical_name(prefix: &str, entity: &str) -> String {
    format!("{}{}", prefix, camel_to_snake(entity))
}

/// A logical entity bound to its table prefix.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Table {
    entity: String,
    prefix: String,
}

impl Table {
    pub fn new(entity: impl Into<String>, prefix: impl Into<String>) -> Self {
        Self { entity: entity.into(), prefix: prefix.into() }
    }

    pub fn entity(&self) -> &str {
        &self.entity
    }

    pub fn physical_name(&self) -> String {
        physical_name(&self.prefix, &self.entity)
    }
}

impl std::fmt::Display for Table {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "`{}`", self.physical_name())
    }
}
