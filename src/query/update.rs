use super::placeholder;
use super::quote;
use crate::connection::Manager;
use crate::error::Result;
use crate::value::Params;
use crate::value::Row;

/// `UPDATE` of one row keyed by its primary key.
#[derive(Clone, Debug)]
pub struct Update {
    table: String,
    row:   Row,
    pk:    String,
}

impl Update {
    pub fn new(table: impl Into<String>, row: Row, pk: impl Into<String>) -> Self {
        Self { table: table.into(), row, pk: pk.into() }
    }

    /// `None` when the row has no field besides the primary key.
    pub fn build(&self) -> Option<(String, Params)> {
        let mut params = Params::new();
        let mut assignments = Vec::with_capacity(self.row.len());
        let mut pk_key = None;

        for (column, value) in &self.row {
            let key = placeholder(column);
            if column.eq_ignore_ascii_case(&self.pk) {
                pk_key = Some(key.clone());
            } else {
                assignments.push(format!("{} = {}", quote(column), key));
            }
            params.insert(key, value.clone());
        }

        if assignments.is_empty() {
            return None;
        }

        let sql = format!(
            "UPDATE {} SET {} WHERE {} = {}",
            quote(&self.table),
            assignments.join(", "),
            quote(&self.pk),
            pk_key.unwrap_or_else(|| placeholder(&self.pk))
        );
        Some((sql, params))
    }

    /// Run the update and return the affected row count; 0 without running
    /// anything when there is nothing to set.
    pub fn exec(self, manager: &Manager) -> Result<u64> {
        match self.build() {
            Some((sql, params)) => Ok(manager.execute(&sql, &params)?.affected_rows()),
            None => Ok(0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Value;
    use crate::value::row;

    #[test]
    fn test_update_sets_all_but_pk() {
        let update = Update::new(
            "customer",
            row([("id", Value::Integer(5)), ("name", Value::Text("Ada".into())), ("tier", Value::Integer(2))]),
            "id",
        );
        let (sql, params) = update.build().unwrap();

        assert_eq!(sql, "UPDATE `customer` SET `name` = :name, `tier` = :tier WHERE `id` = :id");
        assert_eq!(params.len(), 3);
        assert_eq!(params[":id"], Value::Integer(5));
    }

    #[test]
    fn test_update_custom_pk() {
        let update = Update::new("product", row([("sku", Value::Text("A-1".into())), ("stock", Value::Integer(9))]), "sku");
        let (sql, _) = update.build().unwrap();
        assert_eq!(sql, "UPDATE `product` SET `stock` = :stock WHERE `sku` = :sku");
    }

    #[test]
    fn test_update_pk_in_fetched_case() {
        let update = Update::new(
            "order",
            row([("customerid", Value::Integer(7)), ("ID", Value::Integer(3))]),
            "id",
        );
        let (sql, params) = update.build().unwrap();

        assert_eq!(sql, "UPDATE `order` SET `customerid` = :customerid WHERE `id` = :ID");
        assert_eq!(params[":ID"], Value::Integer(3));
    }

    #[test]
    fn test_update_nothing_to_set() {
        let update = Update::new("customer", row([("id", Value::Integer(5))]), "id");
        assert!(update.build().is_none());
    }
}
