use super::placeholder;
use super::quote;
use crate::connection::Executed;
use crate::connection::Manager;
use crate::connection::StatementHandle;
use crate::error::Result;
use crate::value::Params;
use crate::value::Row;

/// `INSERT` of one row.
///
/// Every field is written except a primary key whose value is falsy, which
/// is left for the backend to generate.
#[derive(Clone, Debug)]
pub struct Insert {
    table: String,
    row:   Row,
    pk:    String,
}

impl Insert {
    pub fn new(table: impl Into<String>, row: Row, pk: impl Into<String>) -> Self {
        Self { table: table.into(), row, pk: pk.into() }
    }

    pub fn build(&self) -> (String, Params) {
        let mut columns = Vec::with_capacity(self.row.len());
        let mut keys = Vec::with_capacity(self.row.len());
        let mut params = Params::new();

        for (column, value) in &self.row {
            if column.eq_ignore_ascii_case(&self.pk) && !value.is_truthy() {
                continue;
            }
            let key = placeholder(column);
            columns.push(quote(column));
            keys.push(key.clone());
            params.insert(key, value.clone());
        }

        if columns.is_empty() {
            return (format!("INSERT INTO {} DEFAULT VALUES", quote(&self.table)), params);
        }

        let sql =
            format!("INSERT INTO {}( {} ) VALUES ( {} )", quote(&self.table), columns.join(", "), keys.join(", "));
        (sql, params)
    }

    /// Run the insert and return its own outcome, including the row id it
    /// generated.
    pub fn exec(self, manager: &Manager) -> Result<StatementHandle> {
        let (sql, params) = self.build();
        match manager.execute(&sql, &params)? {
            Executed::Statement(handle) => Ok(handle),
            Executed::Rows(_) => Ok(StatementHandle::default()),
        }
    }
}
