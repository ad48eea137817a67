use super::placeholder;
use super::quote;
use crate::connection::Manager;
use crate::error::Result;
use crate::value::Params;
use crate::value::Value;

/// `DELETE` of one row keyed by its primary key.
#[derive(Clone, Debug)]
pub struct Delete {
    table: String,
    pk:    String,
    value: Value,
}

impl Delete {
    pub fn new(table: impl Into<String>, pk: impl Into<String>, value: Value) -> Self {
        Self { table: table.into(), pk: pk.into(), value }
    }

    pub fn build(&self) -> (String, Params) {
        let key = placeholder(&self.pk);
        let sql = format!("DELETE FROM {} WHERE {} = {}", quote(&self.table), quote(&self.pk), key);
        (sql, Params::from([(key, self.value.clone())]))
    }

    pub fn exec(self, manager: &Manager) -> Result<u64> {
        let (sql, params) = self.build();
        Ok(manager.execute(&sql, &params)?.affected_rows())
    }
}
