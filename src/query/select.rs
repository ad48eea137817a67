use super::Condition;
use super::KeyPolicy;
use super::quote;
use crate::context::Context;
use crate::error::Result;
use crate::events::Dispatch;
use crate::events::EventName;
use crate::events::Payload;
use crate::record::Record;
use crate::result::ResultSet;
use crate::value::FromValue;
use crate::value::Params;
use crate::value::Row;

/// Fluent `SELECT` builder over one entity.
///
/// Setters consume and return the builder. Every predicate is AND-joined
/// with the ones before it, and its values are bound by name as it is added.
///
/// ```ignore
/// let page = context
///     .set("order")
///     .filter(Condition::eq("customerId", 7))
///     .and_filter(Condition::is_in("status", ["open", "paid"]))
///     .order_by("`createdAt` DESC")
///     .quantity(20)
///     .page(2)
///     .fetch()?;
/// ```
#[derive(Clone, Debug)]
pub struct Select {
    context:     Context,
    entity:      String,
    columns:     String,
    wheres:      Vec<String>,
    havings:     Vec<String>,
    group_by:    Option<String>,
    order_by:    Option<String>,
    quantity:    u64,
    page:        u64,
    params:      Params,
    key_policy:  KeyPolicy,
    total_count: Option<u64>,
}

impl Select {
    pub fn new(context: Context, entity: impl Into<String>) -> Self {
        let quantity = context.configuration().page_size();
        let key_policy = context.configuration().key_policy();
        Self {
            context,
            entity: entity.into(),
            columns: "*".to_string(),
            wheres: Vec::new(),
            havings: Vec::new(),
            group_by: None,
            order_by: None,
            quantity,
            page: 1,
            params: Params::new(),
            key_policy,
            total_count: None,
        }
    }

    pub fn entity(&self) -> &str {
        &self.entity
    }

    pub fn context(&self) -> &Context {
        &self.context
    }

    /// Projection used verbatim, e.g. `"`id`, `name`"` or `"COUNT(1) AS n"`.
    pub fn select(mut self, columns: impl Into<String>) -> Self {
        self.columns = columns.into();
        self
    }

    /// Projection of the given column names, each quoted.
    pub fn columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let quoted: Vec<String> = columns.into_iter().map(|column| quote(column.as_ref())).collect();
        self.columns = if quoted.is_empty() { "*".to_string() } else { quoted.join(", ") };
        self
    }

    pub fn filter(mut self, condition: Condition) -> Self {
        if let Some(fragment) = condition.render(&mut self.params, self.key_policy) {
            self.wheres.push(fragment);
            self.total_count = None;
        }
        self
    }

    pub fn and_filter(self, condition: Condition) -> Self {
        self.filter(condition)
    }

    pub fn having(mut self, condition: Condition) -> Self {
        if let Some(fragment) = condition.render(&mut self.params, self.key_policy) {
            self.havings.push(fragment);
            self.total_count = None;
        }
        self
    }

    pub fn and_having(self, condition: Condition) -> Self {
        self.having(condition)
    }

    pub fn order_by(mut self, order: impl Into<String>) -> Self {
        self.order_by = Some(order.into());
        self
    }

    pub fn group_by(mut self, group: impl Into<String>) -> Self {
        self.group_by = Some(group.into());
        self.total_count = None;
        self
    }

    /// Rows per page; 0 is treated as 1.
    pub fn quantity(mut self, quantity: u64) -> Self {
        self.quantity = quantity.max(1);
        self
    }

    /// 1-based page number; 0 is treated as 1.
    pub fn page(mut self, page: u64) -> Self {
        self.page = page.max(1);
        self
    }

    /// Applies to predicates added after this call.
    pub fn key_policy(mut self, policy: KeyPolicy) -> Self {
        self.key_policy = policy;
        self
    }

    /// Back to a fresh builder over the same entity.
    pub fn reset(self) -> Self {
        Self::new(self.context, self.entity)
    }

    pub fn params(&self) -> &Params {
        &self.params
    }

    /// Total row count cached by the last [`fetch`](Select::fetch), if any.
    pub fn cached_total(&self) -> Option<u64> {
        self.total_count
    }

    pub fn render(&self, count_only: bool) -> String {
        let table = self.context.table(&self.entity);
        let mut sql = if count_only {
            format!("SELECT COUNT(1) `cnt` FROM {}", table)
        } else {
            format!("SELECT {} FROM {}", self.columns, table)
        };

        if !self.wheres.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&self.wheres.join(" AND "));
        }

        if let Some(group_by) = &self.group_by {
            sql.push_str(" GROUP BY ");
            sql.push_str(group_by);
        }

        if !self.havings.is_empty() {
            sql.push_str(" HAVING ");
            sql.push_str(&self.havings.join(" AND "));
        }

        if let Some(order_by) = &self.order_by {
            sql.push_str(" ORDER BY ");
            sql.push_str(order_by);
        }

        if !count_only {
            let offset = self.page.saturating_sub(1).saturating_mul(self.quantity);
            sql.push_str(&format!(" LIMIT {}, {}", offset, self.quantity));
        }

        sql
    }

    pub fn build(&self, count_only: bool) -> (String, Params) {
        (self.render(count_only), self.params.clone())
    }

    /// Number of rows matching the predicates, ignoring paging.
    ///
    /// With a `GROUP BY` the backend returns one count per group, so the
    /// groups are counted instead.
    pub fn count(&self) -> Result<u64> {
        let (sql, params) = self.build(true);
        let rows = self.context.execute(&sql, &params)?.into_rows()?;

        if self.group_by.is_some() {
            return Ok(rows.len() as u64);
        }

        match rows.into_iter().next().and_then(|mut row: Row| row.remove("cnt")) {
            Some(value) => Ok(i64::from_value(value)?.max(0) as u64),
            None => Ok(0),
        }
    }

    /// Run the query and return the current page.
    ///
    /// `before-select` handlers may abort, which yields an empty set, or
    /// answer with a [`Payload::Results`], which is returned instead of
    /// querying.
    pub fn fetch(&mut self) -> Result<ResultSet> {
        let events = self.context.events().clone();

        if events.has_handlers(EventName::BeforeSelect) {
            match events.notify(EventName::BeforeSelect, Payload::Select(self.clone())) {
                Dispatch::Abort => {
                    return Ok(ResultSet::new(self.entity.clone(), Vec::new())
                        .with_paging(0, self.quantity, self.page)
                        .attach(self.context.clone()));
                }
                Dispatch::Proceed(Payload::Results(cached)) => {
                    tracing::debug!(entity = %self.entity, sql = %self.render(false), "result set served by handler");
                    return Ok(cached.attach(self.context.clone()));
                }
                Dispatch::Proceed(_) => {}
            }
        }

        let total_count = match self.total_count {
            Some(total_count) => total_count,
            None => {
                let total_count = self.count()?;
                self.total_count = Some(total_count);
                total_count
            }
        };

        let (sql, params) = self.build(false);
        let rows = self.context.execute(&sql, &params)?.into_rows()?;
        let result = ResultSet::new(self.entity.clone(), rows)
            .with_paging(total_count, self.quantity, self.page)
            .attach(self.context.clone());

        if events.has_handlers(EventName::AfterSelect) {
            events.notify(EventName::AfterSelect, Payload::Selected { query: self.clone(), result: result.clone() });
        }

        Ok(result)
    }

    /// The first matching row, fetched as a page of one.
    pub fn first(&mut self) -> Result<Option<Record>> {
        self.quantity = 1;
        self.page = 1;
        Ok(self.fetch()?.first())
    }

    pub fn to_vec(&mut self) -> Result<Vec<Record>> {
        Ok(self.fetch()?.to_vec())
    }

    /// Wrap `row` as an attached record of this entity.
    pub fn record(&self, row: Row) -> Record {
        self.context.record(self.entity.clone(), row)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::AtomicUsize;
    use std::sync::atomic::Ordering;

    use super::*;
    use crate::config::Configuration;
    use crate::connection::MockDriver;
    use crate::connection::Registry;
    use crate::events::Events;
    use crate::events::Reply;
    use crate::value::Value;
    use crate::value::row;

    fn context(driver: &MockDriver) -> Context {
        let registry = Arc::new(Registry::with_driver(Arc::new(Events::new()), driver.clone()));
        Context::new(registry, Configuration::default()).unwrap()
    }

    #[test]
    fn test_render_defaults() {
        let query = context(&MockDriver::new()).set("orderItem");
        assert_eq!(query.render(false), "SELECT * FROM `order_item` LIMIT 0, 10");
        assert_eq!(query.render(true), "SELECT COUNT(1) `cnt` FROM `order_item`");
    }

    #[test]
    fn test_render_full() {
        let query = context(&MockDriver::new())
            .set("order")
            .columns(["customerId", "total"])
            .filter(Condition::eq("status", "paid"))
            .and_filter(Condition::raw("`total` > 0"))
            .group_by("`customerId`")
            .having(Condition::gt("total", 100))
            .order_by("`total` DESC")
            .quantity(5)
            .page(3);

        assert_eq!(
            query.render(false),
            "SELECT `customerId`, `total` FROM `order` WHERE `status` = :status AND `total` > 0 \
             GROUP BY `customerId` HAVING `total` > :total ORDER BY `total` DESC LIMIT 10, 5"
        );
        assert_eq!(
            query.render(true),
            "SELECT COUNT(1) `cnt` FROM `order` WHERE `status` = :status AND `total` > 0 \
             GROUP BY `customerId` HAVING `total` > :total ORDER BY `total` DESC"
        );
        assert_eq!(query.params().len(), 2);
    }

    #[test]
    fn test_filter_none_is_noop() {
        let query = context(&MockDriver::new()).set("order").filter(Condition::none());
        assert_eq!(query.render(true), "SELECT COUNT(1) `cnt` FROM `order`");
        assert!(query.params().is_empty());
    }

    #[test]
    fn test_repeated_column_gets_unique_keys() {
        let query = context(&MockDriver::new())
            .set("product")
            .filter(Condition::gte("price", 10))
            .and_filter(Condition::lte("price", 20));

        assert!(query.render(true).ends_with("WHERE `price` >= :price AND `price` <= :price_2"));
        let (_, params) = query.build(true);
        assert_eq!(params[":price"], Value::Integer(10));
        assert_eq!(params[":price_2"], Value::Integer(20));
    }

    #[test]
    fn test_overwrite_policy() {
        let query = context(&MockDriver::new())
            .set("product")
            .key_policy(KeyPolicy::Overwrite)
            .filter(Condition::gte("price", 10))
            .and_filter(Condition::lte("price", 20));

        assert!(query.render(true).ends_with("WHERE `price` >= :price AND `price` <= :price"));
        assert_eq!(query.params()[":price"], Value::Integer(20));
    }

    #[test]
    fn test_reset_clears_state() {
        let query = context(&MockDriver::new())
            .set("order")
            .select("COUNT(1) AS n")
            .filter(Condition::eq("id", 1))
            .quantity(3)
            .page(4)
            .reset();

        assert_eq!(query.render(false), "SELECT * FROM `order` LIMIT 0, 10");
        assert!(query.params().is_empty());
    }

    #[test]
    fn test_count_keeps_projection_and_page() {
        let driver = MockDriver::new();
        driver.push_count(42);
        let query = context(&driver).set("order").select("`id`").page(3);

        assert_eq!(query.count().unwrap(), 42);
        assert_eq!(driver.last_statement().unwrap().sql, "SELECT COUNT(1) `cnt` FROM `order`");
        assert_eq!(query.render(false), "SELECT `id` FROM `order` LIMIT 20, 10");
    }

    #[test]
    fn test_count_over_in_list_counts_a_constant() {
        let driver = MockDriver::new();
        driver.push_count(2);
        driver.push_rows(vec![row([("id", Value::Integer(1))]), row([("id", Value::Integer(2))])]);
        let mut query = context(&driver).set("order").filter(Condition::is_in("id", [1, 2]));

        let result = query.fetch().unwrap();
        assert_eq!(result.total_count(), 2);

        let statements = driver.statements();
        assert_eq!(statements[0].sql, "SELECT COUNT(1) `cnt` FROM `order` WHERE `id` IN ( :idIn0, :idIn1 )");
        assert!(!statements[0].sql.contains("COUNT(*)"));
    }

    #[test]
    fn test_count_with_group_by_counts_groups() {
        let driver = MockDriver::new();
        driver.push_rows(vec![
            row([("cnt", Value::Integer(4))]),
            row([("cnt", Value::Integer(2))]),
            row([("cnt", Value::Integer(9))]),
        ]);
        let query = context(&driver).set("order").group_by("`customerId`");
        assert_eq!(query.count().unwrap(), 3);
    }

    #[test]
    fn test_fetch_counts_once() {
        let driver = MockDriver::new();
        driver
            .push_count(25)
            .push_rows(vec![row([("id", Value::Integer(1))]), row([("id", Value::Integer(2))])])
            .push_rows(vec![row([("id", Value::Integer(11))])]);

        let mut query = context(&driver).set("order").filter(Condition::gt("id", 0));
        let first = query.fetch().unwrap();
        assert_eq!(first.total_count(), 25);
        assert_eq!(first.total_pages(), 3);
        assert_eq!(first.len(), 2);

        let mut query = query.page(2);
        let second = query.fetch().unwrap();
        assert_eq!(second.total_count(), 25);
        assert_eq!(second.page(), 2);
        assert_eq!(driver.statements().len(), 3);

        let params = driver.last_statement().unwrap().params.unwrap();
        assert_eq!(params[":id"], Value::Integer(0));
    }

    #[test]
    fn test_new_predicate_invalidates_count() {
        let driver = MockDriver::new();
        driver.push_count(25).push_rows(vec![]).push_count(4).push_rows(vec![]);

        let mut query = context(&driver).set("order");
        query.fetch().unwrap();

        let mut query = query.filter(Condition::eq("status", "open"));
        assert_eq!(query.fetch().unwrap().total_count(), 4);
        assert_eq!(driver.statements().len(), 4);
    }

    #[test]
    fn test_before_select_abort_returns_empty() {
        let driver = MockDriver::new();
        let context = context(&driver);
        context.events().on(EventName::BeforeSelect, |_| Reply::Abort);

        let result = context.set("order").fetch().unwrap();
        assert!(result.is_empty());
        assert_eq!(result.total_count(), 0);
        assert!(driver.statements().is_empty());
    }

    #[test]
    fn test_before_select_cache_hit() {
        let driver = MockDriver::new();
        let context = context(&driver);
        let cached = ResultSet::new("order", vec![row([("id", Value::Integer(3))])]);
        context.events().on(EventName::BeforeSelect, move |_| Reply::Replace(Payload::Results(cached.clone())));

        let result = context.set("order").fetch().unwrap();
        assert_eq!(result.len(), 1);
        assert!(result.first().unwrap().is_attached());
        assert!(driver.statements().is_empty());
    }

    #[test]
    fn test_after_select_sees_result() {
        let driver = MockDriver::new();
        driver.push_count(1).push_rows(vec![row([("id", Value::Integer(1))])]);
        let context = context(&driver);

        let seen = Arc::new(AtomicUsize::new(0));
        let counter = seen.clone();
        context.events().on(EventName::AfterSelect, move |payload| {
            if let Payload::Selected { query, result } = payload {
                assert_eq!(query.entity(), "order");
                counter.store(result.len(), Ordering::SeqCst);
            }
            Reply::Pass
        });

        context.set("order").fetch().unwrap();
        assert_eq!(seen.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_first_forces_single_row_page() {
        let driver = MockDriver::new();
        driver.push_count(8).push_rows(vec![row([("id", Value::Integer(5))])]);

        let found = context(&driver).set("customer").quantity(50).page(4).first().unwrap().unwrap();
        assert_eq!(found["id"], Value::Integer(5));
        assert!(driver.last_statement().unwrap().sql.ends_with("LIMIT 0, 1"));
    }

    #[test]
    fn test_first_none_when_empty() {
        let driver = MockDriver::new();
        driver.push_count(0).push_rows(vec![]);
        assert!(context(&driver).set("customer").first().unwrap().is_none());
    }

    #[test]
    fn test_fetch_propagates_backend_error() {
        let driver = MockDriver::new();
        driver.push_error("no such table: order");
        assert!(context(&driver).set("order").fetch().is_err());
    }

    #[test]
    fn test_record_wraps_row() {
        let query = context(&MockDriver::new()).set("customer");
        let record = query.record(row([("name", Value::Text("Ada".into()))]));
        assert_eq!(record.entity(), "customer");
        assert!(record.is_attached());
    }
}
