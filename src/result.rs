//! Fetched pages and their pagination links.

use serde::Deserialize;
use serde::Serialize;

use crate::config::DEFAULT_PAGE_SIZE;
use crate::context::Context;
use crate::entity::Entity;
use crate::error::Result;
use crate::record::Record;
use crate::value::Row;

/// One fetched page of an entity plus the paging state it was fetched with.
///
/// Rows are kept raw; every access wraps a copy in a fresh [`Record`].
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ResultSet {
    entity:      String,
    rows:        Vec<Row>,
    #[serde(skip)]
    context:     Option<Context>,
    total_count: u64,
    quantity:    u64,
    page:        u64,
}

impl ResultSet {
    /// A single page holding all of `rows`.
    pub fn new(entity: impl Into<String>, rows: Vec<Row>) -> Self {
        let total_count = rows.len() as u64;
        Self { entity: entity.into(), rows, context: None, total_count, quantity: DEFAULT_PAGE_SIZE, page: 1 }
    }

    pub fn with_paging(mut self, total_count: u64, quantity: u64, page: u64) -> Self {
        self.total_count = total_count;
        self.quantity = quantity;
        self.page = page.max(1);
        self
    }

    /// Bind to `context`; records produced afterwards are attached to it.
    pub fn attach(mut self, context: Context) -> Self {
        self.context = Some(context);
        self
    }

    pub fn entity(&self) -> &str {
        &self.entity
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn total_count(&self) -> u64 {
        self.total_count
    }

    pub fn quantity(&self) -> u64 {
        self.quantity
    }

    pub fn page(&self) -> u64 {
        self.page
    }

    /// `ceil(total_count / quantity)`, at least 1.
    pub fn total_pages(&self) -> u64 {
        self.total_count.div_ceil(self.quantity.max(1)).max(1)
    }

    /// Rows on this page, not the total count.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    fn wrap(&self, row: &Row) -> Record {
        let record = Record::new(self.entity.clone(), row.clone());
        match &self.context {
            Some(context) => record.attach(context.clone()),
            None => record,
        }
    }

    pub fn get(&self, index: usize) -> Option<Record> {
        self.rows.get(index).map(|row| self.wrap(row))
    }

    pub fn first(&self) -> Option<Record> {
        self.rows.first().map(|row| self.wrap(row))
    }

    pub fn last(&self) -> Option<Record> {
        self.rows.last().map(|row| self.wrap(row))
    }

    pub fn iter(&self) -> Iter<'_> {
        Iter { set: self, position: 0 }
    }

    pub fn to_vec(&self) -> Vec<Record> {
        self.iter().collect()
    }

    pub fn map<T, F>(&self, f: F) -> Vec<T>
    where F: FnMut(Record) -> T {
        self.iter().map(f).collect()
    }

    pub fn filter<F>(&self, mut f: F) -> Vec<Record>
    where F: FnMut(&Record) -> bool {
        self.iter().filter(|record| f(record)).collect()
    }

    /// Every row converted to `E`.
    pub fn entities<E: Entity>(&self) -> Result<Vec<E>> {
        self.rows.iter().map(E::from_row).collect()
    }

    /// Page links around the current page.
    ///
    /// `template` is the link text with `{page}` standing for the target page
    /// number, e.g. `"/orders?page={page}"`.
    pub fn pagination(&self, template: &str) -> Vec<PageLink> {
        let total_pages = self.total_pages();
        let page = self.page;
        let link = |label: PageLabel, target: u64, current: bool| PageLink {
            label,
            page: target,
            link: template.replace("{page}", &target.to_string()),
            current,
        };

        let mut links = Vec::new();

        if page > 1 {
            links.push(link(PageLabel::Previous, (page - 1).min(total_pages), false));
        }

        if page > 3 {
            links.push(link(PageLabel::First, 1, false));
        }

        let start = page.saturating_sub(2).max(1);
        let end = page.saturating_add(2).min(total_pages);
        for number in start..=end {
            links.push(link(PageLabel::Number(number), number, number == page));
        }

        if page.saturating_add(2) < total_pages {
            links.push(link(PageLabel::Last, total_pages, false));
        }

        if page < total_pages {
            links.push(link(PageLabel::Next, page + 1, false));
        }

        links
    }
}

/// Restartable iterator over the records of a [`ResultSet`].
pub struct Iter<'a> {
    set:      &'a ResultSet,
    position: usize,
}

impl Iterator for Iter<'_> {
    type Item = Record;

    fn next(&mut self) -> Option<Self::Item> {
        let record = self.set.get(self.position)?;
        self.position += 1;
        Some(record)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.set.len().saturating_sub(self.position);
        (remaining, Some(remaining))
    }
}

impl<'a> IntoIterator for &'a ResultSet {
    type Item = Record;
    type IntoIter = Iter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum PageLabel {
    Previous,
    First,
    Number(u64),
    Last,
    Next,
}

impl std::fmt::Display for PageLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PageLabel::Previous => write!(f, "Previous"),
            PageLabel::First => write!(f, "First"),
            PageLabel::Number(number) => write!(f, "{}", number),
            PageLabel::Last => write!(f, "Last"),
            PageLabel::Next => write!(f, "Next"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageLink {
    pub label:   PageLabel,
    pub page:    u64,
    pub link:    String,
    pub current: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Value;
    use crate::value::row;

    fn rows(count: i64) -> Vec<Row> {
        (1..=count).map(|id| row([("id", Value::Integer(id))])).collect()
    }

    fn labels(links: &[PageLink]) -> Vec<String> {
        links.iter().map(|link| link.label.to_string()).collect()
    }

    #[test]
    fn test_total_pages() {
        assert_eq!(ResultSet::new("order", vec![]).with_paging(95, 10, 1).total_pages(), 10);
        assert_eq!(ResultSet::new("order", vec![]).with_paging(100, 10, 1).total_pages(), 10);
        assert_eq!(ResultSet::new("order", vec![]).with_paging(0, 10, 1).total_pages(), 1);
        assert_eq!(ResultSet::new("order", vec![]).with_paging(7, 0, 1).total_pages(), 7);
    }

    #[test]
    fn test_new_counts_rows() {
        let set = ResultSet::new("order", rows(3));
        assert_eq!(set.total_count(), 3);
        assert_eq!(set.len(), 3);
        assert_eq!(set.page(), 1);
        assert_eq!(set.quantity(), DEFAULT_PAGE_SIZE);
    }

    #[test]
    fn test_access_produces_independent_records() {
        let set = ResultSet::new("order", rows(2));
        let mut a = set.get(0).unwrap();
        let b = set.get(0).unwrap();

        a.set("id", 99);
        assert_eq!(b["id"], Value::Integer(1));
        assert_eq!(set.rows()[0]["id"], Value::Integer(1));
        assert!(set.get(2).is_none());
    }

    #[test]
    fn test_first_last() {
        let set = ResultSet::new("order", rows(3));
        assert_eq!(set.first().unwrap()["id"], Value::Integer(1));
        assert_eq!(set.last().unwrap()["id"], Value::Integer(3));
        assert!(ResultSet::new("order", vec![]).first().is_none());
    }

    #[test]
    fn test_iteration_restarts() {
        let set = ResultSet::new("order", rows(3));
        let first_pass: Vec<Value> = set.iter().map(|r| r["id"].clone()).collect();
        let mut second_pass = Vec::new();
        for record in &set {
            second_pass.push(record["id"].clone());
        }
        assert_eq!(first_pass, second_pass);
        assert_eq!(set.iter().size_hint(), (3, Some(3)));
    }

    #[test]
    fn test_map_and_filter() {
        let set = ResultSet::new("order", rows(5));
        let ids: Vec<i64> = set.map(|r| r.get_as::<i64>("id").unwrap());
        assert_eq!(ids, vec![1, 2, 3, 4, 5]);

        let even = set.filter(|r| r.get_as::<i64>("id").unwrap() % 2 == 0);
        assert_eq!(even.len(), 2);
        assert_eq!(set.to_vec().len(), 5);
    }

    #[test]
    fn test_pagination_middle() {
        let set = ResultSet::new("order", vec![]).with_paging(95, 10, 5);
        let links = set.pagination("/orders?page={page}");

        assert_eq!(labels(&links), vec!["Previous", "First", "3", "4", "5", "6", "7", "Last", "Next"]);
        assert_eq!(links[0].page, 4);
        assert_eq!(links[0].link, "/orders?page=4");
        assert_eq!(links[7].page, 10);
        assert_eq!(links[8].page, 6);
        assert!(links.iter().filter(|l| l.current).all(|l| l.page == 5));
        assert_eq!(links.iter().filter(|l| l.current).count(), 1);
    }

    #[test]
    fn test_pagination_first_page() {
        let set = ResultSet::new("order", vec![]).with_paging(95, 10, 1);
        let links = set.pagination("{page}");
        assert_eq!(labels(&links), vec!["1", "2", "3", "Last", "Next"]);
    }

    #[test]
    fn test_pagination_last_page() {
        let set = ResultSet::new("order", vec![]).with_paging(95, 10, 10);
        let links = set.pagination("{page}");
        assert_eq!(labels(&links), vec!["Previous", "First", "8", "9", "10"]);
    }

    #[test]
    fn test_pagination_single_page() {
        let set = ResultSet::new("order", rows(3));
        let links = set.pagination("{page}");
        assert_eq!(labels(&links), vec!["1"]);
        assert!(links[0].current);
    }

    #[test]
    fn test_pagination_stays_in_range() {
        for total in [0u64, 1, 9, 10, 11, 95, 250] {
            for page in 1..=30u64 {
                let set = ResultSet::new("order", vec![]).with_paging(total, 10, page);
                let total_pages = set.total_pages();
                for link in set.pagination("{page}") {
                    assert!(link.page >= 1 && link.page <= total_pages, "total {} page {}: {:?}", total, page, link);
                }
            }
        }
    }

    #[test]
    fn test_serialize_shape() {
        let set = ResultSet::new("order", rows(1)).with_paging(11, 10, 2);
        let json = serde_json::to_value(&set).unwrap();

        assert_eq!(json["entity"], "order");
        assert_eq!(json["rows"][0]["id"], 1);
        assert_eq!(json["total_count"], 11);
        assert_eq!(json["quantity"], 10);
        assert_eq!(json["page"], 2);
        assert!(json.get("context").is_none());

        let restored: ResultSet = serde_json::from_value(json).unwrap();
        assert_eq!(restored.total_pages(), 2);
        assert_eq!(restored.rows(), set.rows());
    }
}
