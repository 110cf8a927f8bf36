use std::fmt;
use std::rc::Rc;

use regex::Regex;

use super::{Columns, Extract, FromRecord, ItemElement, Items, ListElement, Listing};
use crate::context::Context;
use crate::dom;
use crate::error::Result;
use crate::filters::text::TextCleaner;
use crate::filters::Path;
use crate::value::Value;

/// How a head cell is recognized as a column.
#[derive(Debug, Clone)]
pub enum Column {
    /// Case-insensitive exact title.
    Label(String),
    /// Pattern matched at the start of the cleaned title.
    Pattern(Regex),
}

impl Column {
    fn matches(&self, title: &str, lowered: &str) -> bool {
        match self {
            Column::Label(label) => label == lowered,
            Column::Pattern(re) => re.find(title).is_some_and(|m| m.start() == 0),
        }
    }
}

impl From<&str> for Column {
    fn from(label: &str) -> Self {
        Column::Label(label.to_lowercase())
    }
}

impl From<String> for Column {
    fn from(label: String) -> Self {
        Column::Label(label.to_lowercase())
    }
}

impl From<Regex> for Column {
    fn from(pattern: Regex) -> Self {
        Column::Pattern(pattern)
    }
}

/// A [`ListElement`] over table rows whose cells are addressed by column
/// name.
///
/// Columns are resolved once per table from the cells matched by the head
/// path: each head cell is cleaned, compared against the declared titles in
/// declaration order and claims at most one column. A cell advances the
/// column counter by its `colspan`.
///
/// ```rust
/// use rs_sift::{Context, Extract, ItemElement, Page, Record, TableElement, Value};
/// use rs_sift::filters::{CleanText, TableCell};
///
/// let page = Page::html(
///     "<table><thead><tr><th>Date</th><th>Label</th></tr></thead>\
///      <tbody><tr><td>01/02</td><td>Coffee</td></tr></tbody></table>",
/// );
/// let table = TableElement::new("thead th", "tbody tr")
///     .column("label", ["Label", "Description"])
///     .item(ItemElement::<Record>::new().field("label", CleanText::new(TableCell::new("label"))));
/// let listing = table.extract(&Context::new(&page))?;
/// assert_eq!(listing.items[0].get("label"), Some(&Value::from("Coffee")));
/// # Ok::<(), rs_sift::Error>(())
/// ```
pub struct TableElement<T> {
    head: Path,
    columns: Vec<(String, Vec<Column>)>,
    cleaner: TextCleaner,
    list: ListElement<T>,
}

impl<T: FromRecord> TableElement<T> {
    pub fn new(head_path: impl Into<String>, item_path: impl Into<String>) -> Self {
        Self {
            head: Path::new(head_path),
            columns: Vec::new(),
            cleaner: TextCleaner::default(),
            list: ListElement::new(item_path),
        }
    }

    /// Declare column `name`, recognized by any of `titles`.
    #[must_use]
    pub fn column<I, C>(mut self, name: impl Into<String>, titles: I) -> Self
    where
        I: IntoIterator<Item = C>,
        C: Into<Column>,
    {
        self.columns
            .push((name.into(), titles.into_iter().map(Into::into).collect()));
        self
    }

    /// Cleaning applied to head cells before comparison.
    #[must_use]
    pub fn cleaner(mut self, cleaner: TextCleaner) -> Self {
        self.cleaner = cleaner;
        self
    }

    #[must_use]
    pub fn item(mut self, item: ItemElement<T>) -> Self {
        self.list = self.list.item(item);
        self
    }

    /// Apply any [`ListElement`] option.
    #[must_use]
    pub fn list(mut self, configure: impl FnOnce(ListElement<T>) -> ListElement<T>) -> Self {
        self.list = configure(self.list);
        self
    }

    /// Column indices for the table below the current node.
    pub fn resolve_columns(&self, ctx: &Context<'_>) -> Result<Columns> {
        let mut columns = Columns::new();
        let cells = match self.head.query(ctx.node(), "TableElement") {
            Ok(Value::Nodes(cells)) => cells,
            Ok(_) => Vec::new(),
            Err(e) if e.is_missing() => Vec::new(),
            Err(e) => return Err(e),
        };

        let mut index = 0;
        for cell in cells {
            let title = self.cleaner.clean_str(&Value::node(cell).to_text().unwrap_or_default());
            let lowered = title.to_lowercase();
            let claimed = self.columns.iter().find(|(name, titles)| {
                !columns.contains(name) && titles.iter().any(|t| t.matches(&title, &lowered))
            });
            if let Some((name, _)) = claimed {
                columns.insert(name.as_str(), index);
            }
            index += dom::get_attribute(&cell, "colspan")
                .and_then(|span| span.trim().parse::<usize>().ok())
                .filter(|span| *span > 0)
                .unwrap_or(1);
        }

        for (name, _) in &self.columns {
            if !columns.contains(name) {
                tracing::debug!(column = %name, "column not found in table head");
            }
        }
        Ok(columns)
    }

    /// Iterate the rows' objects with the columns of this table resolved.
    pub fn iter<'e, 'a>(&'e self, ctx: &Context<'a>) -> Result<Items<'e, 'a, T>> {
        let columns = Rc::new(self.resolve_columns(ctx)?);
        self.list.iter(&ctx.clone().with_columns(columns))
    }
}

impl<T: FromRecord> Extract<T> for TableElement<T> {
    fn extract(&self, ctx: &Context<'_>) -> Result<Listing<T>> {
        let items = self.iter(ctx)?.collect::<Result<Vec<_>>>()?;
        let next_page = self.list.next_page_url(ctx)?;
        Ok(Listing { items, next_page })
    }
}

impl<T> fmt::Debug for TableElement<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TableElement")
            .field("head", &self.head)
            .field("columns", &self.columns)
            .field("list", &self.list)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::Record;
    use crate::error::Error;
    use crate::filters::{CleanDecimal, CleanText, FilterExt, TableCell};
    use crate::page::Page;

    const TABLE: &str = r#"
        <table>
            <thead><tr>
                <th>Date</th><th colspan="2">Amount</th><th>Label</th><th>Label</th>
            </tr></thead>
            <tbody>
                <tr><td>01/02</td><td>12,00</td><td>EUR</td><td>Coffee</td><td>dup</td></tr>
                <tr><td>03/02</td><td>-4,50</td><td>EUR</td><td>Bus</td><td>dup</td></tr>
            </tbody>
        </table>"#;

    fn table() -> TableElement<Record<'static>> {
        TableElement::new("thead th", "tbody tr")
            .column("date", ["date", "Date of operation"])
            .column("amount", [Column::from(Regex::new(r"(?i)^amount").unwrap())])
            .column("label", ["Label"])
            .column("other_label", ["label"])
            .column("balance", ["Balance"])
    }

    #[test]
    fn test_columns_follow_colspan_and_claim_once() {
        let page = Page::html(TABLE);
        let ctx = Context::new(&page);
        let columns = table().resolve_columns(&ctx).unwrap();
        assert_eq!(columns.get("date"), Some(0));
        assert_eq!(columns.get("amount"), Some(1));
        assert_eq!(columns.get("label"), Some(3));
        assert_eq!(columns.get("other_label"), Some(4));
        assert_eq!(columns.get("balance"), None);
    }

    #[test]
    fn test_rows_read_cells_by_name() {
        let page = Page::html(TABLE);
        let ctx = Context::new(&page);
        let table = table().item(
            ItemElement::new()
                .field("label", CleanText::new(TableCell::new("label")))
                .field("amount", CleanDecimal::french().on(TableCell::new("amount"))),
        );
        let listing = table.extract(&ctx).unwrap();
        assert_eq!(listing.items.len(), 2);
        assert_eq!(listing.items[1].get("label"), Some(&Value::from("Bus")));
        assert_eq!(listing.items[1].get("amount").and_then(Value::to_text).as_deref(), Some("-4.50"));
    }

    #[test]
    fn test_unresolved_column_is_column_not_found() {
        let page = Page::html(TABLE);
        let ctx = Context::new(&page);
        let table = table().item(ItemElement::new().field("balance", TableCell::new("balance")));
        let err = table.extract(&ctx).unwrap_err();
        assert!(matches!(err, Error::ColumnNotFound(_)));
        assert!(!err.is_missing());
    }

    #[test]
    fn test_invalid_colspan_counts_one() {
        let page = Page::html(
            r#"<table><tr><th colspan="x">A</th><th colspan="0">B</th><th>C</th></tr></table>"#,
        );
        let ctx = Context::new(&page);
        let table = TableElement::<Record>::new("th", "tr")
            .column("a", ["a"])
            .column("c", ["c"]);
        let columns = table.resolve_columns(&ctx).unwrap();
        assert_eq!(columns.get("c"), Some(2));
    }
}
