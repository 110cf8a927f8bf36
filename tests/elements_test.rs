use std::sync::Arc;

use chrono::NaiveDate;
use rs_sift::fetch::StaticFetcher;
use rs_sift::filters::{
    AbsoluteLink, Async, AsyncLoad, CleanDecimal, CleanText, Date, Field, FilterExt, Link,
    Selector, TableCell,
};
use rs_sift::{
    paginate, Context, Error, Extract, FromRecord, ItemElement, ListElement, Options, Page,
    Record, Result, TableElement, Value,
};
use rust_decimal::Decimal;

const HISTORY: &str = r#"
    <table id="history">
        <thead>
            <tr><th>Date</th><th>Description</th><th>Debit</th><th>Credit</th></tr>
        </thead>
        <tbody>
            <tr><td>02/01/2024</td><td>CB BOULANGERIE</td><td>4,20</td><td></td></tr>
            <tr><td>05/01/2024</td><td>VIR SALAIRE</td><td></td><td>2 100,00</td></tr>
            <tr><td>07/01/2024</td><td>PRLV EDF</td><td>61,35</td><td></td></tr>
        </tbody>
    </table>"#;

#[derive(Debug, PartialEq)]
struct Transaction {
    date: NaiveDate,
    label: String,
    amount: Decimal,
}

impl FromRecord for Transaction {
    fn from_record(mut record: Record<'_>) -> Result<Self> {
        let debit: Option<Decimal> = record.take("debit")?;
        let credit: Option<Decimal> = record.take("credit")?;
        Ok(Self {
            date: record.take("date")?,
            label: record.take("label")?,
            amount: credit.or(debit.map(|d| -d)).unwrap_or_default(),
        })
    }
}

fn history() -> TableElement<Transaction> {
    TableElement::new("thead th", "tbody tr")
        .column("date", ["Date"])
        .column("label", ["Description", "Libellé"])
        .column("debit", ["Debit"])
        .column("credit", ["Credit"])
        .item(
            ItemElement::new()
                .named("transaction")
                .field("date", Date::new(CleanText::new(TableCell::new("date"))).dayfirst(true))
                .field("label", CleanText::new(TableCell::new("label")))
                .field("debit", CleanDecimal::french().on(TableCell::new("debit")).or(Value::Empty))
                .field("credit", CleanDecimal::french().on(TableCell::new("credit")).or(Value::Empty)),
        )
}

#[test]
fn table_builds_typed_transactions() {
    let page = Page::html(HISTORY);
    let listing = history().extract(&Context::new(&page)).unwrap();
    assert_eq!(listing.items.len(), 3);
    assert_eq!(
        listing.items[1],
        Transaction {
            date: NaiveDate::from_ymd_opt(2024, 1, 5).unwrap(),
            label: "VIR SALAIRE".to_string(),
            amount: Decimal::new(210_000, 2),
        }
    );
    assert_eq!(listing.items[2].amount, Decimal::new(-6135, 2));
}

#[test]
fn table_columns_are_unique_indices_within_head() {
    let page = Page::html(HISTORY);
    let ctx = Context::new(&page);
    let columns = history().resolve_columns(&ctx).unwrap();
    let mut indices: Vec<usize> = columns.iter().map(|(_, index)| index).collect();
    indices.sort_unstable();
    assert_eq!(indices, vec![0, 1, 2, 3]);
}

#[test]
fn table_cell_of_unknown_column_fails() {
    let page = Page::html(HISTORY);
    let table = history().item(
        ItemElement::new().field("balance", CleanText::new(TableCell::any(["balance", "solde"]))),
    );
    let err = table.extract(&Context::new(&page)).unwrap_err();
    assert!(matches!(err, Error::ColumnNotFound(ref names) if names == "balance or solde"));
}

#[test]
fn skip_on_error_drops_only_failing_rows() {
    let page = Page::html(HISTORY);
    let table = TableElement::<Record>::new("thead th", "tbody tr")
        .column("debit", ["Debit"])
        .item(
            ItemElement::new()
                .field("debit", CleanDecimal::french().on(TableCell::new("debit")))
                .skip_on_error(true),
        );
    let listing = table.extract(&Context::new(&page)).unwrap();
    assert_eq!(listing.items.len(), 2);
}

#[test]
fn async_fields_read_loaded_pages() {
    let fetcher = StaticFetcher::new()
        .with_html("https://shop.example/p/1", "<h3>Blue mug</h3><b>12,00</b>")
        .with_html("https://shop.example/p/2", "<h3>Red cup</h3><b>8,50</b>");
    let page = Page::html(
        r#"<ul>
            <li><a href="/p/1">mug</a></li>
            <li><a href="/p/2">cup</a></li>
            <li><a href="">soon</a></li>
        </ul>"#,
    )
    .with_url("https://shop.example/".parse().unwrap());
    let ctx = Context::new(&page).with_fetcher(Arc::new(fetcher));

    let list = ListElement::new("li").item(
        ItemElement::<Record>::new()
            .field("url", Link::new("a"))
            .loader("details", AsyncLoad::new(Field::new("url")))
            .field("title", Async::new("details", CleanText::new("h3")))
            .field("price", Async::new("details", CleanDecimal::french().on("b"))),
    );
    let listing = list.extract(&ctx).unwrap();
    assert_eq!(listing.items.len(), 3);
    assert_eq!(listing.items[1].get("title"), Some(&Value::from("Red cup")));
    assert_eq!(
        listing.items[0].get("price"),
        Some(&Value::Decimal(Decimal::new(1200, 2)))
    );
    assert_eq!(listing.items[2].get("title"), Some(&Value::Empty));
}

#[test]
fn async_load_of_unknown_page_fails() {
    let page = Page::html(r#"<a href="/gone">x</a>"#)
        .with_url("https://shop.example/".parse().unwrap());
    let ctx = Context::new(&page).with_fetcher(Arc::new(StaticFetcher::new()));
    let item = ItemElement::<Record>::new()
        .loader("details", AsyncLoad::new(Link::new("a")))
        .field("title", Async::new("details", CleanText::new("h3")));
    assert!(matches!(item.build(&ctx), Err(Error::Load { .. })));
}

#[test]
fn paginate_follows_html_next_links() {
    let fetcher = StaticFetcher::new()
        .with_html(
            "https://news.example/?page=2",
            r#"<article>c</article><a rel="next" href="?page=3">next</a>"#,
        )
        .with_html("https://news.example/?page=3", "<article>d</article>");
    let first = Page::html(
        r#"<article>a</article><article>b</article><a rel="next" href="?page=2">next</a>"#,
    )
    .with_url("https://news.example/".parse().unwrap());
    let list = ListElement::new("article")
        .item(ItemElement::<Record>::new().field("title", CleanText::new(Selector::Current)))
        .next_page(AbsoluteLink::new(r#"a[rel="next"]"#));

    let records = paginate(&list, first, Arc::new(fetcher), &Options::default()).unwrap();
    let titles: Vec<String> = records
        .iter()
        .filter_map(|r| r.get("title").and_then(Value::to_text))
        .collect();
    assert_eq!(titles, vec!["a", "b", "c", "d"]);
}
