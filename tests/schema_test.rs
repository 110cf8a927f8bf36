use std::sync::Arc;

use rs_sift::fetch::StaticFetcher;
use rs_sift::{paginate, Context, Error, Extract, Options, Page, Schema};
use serde_json::json;

const ACCOUNTS: &str = r#"{
    "item": "data/accounts",
    "ignore_duplicate": true,
    "args": {"bank": "acme"},
    "fields": [
        {"name": "id", "filter": "dict", "path": "number"},
        {"name": "label", "filter": "dict", "path": "name", "then": {"filter": "capitalize"}},
        {"name": "balance", "filter": "decimal", "path": "balance"},
        {"name": "type", "filter": "map", "path": "kind", "map": {"CC": "checking", "LA": "savings"}, "default": "unknown"},
        {"name": "opened", "filter": "date", "path": "opened", "format": "%Y%m%d", "default": null},
        {"name": "bank", "filter": "env", "var": "bank"}
    ],
    "next_page": {"filter": "dict", "path": "links/next", "default": null}
}"#;

fn first_page() -> Page {
    Page::json(
        r#"{"data": {"accounts": [
            {"number": "001", "name": "compte courant", "balance": 1520.3, "kind": "CC", "opened": "20190412"},
            {"number": "002", "name": "livret a", "balance": "8000.00", "kind": "LA"}
        ]}, "links": {"next": "/accounts?page=2"}}"#,
    )
    .unwrap()
    .with_url("https://api.bank.example/accounts".parse().unwrap())
}

fn fetcher() -> Arc<StaticFetcher> {
    Arc::new(StaticFetcher::new().with_json(
        "https://api.bank.example/accounts?page=2",
        r#"{"data": {"accounts": [
            {"number": "003", "name": "pea", "balance": -12, "kind": "PEA"},
            {"number": "003", "name": "pea", "balance": -12, "kind": "PEA"}
        ]}, "links": {"next": null}}"#,
    ))
}

#[test]
fn schema_extracts_json_records() {
    let element = Schema::from_json(ACCOUNTS).unwrap().compile().unwrap();
    let page = first_page();
    let listing = element.extract(&Context::new(&page)).unwrap();
    assert_eq!(
        listing.next_page.as_deref(),
        Some("https://api.bank.example/accounts?page=2")
    );
    let rendered: Vec<_> = listing.items.iter().map(|r| Options::default().render(r)).collect();
    assert_eq!(
        rendered[0],
        json!({
            "id": "001",
            "label": "Compte Courant",
            "balance": "1520.3",
            "type": "checking",
            "opened": "2019-04-12",
            "bank": "acme"
        })
    );
    assert_eq!(rendered[1]["opened"], serde_json::Value::Null);
}

#[test]
fn schema_paginates_and_drops_duplicates() {
    let element = Schema::from_json(ACCOUNTS).unwrap().compile().unwrap();
    let records = paginate(&element, first_page(), fetcher(), &Options::default()).unwrap();
    let ids: Vec<_> = records
        .iter()
        .map(|r| r.get("id").map(ToString::to_string))
        .collect();
    assert_eq!(
        ids,
        vec![Some("001".to_string()), Some("002".to_string()), Some("003".to_string())]
    );
    assert_eq!(records[2].to_json()["type"], json!("unknown"));
}

#[test]
fn schema_compile_errors() {
    let unknown_filter = Schema::from_json(r#"{"fields": [{"name": "x", "filter": "nope"}]}"#);
    assert!(matches!(unknown_filter, Err(Error::Json(_))));

    let missing_key = Schema::from_json(r#"{"fields": [{"name": "x", "filter": "query"}]}"#)
        .unwrap()
        .compile();
    assert!(matches!(missing_key, Err(Error::Schema(ref m)) if m.contains("key")));

    let bad_separators =
        Schema::from_json(r#"{"fields": [{"name": "x", "filter": "decimal", "separators": "x"}]}"#)
            .unwrap()
            .compile();
    assert!(matches!(bad_separators, Err(Error::Schema(_))));
}
