//! Slash-separated paths into JSON documents.
//!
//! `"data/accounts/0/label"` walks object keys and array indices. A `*`
//! segment maps the rest of the path over every element of an array (or
//! every value of an object) and turns the result into a list. Empty
//! segments are ignored, so `"/a//b"` is `"a/b"`.

use serde_json::Value as Json;

/// Result of a path lookup.
#[derive(Debug, PartialEq)]
pub enum Found<'a> {
    One(&'a Json),
    Many(Vec<&'a Json>),
}

/// Look `path` up below `root`. `None` when a key or index is missing.
#[must_use]
pub fn lookup<'a>(root: &'a Json, path: &str) -> Option<Found<'a>> {
    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    walk(root, &segments)
}

fn walk<'a>(node: &'a Json, segments: &[&str]) -> Option<Found<'a>> {
    let Some((head, rest)) = segments.split_first() else {
        return Some(Found::One(node));
    };

    if *head == "*" {
        let children: Vec<&Json> = match node {
            Json::Array(items) => items.iter().collect(),
            Json::Object(map) => map.values().collect(),
            _ => return None,
        };
        let mut out = Vec::with_capacity(children.len());
        for child in children {
            match walk(child, rest)? {
                Found::One(v) => out.push(v),
                Found::Many(vs) => out.extend(vs),
            }
        }
        return Some(Found::Many(out));
    }

    let next = match node {
        Json::Object(map) => map.get(*head)?,
        Json::Array(items) => items.get(head.parse::<usize>().ok()?)?,
        _ => return None,
    };
    walk(next, rest)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_lookup_keys_and_indices() {
        let doc = json!({"data": {"accounts": [{"label": "Checking"}, {"label": "Savings"}]}});
        assert_eq!(
            lookup(&doc, "data/accounts/1/label"),
            Some(Found::One(&json!("Savings")))
        );
        assert_eq!(lookup(&doc, "data/missing"), None);
        assert_eq!(lookup(&doc, "data/accounts/9"), None);
    }

    #[test]
    fn test_wildcard_maps_remaining_path() {
        let doc = json!({"groups": [{"items": ["a", "b"]}, {"items": ["c"]}]});
        let Some(Found::Many(found)) = lookup(&doc, "groups/*/items") else {
            panic!("expected many");
        };
        assert_eq!(found, vec![&json!(["a", "b"]), &json!(["c"])]);
    }

    #[test]
    fn test_empty_path_is_root() {
        let doc = json!([1, 2]);
        assert_eq!(lookup(&doc, ""), Some(Found::One(&doc)));
    }
}
