//! Following `next_page` links across pages.

use std::sync::Arc;

use crate::context::Context;
use crate::element::Extract;
use crate::error::Result;
use crate::fetch::Fetcher;
use crate::options::Options;
use crate::page::Page;

/// Extract `element` from `first` and every page reached through its
/// `next_page`, loading pages with `fetcher`.
///
/// Stops at the first page without a next page, or after
/// [`Options::max_pages`] pages.
///
/// ```rust
/// use std::sync::Arc;
/// use rs_sift::{paginate, ItemElement, ListElement, Options, Page, Record};
/// use rs_sift::fetch::StaticFetcher;
/// use rs_sift::filters::{CleanText, Link, Selector};
///
/// let fetcher = StaticFetcher::new()
///     .with_html("https://example.com/?p=2", "<li>c</li>");
/// let first = Page::html(r#"<li>a</li><li>b</li><a href="?p=2">next</a>"#)
///     .with_url("https://example.com/".parse()?);
/// let list = ListElement::new("li")
///     .item(ItemElement::<Record>::new().field("name", CleanText::new(Selector::Current)))
///     .next_page(Link::new("a"));
/// let all = paginate(&list, first, Arc::new(fetcher), &Options::default())?;
/// assert_eq!(all.len(), 3);
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub fn paginate<T, E>(
    element: &E,
    first: Page,
    fetcher: Arc<dyn Fetcher>,
    options: &Options,
) -> Result<Vec<T>>
where
    E: Extract<T> + ?Sized,
{
    let mut items = Vec::new();
    let mut page = first;
    let mut count = 0;
    loop {
        let next = {
            let ctx = Context::new(&page).with_fetcher(Arc::clone(&fetcher));
            let listing = element.extract(&ctx)?;
            count += 1;
            tracing::debug!(page = count, url = ?page.url().map(url::Url::as_str), items = listing.items.len(), "page extracted");
            items.extend(listing.items);
            listing.next_page
        };

        let Some(url) = next else {
            break;
        };
        if options.max_pages.is_some_and(|max| count >= max) {
            tracing::warn!(pages = count, next = %url, "page limit reached, not following next page");
            break;
        }
        page = fetcher.open(&url)?.wait()?.into_page()?;
    }
    Ok(items)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::Record;
    use crate::element::{FromRecord, ItemElement, ListElement};
    use crate::fetch::StaticFetcher;
    use crate::filters::{AbsoluteLink, Dict};

    fn fetcher() -> Arc<dyn Fetcher> {
        Arc::new(
            StaticFetcher::new()
                .with_json("https://api.example/ops?page=2", r#"{"ops": [{"id": 3}], "next": "/ops?page=3"}"#)
                .with_json("https://api.example/ops?page=3", r#"{"ops": [{"id": 4}], "next": null}"#),
        )
    }

    fn first() -> Page {
        Page::json(r#"{"ops": [{"id": 1}, {"id": 2}], "next": "/ops?page=2"}"#)
            .unwrap()
            .with_url("https://api.example/ops".parse().unwrap())
    }

    fn ops() -> ListElement<Record<'static>> {
        ListElement::new("ops")
            .item(ItemElement::new().field("id", Dict::new("id")))
            .next_page(Dict::new("next"))
    }

    #[test]
    fn test_follows_until_no_next_page() {
        let all = paginate(&ops(), first(), fetcher(), &Options::default()).unwrap();
        let ids: Vec<_> = all.iter().filter_map(FromRecord::id).collect();
        assert_eq!(ids, vec!["1", "2", "3", "4"]);
    }

    #[test]
    fn test_page_limit() {
        let options = Options {
            max_pages: Some(2),
            ..Options::default()
        };
        let all = paginate(&ops(), first(), fetcher(), &options).unwrap();
        assert_eq!(all.len(), 3);
    }

    #[test]
    fn test_unknown_next_page_fails() {
        let list = ListElement::<Record>::new("ops").next_page(AbsoluteLink::new("a"));
        let page = Page::html(r#"<a href="/missing">next</a>"#)
            .with_url("https://api.example/".parse().unwrap());
        assert!(paginate(&list, page, fetcher(), &Options::default()).is_err());
    }
}
