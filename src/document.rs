//! Document abstraction consumed by the core, plus the fetch collaborator
//! contract.
//!
//! The core only ever needs four primitives from a parsed page: select by
//! CSS selector, find first element by tag and attribute predicate, extract
//! text, and read attributes. Everything else (transport, cookies, retries)
//! lives behind [`Fetch`].

use std::collections::{BTreeMap, BTreeSet};

use scraper::node::Element;
use scraper::{ElementRef, Html, Node, Selector};

use crate::error::{ScrapeError, ScrapeResult};

/// A parsed HTML page.
pub struct Document {
    html: Html,
}

impl Document {
    pub fn parse(body: &str) -> Self {
        Self {
            html: Html::parse_document(body),
        }
    }

    /// All elements matching a CSS selector, in document order.
    pub fn select(&self, css: &str) -> ScrapeResult<Vec<ElementRef<'_>>> {
        let selector = parse_selector(css)?;
        Ok(self.html.select(&selector).collect())
    }

    /// First element with the given tag whose attributes satisfy the
    /// predicate.
    pub fn find<F>(&self, tag: &str, pred: F) -> Option<ElementRef<'_>>
    where
        F: Fn(&Element) -> bool,
    {
        find_in(self.html.root_element(), tag, pred)
    }
}

pub(crate) fn parse_selector(css: &str) -> ScrapeResult<Selector> {
    Selector::parse(css).map_err(|e| ScrapeError::selector(css, e.to_string()))
}

/// Elements under `el` matching a CSS selector.
pub fn select_in<'a>(el: ElementRef<'a>, css: &str) -> ScrapeResult<Vec<ElementRef<'a>>> {
    let selector = parse_selector(css)?;
    Ok(el.select(&selector).collect())
}

/// First element under `el` (the subtree rooted there) with the given tag
/// whose attributes satisfy the predicate.
pub fn find_in<'a, F>(el: ElementRef<'a>, tag: &str, pred: F) -> Option<ElementRef<'a>>
where
    F: Fn(&Element) -> bool,
{
    el.descendants()
        .filter_map(ElementRef::wrap)
        .find(|e| e.value().name() == tag && pred(e.value()))
}

/// Direct child elements with the given tag name, in order.
pub fn direct_children<'a>(el: ElementRef<'a>, tag: &str) -> Vec<ElementRef<'a>> {
    el.children()
        .filter_map(ElementRef::wrap)
        .filter(|e| e.value().name() == tag)
        .collect()
}

/// Text of an element: all descendant text when `recursive`, only direct
/// text nodes otherwise.
pub fn own_text(el: ElementRef<'_>, recursive: bool) -> String {
    if recursive {
        el.text().collect()
    } else {
        el.children()
            .filter_map(|n| match n.value() {
                Node::Text(t) => {
                    let s: &str = &t.text;
                    Some(s)
                }
                _ => None,
            })
            .collect()
    }
}

/// First non-empty direct text node, trimmed.
pub fn first_text(el: ElementRef<'_>) -> Option<String> {
    el.children().find_map(|n| match n.value() {
        Node::Text(t) => {
            let s = t.text.trim();
            if s.is_empty() {
                None
            } else {
                Some(s.to_string())
            }
        }
        _ => None,
    })
}

/// An outbound query string under construction. Multi-valued keys encode as
/// repeated `k=v` pairs; inserting an existing key replaces it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query {
    entries: BTreeMap<String, QueryValue>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum QueryValue {
    Single(String),
    Many(BTreeSet<String>),
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, key: impl Into<String>, value: QueryValue) {
        self.entries.insert(key.into(), value);
    }

    pub fn set_single(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.set(key, QueryValue::Single(value.into()));
    }

    /// Merge `other` on top of this query; its entries win on key conflicts.
    pub fn merge(&mut self, other: &Query) {
        for (k, v) in &other.entries {
            self.entries.insert(k.clone(), v.clone());
        }
    }

    pub fn get(&self, key: &str) -> Option<&QueryValue> {
        self.entries.get(key)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Flat `(key, value)` pairs, with multi-valued keys repeated.
    pub fn pairs(&self) -> Vec<(String, String)> {
        let mut pairs = Vec::new();
        for (k, v) in &self.entries {
            match v {
                QueryValue::Single(s) => pairs.push((k.clone(), s.clone())),
                QueryValue::Many(set) => {
                    for s in set {
                        pairs.push((k.clone(), s.clone()));
                    }
                }
            }
        }
        pairs
    }
}

/// Synchronous page-fetching collaborator. Implementations own transport
/// policy (cookies, headers, retries, timeouts); the core never retries.
pub trait Fetch {
    fn fetch(&self, path: &str, query: &Query) -> ScrapeResult<Document>;
}
