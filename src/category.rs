//! Categories: schema discovery and the paginated part search.
//!
//! A category is a subdivision of a group, and searching within one is the
//! most common operation thanks to its filtration interface. Column
//! headings, filters, and sort codes are presentation-language-dependent, so
//! discovery never matches literal label text where a structural marker
//! exists.

use std::collections::{BTreeMap, VecDeque};

use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Node};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::document::{Document, Fetch, Query, direct_children, find_in, own_text, select_in};
use crate::error::{ScrapeError, ScrapeResult};
use crate::locale::Locale;
use crate::param::{self, ParamKind, ParamValue, Parameter};
use crate::part::{Part, assemble_row};
use crate::search::{ParamValues, SearchSchema, Searchable};

/// `(N)` result-count annotation next to a category link.
static COUNT_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\((\d+)").expect("count pattern"));
/// Sort code inside an ascending sort button's click handler.
static SORT_CODE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"sort\((\d+)\);").expect("sort pattern"));
/// Trailing `X/Y` of the page indicator.
static PAGE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r" ([^/ ]+)/([^/]+)$").expect("page pattern"));

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Category {
    /// `"{group}/{short_title}"`.
    pub title: String,
    pub short_title: String,
    pub path: String,
    /// Declared result count from the index page; advisory only.
    pub size: Option<u64>,
    schema: Option<CategorySchema>,
}

/// Everything discovery learns about a category, memoized on first search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategorySchema {
    pub search: SearchSchema,
    /// Column titles, fixed in table order.
    pub heads: Vec<String>,
    /// Locale-resolved title of the shared quantity parameter; the
    /// row-inclusion policy resolves the requested quantity through it.
    pub quantity_title: String,
}

impl Category {
    /// Build a category from its `<li>` in the product index.
    pub(crate) fn from_index_item(group_title: &str, item: ElementRef<'_>) -> ScrapeResult<Self> {
        let anchor = direct_children(item, "a")
            .into_iter()
            .next()
            .ok_or_else(|| ScrapeError::schema("category item without a link"))?;
        let short_title = own_text(anchor, true).trim().to_string();
        let path = anchor
            .value()
            .attr("href")
            .ok_or_else(|| ScrapeError::schema(format!("category '{short_title}' has no href")))?
            .to_string();

        // the count lives in a text node beside the link
        let mut size = None;
        for child in item.children() {
            if let Node::Text(t) = child.value() {
                let text: &str = &t.text;
                if let Some(caps) = COUNT_RE.captures(text) {
                    size = caps[1].parse().ok();
                    break;
                }
            }
        }

        Ok(Self {
            title: format!("{group_title}/{short_title}"),
            short_title,
            path,
            size,
            schema: None,
        })
    }

    pub fn category_schema(&self) -> Option<&CategorySchema> {
        self.schema.as_ref()
    }

    fn discover_schema(
        &self,
        fetcher: &dyn Fetch,
        shared: &SearchSchema,
    ) -> ScrapeResult<CategorySchema> {
        info!(category = %self.title, "discovering search schema");
        let mut probe = Query::new();
        probe.set_single("pageSize", "1");
        let doc = fetcher.fetch(&self.path, &probe)?;

        // the datasheet column header is icon-only; its title comes from the
        // shared checkbox label instead
        let datasheet_head = param::shared::label_for(&doc, "datasheet")?;
        let heads = Self::column_heads(&doc, &datasheet_head)?;

        let status_head = Self::part_status_head(&doc, &heads)?;
        let price_head = Self::price_head(&doc)?;
        let sort_head = Self::sort_head(&doc)?;

        let mut params: Vec<Parameter> = shared.params().cloned().collect();
        params.push(Self::sort_param(&doc, &heads, sort_head, &price_head)?);

        let headlines = doc.select("div#filters-group span.filters-headline")?;
        let selects = doc.select("div#filters-group select.filter-selectors")?;
        if headlines.is_empty() || selects.is_empty() {
            return Err(ScrapeError::schema(format!(
                "filter block missing for category '{}'",
                self.title
            )));
        }
        for (head, select) in headlines.iter().zip(&selects) {
            let title = own_text(*head, true).trim().to_string();
            let mut filter = param::filter_from_select(&title, *select)?;
            if title == status_head {
                // default to the active-status option; "0" is its stable
                // code, the label is language-dependent
                if let ParamKind::Filter { options } = &filter.kind {
                    if let Some(label) = options
                        .iter()
                        .find(|(_, code)| code.as_str() == "0")
                        .map(|(label, _)| label.clone())
                    {
                        filter.default =
                            Some(ParamValue::Strings(std::iter::once(label).collect()));
                    }
                }
            }
            params.push(filter);
        }

        let quantity_title = shared
            .params()
            .find(|p| p.name == param::shared::QUANTITY_NAME)
            .map(|p| p.title.clone())
            .ok_or_else(|| ScrapeError::schema("shared quantity parameter missing"))?;

        Ok(CategorySchema {
            search: SearchSchema::from_params(params),
            heads,
            quantity_title,
        })
    }

    /// Column titles from the result table's first header row. The
    /// datasheet and price columns carry no usable literal text and are
    /// resolved structurally.
    fn column_heads(doc: &Document, datasheet_head: &str) -> ScrapeResult<Vec<String>> {
        let ths = doc.select("table#productTable > thead#tblhead > tr:nth-of-type(1) > th")?;
        if ths.is_empty() {
            return Err(ScrapeError::schema("result table header missing"));
        }
        let mut heads = Vec::with_capacity(ths.len());
        for th in ths {
            let css_cls = th.value().classes().next().unwrap_or("");
            let head = if css_cls == "th-datasheet" {
                datasheet_head.to_string()
            } else if css_cls.contains("th-unitPrice") {
                Self::price_title(th)?
            } else {
                own_text(th, true).trim().to_string()
            };
            heads.push(head);
        }
        Ok(heads)
    }

    /// Price header text is `whitespace / title / currency`; the title is
    /// its second line.
    fn price_title(th: ElementRef<'_>) -> ScrapeResult<String> {
        own_text(th, true)
            .lines()
            .nth(1)
            .map(|line| line.trim().to_string())
            .filter(|line| !line.is_empty())
            .ok_or_else(|| ScrapeError::schema("price column heading missing its title line"))
    }

    /// The part-status column is identified by a marker span in a sample
    /// result row, never by its language-dependent heading.
    fn part_status_head(doc: &Document, heads: &[String]) -> ScrapeResult<String> {
        let cells = doc.select("table#productTable tbody#lnkPart > tr:nth-of-type(1) > td")?;
        for (head, cell) in heads.iter().zip(cells) {
            if find_in(cell, "span", |e| e.attr("id") == Some("part-status")).is_some() {
                return Ok(head.clone());
            }
        }
        Err(ScrapeError::schema("no part-status column in sample row"))
    }

    fn price_head(doc: &Document) -> ScrapeResult<String> {
        let th = doc
            .select("table#productTable > thead > tr:nth-of-type(1) > th.th-unitPrice")?
            .into_iter()
            .next()
            .ok_or_else(|| ScrapeError::schema("price column header missing"))?;
        Self::price_title(th)
    }

    /// There is no literal "sort order" label on the page; the joined alts
    /// of the sorted-arrow images (e.g. "Ascending/Descending" in the
    /// configured language) serve as the parameter title.
    fn sort_head(doc: &Document) -> ScrapeResult<String> {
        let imgs = doc.select("button.ps-sortButtons > img.sorted")?;
        let alts: Vec<&str> = imgs
            .iter()
            .take(2)
            .filter_map(|img| img.value().attr("alt"))
            .collect();
        if alts.is_empty() {
            return Err(ScrapeError::schema("sort direction images missing"));
        }
        Ok(alts.join("/"))
    }

    /// Build the sort parameter from the header's sort buttons. Only the
    /// ascending button of each sortable column carries the base code.
    fn sort_param(
        doc: &Document,
        heads: &[String],
        title: String,
        price_head: &str,
    ) -> ScrapeResult<Parameter> {
        let cells = doc.select("table#productTable thead#tblhead > tr:nth-of-type(2) > td")?;
        let mut by = BTreeMap::new();
        for (head, cell) in heads.iter().zip(cells) {
            let Some(button) = find_in(cell, "button", |e| {
                e.classes().any(|c| c == "ps-sortButtons")
            }) else {
                continue;
            };
            let img = find_in(button, "img", |e| e.classes().any(|c| c == "nonsorted"))
                .ok_or_else(|| ScrapeError::schema("sort button without direction image"))?;
            let src = img.value().attr("src").unwrap_or("");
            let file = src.rsplit('/').next().unwrap_or("");
            if !file.starts_with("up") {
                return Err(ScrapeError::schema(format!(
                    "expected the ascending sort image first, found '{file}'"
                )));
            }
            let onclick = button.value().attr("onclick").unwrap_or("");
            let caps = SORT_CODE_RE.captures(onclick).ok_or_else(|| {
                ScrapeError::schema(format!("unparseable sort handler '{onclick}'"))
            })?;
            let code: i32 = caps[1]
                .parse()
                .map_err(|_| ScrapeError::schema(format!("bad sort code in '{onclick}'")))?;
            if code <= 0 {
                return Err(ScrapeError::schema(format!("non-positive sort code {code}")));
            }
            by.insert(head.clone(), code);
        }
        Ok(
            Parameter::new(title, "ColumnSort", ParamKind::Sort { by }).with_default(
                ParamValue::Sort {
                    column: price_head.to_string(),
                    ascending: true,
                },
            ),
        )
    }

    /// Search this category, yielding parts lazily, one page fetch per
    /// consumption of the prior page's rows. `filter_qty` enables the
    /// minimum-order-quantity row policy against the requested quantity.
    /// Requires a discovered schema.
    pub fn search<'a>(
        &'a self,
        fetcher: &'a dyn Fetch,
        values: ParamValues,
        filter_qty: bool,
        locale: &'a Locale,
    ) -> ScrapeResult<PartIter<'a>> {
        let schema = self.schema.as_ref().ok_or_else(|| {
            ScrapeError::schema(format!(
                "schema for '{}' has not been discovered",
                self.title
            ))
        })?;
        // resolve the requested quantity the same way it will be encoded
        let quantity = match schema.search.resolve(&values, &schema.quantity_title) {
            Some(ParamValue::UInt(n)) => Some(*n),
            _ => None,
        };
        Ok(PartIter {
            category: self,
            heads: &schema.heads,
            fetcher,
            values,
            locale,
            min_qty_cap: if filter_qty { quantity } else { None },
            page: 0,
            last_page: None,
            buffered: VecDeque::new(),
            pending: None,
            done: false,
        })
    }
}

impl Searchable for Category {
    fn title(&self) -> &str {
        &self.title
    }

    fn path(&self) -> &str {
        &self.path
    }

    fn schema(&self) -> Option<&SearchSchema> {
        self.schema.as_ref().map(|s| &s.search)
    }

    fn ensure_schema(
        &mut self,
        fetcher: &dyn Fetch,
        shared: &SearchSchema,
    ) -> ScrapeResult<&SearchSchema> {
        if self.schema.is_none() {
            let schema = self.discover_schema(fetcher, shared)?;
            self.schema = Some(schema);
        }
        match &self.schema {
            Some(s) => Ok(&s.search),
            None => Err(ScrapeError::schema("category schema unavailable")),
        }
    }
}

/// Lazy, restartable-per-call sequence of parts across result pages. Pages
/// are fetched strictly in ascending order; page N+1 is never fetched before
/// page N's rows have been drained, and a consumer that stops pulling causes
/// no further fetches.
pub struct PartIter<'a> {
    category: &'a Category,
    heads: &'a [String],
    fetcher: &'a dyn Fetch,
    values: ParamValues,
    locale: &'a Locale,
    min_qty_cap: Option<u64>,
    page: u32,
    last_page: Option<u32>,
    buffered: VecDeque<Part>,
    /// Error to surface after the current page's rows are drained. The page
    /// indicator is checked after its rows are yielded, so a mismatch (or a
    /// row decode failure) follows the rows that preceded it.
    pending: Option<ScrapeError>,
    done: bool,
}

impl Iterator for PartIter<'_> {
    type Item = ScrapeResult<Part>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(part) = self.buffered.pop_front() {
                return Some(Ok(part));
            }
            if let Some(err) = self.pending.take() {
                self.done = true;
                return Some(Err(err));
            }
            if self.done {
                return None;
            }
            if let Some(last) = self.last_page {
                if self.page >= last {
                    self.done = true;
                    return None;
                }
            }
            self.page += 1;
            match self.fetch_page() {
                Ok(true) => {}
                Ok(false) => {
                    // category legitimately empty, or a page past the range
                    self.done = true;
                    return None;
                }
                Err(e) => {
                    self.pending = Some(e);
                }
            }
        }
    }
}

impl PartIter<'_> {
    /// Fetch and decode one result page into the buffer. Returns false when
    /// the document carries no results table.
    fn fetch_page(&mut self) -> ScrapeResult<bool> {
        debug!(category = %self.category.title, page = self.page, "fetching result page");
        let mut extra = Query::new();
        extra.set_single("page", self.page.to_string());
        let doc = self
            .category
            .search_doc(self.fetcher, &self.values, &extra)?;

        let Some(table) = doc.select("table#productTable")?.into_iter().next() else {
            return Ok(false);
        };

        for row in select_in(table, "tbody#lnkPart > tr")? {
            let cells = direct_children(row, "td");
            if let Some(part) = assemble_row(self.heads, &cells, self.locale, self.min_qty_cap)? {
                self.buffered.push_back(part);
            }
        }

        let indicator = doc
            .select("span.current-page")?
            .into_iter()
            .next()
            .ok_or_else(|| ScrapeError::schema("page indicator missing from result page"))?;
        let text = own_text(indicator, true).trim().to_string();
        let caps = PAGE_RE
            .captures(&text)
            .ok_or_else(|| ScrapeError::schema(format!("unparseable page indicator '{text}'")))?;
        let reported = self.locale.parse_uint(&caps[1])? as u32;
        let last = self.locale.parse_uint(&caps[2])? as u32;
        if reported != self.page {
            // a page discovered in the wrong order breaks the ordering
            // assumption behind the whole sequence
            return Err(ScrapeError::PageMismatch {
                requested: self.page,
                reported,
            });
        }
        self.last_page = Some(last);
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Document;

    #[test]
    fn category_from_index_item() {
        let doc = Document::parse(
            "<ul><li><a href='/products/en/resistors/chip/52'>Chip Resistors</a> (189,000 items)</li></ul>",
        );
        let item = doc.select("li").unwrap()[0];
        let cat = Category::from_index_item("Resistors", item).unwrap();
        assert_eq!(cat.title, "Resistors/Chip Resistors");
        assert_eq!(cat.short_title, "Chip Resistors");
        assert_eq!(cat.path, "/products/en/resistors/chip/52");
        assert_eq!(cat.size, Some(189));
    }

    #[test]
    fn category_without_count_has_no_size() {
        let doc = Document::parse("<ul><li><a href='/c/1'>Odds and Ends</a></li></ul>");
        let item = doc.select("li").unwrap()[0];
        let cat = Category::from_index_item("Misc", item).unwrap();
        assert_eq!(cat.size, None);
    }

    #[test]
    fn search_requires_a_discovered_schema() {
        let doc = Document::parse("<ul><li><a href='/c/1'>Bare</a></li></ul>");
        let item = doc.select("li").unwrap()[0];
        let cat = Category::from_index_item("G", item).unwrap();

        struct NoFetch;
        impl Fetch for NoFetch {
            fn fetch(&self, _path: &str, _query: &Query) -> ScrapeResult<Document> {
                panic!("schema check must fail before any fetch");
            }
        }

        let locale = Locale::default();
        let err = cat
            .search(&NoFetch, ParamValues::new(), true, &locale)
            .err()
            .unwrap();
        assert!(matches!(err, ScrapeError::Schema { .. }));
    }
}
