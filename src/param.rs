//! Typed search parameters and their query encoding.
//!
//! Every searchable unit carries a title-keyed set of [`Parameter`]s. A
//! parameter validates caller-supplied values and encodes them into the
//! outbound query; `None` always validates and means "unspecified".

use std::collections::{BTreeMap, BTreeSet};

use scraper::ElementRef;
use serde::{Deserialize, Serialize};

use crate::document::{QueryValue, direct_children, own_text};
use crate::error::{ScrapeError, ScrapeResult};

/// A caller-supplied value for one parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ParamValue {
    Bool(bool),
    UInt(u64),
    /// Value for multi-valued and filter parameters.
    Strings(BTreeSet<String>),
    /// Value for the sort parameter: a sortable column and a direction.
    Sort { column: String, ascending: bool },
}

/// Behavior of a parameter, with variant-specific payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ParamKind {
    /// Encodes `false`/`true` as `0`/`1`.
    Bool,
    UInt,
    /// Free-form multi-valued parameter; encodes as repeated `k=v` pairs.
    Multi,
    /// Multi-valued parameter restricted to a discovered option set,
    /// `display label -> internal code`. Encodes labels to codes.
    Filter { options: BTreeMap<String, String> },
    /// Result ordering, `column title -> positive code`. Encodes to a single
    /// signed code; the sign flips for descending.
    Sort { by: BTreeMap<String, i32> },
    /// Boolean semantics, but `true` and `false` encode to two distinct
    /// query keys (`rohs` / `nonrohs`), both with value `1`.
    Rohs,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Parameter {
    /// Human-facing, locale-dependent label; the caller-facing lookup key.
    pub title: String,
    /// Stable machine key used in the outbound query.
    pub name: String,
    /// Used when the caller leaves the parameter unspecified.
    pub default: Option<ParamValue>,
    pub kind: ParamKind,
}

impl Parameter {
    pub fn new(title: impl Into<String>, name: impl Into<String>, kind: ParamKind) -> Self {
        Self {
            title: title.into(),
            name: name.into(),
            default: None,
            kind,
        }
    }

    pub fn with_default(mut self, value: ParamValue) -> Self {
        self.default = Some(value);
        self
    }

    /// Whether `value` is acceptable for this parameter. Never errors;
    /// `None` is always valid and means "unspecified".
    pub fn validate(&self, value: Option<&ParamValue>) -> bool {
        let Some(value) = value else {
            return true;
        };
        match (&self.kind, value) {
            (ParamKind::Bool | ParamKind::Rohs, ParamValue::Bool(_)) => true,
            (ParamKind::UInt, ParamValue::UInt(_)) => true,
            (ParamKind::Multi, ParamValue::Strings(_)) => true,
            (ParamKind::Filter { options }, ParamValue::Strings(labels)) => {
                labels.iter().all(|label| options.contains_key(label))
            }
            (ParamKind::Sort { by }, ParamValue::Sort { column, .. }) => by.contains_key(column),
            _ => false,
        }
    }

    /// Encode the supplied-or-default value into a query pair. Returns
    /// `None` when the resolved value is absent (or an empty set), in which
    /// case the parameter contributes nothing to the query. Assumes the
    /// value has already passed [`Self::validate`].
    pub fn to_query(&self, value: Option<&ParamValue>) -> Option<(String, QueryValue)> {
        let value = value.or(self.default.as_ref())?;
        match (&self.kind, value) {
            (ParamKind::Bool, ParamValue::Bool(b)) => Some((
                self.name.clone(),
                QueryValue::Single(if *b { "1" } else { "0" }.to_string()),
            )),
            (ParamKind::Rohs, ParamValue::Bool(b)) => {
                let name = if *b {
                    self.name.clone()
                } else {
                    format!("non{}", self.name)
                };
                Some((name, QueryValue::Single("1".to_string())))
            }
            (ParamKind::UInt, ParamValue::UInt(n)) => {
                Some((self.name.clone(), QueryValue::Single(n.to_string())))
            }
            (ParamKind::Multi, ParamValue::Strings(values)) if !values.is_empty() => {
                Some((self.name.clone(), QueryValue::Many(values.clone())))
            }
            (ParamKind::Filter { options }, ParamValue::Strings(labels)) if !labels.is_empty() => {
                let codes = labels
                    .iter()
                    .filter_map(|label| options.get(label).cloned())
                    .collect();
                Some((self.name.clone(), QueryValue::Many(codes)))
            }
            (ParamKind::Sort { by }, ParamValue::Sort { column, ascending }) => {
                let code = *by.get(column)?;
                let code = if *ascending { code } else { -code };
                Some((self.name.clone(), QueryValue::Single(code.to_string())))
            }
            _ => None,
        }
    }
}

/// Build a [`ParamKind::Filter`] parameter from a discovered `<select>`
/// element; options map the label text to the option's `value` attribute.
pub fn filter_from_select(title: &str, select: ElementRef<'_>) -> ScrapeResult<Parameter> {
    let name = select
        .value()
        .attr("name")
        .ok_or_else(|| ScrapeError::schema(format!("filter select for '{title}' has no name")))?;
    let mut options = BTreeMap::new();
    for option in direct_children(select, "option") {
        let label = own_text(option, true).trim().to_string();
        let code = option.value().attr("value").unwrap_or_default().to_string();
        options.insert(label, code);
    }
    if options.is_empty() {
        return Err(ScrapeError::schema(format!(
            "filter select for '{title}' has no options"
        )));
    }
    Ok(Parameter::new(title, name, ParamKind::Filter { options }))
}

/// Discovery of the parameters shared by every searchable unit. Their
/// machine names are fixed; their titles are locale-dependent and must be
/// scraped from the filter markup of a sample page.
pub mod shared {
    use super::{ParamKind, ParamValue, Parameter};
    use crate::document::Document;
    use crate::error::{ScrapeError, ScrapeResult};

    pub const QUANTITY_NAME: &str = "quantity";

    /// The label element text for a named form control.
    pub fn label_for(doc: &Document, name: &str) -> ScrapeResult<String> {
        let label = doc
            .find("label", |e| e.attr("for") == Some(name))
            .ok_or_else(|| ScrapeError::schema(format!("no label for control '{name}'")))?;
        Ok(crate::document::own_text(label, true).trim().to_string())
    }

    fn checkbox(doc: &Document, name: &str, kind: ParamKind) -> ScrapeResult<Parameter> {
        let title = label_for(doc, name)?;
        Ok(Parameter::new(title, name, kind))
    }

    /// Media requirement checkboxes share a heading; their titles are
    /// `"{heading} - {label}"` to keep them distinct from plain checkboxes.
    fn media_checkbox(doc: &Document, name: &str) -> ScrapeResult<Parameter> {
        let heads = doc.select(
            "div#f2 > div.filters-group-chkbxs > div:nth-of-type(2) li.advfilterheading",
        )?;
        let head = heads
            .first()
            .ok_or_else(|| ScrapeError::schema("media filter heading missing"))?;
        let heading = crate::document::own_text(*head, true).trim().to_string();
        let label = label_for(doc, name)?;
        Ok(Parameter::new(
            format!("{heading} - {label}"),
            name,
            ParamKind::Bool,
        ))
    }

    /// The quantity box has no label; its title is the trailing word of the
    /// input placeholder (e.g. "Quantity" out of "Enter Quantity").
    fn quantity(doc: &Document) -> ScrapeResult<Parameter> {
        let input = doc
            .find("input", |e| e.attr("id") == Some("qty"))
            .ok_or_else(|| ScrapeError::schema("quantity input missing"))?;
        let placeholder = input
            .value()
            .attr("placeholder")
            .ok_or_else(|| ScrapeError::schema("quantity input has no placeholder"))?;
        let title = placeholder.rsplit(' ').next().unwrap_or(placeholder);
        Ok(Parameter::new(title, QUANTITY_NAME, ParamKind::UInt)
            .with_default(ParamValue::UInt(1)))
    }

    /// Scrape the shared parameter set from a sample filter page. Fails if
    /// any expected label anchor is absent; a partial shared set is not
    /// usable.
    pub fn discover(doc: &Document) -> ScrapeResult<Vec<Parameter>> {
        Ok(vec![
            checkbox(doc, "stock", ParamKind::Bool)?.with_default(ParamValue::Bool(true)),
            checkbox(doc, "nstock", ParamKind::Bool)?,
            checkbox(doc, "newproducts", ParamKind::Bool)?,
            media_checkbox(doc, "datasheet")?,
            media_checkbox(doc, "photo")?,
            media_checkbox(doc, "cad")?,
            checkbox(doc, "rohs", ParamKind::Rohs)?,
            quantity(doc)?,
        ])
    }
}
