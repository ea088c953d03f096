//! The search contract shared by every searchable unit (session, group,
//! category): a discovered parameter schema, value validation, and query
//! building.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::document::{Document, Fetch, Query};
use crate::error::{ScrapeError, ScrapeResult};
use crate::param::{ParamValue, Parameter};

/// Caller-supplied parameter values, keyed by parameter title.
pub type ParamValues = BTreeMap<String, ParamValue>;

/// A title-keyed parameter schema for one searchable unit. Built once by
/// schema discovery, read-only afterwards; repeated searches reuse it
/// without re-discovery.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchSchema {
    params: BTreeMap<String, Parameter>,
}

impl SearchSchema {
    pub fn from_params(params: impl IntoIterator<Item = Parameter>) -> Self {
        Self {
            params: params
                .into_iter()
                .map(|p| (p.title.clone(), p))
                .collect(),
        }
    }

    pub fn get(&self, title: &str) -> Option<&Parameter> {
        self.params.get(title)
    }

    pub fn params(&self) -> impl Iterator<Item = &Parameter> {
        self.params.values()
    }

    pub fn len(&self) -> usize {
        self.params.len()
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    /// The supplied-or-default value for a parameter, by title.
    pub fn resolve<'a>(&'a self, values: &'a ParamValues, title: &str) -> Option<&'a ParamValue> {
        let param = self.params.get(title)?;
        values.get(title).or(param.default.as_ref())
    }

    /// Validate supplied values against the schema and build the outbound
    /// query. Unknown titles and invalid values abort before anything is
    /// sent; every known parameter (not just the supplied ones) resolves its
    /// supplied-or-default value and contributes its encoding, then `extra`
    /// raw pairs merge on top.
    pub fn build_query(&self, values: &ParamValues, extra: &Query) -> ScrapeResult<Query> {
        let unknown: Vec<String> = values
            .keys()
            .filter(|title| !self.params.contains_key(*title))
            .cloned()
            .collect();
        if !unknown.is_empty() {
            return Err(ScrapeError::UnknownParams { keys: unknown });
        }

        let mut query = Query::new();
        for (title, param) in &self.params {
            let value = values.get(title).or(param.default.as_ref());
            if !param.validate(value) {
                return Err(ScrapeError::invalid_value(title.clone(), value.cloned()));
            }
            if let Some((key, encoded)) = param.to_query(value) {
                query.set(key, encoded);
            }
        }
        query.merge(extra);
        Ok(query)
    }
}

/// A unit of the catalog that can be searched. Lifecycle is explicit and
/// two-phase: constructed bare, then [`Searchable::ensure_schema`] before
/// the first search; the schema is memoized and never invalidated within a
/// process lifetime.
pub trait Searchable {
    fn title(&self) -> &str;

    /// URL path component associated with this unit.
    fn path(&self) -> &str;

    /// The memoized schema, if discovery has run.
    fn schema(&self) -> Option<&SearchSchema>;

    /// Discover and memoize this unit's parameter schema by merging the
    /// shared parameter set with unit-specific parameters. Idempotent; may
    /// fetch.
    fn ensure_schema(
        &mut self,
        fetcher: &dyn Fetch,
        shared: &SearchSchema,
    ) -> ScrapeResult<&SearchSchema>;

    /// Validate values against the discovered schema, build the query, and
    /// fetch the raw result document. Interpreting the document is the
    /// caller's (or an override's) concern.
    fn search_doc(
        &self,
        fetcher: &dyn Fetch,
        values: &ParamValues,
        extra: &Query,
    ) -> ScrapeResult<Document> {
        let schema = self.schema().ok_or_else(|| {
            ScrapeError::schema(format!(
                "schema for '{}' has not been discovered",
                self.title()
            ))
        })?;
        debug!(unit = self.title(), "searching");
        let query = schema.build_query(values, extra)?;
        fetcher.fetch(self.path(), &query)
    }
}
