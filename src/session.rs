//! Sessions: the scraped-catalog root, locale binding, and the snapshot
//! persistence boundary.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::category::Category;
use crate::document::{Fetch, Query};
use crate::error::{ScrapeError, ScrapeResult};
use crate::group::Group;
use crate::locale::Locale;
use crate::param;
use crate::search::{SearchSchema, Searchable};

/// Root of one scraped catalog: a locale, the discovered groups, and the
/// shared parameter set. Everything discovery learns is serializable, so a
/// session survives process restarts through snapshots.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub locale: Locale,
    pub groups: Vec<Group>,
    shared: Option<SearchSchema>,
    title: String,
    path: String,
}

impl Session {
    pub const DEFAULT_CACHE_DIR: &'static str = ".digikey";

    pub fn new(locale: Locale) -> Self {
        let path = format!("products/{}", locale.short_lang);
        Self {
            locale,
            groups: Vec::new(),
            shared: None,
            title: "All".to_string(),
            path,
        }
    }

    /// Scrape the product index into `groups`. Idempotent per snapshot:
    /// callers normally run this once and persist the result.
    pub fn init_groups(&mut self, fetcher: &dyn Fetch) -> ScrapeResult<()> {
        self.groups = Group::scrape_all(fetcher, &self.locale.short_lang)?;
        Ok(())
    }

    /// Discover the shared parameter set by probing the first category with
    /// a minimal keyword search. Any category's filter page carries the
    /// shared controls.
    pub fn init_shared_params(&mut self, fetcher: &dyn Fetch) -> ScrapeResult<()> {
        let probe_path = self
            .groups
            .first()
            .and_then(|g| g.categories.first())
            .map(|c| c.path.clone())
            .ok_or_else(|| ScrapeError::schema("no categories to probe for shared parameters"))?;
        let mut query = Query::new();
        query.set_single("pageSize", "1");
        query.set_single("k", "R");
        let doc = fetcher.fetch(&probe_path, &query)?;
        let params = param::shared::discover(&doc)?;
        info!(params = params.len(), "discovered shared parameters");
        self.shared = Some(SearchSchema::from_params(params));
        Ok(())
    }

    pub fn shared_params(&self) -> ScrapeResult<&SearchSchema> {
        self.shared
            .as_ref()
            .ok_or_else(|| ScrapeError::schema("shared parameters have not been discovered"))
    }

    /// Look a category up by its `"{group}/{short_title}"` title.
    pub fn category(&self, title: &str) -> Option<&Category> {
        self.groups
            .iter()
            .flat_map(|g| &g.categories)
            .find(|c| c.title == title)
    }

    pub fn category_mut(&mut self, title: &str) -> Option<&mut Category> {
        self.groups
            .iter_mut()
            .flat_map(|g| &mut g.categories)
            .find(|c| c.title == title)
    }

    /// Ensure a category's schema is discovered, by title. The discovery
    /// result lands in the session and belongs in the next snapshot.
    pub fn init_category(&mut self, fetcher: &dyn Fetch, title: &str) -> ScrapeResult<()> {
        let shared = self.shared_params()?.clone();
        let category = self
            .category_mut(title)
            .ok_or_else(|| ScrapeError::schema(format!("no category titled '{title}'")))?;
        category.ensure_schema(fetcher, &shared)?;
        Ok(())
    }

    fn snapshot_file(&self) -> String {
        let l = &self.locale;
        format!(
            "{}_{}_{}_{}_{}.json",
            l.short_lang, l.country, l.long_lang, l.tld, l.currency
        )
    }

    /// Persist the session as a JSON snapshot under `dir`, one file per
    /// locale.
    pub fn save(&self, dir: impl AsRef<Path>) -> ScrapeResult<()> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir)
            .map_err(|e| ScrapeError::snapshot(format!("creating {}: {e}", dir.display())))?;
        let path = dir.join(self.snapshot_file());
        let body = serde_json::to_string_pretty(self)
            .map_err(|e| ScrapeError::snapshot(format!("encoding session: {e}")))?;
        fs::write(&path, body)
            .map_err(|e| ScrapeError::snapshot(format!("writing {}: {e}", path.display())))?;
        debug!(path = %path.display(), "saved session snapshot");
        Ok(())
    }

    /// Load the locale's snapshot from `dir`, or start a fresh session when
    /// none exists. The flag is true for a fresh session, which still needs
    /// its groups and shared parameters discovered.
    pub fn load_or_new(dir: impl AsRef<Path>, locale: Locale) -> ScrapeResult<(Session, bool)> {
        let path = dir.as_ref().join(Session::new(locale.clone()).snapshot_file());
        if !path.exists() {
            return Ok((Session::new(locale), true));
        }
        let body = fs::read_to_string(&path)
            .map_err(|e| ScrapeError::snapshot(format!("reading {}: {e}", path.display())))?;
        let session = serde_json::from_str(&body)
            .map_err(|e| ScrapeError::snapshot(format!("decoding {}: {e}", path.display())))?;
        debug!(path = %path.display(), "loaded session snapshot");
        Ok((session, false))
    }
}

impl Searchable for Session {
    fn title(&self) -> &str {
        &self.title
    }

    fn path(&self) -> &str {
        &self.path
    }

    fn schema(&self) -> Option<&SearchSchema> {
        self.shared.as_ref()
    }

    fn ensure_schema(
        &mut self,
        _fetcher: &dyn Fetch,
        shared: &SearchSchema,
    ) -> ScrapeResult<&SearchSchema> {
        Ok(self.shared.get_or_insert_with(|| shared.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::param::{ParamKind, ParamValue, Parameter};

    #[test]
    fn snapshot_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let mut session = Session::new(Locale::default());
        session.shared = Some(SearchSchema::from_params([Parameter::new(
            "In Stock",
            "stock",
            ParamKind::Bool,
        )
        .with_default(ParamValue::Bool(true))]));
        session.save(dir.path()).unwrap();

        let (loaded, fresh) = Session::load_or_new(dir.path(), Locale::default()).unwrap();
        assert!(!fresh);
        assert_eq!(loaded.locale, session.locale);
        assert_eq!(
            loaded.shared_params().unwrap().get("In Stock"),
            session.shared_params().unwrap().get("In Stock"),
        );
    }

    #[test]
    fn missing_snapshot_starts_fresh() {
        let dir = tempfile::tempdir().unwrap();
        let (session, fresh) = Session::load_or_new(dir.path(), Locale::default()).unwrap();
        assert!(fresh);
        assert!(session.groups.is_empty());
        assert!(session.shared_params().is_err());
    }

    #[test]
    fn snapshots_are_per_locale() {
        let us = Session::new(Locale::default());
        let de = Session::new(Locale::new("DE", "de"));
        assert_ne!(us.snapshot_file(), de.snapshot_file());
    }
}
