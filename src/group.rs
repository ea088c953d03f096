//! Top-level product groups and the product-index scrape that discovers
//! them.

use scraper::ElementRef;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::category::Category;
use crate::document::{Fetch, Query, direct_children, own_text};
use crate::error::{ScrapeError, ScrapeResult};
use crate::search::{SearchSchema, Searchable};

/// A product group: a titled collection of categories from the site's
/// product index. Groups carry no parameters of their own; their schema is
/// the shared set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Group {
    pub title: String,
    pub path: String,
    /// URL slug, second-to-last path segment.
    pub name: String,
    /// Numeric identifier, last path segment.
    pub code: String,
    pub categories: Vec<Category>,
    schema: Option<SearchSchema>,
}

impl Group {
    /// Build a group from its `<h2>` heading in the product index. The
    /// categories live in the heading's following `<ul>` sibling.
    fn from_heading(heading: ElementRef<'_>) -> ScrapeResult<Self> {
        let anchor = direct_children(heading, "a")
            .into_iter()
            .next()
            .ok_or_else(|| ScrapeError::schema("group heading without a link"))?;
        let title = own_text(anchor, true).trim().to_string();
        let path = anchor
            .value()
            .attr("href")
            .ok_or_else(|| ScrapeError::schema(format!("group '{title}' has no href")))?
            .to_string();

        let mut segments = path.split('/').filter(|s| !s.is_empty());
        let code = segments
            .next_back()
            .ok_or_else(|| ScrapeError::schema(format!("group path '{path}' has no code")))?
            .to_string();
        let name = segments
            .next_back()
            .ok_or_else(|| ScrapeError::schema(format!("group path '{path}' has no name")))?
            .to_string();

        let list = heading
            .next_siblings()
            .filter_map(ElementRef::wrap)
            .find(|e| e.value().name() == "ul")
            .ok_or_else(|| ScrapeError::schema(format!("group '{title}' has no category list")))?;
        let categories = direct_children(list, "li")
            .into_iter()
            .map(|item| Category::from_index_item(&title, item))
            .collect::<ScrapeResult<Vec<_>>>()?;

        Ok(Self {
            title,
            path,
            name,
            code,
            categories,
            schema: None,
        })
    }

    /// Scrape every group (and its categories) from the product index page.
    pub fn scrape_all(fetcher: &dyn Fetch, short_lang: &str) -> ScrapeResult<Vec<Group>> {
        let doc = fetcher.fetch(&format!("products/{short_lang}"), &Query::new())?;
        let index = doc
            .select("div#productIndexList")?
            .into_iter()
            .next()
            .ok_or_else(|| ScrapeError::schema("product index list missing"))?;
        let groups = direct_children(index, "h2")
            .into_iter()
            .map(Self::from_heading)
            .collect::<ScrapeResult<Vec<_>>>()?;
        info!(groups = groups.len(), "scraped product index");
        Ok(groups)
    }

    /// Declared part count across the group's categories.
    pub fn size(&self) -> u64 {
        self.categories.iter().filter_map(|c| c.size).sum()
    }
}

impl Searchable for Group {
    fn title(&self) -> &str {
        &self.title
    }

    fn path(&self) -> &str {
        &self.path
    }

    fn schema(&self) -> Option<&SearchSchema> {
        self.schema.as_ref()
    }

    fn ensure_schema(
        &mut self,
        _fetcher: &dyn Fetch,
        shared: &SearchSchema,
    ) -> ScrapeResult<&SearchSchema> {
        Ok(self.schema.get_or_insert_with(|| shared.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Document;

    const INDEX: &str = "<div id='productIndexList'>\
        <h2><a href='/products/en/resistors/52'>Resistors</a></h2>\
        <ul>\
          <li><a href='/products/en/resistors/chip/521'>Chip Resistors</a> (189,000 items)</li>\
          <li><a href='/products/en/resistors/through-hole/522'>Through Hole</a> (42,000)</li>\
        </ul>\
        <h2><a href='/products/en/capacitors/3'>Capacitors</a></h2>\
        <ul><li><a href='/products/en/capacitors/ceramic/31'>Ceramic</a> (7)</li></ul>\
        </div>";

    struct IndexFetch;
    impl Fetch for IndexFetch {
        fn fetch(&self, path: &str, _query: &Query) -> ScrapeResult<Document> {
            assert_eq!(path, "products/en");
            Ok(Document::parse(INDEX))
        }
    }

    #[test]
    fn scrapes_groups_and_their_categories() {
        let groups = Group::scrape_all(&IndexFetch, "en").unwrap();
        assert_eq!(groups.len(), 2);

        let resistors = &groups[0];
        assert_eq!(resistors.title, "Resistors");
        assert_eq!(resistors.name, "resistors");
        assert_eq!(resistors.code, "52");
        assert_eq!(resistors.categories.len(), 2);
        assert_eq!(resistors.categories[0].title, "Resistors/Chip Resistors");
        assert_eq!(resistors.size(), 189 + 42);

        assert_eq!(groups[1].categories[0].short_title, "Ceramic");
        assert_eq!(groups[1].size(), 7);
    }

    #[test]
    fn ensure_schema_adopts_the_shared_set() {
        let mut group = Group::scrape_all(&IndexFetch, "en").unwrap().remove(0);
        assert!(group.schema().is_none());
        let shared = SearchSchema::default();
        group.ensure_schema(&IndexFetch, &shared).unwrap();
        assert!(group.schema().is_some());
    }
}
