//! Scraper for the DigiKey electronic-component catalog.
//!
//! The site exposes its full filtration interface through plain HTML forms
//! and query strings, so the catalog can be driven without an API key. A
//! [`session::Session`] binds a locale and discovers the catalog structure
//! (groups, categories, search parameters); [`category::Category::search`]
//! then yields typed [`part::Part`] records page by page.
//!
//! Discovery is explicit and two-phase: construct, then `ensure_schema`
//! before the first search. Everything discovery learns serializes, so
//! snapshots make repeat runs cheap.

pub mod attr;
pub mod category;
pub mod document;
pub mod error;
pub mod fetch;
pub mod group;
pub mod locale;
pub mod param;
pub mod part;
pub mod search;
pub mod session;

pub use error::{ScrapeError, ScrapeResult};
