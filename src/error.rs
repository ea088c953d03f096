//! Error types for schema discovery, search validation, cell decoding, and
//! the pagination consistency check.
//!
//! None of these are retried internally; every variant propagates to the
//! caller. Transport retries, if any, belong to the fetch collaborator.

use thiserror::Error;

use crate::attr::AttrKind;
use crate::param::ParamValue;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ScrapeError {
    /// An expected markup anchor was absent during schema discovery. Fatal;
    /// no partial schema is usable.
    #[error("schema discovery failed: {message}")]
    Schema { message: String },

    /// A supplied parameter value was rejected by its validator. Fatal for
    /// the search call; no query is sent.
    #[error("{value:?} is not a valid value for parameter '{param}'")]
    InvalidValue {
        param: String,
        value: Option<ParamValue>,
    },

    /// The caller referenced parameter titles outside the discovered schema.
    #[error("unknown parameter keys: {}", keys.join(", "))]
    UnknownParams { keys: Vec<String> },

    /// A cell's expected sub-structure was missing where the decoder assumed
    /// it present. Fatal for that row; a partial part would corrupt
    /// downstream aggregation.
    #[error("expected {what} missing in '{column}' cell")]
    CellStructure { what: String, column: String },

    #[error("cannot parse number from '{text}'")]
    Number { text: String },

    /// A part accessor was invoked for an attribute the row does not carry.
    #[error("part has no {kind:?} attribute")]
    MissingAttribute { kind: AttrKind },

    /// The pagination self-check failed: a page was discovered in the wrong
    /// order. Fatal; no further pages are fetched.
    #[error("requested page {requested} but the document reports page {reported}")]
    PageMismatch { requested: u32, reported: u32 },

    #[error("invalid selector '{selector}': {message}")]
    Selector { selector: String, message: String },

    #[error("GET {url} failed: {message}")]
    Http { url: String, message: String },

    #[error("session snapshot error: {message}")]
    Snapshot { message: String },
}

impl ScrapeError {
    pub fn schema(message: impl Into<String>) -> Self {
        Self::Schema {
            message: message.into(),
        }
    }

    pub fn invalid_value(param: impl Into<String>, value: Option<ParamValue>) -> Self {
        Self::InvalidValue {
            param: param.into(),
            value,
        }
    }

    pub fn cell(what: impl Into<String>, column: impl Into<String>) -> Self {
        Self::CellStructure {
            what: what.into(),
            column: column.into(),
        }
    }

    pub fn number(text: impl Into<String>) -> Self {
        Self::Number { text: text.into() }
    }

    pub fn selector(selector: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Selector {
            selector: selector.into(),
            message: message.into(),
        }
    }

    pub fn http(url: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Http {
            url: url.into(),
            message: message.into(),
        }
    }

    pub fn snapshot(message: impl Into<String>) -> Self {
        Self::Snapshot {
            message: message.into(),
        }
    }
}

pub type ScrapeResult<T> = Result<T, ScrapeError>;
