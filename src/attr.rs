//! Per-cell attribute decoding for product-table rows.
//!
//! Each result cell carries a structural class marker that decides how its
//! markup is decoded into a typed [`Attribute`]. Decoding is a pure function
//! of the cell markup; markup quirks are handled here and nowhere else, so
//! row assembly stays uniform regardless of column semantics.

use once_cell::sync::Lazy;
use regex::Regex;
use scraper::ElementRef;

use crate::document::{direct_children, find_in, first_text, own_text};
use crate::error::{ScrapeError, ScrapeResult};
use crate::locale::Locale;

/// Currency prefix followed by a digit run, e.g. `"$ 1.234,56"`.
static PRICE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\D+?)\s*([0-9][0-9.,]*)$").expect("price pattern"));

/// Structural class marker of a result cell; the dispatch key for decoding.
/// Unknown markers fall back to plain text extraction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CellMarker {
    Compare,
    Datasheet,
    Image,
    PartNumber,
    QtyAvailable,
    UnitPrice,
    MinQty,
    Packaging,
    Vendor,
    MfgPartNumber,
    Description,
    Series,
    Other,
}

impl CellMarker {
    /// The first class token of the cell decides the decoder.
    fn of(cell: ElementRef<'_>) -> Self {
        match cell.value().classes().next() {
            Some("tr-compareParts") => Self::Compare,
            Some("tr-datasheet") => Self::Datasheet,
            Some("tr-image") => Self::Image,
            Some("tr-dkPartNumber") => Self::PartNumber,
            Some("tr-qtyAvailable") => Self::QtyAvailable,
            Some("tr-unitPrice") => Self::UnitPrice,
            Some("tr-minQty") => Self::MinQty,
            Some("tr-packaging") => Self::Packaging,
            Some("tr-vendor") => Self::Vendor,
            Some("tr-mfgPartNumber") => Self::MfgPartNumber,
            Some("tr-description") => Self::Description,
            Some("tr-series") => Self::Series,
            _ => Self::Other,
        }
    }
}

/// Stable tag under which an attribute is indexed on a [`crate::part::Part`].
/// Attributes without a kind (the compare column, unknown columns) stay in
/// the row sequence but out of the index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AttrKind {
    Datasheet,
    Image,
    PartNumber,
    QtyAvailable,
    UnitPrice,
    MinQty,
    Packaging,
    Vendor,
    MfgPartNumber,
    Description,
    Series,
}

/// A typed value decoded from one table cell.
#[derive(Debug, Clone, PartialEq)]
pub struct Attribute {
    /// The column heading under which this attribute was found.
    pub title: String,
    pub kind: Option<AttrKind>,
    pub value: AttrValue,
}

#[derive(Debug, Clone, PartialEq)]
pub enum AttrValue {
    /// Placeholder for the compare-checkbox column; nothing to extract.
    None,
    Text(String),
    /// Datasheet link; `None` when the cell has no datasheet anchor.
    Link(Option<String>),
    /// Zoom image URL; `None` for the "no photo" placeholder.
    Image(Option<String>),
    PartNumber {
        link: String,
        number: String,
        compliance_marker: Option<String>,
    },
    Quantity {
        count: u64,
        availability: Option<String>,
    },
    MinQty {
        quantity: u64,
        /// Marks non-standard stock lots; informational only.
        stock_qualifier: Option<String>,
    },
    Price {
        currency: String,
        value: f64,
    },
}

/// Decode one cell under its column heading. Pure in the markup: the same
/// cell decodes to the same attribute every time.
pub fn decode(title: &str, cell: ElementRef<'_>, locale: &Locale) -> ScrapeResult<Attribute> {
    let (kind, value) = match CellMarker::of(cell) {
        CellMarker::Compare => (None, AttrValue::None),
        CellMarker::Datasheet => (Some(AttrKind::Datasheet), decode_datasheet(cell)),
        CellMarker::Image => (Some(AttrKind::Image), decode_image(cell, title)?),
        CellMarker::PartNumber => (Some(AttrKind::PartNumber), decode_part_number(cell, title)?),
        CellMarker::QtyAvailable => (
            Some(AttrKind::QtyAvailable),
            decode_quantity(cell, title, locale)?,
        ),
        CellMarker::MinQty => (Some(AttrKind::MinQty), decode_min_qty(cell, title, locale)?),
        CellMarker::UnitPrice => (Some(AttrKind::UnitPrice), decode_price(cell, title, locale)?),
        CellMarker::Packaging => (Some(AttrKind::Packaging), decode_packaging(cell, title)?),
        CellMarker::Vendor => (Some(AttrKind::Vendor), text_value(cell)),
        CellMarker::MfgPartNumber => (Some(AttrKind::MfgPartNumber), text_value(cell)),
        CellMarker::Description => (Some(AttrKind::Description), text_value(cell)),
        CellMarker::Series => (Some(AttrKind::Series), text_value(cell)),
        CellMarker::Other => (None, text_value(cell)),
    };
    Ok(Attribute {
        title: title.to_string(),
        kind,
        value,
    })
}

fn text_value(cell: ElementRef<'_>) -> AttrValue {
    AttrValue::Text(own_text(cell, true).trim().to_string())
}

fn decode_datasheet(cell: ElementRef<'_>) -> AttrValue {
    let link = find_in(cell, "a", |e| e.classes().any(|c| c == "lnkDatasheet"))
        .and_then(|a| a.value().attr("href"))
        .map(|href| href.trim().to_string());
    AttrValue::Link(link)
}

fn decode_image(cell: ElementRef<'_>, column: &str) -> ScrapeResult<AttrValue> {
    let img = find_in(cell, "img", |_| true).ok_or_else(|| ScrapeError::cell("img", column))?;
    let src = img.value().attr("src").unwrap_or("");
    if src.contains("NoPhoto") {
        return Ok(AttrValue::Image(None));
    }
    Ok(AttrValue::Image(
        img.value().attr("zoomimg").map(str::to_string),
    ))
}

fn decode_part_number(cell: ElementRef<'_>, column: &str) -> ScrapeResult<AttrValue> {
    let anchor = direct_children(cell, "a")
        .into_iter()
        .next()
        .ok_or_else(|| ScrapeError::cell("part number anchor", column))?;
    let link = anchor
        .value()
        .attr("href")
        .ok_or_else(|| ScrapeError::cell("part number href", column))?
        .trim()
        .to_string();
    let number = own_text(anchor, true).trim().to_string();
    let compliance_marker = find_in(cell, "img", |e| {
        e.attr("alt").is_some_and(|alt| !alt.trim().is_empty())
    })
    .and_then(|img| img.value().attr("alt"))
    .map(|alt| alt.trim().to_string());
    Ok(AttrValue::PartNumber {
        link,
        number,
        compliance_marker,
    })
}

/// Quantity cells render twice, once for desktop and once for mobile; only
/// the desktop span carries the canonical string.
fn desktop_text(cell: ElementRef<'_>, column: &str) -> ScrapeResult<String> {
    let span = find_in(cell, "span", |e| e.classes().any(|c| c == "desktop"))
        .ok_or_else(|| ScrapeError::cell("span.desktop", column))?;
    Ok(own_text(span, true).trim().to_string())
}

fn decode_quantity(cell: ElementRef<'_>, column: &str, locale: &Locale) -> ScrapeResult<AttrValue> {
    let text = desktop_text(cell, column)?;
    let (count_text, availability) = match text.split_once('-') {
        Some((count, phrase)) => {
            let phrase = phrase.trim();
            (
                count.trim(),
                (!phrase.is_empty()).then(|| phrase.to_string()),
            )
        }
        None => (text.as_str(), None),
    };
    Ok(AttrValue::Quantity {
        count: locale.parse_uint(count_text)?,
        availability,
    })
}

fn decode_min_qty(cell: ElementRef<'_>, column: &str, locale: &Locale) -> ScrapeResult<AttrValue> {
    let text = desktop_text(cell, column)?;
    let mut parts = text.splitn(2, char::is_whitespace);
    let quantity = locale.parse_uint(parts.next().unwrap_or(&text))?;
    let stock_qualifier = parts
        .next()
        .map(|rest| rest.trim().to_string())
        .filter(|rest| !rest.is_empty());
    Ok(AttrValue::MinQty {
        quantity,
        stock_qualifier,
    })
}

fn decode_price(cell: ElementRef<'_>, column: &str, locale: &Locale) -> ScrapeResult<AttrValue> {
    let span = find_in(cell, "span", |_| true)
        .ok_or_else(|| ScrapeError::cell("price span", column))?;
    // the leading text node only; nested sub-elements carry mobile duplicates
    let text =
        first_text(span).ok_or_else(|| ScrapeError::cell("price text", column))?;
    let caps = PRICE_RE
        .captures(&text)
        .ok_or_else(|| ScrapeError::cell("currency-prefixed price", column))?;
    Ok(AttrValue::Price {
        currency: caps[1].trim().to_string(),
        value: locale.parse_f64(&caps[2])?,
    })
}

fn decode_packaging(cell: ElementRef<'_>, column: &str) -> ScrapeResult<AttrValue> {
    let text = first_text(cell).ok_or_else(|| ScrapeError::cell("packaging text", column))?;
    Ok(AttrValue::Text(text))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Document;

    fn decode_td(markup: &str, locale: &Locale) -> ScrapeResult<Attribute> {
        let doc = Document::parse(&format!("<table><tr>{markup}</tr></table>"));
        let cell = doc.select("td").unwrap()[0];
        decode("Column", cell, locale)
    }

    fn en() -> Locale {
        Locale::default()
    }

    #[test]
    fn compare_cell_has_no_value_and_no_kind() {
        let attr = decode_td(
            "<td class='tr-compareParts'><input type='checkbox'></td>",
            &en(),
        )
        .unwrap();
        assert_eq!(attr.kind, None);
        assert_eq!(attr.value, AttrValue::None);
    }

    #[test]
    fn datasheet_link_is_trimmed_and_optional() {
        let attr = decode_td(
            "<td class='tr-datasheet'><a class='lnkDatasheet' href=' http://ds/x.pdf '>pdf</a></td>",
            &en(),
        )
        .unwrap();
        assert_eq!(attr.value, AttrValue::Link(Some("http://ds/x.pdf".into())));

        let absent = decode_td("<td class='tr-datasheet'></td>", &en()).unwrap();
        assert_eq!(absent.value, AttrValue::Link(None));
    }

    #[test]
    fn image_skips_the_no_photo_placeholder() {
        let attr = decode_td(
            "<td class='tr-image'><img src='/p/NoPhoto.jpg' zoomimg='/p/big.jpg'></td>",
            &en(),
        )
        .unwrap();
        assert_eq!(attr.value, AttrValue::Image(None));

        let real = decode_td(
            "<td class='tr-image'><img src='/p/1.jpg' zoomimg='/p/1-big.jpg'></td>",
            &en(),
        )
        .unwrap();
        assert_eq!(real.value, AttrValue::Image(Some("/p/1-big.jpg".into())));

        assert!(decode_td("<td class='tr-image'></td>", &en()).is_err());
    }

    #[test]
    fn part_number_extracts_link_number_and_marker() {
        let attr = decode_td(
            "<td class='tr-dkPartNumber'>\
             <a href='/product-detail/1'> DK-0001-ND </a>\
             <img src='/i/rohs.png' alt='RoHS Compliant'>\
             </td>",
            &en(),
        )
        .unwrap();
        assert_eq!(
            attr.value,
            AttrValue::PartNumber {
                link: "/product-detail/1".into(),
                number: "DK-0001-ND".into(),
                compliance_marker: Some("RoHS Compliant".into()),
            }
        );

        assert!(decode_td("<td class='tr-dkPartNumber'>no anchor</td>", &en()).is_err());
    }

    #[test]
    fn quantity_available_splits_count_from_phrase() {
        let attr = decode_td(
            "<td class='tr-qtyAvailable'>\
             <span class='desktop'>1,234 - Immediate</span>\
             <span class='mobile'>1234</span>\
             </td>",
            &en(),
        )
        .unwrap();
        assert_eq!(
            attr.value,
            AttrValue::Quantity {
                count: 1234,
                availability: Some("Immediate".into()),
            }
        );

        let bare = decode_td(
            "<td class='tr-qtyAvailable'><span class='desktop'>42</span></td>",
            &en(),
        )
        .unwrap();
        assert_eq!(
            bare.value,
            AttrValue::Quantity {
                count: 42,
                availability: None,
            }
        );
    }

    #[test]
    fn min_qty_splits_quantity_from_stock_qualifier() {
        let attr = decode_td(
            "<td class='tr-minQty'>\
             <span class='desktop'>25 Non-Stock</span>\
             <span class='mobile'>25</span>\
             </td>",
            &en(),
        )
        .unwrap();
        assert_eq!(
            attr.value,
            AttrValue::MinQty {
                quantity: 25,
                stock_qualifier: Some("Non-Stock".into()),
            }
        );

        let plain = decode_td(
            "<td class='tr-minQty'><span class='desktop'>1</span></td>",
            &en(),
        )
        .unwrap();
        assert_eq!(
            plain.value,
            AttrValue::MinQty {
                quantity: 1,
                stock_qualifier: None,
            }
        );
    }

    #[test]
    fn price_splits_currency_and_parses_by_locale() {
        let de = Locale::new("DE", "de");
        let attr = decode_td(
            "<td class='tr-unitPrice'><span>$ 1.234,56<span class='mobile'>x</span></span></td>",
            &de,
        )
        .unwrap();
        assert_eq!(
            attr.value,
            AttrValue::Price {
                currency: "$".into(),
                value: 1234.56,
            }
        );

        let en_attr = decode_td(
            "<td class='tr-unitPrice'><span>0.10</span></td>",
            &en(),
        );
        // a price without a currency prefix violates the expected structure
        assert!(en_attr.is_err());
    }

    #[test]
    fn packaging_takes_the_leading_text_node() {
        let attr = decode_td(
            "<td class='tr-packaging'>Tape &amp; Reel<span>(TR)</span></td>",
            &en(),
        )
        .unwrap();
        assert_eq!(attr.value, AttrValue::Text("Tape & Reel".into()));
    }

    #[test]
    fn unknown_marker_falls_back_to_trimmed_text() {
        let attr = decode_td("<td class='tr-somethingNew'>  raw text  </td>", &en()).unwrap();
        assert_eq!(attr.kind, None);
        assert_eq!(attr.value, AttrValue::Text("raw text".into()));
    }

    #[test]
    fn named_text_columns_carry_their_kind() {
        let attr = decode_td("<td class='tr-vendor'> Acme Corp </td>", &en()).unwrap();
        assert_eq!(attr.kind, Some(AttrKind::Vendor));
        assert_eq!(attr.value, AttrValue::Text("Acme Corp".into()));
    }

    #[test]
    fn decoding_is_idempotent() {
        let doc = Document::parse(
            "<table><tr><td class='tr-qtyAvailable'>\
             <span class='desktop'>10 - In Stock</span></td></tr></table>",
        );
        let cell = doc.select("td").unwrap()[0];
        let first = decode("Qty", cell, &en()).unwrap();
        let second = decode("Qty", cell, &en()).unwrap();
        assert_eq!(first, second);
    }
}
