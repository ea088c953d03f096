//! Immutable part records assembled from decoded row attributes.

use std::collections::HashMap;

use scraper::ElementRef;

use crate::attr::{AttrKind, AttrValue, Attribute, decode};
use crate::error::{ScrapeError, ScrapeResult};
use crate::locale::Locale;

/// One result row: the decoded attributes in column order, plus a kind index
/// for O(1) lookup. Attributes without a kind stay in the sequence but out
/// of the index. Never mutated after construction.
#[derive(Debug, Clone, PartialEq)]
pub struct Part {
    attrs: Vec<Attribute>,
    index: HashMap<AttrKind, usize>,
}

impl Part {
    pub fn new(attrs: Vec<Attribute>) -> Self {
        let index = attrs
            .iter()
            .enumerate()
            .filter_map(|(i, attr)| attr.kind.map(|kind| (kind, i)))
            .collect();
        Self { attrs, index }
    }

    /// All attributes, in the original column order.
    pub fn attrs(&self) -> &[Attribute] {
        &self.attrs
    }

    /// Look an attribute up by kind. Absence is an error, not a null.
    pub fn get(&self, kind: AttrKind) -> ScrapeResult<&Attribute> {
        self.index
            .get(&kind)
            .map(|i| &self.attrs[*i])
            .ok_or(ScrapeError::MissingAttribute { kind })
    }

    fn text(&self, kind: AttrKind) -> ScrapeResult<&str> {
        match &self.get(kind)?.value {
            AttrValue::Text(s) => Ok(s),
            _ => Err(ScrapeError::MissingAttribute { kind }),
        }
    }

    pub fn vendor(&self) -> ScrapeResult<&str> {
        self.text(AttrKind::Vendor)
    }

    /// The distributor's own part number.
    pub fn dk_part_no(&self) -> ScrapeResult<&str> {
        match &self.get(AttrKind::PartNumber)?.value {
            AttrValue::PartNumber { number, .. } => Ok(number),
            _ => Err(ScrapeError::MissingAttribute {
                kind: AttrKind::PartNumber,
            }),
        }
    }

    pub fn mfg_part_no(&self) -> ScrapeResult<&str> {
        self.text(AttrKind::MfgPartNumber)
    }

    pub fn description(&self) -> ScrapeResult<&str> {
        self.text(AttrKind::Description)
    }

    /// `"{vendor} {mfg part no} - {description}"`, for status output.
    pub fn summary(&self) -> ScrapeResult<String> {
        Ok(format!(
            "{} {} - {}",
            self.vendor()?,
            self.mfg_part_no()?,
            self.description()?
        ))
    }
}

/// Decode one table row in column order. When a minimum-order-quantity cap
/// is set and a cell's minimum quantity exceeds it, the whole row is
/// discarded and later cells are not decoded. This models a
/// distributor-side lot-size inconsistency: such a part cannot actually be
/// ordered at the requested quantity.
pub fn assemble_row(
    heads: &[String],
    cells: &[ElementRef<'_>],
    locale: &Locale,
    min_qty_cap: Option<u64>,
) -> ScrapeResult<Option<Part>> {
    let mut attrs = Vec::with_capacity(cells.len());
    for (head, cell) in heads.iter().zip(cells) {
        let attr = decode(head, *cell, locale)?;
        if let Some(cap) = min_qty_cap {
            if let AttrValue::MinQty { quantity, .. } = attr.value {
                if quantity > cap {
                    return Ok(None);
                }
            }
        }
        attrs.push(attr);
    }
    Ok(Some(Part::new(attrs)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Document;

    fn attr(kind: Option<AttrKind>, title: &str, value: AttrValue) -> Attribute {
        Attribute {
            title: title.to_string(),
            kind,
            value,
        }
    }

    fn sample_part() -> Part {
        Part::new(vec![
            attr(None, "Compare", AttrValue::None),
            attr(
                Some(AttrKind::PartNumber),
                "DK Part #",
                AttrValue::PartNumber {
                    link: "/p/1".into(),
                    number: "DK-0001-ND".into(),
                    compliance_marker: None,
                },
            ),
            attr(
                Some(AttrKind::Vendor),
                "Manufacturer",
                AttrValue::Text("Acme".into()),
            ),
            attr(
                Some(AttrKind::MfgPartNumber),
                "Mfr Part #",
                AttrValue::Text("MFG-0001".into()),
            ),
            attr(
                Some(AttrKind::Description),
                "Description",
                AttrValue::Text("A fine resistor".into()),
            ),
        ])
    }

    #[test]
    fn accessors_read_through_the_kind_index() {
        let part = sample_part();
        assert_eq!(part.vendor().unwrap(), "Acme");
        assert_eq!(part.dk_part_no().unwrap(), "DK-0001-ND");
        assert_eq!(part.mfg_part_no().unwrap(), "MFG-0001");
        assert_eq!(part.summary().unwrap(), "Acme MFG-0001 - A fine resistor");
        // the compare placeholder stays in the sequence but out of the index
        assert_eq!(part.attrs().len(), 5);
    }

    #[test]
    fn missing_attribute_is_an_error_not_a_null() {
        let part = Part::new(vec![attr(
            Some(AttrKind::Description),
            "Description",
            AttrValue::Text("lonely".into()),
        )]);
        assert_eq!(
            part.vendor(),
            Err(ScrapeError::MissingAttribute {
                kind: AttrKind::Vendor
            })
        );
    }

    fn row_doc(min_qty: u64) -> Document {
        Document::parse(&format!(
            "<table><tbody><tr>\
             <td class='tr-vendor'>Acme</td>\
             <td class='tr-minQty'><span class='desktop'>{min_qty}</span></td>\
             <td class='tr-description'>Thing</td>\
             </tr></tbody></table>"
        ))
    }

    fn heads() -> Vec<String> {
        ["Manufacturer", "Minimum Quantity", "Description"]
            .iter()
            .map(|s| s.to_string())
            .collect()
    }

    #[test]
    fn row_above_the_quantity_cap_is_discarded() {
        let doc = row_doc(25);
        let cells = doc.select("td").unwrap();
        let locale = Locale::default();
        let part = assemble_row(&heads(), &cells, &locale, Some(10)).unwrap();
        assert!(part.is_none());
    }

    #[test]
    fn row_within_the_quantity_cap_is_kept() {
        let doc = row_doc(25);
        let cells = doc.select("td").unwrap();
        let locale = Locale::default();
        let part = assemble_row(&heads(), &cells, &locale, Some(30)).unwrap().unwrap();
        assert_eq!(part.vendor().unwrap(), "Acme");
        assert_eq!(part.description().unwrap(), "Thing");
    }

    #[test]
    fn no_cap_keeps_every_row() {
        let doc = row_doc(1_000_000);
        let cells = doc.select("td").unwrap();
        let locale = Locale::default();
        assert!(assemble_row(&heads(), &cells, &locale, None).unwrap().is_some());
    }
}
