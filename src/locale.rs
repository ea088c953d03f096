//! Locale configuration and locale-aware numeric parsing.
//!
//! The site renders numbers, labels, and currency in the configured
//! language, so numeric extraction has to respect the locale's decimal and
//! grouping conventions.

use serde::{Deserialize, Serialize};

use crate::error::{ScrapeError, ScrapeResult};

/// Languages that write decimals with a comma and group with a period.
const COMMA_DECIMAL_LANGS: &[&str] = &[
    "cs", "da", "de", "el", "es", "fi", "fr", "hu", "it", "nl", "no", "pl", "pt", "ro", "ru", "sv",
    "tr",
];

/// Country, language, and currency settings for a scraping session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Locale {
    /// Two-letter ISO 3166-1 alpha-2 country code.
    pub country: String,
    /// Two-letter ISO 639-1 language code.
    pub short_lang: String,
    /// RFC 5646 language tag, `{short_lang}-{country}` unless overridden.
    pub long_lang: String,
    /// Top-level domain suffix; `com` for the US, the country code otherwise.
    pub tld: String,
    /// ISO 4217 currency code; guessed as `{country}D` unless overridden.
    pub currency: String,
}

impl Locale {
    pub fn new(country: &str, short_lang: &str) -> Self {
        Self::with_overrides(country, short_lang, None, None, None)
    }

    pub fn with_overrides(
        country: &str,
        short_lang: &str,
        long_lang: Option<&str>,
        tld: Option<&str>,
        currency: Option<&str>,
    ) -> Self {
        let long_lang = long_lang
            .map(str::to_string)
            .unwrap_or_else(|| format!("{short_lang}-{country}"));
        let tld = tld.map(str::to_string).unwrap_or_else(|| {
            if country == "US" {
                "com".to_string()
            } else {
                country.to_lowercase()
            }
        });
        let currency = currency
            .map(str::to_string)
            .unwrap_or_else(|| format!("{country}D"));
        Self {
            country: country.to_string(),
            short_lang: short_lang.to_string(),
            long_lang,
            tld,
            currency,
        }
    }

    pub fn base_url(&self) -> String {
        format!("https://www.digikey.{}", self.tld)
    }

    fn comma_decimal(&self) -> bool {
        COMMA_DECIMAL_LANGS.contains(&self.short_lang.as_str())
    }

    pub fn decimal_sep(&self) -> char {
        if self.comma_decimal() { ',' } else { '.' }
    }

    pub fn group_sep(&self) -> char {
        if self.comma_decimal() { '.' } else { ',' }
    }

    /// Parse an unsigned integer, tolerating grouping separators and spaces.
    pub fn parse_uint(&self, text: &str) -> ScrapeResult<u64> {
        let group = self.group_sep();
        let cleaned: String = text
            .trim()
            .chars()
            .filter(|c| *c != group && !c.is_whitespace())
            .collect();
        cleaned.parse().map_err(|_| ScrapeError::number(text))
    }

    /// Parse a float written with this locale's separators.
    pub fn parse_f64(&self, text: &str) -> ScrapeResult<f64> {
        let (group, decimal) = (self.group_sep(), self.decimal_sep());
        let cleaned: String = text
            .trim()
            .chars()
            .filter(|c| *c != group && !c.is_whitespace())
            .map(|c| if c == decimal { '.' } else { c })
            .collect();
        cleaned.parse().map_err(|_| ScrapeError::number(text))
    }
}

impl Default for Locale {
    fn default() -> Self {
        Self::new("US", "en")
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[test]
    fn defaults_for_us_english() {
        let locale = Locale::default();
        assert_eq!(locale.long_lang, "en-US");
        assert_eq!(locale.tld, "com");
        assert_eq!(locale.currency, "USD");
        assert_eq!(locale.base_url(), "https://www.digikey.com");
    }

    #[test]
    fn defaults_for_germany() {
        let locale = Locale::new("DE", "de");
        assert_eq!(locale.long_lang, "de-DE");
        assert_eq!(locale.tld, "de");
        assert_eq!(locale.currency, "DED");
        assert_eq!(locale.decimal_sep(), ',');
    }

    #[test]
    fn overrides_win() {
        let locale = Locale::with_overrides("DE", "de", None, None, Some("EUR"));
        assert_eq!(locale.currency, "EUR");
    }

    #[rstest]
    #[case::en_grouped(Locale::default(), "1,234", 1234)]
    #[case::en_padded(Locale::default(), " 17 ", 17)]
    #[case::de_grouped(Locale::new("DE", "de"), "1.234", 1234)]
    fn uint_parsing_respects_grouping(
        #[case] locale: Locale,
        #[case] text: &str,
        #[case] expected: u64,
    ) {
        assert_eq!(locale.parse_uint(text).unwrap(), expected);
    }

    #[test]
    fn non_numbers_are_rejected() {
        assert!(Locale::default().parse_uint("lots").is_err());
        assert!(Locale::default().parse_f64("free").is_err());
    }

    #[rstest]
    #[case::en(Locale::default(), "1,234.56")]
    #[case::de(Locale::new("DE", "de"), "1.234,56")]
    fn float_parsing_respects_decimal_separator(#[case] locale: Locale, #[case] text: &str) {
        assert_eq!(locale.parse_f64(text).unwrap(), 1234.56);
    }
}
