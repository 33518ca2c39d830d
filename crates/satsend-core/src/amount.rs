//! Display units and locale-aware amount conversion
//!
//! All arithmetic is exact: amounts are carried as satoshis and converted
//! through [`Decimal`] at the display boundary only.

use crate::{Error, Result};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use satsend_params::{COIN, MAX_MONEY};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;

/// Bitcoin display unit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum BitcoinUnit {
    /// 1 BTC = 100,000,000 sat
    #[default]
    #[serde(rename = "BTC")]
    Btc,
    /// 1 mBTC = 100,000 sat
    #[serde(rename = "mBTC")]
    MilliBtc,
    /// 1 bit = 100 sat
    #[serde(rename = "bits")]
    Bits,
}

impl BitcoinUnit {
    /// Number of fraction digits that map to whole satoshis
    pub const fn decimals(self) -> u32 {
        match self {
            BitcoinUnit::Btc => 8,
            BitcoinUnit::MilliBtc => 5,
            BitcoinUnit::Bits => 2,
        }
    }

    /// Satoshis per whole unit
    pub const fn satoshis_per_unit(self) -> u64 {
        match self {
            BitcoinUnit::Btc => COIN,
            BitcoinUnit::MilliBtc => 100_000,
            BitcoinUnit::Bits => 100,
        }
    }

    /// Label shown next to amounts
    pub const fn label(self) -> &'static str {
        match self {
            BitcoinUnit::Btc => "BTC",
            BitcoinUnit::MilliBtc => "mBTC",
            BitcoinUnit::Bits => "bits",
        }
    }
}

impl fmt::Display for BitcoinUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for BitcoinUnit {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "btc" => Ok(BitcoinUnit::Btc),
            "mbtc" => Ok(BitcoinUnit::MilliBtc),
            "bits" | "ubtc" => Ok(BitcoinUnit::Bits),
            other => Err(Error::Other(format!("Unknown bitcoin unit: {}", other))),
        }
    }
}

/// Formats and parses amounts for one display unit and decimal separator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonetaryFormatter {
    unit: BitcoinUnit,
    decimal_separator: char,
}

impl MonetaryFormatter {
    /// Create a formatter
    pub fn new(unit: BitcoinUnit, decimal_separator: char) -> Self {
        Self {
            unit,
            decimal_separator,
        }
    }

    /// Display unit
    pub fn unit(&self) -> BitcoinUnit {
        self.unit
    }

    /// Locale decimal separator
    pub fn decimal_separator(&self) -> char {
        self.decimal_separator
    }

    /// Format satoshis in the display unit, e.g. `100_000_000` -> `"1.0"` BTC.
    ///
    /// Always shows at least one fraction digit and never drops precision.
    pub fn display_amount(&self, satoshis: u64) -> String {
        let value =
            Decimal::from_i128_with_scale(i128::from(satoshis), self.unit.decimals()).normalize();
        let mut text = value.to_string();
        if !text.contains('.') {
            text.push_str(".0");
        }
        if self.decimal_separator != '.' {
            text = text.replace('.', &self.decimal_separator.to_string());
        }
        text
    }

    /// Format with the unit label appended
    pub fn display_with_unit(&self, satoshis: u64) -> String {
        format!("{} {}", self.display_amount(satoshis), self.unit.label())
    }

    /// Lenient text-to-satoshis conversion used for live input fields.
    ///
    /// Empty, unparsable or negative input yields zero. Digits beyond the
    /// unit's precision are truncated.
    pub fn satoshis_from_text(&self, text: &str) -> u64 {
        match self.parse_satoshis(text) {
            Ok(satoshis) => satoshis,
            Err(e) => {
                tracing::debug!("Treating amount {:?} as zero: {}", text, e);
                0
            }
        }
    }

    /// Strict text-to-satoshis conversion
    pub fn parse_satoshis(&self, text: &str) -> Result<u64> {
        let value = self.parse_decimal(text)?;
        if value.is_sign_negative() && !value.is_zero() {
            return Err(Error::InvalidAmount(format!("Negative amount: {}", text)));
        }
        scale_to_satoshis(value, self.unit)
    }

    /// Whether the entered amount exceeds the total bitcoin supply
    pub fn exceeds_max_amount(&self, text: &str) -> bool {
        match self.parse_decimal(text) {
            Ok(value) => {
                let sats = value
                    .checked_mul(Decimal::from(self.unit.satoshis_per_unit()))
                    .map(|d| d.trunc());
                match sats {
                    Some(sats) => sats > Decimal::from(MAX_MONEY),
                    None => true,
                }
            }
            Err(_) => false,
        }
    }

    /// Drop the last typed character when the fraction exceeds the unit's
    /// precision.
    pub fn truncate_input<'a>(&self, text: &'a str) -> Cow<'a, str> {
        truncate_fraction(text, self.decimal_separator, self.unit.decimals() as usize)
    }

    /// Drop the last typed character when a fiat amount has more than two
    /// fraction digits.
    pub fn truncate_fiat_input<'a>(&self, text: &'a str) -> Cow<'a, str> {
        truncate_fraction(text, self.decimal_separator, 2)
    }

    /// Fiat value of a satoshi amount, rounded half-up to cents.
    ///
    /// Yields zero when the product overflows.
    pub fn fiat_from_satoshis(&self, satoshis: u64, exchange_rate: Decimal) -> Decimal {
        let btc = Decimal::from_i128_with_scale(i128::from(satoshis), 8);
        let Some(fiat) = btc.checked_mul(exchange_rate) else {
            tracing::warn!("Fiat value of {} satoshis overflows at {}", satoshis, exchange_rate);
            return Decimal::new(0, 2);
        };
        let mut fiat = fiat.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
        fiat.rescale(2);
        fiat
    }

    /// Format a fiat value with the locale separator
    pub fn display_fiat(&self, fiat: Decimal) -> String {
        let mut fiat = fiat.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
        fiat.rescale(2);
        fiat.to_string()
            .replace('.', &self.decimal_separator.to_string())
    }

    /// Satoshis for a fiat amount typed by the user
    pub fn satoshis_from_fiat(&self, text: &str, exchange_rate: Decimal) -> u64 {
        if exchange_rate.is_zero() {
            return 0;
        }
        let fiat = match self.parse_decimal(text) {
            Ok(fiat) if !fiat.is_sign_negative() => fiat,
            _ => return 0,
        };
        fiat.checked_div(exchange_rate)
            .and_then(|btc| scale_to_satoshis(btc, BitcoinUnit::Btc).ok())
            .unwrap_or(0)
    }

    /// Convert a typed amount in this formatter's unit to fiat text
    pub fn fiat_text_from_amount_text(&self, text: &str, exchange_rate: Decimal) -> String {
        let satoshis = self.satoshis_from_text(text);
        self.display_fiat(self.fiat_from_satoshis(satoshis, exchange_rate))
    }

    /// Convert a typed fiat amount to text in this formatter's unit
    pub fn amount_text_from_fiat_text(&self, text: &str, exchange_rate: Decimal) -> String {
        self.display_amount(self.satoshis_from_fiat(text, exchange_rate))
    }

    fn parse_decimal(&self, text: &str) -> Result<Decimal> {
        let mut cleaned: String = text.trim().chars().filter(|c| !c.is_whitespace()).collect();
        if self.decimal_separator != '.' {
            cleaned = cleaned.replace(self.decimal_separator, ".");
        }
        parse_plain_decimal(&cleaned)
    }
}

impl Default for MonetaryFormatter {
    fn default() -> Self {
        Self::new(BitcoinUnit::Btc, '.')
    }
}

/// Parse a BTC decimal string (as used in BIP21 URIs) to satoshis
pub fn btc_to_satoshis(text: &str) -> Result<u64> {
    let value = parse_plain_decimal(text.trim())?;
    if value.is_sign_negative() && !value.is_zero() {
        return Err(Error::InvalidAmount(format!("Negative amount: {}", text)));
    }
    scale_to_satoshis(value, BitcoinUnit::Btc)
}

fn parse_plain_decimal(text: &str) -> Result<Decimal> {
    if text.is_empty() {
        return Err(Error::InvalidAmount("Empty amount".to_string()));
    }
    let mut normalized = Cow::Borrowed(text);
    if normalized.starts_with('.') {
        normalized = Cow::Owned(format!("0{}", normalized));
    }
    if normalized.ends_with('.') {
        normalized = Cow::Owned(normalized.trim_end_matches('.').to_string());
    }
    Decimal::from_str(&normalized)
        .map_err(|e| Error::InvalidAmount(format!("{:?}: {}", text, e)))
}

fn scale_to_satoshis(value: Decimal, unit: BitcoinUnit) -> Result<u64> {
    let scaled = value
        .checked_mul(Decimal::from(unit.satoshis_per_unit()))
        .ok_or_else(|| Error::AmountOverflow(value.to_string()))?
        .trunc();
    scaled
        .to_u64()
        .ok_or_else(|| Error::AmountOverflow(value.to_string()))
}

fn truncate_fraction(text: &str, separator: char, max_fraction: usize) -> Cow<'_, str> {
    match text.find(separator) {
        Some(pos) => {
            let fraction = &text[pos + separator.len_utf8()..];
            if fraction.chars().count() > max_fraction {
                let mut truncated = text.to_string();
                truncated.pop();
                Cow::Owned(truncated)
            } else {
                Cow::Borrowed(text)
            }
        }
        None => Cow::Borrowed(text),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    #[test]
    fn test_display_amount_btc() {
        let fmt = MonetaryFormatter::default();
        assert_eq!(fmt.display_amount(100_000_000), "1.0");
        assert_eq!(fmt.display_amount(12_345), "0.00012345");
        assert_eq!(fmt.display_amount(0), "0.0");
        assert_eq!(fmt.display_amount(150_000_000), "1.5");
    }

    #[test]
    fn test_display_amount_units() {
        let mbtc = MonetaryFormatter::new(BitcoinUnit::MilliBtc, '.');
        assert_eq!(mbtc.display_amount(100_000), "1.0");
        assert_eq!(mbtc.display_amount(1), "0.00001");

        let bits = MonetaryFormatter::new(BitcoinUnit::Bits, ',');
        assert_eq!(bits.display_amount(150), "1,5");
        assert_eq!(bits.display_with_unit(100), "1,0 bits");
    }

    #[test]
    fn test_satoshis_from_text_locale() {
        let fmt = MonetaryFormatter::new(BitcoinUnit::Btc, ',');
        assert_eq!(fmt.satoshis_from_text("0,5"), 50_000_000);
        assert_eq!(fmt.satoshis_from_text(" 1 ,25 "), 125_000_000);
        assert_eq!(fmt.satoshis_from_text(""), 0);
        assert_eq!(fmt.satoshis_from_text("abc"), 0);
        assert_eq!(fmt.satoshis_from_text("-1"), 0);
    }

    #[test]
    fn test_satoshis_from_text_truncates_sub_satoshi() {
        let fmt = MonetaryFormatter::default();
        assert_eq!(fmt.satoshis_from_text("0.000000019"), 1);

        let bits = MonetaryFormatter::new(BitcoinUnit::Bits, '.');
        assert_eq!(bits.satoshis_from_text("1.239"), 123);
    }

    #[test]
    fn test_partial_input() {
        let fmt = MonetaryFormatter::default();
        assert_eq!(fmt.satoshis_from_text(".5"), 50_000_000);
        assert_eq!(fmt.satoshis_from_text("2."), 200_000_000);
    }

    #[test]
    fn test_exceeds_max_amount() {
        let fmt = MonetaryFormatter::default();
        assert!(!fmt.exceeds_max_amount("21000000"));
        assert!(fmt.exceeds_max_amount("21000000.00000001"));
        assert!(!fmt.exceeds_max_amount("not a number"));

        let bits = MonetaryFormatter::new(BitcoinUnit::Bits, '.');
        assert!(bits.exceeds_max_amount("21000000000001"));
    }

    #[test]
    fn test_truncate_input() {
        let bits = MonetaryFormatter::new(BitcoinUnit::Bits, '.');
        assert_eq!(bits.truncate_input("1.234"), "1.23");
        assert_eq!(bits.truncate_input("1.23"), "1.23");
        assert_eq!(bits.truncate_input("123"), "123");

        let fmt = MonetaryFormatter::new(BitcoinUnit::Btc, ',');
        assert_eq!(fmt.truncate_fiat_input("12,345"), "12,34");
        assert_eq!(fmt.truncate_fiat_input("12,34"), "12,34");
    }

    #[test]
    fn test_fiat_conversion() {
        let fmt = MonetaryFormatter::default();
        let rate = Decimal::new(2_000_000, 2); // 20,000.00 per BTC
        assert_eq!(fmt.fiat_from_satoshis(50_000_000, rate), Decimal::new(1_000_000, 2));
        assert_eq!(fmt.display_fiat(fmt.fiat_from_satoshis(12_345, rate)), "2.47");
        assert_eq!(fmt.satoshis_from_fiat("10000", rate), 50_000_000);
        assert_eq!(fmt.satoshis_from_fiat("10", Decimal::ZERO), 0);
        assert_eq!(fmt.fiat_text_from_amount_text("0.5", rate), "10000.00");
        assert_eq!(fmt.amount_text_from_fiat_text("20000", rate), "1.0");
    }

    #[test]
    fn test_fiat_overflow_is_zero() {
        let fmt = MonetaryFormatter::default();
        let fiat = fmt.fiat_from_satoshis(u64::MAX, Decimal::MAX);
        assert!(fiat.is_zero());
        assert_eq!(fmt.display_fiat(fiat), "0.00");
    }

    #[test]
    fn test_btc_to_satoshis() {
        assert_eq!(btc_to_satoshis("0.001").unwrap(), 100_000);
        assert_eq!(btc_to_satoshis("20.3").unwrap(), 2_030_000_000);
        assert!(btc_to_satoshis("-1").is_err());
        assert!(btc_to_satoshis("x").is_err());
    }

    #[test]
    fn test_unit_parse() {
        assert_eq!("mBTC".parse::<BitcoinUnit>().unwrap(), BitcoinUnit::MilliBtc);
        assert_eq!("bits".parse::<BitcoinUnit>().unwrap(), BitcoinUnit::Bits);
        assert!("sat".parse::<BitcoinUnit>().is_err());
    }
}
