//! Currency codes, the configurable currency catalog and two-hop conversion.
//!
//! All arithmetic is done on `Decimal`. Amounts are rounded to the reporting
//! currency's two decimal places only at the output, so the intermediate USD
//! value of a third-currency conversion keeps full precision.

use core::str::FromStr;

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use settlement_core::{DomainError, DomainResult};

/// Decimal places of the reporting currency.
pub const REPORTING_DECIMAL_PLACES: u32 = 2;

/// ISO 4217 style currency code (three uppercase ASCII letters).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CurrencyCode(String);

impl CurrencyCode {
    /// The pegged intermediate currency of every conversion chain.
    pub fn usd() -> Self {
        Self("USD".to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_usd(&self) -> bool {
        self.0 == "USD"
    }

    /// Human-readable name, when known.
    pub fn name(&self) -> Option<&'static str> {
        CURRENCY_NAMES
            .iter()
            .find(|(code, _)| *code == self.0)
            .map(|(_, name)| *name)
    }
}

impl core::fmt::Display for CurrencyCode {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for CurrencyCode {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let code = s.trim().to_ascii_uppercase();
        if code.len() != 3 || !code.chars().all(|c| c.is_ascii_uppercase()) {
            return Err(DomainError::validation(
                "currency",
                format!("'{s}' is not a three-letter currency code"),
            ));
        }
        Ok(Self(code))
    }
}

impl TryFrom<String> for CurrencyCode {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<CurrencyCode> for String {
    fn from(value: CurrencyCode) -> Self {
        value.0
    }
}

/// Externally editable set of currencies the engine accepts.
///
/// USD and the reporting currency are always members.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "CatalogDocument")]
pub struct CurrencyCatalog {
    reporting: CurrencyCode,
    codes: Vec<CurrencyCode>,
}

#[derive(Deserialize)]
struct CatalogDocument {
    reporting: CurrencyCode,
    #[serde(default)]
    codes: Vec<CurrencyCode>,
}

impl From<CatalogDocument> for CurrencyCatalog {
    fn from(doc: CatalogDocument) -> Self {
        Self::new(doc.reporting, doc.codes)
    }
}

impl CurrencyCatalog {
    pub fn new(reporting: CurrencyCode, codes: impl IntoIterator<Item = CurrencyCode>) -> Self {
        let mut catalog = Self {
            reporting,
            codes: Vec::new(),
        };
        for code in codes {
            catalog.add(code);
        }
        catalog.add(CurrencyCode::usd());
        catalog.add(catalog.reporting.clone());
        catalog
    }

    pub fn reporting(&self) -> &CurrencyCode {
        &self.reporting
    }

    pub fn codes(&self) -> &[CurrencyCode] {
        &self.codes
    }

    pub fn contains(&self, code: &CurrencyCode) -> bool {
        self.codes.contains(code)
    }

    /// Add a code, keeping the list sorted. Returns `false` if it was already present.
    pub fn add(&mut self, code: CurrencyCode) -> bool {
        match self.codes.binary_search(&code) {
            Ok(_) => false,
            Err(pos) => {
                self.codes.insert(pos, code);
                true
            }
        }
    }

    /// Remove a code. USD and the reporting currency cannot be removed.
    pub fn remove(&mut self, code: &CurrencyCode) -> DomainResult<()> {
        if code.is_usd() || *code == self.reporting {
            return Err(DomainError::invariant(format!(
                "{code} is required by the conversion chain and cannot be removed"
            )));
        }
        let pos = self
            .codes
            .iter()
            .position(|c| c == code)
            .ok_or_else(|| DomainError::not_found(format!("currency {code}")))?;
        self.codes.remove(pos);
        Ok(())
    }
}

impl Default for CurrencyCatalog {
    fn default() -> Self {
        let codes = CURRENCY_NAMES
            .iter()
            .filter_map(|(code, _)| code.parse::<CurrencyCode>().ok());
        Self::new(CurrencyCode("THB".to_string()), codes)
    }
}

/// Rates captured on a record.
///
/// `base_rate` is reporting-currency units per USD (e.g. THB/USD);
/// `third_currency_rate` is third-currency units per USD (e.g. VND/USD).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExchangeRates {
    #[serde(default)]
    pub base_rate: Option<Decimal>,
    #[serde(default)]
    pub third_currency: Option<CurrencyCode>,
    #[serde(default)]
    pub third_currency_rate: Option<Decimal>,
}

impl ExchangeRates {
    pub fn new(base_rate: Decimal) -> Self {
        Self {
            base_rate: Some(base_rate),
            ..Self::default()
        }
    }

    pub fn with_third_currency(mut self, currency: CurrencyCode, rate: Decimal) -> Self {
        self.third_currency = Some(currency);
        self.third_currency_rate = Some(rate);
        self
    }
}

/// Converts amounts into the reporting currency using a record's rates.
#[derive(Debug, Clone, Copy)]
pub struct Converter<'a> {
    rates: &'a ExchangeRates,
    reporting: &'a CurrencyCode,
}

impl<'a> Converter<'a> {
    pub fn new(rates: &'a ExchangeRates, reporting: &'a CurrencyCode) -> Self {
        Self { rates, reporting }
    }

    /// Unrounded amount in the reporting currency.
    ///
    /// - reporting currency: identity
    /// - USD: `amount * baseRate`
    /// - third currency: `(amount / thirdCurrencyRate) * baseRate`; there is no
    ///   captured market cross-rate, so the chain always goes through USD
    pub fn convert_exact(&self, amount: Decimal, from: &CurrencyCode) -> DomainResult<Decimal> {
        if from == self.reporting {
            return Ok(amount);
        }

        if from.is_usd() {
            let base = positive_rate(self.rates.base_rate, "baseRate")?;
            return amount
                .checked_mul(base)
                .ok_or_else(|| DomainError::invariant("currency conversion overflow"));
        }

        if self.rates.third_currency.as_ref() == Some(from) {
            let third = positive_rate(self.rates.third_currency_rate, "thirdCurrencyRate")?;
            let base = positive_rate(self.rates.base_rate, "baseRate")?;
            let usd = amount
                .checked_div(third)
                .ok_or_else(|| DomainError::invariant("currency conversion overflow"))?;
            return usd
                .checked_mul(base)
                .ok_or_else(|| DomainError::invariant("currency conversion overflow"));
        }

        Err(DomainError::unsupported_currency("currency", from.as_str()))
    }

    /// Amount in the reporting currency, rounded to its decimal places.
    pub fn convert(&self, amount: Decimal, from: &CurrencyCode) -> DomainResult<Decimal> {
        self.convert_exact(amount, from).map(round_reporting)
    }
}

fn positive_rate(rate: Option<Decimal>, field: &str) -> DomainResult<Decimal> {
    match rate {
        Some(r) if r > Decimal::ZERO => Ok(r),
        _ => Err(DomainError::missing_rate(field)),
    }
}

/// Round to the reporting currency's decimal places (banker's rounding).
pub fn round_reporting(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(REPORTING_DECIMAL_PLACES, RoundingStrategy::MidpointNearestEven)
}

/// A country a record can be filed against when working abroad.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Country {
    pub name: &'static str,
    /// Local currency, or `None` where no standard currency is usable.
    pub currency: Option<&'static str>,
}

impl Country {
    /// Look a country up by exact name.
    pub fn find(name: &str) -> Option<Country> {
        COUNTRIES.iter().copied().find(|c| c.name == name)
    }

    /// All known countries, sorted by name.
    pub fn all() -> &'static [Country] {
        COUNTRIES
    }

    /// The local currency as a code, when it has one.
    pub fn currency_code(&self) -> Option<CurrencyCode> {
        self.currency.and_then(|c| c.parse().ok())
    }
}

const fn country(name: &'static str, currency: Option<&'static str>) -> Country {
    Country { name, currency }
}

static COUNTRIES: &[Country] = &[
    country("Afghanistan", None),
    country("Argentina", Some("ARS")),
    country("Australia", Some("AUD")),
    country("Austria", Some("EUR")),
    country("Bangladesh", Some("BDT")),
    country("Belgium", Some("EUR")),
    country("Brazil", Some("BRL")),
    country("Brunei", Some("BND")),
    country("Cambodia", Some("KHR")),
    country("Canada", Some("CAD")),
    country("China", Some("CNY")),
    country("Cuba", None),
    country("Cyprus", Some("EUR")),
    country("Ecuador", Some("USD")),
    country("Egypt", Some("EGP")),
    country("El Salvador", Some("USD")),
    country("Estonia", Some("EUR")),
    country("Finland", Some("EUR")),
    country("France", Some("EUR")),
    country("Germany", Some("EUR")),
    country("Greece", Some("EUR")),
    country("Hong Kong", Some("HKD")),
    country("India", Some("INR")),
    country("Indonesia", Some("IDR")),
    country("Iran", Some("IRR")),
    country("Ireland", Some("EUR")),
    country("Israel", Some("ILS")),
    country("Italy", Some("EUR")),
    country("Japan", Some("JPY")),
    country("Laos", Some("LAK")),
    country("Latvia", Some("EUR")),
    country("Lithuania", Some("EUR")),
    country("Luxembourg", Some("EUR")),
    country("Malaysia", Some("MYR")),
    country("Malta", Some("EUR")),
    country("Mexico", Some("MXN")),
    country("Myanmar", Some("MMK")),
    country("Nepal", Some("NPR")),
    country("Netherlands", Some("EUR")),
    country("New Zealand", Some("NZD")),
    country("Nigeria", Some("NGN")),
    country("North Korea", None),
    country("Norway", Some("NOK")),
    country("Pakistan", Some("PKR")),
    country("Panama", Some("USD")),
    country("Philippines", Some("PHP")),
    country("Poland", Some("PLN")),
    country("Portugal", Some("EUR")),
    country("Russia", Some("RUB")),
    country("Saudi Arabia", Some("SAR")),
    country("Singapore", Some("SGD")),
    country("Slovakia", Some("EUR")),
    country("Slovenia", Some("EUR")),
    country("Somalia", None),
    country("South Africa", Some("ZAR")),
    country("South Korea", Some("KRW")),
    country("Spain", Some("EUR")),
    country("Sri Lanka", Some("LKR")),
    country("Sweden", Some("SEK")),
    country("Switzerland", Some("CHF")),
    country("Syria", None),
    country("Taiwan", Some("TWD")),
    country("Thailand", Some("THB")),
    country("Turkey", Some("TRY")),
    country("Ukraine", Some("UAH")),
    country("United Arab Emirates", Some("AED")),
    country("United Kingdom", Some("GBP")),
    country("United States", Some("USD")),
    country("Venezuela", None),
    country("Vietnam", Some("VND")),
    country("Zimbabwe", Some("USD")),
];

static CURRENCY_NAMES: &[(&str, &str)] = &[
    ("AED", "UAE Dirham"),
    ("ARS", "Argentine Peso"),
    ("AUD", "Australian Dollar"),
    ("BDT", "Bangladeshi Taka"),
    ("BND", "Brunei Dollar"),
    ("BRL", "Brazilian Real"),
    ("CAD", "Canadian Dollar"),
    ("CHF", "Swiss Franc"),
    ("CNY", "Chinese Yuan"),
    ("EGP", "Egyptian Pound"),
    ("EUR", "Euro"),
    ("GBP", "British Pound"),
    ("HKD", "Hong Kong Dollar"),
    ("IDR", "Indonesian Rupiah"),
    ("ILS", "Israeli New Shekel"),
    ("INR", "Indian Rupee"),
    ("IRR", "Iranian Rial"),
    ("JPY", "Japanese Yen"),
    ("KHR", "Cambodian Riel"),
    ("KRW", "South Korean Won"),
    ("LAK", "Lao Kip"),
    ("LKR", "Sri Lankan Rupee"),
    ("MMK", "Myanmar Kyat"),
    ("MXN", "Mexican Peso"),
    ("MYR", "Malaysian Ringgit"),
    ("NGN", "Nigerian Naira"),
    ("NOK", "Norwegian Krone"),
    ("NPR", "Nepalese Rupee"),
    ("NZD", "New Zealand Dollar"),
    ("PHP", "Philippine Peso"),
    ("PKR", "Pakistani Rupee"),
    ("PLN", "Polish Złoty"),
    ("RUB", "Russian Ruble"),
    ("SAR", "Saudi Riyal"),
    ("SEK", "Swedish Krona"),
    ("SGD", "Singapore Dollar"),
    ("THB", "Thai Baht"),
    ("TRY", "Turkish Lira"),
    ("TWD", "Taiwan Dollar"),
    ("UAH", "Ukrainian Hryvnia"),
    ("USD", "US Dollar"),
    ("VND", "Vietnamese Dong"),
    ("ZAR", "South African Rand"),
];
