use serde::{Deserialize, Serialize};

use settlement_core::{DomainError, DomainResult};

use crate::currency::{CurrencyCatalog, CurrencyCode};

pub const DEFAULT_CATEGORIES: &[&str] = &[
    "Fuel",
    "Hotel",
    "Meals",
    "Taxi",
    "Transport",
    "Materials",
    "Tools",
    "Office",
    "Communication",
    "Entertainment",
    "Other",
];

/// Categories and currencies a record is validated against.
///
/// Both lists are data, loaded from a settings document by the host and
/// injected into the calculator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpenseSettings {
    #[serde(default = "default_categories")]
    categories: Vec<String>,
    #[serde(default)]
    currencies: CurrencyCatalog,
}

fn default_categories() -> Vec<String> {
    DEFAULT_CATEGORIES.iter().map(|c| c.to_string()).collect()
}

impl Default for ExpenseSettings {
    fn default() -> Self {
        Self {
            categories: default_categories(),
            currencies: CurrencyCatalog::default(),
        }
    }
}

impl ExpenseSettings {
    pub fn new(categories: Vec<String>, currencies: CurrencyCatalog) -> Self {
        Self {
            categories,
            currencies,
        }
    }

    pub fn categories(&self) -> &[String] {
        &self.categories
    }

    pub fn currencies(&self) -> &CurrencyCatalog {
        &self.currencies
    }

    pub fn currencies_mut(&mut self) -> &mut CurrencyCatalog {
        &mut self.currencies
    }

    pub fn reporting_currency(&self) -> &CurrencyCode {
        self.currencies.reporting()
    }

    pub fn has_category(&self, category: &str) -> bool {
        self.categories.iter().any(|c| c == category)
    }

    pub fn add_category(&mut self, category: impl Into<String>) -> DomainResult<()> {
        let category = category.into().trim().to_string();
        if category.is_empty() {
            return Err(DomainError::validation("category", "is required"));
        }
        if self.has_category(&category) {
            return Err(DomainError::validation(
                "category",
                format!("'{category}' already exists"),
            ));
        }
        self.categories.push(category);
        Ok(())
    }

    pub fn remove_category(&mut self, category: &str) -> DomainResult<()> {
        let pos = self
            .categories
            .iter()
            .position(|c| c == category)
            .ok_or_else(|| DomainError::not_found(format!("category '{category}'")))?;
        self.categories.remove(pos);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_carry_the_standard_categories() {
        let settings = ExpenseSettings::default();
        assert_eq!(settings.categories().len(), DEFAULT_CATEGORIES.len());
        assert!(settings.has_category("Fuel"));
        assert!(!settings.has_category("fuel"));
        assert_eq!(settings.reporting_currency().as_str(), "THB");
    }

    #[test]
    fn categories_can_be_edited() {
        let mut settings = ExpenseSettings::default();
        settings.add_category("  Visa fees ").unwrap();
        assert!(settings.has_category("Visa fees"));

        assert!(matches!(
            settings.add_category("Fuel"),
            Err(DomainError::Validation(_))
        ));
        assert!(matches!(
            settings.add_category("   "),
            Err(DomainError::Validation(_))
        ));

        settings.remove_category("Fuel").unwrap();
        assert!(!settings.has_category("Fuel"));
        assert!(matches!(
            settings.remove_category("Fuel"),
            Err(DomainError::NotFound(_))
        ));
    }

    #[test]
    fn partial_document_falls_back_to_defaults() {
        let settings: ExpenseSettings =
            serde_json::from_str(r#"{"categories":["Fuel","Hotel"]}"#).unwrap();
        assert_eq!(settings.categories(), ["Fuel", "Hotel"]);
        assert_eq!(settings.currencies(), &CurrencyCatalog::default());

        let settings: ExpenseSettings =
            serde_json::from_str(r#"{"currencies":{"reporting":"USD","codes":["EUR"]}}"#).unwrap();
        assert!(settings.has_category("Other"));
        assert_eq!(settings.reporting_currency().as_str(), "USD");
    }
}
