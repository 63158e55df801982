//! Settings commands

use anyhow::Result;

use settlement_expense::{Country, ExpenseSettings};

use super::App;
use crate::SettingsAction;

pub fn handle(app: &App, action: SettingsAction) -> Result<()> {
    if let SettingsAction::Show = action {
        println!("{}", serde_json::to_string_pretty(&app.settings)?);
        return Ok(());
    }

    let mut settings = app.settings.clone();
    apply(&mut settings, action)?;
    app.settings_file.save(&settings)?;
    println!("settings saved to {}", app.settings_file.path().display());
    Ok(())
}

fn apply(settings: &mut ExpenseSettings, action: SettingsAction) -> Result<()> {
    match action {
        SettingsAction::Show => {}
        SettingsAction::AddCategory { name } => settings.add_category(name)?,
        SettingsAction::RemoveCategory { name } => settings.remove_category(&name)?,
        SettingsAction::AddCurrency { code } => {
            if !settings.currencies_mut().add(code.clone()) {
                anyhow::bail!("{code} is already in the catalog");
            }
        }
        SettingsAction::RemoveCurrency { code } => settings.currencies_mut().remove(&code)?,
    }
    Ok(())
}

pub fn countries() -> Result<()> {
    for country in Country::all() {
        println!("{}\t{}", country.name, country.currency.unwrap_or("-"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn currency_edits_respect_the_catalog_rules() {
        let mut settings = ExpenseSettings::default();
        apply(&mut settings, SettingsAction::AddCurrency { code: "MOP".parse().unwrap() }).unwrap();
        assert!(apply(&mut settings, SettingsAction::AddCurrency { code: "MOP".parse().unwrap() }).is_err());
        assert!(apply(&mut settings, SettingsAction::RemoveCurrency { code: "USD".parse().unwrap() }).is_err());
        apply(&mut settings, SettingsAction::RemoveCategory { name: "Tools".to_string() }).unwrap();
        assert!(!settings.has_category("Tools"));
    }
}
