//! Command handlers.

use std::path::PathBuf;

use anyhow::{Context, Result};

use settlement_expense::ExpenseSettings;
use settlement_infra::{JsonFileRecordStore, SettingsFile, StoreConfig};

use crate::Commands;

pub mod record;
pub mod settings;

/// Stores and settings resolved for one invocation.
pub struct App {
    pub config: StoreConfig,
    pub store: JsonFileRecordStore,
    pub settings_file: SettingsFile,
    pub settings: ExpenseSettings,
}

impl App {
    pub fn open(data_dir: Option<PathBuf>) -> Result<Self> {
        let config = match data_dir {
            Some(dir) => StoreConfig::new(dir),
            None => StoreConfig::from_env(),
        };
        let settings_file = SettingsFile::new(config.settings_path());
        let settings = settings_file
            .load()
            .with_context(|| format!("loading settings from {}", config.settings_path().display()))?;
        tracing::debug!(data_dir = %config.data_dir().display(), "data directory resolved");

        Ok(Self {
            store: JsonFileRecordStore::new(config.forms_path()),
            settings_file,
            settings,
            config,
        })
    }
}

pub fn run(app: &App, command: Commands) -> Result<()> {
    match command {
        Commands::New {
            owner,
            project,
            issued_by,
            issue_date,
            fund,
            receive_date,
            abroad,
            base_rate,
            third_currency,
            third_rate,
        } => record::create(
            app,
            record::NewRecord {
                owner,
                project,
                issued_by,
                issue_date,
                fund,
                receive_date,
                abroad,
                base_rate,
                third_currency,
                third_rate,
            },
        ),

        Commands::Edit {
            id,
            project,
            issued_by,
            issue_date,
            fund,
            receive_date,
            abroad,
            domestic,
        } => record::edit(
            app,
            &id,
            record::HeaderEdit {
                project,
                issued_by,
                issue_date,
                fund,
                receive_date,
                abroad,
                domestic,
            },
        ),

        Commands::SetRates {
            id,
            base_rate,
            third_currency,
            third_rate,
            clear_third,
        } => record::set_rates(
            app,
            &id,
            record::RatesEdit {
                base_rate,
                third_currency,
                third_rate,
                clear_third,
            },
        ),

        Commands::AddItem { id, item } => record::add_item(app, &id, item.to_line_item()),
        Commands::ReplaceItem { id, number, item } => {
            record::replace_item(app, &id, number, item.to_line_item())
        }
        Commands::RemoveItem { id, number } => record::remove_item(app, &id, number),

        Commands::List {
            project,
            from,
            to,
            status,
            include_deleted,
        } => {
            let mut filter = settlement_infra::RecordFilter::new().issued_between(from, to);
            if let Some(project) = project {
                filter = filter.project_name(project);
            }
            if let Some(status) = status {
                filter = filter.status(status.to_status());
            }
            if include_deleted {
                filter = filter.include_deleted();
            }
            record::list(app, &filter)
        }

        Commands::Show { id } => record::show(app, &id),
        Commands::Totals { id } => record::totals(app, &id),
        Commands::Preview { id, output } => record::preview(app, &id, output.as_deref()),
        Commands::Export { id, output } => record::export(app, &id, &output),
        Commands::Finalize { id } => record::finalize(app, &id),
        Commands::Reopen { id, by } => record::reopen(app, &id, &by),
        Commands::Delete { id, hard } => record::delete(app, &id, hard),
        Commands::Settings { action } => settings::handle(app, action),
        Commands::Countries => settings::countries(),
    }
}
