use clap::Subcommand;
use restcycle_core::{PrefStore, Preferences};

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Get a preference value
    Get {
        /// Preference key (e.g. "reminder_interval_minutes")
        key: String,
    },
    /// Set a preference value
    Set {
        /// Preference key
        key: String,
        /// New value
        value: String,
    },
    /// List all preferences
    List,
    /// Reset preferences to defaults
    Reset,
}

pub fn run(action: ConfigAction) -> Result<(), Box<dyn std::error::Error>> {
    let store = PrefStore::open_default()?;
    match action {
        ConfigAction::Get { key } => match store.snapshot().get(&key) {
            Some(value) => println!("{value}"),
            None => {
                eprintln!("unknown key: {key}");
                std::process::exit(1);
            }
        },
        ConfigAction::Set { key, value } => {
            store.set(&key, &value)?;
            println!("ok");
        }
        ConfigAction::List => {
            let json = serde_json::to_string_pretty(&store.snapshot())?;
            println!("{json}");
        }
        ConfigAction::Reset => {
            store.update(|p| *p = Preferences::default());
            println!("preferences reset to defaults");
        }
    }
    Ok(())
}
