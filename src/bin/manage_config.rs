use clap::{Parser, Subcommand};
use dotenvy::dotenv;
use onlyoffice_bridge::config::{ConfigStore, EnvValue, ProcessEnv, defaults};
use serde_json::Value;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(author, version, about = "Inspect and edit the bridge configuration file")]
struct Cli {
    /// Path to the JSON configuration file
    #[arg(short, long, default_value = "config.json", global = true)]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the configuration with the secret masked
    Show,
    /// Set a dotted key, e.g. `set server.port 9000`
    Set { key: String, value: String },
    /// Check the file, required keys and the upload directory
    Validate,
    /// Back up the current file and write the defaults
    Reset {
        /// Skip the confirmation prompt
        #[arg(long)]
        yes: bool,
    },
}

fn main() -> anyhow::Result<()> {
    dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "manage_config=info,onlyoffice_bridge=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    let ok = match cli.command {
        Command::Show => show(&cli.config)?,
        Command::Set { key, value } => set(&cli.config, &key, &value),
        Command::Validate => validate(&cli.config),
        Command::Reset { yes } => reset(&cli.config, yes)?,
    };

    if !ok {
        std::process::exit(1);
    }
    Ok(())
}

fn mask_secret(tree: &mut Value) {
    if let Some(secret) = tree.pointer_mut("/onlyoffice/secret") {
        if secret.as_str().is_some_and(|s| !s.is_empty()) {
            *secret = Value::String("********".to_string());
        }
    }
}

fn show(path: &Path) -> anyhow::Result<bool> {
    let store = ConfigStore::load(path);
    let mut tree = store.tree().clone();
    mask_secret(&mut tree);
    println!("{}", serde_json::to_string_pretty(&tree)?);
    Ok(true)
}

fn set(path: &Path, key: &str, raw: &str) -> bool {
    let mut store = ConfigStore::load(path);
    let value = EnvValue::parse(raw).into_json();
    info!("✏️  {} = {}", key, value);
    store.set(key, value);
    store.save()
}

fn validate(path: &Path) -> bool {
    let mut ok = true;

    match std::fs::read_to_string(path) {
        Ok(text) => {
            if let Err(e) = serde_json::from_str::<Value>(&text) {
                error!("❌ {} is not valid JSON: {}", path.display(), e);
                ok = false;
            }
        }
        Err(e) => {
            error!("❌ Cannot read {}: {}", path.display(), e);
            ok = false;
        }
    }

    let store = ConfigStore::load(path);
    let missing = store.missing_required_keys();
    if !missing.is_empty() {
        error!("❌ Missing required keys: {}", missing.join(", "));
        ok = false;
    }

    let upload_dir = store.upload_directory();
    if let Err(e) = std::fs::create_dir_all(&upload_dir) {
        error!(
            "❌ Upload directory {} is unusable: {}",
            upload_dir.display(),
            e
        );
        ok = false;
    }

    if store.jwt_enabled() && store.onlyoffice_secret() == defaults::ONLYOFFICE_SECRET {
        warn!("⚠️  onlyoffice.secret is still the built-in default");
    }

    if ok {
        info!("✅ Configuration is valid");
    }
    ok
}

fn confirm(prompt: &str) -> io::Result<bool> {
    print!("{} [y/N] ", prompt);
    io::stdout().flush()?;
    let mut answer = String::new();
    io::stdin().lock().read_line(&mut answer)?;
    Ok(matches!(answer.trim().to_lowercase().as_str(), "y" | "yes"))
}

fn backup_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".backup");
    PathBuf::from(name)
}

fn reset(path: &Path, yes: bool) -> anyhow::Result<bool> {
    if !yes && !confirm(&format!("Reset {} to defaults?", path.display()))? {
        info!("Reset cancelled");
        return Ok(true);
    }

    if path.exists() {
        let backup = backup_path(path);
        std::fs::copy(path, &backup)?;
        info!("💾 Backed up to {}", backup.display());
    }

    let store = ConfigStore::from_tree(path, defaults::default_tree(), Arc::new(ProcessEnv));
    Ok(store.save())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_mask_secret() {
        let mut tree = json!({"onlyoffice": {"secret": "s3cr3t", "server_url": "http://ds"}});
        mask_secret(&mut tree);
        assert_eq!(tree["onlyoffice"]["secret"], "********");
        assert_eq!(tree["onlyoffice"]["server_url"], "http://ds");

        let mut empty = json!({"onlyoffice": {"secret": ""}});
        mask_secret(&mut empty);
        assert_eq!(empty["onlyoffice"]["secret"], "");
    }

    #[test]
    fn test_backup_path() {
        assert_eq!(
            backup_path(Path::new("conf/config.json")),
            PathBuf::from("conf/config.json.backup")
        );
    }

    #[test]
    fn test_reset_writes_defaults_and_backup() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"server": {"port": 1}}"#).unwrap();

        assert!(reset(&path, true).unwrap());

        let backup = std::fs::read_to_string(backup_path(&path)).unwrap();
        assert!(backup.contains("\"port\": 1"));
        let written: Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(written, defaults::default_tree());
    }
}
