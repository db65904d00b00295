use std::path::PathBuf;

use anyhow::{bail, Context};
use colored::Colorize;
use serde::Serialize;
use stockroom_engine::stores::LEDGER_JOURNAL;
use stockroom_engine::{Dashboard, KeyHistory, Stores};
use stockroom_server::{NewUser, ServerConfig, StockroomServer, UserDirectory};
use stockroom_store::{JournaledLedgerStore, LedgerStore, SyncMode};
use stockroom_types::{LogDetails, LogEntry, Role};

use crate::cli::*;

pub async fn run_command(cli: Cli) -> anyhow::Result<()> {
    let config = ServerConfig::load(cli.config.as_deref()).context("loading configuration")?;
    let format = cli.format;
    match cli.command {
        Command::Serve(args) => cmd_serve(config, args).await,
        Command::CreateUser(args) => cmd_create_user(&config, args, format),
        Command::Dashboard(args) => cmd_dashboard(&config, args, format).await,
        Command::Logs(args) => cmd_logs(&config, args, format).await,
        Command::History(args) => cmd_history(&config, args, format).await,
        Command::Compact(args) => cmd_compact(&config, args, format).await,
        Command::Config => cmd_config(&config),
    }
}

async fn cmd_serve(mut config: ServerConfig, args: ServeArgs) -> anyhow::Result<()> {
    if let Some(bind) = args.bind {
        config.bind_addr = bind;
    }
    if args.data_dir.is_some() {
        config.data_dir = args.data_dir;
    }
    config.debug |= args.debug;

    let server = StockroomServer::build(config).context("starting server")?;
    println!(
        "{} Stockroom listening on {}",
        "✓".green().bold(),
        server.config().bind_addr.to_string().bold()
    );
    server.serve().await?;
    Ok(())
}

/// `--data-dir` wins over the configured directory; offline commands need one.
fn data_dir(config: &ServerConfig, args: &DataArgs) -> anyhow::Result<PathBuf> {
    match args.data_dir.clone().or_else(|| config.data_dir.clone()) {
        Some(dir) => Ok(dir),
        None => bail!("no data directory: pass --data-dir or set data_dir in the configuration"),
    }
}

fn open_stores(config: &ServerConfig, args: &DataArgs) -> anyhow::Result<Stores> {
    let dir = data_dir(config, args)?;
    Stores::open(&dir, SyncMode::EveryWrite).with_context(|| format!("opening {}", dir.display()))
}

fn cmd_create_user(config: &ServerConfig, args: CreateUserArgs, format: OutputFormat) -> anyhow::Result<()> {
    let role: Role = args.role.parse()?;
    let dir = data_dir(config, &args.data)?;
    std::fs::create_dir_all(&dir).with_context(|| format!("creating {}", dir.display()))?;

    let users = UserDirectory::open(&dir.join(stockroom_server::server::USERS_JOURNAL), SyncMode::EveryWrite)?;
    let record = users.create(&NewUser::new(&args.username, &args.password, role))?;
    match format {
        OutputFormat::Json => print_json(&serde_json::json!({ "username": record.username, "role": record.role })),
        OutputFormat::Text => {
            println!("{} Created {} user {}", "✓".green().bold(), record.role, record.username.bold());
            Ok(())
        }
    }
}

async fn cmd_dashboard(config: &ServerConfig, args: DataArgs, format: OutputFormat) -> anyhow::Result<()> {
    let dashboard = open_stores(config, &args)?.queries().dashboard().await?;
    match format {
        OutputFormat::Json => print_json(&dashboard),
        OutputFormat::Text => {
            print_dashboard(&dashboard);
            Ok(())
        }
    }
}

fn print_dashboard(dashboard: &Dashboard) {
    println!("Items:       {}", dashboard.total_items.to_string().bold());
    println!("Total value: {}", dashboard.total_value.to_string().bold());
    if dashboard.recent_activities.is_empty() {
        println!("\nNo recent activity.");
        return;
    }
    println!("\nRecent activity:");
    for entry in &dashboard.recent_activities {
        println!("  {}", describe(entry));
    }
}

async fn cmd_logs(config: &ServerConfig, args: LogsArgs, format: OutputFormat) -> anyhow::Result<()> {
    let mut entries = open_stores(config, &args.data)?.queries().all_logs().await?;
    entries.reverse();
    entries.truncate(args.limit);
    match format {
        OutputFormat::Json => print_json(&entries),
        OutputFormat::Text => {
            if entries.is_empty() {
                println!("Audit log is empty.");
            }
            for entry in &entries {
                println!("{}", describe(entry));
            }
            Ok(())
        }
    }
}

async fn cmd_history(config: &ServerConfig, args: HistoryArgs, format: OutputFormat) -> anyhow::Result<()> {
    let history = open_stores(config, &args.data)?
        .queries()
        .history(&args.name, &args.company)
        .await?;
    match format {
        OutputFormat::Json => print_json(&history),
        OutputFormat::Text => {
            print_history(&history);
            Ok(())
        }
    }
}

fn print_history(history: &KeyHistory) {
    println!("{} from {}", history.name.bold(), history.company.bold());
    match &history.current {
        Some(record) => println!(
            "  In stock: {} at {} ({})",
            record.quantity.to_string().green(),
            record.unit_price,
            if record.is_low_stock() { "low".red() } else { "ok".green() }
        ),
        None => println!("  {}", "No current record".yellow()),
    }
    let a = &history.activity;
    println!(
        "  Added {} · sold {} · returned {} · deleted {} across {} events",
        a.added, a.sold, a.returned, a.deleted, a.events
    );
    for entry in &history.entries {
        println!("  {}", describe(entry));
    }
}

/// Meant to run while the server is stopped.
async fn cmd_compact(config: &ServerConfig, args: DataArgs, format: OutputFormat) -> anyhow::Result<()> {
    let path = data_dir(config, &args)?.join(LEDGER_JOURNAL);
    if !path.exists() {
        bail!("no ledger journal at {}", path.display());
    }
    let before = std::fs::metadata(&path)?.len();
    let store = JournaledLedgerStore::open(&path, SyncMode::EveryWrite)
        .with_context(|| format!("opening {}", path.display()))?;
    store.compact()?;
    let records = store.count().await?;
    let after = std::fs::metadata(&path)?.len();

    match format {
        OutputFormat::Json => print_json(&serde_json::json!({
            "records": records,
            "bytes_before": before,
            "bytes_after": after,
        })),
        OutputFormat::Text => {
            println!(
                "{} Compacted ledger journal: {} records, {} -> {} bytes",
                "✓".green().bold(),
                records.to_string().bold(),
                before,
                after
            );
            Ok(())
        }
    }
}

fn cmd_config(config: &ServerConfig) -> anyhow::Result<()> {
    let mut shown = config.clone();
    if let Some(admin) = shown.bootstrap_admin.as_mut() {
        admin.password = "<redacted>".into();
    }
    if shown.signing_key_hex.is_some() {
        shown.signing_key_hex = Some("<redacted>".into());
    }
    print!("{}", shown.to_toml()?);
    Ok(())
}

fn print_json(value: &impl Serialize) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// One-line rendering of an audit entry.
pub(crate) fn describe(entry: &LogEntry) -> String {
    let when = entry.timestamp.format("%Y-%m-%d %H:%M:%S").to_string().dimmed();
    let who = entry.performed_by.as_deref().unwrap_or("-");
    let what = match &entry.details {
        LogDetails::AddInventory { quantity_added, unit_price, .. } => {
            format!("{} {quantity_added} @ {unit_price}", "add".green())
        }
        LogDetails::Sell { quantity_sold, buyer, date_alloted, .. } => {
            let verb = if date_alloted.is_some() { "allot" } else { "sell" };
            format!("{} {quantity_sold} to {}", verb.yellow(), buyer.as_deref().unwrap_or("-"))
        }
        LogDetails::Return { quantity, buyer, .. } => {
            format!("{} {quantity} from {}", "return".cyan(), buyer.as_deref().unwrap_or("-"))
        }
        LogDetails::Delete { quantity_deleted } => format!("{} ({quantity_deleted} on hand)", "delete".red()),
    };
    format!("{when} {} from {} {what} by {who}", entry.item_name, entry.company)
}

#[cfg(test)]
mod tests {
    use stockroom_types::{Actor, StockKey};

    use super::*;

    #[test]
    fn data_dir_prefers_flag() {
        let config = ServerConfig {
            data_dir: Some("/from/config".into()),
            ..ServerConfig::default()
        };
        let flag = DataArgs { data_dir: Some("/from/flag".into()) };
        assert_eq!(data_dir(&config, &flag).unwrap(), PathBuf::from("/from/flag"));
        assert_eq!(data_dir(&config, &DataArgs::default()).unwrap(), PathBuf::from("/from/config"));
        assert!(data_dir(&ServerConfig::default(), &DataArgs::default()).is_err());
    }

    #[tokio::test]
    async fn compact_needs_an_existing_journal() {
        let dir = tempfile::tempdir().unwrap();
        let args = DataArgs { data_dir: Some(dir.path().to_path_buf()) };
        assert!(cmd_compact(&ServerConfig::default(), args, OutputFormat::Text).await.is_err());
    }

    #[test]
    fn describe_mentions_key_and_actor() {
        colored::control::set_override(false);
        let key = StockKey::new("bolt", "acme").unwrap();
        let entry = LogEntry::new(
            &key,
            LogDetails::Delete { quantity_deleted: 4 },
            chrono::DateTime::UNIX_EPOCH,
            Some("alice".into()),
        );
        assert_eq!(describe(&entry), "1970-01-01 00:00:00 bolt from acme delete (4 on hand) by alice");
    }

    #[tokio::test]
    async fn offline_commands_read_journals() {
        let dir = tempfile::tempdir().unwrap();
        let stores = Stores::open(dir.path(), SyncMode::EveryWrite).unwrap();
        stores
            .engine()
            .add(
                &Actor::user("alice"),
                &stockroom_engine::NewStock::new("bolt", "acme", stockroom_types::Decimal::ONE, 3, "2024-06-01"),
            )
            .await
            .unwrap();
        drop(stores);

        let config = ServerConfig::default();
        let args = DataArgs { data_dir: Some(dir.path().to_path_buf()) };
        cmd_dashboard(&config, args.clone(), OutputFormat::Json).await.unwrap();
        cmd_logs(&config, LogsArgs { limit: 5, data: args.clone() }, OutputFormat::Text).await.unwrap();

        cmd_compact(&config, args.clone(), OutputFormat::Text).await.unwrap();
        let reopened = Stores::open(dir.path(), SyncMode::EveryWrite).unwrap();
        let dashboard = reopened.queries().dashboard().await.unwrap();
        assert_eq!(dashboard.total_items, 1);
        assert_eq!(dashboard.recent_activities.len(), 1);
        drop(reopened);

        let created = cmd_create_user(
            &config,
            CreateUserArgs {
                username: "carol".into(),
                password: "Car0lPass".into(),
                role: "admin".into(),
                data: args,
            },
            OutputFormat::Text,
        );
        assert!(created.is_ok());
    }
}
