use std::net::SocketAddr;
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(name = "stockroom", about = "Stockroom: multi-tenant inventory service", version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,

    /// TOML configuration file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Command {
    /// Start the HTTP server
    Serve(ServeArgs),
    /// Register a user account in the data directory
    CreateUser(CreateUserArgs),
    /// Show stock totals and recent activity
    Dashboard(DataArgs),
    /// Show audit log entries, newest first
    Logs(LogsArgs),
    /// Show the current record and full history of one item
    History(HistoryArgs),
    /// Rewrite the ledger journal as one entry per live record
    Compact(DataArgs),
    /// Print the effective configuration
    Config,
}

/// Where offline commands find the journals.
#[derive(Args, Clone, Debug, Default)]
pub struct DataArgs {
    #[arg(long)]
    pub data_dir: Option<PathBuf>,
}

#[derive(Args)]
pub struct ServeArgs {
    #[arg(long)]
    pub bind: Option<SocketAddr>,
    #[arg(long)]
    pub data_dir: Option<PathBuf>,
    /// Expose failure detail in 500 responses
    #[arg(long)]
    pub debug: bool,
}

#[derive(Args)]
pub struct CreateUserArgs {
    pub username: String,
    #[arg(long)]
    pub password: String,
    #[arg(long, default_value = "user")]
    pub role: String,
    #[command(flatten)]
    pub data: DataArgs,
}

#[derive(Args)]
pub struct LogsArgs {
    #[arg(short = 'n', long, default_value = "20")]
    pub limit: usize,
    #[command(flatten)]
    pub data: DataArgs,
}

#[derive(Args)]
pub struct HistoryArgs {
    pub name: String,
    pub company: String,
    #[command(flatten)]
    pub data: DataArgs,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_serve() {
        let cli = Cli::try_parse_from(["stockroom", "serve", "--bind", "0.0.0.0:8080", "--debug"]).unwrap();
        if let Command::Serve(args) = cli.command {
            assert_eq!(args.bind, Some("0.0.0.0:8080".parse().unwrap()));
            assert!(args.debug);
            assert!(args.data_dir.is_none());
        } else {
            panic!("wrong command");
        }
    }

    #[test]
    fn parse_create_user() {
        let cli = Cli::try_parse_from([
            "stockroom",
            "create-user",
            "alice",
            "--password",
            "Secr3tPass",
            "--role",
            "admin",
            "--data-dir",
            "/srv/stock",
        ])
        .unwrap();
        if let Command::CreateUser(args) = cli.command {
            assert_eq!(args.username, "alice");
            assert_eq!(args.role, "admin");
            assert_eq!(args.data.data_dir, Some(PathBuf::from("/srv/stock")));
        } else {
            panic!("wrong command");
        }
    }

    #[test]
    fn parse_logs_limit() {
        let cli = Cli::try_parse_from(["stockroom", "logs", "-n", "5"]).unwrap();
        if let Command::Logs(args) = cli.command {
            assert_eq!(args.limit, 5);
        } else {
            panic!("wrong command");
        }
    }

    #[test]
    fn parse_history() {
        let cli = Cli::try_parse_from(["stockroom", "history", "bolt", "acme"]).unwrap();
        assert!(matches!(cli.command, Command::History(_)));
    }

    #[test]
    fn parse_global_flags() {
        let cli = Cli::try_parse_from(["stockroom", "--format", "json", "-c", "stock.toml", "--verbose", "config"]).unwrap();
        assert!(cli.verbose);
        assert_eq!(cli.format, OutputFormat::Json);
        assert_eq!(cli.config, Some(PathBuf::from("stock.toml")));
        assert!(matches!(cli.command, Command::Config));
    }

    #[test]
    fn parse_compact() {
        let cli = Cli::try_parse_from(["stockroom", "compact", "--data-dir", "/srv/stock"]).unwrap();
        if let Command::Compact(args) = cli.command {
            assert_eq!(args.data_dir, Some(PathBuf::from("/srv/stock")));
        } else {
            panic!("wrong command");
        }
    }

    #[test]
    fn create_user_requires_password() {
        assert!(Cli::try_parse_from(["stockroom", "create-user", "alice"]).is_err());
    }
}
