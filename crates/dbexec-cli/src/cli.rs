//! dbexec command-line interface
//!
//! Runs folders of `GO`-delimited SQL scripts against a database, takes
//! server-side backups, and writes one log file per run.
//!
//! Usage:
//!   dbexec [--config FILE] [--log-dir DIR] [--quiet] <COMMAND> [connection args]
//!
//! Commands:
//!   ping                     Check the connection settings
//!   run <query-dir>          Execute every .sql file below query-dir
//!   backup <backup-dir>      Take a full backup of the database
//!   split <file>             Print the statements of one script
//!
//! Exit codes: 0 on success, 1 when the operation fails, 2 on a
//! configuration error.

mod commands;
mod config;
mod logging;

use anyhow::Result;
use clap::{Parser, Subcommand};
use config::{ConnectionArgs, ConnectionSettings, Profile, require_dir};
use dbexec_core::DbExecError;
use logging::LoggingConfig;
use std::io::{BufRead, Write};
use std::path::PathBuf;
use std::process::ExitCode;

const EXIT_FAILURE: u8 = 1;
const EXIT_CONFIG: u8 = 2;

#[derive(Parser, Debug)]
#[command(name = "dbexec", version, about = "Run SQL script folders and database backups")]
struct Cli {
    /// Profile file with connection and path defaults
    #[arg(long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    /// Directory for run logs
    #[arg(long, value_name = "DIR", global = true)]
    log_dir: Option<PathBuf>,

    /// Do not mirror log events to the terminal
    #[arg(long, short, global = true)]
    quiet: bool,

    #[command(flatten)]
    connection: ConnectionArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Connect, run a trivial statement and disconnect
    Ping,

    /// Execute every .sql file below a folder, stopping at the first error
    Run {
        /// Root folder of the scripts (falls back to the profile's query_dir)
        query_dir: Option<PathBuf>,

        /// Discover and split scripts without executing them
        #[arg(long)]
        dry_run: bool,
    },

    /// Take a full server-side backup of the database
    Backup {
        /// Folder the server writes the backup to (falls back to the profile's backup_dir)
        backup_dir: Option<PathBuf>,

        /// Skip the confirmation prompt
        #[arg(long, short)]
        yes: bool,
    },

    /// Print the statements a script splits into
    Split {
        file: PathBuf,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("Error: failed to start runtime: {}", e);
            return ExitCode::from(EXIT_FAILURE);
        }
    };

    match runtime.block_on(run_cli(cli)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::from(exit_code(&e))
        }
    }
}

async fn run_cli(cli: Cli) -> Result<()> {
    if let Commands::Split { file } = &cli.command {
        return print_statements(file);
    }

    let profile = match &cli.config {
        Some(path) => Profile::load(path)?,
        None => Profile::load_default()?,
    };

    let log_dir = cli
        .log_dir
        .clone()
        .or_else(|| profile.paths.log_dir.clone())
        .unwrap_or_else(logging::log_directory);
    let log = logging::init(
        LoggingConfig::default()
            .with_log_dir(log_dir)
            .with_console(!cli.quiet),
    );
    if let Some(e) = log.error() {
        eprintln!("Warning: {}; continuing without a log file", e);
    }
    if profile.ignored_password {
        tracing::warn!("password in profile ignored; use --password or DBEXEC_PASSWORD");
    }

    let settings = ConnectionSettings::resolve(&cli.connection, &profile.connection);
    tracing::debug!(?settings, "resolved connection settings");

    let result = execute(cli.command, &settings, &profile).await;

    if let Some(path) = log.path() {
        println!("Log file: {}", path.display());
    }
    result
}

async fn execute(command: Commands, settings: &ConnectionSettings, profile: &Profile) -> Result<()> {
    match command {
        Commands::Ping => {
            commands::ping(settings).await?;
            println!("Connection successful");
        }
        Commands::Run { query_dir, dry_run } => {
            let query_dir =
                require_dir(query_dir, profile.paths.query_dir.as_ref(), "query folder")?;
            let report = commands::run(settings, &query_dir, dry_run).await?;
            if report.dry_run {
                println!(
                    "Dry run: {} statements in {} files would be executed",
                    report.statement_count(),
                    report.file_count()
                );
            } else {
                println!(
                    "Executed all queries: {} statements in {} files ({} rows affected)",
                    report.statement_count(),
                    report.file_count(),
                    report.total_affected_rows()
                );
            }
        }
        Commands::Backup { backup_dir, yes } => {
            let backup_dir =
                require_dir(backup_dir, profile.paths.backup_dir.as_ref(), "backup folder")?;
            if !yes && !confirm("Do you want to take Backup? [y/N] ")? {
                tracing::info!("Backup declined by operator");
                println!("Backup skipped");
                return Ok(());
            }
            let report = commands::backup(settings, &backup_dir).await?;
            println!("Backup completed: {}", report.location().display());
        }
        Commands::Split { file } => print_statements(&file)?,
    }
    Ok(())
}

fn print_statements(file: &std::path::Path) -> Result<()> {
    let statements = commands::split(file)?;
    for statement in &statements {
        println!("-- statement {}", statement.ordinal);
        println!("{}", statement.sql);
    }
    eprintln!("{} statements", statements.len());
    Ok(())
}

fn confirm(prompt: &str) -> Result<bool> {
    print!("{}", prompt);
    std::io::stdout().flush()?;

    let mut answer = String::new();
    std::io::stdin().lock().read_line(&mut answer)?;
    Ok(is_affirmative(&answer))
}

fn is_affirmative(answer: &str) -> bool {
    matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}

fn exit_code(err: &anyhow::Error) -> u8 {
    match err.downcast_ref::<DbExecError>() {
        Some(e) if e.is_configuration() => EXIT_CONFIG,
        _ => EXIT_FAILURE,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_definition_is_valid() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_run_with_connection_args() {
        let cli = Cli::try_parse_from([
            "dbexec",
            "--host",
            "db.internal",
            "run",
            "/srv/migrations",
            "--dry-run",
            "--user",
            "deploy",
        ])
        .unwrap();

        assert_eq!(cli.connection.host.as_deref(), Some("db.internal"));
        assert_eq!(cli.connection.user.as_deref(), Some("deploy"));
        match cli.command {
            Commands::Run { query_dir, dry_run } => {
                assert_eq!(query_dir, Some(PathBuf::from("/srv/migrations")));
                assert!(dry_run);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_parse_backup_flags() {
        let cli = Cli::try_parse_from(["dbexec", "--quiet", "backup", "/var/backups", "-y"]).unwrap();

        assert!(cli.quiet);
        assert!(matches!(cli.command, Commands::Backup { yes: true, .. }));
    }

    #[test]
    fn test_missing_subcommand_is_rejected() {
        assert!(Cli::try_parse_from(["dbexec"]).is_err());
    }

    #[test]
    fn test_is_affirmative() {
        assert!(is_affirmative("y\n"));
        assert!(is_affirmative(" YES "));
        assert!(!is_affirmative("\n"));
        assert!(!is_affirmative("n"));
        assert!(!is_affirmative("yep"));
    }

    #[test]
    fn test_exit_codes() {
        let config: anyhow::Error = DbExecError::Configuration("database is required".into()).into();
        let missing: anyhow::Error = DbExecError::NotFound("query folder".into()).into();
        let connection: anyhow::Error = DbExecError::Connection("refused".into()).into();
        let other = anyhow::anyhow!("stdin closed");

        assert_eq!(exit_code(&config), EXIT_CONFIG);
        assert_eq!(exit_code(&missing), EXIT_CONFIG);
        assert_eq!(exit_code(&connection), EXIT_FAILURE);
        assert_eq!(exit_code(&other), EXIT_FAILURE);
    }
}
