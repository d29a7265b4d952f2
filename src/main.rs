use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use finvault::cli::{
    explicit_passphrase, handle_backup_command, handle_cloud_command, handle_key_command,
    handle_passphrase_command, handle_schedule_command, BackupCommands, CloudCommands,
    KeyCommands, PassphraseCommands, ScheduleCommands, VaultContext,
};
use finvault::config::{Settings, VaultPaths};

#[derive(Parser)]
#[command(
    name = "finvault",
    version,
    about = "Encrypted backups and key rotation for a local finance store",
    long_about = "finvault keeps passphrase-encrypted snapshots of your local finance \
                  data, prunes old ones, syncs them to a remote directory and runs \
                  them on a daily schedule. It also manages the database encryption key."
)]
struct Cli {
    /// Enable debug logging (overridden by RUST_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Backup passphrase; falls back to the stored one when omitted
    #[arg(long, global = true, env = "FINVAULT_PASSPHRASE", hide_env_values = true)]
    passphrase: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the data directory, settings and database key
    Init,

    /// Show current configuration and paths
    Config,

    /// Local backup commands
    #[command(subcommand)]
    Backup(BackupCommands),

    /// Remote backup commands
    #[command(subcommand)]
    Cloud(CloudCommands),

    /// Stored backup passphrase commands
    #[command(subcommand)]
    Passphrase(PassphraseCommands),

    /// Database key commands
    #[command(subcommand)]
    Key(KeyCommands),

    /// Scheduled backup commands
    #[command(subcommand)]
    Schedule(ScheduleCommands),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize paths and settings
    let paths = VaultPaths::new()?;
    let settings = Settings::load_or_create(&paths)?;

    init_tracing(&settings, cli.verbose);

    let passphrase = explicit_passphrase(cli.passphrase)?;

    match cli.command {
        Some(Commands::Init) => {
            println!("Initializing finvault at: {}", paths.base_dir().display());
            paths.ensure_directories()?;
            settings.save(&paths)?;

            let ctx = VaultContext::open(paths, settings)?;
            ctx.data_store().initialize()?;
            ctx.key_store().get_or_create_key()?;

            println!("Initialization complete!");
            println!();
            if !ctx.passphrase_store().is_set() {
                println!("Set a backup passphrase with: finvault passphrase set");
            }
            println!("Create your first backup with: finvault backup create");
        }
        Some(Commands::Config) => {
            println!("finvault Configuration");
            println!("======================");
            println!("Base directory:   {}", paths.base_dir().display());
            println!("Data directory:   {}", paths.data_dir().display());
            println!("Backup directory: {}", paths.backup_dir().display());
            println!("Cloud directory:  {}", paths.cloud_dir().display());
            println!();
            println!("Settings:");
            println!("  Backup retention:  {} days", settings.backup.retention_days);
            println!("  Schedule hour:     {:02}:00", settings.backup.schedule_hour);
            println!("  Key rotation:      {} days", settings.key_rotation.interval_days);
            println!("  Log level:         {}", settings.log_level);
        }
        Some(Commands::Backup(cmd)) => {
            let ctx = VaultContext::open(paths, settings)?;
            handle_backup_command(&ctx, cmd, passphrase).await?;
        }
        Some(Commands::Cloud(cmd)) => {
            let ctx = VaultContext::open(paths, settings)?;
            handle_cloud_command(&ctx, cmd, passphrase).await?;
        }
        Some(Commands::Passphrase(cmd)) => {
            let ctx = VaultContext::open(paths, settings)?;
            handle_passphrase_command(&ctx, cmd, passphrase)?;
        }
        Some(Commands::Key(cmd)) => {
            let ctx = VaultContext::open(paths, settings)?;
            handle_key_command(&ctx, cmd)?;
        }
        Some(Commands::Schedule(cmd)) => {
            let ctx = VaultContext::open(paths, settings)?;
            handle_schedule_command(&ctx, cmd).await?;
        }
        None => {
            println!("finvault - encrypted backups for your finance data");
            println!();
            println!("Run 'finvault --help' for usage information.");
            println!("Run 'finvault init' to get started.");
        }
    }

    Ok(())
}

/// Log to stderr so command output stays clean on stdout
fn init_tracing(settings: &Settings, verbose: bool) {
    let default_level = if verbose { "debug" } else { settings.log_level.as_str() };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}
