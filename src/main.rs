mod commands;

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use colored::Colorize;
use quantum_launcher::config::LauncherConfig;
use quantum_launcher::logging;
use quantum_launcher::paths::LauncherPaths;

#[derive(Parser)]
#[command(name = "qlaunch")]
#[command(author, version, about = "Installs, updates and launches Quantum Voxel", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// List channels and releases
    Versions,

    /// Install (if needed) and run a version
    Play {
        /// Version id or channel name (defaults to the first listed)
        version: Option<String>,
    },

    /// Download the JDK if it is missing
    Runtime,

    /// Show where the launcher keeps its files
    Paths,

    /// Remove the download staging directory
    Clean,

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        shell: Shell,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    if let Some(Commands::Completions { shell }) = &cli.command {
        let mut command = Cli::command();
        clap_complete::generate(*shell, &mut command, "qlaunch", &mut std::io::stdout());
        return Ok(());
    }

    let paths = LauncherPaths::detect();
    paths.ensure_layout()?;
    let sink = logging::init(&paths.log_file(), cli.verbose)?;
    let config = LauncherConfig::from_env();
    tracing::info!("Data root: {}", paths.root().display());

    let result = match cli.command {
        Some(Commands::Versions) | None => commands::versions(paths, config).await,
        Some(Commands::Play { version }) => commands::play(paths, config, version.as_deref()).await,
        Some(Commands::Runtime) => commands::runtime(paths, config).await,
        Some(Commands::Paths) => commands::paths(&paths, &config),
        Some(Commands::Clean) => commands::clean(&paths),
        Some(Commands::Completions { .. }) => Ok(()),
    };

    if let Err(e) = &result {
        tracing::error!("{:#}", e);
        eprintln!("{} {:#}", "Error:".red().bold(), e);
    }
    let _ = sink.flush();

    if result.is_err() {
        std::process::exit(1);
    }
    Ok(())
}
