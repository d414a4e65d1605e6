use anyhow::Result;
use clap::Parser;
use py4a::commands;
use py4a::config::Config;
use py4a::scripts::RenameMode;
use std::path::PathBuf;

/// py4a - Python interpreter and module manager
///
/// Installs a Python distribution (interpreter, extras and sample scripts)
/// and imports third-party module archives into it.
///
/// Examples:
///   py4a interpreter install              # Download and install the latest release
///   py4a module install twisted.zip      # Import a module archive
///   py4a env                              # Print the interpreter environment
#[derive(Parser, Debug)]
#[command(author, version = env!("PY4A_VERSION"), about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Install root directory (overrides defaults; also via PY4A_ROOT)
    #[arg(
        long = "root",
        short = 'r',
        env = "PY4A_ROOT",
        value_name = "PATH",
        global = true
    )]
    pub install_root: Option<PathBuf>,

    /// Interpreter to operate on: python or python3
    #[arg(long, short = 'i', default_value = "python", global = true)]
    pub interpreter: String,

    /// Base URL of the LATEST_VERSION files
    #[arg(long = "source-url", value_name = "URL", global = true)]
    pub source_url: Option<String>,

    /// Base URL of the release archives
    #[arg(long = "release-url", value_name = "URL", global = true)]
    pub release_url: Option<String>,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Import, remove and list third-party modules
    #[command(subcommand)]
    Module(ModuleCommands),

    /// Install or remove the interpreter distribution
    #[command(subcommand)]
    Interpreter(InterpreterCommands),

    /// Check for and show interpreter revisions
    #[command(subcommand)]
    Version(VersionCommands),

    /// Choose which interpreter owns the .py extension for sample scripts
    #[command(subcommand)]
    Scripts(ScriptsCommands),

    /// Print the environment variables the interpreter needs
    Env,
}

#[derive(clap::Subcommand, Debug)]
enum ModuleCommands {
    /// Import one or more module zip archives
    Install {
        #[arg(value_name = "ARCHIVE", required = true)]
        archives: Vec<PathBuf>,
    },
    /// Remove an imported module
    Uninstall {
        /// Module name as shown by `module list`
        name: String,
        /// Skip confirmation prompt
        #[arg(short = 'y', long = "yes")]
        yes: bool,
    },
    /// List imported modules
    List,
    /// Copy an .egg into the library directory and register it
    ImportEgg {
        #[arg(value_name = "EGG")]
        egg: PathBuf,
    },
}

#[derive(clap::Subcommand, Debug)]
enum InterpreterCommands {
    /// Install the interpreter, extras and scripts archives
    Install {
        /// Install from archives in this directory instead of downloading
        #[arg(long, value_name = "DIR")]
        from: Option<PathBuf>,
    },
    /// Remove the interpreter and its extras
    Uninstall {
        /// Skip confirmation prompt
        #[arg(short = 'y', long = "yes")]
        yes: bool,
    },
}

#[derive(clap::Subcommand, Debug)]
enum VersionCommands {
    /// Fetch the latest available revisions
    Check,
    /// Show installed and available revisions
    Show,
}

#[derive(clap::Subcommand, Debug)]
enum ScriptsCommands {
    /// Rename sample scripts so the given major version uses .py
    Prefer {
        #[arg(value_parser = clap::value_parser!(u8).range(2..=3))]
        major: u8,
        /// What to do when the renamed file already exists
        #[arg(long, value_enum, default_value = "skip")]
        mode: RenameMode,
    },
    /// Show the preferred major version
    Show,
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let cli = Cli::parse();
    let config = Config::new(
        py4a::runtime::RealRuntime,
        cli.install_root,
        &cli.interpreter,
        cli.source_url,
        cli.release_url,
    )?;

    match cli.command {
        Commands::Module(cmd) => match cmd {
            ModuleCommands::Install { archives } => {
                commands::module::install(&config, &archives).await?
            }
            ModuleCommands::Uninstall { name, yes } => {
                commands::module::uninstall(&config, &name, yes).await?
            }
            ModuleCommands::List => commands::module::list(&config)?,
            ModuleCommands::ImportEgg { egg } => commands::module::import(&config, &egg)?,
        },
        Commands::Interpreter(cmd) => match cmd {
            InterpreterCommands::Install { from } => {
                commands::interpreter::install(&config, from.as_deref()).await?
            }
            InterpreterCommands::Uninstall { yes } => commands::interpreter::uninstall(&config, yes)?,
        },
        Commands::Version(cmd) => match cmd {
            VersionCommands::Check => commands::version::check(&config).await?,
            VersionCommands::Show => commands::version::show(&config)?,
        },
        Commands::Scripts(cmd) => match cmd {
            ScriptsCommands::Prefer { major, mode } => {
                commands::scripts::prefer(&config, major, mode)?
            }
            ScriptsCommands::Show => commands::scripts::show(&config)?,
        },
        Commands::Env => commands::env::env(&config)?,
    }
    Ok(())
}
