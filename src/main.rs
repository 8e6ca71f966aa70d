//! ytdl-wrapper - Async wrapper around the yt-dlp command line tool.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use ytdl_wrapper::config::ConfigLoader;
use ytdl_wrapper::display;
use ytdl_wrapper::exec::{ExecError, ExecOptions, WrapperEvent};
use ytdl_wrapper::YtdlWrapper;

#[derive(Parser)]
#[command(
    name = "ytdl-wrapper",
    about = "Run yt-dlp with parsed progress and structured output",
    version
)]
struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short = 'v', long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Path to the yt-dlp executable (overrides the config file).
    #[arg(long, global = true)]
    binary: Option<String>,

    /// Config file to use instead of the default search paths.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the yt-dlp version.
    Version,
    /// Print the user agent yt-dlp sends.
    UserAgent,
    /// Print yt-dlp's own help text.
    ToolHelp,
    /// List supported extractors.
    Extractors {
        /// Print descriptions instead of names.
        #[arg(long)]
        descriptions: bool,
    },
    /// Print media metadata as JSON.
    Info {
        /// URLs and extra yt-dlp arguments.
        #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
        args: Vec<String>,
    },
    /// Run yt-dlp and show its progress live.
    Run {
        /// Print every line without truncation.
        #[arg(long)]
        raw: bool,
        /// Arguments passed to yt-dlp.
        #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
        args: Vec<String>,
    },
}

fn init_tracing(verbosity: u8) {
    let level = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}

fn build_wrapper(cli: &Cli) -> Result<YtdlWrapper, Box<dyn std::error::Error>> {
    let loader = match &cli.config {
        Some(path) => ConfigLoader::with_path(path.clone()),
        None => ConfigLoader::new(),
    };
    let mut config = loader.load()?;
    if let Some(binary) = &cli.binary {
        config.binary.clone_from(binary);
    }
    Ok(YtdlWrapper::with_config(&config)?)
}

async fn run_session(
    wrapper: &YtdlWrapper,
    args: Vec<String>,
    raw: bool,
) -> Result<bool, ExecError> {
    let cancel = CancellationToken::new();
    let ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Interrupted, cancelling");
            ctrl_c.cancel();
        }
    });

    let mut events = wrapper.exec(args, ExecOptions::default(), Some(cancel))?;
    let mut succeeded = false;
    while let Some(event) = events.recv().await {
        display::print_wrapper_event(&event, raw);
        if let WrapperEvent::Close(_) = event {
            succeeded = true;
        }
    }

    Ok(succeeded)
}

async fn run(cli: Cli) -> Result<ExitCode, Box<dyn std::error::Error>> {
    let wrapper = build_wrapper(&cli)?;

    match cli.command {
        Commands::Version => println!("{}", wrapper.version().await?),
        Commands::UserAgent => println!("{}", wrapper.user_agent().await?),
        Commands::ToolHelp => print!("{}", wrapper.help().await?),
        Commands::Extractors { descriptions } => {
            let lines = if descriptions {
                wrapper.extractor_descriptions().await?
            } else {
                wrapper.extractors().await?
            };
            for line in lines {
                println!("{line}");
            }
        }
        Commands::Info { args } => {
            let info = wrapper.media_info(args).await?;
            println!("{}", serde_json::to_string_pretty(&info)?);
        }
        Commands::Run { raw, args } => {
            tracing::info!(binary = wrapper.path(), "Running tool");
            // Failures were already printed as events.
            if !run_session(&wrapper, args, raw).await? {
                return Ok(ExitCode::FAILURE);
            }
        }
    }
    Ok(ExitCode::SUCCESS)
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            display::print_error(&e.to_string());
            ExitCode::FAILURE
        }
    }
}
