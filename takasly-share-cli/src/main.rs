//! Takasly share extension shell
//!
//! Runs the share-extension hand-off outside the OS share sheet: every FILE
//! given on the command line becomes one attachment of a single share request.
//! Supported attachments are copied into the group container and listed in the
//! shared record, then the host app is woken through its activation URL.
//!
//! ```text
//! takasly-share share a.jpg b.png --open-with xdg-open
//! takasly-share show
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{info, warn};

use takasly_share_lib::{
    load_settings, save_settings, shared_record, CommandActivator, CompletionSignal,
    ExtensionSettings, FileItemProvider, HostActivator, InputItem, ShareExtension, ShareRequest,
    TypeIdentifier, UnavailableActivator,
};

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Settings file shared with the host app (defaults are used if it does not exist)
    #[arg(long, global = true, default_value = "takasly-share.json")]
    config: PathBuf,

    /// Override the directory group containers are resolved under
    #[arg(long, global = true)]
    container_root: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Hand files to the host app
    Share {
        /// Files to share; each one is an attachment of its own input item
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Type identifier to report for every file instead of inferring it from the extension
        #[arg(long = "type")]
        type_identifier: Option<String>,

        /// Program that opens the activation URL, followed by leading arguments.
        /// The URL is appended as the final argument.
        #[arg(long, num_args = 1.., allow_hyphen_values = true)]
        open_with: Option<Vec<String>>,
    },

    /// Print the paths currently listed in the shared record
    Show,

    /// Print the effective settings, or write them to the config path
    Config {
        #[arg(long)]
        write: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "takasly_share=info,takasly_share_lib=debug".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let settings = effective_settings(&args)?;

    match args.command {
        Command::Share {
            files,
            type_identifier,
            open_with,
        } => share(&settings, files, type_identifier, open_with).await,
        Command::Show => show(&settings),
        Command::Config { write } => {
            if write {
                save_settings(&args.config, &settings)
                    .with_context(|| format!("Failed to write settings to {:?}", args.config))?;
                info!("Wrote settings to {:?}", args.config);
            } else {
                println!("{}", serde_json::to_string_pretty(&settings)?);
            }
            Ok(())
        }
    }
}

fn effective_settings(args: &Args) -> Result<ExtensionSettings> {
    let mut settings = load_settings(&args.config)
        .with_context(|| format!("Failed to load settings from {:?}", args.config))?;
    if let Some(root) = &args.container_root {
        settings.container_root = root.clone();
    }
    settings.validate().context("Invalid settings")?;
    Ok(settings)
}

/// Split `--open-with` values into the program and its leading arguments.
fn split_opener(command: &[String]) -> Result<(&str, &[String])> {
    let (program, leading) = command
        .split_first()
        .context("--open-with needs a program")?;
    Ok((program.as_str(), leading))
}

async fn share(
    settings: &ExtensionSettings,
    files: Vec<PathBuf>,
    type_identifier: Option<String>,
    open_with: Option<Vec<String>>,
) -> Result<()> {
    let host: Arc<dyn HostActivator> = match open_with {
        Some(command) => {
            let (program, leading) = split_opener(&command)?;
            Arc::new(CommandActivator::new(program).with_args(leading.iter().cloned()))
        }
        None => {
            warn!("No --open-with program given; the host app will not be activated");
            Arc::new(UnavailableActivator)
        }
    };
    let context = Arc::new(CompletionSignal::new());

    let extension = ShareExtension::with_file_defaults(settings, host, context.clone())
        .context("Failed to set up share extension")?;

    let request = files
        .into_iter()
        .map(|path| {
            let provider = match &type_identifier {
                Some(id) => FileItemProvider::with_type(path, TypeIdentifier::new(id.clone())),
                None => FileItemProvider::new(path),
            };
            InputItem::default().with_attachment(provider)
        })
        .fold(ShareRequest::default(), ShareRequest::with_item);

    let pending = extension.handle_share_request(request)?;
    info!("Waiting for {} attachment loads", pending.issued());
    let outcome = pending.finish().await?;
    context.wait().await;

    for path in &outcome.persisted {
        println!("{}", path);
    }
    info!(
        "Shared {}/{} attachments (host activated: {})",
        outcome.persisted.len(),
        outcome.issued,
        outcome.activated
    );
    Ok(())
}

fn show(settings: &ExtensionSettings) -> Result<()> {
    let record = shared_record(settings).context("Failed to open shared record")?;
    let paths = record
        .load()
        .with_context(|| format!("Failed to read record '{}'", record.key()))?;

    if paths.is_empty() {
        info!("Record '{}' is empty", record.key());
    }
    for path in paths {
        println!("{}", path);
    }
    Ok(())
}
