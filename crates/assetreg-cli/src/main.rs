use std::path::PathBuf;

use assetreg_core::RegistryConfig;
use assetreg_core::config::{LogConfig, LogFormat};
use assetreg_registry::Command;
use clap::{Parser, Subcommand};

mod commands;

use commands::registry::{self, Session};

#[derive(Parser)]
#[command(
    name = "assetreg",
    about = "Registry of application descriptors and bundles",
    version,
    propagate_version = true,
)]
struct Cli {
    /// Path to assetreg.toml (defaults apply when omitted)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
    /// Ledger file, overriding [ledger].path
    #[arg(long, global = true)]
    ledger: Option<PathBuf>,
    /// Invoking identity, overriding [identity].creator
    #[arg(long, global = true)]
    creator: Option<String>,
    /// Write the raw serialized record to stdout instead of JSON
    #[arg(long, global = true)]
    raw: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create an application descriptor
    CreateDescriptor {
        key: String,
        #[arg(short, long)]
        description: Option<String>,
        /// Owner identity; defaults to the invoking identity
        #[arg(long)]
        owner: Option<String>,
    },
    /// Create a bundle under an existing descriptor.
    ///
    /// At least one --artifact or --deployment-spec file is required.
    CreateBundle {
        descriptor: String,
        key: String,
        #[arg(long = "artifact")]
        artifacts: Vec<PathBuf>,
        #[arg(long = "deployment-spec")]
        deployment_specs: Vec<PathBuf>,
        #[arg(long = "endorsement")]
        endorsements: Vec<PathBuf>,
    },
    /// Point a descriptor at one of its bundles
    Associate { descriptor: String, bundle: String },
    /// List every descriptor
    ListDescriptors,
    /// List the bundle keys under a descriptor
    ListBundles { descriptor: String },
    /// Fetch one bundle
    GetBundle { descriptor: String, bundle: String },
    /// Run a command by its wire name with positional arguments
    Invoke {
        function: String,
        args: Vec<String>,
        /// File whose bytes are appended as the last argument
        #[arg(long)]
        payload: Option<PathBuf>,
    },
}

fn init_tracing(log: &LogConfig) -> anyhow::Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| tracing_subscriber::EnvFilter::try_new(&log.filter))?;
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    match log.format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => RegistryConfig::from_file(path)?,
        None => RegistryConfig::default(),
    };
    if let Some(ledger) = cli.ledger {
        config.ledger.path = ledger;
    }
    if let Some(creator) = cli.creator {
        config.identity.creator = Some(creator);
    }

    init_tracing(&config.log)?;

    let session = Session::open(&config.ledger.path, config.creator_identity(), cli.raw)?;

    let command = match cli.command {
        Commands::CreateDescriptor { key, description, owner } => {
            registry::create_descriptor(key, description, owner)
        }
        Commands::CreateBundle {
            descriptor,
            key,
            artifacts,
            deployment_specs,
            endorsements,
        } => registry::create_bundle(descriptor, key, &artifacts, &deployment_specs, &endorsements)?,
        Commands::Associate { descriptor, bundle } => Command::AssociateDescriptorWithBundle {
            descriptor_key: descriptor,
            bundle_key: bundle,
        },
        Commands::ListDescriptors => Command::GetAppDescriptors,
        Commands::ListBundles { descriptor } => Command::GetAppBundleKeySetForDescriptor {
            descriptor_key: descriptor,
        },
        Commands::GetBundle { descriptor, bundle } => Command::GetAppBundleForDescriptor {
            descriptor_key: descriptor,
            bundle_key: bundle,
        },
        Commands::Invoke { function, args, payload } => {
            registry::raw_invocation(function, args, payload.as_deref())?
        }
    };

    session.run(command)
}
