use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};

use assetreg_core::proto::{AppBundle, AppBundleKeySet, AppDescriptor, AppDescriptors};
use assetreg_registry::{Command, Registry};
use assetreg_state::LedgerStore;
use prost::Message;
use serde::Serialize;
use tracing::{debug, info};

/// Everything one CLI invocation needs. Built fresh per process run.
pub struct Session {
    pub store: LedgerStore,
    pub creator: Vec<u8>,
    pub raw: bool,
}

impl Session {
    pub fn open(ledger: &Path, creator: Vec<u8>, raw: bool) -> anyhow::Result<Self> {
        let store = LedgerStore::open(ledger)?;
        Ok(Self { store, creator, raw })
    }

    /// Execute `command` in its own transaction and print the result.
    pub fn run(&self, command: Command) -> anyhow::Result<()> {
        let output = self.execute(&command)?;
        if self.raw {
            std::io::stdout().write_all(&output)?;
        } else {
            println!("{}", render(&command, &output)?);
        }
        Ok(())
    }

    pub fn execute(&self, command: &Command) -> anyhow::Result<Vec<u8>> {
        let name = command.name();
        debug!(command = name, "executing");
        let output = self.store.transact(|txn| {
            let registry = Registry::new(&self.creator)?;
            registry.execute(txn, command.clone())
        })?;
        info!(command = name, len = output.len(), "committed");
        Ok(output)
    }
}

pub fn create_descriptor(key: String, description: Option<String>, owner: Option<String>) -> Command {
    let record = AppDescriptor {
        owner: owner.map(String::into_bytes).unwrap_or_default(),
        description: description.unwrap_or_default(),
        bundle_key: String::new(),
    };
    Command::CreateAppDescriptor {
        descriptor_key: key,
        record: record.encode_to_vec(),
    }
}

pub fn create_bundle(
    descriptor: String,
    key: String,
    artifacts: &[PathBuf],
    deployment_specs: &[PathBuf],
    endorsements: &[PathBuf],
) -> anyhow::Result<Command> {
    let record = AppBundle {
        owner: Vec::new(),
        descriptor_key: descriptor.clone(),
        artifacts: read_all(artifacts)?,
        deployment_specs: read_all(deployment_specs)?,
        owner_endorsements: read_all(endorsements)?,
    };
    Ok(Command::CreateAppBundle {
        descriptor_key: descriptor,
        bundle_key: key,
        record: record.encode_to_vec(),
    })
}

/// Build a command from a raw function name and positional arguments. The
/// payload file, when given, is appended as the final argument.
pub fn raw_invocation(function: String, args: Vec<String>, payload: Option<&Path>) -> anyhow::Result<Command> {
    let mut raw: Vec<Vec<u8>> = Vec::with_capacity(args.len() + 2);
    raw.push(function.into_bytes());
    raw.extend(args.into_iter().map(String::into_bytes));
    if let Some(path) = payload {
        raw.push(std::fs::read(path)?);
    }
    Ok(Command::parse(&raw)?)
}

fn read_all(paths: &[PathBuf]) -> anyhow::Result<Vec<Vec<u8>>> {
    paths
        .iter()
        .map(|path| std::fs::read(path).map_err(|e| anyhow::anyhow!("reading {}: {e}", path.display())))
        .collect()
}

// ── Output ─────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct DescriptorView {
    owner: String,
    description: String,
    bundle_key: String,
}

impl From<AppDescriptor> for DescriptorView {
    fn from(d: AppDescriptor) -> Self {
        Self {
            owner: hex::encode(d.owner),
            description: d.description,
            bundle_key: d.bundle_key,
        }
    }
}

#[derive(Debug, Serialize)]
struct BundleView {
    owner: String,
    descriptor_key: String,
    content_digest: String,
    artifacts: Vec<String>,
    deployment_specs: Vec<String>,
    owner_endorsements: Vec<String>,
}

impl From<AppBundle> for BundleView {
    fn from(b: AppBundle) -> Self {
        let content_digest = b.content_digest();
        Self {
            owner: hex::encode(b.owner),
            descriptor_key: b.descriptor_key,
            content_digest,
            artifacts: b.artifacts.iter().map(hex::encode).collect(),
            deployment_specs: b.deployment_specs.iter().map(hex::encode).collect(),
            owner_endorsements: b.owner_endorsements.iter().map(hex::encode).collect(),
        }
    }
}

#[derive(Debug, Serialize)]
struct KeySetView {
    descriptor_key: String,
    bundle_keys: Vec<String>,
}

/// Decode `output` according to the record type `command` returns and
/// pretty-print it as JSON.
fn render(command: &Command, output: &[u8]) -> anyhow::Result<String> {
    let json = match command {
        Command::CreateAppDescriptor { .. } | Command::AssociateDescriptorWithBundle { .. } => {
            serde_json::to_string_pretty(&DescriptorView::from(AppDescriptor::decode(output)?))?
        }
        Command::CreateAppBundle { .. } | Command::GetAppBundleForDescriptor { .. } => {
            serde_json::to_string_pretty(&BundleView::from(AppBundle::decode(output)?))?
        }
        Command::GetAppDescriptors => {
            let all = AppDescriptors::decode(output)?;
            let sorted: BTreeMap<String, DescriptorView> = all
                .descriptors
                .into_iter()
                .map(|(key, d)| (key, DescriptorView::from(d)))
                .collect();
            serde_json::to_string_pretty(&sorted)?
        }
        Command::GetAppBundleKeySetForDescriptor { .. } => {
            let set = AppBundleKeySet::decode(output)?;
            serde_json::to_string_pretty(&KeySetView {
                descriptor_key: set.descriptor_key,
                bundle_keys: set.bundle_keys,
            })?
        }
    };
    Ok(json)
}
