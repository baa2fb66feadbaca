//! Registry command handlers.
//!
//! A [`Registry`] is built per invocation from the caller's identity and
//! holds nothing else; all state lives in the [`Ledger`]. Every handler
//! re-reads its preconditions from the ledger before writing.

use std::collections::HashMap;

use assetreg_core::proto::{AppBundle, AppBundleKeySet, AppDescriptor, AppDescriptors, ObjectType, Query};
use assetreg_state::{CompositeKey, Ledger, run_query};
use prost::Message;
use tracing::{debug, info, warn};

use crate::command::Command;
use crate::error::{EntityKind, RegistryError, RegistryResult};

/// Parse `args` and execute them against `ledger` on behalf of `creator`.
///
/// Returns the serialized record the command produced or read.
pub fn invoke<L, A>(ledger: &mut L, creator: &[u8], args: &[A]) -> RegistryResult<Vec<u8>>
where
    L: Ledger + ?Sized,
    A: AsRef<[u8]>,
{
    let command = match Command::parse(args) {
        Ok(command) => command,
        Err(err) => {
            warn!(error = %err, "rejected invocation");
            return Err(err);
        }
    };
    let name = command.name();
    let result = Registry::new(creator).and_then(|registry| registry.execute(ledger, command));
    match &result {
        Ok(bytes) => info!(command = name, len = bytes.len(), "invocation succeeded"),
        Err(err) => warn!(command = name, error = %err, "invocation failed"),
    }
    result
}

/// Per-invocation command executor.
#[derive(Debug)]
pub struct Registry {
    creator: Vec<u8>,
}

impl Registry {
    /// The creator identity becomes the owner of records that leave it unset.
    pub fn new(creator: &[u8]) -> RegistryResult<Self> {
        if creator.is_empty() {
            return Err(RegistryError::Validation("invoking identity is empty".to_string()));
        }
        Ok(Self {
            creator: creator.to_vec(),
        })
    }

    pub fn execute<L: Ledger + ?Sized>(&self, ledger: &mut L, command: Command) -> RegistryResult<Vec<u8>> {
        match command {
            Command::CreateAppDescriptor { descriptor_key, record } => {
                self.create_app_descriptor(ledger, &descriptor_key, &record)
            }
            Command::CreateAppBundle {
                descriptor_key,
                bundle_key,
                record,
            } => self.create_app_bundle(ledger, &descriptor_key, &bundle_key, &record),
            Command::AssociateDescriptorWithBundle {
                descriptor_key,
                bundle_key,
            } => associate_descriptor_with_bundle(ledger, &descriptor_key, &bundle_key),
            Command::GetAppDescriptors => get_app_descriptors(&*ledger),
            Command::GetAppBundleKeySetForDescriptor { descriptor_key } => {
                get_app_bundle_key_set(&*ledger, &descriptor_key)
            }
            Command::GetAppBundleForDescriptor {
                descriptor_key,
                bundle_key,
            } => get_app_bundle(&*ledger, &descriptor_key, &bundle_key),
        }
    }

    fn create_app_descriptor<L: Ledger + ?Sized>(
        &self,
        ledger: &mut L,
        key: &str,
        record: &[u8],
    ) -> RegistryResult<Vec<u8>> {
        let composite = descriptor_key(key)?;
        if ledger.get_state(&composite)?.is_some() {
            return Err(RegistryError::AlreadyExists {
                kind: EntityKind::Descriptor,
                key: key.to_string(),
            });
        }

        let mut descriptor = AppDescriptor::decode(record).map_err(|source| RegistryError::Serialization {
            record: "AppDescriptor",
            source,
        })?;
        if !descriptor.bundle_key.is_empty() {
            return Err(RegistryError::Validation(
                "AppDescriptor's bundle_key must be empty during creation".to_string(),
            ));
        }
        if descriptor.owner.is_empty() {
            descriptor.owner = self.creator.clone();
        }

        let bytes = descriptor.encode_to_vec();
        ledger.put_state(&composite, &bytes)?;
        debug!(descriptor = key, "descriptor created");
        Ok(bytes)
    }

    fn create_app_bundle<L: Ledger + ?Sized>(
        &self,
        ledger: &mut L,
        descriptor: &str,
        bundle: &str,
        record: &[u8],
    ) -> RegistryResult<Vec<u8>> {
        let mut app_bundle = AppBundle::decode(record).map_err(|source| RegistryError::Serialization {
            record: "AppBundle",
            source,
        })?;
        if !app_bundle.has_content() {
            return Err(RegistryError::Validation(
                "must specify at least 1 artifact or deployment spec in an AppBundle".to_string(),
            ));
        }
        if app_bundle.owner.is_empty() {
            app_bundle.owner = self.creator.clone();
        }
        if app_bundle.descriptor_key.is_empty() {
            app_bundle.descriptor_key = descriptor.to_string();
        } else if app_bundle.descriptor_key != descriptor {
            return Err(RegistryError::Validation(format!(
                "AppBundle names descriptor {:?} but was submitted under {:?}",
                app_bundle.descriptor_key, descriptor
            )));
        }

        load_descriptor(&*ledger, descriptor)?;

        let composite = bundle_key(descriptor, bundle)?;
        if ledger.get_state(&composite)?.is_some() {
            return Err(RegistryError::AlreadyExists {
                kind: EntityKind::Bundle,
                key: format!("{descriptor}/{bundle}"),
            });
        }

        let bytes = app_bundle.encode_to_vec();
        ledger.put_state(&composite, &bytes)?;
        debug!(descriptor, bundle, "bundle created");
        Ok(bytes)
    }
}

/// Point the descriptor at `bundle`. An existing association is overwritten.
fn associate_descriptor_with_bundle<L: Ledger + ?Sized>(
    ledger: &mut L,
    descriptor: &str,
    bundle: &str,
) -> RegistryResult<Vec<u8>> {
    let mut app_descriptor = load_descriptor(&*ledger, descriptor)?;
    load_bundle(&*ledger, descriptor, bundle)?;

    if !app_descriptor.bundle_key.is_empty() && app_descriptor.bundle_key != bundle {
        debug!(
            descriptor,
            previous = %app_descriptor.bundle_key,
            bundle,
            "replacing bundle association"
        );
    }
    app_descriptor.bundle_key = bundle.to_string();

    let bytes = app_descriptor.encode_to_vec();
    ledger.put_state(&descriptor_key(descriptor)?, &bytes)?;
    debug!(descriptor, bundle, "descriptor associated");
    Ok(bytes)
}

fn get_app_descriptors<L: Ledger + ?Sized>(ledger: &L) -> RegistryResult<Vec<u8>> {
    let result = run_query(ledger, &Query::new(ObjectType::AppDescriptor, Vec::new()))?;

    let mut descriptors = HashMap::with_capacity(result.results.len());
    for (key, value) in result.results {
        let descriptor = AppDescriptor::decode(value.as_slice()).map_err(|source| RegistryError::Serialization {
            record: "AppDescriptor",
            source,
        })?;
        descriptors.insert(key, descriptor);
    }
    Ok(AppDescriptors { descriptors }.encode_to_vec())
}

fn get_app_bundle_key_set<L: Ledger + ?Sized>(ledger: &L, descriptor: &str) -> RegistryResult<Vec<u8>> {
    load_descriptor(ledger, descriptor)?;

    let query = Query::new(ObjectType::AppBundle, vec![descriptor.to_string()]);
    let result = run_query(ledger, &query)?;
    let mut bundle_keys: Vec<String> = result.results.into_keys().collect();
    bundle_keys.sort();

    Ok(AppBundleKeySet {
        descriptor_key: descriptor.to_string(),
        bundle_keys,
    }
    .encode_to_vec())
}

fn get_app_bundle<L: Ledger + ?Sized>(ledger: &L, descriptor: &str, bundle: &str) -> RegistryResult<Vec<u8>> {
    load_descriptor(ledger, descriptor)?;
    load_bundle(ledger, descriptor, bundle)
}

// ── Ledger helpers ─────────────────────────────────────────────────

fn descriptor_key(descriptor: &str) -> RegistryResult<CompositeKey> {
    Ok(CompositeKey::new(ObjectType::AppDescriptor.tag(), &[descriptor])?)
}

fn bundle_key(descriptor: &str, bundle: &str) -> RegistryResult<CompositeKey> {
    Ok(CompositeKey::new(ObjectType::AppBundle.tag(), &[descriptor, bundle])?)
}

fn load_descriptor<L: Ledger + ?Sized>(ledger: &L, descriptor: &str) -> RegistryResult<AppDescriptor> {
    let bytes = ledger
        .get_state(&descriptor_key(descriptor)?)?
        .ok_or_else(|| RegistryError::NotFound {
            kind: EntityKind::Descriptor,
            key: descriptor.to_string(),
        })?;
    AppDescriptor::decode(bytes.as_slice()).map_err(|source| RegistryError::Serialization {
        record: "AppDescriptor",
        source,
    })
}

/// Raw stored bytes of a bundle.
fn load_bundle<L: Ledger + ?Sized>(ledger: &L, descriptor: &str, bundle: &str) -> RegistryResult<Vec<u8>> {
    ledger
        .get_state(&bundle_key(descriptor, bundle)?)?
        .ok_or_else(|| RegistryError::NotFound {
            kind: EntityKind::Bundle,
            key: format!("{descriptor}/{bundle}"),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use assetreg_state::MemoryLedger;

    const CALLER: &[u8] = b"caller";

    fn descriptor_record(description: &str) -> Vec<u8> {
        AppDescriptor {
            description: description.to_string(),
            ..Default::default()
        }
        .encode_to_vec()
    }

    fn bundle_record(descriptor: &str) -> Vec<u8> {
        AppBundle {
            descriptor_key: descriptor.to_string(),
            artifacts: vec![vec![0xaa]],
            ..Default::default()
        }
        .encode_to_vec()
    }

    fn run(ledger: &mut MemoryLedger, args: &[&[u8]]) -> RegistryResult<Vec<u8>> {
        invoke(ledger, CALLER, args)
    }

    #[test]
    fn descriptor_owner_defaults_to_caller() {
        let mut ledger = MemoryLedger::new();
        let bytes = run(&mut ledger, &[b"createAppDescriptor", b"d1", &descriptor_record("foo")]).unwrap();

        let stored = AppDescriptor::decode(bytes.as_slice()).unwrap();
        assert_eq!(stored.owner, CALLER.to_vec());
        assert_eq!(stored.description, "foo");
        assert_eq!(stored.bundle_key, "");
    }

    #[test]
    fn explicit_owner_is_kept() {
        let mut ledger = MemoryLedger::new();
        let record = AppDescriptor {
            owner: b"someone-else".to_vec(),
            ..Default::default()
        }
        .encode_to_vec();
        let bytes = run(&mut ledger, &[b"createAppDescriptor", b"d1", &record]).unwrap();
        assert_eq!(AppDescriptor::decode(bytes.as_slice()).unwrap().owner, b"someone-else".to_vec());
    }

    #[test]
    fn descriptor_with_bundle_key_is_rejected() {
        let mut ledger = MemoryLedger::new();
        let record = AppDescriptor {
            bundle_key: "b1".to_string(),
            ..Default::default()
        }
        .encode_to_vec();
        let err = run(&mut ledger, &[b"createAppDescriptor", b"d1", &record]).unwrap_err();
        assert!(matches!(err, RegistryError::Validation(_)));
        assert!(ledger.is_empty());
    }

    #[test]
    fn malformed_record_is_serialization_error() {
        let mut ledger = MemoryLedger::new();
        let err = run(&mut ledger, &[b"createAppDescriptor", b"d1", &[0xff, 0xff, 0xff]]).unwrap_err();
        assert!(matches!(err, RegistryError::Serialization { record: "AppDescriptor", .. }));
    }

    #[test]
    fn duplicate_descriptor_is_rejected_before_decoding() {
        let mut ledger = MemoryLedger::new();
        run(&mut ledger, &[b"createAppDescriptor", b"d1", &descriptor_record("first")]).unwrap();

        // Garbage payload: the existence check fires first.
        let err = run(&mut ledger, &[b"createAppDescriptor", b"d1", &[0xff]]).unwrap_err();
        assert!(matches!(err, RegistryError::AlreadyExists { kind: EntityKind::Descriptor, .. }));
    }

    #[test]
    fn bundle_descriptor_key_defaults_from_argument() {
        let mut ledger = MemoryLedger::new();
        run(&mut ledger, &[b"createAppDescriptor", b"d1", &descriptor_record("")]).unwrap();

        let bytes = run(&mut ledger, &[b"createAppBundle", b"d1", b"b1", &bundle_record("")]).unwrap();
        let stored = AppBundle::decode(bytes.as_slice()).unwrap();
        assert_eq!(stored.descriptor_key, "d1");
        assert_eq!(stored.owner, CALLER.to_vec());
    }

    #[test]
    fn bundle_descriptor_key_mismatch_is_rejected() {
        let mut ledger = MemoryLedger::new();
        run(&mut ledger, &[b"createAppDescriptor", b"d1", &descriptor_record("")]).unwrap();

        let err = run(&mut ledger, &[b"createAppBundle", b"d1", b"b1", &bundle_record("d2")]).unwrap_err();
        assert!(matches!(err, RegistryError::Validation(_)));
        assert_eq!(ledger.len(), 1);
    }

    #[test]
    fn deployment_spec_only_bundle_is_accepted() {
        let mut ledger = MemoryLedger::new();
        run(&mut ledger, &[b"createAppDescriptor", b"d1", &descriptor_record("")]).unwrap();

        let record = AppBundle {
            deployment_specs: vec![b"spec".to_vec()],
            ..Default::default()
        }
        .encode_to_vec();
        run(&mut ledger, &[b"createAppBundle", b"d1", b"b1", &record]).unwrap();
    }

    #[test]
    fn key_with_separator_is_validation_error() {
        let mut ledger = MemoryLedger::new();
        let err = run(&mut ledger, &[b"createAppDescriptor", b"d\x001", &descriptor_record("")]).unwrap_err();
        assert!(matches!(err, RegistryError::Validation(_)));
    }

    #[test]
    fn empty_identity_is_rejected() {
        let mut ledger = MemoryLedger::new();
        let args: [&[u8]; 1] = [b"getAppDescriptors"];
        let err = invoke(&mut ledger, b"", &args).unwrap_err();
        assert!(matches!(err, RegistryError::Validation(_)));
    }

    #[test]
    fn reassociation_overwrites() {
        let mut ledger = MemoryLedger::new();
        run(&mut ledger, &[b"createAppDescriptor", b"d1", &descriptor_record("")]).unwrap();
        run(&mut ledger, &[b"createAppBundle", b"d1", b"b1", &bundle_record("d1")]).unwrap();
        run(&mut ledger, &[b"createAppBundle", b"d1", b"b2", &bundle_record("d1")]).unwrap();

        run(&mut ledger, &[b"associateDescriptorWithBundle", b"d1", b"b1"]).unwrap();
        let bytes = run(&mut ledger, &[b"associateDescriptorWithBundle", b"d1", b"b2"]).unwrap();
        assert_eq!(AppDescriptor::decode(bytes.as_slice()).unwrap().bundle_key, "b2");
    }

    #[test]
    fn associate_missing_bundle_leaves_descriptor_untouched() {
        let mut ledger = MemoryLedger::new();
        let created = run(&mut ledger, &[b"createAppDescriptor", b"d1", &descriptor_record("")]).unwrap();

        let err = run(&mut ledger, &[b"associateDescriptorWithBundle", b"d1", b"nope"]).unwrap_err();
        assert!(matches!(err, RegistryError::NotFound { kind: EntityKind::Bundle, .. }));

        let stored = ledger.get_state(&descriptor_key("d1").unwrap()).unwrap().unwrap();
        assert_eq!(stored, created);
    }
}
