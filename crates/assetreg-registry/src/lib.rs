//! assetreg-registry — the command layer of the asset registry.
//!
//! Tracks application descriptors and the bundles scoped under them inside
//! a [`Ledger`](assetreg_state::Ledger). Invocations arrive as positional
//! byte arguments, are parsed into a [`Command`], and are executed by a
//! [`Registry`] built for that one invocation.
//!
//! ```text
//! createAppDescriptor              <descriptor_key> <AppDescriptor>
//! createAppBundle                  <descriptor_key> <bundle_key> <AppBundle>
//! associateDescriptorWithBundle    <descriptor_key> <bundle_key>
//! getAppDescriptors
//! getAppBundleKeySetForDescriptor  <descriptor_key>
//! getAppBundleForDescriptor        <descriptor_key> <bundle_key>
//! ```
//!
//! Every command returns the serialized record it stored or read.

pub mod command;
pub mod error;
pub mod registry;

pub use command::Command;
pub use error::{EntityKind, RegistryError, RegistryResult};
pub use registry::{Registry, invoke};
