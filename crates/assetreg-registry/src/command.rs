//! Invocation parsing.
//!
//! An invocation is a list of positional byte arguments; the first is the
//! command name. Parsing checks the name and the exact argument count before
//! anything touches the ledger.

use crate::error::{RegistryError, RegistryResult};

/// One registry operation with its arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    CreateAppDescriptor {
        descriptor_key: String,
        record: Vec<u8>,
    },
    CreateAppBundle {
        descriptor_key: String,
        bundle_key: String,
        record: Vec<u8>,
    },
    AssociateDescriptorWithBundle {
        descriptor_key: String,
        bundle_key: String,
    },
    GetAppDescriptors,
    GetAppBundleKeySetForDescriptor {
        descriptor_key: String,
    },
    GetAppBundleForDescriptor {
        descriptor_key: String,
        bundle_key: String,
    },
}

pub const CREATE_APP_DESCRIPTOR: &str = "createAppDescriptor";
pub const CREATE_APP_BUNDLE: &str = "createAppBundle";
pub const ASSOCIATE_DESCRIPTOR_WITH_BUNDLE: &str = "associateDescriptorWithBundle";
pub const GET_APP_DESCRIPTORS: &str = "getAppDescriptors";
pub const GET_APP_BUNDLE_KEY_SET_FOR_DESCRIPTOR: &str = "getAppBundleKeySetForDescriptor";
pub const GET_APP_BUNDLE_FOR_DESCRIPTOR: &str = "getAppBundleForDescriptor";

impl Command {
    /// Wire name of the command.
    pub fn name(&self) -> &'static str {
        match self {
            Command::CreateAppDescriptor { .. } => CREATE_APP_DESCRIPTOR,
            Command::CreateAppBundle { .. } => CREATE_APP_BUNDLE,
            Command::AssociateDescriptorWithBundle { .. } => ASSOCIATE_DESCRIPTOR_WITH_BUNDLE,
            Command::GetAppDescriptors => GET_APP_DESCRIPTORS,
            Command::GetAppBundleKeySetForDescriptor { .. } => GET_APP_BUNDLE_KEY_SET_FOR_DESCRIPTOR,
            Command::GetAppBundleForDescriptor { .. } => GET_APP_BUNDLE_FOR_DESCRIPTOR,
        }
    }

    /// Parse raw invocation arguments. `args[0]` is the command name.
    pub fn parse<A: AsRef<[u8]>>(args: &[A]) -> RegistryResult<Self> {
        let (name, rest) = args.split_first().ok_or(RegistryError::EmptyInvocation)?;
        let name = std::str::from_utf8(name.as_ref())
            .map_err(|_| RegistryError::UnknownCommand(String::from_utf8_lossy(name.as_ref()).into_owned()))?;

        let command = match name {
            CREATE_APP_DESCRIPTOR => {
                let [key, record] = positional::<_, 2>(CREATE_APP_DESCRIPTOR, rest)?;
                Command::CreateAppDescriptor {
                    descriptor_key: key_arg(key)?,
                    record: record.as_ref().to_vec(),
                }
            }
            CREATE_APP_BUNDLE => {
                let [descriptor, bundle, record] = positional::<_, 3>(CREATE_APP_BUNDLE, rest)?;
                Command::CreateAppBundle {
                    descriptor_key: key_arg(descriptor)?,
                    bundle_key: key_arg(bundle)?,
                    record: record.as_ref().to_vec(),
                }
            }
            ASSOCIATE_DESCRIPTOR_WITH_BUNDLE => {
                let [descriptor, bundle] = positional::<_, 2>(ASSOCIATE_DESCRIPTOR_WITH_BUNDLE, rest)?;
                Command::AssociateDescriptorWithBundle {
                    descriptor_key: key_arg(descriptor)?,
                    bundle_key: key_arg(bundle)?,
                }
            }
            GET_APP_DESCRIPTORS => {
                let [] = positional::<_, 0>(GET_APP_DESCRIPTORS, rest)?;
                Command::GetAppDescriptors
            }
            GET_APP_BUNDLE_KEY_SET_FOR_DESCRIPTOR => {
                let [descriptor] = positional::<_, 1>(GET_APP_BUNDLE_KEY_SET_FOR_DESCRIPTOR, rest)?;
                Command::GetAppBundleKeySetForDescriptor {
                    descriptor_key: key_arg(descriptor)?,
                }
            }
            GET_APP_BUNDLE_FOR_DESCRIPTOR => {
                let [descriptor, bundle] = positional::<_, 2>(GET_APP_BUNDLE_FOR_DESCRIPTOR, rest)?;
                Command::GetAppBundleForDescriptor {
                    descriptor_key: key_arg(descriptor)?,
                    bundle_key: key_arg(bundle)?,
                }
            }
            other => return Err(RegistryError::UnknownCommand(other.to_string())),
        };
        Ok(command)
    }
}

/// Require exactly `N` arguments after the command name.
fn positional<'a, A, const N: usize>(command: &'static str, rest: &'a [A]) -> RegistryResult<[&'a A; N]> {
    if rest.len() != N {
        return Err(RegistryError::ArgumentCount {
            command,
            expected: N,
            actual: rest.len(),
        });
    }
    Ok(std::array::from_fn(|i| &rest[i]))
}

fn key_arg<A: AsRef<[u8]>>(arg: &A) -> RegistryResult<String> {
    String::from_utf8(arg.as_ref().to_vec())
        .map_err(|_| RegistryError::Validation("key argument is not valid UTF-8".to_string()))
}
