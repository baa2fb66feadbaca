//! Wire records for the asset registry.
//!
//! Messages are annotated by hand with `prost` derives rather than generated
//! from a `.proto` file. Field tags are part of the stored format and must
//! never be renumbered.

use std::collections::HashMap;

use sha2::{Digest, Sha256};

// ── Entities ───────────────────────────────────────────────────────

/// Top-level registry entry for an application.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct AppDescriptor {
    /// Identity of the owner. Defaulted from the invoking identity.
    #[prost(bytes = "vec", tag = "1")]
    pub owner: Vec<u8>,
    #[prost(string, tag = "2")]
    pub description: String,
    /// Key of the associated bundle, empty until associated.
    #[prost(string, tag = "3")]
    pub bundle_key: String,
}

/// A package of artifacts and deployment specs scoped under one descriptor.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct AppBundle {
    #[prost(bytes = "vec", tag = "1")]
    pub owner: Vec<u8>,
    /// Descriptor this bundle belongs to.
    #[prost(string, tag = "2")]
    pub descriptor_key: String,
    #[prost(bytes = "vec", repeated, tag = "3")]
    pub artifacts: Vec<Vec<u8>>,
    #[prost(bytes = "vec", repeated, tag = "4")]
    pub deployment_specs: Vec<Vec<u8>>,
    /// Owner signatures over [`AppBundle::endorsement_payload`].
    #[prost(bytes = "vec", repeated, tag = "5")]
    pub owner_endorsements: Vec<Vec<u8>>,
}

impl AppBundle {
    /// True when the bundle carries at least one artifact or deployment spec.
    pub fn has_content(&self) -> bool {
        !self.artifacts.is_empty() || !self.deployment_specs.is_empty()
    }

    /// Bytes an endorser signs: artifacts, then deployment specs, then the
    /// endorser identity, concatenated in order.
    pub fn endorsement_payload(&self, endorser: &[u8]) -> Vec<u8> {
        let mut payload = Vec::new();
        for artifact in &self.artifacts {
            payload.extend_from_slice(artifact);
        }
        for spec in &self.deployment_specs {
            payload.extend_from_slice(spec);
        }
        payload.extend_from_slice(endorser);
        payload
    }

    /// Hex SHA-256 over the bundle content (artifacts then deployment specs).
    pub fn content_digest(&self) -> String {
        let mut hasher = Sha256::new();
        for artifact in &self.artifacts {
            hasher.update(artifact);
        }
        for spec in &self.deployment_specs {
            hasher.update(spec);
        }
        hex::encode(hasher.finalize())
    }
}

// ── Derived views ──────────────────────────────────────────────────

/// Bundle keys found under one descriptor. Never persisted.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct AppBundleKeySet {
    #[prost(string, tag = "1")]
    pub descriptor_key: String,
    #[prost(string, repeated, tag = "2")]
    pub bundle_keys: Vec<String>,
}

/// Every descriptor in the ledger, keyed by descriptor key.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct AppDescriptors {
    #[prost(map = "string, message", tag = "1")]
    pub descriptors: HashMap<String, AppDescriptor>,
}

// ── Queries ────────────────────────────────────────────────────────

/// Object types stored in the ledger. The tag string is the first
/// component of every composite key.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum ObjectType {
    AppDescriptor = 0,
    AppBundle = 1,
}

impl ObjectType {
    pub fn tag(self) -> &'static str {
        match self {
            ObjectType::AppDescriptor => "APP_DESCRIPTOR",
            ObjectType::AppBundle => "APP_BUNDLE",
        }
    }
}

/// A prefix query over one object type.
///
/// `offset`, `return_values` and `max_count` are carried for wire
/// compatibility only; the query engine returns every match.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Query {
    #[prost(enumeration = "ObjectType", tag = "1")]
    pub object_type: i32,
    #[prost(string, repeated, tag = "2")]
    pub key_parts: Vec<String>,
    #[prost(uint32, tag = "3")]
    pub offset: u32,
    #[prost(bool, tag = "4")]
    pub return_values: bool,
    #[prost(uint32, tag = "5")]
    pub max_count: u32,
}

impl Query {
    pub fn new(object_type: ObjectType, key_parts: Vec<String>) -> Self {
        Self {
            object_type: object_type as i32,
            key_parts,
            ..Default::default()
        }
    }
}

/// Matches of a [`Query`], keyed by the last key part of each stored key.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct QueryResult {
    #[prost(message, optional, tag = "1")]
    pub query: Option<Query>,
    #[prost(bool, tag = "2")]
    pub has_more: bool,
    #[prost(map = "string, bytes", tag = "3")]
    pub results: HashMap<String, Vec<u8>>,
}
