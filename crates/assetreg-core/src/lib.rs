pub mod config;
pub mod proto;

pub use config::RegistryConfig;
pub use proto::*;
