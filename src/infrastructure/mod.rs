//! Outward-facing adapters: cache store, artifact registry, logging, config

pub mod cache;
pub mod config;
pub mod logging;
pub mod publish;

pub use cache::{CacheError, CachePresence, CacheStore};
pub use config::Config;
pub use logging::init_logging;
pub use publish::{Artifact, Credential, DirRegistry, PublishError, PublishReceipt, Publisher};
