//! Remote file staging.
//!
//! Container files can only be read from a local filesystem. Sources given as
//! `s3://`, `gs://`, `az://`, `http(s)://` or `ftp://` URIs are copied into a
//! content-addressed cache directory first:
//!
//! ```text
//! <temp_root>/<namespace>/<sha256[..2]>/<sha256[2..]>/<file name>
//! ```
//!
//! Staged files live as long as the [`Session`] that owns the cache. The
//! cache registers a single shutdown hook that deletes them and prunes the
//! empty directories it created.

mod cache;
mod config;
mod session;
mod source;
mod transport;

pub use cache::StagingCache;
pub use config::{StagingConfig, ENV_NAMESPACE, ENV_ROOT};
pub use session::{LocalSession, Session, ShutdownHook};
pub use source::{cache_key, cache_path, file_name, Source, REMOTE_SCHEMES};
pub use transport::{HttpTransport, Transport, TransportRegistry};
