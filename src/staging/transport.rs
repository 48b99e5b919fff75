//! Byte transfer from remote storage.

use std::collections::HashMap;
use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

use url::Url;

use super::StagingConfig;
use crate::util::{Error, Result};

/// Streams one remote object into a local sink.
///
/// Implementations must copy incrementally; a whole object is never held in
/// memory.
pub trait Transport: Send + Sync {
    /// Copy the object at `source` into `sink`. Returns the number of bytes.
    fn fetch(&self, source: &Url, sink: &mut dyn Write) -> Result<u64>;
}

/// `http`/`https` transport.
pub struct HttpTransport {
    agent: ureq::Agent,
}

impl HttpTransport {
    pub fn new() -> Self {
        Self {
            agent: ureq::AgentBuilder::new().build(),
        }
    }

    /// Transport whose transfers fail after `timeout`.
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            agent: ureq::AgentBuilder::new().timeout(timeout).build(),
        }
    }
}

impl Default for HttpTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for HttpTransport {
    fn fetch(&self, source: &Url, sink: &mut dyn Write) -> Result<u64> {
        let response = match self.agent.get(source.as_str()).call() {
            Ok(response) => response,
            Err(ureq::Error::Status(code, response)) => {
                return Err(Error::staging(
                    source.as_str(),
                    format!("HTTP {code} {}", response.status_text()),
                ));
            }
            Err(ureq::Error::Transport(err)) => return Err(Error::staging(source.as_str(), err)),
        };
        let mut reader = response.into_reader();
        std::io::copy(&mut reader, sink).map_err(|e| Error::staging(source.as_str(), e))
    }
}

/// Dispatches transfers by URI scheme.
#[derive(Clone, Default)]
pub struct TransportRegistry {
    by_scheme: HashMap<String, Arc<dyn Transport>>,
}

impl TransportRegistry {
    /// Registry without any transport.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the built-in `http`/`https` transport.
    pub fn with_defaults(config: &StagingConfig) -> Self {
        let http: Arc<dyn Transport> = match config.http_timeout_secs {
            Some(secs) => Arc::new(HttpTransport::with_timeout(Duration::from_secs(secs))),
            None => Arc::new(HttpTransport::new()),
        };
        Self::new()
            .with("http", Arc::clone(&http))
            .with("https", http)
    }

    /// Register `transport` for `scheme`, replacing any previous one.
    pub fn with(mut self, scheme: impl Into<String>, transport: Arc<dyn Transport>) -> Self {
        self.by_scheme.insert(scheme.into().to_ascii_lowercase(), transport);
        self
    }

    /// Transport registered for `scheme`.
    pub fn get(&self, scheme: &str) -> Option<&Arc<dyn Transport>> {
        self.by_scheme.get(scheme)
    }

    /// Registered schemes, sorted.
    pub fn schemes(&self) -> Vec<&str> {
        let mut schemes: Vec<&str> = self.by_scheme.keys().map(String::as_str).collect();
        schemes.sort_unstable();
        schemes
    }
}

impl Transport for TransportRegistry {
    fn fetch(&self, source: &Url, sink: &mut dyn Write) -> Result<u64> {
        match self.get(source.scheme()) {
            Some(transport) => transport.fetch(source, sink),
            None => Err(Error::staging(
                source.as_str(),
                format!("no transport registered for scheme '{}'", source.scheme()),
            )),
        }
    }
}
