//! Deduplicating staging cache for remote container files.

use std::collections::{HashMap, HashSet};
use std::fs::{self, File};
use std::io::{BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Once};

use parking_lot::Mutex;
use url::Url;

use super::source::{self, Source};
use super::{Session, StagingConfig, Transport, TransportRegistry};
use crate::util::{Error, Result};

/// Suffix of a file being transferred; renamed away on success.
const PARTIAL_SUFFIX: &str = ".part";

/// Turns source paths into locally readable paths.
///
/// Local paths pass through. Remote URIs are downloaded once into
/// `<cache root>/<key[..2]>/<key[2..]>/<file name>`, where the key is the
/// SHA-256 of the URI, and deleted again when the owning session shuts down.
///
/// Downloads of one cache directory are serialized by a per-directory lock;
/// unrelated downloads run in parallel.
pub struct StagingCache {
    tracked: Arc<Tracked>,
    transport: Arc<dyn Transport>,
    session: Arc<dyn Session>,
    locks: Mutex<HashMap<PathBuf, Arc<Mutex<()>>>>,
    hook: Once,
}

/// Files staged in this session, shared with the shutdown hook.
struct Tracked {
    root: PathBuf,
    files: Mutex<HashSet<PathBuf>>,
}

impl StagingCache {
    /// Cache with the built-in transports.
    pub fn new(config: StagingConfig, session: Arc<dyn Session>) -> Result<Self> {
        let transport = Arc::new(TransportRegistry::with_defaults(&config));
        Self::with_transport(config, session, transport)
    }

    /// Cache with a custom transport.
    ///
    /// Fails with [`Error::Config`] if the namespace would escape the temp
    /// root.
    pub fn with_transport(
        config: StagingConfig,
        session: Arc<dyn Session>,
        transport: Arc<dyn Transport>,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            tracked: Arc::new(Tracked {
                root: config.cache_root(),
                files: Mutex::new(HashSet::new()),
            }),
            transport,
            session,
            locks: Mutex::new(HashMap::new()),
            hook: Once::new(),
        })
    }

    /// Root directory of all cache entries.
    #[inline]
    pub fn root(&self) -> &Path {
        &self.tracked.root
    }

    /// Return a local path for `path`, downloading it first if it is remote.
    pub fn stage(&self, path: &str) -> Result<PathBuf> {
        let url = match Source::parse(path)? {
            Source::Local(local) => return Ok(local),
            Source::Remote(url) => url,
        };
        let target = source::cache_path(self.root(), &url)?;
        self.register_hook();

        if target.exists() {
            tracing::debug!(source = %url, path = %target.display(), "staging cache hit");
            self.tracked.add(&target);
            return Ok(target);
        }

        let dir = match target.parent() {
            Some(dir) => dir.to_path_buf(),
            None => return Err(Error::invalid_path(path, "cache path has no parent")),
        };
        let lock = self.lock_for(&dir);
        let result = {
            let _guard = lock.lock();
            self.stage_locked(&url, &dir, &target)
        };
        self.release_lock(&dir, lock);
        result.map(|()| target)
    }

    /// Files currently tracked for cleanup.
    pub fn tracked_files(&self) -> Vec<PathBuf> {
        self.tracked.files.lock().iter().cloned().collect()
    }

    /// Number of live per-directory locks.
    pub fn lock_count(&self) -> usize {
        self.locks.lock().len()
    }

    /// Delete every tracked file and prune empty directories below the root.
    ///
    /// Returns the number of files removed. Never fails; a second call
    /// without new stagings does nothing.
    pub fn cleanup(&self) -> usize {
        self.tracked.cleanup()
    }

    fn stage_locked(&self, url: &Url, dir: &Path, target: &Path) -> Result<()> {
        // Another caller may have finished while we waited for the lock.
        if target.exists() {
            tracing::debug!(source = %url, "staged by concurrent caller");
        } else {
            fs::create_dir_all(dir).map_err(|e| Error::staging(url.as_str(), e))?;
            self.download(url, target)?;
        }
        self.tracked.add(target);
        Ok(())
    }

    fn download(&self, url: &Url, target: &Path) -> Result<()> {
        let mut partial = target.as_os_str().to_owned();
        partial.push(PARTIAL_SUFFIX);
        let partial = PathBuf::from(partial);

        tracing::info!(source = %url, path = %target.display(), "staging remote file");
        let written = self.transfer(url, &partial).and_then(|bytes| {
            fs::rename(&partial, target).map_err(|e| Error::staging(url.as_str(), e))?;
            Ok(bytes)
        });

        match written {
            Ok(bytes) => {
                tracing::info!(source = %url, bytes, "staged remote file");
                Ok(())
            }
            Err(e) => {
                if let Err(rm) = fs::remove_file(&partial) {
                    if rm.kind() != ErrorKind::NotFound {
                        tracing::warn!(path = %partial.display(), error = %rm, "cannot remove partial file");
                    }
                }
                Err(e)
            }
        }
    }

    fn transfer(&self, url: &Url, partial: &Path) -> Result<u64> {
        let file = File::create(partial).map_err(|e| Error::staging(url.as_str(), e))?;
        let mut sink = BufWriter::new(file);
        let bytes = self.transport.fetch(url, &mut sink).map_err(|e| match e {
            Error::Staging { .. } => e,
            other => Error::staging(url.as_str(), other),
        })?;
        sink.flush().map_err(|e| Error::staging(url.as_str(), e))?;
        sink.get_ref()
            .sync_all()
            .map_err(|e| Error::staging(url.as_str(), e))?;
        Ok(bytes)
    }

    fn register_hook(&self) {
        self.hook.call_once(|| {
            let tracked = Arc::clone(&self.tracked);
            self.session.on_shutdown(Box::new(move || {
                tracked.cleanup();
            }));
            tracing::debug!(session = self.session.session_id(), "registered staging cleanup hook");
        });
    }

    fn lock_for(&self, dir: &Path) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock();
        Arc::clone(locks.entry(dir.to_path_buf()).or_default())
    }

    fn release_lock(&self, dir: &Path, lock: Arc<Mutex<()>>) {
        let mut locks = self.locks.lock();
        drop(lock);
        // Clones are only handed out under the table lock, so a lone table
        // reference means nobody else is waiting on this directory.
        if locks.get(dir).is_some_and(|entry| Arc::strong_count(entry) == 1) {
            locks.remove(dir);
        }
    }
}

impl Tracked {
    fn add(&self, path: &Path) {
        self.files.lock().insert(path.to_path_buf());
    }

    fn cleanup(&self) -> usize {
        let files = std::mem::take(&mut *self.files.lock());
        let mut removed = 0;
        for file in files {
            match fs::remove_file(&file) {
                Ok(()) => removed += 1,
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => {
                    tracing::warn!(path = %file.display(), error = %e, "cannot delete staged file");
                }
            }
            self.prune(&file);
        }
        if removed > 0 {
            tracing::debug!(root = %self.root.display(), removed, "staging cache cleaned up");
        }
        removed
    }

    /// Remove empty ancestors of `file`, stopping below the root.
    fn prune(&self, file: &Path) {
        let mut dir = file.parent();
        while let Some(current) = dir {
            if current == self.root.as_path() || !current.starts_with(&self.root) {
                break;
            }
            match fs::read_dir(current) {
                Ok(mut entries) => {
                    if entries.next().is_some() {
                        break;
                    }
                }
                Err(e) if e.kind() == ErrorKind::NotFound => {
                    dir = current.parent();
                    continue;
                }
                Err(e) => {
                    tracing::warn!(path = %current.display(), error = %e, "cannot inspect cache directory");
                    break;
                }
            }
            if let Err(e) = fs::remove_dir(current) {
                tracing::warn!(path = %current.display(), error = %e, "cannot delete cache directory");
                break;
            }
            dir = current.parent();
        }
    }
}
