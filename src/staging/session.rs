//! Host session abstraction.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use parking_lot::Mutex;

/// Callback run once when the session ends.
pub type ShutdownHook = Box<dyn FnOnce() + Send + 'static>;

/// The host a staging cache runs inside.
pub trait Session: Send + Sync {
    /// Working directory of the session.
    fn work_dir(&self) -> &Path;

    /// Unique id of the session.
    fn session_id(&self) -> &str;

    /// Register a callback to run at session end.
    fn on_shutdown(&self, hook: ShutdownHook);
}

/// In-process session.
///
/// Hooks run in registration order on [`LocalSession::shutdown`] or when the
/// session is dropped, whichever comes first.
pub struct LocalSession {
    work_dir: PathBuf,
    id: String,
    hooks: Mutex<Vec<ShutdownHook>>,
}

impl LocalSession {
    pub fn new(work_dir: impl Into<PathBuf>) -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos())
            .unwrap_or_default();
        let seq = COUNTER.fetch_add(1, Ordering::Relaxed);
        Self {
            work_dir: work_dir.into(),
            id: format!("{:x}-{nanos:x}-{seq}", std::process::id()),
            hooks: Mutex::new(Vec::new()),
        }
    }

    /// Number of hooks waiting to run.
    pub fn pending_hooks(&self) -> usize {
        self.hooks.lock().len()
    }

    /// Run and discard all registered hooks.
    pub fn shutdown(&self) {
        let hooks = std::mem::take(&mut *self.hooks.lock());
        if !hooks.is_empty() {
            tracing::debug!(session = %self.id, hooks = hooks.len(), "running shutdown hooks");
        }
        for hook in hooks {
            hook();
        }
    }
}

impl Session for LocalSession {
    fn work_dir(&self) -> &Path {
        &self.work_dir
    }

    fn session_id(&self) -> &str {
        &self.id
    }

    fn on_shutdown(&self, hook: ShutdownHook) {
        self.hooks.lock().push(hook);
    }
}

impl Drop for LocalSession {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_hooks_run_once_in_order() {
        let session = LocalSession::new("/work");
        let log = Arc::new(Mutex::new(Vec::new()));
        for i in 0..3 {
            let log = Arc::clone(&log);
            session.on_shutdown(Box::new(move || log.lock().push(i)));
        }
        assert_eq!(session.pending_hooks(), 3);

        session.shutdown();
        session.shutdown();
        assert_eq!(*log.lock(), vec![0, 1, 2]);
        assert_eq!(session.pending_hooks(), 0);
    }

    #[test]
    fn test_drop_runs_hooks() {
        let ran = Arc::new(Mutex::new(false));
        {
            let session = LocalSession::new("/work");
            let ran = Arc::clone(&ran);
            session.on_shutdown(Box::new(move || *ran.lock() = true));
        }
        assert!(*ran.lock());
    }

    #[test]
    fn test_ids_are_unique() {
        let a = LocalSession::new("/w");
        let b = LocalSession::new("/w");
        assert_ne!(a.session_id(), b.session_id());
        assert_eq!(a.work_dir(), Path::new("/w"));
    }
}
