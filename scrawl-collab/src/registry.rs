//! Process-wide mapping from document id to live session.
//!
//! ```text
//! "g8hr3K" ──hash──► stripe 5 ──► Arc<Session> ──► drivers
//! "x2Qpf9" ──hash──► stripe 11 ─► Arc<Session> ──► drivers
//! ```
//!
//! The map is split into 16 stripes so documents on different stripes never
//! contend. Creation is double-checked under the stripe's write lock:
//! racing callers all receive the same session and exactly one constructs
//! it. Archive reads for seeding happen before the lock is taken.
//!
//! A janitor task evicts sessions whose roster has been empty past the
//! quiescence interval, compacts long logs of idle documents, and sweeps
//! expired archive blobs.

use std::collections::hash_map::{DefaultHasher, Entry};
use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::sync::{Arc, RwLock};
use std::time::Duration;

use log::{debug, error, info, warn};

use crate::archive::ArchiveStore;
use crate::session::Session;

const STRIPES: usize = 16;

/// How often a changed document is written back to the archive.
const PERSIST_INTERVAL: Duration = Duration::from_secs(3);

/// Upper bound between janitor sweeps.
const SWEEP_INTERVAL: Duration = Duration::from_secs(3600);

/// Idle sessions with logs past this length get compacted in place.
const COMPACT_THRESHOLD: u64 = 1024;

/// Aggregate counters over every live session.
#[derive(Debug, Clone, Copy, Default)]
pub struct RegistryStats {
    pub sessions: usize,
    pub participants: usize,
    pub operations: u64,
    pub logged_bytes: u64,
}

/// The striped `{document id → session}` map.
pub struct Registry {
    stripes: Vec<RwLock<HashMap<String, Arc<Session>>>>,
    archive: Option<Arc<ArchiveStore>>,
}

impl Registry {
    pub fn new(archive: Option<Arc<ArchiveStore>>) -> Self {
        Self {
            stripes: (0..STRIPES).map(|_| RwLock::new(HashMap::new())).collect(),
            archive,
        }
    }

    fn stripe(&self, id: &str) -> &RwLock<HashMap<String, Arc<Session>>> {
        let mut hasher = DefaultHasher::new();
        id.hash(&mut hasher);
        &self.stripes[hasher.finish() as usize % STRIPES]
    }

    /// The live session for `id`, if one exists.
    pub fn get(&self, id: &str) -> Option<Arc<Session>> {
        self.stripe(id).read().unwrap().get(id).cloned()
    }

    /// The session for `id`, creating (and seeding) it on first use.
    ///
    /// Racing callers all receive the same session; the archive read for
    /// seeding runs before the stripe lock is taken, and a session built by
    /// the loser of the race is simply dropped.
    pub fn get_or_create(self: &Arc<Self>, id: &str) -> Arc<Session> {
        if let Some(session) = self.get(id) {
            return session;
        }
        let fresh = Arc::new(self.build(id));
        let mut stripe = self.stripe(id).write().unwrap();
        match stripe.entry(id.to_owned()) {
            Entry::Occupied(existing) => existing.get().clone(),
            Entry::Vacant(slot) => {
                slot.insert(fresh.clone());
                if let Some(archive) = &self.archive {
                    tokio::spawn(persist_loop(
                        id.to_owned(),
                        fresh.clone(),
                        archive.clone(),
                    ));
                }
                debug!("created session for document {id}");
                fresh
            }
        }
    }

    fn build(&self, id: &str) -> Session {
        let Some(archive) = &self.archive else {
            return Session::new();
        };
        match archive.load(id) {
            Ok(Some(document)) => {
                info!(
                    "seeded document {id} from the archive ({} bytes)",
                    document.text.len()
                );
                Session::from_snapshot(document.text, document.language)
            }
            Ok(None) => Session::new(),
            Err(e) => {
                // seeding is best-effort: the document opens empty
                warn!("archive seed for document {id} failed: {e}");
                Session::new()
            }
        }
    }

    /// Kill and remove every session whose roster has been empty for at
    /// least `quiescence`. Returns how many were evicted.
    pub fn evict_quiescent(&self, quiescence: Duration) -> usize {
        let mut evicted = 0;
        for stripe in &self.stripes {
            let mut map = stripe.write().unwrap();
            map.retain(|id, session| {
                if session.quiescent_for(quiescence) {
                    session.kill();
                    info!("evicted quiescent document {id}");
                    evicted += 1;
                    false
                } else {
                    true
                }
            });
        }
        evicted
    }

    /// Compact idle sessions whose logs have grown past `threshold`.
    pub fn compact_idle(&self, threshold: u64) -> usize {
        let mut compacted = 0;
        for stripe in &self.stripes {
            for (id, session) in stripe.read().unwrap().iter() {
                if session.participant_count() == 0
                    && session.revision() > threshold
                    && session.compact()
                {
                    debug!("compacted idle document {id}");
                    compacted += 1;
                }
            }
        }
        compacted
    }

    /// Aggregate counters for `/api/stats`.
    pub fn stats(&self) -> RegistryStats {
        let mut totals = RegistryStats::default();
        for stripe in &self.stripes {
            for session in stripe.read().unwrap().values() {
                let stats = session.stats();
                totals.sessions += 1;
                totals.participants += stats.participants;
                totals.operations += stats.revision;
                totals.logged_bytes += stats.logged_bytes;
            }
        }
        totals
    }

    pub fn archive(&self) -> Option<&Arc<ArchiveStore>> {
        self.archive.as_ref()
    }
}

/// Periodic write-back of one document to the archive. Runs until the
/// session is killed, then flushes whatever is still unwritten.
async fn persist_loop(id: String, session: Arc<Session>, archive: Arc<ArchiveStore>) {
    // spread ticks so documents don't all hit the disk on the same beat
    let mut hasher = DefaultHasher::new();
    id.hash(&mut hasher);
    let interval = PERSIST_INTERVAL + Duration::from_millis(hasher.finish() % 1000);

    let mut persisted = session.revision();
    while !session.killed() {
        tokio::time::sleep(interval).await;
        persisted = persist_once(&id, &session, &archive, persisted);
    }
    persist_once(&id, &session, &archive, persisted);
}

fn persist_once(id: &str, session: &Session, archive: &ArchiveStore, persisted: u64) -> u64 {
    let revision = session.revision();
    if revision <= persisted {
        return persisted;
    }
    let (text, language) = session.snapshot();
    match archive.store(id, &text, language.as_deref()) {
        Ok(()) => {
            debug!("persisted revision {revision} of document {id}");
            revision
        }
        Err(e) => {
            error!("persisting document {id}: {e}");
            persisted
        }
    }
}

/// Background sweep: evict quiescent sessions, compact idle logs, drop
/// expired archive blobs.
pub async fn run_janitor(registry: Arc<Registry>, quiescence: Duration) {
    let interval = quiescence.clamp(Duration::from_secs(1), SWEEP_INTERVAL);
    loop {
        tokio::time::sleep(interval).await;
        let evicted = registry.evict_quiescent(quiescence);
        let compacted = registry.compact_idle(COMPACT_THRESHOLD);
        if evicted > 0 || compacted > 0 {
            info!("janitor: evicted {evicted}, compacted {compacted}");
        }
        if let Some(archive) = registry.archive() {
            match archive.cleanup_expired() {
                Ok(swept) if swept > 0 => info!("janitor: swept {swept} expired archive blobs"),
                Ok(_) => {}
                Err(e) => error!("archive sweep: {e}"),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::ArchiveConfig;

    fn registry() -> Arc<Registry> {
        Arc::new(Registry::new(None))
    }

    #[test]
    fn test_get_or_create_returns_same_session() {
        let registry = registry();
        let first = registry.get_or_create("doc");
        let second = registry.get_or_create("doc");
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn test_documents_are_isolated() {
        let registry = registry();
        let a = registry.get_or_create("doc-a");
        let b = registry.get_or_create("doc-b");
        assert!(!Arc::ptr_eq(&a, &b));

        let participant = a.attach();
        a.submit(participant, 0, {
            let mut op = scrawl_ot::TextOperation::new();
            op.insert("only in a");
            op
        })
        .unwrap();
        assert_eq!(b.text(), "");
    }

    #[test]
    fn test_get_misses_unknown_documents() {
        let registry = registry();
        assert!(registry.get("nope").is_none());
        registry.get_or_create("yes");
        assert!(registry.get("yes").is_some());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_racing_creation_yields_one_session() {
        let registry = registry();
        let mut handles = Vec::new();
        for _ in 0..16 {
            let registry = registry.clone();
            handles.push(tokio::spawn(async move {
                registry.get_or_create("contested")
            }));
        }
        let mut sessions = Vec::new();
        for handle in handles {
            sessions.push(handle.await.unwrap());
        }
        for session in &sessions {
            assert!(Arc::ptr_eq(session, &sessions[0]));
        }
    }

    #[test]
    fn test_eviction_kills_quiescent_sessions() {
        let registry = registry();
        let session = registry.get_or_create("stale");
        assert_eq!(registry.evict_quiescent(Duration::ZERO), 1);
        assert!(session.killed());
        assert!(registry.get("stale").is_none());
    }

    #[test]
    fn test_eviction_spares_attached_sessions() {
        let registry = registry();
        let session = registry.get_or_create("busy");
        let _participant = session.attach();
        assert_eq!(registry.evict_quiescent(Duration::ZERO), 0);
        assert!(registry.get("busy").is_some());
    }

    #[tokio::test]
    async fn test_seed_from_archive() {
        let dir = tempfile::tempdir().unwrap();
        let archive = Arc::new(
            ArchiveStore::open(ArchiveConfig {
                root: dir.path().to_path_buf(),
                ..ArchiveConfig::default()
            })
            .unwrap(),
        );
        archive.store("persisted", "saved text", Some("md")).unwrap();

        let registry = Arc::new(Registry::new(Some(archive)));
        let session = registry.get_or_create("persisted");
        assert_eq!(session.revision(), 1);
        assert_eq!(session.text(), "saved text");

        let fresh = registry.get_or_create("brand-new");
        assert_eq!(fresh.revision(), 0);
    }

    #[test]
    fn test_compact_idle_respects_threshold() {
        let registry = registry();
        let session = registry.get_or_create("long-log");
        let participant = session.attach();
        for i in 0..4u64 {
            session
                .submit(participant, i, {
                    let mut op = scrawl_ot::TextOperation::new();
                    op.retain(i);
                    op.insert("x");
                    op
                })
                .unwrap();
        }
        session.detach(participant);

        assert_eq!(registry.compact_idle(10), 0); // under threshold
        assert_eq!(registry.compact_idle(2), 1);
        assert_eq!(session.revision(), 1);
        assert_eq!(session.text(), "xxxx");
    }

    #[test]
    fn test_stats_aggregate_across_documents() {
        let registry = registry();
        let a = registry.get_or_create("one");
        let b = registry.get_or_create("two");
        let pa = a.attach();
        let _pb = b.attach();
        a.submit(pa, 0, {
            let mut op = scrawl_ot::TextOperation::new();
            op.insert("hello");
            op
        })
        .unwrap();

        let stats = registry.stats();
        assert_eq!(stats.sessions, 2);
        assert_eq!(stats.participants, 2);
        assert_eq!(stats.operations, 1);
        assert_eq!(stats.logged_bytes, 5);
    }
}
