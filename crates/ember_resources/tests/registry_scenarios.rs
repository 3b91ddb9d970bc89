//! # Resource Registry Verification Tests
//!
//! 1. **Dedup**: one entry per path, refcounts add up, release unloads
//! 2. **Async**: one loader call per path, bounded workers, callbacks on completion
//! 3. **Cancellation**: releasing a pending load resolves it as cancelled
//! 4. **Hot-reload**: newer files are reloaded, broken files keep old data,
//!    edits racing a load are still picked up
//!
//! Run with: cargo test -p ember_resources --test registry_scenarios

use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant, SystemTime};

use ember_resources::{
    read_bytes, FileSystem, LoadOutcome, LoadState, LoadedResource, MemoryFileSystem,
    RegistryConfig, ResourceError, ResourceGuard, ResourceHandle, ResourceKind, ResourceLoader,
    ResourceRegistry, ResourceResult,
};
use parking_lot::Mutex;

const IDLE_TIMEOUT: Duration = Duration::from_secs(5);

// ============================================================================
// COUNTING LOADER
// ============================================================================

/// Counts calls and can hold loads until opened.
struct LoadCounter {
    loads: AtomicUsize,
    reads: AtomicUsize,
    unloads: AtomicUsize,
    open: AtomicBool,
}

impl LoadCounter {
    fn new(open: bool) -> Arc<Self> {
        Arc::new(Self {
            loads: AtomicUsize::new(0),
            reads: AtomicUsize::new(0),
            unloads: AtomicUsize::new(0),
            open: AtomicBool::new(open),
        })
    }

    fn loads(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }

    /// Loads that have finished reading their file.
    fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    fn unloads(&self) -> usize {
        self.unloads.load(Ordering::SeqCst)
    }

    fn open(&self) {
        self.open.store(true, Ordering::SeqCst);
    }
}

struct CountingLoader(Arc<LoadCounter>);

impl ResourceLoader for CountingLoader {
    fn name(&self) -> &str {
        "counting"
    }

    fn extensions(&self) -> &[&str] {
        &["dat"]
    }

    fn load(&self, path: &Path, fs: &dyn FileSystem) -> ResourceResult<LoadedResource> {
        self.0.loads.fetch_add(1, Ordering::SeqCst);
        while !self.0.open.load(Ordering::SeqCst) {
            thread::sleep(Duration::from_millis(1));
        }
        let text = String::from_utf8_lossy(&read_bytes(path, fs)?).into_owned();
        self.0.reads.fetch_add(1, Ordering::SeqCst);
        let size = text.len();
        Ok(LoadedResource::new(text, size))
    }

    fn unload(&self, _resource: LoadedResource) {
        self.0.unloads.fetch_add(1, Ordering::SeqCst);
    }
}

fn setup(config: RegistryConfig, counter: &Arc<LoadCounter>) -> (ResourceRegistry, Arc<MemoryFileSystem>) {
    let fs = Arc::new(MemoryFileSystem::new());
    let registry = ResourceRegistry::with_file_system(config, fs.clone()).unwrap();
    registry.register_loader(CountingLoader(Arc::clone(counter)));
    (registry, fs)
}

fn wait_until(condition: impl Fn() -> bool) -> bool {
    let start = Instant::now();
    while start.elapsed() < IDLE_TIMEOUT {
        if condition() {
            return true;
        }
        thread::sleep(Duration::from_millis(1));
    }
    false
}

type Observed = Arc<Mutex<Vec<(ResourceHandle, LoadOutcome)>>>;

fn recorder(observed: &Observed) -> impl FnOnce(ResourceHandle, LoadOutcome) + Send + 'static {
    let observed = Arc::clone(observed);
    move |handle, outcome| observed.lock().push((handle, outcome))
}

// ============================================================================
// SYNCHRONOUS LOADS
// ============================================================================

#[test]
fn verify_sync_load_dedup() {
    let counter = LoadCounter::new(true);
    let (registry, fs) = setup(RegistryConfig::default(), &counter);
    fs.insert("/x.png", vec![7u8; 32]);

    let h1 = registry.load("/x.png", ResourceKind::Texture);
    let h2 = registry.load("/x.png", ResourceKind::Texture);
    assert!(h1.is_valid());
    assert_eq!(h1, h2);
    assert_eq!(registry.ref_count(h1), 2);
    assert_eq!(registry.len(), 1);

    registry.release(h1);
    assert_eq!(registry.ref_count(h1), 1);
    assert!(registry.get(h1).is_some());

    registry.release(h1);
    assert!(registry.get(h1).is_none());
    assert!(registry.find("/x.png").is_none());
    assert!(registry.is_empty());

    // already gone
    registry.release(h1);
    registry.release(ResourceHandle::INVALID);
}

#[test]
fn verify_every_load_released_once_unloads() {
    let counter = LoadCounter::new(true);
    let (registry, fs) = setup(RegistryConfig::default(), &counter);
    let paths = ["/a.dat", "/b.dat", "/c.dat"];
    for path in paths {
        fs.insert(path, path.as_bytes().to_vec());
    }

    let mut handles = Vec::new();
    for round in 0..4 {
        for path in &paths[..=round % paths.len()] {
            handles.push(registry.load(path, ResourceKind::Unknown));
        }
    }
    assert_eq!(counter.loads(), paths.len());
    assert_eq!(handles.len(), 1 + 2 + 3 + 1);

    for handle in handles.iter().rev() {
        assert!(registry.get(*handle).is_some());
        registry.release(*handle);
    }
    assert!(registry.is_empty());
    assert_eq!(counter.unloads(), paths.len());
    assert!(handles.iter().all(|&handle| registry.get(handle).is_none()));
}

#[test]
fn verify_guard_holds_reference() {
    let counter = LoadCounter::new(true);
    let (registry, fs) = setup(RegistryConfig::default(), &counter);
    fs.insert("/level.dat", "level one");

    let handle = registry.load("/level.dat", ResourceKind::Scene);
    {
        let guard = ResourceGuard::new(&registry, handle);
        assert_eq!(registry.ref_count(handle), 2);
        assert_eq!(guard.get_as::<String>().as_deref().map(String::as_str), Some("level one"));
    }
    assert_eq!(registry.ref_count(handle), 1);

    let moved = {
        let guard = ResourceGuard::new(&registry, handle);
        guard
    };
    assert_eq!(registry.ref_count(moved.handle()), 2);
    drop(moved);
    registry.release(handle);
    assert_eq!(counter.unloads(), 1);
}

// ============================================================================
// ASYNCHRONOUS LOADS
// ============================================================================

#[test]
fn verify_async_dedup_invokes_loader_once() {
    const CALLERS: usize = 8;
    let counter = LoadCounter::new(false);
    let (registry, fs) = setup(RegistryConfig::default(), &counter);
    fs.insert("/shared.dat", "payload");

    let observed: Observed = Arc::default();
    let handles: Vec<_> = (0..CALLERS)
        .map(|_| registry.load_async("/shared.dat", ResourceKind::Unknown, recorder(&observed)))
        .collect();

    assert!(handles.windows(2).all(|pair| pair[0] == pair[1]));
    assert_eq!(registry.ref_count(handles[0]), CALLERS as u32);
    assert!(registry.get(handles[0]).is_none());
    assert!(observed.lock().is_empty());

    counter.open();
    assert!(registry.tick_until_idle(IDLE_TIMEOUT));

    assert_eq!(counter.loads(), 1);
    let observed = observed.lock();
    assert_eq!(observed.len(), CALLERS);
    assert!(observed
        .iter()
        .all(|(handle, outcome)| *handle == handles[0] && outcome.is_loaded()));
    assert_eq!(
        registry.get_as::<String>(handles[0]).as_deref().map(String::as_str),
        Some("payload")
    );
}

#[test]
fn verify_async_respects_max_concurrent() {
    let counter = LoadCounter::new(false);
    let config = RegistryConfig {
        max_concurrent: 2,
        ..RegistryConfig::default()
    };
    let (registry, fs) = setup(config, &counter);

    let observed: Observed = Arc::default();
    let handles: Vec<_> = (0..5)
        .map(|i| {
            let path = format!("/chunk{i}.dat");
            fs.insert(&path, format!("chunk {i}"));
            registry.load_async(&path, ResourceKind::Unknown, recorder(&observed))
        })
        .collect();

    assert!(wait_until(|| counter.loads() == 2));
    thread::sleep(Duration::from_millis(20));
    registry.tick();
    assert_eq!(counter.loads(), 2);

    let stats = registry.stats();
    assert_eq!(stats.loading, 2);
    assert_eq!(stats.queued, 3);
    assert_eq!(registry.pending_count(), 5);
    assert_eq!(registry.load_state(handles[4]), Some(LoadState::Queued));

    counter.open();
    assert!(registry.tick_until_idle(IDLE_TIMEOUT));

    assert_eq!(counter.loads(), 5);
    assert_eq!(registry.stats().loaded, 5);
    let observed = observed.lock();
    assert_eq!(observed.len(), 5);
    assert!(observed.iter().all(|(_, outcome)| outcome.is_loaded()));
}

#[test]
fn verify_callbacks_wait_for_tick() {
    let counter = LoadCounter::new(true);
    let (registry, fs) = setup(RegistryConfig::default(), &counter);
    fs.insert("/ready.dat", "r");

    let observed: Observed = Arc::default();
    let handle = registry.load_async("/ready.dat", ResourceKind::Unknown, recorder(&observed));
    assert!(wait_until(|| counter.loads() == 1));
    thread::sleep(Duration::from_millis(20));

    // finished on the worker, not yet observed
    assert!(observed.lock().is_empty());
    assert_eq!(registry.load_state(handle), Some(LoadState::Loading));

    assert!(registry.tick_until_idle(IDLE_TIMEOUT));
    assert_eq!(observed.lock().len(), 1);

    // already loaded: reported on the next tick
    let again = registry.load_async("/ready.dat", ResourceKind::Unknown, recorder(&observed));
    assert_eq!(again, handle);
    assert_eq!(observed.lock().len(), 1);
    registry.tick();
    assert_eq!(observed.lock().len(), 2);
    assert_eq!(registry.ref_count(handle), 2);
}

#[test]
fn verify_async_failures_are_reported() {
    let counter = LoadCounter::new(true);
    let (registry, fs) = setup(RegistryConfig::default(), &counter);
    fs.insert("/broken.toml", "x = = 1");

    let observed: Observed = Arc::default();
    let missing = registry.load_async("/missing.png", ResourceKind::Texture, recorder(&observed));
    assert_eq!(missing, ResourceHandle::INVALID);

    let broken = registry.load_async("/broken.toml", ResourceKind::Unknown, recorder(&observed));
    assert!(broken.is_valid());
    assert!(registry.tick_until_idle(IDLE_TIMEOUT));

    {
        let observed = observed.lock();
        assert_eq!(observed.len(), 2);
        assert!(matches!(
            &observed[0],
            (ResourceHandle::INVALID, LoadOutcome::Failed(ResourceError::NotFound(_)))
        ));
        assert!(matches!(
            &observed[1],
            (handle, LoadOutcome::Failed(ResourceError::Rejected { .. })) if *handle == broken
        ));
    }

    assert_eq!(registry.load_state(broken), Some(LoadState::Failed));
    assert!(registry.get(broken).is_none());
    assert_eq!(registry.stats().failed, 1);

    // a later load retries
    fs.insert("/broken.toml", "x = 1");
    assert_eq!(registry.load("/broken.toml", ResourceKind::Unknown), broken);
    assert!(registry.is_loaded(broken));
    assert_eq!(registry.ref_count(broken), 2);
}

#[test]
fn verify_release_cancels_pending_load() {
    let counter = LoadCounter::new(false);
    let config = RegistryConfig {
        max_concurrent: 1,
        ..RegistryConfig::default()
    };
    let (registry, fs) = setup(config, &counter);
    fs.insert("/running.dat", "a");
    fs.insert("/queued.dat", "b");

    let observed: Observed = Arc::default();
    let running = registry.load_async("/running.dat", ResourceKind::Unknown, recorder(&observed));
    let queued = registry.load_async("/queued.dat", ResourceKind::Unknown, recorder(&observed));
    assert_eq!(registry.load_state(running), Some(LoadState::Loading));
    assert_eq!(registry.load_state(queued), Some(LoadState::Queued));

    registry.release(running);
    assert!(registry.unload(queued));
    assert!(registry.is_empty());

    registry.tick();
    {
        let observed = observed.lock();
        assert_eq!(observed.len(), 2);
        assert!(observed
            .iter()
            .all(|(_, outcome)| *outcome == LoadOutcome::Cancelled));
    }

    // the running worker's result is handed back to the loader
    counter.open();
    assert!(registry.tick_until_idle(IDLE_TIMEOUT));
    assert_eq!(counter.loads(), 1);
    assert_eq!(counter.unloads(), 1);
    assert!(registry.find("/running.dat").is_none());
}

#[test]
fn verify_drop_cancels_outstanding_callbacks() {
    let counter = LoadCounter::new(false);
    let (registry, fs) = setup(RegistryConfig::default(), &counter);
    fs.insert("/late.dat", "z");

    let observed: Observed = Arc::default();
    registry.load_async("/late.dat", ResourceKind::Unknown, recorder(&observed));
    drop(registry);
    counter.open();

    let observed = observed.lock();
    assert_eq!(observed.len(), 1);
    assert_eq!(observed[0].1, LoadOutcome::Cancelled);
}

// ============================================================================
// HOT-RELOAD
// ============================================================================

fn hot_reload_config() -> RegistryConfig {
    RegistryConfig {
        hot_reload: true,
        hot_reload_interval_ms: 10,
        ..RegistryConfig::default()
    }
}

#[test]
fn verify_hot_reload_picks_up_newer_file() {
    let counter = LoadCounter::new(true);
    let (registry, fs) = setup(hot_reload_config(), &counter);
    let t0 = SystemTime::UNIX_EPOCH + Duration::from_secs(1_000);
    fs.insert_with_mtime("/cfg.json", b"{\"v\":1}".to_vec(), t0);

    let handle = registry.load("/cfg.json", ResourceKind::Config);
    assert_eq!(registry.info(handle).unwrap().modified, Some(t0));

    assert!(fs.update("/cfg.json", b"{\"v\":2}".to_vec(), Duration::from_secs(1)));
    let reloaded = wait_until(|| {
        registry.tick();
        registry.get_as::<Vec<u8>>(handle).as_deref() == Some(&b"{\"v\":2}".to_vec())
    });
    assert!(reloaded);

    let info = registry.info(handle).unwrap();
    assert_eq!(info.ref_count, 1);
    assert_eq!(info.modified, Some(t0 + Duration::from_secs(1)));
    assert_eq!(info.state, LoadState::Loaded);
}

#[test]
fn verify_hot_reload_keeps_data_when_file_breaks() {
    let counter = LoadCounter::new(true);
    let (registry, fs) = setup(RegistryConfig::default(), &counter);
    let t0 = SystemTime::UNIX_EPOCH + Duration::from_secs(1_000);
    fs.insert_with_mtime("/game.toml", "lives = 3", t0);
    let handle = registry.load("/game.toml", ResourceKind::Unknown);

    fs.insert_with_mtime("/game.toml", "lives = = 4", t0 + Duration::from_secs(2));
    assert_eq!(registry.check_for_changes(), 0);

    let table = registry.get_as::<toml::Table>(handle).unwrap();
    assert_eq!(table["lives"].as_integer(), Some(3));
    assert_eq!(registry.info(handle).unwrap().modified, Some(t0));

    fs.insert_with_mtime("/game.toml", "lives = 5", t0 + Duration::from_secs(3));
    assert_eq!(registry.check_for_changes(), 1);
    let table = registry.get_as::<toml::Table>(handle).unwrap();
    assert_eq!(table["lives"].as_integer(), Some(5));
}

#[test]
fn verify_hot_reload_disabled_leaves_data() {
    let counter = LoadCounter::new(true);
    let (registry, fs) = setup(hot_reload_config(), &counter);
    fs.insert("/a.dat", "old");
    let handle = registry.load("/a.dat", ResourceKind::Unknown);

    registry.set_hot_reload(false);
    assert!(!registry.is_hot_reload_enabled());
    fs.update("/a.dat", "new", Duration::from_secs(1));
    thread::sleep(Duration::from_millis(30));
    registry.tick();

    assert_eq!(registry.get_as::<String>(handle).as_deref().map(String::as_str), Some("old"));
    assert_eq!(counter.loads(), 1);
}

/// Edits the file it just read, once.
struct EditingLoader {
    fs: Arc<MemoryFileSystem>,
    edited: AtomicBool,
}

impl ResourceLoader for EditingLoader {
    fn name(&self) -> &str {
        "editing"
    }

    fn extensions(&self) -> &[&str] {
        &["txt"]
    }

    fn load(&self, path: &Path, fs: &dyn FileSystem) -> ResourceResult<LoadedResource> {
        let text = String::from_utf8_lossy(&read_bytes(path, fs)?).into_owned();
        if !self.edited.swap(true, Ordering::SeqCst) {
            self.fs.update(path, "new", Duration::from_secs(1));
        }
        let size = text.len();
        Ok(LoadedResource::new(text, size))
    }
}

#[test]
fn verify_edit_during_sync_load_is_reloaded() {
    let counter = LoadCounter::new(true);
    let (registry, fs) = setup(RegistryConfig::default(), &counter);
    registry.register_loader(EditingLoader {
        fs: Arc::clone(&fs),
        edited: AtomicBool::new(false),
    });
    let t0 = SystemTime::UNIX_EPOCH + Duration::from_secs(1_000);
    fs.insert_with_mtime("/notes.txt", "old", t0);

    let handle = registry.load("/notes.txt", ResourceKind::Unknown);
    assert_eq!(registry.get_as::<String>(handle).as_deref().map(String::as_str), Some("old"));
    assert_eq!(registry.info(handle).unwrap().modified, Some(t0));

    assert_eq!(registry.check_for_changes(), 1);
    assert_eq!(registry.get_as::<String>(handle).as_deref().map(String::as_str), Some("new"));
}

#[test]
fn verify_edit_before_async_commit_is_reloaded() {
    let counter = LoadCounter::new(false);
    let (registry, fs) = setup(RegistryConfig::default(), &counter);
    let t0 = SystemTime::UNIX_EPOCH + Duration::from_secs(1_000);
    fs.insert_with_mtime("/a.dat", "old", t0);

    let handle = registry.load_async("/a.dat", ResourceKind::Unknown, |_, _| {});
    registry.tick();
    assert!(wait_until(|| counter.loads() == 1));
    counter.open();
    assert!(wait_until(|| counter.reads() == 1));

    // Lands after the worker read the file, before the result is committed.
    assert!(fs.update("/a.dat", "new", Duration::from_secs(1)));
    assert!(registry.tick_until_idle(IDLE_TIMEOUT));
    assert_eq!(registry.get_as::<String>(handle).as_deref().map(String::as_str), Some("old"));
    assert_eq!(registry.info(handle).unwrap().modified, Some(t0));

    assert_eq!(registry.check_for_changes(), 1);
    assert_eq!(registry.get_as::<String>(handle).as_deref().map(String::as_str), Some("new"));
    assert_eq!(counter.loads(), 2);
}
