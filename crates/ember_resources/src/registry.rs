//! # Resource Registry
//!
//! Reference-counted cache of loaded files keyed by canonical path.
//!
//! ## Locking
//!
//! Two mutexes: `state` covers the entries and the path index, `queue`
//! covers the asynchronous request queue. When both are needed they are
//! taken in that order. Loader code and callbacks never run with `queue`
//! held; callbacks never run with either held.
//!
//! ## Asynchronous loads
//!
//! ```text
//! load_async ──► Queued ──dispatch──► Loading ──tick──► Loaded | Failed
//!                  │                     │
//!                  └──── release/unload ─┴──► Cancelled
//! ```
//!
//! Each running load is a worker thread that reports through a single-slot
//! channel. [`ResourceRegistry::tick`] polls those channels without
//! blocking, so a completion is observed no earlier than the first `tick`
//! after the worker finishes.

use std::any::Any;
use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant, SystemTime};

use crossbeam_channel::{bounded, Receiver, SendError, TryRecvError};
use parking_lot::{Mutex, RwLock};

use crate::config::RegistryConfig;
use crate::error::{ResourceError, ResourceResult};
use crate::fs::{FileSystem, StdFileSystem};
use crate::handle::{ResourceGuard, ResourceHandle};
use crate::kind::ResourceKind;
use crate::loader::{LoadedResource, RawLoader, ResourceLoader, TomlLoader};

// ============================================================================
// PUBLIC TYPES
// ============================================================================

/// Where an entry is in its lifecycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum LoadState {
    /// Waiting for a free worker slot.
    Queued,
    /// A worker is reading the file.
    Loading,
    /// Data is available.
    Loaded,
    /// The last load attempt failed; no data.
    Failed,
}

/// Final state reported to an asynchronous load callback.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LoadOutcome {
    /// Data is available through the handle.
    Loaded,
    /// The load failed.
    Failed(ResourceError),
    /// The entry was released or unloaded before the load finished.
    Cancelled,
}

impl LoadOutcome {
    /// Returns `true` for [`LoadOutcome::Loaded`].
    #[inline]
    #[must_use]
    pub const fn is_loaded(&self) -> bool {
        matches!(self, Self::Loaded)
    }
}

/// Completion callback of [`ResourceRegistry::load_async`].
pub type LoadCallback = Box<dyn FnOnce(ResourceHandle, LoadOutcome) + Send + 'static>;

/// Snapshot of one entry.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResourceInfo {
    /// The entry's handle.
    pub handle: ResourceHandle,
    /// Canonical path.
    pub path: PathBuf,
    /// File name.
    pub name: String,
    /// Size reported by the loader, 0 until loaded.
    pub size_bytes: usize,
    /// Outstanding references.
    pub ref_count: u32,
    /// Modification time of the source, taken just before the data was read.
    pub modified: Option<SystemTime>,
    /// Lifecycle state.
    pub state: LoadState,
}

/// Registry-wide counters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RegistryStats {
    /// Number of entries.
    pub entries: usize,
    /// Entries with data.
    pub loaded: usize,
    /// Entries with a running worker.
    pub loading: usize,
    /// Entries waiting for a worker slot.
    pub queued: usize,
    /// Entries whose last load failed.
    pub failed: usize,
    /// Sum of loaded sizes.
    pub bytes: usize,
}

// ============================================================================
// INTERNAL STATE
// ============================================================================

struct ResourceEntry {
    handle: ResourceHandle,
    path: PathBuf,
    name: String,
    data: Option<LoadedResource>,
    loader: Arc<dyn ResourceLoader>,
    ref_count: u32,
    modified: Option<SystemTime>,
    state: LoadState,
}

impl ResourceEntry {
    fn size_bytes(&self) -> usize {
        self.data.as_ref().map_or(0, |data| data.size_bytes)
    }

    fn info(&self) -> ResourceInfo {
        ResourceInfo {
            handle: self.handle,
            path: self.path.clone(),
            name: self.name.clone(),
            size_bytes: self.size_bytes(),
            ref_count: self.ref_count,
            modified: self.modified,
            state: self.state,
        }
    }

    /// Hands the data back to its loader.
    fn destroy(mut self) {
        if let Some(data) = self.data.take() {
            self.loader.unload(data);
        }
    }
}

struct RegistryState {
    entries: HashMap<u32, ResourceEntry>,
    by_path: HashMap<PathBuf, u32>,
    next_id: u32,
    last_sweep: Instant,
}

impl RegistryState {
    fn new() -> Self {
        Self {
            entries: HashMap::new(),
            by_path: HashMap::new(),
            next_id: 1,
            last_sweep: Instant::now(),
        }
    }

    /// Next id not held by a live entry. 0 is the invalid handle.
    fn allocate_id(&mut self) -> u32 {
        loop {
            let id = self.next_id;
            self.next_id = self.next_id.checked_add(1).unwrap_or(1);
            if !self.entries.contains_key(&id) {
                return id;
            }
        }
    }

    fn get(&self, handle: ResourceHandle) -> Option<&ResourceEntry> {
        self.entries
            .get(&handle.id())
            .filter(|entry| entry.handle == handle)
    }

    fn get_mut(&mut self, handle: ResourceHandle) -> Option<&mut ResourceEntry> {
        self.entries
            .get_mut(&handle.id())
            .filter(|entry| entry.handle == handle)
    }
}

/// Source mtime taken before the read, and the loader's result.
type WorkerResult = (Option<SystemTime>, ResourceResult<LoadedResource>);

struct InFlight {
    id: u32,
    receiver: Receiver<WorkerResult>,
    loader: Arc<dyn ResourceLoader>,
}

type ReadyCallbacks = (ResourceHandle, LoadOutcome, Vec<LoadCallback>);

#[derive(Default)]
struct LoadQueue {
    pending: VecDeque<u32>,
    in_flight: Vec<InFlight>,
    callbacks: HashMap<u32, Vec<LoadCallback>>,
    ready: Vec<ReadyCallbacks>,
}

impl LoadQueue {
    fn resolve(&mut self, handle: ResourceHandle, outcome: LoadOutcome) {
        let callbacks = self.callbacks.remove(&handle.id()).unwrap_or_default();
        if !callbacks.is_empty() {
            self.ready.push((handle, outcome, callbacks));
        }
    }
}

// ============================================================================
// REGISTRY
// ============================================================================

/// Handle-issuing cache of loaded resources.
///
/// One entry exists per canonical path. Every successful [`load`](Self::load)
/// or [`load_async`](Self::load_async) takes one reference that must be given
/// back with [`release`](Self::release); the entry and its data go away when
/// the count reaches zero.
///
/// # Example
///
/// ```rust,ignore
/// let registry = ResourceRegistry::new(RegistryConfig::default())?;
/// let handle = registry.load("assets/settings.toml", ResourceKind::Unknown);
/// let table = registry.get_as::<toml::Table>(handle);
/// registry.release(handle);
/// ```
pub struct ResourceRegistry {
    config: RegistryConfig,
    fs: Arc<dyn FileSystem>,
    loaders: RwLock<Vec<Arc<dyn ResourceLoader>>>,
    builtin: [Arc<dyn ResourceLoader>; 2],
    state: Mutex<RegistryState>,
    queue: Mutex<LoadQueue>,
    hot_reload: AtomicBool,
}

impl ResourceRegistry {
    /// Creates a registry over the process filesystem.
    ///
    /// # Errors
    ///
    /// Returns [`ResourceError::InvalidConfig`] if `config` fails validation.
    pub fn new(config: RegistryConfig) -> ResourceResult<Self> {
        Self::with_file_system(config, Arc::new(StdFileSystem))
    }

    /// Creates a registry over an arbitrary filesystem.
    ///
    /// # Errors
    ///
    /// Returns [`ResourceError::InvalidConfig`] if `config` fails validation.
    pub fn with_file_system(
        config: RegistryConfig,
        fs: Arc<dyn FileSystem>,
    ) -> ResourceResult<Self> {
        config.validate()?;
        tracing::info!(
            max_concurrent = config.max_concurrent,
            hot_reload = config.hot_reload,
            "resource registry created"
        );
        Ok(Self {
            hot_reload: AtomicBool::new(config.hot_reload),
            config,
            fs,
            loaders: RwLock::new(Vec::new()),
            builtin: [Arc::new(TomlLoader) as Arc<dyn ResourceLoader>, Arc::new(RawLoader)],
            state: Mutex::new(RegistryState::new()),
            queue: Mutex::new(LoadQueue::default()),
        })
    }

    /// The configuration the registry was built with.
    #[inline]
    #[must_use]
    pub const fn config(&self) -> &RegistryConfig {
        &self.config
    }

    /// The filesystem collaborator.
    #[inline]
    #[must_use]
    pub fn file_system(&self) -> &Arc<dyn FileSystem> {
        &self.fs
    }

    /// Adds a loader. Loaders are tried in registration order, before the
    /// built-in TOML and raw loaders.
    pub fn register_loader<L: ResourceLoader + 'static>(&self, loader: L) {
        tracing::info!(
            loader = loader.name(),
            extensions = ?loader.extensions(),
            "resource loader registered"
        );
        self.loaders.write().push(Arc::new(loader));
    }

    fn loader_for(&self, path: &Path) -> Arc<dyn ResourceLoader> {
        let loaders = self.loaders.read();
        loaders
            .iter()
            .chain(self.builtin.iter())
            .find(|loader| loader.supports(path))
            .map_or_else(|| Arc::clone(&self.builtin[1]), Arc::clone)
    }

    fn canonicalize(&self, path: &Path) -> ResourceResult<PathBuf> {
        self.fs
            .canonicalize(path)
            .map_err(|err| ResourceError::io(path, &err))
    }

    // ========================================================================
    // SYNCHRONOUS LOADING
    // ========================================================================

    /// Loads `path` on the calling thread.
    ///
    /// If an entry for the path already exists its reference count is
    /// incremented and its handle returned, even when its data is still
    /// loading. `kind` is inferred from the extension when `Unknown`.
    ///
    /// # Returns
    ///
    /// [`ResourceHandle::INVALID`] if the file is missing or the loader
    /// rejects it. The failure is logged.
    pub fn load(&self, path: impl AsRef<Path>, kind: ResourceKind) -> ResourceHandle {
        let path = path.as_ref();
        match self.try_load(path, kind) {
            Ok(handle) => handle,
            Err(err) => {
                tracing::warn!(path = %path.display(), error = %err, "resource load failed");
                ResourceHandle::INVALID
            }
        }
    }

    /// [`load`](Self::load) with the failure reason.
    ///
    /// # Errors
    ///
    /// [`ResourceError::NotFound`], [`ResourceError::Io`] or whatever the
    /// selected loader returns. No entry is created on failure.
    pub fn try_load(
        &self,
        path: impl AsRef<Path>,
        kind: ResourceKind,
    ) -> ResourceResult<ResourceHandle> {
        let canonical = self.canonicalize(path.as_ref())?;
        let mut guard = self.state.lock();
        let state = &mut *guard;

        if let Some(&id) = state.by_path.get(&canonical) {
            if let Some(entry) = state.entries.get_mut(&id) {
                if entry.state == LoadState::Failed {
                    let modified = self.fs.modified(&entry.path).ok();
                    let resource = entry.loader.load(&entry.path, &*self.fs)?;
                    entry.modified = modified;
                    entry.data = Some(resource);
                    entry.state = LoadState::Loaded;
                }
                entry.ref_count += 1;
                return Ok(entry.handle);
            }
        }

        let loader = self.loader_for(&canonical);
        // Stat before reading so an edit racing the read is seen as newer.
        let modified = self.fs.modified(&canonical).ok();
        let resource = loader.load(&canonical, &*self.fs)?;
        let handle = ResourceHandle::new(state.allocate_id(), kind.resolve(&canonical));
        tracing::debug!(
            %handle,
            path = %canonical.display(),
            loader = loader.name(),
            size = resource.size_bytes,
            "resource loaded"
        );

        state.by_path.insert(canonical.clone(), handle.id());
        state.entries.insert(
            handle.id(),
            ResourceEntry {
                handle,
                name: display_name(&canonical),
                path: canonical,
                data: Some(resource),
                loader,
                ref_count: 1,
                modified,
                state: LoadState::Loaded,
            },
        );
        Ok(handle)
    }

    /// Loads `path` and wraps the reference in a guard that releases it.
    ///
    /// # Errors
    ///
    /// Same as [`try_load`](Self::try_load).
    pub fn load_scoped(
        &self,
        path: impl AsRef<Path>,
        kind: ResourceKind,
    ) -> ResourceResult<ResourceGuard<'_>> {
        let handle = self.try_load(path, kind)?;
        Ok(ResourceGuard::adopt(self, handle))
    }

    // ========================================================================
    // ASYNCHRONOUS LOADING
    // ========================================================================

    /// Queues a load of `path` on a worker thread.
    ///
    /// The entry exists from this call on, so later loads of the same path
    /// share it. The returned handle carries one reference. `on_ready` runs
    /// from a later [`tick`](Self::tick) once the load is resolved; for an
    /// entry that is already loaded it runs on the next tick.
    ///
    /// # Returns
    ///
    /// [`ResourceHandle::INVALID`] if the path cannot be resolved, in which
    /// case `on_ready` reports the failure on the next tick.
    pub fn load_async<F>(
        &self,
        path: impl AsRef<Path>,
        kind: ResourceKind,
        on_ready: F,
    ) -> ResourceHandle
    where
        F: FnOnce(ResourceHandle, LoadOutcome) + Send + 'static,
    {
        let path = path.as_ref();
        let callback: LoadCallback = Box::new(on_ready);
        let canonical = match self.canonicalize(path) {
            Ok(canonical) => canonical,
            Err(err) => {
                tracing::warn!(path = %path.display(), error = %err, "resource load failed");
                self.queue.lock().ready.push((
                    ResourceHandle::INVALID,
                    LoadOutcome::Failed(err),
                    vec![callback],
                ));
                return ResourceHandle::INVALID;
            }
        };

        let mut guard = self.state.lock();
        let state = &mut *guard;
        let mut queue = self.queue.lock();

        if let Some(entry) = state
            .by_path
            .get(&canonical)
            .and_then(|id| state.entries.get_mut(id))
        {
            entry.ref_count += 1;
            let handle = entry.handle;
            match entry.state {
                LoadState::Loaded => {
                    queue.ready.push((handle, LoadOutcome::Loaded, vec![callback]));
                }
                LoadState::Queued | LoadState::Loading => {
                    queue.callbacks.entry(handle.id()).or_default().push(callback);
                }
                LoadState::Failed => {
                    entry.state = LoadState::Queued;
                    queue.pending.push_back(handle.id());
                    queue.callbacks.entry(handle.id()).or_default().push(callback);
                    self.dispatch(state, &mut queue);
                }
            }
            return handle;
        }

        let handle = ResourceHandle::new(state.allocate_id(), kind.resolve(&canonical));
        state.by_path.insert(canonical.clone(), handle.id());
        state.entries.insert(
            handle.id(),
            ResourceEntry {
                handle,
                name: display_name(&canonical),
                loader: self.loader_for(&canonical),
                path: canonical,
                data: None,
                ref_count: 1,
                modified: None,
                state: LoadState::Queued,
            },
        );
        queue.pending.push_back(handle.id());
        queue.callbacks.insert(handle.id(), vec![callback]);
        tracing::debug!(%handle, pending = queue.pending.len(), "resource load queued");

        self.dispatch(state, &mut queue);
        handle
    }

    /// Starts queued loads while worker slots are free.
    fn dispatch(&self, state: &mut RegistryState, queue: &mut LoadQueue) {
        while queue.in_flight.len() < self.config.max_concurrent {
            let Some(id) = queue.pending.pop_front() else {
                break;
            };
            let Some(entry) = state.entries.get_mut(&id) else {
                continue;
            };
            if entry.state != LoadState::Queued {
                continue;
            }

            match self.spawn_worker(id, entry.path.clone(), Arc::clone(&entry.loader)) {
                Ok(in_flight) => {
                    entry.state = LoadState::Loading;
                    queue.in_flight.push(in_flight);
                }
                Err(err) => {
                    tracing::warn!(handle = %entry.handle, error = %err, "resource load failed");
                    entry.state = LoadState::Failed;
                    queue.resolve(entry.handle, LoadOutcome::Failed(err));
                }
            }
        }
    }

    fn spawn_worker(
        &self,
        id: u32,
        path: PathBuf,
        loader: Arc<dyn ResourceLoader>,
    ) -> ResourceResult<InFlight> {
        let (sender, receiver) = bounded(1);
        let fs = Arc::clone(&self.fs);
        let worker_loader = Arc::clone(&loader);

        let mut builder = thread::Builder::new().name(format!("ember-load-{id}"));
        if let Some(stack_size) = self.config.worker_stack_size {
            builder = builder.stack_size(stack_size);
        }
        builder
            .spawn(move || {
                let modified = fs.modified(&path).ok();
                let result = worker_loader.load(&path, &*fs);
                // Registry gone: nobody will commit this.
                if let Err(SendError((_, Ok(resource)))) = sender.send((modified, result)) {
                    worker_loader.unload(resource);
                }
            })
            .map_err(|err| ResourceError::Worker(err.to_string()))?;

        Ok(InFlight {
            id,
            receiver,
            loader,
        })
    }

    /// Moves finished worker results into their entries.
    fn collect_finished(&self, state: &mut RegistryState, queue: &mut LoadQueue) {
        let mut index = 0;
        while index < queue.in_flight.len() {
            let result = match queue.in_flight[index].receiver.try_recv() {
                Ok(result) => result,
                Err(TryRecvError::Empty) => {
                    index += 1;
                    continue;
                }
                Err(TryRecvError::Disconnected) => (
                    None,
                    Err(ResourceError::Worker(
                        "loader thread exited without a result".into(),
                    )),
                ),
            };
            let in_flight = queue.in_flight.remove(index);
            self.commit(state, queue, in_flight, result);
        }
    }

    fn commit(
        &self,
        state: &mut RegistryState,
        queue: &mut LoadQueue,
        in_flight: InFlight,
        (modified, result): WorkerResult,
    ) {
        let entry = match state.entries.get_mut(&in_flight.id) {
            Some(entry) if entry.state == LoadState::Loading => entry,
            _ => {
                // Cancelled while running.
                if let Ok(resource) = result {
                    in_flight.loader.unload(resource);
                }
                return;
            }
        };

        let outcome = match result {
            Ok(resource) => {
                tracing::debug!(
                    handle = %entry.handle,
                    path = %entry.path.display(),
                    size = resource.size_bytes,
                    "resource loaded"
                );
                entry.modified = modified;
                entry.data = Some(resource);
                entry.state = LoadState::Loaded;
                LoadOutcome::Loaded
            }
            Err(err) => {
                tracing::warn!(
                    handle = %entry.handle,
                    path = %entry.path.display(),
                    error = %err,
                    "resource load failed"
                );
                entry.state = LoadState::Failed;
                LoadOutcome::Failed(err)
            }
        };
        queue.resolve(entry.handle, outcome);
    }

    // ========================================================================
    // FRAME UPDATE
    // ========================================================================

    /// Per-frame update.
    ///
    /// Commits finished asynchronous loads, starts queued loads up to
    /// `max_concurrent`, runs the callbacks of everything resolved, then
    /// runs the hot-reload sweep if enabled and due. Never blocks on a
    /// worker.
    pub fn tick(&self) {
        let ready = {
            let mut guard = self.state.lock();
            let state = &mut *guard;
            let mut queue = self.queue.lock();
            self.collect_finished(state, &mut queue);
            self.dispatch(state, &mut queue);
            std::mem::take(&mut queue.ready)
        };

        run_callbacks(ready);

        if self.hot_reload.load(Ordering::Relaxed) && self.sweep_due() {
            self.check_for_changes();
        }
    }

    /// Ticks until no load is queued or running, sleeping briefly between
    /// ticks.
    ///
    /// # Returns
    ///
    /// `false` if loads were still outstanding after `timeout`.
    pub fn tick_until_idle(&self, timeout: Duration) -> bool {
        let start = Instant::now();
        loop {
            self.tick();
            if self.pending_count() == 0 {
                return true;
            }
            if start.elapsed() >= timeout {
                return false;
            }
            thread::sleep(Duration::from_millis(1));
        }
    }

    fn sweep_due(&self) -> bool {
        let mut state = self.state.lock();
        if state.last_sweep.elapsed() < self.config.hot_reload_interval() {
            return false;
        }
        state.last_sweep = Instant::now();
        true
    }

    /// Reloads every loaded entry whose source file is newer than its data.
    ///
    /// This is the hot-reload sweep; it can be called directly regardless of
    /// [`is_hot_reload_enabled`](Self::is_hot_reload_enabled).
    ///
    /// # Returns
    ///
    /// Number of entries reloaded.
    pub fn check_for_changes(&self) -> usize {
        let stale: Vec<ResourceHandle> = {
            let state = self.state.lock();
            state
                .entries
                .values()
                .filter(|entry| entry.state == LoadState::Loaded)
                .filter(|entry| match self.fs.modified(&entry.path) {
                    Ok(current) => entry.modified.is_some_and(|loaded| current > loaded),
                    Err(err) => {
                        tracing::warn!(
                            handle = %entry.handle,
                            path = %entry.path.display(),
                            error = %err,
                            "cannot stat resource, skipping hot-reload check"
                        );
                        false
                    }
                })
                .map(|entry| entry.handle)
                .collect()
        };

        stale
            .into_iter()
            .filter(|&handle| self.reload_resource(handle))
            .count()
    }

    /// Reloads an entry's data from its path.
    ///
    /// The new data is loaded before the old data is unloaded, so a failed
    /// reload keeps the previous data. The reference count is unchanged.
    ///
    /// # Returns
    ///
    /// `true` if new data was installed.
    pub fn reload_resource(&self, handle: ResourceHandle) -> bool {
        let mut state = self.state.lock();
        let Some(entry) = state.get_mut(handle) else {
            return false;
        };
        if !matches!(entry.state, LoadState::Loaded | LoadState::Failed) {
            return false;
        }

        let modified = self.fs.modified(&entry.path).ok();
        match entry.loader.load(&entry.path, &*self.fs) {
            Ok(resource) => {
                let previous = entry.data.replace(resource);
                entry.modified = modified;
                entry.state = LoadState::Loaded;
                if let Some(previous) = previous {
                    entry.loader.unload(previous);
                }
                tracing::info!(%handle, path = %entry.path.display(), "resource reloaded");
                true
            }
            Err(err) => {
                tracing::warn!(
                    %handle,
                    path = %entry.path.display(),
                    error = %err,
                    "resource reload failed, keeping previous data"
                );
                false
            }
        }
    }

    /// Turns the hot-reload sweep in [`tick`](Self::tick) on or off.
    pub fn set_hot_reload(&self, enabled: bool) {
        self.hot_reload.store(enabled, Ordering::Relaxed);
        tracing::info!(enabled, "hot-reload toggled");
    }

    /// Whether `tick` runs the hot-reload sweep.
    #[must_use]
    pub fn is_hot_reload_enabled(&self) -> bool {
        self.hot_reload.load(Ordering::Relaxed)
    }

    // ========================================================================
    // ACCESS
    // ========================================================================

    /// The entry's data, if loaded.
    #[must_use]
    pub fn get(&self, handle: ResourceHandle) -> Option<Arc<dyn Any + Send + Sync>> {
        let state = self.state.lock();
        let entry = state.get(handle)?;
        if entry.state != LoadState::Loaded {
            return None;
        }
        entry.data.as_ref().map(|data| Arc::clone(&data.data))
    }

    /// The entry's data downcast to `T`.
    ///
    /// # Returns
    ///
    /// `None` if not loaded or if the loader produced a different type.
    #[must_use]
    pub fn get_as<T: Any + Send + Sync>(&self, handle: ResourceHandle) -> Option<Arc<T>> {
        self.get(handle)?.downcast::<T>().ok()
    }

    /// Whether the entry has data.
    #[must_use]
    pub fn is_loaded(&self, handle: ResourceHandle) -> bool {
        self.load_state(handle) == Some(LoadState::Loaded)
    }

    /// Lifecycle state, or `None` for a dead handle.
    #[must_use]
    pub fn load_state(&self, handle: ResourceHandle) -> Option<LoadState> {
        self.state.lock().get(handle).map(|entry| entry.state)
    }

    /// Outstanding references, 0 for a dead handle.
    #[must_use]
    pub fn ref_count(&self, handle: ResourceHandle) -> u32 {
        self.state.lock().get(handle).map_or(0, |entry| entry.ref_count)
    }

    /// Snapshot of an entry.
    #[must_use]
    pub fn info(&self, handle: ResourceHandle) -> Option<ResourceInfo> {
        self.state.lock().get(handle).map(ResourceEntry::info)
    }

    /// The handle of the entry for `path`, without taking a reference.
    #[must_use]
    pub fn find(&self, path: impl AsRef<Path>) -> Option<ResourceHandle> {
        let canonical = self.fs.canonicalize(path.as_ref()).ok()?;
        let state = self.state.lock();
        let id = state.by_path.get(&canonical)?;
        state.entries.get(id).map(|entry| entry.handle)
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.state.lock().entries.len()
    }

    /// Returns `true` if there are no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.state.lock().entries.is_empty()
    }

    /// Loads queued or running, including cancelled loads whose worker has
    /// not finished yet.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        let queue = self.queue.lock();
        queue.pending.len() + queue.in_flight.len()
    }

    /// Registry-wide counters.
    #[must_use]
    pub fn stats(&self) -> RegistryStats {
        let state = self.state.lock();
        state
            .entries
            .values()
            .fold(RegistryStats::default(), |mut stats, entry| {
                stats.entries += 1;
                stats.bytes += entry.size_bytes();
                match entry.state {
                    LoadState::Queued => stats.queued += 1,
                    LoadState::Loading => stats.loading += 1,
                    LoadState::Loaded => stats.loaded += 1,
                    LoadState::Failed => stats.failed += 1,
                }
                stats
            })
    }

    // ========================================================================
    // REFERENCE COUNTING
    // ========================================================================

    /// Takes an additional reference.
    ///
    /// # Returns
    ///
    /// `false` for a dead handle.
    pub fn add_ref(&self, handle: ResourceHandle) -> bool {
        match self.state.lock().get_mut(handle) {
            Some(entry) => {
                entry.ref_count += 1;
                true
            }
            None => false,
        }
    }

    /// Gives back one reference. At zero the data is unloaded and the entry
    /// destroyed; a pending load is cancelled. No-op for a dead handle.
    pub fn release(&self, handle: ResourceHandle) {
        let removed = {
            let mut guard = self.state.lock();
            let state = &mut *guard;
            let Some(entry) = state.get_mut(handle) else {
                return;
            };
            entry.ref_count = entry.ref_count.saturating_sub(1);
            if entry.ref_count > 0 {
                return;
            }
            let mut queue = self.queue.lock();
            remove_entry(state, &mut queue, handle.id())
        };
        if let Some(entry) = removed {
            tracing::debug!(%handle, "resource released");
            entry.destroy();
        }
    }

    /// Destroys an entry regardless of its reference count.
    ///
    /// Outstanding handles become dead. A pending load is cancelled.
    ///
    /// # Returns
    ///
    /// `false` for a dead handle.
    pub fn unload(&self, handle: ResourceHandle) -> bool {
        let removed = {
            let mut guard = self.state.lock();
            let state = &mut *guard;
            if state.get(handle).is_none() {
                return false;
            }
            let mut queue = self.queue.lock();
            remove_entry(state, &mut queue, handle.id())
        };
        removed.map(ResourceEntry::destroy).is_some()
    }

    /// Destroys every entry of `kind`.
    ///
    /// # Returns
    ///
    /// Number of entries destroyed.
    pub fn unload_all_of_type(&self, kind: ResourceKind) -> usize {
        self.unload_where(|entry| entry.handle.kind() == kind)
    }

    /// Destroys every entry.
    ///
    /// # Returns
    ///
    /// Number of entries destroyed.
    pub fn unload_all(&self) -> usize {
        self.unload_where(|_| true)
    }

    fn unload_where(&self, predicate: impl Fn(&ResourceEntry) -> bool) -> usize {
        let removed: Vec<ResourceEntry> = {
            let mut guard = self.state.lock();
            let state = &mut *guard;
            let ids: Vec<u32> = state
                .entries
                .values()
                .filter(|&entry| predicate(entry))
                .map(|entry| entry.handle.id())
                .collect();
            let mut queue = self.queue.lock();
            ids.into_iter()
                .filter_map(|id| remove_entry(state, &mut queue, id))
                .collect()
        };
        let count = removed.len();
        removed.into_iter().for_each(ResourceEntry::destroy);
        if count > 0 {
            tracing::debug!(count, "resources unloaded");
        }
        count
    }
}

/// Drops an entry from both indexes, cancelling its pending load.
fn remove_entry(state: &mut RegistryState, queue: &mut LoadQueue, id: u32) -> Option<ResourceEntry> {
    let entry = state.entries.remove(&id)?;
    state.by_path.remove(&entry.path);
    if matches!(entry.state, LoadState::Queued | LoadState::Loading) {
        queue.pending.retain(|&pending| pending != id);
        queue.resolve(entry.handle, LoadOutcome::Cancelled);
    }
    Some(entry)
}

fn run_callbacks(ready: Vec<ReadyCallbacks>) {
    for (handle, outcome, callbacks) in ready {
        for callback in callbacks {
            callback(handle, outcome.clone());
        }
    }
}

fn display_name(path: &Path) -> String {
    path.file_name().map_or_else(
        || path.display().to_string(),
        |name| name.to_string_lossy().into_owned(),
    )
}

impl Drop for ResourceRegistry {
    fn drop(&mut self) {
        self.unload_all();
        let ready = std::mem::take(&mut self.queue.get_mut().ready);
        run_callbacks(ready);
    }
}

impl fmt::Debug for ResourceRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceRegistry")
            .field("config", &self.config)
            .field("stats", &self.stats())
            .finish_non_exhaustive()
    }
}
