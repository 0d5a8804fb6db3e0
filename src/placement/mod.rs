//! Read-then-apply pipeline behind paste and destroy.
//!
//! Reading runs on a background pool and may block on file I/O. Every block
//! write is marshaled onto a [`WorldExecutor`] as its own job, followed by a
//! final job that fires the completion callback, so completion is only
//! reported after the world has seen every write.

pub mod executor;

pub use executor::{WorldExecutor, WorldJob, WorldThread};

use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU8, AtomicUsize, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard};
use std::time::Duration;

use crate::block_type::BlockType;
use crate::config::SchematicConfig;
use crate::error::{Result, SchematicError};
use crate::position::WorldPoint;
use crate::schematic::Schematic;
use crate::store::SchematicStore;

/// Where a placement gets its records from.
#[derive(Debug, Clone)]
pub enum SchematicSource {
    /// Read and decode from the store on the background pool.
    Stored(String),
    /// Already decoded, typically cached against an actor after a load.
    Loaded(Arc<Schematic>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlacementKind {
    /// Write each record's block type.
    Paste,
    /// Write the default block at each record's target.
    Destroy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum PlacementState {
    Idle = 0,
    Reading = 1,
    Applying = 2,
    Done = 3,
    Failed = 4,
    Cancelled = 5,
}

impl PlacementState {
    fn from_u8(value: u8) -> Self {
        match value {
            1 => PlacementState::Reading,
            2 => PlacementState::Applying,
            3 => PlacementState::Done,
            4 => PlacementState::Failed,
            5 => PlacementState::Cancelled,
            _ => PlacementState::Idle,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            PlacementState::Done | PlacementState::Failed | PlacementState::Cancelled
        )
    }
}

type Callback = Box<dyn FnOnce(bool) + Send + 'static>;

struct Outcome {
    callback: Option<Callback>,
    success: Option<bool>,
}

struct Progress {
    kind: PlacementKind,
    state: AtomicU8,
    cancelled: AtomicBool,
    aborted: AtomicBool,
    scheduled: AtomicUsize,
    applied: AtomicUsize,
    skipped: AtomicUsize,
    outcome: Mutex<Outcome>,
    finished: Condvar,
}

impl Progress {
    fn new(kind: PlacementKind, callback: Callback) -> Self {
        Self {
            kind,
            state: AtomicU8::new(PlacementState::Idle as u8),
            cancelled: AtomicBool::new(false),
            aborted: AtomicBool::new(false),
            scheduled: AtomicUsize::new(0),
            applied: AtomicUsize::new(0),
            skipped: AtomicUsize::new(0),
            outcome: Mutex::new(Outcome {
                callback: Some(callback),
                success: None,
            }),
            finished: Condvar::new(),
        }
    }

    fn set_state(&self, state: PlacementState) {
        self.state.store(state as u8, Ordering::SeqCst);
    }

    fn state(&self) -> PlacementState {
        PlacementState::from_u8(self.state.load(Ordering::SeqCst))
    }

    fn lock_outcome(&self) -> MutexGuard<'_, Outcome> {
        self.outcome.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Record the final state and fire the callback. Only the first call counts.
    fn finish(&self, state: PlacementState) {
        let success = state == PlacementState::Done;
        let callback = {
            let mut outcome = self.lock_outcome();
            if outcome.success.is_some() {
                return;
            }
            self.set_state(state);
            outcome.success = Some(success);
            outcome.callback.take()
        };
        self.finished.notify_all();
        if let Some(callback) = callback {
            callback(success);
        }
    }
}

/// Fails the placement if dropped before it finished, e.g. when an executor
/// discards the completion job without running it.
struct FailOnDrop(Arc<Progress>);

impl Drop for FailOnDrop {
    fn drop(&mut self) {
        self.0.finish(PlacementState::Failed);
    }
}

/// Observer for a running paste or destroy.
#[derive(Clone)]
pub struct PlacementHandle {
    progress: Arc<Progress>,
}

impl fmt::Debug for PlacementHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PlacementHandle")
            .field("kind", &self.progress.kind)
            .field("state", &self.state())
            .field("applied", &self.applied())
            .field("skipped", &self.skipped())
            .finish()
    }
}

impl PlacementHandle {
    pub fn kind(&self) -> PlacementKind {
        self.progress.kind
    }

    pub fn state(&self) -> PlacementState {
        self.progress.state()
    }

    pub fn is_finished(&self) -> bool {
        self.state().is_terminal()
    }

    /// Records handed to the world executor so far.
    pub fn scheduled(&self) -> usize {
        self.progress.scheduled.load(Ordering::SeqCst)
    }

    pub fn applied(&self) -> usize {
        self.progress.applied.load(Ordering::SeqCst)
    }

    /// Records dropped because the world did not know their block type.
    pub fn skipped(&self) -> usize {
        self.progress.skipped.load(Ordering::SeqCst)
    }

    /// Stop scheduling further records. Writes already queued still happen.
    pub fn cancel(&self) {
        self.progress.cancelled.store(true, Ordering::SeqCst);
    }

    /// Block until the placement finishes and return its success flag.
    pub fn wait(&self) -> bool {
        let mut outcome = self.progress.lock_outcome();
        loop {
            if let Some(success) = outcome.success {
                return success;
            }
            outcome = self
                .progress
                .finished
                .wait(outcome)
                .unwrap_or_else(|poisoned| poisoned.into_inner());
        }
    }

    /// Like [`wait`](Self::wait), giving up after `timeout`.
    pub fn wait_timeout(&self, timeout: Duration) -> Option<bool> {
        let outcome = self.progress.lock_outcome();
        let (outcome, _) = self
            .progress
            .finished
            .wait_timeout_while(outcome, timeout, |o| o.success.is_none())
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        outcome.success
    }
}

/// Runs paste and destroy pipelines against a world executor.
pub struct PlacementEngine {
    store: SchematicStore,
    executor: Arc<dyn WorldExecutor>,
    readers: rayon::ThreadPool,
    default_block: BlockType,
}

impl PlacementEngine {
    pub fn new(config: &SchematicConfig, executor: Arc<dyn WorldExecutor>) -> Result<Self> {
        let readers = rayon::ThreadPoolBuilder::new()
            .num_threads(config.reader_threads.max(1))
            .thread_name(|i| format!("schematic-reader-{}", i))
            .build()?;
        Ok(Self {
            store: SchematicStore::new(config),
            executor,
            readers,
            default_block: config.default_block.clone(),
        })
    }

    pub fn store(&self) -> &SchematicStore {
        &self.store
    }

    /// Place every record at `anchor + offset`. Returns immediately.
    pub fn paste<F>(&self, anchor: WorldPoint, source: SchematicSource, on_done: F) -> PlacementHandle
    where
        F: FnOnce(bool) + Send + 'static,
    {
        self.start(PlacementKind::Paste, anchor, source, Box::new(on_done))
    }

    /// Reset every `anchor + offset` to the default block. Returns immediately.
    pub fn destroy<F>(&self, anchor: WorldPoint, source: SchematicSource, on_done: F) -> PlacementHandle
    where
        F: FnOnce(bool) + Send + 'static,
    {
        self.start(PlacementKind::Destroy, anchor, source, Box::new(on_done))
    }

    fn start(
        &self,
        kind: PlacementKind,
        anchor: WorldPoint,
        source: SchematicSource,
        on_done: Callback,
    ) -> PlacementHandle {
        let progress = Arc::new(Progress::new(kind, on_done));
        progress.set_state(PlacementState::Reading);

        let store = self.store.clone();
        let executor = Arc::clone(&self.executor);
        let default_block = self.default_block.clone();
        let task_progress = Arc::clone(&progress);
        self.readers.spawn(move || {
            let guard_progress = Arc::clone(&task_progress);
            let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
                run_pipeline(kind, anchor, source, &store, executor, default_block, task_progress)
            }));
            if outcome.is_err() {
                tracing::error!(?kind, "schematic reader panicked");
                guard_progress.finish(PlacementState::Failed);
            }
        });

        PlacementHandle { progress }
    }
}

fn read_source(store: &SchematicStore, source: SchematicSource) -> Result<Arc<Schematic>> {
    match source {
        SchematicSource::Loaded(schematic) => Ok(schematic),
        SchematicSource::Stored(name) => {
            let lines = store.load(&name)?;
            if lines.is_empty() {
                return Err(SchematicError::EmptySchematic(name));
            }
            Ok(Arc::new(Schematic::from_lines(&lines)?))
        }
    }
}

fn run_pipeline(
    kind: PlacementKind,
    anchor: WorldPoint,
    source: SchematicSource,
    store: &SchematicStore,
    executor: Arc<dyn WorldExecutor>,
    default_block: BlockType,
    progress: Arc<Progress>,
) {
    let schematic = match read_source(store, source) {
        Ok(schematic) => schematic,
        Err(e) => {
            tracing::warn!(?kind, anchor = %anchor, error = %e, "could not read schematic");
            progress.finish(PlacementState::Failed);
            return;
        }
    };

    let targets = match schematic
        .records()
        .iter()
        .map(|record| record.target(anchor.pos))
        .collect::<Result<Vec<_>>>()
    {
        Ok(targets) => targets,
        Err(e) => {
            tracing::warn!(?kind, anchor = %anchor, error = %e, "schematic does not fit at anchor");
            progress.finish(PlacementState::Failed);
            return;
        }
    };

    progress.set_state(PlacementState::Applying);
    tracing::debug!(?kind, anchor = %anchor, records = schematic.len(), "applying schematic");

    for (record, target) in schematic.records().iter().zip(targets) {
        if progress.cancelled.load(Ordering::SeqCst) || progress.aborted.load(Ordering::SeqCst) {
            break;
        }
        let block = match kind {
            PlacementKind::Paste => record.block.clone(),
            PlacementKind::Destroy => default_block.clone(),
        };
        let world_id = anchor.world_id.clone();
        let job_progress = Arc::clone(&progress);
        let job: WorldJob = Box::new(move |world| {
            let written =
                panic::catch_unwind(AssertUnwindSafe(|| world.set_block(&world_id, target, &block)));
            match written {
                Ok(Ok(())) => {
                    job_progress.applied.fetch_add(1, Ordering::SeqCst);
                }
                Ok(Err(SchematicError::UnknownBlockType { type_id })) => {
                    tracing::warn!(%type_id, pos = %target, "skipping unknown block type");
                    job_progress.skipped.fetch_add(1, Ordering::SeqCst);
                }
                Ok(Err(e)) => {
                    tracing::warn!(pos = %target, error = %e, "block write failed, aborting placement");
                    job_progress.aborted.store(true, Ordering::SeqCst);
                }
                Err(_) => {
                    tracing::error!(pos = %target, "block write panicked, aborting placement");
                    job_progress.aborted.store(true, Ordering::SeqCst);
                }
            }
        });

        if executor.execute(job).is_err() {
            tracing::warn!(?kind, "world executor stopped during placement");
            progress.finish(PlacementState::Failed);
            return;
        }
        progress.scheduled.fetch_add(1, Ordering::SeqCst);
    }

    let finish_guard = FailOnDrop(Arc::clone(&progress));
    let finish: WorldJob = Box::new(move |_world| {
        let guard = finish_guard;
        let finish_progress = &guard.0;
        let state = if finish_progress.aborted.load(Ordering::SeqCst) {
            PlacementState::Failed
        } else if finish_progress.cancelled.load(Ordering::SeqCst) {
            PlacementState::Cancelled
        } else {
            PlacementState::Done
        };
        tracing::debug!(
            kind = ?finish_progress.kind,
            ?state,
            applied = finish_progress.applied.load(Ordering::SeqCst),
            skipped = finish_progress.skipped.load(Ordering::SeqCst),
            "placement finished"
        );
        finish_progress.finish(state);
    });
    if executor.execute(finish).is_err() {
        progress.finish(PlacementState::Failed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::formats::lines::BlockRecord;
    use crate::position::BlockPosition;
    use crate::world::{BlockRegistry, MemoryWorld, WorldMutation, WorldQuery};

    fn engine_with_world(names: &[&str]) -> (PlacementEngine, Arc<WorldThread<MemoryWorld>>) {
        let world = MemoryWorld::new(BlockRegistry::from_names(names.iter().copied()));
        let thread = Arc::new(WorldThread::spawn(world).unwrap());
        let engine = PlacementEngine::new(&SchematicConfig::default(), thread.clone()).unwrap();
        (engine, thread)
    }

    #[test]
    fn test_paste_loaded_schematic() {
        let (engine, world) = engine_with_world(&["Stone"]);
        let schematic = Arc::new(Schematic::new(vec![
            BlockRecord::new((0, 0, 0), "Stone"),
            BlockRecord::new((1, 0, 0), "Stone"),
        ]));

        let handle = engine.paste(
            WorldPoint::new("w", (10, 5, 10)),
            SchematicSource::Loaded(schematic),
            |_| {},
        );
        assert!(handle.wait());
        assert_eq!(handle.state(), PlacementState::Done);
        assert_eq!(handle.applied(), 2);
        assert_eq!(handle.kind(), PlacementKind::Paste);

        let placed = world
            .run(|w| w.block_type_at("w", BlockPosition::new(11, 5, 10)))
            .unwrap();
        assert_eq!(placed, BlockType::new("Stone"));
    }

    #[test]
    fn test_unknown_block_is_skipped() {
        let (engine, world) = engine_with_world(&["Stone"]);
        let schematic = Arc::new(Schematic::new(vec![
            BlockRecord::new((0, 0, 0), "Stone"),
            BlockRecord::new((1, 0, 0), "Unobtainium"),
            BlockRecord::new((2, 0, 0), "Stone"),
        ]));

        let handle = engine.paste(
            WorldPoint::new("w", (0, 0, 0)),
            SchematicSource::Loaded(schematic),
            |_| {},
        );
        assert!(handle.wait());
        assert_eq!(handle.applied(), 2);
        assert_eq!(handle.skipped(), 1);
        let third = world
            .run(|w| w.block_type_at("w", BlockPosition::new(2, 0, 0)))
            .unwrap();
        assert_eq!(third, BlockType::new("Stone"));
    }

    #[test]
    fn test_missing_stored_schematic_fails() {
        let (engine, _world) = engine_with_world(&[]);
        let (tx, rx) = std::sync::mpsc::channel();
        let handle = engine.paste(
            WorldPoint::new("w", (0, 0, 0)),
            SchematicSource::Stored("definitely-not-saved".to_string()),
            move |ok| tx.send(ok).unwrap(),
        );
        assert_eq!(rx.recv_timeout(Duration::from_secs(5)), Ok(false));
        assert_eq!(handle.state(), PlacementState::Failed);
        assert_eq!(handle.wait_timeout(Duration::from_secs(1)), Some(false));
    }

    #[test]
    fn test_offset_past_world_edge_fails_without_writes() {
        let dir = std::env::temp_dir().join(format!("schematic-edge-{}", std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("edge.schematic"), "0~0~0~Stone\n2147483647~0~0~Stone\n").unwrap();

        let world = MemoryWorld::new(BlockRegistry::from_names(["Stone"]));
        let thread = Arc::new(WorldThread::spawn(world).unwrap());
        let config = SchematicConfig::default().with_storage_dir(&dir);
        let engine = PlacementEngine::new(&config, thread.clone()).unwrap();

        let (tx, rx) = std::sync::mpsc::channel();
        let handle = engine.paste(
            WorldPoint::new("w", (1, 64, 0)),
            SchematicSource::Stored("edge".to_string()),
            move |ok| tx.send(ok).unwrap(),
        );
        assert_eq!(rx.recv_timeout(Duration::from_secs(5)), Ok(false));
        assert_eq!(handle.state(), PlacementState::Failed);
        assert_eq!(handle.scheduled(), 0);
        assert_eq!(thread.run(|w| w.write_count()).unwrap(), 0);

        std::fs::remove_dir_all(&dir).unwrap();
    }

    struct BrittleWorld {
        inner: MemoryWorld,
    }

    impl WorldMutation for BrittleWorld {
        fn set_block(&mut self, world_id: &str, pos: BlockPosition, block: &BlockType) -> Result<()> {
            if pos.x == 1 {
                panic!("host refused to write at {}", pos);
            }
            self.inner.set_block(world_id, pos, block)
        }
    }

    #[test]
    fn test_panicking_write_fails_placement() {
        let world = BrittleWorld {
            inner: MemoryWorld::new(BlockRegistry::from_names(["Stone"])),
        };
        let thread = Arc::new(WorldThread::spawn(world).unwrap());
        let engine = PlacementEngine::new(&SchematicConfig::default(), thread.clone()).unwrap();
        let schematic: Schematic = (0..3).map(|x| BlockRecord::new((x, 0, 0), "Stone")).collect();

        let (tx, rx) = std::sync::mpsc::channel();
        let handle = engine.paste(
            WorldPoint::new("w", (0, 0, 0)),
            SchematicSource::Loaded(Arc::new(schematic)),
            move |ok| tx.send(ok).unwrap(),
        );
        assert_eq!(rx.recv_timeout(Duration::from_secs(5)), Ok(false));
        assert_eq!(handle.state(), PlacementState::Failed);

        let placed = thread
            .run(|w| w.inner.block_type_at("w", BlockPosition::ORIGIN))
            .unwrap();
        assert_eq!(placed, BlockType::new("Stone"));
    }

    struct DiscardingExecutor;

    impl WorldExecutor for DiscardingExecutor {
        fn execute(&self, _job: WorldJob) -> Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_discarded_completion_still_reports() {
        let engine =
            PlacementEngine::new(&SchematicConfig::default(), Arc::new(DiscardingExecutor)).unwrap();
        let schematic = Arc::new(Schematic::new(vec![BlockRecord::new((0, 0, 0), "Stone")]));
        let handle = engine.paste(
            WorldPoint::new("w", (0, 0, 0)),
            SchematicSource::Loaded(schematic),
            |_| {},
        );
        assert_eq!(handle.wait_timeout(Duration::from_secs(5)), Some(false));
        assert_eq!(handle.state(), PlacementState::Failed);
    }

    #[test]
    fn test_cancel_reports_failure_after_queued_writes() {
        let (engine, world) = engine_with_world(&["Stone"]);
        // Hold the world thread so the pipeline cannot finish before cancel.
        let (release_tx, release_rx) = std::sync::mpsc::channel::<()>();
        world
            .submit(move |_| {
                let _ = release_rx.recv();
            })
            .unwrap();

        let records: Schematic = (0..100).map(|x| BlockRecord::new((x, 0, 0), "Stone")).collect();
        let handle = engine.destroy(
            WorldPoint::new("w", (0, 0, 0)),
            SchematicSource::Loaded(Arc::new(records)),
            |_| {},
        );
        handle.cancel();
        release_tx.send(()).unwrap();

        assert!(!handle.wait());
        assert_eq!(handle.state(), PlacementState::Cancelled);
        assert_eq!(handle.applied(), handle.scheduled());
    }
}
