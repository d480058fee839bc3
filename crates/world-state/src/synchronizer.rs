use crate::{
    BlockDownloader, MerkleTreeDb, Metrics, SiblingPath, SyncedBlockStore, TreeInfo,
    WorldStateConfig, WorldStateError,
};
use std::sync::{
    Arc, Mutex as StdMutex, PoisonError,
    atomic::{AtomicU64, Ordering},
};
use tessera_types::{L2Block, L2BlockSource, MerkleTreeId};
use tokio::{
    sync::{Mutex, mpsc, watch},
    task::JoinHandle,
    time::MissedTickBehavior,
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// The lifecycle states of the synchronizer.
///
/// `Stopped` is terminal: a stopped synchronizer cannot be started again.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorldStateRunningState {
    /// Created but not yet started.
    Idle,
    /// Catching up with the block source tip observed at start.
    Synching,
    /// Caught up and following the chain.
    Running,
    /// Stopped.
    Stopped,
}

/// A snapshot of the synchronizer's state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorldStateStatus {
    /// The lifecycle state.
    pub state: WorldStateRunningState,
    /// The number of the last block applied to the world state.
    pub synced_to_l2_block: u64,
}

/// Keeps a [`MerkleTreeDb`] in lockstep with an [`L2BlockSource`].
///
/// A background downloader buffers fetched blocks in a bounded queue; an
/// apply loop drains the queue and applies blocks strictly in order,
/// persisting the synced block pointer after each one. Queue draining
/// happens under a lock shared with [`sync_immediate`](Self::sync_immediate),
/// so exactly one party applies blocks at any time.
#[derive(Debug)]
pub struct WorldStateSynchronizer<S, M, P> {
    inner: Arc<Inner<S, M, P>>,
    queue: Arc<Mutex<Option<mpsc::Receiver<L2Block>>>>,
    runtime: Mutex<Option<Runtime>>,
}

#[derive(Debug)]
struct Runtime {
    downloader: BlockDownloader,
    cancellation: CancellationToken,
    handle: JoinHandle<()>,
}

#[derive(Debug)]
struct Inner<S, M, P> {
    source: Arc<S>,
    tree_db: M,
    pointer_store: P,
    config: WorldStateConfig,
    state: StdMutex<WorldStateRunningState>,
    /// The number of the last applied block, watched by blocking starts.
    synced: watch::Sender<u64>,
    /// The source tip captured when the initial sync began.
    initial_target: AtomicU64,
}

impl<S, M, P> WorldStateSynchronizer<S, M, P>
where
    S: L2BlockSource + Send + Sync + 'static,
    M: MerkleTreeDb + Send + Sync + 'static,
    P: SyncedBlockStore + Send + Sync + 'static,
{
    /// Creates a new synchronizer, restoring the synced block pointer from
    /// the given store.
    pub async fn new(
        source: S,
        tree_db: M,
        pointer_store: P,
        config: WorldStateConfig,
    ) -> Result<Self, WorldStateError> {
        let synced = pointer_store.load().await?.unwrap_or(0);
        Ok(Self {
            inner: Arc::new(Inner {
                source: Arc::new(source),
                tree_db,
                pointer_store,
                config,
                state: StdMutex::new(WorldStateRunningState::Idle),
                synced: watch::Sender::new(synced),
                initial_target: AtomicU64::new(0),
            }),
            queue: Arc::new(Mutex::new(None)),
            runtime: Mutex::new(None),
        })
    }

    /// A snapshot of the current state and synced block.
    pub fn status(&self) -> WorldStateStatus {
        self.inner.status()
    }

    /// Starts following the block source.
    ///
    /// The source tip is captured once; the synchronizer is `Synching` until
    /// the applied chain reaches it and `Running` from then on. With
    /// `block_until_synced` set, the call resolves only once that happened.
    /// Starting an already started synchronizer does not spawn anything
    /// further, it just waits for the same initial sync. Starting after
    /// [`stop`](Self::stop) fails.
    pub async fn start(&self, block_until_synced: bool) -> Result<(), WorldStateError> {
        let target = {
            let mut runtime = self.runtime.lock().await;
            match self.inner.current_state() {
                WorldStateRunningState::Stopped => return Err(WorldStateError::AlreadyStopped),
                WorldStateRunningState::Synching | WorldStateRunningState::Running => {
                    self.inner.initial_target.load(Ordering::Acquire)
                }
                WorldStateRunningState::Idle => {
                    Metrics::init();
                    let tip = self.inner.source.get_block_number().await?;
                    let synced = self.inner.synced_block();
                    self.inner.initial_target.store(tip, Ordering::Release);
                    self.inner.set_state(WorldStateRunningState::Synching);
                    info!(target: "world_state", synced, tip, "starting world state sync");

                    let (downloader, block_rx) = BlockDownloader::spawn(
                        self.inner.source.clone(),
                        self.inner.config.block_check_interval,
                        self.inner.config.block_queue_capacity,
                        synced + 1,
                    );
                    *self.queue.lock().await = Some(block_rx);

                    let cancellation = CancellationToken::new();
                    let handle = self.spawn_apply_loop(cancellation.clone());
                    *runtime = Some(Runtime { downloader, cancellation, handle });

                    self.inner.mark_running_if_caught_up();
                    tip
                }
            }
        };

        if block_until_synced {
            let mut synced = self.inner.synced.subscribe();
            synced
                .wait_for(|value| *value >= target)
                .await
                .map_err(|_| WorldStateError::NotRunning)?;
        }
        Ok(())
    }

    /// Forces the downloader to fetch now and applies everything it returns,
    /// repeating until the applied chain reaches the target block.
    ///
    /// The target is the given minimum, or the source tip at call time when
    /// none is given. A pass that makes no progress before the target is
    /// reached fails with [`WorldStateError::UnableToSync`]. An explicit
    /// minimum at or below the synced block resolves immediately.
    pub async fn sync_immediate(
        &self,
        min_block_number: Option<u64>,
    ) -> Result<(), WorldStateError> {
        self.inner.ensure_running()?;
        let poller = {
            let runtime = self.runtime.lock().await;
            let Some(runtime) = runtime.as_ref() else {
                return Err(WorldStateError::NotRunning);
            };
            runtime.downloader.poller()
        };

        let target = match min_block_number {
            Some(min) => {
                if self.inner.synced_block() >= min {
                    return Ok(());
                }
                min
            }
            None => self.inner.source.get_block_number().await?,
        };

        let mut queue = self.queue.lock().await;
        let Some(receiver) = queue.as_mut() else {
            return Err(WorldStateError::NotRunning);
        };

        loop {
            let before = self.inner.synced_block();
            // drain while the fetch pass runs: the pass stalls on a full
            // queue, so waiting for its completion without consuming blocks
            // would deadlock once the source is further ahead than the
            // queue capacity
            let poll = poller.poll_immediate();
            tokio::pin!(poll);
            let completed = loop {
                tokio::select! {
                    fetched = &mut poll => break fetched,
                    block = receiver.recv() => match block {
                        Some(block) => self.inner.apply_block(&block).await?,
                        None => return Err(WorldStateError::NotRunning),
                    },
                }
            };
            if completed.is_none() {
                return Err(WorldStateError::NotRunning);
            }
            while let Ok(block) = receiver.try_recv() {
                self.inner.apply_block(&block).await?;
            }
            self.inner.mark_running_if_caught_up();

            let reached = self.inner.synced_block();
            if reached >= target {
                return Ok(());
            }
            if reached == before {
                return Err(WorldStateError::UnableToSync { target, reached });
            }
        }
    }

    /// Stops the downloader and the apply loop, waiting for an in-flight
    /// block application to finish. The synchronizer ends up `Stopped` and
    /// cannot be started again. Idempotent.
    pub async fn stop(&self) {
        let mut runtime = self.runtime.lock().await;
        if let Some(Runtime { downloader, cancellation, handle }) = runtime.take() {
            info!(target: "world_state", "stopping world state synchronizer");
            downloader.stop().await;
            cancellation.cancel();
            if let Err(err) = handle.await {
                warn!(target: "world_state", %err, "apply loop terminated abnormally");
            }
        }
        *self.queue.lock().await = None;
        self.inner.set_state(WorldStateRunningState::Stopped);
    }

    /// Metadata of one of the world state trees.
    pub async fn get_tree_info(&self, tree_id: MerkleTreeId) -> Result<TreeInfo, WorldStateError> {
        Ok(self.inner.tree_db.get_tree_info(tree_id).await?)
    }

    /// The sibling path of a leaf in one of the world state trees.
    pub async fn get_sibling_path(
        &self,
        tree_id: MerkleTreeId,
        leaf_index: u64,
    ) -> Result<SiblingPath, WorldStateError> {
        Ok(self.inner.tree_db.get_sibling_path(tree_id, leaf_index).await?)
    }

    fn spawn_apply_loop(&self, cancellation: CancellationToken) -> JoinHandle<()> {
        let inner = self.inner.clone();
        let queue = self.queue.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(inner.config.block_check_interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                tokio::select! {
                    _ = cancellation.cancelled() => {
                        info!(target: "world_state", "cancellation requested, stopping apply loop");
                        break;
                    }
                    _ = ticker.tick() => {
                        let mut guard = queue.lock().await;
                        if let Some(receiver) = guard.as_mut() {
                            inner.drain_with_retry(receiver, &cancellation).await;
                        }
                        drop(guard);
                        inner.mark_running_if_caught_up();
                    }
                }
            }
        })
    }
}

impl<S, M, P> Inner<S, M, P>
where
    S: L2BlockSource + Send + Sync + 'static,
    M: MerkleTreeDb + Send + Sync + 'static,
    P: SyncedBlockStore + Send + Sync + 'static,
{
    fn synced_block(&self) -> u64 {
        *self.synced.borrow()
    }

    fn current_state(&self) -> WorldStateRunningState {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn set_state(&self, state: WorldStateRunningState) {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner) = state;
    }

    fn status(&self) -> WorldStateStatus {
        WorldStateStatus { state: self.current_state(), synced_to_l2_block: self.synced_block() }
    }

    fn ensure_running(&self) -> Result<(), WorldStateError> {
        match self.current_state() {
            WorldStateRunningState::Synching | WorldStateRunningState::Running => Ok(()),
            _ => Err(WorldStateError::NotRunning),
        }
    }

    /// Moves `Synching` to `Running` once the applied chain reached the tip
    /// captured at start.
    fn mark_running_if_caught_up(&self) {
        if self.synced_block() < self.initial_target.load(Ordering::Acquire) {
            return;
        }
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if *state == WorldStateRunningState::Synching {
            *state = WorldStateRunningState::Running;
            info!(target: "world_state", synced = self.synced_block(), "initial sync complete");
        }
    }

    /// Applies one block: already applied blocks are skipped, gaps are
    /// rejected, and the synced pointer is persisted before it advances.
    async fn apply_block(&self, block: &L2Block) -> Result<(), WorldStateError> {
        let synced = self.synced_block();
        if block.number <= synced {
            debug!(target: "world_state", block = block.number, synced, "skipping already applied block");
            return Ok(());
        }
        if block.number != synced + 1 {
            return Err(WorldStateError::NonContiguousBlock {
                expected: synced + 1,
                got: block.number,
            });
        }

        self.tree_db.handle_l2_block(block).await?;
        self.pointer_store.save(block.number).await?;
        self.synced.send_replace(block.number);

        metrics::gauge!(Metrics::SYNCED_L2_BLOCK).set(block.number as f64);
        metrics::counter!(Metrics::BLOCKS_APPLIED_TOTAL).increment(1);
        debug!(target: "world_state", block = block.number, "applied l2 block");
        Ok(())
    }

    /// Drains the queue, retrying a block whose application failed so the
    /// applied chain never skips ahead. Blocks that cannot extend the chain
    /// at all are discarded.
    async fn drain_with_retry(
        &self,
        receiver: &mut mpsc::Receiver<L2Block>,
        cancellation: &CancellationToken,
    ) {
        while let Ok(block) = receiver.try_recv() {
            loop {
                match self.apply_block(&block).await {
                    Ok(()) => break,
                    Err(err @ WorldStateError::NonContiguousBlock { .. }) => {
                        metrics::counter!(Metrics::APPLY_ERROR_TOTAL).increment(1);
                        error!(target: "world_state", %err, "discarding block that does not extend the applied chain");
                        break;
                    }
                    Err(err) => {
                        metrics::counter!(Metrics::APPLY_ERROR_TOTAL).increment(1);
                        warn!(target: "world_state", %err, block = block.number, "failed to apply block, retrying");
                        tokio::select! {
                            _ = cancellation.cancelled() => return,
                            _ = tokio::time::sleep(self.config.block_check_interval) => {}
                        }
                    }
                }
            }
        }
    }
}
