use std::time::Duration;
use tessera_types::{L2Block, L2BlockSource};
use tokio::{
    sync::{mpsc, oneshot},
    task::JoinHandle,
    time::MissedTickBehavior,
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// How many blocks a single source query asks for.
const FETCH_BATCH_SIZE: usize = 10;

/// Handle to the background task that pulls blocks from an
/// [`L2BlockSource`] into a bounded queue.
///
/// The task polls the source at a fixed interval. A full queue stalls it,
/// so it never runs further ahead than the consumer allows.
#[derive(Debug)]
pub(crate) struct BlockDownloader {
    cmd_tx: mpsc::Sender<PollRequest>,
    cancellation: CancellationToken,
    handle: JoinHandle<()>,
}

/// A clonable handle for forcing out-of-band fetch passes.
#[derive(Debug, Clone)]
pub(crate) struct DownloadPoller {
    cmd_tx: mpsc::Sender<PollRequest>,
}

#[derive(Debug)]
struct PollRequest {
    reply: oneshot::Sender<usize>,
}

impl BlockDownloader {
    /// Spawns the download task, fetching forward from block `from`.
    /// Returns the handle and the receiving end of the block queue.
    pub(crate) fn spawn<S>(
        source: S,
        poll_interval: Duration,
        queue_capacity: usize,
        from: u64,
    ) -> (Self, mpsc::Receiver<L2Block>)
    where
        S: L2BlockSource + Send + Sync + 'static,
    {
        let (block_tx, block_rx) = mpsc::channel(queue_capacity.max(1));
        let (cmd_tx, cmd_rx) = mpsc::channel(1);
        let cancellation = CancellationToken::new();

        let mut task =
            DownloadTask { source, queue: block_tx, cmd_rx, next: from, cancellation: cancellation.clone() };
        let handle = tokio::spawn(async move { task.run(poll_interval).await });

        (Self { cmd_tx, cancellation, handle }, block_rx)
    }

    /// A handle for forcing fetch passes.
    pub(crate) fn poller(&self) -> DownloadPoller {
        DownloadPoller { cmd_tx: self.cmd_tx.clone() }
    }

    /// Cancels the download task and waits for it to wind down.
    pub(crate) async fn stop(self) {
        self.cancellation.cancel();
        if let Err(err) = self.handle.await {
            warn!(target: "world_state::downloader", %err, "download task terminated abnormally");
        }
    }
}

impl DownloadPoller {
    /// Forces a fetch pass and resolves once it completed, returning the
    /// number of blocks it queued. Returns `None` if the download task is
    /// gone.
    pub(crate) async fn poll_immediate(&self) -> Option<usize> {
        let (reply, response) = oneshot::channel();
        self.cmd_tx.send(PollRequest { reply }).await.ok()?;
        response.await.ok()
    }
}

struct DownloadTask<S> {
    source: S,
    queue: mpsc::Sender<L2Block>,
    cmd_rx: mpsc::Receiver<PollRequest>,
    /// The next block number to fetch.
    next: u64,
    cancellation: CancellationToken,
}

impl<S> DownloadTask<S>
where
    S: L2BlockSource,
{
    async fn run(&mut self, poll_interval: Duration) {
        let mut ticker = tokio::time::interval(poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            tokio::select! {
                _ = self.cancellation.cancelled() => {
                    debug!(target: "world_state::downloader", "cancellation requested, stopping download task");
                    break;
                }
                _ = ticker.tick() => {
                    self.fetch_pass().await;
                }
                Some(request) = self.cmd_rx.recv() => {
                    let fetched = self.fetch_pass().await;
                    let _ = request.reply.send(fetched);
                }
            }
        }
    }

    /// Pulls blocks from the source until it has nothing newer, pushing them
    /// into the queue. Source failures end the pass; the next one retries.
    async fn fetch_pass(&mut self) -> usize {
        let mut fetched = 0;
        loop {
            let blocks = match self.source.get_l2_blocks(self.next, FETCH_BATCH_SIZE).await {
                Ok(blocks) => blocks,
                Err(err) => {
                    warn!(target: "world_state::downloader", %err, "block fetch failed, retrying on next pass");
                    break;
                }
            };
            if blocks.is_empty() {
                break;
            }
            for block in blocks {
                let number = block.number;
                tokio::select! {
                    _ = self.cancellation.cancelled() => return fetched,
                    sent = self.queue.send(block) => {
                        if sent.is_err() {
                            return fetched;
                        }
                    }
                }
                self.next = self.next.max(number + 1);
                fetched += 1;
            }
        }
        fetched
    }
}
