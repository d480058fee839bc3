use crate::{
    ArchiverConfig, ArchiverError, ArchiverStore, L1ContractAddresses, L1EventData, L1EventKind,
    L1Source, Metrics, RollupCalldata,
};
use alloy_primitives::B256;
use async_trait::async_trait;
use std::sync::{
    Arc,
    atomic::{AtomicU64, Ordering},
};
use tessera_types::{
    BlockLogs, ContractDeploymentData, L2Block, L2BlockSource, L2BlockSourceError, LogKind,
};
use tokio::{sync::Mutex, task::JoinHandle, time::MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

/// Follows the rollup contracts on L1 and mirrors what they emit into the
/// given store.
///
/// Each sync cycle snapshots the L1 tip, pulls every watched event in the
/// window between the cursor and that tip, applies them, and only then
/// advances the cursor. A failed cycle leaves the cursor untouched, so the
/// next cycle retries the same window.
#[derive(Debug)]
pub struct Archiver<C, S> {
    inner: Arc<Inner<C, S>>,
    task: Mutex<Option<SyncTask>>,
}

#[derive(Debug)]
struct SyncTask {
    cancellation: CancellationToken,
    handle: JoinHandle<()>,
}

#[derive(Debug)]
struct Inner<C, S> {
    source: C,
    store: S,
    config: ArchiverConfig,
    /// The last L1 block a successful sync cycle covered.
    cursor: AtomicU64,
}

impl<C, S> Archiver<C, S>
where
    C: L1Source + Send + Sync + 'static,
    S: ArchiverStore + Send + Sync + 'static,
{
    /// Creates a new [`Archiver`] syncing from the given L1 source into the
    /// given store.
    pub fn new(source: C, store: S, config: ArchiverConfig) -> Self {
        Self {
            inner: Arc::new(Inner { source, store, config, cursor: AtomicU64::new(0) }),
            task: Mutex::new(None),
        }
    }

    /// Starts syncing against L1.
    ///
    /// The first sync cycle always runs inline, so a source failure before
    /// anything was mirrored is returned to the caller. With
    /// `block_until_synced` set, further cycles run inline until the cursor
    /// has caught up with the L1 tip. Afterwards a background task keeps
    /// polling at the configured interval, logging and retrying failed
    /// cycles.
    ///
    /// Calling `start` on an already started archiver is a no-op.
    pub async fn start(&self, block_until_synced: bool) -> Result<(), ArchiverError> {
        let mut task = self.task.lock().await;
        if task.is_some() {
            return Ok(());
        }
        Metrics::init();

        self.inner.sync().await?;
        if block_until_synced {
            loop {
                let tip = self.inner.source.current_block_number().await?;
                if self.inner.cursor.load(Ordering::Acquire) >= tip {
                    break;
                }
                self.inner.sync().await?;
            }
        }

        let inner = self.inner.clone();
        let cancellation = CancellationToken::new();
        let token = cancellation.clone();
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(inner.config.poll_interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                tokio::select! {
                    _ = token.cancelled() => {
                        info!(target: "archiver", "cancellation requested, stopping sync loop");
                        break;
                    }
                    _ = ticker.tick() => {
                        if let Err(err) = inner.sync().await {
                            metrics::counter!(Metrics::SYNC_ERROR_TOTAL).increment(1);
                            warn!(target: "archiver", %err, "sync cycle failed, retrying on next tick");
                        }
                    }
                }
            }
        });
        *task = Some(SyncTask { cancellation, handle });
        Ok(())
    }

    /// Stops the background sync task and waits for it to wind down.
    /// Idempotent.
    pub async fn stop(&self) {
        let Some(SyncTask { cancellation, handle }) = self.task.lock().await.take() else {
            return;
        };
        cancellation.cancel();
        if let Err(err) = handle.await {
            warn!(target: "archiver", %err, "sync task terminated abnormally");
        }
    }

    /// The number of the latest mirrored L2 block, or 0 if none.
    pub fn get_block_number(&self) -> Result<u64, ArchiverError> {
        Ok(self.inner.store.get_block_number()?)
    }

    /// Up to `limit` consecutive mirrored blocks starting at `from`.
    pub fn get_l2_blocks(&self, from: u64, limit: usize) -> Result<Vec<L2Block>, ArchiverError> {
        Ok(self.inner.store.get_blocks(from, limit)?)
    }

    /// The logs of the given kind emitted by blocks `from..=to`.
    pub fn get_logs(
        &self,
        from: u64,
        to: u64,
        kind: LogKind,
    ) -> Result<Vec<BlockLogs>, ArchiverError> {
        Ok(self.inner.store.get_logs(from, to, kind)?)
    }

    /// The keys of up to `limit` pending L1-to-L2 messages, oldest first.
    pub fn get_pending_l1_to_l2_messages(&self, limit: usize) -> Result<Vec<B256>, ArchiverError> {
        Ok(self.inner.store.get_pending_messages(limit)?)
    }

    /// The contract deployment records announced for the given L2 block.
    pub fn get_contract_deployments(
        &self,
        l2_block_number: u64,
    ) -> Result<Vec<ContractDeploymentData>, ArchiverError> {
        Ok(self.inner.store.get_contract_deployments(l2_block_number)?)
    }

    /// The L1 contract addresses this archiver watches.
    pub fn get_l1_contract_addresses(&self) -> &L1ContractAddresses {
        &self.inner.config.l1_contracts
    }
}

impl<C, S> Inner<C, S>
where
    C: L1Source,
    S: ArchiverStore,
{
    /// Runs one sync cycle. The cursor only advances when every step of the
    /// cycle succeeded.
    async fn sync(&self) -> Result<(), ArchiverError> {
        let cursor = self.cursor.load(Ordering::Acquire);
        let tip = self.source.current_block_number().await?;
        if tip <= cursor {
            trace!(target: "archiver", cursor, tip, "no new l1 blocks");
            return Ok(());
        }
        let from = cursor + 1;

        self.sync_messages(from, tip).await?;
        let appended = self.sync_blocks(from, tip).await?;
        self.sync_contract_deployments(from, tip).await?;

        self.cursor.store(tip, Ordering::Release);
        metrics::gauge!(Metrics::L1_CURSOR).set(tip as f64);
        info!(target: "archiver", cursor = tip, blocks = appended, "sync cycle complete");
        Ok(())
    }

    /// Applies message additions and cancellations in the order they
    /// appeared on L1.
    async fn sync_messages(&self, from: u64, to: u64) -> Result<(), ArchiverError> {
        let mut events = self.source.get_logs(from, to, L1EventKind::MessageAdded).await?;
        events.extend(self.source.get_logs(from, to, L1EventKind::MessageCancelled).await?);
        events.sort_by_key(|event| (event.l1_block_number, event.log_index));

        let mut added = 0u64;
        let mut cancelled = 0u64;
        for event in events {
            match event.data {
                L1EventData::MessageAdded(message) => {
                    self.store.add_pending_message(message)?;
                    added += 1;
                }
                L1EventData::MessageCancelled { key } => {
                    if self.store.cancel_pending_message(key)? {
                        cancelled += 1;
                    } else {
                        debug!(target: "archiver", %key, "dropping cancellation of unknown message");
                    }
                }
                _ => {
                    debug!(target: "archiver", kind = ?event.kind(), "ignoring unexpected event in message window");
                }
            }
        }

        metrics::counter!(Metrics::MESSAGES_PROCESSED_TOTAL, "op" => Metrics::MESSAGE_OP_ADDED)
            .increment(added);
        metrics::counter!(Metrics::MESSAGES_PROCESSED_TOTAL, "op" => Metrics::MESSAGE_OP_CANCELLED)
            .increment(cancelled);
        debug!(target: "archiver", from, to, added, cancelled, "message window applied");
        Ok(())
    }

    /// Reconstructs the L2 blocks committed in the window from rollup
    /// transaction calldata and appends them to the store.
    async fn sync_blocks(&self, from: u64, to: u64) -> Result<usize, ArchiverError> {
        let mut events = self.source.get_logs(from, to, L1EventKind::L2BlockProcessed).await?;
        events.sort_by_key(|event| (event.l1_block_number, event.log_index));

        let mut expected = self.store.get_block_number()? + 1;
        let mut blocks = Vec::with_capacity(events.len());
        for event in events {
            let L1EventData::L2BlockProcessed { l2_block_number, tx_hash } = event.data else {
                debug!(target: "archiver", kind = ?event.kind(), "ignoring unexpected event in block window");
                continue;
            };
            let tx = self.source.get_transaction(tx_hash).await?;
            let calldata = RollupCalldata::from_calldata(&tx.calldata)
                .map_err(|source| ArchiverError::InvalidCalldata { l2_block_number, source })?;
            let block = L2Block::from_body_bytes(&calldata.body)
                .map_err(|source| ArchiverError::Decode { l2_block_number, source })?;
            if block.number != expected {
                return Err(ArchiverError::NonContiguousBlock { expected, got: block.number });
            }
            expected += 1;
            blocks.push(block);
        }
        if blocks.is_empty() {
            return Ok(0);
        }

        for block in &blocks {
            let consumed: Vec<_> = block.consumed_message_keys().collect();
            self.store.confirm_pending_messages(&consumed)?;
        }
        let appended = blocks.len();
        let height = expected - 1;
        self.store.append_blocks(blocks)?;

        metrics::gauge!(Metrics::L2_BLOCK_HEIGHT).set(height as f64);
        metrics::counter!(Metrics::BLOCKS_PROCESSED_TOTAL).increment(appended as u64);
        debug!(target: "archiver", from, to, appended, height, "block window applied");
        Ok(appended)
    }

    /// Records the contract deployments announced in the window.
    async fn sync_contract_deployments(&self, from: u64, to: u64) -> Result<(), ArchiverError> {
        let events = self.source.get_logs(from, to, L1EventKind::ContractDeployment).await?;
        let records: Vec<_> = events
            .into_iter()
            .filter_map(|event| match event.data {
                L1EventData::ContractDeployment(record) => Some(record),
                _ => None,
            })
            .collect();
        if records.is_empty() {
            return Ok(());
        }
        debug!(target: "archiver", from, to, count = records.len(), "recording contract deployments");
        self.store.add_contract_deployments(records)?;
        Ok(())
    }
}

#[async_trait]
impl<C, S> L2BlockSource for Archiver<C, S>
where
    C: L1Source + Send + Sync + 'static,
    S: ArchiverStore + Send + Sync + 'static,
{
    async fn get_block_number(&self) -> Result<u64, L2BlockSourceError> {
        self.inner.store.get_block_number().map_err(into_source_error)
    }

    async fn get_l2_blocks(
        &self,
        from: u64,
        limit: usize,
    ) -> Result<Vec<L2Block>, L2BlockSourceError> {
        self.inner.store.get_blocks(from, limit).map_err(into_source_error)
    }
}

fn into_source_error(err: crate::StoreError) -> L2BlockSourceError {
    L2BlockSourceError::Unavailable(err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{L1Event, L1SourceError, L1Transaction, MemoryArchiverStore};
    use alloy_primitives::{Address, Bytes};
    use mockall::mock;
    use std::collections::HashMap;
    use tessera_types::{L1ToL2Message, TxLogs};

    mock! {
        #[derive(Debug)]
        Source {}

        #[async_trait]
        impl L1Source for Source {
            async fn current_block_number(&self) -> Result<u64, L1SourceError>;
            async fn get_logs(
                &self,
                from: u64,
                to: u64,
                kind: L1EventKind,
            ) -> Result<Vec<L1Event>, L1SourceError>;
            async fn get_transaction(&self, hash: B256) -> Result<L1Transaction, L1SourceError>;
        }
    }

    fn key(group: u8, index: u8) -> B256 {
        let mut bytes = [0u8; 32];
        bytes[0] = group;
        bytes[31] = index;
        B256::new(bytes)
    }

    fn tx_hash(l2_block_number: u64) -> B256 {
        B256::repeat_byte(0xf0 + l2_block_number as u8)
    }

    /// Block `n` carries two message keys, `n` txs with 2 encrypted logs
    /// each and `n` txs with 3 unencrypted logs each.
    fn make_block(number: u64) -> L2Block {
        let mut block = L2Block::empty(number);
        block.new_l1_to_l2_messages = vec![key(number as u8, 1), key(number as u8, 2)];
        block.encrypted_logs = BlockLogs::new(
            (0..number).map(|_| TxLogs::new(vec![Bytes::from_static(b"e"); 2])).collect(),
        );
        block.unencrypted_logs = BlockLogs::new(
            (0..number).map(|_| TxLogs::new(vec![Bytes::from_static(b"u"); 3])).collect(),
        );
        block
    }

    fn rollup_tx(block: &L2Block) -> L1Transaction {
        let calldata =
            RollupCalldata::new(Bytes::from_static(b"proof"), block.to_body_bytes()).to_calldata();
        L1Transaction { hash: tx_hash(block.number), calldata }
    }

    fn added(l1_block_number: u64, log_index: u64, key: B256) -> L1Event {
        L1Event {
            l1_block_number,
            log_index,
            data: L1EventData::MessageAdded(L1ToL2Message {
                key,
                sender: Address::repeat_byte(0xaa),
                recipient: B256::repeat_byte(0xbb),
                content: key,
                secret_hash: B256::repeat_byte(0xcc),
                deadline: 100,
                fee: 1,
                l1_block_number,
            }),
        }
    }

    fn cancelled(l1_block_number: u64, log_index: u64, key: B256) -> L1Event {
        L1Event { l1_block_number, log_index, data: L1EventData::MessageCancelled { key } }
    }

    fn block_processed(l1_block_number: u64, l2_block_number: u64) -> L1Event {
        L1Event {
            l1_block_number,
            log_index: 0,
            data: L1EventData::L2BlockProcessed {
                l2_block_number,
                tx_hash: tx_hash(l2_block_number),
            },
        }
    }

    fn deployment(l1_block_number: u64, l2_block_number: u64) -> L1Event {
        L1Event {
            l1_block_number,
            log_index: 0,
            data: L1EventData::ContractDeployment(ContractDeploymentData {
                l2_block_number,
                contract_address: B256::repeat_byte(l2_block_number as u8),
                portal_address: Address::repeat_byte(l2_block_number as u8),
                partial_address: B256::repeat_byte(0x77),
                public_key_x: B256::repeat_byte(0x78),
                public_key_y: B256::repeat_byte(0x79),
                bytecode: Bytes::from_static(b"acir"),
            }),
        }
    }

    fn expect_logs(
        source: &mut MockSource,
        from: u64,
        to: u64,
        kind: L1EventKind,
        events: Vec<L1Event>,
    ) {
        source
            .expect_get_logs()
            .withf(move |f, t, k| (*f, *t, *k) == (from, to, kind))
            .times(1)
            .return_once(move |_, _, _| Ok(events));
    }

    fn expect_transactions(source: &mut MockSource, blocks: &[L2Block]) {
        let txs: HashMap<B256, L1Transaction> =
            blocks.iter().map(|block| (tx_hash(block.number), rollup_tx(block))).collect();
        source.expect_get_transaction().returning(move |hash| {
            txs.get(&hash).cloned().ok_or(L1SourceError::TransactionNotFound(hash))
        });
    }

    #[tokio::test(start_paused = true)]
    async fn archives_messages_blocks_and_logs_across_windows() {
        let blocks: Vec<_> = (1..=3).map(make_block).collect();
        let cancel = [key(9, 1), key(9, 2)];
        let stay_pending = [key(9, 3), key(9, 4)];

        let mut source = MockSource::new();
        // the tip advances between the three sync windows
        for tip in [2500, 2600, 2600, 2700, 2700, 2700] {
            source.expect_current_block_number().times(1).returning(move || Ok(tip));
        }
        source.expect_current_block_number().returning(|| Ok(2700));

        // window (1, 2500]: messages for blocks 1 and 2, block 1 committed
        let window1_added = vec![
            added(100, 0, key(1, 1)),
            added(100, 1, key(1, 2)),
            added(100, 2, key(2, 1)),
            added(100, 3, key(2, 2)),
        ];
        expect_logs(&mut source, 1, 2500, L1EventKind::MessageAdded, window1_added);
        expect_logs(&mut source, 1, 2500, L1EventKind::MessageCancelled, vec![]);
        expect_logs(&mut source, 1, 2500, L1EventKind::L2BlockProcessed, vec![block_processed(
            101, 1,
        )]);
        expect_logs(&mut source, 1, 2500, L1EventKind::ContractDeployment, vec![deployment(
            103, 1,
        )]);

        // window (2500, 2600]: messages for block 3 plus four extra, two of
        // which get cancelled; blocks 2 and 3 committed
        let window2_added = vec![
            added(2501, 0, key(3, 1)),
            added(2501, 1, key(3, 2)),
            added(2502, 0, cancel[0]),
            added(2502, 1, cancel[1]),
            added(2502, 2, stay_pending[0]),
            added(2502, 3, stay_pending[1]),
        ];
        expect_logs(&mut source, 2501, 2600, L1EventKind::MessageAdded, window2_added);
        expect_logs(&mut source, 2501, 2600, L1EventKind::MessageCancelled, vec![
            cancelled(2503, 0, cancel[0]),
            cancelled(2503, 1, cancel[1]),
        ]);
        expect_logs(&mut source, 2501, 2600, L1EventKind::L2BlockProcessed, vec![
            block_processed(2510, 2),
            block_processed(2520, 3),
        ]);
        expect_logs(&mut source, 2501, 2600, L1EventKind::ContractDeployment, vec![deployment(
            2540, 2,
        )]);

        // window (2600, 2700]: nothing new
        for kind in [
            L1EventKind::MessageAdded,
            L1EventKind::MessageCancelled,
            L1EventKind::L2BlockProcessed,
            L1EventKind::ContractDeployment,
        ] {
            expect_logs(&mut source, 2601, 2700, kind, vec![]);
        }
        expect_transactions(&mut source, &blocks);

        let l1_contracts = L1ContractAddresses {
            rollup: Address::repeat_byte(0x01),
            inbox: Address::repeat_byte(0x02),
            registry: Address::repeat_byte(0x03),
            contract_deployment_emitter: Address::repeat_byte(0x04),
        };
        let config = ArchiverConfig { l1_contracts, ..ArchiverConfig::default() };
        let archiver = Archiver::new(source, MemoryArchiverStore::new(), config);
        assert_eq!(archiver.get_block_number().unwrap(), 0);
        assert_eq!(archiver.get_l1_contract_addresses(), &l1_contracts);
        archiver.start(true).await.unwrap();

        assert_eq!(archiver.get_block_number().unwrap(), 3);
        assert_eq!(archiver.get_l2_blocks(1, 10).unwrap(), blocks);

        // consumed and cancelled messages are gone, the rest stays pending
        assert_eq!(archiver.get_pending_l1_to_l2_messages(10).unwrap(), stay_pending.to_vec());

        let encrypted = archiver.get_logs(1, 100, LogKind::Encrypted).unwrap();
        assert_eq!(encrypted.len(), 3);
        for (index, logs) in encrypted.iter().enumerate() {
            assert_eq!(logs.len(), 2 * (index + 1));
        }
        let unencrypted = archiver.get_logs(1, 100, LogKind::Unencrypted).unwrap();
        assert_eq!(unencrypted.len(), 3);
        for (index, logs) in unencrypted.iter().enumerate() {
            assert_eq!(logs.len(), 3 * (index + 1));
        }

        assert_eq!(archiver.get_contract_deployments(1).unwrap().len(), 1);
        assert_eq!(archiver.get_contract_deployments(2).unwrap().len(), 1);
        assert!(archiver.get_contract_deployments(3).unwrap().is_empty());

        archiver.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn does_not_sync_past_the_l1_tip_snapshot() {
        let blocks: Vec<_> = (1..=3).map(make_block).collect();
        let extra_at_102 = [key(8, 1), key(8, 2)];

        let mut source = MockSource::new();
        source.expect_current_block_number().returning(|| Ok(102));

        // events past the tip snapshot at 102 stay out of the window
        expect_logs(&mut source, 1, 102, L1EventKind::MessageAdded, vec![
            added(100, 0, key(1, 1)),
            added(100, 1, key(1, 2)),
            added(101, 0, key(2, 1)),
            added(101, 1, key(2, 2)),
            added(102, 0, extra_at_102[0]),
            added(102, 1, extra_at_102[1]),
        ]);
        expect_logs(&mut source, 1, 102, L1EventKind::MessageCancelled, vec![]);
        expect_logs(&mut source, 1, 102, L1EventKind::L2BlockProcessed, vec![
            block_processed(70, 1),
            block_processed(80, 2),
        ]);
        expect_logs(&mut source, 1, 102, L1EventKind::ContractDeployment, vec![]);
        expect_transactions(&mut source, &blocks[..2]);

        let archiver = Archiver::new(source, MemoryArchiverStore::new(), ArchiverConfig::default());
        archiver.start(true).await.unwrap();

        assert_eq!(archiver.get_block_number().unwrap(), 2);
        assert_eq!(archiver.get_pending_l1_to_l2_messages(100).unwrap(), extra_at_102.to_vec());

        archiver.stop().await;
    }

    #[tokio::test]
    async fn start_propagates_a_failing_first_cycle() {
        let mut source = MockSource::new();
        source
            .expect_current_block_number()
            .returning(|| Err(L1SourceError::Transport("connection refused".to_string())));

        let archiver = Archiver::new(source, MemoryArchiverStore::new(), ArchiverConfig::default());
        assert!(matches!(archiver.start(false).await, Err(ArchiverError::Source(_))));
    }

    #[tokio::test]
    async fn undecodable_calldata_aborts_the_cycle() {
        let mut source = MockSource::new();
        source.expect_current_block_number().returning(|| Ok(100));
        expect_logs(&mut source, 1, 100, L1EventKind::MessageAdded, vec![]);
        expect_logs(&mut source, 1, 100, L1EventKind::MessageCancelled, vec![]);
        expect_logs(&mut source, 1, 100, L1EventKind::L2BlockProcessed, vec![block_processed(
            50, 1,
        )]);
        source.expect_get_transaction().returning(|hash| {
            Ok(L1Transaction { hash, calldata: Bytes::from_static(b"not calldata") })
        });

        let archiver = Archiver::new(source, MemoryArchiverStore::new(), ArchiverConfig::default());
        assert!(matches!(
            archiver.start(false).await,
            Err(ArchiverError::InvalidCalldata { l2_block_number: 1, .. })
        ));
        // the failed cycle left the store untouched
        assert_eq!(archiver.get_block_number().unwrap(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn background_task_picks_up_later_blocks() {
        let blocks = vec![make_block(1)];

        let mut source = MockSource::new();
        // nothing to do at start, the first background tick finds block 1
        source.expect_current_block_number().times(1).returning(|| Ok(0));
        source.expect_current_block_number().returning(|| Ok(100));
        expect_logs(&mut source, 1, 100, L1EventKind::MessageAdded, vec![
            added(90, 0, key(1, 1)),
            added(90, 1, key(1, 2)),
        ]);
        expect_logs(&mut source, 1, 100, L1EventKind::MessageCancelled, vec![]);
        expect_logs(&mut source, 1, 100, L1EventKind::L2BlockProcessed, vec![block_processed(
            95, 1,
        )]);
        expect_logs(&mut source, 1, 100, L1EventKind::ContractDeployment, vec![]);
        expect_transactions(&mut source, &blocks);

        let archiver = Archiver::new(source, MemoryArchiverStore::new(), ArchiverConfig::default());
        archiver.start(false).await.unwrap();
        assert_eq!(archiver.get_block_number().unwrap(), 0);

        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
        assert_eq!(archiver.get_block_number().unwrap(), 1);
        assert!(archiver.get_pending_l1_to_l2_messages(10).unwrap().is_empty());

        archiver.stop().await;
    }
}
