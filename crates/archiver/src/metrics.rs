#[derive(Debug)]
pub(crate) struct Metrics;

impl Metrics {
    // --- Metric Names ---
    /// Identifier for the gauge tracking the last L1 block a sync cycle
    /// covered.
    pub(crate) const L1_CURSOR: &'static str = "archiver_l1_cursor";

    /// Identifier for the gauge tracking the latest mirrored L2 block.
    pub(crate) const L2_BLOCK_HEIGHT: &'static str = "archiver_l2_block_height";

    /// Identifier for the total number of L2 blocks mirrored from L1.
    pub(crate) const BLOCKS_PROCESSED_TOTAL: &'static str = "archiver_blocks_processed_total";

    /// Identifier for processed message lifecycle events.
    /// Labels: `op`
    pub(crate) const MESSAGES_PROCESSED_TOTAL: &'static str = "archiver_messages_processed_total";

    /// Identifier for failed sync cycles.
    pub(crate) const SYNC_ERROR_TOTAL: &'static str = "archiver_sync_error_total";

    pub(crate) const MESSAGE_OP_ADDED: &'static str = "added";
    pub(crate) const MESSAGE_OP_CANCELLED: &'static str = "cancelled";

    pub(crate) fn init() {
        Self::describe();
        Self::zero();
    }

    fn describe() {
        metrics::describe_gauge!(
            Self::L1_CURSOR,
            "Last L1 block number covered by a successful archiver sync cycle",
        );

        metrics::describe_gauge!(
            Self::L2_BLOCK_HEIGHT,
            "Latest L2 block number mirrored by the archiver",
        );

        metrics::describe_counter!(
            Self::BLOCKS_PROCESSED_TOTAL,
            metrics::Unit::Count,
            "Total number of L2 blocks mirrored from L1",
        );

        metrics::describe_counter!(
            Self::MESSAGES_PROCESSED_TOTAL,
            metrics::Unit::Count,
            "Total number of L1-to-L2 message lifecycle events applied",
        );

        metrics::describe_counter!(
            Self::SYNC_ERROR_TOTAL,
            metrics::Unit::Count,
            "Total number of failed archiver sync cycles",
        );
    }

    fn zero() {
        metrics::gauge!(Self::L1_CURSOR).set(0.0);
        metrics::gauge!(Self::L2_BLOCK_HEIGHT).set(0.0);
        metrics::counter!(Self::BLOCKS_PROCESSED_TOTAL).increment(0);
        metrics::counter!(Self::MESSAGES_PROCESSED_TOTAL, "op" => Self::MESSAGE_OP_ADDED)
            .increment(0);
        metrics::counter!(Self::MESSAGES_PROCESSED_TOTAL, "op" => Self::MESSAGE_OP_CANCELLED)
            .increment(0);
        metrics::counter!(Self::SYNC_ERROR_TOTAL).increment(0);
    }
}
