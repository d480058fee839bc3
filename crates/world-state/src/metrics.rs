#[derive(Debug)]
pub(crate) struct Metrics;

impl Metrics {
    // --- Metric Names ---
    /// Identifier for the gauge tracking the last applied L2 block.
    pub(crate) const SYNCED_L2_BLOCK: &'static str = "world_state_synced_l2_block";

    /// Identifier for the total number of applied blocks.
    pub(crate) const BLOCKS_APPLIED_TOTAL: &'static str = "world_state_blocks_applied_total";

    /// Identifier for failed block applications.
    pub(crate) const APPLY_ERROR_TOTAL: &'static str = "world_state_apply_error_total";

    pub(crate) fn init() {
        Self::describe();
        Self::zero();
    }

    fn describe() {
        metrics::describe_gauge!(
            Self::SYNCED_L2_BLOCK,
            "Number of the last L2 block applied to the world state",
        );

        metrics::describe_counter!(
            Self::BLOCKS_APPLIED_TOTAL,
            metrics::Unit::Count,
            "Total number of L2 blocks applied to the world state",
        );

        metrics::describe_counter!(
            Self::APPLY_ERROR_TOTAL,
            metrics::Unit::Count,
            "Total number of failed L2 block applications",
        );
    }

    fn zero() {
        metrics::gauge!(Self::SYNCED_L2_BLOCK).set(0.0);
        metrics::counter!(Self::BLOCKS_APPLIED_TOTAL).increment(0);
        metrics::counter!(Self::APPLY_ERROR_TOTAL).increment(0);
    }
}
