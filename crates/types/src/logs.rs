use alloy_primitives::Bytes;
use alloy_rlp::{RlpDecodable, RlpEncodable};

/// The two kinds of logs an L2 transaction can emit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LogKind {
    /// Logs readable only by the intended recipient.
    Encrypted,
    /// Publicly readable logs.
    Unencrypted,
}

/// The logs emitted by a single L2 transaction.
#[derive(Debug, Clone, Default, PartialEq, Eq, RlpEncodable, RlpDecodable)]
pub struct TxLogs {
    /// The individual log payloads, in emission order.
    pub logs: Vec<Bytes>,
}

impl TxLogs {
    /// Creates a new [`TxLogs`] bundle.
    pub const fn new(logs: Vec<Bytes>) -> Self {
        Self { logs }
    }

    /// The number of logs in the bundle.
    pub fn len(&self) -> usize {
        self.logs.len()
    }

    /// Whether the bundle holds no logs.
    pub fn is_empty(&self) -> bool {
        self.logs.is_empty()
    }
}

/// The logs of one kind emitted by every transaction in an L2 block.
#[derive(Debug, Clone, Default, PartialEq, Eq, RlpEncodable, RlpDecodable)]
pub struct BlockLogs {
    /// One entry per transaction, in block order.
    pub tx_logs: Vec<TxLogs>,
}

impl BlockLogs {
    /// Creates a new [`BlockLogs`] bundle.
    pub const fn new(tx_logs: Vec<TxLogs>) -> Self {
        Self { tx_logs }
    }

    /// The total number of logs across all transactions.
    pub fn len(&self) -> usize {
        self.tx_logs.iter().map(TxLogs::len).sum()
    }

    /// Whether no transaction emitted a log.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn block_logs_counts_unrolled_logs() {
        let logs = BlockLogs::new(vec![
            TxLogs::new(vec![Bytes::from_static(b"a"), Bytes::from_static(b"b")]),
            TxLogs::new(vec![]),
            TxLogs::new(vec![Bytes::from_static(b"c")]),
        ]);
        assert_eq!(logs.len(), 3);
        assert!(!logs.is_empty());
        assert!(BlockLogs::default().is_empty());
    }
}
