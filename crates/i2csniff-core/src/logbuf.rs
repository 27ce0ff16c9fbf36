use i2csniff_decode::{Transaction, TransactionSink};
use std::collections::VecDeque;
use std::time::{SystemTime, UNIX_EPOCH};

#[derive(Debug, Clone)]
pub struct LogEntry {
    /// Wall-clock receive time, ms since the Unix epoch.
    pub timestamp: u64,
    pub transaction: Transaction,
}

/// Bounded history of decoded transactions.
pub struct TransactionLog {
    entries: VecDeque<LogEntry>,
    max_entries: usize,
    anomalies_only: bool,
    total: u64,
    anomalous: u64,
}

impl TransactionLog {
    pub fn new(max_entries: usize) -> Self {
        Self {
            entries: VecDeque::new(),
            max_entries,
            anomalies_only: false,
            total: 0,
            anomalous: 0,
        }
    }

    /// Only show transactions carrying annotations.
    pub fn set_anomalies_only(&mut self, anomalies_only: bool) {
        self.anomalies_only = anomalies_only;
    }

    pub fn push(&mut self, transaction: Transaction) {
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0);
        self.push_at(timestamp, transaction);
    }

    pub fn push_at(&mut self, timestamp: u64, transaction: Transaction) {
        self.total += 1;
        if !transaction.is_clean() {
            self.anomalous += 1;
        }
        if self.max_entries == 0 {
            return;
        }
        self.entries.push_back(LogEntry {
            timestamp,
            transaction,
        });
        while self.entries.len() > self.max_entries {
            self.entries.pop_front();
        }
    }

    pub fn entries(&self) -> impl Iterator<Item = &LogEntry> {
        let anomalies_only = self.anomalies_only;
        self.entries
            .iter()
            .filter(move |e| !anomalies_only || !e.transaction.is_clean())
    }

    /// Transactions seen since creation, including evicted ones.
    pub fn total(&self) -> u64 {
        self.total
    }

    pub fn anomalous(&self) -> u64 {
        self.anomalous
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn to_text(&self, show_timestamp: bool) -> String {
        let mut result = String::new();
        for entry in self.entries() {
            if show_timestamp {
                let millis = entry.timestamp % 1000;
                let secs = entry.timestamp / 1000;
                let hours = (secs / 3600) % 24;
                let minutes = (secs / 60) % 60;
                let seconds = secs % 60;
                result.push_str(&format!("[{hours:02}:{minutes:02}:{seconds:02}.{millis:03}] "));
            }
            result.push_str(&entry.transaction.text());
            result.push('\n');
        }
        result
    }
}

impl TransactionSink for TransactionLog {
    fn accept(&mut self, transaction: Transaction) {
        self.push(transaction);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use i2csniff_decode::Token;

    fn txn(tokens: Vec<Token>) -> Transaction {
        Transaction {
            start_tick: None,
            tokens,
        }
    }

    #[test]
    fn test_bounded() {
        let mut log = TransactionLog::new(2);
        for b in 0..5u8 {
            log.push_at(0, txn(vec![Token::Start, Token::Byte(b), Token::Ack, Token::Stop]));
        }
        assert_eq!(log.total(), 5);
        let texts: Vec<String> = log.entries().map(|e| e.transaction.text()).collect();
        assert_eq!(texts, vec!["[03+]", "[04+]"]);
    }

    #[test]
    fn test_anomaly_filter() {
        let mut log = TransactionLog::new(10);
        log.push_at(0, txn(vec![Token::Start, Token::Stop]));
        log.push_at(0, txn(vec![Token::Start, Token::Timeout]));
        assert_eq!(log.anomalous(), 1);
        log.set_anomalies_only(true);
        assert_eq!(log.to_text(false), "[ !to\n");
        log.set_anomalies_only(false);
        assert_eq!(log.entries().count(), 2);
    }

    #[test]
    fn test_text_timestamps() {
        let mut log = TransactionLog::new(10);
        // 01:02:03.456 UTC on day 0
        log.push_at(3_723_456, txn(vec![Token::Start, Token::Stop]));
        assert_eq!(log.to_text(true), "[01:02:03.456] []\n");
    }

    #[test]
    fn test_zero_capacity_still_counts() {
        let mut log = TransactionLog::new(0);
        log.accept(txn(vec![Token::Start, Token::Stop]));
        assert_eq!(log.total(), 1);
        assert_eq!(log.entries().count(), 0);
    }
}
