//! In-memory world state implementation for testing

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::ops::Bound;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, RwLock};

use crate::traits::*;
use crate::types::*;

/// Operation a [`StoreFault`] is armed against
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultTarget {
    /// `get_state`
    Read,
    /// `put_state` and `del_state`
    Write,
    /// The second entry produced by a range scan
    ScanEntry,
}

/// Failure injected into the next matching operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreFault {
    /// Fails with [`LedgerError::Store`]
    Unavailable(String),
    /// Fails with [`LedgerError::Conflict`]
    Conflict(String),
}

impl StoreFault {
    fn into_error(self) -> LedgerError {
        match self {
            StoreFault::Unavailable(msg) => LedgerError::Store(msg),
            StoreFault::Conflict(msg) => LedgerError::Conflict(msg),
        }
    }
}

/// In-memory world state for testing and development
///
/// Keys are kept ordered so range scans behave like the host's. Clones share
/// the same underlying namespace.
#[derive(Debug, Clone, Default)]
pub struct MemoryWorldState {
    entries: Arc<RwLock<BTreeMap<String, Vec<u8>>>>,
    faults: Arc<Mutex<Vec<(FaultTarget, StoreFault)>>>,
    open_scans: Arc<AtomicUsize>,
}

impl MemoryWorldState {
    /// Create an empty namespace
    pub fn new() -> Self {
        Self::default()
    }

    /// Arm a one-shot fault for the next operation of the given kind
    pub fn inject_fault(&self, target: FaultTarget, fault: StoreFault) {
        if let Ok(mut faults) = self.faults.lock() {
            faults.push((target, fault));
        }
    }

    /// Number of range scans opened and not yet released
    pub fn open_scans(&self) -> usize {
        self.open_scans.load(Ordering::SeqCst)
    }

    /// Number of keys currently stored
    pub fn len(&self) -> usize {
        self.entries.read().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Write raw bytes, bypassing entity encoding
    pub fn put_raw(&self, key: &str, value: &[u8]) -> LedgerResult<()> {
        self.write_entries()?
            .insert(key.to_string(), value.to_vec());
        Ok(())
    }

    /// Clear all data (useful for testing)
    pub fn clear(&self) -> LedgerResult<()> {
        self.write_entries()?.clear();
        Ok(())
    }

    fn take_fault(&self, target: FaultTarget) -> Option<StoreFault> {
        let mut faults = self.faults.lock().ok()?;
        let index = faults.iter().position(|(t, _)| *t == target)?;
        Some(faults.remove(index).1)
    }

    fn check_fault(&self, target: FaultTarget) -> LedgerResult<()> {
        match self.take_fault(target) {
            Some(fault) => Err(fault.into_error()),
            None => Ok(()),
        }
    }

    fn write_entries(
        &self,
    ) -> LedgerResult<std::sync::RwLockWriteGuard<'_, BTreeMap<String, Vec<u8>>>> {
        self.entries
            .write()
            .map_err(|_| LedgerError::Store("world state lock poisoned".to_string()))
    }

    fn read_entries(
        &self,
    ) -> LedgerResult<std::sync::RwLockReadGuard<'_, BTreeMap<String, Vec<u8>>>> {
        self.entries
            .read()
            .map_err(|_| LedgerError::Store("world state lock poisoned".to_string()))
    }
}

#[async_trait]
impl WorldState for MemoryWorldState {
    async fn get_state(&self, key: &str) -> LedgerResult<Option<Vec<u8>>> {
        self.check_fault(FaultTarget::Read)?;
        Ok(self.read_entries()?.get(key).cloned())
    }

    async fn put_state(&self, key: &str, value: Vec<u8>) -> LedgerResult<()> {
        self.check_fault(FaultTarget::Write)?;
        self.write_entries()?.insert(key.to_string(), value);
        Ok(())
    }

    async fn del_state(&self, key: &str) -> LedgerResult<()> {
        self.check_fault(FaultTarget::Write)?;
        self.write_entries()?.remove(key);
        Ok(())
    }

    async fn get_state_by_range(&self, start_key: &str, end_key: &str) -> LedgerResult<StateScan> {
        let lower = if start_key.is_empty() {
            Bound::Unbounded
        } else {
            Bound::Included(start_key.to_string())
        };
        let upper = if end_key.is_empty() {
            Bound::Unbounded
        } else {
            Bound::Excluded(end_key.to_string())
        };

        // Snapshot at open time, as the host's iterator would read a fixed version.
        let snapshot: Vec<KeyValue> = self
            .read_entries()?
            .range((lower, upper))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();

        self.open_scans.fetch_add(1, Ordering::SeqCst);
        Ok(StateScan::new(Box::new(MemoryIterator {
            entries: snapshot.into_iter(),
            position: 0,
            fault: self.take_fault(FaultTarget::ScanEntry),
            open_scans: Arc::clone(&self.open_scans),
        })))
    }
}

struct MemoryIterator {
    entries: std::vec::IntoIter<KeyValue>,
    position: usize,
    fault: Option<StoreFault>,
    open_scans: Arc<AtomicUsize>,
}

impl StateIterator for MemoryIterator {
    fn next_entry(&mut self) -> Option<LedgerResult<KeyValue>> {
        self.position += 1;
        if self.position == 2 {
            if let Some(fault) = self.fault.take() {
                return Some(Err(fault.into_error()));
            }
        }
        self.entries.next().map(Ok)
    }

    fn close(&mut self) {
        self.open_scans.fetch_sub(1, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_range_bounds() {
        let state = MemoryWorldState::new();
        for key in ["a", "b", "c", "d"] {
            state.put_state(key, key.as_bytes().to_vec()).await.unwrap();
        }

        let keys = |scan: StateScan| -> Vec<String> {
            scan.map(|entry| entry.unwrap().0).collect()
        };

        assert_eq!(keys(state.get_state_by_range("", "").await.unwrap()).len(), 4);
        assert_eq!(
            keys(state.get_state_by_range("b", "d").await.unwrap()),
            vec!["b".to_string(), "c".to_string()]
        );
        assert_eq!(keys(state.get_state_by_range("c", "").await.unwrap()).len(), 2);
        assert_eq!(state.open_scans(), 0);
    }

    #[tokio::test]
    async fn test_dropped_scan_is_released() {
        let state = MemoryWorldState::new();
        state.put_state("a", vec![1]).await.unwrap();
        state.put_state("b", vec![2]).await.unwrap();

        let mut scan = state.get_state_by_range("", "").await.unwrap();
        assert!(scan.next().is_some());
        assert_eq!(state.open_scans(), 1);

        drop(scan);
        assert_eq!(state.open_scans(), 0);
    }

    #[tokio::test]
    async fn test_faults_are_one_shot() {
        let state = MemoryWorldState::new();
        state.inject_fault(FaultTarget::Write, StoreFault::Conflict("mvcc".to_string()));

        let err = state.put_state("a", vec![1]).await.unwrap_err();
        assert!(err.is_retryable());
        state.put_state("a", vec![1]).await.unwrap();
        assert_eq!(state.get_state("a").await.unwrap(), Some(vec![1]));
    }
}
