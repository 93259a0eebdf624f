//! Storage of redeemed serial numbers.

use std::{
    collections::HashSet,
    sync::{Arc, Mutex, PoisonError},
};

use crate::pedersen::SerialNumber;

/// Set of serial numbers that have already been redeemed.
///
/// Implementations must be safe to share between concurrent registrations. In particular
/// [NullifierSet::insert_all] is the only point where registration mutates state, and it must
/// check and insert in a single critical section.
pub trait NullifierSet {
    fn contains(&self, serial_number: &SerialNumber) -> bool;

    /// Record all of the given serial numbers, or none of them.
    ///
    /// Returns `false`, leaving the set unchanged, if any serial number is already present or
    /// appears twice in `serial_numbers`.
    fn insert_all(&self, serial_numbers: &[SerialNumber]) -> bool;
}

impl<T: NullifierSet + ?Sized> NullifierSet for Arc<T> {
    fn contains(&self, serial_number: &SerialNumber) -> bool {
        (**self).contains(serial_number)
    }

    fn insert_all(&self, serial_numbers: &[SerialNumber]) -> bool {
        (**self).insert_all(serial_numbers)
    }
}

/// A process-local [NullifierSet]. Contents are lost when it is dropped.
#[derive(Debug, Default)]
pub struct InMemoryNullifierSet {
    spent: Mutex<HashSet<[u8; 32]>>,
}

impl InMemoryNullifierSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.spent.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl NullifierSet for InMemoryNullifierSet {
    fn contains(&self, serial_number: &SerialNumber) -> bool {
        self.spent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(&serial_number.to_bytes())
    }

    fn insert_all(&self, serial_numbers: &[SerialNumber]) -> bool {
        let keys: Vec<[u8; 32]> = serial_numbers.iter().map(SerialNumber::to_bytes).collect();
        let mut spent = self.spent.lock().unwrap_or_else(PoisonError::into_inner);

        let mut batch = HashSet::with_capacity(keys.len());
        if !keys.iter().all(|k| !spent.contains(k) && batch.insert(*k)) {
            return false;
        }
        spent.extend(batch);
        true
    }
}
