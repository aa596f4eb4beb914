//! Driver entries and the per-scope driver list
//!
//! The list is copy-on-write: readers take an `Arc` snapshot and iterate it
//! without holding any lock, writers swap in a new vector. A reader can
//! never observe a half-built list.

use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::engine::traits::{DriverAction, DriverHandle};

/// Pointer identity of two driver handles
pub fn same_driver(a: &DriverHandle, b: &DriverHandle) -> bool {
    std::ptr::addr_eq(Arc::as_ptr(a), Arc::as_ptr(b))
}

/// Address of the driver behind `driver`, usable as a map key
pub(crate) fn driver_key(driver: &DriverHandle) -> usize {
    Arc::as_ptr(driver) as *const () as usize
}

/// A registered driver plus its optional deregistration callback
#[derive(Clone)]
pub struct DriverEntry {
    driver: DriverHandle,
    action: Option<Arc<dyn DriverAction>>,
}

impl DriverEntry {
    pub fn new(driver: DriverHandle, action: Option<Arc<dyn DriverAction>>) -> Self {
        Self { driver, action }
    }

    pub fn driver(&self) -> &DriverHandle {
        &self.driver
    }

    pub fn action(&self) -> Option<&Arc<dyn DriverAction>> {
        self.action.as_ref()
    }

    /// True if this entry wraps exactly `driver`
    pub fn is(&self, driver: &DriverHandle) -> bool {
        same_driver(&self.driver, driver)
    }
}

impl PartialEq for DriverEntry {
    fn eq(&self, other: &Self) -> bool {
        same_driver(&self.driver, &other.driver)
    }
}

impl Eq for DriverEntry {}

impl fmt::Debug for DriverEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DriverEntry")
            .field("driver", &self.driver.name())
            .field("has_action", &self.action.is_some())
            .finish()
    }
}

/// Ordered, duplicate-free list of driver entries
#[derive(Default)]
pub struct DriverList {
    entries: RwLock<Arc<Vec<DriverEntry>>>,
}

impl DriverList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Point-in-time view of the list, safe to iterate while writers run
    pub fn snapshot(&self) -> Arc<Vec<DriverEntry>> {
        Arc::clone(&*self.entries.read())
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    pub fn contains(&self, driver: &DriverHandle) -> bool {
        self.entries.read().iter().any(|e| e.is(driver))
    }

    pub fn find(&self, driver: &DriverHandle) -> Option<DriverEntry> {
        self.entries.read().iter().find(|e| e.is(driver)).cloned()
    }

    /// Appends `entry` unless an entry for the same driver is present.
    /// Returns whether the list changed.
    pub fn add_if_absent(&self, entry: DriverEntry) -> bool {
        let mut guard = self.entries.write();
        if guard.iter().any(|e| *e == entry) {
            return false;
        }
        Arc::make_mut(&mut *guard).push(entry);
        true
    }

    /// Appends every entry not already present, keeping their order.
    /// Returns how many were added.
    pub fn add_all_absent<I>(&self, entries: I) -> usize
    where
        I: IntoIterator<Item = DriverEntry>,
    {
        let mut guard = self.entries.write();
        let mut next: Vec<DriverEntry> = guard.iter().cloned().collect();
        let before = next.len();
        for entry in entries {
            if !next.contains(&entry) {
                next.push(entry);
            }
        }
        let added = next.len() - before;
        if added > 0 {
            *guard = Arc::new(next);
        }
        added
    }

    /// Removes the entry for `driver`, returning it if it was present
    pub fn remove(&self, driver: &DriverHandle) -> Option<DriverEntry> {
        let mut guard = self.entries.write();
        let index = guard.iter().position(|e| e.is(driver))?;
        Some(Arc::make_mut(&mut *guard).remove(index))
    }
}

impl fmt::Debug for DriverList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.snapshot().iter()).finish()
    }
}
