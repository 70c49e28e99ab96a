// Copyright 2022 Matthew Ingwersen.
//
// Licensed under the Apache License, Version 2.0 (the "License"); you
// may not use this file except in compliance with the License. You may
// obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or
// implied. See the License for the specific language governing
// permissions and limitations under the License.

//! The process-wide table of zone lifecycle states.
//!
//! Every zone that has been operated on has an entry consisting of an
//! asynchronous lock and a [`ZoneState`]. [`ZoneRegistry::acquire`]
//! suspends until the zone's lock is free and returns a [`LockHandle`],
//! which is the only way to change the zone's state. Locks are per
//! zone, so operations on different zones never wait for each other;
//! the table itself is only locked briefly to look up entries.
//!
//! An entry whose state is still [`ZoneState::Unknown`] when its last
//! handle is released is removed, so looking up names that never
//! become zones does not grow the table.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex};

use serde::Serialize;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

/// The lifecycle state of a zone.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ZoneState {
    /// Nothing is known about the zone.
    #[default]
    Unknown,

    /// A change to the zone is in flight.
    Pending,

    /// The zone file is written and the daemon has accepted the zone.
    Active,

    /// The last operation did not complete cleanly. The zone file and
    /// the daemon may disagree.
    Failed,

    /// The zone was removed from both the daemon and the disk.
    Deleted,
}

impl ZoneState {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Unknown => "unknown",
            Self::Pending => "pending",
            Self::Active => "active",
            Self::Failed => "failed",
            Self::Deleted => "deleted",
        }
    }
}

impl fmt::Display for ZoneState {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

////////////////////////////////////////////////////////////////////////
// REGISTRY                                                           //
////////////////////////////////////////////////////////////////////////

/// The table of zone states and per-zone locks.
#[derive(Debug, Default)]
pub struct ZoneRegistry {
    entries: Arc<Table>,
}

type Table = Mutex<HashMap<Box<str>, Arc<Entry>>>;

#[derive(Debug, Default)]
struct Entry {
    lock: Arc<AsyncMutex<()>>,
    state: Mutex<ZoneState>,
}

impl ZoneRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Waits until no other [`LockHandle`] for `zone` exists and
    /// returns a new one. The lock is released when the handle is
    /// dropped.
    pub async fn acquire(&self, zone: &str) -> LockHandle {
        let entry = self
            .entries
            .lock()
            .unwrap()
            .entry(zone.into())
            .or_default()
            .clone();
        let guard = entry.lock.clone().lock_owned().await;
        LockHandle {
            zone: zone.into(),
            entry,
            table: self.entries.clone(),
            _guard: guard,
        }
    }

    /// Returns the current state of `zone`. This does not wait for the
    /// zone's lock.
    pub fn state(&self, zone: &str) -> ZoneState {
        match self.entries.lock().unwrap().get(zone) {
            Some(entry) => *entry.state.lock().unwrap(),
            None => ZoneState::Unknown,
        }
    }

    /// Returns the states of all zones whose state is not
    /// [`ZoneState::Unknown`], sorted by name.
    pub fn snapshot(&self) -> Vec<(String, ZoneState)> {
        let mut snapshot: Vec<(String, ZoneState)> = self
            .entries
            .lock()
            .unwrap()
            .iter()
            .map(|(zone, entry)| (zone.to_string(), *entry.state.lock().unwrap()))
            .filter(|&(_, state)| state != ZoneState::Unknown)
            .collect();
        snapshot.sort_unstable_by(|a, b| a.0.cmp(&b.0));
        snapshot
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.entries.lock().unwrap().len()
    }
}

/// Exclusive access to a zone's entry in a [`ZoneRegistry`].
#[derive(Debug)]
pub struct LockHandle {
    zone: Box<str>,
    entry: Arc<Entry>,
    table: Arc<Table>,
    _guard: OwnedMutexGuard<()>,
}

impl LockHandle {
    pub fn zone(&self) -> &str {
        &self.zone
    }

    pub fn state(&self) -> ZoneState {
        *self.entry.state.lock().unwrap()
    }

    pub fn set_state(&self, state: ZoneState) {
        *self.entry.state.lock().unwrap() = state;
    }
}

impl Drop for LockHandle {
    fn drop(&mut self) {
        // Entries are only cloned with the table locked, so a count of
        // two (the table's and ours) means nobody is waiting.
        let mut entries = self.table.lock().unwrap();
        if Arc::strong_count(&self.entry) == 2 && self.state() == ZoneState::Unknown {
            entries.remove(&self.zone);
        }
    }
}

////////////////////////////////////////////////////////////////////////
// TESTS                                                              //
////////////////////////////////////////////////////////////////////////
