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

//! The zone lifecycle orchestrator.
//!
//! An [`Orchestrator`] ties the other modules together. Each mutating
//! operation holds the zone's lock in the [`ZoneRegistry`] for its
//! whole duration:
//!
//! * **Create/update** validates and renders the zone, writes the zone
//!   file atomically, and then asks the daemon to add the zone or, if
//!   it already has it, to replace the zone's configuration and reload
//!   it. If the daemon refuses, the zone file is restored to what it
//!   was before the operation.
//! * **Delete** asks the daemon to drop the zone first, and only then
//!   removes the zone file. If the daemon refuses, the file is left
//!   alone.
//! * **Record changes** send a dynamic update for one record of an
//!   active zone. The server applies an update completely or not at
//!   all, so a failure leaves the zone's state alone.
//!
//! A failed create, update, or delete leaves the zone
//! [`ZoneState::Failed`] and returns the error that caused it.
//!
//! Validation and rendering happen in the caller's future. Everything
//! from the first change to the disk or the daemon onward happens in a
//! spawned task that owns the zone's lock, so that a caller that gives
//! up (e.g. because its client disconnected) cannot leave the disk and
//! the daemon half-updated.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use log::{debug, error, info, warn};
use serde::Serialize;

use crate::control::nsupdate::{self, Nsupdate, Update};
use crate::control::rndc::{self, Rndc, ZoneStatus};
use crate::control::{CommandOutcome, ExecError, Executor};
use crate::fs::ZoneFiles;
use crate::name;
use crate::registry::{LockHandle, ZoneRegistry, ZoneState};
use crate::zone::{
    self, Reason, RecordData, RecordMatch, RecordSelector, RecordSpec, RecordType,
    SoaStrictness, ValidatedZone, ValidationError, ZoneConfig, ZoneKind,
};
use crate::zone_file::{self, ZoneFileText};

mod error;
pub use error::{Error, ErrorKind, Operation};

////////////////////////////////////////////////////////////////////////
// CONFIGURATION                                                      //
////////////////////////////////////////////////////////////////////////

/// Process-wide settings for an [`Orchestrator`].
#[derive(Clone, Debug)]
pub struct OrchestratorConfig {
    /// The directory in which zone files are written. The daemon must
    /// be able to read it.
    pub zone_dir: PathBuf,

    /// The path of the `rndc` program.
    pub rndc_program: PathBuf,

    /// Arguments passed to `rndc` before every subcommand (e.g. `-s`,
    /// `-p`, `-k`, `-c` options).
    pub rndc_args: Vec<String>,

    /// The path of the `nsupdate` program.
    pub nsupdate_program: PathBuf,

    /// The server to which dynamic updates are sent.
    pub update_server: String,
    pub update_port: u16,

    /// A file holding the TSIG key that signs dynamic updates.
    pub update_key_file: Option<PathBuf>,

    /// How long to wait for each `rndc` or `nsupdate` invocation.
    pub command_timeout: Duration,

    pub soa_strictness: SoaStrictness,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            zone_dir: PathBuf::from("/var/cache/bind"),
            rndc_program: PathBuf::from("/usr/sbin/rndc"),
            rndc_args: Vec::new(),
            nsupdate_program: PathBuf::from("/usr/bin/nsupdate"),
            update_server: "127.0.0.1".into(),
            update_port: 53,
            update_key_file: None,
            command_timeout: Duration::from_secs(10),
            soa_strictness: SoaStrictness::Advisory,
        }
    }
}

////////////////////////////////////////////////////////////////////////
// ORCHESTRATOR                                                       //
////////////////////////////////////////////////////////////////////////

/// Manages the lifecycle of zones on disk and in the daemon.
///
/// Cloning an `Orchestrator` is cheap; clones share the same registry.
pub struct Orchestrator<E> {
    inner: Arc<Inner<E>>,
}

struct Inner<E> {
    files: ZoneFiles,
    rndc: Rndc<E>,
    nsupdate: Nsupdate<E>,
    registry: ZoneRegistry,
    soa_strictness: SoaStrictness,
}

impl<E> Clone for Orchestrator<E> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

/// What is known about a zone, as reported by
/// [`Orchestrator::zone_info`].
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ZoneInfo {
    pub name: String,
    pub state: ZoneState,

    /// The zone type as the daemon reports it (e.g. `primary`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub zone_type: Option<String>,

    /// The serial of the zone as loaded by the daemon.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub serial: Option<u32>,

    /// The zone file, if one exists.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<PathBuf>,
}

impl<E: Executor> Orchestrator<E> {
    pub fn new(config: OrchestratorConfig, executor: E) -> Self {
        let executor = Arc::new(executor);
        Self {
            inner: Arc::new(Inner {
                files: ZoneFiles::new(config.zone_dir),
                rndc: Rndc::new(
                    executor.clone(),
                    config.rndc_program,
                    config.rndc_args,
                    config.command_timeout,
                ),
                nsupdate: Nsupdate::new(
                    executor,
                    config.nsupdate_program,
                    config.update_server,
                    config.update_port,
                    config.update_key_file,
                    config.command_timeout,
                ),
                registry: ZoneRegistry::new(),
                soa_strictness: config.soa_strictness,
            }),
        }
    }

    /// Returns the `rndc` handle, for subcommands that the orchestrator
    /// does not issue itself (e.g. `freeze` and `thaw`).
    pub fn rndc(&self) -> &Rndc<E> {
        &self.inner.rndc
    }

    pub fn zone_files(&self) -> &ZoneFiles {
        &self.inner.files
    }

    /// Creates a zone or, if it is already active, updates it. Returns
    /// the zone's new state, which is always [`ZoneState::Active`].
    ///
    /// Repeating a successful call with the same description is
    /// harmless.
    pub async fn create_or_update_zone(&self, config: &ZoneConfig) -> Result<ZoneState, Error> {
        let zone = zone::validate(config, self.inner.soa_strictness).map_err(|e| {
            let operation = match name::normalize_zone_name(&config.zone_name) {
                Ok(ref normalized) if self.get_zone_status(normalized) == ZoneState::Active => {
                    Operation::Update
                }
                _ => Operation::Create,
            };
            Error::new(&config.zone_name, operation, ErrorKind::Validation(e))
        })?;
        for warning in zone.warnings() {
            warn!("Zone {}: {}.", zone.name(), warning);
        }
        let text = zone_file::render(&zone);

        let handle = self.inner.registry.acquire(zone.name()).await;
        let operation = if handle.state() == ZoneState::Active {
            Operation::Update
        } else {
            Operation::Create
        };
        let name = zone.name().to_owned();
        info!("Attempting to {} zone {}.", operation, name);

        let inner = self.inner.clone();
        let result = run_committed(&name, operation, async move {
            inner.commit_upsert(handle, operation, zone, text).await
        })
        .await;
        log_result(&name, operation, &result);
        result
    }

    /// Deletes a zone from the daemon and the disk. Deleting a zone
    /// that does not exist succeeds.
    pub async fn delete_zone(&self, zone_name: &str) -> Result<(), Error> {
        let name = normalize(zone_name, Operation::Delete)?;
        let handle = self.inner.registry.acquire(&name).await;
        info!("Attempting to {} zone {}.", Operation::Delete, name);

        let inner = self.inner.clone();
        let result = run_committed(&name, Operation::Delete, async move {
            inner.commit_delete(handle).await
        })
        .await;
        log_result(&name, Operation::Delete, &result);
        result
    }

    /// Adds a record to an active zone. A relative owner is taken
    /// relative to the zone apex, and a missing TTL becomes
    /// [`nsupdate::DEFAULT_TTL`].
    pub async fn add_record(&self, zone_name: &str, spec: &RecordSpec) -> Result<(), Error> {
        let operation = Operation::AddRecord;
        let name = normalize(zone_name, operation)?;
        let change = addition(spec, &name).map_err(|e| invalid(&name, operation, e))?;
        self.change_records(name, operation, vec![change]).await
    }

    /// Removes the records of an active zone that `selector` matches.
    /// Removing records that do not exist succeeds.
    pub async fn remove_record(
        &self,
        zone_name: &str,
        selector: &RecordSelector,
    ) -> Result<(), Error> {
        let operation = Operation::RemoveRecord;
        let name = normalize(zone_name, operation)?;
        let change = removal(selector, &name).map_err(|e| invalid(&name, operation, e))?;
        self.change_records(name, operation, vec![change]).await
    }

    /// Replaces the records that `current` matches with `replacement`
    /// in one dynamic update. Both must have the same owner and type.
    pub async fn update_record(
        &self,
        zone_name: &str,
        current: &RecordSelector,
        replacement: &RecordSpec,
    ) -> Result<(), Error> {
        let operation = Operation::UpdateRecord;
        let name = normalize(zone_name, operation)?;
        let changes = replacement_changes(current, replacement, &name)
            .map_err(|e| invalid(&name, operation, e))?;
        self.change_records(name, operation, changes).await
    }

    async fn change_records(
        &self,
        name: String,
        operation: Operation,
        changes: Vec<Change>,
    ) -> Result<(), Error> {
        let handle = self.inner.registry.acquire(&name).await;
        info!("Attempting to {} zone {}.", operation, name);

        let inner = self.inner.clone();
        let result = run_committed(&name, operation, async move {
            inner.commit_changes(handle, operation, changes).await
        })
        .await;
        log_result(&name, operation, &result);
        result
    }

    /// Asks the daemon to transfer a slave zone from its primaries
    /// again, discarding its current copy.
    pub async fn retransfer_zone(&self, zone_name: &str) -> Result<(), Error> {
        let operation = Operation::Retransfer;
        let name = normalize(zone_name, operation)?;
        let _handle = self.inner.registry.acquire(&name).await;
        info!("Attempting to {} zone {}.", operation, name);

        let result = self
            .inner
            .rndc
            .retransfer(&name)
            .await
            .map(drop)
            .map_err(|e| Error::new(&name, operation, ErrorKind::Control(e)));
        log_result(&name, operation, &result);
        result
    }

    /// Brings the registry in line with the daemon for one zone, and
    /// returns what the daemon reports about it.
    pub async fn zone_info(&self, zone_name: &str) -> Result<ZoneInfo, Error> {
        let name = normalize(zone_name, Operation::Inspect)?;
        let handle = self.inner.registry.acquire(&name).await;
        let observed = self.inner.observe(&handle, Operation::Inspect).await?;
        let status = observed.status.unwrap_or_default();
        Ok(ZoneInfo {
            file: observed.has_file.then(|| self.inner.files.path_for(&name)),
            name,
            state: observed.state,
            zone_type: status.zone_type,
            serial: status.serial,
        })
    }

    /// Returns the daemon's configuration of a zone, as printed by
    /// `rndc showzone`.
    pub async fn show_zone(&self, zone_name: &str) -> Result<String, Error> {
        let name = normalize(zone_name, Operation::Inspect)?;
        match self.inner.rndc.showzone(&name).await {
            Ok(outcome) => Ok(outcome.stdout.trim().to_owned()),
            Err(e) => Err(Error::new(name, Operation::Inspect, ErrorKind::Control(e))),
        }
    }

    /// Returns the state of a zone. Zones that have never been seen,
    /// and invalid names, are [`ZoneState::Unknown`].
    pub fn get_zone_status(&self, zone_name: &str) -> ZoneState {
        match name::normalize_zone_name(zone_name) {
            Ok(normalized) => self.inner.registry.state(&normalized),
            Err(_) => ZoneState::Unknown,
        }
    }

    /// Returns the names and states of all tracked zones, sorted by
    /// name.
    pub fn list_zones(&self) -> Vec<(String, ZoneState)> {
        self.inner.registry.snapshot()
    }

    /// Brings the registry in line with the daemon for every zone file
    /// in the zone directory. This is meant to be run at startup, when
    /// the registry knows nothing.
    pub async fn reconcile(&self) -> Result<Vec<(String, ZoneState)>, Error> {
        let dir = self.inner.files.dir();
        let zones = self.inner.files.list().await.map_err(|source| {
            Error::new(
                dir.display().to_string(),
                Operation::Reconcile,
                ErrorKind::Io {
                    path: dir.to_owned(),
                    source,
                },
            )
        })?;
        info!(
            "Reconciling {} zone file(s) in {}.",
            zones.len(),
            dir.display()
        );

        let mut states = Vec::with_capacity(zones.len());
        for zone in zones {
            let state = self.reconcile_zone(&zone).await?;
            states.push((zone, state));
        }
        Ok(states)
    }

    /// Brings the registry in line with the daemon for one zone, and
    /// returns its state.
    pub async fn reconcile_zone(&self, zone_name: &str) -> Result<ZoneState, Error> {
        let name = normalize(zone_name, Operation::Reconcile)?;
        let handle = self.inner.registry.acquire(&name).await;
        let observed = self.inner.observe(&handle, Operation::Reconcile).await?;
        Ok(observed.state)
    }
}

/// What the daemon and the disk say about a zone.
struct Observation {
    state: ZoneState,
    status: Option<ZoneStatus>,
    has_file: bool,
}

impl<E: Executor> Inner<E> {
    async fn commit_upsert(
        &self,
        handle: LockHandle,
        operation: Operation,
        zone: ValidatedZone,
        text: ZoneFileText,
    ) -> Result<ZoneState, Error> {
        let name = zone.name();
        let path = self.files.path_for(name);
        let fail = |kind| {
            handle.set_state(ZoneState::Failed);
            Error::new(name, operation, kind)
        };

        // Slave zones get their data by transfer, so they have no file
        // to write or restore.
        let previous = match zone.kind() {
            ZoneKind::Master => {
                let previous = self.files.read(name).await.map_err(|source| {
                    fail(ErrorKind::Io {
                        path: path.clone(),
                        source,
                    })
                })?;
                handle.set_state(ZoneState::Pending);
                if let Err(source) = self.files.write(name, &text).await {
                    return Err(fail(ErrorKind::Io { path, source }));
                }
                Some(previous)
            }
            ZoneKind::Slave => {
                handle.set_state(ZoneState::Pending);
                None
            }
        };

        match self.configure(&zone, &path, operation).await {
            Ok(outcome) => {
                debug!("rndc output for zone {}: {}", name, outcome.stdout.trim());
                handle.set_state(ZoneState::Active);
                Ok(ZoneState::Active)
            }
            Err(e) => {
                if let Some(previous) = previous {
                    self.restore(name, previous).await;
                }
                Err(fail(ErrorKind::Control(e)))
            }
        }
    }

    /// Gives the daemon the zone's configuration. A new zone is added;
    /// a zone the daemon already has (as it may after this process
    /// restarts) gets its configuration replaced and is reloaded from
    /// the new file.
    async fn configure(
        &self,
        zone: &ValidatedZone,
        path: &Path,
        operation: Operation,
    ) -> Result<CommandOutcome, ExecError> {
        let name = zone.name();
        let block = rndc::addzone_block(zone, path);
        if operation == Operation::Create {
            match self.rndc.addzone(name, &block).await {
                Err(e) if rndc::is_already_exists(&e) => {
                    info!(
                        "Zone {} already exists in the daemon; modifying it instead.",
                        name
                    );
                }
                result => return result,
            }
        }
        match self.rndc.modzone(name, &block).await {
            Ok(_) => self.rndc.reload(name).await,
            Err(e) if operation == Operation::Update && rndc::is_not_found(&e) => {
                info!("Zone {} is no longer known to the daemon; adding it.", name);
                self.rndc.addzone(name, &block).await
            }
            Err(e) => Err(e),
        }
    }

    /// Puts the zone file back the way it was before a failed
    /// create/update. Failures are logged, since the caller reports the
    /// error that made restoration necessary.
    async fn restore(&self, name: &str, previous: Option<Vec<u8>>) {
        let result = match previous {
            Some(ref contents) => self.files.write_bytes(name, contents).await,
            None => self.files.remove(name).await.map(drop),
        };
        if let Err(e) = result {
            error!(
                "Failed to restore the zone file for {} after a failed control command: {}.",
                name, e
            );
        }
    }

    async fn commit_delete(&self, handle: LockHandle) -> Result<(), Error> {
        let name = handle.zone();
        let fail = |kind| {
            handle.set_state(ZoneState::Failed);
            Error::new(name, Operation::Delete, kind)
        };

        let known_to_daemon = match self.rndc.delzone(name).await {
            Ok(_) => true,
            Err(e) if rndc::is_not_found(&e) => {
                debug!("Zone {} was not known to the daemon.", name);
                false
            }
            Err(e) => return Err(fail(ErrorKind::Control(e))),
        };
        let removed = self.files.remove(name).await.map_err(|source| {
            fail(ErrorKind::Io {
                path: self.files.path_for(name),
                source,
            })
        })?;

        if known_to_daemon || removed || handle.state() != ZoneState::Unknown {
            handle.set_state(ZoneState::Deleted);
        }
        Ok(())
    }

    async fn commit_changes(
        &self,
        handle: LockHandle,
        operation: Operation,
        changes: Vec<Change>,
    ) -> Result<(), Error> {
        let name = handle.zone();
        let mut state = handle.state();
        if state != ZoneState::Active {
            // The registry may simply not have seen the zone yet.
            state = self.observe(&handle, operation).await?.state;
        }
        if state != ZoneState::Active {
            return Err(Error::new(name, operation, ErrorKind::NotActive(state)));
        }

        let updates: Vec<Update<'_>> = changes.iter().map(Change::as_update).collect();
        match self.nsupdate.send(name, &updates).await {
            Ok(_) => Ok(()),
            Err(source) => {
                let kind = match nsupdate::rejection(&source) {
                    Some(rcode) => ErrorKind::Rejected { rcode, source },
                    None => ErrorKind::Control(source),
                };
                Err(Error::new(name, operation, kind))
            }
        }
    }

    /// Asks the daemon about a zone and records the resulting state.
    async fn observe(
        &self,
        handle: &LockHandle,
        operation: Operation,
    ) -> Result<Observation, Error> {
        let name = handle.zone();
        let has_file = self.files.exists(name).await.map_err(|source| {
            Error::new(
                name,
                operation,
                ErrorKind::Io {
                    path: self.files.path_for(name),
                    source,
                },
            )
        })?;

        let (state, status) = match self.rndc.zonestatus(name).await {
            Ok(outcome) => (ZoneState::Active, Some(ZoneStatus::parse(&outcome.stdout))),
            Err(e) if rndc::is_not_found(&e) => {
                let state = if has_file {
                    ZoneState::Failed
                } else if handle.state() == ZoneState::Deleted {
                    ZoneState::Deleted
                } else {
                    ZoneState::Unknown
                };
                (state, None)
            }
            Err(e) => return Err(Error::new(name, operation, ErrorKind::Control(e))),
        };
        if state != handle.state() {
            debug!(
                "Zone {} reconciled from {} to {}.",
                name,
                handle.state(),
                state
            );
        }
        handle.set_state(state);
        Ok(Observation {
            state,
            status,
            has_file,
        })
    }
}

////////////////////////////////////////////////////////////////////////
// RECORD CHANGES                                                     //
////////////////////////////////////////////////////////////////////////

/// A validated change to one record, with an absolute owner.
#[derive(Debug)]
enum Change {
    Add {
        name: String,
        ttl: u32,
        data: RecordData,
    },
    Remove(RecordMatch),
}

impl Change {
    /// Returns the owner and type of the records the change affects.
    fn target(&self) -> (&str, RecordType) {
        match *self {
            Self::Add { ref name, ref data, .. } => (name, data.rr_type()),
            Self::Remove(ref selected) => (&selected.name, selected.rr_type),
        }
    }

    fn as_update(&self) -> Update<'_> {
        match *self {
            Self::Add {
                ref name,
                ttl,
                ref data,
            } => Update::Add { name, ttl, data },
            Self::Remove(ref selected) => Update::Delete {
                name: &selected.name,
                rr_type: selected.rr_type,
                data: selected.data.as_ref(),
            },
        }
    }
}

fn addition(spec: &RecordSpec, zone: &str) -> Result<Change, ValidationError> {
    let record = zone::validate_record(spec)?;
    Ok(Change::Add {
        name: qualify(&record.name, zone)?,
        ttl: record.ttl.unwrap_or(nsupdate::DEFAULT_TTL),
        data: record.data,
    })
}

fn removal(selector: &RecordSelector, zone: &str) -> Result<Change, ValidationError> {
    let mut selected = zone::validate_selector(selector)?;
    selected.name = qualify(&selected.name, zone)?;
    Ok(Change::Remove(selected))
}

fn replacement_changes(
    current: &RecordSelector,
    replacement: &RecordSpec,
    zone: &str,
) -> Result<Vec<Change>, ValidationError> {
    let removal = removal(current, zone).map_err(|e| e.within("current"))?;
    let addition = addition(replacement, zone).map_err(|e| e.within("replacement"))?;
    let (old_name, old_type) = removal.target();
    let (new_name, new_type) = addition.target();
    if !old_name.eq_ignore_ascii_case(new_name) {
        return Err(ValidationError::new(
            "replacement.name",
            Reason::ReplacementMismatch,
        ));
    } else if old_type != new_type {
        return Err(ValidationError::new(
            "replacement.type",
            Reason::ReplacementMismatch,
        ));
    }
    Ok(vec![removal, addition])
}

fn qualify(owner: &str, zone: &str) -> Result<String, ValidationError> {
    name::qualify_owner(owner, zone)
        .ok_or_else(|| ValidationError::new("name", Reason::OutsideZone))
}

////////////////////////////////////////////////////////////////////////
// HELPERS                                                            //
////////////////////////////////////////////////////////////////////////

/// Runs the committed part of an operation in its own task, so that it
/// completes even if the caller's future is dropped.
async fn run_committed<T, F>(zone: &str, operation: Operation, future: F) -> Result<T, Error>
where
    T: Send + 'static,
    F: Future<Output = Result<T, Error>> + Send + 'static,
{
    match tokio::spawn(future).await {
        Ok(result) => result,
        Err(e) => Err(Error::new(
            zone,
            operation,
            ErrorKind::Internal(format!("operation task failed: {}", e)),
        )),
    }
}

fn normalize(zone_name: &str, operation: Operation) -> Result<String, Error> {
    name::normalize_zone_name(zone_name).map_err(|e| {
        invalid(
            zone_name,
            operation,
            ValidationError::new("zoneName", Reason::InvalidName(e)),
        )
    })
}

fn invalid(zone: &str, operation: Operation, e: ValidationError) -> Error {
    Error::new(zone, operation, ErrorKind::Validation(e))
}

fn log_result<T>(zone: &str, operation: Operation, result: &Result<T, Error>) {
    match result {
        Ok(_) => info!("Completed request to {} zone {}.", operation, zone),
        Err(e) => warn!("Could not {} zone {}: {}.", operation, zone, e.kind()),
    }
}

////////////////////////////////////////////////////////////////////////
// TESTS                                                              //
////////////////////////////////////////////////////////////////////////
