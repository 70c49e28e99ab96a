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

//! Implementation of the orchestrator's [`Error`] type.

use std::fmt;
use std::io;
use std::path::PathBuf;

use crate::control::nsupdate::Rcode;
use crate::control::ExecError;
use crate::registry::ZoneState;
use crate::zone::ValidationError;

/// An error reported by an [`Orchestrator`](super::Orchestrator)
/// operation. It names the zone, the operation, and the underlying
/// cause.
#[derive(Debug)]
pub struct Error {
    zone: String,
    operation: Operation,
    kind: ErrorKind,
}

impl Error {
    pub(super) fn new(zone: impl Into<String>, operation: Operation, kind: ErrorKind) -> Self {
        Self {
            zone: zone.into(),
            operation,
            kind,
        }
    }

    pub fn zone(&self) -> &str {
        &self.zone
    }

    pub fn operation(&self) -> Operation {
        self.operation
    }

    pub fn kind(&self) -> &ErrorKind {
        &self.kind
    }

    pub fn into_kind(self) -> ErrorKind {
        self.kind
    }

    /// Returns whether the error is unexpected, as opposed to a
    /// rejection of the input or a failure reported by the daemon.
    pub fn is_internal(&self) -> bool {
        matches!(
            self.kind,
            ErrorKind::Internal(_) | ErrorKind::Control(ExecError::SpawnFailure(_))
        )
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "failed to {} zone {}: {}",
            self.operation, self.zone, self.kind
        )
    }
}

impl std::error::Error for Error {}

/// The operations that can fail.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Operation {
    Create,
    Update,
    Delete,
    AddRecord,
    RemoveRecord,
    UpdateRecord,
    Retransfer,
    Inspect,
    Reconcile,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(match *self {
            Self::Create => "create",
            Self::Update => "update",
            Self::Delete => "delete",
            Self::AddRecord => "add a record to",
            Self::RemoveRecord => "remove records from",
            Self::UpdateRecord => "update a record in",
            Self::Retransfer => "retransfer",
            Self::Inspect => "inspect",
            Self::Reconcile => "reconcile",
        })
    }
}

/// The cause of an [`Error`].
#[derive(Debug)]
pub enum ErrorKind {
    /// The zone description was invalid. Nothing was written and no
    /// command was run.
    Validation(ValidationError),

    /// A zone file could not be read, written, or removed.
    Io { path: PathBuf, source: io::Error },

    /// The control program failed.
    Control(ExecError),

    /// The server rejected a dynamic update with the given response
    /// code.
    Rejected { rcode: Rcode, source: ExecError },

    /// Records can only be changed in an active zone.
    NotActive(ZoneState),

    /// Something unexpected happened, such as a panic in a background
    /// task.
    Internal(String),
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Validation(e) => write!(f, "invalid input: {}", e),
            Self::Io { path, source } => write!(f, "I/O error on {}: {}", path.display(), source),
            Self::Control(e) => write!(f, "control command failed: {}", e),
            Self::Rejected { rcode, source } => {
                write!(f, "update rejected: {}: {}", rcode, source)
            }
            Self::NotActive(state) => write!(f, "the zone is {}, not active", state),
            Self::Internal(message) => write!(f, "internal error: {}", message),
        }
    }
}
