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

//! Zonekeeper manages the zones of a BIND-style authoritative DNS
//! daemon through its zone files and its `rndc` control program.
//!
//! The entry point is the [`Orchestrator`]. Given a declarative
//! [`ZoneConfig`], it validates the description, renders a zone file,
//! writes it atomically into the daemon's zone directory, and tells the
//! daemon to add or reload the zone, undoing the file change if the
//! daemon refuses. Deletion runs in the opposite order. Operations on
//! the same zone are serialized; operations on different zones run
//! concurrently. Single records of an active zone can be added,
//! removed, or replaced with dynamic updates sent through `nsupdate`.
//!
//! ```no_run
//! use zonekeeper::{Orchestrator, OrchestratorConfig, ProcessExecutor, ZoneConfig};
//!
//! # async fn example(config: ZoneConfig) -> Result<(), zonekeeper::OrchestratorError> {
//! let orchestrator = Orchestrator::new(OrchestratorConfig::default(), ProcessExecutor);
//! orchestrator.reconcile().await?;
//! let state = orchestrator.create_or_update_zone(&config).await?;
//! println!("{} is {}", config.zone_name, state);
//! # Ok(())
//! # }
//! ```
//!
//! The lower-level modules are public as well: [`zone`] and
//! [`zone_file`] can be used to validate and render zones without
//! touching the daemon, and [`control`] exposes the `rndc` subcommands
//! and `nsupdate` scripts.

pub mod control;
pub mod fs;
pub mod name;
pub mod orchestrator;
pub mod registry;
pub mod zone;
pub mod zone_file;

mod util;

pub use control::{CommandOutcome, ExecError, Executor, ProcessExecutor};
pub use orchestrator::{
    Error as OrchestratorError, ErrorKind, Operation, Orchestrator, OrchestratorConfig, ZoneInfo,
};
pub use registry::{ZoneRegistry, ZoneState};
pub use zone::{RecordSelector, RecordSpec, ValidatedZone, ValidationError, ZoneConfig};
