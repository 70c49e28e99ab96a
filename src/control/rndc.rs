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

//! Typed subcommands of the `rndc` control program.

use std::fmt::Write;
use std::net::IpAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use super::{CommandOutcome, ExecError, Executor};
use crate::zone::{ValidatedZone, ZoneKind};

/// A handle for running `rndc` subcommands through an [`Executor`].
#[derive(Debug)]
pub struct Rndc<E> {
    executor: Arc<E>,
    program: PathBuf,
    extra_args: Vec<String>,
    timeout: Duration,
}

impl<E: Executor> Rndc<E> {
    /// Creates a new `Rndc`. The `extra_args` (e.g. `-s`, `-p`, `-k`
    /// options) are passed before every subcommand.
    pub fn new(
        executor: Arc<E>,
        program: PathBuf,
        extra_args: Vec<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            executor,
            program,
            extra_args,
            timeout,
        }
    }

    pub fn executor(&self) -> &E {
        &self.executor
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Runs an arbitrary subcommand.
    pub async fn run(&self, args: &[&str]) -> Result<CommandOutcome, ExecError> {
        let args: Vec<String> = self
            .extra_args
            .iter()
            .cloned()
            .chain(args.iter().map(|&arg| arg.to_owned()))
            .collect();
        self.executor
            .execute(&self.program, &args, None, self.timeout)
            .await
    }

    /// Adds a zone with the given inline configuration block (see
    /// [`addzone_block`]).
    pub async fn addzone(&self, zone: &str, block: &str) -> Result<CommandOutcome, ExecError> {
        self.run(&["addzone", zone, block]).await
    }

    /// Replaces the configuration of a zone added with `addzone`. The
    /// block has the same form.
    pub async fn modzone(&self, zone: &str, block: &str) -> Result<CommandOutcome, ExecError> {
        self.run(&["modzone", zone, block]).await
    }

    pub async fn delzone(&self, zone: &str) -> Result<CommandOutcome, ExecError> {
        self.run(&["delzone", zone]).await
    }

    /// Prints the daemon's current configuration of a zone.
    pub async fn showzone(&self, zone: &str) -> Result<CommandOutcome, ExecError> {
        self.run(&["showzone", zone]).await
    }

    pub async fn reload(&self, zone: &str) -> Result<CommandOutcome, ExecError> {
        self.run(&["reload", zone]).await
    }

    pub async fn zonestatus(&self, zone: &str) -> Result<CommandOutcome, ExecError> {
        self.run(&["zonestatus", zone]).await
    }

    pub async fn status(&self) -> Result<CommandOutcome, ExecError> {
        self.run(&["status"]).await
    }

    /// Suspends dynamic updates to a zone, syncing its journal into the
    /// zone file.
    pub async fn freeze(&self, zone: &str) -> Result<CommandOutcome, ExecError> {
        self.run(&["freeze", zone]).await
    }

    /// Resumes dynamic updates to a zone and reloads it from its file.
    pub async fn thaw(&self, zone: &str) -> Result<CommandOutcome, ExecError> {
        self.run(&["thaw", zone]).await
    }

    /// Sends NOTIFY messages for a zone.
    pub async fn notify(&self, zone: &str) -> Result<CommandOutcome, ExecError> {
        self.run(&["notify", zone]).await
    }

    /// Discards a slave zone's data and transfers it again from its
    /// primaries.
    pub async fn retransfer(&self, zone: &str) -> Result<CommandOutcome, ExecError> {
        self.run(&["retransfer", zone]).await
    }
}

/// Renders the inline zone configuration passed to `rndc addzone` and
/// `rndc modzone`, e.g.:
///
/// ```text
/// { type master; file "/var/cache/bind/example.com.zone"; allow-update { key "ddns"; }; };
/// ```
///
/// `file` is only used for master zones.
pub fn addzone_block(zone: &ValidatedZone, file: &Path) -> String {
    let mut block = format!("{{ type {};", zone.kind());
    match zone.kind() {
        ZoneKind::Master => {
            block.push_str(" file \"");
            for c in file.display().to_string().chars() {
                if c == '"' || c == '\\' {
                    block.push('\\');
                }
                block.push(c);
            }
            block.push_str("\";");
        }
        ZoneKind::Slave => push_address_list(&mut block, "primaries", zone.primaries()),
    }
    if let Some(key) = zone.update_key_name() {
        write!(block, " allow-update {{ key \"{}\"; }};", key).unwrap();
    }
    push_address_list(&mut block, "also-notify", zone.also_notify());
    push_address_list(&mut block, "allow-transfer", zone.allow_transfer());
    block.push_str(" };");
    block
}

fn push_address_list(block: &mut String, statement: &str, addresses: &[IpAddr]) {
    if addresses.is_empty() {
        return;
    }
    write!(block, " {} {{", statement).unwrap();
    for address in addresses {
        write!(block, " {};", address).unwrap();
    }
    block.push_str(" };");
}

////////////////////////////////////////////////////////////////////////
// INTERPRETING OUTPUT                                                //
////////////////////////////////////////////////////////////////////////

/// Returns whether `rndc` reported that the daemon has no such zone.
///
/// Only the daemon's answer to a zone lookup counts. `rndc` reports
/// its own problems (a missing configuration or key file, a refused
/// connection) on standard error too, sometimes with the words "not
/// found" in them, and those must not be mistaken for an absent zone.
pub fn is_not_found(error: &ExecError) -> bool {
    reports(error, &["failed: not found", "no matching zone"])
}

/// Returns whether `rndc` reported that the zone is already configured.
pub fn is_already_exists(error: &ExecError) -> bool {
    reports(error, &["failed: already exists"])
}

/// Returns whether `rndc` reported that the zone does not accept
/// dynamic updates (and so cannot be frozen or thawed).
pub fn is_not_dynamic(error: &ExecError) -> bool {
    reports(error, &["failed: not dynamic"])
}

fn reports(error: &ExecError, messages: &[&str]) -> bool {
    error.outcome().map_or(false, |outcome| {
        let stderr = outcome.stderr.to_ascii_lowercase();
        messages.iter().any(|message| stderr.contains(message))
    })
}

/// The parts of `rndc zonestatus` output that describe a zone.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct ZoneStatus {
    /// The zone type, e.g. `primary` or `secondary`.
    pub zone_type: Option<String>,
    pub serial: Option<u32>,
}

impl ZoneStatus {
    /// Parses the `key: value` lines printed by `rndc zonestatus`.
    /// Unrecognized lines are ignored.
    pub fn parse(output: &str) -> Self {
        let mut status = Self::default();
        for line in output.lines() {
            let Some((key, value)) = line.split_once(':') else {
                continue;
            };
            let value = value.trim();
            match key.trim() {
                "type" if !value.is_empty() => status.zone_type = Some(value.to_owned()),
                "serial" => status.serial = value.parse().ok(),
                _ => (),
            }
        }
        status
    }
}

////////////////////////////////////////////////////////////////////////
// TESTS                                                              //
////////////////////////////////////////////////////////////////////////
