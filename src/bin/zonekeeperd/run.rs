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

//! Implements the top-level logic of the command-line front end.

use std::fmt::Write as _;
use std::fs;
use std::io::{self, Read, Write};
use std::path::Path;
use std::process;

use anyhow::{Context, Result};
use env_logger::Env;
use log::{error, info, warn};

use zonekeeper::zone::{self, SoaStrictness};
use zonekeeper::{
    zone_file, Orchestrator, OrchestratorConfig, ProcessExecutor, RecordSelector, RecordSpec,
    ZoneConfig,
};

use crate::args::{Args, Command, RecordArgs, RecordCommand};
use crate::config;

/// Runs the program. If an error occurs, it is logged along with its
/// chain of causes, and the process exits with status 1.
pub fn run(args: Args) {
    env_logger::init_from_env(Env::new().default_filter_or("warn"));

    if let Err(e) = try_running(args) {
        let mut message = String::from("Failed to run:");
        for (i, cause) in e.chain().enumerate() {
            write!(message, "\n[{}] {}", i + 1, cause).unwrap();
        }
        message.push_str("\nExiting with failure.");
        error!("{}", message);
        process::exit(1);
    }
}

fn try_running(args: Args) -> Result<()> {
    let config = config::load(&args.global)?;
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to start the async runtime")?;
    runtime.block_on(execute(config, args.command))
}

async fn execute(config: OrchestratorConfig, command: Command) -> Result<()> {
    let strictness = config.soa_strictness;
    let orchestrator = Orchestrator::new(config, ProcessExecutor);
    let stdout = io::stdout();
    let mut out = stdout.lock();

    match command {
        Command::Apply { file } => {
            let zone_config = read_zone_config(&file)?;
            let state = orchestrator
                .create_or_update_zone(&zone_config)
                .await
                .context("failed to apply the zone description")?;
            info!("Zone {} applied.", zone_config.zone_name);
            writeln!(out, "{}", state)?;
        }
        Command::Delete { name } => {
            orchestrator
                .delete_zone(&name)
                .await
                .context("failed to delete the zone")?;
            info!("Zone {} deleted.", name);
        }
        Command::Status { name } => {
            let state = orchestrator
                .reconcile_zone(&name)
                .await
                .context("failed to query the zone")?;
            writeln!(out, "{}", state)?;
        }
        Command::List => {
            let zones = orchestrator
                .reconcile()
                .await
                .context("failed to query the zones")?;
            for (name, state) in zones {
                writeln!(out, "{} {}", name, state)?;
            }
        }
        Command::Info { name } => {
            let info = orchestrator
                .zone_info(&name)
                .await
                .context("failed to query the zone")?;
            serde_json::to_writer_pretty(&mut out, &info)?;
            writeln!(out)?;
        }
        Command::Show { name } => {
            let config = orchestrator
                .show_zone(&name)
                .await
                .context("failed to show the zone's configuration")?;
            writeln!(out, "{}", config)?;
        }
        Command::Retransfer { name } => {
            orchestrator
                .retransfer_zone(&name)
                .await
                .context("failed to retransfer the zone")?;
            info!("Zone {} is being transferred again.", name);
        }
        Command::Record { command } => change_record(&orchestrator, command).await?,
        Command::Render { file } => render(&file, strictness, &mut out)?,
    }
    Ok(())
}

/// Carries out a `record` subcommand.
async fn change_record(
    orchestrator: &Orchestrator<ProcessExecutor>,
    command: RecordCommand,
) -> Result<()> {
    match command {
        RecordCommand::Add {
            record,
            value,
            ttl,
            priority,
        } => {
            let spec = record_spec(&record, value, ttl, priority);
            orchestrator
                .add_record(&record.zone, &spec)
                .await
                .context("failed to add the record")?;
        }
        RecordCommand::Remove {
            record,
            value,
            priority,
        } => {
            let selector = RecordSelector {
                name: record.name.clone(),
                record_type: record.record_type.clone(),
                value,
                priority,
            };
            orchestrator
                .remove_record(&record.zone, &selector)
                .await
                .context("failed to remove the record")?;
        }
        RecordCommand::Update {
            record,
            current,
            new,
            ttl,
            priority,
            current_priority,
        } => {
            let selector = RecordSelector {
                name: record.name.clone(),
                record_type: record.record_type.clone(),
                value: Some(current),
                priority: current_priority.or(priority),
            };
            let spec = record_spec(&record, new, ttl, priority);
            orchestrator
                .update_record(&record.zone, &selector, &spec)
                .await
                .context("failed to update the record")?;
        }
    }
    Ok(())
}

fn record_spec(
    record: &RecordArgs,
    value: String,
    ttl: Option<u32>,
    priority: Option<i64>,
) -> RecordSpec {
    RecordSpec {
        name: record.name.clone(),
        record_type: record.record_type.clone(),
        value,
        ttl,
        priority,
    }
}

/// Validates the zone description in `file` and prints its zone file.
fn render(file: &Path, strictness: SoaStrictness, out: &mut impl Write) -> Result<()> {
    let zone_config = read_zone_config(file)?;
    let validated = zone::validate(&zone_config, strictness)
        .context("the zone description is invalid")?;
    for warning in validated.warnings() {
        warn!("Zone {}: {}.", validated.name(), warning);
    }
    let text = zone_file::render(&validated);
    out.write_all(text.as_bytes())
        .context("failed to write the zone file")?;
    Ok(())
}

/// Reads a JSON zone description from `file`, or from standard input
/// if `file` is `-`.
fn read_zone_config(file: &Path) -> Result<ZoneConfig> {
    let raw = if file.as_os_str() == "-" {
        let mut buf = Vec::new();
        io::stdin()
            .read_to_end(&mut buf)
            .context("failed to read the zone description from standard input")?;
        buf
    } else {
        fs::read(file).with_context(|| {
            format!("failed to read the zone description {}", file.display())
        })?
    };
    serde_json::from_slice(&raw).context("failed to parse the zone description")
}
