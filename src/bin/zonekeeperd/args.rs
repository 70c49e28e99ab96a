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

//! Implements command-line argument parsing.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Parses the command line arguments.
pub fn parse() -> Args {
    Args::parse()
}

/// Manage the zones of an authoritative DNS daemon through rndc and
/// nsupdate
#[derive(Debug, Parser)]
#[clap(author, version)]
pub struct Args {
    #[clap(flatten)]
    pub global: GlobalArgs,

    #[clap(subcommand)]
    pub command: Command,
}

// Options that apply to every command. These override the
// configuration file.
#[derive(Debug, clap::Args)]
pub struct GlobalArgs {
    /// Set the configuration file to use
    #[clap(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Set the directory in which zone files are written
    #[clap(long, global = true, value_name = "DIR")]
    pub zone_dir: Option<PathBuf>,

    /// Set the path of the rndc program
    #[clap(long, global = true, value_name = "PATH")]
    pub rndc: Option<PathBuf>,

    /// Set the path of the nsupdate program
    #[clap(long, global = true, value_name = "PATH")]
    pub nsupdate: Option<PathBuf>,

    /// Set the timeout for each rndc or nsupdate invocation
    #[clap(long, global = true, value_name = "SECONDS")]
    pub timeout: Option<u64>,

    /// Reject zones whose SOA timers are not ordered retry < refresh < expire
    #[clap(long, global = true)]
    pub strict_soa: bool,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Create or update a zone from a JSON zone description
    Apply {
        /// The zone description ("-" for standard input)
        #[clap(value_name = "FILE")]
        file: PathBuf,
    },

    /// Delete a zone
    Delete {
        #[clap(value_name = "ZONE")]
        name: String,
    },

    /// Query the daemon for a zone's state
    Status {
        #[clap(value_name = "ZONE")]
        name: String,
    },

    /// Query the daemon for the state of every zone file
    List,

    /// Print a zone's state, type, serial, and file as JSON
    Info {
        #[clap(value_name = "ZONE")]
        name: String,
    },

    /// Print the daemon's configuration of a zone
    Show {
        #[clap(value_name = "ZONE")]
        name: String,
    },

    /// Transfer a slave zone from its primaries again
    Retransfer {
        #[clap(value_name = "ZONE")]
        name: String,
    },

    /// Change single records of an active zone by dynamic update
    Record {
        #[clap(subcommand)]
        command: RecordCommand,
    },

    /// Print the zone file for a JSON zone description
    Render {
        /// The zone description ("-" for standard input)
        #[clap(value_name = "FILE")]
        file: PathBuf,
    },
}

#[derive(Debug, Subcommand)]
pub enum RecordCommand {
    /// Add a record
    Add {
        #[clap(flatten)]
        record: RecordArgs,

        /// The record data
        #[clap(value_name = "VALUE")]
        value: String,

        /// The record's TTL [default: 3600]
        #[clap(long, value_name = "SECONDS")]
        ttl: Option<u32>,

        /// The MX preference or SRV priority
        #[clap(long)]
        priority: Option<i64>,
    },

    /// Remove the record with the given data, or every record of the
    /// type at the owner if no data is given
    Remove {
        #[clap(flatten)]
        record: RecordArgs,

        /// The record data
        #[clap(value_name = "VALUE")]
        value: Option<String>,

        /// The MX preference or SRV priority
        #[clap(long)]
        priority: Option<i64>,
    },

    /// Replace a record's data in one update
    Update {
        #[clap(flatten)]
        record: RecordArgs,

        /// The current record data
        #[clap(value_name = "CURRENT")]
        current: String,

        /// The new record data
        #[clap(value_name = "NEW")]
        new: String,

        /// The new record's TTL [default: 3600]
        #[clap(long, value_name = "SECONDS")]
        ttl: Option<u32>,

        /// The MX preference or SRV priority of the new record
        #[clap(long)]
        priority: Option<i64>,

        /// The MX preference or SRV priority of the current record, if
        /// it differs
        #[clap(long)]
        current_priority: Option<i64>,
    },
}

// Identifies the records that a record command applies to.
#[derive(Debug, clap::Args)]
pub struct RecordArgs {
    #[clap(value_name = "ZONE")]
    pub zone: String,

    /// The owner: "@", a name relative to the zone, or an FQDN
    #[clap(value_name = "NAME")]
    pub name: String,

    #[clap(value_name = "TYPE")]
    pub record_type: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn global_options_may_follow_the_subcommand() {
        let args = Args::try_parse_from([
            "zonekeeperd",
            "delete",
            "example.com",
            "--zone-dir",
            "/srv/zones",
            "--strict-soa",
        ])
        .unwrap();
        assert!(matches!(args.command, Command::Delete { ref name } if name == "example.com"));
        assert_eq!(args.global.zone_dir, Some(PathBuf::from("/srv/zones")));
        assert!(args.global.strict_soa);
        assert_eq!(args.global.timeout, None);
    }

    #[test]
    fn apply_accepts_standard_input() {
        let args = Args::try_parse_from(["zonekeeperd", "--timeout", "3", "apply", "-"]).unwrap();
        assert!(matches!(args.command, Command::Apply { ref file } if file.as_os_str() == "-"));
        assert_eq!(args.global.timeout, Some(3));
    }

    #[test]
    fn record_commands_take_positional_data() {
        let args = Args::try_parse_from([
            "zonekeeperd",
            "record",
            "add",
            "example.com",
            "@",
            "MX",
            "mx1.example.com.",
            "--priority",
            "10",
        ])
        .unwrap();
        match args.command {
            Command::Record {
                command:
                    RecordCommand::Add {
                        record,
                        value,
                        ttl,
                        priority,
                    },
            } => {
                assert_eq!(record.zone, "example.com");
                assert_eq!(record.name, "@");
                assert_eq!(record.record_type, "MX");
                assert_eq!(value, "mx1.example.com.");
                assert_eq!(ttl, None);
                assert_eq!(priority, Some(10));
            }
            other => panic!("unexpected command: {:?}", other),
        }

        let args = Args::try_parse_from([
            "zonekeeperd",
            "record",
            "remove",
            "example.com",
            "www",
            "A",
        ])
        .unwrap();
        assert!(matches!(
            args.command,
            Command::Record {
                command: RecordCommand::Remove { value: None, .. }
            }
        ));
    }
}
