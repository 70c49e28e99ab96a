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

//! Implements the configuration file.
//!
//! ```toml
//! zone_dir = "/var/cache/bind"
//! soa_strictness = "advisory"
//!
//! [rndc]
//! program = "/usr/sbin/rndc"
//! args = ["-s", "127.0.0.1", "-k", "/etc/bind/rndc.key"]
//! timeout = 10
//!
//! [nsupdate]
//! program = "/usr/bin/nsupdate"
//! server = "127.0.0.1"
//! port = 53
//! key_file = "/etc/bind/ddns.key"
//! ```
//!
//! The `rndc` timeout applies to `nsupdate` as well.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use log::Level::Debug;
use log::{debug, log_enabled};
use serde::Deserialize;

use zonekeeper::zone::SoaStrictness;
use zonekeeper::OrchestratorConfig;

use crate::args::GlobalArgs;

////////////////////////////////////////////////////////////////////////
// CONFIGURATION LOADING                                              //
////////////////////////////////////////////////////////////////////////

/// Builds the orchestrator configuration from the configuration file
/// (if one was given) and the command-line options, which take
/// precedence.
pub fn load(args: &GlobalArgs) -> Result<OrchestratorConfig> {
    let file_config = match args.config {
        Some(ref path) => load_from_path(path)?,
        None => Config::default(),
    };
    let config = apply_args(file_config, args)?;
    log_config_summary(&config);
    Ok(config)
}

/// Loads the configuration file at `path`. A relative `zone_dir` is
/// interpreted relative to the configuration file's directory.
pub fn load_from_path(path: &Path) -> Result<Config> {
    let dir = match path.parent() {
        Some(p) => p,
        None => return Err(anyhow!("the configuration file path has no parent")),
    };
    let raw_config = fs::read(path).context("failed to read the configuration file")?;
    let mut config: Config =
        toml::from_slice(&raw_config).context("failed to parse the configuration file")?;
    if config.zone_dir.is_relative() {
        config.zone_dir = dir.join(&config.zone_dir);
    }
    if let Some(ref mut key_file) = config.nsupdate.key_file {
        if key_file.is_relative() {
            *key_file = dir.join(&*key_file);
        }
    }
    Ok(config)
}

fn apply_args(config: Config, args: &GlobalArgs) -> Result<OrchestratorConfig> {
    let timeout = args.timeout.unwrap_or(config.rndc.timeout);
    if timeout == 0 {
        return Err(anyhow!("the rndc timeout must be positive"));
    }
    Ok(OrchestratorConfig {
        zone_dir: args.zone_dir.clone().unwrap_or(config.zone_dir),
        rndc_program: args.rndc.clone().unwrap_or(config.rndc.program),
        rndc_args: config.rndc.args,
        nsupdate_program: args.nsupdate.clone().unwrap_or(config.nsupdate.program),
        update_server: config.nsupdate.server,
        update_port: config.nsupdate.port,
        update_key_file: config.nsupdate.key_file,
        command_timeout: Duration::from_secs(timeout),
        soa_strictness: if args.strict_soa {
            SoaStrictness::Strict
        } else {
            config.soa_strictness
        },
    })
}

/// Summarizes the configuration in the log, if the debug log level is
/// enabled.
fn log_config_summary(config: &OrchestratorConfig) {
    if !log_enabled!(Debug) {
        // Don't compute the message if it will never be printed.
        return;
    }
    debug!(
        "Configuration loaded:\n\
         Zone directory: {}\n\
         rndc program:   {}\n\
         rndc arguments: {}\n\
         nsupdate:       {}\n\
         Update server:  {} port {}\n\
         Update key:     {}\n\
         Timeout:        {} s\n\
         SOA timers:     {:?}",
        config.zone_dir.display(),
        config.rndc_program.display(),
        config.rndc_args.join(" "),
        config.nsupdate_program.display(),
        config.update_server,
        config.update_port,
        match config.update_key_file {
            Some(ref path) => path.display().to_string(),
            None => "none".to_owned(),
        },
        config.command_timeout.as_secs(),
        config.soa_strictness,
    );
}

////////////////////////////////////////////////////////////////////////
// CONFIGURATION FILE STRUCTURE                                       //
////////////////////////////////////////////////////////////////////////

/// The complete configuration file.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default = "default_zone_dir")]
    pub zone_dir: PathBuf,
    #[serde(default)]
    pub soa_strictness: SoaStrictness,
    #[serde(default)]
    pub rndc: RndcConfig,
    #[serde(default)]
    pub nsupdate: NsupdateConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            zone_dir: default_zone_dir(),
            soa_strictness: SoaStrictness::default(),
            rndc: RndcConfig::default(),
            nsupdate: NsupdateConfig::default(),
        }
    }
}

fn default_zone_dir() -> PathBuf {
    PathBuf::from("/var/cache/bind")
}

/// How to run `rndc`.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RndcConfig {
    #[serde(default = "default_rndc_program")]
    pub program: PathBuf,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default = "default_timeout")]
    pub timeout: u64,
}

impl Default for RndcConfig {
    fn default() -> Self {
        Self {
            program: default_rndc_program(),
            args: Vec::new(),
            timeout: default_timeout(),
        }
    }
}

fn default_rndc_program() -> PathBuf {
    PathBuf::from("/usr/sbin/rndc")
}

fn default_timeout() -> u64 {
    10
}

/// How to send dynamic updates.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NsupdateConfig {
    #[serde(default = "default_nsupdate_program")]
    pub program: PathBuf,
    #[serde(default = "default_update_server")]
    pub server: String,
    #[serde(default = "default_update_port")]
    pub port: u16,
    pub key_file: Option<PathBuf>,
}

impl Default for NsupdateConfig {
    fn default() -> Self {
        Self {
            program: default_nsupdate_program(),
            server: default_update_server(),
            port: default_update_port(),
            key_file: None,
        }
    }
}

fn default_nsupdate_program() -> PathBuf {
    PathBuf::from("/usr/bin/nsupdate")
}

fn default_update_server() -> String {
    "127.0.0.1".into()
}

fn default_update_port() -> u16 {
    53
}

////////////////////////////////////////////////////////////////////////
// TESTS                                                              //
////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::*;

    fn no_args() -> GlobalArgs {
        GlobalArgs {
            config: None,
            zone_dir: None,
            rndc: None,
            nsupdate: None,
            timeout: None,
            strict_soa: false,
        }
    }

    #[test]
    fn defaults_apply_without_a_file() {
        let config = apply_args(Config::default(), &no_args()).unwrap();
        assert_eq!(config.zone_dir, Path::new("/var/cache/bind"));
        assert_eq!(config.rndc_program, Path::new("/usr/sbin/rndc"));
        assert_eq!(config.command_timeout, Duration::from_secs(10));
        assert_eq!(config.soa_strictness, SoaStrictness::Advisory);
        assert_eq!(config.nsupdate_program, Path::new("/usr/bin/nsupdate"));
        assert_eq!(config.update_server, "127.0.0.1");
        assert_eq!(config.update_port, 53);
        assert_eq!(config.update_key_file, None);
    }

    #[test]
    fn file_settings_are_parsed_and_overridden() {
        let file: Config = toml::from_str(
            r#"
            zone_dir = "/srv/zones"
            soa_strictness = "strict"

            [rndc]
            args = ["-s", "127.0.0.1"]
            timeout = 30
            "#,
        )
        .unwrap();
        let mut args = no_args();
        args.timeout = Some(5);
        let config = apply_args(file, &args).unwrap();
        assert_eq!(config.zone_dir, Path::new("/srv/zones"));
        assert_eq!(config.rndc_args, ["-s", "127.0.0.1"]);
        assert_eq!(config.command_timeout, Duration::from_secs(5));
        assert_eq!(config.soa_strictness, SoaStrictness::Strict);
    }

    #[test]
    fn unknown_fields_are_rejected() {
        assert!(toml::from_str::<Config>("zone_directory = \"/tmp\"").is_err());
    }

    #[test]
    fn relative_zone_dir_follows_the_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("zonekeeper.toml");
        fs::write(&path, "zone_dir = \"zones\"\n").unwrap();
        let config = load_from_path(&path).unwrap();
        assert_eq!(config.zone_dir, dir.path().join("zones"));
    }

    #[test]
    fn zero_timeout_is_rejected() {
        let mut args = no_args();
        args.timeout = Some(0);
        assert!(apply_args(Config::default(), &args).is_err());
    }

    #[test]
    fn nsupdate_settings_are_parsed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("zonekeeper.toml");
        fs::write(
            &path,
            "[nsupdate]\n\
             server = \"192.0.2.53\"\n\
             port = 5353\n\
             key_file = \"ddns.key\"\n",
        )
        .unwrap();
        let mut args = no_args();
        args.nsupdate = Some(PathBuf::from("/opt/bind/bin/nsupdate"));
        let config = apply_args(load_from_path(&path).unwrap(), &args).unwrap();
        assert_eq!(config.nsupdate_program, Path::new("/opt/bind/bin/nsupdate"));
        assert_eq!(config.update_server, "192.0.2.53");
        assert_eq!(config.update_port, 5353);
        assert_eq!(config.update_key_file, Some(dir.path().join("ddns.key")));
    }
}
