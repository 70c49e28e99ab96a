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

//! Dynamic updates ([RFC 2136]) through the `nsupdate` program.
//!
//! Each call to [`Nsupdate::send`] runs `nsupdate` once and feeds it a
//! script on standard input:
//!
//! ```text
//! server 127.0.0.1 53
//! zone example.com.
//! update delete www.example.com. A 192.0.2.1
//! update add www.example.com. 3600 IN A 192.0.2.2
//! send
//! ```
//!
//! All of the updates in one script go out in a single UPDATE message,
//! so the server applies all of them or none.
//!
//! [RFC 2136]: https://datatracker.ietf.org/doc/html/rfc2136

use std::fmt::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use super::{CommandOutcome, ExecError, Executor};
use crate::zone::{RecordData, RecordType};

/// The TTL given to added records that do not specify one.
pub const DEFAULT_TTL: u32 = 3600;

/// A handle for sending dynamic updates through an [`Executor`].
#[derive(Debug)]
pub struct Nsupdate<E> {
    executor: Arc<E>,
    program: PathBuf,
    server: String,
    port: u16,
    key_file: Option<PathBuf>,
    timeout: Duration,
}

impl<E: Executor> Nsupdate<E> {
    /// Creates a new `Nsupdate`. If `key_file` is given, updates are
    /// signed with the TSIG key in it (`nsupdate -k`).
    pub fn new(
        executor: Arc<E>,
        program: PathBuf,
        server: String,
        port: u16,
        key_file: Option<PathBuf>,
        timeout: Duration,
    ) -> Self {
        Self {
            executor,
            program,
            server,
            port,
            key_file,
            timeout,
        }
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    /// Sends `updates` to the zone `zone` (a normalized zone name) in
    /// one message.
    pub async fn send(
        &self,
        zone: &str,
        updates: &[Update<'_>],
    ) -> Result<CommandOutcome, ExecError> {
        let script = self.script(zone, updates);
        let args: Vec<String> = match self.key_file {
            Some(ref key_file) => vec!["-k".into(), key_file.display().to_string()],
            None => Vec::new(),
        };
        self.executor
            .execute(&self.program, &args, Some(&script), self.timeout)
            .await
    }

    /// Renders the script that [`send`](Self::send) feeds to `nsupdate`.
    pub fn script(&self, zone: &str, updates: &[Update<'_>]) -> String {
        let mut script = format!("server {} {}\nzone {}.\n", self.server, self.port, zone);
        for update in updates {
            writeln!(script, "{}", update).unwrap();
        }
        script.push_str("send\n");
        script
    }
}

/// One change within a dynamic update. Owner names must be absolute.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Update<'a> {
    Add {
        name: &'a str,
        ttl: u32,
        data: &'a RecordData,
    },

    /// Deletes the record with the given data or, if `data` is `None`,
    /// every record of the type at the owner.
    Delete {
        name: &'a str,
        rr_type: RecordType,
        data: Option<&'a RecordData>,
    },
}

impl fmt::Display for Update<'_> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Self::Add { name, ttl, data } => {
                write!(f, "update add {} {} IN {} {}", name, ttl, data.rr_type(), data)
            }
            Self::Delete {
                name,
                rr_type,
                data: Some(data),
            } => write!(f, "update delete {} {} {}", name, rr_type, data),
            Self::Delete {
                name,
                rr_type,
                data: None,
            } => write!(f, "update delete {} {}", name, rr_type),
        }
    }
}

////////////////////////////////////////////////////////////////////////
// INTERPRETING OUTPUT                                                //
////////////////////////////////////////////////////////////////////////

/// A response code with which a server rejected an update.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Rcode {
    FormErr,
    ServFail,
    NxDomain,
    Refused,
    NotAuth,
    NotZone,
}

impl Rcode {
    const ALL: [Self; 6] = [
        Self::FormErr,
        Self::ServFail,
        Self::NxDomain,
        Self::Refused,
        Self::NotAuth,
        Self::NotZone,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::FormErr => "FORMERR",
            Self::ServFail => "SERVFAIL",
            Self::NxDomain => "NXDOMAIN",
            Self::Refused => "REFUSED",
            Self::NotAuth => "NOTAUTH",
            Self::NotZone => "NOTZONE",
        }
    }

    fn explanation(self) -> &'static str {
        match self {
            Self::FormErr => "the server could not parse the update",
            Self::ServFail => "the server failed to apply the update",
            Self::NxDomain => "a prerequisite name does not exist",
            Self::Refused => "the zone does not allow this update",
            Self::NotAuth => "the update was not authorized",
            Self::NotZone => "the server is not authoritative for the zone",
        }
    }
}

impl fmt::Display for Rcode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} ({})", self.explanation(), self.as_str())
    }
}

/// Returns the response code with which the server rejected an update,
/// if `nsupdate` reported one.
pub fn rejection(error: &ExecError) -> Option<Rcode> {
    let outcome = error.outcome()?;
    outcome.stderr.lines().find_map(|line| {
        let (_, code) = line.split_once("failed: ")?;
        let code = code.trim();
        Rcode::ALL.into_iter().find(|rcode| rcode.as_str() == code)
    })
}

////////////////////////////////////////////////////////////////////////
// TESTS                                                              //
////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use std::net::Ipv4Addr;
    use std::sync::Mutex;

    use super::*;

    #[derive(Default)]
    struct Recorder {
        calls: Mutex<Vec<(Vec<String>, Option<String>)>>,
    }

    impl Executor for Recorder {
        async fn execute(
            &self,
            _program: &Path,
            args: &[String],
            input: Option<&str>,
            _timeout: Duration,
        ) -> Result<CommandOutcome, ExecError> {
            self.calls
                .lock()
                .unwrap()
                .push((args.to_vec(), input.map(str::to_owned)));
            Ok(CommandOutcome {
                exit_code: Some(0),
                ..Default::default()
            })
        }
    }

    fn nsupdate(key_file: Option<&str>) -> Nsupdate<Recorder> {
        Nsupdate::new(
            Arc::new(Recorder::default()),
            "/usr/bin/nsupdate".into(),
            "127.0.0.1".into(),
            53,
            key_file.map(PathBuf::from),
            Duration::from_secs(5),
        )
    }

    fn failure(stderr: &str) -> ExecError {
        ExecError::NonZeroExit(CommandOutcome {
            exit_code: Some(2),
            stdout: String::new(),
            stderr: stderr.into(),
        })
    }

    #[tokio::test]
    async fn updates_are_sent_in_one_script() {
        let nsupdate = nsupdate(Some("/etc/bind/ddns.key"));
        let old = RecordData::A(Ipv4Addr::new(192, 0, 2, 1));
        let new = RecordData::A(Ipv4Addr::new(192, 0, 2, 2));
        nsupdate
            .send(
                "example.com",
                &[
                    Update::Delete {
                        name: "www.example.com.",
                        rr_type: RecordType::A,
                        data: Some(&old),
                    },
                    Update::Add {
                        name: "www.example.com.",
                        ttl: 300,
                        data: &new,
                    },
                ],
            )
            .await
            .unwrap();

        let calls = nsupdate.executor.calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0, ["-k", "/etc/bind/ddns.key"]);
        assert_eq!(
            calls[0].1.as_deref(),
            Some(
                "server 127.0.0.1 53\n\
                 zone example.com.\n\
                 update delete www.example.com. A 192.0.2.1\n\
                 update add www.example.com. 300 IN A 192.0.2.2\n\
                 send\n"
            )
        );
    }

    #[test]
    fn rrset_deletes_omit_data() {
        let nsupdate = nsupdate(None);
        let script = nsupdate.script(
            "example.com",
            &[Update::Delete {
                name: "example.com.",
                rr_type: RecordType::Txt,
                data: None,
            }],
        );
        assert!(script.contains("\nupdate delete example.com. TXT\n"));
    }

    #[test]
    fn record_data_is_in_presentation_format() {
        let data = RecordData::Mx {
            preference: 10,
            exchange: "mx1.example.com.".into(),
        };
        let update = Update::Add {
            name: "example.com.",
            ttl: DEFAULT_TTL,
            data: &data,
        };
        assert_eq!(
            update.to_string(),
            "update add example.com. 3600 IN MX 10 mx1.example.com."
        );

        let data = RecordData::Txt("v=spf1 -all".into());
        let update = Update::Delete {
            name: "example.com.",
            rr_type: RecordType::Txt,
            data: Some(&data),
        };
        assert_eq!(update.to_string(), "update delete example.com. TXT \"v=spf1 -all\"");
    }

    #[test]
    fn rejections_are_recognized() {
        assert_eq!(
            rejection(&failure("update failed: REFUSED\n")),
            Some(Rcode::Refused)
        );
        assert_eq!(
            rejection(&failure("; TSIG error with server: tsig verify failure\nupdate failed: NOTAUTH\n")),
            Some(Rcode::NotAuth)
        );
        assert_eq!(rejection(&failure("could not read key from /etc/bind/ddns.key\n")), None);
        assert_eq!(
            rejection(&ExecError::Timeout {
                timeout: Duration::from_secs(1)
            }),
            None
        );
        assert_eq!(
            Rcode::NotZone.to_string(),
            "the server is not authoritative for the zone (NOTZONE)"
        );
    }
}
