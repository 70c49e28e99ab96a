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

//! Zone descriptions, as received from collaborators and as validated.
//!
//! A [`ZoneConfig`] is the declarative description of a zone that the
//! request layer hands us. Its records are loosely typed
//! ([`RecordSpec`]): every record carries a type mnemonic and a textual
//! value whose meaning depends on the type. [`validate`] checks a
//! `ZoneConfig` and, if it is acceptable, produces a [`ValidatedZone`],
//! whose records are [`Record`]s with strongly-typed [`RecordData`].
//! Only a `ValidatedZone` can be rendered into a zone file (see
//! [`crate::zone_file`]), so unchecked input can never reach the disk
//! or the authority daemon.

use std::collections::BTreeMap;
use std::fmt;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

use serde::{Deserialize, Serialize};

mod rr_type;
pub mod validation;
pub use rr_type::RecordType;
pub use validation::{
    validate, validate_record, validate_selector, Reason, SoaStrictness, SoaWarning,
    ValidationError,
};

////////////////////////////////////////////////////////////////////////
// ZONE DESCRIPTIONS                                                  //
////////////////////////////////////////////////////////////////////////

/// The declarative description of a zone.
///
/// This deserializes from the camelCase JSON used by the request
/// layer, e.g.:
///
/// ```json
/// {
///   "zoneName": "example.com",
///   "ttl": 3600,
///   "soa": {
///     "primaryNs": "ns1.example.com.",
///     "adminEmail": "hostmaster.example.com.",
///     "serial": 2024010101
///   },
///   "nameservers": ["ns1.example.com.", "ns2.example.com."],
///   "records": [{ "name": "@", "type": "A", "value": "192.0.2.1" }]
/// }
/// ```
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ZoneConfig {
    /// The zone name. This is the primary key of the zone throughout
    /// the system.
    pub zone_name: String,

    #[serde(default)]
    pub zone_kind: ZoneKind,

    /// The default TTL of the zone (the `$TTL` directive).
    pub ttl: u32,

    pub soa: SoaRecord,

    /// The zone's nameservers, in order. These become the apex NS
    /// records.
    #[serde(alias = "nameServers")]
    pub nameservers: Vec<String>,

    /// Glue addresses for the zone's nameservers, keyed by nameserver.
    #[serde(default, alias = "nameServerIps")]
    pub nameserver_ips: BTreeMap<String, String>,

    /// The zone's records, in order.
    #[serde(default)]
    pub records: Vec<RecordSpec>,

    /// The name of a key that the daemon should accept for
    /// authenticated dynamic updates of the zone.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub update_key_name: Option<String>,

    /// Primary servers to transfer from (slave zones only).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub primaries: Vec<String>,

    /// Servers to notify when the zone changes.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub also_notify: Vec<String>,

    /// Servers permitted to transfer the zone.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub allow_transfer: Vec<String>,
}

/// The kind of a zone, from the authority daemon's point of view.
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ZoneKind {
    /// The zone's data comes from the zone file we write.
    #[default]
    #[serde(alias = "primary")]
    Master,

    /// The zone's data is transferred from its primaries. No zone file
    /// is written for it.
    #[serde(alias = "secondary")]
    Slave,
}

impl ZoneKind {
    /// Returns the keyword used for this kind in the daemon's zone
    /// configuration syntax.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Master => "master",
            Self::Slave => "slave",
        }
    }
}

impl fmt::Display for ZoneKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The parameters of a zone's SOA record.
///
/// The intervals default to the values commonly recommended for small
/// zones; the serial has no default.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SoaRecord {
    /// The primary nameserver (MNAME), as an FQDN.
    pub primary_ns: String,

    /// The administrative contact (RNAME), as a dot-encoded FQDN (e.g.
    /// `hostmaster.example.com.`, not `hostmaster@example.com`).
    pub admin_email: String,

    pub serial: u32,

    #[serde(default = "default_refresh")]
    pub refresh: u32,

    #[serde(default = "default_retry")]
    pub retry: u32,

    #[serde(default = "default_expire")]
    pub expire: u32,

    /// The negative-caching TTL (the SOA MINIMUM field).
    #[serde(default = "default_negative_ttl")]
    pub negative_ttl: u32,
}

fn default_refresh() -> u32 {
    3600
}

fn default_retry() -> u32 {
    600
}

fn default_expire() -> u32 {
    604_800
}

fn default_negative_ttl() -> u32 {
    86400
}

/// A record as described by a collaborator, before validation.
///
/// The meaning of `value` depends on the type:
///
/// | Type                | `value`                                    |
/// |---------------------|--------------------------------------------|
/// | `A`, `AAAA`         | an address literal                         |
/// | `CNAME`, `NS`, `PTR`| the target FQDN                            |
/// | `MX`                | the exchange FQDN (`priority` is required) |
/// | `TXT`               | the text                                   |
/// | `SRV`               | `weight port target` (`priority` required) |
/// | `CAA`               | `flags tag value`                          |
///
/// The priority is kept wide and signed so that out-of-range values
/// reach the validator (and get a useful error) rather than failing
/// deserialization.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordSpec {
    pub name: String,
    #[serde(rename = "type")]
    pub record_type: String,
    pub value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ttl: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<i64>,
}

////////////////////////////////////////////////////////////////////////
// VALIDATED ZONES                                                    //
////////////////////////////////////////////////////////////////////////

/// A zone description that has passed [`validate`].
///
/// A `ValidatedZone` can only be constructed by the validator. Its
/// zone name is normalized (lowercase, no trailing dot).
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ValidatedZone {
    pub(crate) name: String,
    pub(crate) kind: ZoneKind,
    pub(crate) ttl: u32,
    pub(crate) soa: SoaRecord,
    pub(crate) nameservers: Vec<String>,
    pub(crate) glue: Vec<(String, IpAddr)>,
    pub(crate) records: Vec<Record>,
    pub(crate) update_key_name: Option<String>,
    pub(crate) primaries: Vec<IpAddr>,
    pub(crate) also_notify: Vec<IpAddr>,
    pub(crate) allow_transfer: Vec<IpAddr>,
    pub(crate) warnings: Vec<SoaWarning>,
}

impl ValidatedZone {
    /// Returns the normalized zone name.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> ZoneKind {
        self.kind
    }

    pub fn ttl(&self) -> u32 {
        self.ttl
    }

    pub fn soa(&self) -> &SoaRecord {
        &self.soa
    }

    pub fn nameservers(&self) -> &[String] {
        &self.nameservers
    }

    /// Returns the glue addresses, in nameserver order.
    pub fn glue(&self) -> &[(String, IpAddr)] {
        &self.glue
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn update_key_name(&self) -> Option<&str> {
        self.update_key_name.as_deref()
    }

    pub fn primaries(&self) -> &[IpAddr] {
        &self.primaries
    }

    pub fn also_notify(&self) -> &[IpAddr] {
        &self.also_notify
    }

    pub fn allow_transfer(&self) -> &[IpAddr] {
        &self.allow_transfer
    }

    /// Returns advisory problems found with the SOA timers. These are
    /// only reported when the validator is not strict about them.
    pub fn warnings(&self) -> &[SoaWarning] {
        &self.warnings
    }
}

/// Selects records for removal: every record of a type at an owner,
/// or, if `value` is given, only the record with that data. `value`
/// and `priority` have the same meaning as in a [`RecordSpec`].
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordSelector {
    pub name: String,
    #[serde(rename = "type")]
    pub record_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<i64>,
}

/// A validated [`RecordSelector`].
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RecordMatch {
    pub name: String,
    pub rr_type: RecordType,

    /// The data to match, or `None` to match the whole RRset.
    pub data: Option<RecordData>,
}

/// A validated resource record.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Record {
    /// The owner: `@`, a relative name, or an FQDN.
    pub name: String,

    /// The record's TTL. If `None`, the zone default applies.
    pub ttl: Option<u32>,

    pub data: RecordData,
}

/// The type-specific data of a validated record. Each variant carries
/// exactly the fields its type needs.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum RecordData {
    A(Ipv4Addr),
    Aaaa(Ipv6Addr),
    Cname(String),
    Mx {
        preference: u16,
        exchange: String,
    },
    Txt(String),
    Ns(String),
    Ptr(String),
    Srv {
        priority: u16,
        weight: u16,
        port: u16,
        target: String,
    },
    Caa {
        flags: u8,
        tag: String,
        value: String,
    },
}

impl RecordData {
    /// Returns the RR type of the data.
    pub fn rr_type(&self) -> RecordType {
        match *self {
            Self::A(_) => RecordType::A,
            Self::Aaaa(_) => RecordType::Aaaa,
            Self::Cname(_) => RecordType::Cname,
            Self::Mx { .. } => RecordType::Mx,
            Self::Txt(_) => RecordType::Txt,
            Self::Ns(_) => RecordType::Ns,
            Self::Ptr(_) => RecordType::Ptr,
            Self::Srv { .. } => RecordType::Srv,
            Self::Caa { .. } => RecordType::Caa,
        }
    }
}

////////////////////////////////////////////////////////////////////////
// TESTS                                                              //
////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zone_config_deserializes_with_defaults() {
        let config: ZoneConfig = serde_json::from_str(
            r#"{
                "zoneName": "example.com",
                "ttl": 3600,
                "soa": {
                    "primaryNs": "ns1.example.com.",
                    "adminEmail": "hostmaster.example.com.",
                    "serial": 1
                },
                "nameServers": ["ns1.example.com."],
                "records": [
                    { "name": "@", "type": "MX", "value": "mail.example.com.", "priority": 10 }
                ]
            }"#,
        )
        .unwrap();
        assert_eq!(config.zone_kind, ZoneKind::Master);
        assert_eq!(config.soa.refresh, 3600);
        assert_eq!(config.soa.retry, 600);
        assert_eq!(config.soa.expire, 604_800);
        assert_eq!(config.soa.negative_ttl, 86400);
        assert_eq!(config.nameservers, ["ns1.example.com."]);
        assert!(config.nameserver_ips.is_empty());
        assert_eq!(config.records[0].priority, Some(10));
        assert_eq!(config.records[0].ttl, None);
    }

    #[test]
    fn zone_kind_accepts_both_vocabularies() {
        for (text, kind) in [
            ("\"master\"", ZoneKind::Master),
            ("\"primary\"", ZoneKind::Master),
            ("\"slave\"", ZoneKind::Slave),
            ("\"secondary\"", ZoneKind::Slave),
        ] {
            assert_eq!(serde_json::from_str::<ZoneKind>(text).unwrap(), kind);
        }
        assert!(serde_json::from_str::<ZoneKind>("\"stub\"").is_err());
    }

    #[test]
    fn out_of_range_priorities_survive_deserialization() {
        let spec: RecordSpec = serde_json::from_str(
            r#"{ "name": "@", "type": "MX", "value": "mx.example.", "priority": 70000 }"#,
        )
        .unwrap();
        assert_eq!(spec.priority, Some(70000));
    }
}
