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

//! Validation of zone descriptions.
//!
//! [`validate`] checks a [`ZoneConfig`] in a fixed order (zone name,
//! default TTL, SOA, nameservers, glue, records, and finally the
//! transfer and update settings) and stops at the first problem it
//! finds. The resulting [`ValidationError`] names the offending field
//! with a JSON-style path such as `records[2].value`.
//!
//! Validation has no side effects. In particular, advisory SOA
//! problems are returned on the [`ValidatedZone`] rather than logged
//! here; reporting them is up to the caller.

use std::fmt;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::str::FromStr;

use serde::Deserialize;

use super::{
    Record, RecordData, RecordMatch, RecordSelector, RecordSpec, RecordType, SoaRecord,
    ValidatedZone, ZoneConfig, ZoneKind,
};
use crate::name;
use crate::util::strip_quotes;

/// The maximum length of a TXT payload, in octets.
pub const MAX_TXT_LEN: usize = 4096;

////////////////////////////////////////////////////////////////////////
// VALIDATION                                                         //
////////////////////////////////////////////////////////////////////////

/// Controls how [`validate`] treats SOA timers that violate the
/// recommended ordering `retry < refresh < expire`.
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum SoaStrictness {
    /// Violations are reported as [`SoaWarning`]s on the validated
    /// zone.
    #[default]
    Advisory,

    /// Violations are validation errors.
    Strict,
}

/// Validates a zone description.
pub fn validate(
    config: &ZoneConfig,
    strictness: SoaStrictness,
) -> Result<ValidatedZone, ValidationError> {
    let name = name::normalize_zone_name(&config.zone_name)
        .map_err(|e| ValidationError::new("zoneName", Reason::InvalidName(e)))?;
    if config.ttl == 0 {
        return Err(ValidationError::new("ttl", Reason::NotPositive));
    }

    let warnings = validate_soa(&config.soa, strictness)?;

    if config.nameservers.is_empty() {
        return Err(ValidationError::new("nameservers", Reason::Empty));
    }
    for (i, ns) in config.nameservers.iter().enumerate() {
        name::check_fqdn(ns).map_err(|e| {
            ValidationError::new(format!("nameservers[{}]", i), Reason::InvalidName(e))
        })?;
    }
    let glue = validate_glue(config)?;

    let records = config
        .records
        .iter()
        .enumerate()
        .map(|(i, spec)| check_record(&format!("records[{}].", i), spec))
        .collect::<Result<Vec<_>, _>>()?;

    let update_key_name = match config.update_key_name {
        Some(ref key) => {
            name::normalize_zone_name(key)
                .map_err(|e| ValidationError::new("updateKeyName", Reason::InvalidName(e)))?;
            Some(key.clone())
        }
        None => None,
    };

    let primaries = parse_addresses("primaries", &config.primaries)?;
    if config.zone_kind == ZoneKind::Slave && primaries.is_empty() {
        return Err(ValidationError::new("primaries", Reason::MissingPrimaries));
    }
    let also_notify = parse_addresses("alsoNotify", &config.also_notify)?;
    let allow_transfer = parse_addresses("allowTransfer", &config.allow_transfer)?;

    Ok(ValidatedZone {
        name,
        kind: config.zone_kind,
        ttl: config.ttl,
        soa: config.soa.clone(),
        nameservers: config.nameservers.clone(),
        glue,
        records,
        update_key_name,
        primaries,
        also_notify,
        allow_transfer,
        warnings,
    })
}

fn validate_soa(
    soa: &SoaRecord,
    strictness: SoaStrictness,
) -> Result<Vec<SoaWarning>, ValidationError> {
    name::check_fqdn(&soa.primary_ns)
        .map_err(|e| ValidationError::new("soa.primaryNs", Reason::InvalidName(e)))?;
    if soa.admin_email.contains('@') {
        return Err(ValidationError::new(
            "soa.adminEmail",
            Reason::AtSignInContact,
        ));
    }
    name::check_fqdn(&soa.admin_email)
        .map_err(|e| ValidationError::new("soa.adminEmail", Reason::InvalidName(e)))?;

    for (path, value) in [
        ("soa.refresh", soa.refresh),
        ("soa.retry", soa.retry),
        ("soa.expire", soa.expire),
        ("soa.negativeTtl", soa.negative_ttl),
    ] {
        if value == 0 {
            return Err(ValidationError::new(path, Reason::NotPositive));
        }
    }

    let mut warnings = Vec::new();
    if soa.retry >= soa.refresh {
        warnings.push(SoaWarning::RetryNotBelowRefresh {
            retry: soa.retry,
            refresh: soa.refresh,
        });
    }
    if soa.refresh >= soa.expire {
        warnings.push(SoaWarning::RefreshNotBelowExpire {
            refresh: soa.refresh,
            expire: soa.expire,
        });
    }

    if strictness == SoaStrictness::Strict {
        if let Some(&warning) = warnings.first() {
            return Err(ValidationError::new(
                warning.path(),
                Reason::SoaTimers(warning),
            ));
        }
    }
    Ok(warnings)
}

/// Validates the glue map and returns its entries in nameserver order.
fn validate_glue(config: &ZoneConfig) -> Result<Vec<(String, IpAddr)>, ValidationError> {
    let mut parsed = Vec::with_capacity(config.nameserver_ips.len());
    for (ns, ip) in &config.nameserver_ips {
        let path = || format!("nameserverIps[{}]", ns);
        if !config
            .nameservers
            .iter()
            .any(|known| known.eq_ignore_ascii_case(ns))
        {
            return Err(ValidationError::new(path(), Reason::UnknownNameserver));
        }
        let address = IpAddr::from_str(ip.trim())
            .map_err(|_| ValidationError::new(path(), Reason::InvalidAddress))?;
        parsed.push((ns, address));
    }

    let mut glue = Vec::with_capacity(parsed.len());
    for ns in &config.nameservers {
        for &(key, address) in &parsed {
            if key.eq_ignore_ascii_case(ns) {
                glue.push((ns.clone(), address));
            }
        }
    }
    Ok(glue)
}

/// Validates a single record outside of a zone description, as for a
/// dynamic update. Error paths name the record's own fields (e.g.
/// `value`).
pub fn validate_record(spec: &RecordSpec) -> Result<Record, ValidationError> {
    check_record("", spec)
}

/// Validates a [`RecordSelector`]. If it has a value, the value is
/// checked as [`validate_record`] would check it.
pub fn validate_selector(selector: &RecordSelector) -> Result<RecordMatch, ValidationError> {
    match selector.value {
        Some(ref value) => {
            let record = validate_record(&RecordSpec {
                name: selector.name.clone(),
                record_type: selector.record_type.clone(),
                value: value.clone(),
                ttl: None,
                priority: selector.priority,
            })?;
            Ok(RecordMatch {
                name: record.name,
                rr_type: record.data.rr_type(),
                data: Some(record.data),
            })
        }
        None => {
            name::check_owner(&selector.name)
                .map_err(|e| ValidationError::new("name", Reason::InvalidName(e)))?;
            Ok(RecordMatch {
                name: selector.name.clone(),
                rr_type: parse_type("type".into(), &selector.record_type)?,
                data: None,
            })
        }
    }
}

fn parse_type(path: String, text: &str) -> Result<RecordType, ValidationError> {
    RecordType::from_str(text.trim())
        .map_err(|_| ValidationError::new(path, Reason::UnsupportedType(text.to_owned())))
}

/// Validates a record whose fields are found under `prefix`.
fn check_record(prefix: &str, spec: &RecordSpec) -> Result<Record, ValidationError> {
    let path = |field: &str| format!("{}{}", prefix, field);

    name::check_owner(&spec.name)
        .map_err(|e| ValidationError::new(path("name"), Reason::InvalidName(e)))?;
    let rr_type = parse_type(path("type"), &spec.record_type)?;

    let priority = if rr_type.takes_priority() {
        match spec.priority {
            Some(p) => u16::try_from(p)
                .map_err(|_| ValidationError::new(path("priority"), Reason::OutOfRange))?,
            None => return Err(ValidationError::new(path("priority"), Reason::MissingPriority)),
        }
    } else {
        0
    };

    let value_err = |reason| ValidationError::new(path("value"), reason);
    let fqdn = |text: &str| -> Result<String, ValidationError> {
        name::check_fqdn(text).map_err(|e| value_err(Reason::InvalidName(e)))?;
        Ok(text.to_owned())
    };
    let value = spec.value.trim();

    let data = match rr_type {
        RecordType::A => RecordData::A(
            Ipv4Addr::from_str(value).map_err(|_| value_err(Reason::InvalidIpv4))?,
        ),
        RecordType::Aaaa => RecordData::Aaaa(
            Ipv6Addr::from_str(value).map_err(|_| value_err(Reason::InvalidIpv6))?,
        ),
        RecordType::Cname => RecordData::Cname(fqdn(value)?),
        RecordType::Ns => RecordData::Ns(fqdn(value)?),
        RecordType::Ptr => RecordData::Ptr(fqdn(value)?),
        RecordType::Mx => RecordData::Mx {
            preference: priority,
            exchange: fqdn(value)?,
        },
        RecordType::Txt => {
            let text = strip_quotes(&spec.value);
            if text.is_empty() {
                return Err(value_err(Reason::Empty));
            } else if text.len() > MAX_TXT_LEN {
                return Err(value_err(Reason::TooLong));
            }
            RecordData::Txt(text.to_owned())
        }
        RecordType::Srv => {
            let mut fields = value.split_ascii_whitespace();
            let (weight, port, target) =
                match (fields.next(), fields.next(), fields.next(), fields.next()) {
                    (Some(weight), Some(port), Some(target), None) => (weight, port, target),
                    _ => return Err(value_err(Reason::MalformedSrv)),
                };
            RecordData::Srv {
                priority,
                weight: weight
                    .parse()
                    .map_err(|_| value_err(Reason::MalformedSrv))?,
                port: port.parse().map_err(|_| value_err(Reason::MalformedSrv))?,
                target: fqdn(target)?,
            }
        }
        RecordType::Caa => {
            if value.is_empty() {
                return Err(value_err(Reason::Empty));
            }
            let (flags, rest) = split_token(value);
            let (tag, rest) = split_token(rest);
            let caa_value = strip_quotes(rest);
            if tag.is_empty()
                || rest.is_empty()
                || !tag.bytes().all(|b| b.is_ascii_alphanumeric())
            {
                return Err(value_err(Reason::MalformedCaa));
            }
            RecordData::Caa {
                flags: flags.parse().map_err(|_| value_err(Reason::MalformedCaa))?,
                tag: tag.to_ascii_lowercase(),
                value: caa_value.to_owned(),
            }
        }
    };

    Ok(Record {
        name: spec.name.clone(),
        ttl: spec.ttl,
        data,
    })
}

/// Splits the first whitespace-delimited token off of `text`. The
/// remainder has leading whitespace removed.
fn split_token(text: &str) -> (&str, &str) {
    match text.find(|c: char| c.is_ascii_whitespace()) {
        Some(end) => (&text[..end], text[end..].trim_start()),
        None => (text, ""),
    }
}

fn parse_addresses(field: &str, addresses: &[String]) -> Result<Vec<IpAddr>, ValidationError> {
    addresses
        .iter()
        .enumerate()
        .map(|(i, address)| {
            IpAddr::from_str(address.trim()).map_err(|_| {
                ValidationError::new(format!("{}[{}]", field, i), Reason::InvalidAddress)
            })
        })
        .collect()
}

////////////////////////////////////////////////////////////////////////
// SOA WARNINGS                                                       //
////////////////////////////////////////////////////////////////////////

/// A violation of the recommended SOA timer ordering.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum SoaWarning {
    RetryNotBelowRefresh { retry: u32, refresh: u32 },
    RefreshNotBelowExpire { refresh: u32, expire: u32 },
}

impl SoaWarning {
    /// Returns the path of the field that the warning is attributed to.
    pub fn path(self) -> &'static str {
        match self {
            Self::RetryNotBelowRefresh { .. } => "soa.retry",
            Self::RefreshNotBelowExpire { .. } => "soa.refresh",
        }
    }
}

impl fmt::Display for SoaWarning {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Self::RetryNotBelowRefresh { retry, refresh } => write!(
                f,
                "SOA retry ({}) should be less than refresh ({})",
                retry, refresh
            ),
            Self::RefreshNotBelowExpire { refresh, expire } => write!(
                f,
                "SOA refresh ({}) should be less than expire ({})",
                refresh, expire
            ),
        }
    }
}

////////////////////////////////////////////////////////////////////////
// ERRORS                                                             //
////////////////////////////////////////////////////////////////////////

/// An error signaling that a zone description is invalid.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ValidationError {
    path: String,
    reason: Reason,
}

impl ValidationError {
    pub(crate) fn new(path: impl Into<String>, reason: Reason) -> Self {
        Self {
            path: path.into(),
            reason,
        }
    }

    /// Places the path under the field `parent`.
    pub(crate) fn within(mut self, parent: &str) -> Self {
        self.path = format!("{}.{}", parent, self.path);
        self
    }

    /// Returns the path of the offending field (e.g.
    /// `records[0].value`).
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn reason(&self) -> &Reason {
        &self.reason
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}: {}", self.path, self.reason)
    }
}

impl std::error::Error for ValidationError {}

/// The reason a field failed validation.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Reason {
    /// A domain name was syntactically invalid.
    InvalidName(name::Error),

    /// A number that must be positive was zero.
    NotPositive,

    /// A priority was outside of 0–65535.
    OutOfRange,

    /// An MX or SRV record had no priority.
    MissingPriority,

    UnsupportedType(String),
    InvalidIpv4,
    InvalidIpv6,
    InvalidAddress,

    /// A required list or payload was empty.
    Empty,

    /// A TXT payload was longer than [`MAX_TXT_LEN`].
    TooLong,

    MalformedSrv,
    MalformedCaa,

    /// The SOA contact was given in e-mail form.
    AtSignInContact,

    /// A glue address was given for a name that is not one of the
    /// zone's nameservers.
    UnknownNameserver,

    /// The SOA timers violated the recommended ordering, and
    /// validation was strict.
    SoaTimers(SoaWarning),

    /// A slave zone had no primaries.
    MissingPrimaries,

    /// A record owner was a fully-qualified name outside of the zone.
    OutsideZone,

    /// A replacement record did not have the owner or type of the
    /// record it replaces.
    ReplacementMismatch,
}

impl fmt::Display for Reason {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::InvalidName(e) => write!(f, "invalid domain name: {}", e),
            Self::NotPositive => f.write_str("value must be positive"),
            Self::OutOfRange => f.write_str("value must be between 0 and 65535"),
            Self::MissingPriority => f.write_str("a priority is required for this record type"),
            Self::UnsupportedType(t) => write!(f, "unsupported record type {:?}", t),
            Self::InvalidIpv4 => f.write_str("not a valid IPv4 address"),
            Self::InvalidIpv6 => f.write_str("not a valid IPv6 address"),
            Self::InvalidAddress => f.write_str("not a valid IP address"),
            Self::Empty => f.write_str("must not be empty"),
            Self::TooLong => write!(f, "text is longer than {} octets", MAX_TXT_LEN),
            Self::MalformedSrv => f.write_str("SRV data must be \"weight port target\""),
            Self::MalformedCaa => f.write_str("CAA data must be \"flags tag value\""),
            Self::AtSignInContact => f.write_str(
                "contact must be dot-encoded (hostmaster.example.com.), not an e-mail address",
            ),
            Self::UnknownNameserver => f.write_str("not one of the zone's nameservers"),
            Self::SoaTimers(warning) => fmt::Display::fmt(warning, f),
            Self::MissingPrimaries => f.write_str("a slave zone requires at least one primary"),
            Self::OutsideZone => f.write_str("name is not within the zone"),
            Self::ReplacementMismatch => {
                f.write_str("must match the owner and type of the record being replaced")
            }
        }
    }
}

////////////////////////////////////////////////////////////////////////
// TESTS                                                              //
////////////////////////////////////////////////////////////////////////

#[cfg(test)]
pub(crate) mod tests {
    use std::collections::BTreeMap;

    use super::*;

    pub(crate) fn example_config() -> ZoneConfig {
        ZoneConfig {
            zone_name: "example.com".into(),
            zone_kind: ZoneKind::Master,
            ttl: 3600,
            soa: SoaRecord {
                primary_ns: "ns1.example.com.".into(),
                admin_email: "hostmaster.example.com.".into(),
                serial: 2024010101,
                refresh: 3600,
                retry: 600,
                expire: 604_800,
                negative_ttl: 86400,
            },
            nameservers: vec!["ns1.example.com.".into(), "ns2.example.com.".into()],
            nameserver_ips: BTreeMap::new(),
            records: vec![record("@", "A", "192.0.2.1")],
            update_key_name: None,
            primaries: Vec::new(),
            also_notify: Vec::new(),
            allow_transfer: Vec::new(),
        }
    }

    pub(crate) fn record(name: &str, record_type: &str, value: &str) -> RecordSpec {
        RecordSpec {
            name: name.into(),
            record_type: record_type.into(),
            value: value.into(),
            ttl: None,
            priority: None,
        }
    }

    fn validate_one(spec: RecordSpec) -> Result<RecordData, ValidationError> {
        let mut config = example_config();
        config.records = vec![spec];
        validate(&config, SoaStrictness::Advisory).map(|z| z.records[0].data.clone())
    }

    fn reason_of(result: Result<impl fmt::Debug, ValidationError>) -> (String, Reason) {
        let error = result.unwrap_err();
        (error.path().to_owned(), error.reason().clone())
    }

    #[test]
    fn example_zone_validates() {
        let mut config = example_config();
        config.zone_name = "Example.COM.".into();
        let zone = validate(&config, SoaStrictness::Advisory).unwrap();
        assert_eq!(zone.name(), "example.com");
        assert!(zone.warnings().is_empty());
        assert_eq!(
            zone.records()[0].data,
            RecordData::A(Ipv4Addr::new(192, 0, 2, 1))
        );
    }

    #[test]
    fn fqdn_fields_require_trailing_dot() {
        for rr_type in ["CNAME", "NS", "PTR"] {
            assert_eq!(
                reason_of(validate_one(record("www", rr_type, "example.com"))),
                (
                    "records[0].value".to_owned(),
                    Reason::InvalidName(name::Error::NotFullyQualified)
                )
            );
        }
        assert_eq!(
            validate_one(record("www", "cname", "example.com.")).unwrap(),
            RecordData::Cname("example.com.".into())
        );
    }

    #[test]
    fn priorities_are_required_and_range_checked() {
        let mut mx = record("@", "MX", "mail.example.com.");
        assert_eq!(
            reason_of(validate_one(mx.clone())).1,
            Reason::MissingPriority
        );

        for bad in [-1, 65536, i64::MAX] {
            mx.priority = Some(bad);
            assert_eq!(
                reason_of(validate_one(mx.clone())),
                ("records[0].priority".to_owned(), Reason::OutOfRange)
            );
        }

        mx.priority = Some(65535);
        assert_eq!(
            validate_one(mx).unwrap(),
            RecordData::Mx {
                preference: 65535,
                exchange: "mail.example.com.".into()
            }
        );

        let mut srv = record("_sip._tcp", "SRV", "5 5060 sip.example.com.");
        srv.priority = Some(70000);
        assert_eq!(reason_of(validate_one(srv)).1, Reason::OutOfRange);
    }

    #[test]
    fn srv_payload_is_parsed() {
        let mut srv = record("_sip._tcp", "SRV", "5 5060 sip.example.com.");
        srv.priority = Some(10);
        assert_eq!(
            validate_one(srv.clone()).unwrap(),
            RecordData::Srv {
                priority: 10,
                weight: 5,
                port: 5060,
                target: "sip.example.com.".into()
            }
        );

        for bad in ["5 5060", "5 70000 sip.example.com.", "5 5060 sip. extra", "x 1 t."] {
            srv.value = bad.into();
            assert_eq!(reason_of(validate_one(srv.clone())).1, Reason::MalformedSrv);
        }

        srv.value = "5 5060 sip.example.com".into();
        assert_eq!(
            reason_of(validate_one(srv)).1,
            Reason::InvalidName(name::Error::NotFullyQualified)
        );
    }

    #[test]
    fn caa_payload_is_parsed() {
        assert_eq!(
            validate_one(record("@", "CAA", "0 Issue \"letsencrypt.org\"")).unwrap(),
            RecordData::Caa {
                flags: 0,
                tag: "issue".into(),
                value: "letsencrypt.org".into()
            }
        );
        for bad in ["", "0 issue", "256 issue x", "0 is-sue x"] {
            assert!(validate_one(record("@", "CAA", bad)).is_err(), "{:?}", bad);
        }
    }

    #[test]
    fn txt_payload_is_bounded() {
        assert_eq!(
            validate_one(record("@", "TXT", "\"v=spf1 -all\"")).unwrap(),
            RecordData::Txt("v=spf1 -all".into())
        );
        assert_eq!(
            reason_of(validate_one(record("@", "TXT", "\"\""))).1,
            Reason::Empty
        );
        let long = "x".repeat(MAX_TXT_LEN + 1);
        assert_eq!(
            reason_of(validate_one(record("@", "TXT", &long))).1,
            Reason::TooLong
        );
    }

    #[test]
    fn addresses_and_types_are_checked() {
        assert_eq!(
            reason_of(validate_one(record("@", "A", "2001:db8::1"))).1,
            Reason::InvalidIpv4
        );
        assert_eq!(
            reason_of(validate_one(record("@", "AAAA", "192.0.2.1"))).1,
            Reason::InvalidIpv6
        );
        assert_eq!(
            reason_of(validate_one(record("@", "HINFO", "x"))),
            (
                "records[0].type".to_owned(),
                Reason::UnsupportedType("HINFO".into())
            )
        );
        assert_eq!(
            reason_of(validate_one(record("", "A", "192.0.2.1"))).0,
            "records[0].name"
        );
    }

    #[test]
    fn first_violation_wins() {
        let mut config = example_config();
        config.zone_name = "bad..name".into();
        config.nameservers.clear();
        assert_eq!(
            reason_of(validate(&config, SoaStrictness::Advisory)).0,
            "zoneName"
        );

        let mut config = example_config();
        config.soa.retry = 0;
        config.nameservers.clear();
        assert_eq!(
            reason_of(validate(&config, SoaStrictness::Advisory)),
            ("soa.retry".to_owned(), Reason::NotPositive)
        );
    }

    #[test]
    fn soa_contact_must_be_dot_encoded() {
        let mut config = example_config();
        config.soa.admin_email = "hostmaster@example.com".into();
        assert_eq!(
            reason_of(validate(&config, SoaStrictness::Advisory)),
            ("soa.adminEmail".to_owned(), Reason::AtSignInContact)
        );
    }

    #[test]
    fn nameservers_must_be_present_and_qualified() {
        let mut config = example_config();
        config.nameservers.clear();
        assert_eq!(
            reason_of(validate(&config, SoaStrictness::Advisory)),
            ("nameservers".to_owned(), Reason::Empty)
        );

        config.nameservers = vec!["ns1.example.com.".into(), "ns2.example.com".into()];
        assert_eq!(
            reason_of(validate(&config, SoaStrictness::Advisory)).0,
            "nameservers[1]"
        );
    }

    #[test]
    fn soa_timer_order_follows_strictness() {
        let mut config = example_config();
        config.soa.retry = 7200;

        let zone = validate(&config, SoaStrictness::Advisory).unwrap();
        assert_eq!(
            zone.warnings(),
            [SoaWarning::RetryNotBelowRefresh {
                retry: 7200,
                refresh: 3600
            }]
        );

        let (path, reason) = reason_of(validate(&config, SoaStrictness::Strict));
        assert_eq!(path, "soa.retry");
        assert!(matches!(reason, Reason::SoaTimers(_)));
    }

    #[test]
    fn glue_follows_nameserver_order() {
        let mut config = example_config();
        config
            .nameserver_ips
            .insert("ns2.example.com.".into(), "192.0.2.2".into());
        config
            .nameserver_ips
            .insert("NS1.example.com.".into(), "2001:db8::53".into());
        let zone = validate(&config, SoaStrictness::Advisory).unwrap();
        assert_eq!(
            zone.glue(),
            [
                ("ns1.example.com.".to_owned(), "2001:db8::53".parse::<IpAddr>().unwrap()),
                ("ns2.example.com.".to_owned(), "192.0.2.2".parse::<IpAddr>().unwrap()),
            ]
        );

        config
            .nameserver_ips
            .insert("ns3.example.com.".into(), "192.0.2.3".into());
        assert_eq!(
            reason_of(validate(&config, SoaStrictness::Advisory)).1,
            Reason::UnknownNameserver
        );
    }

    #[test]
    fn slave_zones_need_primaries() {
        let mut config = example_config();
        config.zone_kind = ZoneKind::Slave;
        assert_eq!(
            reason_of(validate(&config, SoaStrictness::Advisory)),
            ("primaries".to_owned(), Reason::MissingPrimaries)
        );

        config.primaries = vec!["192.0.2.53".into(), "nope".into()];
        assert_eq!(
            reason_of(validate(&config, SoaStrictness::Advisory)),
            ("primaries[1]".to_owned(), Reason::InvalidAddress)
        );

        config.primaries.pop();
        let zone = validate(&config, SoaStrictness::Advisory).unwrap();
        assert_eq!(zone.primaries(), ["192.0.2.53".parse::<IpAddr>().unwrap()]);
    }

    #[test]
    fn single_records_use_their_own_paths() {
        let mut spec = record("mail", "MX", "mx1.example.com.");
        assert_eq!(
            reason_of(validate_record(&spec)),
            ("priority".to_owned(), Reason::MissingPriority)
        );
        spec.priority = Some(10);
        spec.ttl = Some(300);
        let record = validate_record(&spec).unwrap();
        assert_eq!(record.ttl, Some(300));
        assert_eq!(
            record.data,
            RecordData::Mx {
                preference: 10,
                exchange: "mx1.example.com.".into()
            }
        );
    }

    #[test]
    fn selectors_may_omit_the_value() {
        let mut selector = RecordSelector {
            name: "www".into(),
            record_type: "aaaa".into(),
            value: None,
            priority: None,
        };
        assert_eq!(
            validate_selector(&selector).unwrap(),
            RecordMatch {
                name: "www".into(),
                rr_type: RecordType::Aaaa,
                data: None,
            }
        );

        selector.value = Some("2001:db8::1".into());
        assert_eq!(
            validate_selector(&selector).unwrap().data,
            Some(RecordData::Aaaa("2001:db8::1".parse().unwrap()))
        );

        selector.value = Some("192.0.2.1".into());
        assert_eq!(
            reason_of(validate_selector(&selector)),
            ("value".to_owned(), Reason::InvalidIpv6)
        );

        selector.value = None;
        selector.record_type = "SOA".into();
        assert_eq!(
            reason_of(validate_selector(&selector)),
            ("type".to_owned(), Reason::UnsupportedType("SOA".into()))
        );
    }
}
