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

//! Rendering of validated zones in the [RFC 1035 § 5] zone file format.
//!
//! [`render`] produces, in order:
//!
//! 1. a `$TTL` directive with the zone's default TTL;
//! 2. the SOA record, owned by the zone name;
//! 3. one NS record at the apex per nameserver, in the given order;
//! 4. one line per record, in the given order;
//! 5. glue A/AAAA records for the nameservers, in nameserver order.
//!
//! Each record occupies exactly one line, and the output depends only
//! on the input, so identical zones render to identical bytes.
//!
//! ```text
//! $TTL 3600
//! example.com. IN SOA ns1.example.com. hostmaster.example.com. 1 3600 600 604800 86400
//! @ IN NS ns1.example.com.
//! @ IN A 192.0.2.1
//! ```
//!
//! [RFC 1035 § 5]: https://datatracker.ietf.org/doc/html/rfc1035#section-5

use std::fmt::{self, Write};
use std::net::IpAddr;

use crate::zone::{Record, RecordData, ValidatedZone};

/// The extension given to zone files.
pub const FILE_EXTENSION: &str = "zone";

/// The maximum length of a `<character-string>`.
const MAX_CHARACTER_STRING_LEN: usize = 255;

////////////////////////////////////////////////////////////////////////
// RENDERING                                                          //
////////////////////////////////////////////////////////////////////////

/// The rendered text of a zone file.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct ZoneFileText(String);

impl ZoneFileText {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for ZoneFileText {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Renders a validated zone.
pub fn render(zone: &ValidatedZone) -> ZoneFileText {
    ZoneFileText(ZoneRenderer(zone).to_string())
}

/// Returns the file name under which the zone with the given
/// (normalized) name is stored.
pub fn file_name(zone_name: &str) -> String {
    format!("{}.{}", zone_name, FILE_EXTENSION)
}

struct ZoneRenderer<'a>(&'a ValidatedZone);

impl fmt::Display for ZoneRenderer<'_> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let zone = self.0;
        let soa = zone.soa();
        writeln!(f, "$TTL {}", zone.ttl())?;
        writeln!(
            f,
            "{}. IN SOA {} {} {} {} {} {} {}",
            zone.name(),
            soa.primary_ns,
            soa.admin_email,
            soa.serial,
            soa.refresh,
            soa.retry,
            soa.expire,
            soa.negative_ttl,
        )?;
        for ns in zone.nameservers() {
            writeln!(f, "@ IN NS {}", ns)?;
        }
        for record in zone.records() {
            writeln!(f, "{}", RecordLine(record))?;
        }
        for (ns, address) in zone.glue() {
            let rr_type = match address {
                IpAddr::V4(_) => "A",
                IpAddr::V6(_) => "AAAA",
            };
            writeln!(f, "{} IN {} {}", ns, rr_type, address)?;
        }
        Ok(())
    }
}

struct RecordLine<'a>(&'a Record);

impl fmt::Display for RecordLine<'_> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let record = self.0;
        f.write_str(&record.name)?;
        if let Some(ttl) = record.ttl {
            write!(f, " {}", ttl)?;
        }
        write!(f, " IN {} {}", record.data.rr_type(), record.data)
    }
}

/// Formats the RDATA of a record in presentation format. Dynamic
/// updates use the same form.
impl fmt::Display for RecordData {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Self::A(ref address) => write!(f, "{}", address),
            Self::Aaaa(ref address) => write!(f, "{}", address),
            Self::Cname(ref target) | Self::Ns(ref target) | Self::Ptr(ref target) => {
                f.write_str(target)
            }
            Self::Mx {
                preference,
                ref exchange,
            } => write!(f, "{} {}", preference, exchange),
            Self::Txt(ref text) => {
                let mut chunks = text.as_bytes().chunks(MAX_CHARACTER_STRING_LEN);
                if let Some(first) = chunks.next() {
                    write!(f, "{}", Quoted(first))?;
                }
                for chunk in chunks {
                    write!(f, " {}", Quoted(chunk))?;
                }
                Ok(())
            }
            Self::Srv {
                priority,
                weight,
                port,
                ref target,
            } => write!(f, "{} {} {} {}", priority, weight, port, target),
            Self::Caa {
                flags,
                ref tag,
                ref value,
            } => write!(f, "{} {} {}", flags, tag, Quoted(value.as_bytes())),
        }
    }
}

/// Formats octets as a quoted `<character-string>`. Quotes and
/// backslashes are backslash-escaped, and octets other than printable
/// ASCII are written as `\DDD`.
struct Quoted<'a>(&'a [u8]);

impl fmt::Display for Quoted<'_> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_char('"')?;
        for &octet in self.0 {
            match octet {
                b'"' | b'\\' => {
                    f.write_char('\\')?;
                    f.write_char(char::from(octet))?;
                }
                0x20..=0x7e => f.write_char(char::from(octet))?,
                _ => write!(f, "\\{:03}", octet)?,
            }
        }
        f.write_char('"')
    }
}

////////////////////////////////////////////////////////////////////////
// TESTS                                                              //
////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::*;
    use crate::zone::validation::tests::{example_config, record};
    use crate::zone::{validate, SoaStrictness, ZoneConfig};

    fn render_config(config: &ZoneConfig) -> String {
        render(&validate(config, SoaStrictness::Advisory).unwrap()).into_string()
    }

    #[test]
    fn example_zone_renders() {
        assert_eq!(
            render_config(&example_config()),
            "$TTL 3600\n\
             example.com. IN SOA ns1.example.com. hostmaster.example.com. 2024010101 3600 600 604800 86400\n\
             @ IN NS ns1.example.com.\n\
             @ IN NS ns2.example.com.\n\
             @ IN A 192.0.2.1\n"
        );
    }

    #[test]
    fn rendering_is_deterministic() {
        let mut config = example_config();
        config
            .nameserver_ips
            .insert("ns2.example.com.".into(), "192.0.2.2".into());
        config
            .nameserver_ips
            .insert("ns1.example.com.".into(), "192.0.2.1".into());
        let first = render_config(&config);
        assert_eq!(first, render_config(&config.clone()));
    }

    #[test]
    fn records_keep_their_order() {
        let mut config = example_config();
        config.records = (1..=20)
            .map(|i| record(&format!("host{}", i), "A", &format!("192.0.2.{}", i)))
            .collect();
        let text = render_config(&config);
        let owners: Vec<&str> = text
            .lines()
            .filter(|line| line.contains(" IN A "))
            .map(|line| line.split(' ').next().unwrap())
            .collect();
        let expected: Vec<String> = (1..=20).map(|i| format!("host{}", i)).collect();
        assert_eq!(owners, expected);
    }

    #[test]
    fn every_record_type_renders() {
        let mut config = example_config();
        let mut mx = record("@", "MX", "mail.example.com.");
        mx.priority = Some(10);
        let mut srv = record("_sip._tcp", "srv", "5 5060 sip.example.com.");
        srv.priority = Some(0);
        srv.ttl = Some(300);
        config.records = vec![
            record("www", "AAAA", "2001:db8::1"),
            record("ftp", "CNAME", "www.example.com."),
            mx,
            record("@", "TXT", "\"say \"hi\" \\ ok\""),
            record("sub", "NS", "ns.sub.example.com."),
            record("1", "PTR", "host.example.com."),
            srv,
            record("@", "CAA", "0 issue \"letsencrypt.org\""),
        ];
        let text = render_config(&config);
        let lines: Vec<&str> = text.lines().skip(4).collect();
        assert_eq!(
            lines,
            [
                "www IN AAAA 2001:db8::1",
                "ftp IN CNAME www.example.com.",
                "@ IN MX 10 mail.example.com.",
                r#"@ IN TXT "say \"hi\" \\ ok""#,
                "sub IN NS ns.sub.example.com.",
                "1 IN PTR host.example.com.",
                "_sip._tcp 300 IN SRV 0 5 5060 sip.example.com.",
                r#"@ IN CAA 0 issue "letsencrypt.org""#,
            ]
        );
    }

    #[test]
    fn long_txt_is_split_into_character_strings() {
        let mut config = example_config();
        let text = format!("{}{}", "a".repeat(255), "b\u{e9}");
        config.records = vec![record("@", "TXT", &text)];
        let rendered = render_config(&config);
        let line = rendered.lines().last().unwrap();
        assert_eq!(
            line,
            format!("@ IN TXT \"{}\" \"b\\195\\169\"", "a".repeat(255))
        );
    }

    #[test]
    fn glue_follows_records() {
        let mut config = example_config();
        config
            .nameserver_ips
            .insert("ns2.example.com.".into(), "2001:db8::53".into());
        config
            .nameserver_ips
            .insert("ns1.example.com.".into(), "192.0.2.53".into());
        let text = render_config(&config);
        let tail: Vec<&str> = text.lines().skip(4).collect();
        assert_eq!(
            tail,
            [
                "@ IN A 192.0.2.1",
                "ns1.example.com. IN A 192.0.2.53",
                "ns2.example.com. IN AAAA 2001:db8::53",
            ]
        );
    }

    #[test]
    fn file_names_use_zone_extension() {
        assert_eq!(file_name("example.com"), "example.com.zone");
    }
}
