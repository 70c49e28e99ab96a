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

//! Syntax checks for domain names in their textual (zone file) form.
//!
//! Names reach us in three roles, each with its own rules:
//!
//! * zone names (see [`normalize_zone_name`]), which may be given with
//!   or without a trailing dot and which also determine the name of the
//!   zone's file on disk;
//! * fully-qualified targets (see [`check_fqdn`]), such as the target
//!   of a CNAME or the exchange of an MX record, which must end with a
//!   dot so that the authority daemon does not append the origin to
//!   them;
//! * record owners (see [`check_owner`]), which may be `@`, relative
//!   to the zone apex, or fully qualified, and which may start with a
//!   wildcard label.
//!
//! Only letters, digits, hyphens, and underscores are accepted in
//! labels. Escape sequences are not supported; the zone file renderer
//! relies on this to write names verbatim.

mod error;
pub use error::Error;

/// The maximum length of a label.
pub const MAX_LABEL_LEN: usize = 63;

/// The maximum length of a name in text form, not counting the
/// trailing dot.
pub const MAX_NAME_LEN: usize = 253;

/// The owner name that refers to the zone apex.
pub const APEX: &str = "@";

/// Checks the syntax of a zone name and returns its normalized form:
/// ASCII lowercase, without the trailing dot. The normalized form is
/// the key under which the zone is tracked and the stem of its zone
/// file name.
pub fn normalize_zone_name(name: &str) -> Result<String, Error> {
    if name.is_empty() {
        return Err(Error::StrEmpty);
    }
    let relative = name.strip_suffix('.').unwrap_or(name);
    if relative.is_empty() {
        return Err(Error::RootNotAllowed);
    }
    check_labels(relative, false)?;
    Ok(relative.to_ascii_lowercase())
}

/// Checks that `name` is a syntactically valid fully-qualified domain
/// name. The root (`.`) is accepted.
pub fn check_fqdn(name: &str) -> Result<(), Error> {
    if name.is_empty() {
        return Err(Error::StrEmpty);
    }
    match name.strip_suffix('.') {
        Some("") => Ok(()),
        Some(relative) => check_labels(relative, false),
        None => {
            // Report syntax problems ahead of the missing dot; they
            // are the more useful diagnostic.
            check_labels(name, false)?;
            Err(Error::NotFullyQualified)
        }
    }
}

/// Checks that `name` is a valid record owner: `@`, a relative name,
/// or a fully-qualified name. The leftmost label may be `*`.
pub fn check_owner(name: &str) -> Result<(), Error> {
    if name.is_empty() {
        return Err(Error::StrEmpty);
    } else if name == APEX {
        return Ok(());
    }
    match name.strip_suffix('.') {
        Some("") => Err(Error::RootNotAllowed),
        Some(relative) => check_labels(relative, true),
        None => check_labels(name, true),
    }
}

/// Makes a (checked) record owner absolute relative to the normalized
/// zone name `zone`. Returns `None` if a fully-qualified owner is not
/// at or below the zone apex.
///
/// ```
/// # use zonekeeper::name::qualify_owner;
/// assert_eq!(qualify_owner("@", "example.com").unwrap(), "example.com.");
/// assert_eq!(qualify_owner("www", "example.com").unwrap(), "www.example.com.");
/// assert_eq!(qualify_owner("mail.example.com.", "example.com").unwrap(), "mail.example.com.");
/// assert_eq!(qualify_owner("example.org.", "example.com"), None);
/// ```
pub fn qualify_owner(owner: &str, zone: &str) -> Option<String> {
    if owner == APEX {
        return Some(format!("{}.", zone));
    }
    let Some(absolute) = owner.strip_suffix('.') else {
        return Some(format!("{}.{}.", owner, zone));
    };
    let lower = absolute.to_ascii_lowercase();
    let within = lower == zone
        || lower
            .strip_suffix(zone)
            .map_or(false, |prefix| prefix.ends_with('.'));
    within.then(|| owner.to_owned())
}

/// Checks the labels of a name given without its trailing dot.
fn check_labels(name: &str, allow_wildcard: bool) -> Result<(), Error> {
    if !name.is_ascii() {
        return Err(Error::StrNotAscii);
    } else if name.len() > MAX_NAME_LEN {
        return Err(Error::NameTooLong);
    }

    for (i, label) in name.split('.').enumerate() {
        if label.is_empty() {
            return Err(Error::EmptyLabel);
        } else if label.len() > MAX_LABEL_LEN {
            return Err(Error::LabelTooLong);
        } else if label == "*" {
            if allow_wildcard && i == 0 {
                continue;
            } else {
                return Err(Error::MisplacedWildcard);
            }
        }

        for c in label.chars() {
            if c == '*' {
                return Err(Error::MisplacedWildcard);
            } else if !(c.is_ascii_alphanumeric() || c == '-' || c == '_') {
                return Err(Error::InvalidCharacter(c));
            }
        }
    }
    Ok(())
}

////////////////////////////////////////////////////////////////////////
// TESTS                                                              //
////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn owners_are_qualified_within_the_zone() {
        assert_eq!(qualify_owner("*.dev", "example.com").unwrap(), "*.dev.example.com.");
        assert_eq!(qualify_owner("WWW.Example.COM.", "example.com").unwrap(), "WWW.Example.COM.");
        assert_eq!(qualify_owner("example.com.", "example.com").unwrap(), "example.com.");
        assert_eq!(qualify_owner("badexample.com.", "example.com"), None);
        assert_eq!(qualify_owner("com.", "example.com"), None);
    }

    #[test]
    fn zone_names_are_normalized() {
        assert_eq!(normalize_zone_name("Example.COM.").unwrap(), "example.com");
        assert_eq!(normalize_zone_name("example.com").unwrap(), "example.com");
        assert_eq!(
            normalize_zone_name("_tcp.2.0.192.in-addr.arpa").unwrap(),
            "_tcp.2.0.192.in-addr.arpa"
        );
    }

    #[test]
    fn zone_names_reject_bad_syntax() {
        assert_eq!(normalize_zone_name(""), Err(Error::StrEmpty));
        assert_eq!(normalize_zone_name("."), Err(Error::RootNotAllowed));
        assert_eq!(normalize_zone_name("example..com"), Err(Error::EmptyLabel));
        assert_eq!(normalize_zone_name(".example.com"), Err(Error::EmptyLabel));
        assert_eq!(
            normalize_zone_name("../etc/passwd"),
            Err(Error::EmptyLabel)
        );
        assert_eq!(
            normalize_zone_name("exa/mple.com"),
            Err(Error::InvalidCharacter('/'))
        );
        assert_eq!(
            normalize_zone_name("*.example.com"),
            Err(Error::MisplacedWildcard)
        );
        assert_eq!(normalize_zone_name("exämple.com"), Err(Error::StrNotAscii));
    }

    #[test]
    fn length_limits_are_enforced() {
        let long_label = "a".repeat(64);
        assert_eq!(
            normalize_zone_name(&format!("{}.com", long_label)),
            Err(Error::LabelTooLong)
        );

        let max_label = "a".repeat(63);
        let long_name = [&max_label[..]; 4].join(".");
        assert_eq!(long_name.len(), 255);
        assert_eq!(normalize_zone_name(&long_name), Err(Error::NameTooLong));
    }

    #[test]
    fn fqdns_require_trailing_dot() {
        assert!(check_fqdn("ns1.example.com.").is_ok());
        assert!(check_fqdn(".").is_ok());
        assert_eq!(check_fqdn("example.com"), Err(Error::NotFullyQualified));
        assert_eq!(check_fqdn("exa mple.com"), Err(Error::InvalidCharacter(' ')));
        assert_eq!(check_fqdn(""), Err(Error::StrEmpty));
    }

    #[test]
    fn owners_accept_apex_relative_absolute_and_wildcards() {
        assert!(check_owner("@").is_ok());
        assert!(check_owner("www").is_ok());
        assert!(check_owner("www.example.com.").is_ok());
        assert!(check_owner("*").is_ok());
        assert!(check_owner("*.dev").is_ok());
        assert!(check_owner("_sip._tcp").is_ok());
        assert_eq!(check_owner("dev.*"), Err(Error::MisplacedWildcard));
        assert_eq!(check_owner("w*w"), Err(Error::MisplacedWildcard));
        assert_eq!(check_owner("."), Err(Error::RootNotAllowed));
        assert_eq!(check_owner(""), Err(Error::StrEmpty));
    }
}
