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

//! Provides the [`RecordType`] enumeration of supported RR types.

use std::fmt;
use std::str::FromStr;

use crate::util::Caseless;

/// The RR types that may appear in a zone description.
///
/// This is a closed set: a zone description naming any
/// other type is rejected by the validator. The [`FromStr`]
/// implementation is ASCII-case-insensitive, and the
/// [`Display`](fmt::Display) implementation produces the mnemonic used
/// in zone files.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, PartialOrd, Ord)]
pub enum RecordType {
    A,
    Aaaa,
    Cname,
    Mx,
    Txt,
    Ns,
    Ptr,
    Srv,
    Caa,
}

impl RecordType {
    const ALL: [Self; 9] = [
        Self::A,
        Self::Aaaa,
        Self::Cname,
        Self::Mx,
        Self::Txt,
        Self::Ns,
        Self::Ptr,
        Self::Srv,
        Self::Caa,
    ];

    /// Returns the type's mnemonic, as used in zone files.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::A => "A",
            Self::Aaaa => "AAAA",
            Self::Cname => "CNAME",
            Self::Mx => "MX",
            Self::Txt => "TXT",
            Self::Ns => "NS",
            Self::Ptr => "PTR",
            Self::Srv => "SRV",
            Self::Caa => "CAA",
        }
    }

    /// Returns whether records of this type take a priority (the
    /// `priority` field of a record description).
    pub fn takes_priority(self) -> bool {
        matches!(self, Self::Mx | Self::Srv)
    }
}

impl FromStr for RecordType {
    type Err = &'static str;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|t| Caseless(t.as_str()) == Caseless(text))
            .ok_or("unsupported record type")
    }
}

impl fmt::Display for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

////////////////////////////////////////////////////////////////////////
// TESTS                                                              //
////////////////////////////////////////////////////////////////////////
