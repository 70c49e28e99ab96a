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

//! Implementation of the [`Error`] type for name-related errors.

use std::fmt;

/// An error type used to report problems with the textual form of a
/// domain name.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Error {
    /// A label was empty (e.g., `example..com` or a leading dot).
    EmptyLabel,

    /// A character other than a letter, digit, hyphen, or underscore
    /// was found in a label.
    InvalidCharacter(char),

    /// A label was longer than 63 octets.
    LabelTooLong,

    /// A `*` appeared somewhere other than as the entire leftmost
    /// label, or in a context where wildcards are not permitted.
    MisplacedWildcard,

    /// The name is longer than 253 characters (not counting the
    /// trailing dot).
    NameTooLong,

    /// The name was required to be fully qualified (i.e., to end with
    /// a dot), but it did not.
    NotFullyQualified,

    /// The name was the root, which is not permitted in this context.
    RootNotAllowed,

    /// The string was empty.
    StrEmpty,

    /// The string was not strictly ASCII.
    StrNotAscii,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Self::EmptyLabel => f.write_str("name contains an empty label"),
            Self::InvalidCharacter(c) => write!(f, "invalid character {:?} in label", c),
            Self::LabelTooLong => f.write_str("label is longer than 63 characters"),
            Self::MisplacedWildcard => f.write_str("wildcard label is not permitted here"),
            Self::NameTooLong => f.write_str("name is longer than 253 characters"),
            Self::NotFullyQualified => {
                f.write_str("name is not fully qualified (it must end with a dot)")
            }
            Self::RootNotAllowed => f.write_str("the root name is not permitted here"),
            Self::StrEmpty => f.write_str("string was empty"),
            Self::StrNotAscii => f.write_str("string was not ASCII"),
        }
    }
}

impl std::error::Error for Error {}
