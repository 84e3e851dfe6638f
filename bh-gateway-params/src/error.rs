// Copyright (C) 2020-2025  The Blockhouse Technology Limited (TBTL).
//
// This program is free software: you can redistribute it and/or modify it
// under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or (at your
// option) any later version.
//
// This program is distributed in the hope that it will be useful, but
// WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.  See the GNU Affero General Public
// License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.

/// Error returned by the codec functions.
#[derive(strum_macros::Display, Debug, PartialEq, Clone)]
pub enum Error {
    /// The raw body cannot be split into key/value pairs, e.g. it yields an empty key.
    #[strum(to_string = "Malformed parameter body")]
    MalformedBody,
    /// The parameter cannot be written to the wire without changing how it decodes.
    #[strum(to_string = "Ambiguous parameter `{0}`")]
    AmbiguousParameter(String),
}

impl bherror::BhError for Error {}

/// The [`bherror::Result`] type with the error type of this crate.
pub type Result<T> = bherror::Result<T, Error>;
