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

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

//! This crate provides the parameter set and the wire codec used when talking to payment gateways
//! which exchange signed, form-shaped `key=value&...` messages.
//!
//! # Details
//!
//! The primary type is [`ParameterSet`], an insertion-ordered string map with unique keys.
//!
//! The [`codec`] functions turn a [`ParameterSet`] into the wire string and back:
//!
//! - [`encode`] joins the parameters in insertion order, without percent-encoding;
//! - [`canonical_payload`] joins them in ascending key order, leaving out the excluded keys. This
//!   is the exact byte input of signing and verification;
//! - [`encode_form_urlencoded`] is the percent-encoded variant for wire profiles that need it;
//! - [`decode`] parses a raw gateway response. Unlike a standard query-string decoder it keeps
//!   `{...}` and `[...]` sub-values intact, even when they contain unescaped `&`.
//!
//! # Examples
//!
//! ```
//! use bh_gateway_params::{decode, encode, ParameterSet};
//!
//! let mut params = ParameterSet::new();
//! params.insert("txnAmt", "100");
//! params.insert("currencyCode", "156");
//!
//! let query = encode(&params).unwrap();
//! assert_eq!(query, "txnAmt=100&currencyCode=156");
//!
//! let parsed = decode("respCode=00&reserved={a=1&b=2}").unwrap();
//! assert_eq!(parsed.get("reserved"), Some("{a=1&b=2}"));
//! ```

pub mod codec;
mod error;
mod parameters;

pub use codec::{canonical_payload, decode, encode, encode_form_urlencoded};
pub use error::*;
pub use parameters::*;
