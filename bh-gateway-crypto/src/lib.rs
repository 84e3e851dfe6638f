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

//! This crate provides the cryptographic side of a payment gateway client: the merchant and
//! gateway credentials, signing of outgoing parameter sets and verification of signed gateway
//! responses against a root → middle → leaf certificate chain.
//!
//! # Details
//!
//! - [`CredentialStore`] holds the parsed certificates and keys of one client instance. It is
//!   read-only after construction and can be shared between concurrent requests.
//! - [`sign`] signs a [`ParameterSet`][bh_gateway_params::ParameterSet] with the method named by
//!   its `signMethod` field, returning a new set with the signature injected.
//! - [`validate`] verifies a parsed response. It returns `Ok(false)` for a signature which is
//!   well-formed but does not verify, and an error only when the response lacks the fields needed
//!   to attempt verification.
//!
//! # Examples
//!
//! ```ignore
//! let signed = bh_gateway_crypto::sign(
//!     &params,
//!     store.sign().cert_id(),
//!     Some(store.sign().private_key()),
//!     store.secure_key(),
//! )?;
//!
//! let valid = bh_gateway_crypto::validate(
//!     &response,
//!     store.root().certificate(),
//!     store.middle().certificate(),
//!     store.secure_key(),
//!     bh_gateway_crypto::IdentityCheck::Required { expected: "Expected Signer" },
//! )?;
//! ```

mod chain;
mod credentials;
mod error;
pub mod fields;
mod sign_method;
mod signer;
#[cfg(any(feature = "test-utils", test))]
pub mod test_utils;
mod verifier;

pub use chain::*;
pub use credentials::*;
pub use error::*;
pub use sign_method::*;
pub use signer::*;
pub use verifier::*;
