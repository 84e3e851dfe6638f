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

//! This crate provides a client for payment gateways which exchange signed, form-shaped
//! parameter sets over HTTP.
//!
//! # Details
//!
//! A [`GatewayClient`] combines an immutable [`PolicyConfig`] with a [`Transport`]. For every
//! [`GatewayRequest`] it
//!
//! 1. merges the request parameters with the policy defaults (version, encoding, sign method,
//!    access type, merchant id and optionally the encryption certificate id),
//! 2. signs the result with the merchant's credential,
//! 3. posts the encoded parameters to the request's test or production URL,
//! 4. parses the nested-value-aware response body,
//! 5. verifies the response signature against the configured root and middle certificates,
//! 6. and maps the verified fields into the request's [`FromParameters`] response type.
//!
//! Requests that have to be completed by the customer's browser go through
//! [`GatewayClient::page_execute`] instead, which stops after signing and returns either a GET
//! URL or an auto-submitting HTML form (see [`render_form`]).
//!
//! # Examples
//!
//! ```ignore
//! let options: ClientOptions = serde_json::from_str(&config)?;
//! let policy = PolicyConfig::from_options(&options)?;
//! let client = GatewayClient::new(policy, ReqwestTransport::new(reqwest::Client::new()));
//!
//! let response = client.execute(&trade_query).await?;
//! println!("{}", response.response.resp_code);
//! ```

mod config;
mod error;
mod executor;
mod form;
mod request;
mod response;
mod transport;

pub use bh_gateway_crypto::{CredentialStore, SignMethod};
pub use bh_gateway_params::ParameterSet;
pub use config::*;
pub use error::*;
pub use executor::*;
pub use form::*;
pub use request::*;
pub use response::*;
pub use transport::*;
