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

use bh_gateway_params::ParameterSet;
use http::Method;

use crate::FromParameters;

/// The kind of operation a request performs, as far as the client's policy is concerned.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OperationKind {
    /// Any regular transaction or query.
    #[default]
    Standard,
    /// Reconciliation file download, which the test environment only serves to
    /// [`SANDBOX_MERCHANT_ID`][crate::SANDBOX_MERCHANT_ID].
    FileTransfer,
}

/// The pair of URLs an operation is served at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Endpoint<'a> {
    /// URL of the gateway's test environment.
    pub test: &'a str,
    /// URL of the gateway's production environment.
    pub production: &'a str,
}

impl<'a> Endpoint<'a> {
    /// Create a new [`Endpoint`].
    pub const fn new(test: &'a str, production: &'a str) -> Self {
        Self { test, production }
    }

    /// The URL to use in test or production mode.
    pub fn url(&self, test_mode: bool) -> &'a str {
        if test_mode {
            self.test
        } else {
            self.production
        }
    }
}

/// A request the [`GatewayClient`][crate::GatewayClient] can sign and send.
///
/// Implementations only describe the request; everything shared between requests comes from
/// the client's [`PolicyConfig`][crate::PolicyConfig].
pub trait GatewayRequest {
    /// The typed response built from the verified response fields.
    type Response: FromParameters;

    /// Operation specific parameters. Parameters with empty values are not sent.
    fn parameters(&self) -> ParameterSet;

    /// The URLs the request is sent to.
    fn endpoint(&self) -> Endpoint<'_>;

    /// Protocol version to use instead of the policy default.
    fn api_version(&self) -> Option<&str> {
        None
    }

    /// Whether the id of the gateway's encryption certificate must be sent as `encryptCertId`.
    fn requires_encrypt_cert_id(&self) -> bool {
        false
    }

    /// See [`OperationKind`].
    fn operation_kind(&self) -> OperationKind {
        OperationKind::Standard
    }

    /// HTTP method to use when the request is completed by a browser, see
    /// [`GatewayClient::page_execute`][crate::GatewayClient::page_execute].
    fn preferred_method(&self) -> Method {
        Method::POST
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_selects_url_by_mode() {
        let endpoint = Endpoint::new(
            "https://gateway.test.example/query",
            "https://gateway.example/query",
        );

        assert_eq!(endpoint.url(true), "https://gateway.test.example/query");
        assert_eq!(endpoint.url(false), "https://gateway.example/query");
    }
}
