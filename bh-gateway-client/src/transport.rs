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

use std::future::Future;

use reqwest::{header::CONTENT_TYPE, Client, ClientBuilder};

/// Content type of request bodies sent by [`ReqwestTransport`].
pub const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded;charset=UTF-8";

/// Interface providing the functionality of posting an encoded parameter set.
///
/// Implementations own timeouts, TLS and connection pooling. The client never retries; see
/// [`ClientError::is_retryable`][crate::ClientError::is_retryable].
pub trait Transport: Sync {
    /// Error type used by this trait.
    type Err: std::error::Error + Send + Sync + 'static;

    /// Posts `body` to `url` and returns the response body. Non-success statuses are errors.
    fn post(
        &self,
        url: &str,
        body: String,
    ) -> impl Future<Output = std::result::Result<String, Self::Err>> + Send;
}

/// [`Transport`] implementation using the [`reqwest`] crate.
///
/// Bodies are declared as [`FORM_CONTENT_TYPE`] but sent exactly as the client encoded them.
/// With the default [`WireProfile::Raw`][crate::WireProfile::Raw] values such as base64
/// signatures are not percent-encoded, and a server that form-decodes the body would read `+`
/// as a space. Use [`WireProfile::PercentEncoded`][crate::WireProfile::PercentEncoded] for such
/// gateways.
#[derive(Debug, Clone, Default)]
pub struct ReqwestTransport(Client);

impl ReqwestTransport {
    /// Construct [`ReqwestTransport`] from [`Client`].
    pub fn new(client: Client) -> Self {
        Self(client)
    }

    /// Construct [`ReqwestTransport`] from [`ClientBuilder`].
    pub fn from_builder(builder: ClientBuilder) -> reqwest::Result<Self> {
        Ok(Self(builder.build()?))
    }
}

impl Transport for ReqwestTransport {
    type Err = reqwest::Error;

    async fn post(&self, url: &str, body: String) -> reqwest::Result<String> {
        self.0
            .post(url)
            .header(CONTENT_TYPE, FORM_CONTENT_TYPE)
            .body(body)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await
    }
}
