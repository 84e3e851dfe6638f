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

use std::sync::Arc;

use bh_gateway_crypto::{fields, validate, IdentityCheck};
use bh_gateway_params::{decode, encode, encode_form_urlencoded, ParameterSet};
use bherror::traits::{ErrorContext as _, ForeignError as _, PropagateError as _};
use http::Method;

use crate::{
    render_form, ClientError, FromParameters, GatewayRequest, GatewayResponse, PolicyConfig,
    Result, Transport, WireProfile,
};

const ENCODING: &str = "encoding";
const ACCESS_TYPE: &str = "accessType";
const MERCHANT_ID: &str = "merId";
const ENCRYPT_CERT_ID: &str = "encryptCertId";

/// The stage a request failed in, attached to the error as context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum_macros::Display)]
enum Stage {
    #[strum(to_string = "signing")]
    Signing,
    #[strum(to_string = "encoding request")]
    Encoding,
    #[strum(to_string = "transmitting")]
    Transmitting,
    #[strum(to_string = "parsing response")]
    ParsingResponse,
    #[strum(to_string = "verifying")]
    Verifying,
    #[strum(to_string = "mapping response")]
    Mapping,
}

trait InStage<T> {
    fn in_stage(self, stage: Stage) -> Result<T>;
}

impl<T> InStage<T> for Result<T> {
    fn in_stage(self, stage: Stage) -> Result<T> {
        self.map_err(|error| {
            let error = error.ctx(format!("while {stage}"));
            tracing::warn!(%stage, ?error, "gateway request failed");
            error
        })
    }
}

/// Client signing requests to and verifying responses from the gateway.
///
/// The client holds no mutable state, so one instance (or its clones, which share the policy)
/// can serve any number of concurrent requests.
#[derive(Debug, Clone)]
pub struct GatewayClient<T> {
    policy: Arc<PolicyConfig>,
    transport: T,
}

impl<T: Transport> GatewayClient<T> {
    /// Create a new [`GatewayClient`].
    pub fn new(policy: impl Into<Arc<PolicyConfig>>, transport: T) -> Self {
        Self {
            policy: policy.into(),
            transport,
        }
    }

    /// The policy this client applies to every request.
    pub fn policy(&self) -> &PolicyConfig {
        &self.policy
    }

    /// The transport requests are sent through.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Signs and sends `request`, returning the verified response.
    ///
    /// The response is only returned if its signature verifies against the configured root and
    /// middle certificates. Outside of test mode the signer certificate must additionally be
    /// issued to the configured signer identity.
    ///
    /// # Errors
    ///
    /// The [`ClientError`] kind tells the failing stage apart:
    ///
    /// - [`ClientError::SigningFailure`] if the merged parameters cannot be signed;
    /// - [`ClientError::InvalidParameters`] if the raw wire profile cannot encode them;
    /// - [`ClientError::TransportFailure`] if the transport fails;
    /// - [`ClientError::EmptyResponse`] or [`ClientError::MalformedBody`] if the body is empty or
    ///   cannot be parsed;
    /// - [`ClientError::VerificationInputInvalid`] if the response lacks what is needed to
    ///   verify it, and [`ClientError::VerificationFailed`] if it does not verify;
    /// - [`ClientError::ResponseMapping`] if the fields do not fit `R::Response`.
    pub async fn execute<R: GatewayRequest>(
        &self,
        request: &R,
    ) -> Result<GatewayResponse<R::Response>> {
        let signed = self
            .sign_parameters(&self.build_parameters(request))
            .in_stage(Stage::Signing)?;
        let body = self.encode_body(&signed).in_stage(Stage::Encoding)?;
        let url = request.endpoint().url(self.policy.test_mode);

        tracing::debug!(
            url,
            test_mode = self.policy.test_mode,
            "posting gateway request"
        );

        let raw_body = self
            .transport
            .post(url, body)
            .await
            .foreign_err(|| ClientError::TransportFailure)
            .ctx(|| format!("url: {url}"))
            .in_stage(Stage::Transmitting)?;

        tracing::trace!(%raw_body, "received gateway response");

        let fields = parse_body(&raw_body).in_stage(Stage::ParsingResponse)?;
        self.verify(&fields).in_stage(Stage::Verifying)?;
        let response = R::Response::from_parameters(&fields).in_stage(Stage::Mapping)?;

        Ok(GatewayResponse {
            raw_body,
            fields,
            verified: true,
            response,
        })
    }

    /// Signs `request` for submission by the customer's browser, using the request's
    /// [`preferred_method`][GatewayRequest::preferred_method].
    ///
    /// See [`page_execute_with_method`][Self::page_execute_with_method].
    pub fn page_execute<R: GatewayRequest>(&self, request: &R) -> Result<String> {
        self.page_execute_with_method(request, &request.preferred_method())
    }

    /// Signs `request` for submission by the customer's browser.
    ///
    /// For [`Method::GET`] the signed parameters are appended to the request URL as its query,
    /// joined with `&` if the URL already has one. Any other method yields an auto-submitting
    /// HTML form, see [`render_form`]. Nothing is sent and nothing is verified.
    pub fn page_execute_with_method<R: GatewayRequest>(
        &self,
        request: &R,
        method: &Method,
    ) -> Result<String> {
        let signed = self
            .sign_parameters(&self.build_parameters(request))
            .in_stage(Stage::Signing)?;
        let url = request.endpoint().url(self.policy.test_mode);

        if *method == Method::GET {
            let query = self.encode_body(&signed).in_stage(Stage::Encoding)?;
            let separator = if url.contains('?') { '&' } else { '?' };

            return Ok(format!("{url}{separator}{query}"));
        }

        Ok(render_form(url, &signed, method))
    }

    /// Merges the request parameters with the policy.
    ///
    /// Empty values are dropped. Fields set by the policy replace request parameters of the
    /// same name.
    fn build_parameters<R: GatewayRequest>(&self, request: &R) -> ParameterSet {
        let policy = &self.policy;
        let mut params = ParameterSet::new();

        for (key, value) in request.parameters().iter() {
            params.insert_non_empty(key, value);
        }

        let version = request
            .api_version()
            .filter(|version| !version.is_empty())
            .unwrap_or(policy.version.as_str());
        params.insert_non_empty(fields::VERSION, version);
        params.insert_non_empty(ENCODING, policy.encoding.as_str());
        params.insert_non_empty(fields::SIGN_METHOD, policy.sign_method.to_string());
        params.insert_non_empty(ACCESS_TYPE, policy.access_type.as_str());
        params.insert_non_empty(
            MERCHANT_ID,
            policy.merchant_id_for(request.operation_kind()),
        );

        if request.requires_encrypt_cert_id() {
            params.insert_non_empty(ENCRYPT_CERT_ID, policy.credentials.encrypt().cert_id());
        }

        params
    }

    fn sign_parameters(&self, params: &ParameterSet) -> Result<ParameterSet> {
        let credentials = &self.policy.credentials;

        bh_gateway_crypto::sign(
            params,
            credentials.sign().cert_id(),
            Some(credentials.sign().private_key()),
            credentials.secure_key(),
        )
        .with_err(|| ClientError::SigningFailure)
    }

    fn encode_body(&self, params: &ParameterSet) -> Result<String> {
        match self.policy.wire_profile {
            WireProfile::Raw => encode(params).with_err(|| ClientError::InvalidParameters),
            WireProfile::PercentEncoded => Ok(encode_form_urlencoded(params)),
        }
    }

    fn verify(&self, fields: &ParameterSet) -> Result<()> {
        let policy = &self.policy;
        let credentials = &policy.credentials;

        let identity = if policy.test_mode {
            IdentityCheck::Skipped
        } else {
            IdentityCheck::Required {
                expected: &policy.signer_identity,
            }
        };

        let verified = validate(
            fields,
            credentials.root().certificate(),
            credentials.middle().certificate(),
            credentials.secure_key(),
            identity,
        )
        .with_err(|| ClientError::VerificationInputInvalid)?;

        if !verified {
            return Err(bherror::Error::root(ClientError::VerificationFailed));
        }

        Ok(())
    }
}

fn parse_body(raw_body: &str) -> Result<ParameterSet> {
    if raw_body.is_empty() {
        return Err(bherror::Error::root(ClientError::EmptyResponse));
    }

    decode(raw_body)
        .with_err(|| ClientError::MalformedBody)
        .ctx(|| format!("raw body: {raw_body}"))
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn empty_body_is_not_malformed() {
        let error = parse_body("").unwrap_err();
        assert_matches!(error.error, ClientError::EmptyResponse);

        let error = parse_body("=oops").unwrap_err();
        assert_matches!(error.error, ClientError::MalformedBody);
    }

    #[test]
    fn stage_is_attached_as_context() {
        let result: Result<()> = Err(bherror::Error::root(ClientError::EmptyResponse));

        let error = result.in_stage(Stage::ParsingResponse).unwrap_err();
        assert!(format!("{error:?}").contains("while parsing response"));
    }
}
