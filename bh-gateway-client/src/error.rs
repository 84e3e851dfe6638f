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

/// Error returned by [`GatewayClient`][crate::GatewayClient] and the configuration helpers.
#[derive(strum_macros::Display, Debug, PartialEq, Clone)]
pub enum ClientError {
    /// The merged request parameters could not be signed.
    #[strum(to_string = "Signing failed")]
    SigningFailure,
    /// The transport did not deliver a response body.
    #[strum(to_string = "Transport failed")]
    TransportFailure,
    /// The gateway answered with an empty body.
    #[strum(to_string = "Empty response")]
    EmptyResponse,
    /// The response body is not a valid parameter string.
    #[strum(to_string = "Malformed response body")]
    MalformedBody,
    /// The response signature did not verify.
    #[strum(to_string = "Response verification failed")]
    VerificationFailed,
    /// The response lacks what is needed to attempt verification.
    #[strum(to_string = "Invalid verification input")]
    VerificationInputInvalid,
    /// The request parameters cannot be encoded without ambiguity.
    #[strum(to_string = "Invalid request parameters")]
    InvalidParameters,
    /// The verified response fields do not fit the response type.
    #[strum(to_string = "Response mapping failed")]
    ResponseMapping,
    /// The client options cannot be turned into a policy.
    #[strum(to_string = "Invalid configuration")]
    InvalidConfiguration,
}

impl ClientError {
    /// Returns `true` if repeating the same request may succeed.
    ///
    /// Only transport failures qualify. Every other error is deterministic for a given request
    /// and response.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::TransportFailure)
    }
}

impl bherror::BhError for ClientError {}

/// Result type used by this crate.
pub type Result<T> = bherror::Result<T, ClientError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_transport_failures_are_retryable() {
        let all = [
            ClientError::SigningFailure,
            ClientError::TransportFailure,
            ClientError::EmptyResponse,
            ClientError::MalformedBody,
            ClientError::VerificationFailed,
            ClientError::VerificationInputInvalid,
            ClientError::InvalidParameters,
            ClientError::ResponseMapping,
            ClientError::InvalidConfiguration,
        ];

        let retryable: Vec<_> = all.iter().filter(|error| error.is_retryable()).collect();
        assert_eq!(retryable, [&ClientError::TransportFailure]);
    }
}
