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

use crate::CredentialRole;

/// Error returned when loading credentials.
#[derive(strum_macros::Display, Debug, PartialEq, Clone)]
pub enum CredentialError {
    /// The key or certificate material of a credential cannot be used.
    #[strum(to_string = "Invalid {0} credential")]
    InvalidCredential(CredentialRole),
    /// The private key does not belong to the certificate.
    #[strum(to_string = "Private key does not match the {0} certificate")]
    KeyMismatch(CredentialRole),
}

impl bherror::BhError for CredentialError {}

/// Error returned by [`CertificateChain`][crate::CertificateChain] methods.
#[derive(strum_macros::Display, Debug, PartialEq, Clone)]
pub enum ChainError {
    /// The chain cannot be constructed or inspected.
    #[strum(to_string = "Invalid certificate chain")]
    InvalidChain,
    /// The chain does not lead to the trusted root certificate.
    #[strum(to_string = "Certificate chain is not trusted")]
    Untrusted,
}

impl bherror::BhError for ChainError {}

/// Error returned by [`sign`][crate::sign].
#[derive(strum_macros::Display, Debug, PartialEq, Clone)]
pub enum SigningError {
    /// A parameter required for signing is missing.
    #[strum(to_string = "Missing `{0}` parameter")]
    MissingParameter(&'static str),
    /// The `signMethod` code is not supported.
    #[strum(to_string = "Unsupported sign method `{0}`")]
    UnsupportedSignMethod(String),
    /// The `version` is not supported by the certificate sign method.
    #[strum(to_string = "Unsupported version `{0}`")]
    UnsupportedVersion(String),
    /// The certificate sign method was requested without a private key.
    #[strum(to_string = "Missing private key")]
    MissingPrivateKey,
    /// A secure key sign method was requested without a secure key.
    #[strum(to_string = "Missing secure key")]
    MissingSecureKey,
    /// The cryptographic backend failed.
    #[strum(to_string = "Crypto backend failed")]
    CryptoBackend,
}

impl bherror::BhError for SigningError {}

/// Error returned by [`validate`][crate::validate] when verification cannot be attempted.
#[derive(strum_macros::Display, Debug, PartialEq, Clone)]
pub enum VerificationError {
    /// A parameter required for verification is missing.
    #[strum(to_string = "Missing `{0}` parameter")]
    MissingParameter(&'static str),
    /// The `signMethod` code is not supported.
    #[strum(to_string = "Unsupported sign method `{0}`")]
    UnsupportedSignMethod(String),
    /// The `version` is not supported by the certificate sign method.
    #[strum(to_string = "Unsupported version `{0}`")]
    UnsupportedVersion(String),
    /// The signer certificate carried by the response cannot be parsed.
    #[strum(to_string = "Invalid signer certificate")]
    InvalidSignerCertificate,
    /// A secure key sign method was used but no secure key is configured.
    #[strum(to_string = "Missing secure key")]
    MissingSecureKey,
    /// The cryptographic backend failed.
    #[strum(to_string = "Crypto backend failed")]
    CryptoBackend,
}

impl bherror::BhError for VerificationError {}
