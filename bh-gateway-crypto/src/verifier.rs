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

use base64::Engine as _;
use bh_gateway_params::{canonical_payload, ParameterSet};
use bherror::traits::{ForeignError as _, PropagateError as _};
use openssl::{
    hash::MessageDigest,
    pkey::{PKeyRef, Public},
    x509::X509Ref,
};

use crate::{
    chain::clean_up_after_openssl, fields, is_supported_version, sign_method::certificate_digest,
    sign_method::secure_key_digest, CertificateChain, SignMethod, VerificationError,
};

type Result<T> = bherror::Result<T, VerificationError>;

/// Whether [`validate`] compares the identity embedded in the signer certificate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentityCheck<'a> {
    /// The organization segment of the signer's common name must equal `expected`.
    Required {
        /// The expected organization.
        expected: &'a str,
    },
    /// The identity is not checked, e.g. against test environments whose certificates carry
    /// placeholder identities. The chain and signature are still verified.
    Skipped,
}

/// Verifies the signature of a gateway response.
///
/// Returns `Ok(true)` only when the signature covers exactly the received parameters and, for
/// the certificate method, the signer certificate chains to `root` through `middle` and passes
/// the `identity` check. A signature that is well-formed but does not verify, an untrusted
/// chain and an identity mismatch all yield `Ok(false)`.
///
/// # Errors
///
/// Returns an error only when verification cannot be attempted: a required field (`signature`,
/// `signMethod`, and for the certificate method `version` and `signPubKeyCert`) is missing, the
/// method or version has no verification profile, the signer certificate is unparsable, or a
/// secure key method is used without a secure key.
pub fn validate(
    params: &ParameterSet,
    root: &X509Ref,
    middle: &X509Ref,
    secure_key: Option<&str>,
    identity: IdentityCheck<'_>,
) -> Result<bool> {
    let signature = required(params, fields::SIGNATURE)?;
    let code = required(params, fields::SIGN_METHOD)?;
    let method = SignMethod::from_code(code).ok_or_else(|| {
        bherror::Error::root(VerificationError::UnsupportedSignMethod(code.into()))
    })?;

    let payload = canonical_payload(params, &[fields::SIGNATURE]);

    match method {
        SignMethod::Certificate => {
            let version = required(params, fields::VERSION)?;
            if !is_supported_version(version) {
                return Err(bherror::Error::root(VerificationError::UnsupportedVersion(
                    version.into(),
                )));
            }
            let leaf_pem = required(params, fields::SIGN_PUB_KEY_CERT)?;
            let chain = CertificateChain::from_leaf_pem(leaf_pem.as_bytes(), middle)
                .with_err(|| VerificationError::InvalidSignerCertificate)?;

            if let Err(error) = chain.verify_against_root(root) {
                tracing::warn!(?error, "signer certificate chain rejected");
                return Ok(false);
            }

            if let IdentityCheck::Required { expected } = identity {
                let actual = chain.leaf_identity();
                if actual.as_deref() != Some(expected) {
                    tracing::warn!(?actual, expected, "signer identity mismatch");
                    return Ok(false);
                }
            }

            let public_key = chain
                .leaf_public_key()
                .with_err(|| VerificationError::InvalidSignerCertificate)?;
            verify_certificate_signature(&payload, signature, &public_key)
        }
        SignMethod::SecureKeySha256 | SignMethod::SecureKeySm3 => {
            let secure_key = secure_key
                .filter(|key| !key.is_empty())
                .ok_or_else(|| bherror::Error::root(VerificationError::MissingSecureKey))?;

            let expected = secure_key_digest(method, &payload, secure_key)
                .foreign_err(|| VerificationError::CryptoBackend)?;

            let is_valid = expected.len() == signature.len()
                && openssl::memcmp::eq(expected.as_bytes(), signature.as_bytes());
            if !is_valid {
                tracing::warn!(%method, "secure key signature mismatch");
            }

            Ok(is_valid)
        }
    }
}

fn required<'a>(params: &'a ParameterSet, name: &'static str) -> Result<&'a str> {
    params
        .get(name)
        .filter(|value| !value.is_empty())
        .ok_or_else(|| bherror::Error::root(VerificationError::MissingParameter(name)))
}

fn verify_certificate_signature(
    payload: &str,
    signature: &str,
    public_key: &PKeyRef<Public>,
) -> Result<bool> {
    let Ok(signature) = base64::engine::general_purpose::STANDARD.decode(signature) else {
        tracing::warn!("signature is not valid base64");
        return Ok(false);
    };

    let digest = certificate_digest(payload).foreign_err(|| VerificationError::CryptoBackend)?;

    let mut verifier = openssl::sign::Verifier::new(MessageDigest::sha256(), public_key)
        .foreign_err(|| VerificationError::CryptoBackend)?;
    verifier
        .update(digest.as_bytes())
        .foreign_err(|| VerificationError::CryptoBackend)?;

    match clean_up_after_openssl(|| verifier.verify(&signature)) {
        Ok(true) => Ok(true),
        Ok(false) => {
            tracing::warn!("signature does not verify");
            Ok(false)
        }
        Err(error) => {
            tracing::warn!(%error, "signature cannot be verified");
            Ok(false)
        }
    }
}
