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
use bherror::traits::{ErrorContext as _, ForeignError as _};
use openssl::{
    hash::MessageDigest,
    pkey::{PKeyRef, Private},
};

use crate::{
    fields, is_supported_version, sign_method::certificate_digest, sign_method::secure_key_digest,
    SignMethod, SigningError,
};

type Result<T> = bherror::Result<T, SigningError>;

/// Signs `params` with the method named by their `signMethod` field.
///
/// Returns a new [`ParameterSet`] containing every input parameter plus the `signature`.
/// The certificate method also injects `certId` and signs it along with the rest. A `signature`
/// already present in `params` is replaced.
///
/// The payload is the canonical sorted `key=value` form of the parameters, so the result is
/// deterministic for deterministic signing keys.
///
/// # Errors
///
/// - [`SigningError::MissingParameter`] if `signMethod`, or `version` for the certificate method,
///   is absent;
/// - [`SigningError::UnsupportedSignMethod`] or [`SigningError::UnsupportedVersion`] for codes
///   without a signing profile;
/// - [`SigningError::MissingPrivateKey`] or [`SigningError::MissingSecureKey`] when the key
///   material required by the method is not supplied.
pub fn sign(
    params: &ParameterSet,
    cert_id: &str,
    private_key: Option<&PKeyRef<Private>>,
    secure_key: Option<&str>,
) -> Result<ParameterSet> {
    let code = required(params, fields::SIGN_METHOD)?;
    let method = SignMethod::from_code(code)
        .ok_or_else(|| bherror::Error::root(SigningError::UnsupportedSignMethod(code.into())))?;

    let mut signed = params.clone();
    if signed.remove(fields::SIGNATURE).is_some() {
        tracing::debug!("replacing a stale signature before signing");
    }

    let signature = match method {
        SignMethod::Certificate => {
            let version = required(params, fields::VERSION)?;
            if !is_supported_version(version) {
                return Err(bherror::Error::root(SigningError::UnsupportedVersion(version.into())));
            }
            let private_key =
                private_key.ok_or_else(|| bherror::Error::root(SigningError::MissingPrivateKey))?;

            signed.insert(fields::CERT_ID, cert_id);
            let payload = canonical_payload(&signed, &[fields::SIGNATURE]);
            certificate_signature(&payload, private_key)?
        }
        SignMethod::SecureKeySha256 | SignMethod::SecureKeySm3 => {
            let secure_key = secure_key
                .filter(|key| !key.is_empty())
                .ok_or_else(|| bherror::Error::root(SigningError::MissingSecureKey))?;

            let payload = canonical_payload(&signed, &[fields::SIGNATURE]);
            secure_key_digest(method, &payload, secure_key)
                .foreign_err(|| SigningError::CryptoBackend)?
        }
    };

    tracing::debug!(%method, "signed parameter set");

    signed.insert(fields::SIGNATURE, signature);
    Ok(signed)
}

fn required<'a>(params: &'a ParameterSet, name: &'static str) -> Result<&'a str> {
    params
        .get(name)
        .filter(|value| !value.is_empty())
        .ok_or_else(|| bherror::Error::root(SigningError::MissingParameter(name)))
}

fn certificate_signature(payload: &str, private_key: &PKeyRef<Private>) -> Result<String> {
    let digest = certificate_digest(payload).foreign_err(|| SigningError::CryptoBackend)?;

    let mut signer = openssl::sign::Signer::new(MessageDigest::sha256(), private_key)
        .foreign_err(|| SigningError::CryptoBackend)?;
    signer
        .update(digest.as_bytes())
        .foreign_err(|| SigningError::CryptoBackend)?;
    let signature = signer
        .sign_to_vec()
        .foreign_err(|| SigningError::CryptoBackend)
        .ctx(|| "unable to sign the payload digest")?;

    Ok(base64::engine::general_purpose::STANDARD.encode(signature))
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use base64::engine::general_purpose::STANDARD;

    use super::*;
    use crate::test_utils::TestPki;

    fn request() -> ParameterSet {
        [
            ("version", "5.1.0"),
            ("encoding", "UTF-8"),
            ("signMethod", "01"),
            ("txnType", "01"),
            ("merId", "777290058110048"),
            ("orderId", "20240101000001"),
            ("txnAmt", "100"),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn certificate_method_injects_cert_id_and_signature() {
        let credential = TestPki::shared().sign_credential();
        let key = Some(credential.private_key());

        let signed = sign(&request(), credential.cert_id(), key, None).unwrap();

        assert_eq!(signed.get(fields::CERT_ID), Some(credential.cert_id()));
        let signature = signed.get(fields::SIGNATURE).unwrap();
        assert!(STANDARD.decode(signature).is_ok());
        for (key, value) in request().iter() {
            assert_eq!(signed.get(key), Some(value));
        }
    }

    #[test]
    fn signed_query_string_is_byte_identical_across_runs() {
        let credential = TestPki::shared().sign_credential();

        for (method, private_key, secure_key) in [
            ("01", Some(credential.private_key()), None),
            ("11", None, Some("88888888")),
            ("12", None, Some("88888888")),
        ] {
            let mut params = request();
            params.insert(fields::SIGN_METHOD, method);
            let encode_signed = || {
                let signed = sign(&params, credential.cert_id(), private_key, secure_key).unwrap();
                bh_gateway_params::encode(&signed).unwrap()
            };

            let first = encode_signed();
            assert_eq!(first, encode_signed(), "signMethod {method}");
            assert!(first.starts_with("version=5.1.0&"), "signMethod {method}");
            assert!(first.contains("&signature="), "signMethod {method}");
        }
    }

    #[test]
    fn stale_signature_is_replaced() {
        let credential = TestPki::shared().sign_credential();
        let key = Some(credential.private_key());
        let mut stale = request();
        stale.insert(fields::SIGNATURE, "stale");

        let from_stale = sign(&stale, credential.cert_id(), key, None).unwrap();
        let fresh = sign(&request(), credential.cert_id(), key, None).unwrap();

        assert_eq!(
            from_stale.get(fields::SIGNATURE),
            fresh.get(fields::SIGNATURE)
        );
    }

    #[test]
    fn secure_key_methods_sign_without_cert_id() {
        let mut params = request();
        params.insert(fields::SIGN_METHOD, "11");

        let sha256 = sign(&params, "ignored", None, Some("secret")).unwrap();
        assert_eq!(sha256.get(fields::CERT_ID), None);
        assert_eq!(sha256.get(fields::SIGNATURE).unwrap().len(), 64);

        params.insert(fields::SIGN_METHOD, "12");
        let sm3 = sign(&params, "ignored", None, Some("secret")).unwrap();
        assert_ne!(sha256.get(fields::SIGNATURE), sm3.get(fields::SIGNATURE));
    }

    #[test]
    fn missing_key_material_is_rejected() {
        let error = sign(&request(), "1", None, Some("secret")).unwrap_err();
        assert_matches!(error.error, SigningError::MissingPrivateKey);

        let mut params = request();
        params.insert(fields::SIGN_METHOD, "11");
        let error = sign(&params, "1", None, Some("")).unwrap_err();
        assert_matches!(error.error, SigningError::MissingSecureKey);
    }

    #[test]
    fn unsupported_profiles_are_rejected() {
        let credential = TestPki::shared().sign_credential();
        let key = Some(credential.private_key());

        let mut params = request();
        params.insert(fields::SIGN_METHOD, "99");
        let error = sign(&params, "1", key, None).unwrap_err();
        assert_matches!(error.error, SigningError::UnsupportedSignMethod(code) if code == "99");

        let mut params = request();
        params.insert(fields::VERSION, "5.0.0");
        let error = sign(&params, "1", key, None).unwrap_err();
        assert_matches!(error.error, SigningError::UnsupportedVersion(_));

        let mut params = request();
        params.remove(fields::SIGN_METHOD);
        let error = sign(&params, "1", key, None).unwrap_err();
        assert_matches!(error.error, SigningError::MissingParameter("signMethod"));
    }
}
