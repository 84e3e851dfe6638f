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
use bh_gateway_crypto::{
    CredentialRole, CredentialStore, PublicCredential, SignCredential, SignMethod,
};
use bherror::traits::{ErrorContext as _, ForeignError as _, PropagateError as _};
use serde::{Deserialize, Serialize};

use crate::{ClientError, Result};

/// Merchant id the gateway's test environment expects for file transfer operations.
pub const SANDBOX_MERCHANT_ID: &str = "700000000000001";

/// Organization the gateway's production signing certificates are issued to.
pub const DEFAULT_SIGNER_IDENTITY: &str = "中国银联股份有限公司";

const DEFAULT_VERSION: &str = "5.1.0";
const DEFAULT_ENCODING: &str = "UTF-8";
const DEFAULT_ACCESS_TYPE: &str = "0";

/// How the signed parameters are put on the wire.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WireProfile {
    /// Plain `key=value&...` without any escaping.
    #[default]
    Raw,
    /// `application/x-www-form-urlencoded`.
    PercentEncoded,
}

/// Serializable client options, typically read from the application's configuration.
///
/// Certificates are given inline: the signing credential as a base64 encoded PKCS#12 archive
/// with its password, the other certificates as PEM text.
#[derive(Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientOptions {
    /// Default protocol version.
    #[serde(default = "default_version")]
    pub version: String,
    /// Character encoding announced to the gateway.
    #[serde(default = "default_encoding")]
    pub encoding: String,
    /// `signMethod` code used for requests.
    #[serde(default = "default_sign_method")]
    pub sign_method: String,
    /// Access type announced to the gateway.
    #[serde(default = "default_access_type")]
    pub access_type: String,
    /// The merchant id.
    pub mer_id: String,
    /// Whether the client talks to the gateway's test environment.
    #[serde(default)]
    pub test_mode: bool,
    /// Base64 encoded PKCS#12 archive with the merchant's signing key.
    pub sign_cert: String,
    /// Password of [`ClientOptions::sign_cert`].
    pub sign_cert_password: String,
    /// PEM certificate the gateway encrypts sensitive fields with.
    pub encrypt_cert: String,
    /// PEM intermediate certificate of the gateway's signing chain.
    pub middle_cert: String,
    /// PEM root certificate of the gateway's signing chain.
    pub root_cert: String,
    /// Secure key for the secure key sign methods.
    #[serde(default)]
    pub secure_key: Option<String>,
    /// Organization expected in the gateway's signing certificate.
    #[serde(default = "default_signer_identity")]
    pub signer_identity: String,
    /// Wire profile of request bodies.
    #[serde(default)]
    pub wire_profile: WireProfile,
}

impl std::fmt::Debug for ClientOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientOptions")
            .field("version", &self.version)
            .field("encoding", &self.encoding)
            .field("sign_method", &self.sign_method)
            .field("access_type", &self.access_type)
            .field("mer_id", &self.mer_id)
            .field("test_mode", &self.test_mode)
            .field("signer_identity", &self.signer_identity)
            .field("wire_profile", &self.wire_profile)
            .finish_non_exhaustive()
    }
}

fn default_version() -> String {
    DEFAULT_VERSION.to_owned()
}

fn default_encoding() -> String {
    DEFAULT_ENCODING.to_owned()
}

fn default_sign_method() -> String {
    SignMethod::Certificate.to_string()
}

fn default_access_type() -> String {
    DEFAULT_ACCESS_TYPE.to_owned()
}

fn default_signer_identity() -> String {
    DEFAULT_SIGNER_IDENTITY.to_owned()
}

/// The immutable policy shared by every request of a [`GatewayClient`][crate::GatewayClient].
#[derive(Debug, Clone)]
pub struct PolicyConfig {
    /// Default protocol version, overridable per request.
    pub version: String,
    /// Character encoding announced to the gateway.
    pub encoding: String,
    /// Method requests are signed with.
    pub sign_method: SignMethod,
    /// Access type announced to the gateway.
    pub access_type: String,
    /// The merchant id.
    pub merchant_id: String,
    /// Whether the client talks to the gateway's test environment. In test mode responses are
    /// verified without the signer identity check and file transfers use
    /// [`SANDBOX_MERCHANT_ID`].
    pub test_mode: bool,
    /// Organization expected in the gateway's signing certificate.
    pub signer_identity: String,
    /// Wire profile of request bodies.
    pub wire_profile: WireProfile,
    /// Credentials of the merchant and trust anchors of the gateway.
    pub credentials: CredentialStore,
}

impl PolicyConfig {
    /// Create a new [`PolicyConfig`] for `merchant_id` with the default protocol settings.
    pub fn new(merchant_id: impl Into<String>, credentials: CredentialStore) -> Self {
        Self {
            version: default_version(),
            encoding: default_encoding(),
            sign_method: SignMethod::Certificate,
            access_type: default_access_type(),
            merchant_id: merchant_id.into(),
            test_mode: false,
            signer_identity: default_signer_identity(),
            wire_profile: WireProfile::default(),
            credentials,
        }
    }

    /// Builds the policy from [`ClientOptions`], loading all credentials.
    ///
    /// Fails with [`ClientError::InvalidConfiguration`] if a required option is empty, the sign
    /// method is unknown or a credential cannot be loaded.
    pub fn from_options(options: &ClientOptions) -> Result<Self> {
        let merchant_id = required("merId", &options.mer_id)?;

        let sign_method = SignMethod::from_code(&options.sign_method).ok_or_else(|| {
            bherror::Error::root(ClientError::InvalidConfiguration)
                .ctx(format!("unsupported sign method `{}`", options.sign_method))
        })?;

        let archive = base64::engine::general_purpose::STANDARD
            .decode(required("signCert", &options.sign_cert)?)
            .foreign_err(|| ClientError::InvalidConfiguration)
            .ctx(|| "`signCert` is not valid base64")?;
        let sign = SignCredential::from_pkcs12(
            &archive,
            required("signCertPassword", &options.sign_cert_password)?,
        )
        .with_err(|| ClientError::InvalidConfiguration)?;

        let encrypt = public_credential(
            "encryptCert",
            &options.encrypt_cert,
            CredentialRole::Encrypt,
        )?;
        let middle = public_credential("middleCert", &options.middle_cert, CredentialRole::Middle)?;
        let root = public_credential("rootCert", &options.root_cert, CredentialRole::Root)?;

        let mut credentials = CredentialStore::new(sign, encrypt, middle, root);
        if let Some(secure_key) = &options.secure_key {
            credentials = credentials.with_secure_key(secure_key.as_str());
        }

        if !sign_method.uses_certificate() && credentials.secure_key().is_none() {
            return Err(bherror::Error::root(ClientError::InvalidConfiguration)
                .ctx(format!("sign method `{sign_method}` requires a secure key")));
        }

        Ok(Self {
            version: required("version", &options.version)?.to_owned(),
            encoding: options.encoding.clone(),
            sign_method,
            access_type: options.access_type.clone(),
            merchant_id: merchant_id.to_owned(),
            test_mode: options.test_mode,
            signer_identity: options.signer_identity.clone(),
            wire_profile: options.wire_profile,
            credentials,
        })
    }

    /// The merchant id to send for an operation of the given `kind`.
    pub fn merchant_id_for(&self, kind: crate::OperationKind) -> &str {
        match kind {
            crate::OperationKind::FileTransfer if self.test_mode => SANDBOX_MERCHANT_ID,
            _ => self.merchant_id.as_str(),
        }
    }
}

fn required<'a>(name: &'static str, value: &'a str) -> Result<&'a str> {
    if value.is_empty() {
        return Err(bherror::Error::root(ClientError::InvalidConfiguration)
            .ctx(format!("missing `{name}`")));
    }
    Ok(value)
}

fn public_credential(
    name: &'static str,
    pem: &str,
    role: CredentialRole,
) -> Result<PublicCredential> {
    PublicCredential::from_pem(required(name, pem)?.as_bytes(), role)
        .with_err(|| ClientError::InvalidConfiguration)
        .ctx(|| format!("cannot load `{name}`"))
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use bh_gateway_crypto::test_utils::TestPki;
    use serde_json::json;

    use super::*;
    use crate::OperationKind;

    fn pem(certificate: &openssl::x509::X509Ref) -> String {
        String::from_utf8(certificate.to_pem().unwrap()).unwrap()
    }

    fn options(pki: &TestPki) -> ClientOptions {
        serde_json::from_value(json!({
            "merId": "777290058110048",
            "testMode": true,
            "signCert": base64::engine::general_purpose::STANDARD
                .encode(pki.merchant_pkcs12("000000")),
            "signCertPassword": "000000",
            "encryptCert": pem(&pki.encrypt.certificate),
            "middleCert": pem(&pki.middle),
            "rootCert": pem(&pki.root),
        }))
        .unwrap()
    }

    #[test]
    fn options_fall_back_to_defaults() {
        let options = options(TestPki::shared());

        assert_eq!(options.version, "5.1.0");
        assert_eq!(options.encoding, "UTF-8");
        assert_eq!(options.sign_method, "01");
        assert_eq!(options.access_type, "0");
        assert_eq!(options.secure_key, None);
        assert_eq!(options.signer_identity, DEFAULT_SIGNER_IDENTITY);
        assert_eq!(options.wire_profile, WireProfile::Raw);
    }

    #[test]
    fn wire_profile_is_snake_case() {
        let profile: WireProfile = serde_json::from_value(json!("percent_encoded")).unwrap();
        assert_eq!(profile, WireProfile::PercentEncoded);
    }

    #[test]
    fn policy_from_options_loads_credentials() {
        let pki = TestPki::shared();
        let policy = PolicyConfig::from_options(&options(pki)).unwrap();

        assert_eq!(policy.merchant_id, "777290058110048");
        assert_eq!(policy.sign_method, SignMethod::Certificate);
        assert!(policy.test_mode);
        assert_eq!(
            policy.credentials.sign().cert_id(),
            pki.sign_credential().cert_id()
        );
        assert_eq!(policy.credentials.secure_key(), None);
    }

    #[test]
    fn missing_options_are_rejected() {
        let pki = TestPki::shared();

        let mut without_merchant = options(pki);
        without_merchant.mer_id.clear();
        let error = PolicyConfig::from_options(&without_merchant).unwrap_err();
        assert_matches!(error.error, ClientError::InvalidConfiguration);

        let mut without_root = options(pki);
        without_root.root_cert.clear();
        let error = PolicyConfig::from_options(&without_root).unwrap_err();
        assert_matches!(error.error, ClientError::InvalidConfiguration);
    }

    #[test]
    fn unusable_credentials_are_rejected() {
        let pki = TestPki::shared();

        let mut wrong_password = options(pki);
        wrong_password.sign_cert_password = "123456".to_owned();
        let error = PolicyConfig::from_options(&wrong_password).unwrap_err();
        assert_matches!(error.error, ClientError::InvalidConfiguration);

        let mut not_base64 = options(pki);
        not_base64.sign_cert = "%%%".to_owned();
        let error = PolicyConfig::from_options(&not_base64).unwrap_err();
        assert_matches!(error.error, ClientError::InvalidConfiguration);

        let mut garbage_pem = options(pki);
        garbage_pem.middle_cert = "not a certificate".to_owned();
        let error = PolicyConfig::from_options(&garbage_pem).unwrap_err();
        assert_matches!(error.error, ClientError::InvalidConfiguration);
        drop(openssl::error::ErrorStack::get());
    }

    #[test]
    fn secure_key_methods_need_a_secure_key() {
        let pki = TestPki::shared();

        let mut options = options(pki);
        options.sign_method = "11".to_owned();
        let error = PolicyConfig::from_options(&options).unwrap_err();
        assert_matches!(error.error, ClientError::InvalidConfiguration);

        options.secure_key = Some("secret".to_owned());
        let policy = PolicyConfig::from_options(&options).unwrap();
        assert_eq!(policy.sign_method, SignMethod::SecureKeySha256);

        options.sign_method = "07".to_owned();
        let error = PolicyConfig::from_options(&options).unwrap_err();
        assert_matches!(error.error, ClientError::InvalidConfiguration);
    }

    #[test]
    fn file_transfers_use_sandbox_merchant_in_test_mode() {
        let mut policy = PolicyConfig::new("777290058110048", TestPki::shared().credential_store());

        assert_eq!(
            policy.merchant_id_for(OperationKind::FileTransfer),
            "777290058110048"
        );

        policy.test_mode = true;
        assert_eq!(
            policy.merchant_id_for(OperationKind::FileTransfer),
            SANDBOX_MERCHANT_ID
        );
        assert_eq!(
            policy.merchant_id_for(OperationKind::Standard),
            "777290058110048"
        );
    }

    #[test]
    fn debug_omits_secrets() {
        let mut options = options(TestPki::shared());
        options.secure_key = Some("very-secret".to_owned());

        let rendered = format!("{options:?}");
        assert!(!rendered.contains("very-secret"));
        assert!(!rendered.contains("sign_cert_password"));
    }
}
