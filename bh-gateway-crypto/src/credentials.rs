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

use bherror::traits::{ErrorContext as _, ForeignError as _};
use openssl::{
    error::ErrorStack,
    pkcs12::Pkcs12,
    pkey::{PKey, PKeyRef, Private},
    x509::{X509Ref, X509},
};

use crate::CredentialError;

type Result<T> = bherror::Result<T, CredentialError>;

const REDACTED: &str = "<redacted>";

/// The role a credential plays for a client instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum_macros::Display)]
pub enum CredentialRole {
    /// The merchant's signing key and certificate.
    #[strum(to_string = "sign")]
    Sign,
    /// The gateway's public encryption certificate.
    #[strum(to_string = "encrypt")]
    Encrypt,
    /// The intermediate certificate of the gateway's signing chain.
    #[strum(to_string = "middle")]
    Middle,
    /// The trusted root certificate of the gateway's signing chain.
    #[strum(to_string = "root")]
    Root,
}

/// The merchant's signing key together with its certificate.
#[derive(Clone)]
pub struct SignCredential {
    cert_id: String,
    certificate: X509,
    private_key: PKey<Private>,
}

impl SignCredential {
    /// Create a new [`SignCredential`], checking that `private_key` belongs to `certificate`.
    pub fn new(private_key: PKey<Private>, certificate: X509) -> Result<Self> {
        let public_key = certificate
            .public_key()
            .foreign_err(|| CredentialError::InvalidCredential(CredentialRole::Sign))?;

        if !public_key.public_eq(&private_key) {
            return Err(bherror::Error::root(CredentialError::KeyMismatch(CredentialRole::Sign)));
        }

        let cert_id = certificate_id(&certificate)
            .foreign_err(|| CredentialError::InvalidCredential(CredentialRole::Sign))?;

        Ok(Self {
            cert_id,
            certificate,
            private_key,
        })
    }

    /// Loads the credential from a DER encoded PKCS#12 archive protected by `password`.
    ///
    /// The archive must contain both the private key and its certificate.
    pub fn from_pkcs12(der: &[u8], password: &str) -> Result<Self> {
        let invalid = || CredentialError::InvalidCredential(CredentialRole::Sign);

        let parsed = Pkcs12::from_der(der)
            .and_then(|archive| archive.parse2(password))
            .foreign_err(invalid)
            .ctx(|| "unable to open the PKCS#12 archive")?;

        let private_key = parsed
            .pkey
            .ok_or_else(|| bherror::Error::root(invalid()).ctx("archive has no private key"))?;
        let certificate = parsed
            .cert
            .ok_or_else(|| bherror::Error::root(invalid()).ctx("archive has no certificate"))?;

        Self::new(private_key, certificate)
    }

    /// Loads the credential from a PEM encoded private key and certificate.
    pub fn from_pem(private_key_pem: &[u8], certificate_pem: &[u8]) -> Result<Self> {
        let invalid = || CredentialError::InvalidCredential(CredentialRole::Sign);

        let private_key = PKey::private_key_from_pem(private_key_pem).foreign_err(invalid)?;
        let certificate = X509::from_pem(certificate_pem).foreign_err(invalid)?;

        Self::new(private_key, certificate)
    }

    /// The id of the signing certificate, i.e. its serial number in decimal.
    pub fn cert_id(&self) -> &str {
        &self.cert_id
    }

    /// The signing certificate.
    pub fn certificate(&self) -> &X509Ref {
        &self.certificate
    }

    /// The signing key.
    pub fn private_key(&self) -> &PKeyRef<Private> {
        &self.private_key
    }
}

impl std::fmt::Debug for SignCredential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignCredential")
            .field("cert_id", &self.cert_id)
            .field("private_key", &REDACTED)
            .finish_non_exhaustive()
    }
}

/// A certificate without a private key, e.g. the gateway's encryption or chain certificates.
#[derive(Clone, Debug)]
pub struct PublicCredential {
    cert_id: String,
    certificate: X509,
}

impl PublicCredential {
    /// Create a new [`PublicCredential`] playing the given `role`.
    pub fn new(certificate: X509, role: CredentialRole) -> Result<Self> {
        let cert_id =
            certificate_id(&certificate).foreign_err(|| CredentialError::InvalidCredential(role))?;

        Ok(Self {
            cert_id,
            certificate,
        })
    }

    /// Loads the certificate from PEM.
    pub fn from_pem(pem: &[u8], role: CredentialRole) -> Result<Self> {
        let certificate =
            X509::from_pem(pem).foreign_err(|| CredentialError::InvalidCredential(role))?;
        Self::new(certificate, role)
    }

    /// Loads the certificate from DER.
    pub fn from_der(der: &[u8], role: CredentialRole) -> Result<Self> {
        let certificate =
            X509::from_der(der).foreign_err(|| CredentialError::InvalidCredential(role))?;
        Self::new(certificate, role)
    }

    /// The id of the certificate, i.e. its serial number in decimal.
    pub fn cert_id(&self) -> &str {
        &self.cert_id
    }

    /// The certificate.
    pub fn certificate(&self) -> &X509Ref {
        &self.certificate
    }
}

/// All credentials of one client instance.
///
/// The store is immutable once constructed, so a single instance may back any number of
/// concurrent requests.
#[derive(Clone)]
pub struct CredentialStore {
    sign: SignCredential,
    encrypt: PublicCredential,
    middle: PublicCredential,
    root: PublicCredential,
    secure_key: Option<String>,
}

impl CredentialStore {
    /// Create a new [`CredentialStore`] without a secure key.
    pub fn new(
        sign: SignCredential,
        encrypt: PublicCredential,
        middle: PublicCredential,
        root: PublicCredential,
    ) -> Self {
        Self {
            sign,
            encrypt,
            middle,
            root,
            secure_key: None,
        }
    }

    /// Sets the secure key used by the secure key sign methods. An empty key is treated as
    /// absent.
    pub fn with_secure_key(mut self, secure_key: impl Into<String>) -> Self {
        let secure_key = secure_key.into();
        self.secure_key = (!secure_key.is_empty()).then_some(secure_key);
        self
    }

    /// The merchant's signing credential.
    pub fn sign(&self) -> &SignCredential {
        &self.sign
    }

    /// The gateway's encryption certificate.
    pub fn encrypt(&self) -> &PublicCredential {
        &self.encrypt
    }

    /// The intermediate certificate of the gateway's signing chain.
    pub fn middle(&self) -> &PublicCredential {
        &self.middle
    }

    /// The trusted root certificate of the gateway's signing chain.
    pub fn root(&self) -> &PublicCredential {
        &self.root
    }

    /// The secure key, if configured.
    pub fn secure_key(&self) -> Option<&str> {
        self.secure_key.as_deref()
    }
}

impl std::fmt::Debug for CredentialStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialStore")
            .field("sign", &self.sign)
            .field("encrypt", &self.encrypt.cert_id)
            .field("middle", &self.middle.cert_id)
            .field("root", &self.root.cert_id)
            .field("secure_key", &self.secure_key.as_ref().map(|_| REDACTED))
            .finish()
    }
}

fn certificate_id(certificate: &X509Ref) -> std::result::Result<String, ErrorStack> {
    Ok(certificate.serial_number().to_bn()?.to_dec_str()?.to_string())
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;
    use crate::test_utils::TestPki;

    #[test]
    fn loads_sign_credential_from_pkcs12() {
        let pki = TestPki::shared();
        let archive = pki.merchant_pkcs12("000000");

        let credential = SignCredential::from_pkcs12(&archive, "000000").unwrap();

        let expected_id = pki
            .merchant
            .certificate
            .serial_number()
            .to_bn()
            .unwrap()
            .to_dec_str()
            .unwrap()
            .to_string();
        assert_eq!(credential.cert_id(), expected_id);
        assert!(credential.cert_id().bytes().all(|b| b.is_ascii_digit()));
    }

    #[test]
    fn rejects_pkcs12_with_wrong_password() {
        let pki = TestPki::shared();
        let archive = pki.merchant_pkcs12("000000");

        let error = SignCredential::from_pkcs12(&archive, "wrong").unwrap_err();
        assert_matches!(
            error.error,
            CredentialError::InvalidCredential(CredentialRole::Sign)
        );
        drop(ErrorStack::get());
    }

    #[test]
    fn rejects_key_of_another_certificate() {
        let pki = TestPki::shared();

        let error = SignCredential::new(
            pki.gateway.private_key.clone(),
            pki.merchant.certificate.clone(),
        )
        .unwrap_err();
        assert_matches!(
            error.error,
            CredentialError::KeyMismatch(CredentialRole::Sign)
        );
    }

    #[test]
    fn loads_public_credential_from_pem_and_der() {
        let pki = TestPki::shared();

        let pem = pki.encrypt.certificate.to_pem().unwrap();
        let der = pki.encrypt.certificate.to_der().unwrap();

        let from_pem = PublicCredential::from_pem(&pem, CredentialRole::Encrypt).unwrap();
        let from_der = PublicCredential::from_der(&der, CredentialRole::Encrypt).unwrap();
        assert_eq!(from_pem.cert_id(), from_der.cert_id());

        let error = PublicCredential::from_pem(b"garbage", CredentialRole::Root).unwrap_err();
        assert_matches!(
            error.error,
            CredentialError::InvalidCredential(CredentialRole::Root)
        );
        drop(ErrorStack::get());
    }

    #[test]
    fn empty_secure_key_is_absent() {
        let store = TestPki::shared().credential_store().with_secure_key("");
        assert_eq!(store.secure_key(), None);

        let store = store.with_secure_key("secret");
        assert_eq!(store.secure_key(), Some("secret"));
    }

    #[test]
    fn debug_redacts_secrets() {
        let store = TestPki::shared()
            .credential_store()
            .with_secure_key("very-secret");

        let rendered = format!("{store:?}");
        assert!(!rendered.contains("very-secret"));
        assert!(rendered.contains("<redacted>"));
    }
}
