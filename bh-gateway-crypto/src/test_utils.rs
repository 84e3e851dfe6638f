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

//! Utilities for testing against a throwaway gateway PKI.
//!
//! Do **NOT** use any of this in production. Everything here panics on failure and the keys are
//! generated with default parameters and no protection.

use std::sync::OnceLock;

use bh_gateway_params::ParameterSet;
use openssl::{
    asn1::Asn1Time,
    bn::{BigNum, MsbOption},
    hash::MessageDigest,
    pkcs12::Pkcs12,
    pkey::{PKey, Private},
    rsa::Rsa,
    x509::{
        extension::{AuthorityKeyIdentifier, BasicConstraints, KeyUsage, SubjectKeyIdentifier},
        X509NameBuilder, X509,
    },
};

use crate::{fields, sign, CredentialRole, CredentialStore, PublicCredential, SignCredential};

/// Organization embedded in the common name of [`TestPki::gateway`].
pub const GATEWAY_IDENTITY: &str = "中国银联股份有限公司";

/// Common name of [`TestPki::gateway`], in the `code@code@organization@serial` layout.
pub const GATEWAY_COMMON_NAME: &str = "041@Z12@中国银联股份有限公司@00000001";

/// Common name of [`TestPki::sandbox_gateway`], which carries no organization segment.
pub const SANDBOX_COMMON_NAME: &str = "00040000:SIGN";

/// X.509v3
const VERSION: i32 = 2;

/// Length of the certificate serial number in bits.
const SERIAL_NUMBER_BITS: i32 = 159;

const VALIDITY_PERIOD_IN_DAYS: u32 = 365;

const RSA_KEY_BITS: u32 = 2048;

/// A certificate together with the key it certifies.
#[derive(Debug, Clone)]
pub struct IssuedCertificate {
    /// The certificate.
    pub certificate: X509,
    /// The certified key.
    pub private_key: PKey<Private>,
}

/// A complete root → middle → leaf hierarchy plus the merchant's own certificates.
#[derive(Debug)]
pub struct TestPki {
    /// Self-signed trusted root.
    pub root: X509,
    /// Intermediate issued by [`TestPki::root`].
    pub middle: X509,
    /// Gateway signing certificate carrying [`GATEWAY_IDENTITY`].
    pub gateway: IssuedCertificate,
    /// Gateway signing certificate of a test environment, without a usable identity.
    pub sandbox_gateway: IssuedCertificate,
    /// Merchant signing certificate.
    pub merchant: IssuedCertificate,
    /// Gateway encryption certificate.
    pub encrypt: IssuedCertificate,
}

impl TestPki {
    /// Generates a fresh hierarchy. Every call yields an unrelated root.
    pub fn generate() -> Self {
        let root = generate_key();
        let root_cert = build_certificate(&root, "Test Gateway Root CA", None, true);
        let root = IssuedCertificate {
            certificate: root_cert,
            private_key: root,
        };

        let middle_key = generate_key();
        let middle_cert =
            build_certificate(&middle_key, "Test Gateway Middle CA", Some(&root), true);
        let middle = IssuedCertificate {
            certificate: middle_cert,
            private_key: middle_key,
        };

        let issue_leaf = |common_name: &str| {
            let private_key = generate_key();
            let certificate = build_certificate(&private_key, common_name, Some(&middle), false);
            IssuedCertificate {
                certificate,
                private_key,
            }
        };

        let gateway = issue_leaf(GATEWAY_COMMON_NAME);
        let sandbox_gateway = issue_leaf(SANDBOX_COMMON_NAME);
        let merchant = issue_leaf("Test Merchant Signing");
        let encrypt = issue_leaf("Test Gateway Encryption");

        Self {
            root: root.certificate,
            middle: middle.certificate,
            gateway,
            sandbox_gateway,
            merchant,
            encrypt,
        }
    }

    /// Returns a hierarchy shared by the whole test binary.
    pub fn shared() -> &'static Self {
        static PKI: OnceLock<TestPki> = OnceLock::new();
        PKI.get_or_init(Self::generate)
    }

    /// The merchant's signing credential.
    pub fn sign_credential(&self) -> SignCredential {
        SignCredential::new(
            self.merchant.private_key.clone(),
            self.merchant.certificate.clone(),
        )
        .unwrap()
    }

    /// A [`CredentialStore`] trusting this hierarchy.
    pub fn credential_store(&self) -> CredentialStore {
        CredentialStore::new(
            self.sign_credential(),
            PublicCredential::new(self.encrypt.certificate.clone(), CredentialRole::Encrypt)
                .unwrap(),
            PublicCredential::new(self.middle.clone(), CredentialRole::Middle).unwrap(),
            PublicCredential::new(self.root.clone(), CredentialRole::Root).unwrap(),
        )
    }

    /// The merchant's key and certificate packed into a DER encoded PKCS#12 archive.
    pub fn merchant_pkcs12(&self, password: &str) -> Vec<u8> {
        Pkcs12::builder()
            .name("merchant")
            .pkey(&self.merchant.private_key)
            .cert(&self.merchant.certificate)
            .build2(password)
            .unwrap()
            .to_der()
            .unwrap()
    }
}

/// Signs `params` the way the gateway signs its responses: the signer's certificate is attached
/// as `signPubKeyCert` and covered by the signature.
pub fn sign_as_gateway(params: &ParameterSet, signer: &IssuedCertificate) -> ParameterSet {
    let credential =
        SignCredential::new(signer.private_key.clone(), signer.certificate.clone()).unwrap();
    let certificate_pem = String::from_utf8(signer.certificate.to_pem().unwrap()).unwrap();

    let mut params = params.clone();
    params.insert(fields::SIGN_PUB_KEY_CERT, certificate_pem);

    sign(
        &params,
        credential.cert_id(),
        Some(credential.private_key()),
        None,
    )
    .unwrap()
}

fn generate_key() -> PKey<Private> {
    PKey::from_rsa(Rsa::generate(RSA_KEY_BITS).unwrap()).unwrap()
}

/// Issues a certificate for `subject_key`, self-signed when `issuer` is `None`.
fn build_certificate(
    subject_key: &PKey<Private>,
    common_name: &str,
    issuer: Option<&IssuedCertificate>,
    is_ca: bool,
) -> X509 {
    let mut name = X509NameBuilder::new().unwrap();
    name.append_entry_by_text("C", "CN").unwrap();
    name.append_entry_by_text("O", "Test Gateway").unwrap();
    name.append_entry_by_text("CN", common_name).unwrap();
    let name = name.build();

    let mut serial_number = BigNum::new().unwrap();
    serial_number
        .rand(SERIAL_NUMBER_BITS, MsbOption::ONE, false)
        .unwrap();

    let mut cert_builder = X509::builder().unwrap();
    cert_builder.set_version(VERSION).unwrap();
    cert_builder
        .set_serial_number(&serial_number.to_asn1_integer().unwrap())
        .unwrap();
    cert_builder.set_pubkey(subject_key).unwrap();
    cert_builder.set_subject_name(&name).unwrap();
    match issuer {
        Some(issuer) => cert_builder.set_issuer_name(issuer.certificate.subject_name()),
        None => cert_builder.set_issuer_name(&name),
    }
    .unwrap();

    cert_builder
        .set_not_before(&Asn1Time::days_from_now(0).unwrap())
        .unwrap();
    cert_builder
        .set_not_after(&Asn1Time::days_from_now(VALIDITY_PERIOD_IN_DAYS).unwrap())
        .unwrap();

    let mut basic_constraints = BasicConstraints::new();
    let mut key_usage = KeyUsage::new();
    if is_ca {
        basic_constraints.critical().ca();
        key_usage.critical().key_cert_sign().crl_sign();
    } else {
        key_usage.critical().digital_signature().non_repudiation();
    }
    cert_builder
        .append_extension(basic_constraints.build().unwrap())
        .unwrap();
    cert_builder
        .append_extension(key_usage.build().unwrap())
        .unwrap();

    let issuer_cert = issuer.map(|issuer| issuer.certificate.as_ref());

    let subject_key_identifier = SubjectKeyIdentifier::new()
        .build(&cert_builder.x509v3_context(issuer_cert, None))
        .unwrap();
    cert_builder
        .append_extension(subject_key_identifier)
        .unwrap();

    let authority_key_identifier = AuthorityKeyIdentifier::new()
        .keyid(false)
        .issuer(false)
        .build(&cert_builder.x509v3_context(issuer_cert, None))
        .unwrap();
    cert_builder
        .append_extension(authority_key_identifier)
        .unwrap();

    let signing_key = issuer.map_or(subject_key, |issuer| &issuer.private_key);
    cert_builder
        .sign(signing_key, MessageDigest::sha256())
        .unwrap();

    cert_builder.build()
}
