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

use openssl::{
    error::ErrorStack,
    hash::{hash, MessageDigest},
};

/// Protocol versions whose digest profile is supported by [`SignMethod::Certificate`].
pub const SUPPORTED_VERSIONS: [&str; 2] = ["5.1.0", "6.0.0"];

/// The method a parameter set is signed with, as carried in its `signMethod` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum_macros::Display)]
pub enum SignMethod {
    /// RSA PKCS#1 v1.5 with SHA-256 over the hex SHA-256 digest of the payload, using the
    /// merchant's certificate key.
    #[strum(to_string = "01")]
    Certificate,
    /// SHA-256 keyed with the shared secure key.
    #[strum(to_string = "11")]
    SecureKeySha256,
    /// SM3 keyed with the shared secure key.
    #[strum(to_string = "12")]
    SecureKeySm3,
}

impl SignMethod {
    /// Parses the `signMethod` code, returning `None` for unsupported codes.
    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "01" => Some(Self::Certificate),
            "11" => Some(Self::SecureKeySha256),
            "12" => Some(Self::SecureKeySm3),
            _ => None,
        }
    }

    /// Returns `true` if the method signs with a certificate key rather than a secure key.
    pub fn uses_certificate(&self) -> bool {
        matches!(self, Self::Certificate)
    }
}

/// Returns `true` if the certificate sign method supports `version`.
pub fn is_supported_version(version: &str) -> bool {
    SUPPORTED_VERSIONS.contains(&version)
}

/// The lowercase hex SHA-256 digest of `payload`, which is what the certificate key signs.
pub(crate) fn certificate_digest(payload: &str) -> Result<String, ErrorStack> {
    hex_digest(MessageDigest::sha256(), payload.as_bytes())
}

/// The expected signature of `payload` under a secure key sign method.
///
/// Computed as `hex(H(payload & hex(H(secure_key))))` where `H` is SHA-256 or SM3.
pub(crate) fn secure_key_digest(
    method: SignMethod,
    payload: &str,
    secure_key: &str,
) -> Result<String, ErrorStack> {
    let digest = match method {
        SignMethod::SecureKeySm3 => MessageDigest::sm3(),
        SignMethod::SecureKeySha256 | SignMethod::Certificate => MessageDigest::sha256(),
    };

    let key_digest = hex_digest(digest, secure_key.as_bytes())?;
    hex_digest(digest, format!("{payload}&{key_digest}").as_bytes())
}

fn hex_digest(digest: MessageDigest, data: &[u8]) -> Result<String, ErrorStack> {
    Ok(hex::encode(&*hash(digest, data)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_known_codes_only() {
        for method in [
            SignMethod::Certificate,
            SignMethod::SecureKeySha256,
            SignMethod::SecureKeySm3,
        ] {
            assert_eq!(SignMethod::from_code(&method.to_string()), Some(method));
        }

        assert_eq!(SignMethod::from_code("1"), None);
        assert_eq!(SignMethod::from_code("02"), None);
        assert_eq!(SignMethod::from_code(""), None);
    }

    #[test]
    fn supported_versions() {
        assert!(is_supported_version("5.1.0"));
        assert!(is_supported_version("6.0.0"));
        assert!(!is_supported_version("5.0.0"));
        assert!(!is_supported_version("5.1"));
    }

    #[test]
    fn certificate_digest_is_lowercase_hex_sha256() {
        assert_eq!(
            certificate_digest("abc").unwrap(),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn secure_key_digest_differs_per_method_and_key() {
        let sha256 = secure_key_digest(SignMethod::SecureKeySha256, "a=1", "key").unwrap();
        let sm3 = secure_key_digest(SignMethod::SecureKeySm3, "a=1", "key").unwrap();
        let other_key = secure_key_digest(SignMethod::SecureKeySha256, "a=1", "other").unwrap();

        assert_eq!(sha256.len(), 64);
        assert_eq!(sm3.len(), 64);
        assert_ne!(sha256, sm3);
        assert_ne!(sha256, other_key);
    }

    #[test]
    fn secure_key_digest_composition() {
        let key_digest = certificate_digest("key").unwrap();
        let expected = certificate_digest(&format!("a=1&{key_digest}")).unwrap();

        assert_eq!(
            secure_key_digest(SignMethod::SecureKeySha256, "a=1", "key").unwrap(),
            expected
        );
    }
}
