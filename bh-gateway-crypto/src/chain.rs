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
    nid::Nid,
    pkey::{PKey, Public},
    stack::Stack,
    x509::{
        store::{X509Store, X509StoreBuilder},
        verify::X509VerifyFlags,
        X509Ref, X509StoreContext, X509,
    },
};

use crate::ChainError;

type Result<T> = bherror::Result<T, ChainError>;

/// Separator of the segments of the signer's common name.
const IDENTITY_SEPARATOR: char = '@';
/// Index of the organization segment within the signer's common name.
const IDENTITY_SEGMENT: usize = 2;

/// The certificate chain a gateway response is signed with.
///
/// The leaf certificate arrives with every response, while the middle certificate is configured
/// locally. Neither is trusted until [`CertificateChain::verify_against_root`] succeeds.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CertificateChain {
    leaf: X509,
    middle: X509,
}

impl CertificateChain {
    /// Create a new [`CertificateChain`] from the `leaf` and the `middle` certificate that is
    /// expected to have issued it.
    pub fn new(leaf: X509, middle: X509) -> Self {
        Self { leaf, middle }
    }

    /// Constructs a [`CertificateChain`] from a PEM encoded leaf certificate.
    pub fn from_leaf_pem(leaf_pem: &[u8], middle: &X509Ref) -> Result<Self> {
        let leaf = X509::from_pem(leaf_pem)
            .foreign_err(|| ChainError::InvalidChain)
            .ctx(|| "unable to parse the leaf certificate")?;

        Ok(Self::new(leaf, middle.to_owned()))
    }

    /// Verifies that the leaf was issued by the middle certificate and that the middle
    /// certificate leads to the trusted `root`.
    ///
    /// Validity periods of all three certificates are checked against the current time.
    pub fn verify_against_root(&self, root: &X509Ref) -> Result<()> {
        // `X509StoreContext` accepts any path to the trusted root, so a leaf issued directly by
        // the root would pass without this check.
        let is_issued_by_middle =
            clean_up_after_openssl(|| self.leaf.verify(self.middle.public_key()?.as_ref()))
                .foreign_err(|| ChainError::InvalidChain)?;

        if !is_issued_by_middle {
            return Err(bherror::Error::root(ChainError::Untrusted)
                .ctx("leaf certificate is not issued by the middle certificate"));
        }

        let trust = root_to_store(root.to_owned())?;
        let intermediates = certs_to_stack([self.middle.clone()])?;

        let mut context = X509StoreContext::new().foreign_err(|| ChainError::InvalidChain)?;
        let is_valid = context
            .init(&trust, &self.leaf, &intermediates, |ctx| {
                clean_up_after_openssl(|| ctx.verify_cert())
            })
            .foreign_err(|| ChainError::InvalidChain)?;

        if !is_valid {
            return Err(bherror::Error::root(ChainError::Untrusted)
                .ctx("chain does not lead to the trusted root"));
        }

        Ok(())
    }

    /// Returns the public key of the leaf certificate.
    pub fn leaf_public_key(&self) -> Result<PKey<Public>> {
        self.leaf
            .public_key()
            .foreign_err(|| ChainError::InvalidChain)
    }

    /// Returns the leaf certificate.
    pub fn leaf_certificate(&self) -> &X509 {
        &self.leaf
    }

    /// Returns the organization segment of the leaf's common name.
    ///
    /// Gateway certificates carry common names of the form `code@code@organization@serial`.
    /// `None` is returned when the common name is missing or has fewer segments.
    pub fn leaf_identity(&self) -> Option<String> {
        let common_name = self
            .leaf
            .subject_name()
            .entries_by_nid(Nid::COMMONNAME)
            .next()?
            .data()
            .as_utf8()
            .ok()?;

        common_name
            .split(IDENTITY_SEPARATOR)
            .nth(IDENTITY_SEGMENT)
            .map(str::to_owned)
    }
}

fn certs_to_stack(certificates: impl IntoIterator<Item = X509>) -> Result<Stack<X509>> {
    let mut stack = Stack::new().foreign_err(|| ChainError::InvalidChain)?;

    for cert in certificates {
        stack.push(cert).foreign_err(|| ChainError::InvalidChain)?;
    }

    Ok(stack)
}

fn root_to_store(root: X509) -> Result<X509Store> {
    let mut builder = X509StoreBuilder::new().foreign_err(|| ChainError::InvalidChain)?;
    builder
        .set_flags(X509VerifyFlags::X509_STRICT | X509VerifyFlags::CHECK_SS_SIGNATURE)
        .foreign_err(|| ChainError::InvalidChain)?;
    builder
        .add_cert(root)
        .foreign_err(|| ChainError::InvalidChain)?;

    Ok(builder.build())
}

/// Runs an OpenSSL call and clears whatever the call left on the thread's error stack.
///
/// Some calls, e.g. [`X509Ref::verify`], report a negative outcome as `Ok(false)` while still
/// pushing errors, which would otherwise be picked up by an unrelated call later on.
pub(crate) fn clean_up_after_openssl<T>(
    f: impl FnOnce() -> std::result::Result<T, ErrorStack>,
) -> std::result::Result<T, ErrorStack> {
    let return_value = f()?;

    drop(ErrorStack::get());

    Ok(return_value)
}
