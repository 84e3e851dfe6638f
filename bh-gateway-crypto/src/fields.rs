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

//! Names of the parameters which carry signing metadata.

/// The signature itself.
pub const SIGNATURE: &str = "signature";
/// The signing method code, see [`SignMethod`][crate::SignMethod].
pub const SIGN_METHOD: &str = "signMethod";
/// The id of the certificate whose key produced the signature.
pub const CERT_ID: &str = "certId";
/// The protocol version, which selects the digest profile.
pub const VERSION: &str = "version";
/// The PEM certificate of the gateway key which signed a response.
pub const SIGN_PUB_KEY_CERT: &str = "signPubKeyCert";
