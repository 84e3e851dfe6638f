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

use std::any::type_name;

use bh_gateway_params::ParameterSet;
use bherror::traits::{ErrorContext as _, ForeignError as _};
use serde::de::DeserializeOwned;

use crate::{ClientError, Result};

/// Builds a typed response out of verified response fields.
pub trait FromParameters: Sized {
    /// Maps the `fields`, failing with [`ClientError::ResponseMapping`] if they do not fit.
    fn from_parameters(fields: &ParameterSet) -> Result<Self>;
}

impl FromParameters for ParameterSet {
    fn from_parameters(fields: &ParameterSet) -> Result<Self> {
        Ok(fields.clone())
    }
}

/// Maps `fields` into any [`DeserializeOwned`] type whose fields are all strings.
///
/// Intended as the body of [`FromParameters::from_parameters`] for response types deriving
/// [`serde::Deserialize`].
pub fn deserialize_parameters<T: DeserializeOwned>(fields: &ParameterSet) -> Result<T> {
    let value = serde_json::to_value(fields).foreign_err(|| ClientError::ResponseMapping)?;

    serde_json::from_value(value)
        .foreign_err(|| ClientError::ResponseMapping)
        .ctx(|| format!("cannot map into `{}`", type_name::<T>()))
}

/// A verified gateway response.
#[derive(Debug, Clone)]
pub struct GatewayResponse<T> {
    /// The body exactly as received.
    pub raw_body: String,
    /// The parsed fields, including the signature.
    pub fields: ParameterSet,
    /// Whether the signature verified. Always `true` for responses returned by the client.
    pub verified: bool,
    /// The typed response.
    pub response: T,
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use serde::Deserialize;

    use super::*;

    #[derive(Debug, Deserialize)]
    #[serde(rename_all = "camelCase")]
    struct QueryResponse {
        resp_code: String,
        orig_resp_code: Option<String>,
    }

    #[test]
    fn deserializes_string_fields() {
        let fields: ParameterSet = [
            ("respCode", "00"),
            ("respMsg", "ok"),
            ("origRespCode", "03"),
        ]
        .into_iter()
        .collect();

        let response: QueryResponse = deserialize_parameters(&fields).unwrap();
        assert_eq!(response.resp_code, "00");
        assert_eq!(response.orig_resp_code.as_deref(), Some("03"));
    }

    #[test]
    fn missing_field_is_a_mapping_error() {
        let fields: ParameterSet = [("respMsg", "ok")].into_iter().collect();

        let error = deserialize_parameters::<QueryResponse>(&fields).unwrap_err();
        assert_matches!(error.error, ClientError::ResponseMapping);
    }
}
