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

use bh_gateway_params::ParameterSet;
use http::Method;

/// Renders a hidden HTML form which submits `params` to `url` as soon as it is loaded.
///
/// Inputs are emitted in insertion order. Keys and values are inserted verbatim, without HTML
/// escaping, so they must never carry untrusted input.
///
/// HTML forms only support GET and POST, so any `method` other than [`Method::GET`] renders as
/// `post`.
pub fn render_form(url: &str, params: &ParameterSet, method: &Method) -> String {
    let method = if *method == Method::GET {
        "get"
    } else {
        "post"
    };

    let mut html = format!(
        "<form id='submit' name='submit' action='{url}' method='{method}' style='display:none;'>"
    );
    for (key, value) in params.iter() {
        html.push_str(&format!("<input  name='{key}' value='{value}'/>"));
    }
    html.push_str("<input type='submit' style='display:none;'></form>");
    html.push_str("<script>document.forms['submit'].submit();</script>");

    html
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params() -> ParameterSet {
        [
            ("merId", "777290058110048"),
            ("txnAmt", "100"),
            ("signature", "c2ln+/="),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn renders_auto_submitting_post_form() {
        let html = render_form("https://gateway.example/front", &params(), &Method::POST);

        assert_eq!(
            html,
            "<form id='submit' name='submit' action='https://gateway.example/front' \
             method='post' style='display:none;'>\
             <input  name='merId' value='777290058110048'/>\
             <input  name='txnAmt' value='100'/>\
             <input  name='signature' value='c2ln+/='/>\
             <input type='submit' style='display:none;'></form>\
             <script>document.forms['submit'].submit();</script>"
        );
    }

    #[test]
    fn other_verbs_fall_back_to_post() {
        for method in [Method::PUT, Method::DELETE, Method::PATCH] {
            let html = render_form("https://gateway.example/front", &params(), &method);
            assert!(html.contains("method='post'"));
        }

        let html = render_form("https://gateway.example/front", &params(), &Method::GET);
        assert!(html.contains("method='get'"));
    }

    #[test]
    fn values_are_inserted_verbatim() {
        let params: ParameterSet = [("reserved", "{a=1&b=<x>}")].into_iter().collect();

        let html = render_form("https://gateway.example/front", &params, &Method::POST);
        assert!(html.contains("value='{a=1&b=<x>}'"));
    }
}
