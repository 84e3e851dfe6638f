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

//! Encoding and decoding of the gateway wire format.
//!
//! The wire format is a `key=value&key=value` string which is **not** percent-encoded. Some
//! response fields carry structured values (e.g. error details or encrypted blobs) wrapped in
//! `{...}` or `[...]`, and those may contain unescaped `&` and `=` characters. A standard
//! query-string decoder would split them apart, so [`decode`] tracks brackets while scanning.

use bherror::traits::ErrorContext as _;

use crate::{Error, ParameterSet, Result};

/// Separator between two `key=value` pairs.
pub const PAIR_SEPARATOR: char = '&';

/// Separator between a key and its value.
pub const KEY_VALUE_SEPARATOR: char = '=';

/// Join the parameters in insertion order into the `key=value&...` wire string.
///
/// No percent-encoding is applied. Parameters which could not be decoded back unchanged are
/// rejected with [`Error::AmbiguousParameter`]: an empty key, a key containing `=` or `&`, or a
/// value containing `&` outside of a `{...}`/`[...]` region or leaving such a region open.
pub fn encode(params: &ParameterSet) -> Result<String> {
    for (key, value) in params.iter() {
        check_unambiguous(key, value)?;
    }

    Ok(join(params.iter()))
}

/// Join the parameters in ascending byte-wise key order, leaving out the `excluded` keys.
///
/// This is the canonical payload over which signatures are computed and verified.
pub fn canonical_payload(params: &ParameterSet, excluded: &[&str]) -> String {
    join(
        params
            .sorted()
            .into_iter()
            .filter(|(key, _)| !excluded.contains(key)),
    )
}

/// Serialize the parameters in insertion order as `application/x-www-form-urlencoded`.
pub fn encode_form_urlencoded(params: &ParameterSet) -> String {
    let mut serializer = url::form_urlencoded::Serializer::new(String::new());
    for (key, value) in params.iter() {
        serializer.append_pair(key, value);
    }
    serializer.finish()
}

/// Scanner state of [`decode`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum State {
    Key,
    Value,
    /// Inside a bracketed value, waiting for the contained closing character.
    Bracketed(char),
}

/// Parse a raw gateway body into a [`ParameterSet`].
///
/// Inside a value, `{` and `[` open a bracketed region in which `&` does not end the pair. The
/// region closes on the *first* matching closer; nesting of the same bracket type is not
/// tracked. A key without `=` is stored with an empty value, whereas an empty key is always an
/// [`Error::MalformedBody`]. A repeated key overwrites the earlier value.
pub fn decode(body: &str) -> Result<ParameterSet> {
    let mut params = ParameterSet::new();
    let mut state = State::Key;
    let mut key = String::new();
    let mut buffer = String::new();

    for (position, current) in body.char_indices() {
        state = match (state, current) {
            (State::Key, KEY_VALUE_SEPARATOR) => {
                key = std::mem::take(&mut buffer);
                State::Value
            }
            (State::Key, PAIR_SEPARATOR) => {
                put(&mut params, std::mem::take(&mut buffer), String::new())
                    .ctx(|| format!("at byte {position}"))?;
                State::Key
            }
            (State::Value, PAIR_SEPARATOR) => {
                put(
                    &mut params,
                    std::mem::take(&mut key),
                    std::mem::take(&mut buffer),
                )
                .ctx(|| format!("at byte {position}"))?;
                State::Key
            }
            (State::Value, '{') => {
                buffer.push(current);
                State::Bracketed('}')
            }
            (State::Value, '[') => {
                buffer.push(current);
                State::Bracketed(']')
            }
            (State::Bracketed(closer), _) => {
                buffer.push(current);
                if current == closer {
                    State::Value
                } else {
                    state
                }
            }
            (state, _) => {
                buffer.push(current);
                state
            }
        };
    }

    let last = match state {
        State::Key => put(&mut params, buffer, String::new()),
        State::Value | State::Bracketed(_) => put(&mut params, key, buffer),
    };
    last.ctx(|| "at end of input")?;

    Ok(params)
}

fn put(params: &mut ParameterSet, key: String, value: String) -> Result<()> {
    if key.is_empty() {
        return Err(bherror::Error::root(Error::MalformedBody).ctx("empty key"));
    }

    params.insert(key, value);
    Ok(())
}

fn join<'a>(pairs: impl IntoIterator<Item = (&'a str, &'a str)>) -> String {
    let mut joined = String::new();
    for (key, value) in pairs {
        if !joined.is_empty() {
            joined.push(PAIR_SEPARATOR);
        }
        joined.push_str(key);
        joined.push(KEY_VALUE_SEPARATOR);
        joined.push_str(value);
    }
    joined
}

fn check_unambiguous(key: &str, value: &str) -> Result<()> {
    let ambiguous = || bherror::Error::root(Error::AmbiguousParameter(key.to_owned()));

    if key.is_empty() {
        return Err(ambiguous().ctx("empty key"));
    }

    if key.contains([KEY_VALUE_SEPARATOR, PAIR_SEPARATOR]) {
        return Err(ambiguous().ctx("key contains a separator"));
    }

    let mut closer = None;
    for current in value.chars() {
        closer = match (closer, current) {
            (None, '{') => Some('}'),
            (None, '[') => Some(']'),
            (None, PAIR_SEPARATOR) => {
                return Err(ambiguous().ctx("value contains an unbracketed `&`"));
            }
            (Some(expected), _) if current == expected => None,
            (closer, _) => closer,
        };
    }

    if closer.is_some() {
        return Err(ambiguous().ctx("value leaves a bracket open"));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use proptest::prelude::*;

    use super::*;

    fn params(pairs: &[(&str, &str)]) -> ParameterSet {
        pairs.iter().copied().collect()
    }

    #[test]
    fn encode_keeps_insertion_order() {
        let params = params(&[
            ("version", "5.1.0"),
            ("merId", "777290058110048"),
            ("a", ""),
        ]);

        assert_eq!(
            encode(&params).unwrap(),
            "version=5.1.0&merId=777290058110048&a="
        );
    }

    #[test]
    fn encode_accepts_bracketed_values() {
        let params = params(&[("reserved", "{a=1&b=2}"), ("list", "[1&2]")]);

        assert_eq!(encode(&params).unwrap(), "reserved={a=1&b=2}&list=[1&2]");
    }

    #[test]
    fn encode_rejects_ambiguous_parameters() {
        for (key, value) in [
            ("", "1"),
            ("a=b", "1"),
            ("a&b", "1"),
            ("a", "1&b=2"),
            ("a", "{open"),
            ("a", "{x}&y"),
        ] {
            let err = encode(&params(&[(key, value)])).unwrap_err();
            assert_eq!(err.error, Error::AmbiguousParameter(key.to_owned()));
        }
    }

    #[test]
    fn canonical_payload_sorts_and_excludes() {
        let params = params(&[
            ("version", "5.1.0"),
            ("signature", "c2ln"),
            ("accessType", "0"),
            ("certId", "68759663125"),
        ]);

        assert_eq!(
            canonical_payload(&params, &["signature"]),
            "accessType=0&certId=68759663125&version=5.1.0"
        );
    }

    #[test]
    fn encode_form_urlencoded_escapes() {
        let params = params(&[
            ("signature", "ab+c/d=="),
            ("frontUrl", "https://x.y/?a=1&b=2"),
        ]);

        assert_eq!(
            encode_form_urlencoded(&params),
            "signature=ab%2Bc%2Fd%3D%3D&frontUrl=https%3A%2F%2Fx.y%2F%3Fa%3D1%26b%3D2"
        );
    }

    #[test]
    fn decode_nested_values() {
        assert_eq!(
            decode("a={x:1,y:2}&b=3").unwrap(),
            params(&[("a", "{x:1,y:2}"), ("b", "3")])
        );
        assert_eq!(
            decode("a=[1,2,3]&b=4").unwrap(),
            params(&[("a", "[1,2,3]"), ("b", "4")])
        );
        assert_eq!(
            decode("reserved={cardNumberLock=1&accNo=6216}&respCode=00").unwrap(),
            params(&[
                ("reserved", "{cardNumberLock=1&accNo=6216}"),
                ("respCode", "00"),
            ])
        );
    }

    #[test]
    fn decode_keeps_text_around_brackets() {
        assert_eq!(
            decode("a=pre{x&y}post&b=[1]{2}").unwrap(),
            params(&[("a", "pre{x&y}post"), ("b", "[1]{2}")])
        );
    }

    #[test]
    fn decode_value_may_contain_equals() {
        assert_eq!(
            decode("signature=YWJj==&b=1").unwrap(),
            params(&[("signature", "YWJj=="), ("b", "1")])
        );
    }

    #[test]
    fn decode_rejects_empty_keys() {
        for body in ["=foo", "a=1&&b=2", "a=1&", "", "&a=1"] {
            let err = decode(body).unwrap_err();
            assert_matches!(err.error, Error::MalformedBody, "body: {body:?}");
        }
    }

    #[test]
    fn decode_accepts_bare_keys() {
        assert_eq!(
            decode("a=1&flag").unwrap(),
            params(&[("a", "1"), ("flag", "")])
        );
        assert_eq!(
            decode("flag&a=1").unwrap(),
            params(&[("flag", ""), ("a", "1")])
        );
        assert_eq!(decode("a=").unwrap(), params(&[("a", "")]));
    }

    #[test]
    fn decode_overwrites_repeated_keys() {
        assert_eq!(
            decode("a=1&b=2&a=3").unwrap(),
            params(&[("a", "3"), ("b", "2")])
        );
    }

    #[test]
    fn decode_treats_brackets_in_keys_literally() {
        assert_eq!(
            decode("a{b=1&c=2").unwrap(),
            params(&[("a{b", "1"), ("c", "2")])
        );
    }

    #[test]
    fn decode_unclosed_bracket_swallows_rest() {
        assert_eq!(decode("a={x&b=2").unwrap(), params(&[("a", "{x&b=2")]));
    }

    // Known boundary: the first closer of the same type ends the region, so a nested object
    // containing `&` after its inner closer is split.
    #[test]
    fn decode_does_not_track_same_type_nesting() {
        assert_eq!(
            decode("a={x:{y:1}}&b=2").unwrap(),
            params(&[("a", "{x:{y:1}}"), ("b", "2")])
        );
        assert_eq!(
            decode("a={x:{y:1}&z=2}&b=3").unwrap(),
            params(&[("a", "{x:{y:1}"), ("z", "2}"), ("b", "3")])
        );
        // mixed types do not close each other
        assert_eq!(
            decode("a={x:[1&2]&y}&b=3").unwrap(),
            params(&[("a", "{x:[1&2]&y}"), ("b", "3")])
        );
    }

    #[test]
    fn decode_scales_linearly_with_key_count() {
        const KEYS: usize = 50_000;
        let body = (0..KEYS)
            .map(|index| format!("k{index}=v"))
            .collect::<Vec<_>>()
            .join("&");

        let started = std::time::Instant::now();
        let params = decode(&body).unwrap();

        assert!(started.elapsed() < std::time::Duration::from_secs(5));
        assert_eq!(params.len(), KEYS);
        assert_eq!(params.get("k49999"), Some("v"));
    }

    proptest! {
        #[test]
        fn scalar_parameters_round_trip(
            pairs in prop::collection::btree_map("[a-zA-Z][a-zA-Z0-9_.]{0,15}", "[^&=\\[\\]{}]{0,24}", 1..12),
            reverse in any::<bool>(),
        ) {
            let mut pairs: Vec<_> = pairs.into_iter().collect();
            if reverse {
                pairs.reverse();
            }
            let params: ParameterSet = pairs.into_iter().collect();

            let encoded = encode(&params).unwrap();
            prop_assert_eq!(decode(&encoded).unwrap(), params);
        }
    }
}
