//! Form-style percent-encoding used both for the signed string and for the
//! request body sent to the gateway.
//!
//! Values are escaped like a URI component (everything except
//! `A-Z a-z 0-9 - _ . ! ~ * ' ( )`), then each `%20` is replaced with `+`.
//! A literal `+` in the input is escaped as `%2B`, so the replacement can
//! never touch anything but an encoded space.

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

use crate::params::ParamValue;

const URI_COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

/// Percent-encode a single value, spaces as `+`.
pub fn encode_value(value: &str) -> String {
    utf8_percent_encode(value, URI_COMPONENT)
        .to_string()
        .replace("%20", "+")
}

/// Join fields as `name=encodedValue` separated by `&`, in iteration order.
/// Names are emitted verbatim.
pub fn encode_fields<'a, I>(fields: I) -> String
where
    I: IntoIterator<Item = (&'a String, &'a ParamValue)>,
{
    let mut out = String::new();
    for (name, value) in fields {
        if !out.is_empty() {
            out.push('&');
        }
        out.push_str(name);
        out.push('=');
        out.push_str(&encode_value(&value.to_string()));
    }
    out
}
