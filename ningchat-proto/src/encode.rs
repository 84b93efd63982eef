//! Percent-encoding, form-body assembly, and markup stripping.
//!
//! The Ning endpoints take `application/x-www-form-urlencoded` bodies
//! and URL query strings in which every value is percent-encoded.
//! Values that are themselves JSON (the `user=` and `message=`
//! parameters) are escaped for JSON first and percent-encoded second;
//! the two steps are independent and applied in that order.

/// Percent-encodes a string for use as a query or form value.
#[must_use]
pub fn percent_encode(s: &str) -> String {
    urlencoding::encode(s).into_owned()
}

/// Decodes a percent-encoded string.
///
/// Invalid sequences decode lossily (the inverse property only holds
/// for strings produced by [`percent_encode`]).
#[must_use]
pub fn percent_decode(s: &str) -> String {
    urlencoding::decode(s).map_or_else(|_| s.to_string(), |c| c.into_owned())
}

/// Builds a form body from key/value pairs, percent-encoding every
/// value. Keys are emitted as-is (they are fixed protocol tokens).
#[must_use]
pub fn form_body(pairs: &[(&str, &str)]) -> String {
    pairs
        .iter()
        .map(|(k, v)| format!("{k}={}", percent_encode(v)))
        .collect::<Vec<_>>()
        .join("&")
}

/// Strips HTML markup from outgoing message text.
///
/// Tags are removed, `<br>` variants become newlines, and the common
/// entities are decoded. This mirrors what the host UI hands us:
/// user-entered rich text that the wire protocol wants as plain text.
#[must_use]
pub fn strip_markup(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(open) = rest.find('<') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        if let Some(close) = after.find('>') {
            let tag = after[..close].trim().to_ascii_lowercase();
            if tag == "br" || tag == "br/" || tag == "br /" {
                out.push('\n');
            }
            rest = &after[close + 1..];
        } else {
            // Unterminated tag: drop the remainder, as a parser
            // recovering from truncated markup would.
            rest = "";
        }
    }
    out.push_str(rest);

    decode_entities(&out)
}

/// Decodes the handful of entities that show up in chat markup.
fn decode_entities(input: &str) -> String {
    input
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&nbsp;", " ")
        .replace("&amp;", "&")
}
