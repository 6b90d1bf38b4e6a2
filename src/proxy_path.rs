use percent_encoding::percent_decode_str;
use serde::Serialize;

// Ways a requested path can try to escape the API root
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PathViolation {
    NullByte,
    Traversal,
    SchemeRelative,
}

// Validate a candidate upstream path. Checks run against both the raw and
// the percent-decoded form, so an encoded "../" is caught the same as a
// literal one. On success the path comes back with its original encoding
// untouched - forwarding keeps whatever the caller encoded.
pub fn validate(raw: &str) -> Result<&str, Vec<PathViolation>> {
    let mut violations = Vec::new();
    let decoded = percent_decode_str(raw).decode_utf8_lossy();

    if raw.contains('\0') || decoded.contains('\0') {
        violations.push(PathViolation::NullByte);
    }

    if has_traversal(raw) || has_traversal(&decoded) {
        violations.push(PathViolation::Traversal);
    }

    // a decoded leading "//" reads as a protocol-relative URL to some HTTP
    // clients, which would let the caller pick the upstream host
    if decoded.starts_with("//") {
        violations.push(PathViolation::SchemeRelative);
    }

    if violations.is_empty() { Ok(raw) } else { Err(violations) }
}

fn has_traversal(path: &str) -> bool {
    path.contains("../") || path.contains("..\\") || path == ".."
}
