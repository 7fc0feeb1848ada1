//! DOI normalization and validation
//!
//! DOIs are stored in canonical form, the bare `10.NNNN/suffix` without any
//! resolver URL or `doi:` scheme. Normalization never fails; validation runs
//! on the normalized value.

use regex_lite::Regex;
use serde_json::Value;
use std::borrow::Cow;
use std::sync::OnceLock;
use validator::ValidationError;

/// Resolver prefix used when no configuration overrides it
pub const DEFAULT_DOI_URL_PREFIX: &str = "https://doi.org/";

/// Validation error code for a malformed DOI
pub const DOI_ERROR_CODE: &str = "doi";

const DOI_ERROR_MESSAGE: &str = "Enter a valid DOI (e.g., 10.1000/xyz123).";

fn resolver_prefix() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)^(https?://)?(dx\.)?doi\.org/").expect("resolver prefix pattern is valid")
    })
}

fn scheme_prefix() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)^doi:").expect("scheme prefix pattern is valid"))
}

fn doi_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^10\.[0-9]{4,9}/[-._;()/:A-Za-z0-9]+$").expect("DOI pattern is valid")
    })
}

fn strip_once(value: &str) -> String {
    let value = value.trim();
    let value = resolver_prefix().replace(value, "");
    let value = scheme_prefix().replace(&value, "");
    value.trim().to_string()
}

/// Normalize a DOI to its canonical form.
///
/// Trims whitespace, drops a leading `http(s)://(dx.)doi.org/` resolver and a
/// leading `doi:` scheme, case-insensitively. Stripping repeats until the
/// value is stable, which makes the function idempotent for every input.
pub fn normalize_doi(value: &str) -> String {
    let mut current = strip_once(value);
    loop {
        let next = strip_once(&current);
        if next == current {
            return current;
        }
        current = next;
    }
}

/// Normalize a loosely typed value: strings are normalized, anything else is
/// returned untouched.
pub fn normalize_doi_value(value: Value) -> Value {
    match value {
        Value::String(s) => Value::String(normalize_doi(&s)),
        other => other,
    }
}

/// Normalize a nullable DOI. Blank input is stored as `None`.
pub fn normalize_optional_doi(value: Option<&str>) -> Option<String> {
    value.map(normalize_doi).filter(|doi| !doi.is_empty())
}

/// Check that `value` is a canonical DOI.
pub fn validate_doi(value: &str) -> Result<(), ValidationError> {
    if doi_pattern().is_match(value) {
        Ok(())
    } else {
        let mut err = ValidationError::new(DOI_ERROR_CODE);
        err.message = Some(Cow::Borrowed(DOI_ERROR_MESSAGE));
        err.add_param(Cow::Borrowed("value"), &value);
        Err(err)
    }
}

/// Resolver URL for a DOI, if there is one
pub fn doi_url(prefix: &str, doi: Option<&str>) -> Option<String> {
    match doi {
        Some(doi) if !doi.is_empty() => Some(format!("{}{}", prefix, doi)),
        _ => None,
    }
}
