//! Shared helpers for the HTTP clients

use anyhow::{bail, Context, Result};
use reqwest::header::HeaderValue;

/// Check a credential or header value for characters HTTP headers reject
/// (control characters, DEL, line breaks).
pub fn sanitize_for_header(value: &str, field_name: &str) -> Result<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        bail!("{} cannot be empty", field_name);
    }

    if let Some((index, ch)) = trimmed
        .char_indices()
        .find(|(_, ch)| ch.is_control() || *ch == '\u{7f}')
    {
        bail!(
            "{} contains invalid character at position {} ({:?})",
            field_name,
            index,
            ch
        );
    }

    Ok(trimmed.to_string())
}

/// Build the value of a header carrying an API key.
///
/// `scheme` is `Some("Bearer")` for Authorization headers and `None` for
/// raw key headers such as `x-api-key`.
pub fn api_key_header(api_key: &str, scheme: Option<&str>) -> Result<HeaderValue> {
    if api_key.trim().eq_ignore_ascii_case("none") {
        bail!("API key is set to 'none'");
    }
    let key = sanitize_for_header(api_key, "API key")?;
    let raw = match scheme {
        Some(scheme) => format!("{scheme} {key}"),
        None => key,
    };
    let mut value = HeaderValue::from_str(&raw)
        .with_context(|| format!("API key of {} characters is not a valid header value", raw.len()))?;
    value.set_sensitive(true);
    Ok(value)
}

/// Validate a configured base URL and strip the trailing slash.
pub fn sanitize_base_url(url: &str, field_name: &str) -> Result<String> {
    let trimmed = url.trim();
    if trimmed.is_empty() {
        bail!("{} cannot be empty", field_name);
    }

    // Encoded separators here mean the value was escaped twice.
    if trimmed.contains("%2F") || trimmed.contains("%3D") || trimmed.contains("%20") {
        bail!("{} appears to be URL-encoded: {}", field_name, trimmed);
    }

    if !trimmed.starts_with("http://") && !trimmed.starts_with("https://") {
        bail!(
            "{} must start with 'http://' or 'https://'. Got: {}",
            field_name,
            trimmed
        );
    }

    Ok(trimmed.trim_end_matches('/').to_string())
}
