//! Inference features derived from a profile URL

use std::collections::BTreeMap;

use url::Url;

use crate::errors::Result;

/// Characters that mark a URL as suspicious
const SPECIAL_CHARS: [char; 8] = ['!', '@', '#', '$', '%', '^', '&', '*'];

/// Platform code: 1 for Instagram, 2 for LinkedIn, 0 otherwise
pub fn platform_code(platform: &str) -> f64 {
    match platform {
        "instagram" => 1.0,
        "linkedin" => 2.0,
        _ => 0.0,
    }
}

/// Build the named inference features for `raw_url` on `platform`
pub fn extract_url_features(raw_url: &str, platform: &str) -> Result<BTreeMap<String, f64>> {
    let url = Url::parse(raw_url)?;
    let flag = |b: bool| if b { 1.0 } else { 0.0 };

    let features = [
        ("has_username", flag(url.path().chars().count() > 1)),
        ("has_query_params", flag(url.query().is_some_and(|q| !q.is_empty()))),
        ("url_length", raw_url.chars().count() as f64),
        ("has_special_chars", flag(raw_url.contains(SPECIAL_CHARS))),
        ("platform", platform_code(platform)),
    ];

    Ok(features
        .into_iter()
        .map(|(name, value)| (name.to_string(), value))
        .collect())
}
