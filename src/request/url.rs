use reqwest::Url;

use crate::errors::{Error, Result};

/// Resolves `url` against `base_url` and merges `params` into its query.
///
/// Absolute `http(s)://` URLs ignore the base. Existing query keys are
/// overwritten in place, new keys are appended, unrelated keys are kept.
pub fn build_url(base_url: Option<&str>, url: &str, params: &[(String, String)]) -> Result<Url> {
    let full = match base_url {
        Some(base) if !is_absolute(url) => join_base_path(base, url),
        _ => url.to_string(),
    };
    let mut parsed = Url::parse(&full).map_err(|err| Error::InvalidUrl {
        url: full.clone(),
        reason: err.to_string(),
    })?;
    merge_query(&mut parsed, params);
    Ok(parsed)
}

pub fn merge_query(url: &mut Url, params: &[(String, String)]) {
    if params.is_empty() {
        return;
    }
    let mut pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
    for (key, value) in params {
        match pairs.iter().position(|(existing, _)| existing == key) {
            Some(first) => {
                pairs[first].1 = value.clone();
                let mut index = 0;
                pairs.retain(|(existing, _)| {
                    let keep = existing != key || index == first;
                    index += 1;
                    keep
                });
            }
            None => pairs.push((key.clone(), value.clone())),
        }
    }
    url.query_pairs_mut()
        .clear()
        .extend_pairs(pairs.iter().map(|(k, v)| (k.as_str(), v.as_str())));
}

fn is_absolute(url: &str) -> bool {
    let lower = url.get(..8).unwrap_or(url).to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://")
}

fn join_base_path(base: &str, path: &str) -> String {
    let base = base.trim_end_matches('/');
    let relative = path.trim_start_matches('/');
    if relative.is_empty() {
        base.to_string()
    } else {
        format!("{base}/{relative}")
    }
}
