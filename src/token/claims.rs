use base64::Engine;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use serde::Deserialize;

/// base64url that tolerates both padded and unpadded segments.
const SEGMENT: GeneralPurpose = GeneralPurpose::new(
    &base64::alphabet::URL_SAFE,
    GeneralPurposeConfig::new()
        .with_encode_padding(false)
        .with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

#[derive(Deserialize)]
struct Claims {
    exp: Option<serde_json::Number>,
}

/// Reads the `exp` claim from a JWT-shaped token without verifying it.
///
/// Returns `None` for anything that is not three dot-separated segments with
/// a JSON payload carrying a numeric `exp`.
pub fn expiry_epoch_seconds(token: &str) -> Option<i64> {
    let mut segments = token.split('.');
    let (Some(_header), Some(payload), Some(_signature), None) = (
        segments.next(),
        segments.next(),
        segments.next(),
        segments.next(),
    ) else {
        return None;
    };
    let bytes = SEGMENT.decode(payload).ok()?;
    let claims: Claims = serde_json::from_slice(&bytes).ok()?;
    let exp = claims.exp?;
    exp.as_i64()
        .or_else(|| exp.as_f64().filter(|v| v.is_finite()).map(|v| v.floor() as i64))
}
