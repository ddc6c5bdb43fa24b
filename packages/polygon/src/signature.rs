use rand::Rng;
use rand::distr::Alphanumeric;
use sha2::{Digest, Sha512};

const PREFIX_LEN: usize = 6;

/// Random prefix mixed into every request signature.
pub(crate) fn random_prefix() -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(PREFIX_LEN)
        .map(char::from)
        .collect()
}

/// Compute `apiSig` for a Polygon method call.
///
/// `params` must already contain `apiKey` and `time`. Parameters are sorted by
/// key, then value, and joined as `k=v&k=v`.
pub(crate) fn sign(method: &str, params: &[(String, String)], secret: &str, prefix: &str) -> String {
    let mut sorted: Vec<&(String, String)> = params.iter().collect();
    sorted.sort();

    let query = sorted
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("&");

    let digest = Sha512::digest(format!("{prefix}/{method}?{query}#{secret}").as_bytes());
    format!("{prefix}{}", hex::encode(digest))
}
