//! Credential masking for anything that ends up in a log.

/// Mask a secret: first 8 and last 4 characters, or `***` when the secret
/// is 12 characters or shorter.
pub fn mask_secret(secret: &str) -> String {
    let chars: Vec<char> = secret.chars().collect();
    if chars.len() <= 12 {
        return "***".to_string();
    }
    let head: String = chars[..8].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{head}...{tail}")
}

/// Replace every occurrence of `token` in `url` with its masked form.
pub fn mask_token(url: &str, token: &str) -> String {
    if token.is_empty() || !url.contains(token) {
        return url.to_string();
    }
    url.replace(token, &mask_secret(token))
}
