use subtle::ConstantTimeEq;

const BEARER_PREFIX: &str = "Bearer ";

/// Token from an `Authorization` value. The scheme is matched exactly,
/// including case and the single space.
pub fn extract_bearer_token(header: Option<&str>) -> Option<&str> {
    header?
        .strip_prefix(BEARER_PREFIX)
        .filter(|token| !token.is_empty())
}

/// Exact comparison that does not leak the match length through timing.
pub fn token_matches(presented: &str, expected: &str) -> bool {
    !expected.is_empty() && presented.as_bytes().ct_eq(expected.as_bytes()).into()
}
