//! Opaque access tokens
//!
//! A token is the hex encoding of `{"userId": "..."}`. Not signed: the mock
//! trusts whoever holds one.

use serde::{Deserialize, Serialize};
use tf_core::UserId;

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TokenClaims {
    user_id: UserId,
}

/// Issue a token for a user
#[must_use]
pub fn issue(user_id: &UserId) -> String {
    let claims = TokenClaims {
        user_id: user_id.clone(),
    };
    // Serializing a single string field cannot fail.
    let raw = serde_json::to_vec(&claims).unwrap_or_default();
    hex::encode(raw)
}

/// User id carried by a token, if it decodes
#[must_use]
pub fn parse(token: &str) -> Option<UserId> {
    let raw = hex::decode(token.trim()).ok()?;
    let claims: TokenClaims = serde_json::from_slice(&raw).ok()?;
    Some(claims.user_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn issued_token_parses_back() {
        let id = UserId::from("usr_42");
        let token = issue(&id);
        assert!(token.chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(parse(&token), Some(id));
    }

    #[test]
    fn garbage_is_rejected() {
        assert_eq!(parse("not-hex"), None);
        assert_eq!(parse(&hex::encode(b"{\"other\":1}")), None);
        assert_eq!(parse(""), None);
    }
}
