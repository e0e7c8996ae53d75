//! 基于 HMAC-SHA256 的不透明 bearer 令牌
//!
//! 格式：`base64url(payload).base64url(signature)`，payload 为 `"<player_id>:<expires_at>"`。

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use hmac::{Hmac, Mac};
use sha2::Sha256;

use super::AuthError;
use crate::config::AuthConfig;

type HmacSha256 = Hmac<Sha256>;

/// 令牌签发器，签名密钥来自配置
#[derive(Clone)]
pub struct TokenIssuer {
    mac: HmacSha256,
    ttl_secs: i64,
}

impl std::fmt::Debug for TokenIssuer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenIssuer")
            .field("ttl_secs", &self.ttl_secs)
            .finish_non_exhaustive()
    }
}

impl TokenIssuer {
    pub fn new(config: &AuthConfig) -> Result<Self, AuthError> {
        if config.token_secret.is_empty() {
            return Err(AuthError::InvalidSecret);
        }
        let mac = HmacSha256::new_from_slice(config.token_secret.as_bytes())
            .map_err(|_| AuthError::InvalidSecret)?;
        Ok(Self {
            mac,
            ttl_secs: config.token_ttl_secs,
        })
    }

    /// 为玩家签发令牌
    pub fn issue(&self, player_id: i32) -> String {
        let expires_at = chrono::Utc::now().timestamp() + self.ttl_secs;
        self.issue_with_expiry(player_id, expires_at)
    }

    fn issue_with_expiry(&self, player_id: i32, expires_at: i64) -> String {
        let payload = format!("{}:{}", player_id, expires_at);
        let signature = self.mac.clone().chain_update(payload.as_bytes()).finalize();
        format!(
            "{}.{}",
            URL_SAFE_NO_PAD.encode(payload.as_bytes()),
            URL_SAFE_NO_PAD.encode(signature.into_bytes())
        )
    }

    /// 校验令牌并返回玩家 ID
    pub fn verify(&self, token: &str) -> Result<i32, AuthError> {
        let (payload_b64, signature_b64) =
            token.split_once('.').ok_or(AuthError::InvalidToken)?;
        let payload = URL_SAFE_NO_PAD
            .decode(payload_b64)
            .map_err(|_| AuthError::InvalidToken)?;
        let signature = URL_SAFE_NO_PAD
            .decode(signature_b64)
            .map_err(|_| AuthError::InvalidToken)?;

        self.mac
            .clone()
            .chain_update(&payload)
            .verify_slice(&signature)
            .map_err(|_| AuthError::InvalidToken)?;

        let payload = String::from_utf8(payload).map_err(|_| AuthError::InvalidToken)?;
        let (id, expires_at) = payload.split_once(':').ok_or(AuthError::InvalidToken)?;
        let id: i32 = id.parse().map_err(|_| AuthError::InvalidToken)?;
        let expires_at: i64 = expires_at.parse().map_err(|_| AuthError::InvalidToken)?;

        if expires_at < chrono::Utc::now().timestamp() {
            return Err(AuthError::ExpiredToken);
        }
        Ok(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn issuer(secret: &str) -> TokenIssuer {
        TokenIssuer::new(&AuthConfig {
            token_secret: secret.to_string(),
            token_ttl_secs: 60,
        })
        .unwrap()
    }

    #[test]
    fn issued_token_verifies_to_player_id() {
        let issuer = issuer("secret");
        let token = issuer.issue(42);
        assert_eq!(issuer.verify(&token).unwrap(), 42);
    }

    #[test]
    fn token_signed_with_other_secret_is_rejected() {
        let token = issuer("one").issue(1);
        assert!(matches!(
            issuer("two").verify(&token),
            Err(AuthError::InvalidToken)
        ));
    }

    #[test]
    fn expired_token_is_rejected() {
        let issuer = issuer("secret");
        let token = issuer.issue_with_expiry(7, chrono::Utc::now().timestamp() - 10);
        assert!(matches!(issuer.verify(&token), Err(AuthError::ExpiredToken)));
    }

    #[test]
    fn empty_secret_is_rejected() {
        let result = TokenIssuer::new(&AuthConfig {
            token_secret: String::new(),
            token_ttl_secs: 60,
        });
        assert!(matches!(result, Err(AuthError::InvalidSecret)));
    }

    #[test]
    fn garbage_is_rejected() {
        let issuer = issuer("secret");
        assert!(issuer.verify("").is_err());
        assert!(issuer.verify("abc.def").is_err());
        assert!(issuer.verify("no-dot").is_err());
    }
}
