//! 身份认证协作者
//!
//! 核心只消费/产出玩家 ID，不解析令牌内部结构。

pub mod password;
pub mod token;

pub use password::{hash_password, verify_password};
pub use token::TokenIssuer;

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("password should not be empty")]
    EmptyPassword,

    #[error("password hashing failed: {0}")]
    Hash(String),

    #[error("invalid token")]
    InvalidToken,

    #[error("token expired")]
    ExpiredToken,

    #[error("token secret must not be empty")]
    InvalidSecret,
}
