//! 仓库层错误类型
//!
//! 适配层只需根据 [`ErrorKind`] 决定传输层状态码，核心不涉及任何传输细节。

use sea_orm::{DbErr, SqlErr};

use crate::auth::AuthError;

/// 错误分类
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    Validation,
    Unauthorized,
    Storage,
    Internal,
}

#[derive(Debug, thiserror::Error)]
pub enum RepoError {
    #[error("not found: {resource} '{key}'")]
    NotFound { resource: &'static str, key: String },

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("unauthorized action on {resource} '{key}'")]
    Unauthorized { resource: &'static str, key: String },

    #[error("storage error: {0}")]
    Storage(DbErr),

    /// 非调用方输入导致的内部故障（哈希失败、密钥配置错误等）
    #[error("internal error: {0}")]
    Internal(String),
}

pub type RepoResult<T> = Result<T, RepoError>;

impl RepoError {
    pub fn not_found(resource: &'static str, key: impl ToString) -> Self {
        Self::NotFound {
            resource,
            key: key.to_string(),
        }
    }

    pub fn unauthorized(resource: &'static str, key: impl ToString) -> Self {
        Self::Unauthorized {
            resource,
            key: key.to_string(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::Validation(_) => ErrorKind::Validation,
            Self::Unauthorized { .. } => ErrorKind::Unauthorized,
            Self::Storage(_) => ErrorKind::Storage,
            Self::Internal(_) => ErrorKind::Internal,
        }
    }
}

impl From<DbErr> for RepoError {
    fn from(e: DbErr) -> Self {
        // 唯一约束冲突属于校验失败，其余一律视为存储错误
        match e.sql_err() {
            Some(SqlErr::UniqueConstraintViolation(msg)) => Self::Validation(msg),
            _ => Self::Storage(e),
        }
    }
}

impl From<AuthError> for RepoError {
    fn from(e: AuthError) -> Self {
        match e {
            AuthError::EmptyPassword => Self::Validation(e.to_string()),
            AuthError::Hash(_) | AuthError::InvalidSecret => Self::Internal(e.to_string()),
            AuthError::InvalidToken | AuthError::ExpiredToken => {
                Self::unauthorized("token", e.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_follow_variants() {
        assert_eq!(
            RepoError::not_found("item", "missing").kind(),
            ErrorKind::NotFound
        );
        assert_eq!(
            RepoError::Validation("dup".into()).kind(),
            ErrorKind::Validation
        );
        assert_eq!(
            RepoError::unauthorized("comment", 3).kind(),
            ErrorKind::Unauthorized
        );
        assert_eq!(
            RepoError::from(DbErr::Custom("boom".into())).kind(),
            ErrorKind::Storage
        );
    }

    #[test]
    fn auth_errors_map_to_repo_kinds() {
        assert_eq!(
            RepoError::from(AuthError::EmptyPassword).kind(),
            ErrorKind::Validation
        );
        assert_eq!(
            RepoError::from(AuthError::ExpiredToken).kind(),
            ErrorKind::Unauthorized
        );
        assert_eq!(
            RepoError::from(AuthError::Hash("out of memory".into())).kind(),
            ErrorKind::Internal
        );
        assert_eq!(
            RepoError::from(AuthError::InvalidSecret).kind(),
            ErrorKind::Internal
        );
    }

    #[test]
    fn not_found_message_names_resource() {
        let err = RepoError::not_found("tag", "rust");
        assert_eq!(err.to_string(), "not found: tag 'rust'");
    }
}
