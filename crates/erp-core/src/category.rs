//! 錯誤分類

use serde::{Deserialize, Serialize};
use std::fmt;

/// 錯誤類別（封閉集合）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    Authentication,
    Connection,
    Validation,
    NotFound,
    Permission,
    RateLimit,
    DataIntegrity,
    Unknown,
}

impl ErrorCategory {
    /// 所有類別
    pub const ALL: [ErrorCategory; 8] = [
        ErrorCategory::Authentication,
        ErrorCategory::Connection,
        ErrorCategory::Validation,
        ErrorCategory::NotFound,
        ErrorCategory::Permission,
        ErrorCategory::RateLimit,
        ErrorCategory::DataIntegrity,
        ErrorCategory::Unknown,
    ];

    /// 序列化名稱
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Authentication => "authentication",
            Self::Connection => "connection",
            Self::Validation => "validation",
            Self::NotFound => "not_found",
            Self::Permission => "permission",
            Self::RateLimit => "rate_limit",
            Self::DataIntegrity => "data_integrity",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
