//! # ERP Core
//!
//! 核心資料模型、ERP 服務介面與錯誤類型

pub mod category;
pub mod config;
pub mod domain;
pub mod memory;
pub mod order;
pub mod record;
pub mod service;
pub mod stock;

// Re-export 主要類型
pub use category::ErrorCategory;
pub use config::{OperationConfig, PartialCommitPolicy};
pub use domain::{Condition, Domain, Operator, SearchOptions};
pub use memory::{CallKind, MemoryService, ServiceCall};
pub use order::{CommittedRecords, HeaderOptions, OrderLine};
pub use record::{Fields, Record, RecordId};
pub use service::{models, ErpService, ServiceError};
pub use stock::{BomComponent, BomLine, ComponentStatus, StockSnapshot};

/// ERP 操作錯誤類型
#[derive(Debug, thiserror::Error)]
pub enum ErpError {
    /// 輸入驗證失敗（在任何服務呼叫之前）
    #[error("{0}")]
    Validation(String),

    /// 找不到對應記錄
    #[error("{entity} {query} not found{}", similar_suffix(.suggestions))]
    NotFound {
        entity: String,
        query: String,
        suggestions: Vec<String>,
    },

    /// ERP 服務回傳的錯誤（原樣傳遞）
    #[error(transparent)]
    Service(#[from] ServiceError),

    /// 記錄缺少預期欄位
    #[error("malformed {model} record: {detail}")]
    Malformed { model: String, detail: String },

    /// 文件建立中途失敗，已提交部分記錄
    #[error("{source}")]
    PartialCommit {
        source: Box<ErpError>,
        committed: CommittedRecords,
    },
}

impl ErpError {
    /// 建立驗證錯誤
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// 建立找不到錯誤（無建議）
    pub fn not_found(entity: impl Into<String>, query: impl Into<String>) -> Self {
        Self::NotFound {
            entity: entity.into(),
            query: query.into(),
            suggestions: Vec::new(),
        }
    }

    /// 建立欄位缺失錯誤
    pub fn malformed(model: &str, detail: impl Into<String>) -> Self {
        Self::Malformed {
            model: model.to_string(),
            detail: detail.into(),
        }
    }

    /// 剝除部分提交包裝，取得根本原因
    pub fn root(&self) -> &ErpError {
        match self {
            Self::PartialCommit { source, .. } => source.root(),
            other => other,
        }
    }
}

fn similar_suffix(suggestions: &[String]) -> String {
    if suggestions.is_empty() {
        String::new()
    } else {
        format!(". Similar: {}", suggestions.join(", "))
    }
}

pub type Result<T> = std::result::Result<T, ErpError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_message_lists_suggestions() {
        let err = ErpError::NotFound {
            entity: "Customer".to_string(),
            query: "'Acme'".to_string(),
            suggestions: vec!["Acme Corp".to_string(), "Acme Ltd".to_string()],
        };
        assert_eq!(
            err.to_string(),
            "Customer 'Acme' not found. Similar: Acme Corp, Acme Ltd"
        );

        let err = ErpError::not_found("Product", "with ID 42");
        assert_eq!(err.to_string(), "Product with ID 42 not found");
    }

    #[test]
    fn test_partial_commit_displays_root_cause() {
        let err = ErpError::PartialCommit {
            source: Box::new(ErpError::not_found("Product", "'Ghost'")),
            committed: CommittedRecords::new(models::SALE_ORDER, 10, models::SALE_ORDER_LINE),
        };
        assert_eq!(err.to_string(), "Product 'Ghost' not found");
        assert!(matches!(err.root(), ErpError::NotFound { .. }));
    }
}
