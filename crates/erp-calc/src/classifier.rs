//! 錯誤分類器
//!
//! 依固定順序掃描規則表，第一個出現在訊息中的樣式決定類別。
//! 類別之間在訊息內容上並不互斥，規則順序本身就是契約：
//!
//! | # | 樣式 | 類別 |
//! |---|------|------|
//! | 1 | `authenticate` | Authentication |
//! | 2 | `authentication` | Authentication |
//! | 3 | `access denied` | Permission |
//! | 4 | `permission` | Permission |
//! | 5 | `not found` | NotFound |
//! | 6 | `does not exist` | NotFound |
//! | 7 | `invalid` | Validation |
//! | 8 | `required` | Validation |
//! | 9 | `missing` | Validation |
//! | 10 | `connection` | Connection |
//! | 11 | `timeout` | Connection |
//! | 12 | `rate limit` | RateLimit |
//! | 13 | `too many requests` | RateLimit |
//! | 14 | `constraint` | DataIntegrity |
//! | 15 | `duplicate` | DataIntegrity |
//! | 16 | `unique` | DataIntegrity |
//!
//! 例如 "missing permission for operation" 歸類為 Permission（規則 4 先於規則 9）。

use erp_core::{ErpError, ErrorCategory};

/// 有序分類規則 `(小寫樣式, 類別)`
pub const CLASSIFICATION_RULES: &[(&str, ErrorCategory)] = &[
    ("authenticate", ErrorCategory::Authentication),
    ("authentication", ErrorCategory::Authentication),
    ("access denied", ErrorCategory::Permission),
    ("permission", ErrorCategory::Permission),
    ("not found", ErrorCategory::NotFound),
    ("does not exist", ErrorCategory::NotFound),
    ("invalid", ErrorCategory::Validation),
    ("required", ErrorCategory::Validation),
    ("missing", ErrorCategory::Validation),
    ("connection", ErrorCategory::Connection),
    ("timeout", ErrorCategory::Connection),
    ("rate limit", ErrorCategory::RateLimit),
    ("too many requests", ErrorCategory::RateLimit),
    ("constraint", ErrorCategory::DataIntegrity),
    ("duplicate", ErrorCategory::DataIntegrity),
    ("unique", ErrorCategory::DataIntegrity),
];

/// 錯誤分類器
pub struct ErrorClassifier;

impl ErrorClassifier {
    /// 依訊息分類
    pub fn classify(message: &str) -> ErrorCategory {
        let lowered = message.to_lowercase();
        CLASSIFICATION_RULES
            .iter()
            .find(|(pattern, _)| lowered.contains(*pattern))
            .map(|(_, category)| *category)
            .unwrap_or(ErrorCategory::Unknown)
    }

    /// 分類核心錯誤
    ///
    /// 核心自行產生的驗證與查無錯誤直接帶有類別；
    /// ERP 服務錯誤與其他錯誤依訊息分類。
    pub fn classify_error(error: &ErpError) -> ErrorCategory {
        match error.root() {
            ErpError::Validation(_) => ErrorCategory::Validation,
            ErpError::NotFound { .. } => ErrorCategory::NotFound,
            ErpError::Malformed { .. } => ErrorCategory::DataIntegrity,
            other => Self::classify(&other.to_string()),
        }
    }

    /// 各類別的復原建議
    pub fn suggestions(category: ErrorCategory) -> &'static [&'static str] {
        match category {
            ErrorCategory::Authentication => &[
                "Check the ERP credentials (URL, database, username, password or API key)",
                "Verify the API key is still valid; the ERP may expire tokens",
                "Confirm the user account is active in the ERP",
                "Run a connection test before retrying the operation",
            ],
            ErrorCategory::Connection => &[
                "Check network connectivity",
                "Verify the configured ERP URL is correct",
                "Check that the ERP server is reachable",
                "Wait a moment and retry; the failure may be a temporary network issue",
            ],
            ErrorCategory::Validation => &[
                "Check field names and types against the ERP model definition",
                "Verify all required fields are provided",
                "Check that quantities are positive and discounts are between 0 and 100",
                "Review the input for the failing line or row",
            ],
            ErrorCategory::NotFound => &[
                "Verify the record exists in the ERP",
                "Use internal IDs instead of names where possible",
                "Check for typos in record names or references",
                "Ensure prerequisite records are created first",
            ],
            ErrorCategory::Permission => &[
                "Check the user's access rights in the ERP user settings",
                "Verify the user belongs to the appropriate groups",
                "Some operations require administrator privileges",
                "Contact the ERP administrator to grant access",
            ],
            ErrorCategory::RateLimit => &[
                "Add delays between bulk operations",
                "Break large operations into smaller batches",
                "Wait a few minutes before retrying",
                "Consider running during off-peak hours",
            ],
            ErrorCategory::DataIntegrity => &[
                "Check for duplicate records in the ERP",
                "Verify unique constraints such as product codes and partner references",
                "Ensure referenced records are valid",
                "Check for circular dependencies",
            ],
            ErrorCategory::Unknown => &[
                "Check the full error message",
                "Review the ERP server logs if accessible",
                "Search the ERP documentation for the error",
                "Ask for clarification about the operation",
            ],
        }
    }
}
