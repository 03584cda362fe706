//! 操作結果封裝

use chrono::{DateTime, Utc};
use erp_calc::ErrorClassifier;
use erp_core::{ErpError, ErrorCategory};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// 頂層操作結果
///
/// 序列化為 `{"status": "success" | "partial" | "error", ...}`。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Outcome<T> {
    Success { data: T, message: String },

    /// 批量操作中部分記錄被略過
    Partial { data: T, message: String },

    Error(ErrorReport),
}

impl<T> Outcome<T> {
    pub fn success(data: T, message: impl Into<String>) -> Self {
        Self::Success {
            data,
            message: message.into(),
        }
    }

    pub fn partial(data: T, message: impl Into<String>) -> Self {
        Self::Partial {
            data,
            message: message.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error(_))
    }

    /// 成功或部分成功時的資料
    pub fn data(&self) -> Option<&T> {
        match self {
            Self::Success { data, .. } | Self::Partial { data, .. } => Some(data),
            Self::Error(_) => None,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            Self::Success { message, .. } | Self::Partial { message, .. } => message,
            Self::Error(report) => &report.message,
        }
    }

    pub fn error(&self) -> Option<&ErrorReport> {
        match self {
            Self::Error(report) => Some(report),
            _ => None,
        }
    }
}

/// 錯誤報告（含分類與復原建議）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorReport {
    pub error_type: ErrorCategory,
    pub message: String,
    pub suggestions: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<Value>,

    pub timestamp: DateTime<Utc>,
}

impl ErrorReport {
    /// 由操作錯誤建立報告
    ///
    /// 部分提交時，context 會加入已提交的表頭與行ID。
    pub fn from_error(error: &ErpError, context: Option<Value>) -> Self {
        let category = ErrorClassifier::classify_error(error);

        let mut context = match context {
            Some(Value::Object(map)) => Some(map),
            Some(other) => {
                let mut map = Map::new();
                map.insert("input".to_string(), other);
                Some(map)
            }
            None => None,
        };

        if let ErpError::PartialCommit { committed, .. } = error {
            let map = context.get_or_insert_with(Map::new);
            map.insert("header_model".to_string(), Value::from(committed.header_model.as_str()));
            map.insert("header_id".to_string(), Value::from(committed.header_id));
            map.insert("line_model".to_string(), Value::from(committed.line_model.as_str()));
            map.insert("committed_line_ids".to_string(), Value::from(committed.line_ids.clone()));
            map.insert("rolled_back".to_string(), Value::from(committed.rolled_back));
        }

        let report = Self {
            error_type: category,
            message: error.to_string(),
            suggestions: ErrorClassifier::suggestions(category)
                .iter()
                .map(|s| s.to_string())
                .collect(),
            context: context.map(Value::Object),
            timestamp: Utc::now(),
        };
        tracing::error!(
            "[{}] {}",
            report.error_type.as_str().to_uppercase(),
            report.message
        );
        report
    }

    /// 使用者可讀的多行格式
    pub fn display(&self) -> String {
        let mut text = format!("Error ({}): {}", self.error_type, self.message);
        if !self.suggestions.is_empty() {
            text.push_str("\n\nSuggestions:");
            for suggestion in &self.suggestions {
                text.push_str("\n  - ");
                text.push_str(suggestion);
            }
        }
        text
    }
}
