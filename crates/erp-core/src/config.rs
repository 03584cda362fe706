//! 操作配置模型

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::ErpError;

/// 名稱搜尋候選上限
pub const MAX_SEARCH_LIMIT: usize = 5;

/// 操作配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OperationConfig {
    /// 名稱搜尋候選數上限（1..=5）
    pub search_limit: usize,

    /// 找不到時附帶的相似建議數
    pub suggestion_limit: usize,

    /// 數量差異容忍值（浮點誤差，非業務容差）
    pub quantity_epsilon: Decimal,

    /// 計入可用庫存的庫位用途
    pub stock_location_usage: String,

    /// 批量匯入未指定庫位時的預設庫位
    pub default_location: String,

    /// 文件行建立失敗時的處理策略
    pub partial_commit: PartialCommitPolicy,

    /// 採購單未回傳幣別時的顯示值
    pub fallback_currency: Option<String>,
}

impl Default for OperationConfig {
    fn default() -> Self {
        Self {
            search_limit: MAX_SEARCH_LIMIT,
            suggestion_limit: 5,
            quantity_epsilon: Decimal::new(1, 3),
            stock_location_usage: "internal".to_string(),
            default_location: "WH/Stock".to_string(),
            partial_commit: PartialCommitPolicy::KeepCommitted,
            fallback_currency: None,
        }
    }
}

impl OperationConfig {
    /// 創建預設配置
    pub fn new() -> Self {
        Self::default()
    }

    /// 從 JSON 文件解析，未列出的欄位使用預設值
    pub fn from_json(json: &str) -> crate::Result<Self> {
        serde_json::from_str(json)
            .map_err(|e| ErpError::validation(format!("invalid operation config: {}", e)))
    }

    /// 建構器模式：設置搜尋上限（會限制在 1..=5）
    pub fn with_search_limit(mut self, limit: usize) -> Self {
        self.search_limit = limit;
        self
    }

    /// 建構器模式：設置建議數
    pub fn with_suggestion_limit(mut self, limit: usize) -> Self {
        self.suggestion_limit = limit;
        self
    }

    /// 建構器模式：設置數量容忍值
    pub fn with_quantity_epsilon(mut self, epsilon: Decimal) -> Self {
        self.quantity_epsilon = epsilon;
        self
    }

    /// 建構器模式：設置庫位用途
    pub fn with_stock_location_usage(mut self, usage: impl Into<String>) -> Self {
        self.stock_location_usage = usage.into();
        self
    }

    /// 建構器模式：設置預設庫位
    pub fn with_default_location(mut self, location: impl Into<String>) -> Self {
        self.default_location = location.into();
        self
    }

    /// 建構器模式：設置部分提交策略
    pub fn with_partial_commit(mut self, policy: PartialCommitPolicy) -> Self {
        self.partial_commit = policy;
        self
    }

    /// 建構器模式：設置備用幣別
    pub fn with_fallback_currency(mut self, currency: impl Into<String>) -> Self {
        self.fallback_currency = Some(currency.into());
        self
    }

    /// 實際使用的搜尋上限
    pub fn effective_search_limit(&self) -> usize {
        self.search_limit.clamp(1, MAX_SEARCH_LIMIT)
    }
}

/// 部分提交策略
///
/// ERP 每次呼叫各自提交。文件行失敗時：
/// - `KeepCommitted`：保留已建立的表頭與行，回報錯誤並列出已提交ID（預設）
/// - `Compensate`：反向刪除已建立的行與表頭後回報錯誤
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PartialCommitPolicy {
    KeepCommitted,
    Compensate,
}
