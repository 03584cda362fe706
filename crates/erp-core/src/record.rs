//! ERP 記錄模型

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::str::FromStr;

/// 記錄ID
pub type RecordId = i64;

/// 欄位映射
pub type Fields = serde_json::Map<String, Value>;

/// ERP 記錄（由 ERP 服務擁有，核心僅讀取）
///
/// ERP 以 `false` 表示空值，關聯欄位（many2one）以 `[id, "顯示名稱"]` 表示。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    /// 記錄ID
    pub id: RecordId,

    /// 其餘欄位
    #[serde(flatten)]
    pub fields: Fields,
}

impl Record {
    /// 創建新的記錄
    pub fn new(id: RecordId, fields: Fields) -> Self {
        Self { id, fields }
    }

    /// 讀取欄位，`null` 與 `false` 視為缺失
    pub fn get(&self, field: &str) -> Option<&Value> {
        match self.fields.get(field) {
            None | Some(Value::Null) | Some(Value::Bool(false)) => None,
            Some(value) => Some(value),
        }
    }

    /// 顯示名稱
    pub fn name(&self) -> &str {
        self.str_field("name").unwrap_or_default()
    }

    /// 字串欄位
    pub fn str_field(&self, field: &str) -> Option<&str> {
        self.get(field).and_then(Value::as_str)
    }

    /// 布林欄位，缺失視為 false
    pub fn flag(&self, field: &str) -> bool {
        matches!(self.fields.get(field), Some(Value::Bool(true)))
    }

    /// 數值欄位
    pub fn decimal(&self, field: &str) -> Option<Decimal> {
        self.get(field).and_then(decimal_from_value)
    }

    /// 數值欄位，缺失視為 0
    pub fn decimal_or_zero(&self, field: &str) -> Decimal {
        self.decimal(field).unwrap_or(Decimal::ZERO)
    }

    /// 關聯欄位的目標ID
    pub fn many2one_id(&self, field: &str) -> Option<RecordId> {
        match self.get(field)? {
            Value::Array(pair) => pair.first().and_then(Value::as_i64),
            Value::Number(n) => n.as_i64(),
            _ => None,
        }
    }

    /// 關聯欄位的顯示名稱
    pub fn many2one_name(&self, field: &str) -> Option<&str> {
        match self.get(field)? {
            Value::Array(pair) => pair.get(1).and_then(Value::as_str),
            _ => None,
        }
    }

    /// 一對多欄位的ID列表
    pub fn ids(&self, field: &str) -> Vec<RecordId> {
        match self.get(field) {
            Some(Value::Array(items)) => items.iter().filter_map(Value::as_i64).collect(),
            _ => Vec::new(),
        }
    }
}

/// 將 JSON 數值轉為 Decimal（接受數字與數字字串）
pub fn decimal_from_value(value: &Value) -> Option<Decimal> {
    match value {
        Value::Number(n) => match n.as_i64() {
            Some(i) => Some(Decimal::from(i)),
            None => n.as_f64().and_then(|f| Decimal::try_from(f).ok()),
        },
        Value::String(s) => Decimal::from_str(s.trim()).ok(),
        _ => None,
    }
}

/// 將 Decimal 轉為 ERP 所需的浮點 JSON 數值
pub fn decimal_value(value: Decimal) -> Value {
    value.to_f64().map(Value::from).unwrap_or(Value::Null)
}

/// 從 JSON 物件取得欄位映射（非物件則為空）
pub fn fields_from(value: Value) -> Fields {
    match value {
        Value::Object(map) => map,
        _ => Fields::new(),
    }
}
