//! 搜尋條件（Domain）

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::cmp::Ordering;

use crate::record::Record;

/// 比較運算子
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Operator {
    #[serde(rename = "=")]
    Eq,
    #[serde(rename = "!=")]
    Ne,
    #[serde(rename = ">")]
    Gt,
    #[serde(rename = ">=")]
    Ge,
    #[serde(rename = "<")]
    Lt,
    #[serde(rename = "<=")]
    Le,
    /// 不分大小寫的部分比對
    #[serde(rename = "ilike")]
    ILike,
    #[serde(rename = "in")]
    In,
}

impl Operator {
    /// ERP 線路格式
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Eq => "=",
            Self::Ne => "!=",
            Self::Gt => ">",
            Self::Ge => ">=",
            Self::Lt => "<",
            Self::Le => "<=",
            Self::ILike => "ilike",
            Self::In => "in",
        }
    }
}

/// 單一條件 `(field, op, value)`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    pub field: String,
    pub op: Operator,
    pub value: Value,
}

impl Condition {
    /// 創建新的條件
    pub fn new(field: impl Into<String>, op: Operator, value: impl Into<Value>) -> Self {
        Self {
            field: field.into(),
            op,
            value: value.into(),
        }
    }

    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(field, Operator::Eq, value)
    }

    pub fn gt(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(field, Operator::Gt, value)
    }

    pub fn ilike(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(field, Operator::ILike, value)
    }

    pub fn is_in(field: impl Into<String>, values: Vec<Value>) -> Self {
        Self::new(field, Operator::In, Value::Array(values))
    }

    /// 轉為 ERP 三元組 `[field, op, value]`
    pub fn to_triple(&self) -> Value {
        Value::Array(vec![
            Value::String(self.field.clone()),
            Value::String(self.op.as_str().to_string()),
            self.value.clone(),
        ])
    }

    /// 檢查記錄是否符合此條件
    pub fn matches(&self, record: &Record) -> bool {
        let actual = if self.field == "id" {
            Value::from(record.id)
        } else {
            record.fields.get(&self.field).cloned().unwrap_or(Value::Null)
        };
        let actual = scalar(&actual);

        match self.op {
            Operator::Eq => values_equal(&actual, &self.value),
            Operator::Ne => !values_equal(&actual, &self.value),
            Operator::Gt => compare(&actual, &self.value) == Some(Ordering::Greater),
            Operator::Ge => matches!(
                compare(&actual, &self.value),
                Some(Ordering::Greater | Ordering::Equal)
            ),
            Operator::Lt => compare(&actual, &self.value) == Some(Ordering::Less),
            Operator::Le => matches!(
                compare(&actual, &self.value),
                Some(Ordering::Less | Ordering::Equal)
            ),
            Operator::ILike => match (actual.as_str(), self.value.as_str()) {
                (Some(text), Some(pattern)) => {
                    let needle = pattern.trim_matches('%').to_lowercase();
                    text.to_lowercase().contains(&needle)
                }
                _ => false,
            },
            Operator::In => match &self.value {
                Value::Array(options) => options.iter().any(|o| values_equal(&actual, o)),
                _ => false,
            },
        }
    }
}

/// 條件列表（AND）
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Domain(Vec<Condition>);

impl Domain {
    /// 空條件（匹配全部）
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// 建構器模式：追加條件
    pub fn and(mut self, condition: Condition) -> Self {
        self.0.push(condition);
        self
    }

    /// 合併另一組條件
    pub fn extend(mut self, other: &Domain) -> Self {
        self.0.extend(other.0.iter().cloned());
        self
    }

    pub fn conditions(&self) -> &[Condition] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// 轉為 ERP 線路格式
    pub fn to_value(&self) -> Value {
        Value::Array(self.0.iter().map(Condition::to_triple).collect())
    }

    pub fn matches(&self, record: &Record) -> bool {
        self.0.iter().all(|c| c.matches(record))
    }
}

impl From<Vec<Condition>> for Domain {
    fn from(conditions: Vec<Condition>) -> Self {
        Self(conditions)
    }
}

/// 搜尋分頁與排序
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchOptions {
    pub offset: usize,
    pub limit: Option<usize>,
    /// 例如 `"sequence"` 或 `"id desc"`
    pub order: Option<String>,
}

impl SearchOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// 建構器模式：設置筆數上限
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// 建構器模式：設置排序
    pub fn with_order(mut self, order: impl Into<String>) -> Self {
        self.order = Some(order.into());
        self
    }

    /// 建構器模式：設置位移
    pub fn with_offset(mut self, offset: usize) -> Self {
        self.offset = offset;
        self
    }
}

/// 關聯欄位 `[id, name]` 取其ID比較
fn scalar(value: &Value) -> Value {
    match value {
        Value::Array(pair) if pair.len() == 2 && pair[0].is_i64() && pair[1].is_string() => {
            pair[0].clone()
        }
        other => other.clone(),
    }
}

fn values_equal(actual: &Value, expected: &Value) -> bool {
    match (actual, expected) {
        (Value::Null | Value::Bool(false), Value::Bool(false)) => true,
        (Value::Number(a), Value::Number(b)) => a.as_f64() == b.as_f64(),
        (a, b) => a == b,
    }
}

fn compare(actual: &Value, expected: &Value) -> Option<Ordering> {
    match (actual, expected) {
        (Value::Number(a), Value::Number(b)) => a.as_f64()?.partial_cmp(&b.as_f64()?),
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        _ => None,
    }
}
