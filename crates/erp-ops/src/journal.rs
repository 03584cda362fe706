//! 操作日誌
//!
//! `Journal::begin` 回傳 `OperationGuard`。呼叫 `succeed` 或 `fail` 記錄結果；
//! 若 guard 在此之前被丟棄（提前返回、panic），`Drop` 會記錄一筆 `fault`。

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::cell::RefCell;
use std::rc::Rc;
use std::time::Instant;
use uuid::Uuid;

use crate::outcome::ErrorReport;

/// 日誌狀態
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryStatus {
    Success,
    Error,
    Fault,
}

/// 日誌記錄
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JournalEntry {
    pub operation_id: Uuid,
    pub operation: String,
    pub status: EntryStatus,
    pub duration_ms: u64,
    pub timestamp: DateTime<Utc>,
    pub data: Value,
}

/// 日誌輸出端
pub trait AuditSink {
    fn record(&self, entry: &JournalEntry);
}

/// 以 tracing 事件輸出
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl AuditSink for TracingSink {
    fn record(&self, entry: &JournalEntry) {
        let data = serde_json::to_string(&entry.data).unwrap_or_default();
        match entry.status {
            EntryStatus::Success => tracing::info!(
                target: "erp_ops::audit",
                operation_id = %entry.operation_id,
                duration_ms = entry.duration_ms,
                "[SUCCESS] {}: {}",
                entry.operation,
                data
            ),
            EntryStatus::Error => tracing::warn!(
                target: "erp_ops::audit",
                operation_id = %entry.operation_id,
                duration_ms = entry.duration_ms,
                "[ERROR] {}: {}",
                entry.operation,
                data
            ),
            EntryStatus::Fault => tracing::error!(
                target: "erp_ops::audit",
                operation_id = %entry.operation_id,
                duration_ms = entry.duration_ms,
                "[FAULT] {}: {}",
                entry.operation,
                data
            ),
        }
    }
}

/// 記憶體內輸出端（可複製，共用同一份記錄）
#[derive(Debug, Default, Clone)]
pub struct MemorySink {
    entries: Rc<RefCell<Vec<JournalEntry>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> Vec<JournalEntry> {
        self.entries.borrow().clone()
    }
}

impl AuditSink for MemorySink {
    fn record(&self, entry: &JournalEntry) {
        self.entries.borrow_mut().push(entry.clone());
    }
}

/// 操作日誌
pub struct Journal {
    sink: Box<dyn AuditSink>,
}

impl Default for Journal {
    fn default() -> Self {
        Self::new(TracingSink)
    }
}

impl Journal {
    /// 創建新的日誌
    pub fn new(sink: impl AuditSink + 'static) -> Self {
        Self {
            sink: Box::new(sink),
        }
    }

    /// 開始一個操作
    pub fn begin(&self, operation: &str, context: Value) -> OperationGuard<'_> {
        let operation_id = Uuid::new_v4();
        let span = tracing::info_span!("operation", operation, id = %operation_id);
        let entered = span.entered();
        tracing::info!("開始操作: {}", operation);

        OperationGuard {
            journal: self,
            operation_id,
            operation: operation.to_string(),
            context,
            started: Instant::now(),
            finished: false,
            _span: entered,
        }
    }
}

/// 進行中的操作
pub struct OperationGuard<'j> {
    journal: &'j Journal,
    operation_id: Uuid,
    operation: String,
    context: Value,
    started: Instant,
    finished: bool,
    _span: tracing::span::EnteredSpan,
}

impl OperationGuard<'_> {
    pub fn operation_id(&self) -> Uuid {
        self.operation_id
    }

    /// 操作輸入摘要
    pub fn context(&self) -> &Value {
        &self.context
    }

    /// 記錄成功
    pub fn succeed(mut self, summary: Value) {
        tracing::info!(
            "完成操作: {} ({:.2}s)",
            self.operation,
            self.started.elapsed().as_secs_f64()
        );
        let data = json!({"context": self.context, "result": summary});
        self.emit(EntryStatus::Success, data);
        self.finished = true;
    }

    /// 記錄失敗
    pub fn fail(mut self, report: &ErrorReport) {
        let data = serde_json::to_value(report).unwrap_or(Value::Null);
        self.emit(EntryStatus::Error, data);
        self.finished = true;
    }

    fn emit(&self, status: EntryStatus, data: Value) {
        let entry = JournalEntry {
            operation_id: self.operation_id,
            operation: self.operation.clone(),
            status,
            duration_ms: u64::try_from(self.started.elapsed().as_millis()).unwrap_or(u64::MAX),
            timestamp: Utc::now(),
            data,
        };
        self.journal.sink.record(&entry);
    }
}

impl Drop for OperationGuard<'_> {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        let reason = if std::thread::panicking() {
            "panic"
        } else {
            "abandoned"
        };
        self.emit(
            EntryStatus::Fault,
            json!({"context": self.context, "reason": reason}),
        );
    }
}
