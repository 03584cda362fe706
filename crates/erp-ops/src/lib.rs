//! # ERP Operations
//!
//! 頂層操作：驗證輸入、呼叫核心元件、記錄日誌並封裝結果

pub mod inventory;
pub mod journal;
pub mod manufacturing;
pub mod orders;
pub mod outcome;
pub mod report;
pub mod telemetry;
pub mod validation;

// Re-export 主要類型
pub use inventory::{
    ImportRow, ImportSummary, InventoryImportRequest, RowAdjustment, RowError, StockUpdate,
    StockUpdateRequest,
};
pub use journal::{AuditSink, EntryStatus, Journal, JournalEntry, MemorySink, OperationGuard, TracingSink};
pub use manufacturing::{ManufacturingOrderRequest, ProductionSummary};
pub use orders::{OrderSummary, PurchaseOrderRequest, SalesOrderRequest};
pub use outcome::{ErrorReport, Outcome};
pub use report::{
    BomComponentRow, BomReport, BomReportRequest, BomReportSummary, InventoryReport,
    InventoryReportRequest, ManufacturingReport, ManufacturingReportRequest, OrderReport,
    OrderReportRequest, OrderReportRow, OrderReportSummary, ProductionReportSummary, ProductionRow,
    ReportSummary, StockRow,
};

use erp_core::{ErpService, OperationConfig};
use serde::Serialize;
use serde_json::{json, Value};

/// 頂層操作入口
///
/// 每個操作各自記錄一筆日誌，並一律回傳 `Outcome`，錯誤不會向外傳遞。
pub struct Operations<'a, S: ErpService> {
    service: &'a S,
    config: &'a OperationConfig,
    journal: &'a Journal,
}

impl<'a, S: ErpService> Operations<'a, S> {
    /// 創建新的操作入口
    pub fn new(service: &'a S, config: &'a OperationConfig, journal: &'a Journal) -> Self {
        Self {
            service,
            config,
            journal,
        }
    }

    pub fn config(&self) -> &OperationConfig {
        self.config
    }

    /// 執行操作主體並封裝結果
    fn run<T, F>(&self, operation: &str, input: Value, body: F) -> Outcome<T>
    where
        T: Serialize,
        F: FnOnce() -> erp_core::Result<Completed<T>>,
    {
        let guard = self.journal.begin(operation, input);

        match body() {
            Ok(done) => {
                guard.succeed(serde_json::to_value(&done.data).unwrap_or(Value::Null));
                if done.partial {
                    Outcome::partial(done.data, done.message)
                } else {
                    Outcome::success(done.data, done.message)
                }
            }
            Err(err) => {
                let context = json!({"operation": operation, "input": guard.context()});
                let report = ErrorReport::from_error(&err, Some(context));
                guard.fail(&report);
                Outcome::Error(report)
            }
        }
    }
}

/// 操作主體的成功結果
pub(crate) struct Completed<T> {
    data: T,
    message: String,
    partial: bool,
}

impl<T> Completed<T> {
    pub(crate) fn new(data: T, message: impl Into<String>) -> Self {
        Self {
            data,
            message: message.into(),
            partial: false,
        }
    }

    /// 建構器模式：標記為部分成功
    pub(crate) fn partial(mut self, partial: bool) -> Self {
        self.partial = partial;
        self
    }
}

/// 將請求轉為日誌用 JSON
pub(crate) fn input_value<T: Serialize>(request: &T) -> Value {
    serde_json::to_value(request).unwrap_or(Value::Null)
}
