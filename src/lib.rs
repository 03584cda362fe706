//! # ERP Operations Core
//!
//! 對外入口：核心模型、計算元件與頂層操作
//!
//! ```no_run
//! use erp::prelude::*;
//! use rust_decimal::Decimal;
//!
//! let service = MemoryService::with_erp_defaults();
//! let config = OperationConfig::new();
//! let journal = Journal::default();
//! let ops = Operations::new(&service, &config, &journal);
//!
//! let outcome = ops.create_sales_order(&SalesOrderRequest {
//!     customer_name: Some("Golf Club".to_string()),
//!     lines: vec![LineInput::by_name("Golf Shirt", Decimal::from(3))],
//!     ..SalesOrderRequest::default()
//! });
//! println!("{}", outcome.message());
//! ```

pub use erp_calc;
pub use erp_core;
pub use erp_ops;

/// 常用類型
pub mod prelude {
    pub use erp_calc::{
        Adjustment, AvailabilityCalculator, EntityResolver, ErrorClassifier, LineInput,
        OrderAssembler, QuantityReconciler, ResolutionQuery, ResolutionTarget,
    };
    pub use erp_core::{
        ErpError, ErpService, ErrorCategory, MemoryService, OperationConfig, PartialCommitPolicy,
    };
    pub use erp_ops::{
        BomReportRequest, InventoryImportRequest, InventoryReportRequest, Journal,
        ManufacturingOrderRequest, ManufacturingReportRequest, Operations, OrderReportRequest,
        Outcome, PurchaseOrderRequest, SalesOrderRequest, StockUpdateRequest,
    };
}
