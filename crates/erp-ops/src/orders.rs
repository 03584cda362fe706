//! 銷售訂單與採購訂單

use chrono::NaiveDate;
use erp_calc::{
    AssembledDocument, DocumentKind, DocumentRequest, LineInput, OrderAssembler, ResolutionQuery,
};
use erp_core::{ErpService, HeaderOptions, RecordId};
use serde::{Deserialize, Serialize};

use crate::{input_value, Completed, Operations, Outcome};

/// 銷售訂單請求
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SalesOrderRequest {
    pub customer_id: Option<RecordId>,
    pub customer_name: Option<String>,
    pub lines: Vec<LineInput>,

    /// 客戶訂單號
    pub client_order_ref: Option<String>,
    pub notes: Option<String>,
    pub commitment_date: Option<NaiveDate>,
    pub auto_confirm: bool,
}

impl SalesOrderRequest {
    fn document(&self) -> DocumentRequest {
        DocumentRequest::new(
            DocumentKind::Sales,
            ResolutionQuery::from_parts(self.customer_id, None, self.customer_name.as_deref()),
            self.lines.clone(),
        )
        .with_header(HeaderOptions {
            reference: self.client_order_ref.clone(),
            notes: self.notes.clone(),
            date: self.commitment_date,
        })
        .with_auto_confirm(self.auto_confirm)
    }
}

/// 採購訂單請求
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PurchaseOrderRequest {
    pub vendor_id: Option<RecordId>,
    pub vendor_name: Option<String>,
    pub lines: Vec<LineInput>,

    /// 供應商單號
    pub partner_ref: Option<String>,
    pub notes: Option<String>,

    /// 預計到貨日期
    pub date_planned: Option<NaiveDate>,
    pub auto_confirm: bool,
}

impl PurchaseOrderRequest {
    fn document(&self) -> DocumentRequest {
        DocumentRequest::new(
            DocumentKind::Purchase,
            ResolutionQuery::from_parts(self.vendor_id, None, self.vendor_name.as_deref()),
            self.lines.clone(),
        )
        .with_header(HeaderOptions {
            reference: self.partner_ref.clone(),
            notes: self.notes.clone(),
            date: self.date_planned,
        })
        .with_auto_confirm(self.auto_confirm)
    }
}

/// 訂單建立結果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderSummary {
    #[serde(flatten)]
    pub document: AssembledDocument,

    /// 預計到貨日期（採購）
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_date: Option<NaiveDate>,
}

impl<'a, S: ErpService> Operations<'a, S> {
    /// 建立銷售訂單
    pub fn create_sales_order(&self, request: &SalesOrderRequest) -> Outcome<OrderSummary> {
        self.run("create_sales_order", input_value(request), || {
            let document =
                OrderAssembler::new(self.service, self.config).assemble(&request.document())?;
            let message = format!(
                "Sales Order {} created successfully for {}",
                document.reference, document.party
            );
            Ok(Completed::new(
                OrderSummary {
                    document,
                    expected_date: None,
                },
                message,
            ))
        })
    }

    /// 建立採購訂單
    pub fn process_purchase_order(&self, request: &PurchaseOrderRequest) -> Outcome<OrderSummary> {
        self.run("process_purchase_order", input_value(request), || {
            let document =
                OrderAssembler::new(self.service, self.config).assemble(&request.document())?;
            let message = format!(
                "Purchase Order {} created for {}",
                document.reference, document.party
            );
            Ok(Completed::new(
                OrderSummary {
                    document,
                    expected_date: request.date_planned,
                },
                message,
            ))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::journal::{EntryStatus, Journal, MemorySink};
    use erp_core::{models, CallKind, ErrorCategory, MemoryService, OperationConfig};
    use rust_decimal::Decimal;
    use serde_json::json;

    fn service() -> MemoryService {
        let service = MemoryService::with_erp_defaults();
        service.seed(models::PARTNER, json!({"id": 3, "name": "Golf Club Ltd", "customer_rank": 1}));
        service.seed(models::PARTNER, json!({"id": 12, "name": "Acme Supplies", "supplier_rank": 1}));
        service.seed(models::PRODUCT, json!({"id": 5, "name": "Golf Shirt", "list_price": 100, "standard_price": 40, "sale_ok": true, "purchase_ok": true}));
        service
    }

    #[test]
    fn test_create_sales_order_from_json() {
        let service = service();
        let config = OperationConfig::new();
        let sink = MemorySink::new();
        let journal = Journal::new(sink.clone());
        let ops = Operations::new(&service, &config, &journal);

        let request: SalesOrderRequest = serde_json::from_value(json!({
            "customer_name": "Golf Club",
            "lines": [{"product_name": "Golf Shirt", "quantity": 3, "discount": 10}],
            "client_order_ref": "PO-7781",
            "auto_confirm": true,
        }))
        .unwrap();
        let outcome = ops.create_sales_order(&request);

        assert!(outcome.is_success());
        assert_eq!(outcome.message(), "Sales Order S00001 created successfully for Golf Club Ltd");
        let summary = outcome.data().unwrap();
        assert_eq!(summary.document.total_amount, Decimal::new(27000, 2));
        assert_eq!(summary.document.state, "sale");

        let entries = sink.entries();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].operation, "create_sales_order");
        assert_eq!(entries[0].status, EntryStatus::Success);
    }

    #[test]
    fn test_purchase_order_reports_expected_date() {
        let service = service();
        let config = OperationConfig::new();
        let journal = Journal::default();
        let ops = Operations::new(&service, &config, &journal);

        let request = PurchaseOrderRequest {
            vendor_id: Some(12),
            lines: vec![LineInput::by_id(5, Decimal::from(10))],
            date_planned: NaiveDate::from_ymd_opt(2026, 12, 1),
            ..PurchaseOrderRequest::default()
        };
        let outcome = ops.process_purchase_order(&request);

        let value = serde_json::to_value(&outcome).unwrap();
        assert_eq!(value["status"], "success");
        assert_eq!(value["data"]["reference"], "P00001");
        assert_eq!(value["data"]["expected_date"], "2026-12-01");
        assert_eq!(outcome.message(), "Purchase Order P00001 created for Acme Supplies");
    }

    #[test]
    fn test_validation_error_is_classified() {
        let service = service();
        let config = OperationConfig::new();
        let sink = MemorySink::new();
        let journal = Journal::new(sink.clone());
        let ops = Operations::new(&service, &config, &journal);

        let outcome = ops.create_sales_order(&SalesOrderRequest {
            customer_name: Some("Golf Club".to_string()),
            ..SalesOrderRequest::default()
        });

        let report = outcome.error().unwrap();
        assert_eq!(report.error_type, ErrorCategory::Validation);
        assert_eq!(report.message, "At least one order line is required");
        assert_eq!(report.context.as_ref().unwrap()["operation"], "create_sales_order");
        assert!(service.calls().is_empty());
        assert_eq!(sink.entries()[0].status, EntryStatus::Error);
    }

    #[test]
    fn test_service_failure_is_classified() {
        let service = service();
        service.fail_on(CallKind::Find, models::PARTNER, "Connection refused");
        let config = OperationConfig::new();
        let journal = Journal::default();
        let ops = Operations::new(&service, &config, &journal);

        let outcome = ops.process_purchase_order(&PurchaseOrderRequest {
            vendor_name: Some("Acme".to_string()),
            lines: vec![LineInput::by_id(5, Decimal::ONE)],
            ..PurchaseOrderRequest::default()
        });
        assert_eq!(outcome.error().unwrap().error_type, ErrorCategory::Connection);
    }
}
