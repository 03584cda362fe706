//! 集成測試

use chrono::NaiveDate;
use erp::erp_calc::{
    AvailabilityCalculator, EntityResolver, ErrorClassifier, LineInput, ResolutionQuery,
    ResolutionTarget,
};
use erp::erp_core::{
    models, BomLine, CallKind, ErrorCategory, MemoryService, OperationConfig, PartialCommitPolicy,
};
use erp::erp_ops::{
    EntryStatus, ImportRow, InventoryImportRequest, InventoryReportRequest, Journal,
    ManufacturingOrderRequest, MemorySink, Operations, OrderReportRequest, SalesOrderRequest,
    StockUpdateRequest,
};
use rstest::rstest;
use rust_decimal::Decimal;
use serde_json::json;

/// 服飾工廠的測試資料
fn apparel_erp() -> MemoryService {
    let service = MemoryService::with_erp_defaults();
    service.seed(models::PARTNER, json!({"id": 3, "name": "Golf Club Ltd", "customer_rank": 1}));
    service.seed(models::PARTNER, json!({"id": 12, "name": "Acme Supplies", "supplier_rank": 1}));
    service.seed(models::PRODUCT, json!({
        "id": 1, "name": "Golf Shirt", "default_code": "GS-01", "type": "product",
        "product_tmpl_id": [11, "Golf Shirt"], "list_price": 100, "standard_price": 40,
        "sale_ok": true, "purchase_ok": false,
    }));
    service.seed(models::PRODUCT, json!({
        "id": 5, "name": "Cotton Roll", "default_code": "CR-01", "type": "product",
        "standard_price": 12.5, "purchase_ok": true,
    }));
    service.seed(models::PRODUCT, json!({
        "id": 6, "name": "Button", "default_code": "BT-01", "type": "product",
        "standard_price": 0.1, "purchase_ok": true,
    }));
    service.seed(models::BOM_LINE, json!({"id": 31, "product_id": [5, "Cotton Roll"], "product_qty": 2}));
    service.seed(models::BOM_LINE, json!({"id": 32, "product_id": [6, "Button"], "product_qty": 4}));
    service.seed(models::BOM, json!({
        "id": 20, "code": "GS-BOM", "product_tmpl_id": [11, "Golf Shirt"], "product_id": false,
        "active": true, "bom_line_ids": [31, 32],
    }));
    service.seed(models::STOCK_LOCATION, json!({"id": 8, "name": "Stock", "complete_name": "WH/Stock", "usage": "internal"}));
    service.seed(models::STOCK_LOCATION, json!({"id": 4, "name": "Customers", "complete_name": "Partners/Customers", "usage": "customer"}));
    service.seed(models::STOCK_QUANT, json!({"product_id": [5, "Cotton Roll"], "location_id": [8, "WH/Stock"], "quantity": 15}));
    service.seed(models::STOCK_QUANT, json!({"product_id": [6, "Button"], "location_id": [8, "WH/Stock"], "quantity": 100}));
    service
}

#[test]
fn test_stock_update_is_idempotent() {
    let service = apparel_erp();
    let config = OperationConfig::new();
    let journal = Journal::default();
    let ops = Operations::new(&service, &config, &journal);

    let request = StockUpdateRequest {
        product_code: Some("CR-01".to_string()),
        quantity: Decimal::from(40),
        ..StockUpdateRequest::default()
    };

    let first = ops.update_stock(&request);
    let first = first.data().unwrap();
    assert!(first.adjustment.adjusted);
    assert_eq!(first.adjustment.difference, Decimal::from(25));

    let second = ops.update_stock(&request);
    let second = second.data().unwrap();
    assert!(!second.adjustment.adjusted);
    assert_eq!(second.adjustment.message, "No change needed");
    assert_eq!(service.call_count(CallKind::Mutate, models::STOCK_QUANT), 1);
}

#[test]
fn test_shortage_scales_with_production_quantity() {
    let service = apparel_erp();
    let config = OperationConfig::new();
    let calculator = AvailabilityCalculator::new(&service, &config);

    let lines = vec![BomLine::new(5, "Cotton Roll", Decimal::from(2))];
    let components = calculator.compute(&lines, Decimal::from(10)).unwrap();

    assert_eq!(components[0].qty_required, Decimal::from(20));
    assert_eq!(components[0].qty_available, Decimal::from(15));
    assert_eq!(components[0].shortage, Some(Decimal::from(5)));
}

#[test]
fn test_duplicate_names_resolve_to_lowest_id() {
    let service = MemoryService::new();
    service.seed(models::PARTNER, json!({"id": 7, "name": "Golf Shirt", "customer_rank": 1}));
    service.seed(models::PARTNER, json!({"id": 3, "name": "Golf Shirt", "customer_rank": 1}));
    let config = OperationConfig::new();
    let resolver = EntityResolver::new(&service, &config);

    for reverse in [false, true] {
        service.reverse_results(reverse);
        let resolved = resolver
            .resolve(&ResolutionTarget::customer(), &ResolutionQuery::by_name("Golf Shirt"))
            .unwrap();
        assert_eq!(resolved.record.id, 3);
        assert!(resolved.warning.is_some());
    }
}

#[test]
fn test_sales_order_total_with_discount() {
    let service = apparel_erp();
    let config = OperationConfig::new();
    let sink = MemorySink::new();
    let journal = Journal::new(sink.clone());
    let ops = Operations::new(&service, &config, &journal);

    let outcome = ops.create_sales_order(&SalesOrderRequest {
        customer_name: Some("Golf Club".to_string()),
        lines: vec![LineInput::by_name("Golf Shirt", Decimal::from(3)).with_discount(Decimal::from(10))],
        commitment_date: NaiveDate::from_ymd_opt(2026, 11, 30),
        auto_confirm: true,
        ..SalesOrderRequest::default()
    });

    let summary = outcome.data().unwrap();
    assert_eq!(summary.document.total_amount, Decimal::new(27000, 2));
    assert_eq!(summary.document.state, "sale");
    assert_eq!(summary.document.reference, "S00001");

    let entries = sink.entries();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].status, EntryStatus::Success);
}

#[rstest]
#[case("missing permission for operation", ErrorCategory::Permission)]
#[case("Could not authenticate: invalid key", ErrorCategory::Authentication)]
#[case("Record does not exist or has been deleted", ErrorCategory::NotFound)]
#[case("duplicate key value violates unique constraint", ErrorCategory::DataIntegrity)]
#[case("Request timeout after 30s", ErrorCategory::Connection)]
#[case("something odd happened", ErrorCategory::Unknown)]
fn test_error_classification(#[case] message: &str, #[case] expected: ErrorCategory) {
    assert_eq!(ErrorClassifier::classify(message), expected);
}

#[test]
fn test_failed_second_line_reports_committed_records() {
    let service = apparel_erp();
    service.fail_after(CallKind::Insert, models::SALE_ORDER_LINE, 1, "Connection reset by peer");
    let config = OperationConfig::new();
    let sink = MemorySink::new();
    let journal = Journal::new(sink.clone());
    let ops = Operations::new(&service, &config, &journal);

    let outcome = ops.create_sales_order(&SalesOrderRequest {
        customer_id: Some(3),
        lines: vec![
            LineInput::by_name("Golf Shirt", Decimal::ONE),
            LineInput::by_name("Golf Shirt", Decimal::from(2)),
        ],
        ..SalesOrderRequest::default()
    });

    let report = outcome.error().unwrap();
    assert_eq!(report.error_type, ErrorCategory::Connection);

    let header = &service.records(models::SALE_ORDER)[0];
    let lines = service.records(models::SALE_ORDER_LINE);
    assert_eq!(lines.len(), 1);

    let context = report.context.as_ref().unwrap();
    assert_eq!(context["header_id"], header.id);
    assert_eq!(context["committed_line_ids"], json!([lines[0].id]));
    assert_eq!(context["rolled_back"], false);
    assert_eq!(sink.entries()[0].status, EntryStatus::Error);
}

#[test]
fn test_compensation_removes_partial_order() {
    let service = apparel_erp();
    service.fail_after(CallKind::Insert, models::SALE_ORDER_LINE, 1, "Connection reset by peer");
    let config = OperationConfig::new().with_partial_commit(PartialCommitPolicy::Compensate);
    let journal = Journal::default();
    let ops = Operations::new(&service, &config, &journal);

    let outcome = ops.create_sales_order(&SalesOrderRequest {
        customer_id: Some(3),
        lines: vec![
            LineInput::by_id(1, Decimal::ONE),
            LineInput::by_id(1, Decimal::from(2)),
        ],
        ..SalesOrderRequest::default()
    });

    let context = outcome.error().unwrap().context.clone().unwrap();
    assert_eq!(context["rolled_back"], true);
    assert!(service.records(models::SALE_ORDER).is_empty());
    assert!(service.records(models::SALE_ORDER_LINE).is_empty());
}

#[test]
fn test_manufacturing_then_restock_flow() {
    let service = apparel_erp();
    let config = OperationConfig::new();
    let sink = MemorySink::new();
    let journal = Journal::new(sink.clone());
    let ops = Operations::new(&service, &config, &journal);

    let request = ManufacturingOrderRequest {
        product_name: Some("Golf Shirt".to_string()),
        quantity: Decimal::from(10),
        auto_confirm: true,
        ..ManufacturingOrderRequest::default()
    };

    // 布料 15 < 需求 20，製令保持草稿
    let first = ops.create_manufacturing_order(&request);
    let first = first.data().unwrap();
    assert!(first.has_shortages);
    assert_eq!(first.state, "draft");
    assert_eq!(first.bom_code, "GS-BOM");

    let import = ops.import_inventory(&InventoryImportRequest {
        rows: vec![ImportRow {
            product_code: Some("CR-01".to_string()),
            quantity: Decimal::from(25),
            ..ImportRow::default()
        }],
        dry_run: false,
    });
    assert!(import.is_success());

    let second = ops.create_manufacturing_order(&request);
    let second = second.data().unwrap();
    assert!(!second.has_shortages);
    assert_eq!(second.state, "confirmed");
    assert_eq!(second.reference, "WH/MO/00002");

    let operations: Vec<String> = sink.entries().into_iter().map(|e| e.operation).collect();
    assert_eq!(
        operations,
        vec!["create_manufacturing_order", "import_inventory", "create_manufacturing_order"]
    );
}

#[test]
fn test_inventory_report_serializes_with_status() {
    let service = apparel_erp();
    let config = OperationConfig::new();
    let journal = Journal::default();
    let ops = Operations::new(&service, &config, &journal);

    let outcome = ops.inventory_report(&InventoryReportRequest::default());
    let value = serde_json::to_value(&outcome).unwrap();

    assert_eq!(value["status"], "success");
    assert_eq!(value["data"]["location"], "All");
    assert_eq!(value["data"]["summary"]["total_products"], 2);
    assert_eq!(value["data"]["summary"]["low_stock_items"], 1);
    assert_eq!(value["data"]["rows"][0]["product"], "Cotton Roll");
}

#[test]
fn test_sales_report_lists_confirmed_orders_only() {
    let service = apparel_erp();
    let config = OperationConfig::new();
    let journal = Journal::default();
    let ops = Operations::new(&service, &config, &journal);

    for auto_confirm in [true, false] {
        let outcome = ops.create_sales_order(&SalesOrderRequest {
            customer_id: Some(3),
            lines: vec![LineInput::by_id(1, Decimal::from(2))],
            auto_confirm,
            ..SalesOrderRequest::default()
        });
        assert!(outcome.is_success());
    }

    let outcome = ops.sales_report(&OrderReportRequest {
        partner_id: Some(3),
        ..OrderReportRequest::default()
    });
    let value = serde_json::to_value(&outcome).unwrap();

    assert_eq!(value["status"], "success");
    assert_eq!(value["data"]["kind"], serde_json::to_value(erp::erp_calc::DocumentKind::Sales).unwrap());
    assert_eq!(value["data"]["summary"]["total_orders"], 1);
    assert_eq!(value["data"]["orders"][0]["reference"], "S00001");
    assert_eq!(value["data"]["orders"][0]["state"], "sale");
}
