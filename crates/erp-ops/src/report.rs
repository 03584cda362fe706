//! 報表：庫存、銷售、採購、製造與 BOM 成本

use chrono::NaiveDate;
use erp_calc::{BomLocator, DocumentKind, EntityResolver, ResolutionQuery, ResolutionTarget};
use erp_core::order::round_money;
use erp_core::{
    models, Condition, Domain, ErpError, ErpService, Operator, RecordId, SearchOptions,
    StockSnapshot,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};

use crate::validation::require_non_negative;
use crate::{input_value, Completed, Operations, Outcome};

/// 訂單報表每筆訂單列出的行數上限
const LINE_SUMMARY_LIMIT: usize = 5;

/// 庫存報表請求
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InventoryReportRequest {
    /// 庫位路徑過濾（部分比對）
    pub location: Option<String>,

    /// 低庫存門檻
    pub threshold: Decimal,

    /// 只列出低於門檻的項目
    pub low_stock_only: bool,

    /// 以成本計算庫存價值
    pub include_value: bool,
}

impl Default for InventoryReportRequest {
    fn default() -> Self {
        Self {
            location: None,
            threshold: Decimal::from(50),
            low_stock_only: false,
            include_value: false,
        }
    }
}

/// 報表列（物料 × 庫位）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockRow {
    pub product_id: RecordId,
    pub product: String,
    pub location_id: RecordId,
    pub location: String,
    pub on_hand: Decimal,
    pub reserved: Decimal,
    pub available: Decimal,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit_cost: Option<Decimal>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_value: Option<Decimal>,
}

/// 報表摘要
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportSummary {
    pub total_products: usize,
    pub total_value: Option<Decimal>,
    pub low_stock_items: usize,
}

/// 庫存報表
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InventoryReport {
    /// 過濾的庫位，未過濾為 "All"
    pub location: String,
    pub threshold: Decimal,
    pub summary: ReportSummary,

    /// 依可用量遞增排序
    pub rows: Vec<StockRow>,
}

/// 彙總中的物料 × 庫位
struct Aggregate {
    product: String,
    location: String,
    on_hand: Decimal,
    reserved: Decimal,
}

impl<'a, S: ErpService> Operations<'a, S> {
    /// 產生庫存報表
    pub fn inventory_report(&self, request: &InventoryReportRequest) -> Outcome<InventoryReport> {
        self.run("inventory_report", input_value(request), || {
            let report = self.build_report(request)?;
            let message = format!(
                "Inventory report: {} rows, {} below threshold {}",
                report.summary.total_products, report.summary.low_stock_items, report.threshold
            );
            Ok(Completed::new(report, message))
        })
    }

    fn build_report(&self, request: &InventoryReportRequest) -> erp_core::Result<InventoryReport> {
        require_non_negative(request.threshold, "threshold")?;

        let mut domain = Domain::new().and(Condition::eq(
            "usage",
            self.config.stock_location_usage.as_str(),
        ));
        if let Some(location) = request.location.as_deref().filter(|l| !l.trim().is_empty()) {
            domain = domain.and(Condition::ilike("complete_name", location.trim()));
        }
        let locations: HashMap<RecordId, String> = self
            .service
            .find(models::STOCK_LOCATION, &domain, &["complete_name"], &SearchOptions::new())?
            .into_iter()
            .map(|r| {
                let name = r.str_field("complete_name").unwrap_or_default().to_string();
                (r.id, name)
            })
            .collect();

        let mut aggregates: BTreeMap<(RecordId, RecordId), Aggregate> = BTreeMap::new();
        if !locations.is_empty() {
            let mut location_ids: Vec<RecordId> = locations.keys().copied().collect();
            location_ids.sort_unstable();
            let domain = Domain::new().and(Condition::is_in(
                "location_id",
                location_ids.into_iter().map(Value::from).collect(),
            ));
            let quants = self.service.find(
                models::STOCK_QUANT,
                &domain,
                &["product_id", "location_id", "quantity", "reserved_quantity"],
                &SearchOptions::new().with_order("id"),
            )?;

            for quant in &quants {
                let snapshot = StockSnapshot::from_quant(quant)?;
                let entry = aggregates
                    .entry((snapshot.product_id, snapshot.location_id))
                    .or_insert_with(|| Aggregate {
                        product: quant.many2one_name("product_id").unwrap_or_default().to_string(),
                        location: locations
                            .get(&snapshot.location_id)
                            .cloned()
                            .unwrap_or_default(),
                        on_hand: Decimal::ZERO,
                        reserved: Decimal::ZERO,
                    });
                entry.on_hand += snapshot.on_hand;
                entry.reserved += snapshot.reserved;
            }
        }

        let costs = if request.include_value {
            self.unit_costs(aggregates.keys().map(|(product_id, _)| *product_id))?
        } else {
            HashMap::new()
        };

        let mut rows = Vec::new();
        let mut low_stock_items = 0;
        for ((product_id, location_id), item) in aggregates {
            let available = item.on_hand - item.reserved;
            let is_low = available < request.threshold;
            if request.low_stock_only && !is_low {
                continue;
            }
            if is_low {
                low_stock_items += 1;
            }

            let unit_cost = request
                .include_value
                .then(|| costs.get(&product_id).copied().unwrap_or(Decimal::ZERO));
            rows.push(StockRow {
                product_id,
                product: item.product,
                location_id,
                location: item.location,
                on_hand: item.on_hand.round_dp(2),
                reserved: item.reserved.round_dp(2),
                available: available.round_dp(2),
                unit_cost: unit_cost.map(round_money),
                total_value: unit_cost.map(|cost| round_money(item.on_hand * cost)),
            });
        }
        rows.sort_by(|a, b| a.available.cmp(&b.available));

        let total_value = request.include_value.then(|| {
            round_money(rows.iter().filter_map(|r| r.total_value).sum::<Decimal>())
        });

        Ok(InventoryReport {
            location: request
                .location
                .clone()
                .unwrap_or_else(|| "All".to_string()),
            threshold: request.threshold,
            summary: ReportSummary {
                total_products: rows.len(),
                total_value,
                low_stock_items,
            },
            rows,
        })
    }

    /// 物料成本（單次讀取）
    fn unit_costs(
        &self,
        product_ids: impl Iterator<Item = RecordId>,
    ) -> erp_core::Result<HashMap<RecordId, Decimal>> {
        let mut ids: Vec<RecordId> = product_ids.collect();
        ids.sort_unstable();
        ids.dedup();
        if ids.is_empty() {
            return Ok(HashMap::new());
        }
        Ok(self
            .service
            .fetch(models::PRODUCT, &ids, &["standard_price"])?
            .into_iter()
            .map(|p| (p.id, p.decimal_or_zero("standard_price")))
            .collect())
    }
}

/// 訂單報表請求（銷售與採購共用）
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrderReportRequest {
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,

    /// 客戶（銷售）或供應商（採購）
    #[serde(alias = "customer_id", alias = "vendor_id")]
    pub partner_id: Option<RecordId>,

    /// 未指定時只列已確認與已完成的訂單
    pub state: Option<String>,
}

/// 訂單報表列
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderReportRow {
    pub order_id: RecordId,
    pub reference: String,
    pub date: Option<String>,
    pub partner: String,

    /// 前幾行的摘要，例如 `Golf Shirt x 3`
    pub products: Vec<String>,

    pub total: Decimal,
    pub state: String,

    /// 預計到貨日期（採購）
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_date: Option<String>,
}

/// 訂單報表摘要
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderReportSummary {
    pub total_orders: usize,

    /// 營收（銷售）或支出（採購）
    pub total_amount: Decimal,
    pub average_order_value: Decimal,
}

/// 銷售或採購訂單報表
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderReport {
    pub kind: DocumentKind,

    /// 例如 `2026-10-01 to now`
    pub period: String,
    pub summary: OrderReportSummary,

    /// 依訂單日期遞減
    pub orders: Vec<OrderReportRow>,
}

/// 製造報表請求
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ManufacturingReportRequest {
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
    pub product_id: Option<RecordId>,
    pub state: Option<String>,
}

/// 製令列
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductionRow {
    pub production_id: RecordId,
    pub reference: String,
    pub product: String,
    pub quantity: Decimal,
    pub state: String,
    pub scheduled_start: Option<String>,
    pub origin: Option<String>,
}

/// 製造報表摘要
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductionReportSummary {
    pub total_orders: usize,
    pub in_progress: usize,
    pub completed: usize,
    pub cancelled: usize,

    /// 已完成製令的數量合計
    pub total_produced: Decimal,

    /// 各狀態製令數
    pub by_state: BTreeMap<String, usize>,
}

/// 製造報表
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManufacturingReport {
    pub period: String,
    pub summary: ProductionReportSummary,

    /// 依預計開工日遞增
    pub orders: Vec<ProductionRow>,
}

/// BOM 成本報表請求
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BomReportRequest {
    /// 指定 BOM；未指定時依物料查找
    pub bom_id: Option<RecordId>,

    pub product_id: Option<RecordId>,
    pub product_name: Option<String>,

    /// 以物料成本計算組件成本
    pub include_costs: bool,
}

/// BOM 組件列
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BomComponentRow {
    pub product_id: RecordId,
    pub product: String,

    /// 每單位成品用量
    pub quantity: Decimal,
    pub uom: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit_cost: Option<Decimal>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_cost: Option<Decimal>,
}

/// BOM 報表摘要
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BomReportSummary {
    pub total_components: usize,
    pub total_cost: Option<Decimal>,
}

/// BOM 成本報表
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BomReport {
    pub bom_id: RecordId,
    pub product: String,

    /// BOM 代碼，未設定時為 `BOM/<成品名稱>`
    pub bom_ref: String,
    pub summary: BomReportSummary,
    pub components: Vec<BomComponentRow>,
}

impl<'a, S: ErpService> Operations<'a, S> {
    /// 產生銷售報表
    pub fn sales_report(&self, request: &OrderReportRequest) -> Outcome<OrderReport> {
        self.run("sales_report", input_value(request), || {
            let report = self.order_report(DocumentKind::Sales, request)?;
            let message = format!(
                "Sales report: {} orders, total revenue {}",
                report.summary.total_orders, report.summary.total_amount
            );
            Ok(Completed::new(report, message))
        })
    }

    /// 產生採購報表
    pub fn purchase_report(&self, request: &OrderReportRequest) -> Outcome<OrderReport> {
        self.run("purchase_report", input_value(request), || {
            let report = self.order_report(DocumentKind::Purchase, request)?;
            let message = format!(
                "Purchase report: {} orders, total spent {}",
                report.summary.total_orders, report.summary.total_amount
            );
            Ok(Completed::new(report, message))
        })
    }

    /// 產生製造報表
    pub fn manufacturing_report(
        &self,
        request: &ManufacturingReportRequest,
    ) -> Outcome<ManufacturingReport> {
        self.run("manufacturing_report", input_value(request), || {
            let report = self.build_manufacturing_report(request)?;
            let message = format!(
                "Manufacturing report: {} orders, {} completed",
                report.summary.total_orders, report.summary.completed
            );
            Ok(Completed::new(report, message))
        })
    }

    /// 產生 BOM 成本報表
    pub fn bom_report(&self, request: &BomReportRequest) -> Outcome<BomReport> {
        self.run("bom_report", input_value(request), || {
            let report = self.build_bom_report(request)?;
            let message = format!(
                "BOM report for {}: {} components",
                report.product, report.summary.total_components
            );
            Ok(Completed::new(report, message))
        })
    }

    fn order_report(
        &self,
        kind: DocumentKind,
        request: &OrderReportRequest,
    ) -> erp_core::Result<OrderReport> {
        check_period(request.date_from, request.date_to)?;

        let mut domain = period_domain("date_order", request.date_from, request.date_to);
        if let Some(partner_id) = request.partner_id {
            domain = domain.and(Condition::eq("partner_id", partner_id));
        }
        domain = match request.state.as_deref().filter(|s| !s.trim().is_empty()) {
            Some(state) => domain.and(Condition::eq("state", state)),
            None => domain.and(Condition::is_in(
                "state",
                vec![Value::from(confirmed_state(kind)), Value::from("done")],
            )),
        };

        let mut fields = vec![
            "name",
            "date_order",
            "partner_id",
            "amount_total",
            "state",
            "order_line",
        ];
        if kind == DocumentKind::Purchase {
            fields.push("date_planned");
        }
        let orders = self.service.find(
            kind.header_model(),
            &domain,
            &fields,
            &SearchOptions::new().with_order("date_order desc"),
        )?;

        let mut rows = Vec::with_capacity(orders.len());
        for order in &orders {
            rows.push(OrderReportRow {
                order_id: order.id,
                reference: order.name().to_string(),
                date: date_part(order.str_field("date_order")),
                partner: order.many2one_name("partner_id").unwrap_or("Unknown").to_string(),
                products: self.line_summary(kind, &order.ids("order_line"))?,
                total: round_money(order.decimal_or_zero("amount_total")),
                state: order.str_field("state").unwrap_or_default().to_string(),
                expected_date: date_part(order.str_field("date_planned")),
            });
        }

        let total_amount = round_money(rows.iter().map(|r| r.total).sum::<Decimal>());
        let average_order_value = if rows.is_empty() {
            Decimal::ZERO
        } else {
            round_money(total_amount / Decimal::from(rows.len()))
        };
        tracing::debug!("{} 報表: {} 筆訂單", kind.label(), rows.len());

        Ok(OrderReport {
            kind,
            period: period_label(request.date_from, request.date_to),
            summary: OrderReportSummary {
                total_orders: rows.len(),
                total_amount,
                average_order_value,
            },
            orders: rows,
        })
    }

    /// 訂單前幾行的「物料 x 數量」摘要
    fn line_summary(
        &self,
        kind: DocumentKind,
        line_ids: &[RecordId],
    ) -> erp_core::Result<Vec<String>> {
        let head = &line_ids[..line_ids.len().min(LINE_SUMMARY_LIMIT)];
        if head.is_empty() {
            return Ok(Vec::new());
        }
        let quantity_field = kind.quantity_field();
        Ok(self
            .service
            .fetch(kind.line_model(), head, &["product_id", quantity_field])?
            .iter()
            .filter_map(|line| {
                let product = line.many2one_name("product_id")?;
                Some(format!("{} x {}", product, line.decimal_or_zero(quantity_field).trunc()))
            })
            .collect())
    }

    fn build_manufacturing_report(
        &self,
        request: &ManufacturingReportRequest,
    ) -> erp_core::Result<ManufacturingReport> {
        check_period(request.date_from, request.date_to)?;

        let mut domain = period_domain("date_planned_start", request.date_from, request.date_to);
        if let Some(product_id) = request.product_id {
            domain = domain.and(Condition::eq("product_id", product_id));
        }
        if let Some(state) = request.state.as_deref().filter(|s| !s.trim().is_empty()) {
            domain = domain.and(Condition::eq("state", state));
        }

        let productions = self.service.find(
            models::PRODUCTION,
            &domain,
            &["name", "product_id", "product_qty", "state", "date_planned_start", "origin"],
            &SearchOptions::new().with_order("date_planned_start"),
        )?;

        let mut by_state: BTreeMap<String, usize> = BTreeMap::new();
        let mut total_produced = Decimal::ZERO;
        let mut rows = Vec::with_capacity(productions.len());
        for production in &productions {
            let state = production.str_field("state").unwrap_or("draft").to_string();
            let quantity = production.decimal_or_zero("product_qty");
            *by_state.entry(state.clone()).or_default() += 1;
            if state == "done" {
                total_produced += quantity;
            }
            rows.push(ProductionRow {
                production_id: production.id,
                reference: production.name().to_string(),
                product: production
                    .many2one_name("product_id")
                    .unwrap_or("Unknown")
                    .to_string(),
                quantity,
                state,
                scheduled_start: date_part(production.str_field("date_planned_start")),
                origin: production.str_field("origin").map(str::to_string),
            });
        }

        let count = |state: &str| by_state.get(state).copied().unwrap_or(0);
        let summary = ProductionReportSummary {
            total_orders: rows.len(),
            in_progress: count("progress"),
            completed: count("done"),
            cancelled: count("cancel"),
            total_produced,
            by_state,
        };

        Ok(ManufacturingReport {
            period: period_label(request.date_from, request.date_to),
            summary,
            orders: rows,
        })
    }

    fn build_bom_report(&self, request: &BomReportRequest) -> erp_core::Result<BomReport> {
        let query = ResolutionQuery::from_parts(request.product_id, None, request.product_name.as_deref());
        if request.bom_id.is_none() && query.is_empty() {
            return Err(ErpError::validation(
                "Either bom_id or a product id or name is required for BOM report",
            ));
        }

        let locator = BomLocator::new(self.service);
        let (bom, product_name) = match request.bom_id {
            Some(bom_id) => (locator.fetch(bom_id)?, None),
            None => {
                let product = EntityResolver::new(self.service, self.config)
                    .resolve(&ResolutionTarget::stocked_product(), &query)?
                    .record;
                (locator.locate(product.id, None)?, Some(product.name().to_string()))
            }
        };
        let product = bom
            .product
            .clone()
            .or(product_name)
            .unwrap_or_else(|| "Unknown".to_string());

        let lines = locator.lines(&bom)?;
        let costs = if request.include_costs {
            self.unit_costs(lines.iter().map(|l| l.product_id))?
        } else {
            HashMap::new()
        };

        let components: Vec<BomComponentRow> = lines
            .into_iter()
            .map(|line| {
                let unit_cost = request
                    .include_costs
                    .then(|| costs.get(&line.product_id).copied().unwrap_or(Decimal::ZERO));
                BomComponentRow {
                    product_id: line.product_id,
                    product: line.product,
                    unit_cost: unit_cost.map(round_money),
                    total_cost: unit_cost.map(|cost| round_money(line.qty_per_unit * cost)),
                    quantity: line.qty_per_unit,
                    uom: line.uom,
                }
            })
            .collect();

        let total_cost = request.include_costs.then(|| {
            round_money(components.iter().filter_map(|c| c.total_cost).sum::<Decimal>())
        });

        Ok(BomReport {
            bom_id: bom.id,
            bom_ref: bom.code.clone().unwrap_or_else(|| format!("BOM/{}", product)),
            product,
            summary: BomReportSummary {
                total_components: components.len(),
                total_cost,
            },
            components,
        })
    }
}

fn confirmed_state(kind: DocumentKind) -> &'static str {
    match kind {
        DocumentKind::Sales => "sale",
        DocumentKind::Purchase => "purchase",
    }
}

fn check_period(from: Option<NaiveDate>, to: Option<NaiveDate>) -> erp_core::Result<()> {
    if let (Some(from), Some(to)) = (from, to) {
        if from > to {
            return Err(ErpError::validation(format!(
                "'date_from' ({}) must not be after 'date_to' ({})",
                from, to
            )));
        }
    }
    Ok(())
}

/// 日期區間條件；結束日包含當天整天
fn period_domain(field: &str, from: Option<NaiveDate>, to: Option<NaiveDate>) -> Domain {
    let mut domain = Domain::new();
    if let Some(from) = from {
        domain = domain.and(Condition::new(field, Operator::Ge, from.to_string()));
    }
    if let Some(to) = to {
        domain = domain.and(Condition::new(field, Operator::Le, format!("{} 23:59:59", to)));
    }
    domain
}

fn period_label(from: Option<NaiveDate>, to: Option<NaiveDate>) -> String {
    format!(
        "{} to {}",
        from.map_or_else(|| "all".to_string(), |d| d.to_string()),
        to.map_or_else(|| "now".to_string(), |d| d.to_string())
    )
}

/// 日期時間字串的日期部分
fn date_part(value: Option<&str>) -> Option<String> {
    value.map(|v| v.chars().take(10).collect())
}
