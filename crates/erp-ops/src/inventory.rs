//! 庫存調整與批量匯入

use erp_calc::{Adjustment, EntityResolver, QuantityReconciler, ResolutionQuery, ResolutionTarget};
use erp_core::{ErpError, ErpService, Record, RecordId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::validation::{require_identifier, require_non_negative};
use crate::{input_value, Completed, Operations, Outcome};

/// 單筆庫存調整請求
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StockUpdateRequest {
    pub product_id: Option<RecordId>,
    pub product_name: Option<String>,

    /// 物料內部代碼
    pub product_code: Option<String>,

    pub location_id: Option<RecordId>,

    /// 庫位完整路徑或名稱，未指定時使用預設庫位
    pub location: Option<String>,

    /// 目標數量（>= 0）
    pub quantity: Decimal,
}

impl StockUpdateRequest {
    fn product_query(&self) -> ResolutionQuery {
        ResolutionQuery::from_parts(
            self.product_id,
            self.product_code.as_deref(),
            self.product_name.as_deref(),
        )
    }
}

/// 調整結果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockUpdate {
    pub product: String,
    pub location: String,

    #[serde(flatten)]
    pub adjustment: Adjustment,
}

/// 批量匯入的一列
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImportRow {
    /// 來源列號（未指定時以順序編號，從 1 起算）
    pub row: Option<usize>,

    pub product_code: Option<String>,
    pub product_name: Option<String>,
    pub location: Option<String>,
    pub quantity: Decimal,
}

/// 批量匯入請求
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InventoryImportRequest {
    pub rows: Vec<ImportRow>,

    /// 只計算，不寫入
    pub dry_run: bool,
}

/// 略過的列
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowError {
    pub row: usize,
    pub error: String,
}

/// 已處理的列
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RowAdjustment {
    pub row: usize,
    pub product: String,
    pub location: String,

    #[serde(flatten)]
    pub adjustment: Adjustment,
}

/// 批量匯入摘要
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ImportSummary {
    pub total_rows: usize,
    pub processed: usize,
    pub adjusted: usize,
    pub unchanged: usize,
    pub skipped: usize,
    pub dry_run: bool,
    pub errors: Vec<RowError>,
    pub adjustments: Vec<RowAdjustment>,
}

impl<'a, S: ErpService> Operations<'a, S> {
    /// 將單一物料於單一庫位的數量設為目標值
    pub fn update_stock(&self, request: &StockUpdateRequest) -> Outcome<StockUpdate> {
        self.run("update_stock", input_value(request), || {
            require_identifier(&request.product_query(), "Product")?;
            require_non_negative(request.quantity, "quantity")?;

            let resolver = EntityResolver::new(self.service, self.config);
            let product = resolver
                .resolve(&ResolutionTarget::stocked_product(), &request.product_query())?
                .record;
            let location =
                self.resolve_location(&resolver, request.location_id, request.location.as_deref())?;

            let adjustment = QuantityReconciler::new(self.service, self.config).update(
                product.id,
                location.id,
                request.quantity,
            )?;

            let update = StockUpdate {
                product: product.name().to_string(),
                location: location_name(&location),
                adjustment,
            };
            let message = format!(
                "Stock for {} at {}: {}",
                update.product, update.location, update.adjustment.message
            );
            Ok(Completed::new(update, message))
        })
    }

    /// 批量匯入庫存數量
    ///
    /// 找不到物料或庫位等逐列錯誤會被略過並收集；有略過時狀態為 `partial`。
    pub fn import_inventory(&self, request: &InventoryImportRequest) -> Outcome<ImportSummary> {
        self.run("import_inventory", input_value(request), || {
            if request.rows.is_empty() {
                return Err(ErpError::validation("At least one inventory row is required"));
            }

            let resolver = EntityResolver::new(self.service, self.config);
            let reconciler = QuantityReconciler::new(self.service, self.config);
            let mut summary = ImportSummary {
                total_rows: request.rows.len(),
                dry_run: request.dry_run,
                ..ImportSummary::default()
            };

            for (index, row) in request.rows.iter().enumerate() {
                let number = row.row.unwrap_or(index + 1);
                match self.import_row(&resolver, &reconciler, row, number, request.dry_run) {
                    Ok(result) => {
                        if result.adjustment.adjusted {
                            summary.adjusted += 1;
                        } else {
                            summary.unchanged += 1;
                        }
                        summary.processed += 1;
                        summary.adjustments.push(result);
                    }
                    Err(err) => {
                        tracing::warn!("第 {} 列略過: {}", number, err);
                        summary.skipped += 1;
                        summary.errors.push(RowError {
                            row: number,
                            error: err.to_string(),
                        });
                    }
                }
            }

            let message = format!(
                "Inventory import{}: {} processed, {} adjusted, {} unchanged, {} skipped",
                if request.dry_run { " (DRY RUN)" } else { "" },
                summary.processed,
                summary.adjusted,
                summary.unchanged,
                summary.skipped
            );
            let partial = summary.skipped > 0;
            Ok(Completed::new(summary, message).partial(partial))
        })
    }

    fn import_row(
        &self,
        resolver: &EntityResolver<'_, S>,
        reconciler: &QuantityReconciler<'_, S>,
        row: &ImportRow,
        number: usize,
        dry_run: bool,
    ) -> erp_core::Result<RowAdjustment> {
        let query = ResolutionQuery::from_parts(
            None,
            row.product_code.as_deref(),
            row.product_name.as_deref(),
        );
        if query.is_empty() {
            return Err(ErpError::validation("No product identifier"));
        }
        require_non_negative(row.quantity, "quantity")?;

        let product = resolver.resolve(&ResolutionTarget::stocked_product(), &query)?.record;
        let location = self.resolve_location(resolver, None, row.location.as_deref())?;

        let adjustment = if dry_run {
            reconciler.preview(product.id, location.id, row.quantity)?
        } else {
            reconciler.update(product.id, location.id, row.quantity)?
        };

        Ok(RowAdjustment {
            row: number,
            product: product.name().to_string(),
            location: location_name(&location),
            adjustment,
        })
    }

    /// 庫位解析：完整路徑精確比對，其次為指定用途庫位的部分比對
    fn resolve_location(
        &self,
        resolver: &EntityResolver<'_, S>,
        location_id: Option<RecordId>,
        location: Option<&str>,
    ) -> erp_core::Result<Record> {
        let path = location
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .unwrap_or(self.config.default_location.as_str());
        let query = ResolutionQuery::from_parts(location_id, Some(path), Some(path));
        let target = ResolutionTarget::location(&self.config.stock_location_usage);
        Ok(resolver.resolve(&target, &query)?.record)
    }
}

fn location_name(location: &Record) -> String {
    location
        .str_field("complete_name")
        .unwrap_or(location.name())
        .to_string()
}
