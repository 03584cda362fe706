//! 製造訂單

use chrono::NaiveDate;
use erp_calc::{
    AvailabilityCalculator, BomLocator, EntityResolver, ResolutionQuery, ResolutionTarget,
};
use erp_core::record::decimal_value;
use erp_core::{models, BomComponent, ErpError, ErpService, Fields, RecordId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::validation::{require_identifier, require_positive};
use crate::{input_value, Completed, Operations, Outcome};

/// 製造訂單請求
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ManufacturingOrderRequest {
    pub product_id: Option<RecordId>,
    pub product_name: Option<String>,

    /// 生產數量（> 0）
    pub quantity: Decimal,

    /// 指定 BOM，未指定時自動查找
    pub bom_id: Option<RecordId>,

    pub scheduled_date: Option<NaiveDate>,

    /// 來源單據
    pub origin: Option<String>,

    /// 無缺料時自動確認
    pub auto_confirm: bool,
}

impl ManufacturingOrderRequest {
    fn product_query(&self) -> ResolutionQuery {
        ResolutionQuery::from_parts(self.product_id, None, self.product_name.as_deref())
    }

    fn validate(&self) -> erp_core::Result<()> {
        require_identifier(&self.product_query(), "Product")?;
        require_positive(self.quantity, "quantity")
    }
}

/// 製造訂單建立結果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductionSummary {
    pub production_id: RecordId,

    /// ERP 指派的製令編號
    pub reference: String,

    pub product: String,
    pub product_id: RecordId,
    pub quantity: Decimal,
    pub bom_id: RecordId,
    pub bom_code: String,

    pub components: Vec<BomComponent>,
    pub shortages: Vec<BomComponent>,
    pub has_shortages: bool,

    pub state: String,

    /// 缺料警告
    pub warning: Option<String>,

    /// 名稱多筆候選等非致命警告
    pub warnings: Vec<String>,
}

impl<'a, S: ErpService> Operations<'a, S> {
    /// 建立製造訂單
    ///
    /// 依生產數量計算組件缺料；要求自動確認時，僅在無缺料時確認。
    pub fn create_manufacturing_order(
        &self,
        request: &ManufacturingOrderRequest,
    ) -> Outcome<ProductionSummary> {
        self.run("create_manufacturing_order", input_value(request), || {
            let summary = self.manufacture(request)?;

            let mut message = format!(
                "Manufacturing Order {} created for {} x {}",
                summary.reference, summary.quantity, summary.product
            );
            if summary.has_shortages {
                message.push_str(&format!(
                    " (Warning: {} component shortages)",
                    summary.shortages.len()
                ));
            }
            Ok(Completed::new(summary, message))
        })
    }

    fn manufacture(
        &self,
        request: &ManufacturingOrderRequest,
    ) -> erp_core::Result<ProductionSummary> {
        request.validate()?;

        let resolver = EntityResolver::new(self.service, self.config);
        let resolved =
            resolver.resolve(&ResolutionTarget::storable_product(), &request.product_query())?;
        let mut warnings: Vec<String> = resolved.warning.iter().map(|w| w.to_string()).collect();
        let product = resolved.record;
        if product.str_field("type") != Some("product") {
            return Err(ErpError::validation(format!(
                "Product '{}' is not a storable product",
                product.name()
            )));
        }

        let locator = BomLocator::new(self.service);
        let bom = locator.locate(product.id, request.bom_id)?;
        let lines = locator.lines(&bom)?;
        let components =
            AvailabilityCalculator::new(self.service, self.config).compute(&lines, request.quantity)?;
        let shortages: Vec<BomComponent> =
            components.iter().filter(|c| c.is_shortage()).cloned().collect();

        let mut values = Fields::new();
        values.insert("product_id".to_string(), Value::from(product.id));
        values.insert("product_qty".to_string(), decimal_value(request.quantity));
        values.insert("bom_id".to_string(), Value::from(bom.id));
        if let Some(date) = request.scheduled_date {
            values.insert(
                "date_planned_start".to_string(),
                Value::from(date.format("%Y-%m-%d").to_string()),
            );
        }
        if let Some(origin) = &request.origin {
            values.insert("origin".to_string(), Value::from(origin.as_str()));
        }
        let production_id = self.service.insert(models::PRODUCTION, values)?;

        if request.auto_confirm {
            if shortages.is_empty() {
                self.service.invoke(
                    models::PRODUCTION,
                    "action_confirm",
                    vec![Value::from(vec![production_id])],
                )?;
            } else {
                tracing::warn!("製令 {} 有 {} 項缺料，略過確認", production_id, shortages.len());
                warnings.push("Auto-confirm skipped because of component shortages".to_string());
            }
        }

        let header = self
            .service
            .fetch(models::PRODUCTION, &[production_id], &["name", "state"])?
            .into_iter()
            .next()
            .ok_or_else(|| {
                ErpError::not_found("Manufacturing order", format!("with ID {}", production_id))
            })?;

        let warning = (!shortages.is_empty())
            .then(|| format!("Component shortages detected: {} items", shortages.len()));

        Ok(ProductionSummary {
            production_id,
            reference: header.name().to_string(),
            product: product.name().to_string(),
            product_id: product.id,
            quantity: request.quantity,
            bom_id: bom.id,
            bom_code: bom.code.unwrap_or_else(|| format!("BOM/{}", product.name())),
            has_shortages: !shortages.is_empty(),
            components,
            shortages,
            state: header.str_field("state").unwrap_or("draft").to_string(),
            warning,
            warnings,
        })
    }
}
