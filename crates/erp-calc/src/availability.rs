//! 組件可用量與缺料計算

use erp_core::{
    models, BomComponent, BomLine, Condition, Domain, ErpError, ErpService, OperationConfig,
    RecordId, SearchOptions, StockSnapshot,
};
use rust_decimal::Decimal;
use serde_json::Value;

/// 可用量計算器
pub struct AvailabilityCalculator<'a, S: ErpService> {
    service: &'a S,
    config: &'a OperationConfig,
}

impl<'a, S: ErpService> AvailabilityCalculator<'a, S> {
    /// 創建新的計算器
    pub fn new(service: &'a S, config: &'a OperationConfig) -> Self {
        Self { service, config }
    }

    /// 計算各組件於指定生產規模下的需求與缺料
    pub fn compute(
        &self,
        bom_lines: &[BomLine],
        production_scale: Decimal,
    ) -> erp_core::Result<Vec<BomComponent>> {
        if production_scale <= Decimal::ZERO {
            return Err(ErpError::validation(format!(
                "Production quantity must be positive, got {}",
                production_scale
            )));
        }
        if bom_lines.is_empty() {
            return Ok(Vec::new());
        }

        let locations = self.internal_location_ids()?;
        let mut components = Vec::with_capacity(bom_lines.len());

        for line in bom_lines {
            let available = self
                .stock_for(line.product_id, &locations)?
                .iter()
                .map(StockSnapshot::available)
                .sum::<Decimal>();
            let component = BomComponent::evaluate(line, production_scale, available);

            if component.is_shortage() {
                tracing::debug!(
                    "組件 {} 缺料: 需求 {}, 可用 {}",
                    component.product,
                    component.qty_required,
                    component.qty_available
                );
            }
            components.push(component);
        }

        Ok(components)
    }

    /// 計入可用庫存的庫位ID
    pub fn internal_location_ids(&self) -> erp_core::Result<Vec<RecordId>> {
        let domain =
            Domain::new().and(Condition::eq("usage", self.config.stock_location_usage.as_str()));
        Ok(self
            .service
            .find(models::STOCK_LOCATION, &domain, &["complete_name"], &SearchOptions::new())?
            .into_iter()
            .map(|r| r.id)
            .collect())
    }

    /// 物料於指定庫位的庫存快照
    pub fn stock_for(
        &self,
        product_id: RecordId,
        locations: &[RecordId],
    ) -> erp_core::Result<Vec<StockSnapshot>> {
        if locations.is_empty() {
            return Ok(Vec::new());
        }
        let domain = Domain::new()
            .and(Condition::eq("product_id", product_id))
            .and(Condition::is_in(
                "location_id",
                locations.iter().map(|id| Value::from(*id)).collect(),
            ));
        self.service
            .find(
                models::STOCK_QUANT,
                &domain,
                &["product_id", "location_id", "quantity", "reserved_quantity"],
                &SearchOptions::new(),
            )?
            .iter()
            .map(StockSnapshot::from_quant)
            .collect()
    }
}
