//! 庫存數量調整

use erp_core::record::decimal_value;
use erp_core::{models, Condition, Domain, ErpService, OperationConfig, RecordId, SearchOptions};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// 調整結果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Adjustment {
    pub product_id: RecordId,
    pub location_id: RecordId,

    /// 是否實際寫入
    pub adjusted: bool,

    /// 調整前數量
    pub old_qty: Decimal,

    /// 調整後數量
    pub new_qty: Decimal,

    /// 差異（無需調整時為 0）
    pub difference: Decimal,

    pub message: String,
}

impl Adjustment {
    fn compute(
        product_id: RecordId,
        location_id: RecordId,
        current: Decimal,
        target: Decimal,
        epsilon: Decimal,
    ) -> Self {
        let difference = target - current;
        if difference.abs() < epsilon {
            return Self {
                product_id,
                location_id,
                adjusted: false,
                old_qty: current.round_dp(2),
                new_qty: current.round_dp(2),
                difference: Decimal::ZERO,
                message: "No change needed".to_string(),
            };
        }

        let sign = if difference > Decimal::ZERO { "+" } else { "" };
        let difference = difference.round_dp(2);
        Self {
            product_id,
            location_id,
            adjusted: true,
            old_qty: current.round_dp(2),
            new_qty: target.round_dp(2),
            difference,
            message: format!("Adjusted by {}{:.2}", sign, difference),
        }
    }
}

/// 庫存數量調整器
///
/// `update` 將數量直接設為目標值（SET，非增量），重複呼叫結果相同。
/// 同一 `(物料, 庫位)` 的並行更新為後寫者勝，需由呼叫方序列化。
///
/// 有多筆 quant 時只覆寫 ID 最小的一筆，其餘不動；此時加總會是
/// 目標值加上其餘 quant 的數量。
pub struct QuantityReconciler<'a, S: ErpService> {
    service: &'a S,
    config: &'a OperationConfig,
}

impl<'a, S: ErpService> QuantityReconciler<'a, S> {
    /// 創建新的調整器
    pub fn new(service: &'a S, config: &'a OperationConfig) -> Self {
        Self { service, config }
    }

    /// 讀取目前數量（所有符合的 quant 加總）
    pub fn current_quantity(
        &self,
        product_id: RecordId,
        location_id: RecordId,
    ) -> erp_core::Result<Decimal> {
        Ok(self
            .quants(product_id, location_id)?
            .iter()
            .map(|q| q.decimal_or_zero("quantity"))
            .sum())
    }

    /// 計算調整但不寫入
    pub fn preview(
        &self,
        product_id: RecordId,
        location_id: RecordId,
        target: Decimal,
    ) -> erp_core::Result<Adjustment> {
        let current = self.current_quantity(product_id, location_id)?;
        Ok(Adjustment::compute(
            product_id,
            location_id,
            current,
            target,
            self.config.quantity_epsilon,
        ))
    }

    /// 將庫存數量調整為目標值
    pub fn update(
        &self,
        product_id: RecordId,
        location_id: RecordId,
        target: Decimal,
    ) -> erp_core::Result<Adjustment> {
        let quants = self.quants(product_id, location_id)?;
        let current: Decimal = quants.iter().map(|q| q.decimal_or_zero("quantity")).sum();
        let adjustment = Adjustment::compute(
            product_id,
            location_id,
            current,
            target,
            self.config.quantity_epsilon,
        );
        if !adjustment.adjusted {
            tracing::debug!("物料 {} 於庫位 {} 無需調整", product_id, location_id);
            return Ok(adjustment);
        }

        match quants.first() {
            Some(quant) => {
                let mut values = erp_core::Fields::new();
                values.insert("quantity".to_string(), decimal_value(target));
                self.service.mutate(models::STOCK_QUANT, &[quant.id], values)?;
            }
            None => {
                let mut values = erp_core::Fields::new();
                values.insert("product_id".to_string(), Value::from(product_id));
                values.insert("location_id".to_string(), Value::from(location_id));
                values.insert("quantity".to_string(), decimal_value(target));
                self.service.insert(models::STOCK_QUANT, values)?;
            }
        }

        tracing::info!(
            "物料 {} 於庫位 {}: {} → {}",
            product_id,
            location_id,
            adjustment.old_qty,
            adjustment.new_qty
        );
        Ok(adjustment)
    }

    fn quants(
        &self,
        product_id: RecordId,
        location_id: RecordId,
    ) -> erp_core::Result<Vec<erp_core::Record>> {
        let domain = Domain::new()
            .and(Condition::eq("product_id", product_id))
            .and(Condition::eq("location_id", location_id));
        Ok(self.service.find(
            models::STOCK_QUANT,
            &domain,
            &["quantity", "reserved_quantity"],
            &SearchOptions::new().with_order("id"),
        )?)
    }
}
