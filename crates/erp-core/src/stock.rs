//! 庫存與 BOM 組件模型

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::record::{Record, RecordId};
use crate::service::models;

/// 庫存快照（可用量為推導值，不儲存）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockSnapshot {
    /// 物料ID
    pub product_id: RecordId,

    /// 庫位ID
    pub location_id: RecordId,

    /// 現有庫存
    pub on_hand: Decimal,

    /// 已保留數量
    pub reserved: Decimal,
}

impl StockSnapshot {
    /// 創建新的庫存快照
    pub fn new(product_id: RecordId, location_id: RecordId, on_hand: Decimal) -> Self {
        Self {
            product_id,
            location_id,
            on_hand,
            reserved: Decimal::ZERO,
        }
    }

    /// 建構器模式：設置保留數量
    pub fn with_reserved(mut self, reserved: Decimal) -> Self {
        self.reserved = reserved;
        self
    }

    /// 從庫存量記錄（quant）建立
    pub fn from_quant(quant: &Record) -> crate::Result<Self> {
        let product_id = quant
            .many2one_id("product_id")
            .ok_or_else(|| crate::ErpError::malformed(models::STOCK_QUANT, "missing product_id"))?;
        let location_id = quant
            .many2one_id("location_id")
            .ok_or_else(|| crate::ErpError::malformed(models::STOCK_QUANT, "missing location_id"))?;

        Ok(Self {
            product_id,
            location_id,
            on_hand: quant.decimal_or_zero("quantity"),
            reserved: quant.decimal_or_zero("reserved_quantity"),
        })
    }

    /// 可用庫存（現有 - 保留）
    pub fn available(&self) -> Decimal {
        self.on_hand - self.reserved
    }
}

/// BOM 行
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BomLine {
    /// 組件物料ID
    pub product_id: RecordId,

    /// 組件名稱
    pub product: String,

    /// 每單位成品用量
    pub qty_per_unit: Decimal,

    /// 單位
    pub uom: String,
}

impl BomLine {
    /// 創建新的 BOM 行
    pub fn new(product_id: RecordId, product: impl Into<String>, qty_per_unit: Decimal) -> Self {
        Self {
            product_id,
            product: product.into(),
            qty_per_unit,
            uom: "Units".to_string(),
        }
    }

    /// 建構器模式：設置單位
    pub fn with_uom(mut self, uom: impl Into<String>) -> Self {
        self.uom = uom.into();
        self
    }

    /// 從 `mrp.bom.line` 記錄建立
    pub fn from_record(line: &Record) -> crate::Result<Self> {
        let product_id = line
            .many2one_id("product_id")
            .ok_or_else(|| crate::ErpError::malformed(models::BOM_LINE, "missing product_id"))?;

        Ok(Self {
            product_id,
            product: line.many2one_name("product_id").unwrap_or_default().to_string(),
            qty_per_unit: line.decimal_or_zero("product_qty"),
            uom: line
                .many2one_name("product_uom_id")
                .unwrap_or("Units")
                .to_string(),
        })
    }
}

/// 組件供應狀態
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComponentStatus {
    Available,
    Shortage,
}

/// BOM 組件需求與缺料
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BomComponent {
    pub product_id: RecordId,
    pub product: String,
    pub qty_per_unit: Decimal,

    /// 需求量 = 每單位用量 × 生產數量
    pub qty_required: Decimal,

    /// 可用量
    pub qty_available: Decimal,

    pub status: ComponentStatus,

    /// 缺料數量（僅在缺料時存在）
    pub shortage: Option<Decimal>,

    pub uom: String,
}

impl BomComponent {
    /// 依生產規模與可用量評估組件
    ///
    /// 狀態以未四捨五入的數值判斷，輸出數量四捨五入至 2 位小數。
    pub fn evaluate(line: &BomLine, production_scale: Decimal, available: Decimal) -> Self {
        let required = line.qty_per_unit * production_scale;
        let status = if available < required {
            ComponentStatus::Shortage
        } else {
            ComponentStatus::Available
        };
        let shortage = match status {
            ComponentStatus::Shortage => Some((required - available).round_dp(2)),
            ComponentStatus::Available => None,
        };

        Self {
            product_id: line.product_id,
            product: line.product.clone(),
            qty_per_unit: line.qty_per_unit,
            qty_required: required.round_dp(2),
            qty_available: available.round_dp(2),
            status,
            shortage,
            uom: line.uom.clone(),
        }
    }

    /// 是否缺料
    pub fn is_shortage(&self) -> bool {
        self.status == ComponentStatus::Shortage
    }
}
