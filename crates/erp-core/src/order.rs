//! 訂單行與文件表頭模型

use chrono::NaiveDate;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use crate::record::RecordId;

/// 訂單行
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderLine {
    /// 已建立的行ID
    pub line_id: RecordId,

    pub product_id: RecordId,

    /// 物料名稱
    pub product: String,

    /// 數量（> 0）
    pub quantity: Decimal,

    /// 單價（>= 0）
    pub unit_price: Decimal,

    /// 折扣百分比（0..=100）
    pub discount: Decimal,

    /// 小計 = 數量 × 單價 × (1 - 折扣/100)，四捨五入至 2 位
    pub subtotal: Decimal,
}

impl OrderLine {
    /// 創建新的訂單行並計算小計
    pub fn new(
        line_id: RecordId,
        product_id: RecordId,
        product: impl Into<String>,
        quantity: Decimal,
        unit_price: Decimal,
        discount: Decimal,
    ) -> Self {
        Self {
            line_id,
            product_id,
            product: product.into(),
            quantity,
            unit_price,
            discount,
            subtotal: subtotal(quantity, unit_price, discount),
        }
    }
}

/// 計算行小計
pub fn subtotal(quantity: Decimal, unit_price: Decimal, discount: Decimal) -> Decimal {
    let factor = Decimal::ONE - discount / Decimal::ONE_HUNDRED;
    round_money(quantity * unit_price * factor)
}

/// 金額四捨五入至 2 位小數
pub fn round_money(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// 文件表頭選填欄位
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HeaderOptions {
    /// 對方參考號（客戶訂單號 / 供應商單號）
    pub reference: Option<String>,

    /// 備註
    pub notes: Option<String>,

    /// 交貨 / 預計到貨日期
    pub date: Option<NaiveDate>,
}

/// 部分提交時已存在於 ERP 的記錄
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommittedRecords {
    /// 表頭模型
    pub header_model: String,

    /// 表頭ID
    pub header_id: RecordId,

    /// 行模型
    pub line_model: String,

    /// 已建立的行ID（依建立順序）
    pub line_ids: Vec<RecordId>,

    /// 是否已執行補償刪除
    pub rolled_back: bool,
}

impl CommittedRecords {
    /// 創建新的提交記錄
    pub fn new(header_model: &str, header_id: RecordId, line_model: &str) -> Self {
        Self {
            header_model: header_model.to_string(),
            header_id,
            line_model: line_model.to_string(),
            line_ids: Vec::new(),
            rolled_back: false,
        }
    }

    /// 添加已建立的行
    pub fn push_line(&mut self, line_id: RecordId) {
        self.line_ids.push(line_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subtotal_with_discount() {
        let line = OrderLine::new(
            1,
            5,
            "Golf Shirt",
            Decimal::from(3),
            Decimal::from(100),
            Decimal::from(10),
        );
        assert_eq!(line.subtotal, Decimal::new(27000, 2));
    }

    #[test]
    fn test_subtotal_rounds_half_away_from_zero() {
        // 1 × 0.125 = 0.125 → 0.13
        assert_eq!(
            subtotal(Decimal::ONE, Decimal::new(125, 3), Decimal::ZERO),
            Decimal::new(13, 2)
        );
        // 全額折扣
        assert_eq!(
            subtotal(Decimal::from(4), Decimal::from(25), Decimal::ONE_HUNDRED),
            Decimal::ZERO
        );
    }

    #[test]
    fn test_committed_records_tracks_lines() {
        let mut committed = CommittedRecords::new("sale.order", 10, "sale.order.line");
        committed.push_line(11);
        committed.push_line(12);
        assert_eq!(committed.line_ids, vec![11, 12]);
        assert!(!committed.rolled_back);
    }
}
