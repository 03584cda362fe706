//! ERP 資料服務介面
//!
//! 核心只透過此介面存取 ERP；傳輸、認證、逾時與取消皆由實作方負責。
//! 每次呼叫各自提交，呼叫之間沒有交易保證。

use serde_json::Value;

use crate::domain::{Domain, SearchOptions};
use crate::record::{Fields, Record, RecordId};

/// ERP 服務回傳的錯誤
///
/// 訊息原樣保留，交由錯誤分類器判斷類別。
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct ServiceError {
    message: String,
}

impl ServiceError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

/// ERP 物件 API
pub trait ErpService {
    /// 依條件搜尋並讀取記錄
    fn find(
        &self,
        model: &str,
        domain: &Domain,
        fields: &[&str],
        options: &SearchOptions,
    ) -> Result<Vec<Record>, ServiceError>;

    /// 依ID讀取記錄；不存在的ID不回傳
    fn fetch(&self, model: &str, ids: &[RecordId], fields: &[&str])
        -> Result<Vec<Record>, ServiceError>;

    /// 建立記錄，回傳新ID
    fn insert(&self, model: &str, values: Fields) -> Result<RecordId, ServiceError>;

    /// 更新記錄
    fn mutate(&self, model: &str, ids: &[RecordId], values: Fields) -> Result<bool, ServiceError>;

    /// 呼叫模型方法（狀態轉換，例如確認訂單）
    fn invoke(&self, model: &str, method: &str, args: Vec<Value>) -> Result<Value, ServiceError>;
}

impl<S: ErpService + ?Sized> ErpService for &S {
    fn find(
        &self,
        model: &str,
        domain: &Domain,
        fields: &[&str],
        options: &SearchOptions,
    ) -> Result<Vec<Record>, ServiceError> {
        (**self).find(model, domain, fields, options)
    }

    fn fetch(
        &self,
        model: &str,
        ids: &[RecordId],
        fields: &[&str],
    ) -> Result<Vec<Record>, ServiceError> {
        (**self).fetch(model, ids, fields)
    }

    fn insert(&self, model: &str, values: Fields) -> Result<RecordId, ServiceError> {
        (**self).insert(model, values)
    }

    fn mutate(&self, model: &str, ids: &[RecordId], values: Fields) -> Result<bool, ServiceError> {
        (**self).mutate(model, ids, values)
    }

    fn invoke(&self, model: &str, method: &str, args: Vec<Value>) -> Result<Value, ServiceError> {
        (**self).invoke(model, method, args)
    }
}

/// ERP 模型名稱
pub mod models {
    pub const PARTNER: &str = "res.partner";
    pub const PRODUCT: &str = "product.product";
    pub const SUPPLIER_INFO: &str = "product.supplierinfo";
    pub const SALE_ORDER: &str = "sale.order";
    pub const SALE_ORDER_LINE: &str = "sale.order.line";
    pub const PURCHASE_ORDER: &str = "purchase.order";
    pub const PURCHASE_ORDER_LINE: &str = "purchase.order.line";
    pub const PRODUCTION: &str = "mrp.production";
    pub const BOM: &str = "mrp.bom";
    pub const BOM_LINE: &str = "mrp.bom.line";
    pub const STOCK_QUANT: &str = "stock.quant";
    pub const STOCK_LOCATION: &str = "stock.location";
}
