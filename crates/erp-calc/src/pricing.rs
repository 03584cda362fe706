//! 單價決定規則

use erp_core::{models, Condition, Domain, ErpService, Record, RecordId, SearchOptions};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// 單價來源
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PriceSource {
    /// 輸入指定
    Explicit,
    /// 供應商報價
    PartnerPrice,
    /// 物料售價
    ListPrice,
    /// 物料成本
    StandardPrice,
}

/// 單價與來源
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceQuote {
    pub unit_price: Decimal,
    pub source: PriceSource,
}

/// 文件類型的定價規則
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PriceRules {
    /// 物料上的基礎價格欄位
    pub base_price_field: &'static str,

    /// 是否查詢供應商報價
    pub partner_prices: bool,
}

impl PriceRules {
    /// 銷售：明確單價 > 售價
    pub const SALES: Self = Self {
        base_price_field: "list_price",
        partner_prices: false,
    };

    /// 採購：明確單價 > 供應商報價 > 成本
    pub const PURCHASE: Self = Self {
        base_price_field: "standard_price",
        partner_prices: true,
    };

    fn base_source(&self) -> PriceSource {
        if self.base_price_field == "list_price" {
            PriceSource::ListPrice
        } else {
            PriceSource::StandardPrice
        }
    }
}

/// 決定有效單價
///
/// 明確指定的單價（包含 0）優先；其次是該往來對象的供應商報價；
/// 最後使用物料的基礎價格（缺失視為 0）。
pub fn effective_price<S: ErpService>(
    service: &S,
    rules: PriceRules,
    product: &Record,
    partner_id: RecordId,
    explicit: Option<Decimal>,
) -> erp_core::Result<PriceQuote> {
    if let Some(unit_price) = explicit {
        return Ok(PriceQuote {
            unit_price,
            source: PriceSource::Explicit,
        });
    }

    if rules.partner_prices {
        if let Some(unit_price) = partner_price(service, product, partner_id)? {
            return Ok(PriceQuote {
                unit_price,
                source: PriceSource::PartnerPrice,
            });
        }
    }

    Ok(PriceQuote {
        unit_price: product.decimal_or_zero(rules.base_price_field),
        source: rules.base_source(),
    })
}

/// 供應商針對物料的報價（物料變體優先於模板）
fn partner_price<S: ErpService>(
    service: &S,
    product: &Record,
    partner_id: RecordId,
) -> erp_core::Result<Option<Decimal>> {
    let domain = Domain::new().and(Condition::eq("partner_id", partner_id));
    let offers = service.find(
        models::SUPPLIER_INFO,
        &domain,
        &["product_id", "product_tmpl_id", "price", "sequence"],
        &SearchOptions::new().with_order("sequence"),
    )?;

    let template_id = product.many2one_id("product_tmpl_id");
    let variant = offers
        .iter()
        .find(|o| o.many2one_id("product_id") == Some(product.id));
    let template = || {
        offers.iter().find(|o| {
            o.many2one_id("product_id").is_none()
                && template_id.is_some()
                && o.many2one_id("product_tmpl_id") == template_id
        })
    };

    Ok(variant.or_else(template).and_then(|o| o.decimal("price")))
}
