//! BOM 查找

use erp_core::{
    models, BomLine, Condition, Domain, ErpError, ErpService, Record, RecordId, SearchOptions,
};
use serde::{Deserialize, Serialize};

const BOM_FIELDS: &[&str] = &["code", "product_id", "product_tmpl_id", "bom_line_ids", "active"];

/// 物料清單表頭
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bom {
    pub id: RecordId,

    /// BOM 代碼
    pub code: Option<String>,

    pub product_template_id: Option<RecordId>,

    /// 成品名稱（變體優先，其次模板）
    pub product: Option<String>,

    /// BOM 行ID
    pub line_ids: Vec<RecordId>,
}

impl Bom {
    fn from_record(record: &Record) -> Self {
        Self {
            id: record.id,
            code: record.str_field("code").map(str::to_string),
            product_template_id: record.many2one_id("product_tmpl_id"),
            product: record
                .many2one_name("product_id")
                .or_else(|| record.many2one_name("product_tmpl_id"))
                .map(str::to_string),
            line_ids: record.ids("bom_line_ids"),
        }
    }
}

/// BOM 查找器
pub struct BomLocator<'a, S: ErpService> {
    service: &'a S,
}

impl<'a, S: ErpService> BomLocator<'a, S> {
    pub fn new(service: &'a S) -> Self {
        Self { service }
    }

    /// 查找物料的 BOM
    ///
    /// 順序：明確 BOM ID → 物料專屬的有效 BOM（依 sequence）→
    /// 物料模板層級的有效 BOM（未指定變體）。
    pub fn locate(&self, product_id: RecordId, bom_id: Option<RecordId>) -> erp_core::Result<Bom> {
        if let Some(id) = bom_id {
            return self.fetch(id);
        }

        let by_sequence = SearchOptions::new().with_limit(1).with_order("sequence");

        let domain = Domain::new()
            .and(Condition::eq("product_id", product_id))
            .and(Condition::eq("active", true));
        if let Some(record) = self
            .service
            .find(models::BOM, &domain, BOM_FIELDS, &by_sequence)?
            .first()
        {
            tracing::debug!("物料 {} 使用專屬 BOM {}", product_id, record.id);
            return Ok(Bom::from_record(record));
        }

        let template_id = self
            .service
            .fetch(models::PRODUCT, &[product_id], &["product_tmpl_id"])?
            .first()
            .and_then(|p| p.many2one_id("product_tmpl_id"));

        if let Some(template_id) = template_id {
            let domain = Domain::new()
                .and(Condition::eq("product_tmpl_id", template_id))
                .and(Condition::eq("product_id", false))
                .and(Condition::eq("active", true));
            if let Some(record) = self
                .service
                .find(models::BOM, &domain, BOM_FIELDS, &by_sequence)?
                .first()
            {
                tracing::debug!("物料 {} 使用模板 BOM {}", product_id, record.id);
                return Ok(Bom::from_record(record));
            }
        }

        Err(ErpError::not_found(
            "Bill of materials",
            format!("for product ID {}", product_id),
        ))
    }

    /// 以ID讀取 BOM
    pub fn fetch(&self, bom_id: RecordId) -> erp_core::Result<Bom> {
        self.service
            .fetch(models::BOM, &[bom_id], BOM_FIELDS)?
            .first()
            .map(Bom::from_record)
            .ok_or_else(|| ErpError::not_found("Bill of materials", format!("with ID {}", bom_id)))
    }

    /// 讀取 BOM 行
    pub fn lines(&self, bom: &Bom) -> erp_core::Result<Vec<BomLine>> {
        if bom.line_ids.is_empty() {
            return Ok(Vec::new());
        }
        self.service
            .fetch(
                models::BOM_LINE,
                &bom.line_ids,
                &["product_id", "product_qty", "product_uom_id"],
            )?
            .iter()
            .map(BomLine::from_record)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use erp_core::MemoryService;
    use rust_decimal::Decimal;
    use serde_json::json;

    fn service() -> MemoryService {
        let service = MemoryService::new();
        service.seed(models::PRODUCT, json!({"id": 1, "name": "Golf Shirt", "product_tmpl_id": [11, "Golf Shirt"]}));
        service.seed(models::PRODUCT, json!({"id": 2, "name": "Golf Shirt XL", "product_tmpl_id": [11, "Golf Shirt"]}));
        service.seed(models::BOM_LINE, json!({"id": 31, "product_id": [5, "Cotton Roll"], "product_qty": 2, "product_uom_id": [1, "m"]}));
        service.seed(models::BOM_LINE, json!({"id": 32, "product_id": [6, "Button"], "product_qty": 4}));
        service.seed(models::BOM, json!({"id": 20, "code": "TMPL", "product_tmpl_id": [11, "Golf Shirt"], "product_id": false, "active": true, "sequence": 1, "bom_line_ids": [31, 32]}));
        service.seed(models::BOM, json!({"id": 21, "code": "XL-B", "product_tmpl_id": [11, "Golf Shirt"], "product_id": [2, "Golf Shirt XL"], "active": true, "sequence": 5, "bom_line_ids": [31]}));
        service.seed(models::BOM, json!({"id": 22, "code": "XL-A", "product_tmpl_id": [11, "Golf Shirt"], "product_id": [2, "Golf Shirt XL"], "active": true, "sequence": 2, "bom_line_ids": [32]}));
        service.seed(models::BOM, json!({"id": 23, "code": "OLD", "product_tmpl_id": [11, "Golf Shirt"], "product_id": [2, "Golf Shirt XL"], "active": false, "sequence": 0, "bom_line_ids": []}));
        service
    }

    #[test]
    fn test_product_specific_bom_by_sequence() {
        let service = service();
        let bom = BomLocator::new(&service).locate(2, None).unwrap();
        assert_eq!(bom.id, 22);
        assert_eq!(bom.code.as_deref(), Some("XL-A"));
        assert_eq!(bom.product.as_deref(), Some("Golf Shirt XL"));
    }

    #[test]
    fn test_falls_back_to_template_bom() {
        let service = service();
        let locator = BomLocator::new(&service);
        let bom = locator.locate(1, None).unwrap();
        assert_eq!(bom.id, 20);
        assert_eq!(bom.product.as_deref(), Some("Golf Shirt"));

        let lines = locator.lines(&bom).unwrap();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].qty_per_unit, Decimal::from(2));
        assert_eq!(lines[0].uom, "m");
        assert_eq!(lines[1].uom, "Units");
    }

    #[test]
    fn test_explicit_bom_id() {
        let service = service();
        let locator = BomLocator::new(&service);
        assert_eq!(locator.locate(1, Some(21)).unwrap().id, 21);

        let err = locator.locate(1, Some(99)).unwrap_err();
        assert_eq!(err.to_string(), "Bill of materials with ID 99 not found");
    }

    #[test]
    fn test_missing_bom_is_not_found() {
        let service = MemoryService::new();
        service.seed(models::PRODUCT, json!({"id": 4, "name": "Loose Part"}));
        let err = BomLocator::new(&service).locate(4, None).unwrap_err();
        assert_eq!(err.to_string(), "Bill of materials for product ID 4 not found");
    }
}
