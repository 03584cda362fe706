//! 實體解析：將人工輸入的ID、代碼或名稱解析為唯一記錄

use erp_core::{
    models, Condition, Domain, ErpError, ErpService, OperationConfig, Record, RecordId,
    SearchOptions,
};
use serde::{Deserialize, Serialize};
use std::fmt;

/// 解析查詢（ID、精確參考、名稱至少一項）
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolutionQuery {
    /// 明確ID（略過所有名稱比對）
    pub explicit_id: Option<RecordId>,

    /// 精確參考（物料代碼、庫位完整路徑）
    pub reference: Option<String>,

    /// 名稱提示（不分大小寫部分比對）
    pub name_hint: Option<String>,
}

impl ResolutionQuery {
    pub fn by_id(id: RecordId) -> Self {
        Self {
            explicit_id: Some(id),
            ..Self::default()
        }
    }

    pub fn by_name(name: impl Into<String>) -> Self {
        Self {
            name_hint: Some(name.into()),
            ..Self::default()
        }
    }

    pub fn by_reference(reference: impl Into<String>) -> Self {
        Self {
            reference: Some(reference.into()),
            ..Self::default()
        }
    }

    /// 由選填欄位組合
    pub fn from_parts(
        explicit_id: Option<RecordId>,
        reference: Option<&str>,
        name_hint: Option<&str>,
    ) -> Self {
        Self {
            explicit_id,
            reference: reference.map(str::to_string),
            name_hint: name_hint.map(str::to_string),
        }
    }

    /// 建構器模式：設置名稱提示
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name_hint = Some(name.into());
        self
    }

    /// 非空白的名稱提示
    pub fn name(&self) -> Option<&str> {
        non_blank(self.name_hint.as_deref())
    }

    /// 非空白的精確參考
    pub fn reference(&self) -> Option<&str> {
        non_blank(self.reference.as_deref())
    }

    /// 是否缺少所有識別資訊
    pub fn is_empty(&self) -> bool {
        self.explicit_id.is_none() && self.reference().is_none() && self.name().is_none()
    }

    /// 用於訊息的描述
    pub fn describe(&self) -> String {
        match (self.explicit_id, self.reference(), self.name()) {
            (Some(id), _, _) => format!("with ID {}", id),
            (None, Some(reference), _) => format!("'{}'", reference),
            (None, None, Some(name)) => format!("'{}'", name),
            (None, None, None) => "(no identifier)".to_string(),
        }
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// 解析目標（模型、類型過濾與欄位）
#[derive(Debug, Clone)]
pub struct ResolutionTarget {
    /// ERP 模型
    pub model: &'static str,

    /// 訊息中的實體名稱
    pub label: &'static str,

    /// 讀取欄位
    pub fields: Vec<&'static str>,

    /// 名稱比對欄位
    pub name_field: &'static str,

    /// 精確參考欄位
    pub reference_field: Option<&'static str>,

    /// 類型過濾（僅用於名稱搜尋）
    pub filter: Domain,

    /// 以ID解析時必須為真的旗標 `(欄位, 用途)`
    pub eligibility: Option<(&'static str, &'static str)>,
}

impl ResolutionTarget {
    /// 創建新的解析目標
    pub fn new(model: &'static str, label: &'static str, fields: &[&'static str]) -> Self {
        Self {
            model,
            label,
            fields: fields.to_vec(),
            name_field: "name",
            reference_field: None,
            filter: Domain::new(),
            eligibility: None,
        }
    }

    /// 建構器模式：追加類型過濾
    pub fn with_filter(mut self, condition: Condition) -> Self {
        self.filter = self.filter.and(condition);
        self
    }

    /// 建構器模式：設置名稱欄位
    pub fn with_name_field(mut self, field: &'static str) -> Self {
        self.name_field = field;
        self
    }

    /// 建構器模式：設置精確參考欄位
    pub fn with_reference_field(mut self, field: &'static str) -> Self {
        self.reference_field = Some(field);
        self
    }

    /// 建構器模式：設置ID解析資格旗標
    pub fn with_eligibility(mut self, flag: &'static str, purpose: &'static str) -> Self {
        self.eligibility = Some((flag, purpose));
        self
    }

    /// 客戶
    pub fn customer() -> Self {
        Self::new(models::PARTNER, "Customer", &["name", "email", "customer_rank"])
            .with_filter(Condition::gt("customer_rank", 0))
    }

    /// 供應商
    pub fn vendor() -> Self {
        Self::new(
            models::PARTNER,
            "Vendor",
            &["name", "email", "supplier_rank", "property_purchase_currency_id"],
        )
        .with_filter(Condition::gt("supplier_rank", 0))
    }

    /// 可銷售物料
    pub fn sellable_product() -> Self {
        Self::new(models::PRODUCT, "Product", &["name", "list_price", "uom_id", "sale_ok"])
            .with_filter(Condition::eq("sale_ok", true))
            .with_eligibility("sale_ok", "sale")
    }

    /// 可採購物料
    pub fn purchasable_product() -> Self {
        Self::new(
            models::PRODUCT,
            "Product",
            &["name", "standard_price", "uom_po_id", "purchase_ok", "product_tmpl_id"],
        )
        .with_filter(Condition::eq("purchase_ok", true))
        .with_eligibility("purchase_ok", "purchase")
    }

    /// 可庫存物料（生產用）
    pub fn storable_product() -> Self {
        Self::new(models::PRODUCT, "Product", &["name", "type", "uom_id", "product_tmpl_id"])
            .with_filter(Condition::eq("type", "product"))
    }

    /// 任意物料，先比對內部代碼
    pub fn stocked_product() -> Self {
        Self::new(models::PRODUCT, "Product", &["name", "type", "default_code"])
            .with_reference_field("default_code")
    }

    /// 庫位，先比對完整路徑，名稱搜尋限指定用途
    pub fn location(usage: &str) -> Self {
        Self::new(models::STOCK_LOCATION, "Location", &["name", "complete_name"])
            .with_name_field("complete_name")
            .with_reference_field("complete_name")
            .with_filter(Condition::eq("usage", usage))
    }

    fn read_fields(&self) -> Vec<&'static str> {
        let mut fields = self.fields.clone();
        for extra in [Some(self.name_field), self.eligibility.map(|(flag, _)| flag)]
            .into_iter()
            .flatten()
        {
            if !fields.contains(&extra) {
                fields.push(extra);
            }
        }
        fields
    }
}

/// 候選記錄摘要
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candidate {
    pub id: RecordId,
    pub name: String,
}

/// 多筆候選時的非致命警告
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AmbiguityWarning {
    pub entity: String,
    pub query: String,
    pub chosen: Candidate,
    pub discarded: Vec<Candidate>,
}

impl fmt::Display for AmbiguityWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let discarded: Vec<String> = self
            .discarded
            .iter()
            .map(|c| format!("{} (id {})", c.name, c.id))
            .collect();
        write!(
            f,
            "Multiple {} records match {}. Using: {} (id {}); discarded: {}",
            self.entity.to_lowercase(),
            self.query,
            self.chosen.name,
            self.chosen.id,
            discarded.join(", ")
        )
    }
}

/// 解析結果
#[derive(Debug, Clone, PartialEq)]
pub struct Resolved {
    pub record: Record,
    pub warning: Option<AmbiguityWarning>,
}

impl Resolved {
    fn unique(record: Record) -> Self {
        Self {
            record,
            warning: None,
        }
    }
}

/// 實體解析器
pub struct EntityResolver<'a, S: ErpService> {
    service: &'a S,
    config: &'a OperationConfig,
}

impl<'a, S: ErpService> EntityResolver<'a, S> {
    /// 創建新的解析器
    pub fn new(service: &'a S, config: &'a OperationConfig) -> Self {
        Self { service, config }
    }

    /// 解析查詢為唯一記錄
    ///
    /// 順序：明確ID → 精確參考 → 名稱部分比對。
    /// 名稱多筆時優先精確名稱，否則取最小ID並附帶警告。
    pub fn resolve(
        &self,
        target: &ResolutionTarget,
        query: &ResolutionQuery,
    ) -> erp_core::Result<Resolved> {
        if query.is_empty() {
            return Err(ErpError::validation(format!(
                "{} id or name is required",
                target.label
            )));
        }

        if let Some(id) = query.explicit_id {
            return self.resolve_id(target, id).map(Resolved::unique);
        }

        if let (Some(reference), Some(field)) = (query.reference(), target.reference_field) {
            let domain = Domain::new().and(Condition::eq(field, reference));
            let hits = self.service.find(
                target.model,
                &domain,
                &target.read_fields(),
                &SearchOptions::new().with_limit(1).with_order("id"),
            )?;
            if let Some(record) = hits.into_iter().next() {
                tracing::debug!("{} 以參考 '{}' 解析為 {}", target.label, reference, record.id);
                return Ok(Resolved::unique(record));
            }
        }

        let name = match query.name() {
            Some(name) => name,
            // 沒有參考欄位時，參考值即名稱
            None if target.reference_field.is_none() => query.reference().unwrap_or_default(),
            None => {
                return Err(ErpError::not_found(target.label, query.describe()));
            }
        };

        self.resolve_name(target, name)
    }

    /// 以ID讀取
    fn resolve_id(&self, target: &ResolutionTarget, id: RecordId) -> erp_core::Result<Record> {
        let record = self
            .service
            .fetch(target.model, &[id], &target.read_fields())?
            .into_iter()
            .next()
            .ok_or_else(|| ErpError::not_found(target.label, format!("with ID {}", id)))?;

        if let Some((flag, purpose)) = target.eligibility {
            if !record.flag(flag) {
                return Err(ErpError::validation(format!(
                    "{} '{}' is not available for {}",
                    target.label,
                    record.name(),
                    purpose
                )));
            }
        }
        Ok(record)
    }

    /// 以名稱搜尋並消歧
    fn resolve_name(&self, target: &ResolutionTarget, name: &str) -> erp_core::Result<Resolved> {
        let domain = Domain::new()
            .and(Condition::ilike(target.name_field, name))
            .extend(&target.filter);
        let candidates = self.service.find(
            target.model,
            &domain,
            &target.read_fields(),
            &SearchOptions::new()
                .with_limit(self.config.effective_search_limit())
                .with_order("id"),
        )?;

        if candidates.is_empty() {
            let suggestions = self.similar_names(target, name)?;
            return Err(ErpError::NotFound {
                entity: target.label.to_string(),
                query: format!("'{}'", name),
                suggestions,
            });
        }

        let resolved = choose_candidate(target, name, candidates);
        if let Some(warning) = &resolved.warning {
            tracing::warn!("{}", warning);
        }
        Ok(resolved)
    }

    /// 不帶類型過濾的寬鬆搜尋，作為建議
    fn similar_names(&self, target: &ResolutionTarget, name: &str) -> erp_core::Result<Vec<String>> {
        if self.config.suggestion_limit == 0 {
            return Ok(Vec::new());
        }
        let domain = Domain::new().and(Condition::ilike(target.name_field, name));
        let similar = self.service.find(
            target.model,
            &domain,
            &[target.name_field],
            &SearchOptions::new()
                .with_limit(self.config.suggestion_limit)
                .with_order("id"),
        )?;
        Ok(similar
            .iter()
            .filter_map(|r| r.str_field(target.name_field).map(str::to_string))
            .collect())
    }
}

/// 從多筆候選中選出一筆（與服務回傳順序無關）
fn choose_candidate(target: &ResolutionTarget, name: &str, mut candidates: Vec<Record>) -> Resolved {
    candidates.sort_by_key(|r| r.id);
    if candidates.len() == 1 {
        return Resolved::unique(candidates.remove(0));
    }

    let wanted = name.to_lowercase();
    let is_exact = |r: &Record| {
        r.str_field(target.name_field)
            .is_some_and(|n| n.trim().to_lowercase() == wanted)
    };
    let exact_count = candidates.iter().filter(|&r| is_exact(r)).count();

    let chosen_index = if exact_count > 0 {
        candidates.iter().position(|r| is_exact(r)).unwrap_or(0)
    } else {
        0
    };
    let chosen = candidates.remove(chosen_index);

    // 唯一精確名稱不需警告
    if exact_count == 1 {
        return Resolved::unique(chosen);
    }

    let summary = |r: &Record| Candidate {
        id: r.id,
        name: r.str_field(target.name_field).unwrap_or_default().to_string(),
    };
    let discarded = if exact_count > 1 {
        candidates.iter().filter(|&r| is_exact(r)).map(summary).collect()
    } else {
        candidates.iter().map(summary).collect()
    };
    let warning = AmbiguityWarning {
        entity: target.label.to_string(),
        query: format!("'{}'", name),
        chosen: summary(&chosen),
        discarded,
    };

    Resolved {
        record: chosen,
        warning: Some(warning),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use erp_core::MemoryService;
    use serde_json::json;

    fn service_with_customers() -> MemoryService {
        let service = MemoryService::new();
        service.seed(models::PARTNER, json!({"id": 7, "name": "Golf Shirt", "customer_rank": 1}));
        service.seed(models::PARTNER, json!({"id": 3, "name": "Golf Shirt", "customer_rank": 1}));
        service.seed(models::PARTNER, json!({"id": 9, "name": "Golf Shirt Outlet", "customer_rank": 1}));
        service.seed(models::PARTNER, json!({"id": 12, "name": "Acme Supplies", "supplier_rank": 1}));
        service
    }

    #[test]
    fn test_lowest_id_wins_regardless_of_service_order() {
        let service = service_with_customers();
        let config = OperationConfig::new();
        let resolver = EntityResolver::new(&service, &config);

        for reverse in [false, true] {
            service.reverse_results(reverse);
            let resolved = resolver
                .resolve(&ResolutionTarget::customer(), &ResolutionQuery::by_name("Golf Shirt"))
                .unwrap();
            assert_eq!(resolved.record.id, 3);

            // 兩筆同名精確匹配，仍需警告
            let warning = resolved.warning.unwrap();
            assert_eq!(warning.discarded.len(), 1);
            assert_eq!(warning.discarded[0].id, 7);
        }
    }

    #[test]
    fn test_search_window_is_lowest_ids_when_matches_exceed_limit() {
        let service = MemoryService::new();
        service.seed(models::PARTNER, json!({"id": 1, "name": "Golf Shirt", "customer_rank": 1}));
        for id in 2..=8 {
            service.seed(
                models::PARTNER,
                json!({"id": id, "name": format!("Golf Shirt {}", id), "customer_rank": 1}),
            );
        }
        let config = OperationConfig::new();
        let resolver = EntityResolver::new(&service, &config);

        for reverse in [false, true] {
            service.reverse_results(reverse);
            let resolved = resolver
                .resolve(&ResolutionTarget::customer(), &ResolutionQuery::by_name("golf shirt"))
                .unwrap();
            assert_eq!(resolved.record.id, 1);
            assert!(resolved.warning.is_none());
        }
    }

    #[test]
    fn test_unique_exact_match_preferred_over_lower_id() {
        let service = MemoryService::new();
        service.seed(models::PARTNER, json!({"id": 2, "name": "Acme Retail", "customer_rank": 1}));
        service.seed(models::PARTNER, json!({"id": 5, "name": "acme", "customer_rank": 1}));
        let config = OperationConfig::new();
        let resolver = EntityResolver::new(&service, &config);

        let resolved = resolver
            .resolve(&ResolutionTarget::customer(), &ResolutionQuery::by_name("ACME"))
            .unwrap();
        assert_eq!(resolved.record.id, 5);
        assert!(resolved.warning.is_none());
    }

    #[test]
    fn test_partial_matches_pick_lowest_id_with_warning() {
        let service = MemoryService::new();
        service.seed(models::PARTNER, json!({"id": 8, "name": "Acme Retail", "customer_rank": 1}));
        service.seed(models::PARTNER, json!({"id": 4, "name": "Acme Wholesale", "customer_rank": 1}));
        let config = OperationConfig::new();
        let resolver = EntityResolver::new(&service, &config);

        let resolved = resolver
            .resolve(&ResolutionTarget::customer(), &ResolutionQuery::by_name("acme"))
            .unwrap();
        assert_eq!(resolved.record.id, 4);
        let warning = resolved.warning.unwrap();
        assert_eq!(warning.chosen.name, "Acme Wholesale");
        assert_eq!(warning.discarded[0].name, "Acme Retail");
        assert!(warning.to_string().contains("discarded: Acme Retail (id 8)"));
    }

    #[test]
    fn test_not_found_includes_unfiltered_suggestions() {
        let service = service_with_customers();
        let config = OperationConfig::new();
        let resolver = EntityResolver::new(&service, &config);

        // Acme 只是供應商，客戶搜尋找不到，但寬鬆搜尋會建議
        let err = resolver
            .resolve(&ResolutionTarget::customer(), &ResolutionQuery::by_name("Acme"))
            .unwrap_err();
        match &err {
            ErpError::NotFound { suggestions, .. } => {
                assert_eq!(suggestions, &vec!["Acme Supplies".to_string()]);
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(err.to_string(), "Customer 'Acme' not found. Similar: Acme Supplies");
    }

    #[test]
    fn test_suggestions_are_bounded() {
        let service = MemoryService::new();
        for i in 0..8 {
            service.seed(models::PARTNER, json!({"name": format!("Blue Widget {}", i)}));
        }
        let config = OperationConfig::new();
        let resolver = EntityResolver::new(&service, &config);

        let err = resolver
            .resolve(&ResolutionTarget::customer(), &ResolutionQuery::by_name("widget"))
            .unwrap_err();
        let ErpError::NotFound { suggestions, .. } = err else {
            panic!("expected not found");
        };
        assert_eq!(suggestions.len(), 5);
    }

    #[test]
    fn test_explicit_id_bypasses_name_matching() {
        let service = service_with_customers();
        let config = OperationConfig::new();
        let resolver = EntityResolver::new(&service, &config);

        let query = ResolutionQuery::by_id(7).with_name("Acme");
        let resolved = resolver.resolve(&ResolutionTarget::customer(), &query).unwrap();
        assert_eq!(resolved.record.id, 7);

        let err = resolver
            .resolve(&ResolutionTarget::customer(), &ResolutionQuery::by_id(404))
            .unwrap_err();
        assert_eq!(err.to_string(), "Customer with ID 404 not found");
    }

    #[test]
    fn test_explicit_id_checks_eligibility() {
        let service = MemoryService::new();
        service.seed(models::PRODUCT, json!({"id": 5, "name": "Sample Kit", "sale_ok": false}));
        let config = OperationConfig::new();
        let resolver = EntityResolver::new(&service, &config);

        let err = resolver
            .resolve(&ResolutionTarget::sellable_product(), &ResolutionQuery::by_id(5))
            .unwrap_err();
        assert!(matches!(err, ErpError::Validation(_)));
        assert_eq!(err.to_string(), "Product 'Sample Kit' is not available for sale");
    }

    #[test]
    fn test_reference_tried_before_name() {
        let service = MemoryService::new();
        service.seed(models::PRODUCT, json!({"id": 1, "name": "Polo Navy", "default_code": "PN-01"}));
        service.seed(models::PRODUCT, json!({"id": 2, "name": "Polo Navy XL", "default_code": "PN-02"}));
        let config = OperationConfig::new();
        let resolver = EntityResolver::new(&service, &config);
        let target = ResolutionTarget::stocked_product();

        let query = ResolutionQuery::by_reference("PN-02").with_name("Polo");
        assert_eq!(resolver.resolve(&target, &query).unwrap().record.id, 2);

        // 代碼不存在時退回名稱比對
        let query = ResolutionQuery::by_reference("PN-99").with_name("Polo Navy XL");
        assert_eq!(resolver.resolve(&target, &query).unwrap().record.id, 2);

        // 只有代碼且不存在
        let err = resolver
            .resolve(&target, &ResolutionQuery::by_reference("PN-99"))
            .unwrap_err();
        assert_eq!(err.to_string(), "Product 'PN-99' not found");
    }

    #[test]
    fn test_location_exact_path_then_internal_partial() {
        let service = MemoryService::new();
        service.seed(models::STOCK_LOCATION, json!({"id": 1, "complete_name": "WH/Stock", "usage": "internal"}));
        service.seed(models::STOCK_LOCATION, json!({"id": 2, "complete_name": "Partners/Customers", "usage": "customer"}));
        let config = OperationConfig::new();
        let resolver = EntityResolver::new(&service, &config);
        let target = ResolutionTarget::location("internal");

        let query = ResolutionQuery::by_reference("Partners/Customers").with_name("Partners/Customers");
        assert_eq!(resolver.resolve(&target, &query).unwrap().record.id, 2);

        let query = ResolutionQuery::by_reference("stock").with_name("stock");
        assert_eq!(resolver.resolve(&target, &query).unwrap().record.id, 1);

        let query = ResolutionQuery::by_reference("customers").with_name("customers");
        assert!(resolver.resolve(&target, &query).is_err());
    }

    #[test]
    fn test_empty_query_is_validation_error() {
        let service = MemoryService::new();
        let config = OperationConfig::new();
        let resolver = EntityResolver::new(&service, &config);

        let query = ResolutionQuery::by_name("   ");
        let err = resolver.resolve(&ResolutionTarget::vendor(), &query).unwrap_err();
        assert!(matches!(err, ErpError::Validation(_)));
        assert!(service.calls().is_empty());
    }
}
