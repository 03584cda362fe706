//! 多行交易文件組裝（銷售訂單、採購訂單）

use erp_core::order::round_money;
use erp_core::record::decimal_value;
use erp_core::{
    models, CommittedRecords, ErpError, ErpService, Fields, HeaderOptions, OperationConfig,
    OrderLine, PartialCommitPolicy, Record, RecordId,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::pricing::{effective_price, PriceRules, PriceSource};
use crate::resolver::{EntityResolver, ResolutionQuery, ResolutionTarget, Resolved};

/// 文件類型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentKind {
    Sales,
    Purchase,
}

impl DocumentKind {
    pub fn header_model(&self) -> &'static str {
        match self {
            Self::Sales => models::SALE_ORDER,
            Self::Purchase => models::PURCHASE_ORDER,
        }
    }

    pub fn line_model(&self) -> &'static str {
        match self {
            Self::Sales => models::SALE_ORDER_LINE,
            Self::Purchase => models::PURCHASE_ORDER_LINE,
        }
    }

    /// 往來對象（客戶 / 供應商）
    pub fn party_target(&self) -> ResolutionTarget {
        match self {
            Self::Sales => ResolutionTarget::customer(),
            Self::Purchase => ResolutionTarget::vendor(),
        }
    }

    pub fn product_target(&self) -> ResolutionTarget {
        match self {
            Self::Sales => ResolutionTarget::sellable_product(),
            Self::Purchase => ResolutionTarget::purchasable_product(),
        }
    }

    pub fn price_rules(&self) -> PriceRules {
        match self {
            Self::Sales => PriceRules::SALES,
            Self::Purchase => PriceRules::PURCHASE,
        }
    }

    /// 行數量欄位
    pub fn quantity_field(&self) -> &'static str {
        match self {
            Self::Sales => "product_uom_qty",
            Self::Purchase => "product_qty",
        }
    }

    /// 確認動作
    pub fn confirm_method(&self) -> &'static str {
        match self {
            Self::Sales => "action_confirm",
            Self::Purchase => "button_confirm",
        }
    }

    fn reference_field(&self) -> &'static str {
        match self {
            Self::Sales => "client_order_ref",
            Self::Purchase => "partner_ref",
        }
    }

    fn notes_field(&self) -> &'static str {
        match self {
            Self::Sales => "note",
            Self::Purchase => "notes",
        }
    }

    fn date_field(&self) -> &'static str {
        match self {
            Self::Sales => "commitment_date",
            Self::Purchase => "date_planned",
        }
    }

    /// 訊息用名稱
    pub fn label(&self) -> &'static str {
        match self {
            Self::Sales => "Sales order",
            Self::Purchase => "Purchase order",
        }
    }
}

/// 行輸入
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LineInput {
    pub product_id: Option<RecordId>,
    pub product_name: Option<String>,

    /// 物料內部代碼
    pub product_code: Option<String>,

    pub quantity: Decimal,

    /// 未指定時依定價規則決定
    pub unit_price: Option<Decimal>,

    /// 折扣百分比，未指定為 0
    pub discount: Option<Decimal>,
}

impl LineInput {
    pub fn by_name(product: impl Into<String>, quantity: Decimal) -> Self {
        Self {
            product_name: Some(product.into()),
            quantity,
            ..Self::default()
        }
    }

    pub fn by_id(product_id: RecordId, quantity: Decimal) -> Self {
        Self {
            product_id: Some(product_id),
            quantity,
            ..Self::default()
        }
    }

    /// 建構器模式：設置單價
    pub fn with_price(mut self, unit_price: Decimal) -> Self {
        self.unit_price = Some(unit_price);
        self
    }

    /// 建構器模式：設置折扣
    pub fn with_discount(mut self, discount: Decimal) -> Self {
        self.discount = Some(discount);
        self
    }

    /// 物料解析查詢
    pub fn product_query(&self) -> ResolutionQuery {
        ResolutionQuery::from_parts(
            self.product_id,
            self.product_code.as_deref(),
            self.product_name.as_deref(),
        )
    }

    /// 檢查行輸入（第 `number` 行，從 1 起算）
    pub fn validate(&self, number: usize) -> erp_core::Result<()> {
        if self.product_query().is_empty() {
            return Err(ErpError::validation(format!(
                "Line {}: product id or name is required",
                number
            )));
        }
        if self.quantity <= Decimal::ZERO {
            return Err(ErpError::validation(format!(
                "Line {}: quantity must be positive, got {}",
                number, self.quantity
            )));
        }
        if let Some(price) = self.unit_price {
            if price < Decimal::ZERO {
                return Err(ErpError::validation(format!(
                    "Line {}: unit price cannot be negative, got {}",
                    number, price
                )));
            }
        }
        if let Some(discount) = self.discount {
            if discount < Decimal::ZERO || discount > Decimal::ONE_HUNDRED {
                return Err(ErpError::validation(format!(
                    "Line {}: discount must be between 0 and 100, got {}",
                    number, discount
                )));
            }
        }
        Ok(())
    }
}

/// 文件建立請求
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentRequest {
    pub kind: DocumentKind,
    pub party: ResolutionQuery,
    pub lines: Vec<LineInput>,
    pub header: HeaderOptions,
    pub auto_confirm: bool,
}

impl DocumentRequest {
    /// 創建新的請求
    pub fn new(kind: DocumentKind, party: ResolutionQuery, lines: Vec<LineInput>) -> Self {
        Self {
            kind,
            party,
            lines,
            header: HeaderOptions::default(),
            auto_confirm: false,
        }
    }

    /// 建構器模式：設置表頭選項
    pub fn with_header(mut self, header: HeaderOptions) -> Self {
        self.header = header;
        self
    }

    /// 建構器模式：建立後自動確認
    pub fn with_auto_confirm(mut self, auto_confirm: bool) -> Self {
        self.auto_confirm = auto_confirm;
        self
    }

    /// 在任何服務呼叫之前檢查輸入
    pub fn validate(&self) -> erp_core::Result<()> {
        if self.party.is_empty() {
            return Err(ErpError::validation(format!(
                "{} id or name is required",
                self.kind.party_target().label
            )));
        }
        if self.lines.is_empty() {
            return Err(ErpError::validation("At least one order line is required"));
        }
        for (index, line) in self.lines.iter().enumerate() {
            line.validate(index + 1)?;
        }
        Ok(())
    }
}

/// 已建立的文件
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssembledDocument {
    pub kind: DocumentKind,
    pub order_id: RecordId,

    /// ERP 指派的文件編號
    pub reference: String,

    /// 往來對象名稱
    pub party: String,
    pub party_id: RecordId,

    pub lines: Vec<OrderLine>,

    /// 各行小計合計
    pub total_amount: Decimal,

    pub currency: Option<String>,
    pub state: String,

    /// 各行單價來源（與 `lines` 對應）
    pub price_sources: Vec<PriceSource>,

    /// 非致命警告（例如名稱有多筆候選）
    pub warnings: Vec<String>,
}

/// 文件組裝器
pub struct OrderAssembler<'a, S: ErpService> {
    service: &'a S,
    config: &'a OperationConfig,
}

impl<'a, S: ErpService> OrderAssembler<'a, S> {
    /// 創建新的組裝器
    pub fn new(service: &'a S, config: &'a OperationConfig) -> Self {
        Self { service, config }
    }

    /// 建立表頭與各行，必要時確認
    ///
    /// 表頭建立後的任何失敗以 `ErpError::PartialCommit` 回報，
    /// 內含已提交的表頭與行ID；`Compensate` 策略會先反向刪除。
    pub fn assemble(&self, request: &DocumentRequest) -> erp_core::Result<AssembledDocument> {
        request.validate()?;
        let kind = request.kind;
        let resolver = EntityResolver::new(self.service, self.config);

        let mut warnings = Vec::new();
        let party = resolver.resolve(&kind.party_target(), &request.party)?;
        collect_warning(&party, &mut warnings);
        let party = party.record;

        let header_id = self
            .service
            .insert(kind.header_model(), self.header_values(request, party.id))?;
        tracing::info!("{} {} 已建立，往來對象 {}", kind.label(), header_id, party.name());

        let mut committed =
            CommittedRecords::new(kind.header_model(), header_id, kind.line_model());
        match self.fill(request, &resolver, &party, &mut committed, warnings) {
            Ok(document) => Ok(document),
            Err(source) => Err(self.partial_failure(source, committed)),
        }
    }

    fn header_values(&self, request: &DocumentRequest, party_id: RecordId) -> Fields {
        let kind = request.kind;
        let mut values = Fields::new();
        values.insert("partner_id".to_string(), Value::from(party_id));
        if let Some(reference) = &request.header.reference {
            values.insert(kind.reference_field().to_string(), Value::from(reference.as_str()));
        }
        if let Some(notes) = &request.header.notes {
            values.insert(kind.notes_field().to_string(), Value::from(notes.as_str()));
        }
        if let Some(date) = request.header.date {
            values.insert(
                kind.date_field().to_string(),
                Value::from(date.format("%Y-%m-%d").to_string()),
            );
        }
        values
    }

    /// 表頭之後的步驟：逐行建立、回讀表頭、確認
    fn fill(
        &self,
        request: &DocumentRequest,
        resolver: &EntityResolver<'_, S>,
        party: &Record,
        committed: &mut CommittedRecords,
        mut warnings: Vec<String>,
    ) -> erp_core::Result<AssembledDocument> {
        let kind = request.kind;
        let product_target = kind.product_target();
        let mut lines = Vec::with_capacity(request.lines.len());
        let mut price_sources = Vec::with_capacity(request.lines.len());

        for (index, input) in request.lines.iter().enumerate() {
            let resolved = resolver.resolve(&product_target, &input.product_query())?;
            collect_warning(&resolved, &mut warnings);
            let product = resolved.record;

            let quote = effective_price(
                self.service,
                kind.price_rules(),
                &product,
                party.id,
                input.unit_price,
            )?;
            let discount = input.discount.unwrap_or(Decimal::ZERO);

            let mut values = Fields::new();
            values.insert("order_id".to_string(), Value::from(committed.header_id));
            values.insert("product_id".to_string(), Value::from(product.id));
            values.insert("name".to_string(), Value::from(product.name()));
            values.insert(kind.quantity_field().to_string(), decimal_value(input.quantity));
            values.insert("price_unit".to_string(), decimal_value(quote.unit_price));
            if discount > Decimal::ZERO {
                values.insert("discount".to_string(), decimal_value(discount));
            }
            if kind == DocumentKind::Purchase {
                if let Some(uom) = product.many2one_id("uom_po_id") {
                    values.insert("product_uom".to_string(), Value::from(uom));
                }
            }

            let line_id = self.service.insert(kind.line_model(), values)?;
            committed.push_line(line_id);
            tracing::debug!(
                "第 {} 行: {} × {} @ {} ({:?})",
                index + 1,
                product.name(),
                input.quantity,
                quote.unit_price,
                quote.source
            );

            lines.push(OrderLine::new(
                line_id,
                product.id,
                product.name(),
                input.quantity,
                quote.unit_price,
                discount,
            ));
            price_sources.push(quote.source);
        }

        let mut header = self.read_header(kind, committed.header_id)?;
        if request.auto_confirm {
            self.service.invoke(
                kind.header_model(),
                kind.confirm_method(),
                vec![Value::from(vec![committed.header_id])],
            )?;
            header = self.read_header(kind, committed.header_id)?;
            tracing::info!("{} {} 已確認", kind.label(), header.name());
        }

        let total_amount = round_money(lines.iter().map(|l: &OrderLine| l.subtotal).sum());

        Ok(AssembledDocument {
            kind,
            order_id: committed.header_id,
            reference: header.name().to_string(),
            party: party.name().to_string(),
            party_id: party.id,
            lines,
            total_amount,
            currency: header
                .many2one_name("currency_id")
                .map(str::to_string)
                .or_else(|| self.config.fallback_currency.clone()),
            state: header.str_field("state").unwrap_or("draft").to_string(),
            price_sources,
            warnings,
        })
    }

    fn read_header(&self, kind: DocumentKind, header_id: RecordId) -> erp_core::Result<Record> {
        self.service
            .fetch(kind.header_model(), &[header_id], &["name", "state", "currency_id"])?
            .into_iter()
            .next()
            .ok_or_else(|| ErpError::not_found(kind.label(), format!("with ID {}", header_id)))
    }

    /// 包裝表頭建立後的失敗，依策略補償
    fn partial_failure(&self, source: ErpError, mut committed: CommittedRecords) -> ErpError {
        tracing::warn!(
            "{} {} 建立中途失敗（已提交 {} 行）: {}",
            committed.header_model,
            committed.header_id,
            committed.line_ids.len(),
            source
        );

        if self.config.partial_commit == PartialCommitPolicy::Compensate {
            match self.compensate(&committed) {
                Ok(()) => committed.rolled_back = true,
                Err(e) => tracing::warn!("補償刪除失敗，保留已提交記錄: {}", e),
            }
        }

        ErpError::PartialCommit {
            source: Box::new(source),
            committed,
        }
    }

    fn compensate(&self, committed: &CommittedRecords) -> erp_core::Result<()> {
        for line_id in committed.line_ids.iter().rev() {
            self.service.invoke(
                &committed.line_model,
                "unlink",
                vec![Value::from(vec![*line_id])],
            )?;
        }
        self.service.invoke(
            &committed.header_model,
            "unlink",
            vec![Value::from(vec![committed.header_id])],
        )?;
        Ok(())
    }
}

fn collect_warning(resolved: &Resolved, warnings: &mut Vec<String>) {
    if let Some(warning) = &resolved.warning {
        warnings.push(warning.to_string());
    }
}
