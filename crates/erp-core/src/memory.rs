//! 記憶體內 ERP 服務
//!
//! 以資料表映射實作 `ErpService`，供測試與演練使用。單執行緒（`RefCell`）。

use serde_json::Value;
use std::cell::{Cell, RefCell};
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};

use crate::domain::{Domain, SearchOptions};
use crate::record::{fields_from, Fields, Record, RecordId};
use crate::service::{models, ErpService, ServiceError};

/// 服務呼叫類型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CallKind {
    Find,
    Fetch,
    Insert,
    Mutate,
    Invoke,
}

/// 呼叫記錄
#[derive(Debug, Clone, PartialEq)]
pub struct ServiceCall {
    pub kind: CallKind,
    pub model: String,
    /// `invoke` 的方法名稱
    pub method: Option<String>,
}

/// 注入的失敗規則
#[derive(Debug, Clone)]
struct FailureRule {
    kind: CallKind,
    model: String,
    /// 先放行的次數
    skip: usize,
    message: String,
}

/// 記憶體內 ERP 服務
#[derive(Debug)]
pub struct MemoryService {
    tables: RefCell<BTreeMap<String, BTreeMap<RecordId, Fields>>>,
    next_id: Cell<RecordId>,
    sequences: RefCell<HashMap<String, (String, u32)>>,
    defaults: RefCell<HashMap<String, Fields>>,
    failures: RefCell<Vec<FailureRule>>,
    calls: RefCell<Vec<ServiceCall>>,
    reverse_results: Cell<bool>,
}

impl Default for MemoryService {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryService {
    /// 創建空的服務
    pub fn new() -> Self {
        Self {
            tables: RefCell::new(BTreeMap::new()),
            next_id: Cell::new(1),
            sequences: RefCell::new(HashMap::new()),
            defaults: RefCell::new(HashMap::new()),
            failures: RefCell::new(Vec::new()),
            calls: RefCell::new(Vec::new()),
            reverse_results: Cell::new(false),
        }
    }

    /// 創建預先設定文件編號與草稿狀態的服務
    pub fn with_erp_defaults() -> Self {
        let service = Self::new();
        service.set_sequence(models::SALE_ORDER, "S");
        service.set_sequence(models::PURCHASE_ORDER, "P");
        service.set_sequence(models::PRODUCTION, "WH/MO/");
        for model in [models::SALE_ORDER, models::PURCHASE_ORDER, models::PRODUCTION] {
            service.set_default(model, "state", Value::from("draft"));
        }
        service
    }

    /// 設置模型的編號前綴（建立時若未提供 `name` 則自動編號）
    pub fn set_sequence(&self, model: &str, prefix: &str) {
        self.sequences
            .borrow_mut()
            .insert(model.to_string(), (prefix.to_string(), 0));
    }

    /// 設置模型欄位預設值
    pub fn set_default(&self, model: &str, field: &str, value: Value) {
        self.defaults
            .borrow_mut()
            .entry(model.to_string())
            .or_default()
            .insert(field.to_string(), value);
    }

    /// 直接寫入記錄（可在 JSON 中指定 `id`），回傳ID
    pub fn seed(&self, model: &str, value: Value) -> RecordId {
        let mut fields = fields_from(value);
        let id = match fields.remove("id").and_then(|v| v.as_i64()) {
            Some(id) => id,
            None => self.next_id.get(),
        };
        if id >= self.next_id.get() {
            self.next_id.set(id + 1);
        }
        self.tables
            .borrow_mut()
            .entry(model.to_string())
            .or_default()
            .insert(id, fields);
        id
    }

    /// 讓指定呼叫失敗
    pub fn fail_on(&self, kind: CallKind, model: &str, message: &str) {
        self.fail_after(kind, model, 0, message);
    }

    /// 放行前 `skip` 次後讓指定呼叫失敗
    pub fn fail_after(&self, kind: CallKind, model: &str, skip: usize, message: &str) {
        self.failures.borrow_mut().push(FailureRule {
            kind,
            model: model.to_string(),
            skip,
            message: message.to_string(),
        });
    }

    /// 未指定排序時以ID遞減回傳（模擬不穩定的服務排序）
    pub fn reverse_results(&self, reverse: bool) {
        self.reverse_results.set(reverse);
    }

    /// 模型的全部記錄（ID遞增）
    pub fn records(&self, model: &str) -> Vec<Record> {
        self.tables
            .borrow()
            .get(model)
            .map(|table| {
                table
                    .iter()
                    .map(|(id, fields)| Record::new(*id, fields.clone()))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// 單筆記錄
    pub fn record(&self, model: &str, id: RecordId) -> Option<Record> {
        self.tables
            .borrow()
            .get(model)
            .and_then(|table| table.get(&id))
            .map(|fields| Record::new(id, fields.clone()))
    }

    /// 呼叫記錄
    pub fn calls(&self) -> Vec<ServiceCall> {
        self.calls.borrow().clone()
    }

    /// 指定類型與模型的呼叫次數
    pub fn call_count(&self, kind: CallKind, model: &str) -> usize {
        self.calls
            .borrow()
            .iter()
            .filter(|c| c.kind == kind && c.model == model)
            .count()
    }

    fn track(&self, kind: CallKind, model: &str, method: Option<&str>) -> Result<(), ServiceError> {
        self.calls.borrow_mut().push(ServiceCall {
            kind,
            model: model.to_string(),
            method: method.map(str::to_string),
        });

        let mut failures = self.failures.borrow_mut();
        for rule in failures.iter_mut() {
            if rule.kind == kind && rule.model == model {
                if rule.skip == 0 {
                    return Err(ServiceError::new(rule.message.clone()));
                }
                rule.skip -= 1;
            }
        }
        Ok(())
    }

    fn project(id: RecordId, fields: &Fields, wanted: &[&str]) -> Record {
        if wanted.is_empty() {
            return Record::new(id, fields.clone());
        }
        let projected = wanted
            .iter()
            .filter_map(|f| fields.get(*f).map(|v| (f.to_string(), v.clone())))
            .collect();
        Record::new(id, projected)
    }

    fn sort(&self, records: &mut [Record], order: Option<&str>) {
        match order {
            Some(clause) => {
                let mut parts = clause.split_whitespace();
                let field = parts.next().unwrap_or("id");
                let descending = parts.next().is_some_and(|d| d.eq_ignore_ascii_case("desc"));
                records.sort_by(|a, b| {
                    let ordering = order_values(&sort_key(a, field), &sort_key(b, field))
                        .then(a.id.cmp(&b.id));
                    if descending {
                        ordering.reverse()
                    } else {
                        ordering
                    }
                });
            }
            None if self.reverse_results.get() => records.sort_by(|a, b| b.id.cmp(&a.id)),
            None => records.sort_by_key(|r| r.id),
        }
    }

    fn confirmed_state(model: &str) -> &'static str {
        match model {
            models::SALE_ORDER => "sale",
            models::PURCHASE_ORDER => "purchase",
            _ => "confirmed",
        }
    }
}

fn sort_key(record: &Record, field: &str) -> Value {
    if field == "id" {
        return Value::from(record.id);
    }
    record.fields.get(field).cloned().unwrap_or(Value::Null)
}

/// 數字與字串（日期）可排序，空值排最前
fn order_values(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x
            .as_f64()
            .partial_cmp(&y.as_f64())
            .unwrap_or(Ordering::Equal),
        (Value::String(x), Value::String(y)) => x.cmp(y),
        (Value::Null | Value::Bool(false), Value::Null | Value::Bool(false)) => Ordering::Equal,
        (Value::Null | Value::Bool(false), _) => Ordering::Less,
        (_, Value::Null | Value::Bool(false)) => Ordering::Greater,
        _ => Ordering::Equal,
    }
}

fn ids_argument(args: &[Value]) -> Vec<RecordId> {
    match args.first() {
        Some(Value::Array(ids)) => ids.iter().filter_map(Value::as_i64).collect(),
        Some(Value::Number(n)) => n.as_i64().into_iter().collect(),
        _ => Vec::new(),
    }
}

impl ErpService for MemoryService {
    fn find(
        &self,
        model: &str,
        domain: &Domain,
        fields: &[&str],
        options: &SearchOptions,
    ) -> Result<Vec<Record>, ServiceError> {
        self.track(CallKind::Find, model, None)?;

        let tables = self.tables.borrow();
        let mut matched: Vec<Record> = tables
            .get(model)
            .map(|table| {
                table
                    .iter()
                    .map(|(id, f)| Record::new(*id, f.clone()))
                    .filter(|r| domain.matches(r))
                    .collect()
            })
            .unwrap_or_default();
        self.sort(&mut matched, options.order.as_deref());

        let limit = options.limit.unwrap_or(usize::MAX);
        Ok(matched
            .into_iter()
            .skip(options.offset)
            .take(limit)
            .map(|r| Self::project(r.id, &r.fields, fields))
            .collect())
    }

    fn fetch(
        &self,
        model: &str,
        ids: &[RecordId],
        fields: &[&str],
    ) -> Result<Vec<Record>, ServiceError> {
        self.track(CallKind::Fetch, model, None)?;

        let tables = self.tables.borrow();
        let Some(table) = tables.get(model) else {
            return Ok(Vec::new());
        };
        Ok(ids
            .iter()
            .filter_map(|id| table.get(id).map(|f| Self::project(*id, f, fields)))
            .collect())
    }

    fn insert(&self, model: &str, values: Fields) -> Result<RecordId, ServiceError> {
        self.track(CallKind::Insert, model, None)?;

        let mut fields = self.defaults.borrow().get(model).cloned().unwrap_or_default();
        fields.extend(values);

        let id = self.next_id.get();
        self.next_id.set(id + 1);

        if !fields.contains_key("name") {
            if let Some((prefix, counter)) = self.sequences.borrow_mut().get_mut(model) {
                *counter += 1;
                fields.insert("name".to_string(), Value::from(format!("{}{:05}", prefix, counter)));
            }
        }

        self.tables
            .borrow_mut()
            .entry(model.to_string())
            .or_default()
            .insert(id, fields);
        Ok(id)
    }

    fn mutate(&self, model: &str, ids: &[RecordId], values: Fields) -> Result<bool, ServiceError> {
        self.track(CallKind::Mutate, model, None)?;

        let mut tables = self.tables.borrow_mut();
        let table = tables.entry(model.to_string()).or_default();
        if let Some(missing) = ids.iter().find(|id| !table.contains_key(id)) {
            return Err(ServiceError::new(format!(
                "Record {}({},) does not exist or has been deleted",
                model, missing
            )));
        }
        for id in ids {
            if let Some(fields) = table.get_mut(id) {
                fields.extend(values.clone());
            }
        }
        Ok(true)
    }

    fn invoke(&self, model: &str, method: &str, args: Vec<Value>) -> Result<Value, ServiceError> {
        self.track(CallKind::Invoke, model, Some(method))?;

        let ids = ids_argument(&args);
        let mut tables = self.tables.borrow_mut();
        let table = tables.entry(model.to_string()).or_default();

        match method {
            "unlink" => {
                for id in &ids {
                    table.remove(id);
                }
                Ok(Value::Bool(true))
            }
            m if m.ends_with("confirm") => {
                for id in &ids {
                    let fields = table.get_mut(id).ok_or_else(|| {
                        ServiceError::new(format!(
                            "Record {}({},) does not exist or has been deleted",
                            model, id
                        ))
                    })?;
                    fields.insert("state".to_string(), Value::from(Self::confirmed_state(model)));
                }
                Ok(Value::Bool(true))
            }
            other => Err(ServiceError::new(format!(
                "Method {} does not exist on model {}",
                other, model
            ))),
        }
    }
}
