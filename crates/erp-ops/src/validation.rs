//! 輸入驗證（在任何 ERP 呼叫之前）

use erp_calc::ResolutionQuery;
use erp_core::ErpError;
use rust_decimal::Decimal;

/// 識別資訊必須存在
pub fn require_identifier(query: &ResolutionQuery, entity: &str) -> erp_core::Result<()> {
    if query.is_empty() {
        return Err(ErpError::validation(format!("{} id or name is required", entity)));
    }
    Ok(())
}

/// 數值必須 > 0
pub fn require_positive(value: Decimal, field: &str) -> erp_core::Result<()> {
    if value <= Decimal::ZERO {
        return Err(ErpError::validation(format!(
            "'{}' must be positive, got {}",
            field, value
        )));
    }
    Ok(())
}

/// 數值必須 >= 0
pub fn require_non_negative(value: Decimal, field: &str) -> erp_core::Result<()> {
    if value < Decimal::ZERO {
        return Err(ErpError::validation(format!(
            "'{}' cannot be negative, got {}",
            field, value
        )));
    }
    Ok(())
}
