//! # ERP Calculation Components
//!
//! 實體解析、庫存調整、缺料計算、文件組裝與錯誤分類

pub mod assembler;
pub mod availability;
pub mod bom;
pub mod classifier;
pub mod pricing;
pub mod reconciler;
pub mod resolver;

// Re-export 主要類型
pub use assembler::{AssembledDocument, DocumentKind, DocumentRequest, LineInput, OrderAssembler};
pub use availability::AvailabilityCalculator;
pub use bom::{Bom, BomLocator};
pub use classifier::{ErrorClassifier, CLASSIFICATION_RULES};
pub use pricing::{effective_price, PriceQuote, PriceRules, PriceSource};
pub use reconciler::{Adjustment, QuantityReconciler};
pub use resolver::{
    AmbiguityWarning, Candidate, EntityResolver, ResolutionQuery, ResolutionTarget, Resolved,
};
