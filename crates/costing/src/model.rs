use std::collections::{BTreeMap, HashMap};

use serde::{Serialize, Serializer};

use crate::error::LineError;

// ---------------------------------------------------------------------------
// Requisition input
// ---------------------------------------------------------------------------

/// Why a requisition line carries no measured consumption.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExclusionKind {
    StockIssued,
    ScrapCut,
}

impl std::fmt::Display for ExclusionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::StockIssued => write!(f, "stock_issued"),
            Self::ScrapCut => write!(f, "scrap_cut"),
        }
    }
}

/// Raw material consumed by a requisition line, in the material's unit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MaterialQuantity {
    Measured(f64),
    Excluded(ExclusionKind),
}

impl MaterialQuantity {
    pub fn measured(&self) -> Option<f64> {
        match self {
            Self::Measured(q) => Some(*q),
            Self::Excluded(_) => None,
        }
    }
}

/// A single requisition line: one product consuming one raw material.
#[derive(Debug, Clone, PartialEq)]
pub struct RequisitionLine {
    pub product_code: String,
    pub product_description: Option<String>,
    pub product_quantity: f64,
    pub material_code: String,
    pub material_description: Option<String>,
    pub material_quantity: MaterialQuantity,
}

impl RequisitionLine {
    pub fn new(
        product_code: impl Into<String>,
        product_quantity: f64,
        material_code: impl Into<String>,
        material_quantity: MaterialQuantity,
    ) -> Self {
        Self {
            product_code: product_code.into(),
            product_description: None,
            product_quantity,
            material_code: material_code.into(),
            material_description: None,
            material_quantity,
        }
    }

    pub fn with_product_description(mut self, description: impl Into<String>) -> Self {
        self.product_description = Some(description.into());
        self
    }

    pub fn with_material_description(mut self, description: impl Into<String>) -> Self {
        self.material_description = Some(description.into());
        self
    }

    /// Check the quantities this line needs before it can be allocated.
    pub fn validate(&self) -> Result<(), LineError> {
        if !self.product_quantity.is_finite() {
            return Err(LineError::NonFiniteQuantity { field: "product_quantity" });
        }
        if self.product_quantity <= 0.0 {
            return Err(LineError::NonPositiveProductQuantity { value: self.product_quantity });
        }
        if let MaterialQuantity::Measured(q) = self.material_quantity {
            if !q.is_finite() {
                return Err(LineError::NonFiniteQuantity { field: "material_quantity" });
            }
            if q < 0.0 {
                return Err(LineError::NegativeMaterialQuantity { value: q });
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Invoice input
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UnitClass {
    /// Continuous units (length, weight): cost is apportioned by consumption.
    Divisible,
    /// Each invoiced unit is indivisible: the full value is the cost event.
    UnitPriced,
}

/// Normalized unit of measure as printed on the invoice.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct UnitOfMeasure {
    pub code: String,
    pub class: UnitClass,
}

impl UnitOfMeasure {
    pub fn new(code: &str, class: UnitClass) -> Self {
        Self {
            code: code.trim().to_uppercase(),
            class,
        }
    }

    pub fn divisible(code: &str) -> Self {
        Self::new(code, UnitClass::Divisible)
    }

    pub fn unit_priced(code: &str) -> Self {
        Self::new(code, UnitClass::UnitPriced)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct InvoiceLine {
    pub material_code: String,
    pub description: Option<String>,
    pub unit: UnitOfMeasure,
    pub invoiced_quantity: f64,
    pub total_value: f64,
}

impl InvoiceLine {
    pub fn new(
        material_code: impl Into<String>,
        unit: UnitOfMeasure,
        invoiced_quantity: f64,
        total_value: f64,
    ) -> Self {
        Self {
            material_code: material_code.into(),
            description: None,
            unit,
            invoiced_quantity,
            total_value,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// Pre-loaded records for one requisition batch against one invoice batch.
#[derive(Debug, Clone, Default)]
pub struct CostInput {
    pub requisition: Vec<RequisitionLine>,
    pub invoice: Vec<InvoiceLine>,
}

// ---------------------------------------------------------------------------
// Consumption totals
// ---------------------------------------------------------------------------

/// Measured consumption of one material, summed over its valid lines.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MaterialConsumption {
    pub total: f64,
    /// Number of measured, valid lines that contributed to `total`.
    pub consumers: usize,
}

/// Total measured consumption per material code, across every product.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConsumptionTotals {
    pub(crate) totals: HashMap<String, MaterialConsumption>,
}

impl ConsumptionTotals {
    pub fn get(&self, material_code: &str) -> Option<MaterialConsumption> {
        self.totals.get(material_code).copied()
    }

    pub fn total(&self, material_code: &str) -> Option<f64> {
        self.get(material_code).map(|c| c.total)
    }

    pub fn len(&self) -> usize {
        self.totals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.totals.is_empty()
    }
}

impl FromIterator<(String, MaterialConsumption)> for ConsumptionTotals {
    fn from_iter<I: IntoIterator<Item = (String, MaterialConsumption)>>(iter: I) -> Self {
        Self {
            totals: iter.into_iter().collect(),
        }
    }
}

// ---------------------------------------------------------------------------
// Invoice index
// ---------------------------------------------------------------------------

/// The invoice listed a material under more than one unit code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnitConflict {
    pub first: String,
    pub conflicting: Vec<String>,
}

/// All invoice lines sharing one material code.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MaterialLedgerEntry {
    pub material_code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Unit of the first occurrence.
    pub unit: UnitOfMeasure,
    pub invoiced_quantity_sum: f64,
    pub total_value_sum: f64,
    pub line_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit_conflict: Option<UnitConflict>,
}

/// Lookup from material code to its ledger entry. Iterates in first-seen order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InvoiceIndex {
    pub(crate) entries: HashMap<String, MaterialLedgerEntry>,
    pub(crate) order: Vec<String>,
}

impl InvoiceIndex {
    pub fn get(&self, material_code: &str) -> Option<&MaterialLedgerEntry> {
        self.entries.get(material_code)
    }

    pub fn contains(&self, material_code: &str) -> bool {
        self.entries.contains_key(material_code)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &MaterialLedgerEntry> {
        self.order.iter().filter_map(|code| self.entries.get(code))
    }
}

// ---------------------------------------------------------------------------
// Allocation output
// ---------------------------------------------------------------------------

/// A presented cost: a number, or the reason there is none.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CostValue {
    Amount(f64),
    NotApplicable,
    NotInvoiced,
    NotComputed,
}

impl CostValue {
    pub fn amount(&self) -> Option<f64> {
        match self {
            Self::Amount(v) => Some(*v),
            _ => None,
        }
    }

    pub fn is_amount(&self) -> bool {
        matches!(self, Self::Amount(_))
    }
}

impl Serialize for CostValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Amount(v) => serializer.serialize_f64(*v),
            Self::NotApplicable => serializer.serialize_str("not_applicable"),
            Self::NotInvoiced => serializer.serialize_str("not_invoiced"),
            Self::NotComputed => serializer.serialize_str("not_computed"),
        }
    }
}

impl std::fmt::Display for CostValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Amount(v) => write!(f, "{v}"),
            Self::NotApplicable => write!(f, "not_applicable"),
            Self::NotInvoiced => write!(f, "not_invoiced"),
            Self::NotComputed => write!(f, "not_computed"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Divergence {
    None,
    StockOrScrap,
    MissingMaterial,
    UnitPriced,
    QuantityDivergence,
    UnitConflict,
    InvalidLine,
}

impl Divergence {
    /// Human-readable reason, as shown next to the cost in a report.
    pub fn description(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::StockOrScrap => "stock/scrap item (excluded from allocation)",
            Self::MissingMaterial => "material not present on invoice",
            Self::UnitPriced => "unit-priced item — not apportioned",
            Self::QuantityDivergence => "invoiced quantity differs from requisitioned quantity",
            Self::UnitConflict => "invoice lists material under conflicting units",
            Self::InvalidLine => "line could not be allocated",
        }
    }

    pub fn is_flagged(&self) -> bool {
        !matches!(self, Self::None)
    }
}

impl std::fmt::Display for Divergence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::None => write!(f, "none"),
            Self::StockOrScrap => write!(f, "stock_or_scrap"),
            Self::MissingMaterial => write!(f, "missing_material"),
            Self::UnitPriced => write!(f, "unit_priced"),
            Self::QuantityDivergence => write!(f, "quantity_divergence"),
            Self::UnitConflict => write!(f, "unit_conflict"),
            Self::InvalidLine => write!(f, "invalid_line"),
        }
    }
}

/// One output row per requisition line, in input order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResultRow {
    /// Zero-based position of the requisition line this row was built from.
    pub line: usize,
    pub product_code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub product_description: Option<String>,
    pub product_quantity: f64,
    pub material_code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub material_description: Option<String>,
    pub unit_cost: CostValue,
    pub total_cost: CostValue,
    pub divergence: Divergence,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<LineError>,
}

// ---------------------------------------------------------------------------
// Summary + Output
// ---------------------------------------------------------------------------

/// Allocated divisible cost compared with the invoice value it came from.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReconciliationCheck {
    pub allocated_total: f64,
    pub invoiced_total: f64,
    pub difference: f64,
    pub balanced: bool,
    /// Full-value attributions of unit-priced materials, reported apart.
    pub unit_priced_total: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CostSummary {
    pub total_rows: usize,
    pub allocated_rows: usize,
    pub flagged_rows: usize,
    pub error_rows: usize,
    pub divergence_counts: BTreeMap<String, usize>,
    pub reconciliation: ReconciliationCheck,
    pub unreferenced_materials: Vec<String>,
}

/// Summed cost of every material line of one product.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProductCost {
    pub product_code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub product_description: Option<String>,
    pub product_quantity: f64,
    pub line_count: usize,
    pub total_cost: f64,
    pub unit_cost: CostValue,
    pub flagged: bool,
    pub quantity_mismatch: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CostMeta {
    pub config_name: String,
    pub engine_version: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CostReport {
    pub meta: CostMeta,
    pub summary: CostSummary,
    pub rows: Vec<ResultRow>,
    pub products: Vec<ProductCost>,
}

/// Round half away from zero to `places` decimals.
pub(crate) fn round_to(value: f64, places: u32) -> f64 {
    let factor = 10f64.powi(places as i32);
    (value * factor).round() / factor
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validate_rejects_zero_product_quantity() {
        let line = RequisitionLine::new("23648", 0.0, "14592", MaterialQuantity::Measured(1.0));
        assert_eq!(
            line.validate(),
            Err(LineError::NonPositiveProductQuantity { value: 0.0 })
        );
    }

    #[test]
    fn validate_rejects_negative_material_quantity() {
        let line = RequisitionLine::new("23648", 5.0, "14592", MaterialQuantity::Measured(-2.0));
        assert_eq!(
            line.validate(),
            Err(LineError::NegativeMaterialQuantity { value: -2.0 })
        );
    }

    #[test]
    fn validate_accepts_excluded_quantity() {
        let line = RequisitionLine::new(
            "23648",
            5.0,
            "14592",
            MaterialQuantity::Excluded(ExclusionKind::ScrapCut),
        );
        assert!(line.validate().is_ok());
    }

    #[test]
    fn unit_code_is_normalized() {
        let unit = UnitOfMeasure::unit_priced(" pc ");
        assert_eq!(unit.code, "PC");
        assert_eq!(unit.class, UnitClass::UnitPriced);
    }

    #[test]
    fn cost_value_serializes_sentinels_as_strings() {
        let json = serde_json::to_string(&[
            CostValue::Amount(0.534),
            CostValue::NotApplicable,
            CostValue::NotInvoiced,
        ])
        .unwrap();
        assert_eq!(json, r#"[0.534,"not_applicable","not_invoiced"]"#);
    }

    #[test]
    fn rounding_is_applied_per_place_count() {
        assert_eq!(round_to(2.888_888_8, 2), 2.89);
        assert_eq!(round_to(0.288_888_8, 4), 0.2889);
        assert_eq!(round_to(5.34, 2), 5.34);
    }
}
