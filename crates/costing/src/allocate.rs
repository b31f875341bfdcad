use crate::error::LineError;
use crate::model::{
    round_to, ConsumptionTotals, CostValue, Divergence, InvoiceIndex, MaterialLedgerEntry,
    MaterialQuantity, RequisitionLine, ResultRow, UnitClass,
};

/// Numeric settings for one allocation pass.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AllocationPolicy {
    /// Absolute tolerance for quantity comparisons.
    pub tolerance: f64,
    pub unit_cost_places: u32,
    pub total_cost_places: u32,
}

impl Default for AllocationPolicy {
    fn default() -> Self {
        Self {
            tolerance: 1e-4,
            unit_cost_places: 4,
            total_cost_places: 2,
        }
    }
}

/// Unrounded outcome of one line, before presentation.
#[derive(Debug, Clone, PartialEq)]
enum LineCost {
    Excluded,
    NotInvoiced,
    UnitPriced { total: f64 },
    Apportioned { unit: f64, total: f64, diverges: bool },
}

/// Cost every requisition line against the consumption totals and the invoice index.
///
/// Output order and length match `lines`. A line that cannot be classified gets
/// a row carrying its [`LineError`]; the rest of the batch is unaffected.
pub fn allocate(
    lines: &[RequisitionLine],
    consumption: &ConsumptionTotals,
    index: &InvoiceIndex,
    policy: &AllocationPolicy,
) -> Vec<ResultRow> {
    lines
        .iter()
        .enumerate()
        .map(|(position, line)| {
            let entry = index.get(&line.material_code);
            match classify_line(line, consumption, entry, policy.tolerance) {
                Ok(cost) => present(position, line, entry, cost, policy),
                Err(err) => {
                    log::warn!(
                        "requisition line {position} (product '{}', material '{}'): {err}",
                        line.product_code,
                        line.material_code
                    );
                    failed_row(position, line, err)
                }
            }
        })
        .collect()
}

fn classify_line(
    line: &RequisitionLine,
    consumption: &ConsumptionTotals,
    entry: Option<&MaterialLedgerEntry>,
    tolerance: f64,
) -> Result<LineCost, LineError> {
    line.validate()?;

    let quantity = match line.material_quantity {
        MaterialQuantity::Excluded(_) => return Ok(LineCost::Excluded),
        MaterialQuantity::Measured(q) => q,
    };

    let Some(entry) = entry else {
        return Ok(LineCost::NotInvoiced);
    };

    if entry.unit.class == UnitClass::UnitPriced {
        return Ok(LineCost::UnitPriced {
            total: entry.total_value_sum,
        });
    }

    let consumed = consumption
        .get(&line.material_code)
        .filter(|c| c.consumers > 0)
        .ok_or_else(|| LineError::MissingConsumptionTotal {
            material_code: line.material_code.clone(),
        })?;
    let total = consumed.total;

    if total < quantity - tolerance {
        return Err(LineError::ConsumptionBelowLine {
            material_code: line.material_code.clone(),
            total,
            line_quantity: quantity,
        });
    }

    if consumed.consumers == 1 {
        // Sole consumer: the whole invoiced value belongs to this line.
        let unit = entry.total_value_sum / line.product_quantity;
        return Ok(LineCost::Apportioned {
            unit,
            total: unit * line.product_quantity,
            diverges: (entry.invoiced_quantity_sum - quantity).abs() > tolerance,
        });
    }

    // Several lines with nothing measured share the value evenly.
    let share = if total > 0.0 {
        quantity / total
    } else {
        1.0 / consumed.consumers as f64
    };
    let allocated = share * entry.total_value_sum;
    Ok(LineCost::Apportioned {
        unit: allocated / line.product_quantity,
        total: allocated,
        diverges: (entry.invoiced_quantity_sum - total).abs() > tolerance,
    })
}

fn present(
    position: usize,
    line: &RequisitionLine,
    entry: Option<&MaterialLedgerEntry>,
    cost: LineCost,
    policy: &AllocationPolicy,
) -> ResultRow {
    let (unit_cost, total_cost, divergence) = match cost {
        LineCost::Excluded => (
            CostValue::NotApplicable,
            CostValue::NotApplicable,
            Divergence::StockOrScrap,
        ),
        LineCost::NotInvoiced => (
            CostValue::NotInvoiced,
            CostValue::NotInvoiced,
            Divergence::MissingMaterial,
        ),
        LineCost::UnitPriced { total } => (
            CostValue::NotApplicable,
            CostValue::Amount(round_to(total, policy.total_cost_places)),
            Divergence::UnitPriced,
        ),
        LineCost::Apportioned { unit, total, diverges } => (
            CostValue::Amount(round_to(unit, policy.unit_cost_places)),
            CostValue::Amount(round_to(total, policy.total_cost_places)),
            if diverges {
                Divergence::QuantityDivergence
            } else {
                Divergence::None
            },
        ),
    };

    let has_conflict = entry.is_some_and(|e| e.unit_conflict.is_some());
    let divergence = if has_conflict && divergence != Divergence::StockOrScrap {
        Divergence::UnitConflict
    } else {
        divergence
    };

    ResultRow {
        line: position,
        product_code: line.product_code.clone(),
        product_description: line.product_description.clone(),
        product_quantity: line.product_quantity,
        material_code: line.material_code.clone(),
        material_description: line.material_description.clone(),
        unit_cost,
        total_cost,
        divergence,
        error: None,
    }
}

fn failed_row(position: usize, line: &RequisitionLine, err: LineError) -> ResultRow {
    ResultRow {
        line: position,
        product_code: line.product_code.clone(),
        product_description: line.product_description.clone(),
        product_quantity: line.product_quantity,
        material_code: line.material_code.clone(),
        material_description: line.material_description.clone(),
        unit_cost: CostValue::NotComputed,
        total_cost: CostValue::NotComputed,
        divergence: Divergence::InvalidLine,
        error: Some(err),
    }
}
