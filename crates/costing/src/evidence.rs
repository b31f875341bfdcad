use std::collections::{BTreeMap, HashSet};

use crate::model::{
    round_to, CostSummary, Divergence, InvoiceIndex, ReconciliationCheck, ResultRow, UnitClass,
};

/// Rounding slack allowed per allocated row when checking the reconciliation.
const CENT: f64 = 0.01;

/// Compute summary statistics and the divisible-cost reconciliation check.
pub fn compute_summary(rows: &[ResultRow], index: &InvoiceIndex) -> CostSummary {
    let mut divergence_counts: BTreeMap<String, usize> = BTreeMap::new();
    let mut flagged_rows = 0;
    let mut error_rows = 0;
    let mut allocated_rows = 0;
    let mut allocated_total = 0.0;
    let mut unit_priced_total = 0.0;
    let mut allocated_materials: Vec<&str> = Vec::new();
    let mut allocated_seen: HashSet<&str> = HashSet::new();
    let mut referenced: HashSet<&str> = HashSet::new();

    for row in rows {
        *divergence_counts.entry(row.divergence.to_string()).or_insert(0) += 1;
        referenced.insert(row.material_code.as_str());

        if row.divergence.is_flagged() {
            flagged_rows += 1;
        }
        if row.error.is_some() {
            error_rows += 1;
        }

        let (Some(total), Some(entry)) = (row.total_cost.amount(), index.get(&row.material_code))
        else {
            continue;
        };
        match entry.unit.class {
            UnitClass::Divisible => {
                allocated_rows += 1;
                allocated_total += total;
                if allocated_seen.insert(entry.material_code.as_str()) {
                    allocated_materials.push(entry.material_code.as_str());
                }
            }
            UnitClass::UnitPriced => unit_priced_total += total,
        }
    }

    let invoiced_total: f64 = allocated_materials
        .iter()
        .filter_map(|code| index.get(code))
        .map(|entry| entry.total_value_sum)
        .sum();
    let difference = allocated_total - invoiced_total;
    let balanced = difference.abs() <= CENT * allocated_rows.max(1) as f64 + 1e-9;

    let unreferenced_materials: Vec<String> = index
        .iter()
        .filter(|entry| !referenced.contains(entry.material_code.as_str()))
        .map(|entry| entry.material_code.clone())
        .collect();
    if !unreferenced_materials.is_empty() {
        log::warn!(
            "{} invoiced material(s) not referenced by the requisition: {}",
            unreferenced_materials.len(),
            unreferenced_materials.join(", ")
        );
    }
    if !balanced {
        log::warn!(
            "allocated divisible cost {allocated_total:.2} differs from invoiced {invoiced_total:.2}"
        );
    }

    CostSummary {
        total_rows: rows.len(),
        allocated_rows,
        flagged_rows,
        error_rows,
        divergence_counts,
        reconciliation: ReconciliationCheck {
            allocated_total: round_to(allocated_total, 2),
            invoiced_total: round_to(invoiced_total, 2),
            difference: round_to(difference, 2),
            balanced,
            unit_priced_total: round_to(unit_priced_total, 2),
        },
        unreferenced_materials,
    }
}

/// Count of rows carrying the given divergence.
pub fn count_divergence(summary: &CostSummary, divergence: Divergence) -> usize {
    summary
        .divergence_counts
        .get(&divergence.to_string())
        .copied()
        .unwrap_or(0)
}
