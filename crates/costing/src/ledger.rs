use std::collections::HashMap;

use crate::model::{InvoiceIndex, InvoiceLine, MaterialLedgerEntry, UnitConflict};

/// Build the material ledger: one entry per material code, summing quantity and value.
///
/// The first occurrence fixes the entry's unit. A later line under a different
/// unit code marks the entry with a [`UnitConflict`] instead of replacing it.
pub fn build_index(lines: &[InvoiceLine]) -> InvoiceIndex {
    let mut entries: HashMap<String, MaterialLedgerEntry> = HashMap::new();
    let mut order: Vec<String> = Vec::new();

    for line in lines {
        match entries.get_mut(&line.material_code) {
            Some(entry) => {
                entry.invoiced_quantity_sum += line.invoiced_quantity;
                entry.total_value_sum += line.total_value;
                entry.line_count += 1;
                if entry.description.is_none() {
                    entry.description = line.description.clone();
                }
                if line.unit.code != entry.unit.code {
                    record_conflict(entry, &line.unit.code);
                }
            }
            None => {
                order.push(line.material_code.clone());
                entries.insert(
                    line.material_code.clone(),
                    MaterialLedgerEntry {
                        material_code: line.material_code.clone(),
                        description: line.description.clone(),
                        unit: line.unit.clone(),
                        invoiced_quantity_sum: line.invoiced_quantity,
                        total_value_sum: line.total_value,
                        line_count: 1,
                        unit_conflict: None,
                    },
                );
            }
        }
    }

    log::debug!(
        "indexed {} invoice line(s) into {} material(s)",
        lines.len(),
        order.len()
    );

    InvoiceIndex { entries, order }
}

fn record_conflict(entry: &mut MaterialLedgerEntry, unit_code: &str) {
    let first = entry.unit.code.clone();
    let conflict = entry.unit_conflict.get_or_insert_with(|| UnitConflict {
        first,
        conflicting: Vec::new(),
    });
    if !conflict.conflicting.iter().any(|c| c == unit_code) {
        log::warn!(
            "material '{}' invoiced as '{}' and '{}'",
            entry.material_code,
            conflict.first,
            unit_code
        );
        conflict.conflicting.push(unit_code.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{UnitClass, UnitOfMeasure};

    #[test]
    fn sums_duplicate_codes() {
        let lines = vec![
            InvoiceLine::new("14592", UnitOfMeasure::divisible("M"), 6.0, 3.20),
            InvoiceLine::new("99001", UnitOfMeasure::unit_priced("PC"), 2.0, 50.0),
            InvoiceLine::new("14592", UnitOfMeasure::divisible("M"), 4.0, 2.14),
        ];
        let index = build_index(&lines);
        assert_eq!(index.len(), 2);

        let entry = index.get("14592").unwrap();
        assert_eq!(entry.invoiced_quantity_sum, 10.0);
        assert!((entry.total_value_sum - 5.34).abs() < 1e-9);
        assert_eq!(entry.line_count, 2);
        assert!(entry.unit_conflict.is_none());

        let codes: Vec<_> = index.iter().map(|e| e.material_code.as_str()).collect();
        assert_eq!(codes, vec!["14592", "99001"]);
    }

    #[test]
    fn absent_code_has_no_entry() {
        let lines = vec![InvoiceLine::new("14592", UnitOfMeasure::divisible("M"), 1.0, 1.0)];
        let index = build_index(&lines);
        assert!(!index.contains("00000"));
        assert!(index.get("00000").is_none());
    }

    #[test]
    fn unit_conflict_keeps_first_unit() {
        let lines = vec![
            InvoiceLine::new("14592", UnitOfMeasure::divisible("KG"), 10.0, 20.0),
            InvoiceLine::new("14592", UnitOfMeasure::unit_priced("PC"), 1.0, 5.0),
            InvoiceLine::new("14592", UnitOfMeasure::unit_priced("PC"), 1.0, 5.0),
            InvoiceLine::new("14592", UnitOfMeasure::divisible("M"), 2.0, 1.0),
        ];
        let index = build_index(&lines);
        let entry = index.get("14592").unwrap();

        assert_eq!(entry.unit.code, "KG");
        assert_eq!(entry.unit.class, UnitClass::Divisible);
        assert_eq!(entry.invoiced_quantity_sum, 14.0);
        assert_eq!(entry.total_value_sum, 31.0);

        let conflict = entry.unit_conflict.as_ref().unwrap();
        assert_eq!(conflict.first, "KG");
        assert_eq!(conflict.conflicting, vec!["PC", "M"]);
    }

    #[test]
    fn first_description_wins() {
        let lines = vec![
            InvoiceLine::new("14592", UnitOfMeasure::divisible("M"), 1.0, 1.0),
            InvoiceLine::new("14592", UnitOfMeasure::divisible("M"), 1.0, 1.0)
                .with_description("TUBO ACO 1/2"),
            InvoiceLine::new("14592", UnitOfMeasure::divisible("M"), 1.0, 1.0)
                .with_description("TUBO"),
        ];
        let index = build_index(&lines);
        assert_eq!(index.get("14592").unwrap().description.as_deref(), Some("TUBO ACO 1/2"));
    }
}
