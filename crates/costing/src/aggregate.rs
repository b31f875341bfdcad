use std::collections::HashMap;

use crate::model::{ConsumptionTotals, MaterialConsumption, RequisitionLine};

/// Sum measured consumption per material code across every product line.
///
/// Excluded (stock/scrap) lines and lines that fail validation contribute
/// nothing; they still reach the allocator, which reports them.
pub fn aggregate_consumption(lines: &[RequisitionLine]) -> ConsumptionTotals {
    let mut totals: HashMap<String, MaterialConsumption> = HashMap::new();

    for line in lines {
        let Some(quantity) = line.material_quantity.measured() else {
            continue;
        };
        if line.validate().is_err() {
            continue;
        }
        let entry = totals
            .entry(line.material_code.clone())
            .or_insert(MaterialConsumption { total: 0.0, consumers: 0 });
        entry.total += quantity;
        entry.consumers += 1;
    }

    log::debug!(
        "aggregated consumption for {} material(s) from {} requisition line(s)",
        totals.len(),
        lines.len()
    );

    ConsumptionTotals { totals }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ExclusionKind, MaterialQuantity};

    fn line(product: &str, material: &str, qty: f64) -> RequisitionLine {
        RequisitionLine::new(product, 10.0, material, MaterialQuantity::Measured(qty))
    }

    #[test]
    fn empty_input_gives_empty_totals() {
        let totals = aggregate_consumption(&[]);
        assert!(totals.is_empty());
    }

    #[test]
    fn sums_across_products() {
        let lines = vec![
            line("A", "MP1", 130.0),
            line("B", "MP1", 320.0),
            line("B", "MP2", 4.5),
        ];
        let totals = aggregate_consumption(&lines);
        assert_eq!(totals.len(), 2);
        assert_eq!(totals.total("MP1"), Some(450.0));
        assert_eq!(totals.total("MP2"), Some(4.5));
    }

    #[test]
    fn excluded_lines_do_not_count() {
        let lines = vec![
            line("A", "MP1", 12.0),
            RequisitionLine::new(
                "B",
                3.0,
                "MP1",
                MaterialQuantity::Excluded(ExclusionKind::StockIssued),
            ),
            RequisitionLine::new(
                "C",
                3.0,
                "MP3",
                MaterialQuantity::Excluded(ExclusionKind::ScrapCut),
            ),
        ];
        let totals = aggregate_consumption(&lines);
        assert_eq!(totals.total("MP1"), Some(12.0));
        assert_eq!(totals.total("MP3"), None);
    }

    #[test]
    fn invalid_lines_do_not_count() {
        let mut zero_product = line("A", "MP1", 50.0);
        zero_product.product_quantity = 0.0;
        let lines = vec![zero_product, line("B", "MP1", -5.0), line("C", "MP1", 20.0)];
        let totals = aggregate_consumption(&lines);
        assert_eq!(totals.total("MP1"), Some(20.0));
    }

    #[test]
    fn counts_consumers_including_zero_quantities() {
        let lines = vec![line("A", "MP1", 0.0), line("B", "MP1", 0.0), line("C", "MP2", 3.0)];
        let totals = aggregate_consumption(&lines);
        assert_eq!(
            totals.get("MP1"),
            Some(MaterialConsumption { total: 0.0, consumers: 2 })
        );
        assert_eq!(totals.get("MP2").map(|c| c.consumers), Some(1));
    }
}
