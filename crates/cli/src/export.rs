//! CSV rendering of allocation results.

use reqcost_engine::model::{CostValue, ProductCost, ResultRow};

const ROW_HEADERS: [&str; 11] = [
    "line",
    "product_code",
    "product_description",
    "product_quantity",
    "material_code",
    "material_description",
    "unit_cost",
    "total_cost",
    "divergence",
    "divergence_reason",
    "error",
];

const PRODUCT_HEADERS: [&str; 8] = [
    "product_code",
    "product_description",
    "product_quantity",
    "line_count",
    "total_cost",
    "unit_cost",
    "flagged",
    "quantity_mismatch",
];

/// Fixed-decimal amount, or the sentinel name.
pub fn format_cost(value: CostValue, places: u32) -> String {
    match value {
        CostValue::Amount(v) => format!("{:.*}", places as usize, v),
        other => other.to_string(),
    }
}

fn format_quantity(value: f64) -> String {
    value.to_string()
}

/// Serialize result rows as CSV, one record per requisition line.
pub fn rows_to_csv(
    rows: &[ResultRow],
    unit_cost_places: u32,
    total_cost_places: u32,
) -> Result<String, csv::Error> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(ROW_HEADERS)?;

    for row in rows {
        writer.write_record([
            row.line.to_string(),
            row.product_code.clone(),
            row.product_description.clone().unwrap_or_default(),
            format_quantity(row.product_quantity),
            row.material_code.clone(),
            row.material_description.clone().unwrap_or_default(),
            format_cost(row.unit_cost, unit_cost_places),
            format_cost(row.total_cost, total_cost_places),
            row.divergence.to_string(),
            row.divergence.description().to_string(),
            row.error.as_ref().map(|e| e.to_string()).unwrap_or_default(),
        ])?;
    }

    into_string(writer)
}

/// Serialize the per-product rollup as CSV.
pub fn products_to_csv(
    products: &[ProductCost],
    unit_cost_places: u32,
    total_cost_places: u32,
) -> Result<String, csv::Error> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(PRODUCT_HEADERS)?;

    for p in products {
        writer.write_record([
            p.product_code.clone(),
            p.product_description.clone().unwrap_or_default(),
            format_quantity(p.product_quantity),
            p.line_count.to_string(),
            format_cost(CostValue::Amount(p.total_cost), total_cost_places),
            format_cost(p.unit_cost, unit_cost_places),
            p.flagged.to_string(),
            p.quantity_mismatch.to_string(),
        ])?;
    }

    into_string(writer)
}

fn into_string(writer: csv::Writer<Vec<u8>>) -> Result<String, csv::Error> {
    let bytes = writer.into_inner().map_err(|e| csv::Error::from(e.into_error()))?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqcost_engine::model::Divergence;
    use reqcost_engine::LineError;

    fn row(line: usize, unit: CostValue, total: CostValue, divergence: Divergence) -> ResultRow {
        ResultRow {
            line,
            product_code: "23648".into(),
            product_description: Some("SUPORTE, LATERAL".into()),
            product_quantity: 10.0,
            material_code: "14592".into(),
            material_description: None,
            unit_cost: unit,
            total_cost: total,
            divergence,
            error: None,
        }
    }

    #[test]
    fn format_cost_pads_places() {
        assert_eq!(format_cost(CostValue::Amount(5.34), 2), "5.34");
        assert_eq!(format_cost(CostValue::Amount(0.534), 4), "0.5340");
        assert_eq!(format_cost(CostValue::Amount(50.0), 2), "50.00");
        assert_eq!(format_cost(CostValue::NotInvoiced, 2), "not_invoiced");
    }

    #[test]
    fn rows_csv_layout() {
        let mut failed = row(1, CostValue::NotComputed, CostValue::NotComputed, Divergence::InvalidLine);
        failed.error = Some(LineError::NonPositiveProductQuantity { value: 0.0 });
        let rows = vec![
            row(0, CostValue::Amount(0.534), CostValue::Amount(5.34), Divergence::None),
            failed,
        ];
        let csv = rows_to_csv(&rows, 4, 2).unwrap();
        let lines: Vec<&str> = csv.lines().collect();

        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], ROW_HEADERS.join(","));
        assert_eq!(
            lines[1],
            "0,23648,\"SUPORTE, LATERAL\",10,14592,,0.5340,5.34,none,none,"
        );
        assert!(lines[2].starts_with("1,23648,"));
        assert!(lines[2].contains("not_computed,not_computed,invalid_line"));
        assert!(lines[2].contains("product quantity must be positive"));
    }

    #[test]
    fn products_csv_layout() {
        let products = vec![ProductCost {
            product_code: "23648".into(),
            product_description: None,
            product_quantity: 10.0,
            line_count: 2,
            total_cost: 55.34,
            unit_cost: CostValue::Amount(5.534),
            flagged: true,
            quantity_mismatch: false,
        }];
        let csv = products_to_csv(&products, 4, 2).unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines[1], "23648,,10,2,55.34,5.5340,true,false");
    }
}
