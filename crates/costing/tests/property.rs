// Property-based tests for the allocation engine.
// CI: 256 cases (default). Soak: PROPTEST_CASES=10000 cargo test --release

use proptest::prelude::*;
use reqcost_engine::model::{ExclusionKind, InvoiceLine, MaterialQuantity, RequisitionLine, UnitOfMeasure};
use reqcost_engine::{aggregate_consumption, allocate, build_index, AllocationPolicy, CostValue};

fn config_256() -> ProptestConfig {
    ProptestConfig {
        cases: std::env::var("PROPTEST_CASES")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(256),
        failure_persistence: None,
        ..ProptestConfig::default()
    }
}

// ---------------------------------------------------------------------------
// Generators
// ---------------------------------------------------------------------------

const MATERIALS: [&str; 4] = ["MP1", "MP2", "MP3", "MP4"];

/// Material quantity: mostly measured (zero and near-zero included),
/// sometimes a stock/scrap marker.
fn arb_quantity() -> impl Strategy<Value = MaterialQuantity> {
    prop_oneof![
        6 => (0.5..500.0f64).prop_map(MaterialQuantity::Measured),
        1 => Just(MaterialQuantity::Measured(0.0)),
        1 => (0.0..0.001f64).prop_map(MaterialQuantity::Measured),
        1 => Just(MaterialQuantity::Excluded(ExclusionKind::StockIssued)),
        1 => Just(MaterialQuantity::Excluded(ExclusionKind::ScrapCut)),
    ]
}

fn arb_line() -> impl Strategy<Value = RequisitionLine> {
    (0..6usize, 1..500u32, 0..MATERIALS.len(), arb_quantity()).prop_map(
        |(product, product_qty, material, quantity)| {
            RequisitionLine::new(
                format!("P{product}"),
                product_qty as f64,
                MATERIALS[material],
                quantity,
            )
        },
    )
}

/// Every material invoiced as divisible, value in cents.
fn arb_invoice() -> impl Strategy<Value = Vec<InvoiceLine>> {
    prop::collection::vec((1.0..1000.0f64, 1..100_000u32), MATERIALS.len()).prop_map(|entries| {
        entries
            .into_iter()
            .zip(MATERIALS)
            .map(|((qty, cents), code)| {
                InvoiceLine::new(code, UnitOfMeasure::divisible("M"), qty, cents as f64 / 100.0)
            })
            .collect()
    })
}

// ---------------------------------------------------------------------------
// Properties
// ---------------------------------------------------------------------------

proptest! {
    #![proptest_config(config_256())]

    #[test]
    fn one_row_per_line_in_order(
        lines in prop::collection::vec(arb_line(), 1..40),
        invoice in arb_invoice(),
    ) {
        let index = build_index(&invoice);
        let rows = allocate(&lines, &aggregate_consumption(&lines), &index, &AllocationPolicy::default());

        prop_assert_eq!(rows.len(), lines.len());
        for (i, (row, line)) in rows.iter().zip(&lines).enumerate() {
            prop_assert_eq!(row.line, i);
            prop_assert_eq!(&row.product_code, &line.product_code);
            prop_assert_eq!(&row.material_code, &line.material_code);
        }
    }

    #[test]
    fn consumed_materials_are_fully_allocated(
        lines in prop::collection::vec(arb_line(), 1..40),
        invoice in arb_invoice(),
    ) {
        let index = build_index(&invoice);
        let consumption = aggregate_consumption(&lines);
        let rows = allocate(&lines, &consumption, &index, &AllocationPolicy::default());

        for entry in index.iter() {
            if consumption.get(&entry.material_code).is_none() {
                continue;
            }
            let allocated: Vec<f64> = rows
                .iter()
                .filter(|r| r.material_code == entry.material_code)
                .filter_map(|r| r.total_cost.amount())
                .collect();
            let sum: f64 = allocated.iter().sum();
            // Each presented total is rounded to the cent.
            let slack = 0.005 * allocated.len() as f64 + 1e-6;
            prop_assert!(
                (sum - entry.total_value_sum).abs() <= slack,
                "material {}: allocated {} vs invoiced {}",
                entry.material_code, sum, entry.total_value_sum
            );
        }
    }

    #[test]
    fn allocation_is_idempotent(
        lines in prop::collection::vec(arb_line(), 0..40),
        invoice in arb_invoice(),
    ) {
        let index = build_index(&invoice);
        let consumption = aggregate_consumption(&lines);
        let policy = AllocationPolicy::default();
        let first = allocate(&lines, &consumption, &index, &policy);
        let second = allocate(&lines, &consumption, &index, &policy);
        prop_assert_eq!(first, second);
    }

    #[test]
    fn excluded_lines_never_carry_amounts(
        lines in prop::collection::vec(arb_line(), 1..40),
        invoice in arb_invoice(),
    ) {
        let index = build_index(&invoice);
        let rows = allocate(&lines, &aggregate_consumption(&lines), &index, &AllocationPolicy::default());
        for (row, line) in rows.iter().zip(&lines) {
            if let MaterialQuantity::Excluded(_) = line.material_quantity {
                prop_assert_eq!(row.total_cost, CostValue::NotApplicable);
                prop_assert_eq!(row.unit_cost, CostValue::NotApplicable);
            }
        }
    }
}
