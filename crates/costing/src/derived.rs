//! Per-product rollup built from the allocated rows.

use std::collections::HashMap;

use crate::model::{round_to, CostValue, ProductCost, ResultRow};

/// Group rows by product code, in order of first appearance.
///
/// Quantity and description come from the product's first row. Rows whose
/// total cost is a sentinel add nothing to the sum but still count as lines.
pub fn build_product_rollup(rows: &[ResultRow], unit_cost_places: u32, total_cost_places: u32) -> Vec<ProductCost> {
    let mut products: Vec<ProductCost> = Vec::new();
    let mut by_code: HashMap<&str, usize> = HashMap::new();
    let mut priced: Vec<bool> = Vec::new();

    for row in rows {
        let slot = *by_code.entry(row.product_code.as_str()).or_insert_with(|| {
            products.push(ProductCost {
                product_code: row.product_code.clone(),
                product_description: row.product_description.clone(),
                product_quantity: row.product_quantity,
                line_count: 0,
                total_cost: 0.0,
                unit_cost: CostValue::NotApplicable,
                flagged: false,
                quantity_mismatch: false,
            });
            priced.push(false);
            products.len() - 1
        });

        let product = &mut products[slot];
        product.line_count += 1;
        product.flagged |= row.divergence.is_flagged();
        if row.product_quantity != product.product_quantity {
            product.quantity_mismatch = true;
        }
        if let Some(total) = row.total_cost.amount() {
            product.total_cost += total;
            priced[slot] = true;
        }
    }

    for (product, has_amount) in products.iter_mut().zip(priced) {
        if has_amount && product.product_quantity > 0.0 {
            product.unit_cost = CostValue::Amount(round_to(
                product.total_cost / product.product_quantity,
                unit_cost_places,
            ));
        } else if product.product_quantity <= 0.0 || !product.product_quantity.is_finite() {
            product.unit_cost = CostValue::NotComputed;
        }
        product.total_cost = round_to(product.total_cost, total_cost_places);
    }

    products
}
