use crate::aggregate::aggregate_consumption;
use crate::allocate::allocate;
use crate::config::{CostingConfig, InvoiceSource, MarkerConfig, RequisitionSource, UnitConfig};
use crate::derived::build_product_rollup;
use crate::error::CostError;
use crate::evidence::compute_summary;
use crate::ledger::build_index;
use crate::model::{
    CostInput, CostMeta, CostReport, ExclusionKind, InvoiceLine, MaterialQuantity,
    RequisitionLine, UnitClass, UnitOfMeasure,
};

/// Run one allocation per config. Returns result rows + summary + product rollup.
pub fn run(config: &CostingConfig, input: &CostInput) -> CostReport {
    let policy = config.policy();

    let consumption = aggregate_consumption(&input.requisition);
    let index = build_index(&input.invoice);
    let rows = allocate(&input.requisition, &consumption, &index, &policy);

    let summary = compute_summary(&rows, &index);
    let products = build_product_rollup(&rows, policy.unit_cost_places, policy.total_cost_places);

    log::info!(
        "allocated {} requisition line(s) against {} invoiced material(s): {} flagged, {} failed",
        summary.total_rows,
        index.len(),
        summary.flagged_rows,
        summary.error_rows
    );

    CostReport {
        meta: CostMeta {
            config_name: config.name.clone(),
            engine_version: env!("CARGO_PKG_VERSION").to_string(),
        },
        summary,
        rows,
        products,
    }
}

// ---------------------------------------------------------------------------
// CSV loading
// ---------------------------------------------------------------------------

struct Table {
    document: &'static str,
    headers: Vec<String>,
    records: Vec<csv::StringRecord>,
}

impl Table {
    fn read(document: &'static str, csv_data: &str, delimiter: char) -> Result<Self, CostError> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .delimiter(delimiter as u8)
            .trim(csv::Trim::All)
            .from_reader(csv_data.as_bytes());

        let headers: Vec<String> = reader.headers()?.iter().map(|h| h.to_string()).collect();
        let records = reader.records().collect::<Result<Vec<_>, _>>()?;

        Ok(Self { document, headers, records })
    }

    fn idx(&self, name: &str) -> Result<usize, CostError> {
        self.headers.iter().position(|h| h == name).ok_or_else(|| CostError::MissingColumn {
            document: self.document.into(),
            column: name.into(),
        })
    }

    fn optional_idx(&self, name: Option<&String>) -> Result<Option<usize>, CostError> {
        name.map(|n| self.idx(n)).transpose()
    }
}

/// A cell lookup bound to one record, for error reporting.
struct Cells<'a> {
    document: &'static str,
    line: usize,
    record: &'a csv::StringRecord,
}

impl<'a> Cells<'a> {
    fn text(&self, idx: usize) -> &'a str {
        self.record.get(idx).unwrap_or("")
    }

    fn required(&self, idx: usize, column: &str) -> Result<&'a str, CostError> {
        let value = self.text(idx);
        if value.is_empty() {
            return Err(CostError::MissingValue {
                document: self.document.into(),
                line: self.line,
                column: column.into(),
            });
        }
        Ok(value)
    }

    fn optional(&self, idx: Option<usize>) -> Option<String> {
        idx.map(|i| self.text(i)).filter(|v| !v.is_empty()).map(str::to_string)
    }

    fn number(&self, idx: usize, column: &str) -> Result<f64, CostError> {
        let value = self.required(idx, column)?;
        parse_number(value).ok_or_else(|| CostError::NumberParse {
            document: self.document.into(),
            line: self.line,
            column: column.into(),
            value: value.into(),
        })
    }
}

/// Parse a decimal that may use a comma as the decimal separator.
///
/// Whichever of `,` and `.` comes last is the decimal separator and the other
/// is a thousands separator: `"1.234,56"` and `"1,234.56"` are both 1234.56.
/// A lone comma is decimal (`"5,34"`).
pub fn parse_number(value: &str) -> Option<f64> {
    let value = value.trim();
    let parsed = match (value.rfind(','), value.rfind('.')) {
        (Some(comma), Some(dot)) if dot > comma => value.replace(',', "").parse::<f64>(),
        (Some(_), _) => value.replace('.', "").replace(',', ".").parse::<f64>(),
        (None, _) => value.parse::<f64>(),
    };
    parsed.ok().filter(|v| v.is_finite())
}

/// Load requisition lines, resolving stock/scrap markers in the quantity column.
///
/// Quantities are not range-checked here: an invalid line still becomes a
/// record so the allocator can report it in place.
pub fn load_requisition_csv(
    csv_data: &str,
    source: &RequisitionSource,
    markers: &MarkerConfig,
) -> Result<Vec<RequisitionLine>, CostError> {
    let table = Table::read("requisition", csv_data, source.delimiter)?;
    let col = &source.columns;

    let product_code_idx = table.idx(&col.product_code)?;
    let product_quantity_idx = table.idx(&col.product_quantity)?;
    let material_code_idx = table.idx(&col.material_code)?;
    let material_quantity_idx = table.idx(&col.material_quantity)?;
    let product_description_idx = table.optional_idx(col.product_description.as_ref())?;
    let material_description_idx = table.optional_idx(col.material_description.as_ref())?;

    let mut lines = Vec::with_capacity(table.records.len());

    for (i, record) in table.records.iter().enumerate() {
        let cells = Cells {
            document: table.document,
            line: i + 2,
            record,
        };

        let quantity_text = cells.required(material_quantity_idx, &col.material_quantity)?;
        let material_quantity = match marker_kind(quantity_text, markers) {
            Some(kind) => MaterialQuantity::Excluded(kind),
            None => MaterialQuantity::Measured(cells.number(material_quantity_idx, &col.material_quantity)?),
        };

        lines.push(RequisitionLine {
            product_code: cells.required(product_code_idx, &col.product_code)?.to_string(),
            product_description: cells.optional(product_description_idx),
            product_quantity: cells.number(product_quantity_idx, &col.product_quantity)?,
            material_code: cells.required(material_code_idx, &col.material_code)?.to_string(),
            material_description: cells.optional(material_description_idx),
            material_quantity,
        });
    }

    log::debug!("loaded {} requisition line(s)", lines.len());
    Ok(lines)
}

fn marker_kind(value: &str, markers: &MarkerConfig) -> Option<ExclusionKind> {
    let matches = |list: &[String]| list.iter().any(|m| m.trim().eq_ignore_ascii_case(value));
    if matches(&markers.stock) {
        Some(ExclusionKind::StockIssued)
    } else if matches(&markers.scrap) {
        Some(ExclusionKind::ScrapCut)
    } else {
        None
    }
}

/// Load invoice lines, classifying each unit code as divisible or unit-priced.
pub fn load_invoice_csv(
    csv_data: &str,
    source: &InvoiceSource,
    units: &UnitConfig,
) -> Result<Vec<InvoiceLine>, CostError> {
    let table = Table::read("invoice", csv_data, source.delimiter)?;
    let col = &source.columns;

    let material_code_idx = table.idx(&col.material_code)?;
    let unit_idx = table.idx(&col.unit)?;
    let quantity_idx = table.idx(&col.invoiced_quantity)?;
    let value_idx = table.idx(&col.total_value)?;
    let description_idx = table.optional_idx(col.description.as_ref())?;

    let mut lines = Vec::with_capacity(table.records.len());

    for (i, record) in table.records.iter().enumerate() {
        let cells = Cells {
            document: table.document,
            line: i + 2,
            record,
        };

        let unit_code = cells.required(unit_idx, &col.unit)?;
        let class = if units.is_unit_priced(unit_code) {
            UnitClass::UnitPriced
        } else {
            UnitClass::Divisible
        };

        lines.push(InvoiceLine {
            material_code: cells.required(material_code_idx, &col.material_code)?.to_string(),
            description: cells.optional(description_idx),
            unit: UnitOfMeasure::new(unit_code, class),
            invoiced_quantity: cells.number(quantity_idx, &col.invoiced_quantity)?,
            total_value: cells.number(value_idx, &col.total_value)?,
        });
    }

    log::debug!("loaded {} invoice line(s)", lines.len());
    Ok(lines)
}
