use serde::Deserialize;

use crate::allocate::AllocationPolicy;
use crate::error::CostError;

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct CostingConfig {
    pub name: String,
    pub requisition: RequisitionSource,
    pub invoice: InvoiceSource,
    #[serde(default)]
    pub units: UnitConfig,
    #[serde(default)]
    pub markers: MarkerConfig,
    #[serde(default)]
    pub tolerance: ToleranceConfig,
    #[serde(default)]
    pub rounding: RoundingConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

// ---------------------------------------------------------------------------
// Sources
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct RequisitionSource {
    pub file: String,
    #[serde(default = "default_delimiter")]
    pub delimiter: char,
    #[serde(default)]
    pub columns: RequisitionColumns,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RequisitionColumns {
    pub product_code: String,
    pub product_description: Option<String>,
    pub product_quantity: String,
    pub material_code: String,
    pub material_description: Option<String>,
    pub material_quantity: String,
}

impl Default for RequisitionColumns {
    fn default() -> Self {
        Self {
            product_code: "product_code".into(),
            product_description: None,
            product_quantity: "product_quantity".into(),
            material_code: "material_code".into(),
            material_description: None,
            material_quantity: "material_quantity".into(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct InvoiceSource {
    pub file: String,
    #[serde(default = "default_delimiter")]
    pub delimiter: char,
    #[serde(default)]
    pub columns: InvoiceColumns,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct InvoiceColumns {
    pub material_code: String,
    pub description: Option<String>,
    pub unit: String,
    pub invoiced_quantity: String,
    pub total_value: String,
}

impl Default for InvoiceColumns {
    fn default() -> Self {
        Self {
            material_code: "material_code".into(),
            description: None,
            unit: "unit".into(),
            invoiced_quantity: "invoiced_quantity".into(),
            total_value: "total_value".into(),
        }
    }
}

fn default_delimiter() -> char {
    ','
}

// ---------------------------------------------------------------------------
// Units + Markers
// ---------------------------------------------------------------------------

/// Unit codes whose invoice units are indivisible. Everything else is divisible.
#[derive(Debug, Clone, Deserialize)]
pub struct UnitConfig {
    #[serde(default = "default_unit_priced")]
    pub unit_priced: Vec<String>,
}

impl Default for UnitConfig {
    fn default() -> Self {
        Self {
            unit_priced: default_unit_priced(),
        }
    }
}

fn default_unit_priced() -> Vec<String> {
    ["UN", "UND", "PC", "PCS", "PÇ", "EA"].iter().map(|s| s.to_string()).collect()
}

impl UnitConfig {
    pub fn is_unit_priced(&self, code: &str) -> bool {
        let code = code.trim().to_uppercase();
        self.unit_priced.iter().any(|u| u.trim().to_uppercase() == code)
    }
}

/// Values that replace a quantity in a requisition cell.
#[derive(Debug, Clone, Deserialize)]
pub struct MarkerConfig {
    #[serde(default = "default_stock_markers")]
    pub stock: Vec<String>,
    #[serde(default = "default_scrap_markers")]
    pub scrap: Vec<String>,
}

impl Default for MarkerConfig {
    fn default() -> Self {
        Self {
            stock: default_stock_markers(),
            scrap: default_scrap_markers(),
        }
    }
}

fn default_stock_markers() -> Vec<String> {
    vec!["STOCK".into(), "ESTOQUE".into()]
}

fn default_scrap_markers() -> Vec<String> {
    vec!["SCRAP".into(), "RETALHO".into()]
}

// ---------------------------------------------------------------------------
// Tolerance + Rounding + Output
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct ToleranceConfig {
    #[serde(default = "default_quantity_tolerance")]
    pub quantity: f64,
}

impl Default for ToleranceConfig {
    fn default() -> Self {
        Self {
            quantity: default_quantity_tolerance(),
        }
    }
}

fn default_quantity_tolerance() -> f64 {
    1e-4
}

#[derive(Debug, Clone, Deserialize)]
pub struct RoundingConfig {
    #[serde(default = "default_unit_cost_places")]
    pub unit_cost_places: u32,
    #[serde(default = "default_total_cost_places")]
    pub total_cost_places: u32,
}

impl Default for RoundingConfig {
    fn default() -> Self {
        Self {
            unit_cost_places: default_unit_cost_places(),
            total_cost_places: default_total_cost_places(),
        }
    }
}

fn default_unit_cost_places() -> u32 {
    4
}

fn default_total_cost_places() -> u32 {
    2
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct OutputConfig {
    #[serde(default)]
    pub json: Option<String>,
    #[serde(default)]
    pub csv: Option<String>,
}

// ---------------------------------------------------------------------------
// Parse + Validate
// ---------------------------------------------------------------------------

const MAX_PLACES: u32 = 10;

impl CostingConfig {
    pub fn from_toml(input: &str) -> Result<Self, CostError> {
        let config: CostingConfig =
            toml::from_str(input).map_err(|e| CostError::ConfigParse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), CostError> {
        if self.requisition.file.trim().is_empty() {
            return Err(CostError::ConfigValidation("requisition.file is empty".into()));
        }
        if self.invoice.file.trim().is_empty() {
            return Err(CostError::ConfigValidation("invoice.file is empty".into()));
        }

        for (section, delimiter) in [
            ("requisition", self.requisition.delimiter),
            ("invoice", self.invoice.delimiter),
        ] {
            if !delimiter.is_ascii() || delimiter == '"' {
                return Err(CostError::ConfigValidation(format!(
                    "{section}.delimiter must be a single ASCII character other than '\"', got {delimiter:?}"
                )));
            }
        }

        let req = &self.requisition.columns;
        for (name, column) in [
            ("product_code", &req.product_code),
            ("product_quantity", &req.product_quantity),
            ("material_code", &req.material_code),
            ("material_quantity", &req.material_quantity),
        ] {
            if column.trim().is_empty() {
                return Err(CostError::ConfigValidation(format!(
                    "requisition.columns.{name} is empty"
                )));
            }
        }
        let inv = &self.invoice.columns;
        for (name, column) in [
            ("material_code", &inv.material_code),
            ("unit", &inv.unit),
            ("invoiced_quantity", &inv.invoiced_quantity),
            ("total_value", &inv.total_value),
        ] {
            if column.trim().is_empty() {
                return Err(CostError::ConfigValidation(format!(
                    "invoice.columns.{name} is empty"
                )));
            }
        }

        if !self.tolerance.quantity.is_finite() || self.tolerance.quantity < 0.0 {
            return Err(CostError::ConfigValidation(format!(
                "tolerance.quantity must be a non-negative number, got {}",
                self.tolerance.quantity
            )));
        }

        if self.rounding.unit_cost_places > MAX_PLACES || self.rounding.total_cost_places > MAX_PLACES {
            return Err(CostError::ConfigValidation(format!(
                "rounding places must be at most {MAX_PLACES}"
            )));
        }

        if self.units.unit_priced.iter().any(|u| u.trim().is_empty()) {
            return Err(CostError::ConfigValidation("units.unit_priced contains an empty code".into()));
        }

        let markers = &self.markers;
        if markers.stock.iter().chain(&markers.scrap).any(|m| m.trim().is_empty()) {
            return Err(CostError::ConfigValidation("markers contain an empty value".into()));
        }
        if let Some(shared) = markers
            .stock
            .iter()
            .find(|s| markers.scrap.iter().any(|c| c.trim().eq_ignore_ascii_case(s.trim())))
        {
            return Err(CostError::ConfigValidation(format!(
                "marker '{shared}' is listed as both stock and scrap"
            )));
        }

        Ok(())
    }

    pub fn policy(&self) -> AllocationPolicy {
        AllocationPolicy {
            tolerance: self.tolerance.quantity,
            unit_cost_places: self.rounding.unit_cost_places,
            total_cost_places: self.rounding.total_cost_places,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
