//! `reqcost-engine` — Requisition/invoice cost allocation engine.
//!
//! Pure engine crate: receives pre-loaded requisition and invoice records,
//! returns one costed row per requisition line. The CSV loaders in
//! [`engine`] parse strings only; file access belongs to the caller.

pub mod aggregate;
pub mod allocate;
pub mod config;
pub mod derived;
pub mod engine;
pub mod error;
pub mod evidence;
pub mod ledger;
pub mod model;

pub use aggregate::aggregate_consumption;
pub use allocate::{allocate, AllocationPolicy};
pub use config::CostingConfig;
pub use engine::run;
pub use error::{CostError, LineError};
pub use ledger::build_index;
pub use model::{
    CostInput, CostReport, CostValue, Divergence, InvoiceLine, MaterialQuantity, RequisitionLine,
    ResultRow,
};
