//! CLI Exit Code Registry
//!
//! This is the single source of truth for all CLI exit codes.
//! Exit codes are part of the shell contract — scripts rely on them.
//!
//! # Exit Code Ranges
//!
//! | Range   | Domain           | Description                              |
//! |---------|------------------|------------------------------------------|
//! | 0       | Universal        | Success                                  |
//! | 1       | Universal        | General error (unspecified)              |
//! | 2       | Universal        | CLI usage error (bad args, missing file) |
//! | 60-69   | costing          | Allocation run codes                     |
//!
//! # Adding New Exit Codes
//!
//! 1. Add the constant in the appropriate range
//! 2. Document what triggers it
//! 3. Update the table above
//! 4. Wire it into the relevant command's error handling

// =============================================================================
// Universal (0-2)
// =============================================================================

/// Success - command completed without errors.
pub const EXIT_SUCCESS: u8 = 0;

/// General error - unspecified failure.
/// Avoid using this; prefer a specific error code.
pub const EXIT_ERROR: u8 = 1;

/// Usage error - bad arguments, missing required options.
pub const EXIT_USAGE: u8 = 2;

// =============================================================================
// Costing (60-69)
// =============================================================================

/// Config file failed to parse or validate.
pub const EXIT_COST_INVALID_CONFIG: u8 = 60;

/// Inputs could not be read or loaded (missing file, bad column, bad number),
/// or an output could not be written.
pub const EXIT_COST_RUNTIME: u8 = 61;

/// At least one requisition line could not be allocated.
/// Outputs are still written.
pub const EXIT_COST_LINE_ERRORS: u8 = 62;

/// Divergences found and `--strict` is set: quantity divergence, unit
/// conflict, material missing from the invoice, or an unbalanced total.
pub const EXIT_COST_DIVERGENCE: u8 = 63;
