//! # OHADA Liasse
//!
//! Derives the SYSCOHADA annual statements (the *liasse fiscale*) from a trial balance.
//!
//! ## Core Concepts
//!
//! - **Trial Balance**: one row per ledger account with its closing debit/credit balances
//! - **Prefix Aggregation**: every statement line sums the accounts whose code starts with
//!   one of its prefixes; each account is counted once per line
//! - **Statements**: balance sheet (assets, liabilities), income statement, SIG cascade,
//!   cash-flow statement (TFT) and funds-flow statement (TAFIRE)
//! - **Comparison Year**: an optional N-1 balance adds a prior column recomputed with the
//!   same rules
//! - **Coherence**: BZ = DZ, XI = CH and XI = SIG9 are checked and reported, never enforced;
//!   statutory control points (EF-004, AP-002, CC-001..CC-003, EC-002) are reported as warnings
//!
//! ## Example
//!
//! ```rust,ignore
//! use ohada_liasse::*;
//!
//! let balance = TrialBalance::new(vec![
//!     BalanceEntry::credit("1011", "Capital social", 1_000_000.0),
//!     BalanceEntry::debit("5211", "Banque", 1_500_000.0),
//!     BalanceEntry::credit("701", "Ventes de marchandises", 700_000.0),
//!     BalanceEntry::debit("601", "Achats de marchandises", 200_000.0),
//! ]);
//!
//! let statements = process_trial_balance(&balance, None, &EngineOptions::default()).unwrap();
//! assert_eq!(statements.sig.value("SIG1"), 500_000.0);
//! ```

pub mod aggregator;
pub mod balance_sheet;
pub mod builder;
pub mod cash_flow;
pub mod coherence;
pub mod engine;
pub mod error;
pub mod income_statement;
pub mod ingestion;
pub mod mapping;
pub mod schema;
pub mod sig;
pub mod tafire;

pub use aggregator::{AggregationMode, AssetAmounts, BalanceSide, PrefixAggregator};
pub use coherence::{
    balance_sense_warnings, control_point_warnings, validate_coherence, verify_coherence,
    BalanceSenseWarning, CoherenceCheck, CoherenceReport, CoherenceValidator, ControlPointWarning,
    Severity, ValidationResult,
};
pub use engine::{generate_statements, LiasseEngine};
pub use error::{LiasseError, Result};
pub use ingestion::*;
pub use schema::*;

use log::{debug, info};

pub struct LiasseProcessor;

impl LiasseProcessor {
    pub fn process(
        current: &TrialBalance,
        prior: Option<&TrialBalance>,
        options: &EngineOptions,
    ) -> Result<FinancialStatements> {
        options.validate()?;

        info!(
            "Processing trial balance {} with {} accounts",
            current.label.as_deref().unwrap_or("(unnamed)"),
            current.len()
        );

        let statements = generate_statements(current, prior, options);
        let report = CoherenceValidator::new(&statements, current, options.tolerance).validate_detailed();

        for warning in &report.warnings {
            debug!(
                "Balance sense warning {} on account {} ({:.2})",
                warning.rule, warning.account_code, warning.net_balance
            );
        }
        for point in &report.control_points {
            debug!("Control point {} ({:?}) on {}: {}", point.rule, point.severity, point.reference, point.message);
        }

        Ok(statements)
    }

    pub fn process_with_verification(
        current: &TrialBalance,
        prior: Option<&TrialBalance>,
        options: &EngineOptions,
    ) -> Result<FinancialStatements> {
        let statements = Self::process(current, prior, options)?;

        verify_coherence(&statements, current, options.tolerance)?;

        Ok(statements)
    }
}

pub fn process_trial_balance(
    current: &TrialBalance,
    prior: Option<&TrialBalance>,
    options: &EngineOptions,
) -> Result<FinancialStatements> {
    LiasseProcessor::process(current, prior, options)
}

pub fn process_with_verification(
    current: &TrialBalance,
    prior: Option<&TrialBalance>,
    options: &EngineOptions,
) -> Result<FinancialStatements> {
    LiasseProcessor::process_with_verification(current, prior, options)
}
