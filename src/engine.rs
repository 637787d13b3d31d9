use crate::aggregator::PrefixAggregator;
use crate::balance_sheet;
use crate::cash_flow;
use crate::coherence::{CoherenceReport, CoherenceValidator, ValidationResult};
use crate::error::Result;
use crate::income_statement;
use crate::schema::{EngineOptions, FinancialStatements, Statement, TrialBalance};
use crate::sig;
use crate::tafire;
use log::{debug, info, warn};

/// Caller-owned statement engine over one fiscal year and an optional comparison year.
///
/// Balances are taken by value and never mutated; every accessor recomputes its statement.
#[derive(Debug, Clone, Default)]
pub struct LiasseEngine {
    current: TrialBalance,
    prior: Option<TrialBalance>,
    options: EngineOptions,
}

impl LiasseEngine {
    pub fn new(current: TrialBalance) -> Self {
        Self {
            current,
            prior: None,
            options: EngineOptions::default(),
        }
    }

    pub fn with_prior(mut self, prior: TrialBalance) -> Self {
        if let (Some(current_end), Some(prior_end)) = (self.current.fiscal_year_end, prior.fiscal_year_end) {
            if prior_end >= current_end {
                warn!(
                    "Prior balance closes on {} which is not before the current year end {}",
                    prior_end, current_end
                );
            }
        }
        self.prior = Some(prior);
        self
    }

    pub fn with_options(mut self, options: EngineOptions) -> Result<Self> {
        options.validate()?;
        self.options = options;
        Ok(self)
    }

    pub fn current(&self) -> &TrialBalance {
        &self.current
    }

    pub fn prior(&self) -> Option<&TrialBalance> {
        self.prior.as_ref()
    }

    pub fn options(&self) -> &EngineOptions {
        &self.options
    }

    pub fn balance_sheet_assets(&self) -> Statement {
        balance_sheet::generate_assets(&self.current, self.prior.as_ref())
    }

    pub fn balance_sheet_liabilities(&self) -> Statement {
        balance_sheet::generate_liabilities(
            &self.current,
            self.prior.as_ref(),
            self.options.net_income_policy,
        )
    }

    pub fn income_statement(&self) -> Statement {
        income_statement::generate(&self.current, self.prior.as_ref())
    }

    pub fn sig(&self) -> Statement {
        sig::generate(&self.current, self.prior.as_ref())
    }

    pub fn cash_flow(&self) -> Statement {
        cash_flow::generate(&self.current, self.prior.as_ref(), &self.options)
    }

    pub fn tafire(&self) -> Statement {
        tafire::generate(&self.current, self.prior.as_ref(), &self.options)
    }

    pub fn generate(&self) -> FinancialStatements {
        generate_statements(&self.current, self.prior.as_ref(), &self.options)
    }

    pub fn validate(&self) -> ValidationResult {
        self.validate_detailed().to_validation_result()
    }

    pub fn validate_detailed(&self) -> CoherenceReport {
        let statements = self.generate();
        CoherenceValidator::new(&statements, &self.current, self.options.tolerance).validate_detailed()
    }

    /// Generates every statement and fails on the first coherence violation.
    pub fn generate_verified(&self) -> Result<FinancialStatements> {
        let statements = self.generate();
        CoherenceValidator::new(&statements, &self.current, self.options.tolerance).verify()?;
        Ok(statements)
    }
}

/// Generates the full statement set. The SIG is regrouped from the income statement and the
/// TAFIRE from the cash-flow statement and SIG, so the three always agree.
pub fn generate_statements(
    current: &TrialBalance,
    prior: Option<&TrialBalance>,
    options: &EngineOptions,
) -> FinancialStatements {
    info!(
        "Generating financial statements for {} ({} accounts, comparison year: {})",
        current.label.as_deref().unwrap_or("unnamed balance"),
        current.len(),
        if prior.is_some() { "yes" } else { "no" }
    );

    let current_agg = PrefixAggregator::new(current);
    let prior_agg = prior.map(PrefixAggregator::new);
    if current_agg.is_empty() {
        debug!("Current balance has no usable account; every statement will be zero");
    }

    let income = income_statement::generate(current, prior);
    let soldes = sig::from_income_statement(&income);
    let tft = cash_flow::from_aggregators(&current_agg, prior_agg.as_ref(), options.net_income_policy);
    let funds_flow = tafire::from_statements(&tft, &soldes);

    FinancialStatements {
        fiscal_year_end: current.fiscal_year_end,
        balance_sheet_assets: balance_sheet::generate_assets(current, prior),
        balance_sheet_liabilities: balance_sheet::generate_liabilities(
            current,
            prior,
            options.net_income_policy,
        ),
        income_statement: income,
        sig: soldes,
        cash_flow: tft,
        tafire: funds_flow,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LiasseError;
    use crate::schema::{BalanceEntry, NetIncomePolicy};
    use chrono::NaiveDate;

    fn balance() -> TrialBalance {
        TrialBalance::new(vec![
            BalanceEntry::credit("1011", "Capital", 1_000.0),
            BalanceEntry::debit("5211", "Banque", 1_300.0),
            BalanceEntry::credit("7011", "Ventes", 500.0),
            BalanceEntry::debit("6011", "Achats", 200.0),
        ])
        .with_fiscal_year_end(NaiveDate::from_ymd_opt(2023, 12, 31).unwrap())
    }

    #[test]
    fn test_default_engine_produces_zero_statements() {
        let engine = LiasseEngine::default();
        let statements = engine.generate();

        for statement in statements.statements() {
            assert!(!statement.lines.is_empty());
            assert!(statement.lines.iter().all(|l| l.current == 0.0));
        }
        assert!(engine.validate().is_valid);
    }

    #[test]
    fn test_generation_is_idempotent() {
        let engine = LiasseEngine::new(balance());
        assert_eq!(engine.generate(), engine.generate());
        assert_eq!(
            engine.generate().to_json().unwrap(),
            engine.generate().to_json().unwrap()
        );
    }

    #[test]
    fn test_accessors_match_bundle() {
        let engine = LiasseEngine::new(balance());
        let statements = engine.generate();

        assert_eq!(engine.balance_sheet_assets(), statements.balance_sheet_assets);
        assert_eq!(engine.balance_sheet_liabilities(), statements.balance_sheet_liabilities);
        assert_eq!(engine.income_statement(), statements.income_statement);
        assert_eq!(engine.sig(), statements.sig);
        assert_eq!(engine.cash_flow(), statements.cash_flow);
        assert_eq!(engine.tafire(), statements.tafire);
        assert_eq!(statements.fiscal_year_end, balance().fiscal_year_end);
    }

    #[test]
    fn test_invalid_options_are_rejected() {
        let options = EngineOptions {
            tolerance: f64::INFINITY,
            ..EngineOptions::default()
        };
        let result = LiasseEngine::new(balance()).with_options(options);
        assert!(matches!(result, Err(LiasseError::InvalidTolerance(_))));
    }

    #[test]
    fn test_options_flow_into_statements() {
        let options = EngineOptions {
            net_income_policy: NetIncomePolicy::EquityAccount,
            ..EngineOptions::default()
        };
        let engine = LiasseEngine::new(balance()).with_options(options).unwrap();

        assert_eq!(engine.balance_sheet_liabilities().value("CH"), 0.0);
        assert!(!engine.validate().is_valid);
    }

    #[test]
    fn test_generate_verified() {
        let engine = LiasseEngine::new(balance());
        let statements = engine.generate_verified().unwrap();
        assert_eq!(statements.balance_sheet_assets.value("BZ"), 1_300.0);

        let broken = LiasseEngine::new(TrialBalance::new(vec![BalanceEntry::debit("5211", "Banque", 10.0)]));
        assert!(matches!(
            broken.generate_verified(),
            Err(LiasseError::CoherenceViolation { .. })
        ));
    }

    #[test]
    fn test_prior_balance_adds_comparison_column() {
        let prior = TrialBalance::new(vec![
            BalanceEntry::credit("1011", "Capital", 1_000.0),
            BalanceEntry::debit("5211", "Banque", 1_000.0),
        ])
        .with_fiscal_year_end(NaiveDate::from_ymd_opt(2022, 12, 31).unwrap());

        let engine = LiasseEngine::new(balance()).with_prior(prior);
        let statements = engine.generate();

        assert_eq!(statements.balance_sheet_assets.prior_value("BZ"), Some(1_000.0));
        assert_eq!(statements.cash_flow.value("ZA"), 1_000.0);
        assert_eq!(statements.cash_flow.value("ZH"), 1_300.0);
        assert_eq!(statements.cash_flow.value("ZJ"), 0.0);
        assert!(engine.validate().is_valid);
    }
}
