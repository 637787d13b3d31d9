use crate::error::{LiasseError, Result};
use chrono::NaiveDate;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// One ledger account of a trial balance, with its closing balances.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, JsonSchema)]
pub struct BalanceEntry {
    #[schemars(
        description = "SYSCOHADA account number (e.g. '411100'). Whitespace is ignored; codes that do not start with a digit never match any statement line."
    )]
    pub account_code: String,

    #[serde(default)]
    #[schemars(description = "Account label as printed in the general ledger")]
    pub label: String,

    #[serde(default)]
    #[schemars(description = "Closing debit balance (solde débiteur), non-negative")]
    pub debit_balance: f64,

    #[serde(default)]
    #[schemars(description = "Closing credit balance (solde créditeur), non-negative")]
    pub credit_balance: f64,
}

impl BalanceEntry {
    pub fn new(
        account_code: impl Into<String>,
        label: impl Into<String>,
        debit_balance: f64,
        credit_balance: f64,
    ) -> Self {
        Self {
            account_code: account_code.into(),
            label: label.into(),
            debit_balance,
            credit_balance,
        }
    }

    pub fn debit(account_code: impl Into<String>, label: impl Into<String>, amount: f64) -> Self {
        Self::new(account_code, label, amount, 0.0)
    }

    pub fn credit(account_code: impl Into<String>, label: impl Into<String>, amount: f64) -> Self {
        Self::new(account_code, label, 0.0, amount)
    }

    /// Signed net balance, debit positive.
    pub fn net(&self) -> f64 {
        self.debit_balance - self.credit_balance
    }
}

/// The closing balances of one fiscal year. Never mutated once handed to the engine.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, JsonSchema)]
pub struct TrialBalance {
    #[serde(default)]
    #[schemars(description = "Free label identifying the balance (company, year, source file)")]
    pub label: Option<String>,

    #[serde(default)]
    #[schemars(description = "Closing date of the fiscal year in YYYY-MM-DD format")]
    pub fiscal_year_end: Option<NaiveDate>,

    #[schemars(description = "One row per ledger account, in ledger order")]
    pub entries: Vec<BalanceEntry>,
}

impl TrialBalance {
    pub fn new(entries: Vec<BalanceEntry>) -> Self {
        Self {
            label: None,
            fiscal_year_end: None,
            entries,
        }
    }

    pub fn with_fiscal_year_end(mut self, date: NaiveDate) -> Self {
        self.fiscal_year_end = Some(date);
        self
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn total_debit(&self) -> f64 {
        self.entries.iter().map(|e| e.debit_balance).sum()
    }

    pub fn total_credit(&self) -> f64 {
        self.entries.iter().map(|e| e.credit_balance).sum()
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn generate_json_schema() -> schemars::schema::RootSchema {
        schemars::schema_for!(TrialBalance)
    }

    pub fn schema_as_json() -> std::result::Result<String, serde_json::Error> {
        let schema = Self::generate_json_schema();
        serde_json::to_string_pretty(&schema)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "PascalCase")]
pub enum NetIncomePolicy {
    #[schemars(
        description = "Use the income statement bottom line while class 6, 7 or 8 accounts are still open (pre-closing balance), otherwise the balance of account 13"
    )]
    Auto,

    #[schemars(description = "Always report the income statement bottom line (XI)")]
    IncomeStatement,

    #[schemars(description = "Always report the credit balance of account 13")]
    EquityAccount,
}

impl Default for NetIncomePolicy {
    fn default() -> Self {
        Self::Auto
    }
}

fn default_tolerance() -> f64 {
    1.0
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, JsonSchema)]
pub struct EngineOptions {
    #[serde(default = "default_tolerance")]
    #[schemars(description = "Maximum absolute gap, in currency units, accepted by coherence checks. Defaults to 1.")]
    pub tolerance: f64,

    #[serde(default)]
    #[schemars(description = "How the balance-sheet net income line is sourced")]
    pub net_income_policy: NetIncomePolicy,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            tolerance: default_tolerance(),
            net_income_policy: NetIncomePolicy::default(),
        }
    }
}

impl EngineOptions {
    pub fn validate(&self) -> Result<()> {
        if !self.tolerance.is_finite() || self.tolerance < 0.0 {
            return Err(LiasseError::InvalidTolerance(self.tolerance));
        }
        Ok(())
    }

    pub fn generate_json_schema() -> schemars::schema::RootSchema {
        schemars::schema_for!(EngineOptions)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "PascalCase")]
pub enum StatementKind {
    BalanceSheetAssets,
    BalanceSheetLiabilities,
    IncomeStatement,
    Sig,
    CashFlow,
    Tafire,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "PascalCase")]
pub enum LineKind {
    /// Section title, always zero.
    Header,
    Line,
    Subtotal,
    Total,
}

/// A declared constituent of a total line: `total = Σ coefficient × value(reference)`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Component {
    pub reference: String,
    pub coefficient: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StatementLine {
    pub reference: String,
    pub label: String,
    pub kind: LineKind,
    pub current: f64,
    /// `None` when no N-1 balance was supplied.
    pub prior: Option<f64>,
    /// Asset lines only: gross amount before depreciation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gross: Option<f64>,
    /// Asset lines only: accumulated depreciation and impairment.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub depreciation: Option<f64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub constituents: Vec<Component>,
}

impl StatementLine {
    pub fn is_total(&self) -> bool {
        matches!(self.kind, LineKind::Subtotal | LineKind::Total)
    }
}

/// The ordered lines of one generated statement.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Statement {
    pub kind: StatementKind,
    pub lines: Vec<StatementLine>,
}

impl Statement {
    pub fn line(&self, reference: &str) -> Option<&StatementLine> {
        self.lines.iter().find(|l| l.reference == reference)
    }

    /// Current-year value of a line, zero when the reference is unknown.
    pub fn value(&self, reference: &str) -> f64 {
        self.line(reference).map(|l| l.current).unwrap_or(0.0)
    }

    pub fn prior_value(&self, reference: &str) -> Option<f64> {
        self.line(reference).and_then(|l| l.prior)
    }

    pub fn totals(&self) -> impl Iterator<Item = &StatementLine> {
        self.lines.iter().filter(|l| l.is_total())
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Every statement derived from one trial balance (and its optional N-1 comparison).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FinancialStatements {
    pub fiscal_year_end: Option<NaiveDate>,
    pub balance_sheet_assets: Statement,
    pub balance_sheet_liabilities: Statement,
    pub income_statement: Statement,
    pub sig: Statement,
    pub cash_flow: Statement,
    pub tafire: Statement,
}

impl FinancialStatements {
    pub fn statements(&self) -> [&Statement; 6] {
        [
            &self.balance_sheet_assets,
            &self.balance_sheet_liabilities,
            &self.income_statement,
            &self.sig,
            &self.cash_flow,
            &self.tafire,
        ]
    }

    /// True when the statements were generated with an N-1 balance.
    pub fn has_comparison(&self) -> bool {
        self.balance_sheet_assets.lines.iter().any(|l| l.prior.is_some())
    }

    pub fn get(&self, kind: StatementKind) -> &Statement {
        match kind {
            StatementKind::BalanceSheetAssets => &self.balance_sheet_assets,
            StatementKind::BalanceSheetLiabilities => &self.balance_sheet_liabilities,
            StatementKind::IncomeStatement => &self.income_statement,
            StatementKind::Sig => &self.sig,
            StatementKind::CashFlow => &self.cash_flow,
            StatementKind::Tafire => &self.tafire,
        }
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
