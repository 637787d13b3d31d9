use crate::aggregator::{is_valid_code, normalize_code, AggregationMode, PrefixAggregator};
use crate::balance_sheet::{NET_INCOME, TOTAL_ASSETS, TOTAL_LIABILITIES};
use crate::cash_flow::{CONTROL, NET_CASH_CHANGE};
use crate::error::{LiasseError, Result};
use crate::income_statement::NET_RESULT;
use crate::mapping::flows;
use crate::schema::{FinancialStatements, LineKind, Statement, StatementKind, TrialBalance};
use crate::sig::RESULTAT_NET;
use crate::tafire::CASH_CHANGE;
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

pub const DEFAULT_TOLERANCE: f64 = 1.0;

/// One comparison between two amounts that must agree within the tolerance.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CoherenceCheck {
    pub code: String,
    pub label: String,
    pub value_a: f64,
    pub label_a: String,
    pub value_b: f64,
    pub label_b: String,
    pub gap: f64,
    pub ok: bool,
}

impl CoherenceCheck {
    fn new(
        code: &str,
        label: &str,
        (value_a, label_a): (f64, &str),
        (value_b, label_b): (f64, &str),
        tolerance: f64,
    ) -> Self {
        let gap = (value_a - value_b).abs();
        Self {
            code: code.to_string(),
            label: label.to_string(),
            value_a,
            label_a: label_a.to_string(),
            value_b,
            label_b: label_b.to_string(),
            gap,
            ok: gap <= tolerance,
        }
    }

    pub fn message(&self) -> String {
        format!(
            "{}: {} ({:.2}) != {} ({:.2}), gap {:.2}",
            self.label, self.label_a, self.value_a, self.label_b, self.value_b, self.gap
        )
    }
}

/// An account whose balance runs against the normal direction of its class.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BalanceSenseWarning {
    pub rule: String,
    pub account_code: String,
    pub label: String,
    pub net_balance: f64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "PascalCase")]
pub enum Severity {
    Info,
    Minor,
    Major,
    Blocking,
}

/// A statutory control point the statements do not meet.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ControlPointWarning {
    pub rule: String,
    pub severity: Severity,
    /// Statement line or account the warning is about.
    pub reference: String,
    pub message: String,
    pub value: f64,
    pub threshold: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ValidationResult {
    pub is_valid: bool,
    pub errors: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CoherenceReport {
    pub tolerance: f64,
    pub checks: Vec<CoherenceCheck>,
    /// Informative only; never affects validity.
    pub warnings: Vec<BalanceSenseWarning>,
    /// Informative only; never affects validity.
    pub control_points: Vec<ControlPointWarning>,
}

impl CoherenceReport {
    pub fn is_valid(&self) -> bool {
        self.checks.iter().all(|c| c.ok)
    }

    pub fn check(&self, code: &str) -> Option<&CoherenceCheck> {
        self.checks.iter().find(|c| c.code == code)
    }

    pub fn failures(&self) -> impl Iterator<Item = &CoherenceCheck> {
        self.checks.iter().filter(|c| !c.ok)
    }

    pub fn to_validation_result(&self) -> ValidationResult {
        ValidationResult {
            is_valid: self.is_valid(),
            errors: self.failures().map(CoherenceCheck::message).collect(),
        }
    }
}

pub struct CoherenceValidator<'a> {
    statements: &'a FinancialStatements,
    balance: &'a TrialBalance,
    tolerance: f64,
}

impl<'a> CoherenceValidator<'a> {
    pub fn new(statements: &'a FinancialStatements, balance: &'a TrialBalance, tolerance: f64) -> Self {
        Self {
            statements,
            balance,
            tolerance,
        }
    }

    pub fn validate(&self) -> ValidationResult {
        self.validate_detailed().to_validation_result()
    }

    pub fn validate_detailed(&self) -> CoherenceReport {
        let s = self.statements;
        let net_income = s.income_statement.value(NET_RESULT);

        let mut checks = vec![
            self.compare(
                "BZ=DZ",
                "Balance sheet equilibrium",
                (s.balance_sheet_assets.value(TOTAL_ASSETS), "Total assets (BZ)"),
                (
                    s.balance_sheet_liabilities.value(TOTAL_LIABILITIES),
                    "Total liabilities and equity (DZ)",
                ),
            ),
            self.compare(
                "XI=CH",
                "Net income, income statement vs balance sheet",
                (net_income, "Income statement net result (XI)"),
                (s.balance_sheet_liabilities.value(NET_INCOME), "Balance sheet net income (CH)"),
            ),
            self.compare(
                "XI=SIG9",
                "Net income, income statement vs SIG",
                (net_income, "Income statement net result (XI)"),
                (s.sig.value(RESULTAT_NET), "SIG net result (SIG9)"),
            ),
        ];

        checks.push(self.sig_cascade_check(&s.sig));
        checks.push(self.totals_check());
        // Opening cash is unknown without N-1, so the control line cannot close.
        if s.has_comparison() {
            checks.push(self.compare(
                "ZJ=0",
                "Cash-flow statement control",
                (s.cash_flow.value(CONTROL), "Control gap (ZJ)"),
                (0.0, "Expected"),
            ));
        } else {
            debug!("No comparison year, cash-flow control check skipped");
        }
        checks.push(self.compare(
            "TAFIRE=TFT",
            "Funds-flow cash change vs cash-flow statement",
            (s.tafire.value(CASH_CHANGE), "TAFIRE cash change (VTR)"),
            (s.cash_flow.value(NET_CASH_CHANGE), "TFT net cash change (ZG)"),
        ));
        checks.push(self.compare(
            "TB",
            "Trial balance equilibrium",
            (self.balance.total_debit(), "Total debit balances"),
            (self.balance.total_credit(), "Total credit balances"),
        ));

        for check in checks.iter().filter(|c| !c.ok) {
            warn!("Coherence check failed: {}", check.message());
        }

        let warnings = balance_sense_warnings(self.balance, self.tolerance);
        let control_points = control_point_warnings(s, self.balance, self.tolerance);
        debug!(
            "Coherence validation ran {} checks, {} balance sense warnings, {} control point warnings",
            checks.len(),
            warnings.len(),
            control_points.len()
        );

        CoherenceReport {
            tolerance: self.tolerance,
            checks,
            warnings,
            control_points,
        }
    }

    /// Strict variant: the first failing check becomes an error.
    pub fn verify(&self) -> Result<()> {
        let report = self.validate_detailed();
        let violation = report.failures().next().map(|check| LiasseError::CoherenceViolation {
            code: check.code.clone(),
            left: check.value_a,
            right: check.value_b,
            gap: check.gap,
        });
        violation.map_or(Ok(()), Err)
    }

    fn compare(&self, code: &str, label: &str, a: (f64, &str), b: (f64, &str)) -> CoherenceCheck {
        CoherenceCheck::new(code, label, a, b, self.tolerance)
    }

    /// Re-runs the SIG formulas on the returned T-lines, chaining recomputed SIG values.
    fn sig_cascade_check(&self, sig: &Statement) -> CoherenceCheck {
        let mut recomputed: HashMap<&str, f64> = HashMap::new();
        let mut worst: Option<(&str, f64, f64)> = None;

        for line in &sig.lines {
            if !line.is_total() {
                recomputed.insert(line.reference.as_str(), line.current);
                continue;
            }
            let value: f64 = line
                .constituents
                .iter()
                .map(|c| c.coefficient * recomputed.get(c.reference.as_str()).copied().unwrap_or(0.0))
                .sum();
            recomputed.insert(line.reference.as_str(), value);

            let gap = (line.current - value).abs();
            if worst.map_or(true, |(_, a, b)| gap > (a - b).abs()) {
                worst = Some((line.reference.as_str(), line.current, value));
            }
        }

        let (reference, reported, expected) = worst.unwrap_or((RESULTAT_NET, 0.0, 0.0));
        self.compare(
            "SIG",
            "SIG cascade arithmetic",
            (reported, &format!("Reported {}", reference)),
            (expected, &format!("Recomputed {}", reference)),
        )
    }

    /// Every total of every statement equals its declared constituents as returned.
    fn totals_check(&self) -> CoherenceCheck {
        let mut worst: (String, f64, f64) = (String::from("-"), 0.0, 0.0);

        for statement in self.statements.statements() {
            for line in statement.totals() {
                let expected: f64 = line
                    .constituents
                    .iter()
                    .map(|c| c.coefficient * statement.value(&c.reference))
                    .sum();
                if (line.current - expected).abs() > (worst.1 - worst.2).abs() {
                    worst = (
                        format!("{} {}", statement_code(statement.kind), line.reference),
                        line.current,
                        expected,
                    );
                }
            }
        }

        self.compare(
            "TOTALS",
            "Declared totals",
            (worst.1, &format!("Reported {}", worst.0)),
            (worst.2, "Sum of constituents"),
        )
    }
}

fn statement_code(kind: StatementKind) -> &'static str {
    match kind {
        StatementKind::BalanceSheetAssets => "ACTIF",
        StatementKind::BalanceSheetLiabilities => "PASSIF",
        StatementKind::IncomeStatement => "CR",
        StatementKind::Sig => "SIG",
        StatementKind::CashFlow => "TFT",
        StatementKind::Tafire => "TAFIRE",
    }
}

#[derive(Clone, Copy)]
enum ExpectedSense {
    Debit,
    Credit,
}

struct SenseRule {
    code: &'static str,
    prefix: &'static str,
    excluded: &'static [&'static str],
    expected: ExpectedSense,
}

const SENSE_RULES: &[SenseRule] = &[
    SenseRule {
        code: "SS-001",
        prefix: "2",
        excluded: &["28", "29"],
        expected: ExpectedSense::Debit,
    },
    SenseRule {
        code: "SS-002",
        prefix: "3",
        excluded: &["39"],
        expected: ExpectedSense::Debit,
    },
    SenseRule {
        code: "SS-003",
        prefix: "6",
        excluded: &["603"],
        expected: ExpectedSense::Debit,
    },
    SenseRule {
        code: "SS-004",
        prefix: "7",
        excluded: &["73"],
        expected: ExpectedSense::Credit,
    },
    SenseRule {
        code: "SS-005",
        prefix: "411",
        excluded: &[],
        expected: ExpectedSense::Debit,
    },
    SenseRule {
        code: "SS-006",
        prefix: "401",
        excluded: &[],
        expected: ExpectedSense::Credit,
    },
];

/// Flags accounts whose balance runs against the normal direction of their class.
pub fn balance_sense_warnings(balance: &TrialBalance, threshold: f64) -> Vec<BalanceSenseWarning> {
    let mut warnings = Vec::new();

    for entry in &balance.entries {
        let code = normalize_code(&entry.account_code);
        if !is_valid_code(&code) {
            continue;
        }
        let net = entry.net();

        for rule in SENSE_RULES {
            if !code.starts_with(rule.prefix) || rule.excluded.iter().any(|p| code.starts_with(p)) {
                continue;
            }
            let inverted = match rule.expected {
                ExpectedSense::Debit => net < -threshold,
                ExpectedSense::Credit => net > threshold,
            };
            if inverted {
                warnings.push(BalanceSenseWarning {
                    rule: rule.code.to_string(),
                    account_code: code.clone(),
                    label: entry.label.clone(),
                    net_balance: net,
                });
            }
        }
    }

    warnings
}

/// Relative change between N and N-1 above which a main line is flagged.
const VARIANCE_THRESHOLD: f64 = 0.30;

const MAIN_LINES: &[(StatementKind, &[&str])] = &[
    (StatementKind::BalanceSheetAssets, &["AZ", "BK", "BT", "BZ"]),
    (StatementKind::BalanceSheetLiabilities, &["CP", "DD", "DP", "DT"]),
    (StatementKind::IncomeStatement, &["XB", "XD", "XI"]),
];

impl ControlPointWarning {
    fn new(rule: &str, severity: Severity, reference: &str, message: String, value: f64, threshold: f64) -> Self {
        Self {
            rule: rule.to_string(),
            severity,
            reference: reference.to_string(),
            message,
            value,
            threshold,
        }
    }
}

/// Statutory control points read from the generated statements and the trial balance.
pub fn control_point_warnings(
    statements: &FinancialStatements,
    balance: &TrialBalance,
    tolerance: f64,
) -> Vec<ControlPointWarning> {
    let assets = &statements.balance_sheet_assets;
    let liabilities = &statements.balance_sheet_liabilities;
    let mut warnings = Vec::new();

    let capital = liabilities.value("CA");
    let equity = liabilities.value("CP");
    if capital > tolerance && equity < capital / 2.0 {
        warnings.push(ControlPointWarning::new(
            "EF-004",
            Severity::Major,
            "CP",
            format!("Equity {:.2} is below half of the share capital {:.2}", equity, capital),
            equity,
            capital / 2.0,
        ));
    }

    for line in assets.lines.iter().filter(|l| l.kind == LineKind::Line) {
        if let (Some(gross), Some(depreciation)) = (line.gross, line.depreciation) {
            if depreciation > gross + tolerance {
                warnings.push(ControlPointWarning::new(
                    "AP-002",
                    Severity::Blocking,
                    &line.reference,
                    format!(
                        "Accumulated depreciation {:.2} exceeds gross value {:.2}",
                        depreciation, gross
                    ),
                    depreciation,
                    gross,
                ));
            }
        }
    }

    let working_capital = liabilities.value("DF") - assets.value("AZ");
    if working_capital < -tolerance {
        warnings.push(ControlPointWarning::new(
            "CC-002",
            Severity::Info,
            "DF",
            format!("Negative working capital {:.2}", working_capital),
            working_capital,
            0.0,
        ));
    }

    let net_treasury = assets.value("BT") - liabilities.value("DT");
    let requirement = assets.value("BK") + assets.value("BU") - liabilities.value("DP") - liabilities.value("DV");
    if (net_treasury - (working_capital - requirement)).abs() > tolerance {
        warnings.push(ControlPointWarning::new(
            "CC-003",
            Severity::Major,
            "BT",
            format!(
                "Net treasury {:.2} differs from working capital less requirement {:.2}",
                net_treasury,
                working_capital - requirement
            ),
            net_treasury,
            working_capital - requirement,
        ));
    }

    let aggregator = PrefixAggregator::new(balance);
    let conversion_losses = aggregator.aggregate(flows::CONVERSION_ASSETS, AggregationMode::AssetGross);
    let provision = aggregator.aggregate(flows::FX_RISK_PROVISIONS, AggregationMode::Liability);
    if conversion_losses > tolerance && provision + tolerance < conversion_losses {
        warnings.push(ControlPointWarning::new(
            "EC-002",
            Severity::Major,
            "478",
            format!(
                "Conversion losses {:.2} covered by only {:.2} of provision on account 194",
                conversion_losses, provision
            ),
            provision,
            conversion_losses,
        ));
    }

    for (kind, references) in MAIN_LINES {
        let statement = statements.get(*kind);
        for reference in references.iter() {
            let Some(line) = statement.line(reference) else {
                continue;
            };
            let Some(prior) = line.prior.filter(|p| p.abs() > tolerance) else {
                continue;
            };
            let variance = (line.current - prior) / prior.abs();
            if variance.abs() > VARIANCE_THRESHOLD {
                warnings.push(ControlPointWarning::new(
                    "CC-001",
                    Severity::Minor,
                    reference,
                    format!(
                        "{} moved by {:.1}% between N-1 ({:.2}) and N ({:.2})",
                        reference,
                        variance * 100.0,
                        prior,
                        line.current
                    ),
                    variance,
                    VARIANCE_THRESHOLD,
                ));
            }
        }
    }

    warnings
}

pub fn validate_coherence(
    statements: &FinancialStatements,
    balance: &TrialBalance,
    tolerance: f64,
) -> ValidationResult {
    CoherenceValidator::new(statements, balance, tolerance).validate()
}

pub fn verify_coherence(statements: &FinancialStatements, balance: &TrialBalance, tolerance: f64) -> Result<()> {
    CoherenceValidator::new(statements, balance, tolerance).verify()
}
