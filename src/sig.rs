use crate::builder::evaluate_derived_table;
use crate::income_statement;
use crate::mapping::{LineDefinition, SIG_LINES};
use crate::schema::{Statement, StatementKind, TrialBalance};

pub const MARGE_COMMERCIALE: &str = "SIG1";
pub const EXCEDENT_BRUT_EXPLOITATION: &str = "SIG4";
pub const RESULTAT_NET: &str = "SIG9";

/// Soldes intermédiaires de gestion, regrouped from the income statement of the same balances.
pub fn generate(current: &TrialBalance, prior: Option<&TrialBalance>) -> Statement {
    from_income_statement(&income_statement::generate(current, prior))
}

pub fn from_income_statement(income_statement: &Statement) -> Statement {
    from_income_statement_with(SIG_LINES, income_statement)
}

pub fn from_income_statement_with(table: &[LineDefinition], income_statement: &Statement) -> Statement {
    evaluate_derived_table(StatementKind::Sig, table, income_statement)
}
