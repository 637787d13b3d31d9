use crate::aggregator::PrefixAggregator;
use crate::builder::{evaluate_table, YearInputs};
use crate::mapping::{LineDefinition, INCOME_STATEMENT_LINES};
use crate::schema::{Statement, StatementKind, TrialBalance};

/// Bottom line of the income statement.
pub const NET_RESULT: &str = "XI";

/// Signed income statement: revenues positive, charges negative, so every subtotal is a plain sum.
pub fn generate(current: &TrialBalance, prior: Option<&TrialBalance>) -> Statement {
    generate_with(INCOME_STATEMENT_LINES, current, prior)
}

pub fn generate_with(
    table: &[LineDefinition],
    current: &TrialBalance,
    prior: Option<&TrialBalance>,
) -> Statement {
    let current = PrefixAggregator::new(current);
    let prior = prior.map(PrefixAggregator::new);
    from_aggregators(table, &current, prior.as_ref())
}

pub(crate) fn from_aggregators(
    table: &[LineDefinition],
    current: &PrefixAggregator,
    prior: Option<&PrefixAggregator>,
) -> Statement {
    let inputs = |aggregator| YearInputs {
        aggregator,
        net_income: 0.0,
    };
    evaluate_table(
        StatementKind::IncomeStatement,
        table,
        inputs(current),
        prior.map(inputs),
    )
}

/// Net result of one year, as computed by the standard income statement.
pub fn net_result(aggregator: &PrefixAggregator) -> f64 {
    from_aggregators(INCOME_STATEMENT_LINES, aggregator, None).value(NET_RESULT)
}
