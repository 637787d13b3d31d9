use crate::aggregator::{AggregationMode, PrefixAggregator};
use crate::builder::{evaluate_table, YearInputs};
use crate::income_statement;
use crate::mapping::{LineDefinition, LineRule, ASSET_LINES, LIABILITY_LINES};
use crate::schema::{NetIncomePolicy, Statement, StatementKind, TrialBalance};
use log::debug;

pub const TOTAL_ASSETS: &str = "BZ";
pub const TOTAL_LIABILITIES: &str = "DZ";
pub const NET_INCOME: &str = "CH";

pub fn generate_assets(current: &TrialBalance, prior: Option<&TrialBalance>) -> Statement {
    generate_assets_with(ASSET_LINES, current, prior)
}

pub fn generate_assets_with(
    table: &[LineDefinition],
    current: &TrialBalance,
    prior: Option<&TrialBalance>,
) -> Statement {
    let current = PrefixAggregator::new(current);
    let prior = prior.map(PrefixAggregator::new);
    let inputs = |aggregator| YearInputs {
        aggregator,
        net_income: 0.0,
    };
    evaluate_table(
        StatementKind::BalanceSheetAssets,
        table,
        inputs(&current),
        prior.as_ref().map(inputs),
    )
}

pub fn generate_liabilities(
    current: &TrialBalance,
    prior: Option<&TrialBalance>,
    policy: NetIncomePolicy,
) -> Statement {
    generate_liabilities_with(LIABILITY_LINES, current, prior, policy)
}

pub fn generate_liabilities_with(
    table: &[LineDefinition],
    current: &TrialBalance,
    prior: Option<&TrialBalance>,
    policy: NetIncomePolicy,
) -> Statement {
    let equity_prefixes = table
        .iter()
        .find_map(|l| match l.rule {
            LineRule::NetIncome { prefixes } => Some(prefixes),
            _ => None,
        })
        .unwrap_or(&[]);

    let current = PrefixAggregator::new(current);
    let prior = prior.map(PrefixAggregator::new);
    let inputs = |aggregator| YearInputs {
        aggregator,
        net_income: resolve_net_income(aggregator, equity_prefixes, policy),
    };

    evaluate_table(
        StatementKind::BalanceSheetLiabilities,
        table,
        inputs(&current),
        prior.as_ref().map(inputs),
    )
}

/// Net income for the year as reported on the liabilities side.
///
/// A balance still holding class 6, 7 or 8 accounts is pre-closing: the result has not been booked
/// to account 13 yet, so the income statement bottom line is used.
pub fn resolve_net_income(
    aggregator: &PrefixAggregator,
    equity_prefixes: &[&str],
    policy: NetIncomePolicy,
) -> f64 {
    let from_income_statement = match policy {
        NetIncomePolicy::IncomeStatement => true,
        NetIncomePolicy::EquityAccount => false,
        NetIncomePolicy::Auto => aggregator.has_open_result_accounts(),
    };

    if from_income_statement {
        debug!("Net income taken from the income statement");
        income_statement::net_result(aggregator)
    } else {
        debug!("Net income taken from the equity accounts {:?}", equity_prefixes);
        -aggregator.aggregate(equity_prefixes, AggregationMode::SignedNet)
    }
}
