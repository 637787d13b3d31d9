use crate::aggregator::{AggregationMode, BalanceSide, PrefixAggregator};
use crate::balance_sheet;
use crate::builder::StatementBuilder;
use crate::mapping::{flows, Term};
use crate::schema::{EngineOptions, LineKind, NetIncomePolicy, Statement, StatementKind, TrialBalance};
use log::debug;

pub const OPENING_CASH: &str = "ZA";
pub const CAFG: &str = "FA";
pub const OPERATING_FLOWS: &str = "ZB";
pub const INVESTING_FLOWS: &str = "ZC";
pub const FINANCING_FLOWS: &str = "ZF";
pub const NET_CASH_CHANGE: &str = "ZG";
pub const CLOSING_CASH: &str = "ZH";
pub const DIRECT_CLOSING_CASH: &str = "ZI";
pub const CONTROL: &str = "ZJ";

pub(crate) const fn plus(reference: &'static str) -> Term {
    Term {
        reference,
        coefficient: 1.0,
    }
}

pub(crate) const fn minus(reference: &'static str) -> Term {
    Term {
        reference,
        coefficient: -1.0,
    }
}

fn signed(aggregator: &PrefixAggregator, prefixes: &[&str]) -> f64 {
    aggregator.aggregate(prefixes, AggregationMode::SignedNet)
}

/// Operating working capital at one closing date, net of provisions.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct WorkingCapital {
    pub hao_assets: f64,
    pub stocks: f64,
    pub receivables: f64,
    pub payables: f64,
}

impl WorkingCapital {
    pub fn at(aggregator: &PrefixAggregator) -> Self {
        let debit = AggregationMode::Reciprocal(BalanceSide::Debit);
        let credit = AggregationMode::Reciprocal(BalanceSide::Credit);

        Self {
            hao_assets: aggregator.aggregate(flows::HAO_OPERATING, debit)
                + signed(aggregator, flows::HAO_ASSET_PROVISIONS),
            stocks: signed(aggregator, flows::STOCKS),
            receivables: aggregator.aggregate(flows::OPERATING_THIRD_PARTIES, debit)
                + signed(aggregator, flows::RECEIVABLE_ADJUSTMENTS),
            payables: aggregator.aggregate(flows::OPERATING_THIRD_PARTIES, credit)
                + aggregator.aggregate(flows::HAO_OPERATING, credit)
                - signed(aggregator, flows::PAYABLE_ADJUSTMENTS),
        }
    }

    /// Working capital requirement; positive ties up cash.
    pub fn requirement(&self) -> f64 {
        self.hao_assets + self.stocks + self.receivables - self.payables
    }
}

/// Year-over-year change of [`WorkingCapital`]. Zero without N-1.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct WorkingCapitalChange {
    pub hao_assets: f64,
    pub stocks: f64,
    pub receivables: f64,
    pub payables: f64,
}

impl WorkingCapitalChange {
    pub fn between(current: &PrefixAggregator, prior: Option<&PrefixAggregator>) -> Self {
        let Some(prior) = prior else {
            return Self::default();
        };
        let (closing, opening) = (WorkingCapital::at(current), WorkingCapital::at(prior));

        Self {
            hao_assets: closing.hao_assets - opening.hao_assets,
            stocks: closing.stocks - opening.stocks,
            receivables: closing.receivables - opening.receivables,
            payables: closing.payables - opening.payables,
        }
    }

    /// Increase of the working capital requirement; positive is a use of cash.
    pub fn net(&self) -> f64 {
        self.hao_assets + self.stocks + self.receivables - self.payables
    }
}

/// Net cash position: treasury assets less treasury liabilities.
pub fn net_cash(aggregator: &PrefixAggregator) -> f64 {
    signed(aggregator, flows::TREASURY)
}

/// Tableau des flux de trésorerie. Period-over-period lines are zero without an N-1 balance.
pub fn generate(current: &TrialBalance, prior: Option<&TrialBalance>, options: &EngineOptions) -> Statement {
    let current = PrefixAggregator::new(current);
    let prior = prior.map(PrefixAggregator::new);
    from_aggregators(&current, prior.as_ref(), options.net_income_policy)
}

/// Every line holds its signed effect on cash, so each subtotal is a plain sum.
///
/// Each balance-sheet account feeds exactly one line. Amounts that no single balance shows
/// (depreciation written off on disposals, dividends paid) are taken as the residual of
/// their account group, which makes the net change equal to closing less opening cash.
pub(crate) fn from_aggregators(
    current: &PrefixAggregator,
    prior: Option<&PrefixAggregator>,
    policy: NetIncomePolicy,
) -> Statement {
    let has_prior = prior.is_some();
    let delta = |prefixes: &[&str]| {
        prior
            .map(|p| signed(current, prefixes) - signed(p, prefixes))
            .unwrap_or(0.0)
    };

    if !has_prior {
        debug!("No prior balance: working capital, investing and financing changes reported as zero");
    }

    let net_income = balance_sheet::resolve_net_income(current, flows::NET_INCOME, policy);
    let charges = signed(current, flows::DEPRECIATION_CHARGES);
    let reversals = -signed(current, flows::REVERSALS);
    let subsidies_released = -signed(current, flows::SUBSIDY_RELEASES);
    let book_value = signed(current, flows::DISPOSAL_BOOK_VALUE);
    let intangible_book_value = signed(current, flows::INTANGIBLE_DISPOSAL_BOOK_VALUE);
    let financial_book_value = signed(current, flows::FINANCIAL_DISPOSAL_BOOK_VALUE);
    let tangible_book_value = book_value - intangible_book_value - financial_book_value;
    let proceeds = -signed(current, flows::DISPOSAL_PROCEEDS);
    let financial_proceeds = -signed(current, flows::FINANCIAL_DISPOSAL_PROCEEDS);

    let working_capital = WorkingCapitalChange::between(current, prior);

    let (intangible_outflow, tangible_outflow, financial_outflow) = if has_prior {
        // Gross value of disposed assets beyond their book value.
        let written_off = charges - reversals + subsidies_released + delta(flows::DEPRECIATION_AND_PROVISIONS);
        (
            -(delta(flows::INTANGIBLE_ASSETS) + intangible_book_value),
            -(delta(flows::TANGIBLE_ASSETS) + tangible_book_value + written_off)
                - delta(flows::REVALUATION)
                - delta(flows::INVESTMENT_PAYABLES),
            -(delta(flows::FINANCIAL_ASSETS) + financial_book_value),
        )
    } else {
        (0.0, 0.0, 0.0)
    };

    let capital_change =
        -(delta(flows::EQUITY_CAPITAL) - delta(flows::OWNER_ACCOUNT) - delta(flows::REVALUATION));
    let subsidies_received = if has_prior {
        -delta(flows::INVESTMENT_SUBSIDIES) + subsidies_released
    } else {
        0.0
    };
    let distributions = if has_prior {
        -delta(flows::RESULT_AND_RESERVES) - net_income
    } else {
        0.0
    };
    let borrowings = -delta(flows::BORROWINGS);
    let other_debts = -delta(flows::FINANCIAL_DEBTS) - borrowings;

    let mut b = StatementBuilder::new(StatementKind::CashFlow, false);

    b.line(
        OPENING_CASH,
        "Trésorerie nette au 1er janvier (trésorerie actif N-1 - trésorerie passif N-1)",
        prior.map(net_cash).unwrap_or(0.0),
        None,
    );

    b.header("A", "Flux de trésorerie provenant des activités opérationnelles");
    b.line(
        CAFG,
        "Capacité d'autofinancement globale (CAFG)",
        net_income + charges - reversals + book_value - proceeds,
        None,
    );
    b.line("FB", "- Actif circulant HAO (1)", -working_capital.hao_assets, None);
    b.line("FC", "- Variation des stocks", -working_capital.stocks, None);
    b.line("FD", "- Variation des créances", -working_capital.receivables, None);
    b.line("FE", "+ Variation du passif circulant (1)", working_capital.payables, None);
    b.total(
        "BF",
        "Variation du BF lié aux activités opérationnelles (FB+FC+FD+FE)",
        LineKind::Subtotal,
        &[plus("FB"), plus("FC"), plus("FD"), plus("FE")],
    );
    b.total(
        OPERATING_FLOWS,
        "Flux de trésorerie provenant des activités opérationnelles (somme FA à FE)",
        LineKind::Subtotal,
        &[plus(CAFG), plus("FB"), plus("FC"), plus("FD"), plus("FE")],
    );

    b.header("B", "Flux de trésorerie provenant des activités d'investissements");
    b.line(
        "FF",
        "- Décaissements liés aux acquisitions d'immobilisations incorporelles",
        intangible_outflow,
        None,
    );
    b.line(
        "FG",
        "- Décaissements liés aux acquisitions d'immobilisations corporelles",
        tangible_outflow,
        None,
    );
    b.line(
        "FH",
        "- Décaissements liés aux acquisitions d'immobilisations financières",
        financial_outflow,
        None,
    );
    b.line(
        "FI",
        "+ Encaissements liés aux cessions d'immobilisations incorporelles et corporelles",
        proceeds - financial_proceeds - delta(flows::DISPOSAL_RECEIVABLES),
        None,
    );
    b.line(
        "FJ",
        "+ Encaissements liés aux cessions d'immobilisations financières",
        financial_proceeds,
        None,
    );
    b.total(
        INVESTING_FLOWS,
        "Flux de trésorerie provenant des activités d'investissement (somme FF à FJ)",
        LineKind::Subtotal,
        &[plus("FF"), plus("FG"), plus("FH"), plus("FI"), plus("FJ")],
    );

    b.header("C", "Flux de trésorerie provenant du financement par les capitaux propres");
    b.line("FK", "+ Augmentations de capital par apports nouveaux", capital_change.max(0.0), None);
    b.line("FL", "+ Subventions d'investissement reçues", subsidies_received, None);
    b.line(
        "FM",
        "- Prélèvements sur le capital",
        capital_change.min(0.0) - delta(flows::OWNER_ACCOUNT),
        None,
    );
    b.line("FN", "- Dividendes versés", distributions, None);
    b.total(
        "ZD",
        "Flux de trésorerie provenant des capitaux propres (somme FK à FN)",
        LineKind::Subtotal,
        &[plus("FK"), plus("FL"), plus("FM"), plus("FN")],
    );

    b.header("D", "Trésorerie provenant du financement par les capitaux étrangers");
    b.line("FO", "+ Emprunts (2)", borrowings.max(0.0), None);
    b.line("FP", "+ Autres dettes financières diverses (3)", other_debts.max(0.0), None);
    b.line(
        "FQ",
        "- Remboursements des emprunts et autres dettes financières",
        borrowings.min(0.0) + other_debts.min(0.0),
        None,
    );
    b.total(
        "ZE",
        "Flux de trésorerie provenant des capitaux étrangers (somme FO à FQ)",
        LineKind::Subtotal,
        &[plus("FO"), plus("FP"), plus("FQ")],
    );
    b.total(
        FINANCING_FLOWS,
        "Flux de trésorerie provenant des activités de financement (D+E)",
        LineKind::Subtotal,
        &[plus("ZD"), plus("ZE")],
    );

    b.total(
        NET_CASH_CHANGE,
        "VARIATION DE LA TRÉSORERIE NETTE DE LA PÉRIODE (B+C+F)",
        LineKind::Total,
        &[plus(OPERATING_FLOWS), plus(INVESTING_FLOWS), plus(FINANCING_FLOWS)],
    );
    b.total(
        CLOSING_CASH,
        "Trésorerie nette au 31 décembre (G+A)",
        LineKind::Total,
        &[plus(OPENING_CASH), plus(NET_CASH_CHANGE)],
    );
    b.line(
        DIRECT_CLOSING_CASH,
        "Contrôle : trésorerie actif N - trésorerie passif N",
        net_cash(current),
        None,
    );
    b.total(
        CONTROL,
        "Écart de contrôle (ZH - ZI)",
        LineKind::Total,
        &[plus(CLOSING_CASH), minus(DIRECT_CLOSING_CASH)],
    );

    b.finish()
}
