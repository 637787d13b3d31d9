use crate::schema::TrialBalance;
use log::debug;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "PascalCase")]
pub enum BalanceSide {
    Debit,
    Credit,
}

/// How the signed net balance of each matching entry contributes to a line.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "PascalCase")]
pub enum AggregationMode {
    /// Debit balances only (gross fixed and current assets).
    AssetGross,
    /// Absolute value of every balance (depreciation and impairment).
    ContraAbs,
    /// Credit balances only, as a positive amount.
    Liability,
    /// Debit balances only.
    Expense,
    /// Credit balances only, as a positive amount.
    Income,
    /// Every balance, debit positive.
    SignedNet,
    /// One side of an account class that appears on both sides of the balance sheet.
    /// Each side only sees the entries carrying its own sign.
    Reciprocal(BalanceSide),
}

impl AggregationMode {
    pub fn contribution(self, net: f64) -> f64 {
        match self {
            AggregationMode::AssetGross
            | AggregationMode::Expense
            | AggregationMode::Reciprocal(BalanceSide::Debit) => {
                if net > 0.0 {
                    net
                } else {
                    0.0
                }
            }
            AggregationMode::Liability
            | AggregationMode::Income
            | AggregationMode::Reciprocal(BalanceSide::Credit) => {
                if net < 0.0 {
                    -net
                } else {
                    0.0
                }
            }
            AggregationMode::ContraAbs => net.abs(),
            AggregationMode::SignedNet => net,
        }
    }
}

/// Gross, depreciation and net amounts of an asset line.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct AssetAmounts {
    pub gross: f64,
    pub depreciation: f64,
    pub net: f64,
}

struct Position {
    code: String,
    net: f64,
}

/// Read-only view of a trial balance, normalized once for repeated prefix queries.
pub struct PrefixAggregator {
    positions: Vec<Position>,
}

impl PrefixAggregator {
    pub fn new(balance: &TrialBalance) -> Self {
        let mut positions = Vec::with_capacity(balance.entries.len());
        let mut skipped = 0usize;

        for entry in &balance.entries {
            let code = normalize_code(&entry.account_code);
            if !is_valid_code(&code) || !entry.net().is_finite() {
                skipped += 1;
                continue;
            }
            positions.push(Position {
                code,
                net: entry.net(),
            });
        }

        if skipped > 0 {
            debug!(
                "Ignored {} trial balance rows with unusable account codes or amounts",
                skipped
            );
        }

        Self { positions }
    }

    /// Sums the contributions of every entry matching at least one prefix.
    /// An entry matching several prefixes of the set is counted once.
    pub fn aggregate(&self, prefixes: &[&str], mode: AggregationMode) -> f64 {
        self.positions
            .iter()
            .filter(|p| matches_any(&p.code, prefixes))
            .map(|p| mode.contribution(p.net))
            .sum()
    }

    pub fn asset(&self, gross: &[&str], mode: AggregationMode, contra: &[&str]) -> AssetAmounts {
        let gross = self.aggregate(gross, mode);
        let depreciation = self.aggregate(contra, AggregationMode::ContraAbs);
        AssetAmounts {
            gross,
            depreciation,
            net: gross - depreciation,
        }
    }

    /// True while income or expense accounts (classes 6, 7 and 8) still carry a balance,
    /// i.e. the year is not closed.
    pub fn has_open_result_accounts(&self) -> bool {
        self.positions
            .iter()
            .any(|p| p.code.starts_with(['6', '7', '8']) && p.net != 0.0)
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }
}

pub fn normalize_code(code: &str) -> String {
    code.chars().filter(|c| !c.is_whitespace()).collect()
}

pub fn is_valid_code(code: &str) -> bool {
    code.chars().next().is_some_and(|c| c.is_ascii_digit())
}

fn matches_any(code: &str, prefixes: &[&str]) -> bool {
    prefixes
        .iter()
        .any(|prefix| !prefix.is_empty() && code.starts_with(prefix))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::BalanceEntry;

    fn balance(entries: Vec<BalanceEntry>) -> TrialBalance {
        TrialBalance::new(entries)
    }

    #[test]
    fn test_empty_balance_yields_zero_for_every_mode() {
        let agg = PrefixAggregator::new(&TrialBalance::default());
        let modes = [
            AggregationMode::AssetGross,
            AggregationMode::ContraAbs,
            AggregationMode::Liability,
            AggregationMode::Expense,
            AggregationMode::Income,
            AggregationMode::SignedNet,
            AggregationMode::Reciprocal(BalanceSide::Debit),
            AggregationMode::Reciprocal(BalanceSide::Credit),
        ];
        for mode in modes {
            assert_eq!(agg.aggregate(&["4"], mode), 0.0);
        }
    }

    #[test]
    fn test_prefix_matching() {
        let agg = PrefixAggregator::new(&balance(vec![BalanceEntry::debit(
            "2111",
            "Frais de recherche",
            900.0,
        )]));

        assert_eq!(agg.aggregate(&["211"], AggregationMode::AssetGross), 900.0);
        assert_eq!(agg.aggregate(&["21"], AggregationMode::AssetGross), 900.0);
        assert_eq!(agg.aggregate(&["212"], AggregationMode::AssetGross), 0.0);
        assert_eq!(agg.aggregate(&["2111"], AggregationMode::AssetGross), 900.0);
        assert_eq!(agg.aggregate(&["21111"], AggregationMode::AssetGross), 0.0);
    }

    #[test]
    fn test_overlapping_prefixes_count_entry_once() {
        let agg = PrefixAggregator::new(&balance(vec![
            BalanceEntry::debit("4111", "Client", 100.0),
            BalanceEntry::debit("4181", "Clients factures a etablir", 40.0),
        ]));

        assert_eq!(
            agg.aggregate(&["41", "411", "4111"], AggregationMode::AssetGross),
            140.0
        );
    }

    #[test]
    fn test_mode_sign_rules() {
        let agg = PrefixAggregator::new(&balance(vec![
            BalanceEntry::debit("521", "Banque A", 500.0),
            BalanceEntry::credit("522", "Banque B", 200.0),
        ]));

        assert_eq!(agg.aggregate(&["52"], AggregationMode::AssetGross), 500.0);
        assert_eq!(agg.aggregate(&["52"], AggregationMode::Liability), 200.0);
        assert_eq!(agg.aggregate(&["52"], AggregationMode::ContraAbs), 700.0);
        assert_eq!(agg.aggregate(&["52"], AggregationMode::SignedNet), 300.0);
        assert_eq!(agg.aggregate(&["52"], AggregationMode::Expense), 500.0);
        assert_eq!(agg.aggregate(&["52"], AggregationMode::Income), 200.0);
    }

    #[test]
    fn test_reciprocal_sides_split_by_entry_sign() {
        let agg = PrefixAggregator::new(&balance(vec![
            BalanceEntry::debit("4711", "Debiteur divers", 80.0),
            BalanceEntry::credit("4712", "Crediteur divers", 30.0),
        ]));

        let debit = agg.aggregate(&["47"], AggregationMode::Reciprocal(BalanceSide::Debit));
        let credit = agg.aggregate(&["47"], AggregationMode::Reciprocal(BalanceSide::Credit));
        assert_eq!(debit, 80.0);
        assert_eq!(credit, 30.0);
        assert_eq!(debit - credit, agg.aggregate(&["47"], AggregationMode::SignedNet));
    }

    #[test]
    fn test_asset_net_is_not_clamped() {
        let agg = PrefixAggregator::new(&balance(vec![
            BalanceEntry::debit("245", "Vehicule", 1000.0),
            BalanceEntry::credit("2845", "Amortissement vehicule", 1200.0),
        ]));

        let amounts = agg.asset(&["245"], AggregationMode::AssetGross, &["2845"]);
        assert_eq!(amounts.gross, 1000.0);
        assert_eq!(amounts.depreciation, 1200.0);
        assert_eq!(amounts.net, -200.0);
    }

    #[test]
    fn test_malformed_codes_are_ignored() {
        let agg = PrefixAggregator::new(&balance(vec![
            BalanceEntry::debit("", "Vide", 10.0),
            BalanceEntry::debit("TOTAL", "Ligne de total", 10.0),
            BalanceEntry::debit(" 60 1 ", "Achats", 25.0),
        ]));

        assert_eq!(agg.aggregate(&["6"], AggregationMode::Expense), 25.0);
        assert_eq!(agg.aggregate(&["601"], AggregationMode::Expense), 25.0);
        assert_eq!(agg.aggregate(&["T"], AggregationMode::SignedNet), 0.0);
    }

    #[test]
    fn test_empty_prefix_matches_nothing() {
        let agg = PrefixAggregator::new(&balance(vec![BalanceEntry::debit("601", "Achats", 5.0)]));
        assert_eq!(agg.aggregate(&[""], AggregationMode::SignedNet), 0.0);
    }

    #[test]
    fn test_open_result_accounts_detection() {
        let closed = PrefixAggregator::new(&balance(vec![
            BalanceEntry::credit("131", "Resultat beneficiaire", 50.0),
            BalanceEntry::new("601", "Achats soldes", 20.0, 20.0),
        ]));
        assert!(!closed.has_open_result_accounts());

        let open = PrefixAggregator::new(&balance(vec![BalanceEntry::credit("701", "Ventes", 50.0)]));
        assert!(open.has_open_result_accounts());

        let hao_only = PrefixAggregator::new(&balance(vec![
            BalanceEntry::debit("812", "Valeur comptable des cessions", 400.0),
            BalanceEntry::credit("822", "Produits des cessions", 300.0),
        ]));
        assert!(hao_only.has_open_result_accounts());
    }
}
