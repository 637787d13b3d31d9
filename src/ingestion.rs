use crate::aggregator::{is_valid_code, normalize_code};
use crate::schema::{BalanceEntry, TrialBalance};
use chrono::NaiveDate;
use log::debug;
use std::collections::BTreeMap;

/// A ledger export row. `debit` and `credit` may hold either movement totals or
/// closing balances; only their difference is kept.
#[derive(Debug, Clone)]
pub struct RawBalanceRow {
    pub account_code: String,
    pub label: String,
    pub debit: f64,
    pub credit: f64,
}

impl RawBalanceRow {
    pub fn new(account_code: impl Into<String>, label: impl Into<String>, debit: f64, credit: f64) -> Self {
        Self {
            account_code: account_code.into(),
            label: label.into(),
            debit,
            credit,
        }
    }
}

/// Turns raw rows into a trial balance with one entry per account, ordered by code.
///
/// Rows sharing a code are merged and keep the first non-empty label. Rows whose code
/// does not start with a digit (section titles, totals) are dropped.
pub fn convert_rows_to_balance(
    rows: &[RawBalanceRow],
    label: Option<String>,
    fiscal_year_end: Option<NaiveDate>,
) -> TrialBalance {
    let mut accounts: BTreeMap<String, (String, f64)> = BTreeMap::new();

    for row in rows {
        let code = normalize_code(&row.account_code);
        if !is_valid_code(&code) {
            debug!("Dropping row '{}' ({}): not an account code", row.account_code, row.label);
            continue;
        }

        let account = accounts.entry(code).or_insert_with(|| (String::new(), 0.0));
        if account.0.is_empty() {
            account.0 = row.label.trim().to_string();
        }
        account.1 += row.debit - row.credit;
    }

    let entries = accounts
        .into_iter()
        .map(|(code, (label, net))| {
            if net >= 0.0 {
                BalanceEntry::debit(code, label, net)
            } else {
                BalanceEntry::credit(code, label, -net)
            }
        })
        .collect();

    TrialBalance {
        label,
        fiscal_year_end,
        entries,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_movements_become_balances() {
        let rows = vec![
            RawBalanceRow::new("411100", "Client A", 1_500.0, 1_200.0),
            RawBalanceRow::new("401100", "Fournisseur B", 300.0, 800.0),
        ];

        let balance = convert_rows_to_balance(&rows, None, None);
        assert_eq!(balance.len(), 2);

        let supplier = &balance.entries[0];
        assert_eq!(supplier.account_code, "401100");
        assert_eq!(supplier.debit_balance, 0.0);
        assert_eq!(supplier.credit_balance, 500.0);

        let client = &balance.entries[1];
        assert_eq!(client.debit_balance, 300.0);
        assert_eq!(client.credit_balance, 0.0);
    }

    #[test]
    fn test_codes_are_normalized_and_merged() {
        let rows = vec![
            RawBalanceRow::new(" 52 11 ", "Banque", 100.0, 0.0),
            RawBalanceRow::new("5211", "", 50.0, 0.0),
        ];

        let balance = convert_rows_to_balance(&rows, Some("Société X".to_string()), None);
        assert_eq!(balance.len(), 1);
        assert_eq!(balance.entries[0].account_code, "5211");
        assert_eq!(balance.entries[0].label, "Banque");
        assert_eq!(balance.entries[0].debit_balance, 150.0);
        assert_eq!(balance.label.as_deref(), Some("Société X"));
    }

    #[test]
    fn test_non_account_rows_are_dropped() {
        let rows = vec![
            RawBalanceRow::new("CLASSE 1", "Comptes de ressources durables", 0.0, 0.0),
            RawBalanceRow::new("TOTAL", "Total général", 900.0, 900.0),
            RawBalanceRow::new("", "Ligne vide", 10.0, 0.0),
            RawBalanceRow::new("1011", "Capital", 0.0, 900.0),
        ];

        let balance = convert_rows_to_balance(&rows, None, NaiveDate::from_ymd_opt(2023, 12, 31));
        assert_eq!(balance.len(), 1);
        assert_eq!(balance.entries[0].account_code, "1011");
        assert_eq!(balance.total_credit(), 900.0);
        assert!(balance.fiscal_year_end.is_some());
    }
}
