use crate::aggregator::PrefixAggregator;
use crate::builder::StatementBuilder;
use crate::cash_flow::{self, minus, plus};
use crate::income_statement;
use crate::mapping::{INCOME_STATEMENT_LINES, SIG_LINES};
use crate::schema::{EngineOptions, LineKind, Statement, StatementKind, TrialBalance};
use crate::sig;

pub const TOTAL_USES: &str = "TEM";
pub const TOTAL_RESOURCES: &str = "TRS";
pub const CASH_CHANGE: &str = "VTR";

/// Tableau financier des ressources et des emplois.
pub fn generate(current: &TrialBalance, prior: Option<&TrialBalance>, options: &EngineOptions) -> Statement {
    let current_agg = PrefixAggregator::new(current);
    let prior_agg = prior.map(PrefixAggregator::new);

    let tft = cash_flow::from_aggregators(&current_agg, prior_agg.as_ref(), options.net_income_policy);
    let income = income_statement::from_aggregators(INCOME_STATEMENT_LINES, &current_agg, None);
    let soldes = sig::from_income_statement_with(SIG_LINES, &income);

    from_statements(&tft, &soldes)
}

/// Builds the funds-flow statement from an already generated cash-flow statement and SIG.
///
/// Uses and resources are the cash-flow lines with their sign turned into a direction,
/// so `VTR` always equals the net cash change `ZG`.
pub fn from_statements(tft: &Statement, soldes: &Statement) -> Statement {
    let mut b = StatementBuilder::new(StatementKind::Tafire, false);

    b.header("I", "CAPACITÉ D'AUTOFINANCEMENT GLOBALE");
    b.line("EBE", "Excédent brut d'exploitation", soldes.value(sig::EXCEDENT_BRUT_EXPLOITATION), None);
    b.line("CAFG", "Capacité d'autofinancement globale (CAFG)", tft.value(cash_flow::CAFG), None);
    b.line("DIV", "Distributions de dividendes et prélèvements", -tft.value("FN"), None);
    b.total("AUTO", "AUTOFINANCEMENT", LineKind::Subtotal, &[plus("CAFG"), minus("DIV")]);

    b.header("II", "INVESTISSEMENTS ET DÉSINVESTISSEMENTS");
    b.line("ACI", "Acquisitions d'immobilisations incorporelles", -tft.value("FF"), None);
    b.line("ACC", "Acquisitions d'immobilisations corporelles", -tft.value("FG"), None);
    b.line("ACF", "Acquisitions d'immobilisations financières", -tft.value("FH"), None);
    b.total(
        "ACQ",
        "INVESTISSEMENTS TOTAUX",
        LineKind::Subtotal,
        &[plus("ACI"), plus("ACC"), plus("ACF")],
    );
    b.line("CES", "Cessions d'immobilisations", tft.value("FI") + tft.value("FJ"), None);

    b.header("III", "FINANCEMENT");
    b.line(
        "CAP",
        "Augmentations de capitaux propres, nettes des prélèvements",
        tft.value("FK") + tft.value("FL") + tft.value("FM"),
        None,
    );
    b.line("EMP", "Emprunts et autres dettes financières", tft.value("FO") + tft.value("FP"), None);
    b.line("REM", "Remboursements d'emprunts et autres dettes financières", -tft.value("FQ"), None);

    b.header("IV", "VARIATION DU BESOIN DE FINANCEMENT D'EXPLOITATION");
    b.line("VHA", "Variation de l'actif circulant HAO", -tft.value("FB"), None);
    b.line("VST", "Variation des stocks", -tft.value("FC"), None);
    b.line("VCR", "Variation des créances", -tft.value("FD"), None);
    b.line("VDE", "Variation des dettes circulantes", tft.value("FE"), None);
    b.total(
        "BFR",
        "VARIATION DU BESOIN DE FINANCEMENT",
        LineKind::Subtotal,
        &[plus("VHA"), plus("VST"), plus("VCR"), minus("VDE")],
    );
    let bfr = b.value("BFR");

    b.header("V", "SYNTHÈSE DES EMPLOIS ET DES RESSOURCES");
    b.line("EBF", "Emplois : augmentation du besoin de financement", bfr.max(0.0), None);
    b.line("RBF", "Ressources : diminution du besoin de financement", (-bfr).max(0.0), None);
    b.total(
        TOTAL_USES,
        "TOTAL EMPLOIS",
        LineKind::Subtotal,
        &[plus("ACQ"), plus("REM"), plus("DIV"), plus("EBF")],
    );
    b.total(
        TOTAL_RESOURCES,
        "TOTAL RESSOURCES",
        LineKind::Subtotal,
        &[plus("CAFG"), plus("CES"), plus("CAP"), plus("EMP"), plus("RBF")],
    );
    b.total(
        CASH_CHANGE,
        "VARIATION DE LA TRÉSORERIE (RESSOURCES - EMPLOIS)",
        LineKind::Total,
        &[plus(TOTAL_RESOURCES), minus(TOTAL_USES)],
    );

    b.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::BalanceEntry;

    fn opening() -> TrialBalance {
        TrialBalance::new(vec![
            BalanceEntry::credit("1011", "Capital", 1_000.0),
            BalanceEntry::debit("311", "Marchandises", 300.0),
            BalanceEntry::credit("4011", "Fournisseur", 300.0),
            BalanceEntry::debit("5211", "Banque", 1_000.0),
        ])
    }

    fn closing() -> TrialBalance {
        TrialBalance::new(vec![
            BalanceEntry::credit("1011", "Capital", 1_500.0),
            BalanceEntry::debit("2441", "Materiel", 800.0),
            BalanceEntry::debit("311", "Marchandises", 250.0),
            BalanceEntry::credit("4011", "Fournisseur", 100.0),
            BalanceEntry::debit("5211", "Banque", 1_150.0),
            BalanceEntry::credit("7011", "Ventes", 900.0),
            BalanceEntry::debit("6011", "Achats", 250.0),
            BalanceEntry::debit("6031", "Variation de stocks", 50.0),
        ])
    }

    #[test]
    fn test_sections_reuse_cash_flow_values() {
        let t = generate(&closing(), Some(&opening()), &EngineOptions::default());

        assert_eq!(t.value("CAFG"), 600.0);
        assert_eq!(t.value("EBE"), 600.0);
        assert_eq!(t.value("AUTO"), 600.0);
        assert_eq!(t.value("ACC"), 800.0);
        assert_eq!(t.value("ACQ"), 800.0);
        assert_eq!(t.value("CAP"), 500.0);
    }

    #[test]
    fn test_working_capital_synthesis() {
        let t = generate(&closing(), Some(&opening()), &EngineOptions::default());

        assert_eq!(t.value("VST"), -50.0);
        assert_eq!(t.value("VDE"), -200.0);
        assert_eq!(t.value("BFR"), 150.0);
        assert_eq!(t.value("EBF"), 150.0);
        assert_eq!(t.value("RBF"), 0.0);
    }

    #[test]
    fn test_cash_change_matches_cash_flow_statement() {
        let closing = closing();
        let opening = opening();
        let options = EngineOptions::default();

        let t = generate(&closing, Some(&opening), &options);
        let tft = cash_flow::generate(&closing, Some(&opening), &options);

        assert_eq!(t.value(TOTAL_USES), 800.0 + 150.0);
        assert_eq!(t.value(TOTAL_RESOURCES), 600.0 + 500.0);
        assert_eq!(t.value(CASH_CHANGE), 150.0);
        assert_eq!(t.value(CASH_CHANGE), tft.value(cash_flow::NET_CASH_CHANGE));
    }

    #[test]
    fn test_dividends_paid_are_a_use() {
        let prior = TrialBalance::new(vec![
            BalanceEntry::credit("1011", "Capital", 1_000.0),
            BalanceEntry::credit("1311", "Resultat N-1", 300.0),
            BalanceEntry::debit("5211", "Banque", 1_300.0),
        ]);
        let current = TrialBalance::new(vec![
            BalanceEntry::credit("1011", "Capital", 1_000.0),
            BalanceEntry::credit("1181", "Reserves libres", 100.0),
            BalanceEntry::debit("5211", "Banque", 1_100.0),
        ]);

        let t = generate(&current, Some(&prior), &EngineOptions::default());
        assert_eq!(t.value("DIV"), 200.0);
        assert_eq!(t.value("AUTO"), -200.0);
        assert_eq!(t.value(CASH_CHANGE), -200.0);
    }

    #[test]
    fn test_headers_are_zero() {
        let t = generate(&TrialBalance::default(), None, &EngineOptions::default());
        assert!(t
            .lines
            .iter()
            .filter(|l| l.kind == LineKind::Header)
            .all(|l| l.current == 0.0));
        assert_eq!(t.value(CASH_CHANGE), 0.0);
    }
}
