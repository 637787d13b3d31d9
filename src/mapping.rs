//! Static SYSCOHADA mapping tables.
//!
//! Every statement is described as an ordered list of [`LineDefinition`]s. Leaf lines carry
//! account prefixes and an [`AggregationMode`]; totals carry the signed list of earlier lines
//! they add up. The tables are plain data and are never modified at runtime.

use crate::aggregator::{AggregationMode, BalanceSide};
use crate::error::{LiasseError, Result};
use std::collections::HashSet;

const DEBIT: AggregationMode = AggregationMode::Reciprocal(BalanceSide::Debit);
const CREDIT: AggregationMode = AggregationMode::Reciprocal(BalanceSide::Credit);

/// One signed constituent of a total.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Term {
    pub reference: &'static str,
    pub coefficient: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Presentation {
    AsIs,
    /// Charges on the income statement and credit-positive equity lines.
    Negated,
}

impl Presentation {
    pub fn apply(self, value: f64) -> f64 {
        match self {
            Presentation::AsIs => value,
            Presentation::Negated => -value,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LineRule {
    Aggregate {
        prefixes: &'static [&'static str],
        mode: AggregationMode,
        presentation: Presentation,
    },
    /// Gross amount less depreciation and impairment.
    Asset {
        gross: &'static [&'static str],
        mode: AggregationMode,
        contra: &'static [&'static str],
    },
    /// Net income for the year: income statement bottom line or balance of the prefixes.
    NetIncome { prefixes: &'static [&'static str] },
    /// Regrouping of lines taken from another statement.
    Derived(&'static [Term]),
    Subtotal(&'static [Term]),
    Total(&'static [Term]),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LineDefinition {
    pub reference: &'static str,
    pub label: &'static str,
    pub rule: LineRule,
}

impl LineDefinition {
    pub fn terms(&self) -> Option<&'static [Term]> {
        match self.rule {
            LineRule::Subtotal(terms) | LineRule::Total(terms) => Some(terms),
            _ => None,
        }
    }
}

macro_rules! terms {
    (@coef +) => { 1.0 };
    (@coef -) => { -1.0 };
    ($($sign:tt $reference:literal),* $(,)?) => {
        &[$(Term { reference: $reference, coefficient: terms!(@coef $sign) }),*]
    };
}

macro_rules! sum {
    ($($reference:literal),* $(,)?) => {
        &[$(Term { reference: $reference, coefficient: 1.0 }),*]
    };
}

macro_rules! def {
    ($reference:literal, $label:literal, $rule:expr) => {
        LineDefinition {
            reference: $reference,
            label: $label,
            rule: $rule,
        }
    };
}

macro_rules! asset {
    ($gross:expr, $contra:expr) => {
        LineRule::Asset {
            gross: $gross,
            mode: AggregationMode::AssetGross,
            contra: $contra,
        }
    };
    ($gross:expr, $mode:expr, $contra:expr) => {
        LineRule::Asset {
            gross: $gross,
            mode: $mode,
            contra: $contra,
        }
    };
}

macro_rules! agg {
    ($prefixes:expr, $mode:expr) => {
        LineRule::Aggregate {
            prefixes: $prefixes,
            mode: $mode,
            presentation: Presentation::AsIs,
        }
    };
    ($prefixes:expr, $mode:expr, negated) => {
        LineRule::Aggregate {
            prefixes: $prefixes,
            mode: $mode,
            presentation: Presentation::Negated,
        }
    };
}

pub static ASSET_LINES: &[LineDefinition] = &[
    def!("AE", "Frais de développement et de prospection",
        asset!(&["201", "202", "206"], &["2801", "2802", "2806", "2901", "2902", "2906"])),
    def!("AF", "Brevets, licences, logiciels et droits similaires",
        asset!(&["212", "213", "214", "215"], &["2812", "2813", "2814", "2815", "2912", "2913", "2914", "2915"])),
    def!("AG", "Fonds commercial et droit au bail",
        asset!(&["216", "217"], &["2816", "2817", "2916", "2917"])),
    def!("AH", "Autres immobilisations incorporelles",
        asset!(&["211", "218", "219"], &["2811", "2818", "2819", "2911", "2918", "2919"])),
    def!("AD", "IMMOBILISATIONS INCORPORELLES", LineRule::Subtotal(sum!["AE", "AF", "AG", "AH"])),
    def!("AJ", "Terrains", asset!(&["22"], &["282", "292"])),
    def!("AK", "Bâtiments", asset!(&["23"], &["283", "293"])),
    def!("AL", "Aménagements, agencements et installations",
        asset!(&["241", "242", "243"], &["2841", "2842", "2843", "2941", "2942", "2943"])),
    def!("AM", "Matériel, mobilier et actifs biologiques",
        asset!(&["244", "246", "247", "248"], &["2844", "2846", "2847", "2848", "2944", "2946", "2947", "2948"])),
    def!("AN", "Matériel de transport", asset!(&["245"], &["2845", "2945"])),
    def!("AI", "IMMOBILISATIONS CORPORELLES", LineRule::Subtotal(sum!["AJ", "AK", "AL", "AM", "AN"])),
    def!("AP", "Avances et acomptes versés sur immobilisations", asset!(&["25"], &["295"])),
    def!("AR", "Titres de participation", asset!(&["26"], &["296"])),
    def!("AS", "Autres immobilisations financières", asset!(&["27"], &["297"])),
    def!("AQ", "IMMOBILISATIONS FINANCIÈRES", LineRule::Subtotal(sum!["AR", "AS"])),
    def!("AZ", "TOTAL ACTIF IMMOBILISÉ", LineRule::Total(sum!["AD", "AI", "AP", "AQ"])),
    def!("BA", "Actif circulant HAO", asset!(HAO_ACCOUNTS, DEBIT, &["498"])),
    def!("BB", "Stocks et encours",
        asset!(&["31", "32", "33", "34", "35", "36", "37", "38"], &["39"])),
    def!("BH", "Fournisseurs, avances versées", asset!(&["40"], DEBIT, &["490"])),
    def!("BI", "Clients", asset!(&["41"], DEBIT, &["491"])),
    def!("BJ", "Autres créances",
        asset!(
            &["42", "43", "44", "45", "46", "471", "472", "473", "474", "475", "476", "477"],
            DEBIT,
            &["492", "493", "494", "495", "496", "497"]
        )),
    def!("BG", "CRÉANCES ET EMPLOIS ASSIMILÉS", LineRule::Subtotal(sum!["BH", "BI", "BJ"])),
    def!("BK", "TOTAL ACTIF CIRCULANT", LineRule::Total(sum!["BA", "BB", "BG"])),
    def!("BQ", "Titres de placement", asset!(&["50"], DEBIT, &["590"])),
    def!("BR", "Valeurs à encaisser", asset!(&["51"], DEBIT, &["591"])),
    def!("BS", "Banques, chèques postaux, caisse et assimilés",
        asset!(&["52", "53", "54", "55", "56", "57", "58"], DEBIT, &["592", "593", "594", "595", "596", "597", "598"])),
    def!("BT", "TOTAL TRÉSORERIE-ACTIF", LineRule::Total(sum!["BQ", "BR", "BS"])),
    def!("BU", "Écart de conversion-Actif", asset!(&["478"], &[])),
    def!("BZ", "TOTAL GÉNÉRAL", LineRule::Total(sum!["AZ", "BK", "BT", "BU"])),
];

/// Accounts 480..489. Conversion differences (478, 479) have their own lines.
const HAO_ACCOUNTS: &[&str] = &["480", "481", "482", "483", "484", "485", "486", "487", "488", "489"];

pub static LIABILITY_LINES: &[LineDefinition] = &[
    def!("CA", "Capital", agg!(&["101", "102", "103", "104"], AggregationMode::SignedNet, negated)),
    def!("CB", "Apporteurs, capital non appelé (-)", agg!(&["109"], AggregationMode::SignedNet, negated)),
    def!("CC", "Primes liées au capital social", agg!(&["105"], AggregationMode::SignedNet, negated)),
    def!("CD", "Écarts de réévaluation", agg!(&["106"], AggregationMode::SignedNet, negated)),
    def!("CE", "Réserves indisponibles", agg!(&["111", "112", "113"], AggregationMode::SignedNet, negated)),
    def!("CF", "Réserves libres", agg!(&["118"], AggregationMode::SignedNet, negated)),
    def!("CG", "Report à nouveau (+ ou -)", agg!(&["12"], AggregationMode::SignedNet, negated)),
    def!("CH", "Résultat net de l'exercice (bénéfice + ou perte -)", LineRule::NetIncome { prefixes: &["13"] }),
    def!("CI", "Subventions d'investissement", agg!(&["14"], AggregationMode::SignedNet, negated)),
    def!("CJ", "Provisions réglementées", agg!(&["15"], AggregationMode::SignedNet, negated)),
    def!("CP", "TOTAL CAPITAUX PROPRES ET RESSOURCES ASSIMILÉES",
        LineRule::Subtotal(sum!["CA", "CB", "CC", "CD", "CE", "CF", "CG", "CH", "CI", "CJ"])),
    def!("DA", "Emprunts et dettes financières diverses", agg!(&["16", "18"], AggregationMode::Liability)),
    def!("DB", "Dettes de location-acquisition", agg!(&["17"], AggregationMode::Liability)),
    def!("DC", "Provisions pour risques et charges", agg!(&["19"], AggregationMode::Liability)),
    def!("DD", "TOTAL DETTES FINANCIÈRES ET RESSOURCES ASSIMILÉES", LineRule::Subtotal(sum!["DA", "DB", "DC"])),
    def!("DF", "TOTAL RESSOURCES STABLES", LineRule::Total(sum!["CP", "DD"])),
    def!("DH", "Dettes circulantes HAO", agg!(HAO_ACCOUNTS, CREDIT)),
    def!("DI", "Clients, avances reçues", agg!(&["41"], CREDIT)),
    def!("DJ", "Fournisseurs d'exploitation", agg!(&["40"], CREDIT)),
    def!("DK", "Dettes fiscales et sociales", agg!(&["42", "43", "44"], CREDIT)),
    def!("DM", "Autres dettes",
        agg!(&["45", "46", "471", "472", "473", "474", "475", "476", "477"], CREDIT)),
    def!("DN", "Provisions pour risques à court terme", agg!(&["499", "599"], AggregationMode::Liability)),
    def!("DP", "TOTAL PASSIF CIRCULANT", LineRule::Total(sum!["DH", "DI", "DJ", "DK", "DM", "DN"])),
    def!("DQ", "Banques, crédits d'escompte", agg!(&["564", "565"], CREDIT)),
    def!("DR", "Banques, établissements financiers et crédits de trésorerie",
        agg!(
            &["50", "51", "52", "53", "54", "55", "561", "562", "563", "566", "567", "568", "569", "57", "58"],
            CREDIT
        )),
    def!("DT", "TOTAL TRÉSORERIE-PASSIF", LineRule::Total(sum!["DQ", "DR"])),
    def!("DV", "Écart de conversion-Passif", agg!(&["479"], AggregationMode::Liability)),
    def!("DZ", "TOTAL GÉNÉRAL", LineRule::Total(sum!["DF", "DP", "DT", "DV"])),
];

pub static INCOME_STATEMENT_LINES: &[LineDefinition] = &[
    def!("TA", "Ventes de marchandises", agg!(&["701"], AggregationMode::Income)),
    def!("RA", "Achats de marchandises", agg!(&["601"], AggregationMode::Expense, negated)),
    def!("RB", "Variation de stocks de marchandises", agg!(&["6031"], AggregationMode::SignedNet, negated)),
    def!("XA", "MARGE COMMERCIALE", LineRule::Subtotal(sum!["TA", "RA", "RB"])),
    def!("TB", "Ventes de produits fabriqués", agg!(&["702", "703", "704", "705"], AggregationMode::Income)),
    def!("TC", "Travaux, services vendus", agg!(&["706"], AggregationMode::Income)),
    def!("TD", "Produits accessoires", agg!(&["707"], AggregationMode::Income)),
    def!("XB", "CHIFFRE D'AFFAIRES", LineRule::Subtotal(sum!["TA", "TB", "TC", "TD"])),
    def!("TE", "Production stockée (ou déstockage)", agg!(&["73"], AggregationMode::SignedNet, negated)),
    def!("TF", "Production immobilisée", agg!(&["72"], AggregationMode::Income)),
    def!("TG", "Subventions d'exploitation", agg!(&["71"], AggregationMode::Income)),
    def!("TH", "Autres produits", agg!(&["75"], AggregationMode::Income)),
    def!("TI", "Transferts de charges d'exploitation", agg!(&["781"], AggregationMode::Income)),
    def!("RC", "Achats de matières premières et fournitures liées", agg!(&["602"], AggregationMode::Expense, negated)),
    def!("RD", "Variation de stocks de matières premières", agg!(&["6032"], AggregationMode::SignedNet, negated)),
    def!("RE", "Autres achats", agg!(&["604", "605", "608"], AggregationMode::Expense, negated)),
    def!("RF", "Variation de stocks d'autres approvisionnements", agg!(&["6033"], AggregationMode::SignedNet, negated)),
    def!("RG", "Transports", agg!(&["61"], AggregationMode::Expense, negated)),
    def!("RH", "Services extérieurs", agg!(&["62", "63"], AggregationMode::Expense, negated)),
    def!("RI", "Impôts et taxes", agg!(&["64"], AggregationMode::Expense, negated)),
    def!("RJ", "Autres charges", agg!(&["65"], AggregationMode::Expense, negated)),
    def!("XC", "VALEUR AJOUTÉE",
        LineRule::Subtotal(sum![
            "XB", "RA", "RB", "TE", "TF", "TG", "TH", "TI", "RC", "RD", "RE", "RF", "RG", "RH", "RI", "RJ"
        ])),
    def!("RK", "Charges de personnel", agg!(&["66"], AggregationMode::Expense, negated)),
    def!("XD", "EXCÉDENT BRUT D'EXPLOITATION", LineRule::Subtotal(sum!["XC", "RK"])),
    def!("TJ", "Reprises d'amortissements, provisions et dépréciations",
        agg!(&["791", "798", "799"], AggregationMode::Income)),
    def!("RL", "Dotations aux amortissements, aux provisions et dépréciations",
        agg!(&["681", "691"], AggregationMode::Expense, negated)),
    def!("XE", "RÉSULTAT D'EXPLOITATION", LineRule::Subtotal(sum!["XD", "TJ", "RL"])),
    def!("TK", "Revenus financiers et assimilés",
        agg!(&["770", "771", "772", "773", "774", "775", "777", "778", "779"], AggregationMode::Income)),
    def!("TP", "Gains de change", agg!(&["776"], AggregationMode::Income)),
    def!("TL", "Reprises de provisions et dépréciations financières", agg!(&["797"], AggregationMode::Income)),
    def!("TM", "Transferts de charges financières", agg!(&["787"], AggregationMode::Income)),
    def!("RM", "Frais financiers et charges assimilées",
        agg!(&["670", "671", "672", "673", "674", "675", "677", "678", "679"], AggregationMode::Expense, negated)),
    def!("RR", "Pertes de change", agg!(&["676"], AggregationMode::Expense, negated)),
    def!("RN", "Dotations aux provisions et aux dépréciations financières",
        agg!(&["687", "697"], AggregationMode::Expense, negated)),
    def!("XF", "RÉSULTAT FINANCIER", LineRule::Subtotal(sum!["TK", "TP", "TL", "TM", "RM", "RR", "RN"])),
    def!("XG", "RÉSULTAT DES ACTIVITÉS ORDINAIRES", LineRule::Subtotal(sum!["XE", "XF"])),
    def!("TN", "Produits des cessions d'immobilisations", agg!(&["82"], AggregationMode::Income)),
    def!("TO", "Autres produits HAO", agg!(&["84", "86", "88"], AggregationMode::Income)),
    def!("RO", "Valeurs comptables des cessions d'immobilisations", agg!(&["81"], AggregationMode::Expense, negated)),
    def!("RP", "Autres charges HAO", agg!(&["83", "85"], AggregationMode::Expense, negated)),
    def!("XH", "RÉSULTAT HORS ACTIVITÉS ORDINAIRES", LineRule::Subtotal(sum!["TN", "TO", "RO", "RP"])),
    def!("RQ", "Participation des travailleurs", agg!(&["87"], AggregationMode::Expense, negated)),
    def!("RS", "Impôts sur le résultat", agg!(&["89"], AggregationMode::Expense, negated)),
    def!("XI", "RÉSULTAT NET", LineRule::Total(sum!["XG", "XH", "RQ", "RS"])),
];

/// Income statement lines regrouped into T1..T29 (positive magnitudes), then the SIG cascade.
pub static SIG_LINES: &[LineDefinition] = &[
    def!("T1", "Ventes de marchandises", LineRule::Derived(terms![+"TA"])),
    def!("T2", "Achats de marchandises", LineRule::Derived(terms![-"RA"])),
    def!("T3", "Variation de stocks de marchandises", LineRule::Derived(terms![-"RB"])),
    def!("SIG1", "MARGE COMMERCIALE", LineRule::Subtotal(terms![+"T1", -"T2", -"T3"])),
    def!("T4", "Ventes de produits fabriqués, travaux et services", LineRule::Derived(terms![+"TB", +"TC"])),
    def!("T5", "Production stockée (ou déstockage)", LineRule::Derived(terms![+"TE"])),
    def!("T6", "Production immobilisée", LineRule::Derived(terms![+"TF"])),
    def!("T7", "Produits accessoires", LineRule::Derived(terms![+"TD"])),
    def!("SIG2", "PRODUCTION DE L'EXERCICE", LineRule::Subtotal(terms![+"T4", +"T5", +"T6", +"T7"])),
    def!("T8", "Achats de matières premières", LineRule::Derived(terms![-"RC"])),
    def!("T9", "Variation de stocks de matières premières", LineRule::Derived(terms![-"RD"])),
    def!("T10", "Autres achats, variation de stocks et services extérieurs",
        LineRule::Derived(terms![-"RE", -"RF", -"RG", -"RH"])),
    def!("SIG3", "VALEUR AJOUTÉE", LineRule::Subtotal(terms![+"SIG1", +"SIG2", -"T8", -"T9", -"T10"])),
    def!("T11", "Subventions d'exploitation", LineRule::Derived(terms![+"TG"])),
    def!("T12", "Impôts et taxes", LineRule::Derived(terms![-"RI"])),
    def!("T13", "Charges de personnel", LineRule::Derived(terms![-"RK"])),
    def!("SIG4", "EXCÉDENT BRUT D'EXPLOITATION", LineRule::Subtotal(terms![+"SIG3", +"T11", -"T12", -"T13"])),
    def!("T14", "Reprises d'amortissements, provisions et dépréciations", LineRule::Derived(terms![+"TJ"])),
    def!("T15", "Transferts de charges d'exploitation", LineRule::Derived(terms![+"TI"])),
    def!("T16", "Autres produits", LineRule::Derived(terms![+"TH"])),
    def!("T17", "Dotations aux amortissements, provisions et dépréciations", LineRule::Derived(terms![-"RL"])),
    def!("T18", "Autres charges", LineRule::Derived(terms![-"RJ"])),
    def!("SIG5", "RÉSULTAT D'EXPLOITATION",
        LineRule::Subtotal(terms![+"SIG4", +"T14", +"T15", +"T16", -"T17", -"T18"])),
    def!("T19", "Revenus financiers et gains de change", LineRule::Derived(terms![+"TK", +"TP"])),
    def!("T20", "Reprises de provisions financières", LineRule::Derived(terms![+"TL"])),
    def!("T21", "Transferts de charges financières", LineRule::Derived(terms![+"TM"])),
    def!("T22", "Frais financiers et pertes de change", LineRule::Derived(terms![-"RM", -"RR"])),
    def!("T23", "Dotations aux provisions financières", LineRule::Derived(terms![-"RN"])),
    def!("SIG6", "RÉSULTAT FINANCIER", LineRule::Subtotal(terms![+"T19", +"T20", +"T21", -"T22", -"T23"])),
    def!("SIG7", "RÉSULTAT DES ACTIVITÉS ORDINAIRES", LineRule::Subtotal(terms![+"SIG5", +"SIG6"])),
    def!("T24", "Produits des cessions d'immobilisations", LineRule::Derived(terms![+"TN"])),
    def!("T25", "Autres produits HAO", LineRule::Derived(terms![+"TO"])),
    def!("T26", "Valeurs comptables des cessions d'immobilisations", LineRule::Derived(terms![-"RO"])),
    def!("T27", "Autres charges HAO", LineRule::Derived(terms![-"RP"])),
    def!("SIG8", "RÉSULTAT HORS ACTIVITÉS ORDINAIRES", LineRule::Subtotal(terms![+"T24", +"T25", -"T26", -"T27"])),
    def!("T28", "Participation des travailleurs", LineRule::Derived(terms![-"RQ"])),
    def!("T29", "Impôts sur le résultat", LineRule::Derived(terms![-"RS"])),
    def!("SIG9", "RÉSULTAT NET", LineRule::Total(terms![+"SIG7", +"SIG8", -"T28", -"T29"])),
];

/// Account groups read directly by the cash-flow and funds-flow statements.
///
/// Every balance-sheet account of classes 1 to 5 belongs to exactly one group, which keeps the
/// cash-flow statement closed: the flows add up to the change in net cash.
pub mod flows {
    /// Income statement accounts and the equity accounts the result moves through.
    pub const NET_INCOME: &[&str] = &["13"];
    pub const RESULT_AND_RESERVES: &[&str] = &["11", "12", "13", "465", "6", "7", "8"];
    pub const EQUITY_CAPITAL: &[&str] = &["10"];
    pub const OWNER_ACCOUNT: &[&str] = &["104"];
    pub const REVALUATION: &[&str] = &["106"];
    pub const INVESTMENT_SUBSIDIES: &[&str] = &["14"];
    pub const SUBSIDY_RELEASES: &[&str] = &["799", "865"];
    /// Regulated provisions, risk provisions, depreciation and impairment of fixed assets.
    pub const DEPRECIATION_AND_PROVISIONS: &[&str] = &["15", "19", "28", "29"];
    pub const DEPRECIATION_CHARGES: &[&str] = &["681", "687", "691", "697", "85"];
    pub const REVERSALS: &[&str] = &["791", "797", "798", "799", "86"];

    pub const INTANGIBLE_ASSETS: &[&str] = &["20", "21"];
    pub const TANGIBLE_ASSETS: &[&str] = &["22", "23", "24", "25"];
    pub const FINANCIAL_ASSETS: &[&str] = &["26", "27"];
    pub const DISPOSAL_BOOK_VALUE: &[&str] = &["81"];
    pub const INTANGIBLE_DISPOSAL_BOOK_VALUE: &[&str] = &["811"];
    pub const FINANCIAL_DISPOSAL_BOOK_VALUE: &[&str] = &["816"];
    pub const DISPOSAL_PROCEEDS: &[&str] = &["82"];
    pub const FINANCIAL_DISPOSAL_PROCEEDS: &[&str] = &["826"];
    pub const INVESTMENT_PAYABLES: &[&str] = &["481", "482"];
    pub const DISPOSAL_RECEIVABLES: &[&str] = &["485"];

    pub const BORROWINGS: &[&str] = &["161", "162"];
    pub const FINANCIAL_DEBTS: &[&str] = &["16", "17", "18"];

    pub const STOCKS: &[&str] = &["3"];
    /// Operating receivables (debit side) and payables (credit side).
    pub const OPERATING_THIRD_PARTIES: &[&str] = &[
        "40", "41", "42", "43", "44", "45", "460", "461", "462", "463", "464", "466", "467", "468",
        "469", "470", "471", "472", "473", "474", "475", "476", "477",
    ];
    pub const RECEIVABLE_ADJUSTMENTS: &[&str] = &[
        "478", "490", "491", "492", "493", "494", "495", "496", "497",
    ];
    pub const PAYABLE_ADJUSTMENTS: &[&str] = &["479", "499", "599"];
    /// HAO receivables (debit side) and payables (credit side), investment items excluded.
    pub const HAO_OPERATING: &[&str] = &["480", "483", "484", "486", "487", "488", "489"];
    pub const HAO_ASSET_PROVISIONS: &[&str] = &["498"];

    /// Treasury assets less treasury liabilities, impairment included.
    pub const TREASURY: &[&str] = &[
        "50", "51", "52", "53", "54", "55", "56", "57", "58", "590", "591", "592", "593", "594",
        "595", "596", "597", "598",
    ];
    /// Unrealized FX losses and the provision that must cover them.
    pub const CONVERSION_ASSETS: &[&str] = &["478"];
    pub const FX_RISK_PROVISIONS: &[&str] = &["194"];
}

/// Checks that a table can be evaluated in declaration order.
///
/// `external` lists the references a `Derived` line may read from its source statement.
pub fn validate_table(name: &str, table: &[LineDefinition], external: &[LineDefinition]) -> Result<()> {
    let external: HashSet<&str> = external.iter().map(|l| l.reference).collect();
    let mut seen: HashSet<&str> = HashSet::new();

    let invalid = |reference: &str, details: String| LiasseError::InvalidMapping {
        table: name.to_string(),
        reference: reference.to_string(),
        details,
    };

    for line in table {
        if !seen.insert(line.reference) {
            return Err(invalid(line.reference, "duplicate reference".to_string()));
        }

        match line.rule {
            LineRule::Aggregate { prefixes, .. } | LineRule::NetIncome { prefixes } => {
                check_prefixes(prefixes).map_err(|d| invalid(line.reference, d))?;
            }
            LineRule::Asset { gross, contra, .. } => {
                check_prefixes(gross).map_err(|d| invalid(line.reference, d))?;
                if contra.iter().any(|p| p.is_empty()) {
                    return Err(invalid(line.reference, "empty contra prefix".to_string()));
                }
            }
            LineRule::Derived(terms) => {
                if let Some(term) = terms.iter().find(|t| !external.contains(t.reference)) {
                    return Err(invalid(
                        line.reference,
                        format!("source line {} does not exist", term.reference),
                    ));
                }
            }
            LineRule::Subtotal(terms) | LineRule::Total(terms) => {
                if terms.is_empty() {
                    return Err(invalid(line.reference, "total without constituents".to_string()));
                }
                if let Some(term) = terms
                    .iter()
                    .find(|t| t.reference == line.reference || !seen.contains(t.reference))
                {
                    return Err(invalid(
                        line.reference,
                        format!("constituent {} is not declared before the total", term.reference),
                    ));
                }
            }
        }
    }

    Ok(())
}

fn check_prefixes(prefixes: &[&str]) -> std::result::Result<(), String> {
    if prefixes.is_empty() {
        return Err("no account prefix".to_string());
    }
    if let Some(p) = prefixes
        .iter()
        .find(|p| p.is_empty() || !p.chars().all(|c| c.is_ascii_digit()))
    {
        return Err(format!("invalid account prefix '{}'", p));
    }
    Ok(())
}

pub fn validate_tables() -> Result<()> {
    validate_table("assets", ASSET_LINES, &[])?;
    validate_table("liabilities", LIABILITY_LINES, &[])?;
    validate_table("income statement", INCOME_STATEMENT_LINES, &[])?;
    validate_table("sig", SIG_LINES, INCOME_STATEMENT_LINES)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_tables_are_valid() {
        validate_tables().unwrap();
    }

    #[test]
    fn test_total_referencing_later_line_is_rejected() {
        static TABLE: &[LineDefinition] = &[
            def!("X1", "Total", LineRule::Total(sum!["A1"])),
            def!("A1", "Leaf", agg!(&["60"], AggregationMode::Expense)),
        ];
        let err = validate_table("test", TABLE, &[]).unwrap_err();
        assert!(matches!(err, LiasseError::InvalidMapping { .. }));
    }

    #[test]
    fn test_empty_prefix_is_rejected() {
        static TABLE: &[LineDefinition] = &[def!("A1", "Leaf", agg!(&[""], AggregationMode::Expense))];
        assert!(validate_table("test", TABLE, &[]).is_err());
    }

    #[test]
    fn test_sig_formulas_only_reference_lower_levels() {
        for line in SIG_LINES.iter().filter(|l| l.reference.starts_with("SIG")) {
            let level: u32 = line.reference[3..].parse().unwrap();
            for term in line.terms().unwrap() {
                if let Some(dep) = term.reference.strip_prefix("SIG") {
                    assert!(dep.parse::<u32>().unwrap() < level, "{} -> {}", line.reference, term.reference);
                }
            }
        }
    }

    #[test]
    fn test_sig_regroups_every_income_statement_leaf_once() {
        let mut used: Vec<&str> = SIG_LINES
            .iter()
            .filter_map(|l| match l.rule {
                LineRule::Derived(terms) => Some(terms.iter().map(|t| t.reference)),
                _ => None,
            })
            .flatten()
            .collect();
        used.sort_unstable();

        let mut leaves: Vec<&str> = INCOME_STATEMENT_LINES
            .iter()
            .filter(|l| l.terms().is_none())
            .map(|l| l.reference)
            .collect();
        leaves.sort_unstable();

        assert_eq!(used, leaves);
    }

    #[test]
    fn test_liability_prefixes_do_not_overlap_on_the_same_side() {
        let prefixes: Vec<(&str, &str)> = LIABILITY_LINES
            .iter()
            .filter_map(|l| match l.rule {
                LineRule::Aggregate { prefixes, .. } | LineRule::NetIncome { prefixes } => {
                    Some(prefixes.iter().map(move |p| (l.reference, *p)))
                }
                _ => None,
            })
            .flatten()
            .collect();

        for (i, (ref_a, a)) in prefixes.iter().enumerate() {
            for (ref_b, b) in prefixes.iter().skip(i + 1) {
                if ref_a != ref_b {
                    assert!(
                        !a.starts_with(b) && !b.starts_with(a),
                        "{} ({}) overlaps {} ({})",
                        ref_a,
                        a,
                        ref_b,
                        b
                    );
                }
            }
        }
    }
}
