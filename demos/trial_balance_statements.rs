use anyhow::Result;
use chrono::NaiveDate;
use ohada_liasse::{
    convert_rows_to_balance, process_trial_balance, EngineOptions, LiasseEngine, LineKind,
    RawBalanceRow, Statement,
};

fn print_statement(title: &str, statement: &Statement) {
    println!("\n=== {} ===", title);
    for line in &statement.lines {
        let marker = match line.kind {
            LineKind::Header => "#",
            LineKind::Total | LineKind::Subtotal => "=",
            LineKind::Line => " ",
        };
        let prior = line
            .prior
            .map(|p| format!("{:>16.0}", p))
            .unwrap_or_else(|| format!("{:>16}", "-"));
        println!(
            "{} {:<5} {:<60} {:>16.0} {}",
            marker, line.reference, line.label, line.current, prior
        );
    }
}

fn main() -> Result<()> {
    let year_end_2022 = NaiveDate::from_ymd_opt(2022, 12, 31);
    let year_end_2023 = NaiveDate::from_ymd_opt(2023, 12, 31);

    let opening = convert_rows_to_balance(
        &[
            RawBalanceRow::new("101100", "Capital souscrit, appelé, versé", 0.0, 10_000_000.0),
            RawBalanceRow::new("311000", "Marchandises", 3_000_000.0, 0.0),
            RawBalanceRow::new("401100", "Fournisseurs", 0.0, 2_000_000.0),
            RawBalanceRow::new("521100", "Banque", 9_000_000.0, 0.0),
        ],
        Some("Comptoir Dakar 2022".to_string()),
        year_end_2022,
    );

    let closing = convert_rows_to_balance(
        &[
            RawBalanceRow::new("101100", "Capital souscrit, appelé, versé", 0.0, 10_000_000.0),
            RawBalanceRow::new("162100", "Emprunt bancaire", 0.0, 4_000_000.0),
            RawBalanceRow::new("244100", "Matériel de bureau", 6_000_000.0, 0.0),
            RawBalanceRow::new("284410", "Amortissements matériel de bureau", 0.0, 1_200_000.0),
            RawBalanceRow::new("311000", "Marchandises", 3_500_000.0, 0.0),
            RawBalanceRow::new("401100", "Fournisseurs", 1_000_000.0, 3_500_000.0),
            RawBalanceRow::new("411100", "Clients", 4_200_000.0, 1_400_000.0),
            RawBalanceRow::new("521100", "Banque", 21_000_000.0, 12_950_000.0),
            RawBalanceRow::new("601100", "Achats de marchandises", 14_000_000.0, 0.0),
            RawBalanceRow::new("603100", "Variation des stocks de marchandises", 0.0, 500_000.0),
            RawBalanceRow::new("622200", "Locations de bâtiments", 1_800_000.0, 0.0),
            RawBalanceRow::new("661100", "Appointements et salaires", 3_600_000.0, 0.0),
            RawBalanceRow::new("671200", "Intérêts des emprunts", 250_000.0, 0.0),
            RawBalanceRow::new("681300", "Dotations aux amortissements", 1_200_000.0, 0.0),
            RawBalanceRow::new("701100", "Ventes de marchandises", 0.0, 23_000_000.0),
        ],
        Some("Comptoir Dakar 2023".to_string()),
        year_end_2023,
    );

    let statements = process_trial_balance(&closing, Some(&opening), &EngineOptions::default())?;

    print_statement("BILAN ACTIF", &statements.balance_sheet_assets);
    print_statement("BILAN PASSIF", &statements.balance_sheet_liabilities);
    print_statement("COMPTE DE RÉSULTAT", &statements.income_statement);
    print_statement("SOLDES INTERMÉDIAIRES DE GESTION", &statements.sig);
    print_statement("TABLEAU DES FLUX DE TRÉSORERIE", &statements.cash_flow);
    print_statement("TAFIRE", &statements.tafire);

    let report = LiasseEngine::new(closing)
        .with_prior(opening)
        .validate_detailed();

    println!("\n=== CONTRÔLES DE COHÉRENCE ===");
    for check in &report.checks {
        println!(
            "[{}] {:<12} {:>16.2} / {:>16.2} (écart {:.2})",
            if check.ok { "OK" } else { "KO" },
            check.code,
            check.value_a,
            check.value_b,
            check.gap
        );
    }
    for warning in &report.warnings {
        println!(
            "Avertissement {} sur le compte {} ({}) : solde {:.0}",
            warning.rule, warning.account_code, warning.label, warning.net_balance
        );
    }
    for point in &report.control_points {
        println!(
            "Point de contrôle {} [{:?}] {} : {}",
            point.rule, point.severity, point.reference, point.message
        );
    }

    Ok(())
}
