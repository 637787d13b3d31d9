use crate::aggregator::{AssetAmounts, PrefixAggregator};
use crate::mapping::{LineDefinition, LineRule, Term};
use crate::schema::{Component, LineKind, Statement, StatementKind, StatementLine};
use log::{debug, warn};

/// What a table needs from one fiscal year.
#[derive(Clone, Copy)]
pub struct YearInputs<'a> {
    pub aggregator: &'a PrefixAggregator,
    /// Resolved value of the `NetIncome` line, if the table has one.
    pub net_income: f64,
}

/// Accumulates statement lines in order. Totals only ever read lines already pushed.
pub struct StatementBuilder {
    kind: StatementKind,
    has_prior: bool,
    lines: Vec<StatementLine>,
}

impl StatementBuilder {
    pub fn new(kind: StatementKind, has_prior: bool) -> Self {
        Self {
            kind,
            has_prior,
            lines: Vec::new(),
        }
    }

    pub fn header(&mut self, reference: &str, label: &str) {
        let prior = if self.has_prior { Some(0.0) } else { None };
        self.push(reference, label, LineKind::Header, 0.0, prior);
    }

    pub fn line(&mut self, reference: &str, label: &str, current: f64, prior: Option<f64>) {
        let prior = if self.has_prior { prior } else { None };
        self.push(reference, label, LineKind::Line, current, prior);
    }

    pub fn asset_line(
        &mut self,
        reference: &str,
        label: &str,
        current: AssetAmounts,
        prior: Option<AssetAmounts>,
    ) {
        self.line(reference, label, current.net, prior.map(|p| p.net));
        if let Some(line) = self.lines.last_mut() {
            line.gross = Some(current.gross);
            line.depreciation = Some(current.depreciation);
        }
    }

    pub fn total(&mut self, reference: &str, label: &str, kind: LineKind, terms: &[Term]) {
        let mut current = 0.0;
        let mut prior = Some(0.0);
        let mut gross = Some(0.0);
        let mut depreciation = Some(0.0);

        for term in terms {
            match self.lines.iter().find(|l| l.reference == term.reference) {
                Some(line) => {
                    current += term.coefficient * line.current;
                    prior = prior.zip(line.prior).map(|(acc, v)| acc + term.coefficient * v);
                    gross = gross.zip(line.gross).map(|(acc, v)| acc + term.coefficient * v);
                    depreciation = depreciation
                        .zip(line.depreciation)
                        .map(|(acc, v)| acc + term.coefficient * v);
                }
                None => {
                    warn!(
                        "Total {} references unknown line {}; counted as zero",
                        reference, term.reference
                    );
                    prior = None;
                    gross = None;
                    depreciation = None;
                }
            }
        }

        self.lines.push(StatementLine {
            reference: reference.to_string(),
            label: label.to_string(),
            kind,
            current,
            prior: if self.has_prior { prior } else { None },
            gross,
            depreciation,
            constituents: terms
                .iter()
                .map(|t| Component {
                    reference: t.reference.to_string(),
                    coefficient: t.coefficient,
                })
                .collect(),
        });
    }

    pub fn value(&self, reference: &str) -> f64 {
        self.lines
            .iter()
            .find(|l| l.reference == reference)
            .map(|l| l.current)
            .unwrap_or(0.0)
    }

    pub fn finish(self) -> Statement {
        debug!("Generated {:?} with {} lines", self.kind, self.lines.len());
        Statement {
            kind: self.kind,
            lines: self.lines,
        }
    }

    fn push(&mut self, reference: &str, label: &str, kind: LineKind, current: f64, prior: Option<f64>) {
        self.lines.push(StatementLine {
            reference: reference.to_string(),
            label: label.to_string(),
            kind,
            current,
            prior,
            gross: None,
            depreciation: None,
            constituents: Vec::new(),
        });
    }
}

/// Evaluates a mapping table against one or two fiscal years, in declaration order.
pub fn evaluate_table(
    kind: StatementKind,
    table: &[LineDefinition],
    current: YearInputs<'_>,
    prior: Option<YearInputs<'_>>,
) -> Statement {
    let mut builder = StatementBuilder::new(kind, prior.is_some());

    for def in table {
        match def.rule {
            LineRule::Aggregate {
                prefixes,
                mode,
                presentation,
            } => {
                let value = |year: YearInputs| presentation.apply(year.aggregator.aggregate(prefixes, mode));
                builder.line(def.reference, def.label, value(current), prior.map(value));
            }
            LineRule::Asset { gross, mode, contra } => {
                let amounts = |year: YearInputs| year.aggregator.asset(gross, mode, contra);
                builder.asset_line(def.reference, def.label, amounts(current), prior.map(amounts));
            }
            LineRule::NetIncome { .. } => {
                builder.line(
                    def.reference,
                    def.label,
                    current.net_income,
                    prior.map(|p| p.net_income),
                );
            }
            LineRule::Derived(_) => {
                warn!("Line {} needs a source statement; reported as zero", def.reference);
                builder.line(def.reference, def.label, 0.0, prior.map(|_| 0.0));
            }
            LineRule::Subtotal(terms) => {
                builder.total(def.reference, def.label, LineKind::Subtotal, terms);
            }
            LineRule::Total(terms) => {
                builder.total(def.reference, def.label, LineKind::Total, terms);
            }
        }
    }

    builder.finish()
}

/// Evaluates a table whose leaves regroup the lines of another statement.
/// The prior column exists whenever the source statement has one.
pub fn evaluate_derived_table(kind: StatementKind, table: &[LineDefinition], source: &Statement) -> Statement {
    let has_prior = source.lines.iter().any(|l| l.prior.is_some());
    let mut builder = StatementBuilder::new(kind, has_prior);

    for def in table {
        match def.rule {
            LineRule::Derived(terms) => {
                let (value, prior) = derive(source, terms);
                builder.line(def.reference, def.label, value, prior);
            }
            LineRule::Subtotal(terms) => {
                builder.total(def.reference, def.label, LineKind::Subtotal, terms);
            }
            LineRule::Total(terms) => {
                builder.total(def.reference, def.label, LineKind::Total, terms);
            }
            _ => {
                warn!(
                    "Line {} reads the trial balance, which a derived statement has no access to",
                    def.reference
                );
                builder.line(def.reference, def.label, 0.0, has_prior.then_some(0.0));
            }
        }
    }

    builder.finish()
}

fn derive(source: &Statement, terms: &[Term]) -> (f64, Option<f64>) {
    let current: f64 = terms
        .iter()
        .map(|t| t.coefficient * source.value(t.reference))
        .sum();
    let prior = terms.iter().try_fold(0.0, |acc, t| {
        source
            .prior_value(t.reference)
            .map(|v| acc + t.coefficient * v)
    });
    (current, prior)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregator::AggregationMode;
    use crate::mapping::Presentation;
    use crate::schema::{BalanceEntry, TrialBalance};

    static TABLE: &[LineDefinition] = &[
        LineDefinition {
            reference: "P1",
            label: "Produits",
            rule: LineRule::Aggregate {
                prefixes: &["70"],
                mode: AggregationMode::Income,
                presentation: Presentation::AsIs,
            },
        },
        LineDefinition {
            reference: "C1",
            label: "Charges",
            rule: LineRule::Aggregate {
                prefixes: &["60"],
                mode: AggregationMode::Expense,
                presentation: Presentation::Negated,
            },
        },
        LineDefinition {
            reference: "R1",
            label: "Resultat",
            rule: LineRule::Total(&[
                Term {
                    reference: "P1",
                    coefficient: 1.0,
                },
                Term {
                    reference: "C1",
                    coefficient: 1.0,
                },
            ]),
        },
    ];

    fn aggregator(entries: Vec<BalanceEntry>) -> PrefixAggregator {
        PrefixAggregator::new(&TrialBalance::new(entries))
    }

    #[test]
    fn test_totals_sum_declared_constituents() {
        let agg = aggregator(vec![
            BalanceEntry::credit("701", "Ventes", 1000.0),
            BalanceEntry::debit("601", "Achats", 400.0),
        ]);
        let inputs = YearInputs {
            aggregator: &agg,
            net_income: 0.0,
        };

        let statement = evaluate_table(StatementKind::IncomeStatement, TABLE, inputs, None);

        assert_eq!(statement.value("P1"), 1000.0);
        assert_eq!(statement.value("C1"), -400.0);
        assert_eq!(statement.value("R1"), 600.0);
        assert_eq!(statement.line("R1").unwrap().constituents.len(), 2);
        assert!(statement.lines.iter().all(|l| l.prior.is_none()));
    }

    #[test]
    fn test_prior_column_is_computed_independently() {
        let current = aggregator(vec![BalanceEntry::credit("701", "Ventes", 1000.0)]);
        let prior = aggregator(vec![BalanceEntry::debit("601", "Achats", 300.0)]);

        let statement = evaluate_table(
            StatementKind::IncomeStatement,
            TABLE,
            YearInputs {
                aggregator: &current,
                net_income: 0.0,
            },
            Some(YearInputs {
                aggregator: &prior,
                net_income: 0.0,
            }),
        );

        assert_eq!(statement.value("R1"), 1000.0);
        assert_eq!(statement.prior_value("R1"), Some(-300.0));
        assert_eq!(statement.prior_value("P1"), Some(0.0));
    }

    #[test]
    fn test_unknown_constituent_counts_as_zero() {
        let mut builder = StatementBuilder::new(StatementKind::Sig, false);
        builder.line("A", "A", 5.0, None);
        builder.total(
            "T",
            "Total",
            LineKind::Total,
            &[
                Term {
                    reference: "A",
                    coefficient: 1.0,
                },
                Term {
                    reference: "MISSING",
                    coefficient: 1.0,
                },
            ],
        );

        assert_eq!(builder.value("T"), 5.0);
    }
}
