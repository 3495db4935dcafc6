use std::cmp::Ordering;
use std::collections::HashMap;

use tracing::debug;

use crate::models::{non_empty, DeclinedLine, Opportunity, Record, RoHeader};
use crate::money::parse_money;

pub const UNCATEGORIZED: &str = "uncategorized";
const TOP_CATEGORY_LIMIT: usize = 3;

// ---------------------------------------------------------------------------
// Insertion-ordered lookup
// ---------------------------------------------------------------------------

/// Keyed lookup that iterates in first-insertion order.
struct OrderedIndex<V> {
    positions: HashMap<String, usize>,
    entries: Vec<(String, V)>,
}

impl<V> OrderedIndex<V> {
    fn new() -> Self {
        Self {
            positions: HashMap::new(),
            entries: Vec::new(),
        }
    }

    fn entry_or_insert_with(&mut self, key: &str, make: impl FnOnce() -> V) -> &mut V {
        let idx = match self.positions.get(key) {
            Some(&idx) => idx,
            None => {
                self.entries.push((key.to_string(), make()));
                self.positions.insert(key.to_string(), self.entries.len() - 1);
                self.entries.len() - 1
            }
        };
        &mut self.entries[idx].1
    }

    fn iter(&self) -> impl Iterator<Item = (&str, &V)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }
}

// ---------------------------------------------------------------------------
// analyze
// ---------------------------------------------------------------------------

pub fn analyze(ro_rows: &[RoHeader], line_rows: &[DeclinedLine]) -> Vec<Opportunity> {
    // Last write wins, but position is fixed by the first occurrence.
    let mut ro_by_number: OrderedIndex<&RoHeader> = OrderedIndex::new();
    for ro in ro_rows {
        let key = ro.ro_number.trim();
        if key.is_empty() {
            continue;
        }
        *ro_by_number.entry_or_insert_with(key, || ro) = ro;
    }

    let mut lines_by_ro: HashMap<&str, Vec<&DeclinedLine>> = HashMap::new();
    for line in line_rows {
        let key = line.ro_number.trim();
        if key.is_empty() {
            continue;
        }
        lines_by_ro.entry(key).or_default().push(line);
    }

    let mut out = Vec::new();
    for (ro_number, ro) in ro_by_number.iter() {
        let Some(lines) = lines_by_ro.get(ro_number) else {
            continue;
        };

        let total: f64 = lines
            .iter()
            .map(|l| parse_money(Some(l.declined_amount.as_str())))
            .sum();
        if total <= 0.0 {
            continue;
        }

        out.push(Opportunity {
            ro_number: ro_number.to_string(),
            ro_date: ro.ro_date.trim().to_string(),
            advisor: non_empty(ro.advisor.as_deref()),
            customer_name: non_empty(ro.customer_name.as_deref()),
            phone: non_empty(ro.phone.as_deref()),
            email: non_empty(ro.email.as_deref()),
            declined_total: total,
            line_count: lines.len(),
            top_categories: top_categories(lines),
        });
    }

    // sort_by is stable: equal totals keep lookup order
    out.sort_by(|a, b| b.declined_total.total_cmp(&a.declined_total));
    debug!(
        ros = ro_rows.len(),
        lines = line_rows.len(),
        opportunities = out.len(),
        "analysis complete"
    );
    out
}

/// Convert loose records at the boundary, then [`analyze`].
pub fn analyze_records(ro_records: &[Record], line_records: &[Record]) -> Vec<Opportunity> {
    let ros: Vec<RoHeader> = ro_records.iter().map(RoHeader::from).collect();
    let lines: Vec<DeclinedLine> = line_records.iter().map(DeclinedLine::from).collect();
    analyze(&ros, &lines)
}

/// Up to three category names, highest summed amount first, joined with "; ".
fn top_categories(lines: &[&DeclinedLine]) -> String {
    let mut sums: OrderedIndex<f64> = OrderedIndex::new();
    for line in lines {
        let name = line
            .declined_category
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .unwrap_or(UNCATEGORIZED);
        *sums.entry_or_insert_with(name, || 0.0) += parse_money(Some(line.declined_amount.as_str()));
    }

    let mut ranked: Vec<(&str, f64)> = sums.iter().map(|(k, v)| (k, *v)).collect();
    // -0.0 and 0.0 tie here
    ranked.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal));
    ranked
        .into_iter()
        .take(TOP_CATEGORY_LIMIT)
        .map(|(name, _)| name)
        .collect::<Vec<_>>()
        .join("; ")
}

// ---------------------------------------------------------------------------
// Summary
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RunSummary {
    pub row_count: usize,
    pub declined_total: f64,
}

pub fn summarize(rows: &[Opportunity]) -> RunSummary {
    RunSummary {
        row_count: rows.len(),
        declined_total: rows.iter().map(|r| r.declined_total).sum(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ro(number: &str, date: &str) -> RoHeader {
        RoHeader {
            ro_number: number.to_string(),
            ro_date: date.to_string(),
            ..Default::default()
        }
    }

    fn line(number: &str, amount: &str, category: Option<&str>) -> DeclinedLine {
        DeclinedLine {
            ro_number: number.to_string(),
            line_desc: "work".to_string(),
            declined_amount: amount.to_string(),
            declined_category: category.map(str::to_string),
        }
    }

    #[test]
    fn test_single_ro_aggregates_lines() {
        let mut r1 = ro("R1", "2024-01-01");
        r1.customer_name = Some("Ann".to_string());
        let lines = vec![
            line("R1", "$100.00", Some("Brakes")),
            line("R1", "50", Some("Brakes")),
            line("R1", "25", Some("Tires")),
        ];
        let out = analyze(&[r1], &lines);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].declined_total, 175.0);
        assert_eq!(out[0].line_count, 3);
        assert_eq!(out[0].top_categories, "Brakes; Tires");
        assert_eq!(out[0].customer_name.as_deref(), Some("Ann"));
        assert_eq!(out[0].advisor, None);
    }

    #[test]
    fn test_orphan_lines_and_lineless_ros_are_dropped() {
        let ros = vec![ro("R1", "2024-01-01"), ro("R2", "2024-01-02")];
        let lines = vec![line("R1", "10", None), line("R9", "500", None)];
        let out = analyze(&ros, &lines);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].ro_number, "R1");
    }

    #[test]
    fn test_non_positive_totals_are_skipped() {
        let ros = vec![ro("R1", ""), ro("R2", ""), ro("R3", "")];
        let lines = vec![
            line("R1", "0", None),
            line("R2", "-50", None),
            line("R2", "20", None),
            line("R3", "garbage", None),
        ];
        assert!(analyze(&ros, &lines).is_empty());
    }

    #[test]
    fn test_sorted_descending_and_stable() {
        let ros = vec![ro("A", ""), ro("B", ""), ro("C", ""), ro("D", "")];
        let lines = vec![
            line("A", "10", None),
            line("B", "30", None),
            line("C", "10", None),
            line("D", "20", None),
        ];
        let out = analyze(&ros, &lines);
        let order: Vec<&str> = out.iter().map(|o| o.ro_number.as_str()).collect();
        assert_eq!(order, vec!["B", "D", "A", "C"]);
        for pair in out.windows(2) {
            assert!(pair[0].declined_total >= pair[1].declined_total);
        }
    }

    #[test]
    fn test_duplicate_ro_last_write_wins_first_position_kept() {
        let mut later = ro("R1", "2024-02-02");
        later.advisor = Some("Bob".to_string());
        let ros = vec![ro("R1", "2024-01-01"), ro("R2", ""), later];
        let lines = vec![line("R1", "10", None), line("R2", "10", None)];
        let out = analyze(&ros, &lines);
        assert_eq!(out[0].ro_number, "R1");
        assert_eq!(out[0].ro_date, "2024-02-02");
        assert_eq!(out[0].advisor.as_deref(), Some("Bob"));
        assert_eq!(out[1].ro_number, "R2");
    }

    #[test]
    fn test_keys_are_trimmed_and_blank_keys_dropped() {
        let ros = vec![ro(" R1 ", ""), ro("   ", "")];
        let lines = vec![line("R1  ", "10", None), line("", "99", None)];
        let out = analyze(&ros, &lines);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].ro_number, "R1");
        assert_eq!(out[0].line_count, 1);
    }

    #[test]
    fn test_top_categories_limit_ties_and_uncategorized() {
        let ros = vec![ro("R1", "")];
        let lines = vec![
            line("R1", "10", Some("Wipers")),
            line("R1", "40", Some(" ")),
            line("R1", "10", Some("Filters")),
            line("R1", "10", Some("Lights")),
            line("R1", "50", Some("Brakes")),
        ];
        let out = analyze(&ros, &lines);
        assert_eq!(out[0].top_categories, "Brakes; uncategorized; Wipers");
    }

    #[test]
    fn test_zero_sum_categories_keep_first_seen_order() {
        let ros = vec![ro("R1", "")];
        let lines = vec![
            line("R1", "-0", Some("Wipers")),
            line("R1", "0", Some("Filters")),
            line("R1", "5", Some("Brakes")),
        ];
        let out = analyze(&ros, &lines);
        assert_eq!(out[0].top_categories, "Brakes; Wipers; Filters");
    }

    #[test]
    fn test_category_names_trimmed_before_grouping() {
        let ros = vec![ro("R1", "")];
        let lines = vec![
            line("R1", "10", Some("Tires ")),
            line("R1", "15", Some(" Tires")),
            line("R1", "20", Some("Brakes")),
        ];
        let out = analyze(&ros, &lines);
        assert_eq!(out[0].top_categories, "Tires; Brakes");
    }

    #[test]
    fn test_total_is_exact_sum_without_rounding() {
        let ros = vec![ro("R1", "")];
        let lines = vec![line("R1", "0.105", None), line("R1", "0.2", None)];
        let out = analyze(&ros, &lines);
        assert_eq!(out[0].declined_total, 0.105 + 0.2);
    }

    #[test]
    fn test_analyze_records_converts_loose_rows() {
        let ro_rows = crate::csv_input::parse_csv(
            "ro_number,ro_date,customer_name,email\nR1,2024-01-01,Ann,\n",
        )
        .unwrap();
        let line_rows = crate::csv_input::parse_csv(
            "ro_number,line_desc,declined_amount\nR1,Pads,\"$1,200.00\"\n",
        )
        .unwrap();
        let out = analyze_records(&ro_rows, &line_rows);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].declined_total, 1200.0);
        assert_eq!(out[0].email, None);
        assert_eq!(out[0].top_categories, UNCATEGORIZED);
    }

    #[test]
    fn test_summarize() {
        let ros = vec![ro("A", ""), ro("B", "")];
        let lines = vec![line("A", "10.50", None), line("B", "4.50", None)];
        let summary = summarize(&analyze(&ros, &lines));
        assert_eq!(summary.row_count, 2);
        assert_eq!(summary.declined_total, 15.0);
    }
}
