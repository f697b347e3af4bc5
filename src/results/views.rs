//! Sorted and grouped result tables, shared by the whole-election view and
//! the single-candidate drill-down.
use crate::model::election::{BureauId, BureauSummary, CandidateId, CenterId, Totals};
use crate::results::rollup::{votes_for, Rollup};
use crate::util::{cmp_bureau_names, cmp_names, percentage};
use serde::Serialize;
use std::cmp::Ordering;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ViewMode {
    ByCenter,
    ByBureau,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SortKey {
    Center,
    Participation,
    Score,
    Votes,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SortDirection {
    Asc,
    Desc,
}

impl FromStr for ViewMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "byCenter" | "by-center" | "center" => Ok(ViewMode::ByCenter),
            "byBureau" | "by-bureau" | "bureau" => Ok(ViewMode::ByBureau),
            _ => Err(format!("unknown view mode: {}", s)),
        }
    }
}

impl FromStr for SortKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "center" => Ok(SortKey::Center),
            "participation" => Ok(SortKey::Participation),
            "score" => Ok(SortKey::Score),
            "votes" => Ok(SortKey::Votes),
            _ => Err(format!("unknown sort key: {}", s)),
        }
    }
}

impl FromStr for SortDirection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "asc" => Ok(SortDirection::Asc),
            "desc" => Ok(SortDirection::Desc),
            _ => Err(format!("unknown sort direction: {}", s)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ViewRequest {
    pub mode: ViewMode,
    pub key: SortKey,
    pub direction: SortDirection,
}

impl Default for ViewRequest {
    fn default() -> Self {
        Self {
            mode: ViewMode::ByCenter,
            key: SortKey::Center,
            direction: SortDirection::Asc,
        }
    }
}

/// Whose numbers the rows show.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ViewScope {
    Election,
    Candidate(CandidateId),
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct UnitMetrics {
    #[serde(rename = "participationPct")]
    pub participation_pct: f64,
    #[serde(rename = "scorePct")]
    pub score_pct: f64,
    pub votes: u64,
}

impl UnitMetrics {
    fn for_unit(scope: ViewScope, totals: &Totals, votes: &[(CandidateId, u64)]) -> Self {
        match scope {
            ViewScope::Election => {
                let leading = votes.iter().map(|(_, v)| *v).max().unwrap_or(0);
                UnitMetrics {
                    participation_pct: percentage(totals.voters, totals.registered),
                    score_pct: percentage(leading, totals.expressed),
                    votes: totals.expressed,
                }
            }
            ViewScope::Candidate(candidate_id) => {
                let candidate_votes = votes_for(votes, candidate_id);
                UnitMetrics {
                    participation_pct: percentage(candidate_votes, totals.registered),
                    score_pct: percentage(candidate_votes, totals.expressed),
                    votes: candidate_votes,
                }
            }
        }
    }

    fn cmp_by(&self, other: &Self, key: SortKey) -> Ordering {
        match key {
            SortKey::Participation => self.participation_pct.total_cmp(&other.participation_pct),
            SortKey::Score => self.score_pct.total_cmp(&other.score_pct),
            SortKey::Votes => self.votes.cmp(&other.votes),
            SortKey::Center => Ordering::Equal,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BureauRow {
    #[serde(rename = "bureauId")]
    pub bureau_id: BureauId,
    #[serde(rename = "bureauName")]
    pub bureau_name: String,
    #[serde(rename = "centerId")]
    pub center_id: Option<CenterId>,
    #[serde(rename = "centerName")]
    pub center_name: Option<String>,
    #[serde(flatten)]
    pub totals: Totals,
    #[serde(flatten)]
    pub metrics: UnitMetrics,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CenterGroup {
    #[serde(rename = "centerId")]
    pub center_id: CenterId,
    #[serde(rename = "centerName")]
    pub center_name: String,
    #[serde(flatten)]
    pub totals: Totals,
    #[serde(flatten)]
    pub metrics: UnitMetrics,
    pub bureaux: Vec<BureauRow>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "mode", content = "rows")]
pub enum ResultsTable {
    ByCenter(Vec<CenterGroup>),
    ByBureau(Vec<BureauRow>),
}

impl ResultsTable {
    pub fn len(&self) -> usize {
        match self {
            ResultsTable::ByCenter(groups) => groups.len(),
            ResultsTable::ByBureau(rows) => rows.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

}

fn directed(ordering: Ordering, direction: SortDirection) -> Ordering {
    match direction {
        SortDirection::Asc => ordering,
        SortDirection::Desc => ordering.reverse(),
    }
}

/// Center names compare alphabetically, ignoring case and accents; rows
/// without a center come last.
fn cmp_center_names(a: Option<&str>, b: Option<&str>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => cmp_names(a, b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

fn bureau_row(bureau: &BureauSummary, scope: ViewScope) -> BureauRow {
    BureauRow {
        bureau_id: bureau.bureau_id,
        bureau_name: bureau.bureau_name.clone(),
        center_id: bureau.center_id,
        center_name: bureau.center_name.clone(),
        totals: bureau.totals,
        metrics: UnitMetrics::for_unit(scope, &bureau.totals, &bureau.candidate_votes),
    }
}

fn cmp_bureau_order(a: &BureauRow, b: &BureauRow) -> Ordering {
    cmp_bureau_names(&a.bureau_name, &b.bureau_name).then_with(|| a.bureau_id.cmp(&b.bureau_id))
}

pub fn build_table(rollup: &Rollup, scope: ViewScope, request: ViewRequest) -> ResultsTable {
    match request.mode {
        ViewMode::ByCenter => ResultsTable::ByCenter(by_center(rollup, scope, request)),
        ViewMode::ByBureau => ResultsTable::ByBureau(by_bureau(rollup, scope, request)),
    }
}

/// Centers sorted by the requested key; their bureaux always in bureau
/// number order. Bureaux without a known center are not listed here.
fn by_center(rollup: &Rollup, scope: ViewScope, request: ViewRequest) -> Vec<CenterGroup> {
    let mut groups: Vec<CenterGroup> = rollup
        .centers
        .iter()
        .map(|center| {
            let mut bureaux: Vec<BureauRow> = rollup
                .bureaux_of(center.center_id)
                .map(|b| bureau_row(b, scope))
                .collect();
            bureaux.sort_by(cmp_bureau_order);

            CenterGroup {
                center_id: center.center_id,
                center_name: center.center_name.clone(),
                totals: center.totals,
                metrics: UnitMetrics::for_unit(scope, &center.totals, &center.candidate_votes),
                bureaux,
            }
        })
        .collect();

    groups.sort_by(|a, b| {
        let primary = match request.key {
            SortKey::Center => cmp_names(&a.center_name, &b.center_name),
            key => a.metrics.cmp_by(&b.metrics, key),
        };
        directed(primary, request.direction)
            .then_with(|| cmp_names(&a.center_name, &b.center_name))
            .then_with(|| a.center_id.cmp(&b.center_id))
    });

    groups
}

/// Flat bureau list. Ties fall back to center name, then bureau number.
fn by_bureau(rollup: &Rollup, scope: ViewScope, request: ViewRequest) -> Vec<BureauRow> {
    let mut rows: Vec<BureauRow> = rollup
        .bureaux
        .iter()
        .map(|b| bureau_row(b, scope))
        .collect();

    rows.sort_by(|a, b| {
        let center_order = cmp_center_names(a.center_name.as_deref(), b.center_name.as_deref());
        let primary = match request.key {
            SortKey::Center => directed(center_order, request.direction),
            key => directed(a.metrics.cmp_by(&b.metrics, key), request.direction)
                .then(center_order),
        };
        primary.then_with(|| cmp_bureau_order(a, b))
    });

    rows
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::results::rollup::rollup;
    use crate::results::rollup::tests::{bureau, candidate, center, result, two_center_rollup};

    fn request(mode: ViewMode, key: SortKey, direction: SortDirection) -> ViewRequest {
        ViewRequest {
            mode,
            key,
            direction,
        }
    }

    fn bureau_names(rows: &[BureauRow]) -> Vec<(Option<&str>, &str)> {
        rows.iter()
            .map(|r| (r.center_name.as_deref(), r.bureau_name.as_str()))
            .collect()
    }

    fn numbered_rollup() -> Rollup {
        let centers = vec![center(1, "Mairie"), center(2, "École")];
        let bureaux = vec![
            bureau(1, "Bureau 12", Some(1), 100, 60, 50),
            bureau(2, "Bureau 2", Some(1), 100, 90, 80),
            bureau(3, "Bureau 1", Some(2), 100, 70, 60),
            bureau(4, "Bureau 10", Some(2), 100, 40, 30),
        ];
        let candidates = vec![candidate(1, "Alice"), candidate(2, "Bob")];
        let results = vec![
            result(1, 1, 40),
            result(1, 2, 10),
            result(2, 1, 20),
            result(2, 2, 60),
            result(3, 1, 30),
            result(3, 2, 30),
            result(4, 1, 25),
            result(4, 2, 5),
        ];
        rollup(1, &centers, &bureaux, &candidates, &results)
    }

    #[test]
    fn by_center_keeps_bureau_number_order_inside_groups() {
        let table = build_table(
            &numbered_rollup(),
            ViewScope::Election,
            request(ViewMode::ByCenter, SortKey::Votes, SortDirection::Desc),
        );
        let ResultsTable::ByCenter(groups) = table else {
            panic!("expected grouped table");
        };

        // Mairie expressed 130 > École 90
        assert_eq!(groups[0].center_name, "Mairie");
        let names: Vec<_> = groups[0].bureaux.iter().map(|b| b.bureau_name.as_str()).collect();
        assert_eq!(names, vec!["Bureau 2", "Bureau 12"]);
        let names: Vec<_> = groups[1].bureaux.iter().map(|b| b.bureau_name.as_str()).collect();
        assert_eq!(names, vec!["Bureau 1", "Bureau 10"]);
    }

    #[test]
    fn by_center_sorted_by_name_in_both_directions() {
        let rollup = numbered_rollup();
        let asc = build_table(
            &rollup,
            ViewScope::Election,
            request(ViewMode::ByCenter, SortKey::Center, SortDirection::Asc),
        );
        let desc = build_table(
            &rollup,
            ViewScope::Election,
            request(ViewMode::ByCenter, SortKey::Center, SortDirection::Desc),
        );
        let (ResultsTable::ByCenter(asc), ResultsTable::ByCenter(desc)) = (asc, desc) else {
            panic!("expected grouped tables");
        };
        assert_eq!(asc[0].center_name, "École");
        assert_eq!(desc[0].center_name, "Mairie");
    }

    #[test]
    fn by_bureau_center_key_then_bureau_number() {
        let table = build_table(
            &numbered_rollup(),
            ViewScope::Election,
            request(ViewMode::ByBureau, SortKey::Center, SortDirection::Asc),
        );
        let ResultsTable::ByBureau(rows) = table else {
            panic!("expected flat table");
        };
        assert_eq!(
            bureau_names(&rows),
            vec![
                (Some("École"), "Bureau 1"),
                (Some("École"), "Bureau 10"),
                (Some("Mairie"), "Bureau 2"),
                (Some("Mairie"), "Bureau 12"),
            ]
        );
    }

    #[test]
    fn by_bureau_vote_ties_fall_back_to_center_then_number() {
        let centers = vec![center(1, "Zola"), center(2, "Arago")];
        let bureaux = vec![
            bureau(1, "Bureau 3", Some(1), 200, 120, 100),
            bureau(2, "Bureau 9", Some(2), 200, 110, 100),
            bureau(3, "Bureau 4", Some(2), 200, 105, 100),
            bureau(4, "Bureau 1", Some(1), 200, 160, 150),
        ];
        let rollup = rollup(1, &centers, &bureaux, &[], &[]);

        let table = build_table(
            &rollup,
            ViewScope::Election,
            request(ViewMode::ByBureau, SortKey::Votes, SortDirection::Desc),
        );
        let ResultsTable::ByBureau(rows) = table else {
            panic!("expected flat table");
        };
        assert_eq!(
            bureau_names(&rows),
            vec![
                (Some("Zola"), "Bureau 1"),
                (Some("Arago"), "Bureau 4"),
                (Some("Arago"), "Bureau 9"),
                (Some("Zola"), "Bureau 3"),
            ]
        );
    }

    #[test]
    fn candidate_scope_uses_candidate_metrics() {
        let rollup = two_center_rollup();
        let table = build_table(
            &rollup,
            ViewScope::Candidate(2),
            request(ViewMode::ByBureau, SortKey::Score, SortDirection::Desc),
        );
        let ResultsTable::ByBureau(rows) = table else {
            panic!("expected flat table");
        };

        // Bob: 50/90 in bureau 12, 30/80 in 11, 50/150 in 21
        let ids: Vec<_> = rows.iter().map(|r| r.bureau_id).collect();
        assert_eq!(ids, vec![12, 11, 21]);
        assert_eq!(rows[0].metrics.votes, 50);
        assert!((rows[0].metrics.participation_pct - 100.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn election_scope_score_is_leading_share() {
        let rollup = two_center_rollup();
        let table = build_table(
            &rollup,
            ViewScope::Election,
            request(ViewMode::ByCenter, SortKey::Score, SortDirection::Asc),
        );
        let ResultsTable::ByCenter(groups) = table else {
            panic!("expected grouped table");
        };
        // A: leading 90/170, B: leading 100/150
        assert_eq!(groups[0].center_name, "Center A");
        assert!((groups[1].metrics.score_pct - 200.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn orphan_bureaux_only_in_flat_view() {
        let centers = vec![center(1, "Mairie")];
        let bureaux = vec![
            bureau(1, "Bureau 1", Some(1), 10, 5, 5),
            bureau(2, "Bureau 2", None, 10, 9, 9),
        ];
        let rollup = rollup(1, &centers, &bureaux, &[], &[]);

        let grouped = build_table(
            &rollup,
            ViewScope::Election,
            request(ViewMode::ByCenter, SortKey::Center, SortDirection::Asc),
        );
        let flat = build_table(
            &rollup,
            ViewScope::Election,
            request(ViewMode::ByBureau, SortKey::Center, SortDirection::Asc),
        );
        let ResultsTable::ByCenter(groups) = grouped else {
            panic!("expected grouped table");
        };
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].bureaux.len(), 1);
        let ResultsTable::ByBureau(rows) = flat else {
            panic!("expected flat table");
        };
        assert_eq!(bureau_names(&rows), vec![(Some("Mairie"), "Bureau 1"), (None, "Bureau 2")]);
    }

    #[test]
    fn same_input_same_output() {
        let rollup = numbered_rollup();
        let req = request(ViewMode::ByBureau, SortKey::Participation, SortDirection::Desc);
        assert_eq!(
            build_table(&rollup, ViewScope::Election, req),
            build_table(&rollup, ViewScope::Election, req)
        );
    }

    #[test]
    fn parses_request_parts() {
        assert_eq!("byCenter".parse::<ViewMode>(), Ok(ViewMode::ByCenter));
        assert_eq!("by-bureau".parse::<ViewMode>(), Ok(ViewMode::ByBureau));
        assert_eq!("score".parse::<SortKey>(), Ok(SortKey::Score));
        assert_eq!("desc".parse::<SortDirection>(), Ok(SortDirection::Desc));
        assert!("name".parse::<SortKey>().is_err());
    }
}
