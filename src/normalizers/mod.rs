//! Raw rows as they come out of the store or a legacy export, and their
//! conversion into the canonical model. Numeric fields are coerced and
//! defaulted to zero; nothing else is validated.
use crate::model::election::{
    BureauCandidateResult, BureauId, Candidate, CandidateId, CenterId, Election, ElectionStatus,
    VotingBureau, VotingCenter,
};
use chrono::NaiveDate;
use itertools::Itertools;
use log::warn;
use serde::{Deserialize, Deserializer};
use sqlx::sqlite::SqliteRow;
use sqlx::types::Json;
use sqlx::{FromRow, Row};
use std::collections::{BTreeMap, HashMap, HashSet};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawElectionRow {
    #[serde(alias = "id_election")]
    pub id: i64,
    #[serde(default, alias = "titre", alias = "name", alias = "nom")]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default, alias = "statut")]
    pub status: Option<String>,
    #[serde(
        default,
        deserialize_with = "lenient_count",
        alias = "total_registered",
        alias = "inscrits",
        alias = "nb_inscrits"
    )]
    pub registered_voters: Option<i64>,
    #[serde(default, deserialize_with = "lenient_count")]
    pub expected_bureaux: Option<i64>,
    #[serde(default)]
    pub metadata: Option<Json<serde_json::Value>>,
}

#[derive(Debug, Clone, Default, Deserialize, sqlx::FromRow)]
pub struct RawCenterRow {
    #[serde(alias = "id_centre", alias = "center_id", alias = "centre_id")]
    pub id: i64,
    #[serde(default, alias = "nom", alias = "center_name", alias = "nom_centre")]
    pub name: Option<String>,
    #[serde(default, alias = "id_election")]
    #[sqlx(default)]
    pub election_id: Option<i64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawBureauRow {
    #[serde(alias = "id_bureau", alias = "bureau_id")]
    pub id: i64,
    #[serde(default, alias = "nom", alias = "bureau_name", alias = "libelle")]
    pub name: Option<String>,
    #[serde(default, alias = "centre_id", alias = "id_centre")]
    pub center_id: Option<i64>,
    #[serde(default, alias = "id_election")]
    pub election_id: Option<i64>,
    #[serde(
        default,
        deserialize_with = "lenient_count",
        alias = "inscrits",
        alias = "registered",
        alias = "total_registered"
    )]
    pub registered_voters: Option<i64>,
    #[serde(
        default,
        deserialize_with = "lenient_count",
        alias = "votants",
        alias = "voters",
        alias = "total_voters"
    )]
    pub voters_who_voted: Option<i64>,
    #[serde(
        default,
        deserialize_with = "lenient_count",
        alias = "exprimes",
        alias = "suffrages_exprimes",
        alias = "expressed",
        alias = "total_expressed"
    )]
    pub expressed_votes: Option<i64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawCandidateRow {
    #[serde(alias = "id_candidat", alias = "candidate_id")]
    pub id: i64,
    #[serde(default, alias = "nom", alias = "candidate_name", alias = "nom_candidat")]
    pub name: Option<String>,
    #[serde(default, alias = "parti", alias = "party_name")]
    pub party: Option<String>,
    #[serde(default, alias = "ordre")]
    pub position: Option<i64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawResultRow {
    #[serde(alias = "id_bureau")]
    pub bureau_id: i64,
    #[serde(alias = "id_candidat")]
    pub candidate_id: i64,
    #[serde(
        default,
        deserialize_with = "lenient_count",
        alias = "voix",
        alias = "nb_voix",
        alias = "score"
    )]
    pub votes: Option<i64>,
    #[serde(default, alias = "id_election")]
    pub election_id: Option<i64>,
    #[serde(default, alias = "centre_id", alias = "id_centre")]
    pub center_id: Option<i64>,
    #[serde(default, alias = "nom_bureau")]
    pub bureau_name: Option<String>,
    #[serde(default, alias = "nom_centre")]
    pub center_name: Option<String>,
}

// Store reads select counts as `CAST(column AS TEXT)` and coerce them here,
// so a stray text value in a numeric column reads as missing.
fn count_column(row: &SqliteRow, column: &str) -> sqlx::Result<Option<i64>> {
    let text: Option<String> = row.try_get(column)?;
    Ok(text.and_then(|t| json_count(&serde_json::Value::String(t))))
}

fn metadata_column(row: &SqliteRow, column: &str) -> sqlx::Result<Option<Json<serde_json::Value>>> {
    let text: Option<String> = row.try_get(column)?;
    Ok(text.and_then(|t| match serde_json::from_str(&t) {
        Ok(value) => Some(Json(value)),
        Err(e) => {
            warn!("Ignoring unreadable election metadata {:?}: {}", t, e);
            None
        }
    }))
}

impl<'r> FromRow<'r, SqliteRow> for RawElectionRow {
    fn from_row(row: &'r SqliteRow) -> sqlx::Result<Self> {
        Ok(Self {
            id: row.try_get("id")?,
            title: row.try_get("title")?,
            description: row.try_get("description")?,
            date: row.try_get("date")?,
            status: row.try_get("status")?,
            registered_voters: count_column(row, "registered_voters")?,
            expected_bureaux: count_column(row, "expected_bureaux")?,
            metadata: metadata_column(row, "metadata")?,
        })
    }
}

impl<'r> FromRow<'r, SqliteRow> for RawBureauRow {
    fn from_row(row: &'r SqliteRow) -> sqlx::Result<Self> {
        Ok(Self {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
            center_id: count_column(row, "center_id")?,
            election_id: count_column(row, "election_id")?,
            registered_voters: count_column(row, "registered_voters")?,
            voters_who_voted: count_column(row, "voters_who_voted")?,
            expressed_votes: count_column(row, "expressed_votes")?,
        })
    }
}

impl<'r> FromRow<'r, SqliteRow> for RawCandidateRow {
    fn from_row(row: &'r SqliteRow) -> sqlx::Result<Self> {
        Ok(Self {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
            party: row.try_get("party")?,
            position: count_column(row, "position")?,
        })
    }
}

impl<'r> FromRow<'r, SqliteRow> for RawResultRow {
    fn from_row(row: &'r SqliteRow) -> sqlx::Result<Self> {
        Ok(Self {
            bureau_id: row.try_get("bureau_id")?,
            candidate_id: row.try_get("candidate_id")?,
            votes: count_column(row, "votes")?,
            election_id: count_column(row, "election_id")?,
            center_id: count_column(row, "center_id")?,
            bureau_name: row.try_get("bureau_name")?,
            center_name: None,
        })
    }
}

/// Accepts integers, floats, numeric strings and null.
fn lenient_count<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(json_count))
}

pub fn json_count(value: &serde_json::Value) -> Option<i64> {
    match value {
        serde_json::Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        serde_json::Value::String(s) => s.trim().parse::<f64>().ok().map(|f| f as i64),
        _ => None,
    }
}

fn count(value: Option<i64>) -> u64 {
    value.unwrap_or(0).max(0) as u64
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

pub fn parse_status(status: Option<&str>) -> ElectionStatus {
    let normalized = status.unwrap_or("").trim().to_lowercase();
    match normalized.as_str() {
        "ongoing" | "en cours" | "en_cours" | "in progress" | "open" => ElectionStatus::Ongoing,
        "finished" | "terminée" | "terminee" | "terminé" | "closed" | "completed" => {
            ElectionStatus::Finished
        }
        "cancelled" | "canceled" | "annulée" | "annulee" => ElectionStatus::Cancelled,
        _ => ElectionStatus::Upcoming,
    }
}

fn parse_date(date: Option<&str>) -> Option<NaiveDate> {
    let date = date?.trim();
    let day = date.get(..10).unwrap_or(date);
    NaiveDate::parse_from_str(day, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(date, "%d/%m/%Y"))
        .ok()
}

pub fn normalize_election(raw: &RawElectionRow) -> Election {
    let attributes: BTreeMap<String, serde_json::Value> = match raw.metadata.as_ref() {
        Some(Json(serde_json::Value::Object(map))) => {
            map.iter().map(|(k, v)| (k.clone(), v.clone())).collect()
        }
        _ => BTreeMap::new(),
    };

    Election {
        id: raw.id,
        title: non_blank(raw.title.as_deref()).unwrap_or_else(|| format!("Election {}", raw.id)),
        description: non_blank(raw.description.as_deref()),
        date: parse_date(raw.date.as_deref()),
        status: parse_status(raw.status.as_deref()),
        registered_voters: raw.registered_voters.map(|v| v.max(0) as u64),
        expected_bureaux: raw.expected_bureaux.map(|v| v.max(0) as u64),
        attributes,
    }
}

pub fn normalize_centers(rows: &[RawCenterRow]) -> Vec<VotingCenter> {
    rows.iter()
        .map(|row| VotingCenter {
            id: row.id,
            name: non_blank(row.name.as_deref()).unwrap_or_else(|| format!("Center {}", row.id)),
        })
        .collect()
}

pub fn normalize_bureaux(rows: &[RawBureauRow]) -> Vec<VotingBureau> {
    rows.iter()
        .map(|row| VotingBureau {
            id: row.id,
            name: non_blank(row.name.as_deref()).unwrap_or_else(|| format!("Bureau {}", row.id)),
            center_id: row.center_id,
            registered_voters: count(row.registered_voters),
            voters_who_voted: count(row.voters_who_voted),
            expressed_votes: count(row.expressed_votes),
        })
        .collect()
}

/// Candidates in ballot order: explicit position first, input order otherwise.
pub fn normalize_candidates(rows: &[RawCandidateRow]) -> Vec<Candidate> {
    rows.iter()
        .sorted_by_key(|row| row.position.unwrap_or(i64::MAX))
        .unique_by(|row| row.id)
        .map(|row| Candidate {
            id: row.id,
            name: non_blank(row.name.as_deref())
                .unwrap_or_else(|| format!("Candidate {}", row.id)),
            party: non_blank(row.party.as_deref()),
        })
        .collect()
}

/// Appends placeholder candidates for ids that only appear in results.
pub fn complete_candidates(
    mut candidates: Vec<Candidate>,
    results: &[BureauCandidateResult],
) -> Vec<Candidate> {
    let mut known: HashSet<CandidateId> = candidates.iter().map(|c| c.id).collect();
    for result in results {
        if known.insert(result.candidate_id) {
            candidates.push(Candidate {
                id: result.candidate_id,
                name: format!("Candidate {}", result.candidate_id),
                party: None,
            });
        }
    }
    candidates
}

/// id → display name tables for rows that do not carry names inline.
#[derive(Debug, Default)]
pub struct NameLookup {
    centers: HashMap<CenterId, String>,
    bureaux: HashMap<BureauId, (String, Option<CenterId>)>,
}

impl NameLookup {
    pub fn new(centers: &[VotingCenter], bureaux: &[VotingBureau]) -> Self {
        Self {
            centers: centers.iter().map(|c| (c.id, c.name.clone())).collect(),
            bureaux: bureaux
                .iter()
                .map(|b| (b.id, (b.name.clone(), b.center_id)))
                .collect(),
        }
    }

    pub fn center_name(&self, id: CenterId) -> Option<&str> {
        self.centers.get(&id).map(String::as_str)
    }

    pub fn bureau(&self, id: BureauId) -> Option<(&str, Option<CenterId>)> {
        self.bureaux
            .get(&id)
            .map(|(name, center)| (name.as_str(), *center))
    }
}

pub fn normalize_results(rows: &[RawResultRow], lookup: &NameLookup) -> Vec<BureauCandidateResult> {
    rows.iter()
        .map(|row| {
            let known = lookup.bureau(row.bureau_id);
            let center_id = row.center_id.or_else(|| known.and_then(|(_, c)| c));
            let bureau_name = non_blank(row.bureau_name.as_deref())
                .or_else(|| known.map(|(name, _)| name.to_string()))
                .unwrap_or_else(|| format!("Bureau {}", row.bureau_id));
            let center_name = non_blank(row.center_name.as_deref()).or_else(|| {
                center_id
                    .and_then(|id| lookup.center_name(id))
                    .map(str::to_string)
            });

            BureauCandidateResult {
                bureau_id: row.bureau_id,
                bureau_name,
                center_id,
                center_name,
                candidate_id: row.candidate_id,
                votes: count(row.votes),
            }
        })
        .collect()
}
