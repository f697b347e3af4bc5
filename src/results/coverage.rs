//! Expected-bureau resolution for the coverage rate.
//!
//! The expected count is tried from increasingly heuristic sources, stopping
//! at the first that answers:
//!
//! 1. an explicit count stored on the election (several field names);
//! 2. bureaux whose `election_id` points at the election;
//! 3. bureaux reached through the election's centers;
//! 4. a typical count for the election class, matched on title keywords;
//! 5. the highest bureau number seen in reported data, scaled up. This scans
//!    the rolled-up bureau rows, so bureaux only known from result rows count.
//!
//! Steps 1-3 are authoritative, 4-5 produce an estimate.
use crate::config::CoverageConfig;
use crate::database::ResultsDatabase;
use crate::model::election::{BureauSummary, CoverageEstimate, CoverageSource, Election};
use crate::normalizers::json_count;
use crate::results::participation::{coverage_pct, reporting_bureaux};
use crate::util::bureau_number;
use log::{debug, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpectedBureaux {
    pub count: u64,
    pub source: CoverageSource,
}

impl ExpectedBureaux {
    fn new(count: u64, source: CoverageSource) -> Self {
        Self { count, source }
    }
}

/// Step 1: the `expected_bureaux` column, then the configured attribute
/// names in order.
pub fn from_election_fields(election: &Election, config: &CoverageConfig) -> Option<ExpectedBureaux> {
    if let Some(count) = election.expected_bureaux.filter(|c| *c > 0) {
        return Some(ExpectedBureaux::new(
            count,
            CoverageSource::ElectionField("expected_bureaux".to_string()),
        ));
    }

    config.election_fields.iter().find_map(|field| {
        election
            .attributes
            .get(field)
            .and_then(json_count)
            .filter(|c| *c > 0)
            .map(|c| ExpectedBureaux::new(c as u64, CoverageSource::ElectionField(field.clone())))
    })
}

/// Step 2.
pub async fn from_direct_links(db: &ResultsDatabase, election: &Election) -> Option<ExpectedBureaux> {
    match db.count_bureaux_direct(election.id).await {
        Ok(0) => None,
        Ok(count) => Some(ExpectedBureaux::new(count, CoverageSource::DirectForeignKey)),
        Err(e) => {
            warn!("Direct bureau count failed for election {}: {}", election.id, e);
            None
        }
    }
}

/// Step 3.
pub async fn from_center_links(db: &ResultsDatabase, election: &Election) -> Option<ExpectedBureaux> {
    match db.count_bureaux_via_centers(election.id).await {
        Ok(0) => None,
        Ok(count) => Some(ExpectedBureaux::new(count, CoverageSource::CenterLinks)),
        Err(e) => {
            warn!("Center-linked bureau count failed for election {}: {}", election.id, e);
            None
        }
    }
}

/// Step 4: first rule with a keyword found in the title or description.
pub fn from_title(election: &Election, config: &CoverageConfig) -> Option<ExpectedBureaux> {
    let text = format!(
        "{} {}",
        election.title,
        election.description.as_deref().unwrap_or("")
    )
    .to_lowercase();

    config.title_rules.iter().find_map(|rule| {
        rule.keywords
            .iter()
            .find(|keyword| text.contains(&keyword.to_lowercase()))
            .map(|keyword| {
                ExpectedBureaux::new(
                    rule.typical_bureaux,
                    CoverageSource::TitleKeyword(keyword.clone()),
                )
            })
    })
}

/// Step 5: always answers, floored at the configured minimum.
pub fn from_bureau_numbers(bureaux: &[BureauSummary], config: &CoverageConfig) -> ExpectedBureaux {
    let highest = bureaux
        .iter()
        .filter(|b| b.has_reported())
        .filter_map(|b| bureau_number(&b.bureau_name))
        .max()
        .unwrap_or(0);
    let scaled = (highest as f64 * config.bureau_number_multiplier.max(1.0)).ceil() as u64;

    ExpectedBureaux::new(
        scaled.max(config.minimum_bureaux),
        CoverageSource::BureauNumberScan,
    )
}

/// Steps 1-3 only.
pub async fn resolve_authoritative(
    db: &ResultsDatabase,
    election: &Election,
    config: &CoverageConfig,
) -> Option<ExpectedBureaux> {
    if let Some(found) = from_election_fields(election, config) {
        return Some(found);
    }
    if let Some(found) = from_direct_links(db, election).await {
        return Some(found);
    }
    from_center_links(db, election).await
}

/// Steps 4-5 only.
pub fn resolve_heuristic(
    election: &Election,
    bureaux: &[BureauSummary],
    config: &CoverageConfig,
) -> ExpectedBureaux {
    from_title(election, config).unwrap_or_else(|| from_bureau_numbers(bureaux, config))
}

pub async fn resolve_expected_bureaux(
    db: &ResultsDatabase,
    election: &Election,
    bureaux: &[BureauSummary],
    config: &CoverageConfig,
) -> ExpectedBureaux {
    let expected = match resolve_authoritative(db, election, config).await {
        Some(found) => found,
        None => resolve_heuristic(election, bureaux, config),
    };
    debug!(
        "election {}: expecting {} bureaux from {}",
        election.id, expected.count, expected.source
    );
    expected
}

pub fn coverage_estimate(
    election: &Election,
    expected: ExpectedBureaux,
    bureaux: &[BureauSummary],
) -> CoverageEstimate {
    let reporting = reporting_bureaux(bureaux);

    CoverageEstimate {
        election_id: election.id,
        expected_bureaux: expected.count,
        reporting_bureaux: reporting,
        coverage_pct: coverage_pct(reporting, expected.count),
        is_estimated: !expected.source.is_authoritative(),
        source: expected.source,
    }
}

pub async fn estimate_coverage(
    db: &ResultsDatabase,
    election: &Election,
    bureaux: &[BureauSummary],
    config: &CoverageConfig,
) -> CoverageEstimate {
    let expected = resolve_expected_bureaux(db, election, bureaux, config).await;
    coverage_estimate(election, expected, bureaux)
}
