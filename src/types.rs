//! Core types: raw API records and flattened output rows
//!
//! Raw types mirror the openFDA `drug/event` JSON layout closely enough to
//! pull out the handful of fields that end up in the CSV. Anything missing
//! decodes to an empty string or an empty list; no further validation is done.

use serde::{Deserialize, Serialize};

/// One page of search results
///
/// Decoded from `{ "meta": { "results": { "total": N } }, "results": [...] }`.
#[derive(Clone, Debug, Deserialize)]
pub struct SearchPage {
    /// Result-set metadata
    pub meta: SearchMeta,

    /// Event reports on this page
    #[serde(default, deserialize_with = "null_as_default")]
    pub results: Vec<EventRecord>,
}

impl SearchPage {
    /// Total number of records matching the search across all pages
    pub fn total(&self) -> u64 {
        self.meta.results.total
    }
}

/// `meta` block of a search response
#[derive(Clone, Debug, Deserialize)]
pub struct SearchMeta {
    /// Paging counters
    pub results: ResultCounts,
}

/// `meta.results` block of a search response
#[derive(Clone, Debug, Deserialize)]
pub struct ResultCounts {
    /// Total matching records
    pub total: u64,
}

/// One adverse-event report as returned by the API
#[derive(Clone, Debug, Default, Deserialize)]
pub struct EventRecord {
    /// Safety report identifier
    #[serde(rename = "safetyreportid", default, deserialize_with = "lenient_string")]
    pub report_id: String,

    /// Date the report was received (YYYYMMDD)
    #[serde(rename = "receivedate", default, deserialize_with = "lenient_string")]
    pub receive_date: String,

    /// Seriousness flag ("1" serious, "2" not serious)
    #[serde(rename = "serious", default, deserialize_with = "lenient_string")]
    pub seriousness: String,

    /// Country of the primary reporter
    #[serde(
        rename = "primarysourcecountry",
        default,
        deserialize_with = "lenient_string"
    )]
    pub reporting_country: String,

    /// Country where the event occurred
    #[serde(rename = "occurcountry", default, deserialize_with = "lenient_string")]
    pub occurrence_country: String,

    /// Primary source block, if present
    #[serde(rename = "primarysource", default)]
    pub primary_source: Option<PrimarySource>,

    /// Patient block carrying drugs and reactions
    #[serde(default, deserialize_with = "null_as_default")]
    pub patient: Patient,
}

impl EventRecord {
    /// Reporter qualification, empty when the primary source block is absent
    pub fn source_qualification(&self) -> &str {
        self.primary_source
            .as_ref()
            .map(|s| s.qualification.as_str())
            .unwrap_or("")
    }

    /// Drugs listed on the report
    pub fn drugs(&self) -> &[Drug] {
        &self.patient.drugs
    }

    /// Reactions listed on the report
    pub fn reactions(&self) -> &[Reaction] {
        &self.patient.reactions
    }
}

/// `primarysource` block
#[derive(Clone, Debug, Default, Deserialize)]
pub struct PrimarySource {
    /// Reporter qualification code
    #[serde(default, deserialize_with = "lenient_string")]
    pub qualification: String,
}

/// `patient` block
#[derive(Clone, Debug, Default, Deserialize)]
pub struct Patient {
    /// Suspect and concomitant drugs
    #[serde(rename = "drug", default, deserialize_with = "null_as_default")]
    pub drugs: Vec<Drug>,

    /// Reported reactions
    #[serde(rename = "reaction", default, deserialize_with = "null_as_default")]
    pub reactions: Vec<Reaction>,
}

/// One drug entry of a report
#[derive(Clone, Debug, Default, Deserialize)]
pub struct Drug {
    /// Role of the drug (1 suspect, 2 concomitant, 3 interacting)
    #[serde(
        rename = "drugcharacterization",
        default,
        deserialize_with = "lenient_string"
    )]
    pub characterization: String,

    /// Product name as reported
    #[serde(
        rename = "medicinalproduct",
        default,
        deserialize_with = "lenient_string"
    )]
    pub medicinal_product: String,

    /// openFDA harmonized names
    #[serde(default, deserialize_with = "null_as_default")]
    pub openfda: OpenFda,
}

impl Drug {
    /// First harmonized generic name, if any
    pub fn generic_name(&self) -> Option<&str> {
        self.openfda.generic_name.first().map(String::as_str)
    }

    /// First harmonized brand name, if any
    pub fn brand_name(&self) -> Option<&str> {
        self.openfda.brand_name.first().map(String::as_str)
    }
}

/// `openfda` block of a drug entry
#[derive(Clone, Debug, Default, Deserialize)]
pub struct OpenFda {
    /// Harmonized generic names
    #[serde(default, deserialize_with = "null_as_default")]
    pub generic_name: Vec<String>,

    /// Harmonized brand names
    #[serde(default, deserialize_with = "null_as_default")]
    pub brand_name: Vec<String>,
}

/// One reaction entry of a report
#[derive(Clone, Debug, Default, Deserialize)]
pub struct Reaction {
    /// MedDRA preferred term
    #[serde(
        rename = "reactionmeddrapt",
        default,
        deserialize_with = "lenient_string"
    )]
    pub reaction_term: String,
}

/// One CSV output row: an event's scalar fields crossed with one drug and one reaction
///
/// Field order is the column order of the output file.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct FlatRow {
    /// Safety report identifier
    pub report_id: String,
    /// Date the report was received
    pub receive_date: String,
    /// Seriousness flag
    pub serious: String,
    /// Country of the primary reporter
    pub report_country: String,
    /// Country where the event occurred
    pub occurrence_country: String,
    /// Reporter qualification
    pub source_qualification: String,
    /// Drug role
    pub drug_characterization: String,
    /// Product name as reported
    pub medicinal_product: String,
    /// First harmonized generic name
    pub generic_name: String,
    /// First harmonized brand name
    pub brand_name: String,
    /// MedDRA reaction term, empty when the event lists no reactions
    pub reaction: String,
}

impl FlatRow {
    /// Header line of the output file, in column order
    pub const COLUMNS: [&'static str; 11] = [
        "report_id",
        "receive_date",
        "serious",
        "report_country",
        "occurrence_country",
        "source_qualification",
        "drug_characterization",
        "medicinal_product",
        "generic_name",
        "brand_name",
        "reaction",
    ];
}

// openFDA serves these as strings, but accept bare numbers and null too
fn lenient_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(match value {
        serde_json::Value::String(s) => s,
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    })
}

// An explicit null reads the same as an absent field
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: serde::Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
