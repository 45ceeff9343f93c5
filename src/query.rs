//! openFDA search expression builder
//!
//! Produces the value of the `search` query parameter: generic drug names
//! OR'd together, AND'd with an occurrence country filter and an inclusive
//! received-date range, e.g.
//!
//! ```text
//! (patient.drug.openfda.generic_name:"ATORVASTATIN" OR patient.drug.openfda.generic_name:"SIMVASTATIN") AND occurcountry:"US" AND receivedate:[20200101 TO 20241231]
//! ```
//!
//! The expression is kept unencoded; URL encoding happens when the request
//! URL is assembled.

use crate::config::QueryConfig;
use chrono::NaiveDate;
use std::fmt;

const GENERIC_NAME_FIELD: &str = "patient.drug.openfda.generic_name";
const COUNTRY_FIELD: &str = "occurcountry";
const RECEIVED_FIELD: &str = "receivedate";

/// A fully specified adverse-event search
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SearchQuery {
    generic_names: Vec<String>,
    occurrence_country: Option<String>,
    received_from: NaiveDate,
    received_to: NaiveDate,
}

impl SearchQuery {
    /// Build a query for the given drugs and inclusive receive-date range
    pub fn new(
        generic_names: impl IntoIterator<Item = impl Into<String>>,
        received_from: NaiveDate,
        received_to: NaiveDate,
    ) -> Self {
        Self {
            generic_names: generic_names
                .into_iter()
                .map(Into::<String>::into)
                .map(|n| n.trim().to_uppercase())
                .filter(|n| !n.is_empty())
                .collect(),
            occurrence_country: None,
            received_from,
            received_to,
        }
    }

    /// Restrict results to reports that occurred in `country`
    pub fn with_occurrence_country(mut self, country: impl Into<String>) -> Self {
        let country: String = country.into();
        let country = country.trim().to_uppercase();
        self.occurrence_country = (!country.is_empty()).then_some(country);
        self
    }

    /// Generic names included in the OR clause
    pub fn generic_names(&self) -> &[String] {
        &self.generic_names
    }

    /// Render the `search` parameter value
    pub fn to_search_string(&self) -> String {
        self.to_string()
    }
}

impl From<&QueryConfig> for SearchQuery {
    fn from(config: &QueryConfig) -> Self {
        let query = SearchQuery::new(
            config.generic_names.iter().cloned(),
            config.received_from,
            config.received_to,
        );
        match &config.occurrence_country {
            Some(country) => query.with_occurrence_country(country.clone()),
            None => query,
        }
    }
}

impl fmt::Display for SearchQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let drugs = self
            .generic_names
            .iter()
            .map(|name| format!("{GENERIC_NAME_FIELD}:\"{name}\""))
            .collect::<Vec<_>>()
            .join(" OR ");
        write!(f, "({drugs})")?;

        if let Some(country) = &self.occurrence_country {
            write!(f, " AND {COUNTRY_FIELD}:\"{country}\"")?;
        }

        write!(
            f,
            " AND {RECEIVED_FIELD}:[{} TO {}]",
            self.received_from.format("%Y%m%d"),
            self.received_to.format("%Y%m%d")
        )
    }
}
