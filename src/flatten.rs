//! Event flattening
//!
//! Each [`EventRecord`] expands into one [`FlatRow`] per drug × reaction
//! pair. Events without reactions still yield one row per drug with an empty
//! `reaction` column; events without drugs yield nothing.

use crate::types::{Drug, EventRecord, FlatRow};

/// Flatten a batch of events, preserving event, drug and reaction order
///
/// The returned iterator is lazy and borrows the batch; collect it before the
/// batch is dropped.
pub fn flatten(batch: &[EventRecord]) -> impl Iterator<Item = FlatRow> + '_ {
    batch.iter().flat_map(flatten_event)
}

/// Flatten a single event
pub fn flatten_event(event: &EventRecord) -> impl Iterator<Item = FlatRow> + '_ {
    let base = FlatRow {
        report_id: event.report_id.clone(),
        receive_date: event.receive_date.clone(),
        serious: event.seriousness.clone(),
        report_country: event.reporting_country.clone(),
        occurrence_country: event.occurrence_country.clone(),
        source_qualification: event.source_qualification().to_string(),
        ..FlatRow::default()
    };

    event.drugs().iter().flat_map(move |drug| {
        let drug_row = with_drug(&base, drug);
        let reactions = event.reactions();
        // An empty reaction list still produces the bare drug row
        let terms: Vec<String> = if reactions.is_empty() {
            vec![String::new()]
        } else {
            reactions.iter().map(|r| r.reaction_term.clone()).collect()
        };
        terms.into_iter().map(move |reaction| FlatRow {
            reaction,
            ..drug_row.clone()
        })
    })
}

fn with_drug(base: &FlatRow, drug: &Drug) -> FlatRow {
    FlatRow {
        drug_characterization: drug.characterization.clone(),
        medicinal_product: drug.medicinal_product.clone(),
        generic_name: drug.generic_name().unwrap_or_default().to_string(),
        brand_name: drug.brand_name().unwrap_or_default().to_string(),
        ..base.clone()
    }
}
