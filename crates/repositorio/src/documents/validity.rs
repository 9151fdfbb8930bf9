//! Vigente/vencido derivation for Convenio documents.
//!
//! Validity is never stored. It is recomputed from the signature date, duration and
//! automatic-renewal flag against the evaluation date supplied by the caller.

use chrono::{Months, NaiveDate};
use serde::{Deserialize, Serialize};

use super::domain::{ConvenioDetails, Document};

/// Badge shown next to a document in listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidityStatus {
    /// The document is not a Convenio; no badge is shown.
    NotApplicable,
    Vigente,
    Vencido,
}

impl ValidityStatus {
    pub const fn label(self) -> &'static str {
        match self {
            Self::NotApplicable => "",
            Self::Vigente => "Vigente",
            Self::Vencido => "Vencido",
        }
    }
}

/// Whether the document is in force on `today`.
///
/// Non-Convenio documents, auto-renewing agreements and agreements lacking a date or a
/// duration are always valid. Otherwise the agreement is valid strictly before
/// `date + duration` calendar years.
pub fn is_currently_valid(document: &Document, today: NaiveDate) -> bool {
    match document.convenio() {
        Some(convenio) => convenio_is_valid(document.date, convenio, today),
        None => true,
    }
}

pub fn validity_status(document: &Document, today: NaiveDate) -> ValidityStatus {
    match document.convenio() {
        None => ValidityStatus::NotApplicable,
        Some(convenio) if convenio_is_valid(document.date, convenio, today) => {
            ValidityStatus::Vigente
        }
        Some(_) => ValidityStatus::Vencido,
    }
}

/// First day on which a fixed-term Convenio is no longer in force.
pub fn expiry_date(document: &Document) -> Option<NaiveDate> {
    let convenio = document.convenio()?;
    if convenio.has_automatic_renewal {
        return None;
    }
    add_years(document.date?, convenio.duration_years?)
}

fn convenio_is_valid(
    signed_on: Option<NaiveDate>,
    convenio: &ConvenioDetails,
    today: NaiveDate,
) -> bool {
    if convenio.has_automatic_renewal {
        return true;
    }

    let (Some(signed_on), Some(years)) = (signed_on, convenio.duration_years) else {
        return true;
    };

    match add_years(signed_on, years) {
        Some(expiry) => today < expiry,
        // Past the calendar range: nothing representable can be at or after it.
        None => true,
    }
}

/// Calendar-year addition. Month and day are kept; 29 February lands on 28 February
/// when the target year is not a leap year.
pub(crate) fn add_years(date: NaiveDate, years: u32) -> Option<NaiveDate> {
    let months = years.checked_mul(12)?;
    date.checked_add_months(Months::new(months))
}
