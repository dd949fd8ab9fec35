//! Area assignment and proration of the residual "Other Areas" bucket.
//!
//! Shops outside the four tracked areas are reported together. To make that
//! bucket comparable with a single named area its volumes are divided evenly
//! by the estimated number of residual areas it spans.

use crate::error::{ReportError, Result};
use crate::rates::derive_rates;
use crate::types::{AreaLabel, DerivedRecord, RawRecord};
use clap::ValueEnum;
use log::{info, warn};
use once_cell::sync::Lazy;
use std::collections::{HashMap, HashSet};

static AREA_LABELS: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    HashMap::from([
        ("304", "A17 TAMARA FUENTE"),
        ("109", "A07 ELEONORA ARMONICI"),
        ("209", "A21 JESUS TENA"),
        ("402", "A34 LORENA EXPOSITO"),
    ])
});

pub fn named_area_count() -> usize {
    AREA_LABELS.len()
}

pub fn assign_area(area_code: &str) -> AreaLabel {
    match AREA_LABELS.get(area_code) {
        Some(label) => AreaLabel::Named(*label),
        None => AreaLabel::OtherAreas,
    }
}

/// How the number of residual areas is estimated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum ResidualPolicy {
    /// Distinct area codes found in the Other Areas rows.
    #[default]
    Distinct,
    /// Distinct Other Areas codes minus the number of named areas, as the
    /// historical report computed it. Non-positive results are rejected.
    Legacy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResidualCount {
    pub distinct_codes: usize,
    pub value: i64,
    pub other_rows: usize,
}

impl ResidualCount {
    pub fn compute(records: &[RawRecord], policy: ResidualPolicy) -> Self {
        let mut codes: HashSet<&str> = HashSet::new();
        let mut other_rows = 0usize;
        for r in records {
            if assign_area(&r.area_code).is_other() {
                other_rows += 1;
                if !r.area_code.is_empty() {
                    codes.insert(r.area_code.as_str());
                }
            }
        }
        let distinct_codes = codes.len();
        let value = match policy {
            ResidualPolicy::Distinct => distinct_codes as i64,
            ResidualPolicy::Legacy => distinct_codes as i64 - named_area_count() as i64,
        };
        ResidualCount {
            distinct_codes,
            value,
            other_rows,
        }
    }

    /// Fail when Other Areas rows exist but there is nothing sane to divide by.
    pub fn check(&self) -> Result<()> {
        if self.other_rows > 0 && self.value <= 0 {
            return Err(ReportError::ProrationUndefined {
                residual: self.value,
                distinct_codes: self.distinct_codes,
                other_rows: self.other_rows,
            });
        }
        Ok(())
    }

    /// Multiplier applied to every count of a row in `area`.
    pub fn scale_factor(&self, area: AreaLabel) -> f64 {
        match area {
            AreaLabel::Named(_) => 1.0,
            AreaLabel::OtherAreas => 1.0 / self.value as f64,
        }
    }
}

/// Assign areas, prorate counts and derive row-level rates.
pub fn derive_records(
    records: Vec<RawRecord>,
    policy: ResidualPolicy,
) -> Result<(Vec<DerivedRecord>, ResidualCount)> {
    let residual = ResidualCount::compute(&records, policy);
    if let Err(e) = residual.check() {
        warn!("{}", e);
        return Err(e);
    }
    info!(
        "Prorating {} Other Areas rows across {} residual areas ({:?} policy)",
        residual.other_rows, residual.value, policy
    );

    let derived = records
        .into_iter()
        .map(|raw| {
            let area = assign_area(&raw.area_code);
            let derived = raw.counts.prorate(residual.scale_factor(area));
            let rates = derive_rates(&derived);
            DerivedRecord {
                raw,
                area,
                derived,
                rates,
            }
        })
        .collect();
    Ok((derived, residual))
}
