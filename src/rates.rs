//! Funnel ratio policy shared by every view.
//!
//! The two conversion rates are guarded and fall back to `0` when there is no
//! agenda. Cancellation, reschedule and show rates are not guarded: a zero
//! denominator yields `NaN` (or an infinity) which travels on as data.

use crate::types::{Counts, Rates};
use crate::util::mean_defined;

fn guarded(numerator: f64, denominator: f64) -> f64 {
    if denominator != 0.0 {
        numerator / denominator
    } else {
        0.0
    }
}

fn unguarded(numerator: f64, denominator: f64) -> f64 {
    numerator / denominator
}

/// Compute the five rates from a set of counts, row-level or summed.
pub fn derive_rates(counts: &Counts) -> Rates {
    Rates {
        conversion_to_test: guarded(counts.opportunity_test, counts.agenda),
        conversion_to_trial: guarded(counts.net_trial, counts.agenda),
        cancellation: unguarded(counts.cancelled, counts.cancelled + counts.agenda),
        reschedule: unguarded(counts.rescheduled, counts.all_appointments),
        show: unguarded(counts.completed, counts.agenda),
    }
}

/// Per-field mean of already computed rates, skipping undefined values.
pub fn mean_rates(rates: &[Rates]) -> Rates {
    let field = |pick: fn(&Rates) -> f64| {
        let values: Vec<f64> = rates.iter().map(pick).collect();
        mean_defined(&values)
    };
    Rates {
        conversion_to_test: field(|r| r.conversion_to_test),
        conversion_to_trial: field(|r| r.conversion_to_trial),
        cancellation: field(|r| r.cancellation),
        reschedule: field(|r| r.reschedule),
        show: field(|r| r.show),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn counts(agenda: f64, cancelled: f64, completed: f64, rescheduled: f64, all: f64) -> Counts {
        Counts::from_raw(agenda, 4.0, completed, cancelled, 2.0, rescheduled, all)
    }

    #[test]
    fn rates_from_counts() {
        let r = derive_rates(&counts(8.0, 2.0, 6.0, 1.0, 10.0));
        assert_eq!(r.conversion_to_test, 0.5);
        assert_eq!(r.conversion_to_trial, 0.25);
        assert_eq!(r.cancellation, 0.2);
        assert_eq!(r.reschedule, 0.1);
        assert_eq!(r.show, 0.75);
    }

    #[test]
    fn conversions_are_guarded_others_are_not() {
        let r = derive_rates(&counts(0.0, 0.0, 0.0, 0.0, 0.0));
        assert_eq!(r.conversion_to_test, 0.0);
        assert_eq!(r.conversion_to_trial, 0.0);
        assert!(r.cancellation.is_nan());
        assert!(r.reschedule.is_nan());
        assert!(r.show.is_nan());
    }

    #[test]
    fn nonzero_over_zero_is_infinite() {
        let r = derive_rates(&counts(0.0, 0.0, 3.0, 1.0, 0.0));
        assert!(r.show.is_infinite());
        assert!(r.reschedule.is_infinite());
    }

    #[test]
    fn mean_ignores_undefined_rows() {
        let defined = derive_rates(&counts(8.0, 2.0, 6.0, 1.0, 10.0));
        let undefined = derive_rates(&counts(0.0, 0.0, 0.0, 0.0, 0.0));
        let mean = mean_rates(&[defined, undefined]);
        assert_eq!(mean.show, 0.75);
        // Guarded conversions are 0, not undefined, so they do count.
        assert_eq!(mean.conversion_to_test, 0.25);
    }
}
