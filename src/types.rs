use chrono::NaiveDate;
use serde::{Serialize, Serializer};
use std::fmt;
use std::ops::AddAssign;
use tabled::Tabled;

/// Organisational bucket a shop is reported under.
///
/// Ordering puts the named areas first (alphabetically by label) and the
/// residual bucket last, which is also the order the views emit groups in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum AreaLabel {
    Named(&'static str),
    OtherAreas,
}

impl AreaLabel {
    pub const OTHER_AREAS: &'static str = "Other Areas";

    pub fn as_str(&self) -> &'static str {
        match self {
            AreaLabel::Named(label) => *label,
            AreaLabel::OtherAreas => Self::OTHER_AREAS,
        }
    }

    pub fn is_other(&self) -> bool {
        matches!(self, AreaLabel::OtherAreas)
    }
}

impl fmt::Display for AreaLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for AreaLabel {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// The eight count metrics carried through every stage.
///
/// On a raw record `total_appointments` is `agenda + cancelled`; on a
/// derived record it is the prorated version of the same sum.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Counts {
    pub all_appointments: f64,
    pub total_appointments: f64,
    pub cancelled: f64,
    pub rescheduled: f64,
    pub agenda: f64,
    pub completed: f64,
    pub opportunity_test: f64,
    pub net_trial: f64,
}

impl Counts {
    /// Build raw counts from the seven source columns.
    pub fn from_raw(
        agenda: f64,
        opportunity_test: f64,
        completed: f64,
        cancelled: f64,
        net_trial: f64,
        rescheduled: f64,
        all_appointments: f64,
    ) -> Self {
        Counts {
            all_appointments,
            total_appointments: agenda + cancelled,
            cancelled,
            rescheduled,
            agenda,
            completed,
            opportunity_test,
            net_trial,
        }
    }

    /// Multiply every metric by `scale`.
    ///
    /// The total is recomputed from agenda + cancelled so that a zero total
    /// stays zero whatever the scale is.
    pub fn prorate(&self, scale: f64) -> Self {
        let booked = self.agenda + self.cancelled;
        Counts {
            all_appointments: self.all_appointments * scale,
            total_appointments: if booked != 0.0 { booked * scale } else { 0.0 },
            cancelled: self.cancelled * scale,
            rescheduled: self.rescheduled * scale,
            agenda: self.agenda * scale,
            completed: self.completed * scale,
            opportunity_test: self.opportunity_test * scale,
            net_trial: self.net_trial * scale,
        }
    }
}

impl AddAssign for Counts {
    fn add_assign(&mut self, rhs: Counts) {
        self.all_appointments += rhs.all_appointments;
        self.total_appointments += rhs.total_appointments;
        self.cancelled += rhs.cancelled;
        self.rescheduled += rhs.rescheduled;
        self.agenda += rhs.agenda;
        self.completed += rhs.completed;
        self.opportunity_test += rhs.opportunity_test;
        self.net_trial += rhs.net_trial;
    }
}

/// The five funnel ratios. Undefined values are `NaN` (or infinite when a
/// non-zero numerator meets a zero denominator).
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Rates {
    pub conversion_to_test: f64,
    pub conversion_to_trial: f64,
    pub cancellation: f64,
    pub reschedule: f64,
    pub show: f64,
}

/// One row of the source export after normalisation and window filtering.
#[derive(Debug, Clone, PartialEq)]
pub struct RawRecord {
    pub date: NaiveDate,
    pub iso_week: u32,
    pub area_code: String,
    pub area_manager: String,
    pub shop_label: String,
    pub counts: Counts,
}

/// A raw record with its area, prorated counts and row-level rates.
#[derive(Debug, Clone, PartialEq)]
pub struct DerivedRecord {
    pub raw: RawRecord,
    pub area: AreaLabel,
    pub derived: Counts,
    pub rates: Rates,
}

impl DerivedRecord {
    /// Agenda + cancelled before proration.
    pub fn total_appointments_raw(&self) -> f64 {
        self.raw.counts.total_appointments
    }
}

/// The thirteen metrics a time series can be drawn for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Metric {
    AllAppointments,
    TotalAppointments,
    AppointmentsCancelled,
    AppointmentsRescheduled,
    AgendaAppointments,
    AppointmentsCompleted,
    OpportunityTest,
    NetTrialActivated,
    ConversionToTest,
    ConversionToTrial,
    CancellationRate,
    RescheduleRate,
    ShowRate,
}

impl Metric {
    pub const ALL: [Metric; 13] = [
        Metric::AllAppointments,
        Metric::TotalAppointments,
        Metric::AppointmentsCancelled,
        Metric::AppointmentsRescheduled,
        Metric::AgendaAppointments,
        Metric::AppointmentsCompleted,
        Metric::OpportunityTest,
        Metric::NetTrialActivated,
        Metric::ConversionToTest,
        Metric::ConversionToTrial,
        Metric::CancellationRate,
        Metric::RescheduleRate,
        Metric::ShowRate,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Metric::AllAppointments => "All Appointments",
            Metric::TotalAppointments => "Total Appointments",
            Metric::AppointmentsCancelled => "Appointments Cancelled",
            Metric::AppointmentsRescheduled => "Appointments Rescheduled",
            Metric::AgendaAppointments => "Agenda Appointments",
            Metric::AppointmentsCompleted => "Appointments Completed",
            Metric::OpportunityTest => "Opportunity Test",
            Metric::NetTrialActivated => "Net Trial Activated",
            Metric::ConversionToTest => "Appointment to test: Conversion rate",
            Metric::ConversionToTrial => "Appointment to trial: Conversion rate",
            Metric::CancellationRate => "Cancellation rate",
            Metric::RescheduleRate => "Reschedule rate",
            Metric::ShowRate => "Show rate",
        }
    }

    pub fn is_rate(&self) -> bool {
        matches!(
            self,
            Metric::ConversionToTest
                | Metric::ConversionToTrial
                | Metric::CancellationRate
                | Metric::RescheduleRate
                | Metric::ShowRate
        )
    }

    pub fn from_label(label: &str) -> Option<Metric> {
        Metric::ALL.into_iter().find(|m| m.label() == label.trim())
    }

    /// Pick this metric out of a group's counts and rates.
    pub fn value(&self, counts: &Counts, rates: &Rates) -> f64 {
        match self {
            Metric::AllAppointments => counts.all_appointments,
            Metric::TotalAppointments => counts.total_appointments,
            Metric::AppointmentsCancelled => counts.cancelled,
            Metric::AppointmentsRescheduled => counts.rescheduled,
            Metric::AgendaAppointments => counts.agenda,
            Metric::AppointmentsCompleted => counts.completed,
            Metric::OpportunityTest => counts.opportunity_test,
            Metric::NetTrialActivated => counts.net_trial,
            Metric::ConversionToTest => rates.conversion_to_test,
            Metric::ConversionToTrial => rates.conversion_to_trial,
            Metric::CancellationRate => rates.cancellation,
            Metric::RescheduleRate => rates.reschedule,
            Metric::ShowRate => rates.show,
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AreaSummaryRow {
    pub area: AreaLabel,
    pub counts: Counts,
    pub rates: Rates,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimeSeriesRow {
    pub iso_week: u32,
    pub area: AreaLabel,
    pub counts: Counts,
    pub mean_rates: Rates,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ShopPivotRow {
    pub shop: String,
    pub area_manager: String,
    pub counts: Counts,
    pub rates: Rates,
}

/// Values of one metric over the weeks of one area.
#[derive(Debug, Clone, PartialEq)]
pub struct AreaSeries {
    pub area: AreaLabel,
    pub points: Vec<(u32, f64)>,
}

#[derive(Debug, Serialize, Tabled, Clone)]
pub struct AreaSummaryDisplay {
    #[serde(rename = "Areas")]
    #[tabled(rename = "Areas")]
    pub area: String,
    #[serde(rename = "All Appointments")]
    #[tabled(rename = "All Appointments")]
    pub all_appointments: String,
    #[serde(rename = "Total Appointments")]
    #[tabled(rename = "Total Appointments")]
    pub total_appointments: String,
    #[serde(rename = "Appointments Cancelled")]
    #[tabled(rename = "Appointments Cancelled")]
    pub cancelled: String,
    #[serde(rename = "Appointments Rescheduled")]
    #[tabled(rename = "Appointments Rescheduled")]
    pub rescheduled: String,
    #[serde(rename = "Agenda Appointments")]
    #[tabled(rename = "Agenda Appointments")]
    pub agenda: String,
    #[serde(rename = "Appointments Completed")]
    #[tabled(rename = "Appointments Completed")]
    pub completed: String,
    #[serde(rename = "Opportunity Test")]
    #[tabled(rename = "Opportunity Test")]
    pub opportunity_test: String,
    #[serde(rename = "Net Trial Activated")]
    #[tabled(rename = "Net Trial Activated")]
    pub net_trial: String,
    #[serde(rename = "Appointment to test: Conversion rate")]
    #[tabled(rename = "Appointment to test: Conversion rate")]
    pub conversion_to_test: String,
    #[serde(rename = "Appointment to trial: Conversion rate")]
    #[tabled(rename = "Appointment to trial: Conversion rate")]
    pub conversion_to_trial: String,
    #[serde(rename = "Cancellation rate")]
    #[tabled(rename = "Cancellation rate")]
    pub cancellation: String,
    #[serde(rename = "Reschedule rate")]
    #[tabled(rename = "Reschedule rate")]
    pub reschedule: String,
    #[serde(rename = "Show rate")]
    #[tabled(rename = "Show rate")]
    pub show: String,
}

#[derive(Debug, Serialize, Tabled, Clone)]
pub struct SeriesPointDisplay {
    #[serde(rename = "ISO Week")]
    #[tabled(rename = "ISO Week")]
    pub iso_week: u32,
    #[serde(rename = "Areas")]
    #[tabled(rename = "Areas")]
    pub area: String,
    #[serde(rename = "Value")]
    #[tabled(rename = "Value")]
    pub value: String,
}

#[derive(Debug, Serialize, Tabled, Clone)]
pub struct ShopPivotDisplay {
    #[serde(rename = "Shop[Shop Code - Descr]")]
    #[tabled(rename = "Shop[Shop Code - Descr]")]
    pub shop: String,
    #[serde(rename = "Shop[Area Manager]")]
    #[tabled(rename = "Shop[Area Manager]")]
    pub area_manager: String,
    #[serde(rename = "Agenda_Appointments__Heads_")]
    #[tabled(rename = "Agenda_Appointments__Heads_")]
    pub agenda: String,
    #[serde(rename = "Appointments_Cancelled")]
    #[tabled(rename = "Appointments_Cancelled")]
    pub cancelled: String,
    #[serde(rename = "Appointments_Completed")]
    #[tabled(rename = "Appointments_Completed")]
    pub completed: String,
    #[serde(rename = "FP_ALL_Appointments")]
    #[tabled(rename = "FP_ALL_Appointments")]
    pub all_appointments: String,
    #[serde(rename = "FP_Appointments_Rescheduled")]
    #[tabled(rename = "FP_Appointments_Rescheduled")]
    pub rescheduled: String,
    #[serde(rename = "Net_Trial_Activated__Heads_")]
    #[tabled(rename = "Net_Trial_Activated__Heads_")]
    pub net_trial: String,
    #[serde(rename = "Opportunity_Test__Heads_")]
    #[tabled(rename = "Opportunity_Test__Heads_")]
    pub opportunity_test: String,
    #[serde(rename = "Total_Appointments")]
    #[tabled(rename = "Total_Appointments")]
    pub total_appointments: String,
    #[serde(rename = "Appointment to test: Conversion rate")]
    #[tabled(rename = "Appointment to test: Conversion rate")]
    pub conversion_to_test: String,
    #[serde(rename = "Appointment to trial: Conversion rate")]
    #[tabled(rename = "Appointment to trial: Conversion rate")]
    pub conversion_to_trial: String,
    #[serde(rename = "Cancellation rate")]
    #[tabled(rename = "Cancellation rate")]
    pub cancellation: String,
    #[serde(rename = "Reschedule rate")]
    #[tabled(rename = "Reschedule rate")]
    pub reschedule: String,
    #[serde(rename = "Show rate")]
    #[tabled(rename = "Show rate")]
    pub show: String,
}
