//! Staffing capacity aggregation.
//!
//! Computes one [`StaffingFactRow`] per active contributor and period
//! (available, staffed, vacation and planned days, staffing rate and TACE)
//! and hands the rows to a [`FactSink`] in bounded batches.
//!
//! Contributors are independent: invalid records for one contributor are
//! reported as a failure and the run carries on with the others.

use std::collections::BTreeMap;

use chrono::{Datelike, Days, NaiveDate};
use rust_decimal::Decimal;
use tracing::{info, warn};
use uuid::Uuid;

use crate::config::StaffingSettings;
use crate::error::{EngineError, EngineResult};
use crate::models::{FactKey, Granularity, StaffingContributor, StaffingFactRow, YearMonth};

use super::calendar::working_days_between;
use super::cost_resolver::select_period;
use super::rounding::{round_money, safe_percentage};
use super::time_conversion::hours_to_days;

/// One period of a staffing run, bounds inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StaffingPeriod {
    /// First day.
    pub start: NaiveDate,
    /// Last day.
    pub end: NaiveDate,
}

/// Destination of computed fact rows.
///
/// The aggregator performs no deduplication; a sink backed by a store must
/// enforce one row per [`FactKey`].
pub trait FactSink {
    /// Stores a batch of rows.
    fn write_batch(&mut self, rows: &[StaffingFactRow]) -> EngineResult<()>;
}

impl FactSink for Vec<StaffingFactRow> {
    fn write_batch(&mut self, rows: &[StaffingFactRow]) -> EngineResult<()> {
        self.extend_from_slice(rows);
        Ok(())
    }
}

/// Keyed sink: a row replaces any earlier row with the same key.
impl FactSink for BTreeMap<FactKey, StaffingFactRow> {
    fn write_batch(&mut self, rows: &[StaffingFactRow]) -> EngineResult<()> {
        for row in rows {
            self.insert(row.key(), row.clone());
        }
        Ok(())
    }
}

/// A contributor skipped by a staffing run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaffingFailure {
    /// The contributor.
    pub contributor_id: String,
    /// Why its rows were not computed.
    pub error: EngineError,
}

/// Summary of a staffing run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AggregationReport {
    /// Identifier of the run, for log correlation.
    pub run_id: Uuid,
    /// Rows handed to the sink.
    pub rows_written: usize,
    /// Batches handed to the sink.
    pub batches_flushed: usize,
    /// Contributors whose inputs were rejected.
    pub failures: Vec<StaffingFailure>,
    /// Data anomalies met along the way, one per contributor at most.
    pub anomalies: Vec<EngineError>,
}

/// Returns the last day of the period starting at `period_start`.
///
/// Monthly and quarterly periods end on the last day of their last month,
/// weekly periods six days after the start. `None` only at the edge of
/// chrono's date range.
pub fn period_end(period_start: NaiveDate, granularity: Granularity) -> Option<NaiveDate> {
    match granularity {
        Granularity::Weekly => period_start.checked_add_days(Days::new(6)),
        Granularity::Monthly => YearMonth::from_date(period_start).last_day(),
        Granularity::Quarterly => YearMonth::from_date(period_start).plus_months(2).last_day(),
    }
}

/// Generates the periods of a run covering `[start, end]`.
///
/// Monthly periods start on the 1st of every month from the month of
/// `start` to the month of `end`. Quarterly periods start on the 1st of
/// January, April, July and October, keeping only starts inside
/// `[start, end]`. Weekly periods start at `start` and step by 7 days.
///
/// # Example
///
/// ```
/// use profitability_engine::calculation::generate_periods;
/// use profitability_engine::models::Granularity;
/// use chrono::NaiveDate;
///
/// let start = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap();
/// let end = NaiveDate::from_ymd_opt(2025, 12, 31).unwrap();
/// let quarters = generate_periods(start, end, Granularity::Quarterly);
///
/// assert_eq!(quarters.len(), 4);
/// assert_eq!(quarters[3].start, NaiveDate::from_ymd_opt(2025, 10, 1).unwrap());
/// assert_eq!(quarters[3].end, end);
/// ```
pub fn generate_periods(
    start: NaiveDate,
    end: NaiveDate,
    granularity: Granularity,
) -> Vec<StaffingPeriod> {
    if end < start {
        return Vec::new();
    }

    let mut starts = Vec::new();

    match granularity {
        Granularity::Weekly => {
            let mut current = Some(start);
            while let Some(day) = current.filter(|d| *d <= end) {
                starts.push(day);
                current = day.checked_add_days(Days::new(7));
            }
        }
        Granularity::Monthly | Granularity::Quarterly => {
            let last = YearMonth::from_date(end);
            let mut month = YearMonth::from_date(start);
            while month <= last {
                if let Some(first) = month.first_day() {
                    match granularity {
                        Granularity::Quarterly if is_quarter_start(first) && first >= start => {
                            starts.push(first)
                        }
                        Granularity::Monthly => starts.push(first),
                        _ => {}
                    }
                }
                month = month.plus_months(1);
            }
        }
    }

    starts
        .into_iter()
        .filter_map(|start| {
            period_end(start, granularity).map(|end| StaffingPeriod { start, end })
        })
        .collect()
}

/// Working days shared by `[start, end]` and the period.
fn overlap_working_days(start: NaiveDate, end: NaiveDate, period: &StaffingPeriod) -> u32 {
    working_days_between(start.max(period.start), end.min(period.end))
}

/// Rejects records with negative hours.
fn validate(staffing: &StaffingContributor) -> EngineResult<()> {
    if let Some(entry) = staffing.timesheets.iter().find(|t| t.hours < Decimal::ZERO) {
        return Err(EngineError::invalid_argument(
            "hours",
            format!("timesheet on {} has negative hours ({})", entry.date, entry.hours),
        ));
    }
    if let Some(planning) = staffing.plannings.iter().find(|p| p.daily_hours < Decimal::ZERO) {
        return Err(EngineError::invalid_argument(
            "daily_hours",
            format!(
                "planning starting {} has negative daily hours ({})",
                planning.start_date, planning.daily_hours
            ),
        ));
    }
    Ok(())
}

fn period_metrics(
    staffing: &StaffingContributor,
    period: &StaffingPeriod,
    granularity: Granularity,
) -> (StaffingFactRow, Option<EngineError>) {
    let contributor = &staffing.contributor;

    let vacation_days: u32 = staffing
        .vacations
        .iter()
        .filter(|v| v.is_approved())
        .map(|v| overlap_working_days(v.start_date, v.end_date, period))
        .sum();
    let working_days = working_days_between(period.start, period.end);
    let available_days = Decimal::from(working_days.saturating_sub(vacation_days));
    let worked_days = available_days;

    let staffed_hours: Decimal = staffing
        .timesheets
        .iter()
        .filter(|t| t.date >= period.start && t.date <= period.end)
        .map(|t| t.hours)
        .sum();
    let staffed_days = round_money(hours_to_days(staffed_hours));

    let planned_days = round_money(
        staffing
            .plannings
            .iter()
            .filter(|p| p.status.is_committed())
            .map(|p| {
                Decimal::from(overlap_working_days(p.start_date, p.end_date, period))
                    * hours_to_days(p.daily_hours)
            })
            .sum(),
    );

    let (employment, anomaly) = select_period(contributor, period.start);
    let profile = employment.and_then(|p| p.profiles.first().cloned());

    let row = StaffingFactRow {
        contributor_id: contributor.id.clone(),
        period_start: period.start,
        period_end: period.end,
        granularity,
        profile,
        contributor_count: 1,
        available_days,
        worked_days,
        staffed_days,
        vacation_days: Decimal::from(vacation_days),
        planned_days,
        staffing_rate: safe_percentage(staffed_days, available_days),
        tace: safe_percentage(staffed_days, worked_days),
    };
    (row, anomaly)
}

/// Computes the staffing metrics of one contributor over one period.
///
/// Returns the fact row and, when the contributor has overlapping
/// employment periods at the period start, the anomaly.
///
/// # Errors
///
/// Returns [`EngineError::InvalidArgument`] when a timesheet has negative
/// hours or a planning negative daily hours.
pub fn calculate_contributor_metrics(
    staffing: &StaffingContributor,
    period: &StaffingPeriod,
    granularity: Granularity,
) -> EngineResult<(StaffingFactRow, Option<EngineError>)> {
    validate(staffing)?;
    Ok(period_metrics(staffing, period, granularity))
}

fn flush<S: FactSink>(
    sink: &mut S,
    buffer: &mut Vec<StaffingFactRow>,
    report: &mut AggregationReport,
) -> EngineResult<()> {
    if buffer.is_empty() {
        return Ok(());
    }
    sink.write_batch(buffer)?;
    report.rows_written += buffer.len();
    report.batches_flushed += 1;
    info!(
        run_id = %report.run_id,
        batch = report.batches_flushed,
        batch_rows = buffer.len(),
        rows_written = report.rows_written,
        "Flushed staffing fact batch"
    );
    buffer.clear();
    Ok(())
}

/// Computes and stores the staffing fact rows of every active contributor
/// over every period of `[start, end]`.
///
/// # Arguments
///
/// * `contributors` - Contributors with their vacations, timesheets and plannings
/// * `start` - First day of the range
/// * `end` - Last day of the range
/// * `granularity` - Period unit
/// * `settings` - Staffing settings (batch size)
/// * `sink` - Receives the rows in batches
///
/// # Errors
///
/// Returns [`EngineError::InvalidArgument`] when `end` is before `start`,
/// or the sink's error when a batch cannot be stored. Invalid contributor
/// records are not errors; they are reported in
/// [`AggregationReport::failures`].
pub fn aggregate_staffing_metrics<S: FactSink>(
    contributors: &[StaffingContributor],
    start: NaiveDate,
    end: NaiveDate,
    granularity: Granularity,
    settings: &StaffingSettings,
    sink: &mut S,
) -> EngineResult<AggregationReport> {
    if end < start {
        return Err(EngineError::invalid_argument(
            "period",
            format!("end {} is before start {}", end, start),
        ));
    }

    let periods = generate_periods(start, end, granularity);
    let batch_size = settings.batch_size.max(1);
    let mut report = AggregationReport {
        run_id: Uuid::new_v4(),
        rows_written: 0,
        batches_flushed: 0,
        failures: Vec::new(),
        anomalies: Vec::new(),
    };

    info!(
        run_id = %report.run_id,
        granularity = %granularity,
        start = %start,
        end = %end,
        periods = periods.len(),
        contributors = contributors.len(),
        "Starting staffing aggregation"
    );

    let mut buffer: Vec<StaffingFactRow> = Vec::with_capacity(batch_size);
    for staffing in contributors.iter().filter(|s| s.contributor.active) {
        let contributor_id = &staffing.contributor.id;

        if let Err(error) = validate(staffing) {
            warn!(
                run_id = %report.run_id,
                contributor_id = %contributor_id,
                error = %error,
                "Skipping contributor with invalid staffing records"
            );
            report.failures.push(StaffingFailure {
                contributor_id: contributor_id.clone(),
                error,
            });
            continue;
        }

        let mut anomaly_seen = false;
        for period in &periods {
            let (row, anomaly) = period_metrics(staffing, period, granularity);
            if let Some(anomaly) = anomaly.filter(|_| !anomaly_seen) {
                report.anomalies.push(anomaly);
                anomaly_seen = true;
            }

            buffer.push(row);
            if buffer.len() >= batch_size {
                flush(sink, &mut buffer, &mut report)?;
            }
        }
    }
    flush(sink, &mut buffer, &mut report)?;

    info!(
        run_id = %report.run_id,
        rows_written = report.rows_written,
        batches_flushed = report.batches_flushed,
        failures = report.failures.len(),
        anomalies = report.anomalies.len(),
        "Finished staffing aggregation"
    );

    Ok(report)
}

/// Returns true when `date` starts a calendar quarter.
pub fn is_quarter_start(date: NaiveDate) -> bool {
    date.day() == 1 && date.month() % 3 == 1
}
