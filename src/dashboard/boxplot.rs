use crate::error::{FuelError, Result};
use crate::store::{LogRow, parse_timestamp};
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::Serialize;

/// Inclusive time window used to filter log rows.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct DateRange {
    pub start: Option<NaiveDateTime>,
    pub end: Option<NaiveDateTime>,
}

impl DateRange {
    /// Accepts `YYYY-MM-DD` or a full timestamp for either bound. A date-only end covers
    /// the whole day.
    pub fn parse(start: Option<&str>, end: Option<&str>) -> Result<Self> {
        Ok(Self {
            start: start.map(|s| parse_bound(s, NaiveTime::MIN)).transpose()?,
            end: end.map(|s| parse_bound(s, last_second())).transpose()?,
        })
    }

    pub fn contains(&self, time: &NaiveDateTime) -> bool {
        self.start.is_none_or(|start| *time >= start) && self.end.is_none_or(|end| *time <= end)
    }
}

fn last_second() -> NaiveTime {
    NaiveTime::from_hms_opt(23, 59, 59).unwrap_or(NaiveTime::MIN)
}

fn parse_bound(value: &str, time_of_day: NaiveTime) -> Result<NaiveDateTime> {
    let value = value.trim();
    if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        return Ok(date.and_time(time_of_day));
    }
    parse_timestamp(value).ok_or_else(|| FuelError::InvalidDate(value.to_string()))
}

/// Five-number summary plus outliers for one timestamp.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BoxSummary {
    pub timestamp: String,
    pub count: usize,
    pub min: f64,
    pub q1: f64,
    pub median: f64,
    pub q3: f64,
    pub max: f64,
    pub lower_whisker: f64,
    pub upper_whisker: f64,
    pub outliers: Vec<f64>,
}

impl BoxSummary {
    pub fn from_prices(timestamp: &str, prices: &[f64]) -> Option<Self> {
        if prices.is_empty() {
            return None;
        }
        let mut sorted = prices.to_vec();
        sorted.sort_by(f64::total_cmp);

        let q1 = quantile(&sorted, 0.25);
        let median = quantile(&sorted, 0.5);
        let q3 = quantile(&sorted, 0.75);
        let iqr = q3 - q1;
        let low_fence = q1 - 1.5 * iqr;
        let high_fence = q3 + 1.5 * iqr;

        let inside: Vec<f64> = sorted
            .iter()
            .copied()
            .filter(|p| *p >= low_fence && *p <= high_fence)
            .collect();
        let outliers = sorted
            .iter()
            .copied()
            .filter(|p| *p < low_fence || *p > high_fence)
            .collect();

        Some(Self {
            timestamp: timestamp.to_string(),
            count: sorted.len(),
            min: sorted[0],
            q1,
            median,
            q3,
            max: sorted[sorted.len() - 1],
            lower_whisker: inside.first().copied().unwrap_or(q1),
            upper_whisker: inside.last().copied().unwrap_or(q3),
            outliers,
        })
    }
}

// linear interpolation between closest ranks
fn quantile(sorted: &[f64], p: f64) -> f64 {
    let pos = p * (sorted.len() - 1) as f64;
    let lower = pos.floor() as usize;
    let upper = pos.ceil() as usize;
    let frac = pos - lower as f64;
    sorted[lower] + (sorted[upper] - sorted[lower]) * frac
}

/// One box per log row inside the range, in log order.
pub fn summarize(rows: &[LogRow], range: &DateRange) -> Vec<BoxSummary> {
    rows.iter()
        .filter(|row| range.contains(&row.time))
        .filter_map(|row| BoxSummary::from_prices(&row.reading.timestamp, &row.reading.prices))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Reading;

    fn row(ts: &str, prices: &[f64]) -> LogRow {
        LogRow {
            time: parse_timestamp(ts).unwrap(),
            reading: Reading::new(ts, prices.to_vec()),
        }
    }

    #[test]
    fn quartiles_interpolate() {
        let summary = BoxSummary::from_prices("t", &[4.0, 1.0, 3.0, 2.0]).unwrap();
        assert_eq!(summary.min, 1.0);
        assert_eq!(summary.q1, 1.75);
        assert_eq!(summary.median, 2.5);
        assert_eq!(summary.q3, 3.25);
        assert_eq!(summary.max, 4.0);
        assert!(summary.outliers.is_empty());
        assert_eq!(summary.lower_whisker, 1.0);
        assert_eq!(summary.upper_whisker, 4.0);
    }

    #[test]
    fn far_prices_become_outliers() {
        let prices = [160.9, 161.9, 163.9, 165.9, 165.9, 169.9, 169.9, 169.9, 210.0];
        let summary = BoxSummary::from_prices("t", &prices).unwrap();
        assert_eq!(summary.outliers, vec![210.0]);
        assert_eq!(summary.upper_whisker, 169.9);
        assert_eq!(summary.lower_whisker, 160.9);
        assert_eq!(summary.max, 210.0);
    }

    #[test]
    fn single_price_box_collapses() {
        let summary = BoxSummary::from_prices("t", &[171.5]).unwrap();
        assert_eq!(summary.q1, 171.5);
        assert_eq!(summary.q3, 171.5);
        assert_eq!(summary.lower_whisker, 171.5);
        assert!(BoxSummary::from_prices("t", &[]).is_none());
    }

    #[test]
    fn range_filters_rows() {
        let rows = vec![
            row("2024-11-21T16:00:04", &[160.9]),
            row("2024-11-22T08:00:05", &[161.9]),
            row("2024-11-22T16:00:04", &[162.9]),
            row("2024-11-23T08:00:02", &[163.9]),
        ];
        let range = DateRange::parse(Some("2024-11-22"), Some("2024-11-22")).unwrap();
        let stamps: Vec<_> = summarize(&rows, &range)
            .into_iter()
            .map(|s| s.timestamp)
            .collect();
        assert_eq!(stamps, vec!["2024-11-22T08:00:05", "2024-11-22T16:00:04"]);

        assert_eq!(summarize(&rows, &DateRange::default()).len(), 4);
    }

    #[test]
    fn range_accepts_timestamps_and_rejects_garbage() {
        let range = DateRange::parse(Some("2024-11-22T12:00:00"), None).unwrap();
        assert!(!range.contains(&parse_timestamp("2024-11-22T08:00:05").unwrap()));
        assert!(range.contains(&parse_timestamp("2024-11-22T16:00:04").unwrap()));
        assert!(matches!(
            DateRange::parse(Some("last week"), None),
            Err(FuelError::InvalidDate(_))
        ));
    }
}
