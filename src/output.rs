//! Display formatting for records.
//!
//! Averages are shown to one decimal place; stored values keep full precision.

use anyhow::Result;
use tracing::{debug, info};

use crate::record::{Metric, MetricStats, Record};

/// Renders an average to one decimal place, or `-` when nothing was observed.
pub fn format_average(stats: MetricStats) -> String {
    match stats.observed_average() {
        Some(avg) => format!("{avg:.1}"),
        None => "-".to_string(),
    }
}

/// `"3.3 (n=3)"` style summary of one metric.
pub fn format_metric(stats: MetricStats) -> String {
    format!("{} (n={})", format_average(stats), stats.count)
}

/// Logs each record as a single structured line.
pub fn print_records(records: &[Record]) {
    for r in records {
        let summary = Metric::ALL
            .iter()
            .map(|&m| format!("{}={}", m.label(), format_metric(r.metric(m))))
            .collect::<Vec<_>>()
            .join(" ");
        info!(university = %r.university, course = %r.course, "{}", summary);
        debug!("{:#?}", r);
    }
}

/// Prints records as pretty JSON on stdout.
pub fn print_json(records: &[Record]) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(records)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_average_one_decimal() {
        let stats = MetricStats {
            average: 10.0 / 3.0,
            count: 3,
        };
        assert_eq!(format_average(stats), "3.3");

        let stats = MetricStats {
            average: 700.0,
            count: 1,
        };
        assert_eq!(format_average(stats), "700.0");
    }

    #[test]
    fn test_format_average_rounds() {
        let stats = MetricStats {
            average: 2.36,
            count: 5,
        };
        assert_eq!(format_average(stats), "2.4");
    }

    #[test]
    fn test_format_average_unobserved() {
        assert_eq!(format_average(MetricStats::default()), "-");
    }

    #[test]
    fn test_format_metric_includes_count() {
        let stats = MetricStats {
            average: 7.0 / 3.0,
            count: 3,
        };
        assert_eq!(format_metric(stats), "2.3 (n=3)");
    }

    #[test]
    fn test_print_records_does_not_panic() {
        print_records(&[Record::empty("A", "X")]);
    }

    #[test]
    fn test_print_json_does_not_panic() {
        print_json(&[Record::empty("A", "X")]).unwrap();
    }
}
