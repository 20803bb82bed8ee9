//! Per-(university, course) admissions statistics and the running-mean update.

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// One of the six tracked admissions metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Metric {
    Gmat,
    Gre,
    Experience,
    Gpa,
    Toefl,
    Ielts,
}

impl Metric {
    /// Every metric, in persisted column order.
    pub const ALL: [Metric; 6] = [
        Metric::Gmat,
        Metric::Gre,
        Metric::Experience,
        Metric::Gpa,
        Metric::Toefl,
        Metric::Ielts,
    ];

    /// Form field / column prefix, e.g. `gmat` for `gmat_average`.
    pub fn key(self) -> &'static str {
        match self {
            Metric::Gmat => "gmat",
            Metric::Gre => "gre",
            Metric::Experience => "experience",
            Metric::Gpa => "gpa",
            Metric::Toefl => "toefl",
            Metric::Ielts => "ielts",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Metric::Gmat => "GMAT",
            Metric::Gre => "GRE",
            Metric::Experience => "Experience",
            Metric::Gpa => "GPA",
            Metric::Toefl => "TOEFL",
            Metric::Ielts => "IELTS",
        }
    }

    /// Experience and GPA must be reported on every observation.
    pub fn is_required(self) -> bool {
        matches!(self, Metric::Experience | Metric::Gpa)
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Average and observation count for one metric of a [`Record`].
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct MetricStats {
    pub average: f64,
    pub count: u64,
}

impl MetricStats {
    /// The average, or `None` when nothing has been observed yet.
    pub fn observed_average(&self) -> Option<f64> {
        (self.count > 0).then_some(self.average)
    }
}

/// Folds `value` into a mean of `count` earlier values.
///
/// A zero count ignores whatever `average` holds.
pub fn running_mean(average: f64, count: u64, value: f64) -> f64 {
    if count == 0 {
        return value;
    }
    let n = count as f64;
    (average * n + value) / (n + 1.0)
}

/// Trims and lowercases a course name for comparison.
pub fn normalize_course(course: &str) -> String {
    course.trim().to_lowercase()
}

/// Reads an average cell, treating a blank cell as `0.0`.
///
/// Seed files leave the average of an unobserved metric empty.
fn blank_as_zero<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<f64>::deserialize(deserializer)?.unwrap_or(0.0))
}

/// One row of the stats store. Field order is the persisted column order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub university: String,
    pub course: String,

    #[serde(deserialize_with = "blank_as_zero")]
    pub gmat_average: f64,
    pub gmat_count: u64,
    #[serde(deserialize_with = "blank_as_zero")]
    pub gre_average: f64,
    pub gre_count: u64,
    #[serde(deserialize_with = "blank_as_zero")]
    pub experience_average: f64,
    pub experience_count: u64,
    #[serde(deserialize_with = "blank_as_zero")]
    pub gpa_average: f64,
    pub gpa_count: u64,
    #[serde(deserialize_with = "blank_as_zero")]
    pub toefl_average: f64,
    pub toefl_count: u64,
    #[serde(deserialize_with = "blank_as_zero")]
    pub ielts_average: f64,
    pub ielts_count: u64,
}

impl Record {
    /// A record with no observations for any metric.
    pub fn empty(university: &str, course: &str) -> Self {
        Record {
            university: university.to_string(),
            course: course.to_string(),
            gmat_average: 0.0,
            gmat_count: 0,
            gre_average: 0.0,
            gre_count: 0,
            experience_average: 0.0,
            experience_count: 0,
            gpa_average: 0.0,
            gpa_count: 0,
            toefl_average: 0.0,
            toefl_count: 0,
            ielts_average: 0.0,
            ielts_count: 0,
        }
    }

    /// Sets one metric's stats, for seeding.
    pub fn with_metric(mut self, metric: Metric, average: f64, count: u64) -> Self {
        let (avg, n) = self.metric_mut(metric);
        *avg = average;
        *n = count;
        self
    }

    pub fn metric(&self, metric: Metric) -> MetricStats {
        let (average, count) = match metric {
            Metric::Gmat => (self.gmat_average, self.gmat_count),
            Metric::Gre => (self.gre_average, self.gre_count),
            Metric::Experience => (self.experience_average, self.experience_count),
            Metric::Gpa => (self.gpa_average, self.gpa_count),
            Metric::Toefl => (self.toefl_average, self.toefl_count),
            Metric::Ielts => (self.ielts_average, self.ielts_count),
        };
        MetricStats { average, count }
    }

    fn metric_mut(&mut self, metric: Metric) -> (&mut f64, &mut u64) {
        match metric {
            Metric::Gmat => (&mut self.gmat_average, &mut self.gmat_count),
            Metric::Gre => (&mut self.gre_average, &mut self.gre_count),
            Metric::Experience => (&mut self.experience_average, &mut self.experience_count),
            Metric::Gpa => (&mut self.gpa_average, &mut self.gpa_count),
            Metric::Toefl => (&mut self.toefl_average, &mut self.toefl_count),
            Metric::Ielts => (&mut self.ielts_average, &mut self.ielts_count),
        }
    }

    /// Folds a single value into `metric`'s running mean.
    pub fn observe(&mut self, metric: Metric, value: f64) {
        let (average, count) = self.metric_mut(metric);
        *average = running_mean(*average, *count, value);
        *count += 1;
    }

    /// Folds every metric present in `observation`; absent metrics are untouched.
    pub fn apply(&mut self, observation: &Observation) {
        for (metric, value) in observation.values() {
            self.observe(metric, value);
        }
    }

    pub fn is_key(&self, university: &str, course: &str) -> bool {
        self.university == university && self.course == course
    }

    pub fn matches_course(&self, normalized: &str) -> bool {
        normalize_course(&self.course) == normalized
    }
}

/// One submitted set of metric values.
///
/// Experience and GPA are always present; the test scores are optional.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Observation {
    pub experience: f64,
    pub gpa: f64,
    pub gmat: Option<f64>,
    pub gre: Option<f64>,
    pub toefl: Option<f64>,
    pub ielts: Option<f64>,
}

impl Observation {
    pub fn new(experience: f64, gpa: f64) -> Self {
        Observation {
            experience,
            gpa,
            gmat: None,
            gre: None,
            toefl: None,
            ielts: None,
        }
    }

    /// Sets an optional metric. Required metrics are overwritten too.
    pub fn with(mut self, metric: Metric, value: f64) -> Self {
        match metric {
            Metric::Gmat => self.gmat = Some(value),
            Metric::Gre => self.gre = Some(value),
            Metric::Experience => self.experience = value,
            Metric::Gpa => self.gpa = value,
            Metric::Toefl => self.toefl = Some(value),
            Metric::Ielts => self.ielts = Some(value),
        }
        self
    }

    pub fn get(&self, metric: Metric) -> Option<f64> {
        match metric {
            Metric::Gmat => self.gmat,
            Metric::Gre => self.gre,
            Metric::Experience => Some(self.experience),
            Metric::Gpa => Some(self.gpa),
            Metric::Toefl => self.toefl,
            Metric::Ielts => self.ielts,
        }
    }

    /// Present metrics with their values, in column order.
    pub fn values(&self) -> impl Iterator<Item = (Metric, f64)> + '_ {
        Metric::ALL
            .iter()
            .filter_map(move |&m| self.get(m).map(|v| (m, v)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-9;

    fn mean(values: &[f64]) -> f64 {
        values.iter().sum::<f64>() / values.len() as f64
    }

    #[test]
    fn test_first_observation_becomes_average() {
        let mut r = Record::empty("A", "X");
        r.observe(Metric::Gmat, 710.0);

        assert_eq!(r.metric(Metric::Gmat), MetricStats { average: 710.0, count: 1 });
    }

    #[test]
    fn test_zero_count_ignores_stale_average() {
        let mut r = Record::empty("A", "X").with_metric(Metric::Gre, 999.0, 0);
        r.observe(Metric::Gre, 320.0);

        assert_eq!(r.gre_average, 320.0);
        assert_eq!(r.gre_count, 1);
    }

    #[test]
    fn test_sequential_observations_yield_mean() {
        let values = [3.1, 3.9, 2.7, 4.0, 3.3, 3.55];
        let mut r = Record::empty("A", "X");
        for v in values {
            r.observe(Metric::Gpa, v);
        }

        let stats = r.metric(Metric::Gpa);
        assert_eq!(stats.count, values.len() as u64);
        assert!((stats.average - mean(&values)).abs() < EPS);
    }

    #[test]
    fn test_omitted_metrics_are_untouched() {
        let before = Record::empty("A", "X")
            .with_metric(Metric::Toefl, 101.123456789, 7)
            .with_metric(Metric::Ielts, 7.25, 3);
        let mut after = before.clone();
        after.apply(&Observation::new(2.0, 3.5));

        for m in [Metric::Gmat, Metric::Gre, Metric::Toefl, Metric::Ielts] {
            assert_eq!(after.metric(m).count, before.metric(m).count);
            assert_eq!(
                after.metric(m).average.to_bits(),
                before.metric(m).average.to_bits()
            );
        }
        assert_eq!(after.experience_count, 1);
        assert_eq!(after.gpa_count, 1);
    }

    #[test]
    fn test_seeded_update_example() {
        let mut r = Record::empty("A", "X")
            .with_metric(Metric::Gpa, 3.0, 2)
            .with_metric(Metric::Experience, 2.0, 2);
        r.apply(&Observation::new(3.0, 4.0).with(Metric::Gmat, 700.0));

        assert!((r.gpa_average - 10.0 / 3.0).abs() < EPS);
        assert_eq!(r.gpa_count, 3);
        assert!((r.experience_average - 7.0 / 3.0).abs() < EPS);
        assert_eq!(r.experience_count, 3);
        assert_eq!(r.gmat_average, 700.0);
        assert_eq!(r.gmat_count, 1);
        assert_eq!(r.gre_count, 0);
    }

    #[test]
    fn test_observation_values_order_and_presence() {
        let obs = Observation::new(1.5, 3.2).with(Metric::Ielts, 7.0);
        let got: Vec<_> = obs.values().collect();

        assert_eq!(
            got,
            vec![
                (Metric::Experience, 1.5),
                (Metric::Gpa, 3.2),
                (Metric::Ielts, 7.0)
            ]
        );
    }

    #[test]
    fn test_normalize_course() {
        assert_eq!(normalize_course(" MBA "), "mba");
        assert_eq!(normalize_course("Mba"), "mba");
        assert_eq!(normalize_course("mba"), "mba");
    }

    #[test]
    fn test_observed_average_hides_empty_metric() {
        let r = Record::empty("A", "X").with_metric(Metric::Gmat, 0.0, 0);
        assert_eq!(r.metric(Metric::Gmat).observed_average(), None);
    }

    #[test]
    fn test_required_metrics() {
        let required: Vec<_> = Metric::ALL.iter().filter(|m| m.is_required()).collect();
        assert_eq!(required, vec![&Metric::Experience, &Metric::Gpa]);
    }
}
