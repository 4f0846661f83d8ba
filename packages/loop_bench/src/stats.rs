//! Reduction of repeated measurements into mean and standard deviation records.

use std::time::Duration;

use crate::{MeasurementRecord, RecordKind};

/// Mean and standard deviation over all repetitions of one benchmark instance.
#[derive(Clone, Debug, PartialEq)]
pub struct Summary {
    mean: MeasurementRecord,
    stddev: MeasurementRecord,
}

impl Summary {
    /// Reduces the records of one benchmark instance.
    ///
    /// Per-iteration times are weighted by the iteration count of each record. Throughput values
    /// are not weighted. The mean record carries the largest peak memory value and the standard
    /// deviation record its spread. A label survives only if every record carries the same one.
    ///
    /// Returns `None` if there are fewer than two records, as a single record is its own mean.
    ///
    /// # Panics
    ///
    /// Panics if the records do not all have the same name.
    #[must_use]
    pub fn from_records(records: &[MeasurementRecord]) -> Option<Self> {
        let (first, rest) = records.split_first()?;

        if rest.is_empty() {
            return None;
        }

        for record in rest {
            assert_eq!(
                record.name(),
                first.name(),
                "only records of the same benchmark can be summarized"
            );
        }

        let mut real = WeightedStat::default();
        let mut cpu = WeightedStat::default();
        let mut bytes_per_second = WeightedStat::default();
        let mut items_per_second = WeightedStat::default();
        let mut peak_memory = WeightedStat::default();
        let mut max_peak_memory: Option<f64> = None;
        let mut total_iterations: u64 = 0;

        for record in records {
            total_iterations = total_iterations.saturating_add(record.iterations());

            #[expect(
                clippy::cast_precision_loss,
                reason = "statistics are floating point, precision loss beyond 2^52 is acceptable"
            )]
            let weight = record.iterations() as f64;

            if record.iterations() > 0 {
                real.add(record.real_seconds_per_iteration(), weight);
                cpu.add(record.cpu_seconds_per_iteration(), weight);
            }

            bytes_per_second.add(record.bytes_per_second(), 1.0);
            items_per_second.add(record.items_per_second(), 1.0);

            if let Some(peak) = record.peak_memory_bytes() {
                peak_memory.add(peak, 1.0);
                max_peak_memory = Some(max_peak_memory.map_or(peak, |max| max.max(peak)));
            }
        }

        let label = first
            .label()
            .filter(|label| rest.iter().all(|record| record.label() == Some(*label)))
            .map(str::to_string);

        #[expect(
            clippy::cast_precision_loss,
            reason = "statistics are floating point, precision loss beyond 2^52 is acceptable"
        )]
        let scale = total_iterations as f64;

        let mean = MeasurementRecord::summary(
            format!("{}_mean", first.name()),
            RecordKind::Mean,
            total_iterations,
            seconds(real.mean() * scale),
            seconds(cpu.mean() * scale),
            bytes_per_second.mean(),
            items_per_second.mean(),
            max_peak_memory,
            label.clone(),
        );

        let stddev = MeasurementRecord::summary(
            format!("{}_stddev", first.name()),
            RecordKind::StdDev,
            total_iterations,
            seconds(real.stddev() * scale),
            seconds(cpu.stddev() * scale),
            bytes_per_second.stddev(),
            items_per_second.stddev(),
            max_peak_memory.map(|_| peak_memory.stddev()),
            label,
        );

        Some(Self { mean, stddev })
    }

    /// The mean record, named `<name>_mean`.
    #[must_use]
    pub fn mean(&self) -> &MeasurementRecord {
        &self.mean
    }

    /// The standard deviation record, named `<name>_stddev`.
    #[must_use]
    pub fn stddev(&self) -> &MeasurementRecord {
        &self.stddev
    }
}

/// Running weighted sums for mean and population standard deviation.
#[derive(Debug, Default)]
struct WeightedStat {
    sum_weights: f64,
    sum: f64,
    sum_squares: f64,
}

impl WeightedStat {
    fn add(&mut self, value: f64, weight: f64) {
        self.sum_weights += weight;
        self.sum += value * weight;
        self.sum_squares += value * value * weight;
    }

    fn mean(&self) -> f64 {
        if self.sum_weights <= 0.0 {
            return 0.0;
        }

        self.sum / self.sum_weights
    }

    fn stddev(&self) -> f64 {
        if self.sum_weights <= 0.0 {
            return 0.0;
        }

        let mean = self.mean();

        // Rounding can push the variance of near-identical values slightly below zero.
        (self.sum_squares / self.sum_weights - mean * mean)
            .max(0.0)
            .sqrt()
    }
}

fn seconds(value: f64) -> Duration {
    Duration::try_from_secs_f64(value).unwrap_or(Duration::ZERO)
}
