use std::fmt::Write as _;
use std::io::{self, Write};

use tracing::error;

use crate::units::human_readable;
use crate::{Context, InstanceReport, MeasurementRecord, Reporter};

/// Prints results as a plain text table.
///
/// ```text
/// Benchmarking on 8 X 2400 MHz CPUs
/// Benchmark      Time(ns)    CPU(ns) Iterations
/// ---------------------------------------------
/// vec_push/8           41         41   16777216
/// ```
#[derive(Debug)]
pub struct TextReporter<W> {
    out: W,
    name_field_width: usize,
}

impl TextReporter<io::Stdout> {
    /// A reporter that prints to standard output.
    #[must_use]
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write> TextReporter<W> {
    /// A reporter that prints to `out`.
    #[must_use]
    pub fn new(out: W) -> Self {
        Self {
            out,
            name_field_width: 0,
        }
    }

    /// Returns the underlying writer.
    pub fn into_inner(self) -> W {
        self.out
    }

    fn write_context(&mut self, context: &Context) -> io::Result<()> {
        self.name_field_width = context.name_field_width();

        let plural = if context.cpu_count() > 1 { "s" } else { "" };

        match context.mhz_per_cpu() {
            Some(mhz) => writeln!(
                self.out,
                "Benchmarking on {} X {mhz:.0} MHz CPU{plural}",
                context.cpu_count()
            )?,
            None => writeln!(
                self.out,
                "Benchmarking on {} CPU{plural}",
                context.cpu_count()
            )?,
        }

        if context.cpu_scaling_enabled() {
            writeln!(
                self.out,
                "CPU scaling is enabled: benchmark timings may be noisy."
            )?;
        }

        let header = format!(
            "{:<width$} {:>10} {:>10} {:>10}",
            "Benchmark",
            "Time(ns)",
            "CPU(ns)",
            "Iterations",
            width = self.name_field_width
        );

        writeln!(self.out, "{header}")?;
        writeln!(self.out, "{}", "-".repeat(header.len()))?;

        self.out.flush()
    }

    fn write_runs(&mut self, report: &InstanceReport) -> io::Result<()> {
        for record in report.runs() {
            self.write_record(record)?;
        }

        if let Some(summary) = report.summary() {
            self.write_record(summary.mean())?;
            self.write_record(summary.stddev())?;
            writeln!(self.out)?;
        }

        self.out.flush()
    }

    fn write_record(&mut self, record: &MeasurementRecord) -> io::Result<()> {
        let mut line = format!(
            "{:<width$} {:>10.0} {:>10.0} {:>10}",
            record.name(),
            record.real_seconds_per_iteration() * 1e9,
            record.cpu_seconds_per_iteration() * 1e9,
            record.iterations(),
            width = self.name_field_width
        );

        if record.bytes_per_second() > 0.0 {
            write!(line, " {}B/s", human_readable(record.bytes_per_second()))
                .expect("writing to a String is infallible");
        }

        if record.items_per_second() > 0.0 {
            write!(line, " {} items/s", human_readable(record.items_per_second()))
                .expect("writing to a String is infallible");
        }

        if let Some(label) = record.label() {
            line.push(' ');
            line.push_str(label);
        }

        if let Some(peak) = record.peak_memory_bytes() {
            write!(line, " {}B peak-mem", human_readable(peak))
                .expect("writing to a String is infallible");
        }

        writeln!(self.out, "{}", line.trim_end())
    }
}

impl<W: Write> Reporter for TextReporter<W> {
    fn report_context(&mut self, context: &Context) -> bool {
        match self.write_context(context) {
            Ok(()) => true,
            Err(e) => {
                error!(error = %e, "could not write benchmark context, cancelling run");
                false
            }
        }
    }

    fn report_runs(&mut self, report: &InstanceReport) {
        if let Err(e) = self.write_runs(report) {
            error!(error = %e, "could not write benchmark results");
        }
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::record::ThreadStats;

    fn output(reporter: TextReporter<Vec<u8>>) -> String {
        String::from_utf8(reporter.into_inner()).unwrap()
    }

    #[test]
    fn context_prints_header_sized_to_names() {
        let mut reporter = TextReporter::new(Vec::new());

        assert!(reporter.report_context(&Context::new(4, Some(2400.0), true, 12)));

        let text = output(reporter);
        let lines: Vec<_> = text.lines().collect();

        assert_eq!(lines, vec![
            "Benchmarking on 4 X 2400 MHz CPUs",
            "CPU scaling is enabled: benchmark timings may be noisy.",
            "Benchmark      Time(ns)    CPU(ns) Iterations",
            "---------------------------------------------",
        ]);
    }

    #[test]
    fn runs_and_summary_are_printed() {
        let mut reporter = TextReporter::new(Vec::new());
        assert!(reporter.report_context(&Context::new(1, None, false, 10)));

        let mut first = MeasurementRecord::repetition(
            "bm",
            0,
            1_000,
            Duration::from_micros(2),
            Duration::from_micros(1),
        );
        first.complete(
            ThreadStats {
                bytes_processed: 0,
                items_processed: 1_000,
            },
            false,
            Some("fast"),
            None,
        );

        let second = first.clone();

        reporter.report_runs(&InstanceReport::new(vec![first, second]));

        let text = output(reporter);
        let lines: Vec<_> = text.lines().skip(3).collect();

        assert_eq!(lines, vec![
            "bm                  2          1       1000 953.674Mi items/s fast",
            "bm                  2          1       1000 953.674Mi items/s fast",
            "bm_mean             2          1       2000 953.674Mi items/s fast",
            "bm_stddev           0          0       2000 fast",
            "",
        ]);
    }
}
