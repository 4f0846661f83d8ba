use std::fmt::Debug;
use std::fs;
use std::num::NonZero;
use std::path::Path;

use many_cpus::ProcessorSet;
use tracing::warn;

/// Answers questions about the hardware the benchmarks run on.
#[cfg_attr(test, mockall::automock)]
pub trait SystemInfo: Debug + Send + Sync {
    /// Number of logical processors available to the process.
    fn cpu_count(&self) -> NonZero<usize>;

    /// Nominal processor clock speed, if the operating system reports one.
    fn cpu_mhz(&self) -> Option<f64>;

    /// Whether processor frequency scaling may make timings noisy.
    fn cpu_scaling_enabled(&self) -> bool;
}

/// The hardware of the current process, as reported by the operating system.
///
/// Clock speed and frequency scaling are only detected on Linux. Elsewhere the clock speed is
/// unknown and scaling is assumed to be disabled.
#[derive(Clone, Copy, Debug, Default)]
pub struct HostSystem;

const CPUINFO_PATH: &str = "/proc/cpuinfo";
const CPU_SYSFS_PATH: &str = "/sys/devices/system/cpu";

impl SystemInfo for HostSystem {
    #[cfg_attr(test, mutants::skip)] // Depends on the hardware of the test machine.
    fn cpu_count(&self) -> NonZero<usize> {
        NonZero::new(ProcessorSet::default().len()).unwrap_or(NonZero::<usize>::MIN)
    }

    #[cfg_attr(test, mutants::skip)] // Depends on the hardware of the test machine.
    fn cpu_mhz(&self) -> Option<f64> {
        let cpuinfo = fs::read_to_string(CPUINFO_PATH).ok()?;
        parse_cpu_mhz(&cpuinfo)
    }

    #[cfg_attr(test, mutants::skip)] // Depends on the hardware of the test machine.
    fn cpu_scaling_enabled(&self) -> bool {
        let enabled = scaling_enabled_under(Path::new(CPU_SYSFS_PATH), self.cpu_count());

        if enabled {
            warn!("CPU frequency scaling is enabled, benchmark timings may be noisy");
        }

        enabled
    }
}

/// Finds the first `cpu MHz` entry of a Linux `/proc/cpuinfo` listing.
fn parse_cpu_mhz(cpuinfo: &str) -> Option<f64> {
    cpuinfo.lines().find_map(|line| {
        let (key, value) = line.split_once(':')?;

        if key.trim() != "cpu MHz" {
            return None;
        }

        value.trim().parse().ok()
    })
}

/// Whether any of the first `cpu_count` processors has a frequency governor other than
/// `performance`. Processors whose governor cannot be read are skipped.
fn scaling_enabled_under(sysfs_cpu: &Path, cpu_count: NonZero<usize>) -> bool {
    (0..cpu_count.get()).any(|index| {
        let governor_path = sysfs_cpu
            .join(format!("cpu{index}"))
            .join("cpufreq")
            .join("scaling_governor");

        fs::read_to_string(governor_path)
            .is_ok_and(|governor| !governor.starts_with("performance"))
    })
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use new_zealand::nz;

    use super::*;

    #[test]
    fn cpu_mhz_is_parsed_from_first_entry() {
        let cpuinfo = "processor\t: 0\n\
                       model name\t: Imaginary CPU\n\
                       cpu MHz\t\t: 2400.125\n\
                       processor\t: 1\n\
                       cpu MHz\t\t: 1200.000\n";

        assert_eq!(parse_cpu_mhz(cpuinfo), Some(2400.125));
    }

    #[test]
    fn missing_cpu_mhz_is_none() {
        assert_eq!(parse_cpu_mhz("processor\t: 0\n"), None);
        assert_eq!(parse_cpu_mhz("cpu MHz\t: unknown\n"), None);
    }

    #[cfg(not(miri))] // Miri cannot access the real filesystem.
    #[test]
    fn governor_files_decide_scaling() {
        let temp_dir = tempfile::tempdir().unwrap();
        let root = temp_dir.path();

        for (index, governor) in ["performance\n", "powersave\n"].into_iter().enumerate() {
            let dir = root.join(format!("cpu{index}")).join("cpufreq");
            fs::create_dir_all(&dir).unwrap();
            fs::write(dir.join("scaling_governor"), governor).unwrap();
        }

        assert!(!scaling_enabled_under(root, nz!(1)));
        assert!(scaling_enabled_under(root, nz!(2)));

        // Unreadable governors are ignored.
        assert!(!scaling_enabled_under(&root.join("missing"), nz!(4)));
    }

    #[cfg(not(miri))] // Miri cannot talk to the real operating system.
    #[test]
    fn host_counts_processors_available_to_process() {
        assert_eq!(HostSystem.cpu_count().get(), ProcessorSet::default().len());
    }
}
