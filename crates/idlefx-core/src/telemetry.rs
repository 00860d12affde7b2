#![forbid(unsafe_code)]

//! System and process load sampling.
//!
//! Every reading is an `Option`: `None` means the value is unavailable on
//! this platform or build, and consumers must carry on without it. The
//! governor turns its adaptive features off when CPU load is `None`.
//!
//! Refreshes are non-blocking. CPU percentages are computed by the backend
//! from the time between two refreshes, so the first sample after
//! construction may read as zero.

/// One set of readings, taken together.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TelemetrySample {
    /// System-wide CPU use, 0..=100.
    pub cpu_percent: Option<f64>,
    /// System memory in use, 0..=100.
    pub memory_percent: Option<f64>,
    /// This process's CPU use normalized by logical CPU count, 0..=100.
    pub process_cpu_percent: Option<f64>,
    /// This process's resident memory in MiB.
    pub process_memory_mb: Option<f64>,
}

impl TelemetrySample {
    /// Whether any system-level reading is present.
    #[inline]
    pub fn is_available(&self) -> bool {
        self.cpu_percent.is_some() || self.memory_percent.is_some()
    }
}

/// Supplier of load readings.
pub trait TelemetrySource {
    /// Short name for logs.
    fn name(&self) -> &str;

    /// Update cached readings. Must not block.
    fn refresh(&mut self);

    /// System-wide CPU use in percent.
    fn cpu_percent(&self) -> Option<f64>;

    /// System memory use in percent.
    fn memory_percent(&self) -> Option<f64>;

    /// This process's CPU use in percent of the whole machine.
    fn process_cpu_percent(&self) -> Option<f64>;

    /// This process's resident memory in MiB.
    fn process_memory_mb(&self) -> Option<f64>;

    /// Refresh, then read everything.
    fn sample(&mut self) -> TelemetrySample {
        self.refresh();
        TelemetrySample {
            cpu_percent: self.cpu_percent(),
            memory_percent: self.memory_percent(),
            process_cpu_percent: self.process_cpu_percent(),
            process_memory_mb: self.process_memory_mb(),
        }
    }
}

/// Telemetry that is never available.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoTelemetry;

impl TelemetrySource for NoTelemetry {
    fn name(&self) -> &str {
        "none"
    }

    fn refresh(&mut self) {}

    fn cpu_percent(&self) -> Option<f64> {
        None
    }

    fn memory_percent(&self) -> Option<f64> {
        None
    }

    fn process_cpu_percent(&self) -> Option<f64> {
        None
    }

    fn process_memory_mb(&self) -> Option<f64> {
        None
    }
}

/// Replays a fixed list of samples, repeating the last one.
///
/// Used by tests to drive the governor through load scenarios.
#[derive(Debug, Clone)]
pub struct ScriptedTelemetry {
    samples: Vec<TelemetrySample>,
    cursor: usize,
    current: TelemetrySample,
}

impl ScriptedTelemetry {
    /// Replay `samples` in order, one per refresh.
    pub fn new(samples: Vec<TelemetrySample>) -> Self {
        Self {
            samples,
            cursor: 0,
            current: TelemetrySample::default(),
        }
    }

    /// Constant system CPU and memory load.
    pub fn constant(cpu_percent: f64, memory_percent: f64) -> Self {
        Self::new(vec![TelemetrySample {
            cpu_percent: Some(cpu_percent),
            memory_percent: Some(memory_percent),
            process_cpu_percent: Some(0.0),
            process_memory_mb: Some(0.0),
        }])
    }

    /// Replay system CPU readings with memory fixed at 0%.
    pub fn cpu_series(values: &[f64]) -> Self {
        Self::new(
            values
                .iter()
                .map(|&cpu| TelemetrySample {
                    cpu_percent: Some(cpu),
                    memory_percent: Some(0.0),
                    process_cpu_percent: Some(0.0),
                    process_memory_mb: Some(0.0),
                })
                .collect(),
        )
    }
}

impl TelemetrySource for ScriptedTelemetry {
    fn name(&self) -> &str {
        "scripted"
    }

    fn refresh(&mut self) {
        if let Some(next) = self.samples.get(self.cursor) {
            self.current = *next;
            self.cursor += 1;
        }
    }

    fn cpu_percent(&self) -> Option<f64> {
        self.current.cpu_percent
    }

    fn memory_percent(&self) -> Option<f64> {
        self.current.memory_percent
    }

    fn process_cpu_percent(&self) -> Option<f64> {
        self.current.process_cpu_percent
    }

    fn process_memory_mb(&self) -> Option<f64> {
        self.current.process_memory_mb
    }
}

#[cfg(feature = "sysinfo")]
pub use sysinfo_backend::SysinfoTelemetry;

#[cfg(feature = "sysinfo")]
mod sysinfo_backend {
    use super::TelemetrySource;
    use sysinfo::{Pid, ProcessRefreshKind, ProcessesToUpdate, System};

    const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

    /// Telemetry backed by the `sysinfo` crate.
    pub struct SysinfoTelemetry {
        system: System,
        pid: Option<Pid>,
        cpu_count: usize,
    }

    impl SysinfoTelemetry {
        /// Create a sampler for the whole system and the current process.
        pub fn new() -> Self {
            let system = System::new_all();
            let pid = sysinfo::get_current_pid().ok();
            let cpu_count = system.cpus().len().max(1);
            Self {
                system,
                pid,
                cpu_count,
            }
        }
    }

    impl Default for SysinfoTelemetry {
        fn default() -> Self {
            Self::new()
        }
    }

    impl std::fmt::Debug for SysinfoTelemetry {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            f.debug_struct("SysinfoTelemetry")
                .field("pid", &self.pid)
                .field("cpu_count", &self.cpu_count)
                .finish()
        }
    }

    impl TelemetrySource for SysinfoTelemetry {
        fn name(&self) -> &str {
            "sysinfo"
        }

        fn refresh(&mut self) {
            self.system.refresh_cpu_usage();
            self.system.refresh_memory();
            if let Some(pid) = self.pid {
                self.system.refresh_processes_specifics(
                    ProcessesToUpdate::Some(&[pid]),
                    true,
                    ProcessRefreshKind::nothing().with_cpu().with_memory(),
                );
            }
        }

        fn cpu_percent(&self) -> Option<f64> {
            if self.system.cpus().is_empty() {
                return None;
            }
            Some(f64::from(self.system.global_cpu_usage()).clamp(0.0, 100.0))
        }

        fn memory_percent(&self) -> Option<f64> {
            let total = self.system.total_memory();
            if total == 0 {
                return None;
            }
            Some((self.system.used_memory() as f64 / total as f64 * 100.0).clamp(0.0, 100.0))
        }

        fn process_cpu_percent(&self) -> Option<f64> {
            let process = self.system.process(self.pid?)?;
            Some(f64::from(process.cpu_usage()) / self.cpu_count as f64)
        }

        fn process_memory_mb(&self) -> Option<f64> {
            let process = self.system.process(self.pid?)?;
            Some(process.memory() as f64 / BYTES_PER_MB)
        }
    }
}

/// Best available telemetry for this build.
pub fn default_source() -> Box<dyn TelemetrySource> {
    #[cfg(feature = "sysinfo")]
    {
        if sysinfo::IS_SUPPORTED_SYSTEM {
            return Box::new(SysinfoTelemetry::new());
        }
    }
    Box::new(NoTelemetry)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_telemetry_is_unavailable() {
        let mut t = NoTelemetry;
        let s = t.sample();
        assert!(!s.is_available());
        assert_eq!(s, TelemetrySample::default());
    }

    #[test]
    fn scripted_replays_then_holds_last() {
        let mut t = ScriptedTelemetry::cpu_series(&[10.0, 95.0]);
        assert_eq!(t.sample().cpu_percent, Some(10.0));
        assert_eq!(t.sample().cpu_percent, Some(95.0));
        assert_eq!(t.sample().cpu_percent, Some(95.0));
    }

    #[test]
    fn scripted_before_refresh_is_empty() {
        let t = ScriptedTelemetry::constant(50.0, 60.0);
        assert_eq!(t.cpu_percent(), None);
    }

    #[cfg(feature = "sysinfo")]
    #[test]
    fn sysinfo_readings_are_in_range() {
        let mut t = SysinfoTelemetry::new();
        let s = t.sample();
        if let Some(cpu) = s.cpu_percent {
            assert!((0.0..=100.0).contains(&cpu));
        }
        if let Some(mem) = s.memory_percent {
            assert!((0.0..=100.0).contains(&mem));
        }
    }
}
