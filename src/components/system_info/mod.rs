mod procfs;

pub use procfs::{cpu_usage_percent, parse_cpu_times, parse_meminfo, parse_temperature, CpuTimes, MemoryInfo, ProcMetrics};

/// Memory in use, in MB and as a share of the total
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MemoryUsage {
    pub used_mb: u64,
    pub total_mb: u64,
    pub percent: f64,
}

/// One reading of host metrics; each field is absent when its source cannot be read
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct HostMetrics {
    pub cpu_percent: Option<f64>,
    pub memory: Option<MemoryUsage>,
    pub temperature_c: Option<f64>,
}
