use super::{HostMetrics, MemoryUsage};
use crate::components::MetricsProvider;
use crate::config::Config;
use crate::error::{metrics_error, DashResult};
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::debug;

const PROC_STAT: &str = "/proc/stat";
const PROC_MEMINFO: &str = "/proc/meminfo";
const BYTES_PER_MB: u64 = 1024 * 1024;
/// CPU snapshots older than this are replaced by a fresh sample window
const SNAPSHOT_MAX_AGE: Duration = Duration::from_secs(5);

/// Aggregate CPU counters from the first line of /proc/stat
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CpuTimes {
    pub total: u64,
    pub idle: u64,
}

/// Memory totals in bytes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemoryInfo {
    pub total_bytes: u64,
    pub available_bytes: u64,
}

impl MemoryInfo {
    pub fn used_bytes(&self) -> u64 {
        self.total_bytes.saturating_sub(self.available_bytes)
    }

    pub fn used_percent(&self) -> f64 {
        if self.total_bytes == 0 {
            return 0.0;
        }
        self.used_bytes() as f64 / self.total_bytes as f64 * 100.0
    }
}

impl From<MemoryInfo> for MemoryUsage {
    fn from(info: MemoryInfo) -> Self {
        Self {
            used_mb: info.used_bytes() / BYTES_PER_MB,
            total_mb: info.total_bytes / BYTES_PER_MB,
            percent: info.used_percent(),
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct CpuSnapshot {
    times: CpuTimes,
    taken: Instant,
}

/// Host metrics read from procfs and sysfs
pub struct ProcMetrics {
    stat_path: PathBuf,
    meminfo_path: PathBuf,
    thermal_path: PathBuf,
    sample_window: Duration,
    snapshot_max_age: Duration,
    previous: Mutex<Option<CpuSnapshot>>,
}

impl ProcMetrics {
    pub fn new(config: &Config) -> Self {
        Self::with_paths(
            PROC_STAT,
            PROC_MEMINFO,
            config.thermal_zone_path.clone(),
            Duration::from_millis(config.cpu_sample_window_ms),
        )
    }

    /// Read from alternative file locations
    pub fn with_paths(
        stat_path: impl Into<PathBuf>,
        meminfo_path: impl Into<PathBuf>,
        thermal_path: impl Into<PathBuf>,
        sample_window: Duration,
    ) -> Self {
        Self {
            stat_path: stat_path.into(),
            meminfo_path: meminfo_path.into(),
            thermal_path: thermal_path.into(),
            sample_window,
            snapshot_max_age: SNAPSHOT_MAX_AGE,
            previous: Mutex::new(None),
        }
    }

    /// Age after which the previous CPU snapshot is no longer used as a baseline
    pub fn with_snapshot_max_age(mut self, max_age: Duration) -> Self {
        self.snapshot_max_age = max_age;
        self
    }

    async fn read_cpu_times(&self) -> DashResult<CpuTimes> {
        parse_cpu_times(&read_file(&self.stat_path).await?)
    }

    /// CPU usage since the previous sample, or over a fresh window when
    /// there is no recent one.
    async fn read_cpu_percent(&self) -> DashResult<f64> {
        let mut previous = self.previous.lock().await;

        let before = match previous.take() {
            Some(snapshot) if snapshot.taken.elapsed() < self.snapshot_max_age => snapshot.times,
            _ => {
                let times = self.read_cpu_times().await?;
                tokio::time::sleep(self.sample_window).await;
                times
            }
        };
        let after = self.read_cpu_times().await?;

        *previous = Some(CpuSnapshot {
            times: after,
            taken: Instant::now(),
        });
        Ok(cpu_usage_percent(&before, &after))
    }

    async fn read_memory(&self) -> DashResult<MemoryUsage> {
        let info = parse_meminfo(&read_file(&self.meminfo_path).await?)?;
        Ok(MemoryUsage::from(info))
    }

    async fn read_temperature(&self) -> Option<f64> {
        match tokio::fs::read_to_string(&self.thermal_path).await {
            Ok(raw) => parse_temperature(&raw),
            Err(e) => {
                debug!("Temperature unavailable from {}: {}", self.thermal_path.display(), e);
                None
            }
        }
    }
}

#[async_trait]
impl MetricsProvider for ProcMetrics {
    /// Fails only when neither CPU nor memory can be read
    async fn sample(&self) -> DashResult<HostMetrics> {
        let cpu_percent = match self.read_cpu_percent().await {
            Ok(percent) => Some(percent),
            Err(e) => {
                debug!("CPU usage unavailable: {}", e);
                None
            }
        };

        let memory = match self.read_memory().await {
            Ok(memory) => Some(memory),
            Err(e) => {
                debug!("Memory usage unavailable: {}", e);
                None
            }
        };

        if cpu_percent.is_none() && memory.is_none() {
            return Err(metrics_error(&format!(
                "Neither {} nor {} could be read",
                self.stat_path.display(),
                self.meminfo_path.display()
            )));
        }

        Ok(HostMetrics {
            cpu_percent,
            memory,
            temperature_c: self.read_temperature().await,
        })
    }
}

async fn read_file(path: &Path) -> DashResult<String> {
    tokio::fs::read_to_string(path)
        .await
        .map_err(|e| metrics_error(&format!("Failed to read {}: {}", path.display(), e)))
}

/// Parse the aggregate `cpu` line of /proc/stat.
///
/// Idle time includes iowait; guest columns are already counted in user time.
pub fn parse_cpu_times(raw: &str) -> DashResult<CpuTimes> {
    let line = raw
        .lines()
        .find(|line| line.starts_with("cpu "))
        .ok_or_else(|| metrics_error("No aggregate cpu line in /proc/stat"))?;

    let fields = line
        .split_whitespace()
        .skip(1)
        .take(8)
        .map(|value| {
            value
                .parse::<u64>()
                .map_err(|e| metrics_error(&format!("Invalid cpu counter {:?}: {}", value, e)))
        })
        .collect::<DashResult<Vec<u64>>>()?;

    if fields.len() < 4 {
        return Err(metrics_error("Too few cpu counters in /proc/stat"));
    }

    let idle = fields[3] + fields.get(4).copied().unwrap_or(0);
    Ok(CpuTimes {
        total: fields.iter().sum(),
        idle,
    })
}

/// Busy share of the CPU between two snapshots, in percent
pub fn cpu_usage_percent(before: &CpuTimes, after: &CpuTimes) -> f64 {
    let total = after.total.saturating_sub(before.total);
    if total == 0 {
        return 0.0;
    }
    let idle = after.idle.saturating_sub(before.idle).min(total);
    (total - idle) as f64 / total as f64 * 100.0
}

/// Parse /proc/meminfo, falling back to free + buffers + cached on kernels
/// without `MemAvailable`.
pub fn parse_meminfo(raw: &str) -> DashResult<MemoryInfo> {
    let mut values = HashMap::<&str, u64>::new();

    for line in raw.lines().map(str::trim).filter(|line| !line.is_empty()) {
        let Some((key, rest)) = line.split_once(':') else {
            continue;
        };
        let mut parts = rest.split_whitespace();
        let Some(value) = parts.next().and_then(|v| v.parse::<u64>().ok()) else {
            continue;
        };
        let bytes = match parts.next() {
            Some("kB") => value.saturating_mul(1024),
            _ => value,
        };
        values.insert(key.trim(), bytes);
    }

    let total_bytes = *values
        .get("MemTotal")
        .ok_or_else(|| metrics_error("missing required meminfo field: MemTotal"))?;

    let available_bytes = match values.get("MemAvailable") {
        Some(available) => *available,
        None => ["MemFree", "Buffers", "Cached"]
            .iter()
            .map(|key| values.get(key).copied().unwrap_or(0))
            .sum(),
    };

    Ok(MemoryInfo {
        total_bytes,
        available_bytes,
    })
}

/// Thermal zone reading in millidegrees to degrees Celsius
pub fn parse_temperature(raw: &str) -> Option<f64> {
    raw.trim()
        .parse::<i64>()
        .ok()
        .map(|millidegrees| millidegrees as f64 / 1000.0)
}
