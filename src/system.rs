// SPDX-License-Identifier: GPL-3.0-or-later
//! Host statistics for the periodic status log.
use std::fs;
use std::path::Path;

use tracing::trace;

const CPU_TEMPERATURE_PATH: &str = "/sys/class/thermal/thermal_zone0/temp";
const PROC_STAT_PATH: &str = "/proc/stat";

/// Parse the contents of a sysfs thermal zone `temp` file (millidegrees Celsius).
fn parse_thermal_zone(contents: &str) -> Option<f32> {
    contents
        .trim()
        .parse::<i64>()
        .ok()
        .map(|millidegrees| millidegrees as f32 / 1000.0)
}

/// The SoC temperature in degrees Celsius, if the kernel reports one.
pub(crate) fn cpu_temperature() -> Option<f32> {
    read_cpu_temperature(Path::new(CPU_TEMPERATURE_PATH))
}

fn read_cpu_temperature(path: &Path) -> Option<f32> {
    match fs::read_to_string(path) {
        Ok(contents) => parse_thermal_zone(&contents),
        Err(err) => {
            trace!(path = %path.display(), error = %err, "unable to read CPU temperature");
            None
        }
    }
}

/// Total and idle jiffies from the aggregate `cpu` line of `/proc/stat`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct CpuTimes {
    total: u64,
    idle: u64,
}

fn parse_proc_stat(contents: &str) -> Option<CpuTimes> {
    let line = contents.lines().find(|line| line.starts_with("cpu "))?;
    let fields = line
        .split_whitespace()
        .skip(1)
        .map(str::parse::<u64>)
        .collect::<Result<Vec<_>, _>>()
        .ok()?;
    // user nice system idle iowait irq softirq steal [guest guest_nice]
    if fields.len() < 4 {
        return None;
    }
    let idle = fields[3] + fields.get(4).copied().unwrap_or(0);
    // guest time is already counted in user and nice.
    let total = fields.iter().take(8).sum();
    Some(CpuTimes { total, idle })
}

/// CPU utilization between successive calls to [`CpuLoad::sample`].
#[derive(Debug, Default)]
pub(crate) struct CpuLoad {
    previous: Option<CpuTimes>,
}

impl CpuLoad {
    /// Busy percentage (0-100) since the last sample. The first sample covers the time since
    /// boot.
    pub(crate) fn sample(&mut self) -> Option<f32> {
        let contents = match fs::read_to_string(PROC_STAT_PATH) {
            Ok(contents) => contents,
            Err(err) => {
                trace!(error = %err, "unable to read {}", PROC_STAT_PATH);
                return None;
            }
        };
        self.update(parse_proc_stat(&contents)?)
    }

    fn update(&mut self, current: CpuTimes) -> Option<f32> {
        let previous = self.previous.replace(current).unwrap_or(CpuTimes { total: 0, idle: 0 });
        let total = current.total.checked_sub(previous.total)?;
        let idle = current.idle.checked_sub(previous.idle)?;
        if total == 0 {
            return None;
        }
        Some(100.0 * (total - idle.min(total)) as f32 / total as f32)
    }
}
