//! Host statistics: SoC temperature and data-partition usage.
//!
//! Both are single-shot reads through `sysinfo`.  A board without a
//! thermal zone, or a path on no known mount, yields `None`.

use std::path::Path;

use sysinfo::{Components, Disks};

use crate::app::ports::SystemStatsPort;

pub struct SystemProbe {
    components: Components,
    disks: Disks,
}

impl SystemProbe {
    pub fn new() -> Self {
        Self {
            components: Components::new_with_refreshed_list(),
            disks: Disks::new_with_refreshed_list(),
        }
    }
}

impl Default for SystemProbe {
    fn default() -> Self {
        Self::new()
    }
}

impl SystemStatsPort for SystemProbe {
    fn cpu_temp_c(&mut self) -> Option<f32> {
        self.components.refresh(true);
        cpu_temp_from(
            self.components
                .iter()
                .map(|c| (c.label(), c.temperature())),
        )
    }

    fn disk_usage_percent(&mut self, path: &Path) -> Option<f32> {
        self.disks.refresh(true);
        let mounts = self
            .disks
            .iter()
            .map(|d| (d.mount_point(), d.total_space(), d.available_space()));
        usage_for_path(path, mounts)
    }
}

/// First thermal sensor that looks like the SoC.
fn cpu_temp_from<'a>(components: impl Iterator<Item = (&'a str, Option<f32>)>) -> Option<f32> {
    components
        .filter(|(label, _)| {
            let label = label.to_lowercase();
            label.contains("cpu") || label.contains("soc") || label.contains("thermal")
        })
        .find_map(|(_, t)| t.filter(|t| t.is_finite()))
}

/// Usage of the longest mount point that is a prefix of `path`.
fn usage_for_path<'a>(
    path: &Path,
    mounts: impl Iterator<Item = (&'a Path, u64, u64)>,
) -> Option<f32> {
    let (_, total, available) = mounts
        .filter(|(mount, _, _)| path.starts_with(mount))
        .max_by_key(|(mount, _, _)| mount.as_os_str().len())?;
    if total == 0 {
        return None;
    }
    Some((total - available.min(total)) as f32 / total as f32 * 100.0)
}
