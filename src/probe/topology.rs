//! Core-count and memory detection with OS-native fallbacks
//!
//! `num_cpus` is the primary source for both logical and physical counts.
//! When it cannot resolve physical cores, Linux sysfs topology files are
//! consulted; the final fallback is half the logical count.
use std::collections::HashSet;
use std::path::Path;

use sysinfo::{MemoryRefreshKind, RefreshKind, System};

pub fn logical_cores() -> usize {
    num_cpus::get().max(1)
}

pub fn physical_cores(logical: usize) -> usize {
    let physical = num_cpus::get_physical();
    if physical > 0 {
        return physical;
    }

    if let Some(count) = sysfs_core_count() {
        return count;
    }

    (logical / 2).max(1)
}

/// Counts distinct (package, core) pairs under /sys/devices/system/cpu.
///
/// Returns None on non-Linux platforms or when the topology files are absent.
fn sysfs_core_count() -> Option<usize> {
    let cpu_root = Path::new("/sys/devices/system/cpu");
    if !cpu_root.is_dir() {
        return None;
    }

    let mut cores = HashSet::new();
    for entry in std::fs::read_dir(cpu_root).ok()? {
        let entry = entry.ok()?;
        let name = entry.file_name();
        let name = name.to_string_lossy();
        if !name.starts_with("cpu") || !name[3..].chars().all(|c| c.is_ascii_digit()) {
            continue;
        }
        let topology = entry.path().join("topology");
        let core_id = read_trimmed(&topology.join("core_id"))?;
        let package_id =
            read_trimmed(&topology.join("physical_package_id")).unwrap_or_else(|| "0".into());
        cores.insert((package_id, core_id));
    }

    if cores.is_empty() {
        None
    } else {
        Some(cores.len())
    }
}

fn read_trimmed(path: &Path) -> Option<String> {
    std::fs::read_to_string(path).ok().map(|s| s.trim().to_string())
}

/// Point-in-time memory facts, before any policy is applied.
#[derive(Debug, Clone)]
pub struct MemorySnapshot {
    pub total_bytes: u64,
    pub available_bytes: u64,
    pub swap_total_bytes: u64,
    pub swap_used_bytes: u64,
    /// Container/cgroup-imposed ceiling, if one exists and is finite
    pub cgroup_limit_bytes: Option<u64>,
}

impl MemorySnapshot {
    /// Available memory after honoring any cgroup ceiling.
    ///
    /// When a limit is present, the headroom left under the limit is the
    /// binding constraint; we take the more restrictive of the two views.
    pub fn effective_available_bytes(&self) -> u64 {
        match self.cgroup_limit_bytes {
            Some(limit) => {
                let used = cgroup_memory_usage_bytes().unwrap_or(0);
                self.available_bytes.min(limit.saturating_sub(used))
            }
            None => self.available_bytes,
        }
    }
}

pub fn memory_snapshot() -> MemorySnapshot {
    let mut sys = System::new_with_specifics(
        RefreshKind::nothing().with_memory(MemoryRefreshKind::everything()),
    );
    sys.refresh_memory();

    MemorySnapshot {
        total_bytes: sys.total_memory(),
        available_bytes: sys.available_memory(),
        swap_total_bytes: sys.total_swap(),
        swap_used_bytes: sys.used_swap(),
        cgroup_limit_bytes: cgroup_memory_limit_bytes(),
    }
}

/// Reads the cgroup memory ceiling (v2 first, then v1).
///
/// "max" and absurdly large sentinel values mean no limit.
fn cgroup_memory_limit_bytes() -> Option<u64> {
    for path in ["/sys/fs/cgroup/memory.max", "/sys/fs/cgroup/memory/memory.limit_in_bytes"] {
        if let Some(text) = read_trimmed(Path::new(path)) {
            if text.eq_ignore_ascii_case("max") {
                return None;
            }
            if let Ok(value) = text.parse::<u64>() {
                if value > 0 && value < u64::MAX / 2 {
                    return Some(value);
                }
                return None;
            }
        }
    }
    None
}

fn cgroup_memory_usage_bytes() -> Option<u64> {
    for path in ["/sys/fs/cgroup/memory.current", "/sys/fs/cgroup/memory/memory.usage_in_bytes"] {
        if let Some(text) = read_trimmed(Path::new(path)) {
            if let Ok(value) = text.parse::<u64>() {
                return Some(value);
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn logical_cores_positive() {
        assert!(logical_cores() >= 1);
    }

    #[test]
    fn physical_never_exceeds_logical() {
        let logical = logical_cores();
        let physical = physical_cores(logical);
        assert!(physical >= 1);
        assert!(physical <= logical);
    }

    #[test]
    fn memory_snapshot_is_consistent() {
        let snapshot = memory_snapshot();
        assert!(snapshot.total_bytes > 0);
        assert!(snapshot.available_bytes <= snapshot.total_bytes);
        assert!(snapshot.effective_available_bytes() <= snapshot.available_bytes);
    }
}
