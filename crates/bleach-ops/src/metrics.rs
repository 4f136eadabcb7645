//! Periodic host metrics sampler.
//!
//! [`MetricsSampler`] produces one [`MetricsSnapshot`] per interval on its own
//! tokio task. CPU utilization needs two readings some time apart; that
//! window is an `await` inside the sampler task, never time spent on the UI
//! thread.
//!
//! A metric that cannot be read degrades to zero or `unknown` in the
//! snapshot. Sampling itself never fails.

use std::time::Duration;

use bleach_core::BleachError;
use sysinfo::{CpuRefreshKind, Disks, MemoryRefreshKind, ProcessRefreshKind, RefreshKind, System};
use tokio::runtime::Handle;
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

/// Placeholder for text metrics that could not be read.
pub const UNKNOWN: &str = "unknown";

/// Used/total pair with its percentage.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ResourceUsage {
    pub used: u64,
    pub total: u64,
    pub percent: f64,
}

impl ResourceUsage {
    /// Build a usage value; a zero total yields 0%.
    pub fn new(used: u64, total: u64) -> Self {
        let percent = if total > 0 {
            (used as f64 / total as f64 * 100.0).clamp(0.0, 100.0)
        } else {
            0.0
        };
        Self { used, total, percent }
    }
}

/// Point-in-time reading of host resources.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricsSnapshot {
    pub hostname: String,
    pub kernel: String,
    pub os: String,
    pub uptime: Duration,
    pub shell: String,
    pub cpu_percent: f64,
    pub ram: ResourceUsage,
    pub disk: ResourceUsage,
    pub process_count: usize,
}

impl MetricsSnapshot {
    /// Uptime rounded to the minute, e.g. `3h 25m`.
    pub fn uptime_display(&self) -> String {
        let minutes = (self.uptime.as_secs() + 30) / 60;
        if minutes == 0 {
            return "0m".to_string();
        }
        humantime::format_duration(Duration::from_secs(minutes * 60)).to_string()
    }
}

impl Default for MetricsSnapshot {
    fn default() -> Self {
        Self {
            hostname: UNKNOWN.into(),
            kernel: UNKNOWN.into(),
            os: UNKNOWN.into(),
            uptime: Duration::ZERO,
            shell: UNKNOWN.into(),
            cpu_percent: 0.0,
            ram: ResourceUsage::default(),
            disk: ResourceUsage::default(),
            process_count: 0,
        }
    }
}

/// Source of metric readings.
pub trait MetricsProbe: Send + 'static {
    /// Take the first CPU reading of a measurement window.
    fn begin_window(&mut self);

    /// Take the closing CPU reading and every other metric.
    fn read(&mut self) -> MetricsSnapshot;
}

/// [`MetricsProbe`] backed by `sysinfo`.
pub struct SystemProbe {
    sys: System,
    disks: Disks,
}

impl SystemProbe {
    pub fn new() -> Self {
        let sys = System::new_with_specifics(
            RefreshKind::new()
                .with_cpu(CpuRefreshKind::new().with_cpu_usage())
                .with_memory(MemoryRefreshKind::new().with_ram()),
        );
        let disks = Disks::new_with_refreshed_list();
        Self { sys, disks }
    }

    /// Usage of the filesystem mounted at `/`, or zero if there is none.
    fn root_disk(&mut self) -> ResourceUsage {
        self.disks.refresh();
        if !self.disks.iter().any(|d| d.mount_point() == std::path::Path::new("/")) {
            self.disks.refresh_list();
        }
        match self
            .disks
            .iter()
            .find(|d| d.mount_point() == std::path::Path::new("/"))
        {
            Some(disk) => {
                let total = disk.total_space();
                ResourceUsage::new(total.saturating_sub(disk.available_space()), total)
            }
            None => {
                degraded("disk", "no filesystem mounted at /");
                ResourceUsage::default()
            }
        }
    }
}

impl Default for SystemProbe {
    fn default() -> Self {
        Self::new()
    }
}

impl MetricsProbe for SystemProbe {
    fn begin_window(&mut self) {
        self.sys.refresh_cpu_usage();
    }

    fn read(&mut self) -> MetricsSnapshot {
        self.sys.refresh_specifics(
            RefreshKind::new()
                .with_cpu(CpuRefreshKind::new().with_cpu_usage())
                .with_memory(MemoryRefreshKind::new().with_ram())
                .with_processes(ProcessRefreshKind::new()),
        );

        let cpu = f64::from(self.sys.global_cpu_usage());
        let process_count = self
            .sys
            .processes()
            .values()
            .filter(|p| p.thread_kind().is_none())
            .count();

        let os = match (System::name(), System::os_version()) {
            (Some(name), Some(version)) => format!("{name} {version}"),
            (Some(name), None) => name,
            _ => {
                degraded("os", "distribution name not available");
                UNKNOWN.to_string()
            }
        };

        MetricsSnapshot {
            hostname: System::host_name().unwrap_or_else(|| {
                degraded("hostname", "host name not available");
                UNKNOWN.into()
            }),
            kernel: System::kernel_version().unwrap_or_else(|| {
                degraded("kernel", "kernel version not available");
                UNKNOWN.into()
            }),
            os,
            uptime: Duration::from_secs(System::uptime()),
            shell: std::env::var("SHELL")
                .ok()
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| UNKNOWN.into()),
            cpu_percent: if cpu.is_finite() { cpu.clamp(0.0, 100.0) } else { 0.0 },
            ram: ResourceUsage::new(self.sys.used_memory(), self.sys.total_memory()),
            disk: self.root_disk(),
            process_count,
        }
    }
}

/// Record a metric that fell back to its placeholder.
fn degraded(metric: &str, message: &str) {
    debug!(error = %BleachError::metric_probe(metric, message), "metric degraded");
}

/// Produces snapshots on a fixed schedule.
pub struct MetricsSampler<P> {
    probe: P,
    interval: Duration,
    window: Duration,
}

impl<P: MetricsProbe> MetricsSampler<P> {
    /// `window` is clamped to `interval`.
    pub fn new(probe: P, interval: Duration, window: Duration) -> Self {
        Self {
            probe,
            interval,
            window: window.min(interval),
        }
    }

    /// Take one snapshot, waiting out the CPU measurement window.
    pub async fn tick(&mut self) -> MetricsSnapshot {
        self.probe.begin_window();
        tokio::time::sleep(self.window).await;
        self.probe.read()
    }

    /// Sample forever on `runtime`, sending each snapshot to `tx`.
    ///
    /// The task stops only when the receiving side is gone.
    pub fn spawn<E>(mut self, runtime: &Handle, tx: UnboundedSender<E>) -> JoinHandle<()>
    where
        E: From<MetricsSnapshot> + Send + 'static,
    {
        runtime.spawn(async move {
            info!(interval_ms = self.interval.as_millis() as u64, "metrics sampler started");
            let mut ticker = tokio::time::interval(self.interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let snapshot = self.tick().await;
                if tx.send(snapshot.into()).is_err() {
                    debug!("metrics receiver dropped, sampler exiting");
                    break;
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::mpsc;

    struct CountingProbe {
        windows: Arc<AtomicUsize>,
        reads: usize,
    }

    impl MetricsProbe for CountingProbe {
        fn begin_window(&mut self) {
            self.windows.fetch_add(1, Ordering::SeqCst);
        }

        fn read(&mut self) -> MetricsSnapshot {
            self.reads += 1;
            MetricsSnapshot {
                hostname: format!("host-{}", self.reads),
                ..MetricsSnapshot::default()
            }
        }
    }

    #[test]
    fn test_resource_usage_percent() {
        assert_eq!(ResourceUsage::new(50, 200).percent, 25.0);
        assert_eq!(ResourceUsage::new(10, 0).percent, 0.0);
        assert_eq!(ResourceUsage::new(300, 200).percent, 100.0);
    }

    #[test]
    fn test_uptime_display_rounds_to_minute() {
        let snap = |secs| MetricsSnapshot {
            uptime: Duration::from_secs(secs),
            ..MetricsSnapshot::default()
        };
        assert_eq!(snap(0).uptime_display(), "0m");
        assert_eq!(snap(89).uptime_display(), "1m");
        assert_eq!(snap(3 * 3600 + 25 * 60 + 10).uptime_display(), "3h 25m");
    }

    #[test]
    fn test_default_snapshot_is_unknown() {
        let snap = MetricsSnapshot::default();
        assert_eq!(snap.hostname, UNKNOWN);
        assert_eq!(snap.disk, ResourceUsage::default());
    }

    #[tokio::test]
    async fn test_tick_opens_window_before_read() {
        let windows = Arc::new(AtomicUsize::new(0));
        let probe = CountingProbe {
            windows: Arc::clone(&windows),
            reads: 0,
        };
        let mut sampler = MetricsSampler::new(probe, Duration::from_millis(50), Duration::from_millis(5));

        let first = sampler.tick().await;
        let second = sampler.tick().await;
        assert_eq!(first.hostname, "host-1");
        assert_eq!(second.hostname, "host-2");
        assert_eq!(windows.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_spawned_sampler_keeps_ticking_until_receiver_drops() {
        let windows = Arc::new(AtomicUsize::new(0));
        let probe = CountingProbe {
            windows: Arc::clone(&windows),
            reads: 0,
        };
        let sampler = MetricsSampler::new(probe, Duration::from_millis(20), Duration::from_millis(2));
        let (tx, mut rx) = mpsc::unbounded_channel::<MetricsSnapshot>();
        let task = sampler.spawn(&Handle::current(), tx);

        for expected in 1..=3 {
            let snap = tokio::time::timeout(Duration::from_secs(5), rx.recv())
                .await
                .unwrap()
                .unwrap();
            assert_eq!(snap.hostname, format!("host-{expected}"));
        }

        drop(rx);
        tokio::time::timeout(Duration::from_secs(5), task)
            .await
            .unwrap()
            .unwrap();
    }

    #[test]
    fn test_window_clamped_to_interval() {
        let probe = CountingProbe {
            windows: Arc::new(AtomicUsize::new(0)),
            reads: 0,
        };
        let sampler = MetricsSampler::new(probe, Duration::from_millis(10), Duration::from_secs(1));
        assert_eq!(sampler.window, Duration::from_millis(10));
    }

    #[test]
    fn test_system_probe_produces_finite_values() {
        let mut probe = SystemProbe::new();
        probe.begin_window();
        std::thread::sleep(sysinfo::MINIMUM_CPU_UPDATE_INTERVAL);
        let snap = probe.read();
        assert!(snap.cpu_percent.is_finite());
        assert!((0.0..=100.0).contains(&snap.ram.percent));
        assert!((0.0..=100.0).contains(&snap.disk.percent));
        assert!(!snap.hostname.is_empty());
    }
}
