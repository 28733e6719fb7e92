//! System load monitoring during acquisition
//!
//! A background task samples CPU and memory usage on a fixed interval and
//! logs it at debug level. The task runs until its cancellation token fires,
//! which happens on [`ResourceMonitor::stop`] or when the monitor is dropped.

use std::time::Duration;
use sysinfo::{Pid, System};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::{CancellationToken, DropGuard};

/// Handle to a running load-sampling task
pub struct ResourceMonitor {
    guard: DropGuard,
    token: CancellationToken,
    handle: JoinHandle<usize>,
}

impl ResourceMonitor {
    /// Starts sampling every `interval`
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn(interval: Duration) -> Self {
        let token = CancellationToken::new();
        let handle = tokio::spawn(sample_loop(interval, token.clone()));

        tracing::debug!("Resource monitor started ({:?} interval)", interval);
        Self {
            guard: token.clone().drop_guard(),
            token,
            handle,
        }
    }

    /// Token that is cancelled once the monitor stops
    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// Signals the task to stop and waits for it
    ///
    /// # Returns
    ///
    /// The number of samples taken.
    pub async fn stop(self) -> usize {
        self.guard.disarm().cancel();
        match self.handle.await {
            Ok(samples) => {
                tracing::debug!("Resource monitor stopped after {} samples", samples);
                samples
            }
            Err(e) => {
                tracing::warn!("Resource monitor task failed: {}", e);
                0
            }
        }
    }
}

async fn sample_loop(interval: Duration, token: CancellationToken) -> usize {
    let mut system = System::new();
    let pid = sysinfo::get_current_pid().ok();

    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let mut samples = 0;
    loop {
        tokio::select! {
            biased;
            _ = token.cancelled() => break,
            _ = ticker.tick() => {
                log_load(&mut system, pid);
                samples += 1;
            }
        }
    }
    samples
}

fn log_load(system: &mut System, pid: Option<Pid>) {
    system.refresh_cpu();
    system.refresh_memory();

    let cpu = system.global_cpu_info().cpu_usage();
    let total = system.total_memory();
    let memory = if total == 0 {
        0.0
    } else {
        system.used_memory() as f64 / total as f64 * 100.0
    };

    let resident = pid.and_then(|pid| {
        system.refresh_process(pid);
        system.process(pid).map(|process| process.memory())
    });

    match resident {
        Some(bytes) => tracing::debug!(
            "System load - CPU: {:.1}%, memory: {:.1}%, process: {} MiB",
            cpu,
            memory,
            bytes / (1024 * 1024)
        ),
        None => tracing::debug!("System load - CPU: {:.1}%, memory: {:.1}%", cpu, memory),
    }
}
