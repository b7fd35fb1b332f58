use gridcore::EventSink;
use std::time::Duration;
use sysinfo::System;
use tokio_util::sync::CancellationToken;

/// Background resource telemetry loop
///
/// Samples memory and CPU on an interval and reports them as `log` events
/// alongside the run. Exits promptly on cancellation; the runtime cancels
/// and awaits this task on every run exit path.
pub async fn run_monitor(
    sink: EventSink,
    interval: Duration,
    worker_slots: usize,
    cancel: CancellationToken,
) {
    sink.log(format!("[system] worker pool: {worker_slots} slots"));

    let mut system = System::new();
    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = tokio::time::sleep(interval) => {
                system.refresh_memory();
                system.refresh_cpu_usage();
                let total = system.total_memory();
                let mem_percent = if total == 0 {
                    0.0
                } else {
                    system.used_memory() as f64 / total as f64 * 100.0
                };
                let cpu_percent = system.global_cpu_usage();
                sink.log(format!(
                    "[system] mem: {mem_percent:.1}% | cpu: {cpu_percent:.1}%"
                ));
            }
        }
    }
}
