use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use crate::distributed::coordinator::Coordinator;
use crate::distributed::shard::ShardHealth;

/// Consecutive failed pings after which a shard is routed around.
pub const DOWN_THRESHOLD: u32 = 3;

/// Background pinger. Three consecutive failed pings mark a shard down
/// and exclude it from routing; the next successful ping restores it.
/// Stops when dropped.
pub struct HealthMonitor {
    stop: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl HealthMonitor {
    pub fn start(coordinator: Arc<Coordinator>, interval: Duration) -> HealthMonitor {
        let stop = Arc::new(AtomicBool::new(false));
        let stop_flag = stop.clone();
        let handle = std::thread::spawn(move || {
            while !stop_flag.load(Ordering::Acquire) {
                ping_all(&coordinator);
                // Sleep in short slices so drop does not stall.
                let mut remaining = interval;
                while remaining > Duration::ZERO && !stop_flag.load(Ordering::Acquire) {
                    let slice = remaining.min(Duration::from_millis(50));
                    std::thread::sleep(slice);
                    remaining = remaining.saturating_sub(slice);
                }
            }
        });
        HealthMonitor {
            stop,
            handle: Some(handle),
        }
    }
}

fn ping_all(coordinator: &Coordinator) {
    for (name, shard, state) in coordinator.shard_states() {
        match shard.health() {
            ShardHealth::Down => {
                let failures = state.consecutive_failures.fetch_add(1, Ordering::AcqRel) + 1;
                if failures >= DOWN_THRESHOLD && !state.down.swap(true, Ordering::AcqRel) {
                    log::warn!(
                        "shard '{}' marked down after {} failed pings",
                        name,
                        failures
                    );
                }
            }
            ShardHealth::Healthy | ShardHealth::Degraded => {
                state.consecutive_failures.store(0, Ordering::Release);
                if state.down.swap(false, Ordering::AcqRel) {
                    log::info!("shard '{}' restored after successful ping", name);
                }
            }
        }
    }
}

impl Drop for HealthMonitor {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::Release);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}
