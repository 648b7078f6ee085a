//! Size-aware simulated upload progress.
//!
//! The portal has no real transfer telemetry, so the percentage shown during
//! an upload is a timed approximation: fast random increments up to 90%, a
//! slow crawl towards 98% while the request is outstanding, then a jump to
//! 100% once the network call completes. The tick task races the real request
//! and is converged (or aborted) by the driver.

use crate::model::{ArtifactType, UploadEvent};
use rand::{Rng, SeedableRng};
use std::ops::Range;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use tokio::sync::mpsc::UnboundedSender;
use tokio::time::Duration;

/// Percent held while fast increments apply.
pub const FAST_CEILING: f64 = 90.0;
/// Percent held until the network call completes.
pub const SLOW_CEILING: f64 = 98.0;

const MIB: u64 = 1024 * 1024;

/// Tick cadence and increment ranges derived from the artifact size. Larger
/// files tick slower with smaller increments, approximating perceived
/// duration.
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressProfile {
    pub interval: Duration,
    pub fast_increment: Range<f64>,
    pub slow_increment: Range<f64>,
}

impl ProgressProfile {
    pub fn for_size(size_bytes: u64) -> Self {
        if size_bytes < MIB {
            Self {
                interval: Duration::from_millis(150),
                fast_increment: 0.1..0.6,
                slow_increment: 0.1..0.6,
            }
        } else if size_bytes < 20 * MIB {
            Self {
                interval: Duration::from_millis(250),
                fast_increment: 0.2..0.3,
                slow_increment: 0.1..0.2,
            }
        } else {
            Self {
                interval: Duration::from_millis(450),
                fast_increment: 0.2..0.3,
                slow_increment: 0.1..0.2,
            }
        }
    }
}

/// Apply one tick. Returns the new percent and whether ticking should stop.
/// Never decreases; never exceeds `SLOW_CEILING` until `network_done`.
pub fn step<R: Rng>(
    percent: f64,
    network_done: bool,
    profile: &ProgressProfile,
    rng: &mut R,
) -> (f64, bool) {
    if network_done {
        (100.0, true)
    } else if percent < FAST_CEILING {
        let next = percent + rng.gen_range(profile.fast_increment.clone());
        (next.min(FAST_CEILING), false)
    } else if percent < SLOW_CEILING {
        let next = percent + rng.gen_range(profile.slow_increment.clone());
        (next.min(SLOW_CEILING), false)
    } else {
        (percent, false)
    }
}

/// Handle to the spawned tick task for one in-flight artifact. The driver
/// either lets it converge to 100 (`finish`) or kills it without ever
/// reporting completion (`abort`).
pub struct ProgressSimulator {
    handle: tokio::task::JoinHandle<()>,
}

impl ProgressSimulator {
    /// Start ticking for `artifact`, publishing `Progress` events. The task
    /// checks `network_done` each cycle and emits exactly one 100% event
    /// after it flips, then stops.
    pub fn spawn(
        artifact: ArtifactType,
        profile: ProgressProfile,
        network_done: Arc<AtomicBool>,
        event_tx: UnboundedSender<UploadEvent>,
    ) -> Self {
        let handle = tokio::spawn(async move {
            let mut rng = rand::rngs::StdRng::from_entropy();
            let mut percent = 0.0_f64;
            let mut ticker = tokio::time::interval(profile.interval);
            loop {
                ticker.tick().await;
                let done = network_done.load(Ordering::Relaxed);
                let (next, stop) = step(percent, done, &profile, &mut rng);
                if next > percent {
                    percent = next;
                    let _ = event_tx.send(UploadEvent::Progress { artifact, percent });
                }
                if stop {
                    break;
                }
            }
        });
        Self { handle }
    }

    /// Wait for the task to emit 100 and exit. Call only after flipping the
    /// completion flag, otherwise this never returns.
    pub async fn finish(self) {
        let _ = self.handle.await;
    }

    /// Stop ticking immediately; the failure path must never show 100%.
    pub fn abort(self) {
        self.handle.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ArtifactType;
    use rand::rngs::StdRng;
    use tokio::sync::mpsc;

    #[test]
    fn profile_buckets() {
        let small = ProgressProfile::for_size(512 * 1024);
        let medium = ProgressProfile::for_size(5 * MIB);
        let large = ProgressProfile::for_size(64 * MIB);
        assert_eq!(small.interval, Duration::from_millis(150));
        assert_eq!(medium.interval, Duration::from_millis(250));
        assert_eq!(large.interval, Duration::from_millis(450));
        // Boundary sizes land in the larger bucket.
        assert_eq!(ProgressProfile::for_size(MIB), medium);
        assert_eq!(ProgressProfile::for_size(20 * MIB), large);
    }

    #[test]
    fn step_is_monotonic_and_capped_before_completion() {
        let profile = ProgressProfile::for_size(512);
        let mut rng = StdRng::seed_from_u64(7);
        let mut percent = 0.0;
        for _ in 0..10_000 {
            let (next, stop) = step(percent, false, &profile, &mut rng);
            assert!(!stop);
            assert!(next >= percent);
            assert!(next <= SLOW_CEILING);
            percent = next;
        }
        // Enough ticks to have crawled through both phases.
        assert!(percent > FAST_CEILING);
    }

    #[test]
    fn step_clamps_at_fast_ceiling() {
        let profile = ProgressProfile {
            interval: Duration::from_millis(1),
            fast_increment: 50.0..60.0,
            slow_increment: 0.1..0.2,
        };
        let mut rng = StdRng::seed_from_u64(1);
        let (next, _) = step(89.9, false, &profile, &mut rng);
        assert_eq!(next, FAST_CEILING);
    }

    #[test]
    fn step_jumps_to_100_once_done() {
        let profile = ProgressProfile::for_size(512);
        let mut rng = StdRng::seed_from_u64(3);
        for start in [0.0, 45.0, 90.0, 97.9] {
            let (next, stop) = step(start, true, &profile, &mut rng);
            assert_eq!(next, 100.0);
            assert!(stop);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn simulator_converges_after_network_done() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let done = Arc::new(AtomicBool::new(false));
        let sim = ProgressSimulator::spawn(
            ArtifactType::Ese,
            ProgressProfile::for_size(512),
            done.clone(),
            tx,
        );

        // Let the ticker run for a while before the network call "completes".
        tokio::time::sleep(Duration::from_secs(5)).await;
        done.store(true, Ordering::Relaxed);
        sim.finish().await;

        let mut values = Vec::new();
        while let Ok(ev) = rx.try_recv() {
            if let UploadEvent::Progress { percent, .. } = ev {
                values.push(percent);
            }
        }
        assert!(!values.is_empty());
        assert_eq!(*values.last().unwrap(), 100.0);
        for pair in values.windows(2) {
            assert!(pair[1] >= pair[0]);
        }
        // Exactly one completion event, and nothing above the slow ceiling
        // before it.
        assert_eq!(values.iter().filter(|p| **p == 100.0).count(), 1);
        for p in &values[..values.len() - 1] {
            assert!(*p <= SLOW_CEILING);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn aborted_simulator_never_reports_completion() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let done = Arc::new(AtomicBool::new(false));
        let sim = ProgressSimulator::spawn(
            ArtifactType::Ise1,
            ProgressProfile::for_size(512),
            done,
            tx,
        );

        tokio::time::sleep(Duration::from_secs(2)).await;
        sim.abort();

        while let Ok(ev) = rx.try_recv() {
            if let UploadEvent::Progress { percent, .. } = ev {
                assert!(percent < 100.0);
            }
        }
    }
}
