//! # Ember Frame Loop
//!
//! ```text
//! Frame N:
//! ┌──────────────────────────────────────────────────────────┐
//! │ 1. MEASURE   elapsed wall time since frame N-1, clamped   │
//! │ 2. RESOURCES registry.tick()                              │
//! │    ├─ commit finished async loads, run callbacks          │
//! │    ├─ start queued loads                                  │
//! │    └─ hot-reload sweep (when due)                         │
//! │ 3. WORLD     world.tick(dt)                               │
//! │    └─ enabled systems in priority order                   │
//! │ 4. RECORD    FrameStats                                   │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! Resources tick first so systems see loads completed this frame.

use std::sync::Arc;
use std::time::{Duration, Instant};

use ember_core::World;
use ember_resources::ResourceRegistry;

use crate::config::{EngineConfig, FrameLoopConfig};
use crate::error::EngineResult;

/// Timing of one frame.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FrameStats {
    /// Frame number, starting at 0.
    pub frame: u64,
    /// Delta passed to the world.
    pub delta: Duration,
    /// Time spent in `World::tick`, in microseconds.
    pub world_us: u64,
    /// Time spent in `ResourceRegistry::tick`, in microseconds.
    pub resources_us: u64,
}

impl FrameStats {
    /// Total time spent ticking, in microseconds.
    #[inline]
    #[must_use]
    pub const fn total_us(&self) -> u64 {
        self.world_us.saturating_add(self.resources_us)
    }
}

/// Running totals over many frames.
#[derive(Clone, Debug)]
pub struct FrameStatsAccumulator {
    /// Frames recorded.
    pub frames_recorded: u64,
    /// Sum of world tick times.
    pub world_us_sum: u64,
    /// Sum of registry tick times.
    pub resources_us_sum: u64,
    /// Shortest frame.
    pub min_frame_us: u64,
    /// Longest frame.
    pub max_frame_us: u64,
    /// Frames over the slow-frame threshold.
    pub slow_frames: u64,
}

impl FrameStatsAccumulator {
    /// Creates an empty accumulator.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            frames_recorded: 0,
            world_us_sum: 0,
            resources_us_sum: 0,
            min_frame_us: u64::MAX,
            max_frame_us: 0,
            slow_frames: 0,
        }
    }

    /// Adds a frame.
    pub fn record(&mut self, stats: &FrameStats, slow: bool) {
        let total = stats.total_us();
        self.frames_recorded += 1;
        self.world_us_sum = self.world_us_sum.saturating_add(stats.world_us);
        self.resources_us_sum = self.resources_us_sum.saturating_add(stats.resources_us);
        self.min_frame_us = self.min_frame_us.min(total);
        self.max_frame_us = self.max_frame_us.max(total);
        if slow {
            self.slow_frames += 1;
        }
    }

    /// Average ticking time per frame in milliseconds.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn avg_frame_ms(&self) -> f64 {
        if self.frames_recorded == 0 {
            return 0.0;
        }
        let total = self.world_us_sum.saturating_add(self.resources_us_sum);
        (total as f64 / self.frames_recorded as f64) / 1000.0
    }

    /// Fraction of frames over the slow-frame threshold.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn slow_ratio(&self) -> f64 {
        if self.frames_recorded == 0 {
            return 0.0;
        }
        self.slow_frames as f64 / self.frames_recorded as f64
    }
}

impl Default for FrameStatsAccumulator {
    fn default() -> Self {
        Self::new()
    }
}

/// Ticks a [`World`] and a [`ResourceRegistry`] together once per frame.
///
/// The registry is shared so systems can capture it to resolve handles.
pub struct FrameLoop {
    world: World,
    registry: Arc<ResourceRegistry>,
    config: FrameLoopConfig,
    frame_count: u64,
    last_frame: Instant,
    stats: FrameStatsAccumulator,
}

impl FrameLoop {
    /// Creates a frame loop over existing parts.
    ///
    /// # Arguments
    ///
    /// * `world` - The world to tick
    /// * `registry` - The registry to tick before the world
    /// * `config` - Frame timing
    #[must_use]
    pub fn new(world: World, registry: Arc<ResourceRegistry>, config: FrameLoopConfig) -> Self {
        Self {
            world,
            registry,
            config,
            frame_count: 0,
            last_frame: Instant::now(),
            stats: FrameStatsAccumulator::new(),
        }
    }

    /// Builds the world, the registry and the loop from one configuration.
    ///
    /// # Errors
    ///
    /// Any section's validation error.
    pub fn from_config(config: &EngineConfig) -> EngineResult<Self> {
        config.validate()?;
        let world = World::from_config(&config.world)?;
        let registry = Arc::new(ResourceRegistry::new(config.resources.clone())?);
        Ok(Self::new(world, registry, config.frame.clone()))
    }

    /// Runs one frame with the wall time elapsed since the previous frame,
    /// clamped to `max_delta_ms`.
    pub fn frame(&mut self) -> FrameStats {
        let now = Instant::now();
        let elapsed = now.duration_since(self.last_frame);
        self.last_frame = now;
        self.step(elapsed.min(self.config.max_delta()))
    }

    /// Runs one frame with an exact delta.
    pub fn frame_with(&mut self, delta: Duration) -> FrameStats {
        self.last_frame = Instant::now();
        self.step(delta)
    }

    fn step(&mut self, delta: Duration) -> FrameStats {
        let start = Instant::now();
        self.registry.tick();
        let resources_us = micros(start.elapsed());

        let start = Instant::now();
        self.world.tick(delta.as_secs_f32());
        let world_us = micros(start.elapsed());

        let stats = FrameStats {
            frame: self.frame_count,
            delta,
            world_us,
            resources_us,
        };
        let slow = Duration::from_micros(stats.total_us()) > self.config.slow_frame();
        if slow {
            tracing::warn!(
                frame = stats.frame,
                world_us,
                resources_us,
                budget_ms = self.config.slow_frame_ms,
                "slow frame"
            );
        }
        self.stats.record(&stats, slow);
        self.frame_count += 1;
        stats
    }

    /// Number of frames run.
    #[inline]
    #[must_use]
    pub const fn frame_count(&self) -> u64 {
        self.frame_count
    }

    /// The world.
    #[inline]
    #[must_use]
    pub const fn world(&self) -> &World {
        &self.world
    }

    /// The world, mutably.
    #[inline]
    #[must_use]
    pub fn world_mut(&mut self) -> &mut World {
        &mut self.world
    }

    /// The shared registry.
    #[inline]
    #[must_use]
    pub const fn registry(&self) -> &Arc<ResourceRegistry> {
        &self.registry
    }

    /// Frame timing configuration.
    #[inline]
    #[must_use]
    pub const fn config(&self) -> &FrameLoopConfig {
        &self.config
    }

    /// Accumulated timing.
    #[inline]
    #[must_use]
    pub const fn stats(&self) -> &FrameStatsAccumulator {
        &self.stats
    }

    /// Runs the world's shutdown hooks and hands back the parts.
    #[must_use]
    pub fn into_parts(mut self) -> (World, Arc<ResourceRegistry>) {
        self.world.shutdown();
        (self.world, self.registry)
    }
}

fn micros(duration: Duration) -> u64 {
    u64::try_from(duration.as_micros()).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame_loop(max_delta_ms: u64) -> FrameLoop {
        let config = EngineConfig {
            frame: FrameLoopConfig {
                max_delta_ms,
                ..FrameLoopConfig::default()
            },
            ..EngineConfig::default()
        };
        FrameLoop::from_config(&config).unwrap()
    }

    #[test]
    fn test_frame_numbers() {
        let mut frames = frame_loop(100);
        assert_eq!(frames.frame_with(Duration::from_millis(16)).frame, 0);
        assert_eq!(frames.frame_with(Duration::from_millis(16)).frame, 1);
        assert_eq!(frames.frame_count(), 2);
        assert_eq!(frames.stats().frames_recorded, 2);
    }

    #[test]
    fn test_frame_delta_is_clamped() {
        let mut frames = frame_loop(5);
        std::thread::sleep(Duration::from_millis(20));
        let stats = frames.frame();
        assert_eq!(stats.delta, Duration::from_millis(5));
    }

    #[test]
    fn test_exact_delta_is_not_clamped() {
        let mut frames = frame_loop(5);
        let stats = frames.frame_with(Duration::from_millis(50));
        assert_eq!(stats.delta, Duration::from_millis(50));
    }

    #[test]
    fn test_accumulator() {
        let mut acc = FrameStatsAccumulator::new();
        assert!(acc.avg_frame_ms().abs() < f64::EPSILON);
        for i in 0..4 {
            let stats = FrameStats {
                frame: i,
                delta: Duration::from_millis(16),
                world_us: 1_000,
                resources_us: 1_000,
            };
            acc.record(&stats, i == 3);
        }
        assert!((acc.avg_frame_ms() - 2.0).abs() < 1e-9);
        assert!((acc.slow_ratio() - 0.25).abs() < 1e-9);
        assert_eq!(acc.min_frame_us, 2_000);
        assert_eq!(acc.max_frame_us, 2_000);
    }
}
