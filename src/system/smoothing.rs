//! Moving average smoothing
//!
//! Fixed window moving average over the most recent distance samples. The
//! window is a circular buffer with a running total, so each update is O(1)
//! and memory use is bounded by the window size.
//!
//! The window starts zero filled and the average always divides by the window
//! size, so the output ramps up over the first N samples.

use crate::system::config::SMOOTHING_WINDOW;

/// The filter used by the pipeline
pub type DistanceFilter = SmoothingFilter<SMOOTHING_WINDOW>;

/// Circular buffer moving average of `N` samples
///
/// `running_total` always equals the sum of `window`.
#[derive(Debug, Clone)]
pub struct SmoothingFilter<const N: usize> {
    window: [f32; N],
    index: usize,
    running_total: f32,
    samples_seen: u32,
}

impl<const N: usize> Default for SmoothingFilter<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> SmoothingFilter<N> {
    /// Creates an all zero window
    ///
    /// A zero sized window is rejected at compile time:
    ///
    /// ```compile_fail
    /// let filter = sonar_beacon::system::smoothing::SmoothingFilter::<0>::new();
    /// ```
    pub const fn new() -> Self {
        const { assert!(N > 0, "smoothing window must hold at least one sample") };
        Self {
            window: [0.0; N],
            index: 0,
            running_total: 0.0,
            samples_seen: 0,
        }
    }

    /// Adds a sample and returns the new average
    pub fn update(&mut self, sample: f32) -> f32 {
        // drop the sample about to be overwritten from the total
        self.running_total -= self.window[self.index];
        self.window[self.index] = sample;
        self.running_total += sample;
        self.index = (self.index + 1) % N;
        self.samples_seen = self.samples_seen.saturating_add(1);

        self.average()
    }

    pub fn average(&self) -> f32 {
        self.running_total / N as f32
    }

    pub fn running_total(&self) -> f32 {
        self.running_total
    }

    /// Current buffer contents in slot order (not sample order)
    pub fn window(&self) -> &[f32; N] {
        &self.window
    }

    /// Number of samples accepted so far, saturating
    pub fn samples_seen(&self) -> u32 {
        self.samples_seen
    }

    /// True once every slot holds a real sample
    pub fn is_primed(&self) -> bool {
        self.samples_seen as usize >= N
    }
}
