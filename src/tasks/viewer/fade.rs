//! Time-based opacity ramp and the dwell gate.
//!
//! Cancellation is honored as soon as it is observed, fade-in included; the
//! minimum display duration only decides when an uninterrupted session ends.

use std::time::Duration;

pub const OPAQUE: u8 = u8::MAX;

/// Linear 0..=255 ramp over `fade_ms`, saturating at exactly `fade_ms`.
pub fn alpha(elapsed_ms: u64, fade_ms: u64) -> u8 {
    if elapsed_ms >= fade_ms {
        return OPAQUE;
    }
    let scaled = u128::from(OPAQUE) * u128::from(elapsed_ms) / u128::from(fade_ms);
    scaled as u8
}

pub fn should_continue(elapsed_ms: u64, min_display_ms: u64, cancel_requested: bool) -> bool {
    !cancel_requested && elapsed_ms < min_display_ms
}

/// Fixed fade schedule sampled once per frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FadeState {
    start_ms: u64,
    fade_ms: u64,
    min_display_ms: u64,
}

impl FadeState {
    pub fn new(start_ms: u64, fade: Duration, min_display: Duration) -> Self {
        Self {
            start_ms,
            fade_ms: duration_ms(fade),
            min_display_ms: duration_ms(min_display),
        }
    }

    /// Elapsed time since the schedule started; a clock that steps backwards reads as zero.
    pub fn elapsed(&self, now_ms: u64) -> u64 {
        now_ms.saturating_sub(self.start_ms)
    }

    pub fn alpha_at(&self, now_ms: u64) -> u8 {
        alpha(self.elapsed(now_ms), self.fade_ms)
    }

    pub fn should_continue(&self, now_ms: u64, cancel_requested: bool) -> bool {
        should_continue(self.elapsed(now_ms), self.min_display_ms, cancel_requested)
    }
}

fn duration_ms(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}
