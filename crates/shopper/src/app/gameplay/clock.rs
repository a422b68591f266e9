/// Match countdown. Clamps at zero and reports expiry exactly once, on the
/// tick that crosses zero.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchClock {
    length_seconds: f32,
    remaining_seconds: f32,
    expired: bool,
}

impl MatchClock {
    pub fn new(length_seconds: f32) -> Self {
        Self {
            length_seconds,
            remaining_seconds: length_seconds,
            expired: false,
        }
    }

    /// Returns `true` only on the tick the countdown reaches zero.
    pub fn tick(&mut self, dt_seconds: f32) -> bool {
        if self.expired {
            return false;
        }
        self.remaining_seconds -= clamp_elapsed(dt_seconds);
        if self.remaining_seconds <= 0.0 {
            self.remaining_seconds = 0.0;
            self.expired = true;
            return true;
        }
        false
    }

    pub fn remaining_seconds(&self) -> f32 {
        self.remaining_seconds
    }

    pub fn length_seconds(&self) -> f32 {
        self.length_seconds
    }

    pub fn is_expired(&self) -> bool {
        self.expired
    }

    /// `MM:SS`, rounding partial seconds up.
    pub fn pretty(&self) -> String {
        format_match_time(self.remaining_seconds)
    }

    pub fn reset(&mut self) {
        self.remaining_seconds = self.length_seconds;
        self.expired = false;
    }

    #[cfg(test)]
    pub(crate) fn set_remaining(&mut self, seconds: f32) {
        self.remaining_seconds = seconds;
    }
}

/// Elapsed time as every per-tick timer consumes it: negative or non-finite
/// deltas count as zero.
pub fn clamp_elapsed(dt_seconds: f32) -> f32 {
    if dt_seconds.is_finite() {
        dt_seconds.max(0.0)
    } else {
        0.0
    }
}

pub fn format_match_time(seconds: f32) -> String {
    let whole = seconds.max(0.0).ceil() as u32;
    format!("{:02}:{:02}", whole / 60, whole % 60)
}
