const DEFAULT_INCREMENTS: [f32; 3] = [0.00002, 0.00006, 0.00009];

/// Slowly bounces the red, green and blue multipliers between 0 and 1.
#[derive(Clone, Debug, PartialEq)]
pub struct ColorPulse {
    color: [f32; 4],
    increments: [f32; 3],
}

impl Default for ColorPulse {
    fn default() -> Self {
        Self::with_increments(DEFAULT_INCREMENTS)
    }
}

impl ColorPulse {
    pub fn with_increments(increments: [f32; 3]) -> Self {
        Self {
            color: [0.0, 0.0, 0.0, 1.0],
            increments,
        }
    }

    /// Steps every channel once; a channel that reaches either bound is
    /// clamped to it and reverses.
    pub fn advance(&mut self) -> [f32; 4] {
        for (channel, increment) in self.color.iter_mut().zip(self.increments.iter_mut()) {
            *channel += *increment;
            if *channel >= 1.0 || *channel <= 0.0 {
                *channel = if *channel >= 1.0 { 1.0 } else { 0.0 };
                *increment = -*increment;
            }
        }
        self.color
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_step_uses_the_default_increments() {
        let mut pulse = ColorPulse::default();
        assert_eq!(pulse.advance(), [0.00002, 0.00006, 0.00009, 1.0]);
    }

    #[test]
    fn channels_bounce_between_bounds() {
        let mut pulse = ColorPulse::with_increments([0.5, 0.25, 0.75]);
        assert_eq!(pulse.advance(), [0.5, 0.25, 0.75, 1.0]);
        assert_eq!(pulse.advance(), [1.0, 0.5, 1.0, 1.0]);
        assert_eq!(pulse.advance(), [0.5, 0.75, 0.25, 1.0]);
        assert_eq!(pulse.advance(), [0.0, 1.0, 0.0, 1.0]);
        assert_eq!(pulse.advance(), [0.5, 0.75, 0.75, 1.0]);
    }

    #[test]
    fn stays_within_bounds_over_many_steps() {
        let mut pulse = ColorPulse::default();
        for _ in 0..50_000 {
            let color = pulse.advance();
            assert!(color.iter().all(|channel| (0.0..=1.0).contains(channel)));
        }
    }
}
