//! Media element abstraction

/// The page's active media element.
pub trait Player {
    /// Playback position in seconds.
    fn current_time(&self) -> f64;
    fn seek(&mut self, time: f64);
    /// Duration in seconds; NaN or 0 while unknown.
    fn duration(&self) -> f64;
    fn is_muted(&self) -> bool;
    fn set_muted(&mut self, muted: bool);
    /// Was the element muted by the suppressor already?
    fn is_mute_flagged(&self) -> bool;
    fn flag_muted(&mut self);
    fn clear_mute_flag(&mut self);
}

/// Duration is usable for proportional layout.
#[inline]
pub fn is_known_duration(duration: f64) -> bool {
    duration.is_finite() && duration > 0.0
}

/// In-memory media element.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MediaState {
    pub current_time: f64,
    pub duration: f64,
    pub muted: bool,
    pub mute_flag: bool,
}

impl MediaState {
    pub fn new(duration: f64) -> Self {
        Self {
            duration,
            ..Self::default()
        }
    }
}

impl Player for MediaState {
    fn current_time(&self) -> f64 {
        self.current_time
    }

    fn seek(&mut self, time: f64) {
        self.current_time = if is_known_duration(self.duration) {
            time.clamp(0.0, self.duration)
        } else {
            time.max(0.0)
        };
    }

    fn duration(&self) -> f64 {
        self.duration
    }

    fn is_muted(&self) -> bool {
        self.muted
    }

    fn set_muted(&mut self, muted: bool) {
        self.muted = muted;
    }

    fn is_mute_flagged(&self) -> bool {
        self.mute_flag
    }

    fn flag_muted(&mut self) {
        self.mute_flag = true;
    }

    fn clear_mute_flag(&mut self) {
        self.mute_flag = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_duration() {
        assert!(is_known_duration(12.5));
        assert!(!is_known_duration(0.0));
        assert!(!is_known_duration(f64::NAN));
        assert!(!is_known_duration(f64::INFINITY));
    }

    #[test]
    fn test_seek_clamps_to_duration() {
        let mut media = MediaState::new(30.0);
        media.seek(45.0);
        assert_eq!(media.current_time(), 30.0);
        media.seek(-1.0);
        assert_eq!(media.current_time(), 0.0);

        let mut unknown = MediaState::new(f64::NAN);
        unknown.seek(45.0);
        assert_eq!(unknown.current_time(), 45.0);
    }
}
