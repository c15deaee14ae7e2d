//! Haptic feedback
//!
//! Alerts vibrate with one fixed pattern regardless of tier. Hosts without an
//! actuator report an error, which the notifier logs and otherwise ignores.

use std::sync::Mutex;
use std::time::Duration;

use crate::errors::{AppError, AppResult, NotifyChannel};

/// Alternating off/on segments, starting with an initial delay.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Waveform {
    pub segments: Vec<Duration>,
}

impl Waveform {
    /// delay, pulse, pause, pulse, pause, pulse
    pub fn cry_alert() -> Self {
        Self {
            segments: [0u64, 500, 200, 500, 200, 500]
                .into_iter()
                .map(Duration::from_millis)
                .collect(),
        }
    }

    pub fn total(&self) -> Duration {
        self.segments.iter().sum()
    }
}

pub trait Haptics: Send + Sync {
    /// Start playing the waveform. Must not block for its duration.
    fn vibrate(&self, waveform: &Waveform) -> AppResult<()>;
}

/// Host without a vibration motor
#[derive(Debug, Default)]
pub struct NoActuator;

impl Haptics for NoActuator {
    fn vibrate(&self, _waveform: &Waveform) -> AppResult<()> {
        Err(AppError::notify(NotifyChannel::Haptic, "no vibration actuator available"))
    }
}

/// Remembers every waveform it was asked to play
#[derive(Debug, Default)]
pub struct RecordingHaptics {
    played: Mutex<Vec<Waveform>>,
}

impl RecordingHaptics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn played(&self) -> Vec<Waveform> {
        self.played.lock().map(|p| p.clone()).unwrap_or_default()
    }
}

impl Haptics for RecordingHaptics {
    fn vibrate(&self, waveform: &Waveform) -> AppResult<()> {
        self.played
            .lock()
            .map_err(|_| AppError::internal("haptics recorder poisoned"))?
            .push(waveform.clone());
        Ok(())
    }
}
