use std::{
    sync::{Mutex, PoisonError},
    time::Duration,
};

use accord_client::{Audio, Haptics};

/// Remembers every clip it was asked to play
#[derive(Default)]
pub struct RecordingAudio {
    clips: Mutex<Vec<String>>,
}

impl RecordingAudio {
    pub fn clips(&self) -> Vec<String> {
        self.clips
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn played(&self, clip: &str) -> usize {
        self.clips().iter().filter(|played| *played == clip).count()
    }
}

impl Audio for RecordingAudio {
    fn play(&self, clip: &str) {
        self.clips
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(clip.to_string());
    }
}

/// Remembers every pulse it was asked for
#[derive(Default)]
pub struct RecordingHaptics {
    pulses: Mutex<Vec<(f32, Duration)>>,
}

impl RecordingHaptics {
    pub fn pulses(&self) -> Vec<(f32, Duration)> {
        self.pulses
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl Haptics for RecordingHaptics {
    fn pulse(&self, intensity: f32, duration: Duration) {
        self.pulses
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((intensity, duration));
    }
}
