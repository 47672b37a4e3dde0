use std::{sync::Arc, time::Duration};

use log::debug;
use tokio::sync::oneshot;

use accord_shared::{puzzle::PuzzleEvent, SceneId};

/// Plays audio clips. Calls are fire-and-forget
pub trait Audio: Send + Sync {
    fn play(&self, clip: &str);
}

/// Drives controller vibration. Calls are fire-and-forget
pub trait Haptics: Send + Sync {
    fn pulse(&self, intensity: f32, duration: Duration);
}

/// Loads scenes locally when the authority starts a transition
pub trait SceneLoader: Send + Sync {
    /// Begin loading `scene`. Call [`SceneLoadDone::report`] once it is
    /// ready; dropping `done` instead leaves the load unreported, and the
    /// authority eventually times this participant out
    fn load(&self, scene: &SceneId, done: SceneLoadDone);
}

/// One-shot completion signal handed to a [`SceneLoader`]
pub struct SceneLoadDone {
    scene: SceneId,
    sender: oneshot::Sender<SceneId>,
}

impl SceneLoadDone {
    pub(crate) fn new(scene: SceneId) -> (Self, oneshot::Receiver<SceneId>) {
        let (sender, receiver) = oneshot::channel();
        (Self { scene, sender }, receiver)
    }

    pub fn scene(&self) -> &SceneId {
        &self.scene
    }

    pub fn report(self) {
        if self.sender.send(self.scene).is_err() {
            debug!("scene load finished after the client stopped waiting");
        }
    }
}

/// Plays nothing
pub struct Silent;

impl Audio for Silent {
    fn play(&self, _clip: &str) {}
}

impl Haptics for Silent {
    fn pulse(&self, _intensity: f32, _duration: Duration) {}
}

/// Reports every scene as loaded as soon as it is requested
pub struct InstantSceneLoader;

impl SceneLoader for InstantSceneLoader {
    fn load(&self, _scene: &SceneId, done: SceneLoadDone) {
        done.report();
    }
}

/// The external systems a client reaches into
#[derive(Clone)]
pub struct Collaborators {
    pub audio: Arc<dyn Audio>,
    pub haptics: Arc<dyn Haptics>,
    pub scene_loader: Arc<dyn SceneLoader>,
}

impl Default for Collaborators {
    fn default() -> Self {
        Self {
            audio: Arc::new(Silent),
            haptics: Arc::new(Silent),
            scene_loader: Arc::new(InstantSceneLoader),
        }
    }
}

pub const ACTIVATE_CLIP: &str = "puzzle/activate";
pub const DEACTIVATE_CLIP: &str = "puzzle/deactivate";
pub const FAIL_CLIP: &str = "puzzle/fail";
pub const SOLVED_CLIP: &str = "puzzle/solved";
pub const SLOT_CLIP: &str = "puzzle/slot";

impl Collaborators {
    /// Plays the feedback for a puzzle transition
    pub(crate) fn puzzle_feedback(&self, event: &PuzzleEvent) {
        match event {
            PuzzleEvent::Activated { .. } => {
                self.audio.play(ACTIVATE_CLIP);
                self.haptics.pulse(0.3, Duration::from_millis(40));
            }
            PuzzleEvent::Deactivated { .. } => self.audio.play(DEACTIVATE_CLIP),
            PuzzleEvent::Failed { .. } => {
                self.audio.play(FAIL_CLIP);
                self.haptics.pulse(0.8, Duration::from_millis(200));
            }
            PuzzleEvent::Solved => self.audio.play(SOLVED_CLIP),
            PuzzleEvent::SlotFilled { .. } => {
                self.audio.play(SLOT_CLIP);
                self.haptics.pulse(0.2, Duration::from_millis(30));
            }
            PuzzleEvent::PatternShown { pattern, .. } => {
                for note in pattern {
                    self.audio.play(&note_clip(note.0));
                }
            }
            PuzzleEvent::PlaybackNote { note, .. } => self.audio.play(&note_clip(note.0)),
            PuzzleEvent::Reset { .. }
            | PuzzleEvent::CollectionStarted
            | PuzzleEvent::SlotCleared { .. }
            | PuzzleEvent::PlaybackStarted => {}
        }
    }
}

/// The clip played for a musical note element
pub fn note_clip(note: u32) -> String {
    match char::from_u32(note) {
        Some(name) if name.is_ascii_alphanumeric() => format!("note/{}", name),
        _ => format!("note/{}", note),
    }
}
