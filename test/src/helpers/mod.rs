pub mod assertions;
pub mod pump;
pub mod recording;
pub mod scene_loader;
pub mod test_player;

pub use pump::{pump, pump_until, FRAME};
pub use recording::{RecordingAudio, RecordingHaptics};
pub use scene_loader::ScriptedSceneLoader;
pub use test_player::TestPlayer;
