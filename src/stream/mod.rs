pub mod audio;

pub use audio::{AudioAction, AudioPipeline, PreparedAudio};
