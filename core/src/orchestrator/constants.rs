pub(crate) const TARGET: &str = "pipeline";
pub(crate) const PREVIEW_CHARS: usize = 50;
pub(crate) const NO_INPUT_MESSAGE: &str = "text or audio input is required";
pub(crate) const NO_SPEECH_MESSAGE: &str = "no speech was recognized in the audio input";
