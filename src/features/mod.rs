pub mod diagnostics;
pub mod voicemail;
