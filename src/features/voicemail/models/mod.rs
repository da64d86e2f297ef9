mod voicemail;

pub use voicemail::{NewVoicemail, Voicemail, VoicemailStatus};
