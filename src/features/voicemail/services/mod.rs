mod voicemail_service;

pub use voicemail_service::VoicemailService;
