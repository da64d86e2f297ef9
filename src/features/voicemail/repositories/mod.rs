mod voicemail_repository;

pub use voicemail_repository::{SqliteVoicemailRepository, VoicemailFilter, VoicemailRepository};
