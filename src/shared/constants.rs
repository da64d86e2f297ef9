/// Multipart field carrying the audio blob
pub const FIELD_AUDIO: &str = "audio";

/// Extension given to uploads that arrive without a filename
pub const FALLBACK_AUDIO_EXTENSION: &str = "webm";

// =============================================================================
// RESPONSE MESSAGES
// =============================================================================

pub const MSG_AUDIO_REQUIRED: &str = "Audio is required";

pub const MSG_IDENTITY_REQUIRED: &str = "Forbidden";

pub const MSG_TOO_MANY_REQUESTS: &str = "Too many requests";

pub const MSG_VOICEMAIL_NOT_FOUND: &str = "Voicemail not found";
