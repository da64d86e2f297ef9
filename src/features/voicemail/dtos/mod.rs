mod voicemail_dto;

pub use voicemail_dto::*;
