pub mod voicemail_handler;

pub use voicemail_handler::{
    __path_delete_voicemail, __path_list_my_voicemails, __path_list_safe_voicemails,
    __path_list_voicemails, __path_update_voicemail_allowed, __path_upload_voicemail,
    delete_voicemail, list_my_voicemails, list_safe_voicemails, list_voicemails,
    update_voicemail_allowed, upload_voicemail,
};
