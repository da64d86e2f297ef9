mod diagnostics_dto;

pub use diagnostics_dto::*;
