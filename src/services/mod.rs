pub mod code_service;
pub mod profile_service;
pub mod reply_service;
pub mod signature_service;
