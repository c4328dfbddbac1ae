pub mod crop_helpers;
pub mod media_helpers;
pub mod sanitization_helpers;
pub mod upload_helpers;
