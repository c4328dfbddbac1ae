use crate::workflow::SelectedFile;
use actix_multipart::Multipart;
use actix_web::web::BytesMut;
use futures_util::StreamExt;
use std::collections::HashMap;
use thiserror::Error;

const MAX_TEXT_FIELD_BYTES: usize = 1024;

#[derive(Error, Debug)]
pub enum UploadFormError {
    #[error("Malformed multipart payload: {0}")]
    Payload(String),
    #[error("File is too large. Maximum size is {0}MB.")]
    TooLarge(u64),
    #[error("Invalid UTF-8 in form field '{0}'.")]
    InvalidUtf8(String),
    #[error("Form field '{0}' is too long.")]
    FieldTooLong(String),
}

impl From<actix_multipart::MultipartError> for UploadFormError {
    fn from(e: actix_multipart::MultipartError) -> Self {
        UploadFormError::Payload(e.to_string())
    }
}

/// The file part (if any) plus every small text field of an upload form.
#[derive(Debug, Default)]
pub struct UploadForm {
    pub file: Option<SelectedFile>,
    pub fields: HashMap<String, String>,
}

/// Drains a multipart payload. Only the part named `file_field` is kept as
/// the upload; other file parts are discarded. A part with neither a file
/// name nor content counts as "no file selected".
pub async fn read_upload_form(
    mut payload: Multipart,
    file_field: &str,
    max_file_size_mb: u64,
) -> Result<UploadForm, UploadFormError> {
    let max_bytes = max_file_size_mb.saturating_mul(1024 * 1024);
    let mut form = UploadForm::default();

    while let Some(item) = payload.next().await {
        let mut field = item?;
        let field_name = field.content_disposition().get_name().unwrap_or_default().to_string();
        let file_name = field.content_disposition().get_filename().map(|s| s.to_string());

        if field_name == file_field {
            let content_type = field.content_type().map(|m| m.to_string());
            let mut data = BytesMut::new();
            while let Some(chunk) = field.next().await {
                let chunk = chunk?;
                if (data.len() + chunk.len()) as u64 > max_bytes {
                    return Err(UploadFormError::TooLarge(max_file_size_mb));
                }
                data.extend_from_slice(&chunk);
            }
            let file_name = file_name.unwrap_or_default();
            if data.is_empty() && file_name.is_empty() {
                continue;
            }
            form.file = Some(SelectedFile {
                file_name: if file_name.is_empty() { "upload".to_string() } else { file_name },
                content_type,
                bytes: data.to_vec(),
            });
        } else if file_name.is_some() {
            while let Some(chunk) = field.next().await {
                chunk?;
            }
        } else {
            let mut data = BytesMut::new();
            while let Some(chunk) = field.next().await {
                data.extend_from_slice(&chunk?);
                if data.len() > MAX_TEXT_FIELD_BYTES {
                    return Err(UploadFormError::FieldTooLong(field_name));
                }
            }
            let value = String::from_utf8(data.to_vec()).map_err(|_| UploadFormError::InvalidUtf8(field_name.clone()))?;
            form.fields.insert(field_name, value);
        }
    }

    Ok(form)
}
