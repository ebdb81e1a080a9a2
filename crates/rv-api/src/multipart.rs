//! Collects a `multipart/form-data` body into text fields and file parts.

use std::collections::HashMap;

use actix_multipart::Multipart;
use futures_util::StreamExt;
use rv_core::error::{AppError, Result};
use rv_core::models::Upload;

/// Per-part ceiling; the media store applies its own limit on top.
const MAX_PART_BYTES: usize = 12 * 1024 * 1024;

#[derive(Debug, Default)]
pub struct ParsedForm {
    pub fields: HashMap<String, String>,
    /// (field name, file) in submission order. Empty file inputs are dropped.
    pub files: Vec<(String, Upload)>,
}

impl ParsedForm {
    pub fn take(&mut self, name: &str) -> Option<String> {
        self.fields.remove(name)
    }

    /// First file submitted under `name`.
    pub fn take_file(&mut self, name: &str) -> Option<Upload> {
        let pos = self.files.iter().position(|(n, _)| n == name)?;
        Some(self.files.remove(pos).1)
    }

    pub fn into_files(self) -> Vec<Upload> {
        self.files.into_iter().map(|(_, f)| f).collect()
    }
}

fn malformed(err: impl std::fmt::Display) -> AppError {
    AppError::validation(format!("malformed form body: {err}"))
}

pub async fn parse_multipart(mut payload: Multipart) -> Result<ParsedForm> {
    let mut form = ParsedForm::default();

    while let Some(item) = payload.next().await {
        let mut field = item.map_err(malformed)?;

        let disposition = field.content_disposition();
        let name = disposition.get_name().unwrap_or_default().to_string();
        let file_name = disposition.get_filename().map(str::to_string);
        let content_type = field.content_type().map(|m| m.to_string());

        let mut data = Vec::new();
        while let Some(chunk) = field.next().await {
            let chunk = chunk.map_err(malformed)?;
            if data.len() + chunk.len() > MAX_PART_BYTES {
                return Err(AppError::validation(format!("'{name}' is too large")));
            }
            data.extend_from_slice(&chunk);
        }

        match file_name {
            Some(file_name) => {
                if data.is_empty() {
                    continue;
                }
                let content_type = content_type.unwrap_or_else(|| {
                    mime_guess::from_path(&file_name).first_or_octet_stream().to_string()
                });
                form.files.push((name, Upload { file_name, content_type, data }));
            }
            None => {
                let value = String::from_utf8(data).map_err(malformed)?;
                form.fields.insert(name, value);
            }
        }
    }

    Ok(form)
}
