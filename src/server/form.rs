//! Multipart form parsing. Every part is read once into a `FormValue`, so
//! handlers match on a tag instead of probing part types at runtime.

use super::protocol::{FormValue, UploadedImage};
use super::WebError;
use actix_multipart::Multipart;
use actix_web::http::header::HeaderMap;
use actix_web::web;
use futures_util::StreamExt;
use std::collections::HashMap;

#[derive(Debug, Default)]
pub struct Form {
    values: HashMap<String, FormValue>,
}

impl Form {
    /// Read the whole multipart body, failing once more than `limit` bytes of
    /// part content have been received. The first part of a given name wins.
    pub async fn read(
        headers: &HeaderMap,
        payload: web::Payload,
        limit: usize,
    ) -> Result<Self, WebError> {
        let mut multipart = Multipart::new(headers, payload);
        let mut form = Form::default();
        let mut total = 0usize;

        while let Some(field) = multipart.next().await {
            let mut field = field?;
            let (name, filename) = {
                let disposition = field.content_disposition();
                (
                    disposition.get_name().unwrap_or_default().to_owned(),
                    disposition.get_filename().map(str::to_owned),
                )
            };
            let content_type = field.content_type().map(|mime| mime.to_string());

            let mut bytes = Vec::new();
            while let Some(chunk) = field.next().await {
                let chunk = chunk?;
                total += chunk.len();
                if total > limit {
                    return Err(WebError::PayloadTooLarge(limit));
                }
                bytes.extend_from_slice(&chunk);
            }

            let value = match filename {
                Some(filename) => FormValue::File(UploadedImage {
                    bytes,
                    filename: Some(filename),
                    content_type,
                }),
                None => FormValue::Text(String::from_utf8_lossy(&bytes).into_owned()),
            };
            tracing::debug!("parsed form field {name:?}");
            form.values.entry(name).or_insert(value);
        }

        Ok(form)
    }

    /// Remove the file part called `name`. Missing fields and text fields are
    /// both client errors.
    pub fn take_file(&mut self, name: &str) -> Result<UploadedImage, WebError> {
        match self.values.remove(name) {
            Some(FormValue::File(file)) => Ok(file),
            _ => Err(WebError::BadRequest(format!(
                "Expected form field '{name}' with a file"
            ))),
        }
    }
}
