// Multipart form reading for the administration routes
use crate::domain::forms::PhotoUpload;
use crate::presentation::http_response::ApiError;
use axum::extract::Multipart;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

const PHOTO_FIELDS: [&str; 2] = ["foto", "photo"];

/// Text fields of a multipart form plus its optional photo.
#[derive(Debug, Default)]
pub struct UploadedForm {
    fields: Map<String, Value>,
    pub photo: Option<PhotoUpload>,
}

impl UploadedForm {
    pub async fn read(mut multipart: Multipart) -> Result<Self, ApiError> {
        let mut form = UploadedForm::default();
        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| ApiError::BadRequest(e.body_text()))?
        {
            let name = field.name().unwrap_or_default().to_string();
            if PHOTO_FIELDS.contains(&name.as_str()) {
                let file_name = field.file_name().unwrap_or("foto").to_string();
                let content_type = field.content_type().map(str::to_string);
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::BadRequest(e.body_text()))?;
                if !bytes.is_empty() {
                    form.photo = Some(PhotoUpload {
                        file_name,
                        content_type,
                        bytes: bytes.to_vec(),
                    });
                }
                continue;
            }
            let value = field
                .text()
                .await
                .map_err(|e| ApiError::BadRequest(e.body_text()))?;
            form.insert(&name, value);
        }
        Ok(form)
    }

    /// Repeated names, and names ending in `[]`, collect into a list.
    fn insert(&mut self, name: &str, value: String) {
        let (key, listed) = match name.strip_suffix("[]") {
            Some(key) => (key, true),
            None => (name, false),
        };
        match self.fields.get_mut(key) {
            Some(Value::Array(values)) => values.push(Value::String(value)),
            Some(existing) => {
                let first = existing.take();
                *existing = Value::Array(vec![first, Value::String(value)]);
            }
            None if listed => {
                self.fields
                    .insert(key.to_string(), Value::Array(vec![Value::String(value)]));
            }
            None => {
                self.fields.insert(key.to_string(), Value::String(value));
            }
        }
    }

    /// Path ids win over whatever the body carried.
    pub fn with_id(mut self, id: &str) -> Self {
        self.fields
            .insert("external_id".to_string(), Value::String(id.to_string()));
        self
    }

    pub fn parse<F: DeserializeOwned>(self) -> Result<(F, Option<PhotoUpload>), ApiError> {
        let form = serde_json::from_value(Value::Object(self.fields))
            .map_err(|e| ApiError::BadRequest(format!("Invalid form: {}", e)))?;
        Ok((form, self.photo))
    }
}
