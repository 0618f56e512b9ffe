use std::collections::HashMap;

use axum::{
    extract::Multipart,
    http::{HeaderMap, HeaderValue, header::COOKIE},
};
use registry::Credentials;
use tokio::task::spawn_blocking;

use crate::{
    error::AppError::{self, InternalError, MalformedPayload},
    session::{SESSION_COOKIE, SESSION_MAX_AGE},
};

pub fn session_cookie(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, value)| *name == SESSION_COOKIE && !value.is_empty())
        .map(|(_, value)| value.to_string())
}

pub fn set_session_cookie(token: &str, secure: bool) -> Result<HeaderValue, AppError> {
    cookie_header(token, SESSION_MAX_AGE, secure)
}

pub fn clear_session_cookie(secure: bool) -> Result<HeaderValue, AppError> {
    cookie_header("", 0, secure)
}

fn cookie_header(value: &str, max_age: i64, secure: bool) -> Result<HeaderValue, AppError> {
    let mut cookie =
        format!("{SESSION_COOKIE}={value}; HttpOnly; Path=/; Max-Age={max_age}; SameSite=Lax");

    if secure {
        cookie.push_str("; Secure");
    }

    HeaderValue::from_str(&cookie).map_err(|e| InternalError(e.to_string()))
}

pub struct UploadedFile {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

/// Text fields and non-empty file parts of a multipart submission.
#[derive(Default)]
pub struct MultipartForm {
    pub fields: HashMap<String, String>,
    pub files: HashMap<String, UploadedFile>,
}

impl MultipartForm {
    pub fn text(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(|value| value.trim())
    }

    pub fn required(&self, name: &str) -> Result<String, AppError> {
        self.text(name)
            .filter(|value| !value.is_empty())
            .map(str::to_string)
            .ok_or_else(|| MalformedPayload(format!("{name} is required")))
    }

    pub fn file(&self, name: &str) -> Option<&UploadedFile> {
        self.files.get(name)
    }
}

pub async fn read_multipart(mut multipart: Multipart) -> Result<MultipartForm, AppError> {
    let mut form = MultipartForm::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| MalformedPayload(e.to_string()))?
    {
        let Some(name) = field.name().map(str::to_string) else {
            continue;
        };
        let file_name = field.file_name().map(str::to_string);
        let bytes = field
            .bytes()
            .await
            .map_err(|e| MalformedPayload(e.to_string()))?;

        match file_name {
            // browsers send an empty part named "undefined" when nothing was picked
            Some(file_name) => {
                if !bytes.is_empty() && file_name != "undefined" {
                    form.files.insert(
                        name,
                        UploadedFile {
                            file_name,
                            bytes: bytes.to_vec(),
                        },
                    );
                }
            }
            None => {
                let text = String::from_utf8(bytes.to_vec())
                    .map_err(|_| MalformedPayload(format!("{name} is not UTF-8")))?;
                form.fields.insert(name, text);
            }
        }
    }

    Ok(form)
}

pub async fn hash_password(credentials: Credentials, plaintext: String) -> Result<String, AppError> {
    spawn_blocking(move || credentials.hash_password(&plaintext))
        .await
        .map_err(|e| InternalError(e.to_string()))
}

pub async fn verify_password(
    credentials: Credentials,
    plaintext: String,
    stored: String,
) -> Result<bool, AppError> {
    spawn_blocking(move || credentials.verify_password(&plaintext, &stored))
        .await
        .map_err(|e| InternalError(e.to_string()))
}
