use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;
use std::path::{Path, PathBuf};
use uuid::Uuid;

use super::category::DocumentCategory;

/// Opaque capability that must be resolved before the file behind it can be read.
/// The bytes are produced and interpreted only by an `AccessProvider`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(transparent)]
pub struct AccessToken(Vec<u8>);

impl AccessToken {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// A file reference handed over by the document picker: a plain path or a
/// `file://` URL.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ExternalReference(String);

impl ExternalReference {
    pub fn new(reference: impl Into<String>) -> Self {
        Self(reference.into())
    }

    pub fn from_path(path: &Path) -> Self {
        Self(path_to_text(path))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Filesystem path the reference points at; `file://` URLs are percent-decoded
    pub fn to_path(&self) -> PathBuf {
        path_from_text(&self.0)
    }

    /// Last path component, used as the display name while the item is processed
    pub fn file_name(&self) -> String {
        match self.to_path().file_name() {
            Some(name) => name.to_string_lossy().into_owned(),
            None => self.0.clone(),
        }
    }
}

impl fmt::Display for ExternalReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Lossless text form of a path: the path itself when it is valid UTF-8,
/// otherwise a `file://` URL with the raw bytes percent-encoded
pub fn path_to_text(path: &Path) -> String {
    match path.to_str() {
        Some(text) => text.to_string(),
        None => format!("file://{}", urlencoding::encode_binary(&path_bytes(path))),
    }
}

/// Inverse of [`path_to_text`]; also accepts any percent-encoded `file://` URL
pub fn path_from_text(text: &str) -> PathBuf {
    match text.strip_prefix("file://") {
        Some(rest) => path_from_bytes(urlencoding::decode_binary(rest.as_bytes()).into_owned()),
        None => PathBuf::from(text),
    }
}

#[cfg(unix)]
fn path_bytes(path: &Path) -> Vec<u8> {
    use std::os::unix::ffi::OsStrExt;
    path.as_os_str().as_bytes().to_vec()
}

#[cfg(not(unix))]
fn path_bytes(path: &Path) -> Vec<u8> {
    path.to_string_lossy().into_owned().into_bytes()
}

#[cfg(unix)]
fn path_from_bytes(bytes: Vec<u8>) -> PathBuf {
    use std::os::unix::ffi::OsStringExt;
    PathBuf::from(std::ffi::OsString::from_vec(bytes))
}

#[cfg(not(unix))]
fn path_from_bytes(bytes: Vec<u8>) -> PathBuf {
    PathBuf::from(String::from_utf8_lossy(&bytes).into_owned())
}

/// Lower-cased extension of a path, read from the extension alone so that
/// names which are not valid UTF-8 still classify
pub fn extension_of_path(path: &Path) -> String {
    path.extension()
        .map(|ext| ext.to_string_lossy().to_lowercase())
        .unwrap_or_default()
}

/// Lower-cased extension of a file name, or an empty string when it has none
pub fn file_extension_of(name: &str) -> String {
    Path::new(name)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_lowercase())
        .unwrap_or_default()
}

/// Session-scoped result of importing one file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadedFile {
    pub id: Uuid,
    pub name: String,
    pub size: i64,
    pub date: DateTime<Utc>,
    pub file_extension: String,
    pub path: String,
    pub access_token: AccessToken,
}

impl UploadedFile {
    pub fn new(name: String, size: i64, path: String, access_token: AccessToken) -> Self {
        let file_extension = file_extension_of(&name);
        Self {
            id: Uuid::new_v4(),
            name,
            size: size.max(0),
            date: Utc::now(),
            file_extension,
            path,
            access_token,
        }
    }

    pub fn category(&self) -> DocumentCategory {
        DocumentCategory::classify(&self.file_extension)
    }
}

/// Persistent catalog entry
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct FileRecord {
    pub id: Uuid,
    pub name: String,
    pub file_extension: String,
    pub size: i64,
    pub date_uploaded: DateTime<Utc>,
    pub path: String,
    pub access_token: AccessToken,
}

impl FileRecord {
    /// Record for a file imported for the first time
    pub fn from_upload(upload: &UploadedFile) -> Self {
        Self {
            id: upload.id,
            name: upload.name.clone(),
            file_extension: upload.file_extension.to_lowercase(),
            size: upload.size,
            date_uploaded: upload.date,
            path: upload.path.clone(),
            access_token: upload.access_token.clone(),
        }
    }

    /// Overwrite every mutable field from a re-import, keeping the identity
    pub fn apply_upload(&mut self, upload: &UploadedFile) {
        self.name = upload.name.clone();
        self.file_extension = upload.file_extension.to_lowercase();
        self.size = upload.size;
        self.date_uploaded = upload.date;
        self.path = upload.path.clone();
        self.access_token = upload.access_token.clone();
    }

    pub fn category(&self) -> DocumentCategory {
        DocumentCategory::classify(&self.file_extension)
    }
}
