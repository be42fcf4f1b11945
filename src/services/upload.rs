//! Upload receiver: streams multipart files into the temp directory after
//! checking their declared type and size.

use axum::extract::{
    Multipart,
    multipart::{Field, MultipartError},
};
use std::{
    collections::HashMap,
    io::{self, ErrorKind},
    path::{Path, PathBuf},
};
use thiserror::Error;
use tokio::{
    fs::{self, File, OpenOptions},
    io::AsyncWriteExt,
};
use tracing::{debug, warn};

/// Declared content types accepted by any operation.
pub const ALLOWED_MIME_TYPES: [&str; 8] = [
    "application/pdf",
    "image/jpeg",
    "image/jpg",
    "image/png",
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
    "application/vnd.openxmlformats-officedocument.presentationml.presentation",
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
    "application/vnd.ms-excel",
];

const MAX_NAME_LEN: usize = 200;

#[derive(Debug, Error)]
pub enum UploadError {
    #[error("Invalid file type.")]
    InvalidFileType(String),
    #[error("File too large")]
    FileTooLarge { limit: u64 },
    #[error("Unexpected field")]
    UnexpectedField(String),
    #[error("Too many files")]
    TooManyFiles,
    #[error(transparent)]
    Multipart(#[from] MultipartError),
    #[error(transparent)]
    Io(#[from] io::Error),
}

pub type UploadResult<T> = Result<T, UploadError>;

/// One received file on disk. Owned by the request that created it.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub original_name: String,
    pub path: PathBuf,
    pub mime_type: String,
    pub size_bytes: u64,
}

/// Everything a request carried: files under the expected field plus the
/// plain text fields.
#[derive(Debug, Default)]
pub struct UploadSet {
    pub files: Vec<UploadedFile>,
    pub fields: HashMap<String, String>,
}

impl UploadSet {
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }

    /// Delete every stored file. Missing files are ignored.
    pub async fn cleanup(&self) {
        for file in &self.files {
            remove_quietly(&file.path).await;
        }
    }
}

/// Contract for one receive call.
#[derive(Debug, Clone, Copy)]
pub struct UploadLimits<'a> {
    /// Field the files must arrive under.
    pub field_name: &'a str,
    pub multiple: bool,
    /// Per-file size cap in bytes.
    pub max_file_size: u64,
}

#[derive(Clone, Debug)]
pub struct UploadReceiver {
    temp_dir: PathBuf,
}

impl UploadReceiver {
    pub fn new(temp_dir: impl Into<PathBuf>) -> Self {
        Self {
            temp_dir: temp_dir.into(),
        }
    }

    /// Consume the multipart body. On error every file already written is
    /// removed before returning.
    pub async fn receive(
        &self,
        mut multipart: Multipart,
        limits: UploadLimits<'_>,
    ) -> UploadResult<UploadSet> {
        let mut set = UploadSet::default();
        loop {
            let field = match multipart.next_field().await {
                Ok(Some(field)) => field,
                Ok(None) => break,
                Err(err) => {
                    set.cleanup().await;
                    return Err(err.into());
                }
            };
            if let Err(err) = self.accept_field(field, &limits, &mut set).await {
                set.cleanup().await;
                return Err(err);
            }
        }
        Ok(set)
    }

    async fn accept_field(
        &self,
        field: Field<'_>,
        limits: &UploadLimits<'_>,
        set: &mut UploadSet,
    ) -> UploadResult<()> {
        let name = field.name().unwrap_or_default().to_string();

        let Some(original_name) = field.file_name().map(str::to_string) else {
            let value = field.text().await?;
            set.fields.insert(name, value);
            return Ok(());
        };

        if name != limits.field_name {
            return Err(UploadError::UnexpectedField(name));
        }
        if !limits.multiple && !set.files.is_empty() {
            return Err(UploadError::TooManyFiles);
        }

        let mime_type = field
            .content_type()
            .unwrap_or("application/octet-stream")
            .to_ascii_lowercase();
        if !ALLOWED_MIME_TYPES.contains(&mime_type.as_str()) {
            return Err(UploadError::InvalidFileType(mime_type));
        }

        let (path, file) = self.create_temp_file(&original_name).await?;
        let stored = write_field(field, file, &path, limits.max_file_size).await;
        let size_bytes = match stored {
            Ok(size) => size,
            Err(err) => {
                remove_quietly(&path).await;
                return Err(err);
            }
        };

        debug!(
            "stored upload {} ({} bytes) at {}",
            original_name,
            size_bytes,
            path.display()
        );
        set.files.push(UploadedFile {
            original_name,
            path,
            mime_type,
            size_bytes,
        });
        Ok(())
    }

    /// Create `<unix-millis>-<name>` without clobbering a concurrent upload:
    /// on a clash the timestamp is bumped until the name is free.
    async fn create_temp_file(&self, original_name: &str) -> UploadResult<(PathBuf, File)> {
        fs::create_dir_all(&self.temp_dir).await?;
        let safe_name = sanitize_file_name(original_name);
        let mut stamp = chrono::Utc::now().timestamp_millis();
        loop {
            let path = self.temp_dir.join(format!("{}-{}", stamp, safe_name));
            match OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&path)
                .await
            {
                Ok(file) => return Ok((path, file)),
                Err(err) if err.kind() == ErrorKind::AlreadyExists => stamp += 1,
                Err(err) => return Err(err.into()),
            }
        }
    }
}

async fn write_field(
    mut field: Field<'_>,
    mut file: File,
    path: &Path,
    max_file_size: u64,
) -> UploadResult<u64> {
    let mut size: u64 = 0;
    loop {
        let Some(chunk) = field.chunk().await? else {
            break;
        };
        size += chunk.len() as u64;
        if size > max_file_size {
            debug!("upload {} exceeded {} bytes", path.display(), max_file_size);
            return Err(UploadError::FileTooLarge {
                limit: max_file_size,
            });
        }
        file.write_all(&chunk).await?;
    }
    file.flush().await?;
    Ok(size)
}

async fn remove_quietly(path: &Path) {
    match fs::remove_file(path).await {
        Ok(_) => debug!("removed temp file {}", path.display()),
        Err(err) if err.kind() == ErrorKind::NotFound => {}
        Err(err) => warn!("failed to remove temp file {}: {}", path.display(), err),
    }
}

/// Keep only the last path component and replace anything outside a
/// conservative character set.
pub fn sanitize_file_name(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or(name);
    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || matches!(c, '.' | '-' | '_' | ' ') {
                c
            } else {
                '_'
            }
        })
        .take(MAX_NAME_LEN)
        .collect();
    let trimmed = cleaned.trim_matches(|c| c == '.' || c == ' ');
    if trimmed.is_empty() {
        "upload".to_string()
    } else {
        trimmed.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::Body,
        extract::FromRequest,
        http::{Request, header},
    };

    const BOUNDARY: &str = "X-TEST-BOUNDARY";

    enum Part<'a> {
        File {
            field: &'a str,
            name: &'a str,
            mime: &'a str,
            bytes: &'a [u8],
        },
        Text {
            field: &'a str,
            value: &'a str,
        },
    }

    async fn multipart(parts: &[Part<'_>]) -> Multipart {
        let mut body = Vec::new();
        for part in parts {
            body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
            match part {
                Part::File {
                    field,
                    name,
                    mime,
                    bytes,
                } => {
                    body.extend_from_slice(
                        format!(
                            "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\nContent-Type: {}\r\n\r\n",
                            field, name, mime
                        )
                        .as_bytes(),
                    );
                    body.extend_from_slice(bytes);
                }
                Part::Text { field, value } => {
                    body.extend_from_slice(
                        format!(
                            "Content-Disposition: form-data; name=\"{}\"\r\n\r\n{}",
                            field, value
                        )
                        .as_bytes(),
                    );
                }
            }
            body.extend_from_slice(b"\r\n");
        }
        body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());

        let request = Request::builder()
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={}", BOUNDARY),
            )
            .body(Body::from(body))
            .unwrap();
        Multipart::from_request(request, &()).await.unwrap()
    }

    fn limits(field_name: &str, multiple: bool) -> UploadLimits<'_> {
        UploadLimits {
            field_name,
            multiple,
            max_file_size: 1024,
        }
    }

    fn temp_files(dir: &Path) -> usize {
        std::fs::read_dir(dir).map(|d| d.count()).unwrap_or(0)
    }

    #[tokio::test]
    async fn stores_files_and_collects_text_fields() {
        let dir = tempfile::tempdir().unwrap();
        let receiver = UploadReceiver::new(dir.path());
        let body = multipart(&[
            Part::File {
                field: "pdf",
                name: "report.pdf",
                mime: "application/pdf",
                bytes: b"%PDF-1.4 data",
            },
            Part::Text {
                field: "password",
                value: "hunter2",
            },
        ])
        .await;

        let set = receiver.receive(body, limits("pdf", false)).await.unwrap();
        assert_eq!(set.field("password"), Some("hunter2"));
        assert_eq!(set.files.len(), 1);
        let file = &set.files[0];
        assert_eq!(file.original_name, "report.pdf");
        assert_eq!(file.size_bytes, 13);
        let stored_name = file.path.file_name().unwrap().to_str().unwrap();
        let (stamp, rest) = stored_name.split_once('-').unwrap();
        assert!(stamp.parse::<i64>().is_ok());
        assert_eq!(rest, "report.pdf");
        assert_eq!(std::fs::read(&file.path).unwrap(), b"%PDF-1.4 data");

        set.cleanup().await;
        assert_eq!(temp_files(dir.path()), 0);
    }

    #[tokio::test]
    async fn rejects_disallowed_type_and_cleans_up() {
        let dir = tempfile::tempdir().unwrap();
        let receiver = UploadReceiver::new(dir.path());
        let body = multipart(&[
            Part::File {
                field: "pdfs",
                name: "a.pdf",
                mime: "application/pdf",
                bytes: b"one",
            },
            Part::File {
                field: "pdfs",
                name: "evil.exe",
                mime: "application/x-msdownload",
                bytes: b"MZ",
            },
        ])
        .await;

        let err = receiver.receive(body, limits("pdfs", true)).await.unwrap_err();
        assert!(matches!(err, UploadError::InvalidFileType(_)));
        assert_eq!(err.to_string(), "Invalid file type.");
        assert_eq!(temp_files(dir.path()), 0);
    }

    #[tokio::test]
    async fn rejects_oversized_file() {
        let dir = tempfile::tempdir().unwrap();
        let receiver = UploadReceiver::new(dir.path());
        let big = vec![b'x'; 2048];
        let body = multipart(&[Part::File {
            field: "pdf",
            name: "big.pdf",
            mime: "application/pdf",
            bytes: &big,
        }])
        .await;

        let err = receiver.receive(body, limits("pdf", false)).await.unwrap_err();
        assert!(matches!(err, UploadError::FileTooLarge { limit: 1024 }));
        assert_eq!(temp_files(dir.path()), 0);
    }

    #[tokio::test]
    async fn rejects_wrong_field_and_extra_files() {
        let dir = tempfile::tempdir().unwrap();
        let receiver = UploadReceiver::new(dir.path());

        let body = multipart(&[Part::File {
            field: "images",
            name: "a.pdf",
            mime: "application/pdf",
            bytes: b"x",
        }])
        .await;
        let err = receiver.receive(body, limits("pdf", false)).await.unwrap_err();
        assert!(matches!(err, UploadError::UnexpectedField(f) if f == "images"));

        let two = multipart(&[
            Part::File {
                field: "pdf",
                name: "a.pdf",
                mime: "application/pdf",
                bytes: b"x",
            },
            Part::File {
                field: "pdf",
                name: "b.pdf",
                mime: "application/pdf",
                bytes: b"y",
            },
        ])
        .await;
        let err = receiver.receive(two, limits("pdf", false)).await.unwrap_err();
        assert!(matches!(err, UploadError::TooManyFiles));
        assert_eq!(temp_files(dir.path()), 0);
    }

    #[tokio::test]
    async fn same_name_same_moment_does_not_collide() {
        let dir = tempfile::tempdir().unwrap();
        let receiver = UploadReceiver::new(dir.path());
        let body = multipart(&[
            Part::File {
                field: "pdfs",
                name: "same.pdf",
                mime: "application/pdf",
                bytes: b"first",
            },
            Part::File {
                field: "pdfs",
                name: "same.pdf",
                mime: "application/pdf",
                bytes: b"second",
            },
        ])
        .await;

        let set = receiver.receive(body, limits("pdfs", true)).await.unwrap();
        assert_eq!(set.files.len(), 2);
        assert_ne!(set.files[0].path, set.files[1].path);
        assert_eq!(std::fs::read(&set.files[0].path).unwrap(), b"first");
        assert_eq!(std::fs::read(&set.files[1].path).unwrap(), b"second");
    }

    #[test]
    fn file_names_are_sanitized() {
        assert_eq!(sanitize_file_name("../../etc/passwd"), "passwd");
        assert_eq!(sanitize_file_name("C:\\docs\\q1 report.pdf"), "q1 report.pdf");
        assert_eq!(sanitize_file_name("a\"b<c>.pdf"), "a_b_c_.pdf");
        assert_eq!(sanitize_file_name(".."), "upload");
    }
}
