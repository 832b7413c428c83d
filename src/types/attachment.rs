use std::path::Path;

use bytes::Bytes;

use crate::error::{Error, Result};

/// File extensions the client accepts as attachments.
pub const ACCEPTED_EXTENSIONS: &[&str] = &[
    "txt", "js", "py", "html", "css", "json", "pdf", "jpg", "jpeg", "png", "gif",
];

/// Largest attachment the client will send (16 MiB).
pub const MAX_ATTACHMENT_BYTES: usize = 16 * 1024 * 1024;

/// A file selected for the next outbound message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    /// File name sent with the multipart part.
    pub name: String,

    /// MIME type guessed from the extension.
    pub mime: &'static str,

    /// File contents.
    pub data: Bytes,
}

impl Attachment {
    /// Validates and wraps in-memory file contents.
    pub fn new(name: impl Into<String>, data: impl Into<Bytes>) -> Result<Self> {
        let name = name.into();
        let data = data.into();
        let extension = extension_of(&name).ok_or_else(|| {
            Error::validation(
                format!("{name} has no file extension"),
                Some("attachment".to_string()),
            )
        })?;
        if !ACCEPTED_EXTENSIONS.contains(&extension.as_str()) {
            return Err(Error::validation(
                format!("{name}: .{extension} files are not accepted"),
                Some("attachment".to_string()),
            ));
        }
        if data.len() > MAX_ATTACHMENT_BYTES {
            return Err(Error::validation(
                format!(
                    "{name} is {} bytes; the limit is {MAX_ATTACHMENT_BYTES}",
                    data.len()
                ),
                Some("attachment".to_string()),
            ));
        }
        Ok(Self {
            mime: mime_for(&extension),
            name,
            data,
        })
    }

    /// Reads and validates a file from disk.
    pub async fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let name = path
            .file_name()
            .and_then(|name| name.to_str())
            .ok_or_else(|| {
                Error::validation(
                    format!("{} is not a file path", path.display()),
                    Some("attachment".to_string()),
                )
            })?
            .to_string();
        // Check the extension before reading a possibly large file.
        if !extension_of(&name).is_some_and(|ext| ACCEPTED_EXTENSIONS.contains(&ext.as_str())) {
            return Self::new(name, Bytes::new());
        }
        let data = tokio::fs::read(path)
            .await
            .map_err(|err| Error::io(format!("failed to read {}", path.display()), err))?;
        Self::new(name, data)
    }
}

/// Trailer appended to the displayed user message when files ride along.
pub fn uploaded_files_note(attachments: &[Attachment]) -> Option<String> {
    if attachments.is_empty() {
        return None;
    }
    let names = attachments
        .iter()
        .map(|attachment| attachment.name.as_str())
        .collect::<Vec<_>>()
        .join(", ");
    Some(format!("\n\nUploaded files: {names}"))
}

/// Prompt used when files are sent without any accompanying text.
pub fn default_attachment_prompt(count: usize) -> String {
    if count > 1 {
        format!("I have uploaded {count} files. Please analyze them.")
    } else {
        format!("I have uploaded {count} file. Please analyze it.")
    }
}

fn extension_of(name: &str) -> Option<String> {
    let (stem, extension) = name.rsplit_once('.')?;
    if stem.is_empty() || extension.is_empty() {
        return None;
    }
    Some(extension.to_ascii_lowercase())
}

fn mime_for(extension: &str) -> &'static str {
    match extension {
        "txt" | "py" => "text/plain",
        "js" => "text/javascript",
        "html" => "text/html",
        "css" => "text/css",
        "json" => "application/json",
        "pdf" => "application/pdf",
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_known_extensions_case_insensitively() {
        let attachment = Attachment::new("Notes.TXT", "hello").unwrap();
        assert_eq!(attachment.mime, "text/plain");
        assert_eq!(attachment.data, Bytes::from_static(b"hello"));
    }

    #[test]
    fn rejects_unknown_extension() {
        let err = Attachment::new("archive.zip", "PK").unwrap_err();
        assert!(err.is_validation());
    }

    #[test]
    fn rejects_missing_extension() {
        assert!(Attachment::new("Makefile", "all:").is_err());
        assert!(Attachment::new(".bashrc", "").is_err());
    }

    #[test]
    fn rejects_oversized_files() {
        let data = vec![0u8; MAX_ATTACHMENT_BYTES + 1];
        assert!(Attachment::new("big.png", data).unwrap_err().is_validation());
    }

    #[test]
    fn uploaded_files_note_lists_names() {
        let files = vec![
            Attachment::new("a.py", "print()").unwrap(),
            Attachment::new("b.css", "p{}").unwrap(),
        ];
        assert_eq!(
            uploaded_files_note(&files).as_deref(),
            Some("\n\nUploaded files: a.py, b.css")
        );
        assert_eq!(uploaded_files_note(&[]), None);
    }

    #[test]
    fn default_prompt_pluralizes() {
        assert_eq!(
            default_attachment_prompt(1),
            "I have uploaded 1 file. Please analyze it."
        );
        assert_eq!(
            default_attachment_prompt(3),
            "I have uploaded 3 files. Please analyze them."
        );
    }

    #[tokio::test]
    async fn from_path_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("main.py");
        std::fs::write(&path, "print('hi')").unwrap();
        let attachment = Attachment::from_path(&path).await.unwrap();
        assert_eq!(attachment.name, "main.py");
        assert_eq!(attachment.data.len(), 11);
    }

    #[tokio::test]
    async fn from_path_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = Attachment::from_path(dir.path().join("absent.txt"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::Io);
    }
}
