//! Upload file validation
//!
//! Pure checks against fixed allow-lists; nothing here touches storage.

use crate::error::LibraryError;

const AUDIO_EXTENSIONS: &[&str] = &["mp3", "wav", "ogg", "flac"];
const AUDIO_MIME_TYPES: &[&str] = &[
    "audio/mpeg",
    "audio/mp3",
    "audio/wav",
    "audio/wave",
    "audio/x-wav",
    "audio/ogg",
    "audio/flac",
    "audio/x-flac",
];

const VIDEO_EXTENSIONS: &[&str] = &["mp4"];
const VIDEO_MIME_TYPES: &[&str] = &["video/mp4"];

/// An upload as received from the caller: original filename, declared
/// content type, and the raw bytes.
#[derive(Debug, Clone)]
pub struct UploadFile {
    pub name: String,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

impl UploadFile {
    pub fn new(name: impl Into<String>, content_type: Option<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            content_type,
            bytes,
        }
    }

    /// Lowercased filename extension, empty when there is none.
    pub fn extension(&self) -> String {
        self.name
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_ascii_lowercase())
            .unwrap_or_default()
    }
}

pub fn validate_audio(file: &UploadFile, max_bytes: u64) -> Result<(), LibraryError> {
    if file.bytes.is_empty() {
        return Err(LibraryError::InvalidFile("file is required".into()));
    }

    if file.bytes.len() as u64 > max_bytes {
        return Err(LibraryError::InvalidFile(format!(
            "file size exceeds the maximum allowed limit of {}MB",
            max_bytes / (1024 * 1024)
        )));
    }

    let extension = file.extension();
    if !AUDIO_EXTENSIONS.contains(&extension.as_str()) {
        return Err(LibraryError::InvalidFile(format!(
            "invalid file format, allowed formats: {}",
            AUDIO_EXTENSIONS.join(", ")
        )));
    }

    // A declared content type must look like audio; an absent one is
    // accepted (the extension check already ran).
    if let Some(content_type) = file.content_type.as_deref() {
        let content_type = content_type.to_ascii_lowercase();
        if !AUDIO_MIME_TYPES.contains(&content_type.as_str())
            && !content_type.starts_with("audio/")
        {
            return Err(LibraryError::InvalidFile(
                "invalid file type, please upload an audio file".into(),
            ));
        }
    }

    Ok(())
}

pub fn validate_video(file: &UploadFile, max_bytes: u64) -> Result<(), LibraryError> {
    if file.bytes.is_empty() {
        return Err(LibraryError::InvalidFile("video file is required".into()));
    }

    if file.bytes.len() as u64 > max_bytes {
        return Err(LibraryError::InvalidFile(format!(
            "video file too large, maximum size is {}MB",
            max_bytes / (1024 * 1024)
        )));
    }

    // Videos must declare their type.
    match file.content_type.as_deref() {
        Some(ct) if VIDEO_MIME_TYPES.contains(&ct.to_ascii_lowercase().as_str()) => {}
        _ => {
            return Err(LibraryError::InvalidFile(
                "invalid video format, only MP4 is supported".into(),
            ));
        }
    }

    let extension = file.extension();
    if !VIDEO_EXTENSIONS.contains(&extension.as_str()) {
        return Err(LibraryError::InvalidFile(
            "invalid file extension, only .mp4 is supported".into(),
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const MAX: u64 = 1024;

    fn audio(name: &str, content_type: Option<&str>, len: usize) -> UploadFile {
        UploadFile::new(name, content_type.map(String::from), vec![0u8; len])
    }

    #[test]
    fn accepts_a_well_formed_audio_file() {
        assert!(validate_audio(&audio("song.mp3", Some("audio/mpeg"), 100), MAX).is_ok());
        assert!(validate_audio(&audio("song.FLAC", None, 100), MAX).is_ok());
    }

    #[test]
    fn rejects_empty_file() {
        assert!(matches!(
            validate_audio(&audio("song.mp3", None, 0), MAX),
            Err(LibraryError::InvalidFile(_))
        ));
    }

    #[test]
    fn rejects_oversized_file() {
        assert!(matches!(
            validate_audio(&audio("song.mp3", None, 2048), MAX),
            Err(LibraryError::InvalidFile(_))
        ));
    }

    #[test]
    fn rejects_unknown_extension() {
        assert!(validate_audio(&audio("song.aac", None, 100), MAX).is_err());
        assert!(validate_audio(&audio("noextension", None, 100), MAX).is_err());
    }

    #[test]
    fn rejects_non_audio_content_type() {
        assert!(validate_audio(&audio("song.mp3", Some("video/mp4"), 100), MAX).is_err());
    }

    #[test]
    fn accepts_any_audio_subtype() {
        assert!(validate_audio(&audio("song.ogg", Some("audio/opus"), 100), MAX).is_ok());
    }

    #[test]
    fn video_requires_mp4_and_declared_type() {
        assert!(validate_video(&audio("clip.mp4", Some("video/mp4"), 100), MAX).is_ok());
        assert!(validate_video(&audio("clip.mp4", None, 100), MAX).is_err());
        assert!(validate_video(&audio("clip.mov", Some("video/mp4"), 100), MAX).is_err());
        assert!(validate_video(&audio("clip.mp4", Some("video/webm"), 100), MAX).is_err());
        assert!(validate_video(&audio("clip.mp4", Some("video/mp4"), 0), MAX).is_err());
    }
}
