//! Book descriptor domain model

use crate::types::Validator;
use serde::{Deserialize, Serialize};

/// Identifies a playable audiobook
///
/// The serialized field names (`coverUri`, `audioUri`) match the record the
/// host application writes when a book is added, so a stored descriptor can
/// be read back without translation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookDescriptor {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub cover_uri: Option<String>,
    pub audio_uri: String,
}

impl BookDescriptor {
    /// Creates a descriptor with a title and an audio reference
    pub fn new(title: impl Into<String>, audio_uri: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            author: String::new(),
            description: String::new(),
            cover_uri: None,
            audio_uri: audio_uri.into(),
        }
    }

    pub fn with_author(mut self, author: impl Into<String>) -> Self {
        self.author = author.into();
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_cover(mut self, cover_uri: impl Into<String>) -> Self {
        self.cover_uri = Some(cover_uri.into());
        self
    }

    /// Returns true if both descriptors point at the same audio
    ///
    /// Restoring a stored position is keyed on the audio reference only;
    /// edits to title or author do not invalidate the saved position.
    pub fn same_audio(&self, other: &BookDescriptor) -> bool {
        self.audio_uri == other.audio_uri
    }

    /// Title for display, falling back to the audio file name
    pub fn display_title(&self) -> &str {
        let title = self.title.trim();
        if !title.is_empty() {
            return title;
        }

        self.audio_uri
            .rsplit(['/', '\\'])
            .find(|segment| !segment.is_empty())
            .unwrap_or(self.audio_uri.as_str())
    }
}

impl Validator for BookDescriptor {
    fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if self.audio_uri.trim().is_empty() {
            errors.push("Audio reference cannot be empty".to_string());
        }

        if let Some(cover) = &self.cover_uri {
            if cover.trim().is_empty() {
                errors.push("Cover reference cannot be blank when set".to_string());
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_book_new() {
        let book = BookDescriptor::new("Dune", "file:///books/dune.mp3");
        assert_eq!(book.title, "Dune");
        assert_eq!(book.audio_uri, "file:///books/dune.mp3");
        assert!(book.author.is_empty());
        assert!(book.cover_uri.is_none());
    }

    #[test]
    fn test_builder_methods() {
        let book = BookDescriptor::new("Dune", "dune.mp3")
            .with_author("Frank Herbert")
            .with_description("Spice")
            .with_cover("dune.jpg");

        assert_eq!(book.author, "Frank Herbert");
        assert_eq!(book.description, "Spice");
        assert_eq!(book.cover_uri.as_deref(), Some("dune.jpg"));
    }

    #[test]
    fn test_same_audio_ignores_metadata() {
        let a = BookDescriptor::new("Dune", "dune.mp3");
        let b = BookDescriptor::new("Dune (Unabridged)", "dune.mp3").with_author("Herbert");
        let c = BookDescriptor::new("Dune", "dune-2.mp3");

        assert!(a.same_audio(&b));
        assert!(!a.same_audio(&c));
    }

    #[test]
    fn test_display_title_fallback() {
        let titled = BookDescriptor::new("  Emma ", "/books/emma.m4b");
        assert_eq!(titled.display_title(), "Emma");

        let untitled = BookDescriptor::new("", "file:///books/emma.m4b");
        assert_eq!(untitled.display_title(), "emma.m4b");

        let bare = BookDescriptor::new("", "emma.m4b");
        assert_eq!(bare.display_title(), "emma.m4b");
    }

    #[test]
    fn test_validation() {
        assert!(BookDescriptor::new("", "a.mp3").is_valid());
        assert!(!BookDescriptor::new("Title", "   ").is_valid());

        let blank_cover = BookDescriptor::new("Title", "a.mp3").with_cover(" ");
        assert_eq!(blank_cover.validate().unwrap_err().len(), 1);
    }

    #[test]
    fn test_serialized_field_names() {
        let book = BookDescriptor::new("Emma", "emma.mp3").with_cover("emma.png");
        let json = serde_json::to_string(&book).unwrap();

        assert!(json.contains("\"audioUri\":\"emma.mp3\""));
        assert!(json.contains("\"coverUri\":\"emma.png\""));
    }

    #[test]
    fn test_deserialize_host_record() {
        let json = r#"{"title":"Emma","author":"Austen","description":"","coverUri":null,"audioUri":"emma.mp3"}"#;
        let book: BookDescriptor = serde_json::from_str(json).unwrap();

        assert_eq!(book.author, "Austen");
        assert_eq!(book.audio_uri, "emma.mp3");
        assert!(book.cover_uri.is_none());
    }
}
