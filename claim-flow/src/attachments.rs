use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Extensions offered by the file picker. The stager never re-checks them.
pub const ACCEPTED_EXTENSIONS: [&str; 6] = ["pdf", "jpg", "jpeg", "png", "doc", "docx"];

/// A file picked by the user. Only the name travels on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    pub name: String,
    #[serde(skip)]
    pub path: PathBuf,
}

impl Attachment {
    pub fn new(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
        }
    }

    /// Build a handle from a local path without touching the filesystem
    pub fn from_path(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Self::new(name, path)
    }

    /// Whether the picker filter would have offered this file
    pub fn matches_accept_list(&self) -> bool {
        Path::new(&self.name)
            .extension()
            .map(|ext| {
                let ext = ext.to_string_lossy();
                ACCEPTED_EXTENSIONS
                    .iter()
                    .any(|accepted| accepted.eq_ignore_ascii_case(&ext))
            })
            .unwrap_or(false)
    }
}

/// Append-only list of staged attachments
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AttachmentStager {
    files: Vec<Attachment>,
}

impl AttachmentStager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `selected` after whatever is already staged. No dedup, no filtering.
    pub fn add_files(&mut self, selected: impl IntoIterator<Item = Attachment>) {
        self.files.extend(selected);
    }

    pub fn files(&self) -> &[Attachment] {
        &self.files
    }

    /// Names in staging order, as rendered in the attachment list
    pub fn names(&self) -> Vec<&str> {
        self.files.iter().map(|f| f.name.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}
