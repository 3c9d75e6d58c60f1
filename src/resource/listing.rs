use std::io;
use std::path::Path;

use serde::Serialize;

/// Kind of a directory child.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    File,
    Directory,
}

/// One child of a listed directory: presence and kind only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ListingEntry {
    pub name: String,

    #[serde(rename = "type")]
    pub kind: EntryKind,
}

/// The immediate children of a directory, sorted by name.
///
/// Serializes as a bare JSON array:
///
/// ```json
/// [{"name":"2024","type":"directory"},{"name":"metadata.json","type":"file"}]
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Listing {
    entries: Vec<ListingEntry>,
}

impl Listing {
    /// Enumerate `dir`.
    ///
    /// Symlinks are classified by their target; a dangling link is reported
    /// as a file. Non-UTF-8 names are converted lossily.
    pub async fn read(dir: &Path) -> io::Result<Self> {
        let mut reader = tokio::fs::read_dir(dir).await?;
        let mut entries = Vec::new();

        while let Some(entry) = reader.next_entry().await? {
            let file_type = entry.file_type().await?;
            let is_dir = if file_type.is_symlink() {
                tokio::fs::metadata(entry.path())
                    .await
                    .map(|m| m.is_dir())
                    .unwrap_or(false)
            } else {
                file_type.is_dir()
            };

            entries.push(ListingEntry {
                name: entry.file_name().to_string_lossy().into_owned(),
                kind: if is_dir {
                    EntryKind::Directory
                } else {
                    EntryKind::File
                },
            });
        }

        entries.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(Self { entries })
    }

    pub fn entries(&self) -> &[ListingEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Serialize to the JSON response body.
    pub fn to_json(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec(self)
    }
}
