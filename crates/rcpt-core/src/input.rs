//! Input files: media kinds, tasks and discovery from paths and zip archives.

use std::fs::{self, File};
use std::io::Read;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::InputError;

/// Raster image formats accepted by the extraction service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageFormat {
    Jpeg,
    Png,
}

/// Kind of document sent for extraction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Image(ImageFormat),
    Pdf,
}

impl MediaKind {
    /// Detect the media kind from a file extension (case-insensitive, dot optional).
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.trim_start_matches('.').to_lowercase().as_str() {
            "jpg" | "jpeg" => Some(Self::Image(ImageFormat::Jpeg)),
            "png" => Some(Self::Image(ImageFormat::Png)),
            "pdf" => Some(Self::Pdf),
            _ => None,
        }
    }

    /// Detect the media kind from a path's extension.
    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|e| e.to_str())
            .and_then(Self::from_extension)
    }

    /// MIME type sent alongside the document bytes.
    pub fn mime_type(&self) -> &'static str {
        match self {
            Self::Image(ImageFormat::Jpeg) => "image/jpeg",
            Self::Image(ImageFormat::Png) => "image/png",
            Self::Pdf => "application/pdf",
        }
    }

    /// Short label used in usage reports.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Image(_) => "image",
            Self::Pdf => "pdf",
        }
    }
}

/// A document queued for extraction.
#[derive(Debug, Clone)]
pub struct FileTask {
    /// Where the file came from: a path, or `archive.zip!entry/path`.
    pub source: String,
    /// Base name of the file or archive entry.
    name: String,
    pub kind: MediaKind,
    pub data: Vec<u8>,
}

impl FileTask {
    /// Task for a file on disk; `source` is its path.
    pub fn new(source: impl Into<String>, kind: MediaKind, data: Vec<u8>) -> Self {
        let source = source.into();
        let name = base_name(Path::new(&source)).unwrap_or_else(|| source.clone());
        Self {
            source,
            name,
            kind,
            data,
        }
    }

    /// Task for an entry of a zip archive.
    pub fn archive_entry(archive: &str, entry: &Path, kind: MediaKind, data: Vec<u8>) -> Self {
        let source = format!("{}!{}", archive, entry.display());
        let name = base_name(entry).unwrap_or_else(|| entry.display().to_string());
        Self {
            source,
            name,
            kind,
            data,
        }
    }

    /// Base name of the source, used as the row's `filename`.
    pub fn filename(&self) -> &str {
        &self.name
    }

    /// Size of the document in bytes.
    pub fn size(&self) -> u64 {
        self.data.len() as u64
    }
}

fn base_name(path: &Path) -> Option<String> {
    path.file_name().map(|name| name.to_string_lossy().into_owned())
}

/// An input that was not queued, with the reason.
#[derive(Debug)]
pub struct SkippedInput {
    pub source: String,
    pub reason: InputError,
}

/// Tasks collected from a set of input paths.
#[derive(Debug, Default)]
pub struct InputSet {
    pub tasks: Vec<FileTask>,
    pub skipped: Vec<SkippedInput>,
}

impl InputSet {
    fn skip(&mut self, source: impl Into<String>, reason: InputError) {
        let source = source.into();
        warn!("Skipping {}: {}", source, reason);
        self.skipped.push(SkippedInput { source, reason });
    }
}

/// Collect extraction tasks from files, directories and zip archives.
///
/// Directories are walked recursively in name order. Every supported entry
/// of a `.zip` archive becomes its own task. Unsupported or unreadable
/// inputs are recorded in [`InputSet::skipped`] and never abort collection.
pub fn collect_tasks(paths: &[PathBuf]) -> InputSet {
    let mut set = InputSet::default();
    for path in paths {
        collect_path(path, &mut set);
    }
    debug!(
        "Collected {} tasks, skipped {} inputs",
        set.tasks.len(),
        set.skipped.len()
    );
    set
}

fn collect_path(path: &Path, set: &mut InputSet) {
    let source = path.display().to_string();

    if path.is_dir() {
        let mut entries: Vec<PathBuf> = match fs::read_dir(path) {
            Ok(entries) => entries.filter_map(|e| e.ok()).map(|e| e.path()).collect(),
            Err(e) => {
                set.skip(source.clone(), InputError::Unreadable {
                    path: source,
                    reason: e.to_string(),
                });
                return;
            }
        };
        entries.sort();
        for entry in entries {
            collect_path(&entry, set);
        }
        return;
    }

    if !path.exists() {
        set.skip(source.clone(), InputError::NotFound(source));
        return;
    }

    if is_zip(path) {
        collect_archive(path, set);
        return;
    }

    let Some(kind) = MediaKind::from_path(path) else {
        set.skip(source.clone(), InputError::UnsupportedFileType(source));
        return;
    };

    match fs::read(path) {
        Ok(data) => set.tasks.push(FileTask::new(source, kind, data)),
        Err(e) => set.skip(source.clone(), InputError::Unreadable {
            path: source,
            reason: e.to_string(),
        }),
    }
}

fn is_zip(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("zip"))
}

fn collect_archive(path: &Path, set: &mut InputSet) {
    let source = path.display().to_string();
    let archive_error = |reason: String| InputError::Archive {
        path: source.clone(),
        reason,
    };

    let file = match File::open(path) {
        Ok(file) => file,
        Err(e) => {
            set.skip(source.clone(), archive_error(e.to_string()));
            return;
        }
    };

    let mut archive = match zip::ZipArchive::new(file) {
        Ok(archive) => archive,
        Err(e) => {
            set.skip(source.clone(), archive_error(e.to_string()));
            return;
        }
    };

    let mut documents = Vec::new();
    for index in 0..archive.len() {
        let mut entry = match archive.by_index(index) {
            Ok(entry) => entry,
            Err(e) => {
                set.skip(format!("{}!#{}", source, index), archive_error(e.to_string()));
                continue;
            }
        };

        if entry.is_dir() {
            continue;
        }

        // Entries escaping the archive root are never read.
        let Some(name) = entry.enclosed_name() else {
            warn!("Ignoring unsafe archive entry {:?} in {}", entry.name(), source);
            continue;
        };

        // macOS resource forks
        if name.starts_with("__MACOSX") {
            continue;
        }

        let entry_source = format!("{}!{}", source, name.display());
        let Some(kind) = MediaKind::from_path(&name) else {
            set.skip(
                entry_source.clone(),
                InputError::UnsupportedFileType(entry_source),
            );
            continue;
        };

        // Declared entry sizes are not trusted for allocation.
        let mut data = Vec::new();
        if let Err(e) = entry.read_to_end(&mut data) {
            set.skip(entry_source, archive_error(e.to_string()));
            continue;
        }

        documents.push(FileTask::archive_entry(&source, &name, kind, data));
    }

    documents.sort_by(|a, b| a.source.cmp(&b.source));
    debug!("Archive {} yielded {} documents", source, documents.len());
    set.tasks.extend(documents);
}
