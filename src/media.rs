use crate::error::{BiblioError, BiblioResult, Violations};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use uuid::Uuid;

const COVERS_DIR: &str = "covers";
const PICTURES_DIR: &str = "profile_pictures";

const ALLOWED_EXTENSIONS: [&str; 4] = ["jpeg", "jpg", "png", "gif"];
const MAX_UPLOAD_BYTES: usize = 2 * 1024 * 1024;

/// An image handed in by the caller, with the original file extension.
#[derive(Debug, Clone)]
pub struct MediaUpload {
    pub bytes: Vec<u8>,
    pub extension: String,
}

impl MediaUpload {
    pub fn new(bytes: Vec<u8>, extension: impl Into<String>) -> Self {
        Self {
            bytes,
            extension: extension.into(),
        }
    }

    /// Records any problems with this upload under `field`.
    ///
    /// Called during a request's validation pass so image problems are
    /// reported together with the other field violations.
    pub fn check(&self, field: &'static str, violations: &mut Violations) {
        let ext = self.extension.to_ascii_lowercase();
        if !ALLOWED_EXTENSIONS.contains(&ext.as_str()) {
            violations.add(field, "must be a jpeg, jpg, png, or gif image");
        }
        if self.bytes.len() > MAX_UPLOAD_BYTES {
            violations.add(field, "must be at most 2048 kilobytes");
        }
        if self.bytes.is_empty() {
            violations.add(field, "must not be empty");
        }
    }
}

/// Stores cover images and profile pictures on disk.
///
/// Two public-readable directories under one root, `covers/` and
/// `profile_pictures/`, with files named by timestamp plus a random
/// suffix so concurrent uploads cannot collide. Writing happens before
/// the referencing database row is committed; removal is best-effort
/// and tolerates files that are already gone.
#[derive(Debug, Clone)]
pub struct MediaStore {
    root: PathBuf,
}

impl MediaStore {
    /// Creates the store rooted at `root`, making both subdirectories.
    pub fn new(root: impl Into<PathBuf>) -> BiblioResult<Self> {
        let root = root.into();
        fs::create_dir_all(root.join(COVERS_DIR))?;
        fs::create_dir_all(root.join(PICTURES_DIR))?;
        Ok(Self { root })
    }

    /// Writes a cover image and returns its stored filename.
    pub fn store_cover(&self, upload: &MediaUpload) -> BiblioResult<String> {
        self.store(COVERS_DIR, "cover_image", upload)
    }

    /// Writes a profile picture and returns its stored filename.
    pub fn store_profile_picture(&self, upload: &MediaUpload) -> BiblioResult<String> {
        self.store(PICTURES_DIR, "profile_picture", upload)
    }

    /// Full path of a stored cover image.
    pub fn cover_path(&self, filename: &str) -> PathBuf {
        self.root.join(COVERS_DIR).join(filename)
    }

    /// Full path of a stored profile picture.
    pub fn picture_path(&self, filename: &str) -> PathBuf {
        self.root.join(PICTURES_DIR).join(filename)
    }

    /// Removes a stored cover image. A file that is already gone is not
    /// an error; orphaned rows are the failure mode to avoid, not
    /// orphaned files.
    pub fn remove_cover(&self, filename: &str) -> BiblioResult<()> {
        Self::remove(&self.cover_path(filename))
    }

    /// Removes a stored profile picture.
    pub fn remove_profile_picture(&self, filename: &str) -> BiblioResult<()> {
        Self::remove(&self.picture_path(filename))
    }

    fn store(&self, dir: &str, field: &'static str, upload: &MediaUpload) -> BiblioResult<String> {
        let mut violations = Violations::new();
        upload.check(field, &mut violations);
        violations.into_result()?;

        let filename = Self::filename(&upload.extension.to_ascii_lowercase());
        let path = self.root.join(dir).join(&filename);
        Self::write_atomic(&path, &upload.bytes)?;

        tracing::debug!(%field, %filename, "stored media file");
        Ok(filename)
    }

    /// Timestamp-derived name with a random suffix and the original
    /// extension, e.g. `1722776400123-9f0c2a….jpg`.
    fn filename(extension: &str) -> String {
        let millis = chrono::Utc::now().timestamp_millis();
        format!("{}-{}.{}", millis, Uuid::new_v4().simple(), extension)
    }

    /// Writes data to a temporary file in the target directory and
    /// renames it in place, so a crash mid-write never leaves a partial
    /// file at the published path.
    fn write_atomic(path: &Path, data: &[u8]) -> BiblioResult<()> {
        let dir = path.parent().ok_or(BiblioError::NotFound("media directory"))?;
        let mut tmp = NamedTempFile::new_in(dir)?;
        tmp.write_all(data)?;
        tmp.persist(path).map_err(|e| BiblioError::Io(e.error))?;
        Ok(())
    }

    fn remove(path: &Path) -> BiblioResult<()> {
        match fs::remove_file(path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
