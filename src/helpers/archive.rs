//! Archive codec - native extraction and snapshot creation.
//!
//! Extraction auto-detects the format from the file name, rejects entries
//! that would land outside the destination, and strips a single top-level
//! directory so that `foo-1.2/src/...` ends up as `<dest>/src/...`.
//!
//! Snapshots are gzipped tarballs whose entries sit below one directory
//! named after the archive, which the extractor strips again.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Component, Path, PathBuf};

use flate2::Compression;
use flate2::write::GzEncoder;
use walkdir::WalkDir;

use crate::core::output;
use crate::error::ArchiveError;

use super::ArchiveCodec;
use super::progress::with_spinner;

/// Supported archive formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveFormat {
    TarGz,
    TarXz,
    TarBz2,
    TarZst,
    Tar,
    Zip,
}

impl ArchiveFormat {
    /// Detect archive format from filename extension
    pub fn detect(archive: &Path) -> Option<Self> {
        let name = archive.file_name()?.to_string_lossy().to_lowercase();
        if name.ends_with(".tar.gz") || name.ends_with(".tgz") {
            Some(Self::TarGz)
        } else if name.ends_with(".tar.xz") || name.ends_with(".txz") {
            Some(Self::TarXz)
        } else if name.ends_with(".tar.bz2") || name.ends_with(".tbz2") {
            Some(Self::TarBz2)
        } else if name.ends_with(".tar.zst") || name.ends_with(".tzst") {
            Some(Self::TarZst)
        } else if name.ends_with(".zip") {
            Some(Self::Zip)
        } else if name.ends_with(".tar") {
            Some(Self::Tar)
        } else {
            None
        }
    }
}

/// Archive codec backed by tar, flate2, xz2, bzip2, zstd and zip.
#[derive(Debug, Clone, Copy, Default)]
pub struct NativeCodec;

impl ArchiveCodec for NativeCodec {
    fn extract(&self, archive: &Path, dest: &Path) -> Result<(), ArchiveError> {
        let format =
            ArchiveFormat::detect(archive).ok_or_else(|| ArchiveError::UnknownFormat(archive.to_path_buf()))?;

        let filename = archive
            .file_name()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| "archive".to_string());

        with_spinner(&format!("extracting {}", filename), || {
            extract_stripped(archive, dest, format)
        })?;

        output::detail(&format!("extracted {} to {}", filename, dest.display()));
        Ok(())
    }

    /// Write `src` as a gzipped tarball to `archive`.
    ///
    /// With `mark_latest` an existing archive is replaced; without it the
    /// archive names a pinned revision and an existing one is kept as is.
    fn create_from_directory(
        &self,
        src: &Path,
        archive: &Path,
        mark_latest: bool,
    ) -> Result<(), ArchiveError> {
        if archive.exists() && !mark_latest {
            output::detail(&format!(
                "snapshot {} already exists, keeping it",
                archive.display()
            ));
            return Ok(());
        }

        let parent = parent_or_cwd(archive);
        std::fs::create_dir_all(parent).map_err(io_err(parent))?;

        let prefix = snapshot_prefix(archive);
        with_spinner(&format!("creating snapshot {}", prefix), || {
            let mut tmp = tempfile::Builder::new()
                .prefix(".snapshot-")
                .tempfile_in(parent)
                .map_err(io_err(parent))?;

            {
                let encoder = GzEncoder::new(tmp.as_file_mut(), Compression::default());
                let mut builder = tar::Builder::new(encoder);
                builder.follow_symlinks(false);
                append_tree(&mut builder, src, Path::new(&prefix))?;
                builder
                    .into_inner()
                    .and_then(|encoder| encoder.finish())
                    .map_err(io_err(archive))?;
            }

            tmp.persist(archive).map_err(|e| ArchiveError::Io {
                path: archive.to_path_buf(),
                source: e.error,
            })?;
            Ok(())
        })?;

        output::detail(&format!("snapshot written to {}", archive.display()));
        Ok(())
    }
}

fn io_err(path: &Path) -> impl FnOnce(std::io::Error) -> ArchiveError + '_ {
    move |source| ArchiveError::Io {
        path: path.to_path_buf(),
        source,
    }
}

fn parent_or_cwd(path: &Path) -> &Path {
    match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    }
}

/// Top-level directory name inside a snapshot: the archive name without its extension.
fn snapshot_prefix(archive: &Path) -> String {
    let name = archive
        .file_name()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "snapshot".to_string());
    for ext in [".tar.gz", ".tgz"] {
        if let Some(stem) = name.strip_suffix(ext) {
            return stem.to_string();
        }
    }
    name
}

/// Append every entry below `src` in sorted order, without following symlinks.
fn append_tree<W: std::io::Write>(
    builder: &mut tar::Builder<W>,
    src: &Path,
    prefix: &Path,
) -> Result<(), ArchiveError> {
    builder
        .append_dir(prefix, src)
        .map_err(io_err(src))?;

    for entry in WalkDir::new(src)
        .min_depth(1)
        .follow_links(false)
        .sort_by_file_name()
    {
        let entry = entry.map_err(|e| ArchiveError::Io {
            path: src.to_path_buf(),
            source: e.into(),
        })?;
        let rel = entry
            .path()
            .strip_prefix(src)
            .map_err(|_| ArchiveError::UnsafeEntry(entry.path().display().to_string()))?;
        builder
            .append_path_with_name(entry.path(), prefix.join(rel))
            .map_err(io_err(entry.path()))?;
    }

    Ok(())
}

/// Extract into a staging directory beside `dest`, then move the content
/// (minus a single wrapping directory) into `dest`.
fn extract_stripped(archive: &Path, dest: &Path, format: ArchiveFormat) -> Result<(), ArchiveError> {
    let parent = parent_or_cwd(dest);
    std::fs::create_dir_all(parent).map_err(io_err(parent))?;
    let staging = tempfile::Builder::new()
        .prefix(".extract-")
        .tempdir_in(parent)
        .map_err(io_err(parent))?;

    match format {
        ArchiveFormat::TarGz => {
            extract_tar(flate2::read::GzDecoder::new(open(archive)?), staging.path(), archive)?
        }
        ArchiveFormat::TarXz => {
            extract_tar(xz2::read::XzDecoder::new(open(archive)?), staging.path(), archive)?
        }
        ArchiveFormat::TarBz2 => {
            extract_tar(bzip2::read::BzDecoder::new(open(archive)?), staging.path(), archive)?
        }
        ArchiveFormat::TarZst => {
            let decoder = zstd::stream::read::Decoder::new(open(archive)?).map_err(|e| {
                ArchiveError::Corrupt {
                    path: archive.to_path_buf(),
                    message: format!("zstd init error: {}", e),
                }
            })?;
            extract_tar(decoder, staging.path(), archive)?
        }
        ArchiveFormat::Tar => extract_tar(open(archive)?, staging.path(), archive)?,
        ArchiveFormat::Zip => extract_zip(archive, staging.path())?,
    }

    let root = single_top_level_dir(staging.path())?.unwrap_or_else(|| staging.path().to_path_buf());
    move_children(&root, dest)
}

fn open(archive: &Path) -> Result<BufReader<File>, ArchiveError> {
    File::open(archive)
        .map(BufReader::new)
        .map_err(io_err(archive))
}

/// The only entry of `dir`, if it is a directory.
fn single_top_level_dir(dir: &Path) -> Result<Option<PathBuf>, ArchiveError> {
    let mut entries = std::fs::read_dir(dir)
        .map_err(io_err(dir))?
        .collect::<Result<Vec<_>, _>>()
        .map_err(io_err(dir))?;

    if entries.len() != 1 {
        return Ok(None);
    }
    let Some(only) = entries.pop() else {
        return Ok(None);
    };
    let is_dir = only.file_type().map_err(io_err(dir))?.is_dir();
    Ok(is_dir.then(|| only.path()))
}

/// Move every child of `from` into `dest`, replacing same-named entries.
fn move_children(from: &Path, dest: &Path) -> Result<(), ArchiveError> {
    std::fs::create_dir_all(dest).map_err(io_err(dest))?;

    for entry in std::fs::read_dir(from).map_err(io_err(from))? {
        let entry = entry.map_err(io_err(from))?;
        let target = dest.join(entry.file_name());

        if let Ok(md) = std::fs::symlink_metadata(&target) {
            if md.is_dir() {
                std::fs::remove_dir_all(&target).map_err(io_err(&target))?;
            } else {
                std::fs::remove_file(&target).map_err(io_err(&target))?;
            }
        }

        std::fs::rename(entry.path(), &target).map_err(io_err(&target))?;
    }

    Ok(())
}

// ============================================================================
// Entry-level extraction with escape checks
// ============================================================================

fn normalize_lexical(path: &Path) -> PathBuf {
    // Lexically normalize a path (no filesystem access). Used to validate
    // link targets without following symlinks.
    let mut out = PathBuf::new();
    let mut has_root = false;

    for c in path.components() {
        match c {
            Component::Prefix(p) => {
                out.clear();
                out.push(p.as_os_str());
                has_root = true;
            }
            Component::RootDir => {
                out.push(Component::RootDir.as_os_str());
                has_root = true;
            }
            Component::CurDir => {}
            Component::ParentDir => {
                let popped = out
                    .components()
                    .next_back()
                    .is_some_and(|last| matches!(last, Component::Normal(_)));
                if popped {
                    out.pop();
                } else if !has_root {
                    out.push("..");
                }
            }
            Component::Normal(seg) => out.push(seg),
        }
    }

    out
}

fn ensure_no_symlink_components(dest: &Path, full_path: &Path) -> Result<(), ArchiveError> {
    let rel = full_path
        .strip_prefix(dest)
        .map_err(|_| ArchiveError::UnsafeEntry(full_path.display().to_string()))?;

    let mut cur = dest.to_path_buf();
    for comp in rel.components() {
        cur.push(comp);
        if let Ok(md) = std::fs::symlink_metadata(&cur)
            && md.file_type().is_symlink()
        {
            return Err(ArchiveError::UnsafeEntry(format!(
                "symlink in path component: {}",
                cur.display()
            )));
        }
    }

    Ok(())
}

fn ensure_link_target_within_dest(
    dest: &Path,
    link_parent: &Path,
    link_name: &Path,
) -> Result<(), ArchiveError> {
    if link_name.is_absolute()
        || link_name
            .components()
            .any(|c| matches!(c, Component::Prefix(_) | Component::RootDir))
    {
        return Err(ArchiveError::UnsafeEntry(format!(
            "absolute link target: {}",
            link_name.display()
        )));
    }

    let candidate = normalize_lexical(&link_parent.join(link_name));
    let norm_dest = normalize_lexical(dest);
    if candidate.strip_prefix(&norm_dest).is_err() {
        return Err(ArchiveError::UnsafeEntry(format!(
            "link escapes destination: {} -> {}",
            link_parent.display(),
            link_name.display()
        )));
    }

    Ok(())
}

fn extract_tar<R: Read>(reader: R, dest: &Path, archive_path: &Path) -> Result<(), ArchiveError> {
    let corrupt = |e: std::io::Error| ArchiveError::Corrupt {
        path: archive_path.to_path_buf(),
        message: e.to_string(),
    };

    let mut archive = tar::Archive::new(reader);

    for entry in archive.entries().map_err(corrupt)? {
        let mut entry = entry.map_err(corrupt)?;
        let path = entry.path().map_err(corrupt)?.into_owned();

        if path.is_absolute() || path.components().any(|c| c == Component::ParentDir) {
            return Err(ArchiveError::UnsafeEntry(path.display().to_string()));
        }

        // Some archives contain a "." entry; treat it as a no-op.
        if path.as_os_str().is_empty() || path == Path::new(".") {
            continue;
        }

        let full_path = dest.join(&path);
        ensure_no_symlink_components(dest, &full_path)?;

        let entry_type = entry.header().entry_type();
        if entry_type == tar::EntryType::Symlink || entry_type == tar::EntryType::Link {
            let link_name = entry.link_name().map_err(corrupt)?.ok_or_else(|| {
                ArchiveError::UnsafeEntry(format!("link without target: {}", path.display()))
            })?;
            let link_parent = full_path.parent().unwrap_or(dest);
            ensure_link_target_within_dest(dest, link_parent, &link_name)?;
        }

        if let Some(parent) = full_path.parent() {
            std::fs::create_dir_all(parent).map_err(io_err(parent))?;
        }

        entry.unpack(&full_path).map_err(io_err(&full_path))?;
    }

    Ok(())
}

fn extract_zip(archive_path: &Path, dest: &Path) -> Result<(), ArchiveError> {
    let file = File::open(archive_path).map_err(io_err(archive_path))?;
    let mut archive = zip::ZipArchive::new(file).map_err(|e| ArchiveError::Corrupt {
        path: archive_path.to_path_buf(),
        message: e.to_string(),
    })?;

    for i in 0..archive.len() {
        let mut file = archive.by_index(i).map_err(|e| ArchiveError::Corrupt {
            path: archive_path.to_path_buf(),
            message: e.to_string(),
        })?;

        let Some(enclosed) = file.enclosed_name() else {
            return Err(ArchiveError::UnsafeEntry(file.name().to_string()));
        };
        let outpath = dest.join(enclosed);

        if file.is_dir() {
            std::fs::create_dir_all(&outpath).map_err(io_err(&outpath))?;
            continue;
        }

        if let Some(parent) = outpath.parent() {
            std::fs::create_dir_all(parent).map_err(io_err(parent))?;
        }
        let mut outfile = File::create(&outpath).map_err(io_err(&outpath))?;
        std::io::copy(&mut file, &mut outfile).map_err(io_err(&outpath))?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            if let Some(mode) = file.unix_mode() {
                std::fs::set_permissions(&outpath, std::fs::Permissions::from_mode(mode)).ok();
            }
        }
    }

    Ok(())
}
