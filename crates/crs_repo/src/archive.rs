//! ustar+gzip archive handling for imported packages.
//!
//! A repository's `pkg.tgz` is either copied verbatim from an
//! already-compressed source (`import_targz`) or synthesized from a staged
//! directory tree (`import_dir`). Either way only the `pkg.json` member is
//! ever inspected up front; the rest of the archive is treated as an opaque
//! blob that gets copied to disk on import and re-extracted at consume time.

use std::fs;
use std::io;
use std::path::Path;

use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;

use crate::error::RepoError;

/// Extracts a single named member of a `.tgz` archive to `dest`, without
/// unpacking the rest of the archive.
pub fn extract_single_member(tgz_path: &Path, member: &str, dest: &Path) -> Result<(), RepoError> {
    let file = fs::File::open(tgz_path)?;
    let decoder = GzDecoder::new(file);
    let mut archive = tar::Archive::new(decoder);
    for entry in archive.entries()? {
        let mut entry = entry?;
        let path = entry.path()?.to_path_buf();
        if path == Path::new(member) {
            if let Some(parent) = dest.parent() {
                fs::create_dir_all(parent)?;
            }
            let mut out = fs::File::create(dest)?;
            io::copy(&mut entry, &mut out)?;
            return Ok(());
        }
    }
    Err(RepoError::MissingArchiveMember {
        archive: tgz_path.display().to_string(),
        member: member.to_string(),
    })
}

/// Compresses the contents of `src_dir` (recursively, as-is) into a fresh
/// `.tgz` at `dest_tgz`.
pub fn create_targz(src_dir: &Path, dest_tgz: &Path) -> Result<(), RepoError> {
    let file = fs::File::create(dest_tgz)?;
    let encoder = GzEncoder::new(file, Compression::default());
    let mut builder = tar::Builder::new(encoder);
    builder.append_dir_all(".", src_dir)?;
    let encoder = builder.into_inner()?;
    encoder.finish()?;
    Ok(())
}

/// Copies `from` to `to` recursively. Used to stage a library's `src`/
/// `include` trees into a temporary directory before they are archived.
pub fn copy_tree(from: &Path, to: &Path) -> Result<(), RepoError> {
    if !from.is_dir() {
        return Ok(());
    }
    for entry in walkdir::WalkDir::new(from) {
        let entry = entry.map_err(io::Error::from)?;
        let rel = entry.path().strip_prefix(from).expect("walked under from");
        let dest = to.join(rel);
        if entry.file_type().is_dir() {
            fs::create_dir_all(&dest)?;
        } else {
            if let Some(parent) = dest.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::copy(entry.path(), &dest)?;
        }
    }
    Ok(())
}
