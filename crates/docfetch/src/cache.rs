//! Mapping from source descriptors to on-disk cache entries.
//!
//! Layout under the root:
//!
//! ```text
//! <root>/.docfetch/cache/<scheme>/<authority>/<dir>~/<dir>~/<file>
//! ```
//!
//! Every segment is escaped: `[A-Za-z0-9_.-]` is kept, every other byte is
//! written as `%XX`, and so is a leading `.`. Directory segments end in `~`
//! and file names never do, so a file entry can never sit where another
//! entry needs a directory. An empty file name is written as `%`. The mapping
//! is therefore injective, and no entry can start with `.`, which keeps
//! staging files out of the entry namespace.
//!
//! Escaped names longer than [`MAX_SEGMENT`] bytes are shortened to a prefix,
//! a `+` and the SHA-256 of the unescaped segment. Escaping never emits `+`,
//! so shortened names cannot collide with ordinary ones.

use std::fmt::Write as _;
use std::path::{Component, Path, PathBuf};

use sha2::{Digest, Sha256};
use tempfile::TempPath;

use crate::descriptor::{Scheme, SourceDescriptor};
use crate::fetcher::FetchError;

const CACHE_PARENT: &str = ".docfetch";
const CACHE_NAME: &str = "cache";
const STAGING_PREFIX: &str = ".staging-";

/// Longest escaped segment written as is. Stays well under NAME_MAX (255).
pub const MAX_SEGMENT: usize = 200;
const SHORTENED_PREFIX: usize = 64;
const DIGEST_MARKER: char = '+';

/// The process-wide cache directory for a root.
pub fn cache_dir(root: &Path) -> PathBuf {
    root.join(CACHE_PARENT).join(CACHE_NAME)
}

/// Compute the cache entry path for a descriptor.
///
/// Local descriptors are keyed on the absolute, lexically normalized source
/// path (relative paths resolve against `root`). Remote descriptors are keyed
/// on scheme, authority and path plus query as written in the URI.
pub fn entry_path(root: &Path, descriptor: &SourceDescriptor) -> Result<PathBuf, FetchError> {
    let base = cache_dir(root).join(descriptor.scheme().as_str());

    match descriptor.scheme() {
        Scheme::Local => {
            let source = resolve_local(root, descriptor.path())?;
            let segments: Vec<Vec<u8>> = source
                .components()
                .filter_map(|component| match component {
                    Component::Prefix(prefix) => {
                        Some(prefix.as_os_str().as_encoded_bytes().to_vec())
                    }
                    Component::Normal(name) => Some(name.as_encoded_bytes().to_vec()),
                    _ => None,
                })
                .collect();
            Ok(join_segments(base, segments.iter().map(Vec::as_slice)))
        }
        Scheme::Https | Scheme::Github | Scheme::Sftp => {
            let authority = descriptor.authority().ok_or_else(|| {
                FetchError::invalid(descriptor.raw(), "remote source has no host")
            })?;
            let resource = descriptor.resource();
            let relative = resource.strip_prefix('/').unwrap_or(&resource);
            let base = base.join(segment_name(authority.as_bytes()));
            Ok(join_segments(base, relative.split('/').map(str::as_bytes)))
        }
    }
}

/// Absolute, lexically normalized location of a local source.
pub fn resolve_local(root: &Path, path: &str) -> Result<PathBuf, FetchError> {
    let joined = root.join(path);
    let absolute = std::path::absolute(&joined).map_err(|e| FetchError::io(&joined, e))?;
    Ok(normalize(&absolute))
}

/// Resolve `.` and `..` without touching the filesystem.
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

fn join_segments<'a>(mut base: PathBuf, segments: impl Iterator<Item = &'a [u8]>) -> PathBuf {
    let segments: Vec<&[u8]> = segments.collect();

    match segments.split_last() {
        Some((file, dirs)) => {
            for dir in dirs {
                base.push(format!("{}~", segment_name(dir)));
            }
            base.push(file_name(file));
        }
        None => base.push(file_name(b"")),
    }

    base
}

fn file_name(segment: &[u8]) -> String {
    if segment.is_empty() {
        "%".to_owned()
    } else {
        segment_name(segment)
    }
}

/// Escaped segment, shortened with a digest when it would be too long.
fn segment_name(segment: &[u8]) -> String {
    let escaped = escape(segment);
    if escaped.len() <= MAX_SEGMENT {
        return escaped;
    }

    let digest = hex::encode(Sha256::digest(segment));
    // `escaped` is ASCII, so any byte index is a char boundary.
    format!("{}{DIGEST_MARKER}{digest}", &escaped[..SHORTENED_PREFIX])
}

/// Percent-escape a single path segment.
pub fn escape(segment: &[u8]) -> String {
    let mut out = String::with_capacity(segment.len());
    for (index, &byte) in segment.iter().enumerate() {
        let keep = byte.is_ascii_alphanumeric()
            || byte == b'_'
            || byte == b'-'
            || (byte == b'.' && index > 0);
        if keep {
            out.push(byte as char);
        } else {
            let _ = write!(out, "%{byte:02X}");
        }
    }
    out
}

/// Create a directory tree with user-only permissions.
pub fn ensure_dir(path: &Path) -> Result<(), FetchError> {
    let mut builder = std::fs::DirBuilder::new();
    builder.recursive(true);

    #[cfg(unix)]
    {
        use std::os::unix::fs::DirBuilderExt;
        builder.mode(0o700);
    }

    builder
        .create(path)
        .map_err(|source| FetchError::CacheDirectory {
            path: path.to_path_buf(),
            source,
        })
}

/// Reserve a staging file next to `entry`. It is removed when dropped.
pub fn stage(entry: &Path) -> Result<TempPath, FetchError> {
    let dir = entry.parent().unwrap_or_else(|| Path::new("."));
    tempfile::Builder::new()
        .prefix(STAGING_PREFIX)
        .tempfile_in(dir)
        .map(tempfile::NamedTempFile::into_temp_path)
        .map_err(|e| FetchError::io(dir, e))
}

/// Atomically rename a completed staging file onto the entry path.
pub fn promote(staging: TempPath, entry: &Path) -> Result<(), FetchError> {
    staging
        .persist(entry)
        .map_err(|e| FetchError::io(entry, e.error))
}
