//! Source path classification and cache key layout.

use std::path::{Path, PathBuf};

use percent_encoding::percent_decode_str;
use sha2::{Digest, Sha256};
use url::Url;

use crate::util::{Error, Result};

/// URI schemes that are staged before reading.
pub const REMOTE_SCHEMES: [&str; 6] = ["s3", "gs", "az", "http", "https", "ftp"];

/// Where a source path points.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Source {
    /// Default filesystem; read in place
    Local(PathBuf),
    /// Remote object; staged first
    Remote(Url),
}

impl Source {
    /// Classify a path or URI.
    ///
    /// Only strings with a `scheme://` prefix or a `file:` prefix are URIs;
    /// everything else, including names like `sample:1.h5ad` and drive
    /// letter paths, is local.
    pub fn parse(path: &str) -> Result<Self> {
        if !looks_like_uri(path) {
            return Ok(Self::Local(PathBuf::from(path)));
        }
        let url = Url::parse(path).map_err(|e| Error::invalid_path(path, e.to_string()))?;
        let scheme = url.scheme();
        if scheme == "file" {
            return url
                .to_file_path()
                .map(Self::Local)
                .map_err(|_| Error::invalid_path(path, "not a valid file URI"));
        }
        if scheme.len() == 1 {
            return Ok(Self::Local(PathBuf::from(path)));
        }
        if REMOTE_SCHEMES.contains(&scheme) {
            return Ok(Self::Remote(url));
        }
        Err(Error::invalid_path(
            path,
            format!("unsupported scheme '{scheme}'"),
        ))
    }

    /// Check if this source needs staging.
    #[inline]
    pub fn is_remote(&self) -> bool {
        matches!(self, Self::Remote(_))
    }
}

/// Hex SHA-256 of the source URI.
///
/// Only the URI string is hashed, so the key is stable across processes.
pub fn cache_key(url: &Url) -> String {
    let digest = Sha256::digest(url.as_str().as_bytes());
    let mut hex = String::with_capacity(digest.len() * 2);
    for byte in digest {
        use std::fmt::Write;
        let _ = write!(hex, "{byte:02x}");
    }
    hex
}

/// Check for a `scheme://` or `file:` prefix with a well-formed scheme.
fn looks_like_uri(path: &str) -> bool {
    let scheme = match path.split_once(':') {
        Some((scheme, rest)) if rest.starts_with("//") || scheme.eq_ignore_ascii_case("file") => scheme,
        _ => return false,
    };
    let mut chars = scheme.chars();
    chars.next().is_some_and(|c| c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
}

/// Last non-empty path segment of a remote URI, percent-decoded.
///
/// Fails if there is no such segment or the decoded name is not a plain
/// file name.
pub fn file_name(url: &Url) -> Result<String> {
    let segment = url
        .path_segments()
        .and_then(|mut segments| segments.rfind(|segment| !segment.is_empty()))
        .ok_or_else(|| Error::invalid_path(url.as_str(), "no file name in path"))?;
    let name = percent_decode_str(segment)
        .decode_utf8()
        .map_err(|_| Error::invalid_path(url.as_str(), "file name is not valid UTF-8"))?;
    if name == "." || name == ".." || name.contains(|c: char| matches!(c, '/' | '\\' | '\0')) {
        return Err(Error::invalid_path(
            url.as_str(),
            format!("'{name}' is not a plain file name"),
        ));
    }
    Ok(name.into_owned())
}

/// Local cache location: `<root>/<key[..2]>/<key[2..]>/<file name>`.
pub fn cache_path(root: &Path, url: &Url) -> Result<PathBuf> {
    let name = file_name(url)?;
    let key = cache_key(url);
    let (bucket, rest) = key.split_at(2);
    Ok(root.join(bucket).join(rest).join(name))
}
