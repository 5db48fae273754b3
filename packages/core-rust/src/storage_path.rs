//! Recovers the `(bucket, object path)` pair from a public object URL.
//!
//! Public URLs issued by the object store look like
//! `https://<host>/storage/v1/object/public/<bucket>/<path...>`. Everything
//! after the `/public/` marker is the bucket followed by the object path.

use http::Uri;

/// Path marker separating the store's routing prefix from the object location.
pub const PUBLIC_MARKER: &str = "/public/";

/// Bucket and object path inside that bucket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectLocation {
    pub bucket: String,
    pub path: String,
}

/// Errors from [`resolve_public_url`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoragePathError {
    #[error("not a valid URL: {0}")]
    InvalidUrl(String),
    #[error("URL path has no `/public/` segment")]
    MissingMarker,
    #[error("URL names no bucket")]
    MissingBucket,
    #[error("URL names no object inside bucket `{bucket}`")]
    MissingObjectPath { bucket: String },
}

/// Splits a public object URL into its bucket and object path.
///
/// Only the URL path is inspected; query strings and fragments are ignored.
///
/// ```
/// use palpiteiro_core::storage_path::resolve_public_url;
///
/// let loc = resolve_public_url(
///     "https://host/storage/v1/object/public/avatars/u123/pic.png",
/// ).unwrap();
/// assert_eq!(loc.bucket, "avatars");
/// assert_eq!(loc.path, "u123/pic.png");
/// ```
///
/// # Errors
///
/// Returns [`StoragePathError`] when the URL does not parse, lacks the
/// `/public/` marker, or does not name both a bucket and an object.
pub fn resolve_public_url(url: &str) -> Result<ObjectLocation, StoragePathError> {
    let uri: Uri = url
        .parse()
        .map_err(|e: http::uri::InvalidUri| StoragePathError::InvalidUrl(e.to_string()))?;

    let (_, rest) = uri
        .path()
        .split_once(PUBLIC_MARKER)
        .ok_or(StoragePathError::MissingMarker)?;

    let (bucket, path) = rest.split_once('/').unwrap_or((rest, ""));
    if bucket.is_empty() {
        return Err(StoragePathError::MissingBucket);
    }
    if path.is_empty() {
        return Err(StoragePathError::MissingObjectPath {
            bucket: bucket.to_string(),
        });
    }

    Ok(ObjectLocation {
        bucket: bucket.to_string(),
        path: path.to_string(),
    })
}
