//! Static directory lookup and file serving.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use super::StaticRoute;
use crate::error::{Error, HttpError};
use crate::response::{ContentType, Response};

/// Maps `path` onto a file below one of the static roots.
///
/// `Ok(None)` means no static prefix applies. Any `..` or empty segment in
/// the remainder is rejected, so lookups never leave the root.
pub(super) fn resolve(statics: &[StaticRoute], path: &str) -> Result<Option<PathBuf>, HttpError> {
    for entry in statics {
        let Some(rest) = path.strip_prefix(entry.prefix.as_str()).and_then(|r| r.strip_prefix('/')) else {
            continue;
        };
        if rest.split('/').any(|seg| seg.is_empty() || seg == "..") {
            return Err(HttpError::BadRequest);
        }
        return Ok(Some(entry.root.join(rest)));
    }
    Ok(None)
}

/// Reads `file` into a `200 OK` response typed by its extension.
pub(crate) fn serve_file(file: &Path) -> Result<Response, Error> {
    match std::fs::read(file) {
        Ok(body) => {
            let content_type = file
                .extension()
                .and_then(|ext| ext.to_str())
                .map_or(ContentType::OctetStream, ContentType::from_extension);
            Ok(Response::builder().bytes(content_type, body))
        }
        Err(e) if matches!(e.kind(), ErrorKind::NotFound | ErrorKind::IsADirectory) => {
            Err(HttpError::NotFound.into())
        }
        Err(e) => Err(e.into()),
    }
}
