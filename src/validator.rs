use std::io::ErrorKind;
use std::path::Path;

/// Whether `path` may be handed to the script host.
///
/// Fails closed: missing files, non-files, wrong extensions and filesystem
/// errors all yield `false`.
pub fn is_eligible(path: &Path, extension: &str) -> bool {
    let meta = match std::fs::metadata(path) {
        Ok(m) => m,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            tracing::warn!(path = %path.display(), "script file not found");
            return false;
        }
        Err(e) => {
            tracing::error!(path = %path.display(), error = %e, "script validation failed");
            return false;
        }
    };

    if !meta.is_file() {
        tracing::warn!(path = %path.display(), "script path is not a regular file");
        return false;
    }

    let matches_ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case(extension))
        .unwrap_or(false);
    if !matches_ext {
        tracing::warn!(path = %path.display(), expected = extension, "not a .{extension} script");
        return false;
    }

    true
}
