//! `file://` URI round-trips. Paths keep their separators; everything the
//! URI grammar reserves — including `#`, which otherwise starts a fragment —
//! is percent-encoded.

use percent_encoding::{percent_decode_str, AsciiSet, CONTROLS};
use std::path::{Path, PathBuf};

/// Characters escaped inside a path segment. `/` stays literal so the URI
/// keeps its structure.
const PATH_ESCAPE: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'#')
    .add(b'?')
    .add(b'%')
    .add(b'"')
    .add(b'<')
    .add(b'>')
    .add(b'`')
    .add(b'{')
    .add(b'}')
    .add(b'[')
    .add(b']')
    .add(b'^')
    .add(b'|');

/// Decode a `file://` URI into a filesystem path. Returns `None` for other
/// schemes or undecodable bytes.
pub fn uri_to_path(uri: &str) -> Option<PathBuf> {
    let rest = uri.strip_prefix("file://")?;
    // An authority component (usually empty) may precede the path.
    let path_part = if rest.starts_with('/') {
        rest.to_string()
    } else {
        let (_, path) = rest.split_once('/')?;
        format!("/{path}")
    };
    let decoded = percent_decode_str(&path_part).decode_utf8().ok()?;
    Some(PathBuf::from(decoded.as_ref()))
}

/// Encode a filesystem path as a `file://` URI.
pub fn path_to_uri(path: &Path) -> String {
    let raw = path.to_string_lossy().replace('\\', "/");
    let encoded: String = raw
        .split('/')
        .map(|segment| {
            percent_encoding::utf8_percent_encode(segment, PATH_ESCAPE).to_string()
        })
        .collect::<Vec<_>>()
        .join("/");
    if encoded.starts_with('/') {
        format!("file://{encoded}")
    } else {
        format!("file:///{encoded}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_a_plain_path() {
        let path = PathBuf::from("/home/user/project/src/Main.elm");
        assert_eq!(path_to_uri(&path), "file:///home/user/project/src/Main.elm");
        assert_eq!(uri_to_path(&path_to_uri(&path)), Some(path));
    }

    #[test]
    fn escapes_hash_and_spaces_but_not_separators() {
        let path = PathBuf::from("/tmp/my project/#1/Main.elm");
        let uri = path_to_uri(&path);
        assert_eq!(uri, "file:///tmp/my%20project/%231/Main.elm");
        assert_eq!(uri_to_path(&uri), Some(path));
    }

    #[test]
    fn rejects_other_schemes() {
        assert_eq!(uri_to_path("https://example.com/Main.elm"), None);
    }

    #[test]
    fn decodes_escaped_unicode() {
        assert_eq!(
            uri_to_path("file:///tmp/caf%C3%A9/Main.elm"),
            Some(PathBuf::from("/tmp/café/Main.elm"))
        );
    }
}
