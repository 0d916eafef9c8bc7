use std::path::Path;

/// Extension allowlist for streams this crate decodes.
///
/// Keep this explicit so callers can pre-check a path before paying for a
/// full open, e.g. when scanning a folder of mixed audio files.
pub fn supports_extension(ext: &str) -> bool {
    matches!(ext, "flac")
}

/// Returns whether decoding is expected to work for a given path by
/// extension allowlist. Opening probes the actual content either way.
pub fn supports_path(path: impl AsRef<Path>) -> bool {
    supports_extension(&extension_from_path(path))
}

pub fn normalize_extension(raw: &str) -> String {
    raw.trim().trim_start_matches('.').to_ascii_lowercase()
}

pub fn extension_from_path(path: impl AsRef<Path>) -> String {
    path.as_ref()
        .extension()
        .and_then(|value| value.to_str())
        .map(normalize_extension)
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extension_is_normalized() {
        assert_eq!(normalize_extension(" .FLAC "), "flac");
        assert_eq!(extension_from_path("/music/a.FlAc"), "flac");
        assert_eq!(extension_from_path("/music/noext"), "");
    }

    #[test]
    fn allowlist_is_flac_only() {
        assert!(supports_path("a.flac"));
        assert!(!supports_path("a.mp3"));
        assert!(!supports_path("a"));
    }
}
