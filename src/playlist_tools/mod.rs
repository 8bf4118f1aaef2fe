//! Local-only rewrites of the m3u files. Nothing here talks to Spotify.

pub mod mount_point;
pub mod splitter;
pub mod windows;

/// Lines that hold a path, as opposed to blank lines and `#` directives.
///
/// Unlike [`crate::m3u::is_path_line`] an indented `#` line counts as a path here, which is how
/// the converters have always treated them.
pub(crate) fn is_rewritable_line(line: &str) -> bool {
    !line.trim().is_empty() && !line.starts_with('#')
}

/// Applies `convert` to every rewritable line, keeping line endings and every other line
/// byte for byte.
pub(crate) fn rewrite_lines(contents: &str, convert: impl Fn(&str) -> String) -> String {
    let mut output = String::with_capacity(contents.len());
    for line in contents.split_inclusive('\n') {
        if is_rewritable_line(line) {
            let body_len = line.trim_end_matches(['\n', '\r']).len();
            let (body, ending) = line.split_at(body_len);
            output.push_str(&convert(body));
            output.push_str(ending);
        } else {
            output.push_str(line);
        }
    }
    output
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rewrite_lines_keeps_comments_and_endings() {
        let contents = "#EXTM3U\r\n#EXTINF:1,a/b\r\n/x/a.flac\r\n\n/x/b.flac";
        let output = rewrite_lines(contents, |line| line.to_uppercase());

        assert_eq!(output, "#EXTM3U\r\n#EXTINF:1,a/b\r\n/X/A.FLAC\r\n\n/X/B.FLAC");
    }

    #[test]
    fn test_indented_hash_is_rewritable() {
        assert!(is_rewritable_line("  #not-a-directive.flac"));
        assert!(!is_rewritable_line("#EXTINF:1,x"));
        assert!(!is_rewritable_line("   \n"));
    }
}
