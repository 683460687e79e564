//! Make emitted asset references relative so the package is relocatable.

use std::path::Path;

use regex_lite::{Captures, Regex};
use walkdir::WalkDir;

use super::PackageError;

/// Rewrite `href`/`src` attributes pointing at `/{asset_dir}/` so they
/// resolve from a file `depth` directories below the package root.
pub fn relativize_asset_paths(html: &str, asset_dir: &str, depth: usize) -> String {
    let pattern = format!(r#"(href|src)=(["'])/{}/"#, regex_lite::escape(asset_dir));
    let Ok(re) = Regex::new(&pattern) else {
        return html.to_string();
    };

    let prefix = if depth == 0 {
        "./".to_string()
    } else {
        "../".repeat(depth)
    };

    re.replace_all(html, |caps: &Captures| {
        format!("{}={}{}{}/", &caps[1], &caps[2], prefix, asset_dir)
    })
    .into_owned()
}

/// Apply [`relativize_asset_paths`] to every HTML file under `root`.
/// Returns how many files changed.
pub fn relativize_tree(root: &Path, asset_dir: &str) -> Result<usize, PackageError> {
    let mut changed = 0;

    for entry in WalkDir::new(root) {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        let is_html = entry
            .path()
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("html"));
        if !is_html {
            continue;
        }

        // depth() counts the file itself.
        let depth = entry.depth().saturating_sub(1);
        let html = std::fs::read_to_string(entry.path())?;
        let rewritten = relativize_asset_paths(&html, asset_dir, depth);
        if rewritten != html {
            std::fs::write(entry.path(), rewritten)?;
            changed += 1;
        }
    }

    Ok(changed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_root_document_uses_dot_slash() {
        let html = r#"<link href="/_app/immutable/app.css"><script src='/_app/immutable/start.js'></script>"#;
        assert_eq!(
            relativize_asset_paths(html, "_app", 0),
            r#"<link href="./_app/immutable/app.css"><script src='./_app/immutable/start.js'></script>"#
        );
    }

    #[test]
    fn test_nested_document_walks_up() {
        let html = r#"<img src="/_app/img/logo.png">"#;
        assert_eq!(
            relativize_asset_paths(html, "_app", 2),
            r#"<img src="../../_app/img/logo.png">"#
        );
    }

    #[test]
    fn test_leaves_other_references_alone() {
        let html = r#"<a href="/about/">x</a><img src="https://cdn.example.com/_app/x.png"><a href="/_application/">y</a>"#;
        assert_eq!(relativize_asset_paths(html, "_app", 0), html);
    }

    #[test]
    fn test_tree_rewrite_by_depth() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join("chapter")).unwrap();
        std::fs::write(dir.path().join("index.html"), r#"<script src="/_app/a.js"></script>"#).unwrap();
        std::fs::write(
            dir.path().join("chapter/index.html"),
            r#"<script src="/_app/a.js"></script>"#,
        )
        .unwrap();
        std::fs::write(dir.path().join("data.json"), r#"{"src":"/_app/a.js"}"#).unwrap();

        assert_eq!(relativize_tree(dir.path(), "_app").unwrap(), 2);

        assert_eq!(
            std::fs::read_to_string(dir.path().join("index.html")).unwrap(),
            r#"<script src="./_app/a.js"></script>"#
        );
        assert_eq!(
            std::fs::read_to_string(dir.path().join("chapter/index.html")).unwrap(),
            r#"<script src="../_app/a.js"></script>"#
        );
        assert_eq!(
            std::fs::read_to_string(dir.path().join("data.json")).unwrap(),
            r#"{"src":"/_app/a.js"}"#
        );
    }
}
