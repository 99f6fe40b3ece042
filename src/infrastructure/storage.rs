use std::fs;
use std::path::{Path, PathBuf};

pub fn ensure_upload_dir(upload_dir: &Path) -> std::io::Result<PathBuf> {
    ensure_dir(upload_dir)?;
    Ok(upload_dir.to_path_buf())
}

/// Reduces a client supplied file name to its last path component.
pub fn sanitize_filename(name: &str) -> Option<String> {
    let base = name
        .rsplit(|c| c == '/' || c == '\\')
        .next()
        .unwrap_or_default()
        .trim();
    if base.is_empty() || base == "." || base == ".." {
        return None;
    }
    Some(base.to_string())
}

/// Extension check only; content is never sniffed.
pub fn is_allowed_extension(filename: &str, allowed: &[String]) -> bool {
    match filename.rsplit_once('.') {
        Some((_, ext)) => allowed.iter().any(|a| a.eq_ignore_ascii_case(ext)),
        None => false,
    }
}

pub fn output_file_name(prefix: &str, input: &Path) -> Option<String> {
    input
        .file_name()
        .and_then(|name| name.to_str())
        .map(|name| format!("{}{}", prefix, name))
}

/// Looks a download up inside the upload dir, refusing anything that could
/// escape it.
pub fn resolve_download(upload_dir: &Path, filename: &str) -> Option<PathBuf> {
    if sanitize_filename(filename).as_deref() != Some(filename) {
        return None;
    }
    let path = upload_dir.join(filename);
    path.is_file().then_some(path)
}

fn ensure_dir(path: &Path) -> std::io::Result<()> {
    if !path.exists() {
        fs::create_dir_all(path)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn allowed() -> Vec<String> {
        vec!["html".to_string(), "xlsx".to_string()]
    }

    #[test]
    fn test_sanitize_strips_directories() {
        assert_eq!(sanitize_filename("../../etc/passwd"), Some("passwd".to_string()));
        assert_eq!(sanitize_filename(r"C:\Users\me\promo.html"), Some("promo.html".to_string()));
        assert_eq!(sanitize_filename("promo.html"), Some("promo.html".to_string()));
        assert_eq!(sanitize_filename("dir/"), None);
        assert_eq!(sanitize_filename(".."), None);
        assert_eq!(sanitize_filename(""), None);
    }

    #[test]
    fn test_allowed_extensions_case_insensitive() {
        assert!(is_allowed_extension("promo.HTML", &allowed()));
        assert!(is_allowed_extension("images.v2.xlsx", &allowed()));
        assert!(!is_allowed_extension("images.xls", &allowed()));
        assert!(!is_allowed_extension("README", &allowed()));
        assert!(!is_allowed_extension("promo.htm", &allowed()));
    }

    #[test]
    fn test_output_file_name_uses_basename() {
        let name = output_file_name("modified_", Path::new("uploads/promo.html"));
        assert_eq!(name, Some("modified_promo.html".to_string()));
    }

    #[test]
    fn test_resolve_download() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("modified_promo.html"), "<html></html>").unwrap();

        assert!(resolve_download(dir.path(), "modified_promo.html").is_some());
        assert!(resolve_download(dir.path(), "missing.html").is_none());
        assert!(resolve_download(dir.path(), "../modified_promo.html").is_none());
        assert!(resolve_download(dir.path(), "..").is_none());
    }

    #[test]
    fn test_ensure_upload_dir_creates_nested() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("a").join("b");
        let created = ensure_upload_dir(&nested).unwrap();
        assert!(created.is_dir());
    }
}
