//! Resolution of downloadable artifact names against the backup root

use std::path::{Component, Path, PathBuf};

use thiserror::Error;

/// Why an artifact name was refused
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ArtifactError {
    #[error("Invalid artifact name: {0}")]
    InvalidName(String),

    #[error("Artifact not found: {0}")]
    NotFound(String),
}

/// Whether `name` looks like something the engine produced
pub fn is_artifact_name(name: &str) -> bool {
    name.starts_with("backup-") && (name.ends_with(".sql") || name.ends_with(".sql.gz"))
}

/// Map a caller-supplied artifact name onto a regular file inside `root`.
///
/// The name must be a single plain path component following the artifact
/// naming scheme, and the canonical result must stay under the canonical root.
pub fn resolve_artifact(root: &Path, name: &str) -> Result<PathBuf, ArtifactError> {
    let invalid = || ArtifactError::InvalidName(name.to_string());

    if name.is_empty() || name.contains(['/', '\\', '\0']) || !is_artifact_name(name) {
        return Err(invalid());
    }
    let mut components = Path::new(name).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(_)), None) => {}
        _ => return Err(invalid()),
    }

    let not_found = || ArtifactError::NotFound(name.to_string());
    let root = root.canonicalize().map_err(|_| not_found())?;
    let candidate = root.join(name).canonicalize().map_err(|_| not_found())?;

    if candidate.parent() != Some(root.as_path()) {
        return Err(invalid());
    }
    if !candidate.is_file() {
        return Err(not_found());
    }
    Ok(candidate)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    const NAME: &str = "backup-shop-2024-01-02-03-04-05.sql.gz";

    #[test]
    fn test_resolves_existing_artifact() {
        let root = tempfile::tempdir().unwrap();
        fs::write(root.path().join(NAME), b"gz").unwrap();

        let path = resolve_artifact(root.path(), NAME).unwrap();
        assert_eq!(path, root.path().canonicalize().unwrap().join(NAME));
    }

    #[test]
    fn test_rejects_traversal() {
        let root = tempfile::tempdir().unwrap();
        for name in [
            "../backup-x.sql",
            "..",
            "sub/backup-x.sql",
            "..\\backup-x.sql",
            "/etc/backup-x.sql",
            "",
        ] {
            assert_eq!(
                resolve_artifact(root.path(), name),
                Err(ArtifactError::InvalidName(name.to_string())),
                "name {:?}",
                name
            );
        }
    }

    #[test]
    fn test_rejects_foreign_file_names() {
        let root = tempfile::tempdir().unwrap();
        fs::write(root.path().join("secrets.txt"), b"x").unwrap();
        assert!(matches!(
            resolve_artifact(root.path(), "secrets.txt"),
            Err(ArtifactError::InvalidName(_))
        ));
    }

    #[test]
    fn test_rejects_unfinished_dump() {
        let root = tempfile::tempdir().unwrap();
        let name = "backup-shop-2024-01-02-03-04-05.sql.part";
        fs::write(root.path().join(name), b"SET foreign_key_checks = 0;").unwrap();

        assert!(!is_artifact_name(name));
        assert_eq!(
            resolve_artifact(root.path(), name),
            Err(ArtifactError::InvalidName(name.to_string()))
        );
    }

    #[test]
    fn test_missing_artifact() {
        let root = tempfile::tempdir().unwrap();
        assert_eq!(
            resolve_artifact(root.path(), NAME),
            Err(ArtifactError::NotFound(NAME.to_string()))
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_rejects_symlink_out_of_root() {
        let root = tempfile::tempdir().unwrap();
        let outside = tempfile::tempdir().unwrap();
        let target = outside.path().join("passwd");
        fs::write(&target, b"x").unwrap();
        std::os::unix::fs::symlink(&target, root.path().join("backup-evil.sql")).unwrap();

        assert!(matches!(
            resolve_artifact(root.path(), "backup-evil.sql"),
            Err(ArtifactError::InvalidName(_))
        ));
    }

    #[test]
    fn test_directory_is_not_an_artifact() {
        let root = tempfile::tempdir().unwrap();
        fs::create_dir(root.path().join("backup-dir.sql")).unwrap();
        assert!(matches!(
            resolve_artifact(root.path(), "backup-dir.sql"),
            Err(ArtifactError::NotFound(_))
        ));
    }
}
