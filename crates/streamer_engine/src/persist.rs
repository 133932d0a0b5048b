use std::fs;
use std::io;
use std::path::Path;

use engine_logging::engine_debug;
use tempfile::NamedTempFile;

use crate::SupervisorError;

/// Prepares a job's target directory: creates it when missing, then proves it
/// is writable by creating (and dropping) a scratch file inside it. Must run
/// before the downloader starts so a bad directory never costs a launch.
pub fn ensure_output_dir(dir: &Path) -> Result<(), SupervisorError> {
    let unusable = |reason: String| SupervisorError::OutputDir {
        path: dir.to_path_buf(),
        reason,
    };

    match fs::metadata(dir) {
        Ok(meta) if meta.is_dir() => {}
        Ok(_) => return Err(unusable("exists but is not a directory".to_string())),
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            engine_debug!("Creating output directory {:?}", dir);
            fs::create_dir_all(dir).map_err(|err| unusable(format!("cannot create: {err}")))?;
        }
        Err(err) => return Err(unusable(err.to_string())),
    }

    NamedTempFile::new_in(dir).map_err(|err| unusable(format!("not writable: {err}")))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn creates_nested_directories() {
        let root = tempfile::TempDir::new().unwrap();
        let target = root.path().join("a/b/mix");
        ensure_output_dir(&target).unwrap();
        assert!(target.is_dir());
        assert_eq!(fs::read_dir(&target).unwrap().count(), 0);
    }

    #[test]
    fn file_in_the_way_names_the_path() {
        let root = tempfile::TempDir::new().unwrap();
        let target = root.path().join("mix");
        fs::write(&target, b"not a dir").unwrap();

        let err = ensure_output_dir(&target).unwrap_err();
        let message = err.to_string();
        assert!(message.contains(&target.display().to_string()), "{message}");
        assert!(message.contains("not a directory"), "{message}");
    }
}
