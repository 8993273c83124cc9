//! Command implementations for the CLI.

mod convert;
mod status;
mod sync;

use std::path::Path;

use anyhow::{Context, Result, bail};
use floodlog_core::Config;

pub use convert::{ConvertSummary, cmd_convert, convert_csv};
pub use status::{ArchiveStatus, archive_status, cmd_status};
pub use sync::{cmd_sync, format_report_json, format_report_text};

/// Point the storage configuration at a local directory.
///
/// The directory's name becomes the container and its parent the root, so
/// the usual `root/container` layout resolves to `dir` itself.
pub(crate) fn use_local_dir(config: &mut Config, dir: &Path) -> Result<()> {
    let dir = std::path::absolute(dir)
        .with_context(|| format!("Failed to resolve {}", dir.display()))?;

    let (Some(parent), Some(name)) = (dir.parent(), dir.file_name()) else {
        bail!("{} cannot be used as an archive directory", dir.display());
    };

    config.storage.root = parent.to_path_buf();
    config.storage.container = name.to_string_lossy().into_owned();
    config.storage.endpoint = None;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_use_local_dir() {
        let mut config = Config::default();
        config.storage.endpoint = Some("https://storage.example.com".to_string());

        use_local_dir(&mut config, Path::new("/srv/floodlog/hereford")).unwrap();

        assert_eq!(config.storage.container, "hereford");
        assert_eq!(config.storage.endpoint, None);
        assert_eq!(config.storage.local_dir(), PathBuf::from("/srv/floodlog/hereford"));
    }

    #[test]
    fn test_use_local_dir_rejects_root() {
        let mut config = Config::default();
        assert!(use_local_dir(&mut config, Path::new("/")).is_err());
    }
}
