use std::fs;
use std::path::Path;

use crate::core::{MdnaConfig, Result};

pub fn ensure_dir(path: &Path) -> Result<()> {
    fs::create_dir_all(path)?;
    Ok(())
}

pub fn ensure_data_dirs(config: &MdnaConfig) -> Result<()> {
    ensure_dir(&config.data_dir)?;
    ensure_dir(&config.edgar_dir())?;
    ensure_dir(&config.cache_dir())?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_ensure_data_dirs_creates_tree() {
        let temp = tempdir().unwrap();
        let config = MdnaConfig {
            data_dir: temp.path().join("data"),
            ..MdnaConfig::default()
        };
        ensure_data_dirs(&config).unwrap();
        assert!(config.edgar_dir().is_dir());
        assert!(config.cache_dir().is_dir());
    }
}
