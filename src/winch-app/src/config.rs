// SPDX-FileCopyrightText: 2025 Stanislaw Grams <stanislawgrams@gmail.com>
//
// SPDX-License-Identifier: BSD-2-Clause

//! Section-based loading of `ctd-winch.toml`.

use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const CONFIG_FILE_NAME: &str = "ctd-winch.toml";
const CONFIG_DIR_NAME: &str = "ctd-winch";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {0}: {1}")]
    ReadError(PathBuf, String),

    #[error("Failed to parse config file {0}: {1}")]
    ParseError(PathBuf, String),
}

/// Default search paths: current directory, XDG config dir, then /etc.
fn config_search_paths() -> Vec<PathBuf> {
    let mut paths = vec![PathBuf::from(CONFIG_FILE_NAME)];
    if let Some(config_dir) = dirs::config_dir() {
        paths.push(config_dir.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME));
    }
    paths.push(PathBuf::from("/etc").join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME));
    paths
}

/// Deserialize the `[key]` table of a TOML document.
///
/// `Ok(None)` means the section is absent.
fn parse_section<T: DeserializeOwned>(
    path: &Path,
    content: &str,
    key: &str,
) -> Result<Option<T>, ConfigError> {
    let table: toml::Table = toml::from_str(content)
        .map_err(|e| ConfigError::ParseError(path.to_path_buf(), e.to_string()))?;

    let Some(section) = table.get(key) else {
        return Ok(None);
    };

    // Round-trip through text so serde defaults apply to missing keys.
    let section_toml = toml::to_string(section)
        .map_err(|e| ConfigError::ParseError(path.to_path_buf(), e.to_string()))?;
    let cfg = toml::from_str::<T>(&section_toml)
        .map_err(|e| ConfigError::ParseError(path.to_path_buf(), e.to_string()))?;
    Ok(Some(cfg))
}

fn load_section_from_file<T: DeserializeOwned>(
    path: &Path,
    key: &str,
) -> Result<Option<T>, ConfigError> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| ConfigError::ReadError(path.to_path_buf(), e.to_string()))?;
    parse_section(path, &content, key)
}

/// A configuration record stored as one section of `ctd-winch.toml`.
pub trait ConfigFile: Sized + Default + DeserializeOwned {
    /// Section key, e.g. `"winch-server"`.
    fn section_key() -> &'static str;

    /// Load the section from `path`. A file without the section is an error.
    fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        load_section_from_file::<Self>(path, Self::section_key())?.ok_or_else(|| {
            ConfigError::ParseError(
                path.to_path_buf(),
                format!("missing [{}] section", Self::section_key()),
            )
        })
    }

    /// Parse the section out of an in-memory document.
    fn load_from_str(content: &str) -> Result<Self, ConfigError> {
        let origin = Path::new("<inline>");
        parse_section::<Self>(origin, content, Self::section_key())?.ok_or_else(|| {
            ConfigError::ParseError(
                origin.to_path_buf(),
                format!("missing [{}] section", Self::section_key()),
            )
        })
    }

    /// Load the first default-path file carrying the section, or defaults
    /// when none exists.
    fn load_from_default_paths() -> Result<(Self, Option<PathBuf>), ConfigError> {
        for path in config_search_paths() {
            if path.exists() {
                if let Some(cfg) = load_section_from_file::<Self>(&path, Self::section_key())? {
                    return Ok((cfg, Some(path)));
                }
            }
        }
        Ok((Self::default(), None))
    }

    /// Explicit path if given, otherwise the default search.
    fn resolve(explicit: Option<&Path>) -> Result<(Self, Option<PathBuf>), ConfigError> {
        match explicit {
            Some(path) => Ok((Self::load_from_file(path)?, Some(path.to_path_buf()))),
            None => Self::load_from_default_paths(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Default, Deserialize, PartialEq)]
    #[serde(default)]
    struct Sample {
        port: u16,
        name: String,
    }

    impl ConfigFile for Sample {
        fn section_key() -> &'static str {
            "sample"
        }
    }

    #[test]
    fn test_load_from_str_applies_defaults() {
        let cfg = Sample::load_from_str("[sample]\nport = 5008\n").unwrap();
        assert_eq!(
            cfg,
            Sample {
                port: 5008,
                name: String::new()
            }
        );
    }

    #[test]
    fn test_missing_section_is_error() {
        let err = Sample::load_from_str("[other]\nport = 1\n").unwrap_err();
        assert!(err.to_string().contains("missing [sample] section"));
    }

    #[test]
    fn test_load_from_file_round_trip() {
        let path = std::env::temp_dir().join(format!("ctd-winch-config-{}.toml", std::process::id()));
        std::fs::write(&path, "[sample]\nname = \"aft\"\n").unwrap();
        let (cfg, found) = Sample::resolve(Some(&path)).unwrap();
        std::fs::remove_file(&path).unwrap();
        assert_eq!(cfg.name, "aft");
        assert_eq!(found.as_deref(), Some(path.as_path()));
    }

    #[test]
    fn test_unreadable_file_is_read_error() {
        let err = Sample::load_from_file(Path::new("/nonexistent/ctd-winch.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::ReadError(..)));
    }

    #[test]
    fn test_search_paths_end_in_etc() {
        let paths = config_search_paths();
        assert_eq!(paths[0], PathBuf::from(CONFIG_FILE_NAME));
        assert_eq!(
            paths.last().unwrap(),
            &PathBuf::from("/etc/ctd-winch/ctd-winch.toml")
        );
    }
}
