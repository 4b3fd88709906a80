use crate::reader::PaginationMode;
use log::warn;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

pub const ENV_BOOKS_DIR: &str = "BOOK_READER_BOOKS_DIR";
pub const ENV_FETCH_TIMEOUT_MS: &str = "BOOK_READER_FETCH_TIMEOUT_MS";
pub const ENV_PAGINATION: &str = "BOOK_READER_PAGINATION";

pub const DEFAULT_CONFIG_PATH: &str = "conf/reader.json";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("读取配置文件失败 ({path}): {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("配置文件格式错误 ({path}): {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("环境变量 {key} 的值无效: {value}")]
    InvalidOverride { key: &'static str, value: String },
}

/// 阅读器配置
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReaderConfig {
    /// 书籍文档目录，相对路径由调用方决定解析基准
    pub books_dir: PathBuf,
    /// 单次取书的超时时间（毫秒）
    pub fetch_timeout_ms: u64,
    /// 翻页策略，默认在首末页处停住
    pub pagination: PaginationMode,
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            books_dir: PathBuf::from("resources"),
            fetch_timeout_ms: 10_000,
            pagination: PaginationMode::Clamped,
        }
    }
}

impl ReaderConfig {
    /// 从 JSON 文件读取配置
    ///
    /// 文件不存在时返回默认配置
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = match fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Self::default()),
            Err(source) => {
                return Err(ConfigError::Io {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };

        serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// 读取配置文件并应用环境变量覆盖，任何错误都回退到默认值
    pub fn load_or_default(path: &Path) -> Self {
        let config = Self::load(path).unwrap_or_else(|e| {
            warn!("{}，使用默认配置", e);
            Self::default()
        });
        config.apply_env()
    }

    /// 应用进程环境变量覆盖
    ///
    /// 单个无效的覆盖值会被忽略并记录警告
    pub fn apply_env(self) -> Self {
        let mut config = self;
        for key in [ENV_BOOKS_DIR, ENV_FETCH_TIMEOUT_MS, ENV_PAGINATION] {
            if let Ok(value) = std::env::var(key) {
                match config.clone().with_override(key, &value) {
                    Ok(updated) => config = updated,
                    Err(e) => warn!("{}", e),
                }
            }
        }
        config
    }

    /// 应用一个覆盖项
    pub fn with_override(mut self, key: &'static str, value: &str) -> Result<Self, ConfigError> {
        let invalid = || ConfigError::InvalidOverride {
            key,
            value: value.to_string(),
        };
        match key {
            ENV_BOOKS_DIR => {
                if value.trim().is_empty() {
                    return Err(invalid());
                }
                self.books_dir = PathBuf::from(value);
            }
            ENV_FETCH_TIMEOUT_MS => {
                self.fetch_timeout_ms = value
                    .trim()
                    .parse::<u64>()
                    .ok()
                    .filter(|ms| *ms > 0)
                    .ok_or_else(invalid)?;
            }
            ENV_PAGINATION => {
                self.pagination = value.parse().map_err(|_| invalid())?;
            }
            _ => return Err(invalid()),
        }
        Ok(self)
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_millis(self.fetch_timeout_ms.max(1))
    }

    /// 解析书籍目录
    ///
    /// 绝对路径原样返回；相对路径拼接到 base 上
    pub fn resolve_books_dir(&self, base: &Path) -> PathBuf {
        if self.books_dir.is_absolute() {
            self.books_dir.clone()
        } else {
            base.join(&self.books_dir)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = TempDir::new().unwrap();
        let config = ReaderConfig::load(&dir.path().join("reader.json")).unwrap();
        assert_eq!(config, ReaderConfig::default());
        assert_eq!(config.fetch_timeout(), Duration::from_secs(10));
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("reader.json");
        fs::write(&path, r#"{"pagination": "unbounded"}"#).unwrap();

        let config = ReaderConfig::load(&path).unwrap();
        assert_eq!(config.pagination, PaginationMode::Unbounded);
        assert_eq!(config.books_dir, PathBuf::from("resources"));
        assert_eq!(config.fetch_timeout_ms, 10_000);
    }

    #[test]
    fn test_unparsable_file_is_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("reader.json");
        fs::write(&path, "{ pagination: ").unwrap();

        assert!(matches!(ReaderConfig::load(&path), Err(ConfigError::Parse { .. })));
    }

    #[test]
    fn test_overrides() {
        let config = ReaderConfig::default()
            .with_override(ENV_BOOKS_DIR, "/srv/books")
            .unwrap()
            .with_override(ENV_FETCH_TIMEOUT_MS, "2500")
            .unwrap()
            .with_override(ENV_PAGINATION, "UNBOUNDED")
            .unwrap();

        assert_eq!(config.books_dir, PathBuf::from("/srv/books"));
        assert_eq!(config.fetch_timeout(), Duration::from_millis(2500));
        assert_eq!(config.pagination, PaginationMode::Unbounded);
    }

    #[test]
    fn test_invalid_overrides_rejected() {
        let base = ReaderConfig::default();
        assert!(base.clone().with_override(ENV_FETCH_TIMEOUT_MS, "soon").is_err());
        assert!(base.clone().with_override(ENV_FETCH_TIMEOUT_MS, "0").is_err());
        assert!(base.clone().with_override(ENV_PAGINATION, "wrap").is_err());
        assert!(base.with_override(ENV_BOOKS_DIR, "  ").is_err());
    }

    #[test]
    fn test_resolve_books_dir() {
        let config = ReaderConfig::default();
        assert_eq!(
            config.resolve_books_dir(Path::new("/opt/app")),
            PathBuf::from("/opt/app/resources")
        );
    }
}
