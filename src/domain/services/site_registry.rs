// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use once_cell::sync::OnceCell;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

use crate::domain::models::site::SiteConfig;

/// 站点注册表错误类型
#[derive(Error, Debug)]
pub enum RegistryError {
    /// 清单中没有该站点
    #[error("Configuration for {0} not found in manifest")]
    ConfigNotFound(String),
    /// 清单文件读取失败
    #[error("Failed to read manifest {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// 清单格式错误
    #[error("Invalid manifest: {0}")]
    Parse(#[from] serde_json::Error),
}

/// 清单文件结构
#[derive(Debug, Deserialize)]
struct ManifestFile {
    #[serde(default)]
    static_sites: Vec<SiteConfig>,
    #[serde(default)]
    js_heavy_sites: Vec<SiteConfig>,
}

/// 站点注册表
///
/// 以小写站点名为键索引清单中的站点配置，加载后只读。
#[derive(Debug, Default)]
pub struct SiteRegistry {
    sites: HashMap<String, Arc<SiteConfig>>,
    order: Vec<String>,
}

static GLOBAL_REGISTRY: OnceCell<Arc<SiteRegistry>> = OnceCell::new();

/// 进程级注册表
///
/// 首次调用时读取清单，之后的调用直接返回同一实例，参数被忽略。
pub fn global(manifest_path: impl AsRef<Path>) -> Result<Arc<SiteRegistry>, RegistryError> {
    GLOBAL_REGISTRY
        .get_or_try_init(|| SiteRegistry::load(manifest_path).map(Arc::new))
        .cloned()
}

impl SiteRegistry {
    /// 从清单文件加载
    pub fn load(manifest_path: impl AsRef<Path>) -> Result<Self, RegistryError> {
        let path = manifest_path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| RegistryError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let registry = Self::from_json(&content)?;
        info!(
            "Loaded {} site configurations from {}",
            registry.len(),
            path.display()
        );
        Ok(registry)
    }

    /// 从JSON字符串加载
    pub fn from_json(content: &str) -> Result<Self, RegistryError> {
        let manifest: ManifestFile = serde_json::from_str(content)?;
        let mut registry = Self::default();
        for site in manifest
            .static_sites
            .into_iter()
            .chain(manifest.js_heavy_sites)
        {
            registry.insert(site);
        }
        Ok(registry)
    }

    fn insert(&mut self, site: SiteConfig) {
        let key = site.key();
        if self.sites.contains_key(&key) {
            warn!("Duplicate site configuration for {}, keeping the first", site.name);
            return;
        }
        self.order.push(site.name.clone());
        self.sites.insert(key, Arc::new(site));
    }

    /// 大小写不敏感地查找站点
    pub fn resolve(&self, name: &str) -> Result<Arc<SiteConfig>, RegistryError> {
        self.sites
            .get(&name.to_lowercase())
            .cloned()
            .ok_or_else(|| RegistryError::ConfigNotFound(name.to_string()))
    }

    /// 按清单顺序返回站点名称
    pub fn names(&self) -> Vec<String> {
        self.order.clone()
    }

    pub fn len(&self) -> usize {
        self.sites.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sites.is_empty()
    }
}
