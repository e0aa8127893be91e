// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use std::sync::Arc;

use crate::domain::models::site::SelectorManifest;
use crate::domain::services::normalization_service::{
    FillMissingFields, ForceRemoteLocation, RecordHook, StripTitleTags,
};

/// 站点扩展点
///
/// 描述单个站点相对基础行为的差异：清洗钩子以及清单未给出时使用的选择器。
#[derive(Debug, Clone, Default)]
pub struct SiteProfile {
    /// 规范化阶段执行的钩子
    pub hooks: Vec<Arc<dyn RecordHook>>,
    /// 清单未配置时使用的下一页选择器
    pub next_page: Option<String>,
    /// 清单未配置时使用的职位链接选择器
    pub job_link: Option<String>,
    /// 站点自身的翻页上限
    pub max_pages: Option<usize>,
}

impl SiteProfile {
    /// 基础行为，没有任何覆盖
    pub fn base() -> Self {
        Self::default()
    }

    /// 按站点名称（大小写不敏感）查找内置配置
    pub fn for_site(name: &str) -> Self {
        match name.to_lowercase().as_str() {
            "weworkremotely" => Self {
                hooks: vec![
                    Arc::new(StripTitleTags::new(["New!"])),
                    Arc::new(ForceRemoteLocation),
                ],
                next_page: Some("a.next_page".to_string()),
                job_link: None,
                max_pages: None,
            },
            "remoteok" => Self {
                hooks: vec![
                    Arc::new(FillMissingFields {
                        job_title: "Unknown Title".to_string(),
                        company: "Unknown Company".to_string(),
                    }),
                    Arc::new(ForceRemoteLocation),
                ],
                next_page: Some(".pagination a.next".to_string()),
                job_link: Some(r#"a[href*="/remote-jobs/"]"#.to_string()),
                max_pages: None,
            },
            _ => Self::base(),
        }
    }

    /// 合并清单，清单中已配置的字段优先
    pub fn apply_to(&self, manifest: &SelectorManifest) -> SelectorManifest {
        let mut merged = manifest.clone();
        if merged.next_page.is_none() {
            merged.next_page = self.next_page.clone();
        }
        if merged.job_link.is_none() {
            merged.job_link = self.job_link.clone();
        }
        merged
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manifest() -> SelectorManifest {
        SelectorManifest {
            job_container: "li.feature".to_string(),
            job_title: ".title".to_string(),
            company: ".company".to_string(),
            location: ".region".to_string(),
            salary: ".salary".to_string(),
            description: None,
            job_link: None,
            next_page: None,
        }
    }

    #[test]
    fn test_lookup_is_case_insensitive() {
        let profile = SiteProfile::for_site("WeWorkRemotely");
        let names: Vec<_> = profile.hooks.iter().map(|h| h.name()).collect();
        assert_eq!(names, vec!["strip_title_tags", "force_remote_location"]);
        assert_eq!(profile.next_page.as_deref(), Some("a.next_page"));
    }

    #[test]
    fn test_unknown_site_gets_base_behavior() {
        let profile = SiteProfile::for_site("SomeBoard");
        assert!(profile.hooks.is_empty());
        assert!(profile.next_page.is_none());
        assert_eq!(profile.apply_to(&manifest()), manifest());
    }

    #[test]
    fn test_manifest_values_take_precedence() {
        let mut configured = manifest();
        configured.next_page = Some("a[rel=next]".to_string());

        let merged = SiteProfile::for_site("remoteok").apply_to(&configured);
        assert_eq!(merged.next_page.as_deref(), Some("a[rel=next]"));
        assert_eq!(
            merged.job_link.as_deref(),
            Some(r#"a[href*="/remote-jobs/"]"#)
        );
    }
}
