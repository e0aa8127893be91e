// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use scraper::{ElementRef, Html, Selector};
use thiserror::Error;
use url::Url;

use crate::domain::models::job::RawRecord;
use crate::domain::models::site::SelectorManifest;
use crate::utils::url_utils;

/// 未配置链接选择器时使用的默认值
const DEFAULT_LINK_SELECTOR: &str = "a";

/// 提取错误类型
#[derive(Error, Debug)]
pub enum ExtractError {
    /// 选择器无法解析
    #[error("Invalid selector for `{field}`: {selector}")]
    InvalidSelector {
        field: &'static str,
        selector: String,
    },
}

/// 已解析的页面
///
/// 持有页面最终URL、用于解析相对链接的基础URL与解析后的文档树。
/// 文档声明了 `<base href>` 时，基础URL为其相对最终URL解析后的地址。
pub struct Page {
    url: Url,
    base_url: Url,
    document: Html,
}

impl Page {
    /// 解析HTML文档
    pub fn parse(url: Url, body: &str) -> Self {
        let document = Html::parse_document(body);
        let base_url = declared_base(&document, &url).unwrap_or_else(|| url.clone());
        Self {
            url,
            base_url,
            document,
        }
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    /// 相对链接的解析基准
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn document(&self) -> &Html {
        &self.document
    }
}

/// 文档中第一个 `<base href>` 指向的地址
fn declared_base(document: &Html, page_url: &Url) -> Option<Url> {
    let selector = Selector::parse("base[href]").ok()?;
    let href = document.select(&selector).next()?.value().attr("href")?;
    url_utils::resolve_href(page_url, href)
}

fn compile(field: &'static str, selector: &str) -> Result<Selector, ExtractError> {
    Selector::parse(selector).map_err(|_| ExtractError::InvalidSelector {
        field,
        selector: selector.to_string(),
    })
}

fn compile_optional(
    field: &'static str,
    selector: Option<&str>,
) -> Result<Option<Selector>, ExtractError> {
    selector
        .filter(|s| !s.trim().is_empty())
        .map(|s| compile(field, s))
        .transpose()
}

/// 元素文本，仅去除首尾空白
fn element_text(element: ElementRef<'_>) -> String {
    element.text().collect::<String>().trim().to_string()
}

/// 提取服务
///
/// 将选择器清单编译一次，之后可对任意数量的页面重复执行提取。
/// 提取过程没有副作用，对同一页面多次调用得到相同的记录序列。
#[derive(Debug)]
pub struct ExtractionService {
    job_container: Selector,
    job_title: Selector,
    company: Selector,
    location: Selector,
    salary: Selector,
    description: Option<Selector>,
    job_link: Selector,
    next_page: Option<Selector>,
}

impl ExtractionService {
    /// 编译选择器清单
    pub fn new(manifest: &SelectorManifest) -> Result<Self, ExtractError> {
        Ok(Self {
            job_container: compile("job_container", &manifest.job_container)?,
            job_title: compile("job_title", &manifest.job_title)?,
            company: compile("company", &manifest.company)?,
            location: compile("location", &manifest.location)?,
            salary: compile("salary", &manifest.salary)?,
            description: compile_optional("description", manifest.description.as_deref())?,
            job_link: compile(
                "job_link",
                manifest.job_link.as_deref().unwrap_or(DEFAULT_LINK_SELECTOR),
            )?,
            next_page: compile_optional("next_page", manifest.next_page.as_deref())?,
        })
    }

    /// 一次性提取：编译清单、解析页面并收集全部记录
    pub fn extract(
        html_content: &str,
        page_url: &Url,
        manifest: &SelectorManifest,
    ) -> Result<Vec<RawRecord>, ExtractError> {
        let service = Self::new(manifest)?;
        let page = Page::parse(page_url.clone(), html_content);
        Ok(service.extract_all(&page).collect())
    }

    /// 按文档顺序惰性产出页面中每个职位容器的原始记录
    pub fn extract_all<'a>(&'a self, page: &'a Page) -> impl Iterator<Item = RawRecord> + 'a {
        page.document()
            .select(&self.job_container)
            .map(move |container| self.extract_one(container, page))
    }

    fn extract_one(&self, container: ElementRef<'_>, page: &Page) -> RawRecord {
        let link = container
            .select(&self.job_link)
            .next()
            .and_then(|anchor| anchor.value().attr("href"))
            .and_then(|href| url_utils::resolve_href(page.base_url(), href));

        let (url, url_is_fallback) = match link {
            Some(url) => (url.to_string(), false),
            None => (page.url().to_string(), true),
        };

        RawRecord {
            job_title: Self::first_text(container, &self.job_title),
            company: Self::first_text(container, &self.company),
            location: Self::first_text(container, &self.location),
            salary: Self::first_text(container, &self.salary),
            description: match &self.description {
                Some(selector) => Self::first_text(container, selector),
                None => Some(String::new()),
            },
            url,
            url_is_fallback,
        }
    }

    fn first_text(container: ElementRef<'_>, selector: &Selector) -> Option<String> {
        container.select(selector).next().map(element_text)
    }

    /// 解析下一页链接
    ///
    /// 选择器未配置、未命中或 href 为空时返回 `None`。
    pub fn next_page(&self, page: &Page) -> Option<Url> {
        let selector = self.next_page.as_ref()?;
        page.document()
            .select(selector)
            .filter_map(|anchor| anchor.value().attr("href"))
            .find_map(|href| url_utils::resolve_href(page.base_url(), href))
    }
}

#[cfg(test)]
#[path = "extraction_service_test.rs"]
mod tests;
