#![allow(dead_code)]

use futures::future::{FutureExt, LocalBoxFuture};
use nohrs_extensions::core::config::GalleryConfig;
use nohrs_extensions::core::errors::{Error, Result};
use nohrs_extensions::models::{Entry, GalleryExtension, GalleryVersion, InstallState};
use nohrs_extensions::pages::extensions::{ExtensionsPage, ExtensionsServices};
use nohrs_extensions::pages::Page;
use nohrs_extensions::services::gallery::{
    ContentFetcher, ContentRequest, GalleryQuery, GalleryService, PageFuture, Pager, ProxyResolver,
    ProxySettings,
};
use nohrs_extensions::services::markdown::ContentRenderer;
use nohrs_extensions::ui::element::{ElementTree, Size};
use std::cell::{Cell, RefCell};
use std::collections::{HashMap, HashSet};
use std::rc::Rc;
use std::time::Duration;

pub const ROW_HEIGHT: f32 = 62.0;
pub const HEADER_HEIGHT: f32 = 41.0;
/// Ten full rows.
pub const LIST_HEIGHT: f32 = 620.0;

pub fn extension(prefix: &str, index: usize) -> GalleryExtension {
    GalleryExtension {
        publisher: "pub".into(),
        name: format!("{prefix}-{index}"),
        display_name: None,
        publisher_display_name: None,
        description: format!("extension number {index}"),
        icon_url: None,
        install_count: 0,
        versions: vec![GalleryVersion {
            version: "1.0.0".into(),
            readme_url: Some(format!("readme-{index}.md")),
            last_updated: None,
            asset_token: None,
        }],
    }
}

/// Entries named `{prefix}-{index}`; every page fetch is recorded in `calls`.
pub fn entry_pager(
    prefix: &str,
    total: usize,
    page_size: usize,
    latency: Duration,
    calls: Rc<RefCell<Vec<usize>>>,
) -> Pager<Entry> {
    let prefix = prefix.to_string();
    let make = move |range: std::ops::Range<usize>, prefix: &str| -> Vec<Entry> {
        range
            .map(|ix| Entry::new(extension(prefix, ix), InstallState::Uninstalled))
            .collect()
    };
    let first_page = make(0..page_size.min(total), &prefix);
    Pager {
        first_page,
        total,
        page_size,
        get_page: Rc::new(move |page: usize| -> PageFuture<Entry> {
            calls.borrow_mut().push(page);
            let prefix = prefix.clone();
            async move {
                tokio::time::sleep(latency).await;
                let start = page * page_size;
                Ok(make(start..(start + page_size).min(total), &prefix))
            }
            .boxed_local()
        }),
    }
}

/// Gallery answering every non-empty query with `total` extensions named
/// after the query text.
pub struct FakeGallery {
    pub total: usize,
    pub latency: Duration,
    pub queries: Rc<RefCell<Vec<String>>>,
    pub page_calls: Rc<RefCell<Vec<usize>>>,
    pub failing: HashSet<String>,
}

impl FakeGallery {
    pub fn new(total: usize) -> Self {
        Self {
            total,
            latency: Duration::from_millis(100),
            queries: Rc::new(RefCell::new(Vec::new())),
            page_calls: Rc::new(RefCell::new(Vec::new())),
            failing: HashSet::new(),
        }
    }

    pub fn failing_on(mut self, text: &str) -> Self {
        self.failing.insert(text.to_string());
        self
    }
}

impl GalleryService for FakeGallery {
    fn query(&self, query: GalleryQuery) -> LocalBoxFuture<'static, Result<Pager<GalleryExtension>>> {
        self.queries.borrow_mut().push(query.text.clone());
        let latency = self.latency;
        let fails = self.failing.contains(&query.text);
        let total = if query.text.is_empty() { 0 } else { self.total };
        let page_size = query.page_size;
        let calls = Rc::clone(&self.page_calls);

        async move {
            tokio::time::sleep(latency).await;
            if fails {
                return Err(Error::Search(format!("backend rejected {:?}", query.text)));
            }
            let pager = entry_pager(&query.text, total, page_size, latency, calls);
            Ok(pager.map(|entry: Entry| entry.item().clone()))
        }
        .boxed_local()
    }
}

/// Serves readme text by URL; unknown URLs fail.
pub struct FakeFetcher {
    pub latency: Duration,
    pub contents: HashMap<String, String>,
    pub requests: Rc<RefCell<Vec<ContentRequest>>>,
}

impl FakeFetcher {
    pub fn with_readmes(count: usize) -> Self {
        Self {
            latency: Duration::from_millis(50),
            contents: (0..count)
                .map(|ix| (format!("readme-{ix}.md"), format!("readme {ix}")))
                .collect(),
            requests: Rc::new(RefCell::new(Vec::new())),
        }
    }
}

impl ContentFetcher for FakeFetcher {
    fn fetch(&self, request: ContentRequest) -> LocalBoxFuture<'static, Result<String>> {
        self.requests.borrow_mut().push(request.clone());
        let latency = self.latency;
        let content = self.contents.get(&request.url).cloned();
        async move {
            tokio::time::sleep(latency).await;
            content.ok_or_else(|| Error::ContentFetch {
                url: request.url.clone(),
                reason: "not found".into(),
            })
        }
        .boxed_local()
    }
}

pub struct StaticProxy {
    pub settings: ProxySettings,
    pub calls: Cell<usize>,
}

impl ProxyResolver for StaticProxy {
    fn resolve(&self, _settings_key: &str) -> ProxySettings {
        self.calls.set(self.calls.get() + 1);
        self.settings.clone()
    }
}

pub struct ParagraphRenderer;

impl ContentRenderer for ParagraphRenderer {
    fn render(&self, text: &str) -> String {
        format!("<p>{text}</p>")
    }
}

pub struct Harness {
    pub page: ExtensionsPage,
    pub queries: Rc<RefCell<Vec<String>>>,
    pub page_calls: Rc<RefCell<Vec<usize>>>,
    pub requests: Rc<RefCell<Vec<ContentRequest>>>,
    pub proxy: Rc<StaticProxy>,
}

/// A laid out page with a ten row viewport. Must be called inside a `LocalSet`.
pub fn harness(gallery: FakeGallery, fetcher: FakeFetcher) -> Harness {
    let queries = Rc::clone(&gallery.queries);
    let page_calls = Rc::clone(&gallery.page_calls);
    let requests = Rc::clone(&fetcher.requests);
    let proxy = Rc::new(StaticProxy {
        settings: ProxySettings {
            proxy_url: Some("http://proxy.local:3128".into()),
            strict_ssl: false,
        },
        calls: Cell::new(0),
    });

    let config = GalleryConfig {
        row_height: ROW_HEIGHT,
        header_height: HEADER_HEIGHT,
        ..GalleryConfig::default()
    };
    let services = ExtensionsServices {
        gallery: Rc::new(gallery),
        installed: Rc::new(HashMap::<String, String>::new()),
        proxy: Rc::clone(&proxy) as Rc<dyn ProxyResolver>,
        fetcher: Rc::new(fetcher),
        renderer: Rc::new(ParagraphRenderer),
    };

    let tree = ElementTree::shared();
    let host = tree.borrow_mut().create("body");
    let mut page = ExtensionsPage::new(tree, config, services);
    page.create_view(host);
    page.layout(Size::new(400.0, HEADER_HEIGHT + LIST_HEIGHT));

    Harness {
        page,
        queries,
        page_calls,
        requests,
        proxy,
    }
}
