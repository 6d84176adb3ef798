use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::hash::{Hash, Hasher};
use time::macros::format_description;
use time::OffsetDateTime;

/// An extension record as returned by the gallery.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GalleryExtension {
    pub publisher: String,
    pub name: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub publisher_display_name: Option<String>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub icon_url: Option<String>,
    #[serde(default)]
    pub install_count: u64,
    /// Newest first. The first entry is the one shown in the list.
    #[serde(default)]
    pub versions: Vec<GalleryVersion>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GalleryVersion {
    pub version: String,
    #[serde(default)]
    pub readme_url: Option<String>,
    /// Unix timestamp in seconds.
    #[serde(default)]
    pub last_updated: Option<i64>,
    #[serde(default)]
    pub asset_token: Option<String>,
}

impl GalleryExtension {
    /// `publisher.name`
    pub fn id(&self) -> String {
        format!("{}.{}", self.publisher, self.name)
    }

    pub fn display_name(&self) -> &str {
        self.display_name.as_deref().unwrap_or(&self.name)
    }

    pub fn author(&self) -> &str {
        self.publisher_display_name
            .as_deref()
            .unwrap_or(&self.publisher)
    }

    pub fn display_version(&self) -> Option<&GalleryVersion> {
        self.versions.first()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallState {
    Uninstalled,
    Installed,
    Outdated,
}

impl InstallState {
    pub fn as_str(&self) -> &'static str {
        match self {
            InstallState::Uninstalled => "uninstalled",
            InstallState::Installed => "installed",
            InstallState::Outdated => "outdated",
        }
    }
}

/// A search result paired with its install state. Equality and hashing go
/// through [`Entry::id`].
#[derive(Debug, Clone)]
pub struct Entry {
    item: GalleryExtension,
    state: InstallState,
}

impl Entry {
    pub fn new(item: GalleryExtension, state: InstallState) -> Self {
        Self { item, state }
    }

    /// Derives the install state from the locally installed version, if any.
    pub fn classify(item: GalleryExtension, installed_version: Option<&str>) -> Self {
        let state = match (installed_version, item.display_version()) {
            (None, _) => InstallState::Uninstalled,
            (Some(local), Some(gallery))
                if compare_versions(&gallery.version, local) == Ordering::Greater =>
            {
                InstallState::Outdated
            }
            (Some(_), _) => InstallState::Installed,
        };
        Self { item, state }
    }

    pub fn id(&self) -> String {
        self.item.id()
    }

    pub fn item(&self) -> &GalleryExtension {
        &self.item
    }

    pub fn state(&self) -> InstallState {
        self.state
    }

    pub fn version(&self) -> Option<&str> {
        self.item.display_version().map(|v| v.version.as_str())
    }

    pub fn readme_url(&self) -> Option<&str> {
        self.item
            .display_version()
            .and_then(|v| v.readme_url.as_deref())
    }

    pub fn last_updated(&self) -> Option<String> {
        self.item
            .display_version()
            .and_then(|v| v.last_updated)
            .and_then(format_date)
    }
}

impl PartialEq for Entry {
    fn eq(&self, other: &Self) -> bool {
        self.item.publisher == other.item.publisher && self.item.name == other.item.name
    }
}

impl Eq for Entry {}

impl Hash for Entry {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.item.publisher.hash(state);
        self.item.name.hash(state);
    }
}

/// Dotted numeric comparison. Anything after `-` is ignored and missing or
/// non-numeric components count as zero.
pub fn compare_versions(a: &str, b: &str) -> Ordering {
    fn parts(v: &str) -> Vec<u64> {
        let core = v.split('-').next().unwrap_or("");
        core.split('.')
            .map(|p| p.trim().parse::<u64>().unwrap_or(0))
            .collect()
    }

    let (a, b) = (parts(a), parts(b));
    let len = a.len().max(b.len());
    for ix in 0..len {
        let x = a.get(ix).copied().unwrap_or(0);
        let y = b.get(ix).copied().unwrap_or(0);
        match x.cmp(&y) {
            Ordering::Equal => continue,
            other => return other,
        }
    }
    Ordering::Equal
}

/// `YYYY/MM/DD`
pub fn format_date(timestamp: i64) -> Option<String> {
    let datetime = OffsetDateTime::from_unix_timestamp(timestamp).ok()?;
    datetime
        .format(format_description!("[year]/[month]/[day]"))
        .ok()
}
