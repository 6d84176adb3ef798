/// Class names shared by the extensions view and its stylesheet.
pub mod classes {
    pub const VIEWLET: &str = "extensions-viewlet";
    pub const HEADER: &str = "header";
    pub const SEARCH_BOX: &str = "search-box";
    pub const LIST: &str = "extensions";
    pub const LIST_ROWS: &str = "monaco-list-rows";
    pub const OVERLAY: &str = "highlight-overlay";

    pub const ROW: &str = "extension";
    pub const ICON: &str = "icon";
    pub const DETAILS: &str = "details";
    pub const NAME: &str = "name";
    pub const VERSION: &str = "version";
    pub const AUTHOR: &str = "author";
    pub const DESCRIPTION: &str = "description";
    pub const BODY: &str = "body";

    // State markers
    pub const LOADING: &str = "loading";
    pub const SELECTED: &str = "selected";
    pub const INSTALLED: &str = "installed";
    pub const OUTDATED: &str = "outdated";
    pub const HIDDEN: &str = "hidden";
    pub const ANIMATE: &str = "animate";
    pub const SETTLED: &str = "settled";
    pub const HIGHLIGHTED: &str = "highlighted";
    pub const HAS_CONTENT: &str = "has-content";
}
