use super::virtual_list::{RowRenderer, RowTemplate};
use crate::models::{Entry, InstallState};
use crate::ui::element::ElementTree;
use crate::ui::theme::classes;

/// Renders an extension search result as icon, name, version, author and
/// description, with an empty body that the highlight fills with the readme.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExtensionRowRenderer;

impl RowRenderer for ExtensionRowRenderer {
    fn create_template(&self, tree: &mut ElementTree) -> RowTemplate {
        let container = tree.create_with_class("div", classes::ROW);
        let icon = tree.create_with_class("img", classes::ICON);
        let details = tree.create_with_class("div", classes::DETAILS);
        let header = tree.create_with_class("div", classes::HEADER);
        let name = tree.create_with_class("span", classes::NAME);
        let version = tree.create_with_class("span", classes::VERSION);
        let author = tree.create_with_class("span", classes::AUTHOR);
        let description = tree.create_with_class("div", classes::DESCRIPTION);
        let body = tree.create_with_class("div", classes::BODY);

        tree.append_child(container, icon);
        tree.append_child(container, details);
        tree.append_child(details, header);
        tree.append_child(header, name);
        tree.append_child(header, version);
        tree.append_child(header, author);
        tree.append_child(details, description);
        tree.append_child(container, body);

        RowTemplate {
            container,
            icon,
            name,
            version,
            author,
            description,
            body,
        }
    }

    fn render_entry(&self, tree: &mut ElementTree, template: &RowTemplate, entry: &Entry) {
        let item = entry.item();
        tree.remove_class(template.container, classes::LOADING);
        tree.toggle_class(
            template.container,
            classes::INSTALLED,
            entry.state() == InstallState::Installed,
        );
        tree.toggle_class(
            template.container,
            classes::OUTDATED,
            entry.state() == InstallState::Outdated,
        );
        tree.set_attr(template.container, "data-extension-id", entry.id());

        match &item.icon_url {
            Some(url) => tree.set_attr(template.icon, "src", url.clone()),
            None => tree.remove_attr(template.icon, "src"),
        }
        tree.set_text(template.name, item.display_name());
        tree.set_text(template.version, entry.version().unwrap_or_default());
        match entry.last_updated() {
            Some(date) => tree.set_attr(template.version, "title", format!("Last updated: {date}")),
            None => tree.remove_attr(template.version, "title"),
        }
        tree.set_text(template.author, item.author());
        tree.set_text(template.description, item.description.clone());
        tree.set_markup(template.body, None);
    }

    fn render_placeholder(&self, tree: &mut ElementTree, template: &RowTemplate) {
        tree.add_class(template.container, classes::LOADING);
        tree.remove_class(template.container, classes::INSTALLED);
        tree.remove_class(template.container, classes::OUTDATED);
        tree.remove_attr(template.container, "data-extension-id");
        tree.remove_attr(template.icon, "src");
        tree.remove_attr(template.version, "title");
        for handle in [template.name, template.version, template.author, template.description] {
            tree.set_text(handle, "");
        }
        tree.set_markup(template.body, None);
    }
}
