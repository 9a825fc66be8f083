//! Stable, content-derived ids and human-readable labels for scroll targets
//!
//! Ids are structural paths from `body` (`body>main#app>div:nth-of-type(2)`)
//! and stay stable across rescans of the same page. They are not stable
//! across reloads or heavy restructuring; a stored id that no longer
//! resolves is a normal state.

use crate::document::{Document, NodeId};

/// Default number of levels walked above an element when building its id
pub const DEFAULT_MAX_ID_DEPTH: usize = 8;

/// 1-based position of `node` among its preceding siblings with the same tag
fn index_within_type(doc: &Document, node: NodeId) -> usize {
    let Some(data) = doc.get(node) else {
        return 1;
    };
    let Some(parent) = data.parent().and_then(|p| doc.get(p)) else {
        return 1;
    };

    let mut index = 1;
    for sibling in parent.children() {
        if *sibling == node {
            break;
        }
        if doc.get(*sibling).is_some_and(|s| s.tag() == data.tag()) {
            index += 1;
        }
    }
    index
}

/// Build the structural id of `node`
///
/// Walks toward `body` for at most `max_depth` levels. The first ancestor
/// (or the element itself) with a non-blank id short-circuits the walk as
/// `tag#id`; every other level is `tag:nth-of-type(i)`.
pub fn element_target_id(doc: &Document, node: NodeId, max_depth: usize) -> String {
    let body = doc.body();
    let mut segments: Vec<String> = Vec::new();
    let mut current = Some(node);
    let mut depth = 0;

    while let Some(id) = current {
        if id == body || depth >= max_depth {
            break;
        }
        let Some(data) = doc.get(id) else {
            break;
        };

        let element_id = data.id().trim();
        if !element_id.is_empty() {
            segments.push(format!("{}#{}", data.tag(), element_id));
            break;
        }

        segments.push(format!(
            "{}:nth-of-type({})",
            data.tag(),
            index_within_type(doc, id)
        ));
        current = data.parent();
        depth += 1;
    }

    segments.push("body".to_string());
    segments.reverse();
    segments.join(">")
}

/// Human-readable label: aria-label, id, role or first class, with size
pub fn element_target_label(doc: &Document, node: NodeId) -> String {
    let Some(data) = doc.get(node) else {
        return String::new();
    };

    let tag = data.tag();
    let client = data.client_size();
    let dims = format!("{}x{}", client.width.round(), client.height.round());

    let non_blank = |value: Option<&str>| {
        value
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_string)
    };

    if let Some(aria) = non_blank(data.attribute("aria-label")) {
        return format!("{aria} ({tag}, {dims})");
    }
    if let Some(id) = non_blank(Some(data.id())) {
        return format!("#{id} ({tag}, {dims})");
    }
    if let Some(role) = non_blank(data.attribute("role")) {
        return format!("{role} ({tag}, {dims})");
    }
    if let Some(class) = data.class_name().split_whitespace().next() {
        return format!(".{class} ({tag}, {dims})");
    }
    format!("{tag} ({dims})")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Element;
    use tether_core::Size;

    #[test]
    fn test_id_uses_nth_of_type_path() {
        let mut doc = Document::new(Size::new(800.0, 600.0));
        let body = doc.body();
        doc.append(body, Element::new("div"));
        doc.append(body, Element::new("p"));
        let second_div = doc.append(
            body,
            Element::new("div").child(Element::new("ul")).child(Element::new("ul")),
        );
        let second_ul = doc.get(second_div).unwrap().children()[1];

        assert_eq!(
            element_target_id(&doc, second_ul, DEFAULT_MAX_ID_DEPTH),
            "body>div:nth-of-type(2)>ul:nth-of-type(2)"
        );
    }

    #[test]
    fn test_id_short_circuits_on_element_id() {
        let mut doc = Document::new(Size::new(800.0, 600.0));
        let body = doc.body();
        let app = doc.append(
            body,
            Element::new("main")
                .id("app")
                .child(Element::new("section").child(Element::new("div"))),
        );
        let section = doc.get(app).unwrap().children()[0];
        let inner = doc.get(section).unwrap().children()[0];

        assert_eq!(
            element_target_id(&doc, inner, DEFAULT_MAX_ID_DEPTH),
            "body>main#app>section:nth-of-type(1)>div:nth-of-type(1)"
        );
        assert_eq!(element_target_id(&doc, app, DEFAULT_MAX_ID_DEPTH), "body>main#app");
    }

    #[test]
    fn test_id_depth_limit() {
        let mut doc = Document::new(Size::new(800.0, 600.0));
        let body = doc.body();
        let mut element = Element::new("span");
        for _ in 0..4 {
            element = Element::new("div").child(element);
        }
        let mut node = doc.append(body, element);
        while let Some(child) = doc.get(node).unwrap().children().first().copied() {
            node = child;
        }

        assert_eq!(
            element_target_id(&doc, node, 2),
            "body>div:nth-of-type(1)>span:nth-of-type(1)"
        );
    }

    #[test]
    fn test_label_priority() {
        let mut doc = Document::new(Size::new(800.0, 600.0));
        let body = doc.body();
        let make = |e: Element| e.size(320.4, 199.6);

        let aria = doc.append(body, make(Element::new("div").aria_label("Messages").id("m")));
        let id = doc.append(body, make(Element::new("div").id("feed").role("list")));
        let role = doc.append(body, make(Element::new("div").role("log").class("x")));
        let class = doc.append(body, make(Element::new("div").class("  pane  wide ")));
        let bare = doc.append(body, make(Element::new("aside")));

        assert_eq!(element_target_label(&doc, aria), "Messages (div, 320x200)");
        assert_eq!(element_target_label(&doc, id), "#feed (div, 320x200)");
        assert_eq!(element_target_label(&doc, role), "log (div, 320x200)");
        assert_eq!(element_target_label(&doc, class), ".pane (div, 320x200)");
        assert_eq!(element_target_label(&doc, bare), "aside (320x200)");
    }
}
