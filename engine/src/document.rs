use html5ever::driver::{parse_document, ParseOpts};
use html5ever::tendril::TendrilSink;
use html5ever::tree_builder::TreeBuilderOpts;
use scraper::{node::Node, ElementRef, Html};

/// Attributes whose value is a whitespace-separated token list; a lookup
/// matches either the whole value or any single token.
const MULTI_VALUED_ATTRIBUTES: &[&str] = &[
    "class",
    "rel",
    "rev",
    "accept-charset",
    "headers",
    "accesskey",
    "dropzone",
];

const NON_VISIBLE_TEXT_PARENTS: &[&str] = &["script", "style", "template"];

/// Parsed HTML page with the lookups feature extraction needs. Parsing never
/// fails; broken markup yields whatever tree the parser recovers, and an empty
/// body yields an empty document.
pub struct Document {
    html: Html,
}

impl Document {
    /// Parses with scripting disabled, so `<noscript>` content is markup.
    pub fn parse(source: &str) -> Self {
        let opts = ParseOpts {
            tree_builder: TreeBuilderOpts {
                scripting_enabled: false,
                ..Default::default()
            },
            ..Default::default()
        };
        Self {
            html: parse_document(Html::new_document(), opts).one(source),
        }
    }

    /// Every element with this tag name, in document order.
    pub fn find_all(&self, tag: &str) -> Vec<ElementRef<'_>> {
        self.html
            .root_element()
            .descendants()
            .filter_map(ElementRef::wrap)
            .filter(|el| el.value().name() == tag)
            .collect()
    }

    pub fn count(&self, tag: &str) -> usize {
        self.find_all(tag).len()
    }

    pub fn find(&self, tag: &str) -> Option<ElementRef<'_>> {
        self.find_all(tag).into_iter().next()
    }

    /// First `tag` element whose `attr` matches `value` (case-sensitive).
    pub fn find_with_attr(&self, tag: &str, attr: &str, value: &str) -> Option<ElementRef<'_>> {
        self.find_with_attr_any(tag, attr, &[value])
    }

    pub fn find_with_attr_any(
        &self,
        tag: &str,
        attr: &str,
        values: &[&str],
    ) -> Option<ElementRef<'_>> {
        self.find_all(tag).into_iter().find(|el| {
            el.value()
                .attr(attr)
                .map(|actual| values.iter().any(|v| attr_matches(attr, actual, v)))
                .unwrap_or(false)
        })
    }

    pub fn has(&self, tag: &str, attr: &str, value: &str) -> bool {
        self.find_with_attr(tag, attr, value).is_some()
    }

    /// Values of `attr` on every `tag` element that carries it.
    pub fn attr_values(&self, tag: &str, attr: &str) -> Vec<&str> {
        self.find_all(tag)
            .into_iter()
            .filter_map(|el| el.value().attr(attr))
            .collect()
    }

    /// Text of all text nodes outside `script`, `style` and `template`.
    pub fn visible_text(&self) -> String {
        let mut text = String::new();
        for node in self.html.tree.root().descendants() {
            let Node::Text(chunk) = node.value() else {
                continue;
            };
            let hidden = node
                .parent()
                .and_then(|parent| parent.value().as_element().map(|el| el.name().to_string()))
                .map(|name| NON_VISIBLE_TEXT_PARENTS.contains(&name.as_str()))
                .unwrap_or(false);
            if !hidden {
                text.push_str(chunk);
            }
        }
        text
    }
}

pub fn attr_or_default<'a>(el: &ElementRef<'a>, attr: &str) -> &'a str {
    el.value().attr(attr).unwrap_or_default()
}

/// The element's text when its only child is a text node, else `None`.
pub fn sole_text(el: &ElementRef<'_>) -> Option<String> {
    let mut children = el.children();
    let first = children.next()?;
    if children.next().is_some() {
        return None;
    }
    match first.value() {
        Node::Text(text) => Some(String::from(&**text)),
        _ => None,
    }
}

fn attr_matches(attr: &str, actual: &str, wanted: &str) -> bool {
    if actual == wanted {
        return true;
    }
    MULTI_VALUED_ATTRIBUTES.contains(&attr) && actual.split_whitespace().any(|token| token == wanted)
}
