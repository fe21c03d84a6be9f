use once_cell::sync::Lazy;
use regex::Regex;
use ego_tree::NodeRef;
use scraper::{Html, Node};

/// Elements removed together with their entire subtree.
const REMOVE_TAGS: [&str; 12] = [
    "script", "style", "iframe", "form", "input", "button", "textarea", "select", "object",
    "embed", "applet", "noscript",
];

/// HTML void elements (no closing tag on serialisation).
const VOID_TAGS: [&str; 14] = [
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param",
    "source", "track", "wbr",
];

static TAG_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]+>").unwrap());

/// Sanitise vendor HTML for embedding in a job detail view.
///
/// Keeps safe structural tags, removes dangerous elements and comments, strips
/// all attributes except `href` on `a` and `src`/`alt` on `img`, and forces
/// links to open in a new tab with `rel="noopener noreferrer"`.
pub fn sanitize_html(html: &str) -> String {
    if html.trim().is_empty() {
        return String::new();
    }

    let fragment = Html::parse_fragment(html);
    let mut out = String::new();
    for child in fragment.tree.root().children() {
        write_node(child, &mut out);
    }
    let result = out.trim().to_string();
    if result.is_empty() {
        // Lenient parse produced nothing usable: strip tags with a regex.
        return TAG_RE.replace_all(html, " ").trim().to_string();
    }
    result
}

fn write_node(node: NodeRef<'_, Node>, out: &mut String) {
    match node.value() {
        Node::Text(text) => out.push_str(&escape_text(&text)),
        Node::Element(element) => {
            let name = element.name();
            if REMOVE_TAGS.contains(&name) {
                return;
            }
            // `html` is the synthetic fragment root; descend without emitting it.
            if name == "html" {
                for child in node.children() {
                    write_node(child, out);
                }
                return;
            }

            out.push('<');
            out.push_str(name);

            let mut kept_href = false;
            for (attr_name, value) in element.attrs() {
                let keep = match name {
                    "a" => attr_name == "href",
                    "img" => attr_name == "src" || attr_name == "alt",
                    _ => false,
                };
                if keep {
                    if name == "a" && attr_name == "href" {
                        kept_href = true;
                    }
                    out.push_str(&format!(" {}=\"{}\"", attr_name, escape_attr(value)));
                }
            }
            if kept_href {
                out.push_str(" target=\"_blank\" rel=\"noopener noreferrer\"");
            }

            if VOID_TAGS.contains(&name) {
                out.push_str("/>");
                return;
            }
            out.push('>');
            for child in node.children() {
                write_node(child, out);
            }
            out.push_str(&format!("</{}>", name));
        }
        // Comments, doctypes and processing instructions are dropped.
        _ => {}
    }
}

fn escape_text(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

fn escape_attr(value: &str) -> String {
    escape_text(value).replace('"', "&quot;")
}

/// Strip ALL tags, returning text content joined by single spaces.
pub fn strip_html(html: &str) -> String {
    if html.trim().is_empty() {
        return String::new();
    }
    let fragment = Html::parse_fragment(html);
    let text: Vec<String> = fragment
        .root_element()
        .text()
        .map(|t| t.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|t| !t.is_empty())
        .collect();
    if text.is_empty() && !html.trim().is_empty() {
        return TAG_RE.replace_all(html, " ").trim().to_string();
    }
    text.join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn removes_dangerous_elements_and_their_subtrees() {
        let html = "<p>keep</p><script>alert(1)</script><form><input></form>";
        let clean = sanitize_html(html);
        assert!(clean.contains("<p>keep</p>"));
        assert!(!clean.contains("script"));
        assert!(!clean.contains("alert"));
        assert!(!clean.contains("input"));
    }

    #[test]
    fn strips_comments() {
        let clean = sanitize_html("<p>a</p><!-- secret --><p>b</p>");
        assert!(!clean.contains("secret"));
        assert!(clean.contains("<p>a</p>"));
    }

    #[test]
    fn strips_disallowed_attributes() {
        let clean = sanitize_html(r#"<p class="x" onclick="evil()">text</p>"#);
        assert_eq!(clean, "<p>text</p>");
    }

    #[test]
    fn keeps_href_and_forces_new_tab() {
        let clean = sanitize_html(r#"<a href="https://x/y" class="z">link</a>"#);
        assert!(clean.contains(r#"href="https://x/y""#));
        assert!(clean.contains(r#"target="_blank""#));
        assert!(clean.contains(r#"rel="noopener noreferrer""#));
        assert!(!clean.contains("class"));
    }

    #[test]
    fn anchor_without_href_is_not_rewritten() {
        let clean = sanitize_html("<a>plain</a>");
        assert_eq!(clean, "<a>plain</a>");
    }

    #[test]
    fn keeps_img_src_and_alt() {
        let clean = sanitize_html(r#"<img src="/logo.png" alt="logo" width="40">"#);
        assert!(clean.contains(r#"src="/logo.png""#));
        assert!(clean.contains(r#"alt="logo""#));
        assert!(!clean.contains("width"));
    }

    #[test]
    fn plain_text_passes_through() {
        assert_eq!(sanitize_html("just words"), "just words");
        assert_eq!(sanitize_html(""), "");
    }

    #[test]
    fn strip_html_joins_text_with_spaces() {
        let text = strip_html("<div><h1>Title</h1><p>Body   text</p></div>");
        assert_eq!(text, "Title Body text");
    }

    #[test]
    fn strip_html_of_empty_is_empty() {
        assert_eq!(strip_html("   "), "");
    }
}
