use quick_xml::Reader;
use quick_xml::events::Event;

/// One RSS `<item>` or Atom `<entry>`.
#[derive(Debug, Clone, Default)]
pub struct FeedEntry {
    pub title: String,
    pub link: String,
    pub description: String,
    pub published: String,
    pub categories: Vec<String>,
}

/// Lenient RSS/Atom parse. Malformed feeds yield the entries seen so far
/// rather than an error; feeds are third-party and frequently sloppy.
pub fn parse_feed(xml: &str) -> Vec<FeedEntry> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut entries: Vec<FeedEntry> = Vec::new();
    let mut current: Option<FeedEntry> = None;
    let mut path: Vec<String> = Vec::new();

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                let name = String::from_utf8_lossy(e.local_name().as_ref()).to_string();
                if name == "item" || name == "entry" {
                    current = Some(FeedEntry::default());
                } else if let Some(entry) = current.as_mut() {
                    // Atom carries the link/category payload in attributes.
                    if name == "link" {
                        for attr in e.attributes().flatten() {
                            if attr.key.as_ref() == b"href" {
                                entry.link =
                                    attr.unescape_value().unwrap_or_default().to_string();
                            }
                        }
                    } else if name == "category" {
                        for attr in e.attributes().flatten() {
                            if attr.key.as_ref() == b"term" {
                                let term =
                                    attr.unescape_value().unwrap_or_default().to_string();
                                if !term.is_empty() {
                                    entry.categories.push(term);
                                }
                            }
                        }
                    }
                }
                path.push(name);
            }
            Ok(Event::Empty(e)) => {
                let name = String::from_utf8_lossy(e.local_name().as_ref()).to_string();
                if let Some(entry) = current.as_mut() {
                    if name == "link" {
                        for attr in e.attributes().flatten() {
                            if attr.key.as_ref() == b"href" {
                                entry.link =
                                    attr.unescape_value().unwrap_or_default().to_string();
                            }
                        }
                    }
                }
            }
            Ok(Event::Text(t)) => {
                let text = t.decode().unwrap_or_default().into_owned();
                append_field(current.as_mut(), path.last(), &text);
            }
            Ok(Event::CData(t)) => {
                let text = String::from_utf8_lossy(&t.into_inner()).to_string();
                append_field(current.as_mut(), path.last(), &text);
            }
            Ok(Event::End(e)) => {
                let name = String::from_utf8_lossy(e.local_name().as_ref()).to_string();
                if (name == "item" || name == "entry") && current.is_some() {
                    entries.push(current.take().unwrap());
                }
                path.pop();
            }
            Ok(Event::Eof) => break,
            Err(_) => break,
            _ => {}
        }
    }

    entries
}

fn append_field(current: Option<&mut FeedEntry>, tag: Option<&String>, text: &str) {
    let (Some(entry), Some(tag)) = (current, tag) else {
        return;
    };
    match tag.as_str() {
        "title" => entry.title.push_str(text),
        "link" => entry.link.push_str(text),
        "description" | "summary" | "content" | "encoded" => entry.description.push_str(text),
        "pubDate" | "published" | "updated" | "date" => entry.published.push_str(text),
        "category" => {
            if !text.is_empty() {
                entry.categories.push(text.to_string());
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn parses_rss_items() {
        let xml = r#"<?xml version="1.0"?>
            <rss><channel>
              <title>Feed Title</title>
              <item>
                <title>Acme: Rust Engineer</title>
                <link>https://example.com/1</link>
                <description><![CDATA[<p>Great job</p>]]></description>
                <pubDate>Mon, 06 Jan 2025 10:00:00 +0000</pubDate>
                <category>rust</category>
                <category>backend</category>
              </item>
              <item>
                <title>Other Co: Designer</title>
                <link>https://example.com/2</link>
              </item>
            </channel></rss>"#;

        let entries = parse_feed(xml);
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].title, "Acme: Rust Engineer");
        assert_eq!(entries[0].link, "https://example.com/1");
        assert_eq!(entries[0].description, "<p>Great job</p>");
        assert_eq!(entries[0].categories, vec!["rust", "backend"]);
        // Channel title did not leak into entries.
        assert_eq!(entries[1].title, "Other Co: Designer");
    }

    #[test]
    fn parses_atom_entries_with_link_href() {
        let xml = r#"<feed xmlns="http://www.w3.org/2005/Atom">
              <title>Atom Feed</title>
              <entry>
                <title>DevOps Lead</title>
                <link href="https://example.com/3"/>
                <summary>infra role</summary>
                <published>2025-02-01T00:00:00Z</published>
              </entry>
            </feed>"#;

        let entries = parse_feed(xml);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].link, "https://example.com/3");
        assert_eq!(entries[0].description, "infra role");
        assert_eq!(entries[0].published, "2025-02-01T00:00:00Z");
    }

    #[test]
    fn malformed_feed_returns_partial_entries() {
        let xml = "<rss><channel><item><title>One</title></item><item><title>Two";
        let entries = parse_feed(xml);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].title, "One");
    }
}
