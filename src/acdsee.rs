//! ACDSee category lists.
//!
//! ACDSee stores its tag tree as a small XML document in `Xmp.acdsee.categories`:
//!
//! ```text
//! <Categories><Category Assigned="0">People<Category Assigned="1">Alice</Category></Category></Categories>
//! ```
//!
//! Each `Category` element is a tree node; `Assigned="1"` marks the nodes
//! actually applied to the image. Reading yields one `/`-joined path per
//! assigned node.

use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use std::fmt::Write as _;

const CATEGORY: &[u8] = b"Category";

fn escape(name: &str) -> String {
    name.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

/// A `<Category>` element whose name is still being read.
struct OpenCategory {
    name: String,
    assigned: bool,
    emitted: bool,
}

fn is_assigned(element: &BytesStart<'_>) -> Result<bool, String> {
    let attr = element
        .try_get_attribute("Assigned")
        .map_err(|e| format!("bad Category attribute: {e}"))?;
    let Some(attr) = attr else {
        return Ok(false);
    };
    let value = attr
        .unescape_value()
        .map_err(|e| format!("bad Assigned value: {e}"))?;
    Ok(value.trim() == "1")
}

/// Record the path of the innermost category once its name is complete.
fn emit(stack: &mut [OpenCategory], paths: &mut Vec<String>) {
    let Some(top) = stack.last_mut() else {
        return;
    };
    if top.emitted {
        return;
    }
    top.emitted = true;
    if top.assigned && !top.name.is_empty() {
        let names: Vec<&str> = stack.iter().map(|c| c.name.as_str()).collect();
        paths.push(names.join("/"));
    }
}

/// Tag paths assigned in an ACDSee category document.
pub fn parse_categories(xml: &str) -> Result<Vec<String>, String> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut stack: Vec<OpenCategory> = Vec::new();
    let mut paths = Vec::new();

    loop {
        let event = reader
            .read_event()
            .map_err(|e| format!("malformed XML at byte {}: {e}", reader.buffer_position()))?;
        match event {
            Event::Start(e) if e.local_name().as_ref() == CATEGORY => {
                emit(&mut stack, &mut paths);
                stack.push(OpenCategory {
                    name: String::new(),
                    assigned: is_assigned(&e)?,
                    emitted: false,
                });
            }
            // A self-closing category has no name and no children
            Event::Empty(e) if e.local_name().as_ref() == CATEGORY => {
                is_assigned(&e)?;
            }
            Event::Text(text) => {
                let text = text
                    .unescape()
                    .map_err(|e| format!("bad category text: {e}"))?;
                let Some(top) = stack.last_mut() else {
                    return Err(format!("unexpected text '{}'", text.trim()));
                };
                // Text after a child category is not part of the name
                if !top.emitted {
                    // Slashes inside a node name would read as extra path levels
                    top.name.push_str(&text.trim().replace('/', "\\"));
                }
            }
            Event::End(e) if e.local_name().as_ref() == CATEGORY => {
                emit(&mut stack, &mut paths);
                stack.pop().ok_or("unbalanced </Category>")?;
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if !stack.is_empty() {
        return Err(format!("{} unclosed <Category> element(s)", stack.len()));
    }
    Ok(paths)
}

#[derive(Default)]
struct Node {
    name: String,
    assigned: bool,
    children: Vec<Node>,
}

impl Node {
    fn child(&mut self, name: &str) -> &mut Node {
        let at = match self.children.iter().position(|c| c.name == name) {
            Some(at) => at,
            None => {
                self.children.push(Node {
                    name: name.to_string(),
                    ..Node::default()
                });
                self.children.len() - 1
            }
        };
        &mut self.children[at]
    }

    fn render(&self, out: &mut String) {
        let _ = write!(
            out,
            "<Category Assigned=\"{}\">{}",
            u8::from(self.assigned),
            escape(&self.name)
        );
        for child in &self.children {
            child.render(out);
        }
        out.push_str("</Category>");
    }
}

/// ACDSee category document for `/`-separated tag paths.
///
/// Returns an empty string for an empty list.
pub fn build_categories(paths: &[String]) -> String {
    let mut root = Node::default();
    for path in paths {
        let mut node = &mut root;
        let mut depth = 0;
        for part in path.split('/').filter(|p| !p.is_empty()) {
            node = node.child(part);
            depth += 1;
        }
        if depth > 0 {
            node.assigned = true;
        }
    }
    if root.children.is_empty() {
        return String::new();
    }

    let mut out = String::from("<Categories>");
    for child in &root.children {
        child.render(&mut out);
    }
    out.push_str("</Categories>");
    out
}
