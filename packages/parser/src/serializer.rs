use crate::ast::{Document, NodeData, NodeId};

/// Serialize the whole document to compact HTML.
///
/// Output is canonical: no indentation, attributes in a fixed order, text
/// entity-encoded. Parsing the result yields an equal tree.
pub fn serialize(doc: &Document) -> String {
    let mut out = String::new();
    for &child in doc.children(doc.root()) {
        serialize_node(doc, child, &mut out);
    }
    out
}

/// Serialize a single subtree.
pub fn serialize_node(doc: &Document, node: NodeId, out: &mut String) {
    match &doc.node(node).data {
        NodeData::Root { .. } => {
            for &child in doc.children(node) {
                serialize_node(doc, child, out);
            }
        }
        NodeData::Text(text) => encode_text(text, out),
        NodeData::Element { tag, attrs, children } => {
            out.push('<');
            out.push_str(tag.as_str());
            for (name, value) in [
                ("id", &attrs.id),
                ("href", &attrs.href),
                ("src", &attrs.src),
                ("alt", &attrs.alt),
            ] {
                if let Some(value) = value {
                    out.push(' ');
                    out.push_str(name);
                    out.push_str("=\"");
                    encode_attribute(value, out);
                    out.push('"');
                }
            }
            out.push('>');
            if tag.is_void() {
                return;
            }
            for &child in children {
                serialize_node(doc, child, out);
            }
            out.push_str("</");
            out.push_str(tag.as_str());
            out.push('>');
        }
    }
}

fn encode_text(text: &str, out: &mut String) {
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '\u{A0}' => out.push_str("&nbsp;"),
            other => out.push(other),
        }
    }
}

fn encode_attribute(value: &str, out: &mut String) {
    for ch in value.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            other => out.push(other),
        }
    }
}
