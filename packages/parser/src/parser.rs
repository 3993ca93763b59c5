use crate::ast::{Attributes, Document, NodeId, Tag};
use crate::error::ParseResult;
use crate::tokenizer::{tokenize, HtmlToken};

/// Elements whose entire subtree is discarded.
const DROPPED: &[&str] = &["style", "script", "head", "title", "template"];

/// Void-ish elements outside the grammar that are discarded without a frame.
const IGNORED: &[&str] = &["meta", "link", "base", "hr", "input", "col", "source", "wbr"];

#[derive(Debug)]
enum Frame {
    /// An element of the grammar; children attach here.
    Node(NodeId),
    /// An element outside the grammar; children attach to the nearest
    /// enclosing node as if the wrapper were not there.
    Transparent { convert_spaces: bool },
    /// Subtree being discarded.
    Dropped,
}

/// Lenient tree builder mapping arbitrary HTML onto the constrained grammar.
///
/// Unknown elements are transparent (children promoted), dropped elements
/// (`style`, `script`, ...) disappear with their content, mismatched end tags
/// close intervening frames, and unclosed frames are closed at end of input.
pub struct Parser<'src> {
    source: &'src str,
    doc: Document,
    stack: Vec<(String, Frame)>,
}

impl<'src> Parser<'src> {
    pub fn new(source: &'src str) -> Self {
        Self {
            source,
            doc: Document::new(),
            stack: Vec::new(),
        }
    }

    pub fn parse_document(mut self) -> ParseResult<Document> {
        let tokens = tokenize(self.source)?;
        for token in tokens {
            match token {
                HtmlToken::Text(text) => self.handle_text(text),
                HtmlToken::StartTag {
                    name,
                    attrs,
                    self_closing,
                } => self.handle_start(&name, attrs, self_closing),
                HtmlToken::EndTag { name } => self.handle_end(&name),
            }
        }
        Ok(self.doc)
    }

    fn dropped(&self) -> bool {
        self.stack
            .iter()
            .any(|(_, frame)| matches!(frame, Frame::Dropped))
    }

    fn current_parent(&self) -> NodeId {
        for (_, frame) in self.stack.iter().rev() {
            if let Frame::Node(id) = frame {
                return *id;
            }
        }
        self.doc.root()
    }

    fn handle_text(&mut self, mut text: String) {
        if self.dropped() {
            return;
        }
        let parent = self.current_parent();
        // Whitespace between structural containers is formatting noise, not
        // content.
        let structural = self.doc.parent(parent).is_none()
            || matches!(
                self.doc.tag(parent),
                Some(Tag::Ol | Tag::Ul | Tag::Table | Tag::Tr)
            );
        if structural && text.chars().all(char::is_whitespace) {
            return;
        }
        if let Some((_, Frame::Transparent { convert_spaces })) = self.stack.last() {
            if *convert_spaces {
                text = text.replace(' ', "\u{A0}");
            }
        }
        // Merge with a preceding text sibling so runs stay canonical.
        if let Some(&last) = self.doc.children(parent).last() {
            if let Some(existing) = self.doc.text_mut(last) {
                existing.push_str(&text);
                return;
            }
        }
        let node = self.doc.create_text(text);
        self.doc.append(parent, node);
    }

    fn handle_start(&mut self, name: &str, attrs: Vec<(String, String)>, self_closing: bool) {
        if self.dropped() {
            if DROPPED.contains(&name) && !self_closing {
                self.stack.push((name.to_string(), Frame::Dropped));
            }
            return;
        }
        if IGNORED.contains(&name) {
            return;
        }
        if DROPPED.contains(&name) {
            if !self_closing {
                self.stack.push((name.to_string(), Frame::Dropped));
            }
            return;
        }

        match Tag::from_name(name) {
            Some(tag) => {
                let element = self
                    .doc
                    .create_element_with(tag, retained_attributes(&attrs));
                let parent = self.current_parent();
                self.doc.append(parent, element);
                if !tag.is_void() && !self_closing {
                    self.stack.push((name.to_string(), Frame::Node(element)));
                }
            }
            None => {
                if !self_closing {
                    // WebKit marks spaces it converted at run boundaries; those
                    // must survive as non-breaking.
                    let convert_spaces = attrs
                        .iter()
                        .any(|(k, v)| k == "class" && v.contains("Apple-converted-space"));
                    self.stack
                        .push((name.to_string(), Frame::Transparent { convert_spaces }));
                }
            }
        }
    }

    fn handle_end(&mut self, name: &str) {
        // Close the nearest matching frame, implicitly closing anything opened
        // inside it. Unmatched end tags are ignored.
        let position = self.stack.iter().rposition(|(open, _)| open == name);
        if let Some(position) = position {
            self.stack.truncate(position);
        }
    }
}

fn retained_attributes(attrs: &[(String, String)]) -> Attributes {
    let mut out = Attributes::new();
    for (key, value) in attrs {
        match key.as_str() {
            "id" => out.id = Some(value.clone()),
            "href" => out.href = Some(value.clone()),
            "src" => out.src = Some(value.clone()),
            "alt" => out.alt = Some(value.clone()),
            _ => {}
        }
    }
    out
}

/// Parse an HTML fragment into a document tree.
pub fn parse(source: &str) -> ParseResult<Document> {
    Parser::new(source).parse_document()
}
