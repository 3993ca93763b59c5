use serde::{Deserialize, Serialize};

/// Handle into the document arena.
///
/// Node identity is the arena index; detached nodes keep their slot but become
/// unreachable from the root. All cross-references (parents, selection anchors)
/// are `NodeId`s, never owning pointers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NodeId(u32);

impl NodeId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// The closed element vocabulary of the document grammar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tag {
    P,
    H1,
    H2,
    H3,
    H4,
    H5,
    H6,
    B,
    I,
    U,
    Del,
    Sub,
    Sup,
    Code,
    A,
    Img,
    Table,
    Tr,
    Td,
    Ol,
    Ul,
    Li,
    Blockquote,
    Br,
}

impl Tag {
    pub fn as_str(self) -> &'static str {
        match self {
            Tag::P => "p",
            Tag::H1 => "h1",
            Tag::H2 => "h2",
            Tag::H3 => "h3",
            Tag::H4 => "h4",
            Tag::H5 => "h5",
            Tag::H6 => "h6",
            Tag::B => "b",
            Tag::I => "i",
            Tag::U => "u",
            Tag::Del => "del",
            Tag::Sub => "sub",
            Tag::Sup => "sup",
            Tag::Code => "code",
            Tag::A => "a",
            Tag::Img => "img",
            Tag::Table => "table",
            Tag::Tr => "tr",
            Tag::Td => "td",
            Tag::Ol => "ol",
            Tag::Ul => "ul",
            Tag::Li => "li",
            Tag::Blockquote => "blockquote",
            Tag::Br => "br",
        }
    }

    /// Canonical tag for a source tag name (already lowercased).
    ///
    /// Source aliases collapse onto the grammar: `strong` is `b`, `em` is `i`,
    /// `s`/`strike` are `del`. Names with no mapping return `None` and are
    /// treated as transparent wrappers by the parser.
    pub fn from_name(name: &str) -> Option<Tag> {
        let tag = match name {
            "p" => Tag::P,
            "h1" => Tag::H1,
            "h2" => Tag::H2,
            "h3" => Tag::H3,
            "h4" => Tag::H4,
            "h5" => Tag::H5,
            "h6" => Tag::H6,
            "b" | "strong" => Tag::B,
            "i" | "em" => Tag::I,
            "u" => Tag::U,
            "del" | "s" | "strike" => Tag::Del,
            "sub" => Tag::Sub,
            "sup" => Tag::Sup,
            "code" => Tag::Code,
            "a" => Tag::A,
            "img" => Tag::Img,
            "table" => Tag::Table,
            "tr" => Tag::Tr,
            "td" | "th" => Tag::Td,
            "ol" => Tag::Ol,
            "ul" => Tag::Ul,
            "li" => Tag::Li,
            "blockquote" => Tag::Blockquote,
            "br" => Tag::Br,
            _ => return None,
        };
        Some(tag)
    }

    /// Paragraph or heading: the tags `replaceStyle` cycles between.
    pub fn is_style(self) -> bool {
        matches!(
            self,
            Tag::P | Tag::H1 | Tag::H2 | Tag::H3 | Tag::H4 | Tag::H5 | Tag::H6
        )
    }

    /// Structural container that holds inline content or nested blocks.
    pub fn is_block(self) -> bool {
        self.is_style()
            || matches!(
                self,
                Tag::Li | Tag::Blockquote | Tag::Td | Tag::Ol | Tag::Ul | Tag::Table | Tag::Tr
            )
    }

    /// Inline formatting wrapper (bold, italic, ...).
    pub fn is_format(self) -> bool {
        matches!(
            self,
            Tag::B | Tag::I | Tag::U | Tag::Del | Tag::Sub | Tag::Sup | Tag::Code
        )
    }

    pub fn is_list(self) -> bool {
        matches!(self, Tag::Ol | Tag::Ul)
    }

    /// Void elements serialize without a closing tag and hold no children.
    pub fn is_void(self) -> bool {
        matches!(self, Tag::Br | Tag::Img)
    }
}

/// The bounded attribute set retained by the grammar.
///
/// Everything else (style, class, data-*, presentation attributes) is stripped
/// on the way in. Serialization order is fixed so round-trips are
/// byte-identical.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attributes {
    pub id: Option<String>,
    pub href: Option<String>,
    pub src: Option<String>,
    pub alt: Option<String>,
}

impl Attributes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_id(id: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.id.is_none() && self.href.is_none() && self.src.is_none() && self.alt.is_none()
    }
}

/// Node payload: the tagged variant over node kinds.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeData {
    /// Synthetic document root; never serialized as a tag.
    Root { children: Vec<NodeId> },

    Element {
        tag: Tag,
        attrs: Attributes,
        children: Vec<NodeId>,
    },

    Text(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub parent: Option<NodeId>,
    pub data: NodeData,
}

/// The document: an arena of nodes reachable from a synthetic root.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    nodes: Vec<Node>,
    root: NodeId,
}

impl Document {
    pub fn new() -> Self {
        let root = Node {
            parent: None,
            data: NodeData::Root {
                children: Vec::new(),
            },
        };
        Self {
            nodes: vec![root],
            root: NodeId(0),
        }
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.index()]
    }

    pub fn node_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.index()]
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).parent
    }

    pub fn tag(&self, id: NodeId) -> Option<Tag> {
        match &self.node(id).data {
            NodeData::Element { tag, .. } => Some(*tag),
            _ => None,
        }
    }

    pub fn attrs(&self, id: NodeId) -> Option<&Attributes> {
        match &self.node(id).data {
            NodeData::Element { attrs, .. } => Some(attrs),
            _ => None,
        }
    }

    pub fn attrs_mut(&mut self, id: NodeId) -> Option<&mut Attributes> {
        match &mut self.node_mut(id).data {
            NodeData::Element { attrs, .. } => Some(attrs),
            _ => None,
        }
    }

    pub fn text(&self, id: NodeId) -> Option<&str> {
        match &self.node(id).data {
            NodeData::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn text_mut(&mut self, id: NodeId) -> Option<&mut String> {
        match &mut self.node_mut(id).data {
            NodeData::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn is_text(&self, id: NodeId) -> bool {
        matches!(self.node(id).data, NodeData::Text(_))
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        match &self.node(id).data {
            NodeData::Root { children } => children,
            NodeData::Element { children, .. } => children,
            NodeData::Text(_) => &[],
        }
    }

    pub fn children_mut(&mut self, id: NodeId) -> Option<&mut Vec<NodeId>> {
        match &mut self.node_mut(id).data {
            NodeData::Root { children } => Some(children),
            NodeData::Element { children, .. } => Some(children),
            NodeData::Text(_) => None,
        }
    }

    pub fn create_text(&mut self, content: impl Into<String>) -> NodeId {
        self.alloc(NodeData::Text(content.into()))
    }

    pub fn create_element(&mut self, tag: Tag) -> NodeId {
        self.create_element_with(tag, Attributes::new())
    }

    pub fn create_element_with(&mut self, tag: Tag, attrs: Attributes) -> NodeId {
        self.alloc(NodeData::Element {
            tag,
            attrs,
            children: Vec::new(),
        })
    }

    fn alloc(&mut self, data: NodeData) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(Node { parent: None, data });
        id
    }

    /// Append `child` to `parent`, detaching it from any previous parent.
    pub fn append(&mut self, parent: NodeId, child: NodeId) {
        let count = self.children(parent).len();
        self.insert(parent, count, child);
    }

    /// Insert `child` into `parent` at `index` (clamped to the child count).
    pub fn insert(&mut self, parent: NodeId, index: usize, child: NodeId) {
        self.detach(child);
        let inserted = match self.children_mut(parent) {
            Some(children) => {
                let index = index.min(children.len());
                children.insert(index, child);
                true
            }
            None => false,
        };
        if inserted {
            self.node_mut(child).parent = Some(parent);
        }
    }

    pub fn insert_before(&mut self, sibling: NodeId, node: NodeId) {
        if let Some(parent) = self.parent(sibling) {
            if let Some(index) = self.index_of(sibling) {
                self.insert(parent, index, node);
            }
        }
    }

    pub fn insert_after(&mut self, sibling: NodeId, node: NodeId) {
        if let Some(parent) = self.parent(sibling) {
            if let Some(index) = self.index_of(sibling) {
                self.insert(parent, index + 1, node);
            }
        }
    }

    /// Remove `id` from its parent's child list. The node keeps its arena slot
    /// but is no longer reachable from the root.
    pub fn detach(&mut self, id: NodeId) {
        let Some(parent) = self.node(id).parent else {
            return;
        };
        if let Some(children) = self.children_mut(parent) {
            children.retain(|&c| c != id);
        }
        self.node_mut(id).parent = None;
    }

    /// Index of `id` within its parent's children.
    pub fn index_of(&self, id: NodeId) -> Option<usize> {
        let parent = self.parent(id)?;
        self.children(parent).iter().position(|&c| c == id)
    }

    pub fn prev_sibling(&self, id: NodeId) -> Option<NodeId> {
        let parent = self.parent(id)?;
        let index = self.index_of(id)?;
        if index == 0 {
            None
        } else {
            Some(self.children(parent)[index - 1])
        }
    }

    pub fn next_sibling(&self, id: NodeId) -> Option<NodeId> {
        let parent = self.parent(id)?;
        let index = self.index_of(id)?;
        self.children(parent).get(index + 1).copied()
    }

    /// True while `id` is reachable from the root.
    pub fn is_attached(&self, id: NodeId) -> bool {
        let mut current = id;
        loop {
            if current == self.root {
                return true;
            }
            match self.parent(current) {
                Some(parent) => current = parent,
                None => return false,
            }
        }
    }

    /// Ancestors of `id`, nearest first, excluding `id` itself.
    pub fn ancestors(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut current = id;
        while let Some(parent) = self.parent(current) {
            out.push(parent);
            current = parent;
        }
        out
    }

    /// Pre-order traversal of the subtree rooted at `id`, including `id`.
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            out.push(current);
            for &child in self.children(current).iter().rev() {
                stack.push(child);
            }
        }
        out
    }

    /// Look an element up by its `id` attribute.
    pub fn element_by_id(&self, id_attr: &str) -> Option<NodeId> {
        self.descendants(self.root).into_iter().find(|&n| {
            self.attrs(n)
                .and_then(|a| a.id.as_deref())
                .map(|a| a == id_attr)
                .unwrap_or(false)
        })
    }

    /// Addressable length: characters for text nodes, child count for elements.
    pub fn len_of(&self, id: NodeId) -> usize {
        match &self.node(id).data {
            NodeData::Text(s) => s.chars().count(),
            NodeData::Root { children } => children.len(),
            NodeData::Element { children, .. } => children.len(),
        }
    }

    pub fn first_text_descendant(&self, id: NodeId) -> Option<NodeId> {
        self.descendants(id).into_iter().find(|&n| self.is_text(n))
    }

    /// Child-index path from the root; lexicographic order is tree order.
    pub fn path(&self, id: NodeId) -> Vec<usize> {
        let mut out = Vec::new();
        let mut current = id;
        while self.parent(current).is_some() {
            if let Some(index) = self.index_of(current) {
                out.push(index);
            }
            current = match self.parent(current) {
                Some(parent) => parent,
                None => break,
            };
        }
        out.reverse();
        out
    }

    /// A block whose only content is a placeholder `<br>` (or nothing at all).
    pub fn is_empty_block(&self, id: NodeId) -> bool {
        let children = self.children(id);
        match children {
            [] => true,
            [only] => self.tag(*only) == Some(Tag::Br),
            _ => false,
        }
    }

    /// Concatenated text content of the subtree.
    pub fn text_content(&self, id: NodeId) -> String {
        let mut out = String::new();
        for n in self.descendants(id) {
            if let Some(s) = self.text(n) {
                out.push_str(s);
            }
        }
        out
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}
