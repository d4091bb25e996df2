//! Small owned XML tree used to build transform output
//!
//! Parsing is done with `roxmltree` (read-only, borrowed); every pass builds
//! its result as an [`Element`] tree and serialises it with
//! [`Element::to_xml`]. Text is escaped on write, CDATA is written verbatim
//! and `Raw` nodes carry markup that is already well-formed.

/// A node in an owned XML tree
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Element(Element),
    Text(String),
    /// Emitted as a `<![CDATA[...]]>` section
    CData(String),
    /// Emitted as `<!--...-->`
    Comment(String),
    /// Pre-serialised, well-formed markup written as-is
    Raw(String),
}

impl From<Element> for Node {
    fn from(element: Element) -> Self {
        Node::Element(element)
    }
}

/// An element with ordered attributes and children
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Element {
    pub name: String,
    pub attrs: Vec<(String, String)>,
    pub children: Vec<Node>,
}

impl Element {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attrs: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Builder-style attribute setter
    pub fn attr(mut self, name: &str, value: impl Into<String>) -> Self {
        self.set_attr(name, value);
        self
    }

    pub fn set_attr(&mut self, name: &str, value: impl Into<String>) {
        let value = value.into();
        match self.attrs.iter_mut().find(|(k, _)| k == name) {
            Some(slot) => slot.1 = value,
            None => self.attrs.push((name.to_string(), value)),
        }
    }

    pub fn get_attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// Builder-style child append
    pub fn child(mut self, node: impl Into<Node>) -> Self {
        self.children.push(node.into());
        self
    }

    /// Builder-style append of several nodes
    pub fn with_children(mut self, nodes: impl IntoIterator<Item = Node>) -> Self {
        self.children.extend(nodes);
        self
    }

    /// Builder-style text append
    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.children.push(Node::Text(text.into()));
        self
    }

    pub fn push(&mut self, node: impl Into<Node>) {
        self.children.push(node.into());
    }

    pub fn push_text(&mut self, text: impl Into<String>) {
        self.children.push(Node::Text(text.into()));
    }

    /// Child elements, skipping text and other nodes
    pub fn elements(&self) -> impl Iterator<Item = &Element> {
        self.children.iter().filter_map(|n| match n {
            Node::Element(e) => Some(e),
            _ => None,
        })
    }

    /// First child element called `name`
    pub fn find(&self, name: &str) -> Option<&Element> {
        self.elements().find(|e| e.name == name)
    }

    /// Concatenated text of all descendants
    pub fn text_content(&self) -> String {
        let mut out = String::new();
        collect_text(&self.children, &mut out);
        out
    }

    /// True when there are no children besides whitespace-only text
    pub fn is_blank(&self) -> bool {
        self.children.iter().all(|n| match n {
            Node::Text(t) => t.trim().is_empty() && !t.contains('\u{a0}'),
            Node::Comment(_) => true,
            _ => false,
        })
    }

    /// Convert a parsed `roxmltree` element into an owned tree
    ///
    /// Namespace prefixes are dropped: elements and attributes keep their
    /// local names only. Comments and processing instructions are skipped.
    pub fn from_node(node: roxmltree::Node) -> Element {
        let mut element = Element::new(node.tag_name().name());
        for attr in node.attributes() {
            element
                .attrs
                .push((attr.name().to_string(), attr.value().to_string()));
        }
        for child in node.children() {
            if child.is_element() {
                element.push(Element::from_node(child));
            } else if child.is_text() {
                if let Some(text) = child.text() {
                    element.push_text(text);
                }
            }
        }
        element
    }

    pub fn write_to(&self, out: &mut String) {
        out.push('<');
        out.push_str(&self.name);
        for (k, v) in &self.attrs {
            out.push(' ');
            out.push_str(k);
            out.push_str("=\"");
            out.push_str(&escape_attr(v));
            out.push('"');
        }
        if self.children.is_empty() {
            out.push_str("/>");
            return;
        }
        out.push('>');
        write_nodes(&self.children, out);
        out.push_str("</");
        out.push_str(&self.name);
        out.push('>');
    }

    pub fn to_xml(&self) -> String {
        let mut out = String::new();
        self.write_to(&mut out);
        out
    }
}

fn collect_text(nodes: &[Node], out: &mut String) {
    for node in nodes {
        match node {
            Node::Element(e) => collect_text(&e.children, out),
            Node::Text(t) | Node::CData(t) => out.push_str(t),
            Node::Comment(_) | Node::Raw(_) => {}
        }
    }
}

/// Serialise a node list
pub fn write_nodes(nodes: &[Node], out: &mut String) {
    for node in nodes {
        match node {
            Node::Element(e) => e.write_to(out),
            Node::Text(t) => out.push_str(&escape_text(t)),
            Node::CData(t) => {
                out.push_str("<![CDATA[");
                // A literal terminator has to be split across two sections
                out.push_str(&t.replace("]]>", "]]]]><![CDATA[>"));
                out.push_str("]]>");
            }
            Node::Comment(t) => {
                out.push_str("<!--");
                out.push_str(t);
                out.push_str("-->");
            }
            Node::Raw(markup) => out.push_str(markup),
        }
    }
}

pub fn escape_text(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(c),
        }
    }
    out
}

pub fn escape_attr(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}

/// Parse a markup fragment (no single root required) into owned nodes
pub fn parse_fragment(markup: &str) -> Result<Vec<Node>, roxmltree::Error> {
    let wrapped = format!("<fragment>{markup}</fragment>");
    let doc = roxmltree::Document::parse(&wrapped)?;
    Ok(Element::from_node(doc.root_element()).children)
}

/// Whether a fragment parses as XML content
pub fn is_well_formed_fragment(markup: &str) -> bool {
    roxmltree::Document::parse(&format!("<fragment>{markup}</fragment>")).is_ok()
}

/// Remove a leading `<?xml ...?>` declaration and any `<!DOCTYPE ...>`
pub fn strip_declarations(xml: &str) -> &str {
    let mut rest = xml.trim_start_matches('\u{feff}').trim_start();
    loop {
        if rest.starts_with("<?xml") {
            match rest.find("?>") {
                Some(end) => rest = rest[end + 2..].trim_start(),
                None => return rest,
            }
        } else if rest.len() >= 9 && rest[..9].eq_ignore_ascii_case("<!DOCTYPE") {
            match rest.find('>') {
                Some(end) => rest = rest[end + 1..].trim_start(),
                None => return rest,
            }
        } else {
            return rest;
        }
    }
}
