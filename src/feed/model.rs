use std::collections::HashMap;

/// One element of the decoded feed tree. Namespace prefixes have already been
/// stripped by the parser, so lookups use local names only.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeedNode {
    text: Option<String>,
    attributes: HashMap<String, String>,
    children: Vec<(String, FeedNode)>,
}

/// Closed set of shapes a feed field can take, so the normalizer never probes
/// the tree ad hoc. A field is either a bare scalar, a text payload with
/// sibling attributes (e.g. a price carrying a currency attribute), or absent.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue<'a> {
    Scalar(&'a str),
    Attributed {
        text: Option<&'a str>,
        attributes: &'a HashMap<String, String>,
    },
    Absent,
}

impl FeedNode {
    pub fn new(attributes: HashMap<String, String>) -> Self {
        Self {
            text: None,
            attributes,
            children: Vec::new(),
        }
    }

    pub fn append_text(&mut self, chunk: &str) {
        match &mut self.text {
            Some(existing) => existing.push_str(chunk),
            None => self.text = Some(chunk.to_string()),
        }
    }

    pub fn push_child(&mut self, name: String, child: FeedNode) {
        self.children.push((name, child));
    }

    pub fn text(&self) -> Option<&str> {
        self.text.as_deref()
    }

    pub fn attributes(&self) -> &HashMap<String, String> {
        &self.attributes
    }

    /// First child with the given local name.
    pub fn child(&self, name: &str) -> Option<&FeedNode> {
        self.children
            .iter()
            .find(|(child_name, _)| child_name == name)
            .map(|(_, node)| node)
    }

    /// All children with the given local name, in document order.
    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a FeedNode> {
        self.children
            .iter()
            .filter(move |(child_name, _)| child_name == name)
            .map(|(_, node)| node)
    }

    /// Typed view of a direct child as a field value.
    pub fn field<'a>(&'a self, name: &str) -> FieldValue<'a> {
        match self.child(name) {
            Some(node) if !node.attributes.is_empty() => FieldValue::Attributed {
                text: node.text(),
                attributes: &node.attributes,
            },
            Some(node) => FieldValue::Scalar(node.text().unwrap_or("")),
            None => FieldValue::Absent,
        }
    }
}

impl<'a> FieldValue<'a> {
    /// The text payload, preferring it over attributes in the attributed shape.
    pub fn text(&self) -> Option<&'a str> {
        match self {
            FieldValue::Scalar(s) => Some(s),
            FieldValue::Attributed { text, .. } => *text,
            FieldValue::Absent => None,
        }
    }

    /// Whether the field carries anything usable. An empty scalar (e.g. a
    /// self-closed element) counts as absent; an attributed node is present
    /// even with an empty payload, mirroring how the feed encodes priced
    /// fields with only a currency attribute.
    pub fn is_present(&self) -> bool {
        match self {
            FieldValue::Scalar(s) => !s.is_empty(),
            FieldValue::Attributed { .. } => true,
            FieldValue::Absent => false,
        }
    }

    /// Non-negative decimal coercion; anything unparsable or negative is 0.
    pub fn decimal(&self) -> f64 {
        self.text()
            .and_then(|s| s.trim().parse::<f64>().ok())
            .filter(|v| v.is_finite() && *v >= 0.0)
            .unwrap_or(0.0)
    }

    /// Non-negative integer coercion with the same leniency as `decimal`.
    pub fn count(&self) -> i32 {
        self.decimal() as i32
    }
}
