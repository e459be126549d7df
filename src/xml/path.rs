//! Compiled selectors for the XPath subset used by ECP message handling.

// crates.io
use roxmltree::{Attribute, Node, NodeId};
// self
use crate::{_prelude::*, error::XmlError, xml::XmlNamespaces};

/// Node or attribute selected by an [`XmlPath`].
#[derive(Clone, Debug)]
pub enum XmlMatch<'a, 'input> {
	/// Element, text, or root node.
	Node(Node<'a, 'input>),
	/// Attribute of an element.
	Attribute(Attribute<'a, 'input>),
}
impl<'a, 'input> XmlMatch<'a, 'input> {
	/// Attribute value, or the node's first text child (the text itself for text nodes).
	pub fn value(&self) -> Option<&'a str> {
		match self {
			Self::Node(node) => node.text(),
			Self::Attribute(attr) => Some(attr.value()),
		}
	}

	/// Returns the node, if the match is one.
	pub fn as_node(&self) -> Option<Node<'a, 'input>> {
		match self {
			Self::Node(node) => Some(*node),
			Self::Attribute(_) => None,
		}
	}

	/// Returns the attribute, if the match is one.
	pub fn as_attribute(&self) -> Option<&Attribute<'a, 'input>> {
		match self {
			Self::Node(_) => None,
			Self::Attribute(attr) => Some(attr),
		}
	}
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Axis {
	Child,
	// descendant-or-self::node()/child::
	Descendant,
}

#[derive(Clone, Debug, PartialEq, Eq)]
enum NamespaceTest {
	Any,
	None,
	Uri(String),
}

#[derive(Clone, Debug, PartialEq, Eq)]
struct NameTest {
	namespace: NamespaceTest,
	// `None` is `*`.
	local: Option<String>,
}
impl NameTest {
	fn matches(&self, namespace: Option<&str>, local: &str) -> bool {
		let namespace_ok = match &self.namespace {
			NamespaceTest::Any => true,
			NamespaceTest::None => namespace.is_none(),
			NamespaceTest::Uri(uri) => namespace == Some(uri.as_str()),
		};

		namespace_ok && self.local.as_deref().is_none_or(|name| name == local)
	}
}

#[derive(Clone, Debug, PartialEq, Eq)]
enum NodeTest {
	Element(NameTest),
	Text,
	SelfNode,
	Parent,
}

#[derive(Clone, Debug, PartialEq, Eq)]
struct Step {
	axis: Axis,
	test: NodeTest,
}

/// Selector compiled against a namespace map.
///
/// Supports absolute and relative location paths built from `/` and `//` separators, element
/// steps (`prefix:name`, `name`, `*`, `prefix:*`), `.`, `..`, `text()`, and a final attribute step
/// (`@name`, `@prefix:name`, `@*`). Predicates and functions other than `text()` are rejected.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct XmlPath {
	source: String,
	absolute: bool,
	steps: Vec<Step>,
	attribute: Option<(Axis, NameTest)>,
}
impl XmlPath {
	/// Parses `path`, resolving prefixes through `namespaces`.
	pub fn parse(path: &str, namespaces: &XmlNamespaces) -> Result<Self, XmlError> {
		let invalid = |reason| XmlError::InvalidPath { path: path.to_owned(), reason };
		let trimmed = path.trim();

		if trimmed.is_empty() {
			return Err(invalid("empty selector"));
		}

		let absolute = trimmed.starts_with('/');
		let mut rest = trimmed;
		let mut steps = Vec::new();
		let mut attribute = None;

		if trimmed == "/" {
			return Ok(Self { source: path.to_owned(), absolute, steps, attribute });
		}

		while !rest.is_empty() {
			let axis = if let Some(tail) = rest.strip_prefix("//") {
				rest = tail;

				Axis::Descendant
			} else if let Some(tail) = rest.strip_prefix('/') {
				rest = tail;

				Axis::Child
			} else if steps.is_empty() && attribute.is_none() {
				Axis::Child
			} else {
				return Err(invalid("missing separator"));
			};
			let end = rest.find('/').unwrap_or(rest.len());
			let (token, tail) = rest.split_at(end);

			rest = tail;

			if attribute.is_some() {
				return Err(invalid("attribute step must be last"));
			}
			if token.is_empty() {
				return Err(invalid("empty step"));
			}

			match token.strip_prefix('@') {
				Some(name) => {
					let test = parse_name(path, name, namespaces)?;

					attribute = Some((axis, test));
				},
				None => {
					let test = match token {
						"." => NodeTest::SelfNode,
						".." => NodeTest::Parent,
						"text()" => NodeTest::Text,
						name => NodeTest::Element(parse_name(path, name, namespaces)?),
					};

					steps.push(Step { axis, test });
				},
			}
		}

		Ok(Self { source: path.to_owned(), absolute, steps, attribute })
	}

	/// Selector text this path was parsed from.
	pub fn as_str(&self) -> &str {
		&self.source
	}

	/// Evaluates the selector, returning every match in document order.
	pub fn select<'a, 'input>(&self, context: Node<'a, 'input>) -> Vec<XmlMatch<'a, 'input>> {
		let start = if self.absolute { context.document().root() } else { context };
		let mut nodes = vec![start];

		for step in &self.steps {
			nodes = apply_step(&nodes, step);
		}

		match &self.attribute {
			None => nodes.into_iter().map(XmlMatch::Node).collect(),
			Some((axis, test)) => expand(&nodes, *axis)
				.into_iter()
				.filter(Node::is_element)
				.flat_map(|node| node.attributes())
				.filter(|attr| test.matches(attr.namespace(), attr.name()))
				.map(XmlMatch::Attribute)
				.collect(),
		}
	}

	/// Evaluates the selector, returning the first match in document order.
	pub fn first<'a, 'input>(
		&self,
		context: Node<'a, 'input>,
	) -> Result<XmlMatch<'a, 'input>, XmlError> {
		self.select(context)
			.into_iter()
			.next()
			.ok_or_else(|| XmlError::NotFound { path: self.source.clone() })
	}
}
impl Display for XmlPath {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(&self.source)
	}
}

fn parse_name(path: &str, token: &str, namespaces: &XmlNamespaces) -> Result<NameTest, XmlError> {
	let (prefix, local) = match token.split_once(':') {
		Some((prefix, local)) => (Some(prefix), local),
		None => (None, token),
	};

	if prefix.is_some_and(|p| !is_ncname(p)) || (local != "*" && !is_ncname(local)) {
		return Err(XmlError::InvalidPath { path: path.to_owned(), reason: "unsupported step" });
	}

	let namespace = match prefix {
		Some(prefix) => match namespaces.get(prefix) {
			Some(uri) => NamespaceTest::Uri(uri.to_owned()),
			None => return Err(XmlError::UnknownPrefix { prefix: prefix.to_owned() }),
		},
		// XPath 1.0: unprefixed `*` matches any namespace, unprefixed names match none.
		None if local == "*" => NamespaceTest::Any,
		None => NamespaceTest::None,
	};
	let local = (local != "*").then(|| local.to_owned());

	Ok(NameTest { namespace, local })
}

fn is_ncname(value: &str) -> bool {
	let mut chars = value.chars();

	chars.next().is_some_and(|c| c.is_alphabetic() || c == '_')
		&& chars.all(|c| c.is_alphanumeric() || matches!(c, '_' | '-' | '.'))
}

fn expand<'a, 'input>(nodes: &[Node<'a, 'input>], axis: Axis) -> Vec<Node<'a, 'input>> {
	match axis {
		Axis::Child => nodes.to_vec(),
		Axis::Descendant => sorted(nodes.iter().flat_map(|node| node.descendants())),
	}
}

fn apply_step<'a, 'input>(nodes: &[Node<'a, 'input>], step: &Step) -> Vec<Node<'a, 'input>> {
	let base = expand(nodes, step.axis);

	match &step.test {
		NodeTest::SelfNode => base,
		NodeTest::Parent => sorted(base.iter().filter_map(|node| node.parent())),
		NodeTest::Text =>
			sorted(base.iter().flat_map(|node| node.children()).filter(Node::is_text)),
		NodeTest::Element(test) => {
			let children = base.iter().flat_map(|node| node.children());

			sorted(children.filter(|child| {
				let name = child.tag_name();

				child.is_element() && test.matches(name.namespace(), name.name())
			}))
		},
	}
}

fn sorted<'a, 'input, I>(nodes: I) -> Vec<Node<'a, 'input>>
where
	I: IntoIterator<Item = Node<'a, 'input>>,
{
	let mut by_id = nodes.into_iter().map(|node| (node.id(), node)).collect::<Vec<(NodeId, _)>>();

	// Node ids are assigned in document order.
	by_id.sort_by_key(|(id, _)| id.get());
	by_id.dedup_by_key(|(id, _)| *id);

	by_id.into_iter().map(|(_, node)| node).collect()
}
