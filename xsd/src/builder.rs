use tracing::debug;

use crate::builtins::{split_qname, strip_prefix, BuiltinTypes, Tag, DEFAULT_PREFIX, XS_NAMESPACE};
use crate::error::XsdError;
use crate::events::{Attributes, SchemaEvent};
use crate::model::{
    AttributeDef, AttributeGroupDef, AttributeUse, MaxOccurs, NodeId, NodeKind,
    SchemaNode, SimpleTypeDef,
};
use crate::names::cleanup_name;
use crate::{Options, SchemaModel};

/// An in-progress construct on the builder stack.
#[derive(Debug)]
enum Frame {
    Node(NodeId),
    SimpleType(SimpleTypeDef),
    AttributeGroup(AttributeGroupDef),
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum GroupRole {
    Definition,
    Reference,
    Ignored,
}

/// What closing a tag has to undo.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum EndAction {
    Nothing,
    CloseSchema,
    PopNode,
    PopGroup(GroupRole),
    PopSimpleType,
    PopAttributeGroup,
    CloseChoice,
    LeaveAttribute,
    LeaveRestriction,
    LeaveSimpleContent,
    LeaveAnnotation,
    LeaveDocumentation,
}

#[derive(Debug)]
struct OpenTag {
    name: String,
    action: EndAction,
}

/// `minOccurs`/`maxOccurs` of an open `choice`, inherited by its particles.
#[derive(Debug)]
struct ChoiceOccurs {
    depth: usize,
    min: Option<String>,
    max: Option<String>,
}

/// Where the attribute currently being declared lives.
#[derive(Clone, Debug)]
struct AttributeSlot {
    frame: usize,
    key: String,
}

/// Turns a stream of [`SchemaEvent`]s into a [`SchemaModel`].
///
/// Builder errors are fatal; there is no recovery once [`Self::feed`] fails.
pub struct SchemaBuilder {
    prefix_override: Option<String>,
    model: SchemaModel,
    frames: Vec<Frame>,
    open: Vec<OpenTag>,
    choices: Vec<ChoiceOccurs>,
    attribute: Option<AttributeSlot>,
    in_attribute: usize,
    in_restriction: usize,
    in_simple_content: usize,
    in_annotation: usize,
    in_documentation: usize,
    seen_root: bool,
    closed_root: bool,
}

impl SchemaBuilder {
    pub fn new(options: &Options) -> Self {
        Self {
            prefix_override: options.namespace_prefix.clone(),
            model: SchemaModel::new(BuiltinTypes::default()),
            frames: Vec::new(),
            open: Vec::new(),
            choices: Vec::new(),
            attribute: None,
            in_attribute: 0,
            in_restriction: 0,
            in_simple_content: 0,
            in_annotation: 0,
            in_documentation: 0,
            seen_root: false,
            closed_root: false,
        }
    }

    pub fn feed(&mut self, event: SchemaEvent) -> Result<(), XsdError> {
        match event {
            SchemaEvent::Start { name, attributes } => self.start(name, &attributes),
            SchemaEvent::Text(text) => {
                self.text(&text);
                Ok(())
            }
            SchemaEvent::End { name } => self.end(&name),
        }
    }

    pub fn finish(self) -> Result<SchemaModel, XsdError> {
        if !self.seen_root {
            return Err(XsdError::MissingSchemaRoot);
        }
        if !self.open.is_empty() {
            return Err(XsdError::Unclosed(self.open.len()));
        }
        debug!(nodes = self.model.len(), "schema built");
        Ok(self.model)
    }

    fn builtins(&self) -> &BuiltinTypes {
        &self.model.builtins
    }

    fn detect_prefix(&self, root_name: &str, attributes: &Attributes) -> String {
        if let Some(prefix) = &self.prefix_override {
            return prefix.clone();
        }
        let declared = attributes.iter().find_map(|(name, value)| {
            name.strip_prefix("xmlns:")
                .filter(|_| value == XS_NAMESPACE)
        });
        match declared {
            Some(prefix) => prefix.to_owned(),
            None if !root_name.contains(':') => String::new(),
            None => DEFAULT_PREFIX.to_owned(),
        }
    }

    fn start(&mut self, name: String, attributes: &Attributes) -> Result<(), XsdError> {
        debug!(tag = %name, depth = self.open.len(), "start");
        if !self.seen_root {
            if split_qname(&name).1 != "schema" {
                return Err(XsdError::MissingSchemaRoot);
            }
            let prefix = self.detect_prefix(&name, attributes);
            debug!(prefix = %prefix, "schema namespace prefix");
            self.model.builtins = BuiltinTypes::new(&prefix);
            self.model.target_namespace = attributes.get("targetNamespace").map(str::to_owned);
            self.seen_root = true;
            let root = self.model.root();
            self.frames.push(Frame::Node(root));
            self.open.push(OpenTag {
                name,
                action: EndAction::CloseSchema,
            });
            return Ok(());
        }
        if self.closed_root {
            return Err(XsdError::MalformedNesting {
                tag: name,
                reason: "appears after the schema root was closed",
            });
        }

        let tag = self.builtins().tag(&name);
        let action = match tag {
            Tag::Schema => {
                return Err(XsdError::MalformedNesting {
                    tag: name,
                    reason: "is nested inside another schema",
                })
            }
            Tag::Element => self.start_node(NodeKind::Element, &name, attributes)?,
            Tag::ComplexType if self.at_top_level() => {
                self.start_node(NodeKind::ComplexType, &name, attributes)?
            }
            Tag::ComplexType => {
                self.start_anonymous_complex_type(attributes);
                EndAction::Nothing
            }
            Tag::Any => self.start_wildcard(&name, attributes)?,
            Tag::Group => self.start_group(&name, attributes)?,
            Tag::Sequence | Tag::All | Tag::ComplexContent | Tag::Other => EndAction::Nothing,
            Tag::Choice => {
                self.choices.push(ChoiceOccurs {
                    depth: self.frames.len(),
                    min: attributes.get("minOccurs").map(str::to_owned),
                    max: attributes.get("maxOccurs").map(str::to_owned),
                });
                EndAction::CloseChoice
            }
            Tag::Attribute => self.start_attribute(&name, attributes)?,
            Tag::AttributeGroup => self.start_attribute_group(&name, attributes)?,
            Tag::AnyAttribute => {
                if let Some(node) = self.current_node() {
                    self.model.node_mut(node).any_attribute = true;
                }
                EndAction::Nothing
            }
            Tag::SimpleContent => {
                if let Some(node) = self.current_node() {
                    self.model.node_mut(node).has_simple_content = true;
                }
                self.in_simple_content += 1;
                EndAction::LeaveSimpleContent
            }
            Tag::Extension => {
                self.start_extension(attributes);
                EndAction::Nothing
            }
            Tag::SimpleType => self.start_simple_type(&name, attributes)?,
            Tag::Restriction => {
                self.start_restriction(attributes);
                self.in_restriction += 1;
                EndAction::LeaveRestriction
            }
            Tag::Enumeration | Tag::MinInclusive | Tag::MaxInclusive | Tag::WhiteSpace => {
                self.add_facet(tag, &name, attributes)?;
                EndAction::Nothing
            }
            Tag::Union => {
                if let Some(Frame::SimpleType(def)) = self.frames.last_mut() {
                    if let Some(members) = attributes.get("memberTypes") {
                        def.union_members
                            .extend(members.split_whitespace().map(str::to_owned));
                    }
                }
                EndAction::Nothing
            }
            Tag::List => {
                if self.in_attribute == 0 {
                    if let Some(Frame::SimpleType(def)) = self.frames.last_mut() {
                        def.is_list = true;
                        if let Some(item) = attributes.get("itemType") {
                            def.base = Some(item.to_owned());
                        }
                    }
                }
                EndAction::Nothing
            }
            Tag::Annotation => {
                self.in_annotation += 1;
                EndAction::LeaveAnnotation
            }
            Tag::Documentation if self.in_annotation > 0 => {
                self.in_documentation += 1;
                EndAction::LeaveDocumentation
            }
            Tag::Documentation => EndAction::Nothing,
        };
        self.open.push(OpenTag { name, action });
        Ok(())
    }

    fn text(&mut self, text: &str) {
        if self.in_documentation == 0 || self.in_attribute > 0 {
            return;
        }
        let root = self.model.root();
        match self.frames.last_mut() {
            Some(Frame::Node(id)) if *id != root => {
                let id = *id;
                self.model.node_mut(id).documentation.push_str(text);
            }
            Some(Frame::SimpleType(def)) => def.documentation.push_str(text),
            _ => {}
        }
    }

    fn end(&mut self, name: &str) -> Result<(), XsdError> {
        let open = self
            .open
            .pop()
            .ok_or_else(|| XsdError::UnexpectedEnd(name.to_owned()))?;
        if open.name != name {
            return Err(XsdError::UnbalancedEnd {
                expected: open.name,
                found: name.to_owned(),
            });
        }
        debug!(tag = %name, depth = self.open.len(), "end");

        match open.action {
            EndAction::Nothing => {}
            EndAction::CloseSchema => {
                self.frames.pop();
                self.closed_root = true;
            }
            EndAction::PopNode => {
                let id = self.pop_node(name)?;
                self.attach(id);
            }
            EndAction::PopGroup(role) => {
                let id = self.pop_node(name)?;
                match role {
                    GroupRole::Definition => {
                        let group_name = self.model.node(id).name.clone();
                        self.model.tables.element_groups.insert(group_name, id);
                    }
                    GroupRole::Reference => self.attach(id),
                    GroupRole::Ignored => {}
                }
            }
            EndAction::PopSimpleType => {
                let Some(Frame::SimpleType(def)) = self.frames.pop() else {
                    return Err(Self::corrupt(name));
                };
                if self.at_top_level() {
                    self.model.tables.top_level_simple_types.push(def.name.clone());
                }
                self.model.tables.register_simple_type(def);
            }
            EndAction::PopAttributeGroup => {
                let Some(Frame::AttributeGroup(def)) = self.frames.pop() else {
                    return Err(Self::corrupt(name));
                };
                self.model
                    .tables
                    .attribute_groups
                    .insert(def.name.clone(), def);
            }
            EndAction::CloseChoice => {
                self.choices.pop();
            }
            EndAction::LeaveAttribute => {
                self.in_attribute -= 1;
                if self.in_attribute == 0 {
                    self.attribute = None;
                }
            }
            EndAction::LeaveRestriction => self.in_restriction -= 1,
            EndAction::LeaveSimpleContent => self.in_simple_content -= 1,
            EndAction::LeaveAnnotation => self.in_annotation -= 1,
            EndAction::LeaveDocumentation => self.in_documentation -= 1,
        }
        Ok(())
    }

    fn corrupt(tag: &str) -> XsdError {
        XsdError::MalformedNesting {
            tag: tag.to_owned(),
            reason: "closes a construct that is not on top of the stack",
        }
    }

    fn pop_node(&mut self, tag: &str) -> Result<NodeId, XsdError> {
        match self.frames.pop() {
            Some(Frame::Node(id)) => Ok(id),
            _ => Err(Self::corrupt(tag)),
        }
    }

    /// Hangs a finished node under the enclosing node, if there is one.
    fn attach(&mut self, id: NodeId) {
        if let Some(Frame::Node(parent)) = self.frames.last() {
            let parent = *parent;
            self.model.node_mut(parent).children.push(id);
        }
    }

    fn at_top_level(&self) -> bool {
        self.frames.len() == 1
    }

    /// The innermost open element or complex type, excluding the schema root.
    fn current_node(&self) -> Option<NodeId> {
        match self.frames.last() {
            Some(Frame::Node(id)) if *id != self.model.root() => Some(*id),
            _ => None,
        }
    }

    /// Built-in type names keep their prefix; everything else is stripped.
    fn type_name(&self, raw: &str) -> String {
        let prefix = self.builtins().prefix();
        if !prefix.is_empty() && split_qname(raw).0 == prefix {
            raw.to_owned()
        } else {
            strip_prefix(raw).to_owned()
        }
    }

    fn occurs(
        &self,
        tag: &str,
        attributes: &Attributes,
        inherit: bool,
    ) -> Result<(u32, MaxOccurs), XsdError> {
        let choice = self
            .choices
            .last()
            .filter(|choice| inherit && choice.depth == self.frames.len());
        let min = attributes
            .get("minOccurs")
            .or_else(|| choice.and_then(|c| c.min.as_deref()));
        let max = attributes
            .get("maxOccurs")
            .or_else(|| choice.and_then(|c| c.max.as_deref()));

        let min_occurs = match min {
            Some(value) => value
                .trim()
                .parse()
                .map_err(|_| XsdError::InvalidOccurs {
                    tag: tag.to_owned(),
                    attribute: "minOccurs",
                    value: value.to_owned(),
                })?,
            None => 1,
        };
        let max_occurs = match max.map(str::trim) {
            Some("unbounded") => MaxOccurs::Unbounded,
            Some(value) => MaxOccurs::Count(value.parse().map_err(|_| {
                XsdError::InvalidOccurs {
                    tag: tag.to_owned(),
                    attribute: "maxOccurs",
                    value: value.to_owned(),
                }
            })?),
            None => MaxOccurs::default(),
        };
        Ok((min_occurs, max_occurs))
    }

    fn push_node(&mut self, node: SchemaNode) -> NodeId {
        let id = self.model.alloc(node);
        self.frames.push(Frame::Node(id));
        id
    }

    fn start_node(
        &mut self,
        kind: NodeKind,
        tag: &str,
        attributes: &Attributes,
    ) -> Result<EndAction, XsdError> {
        let top_level = self.at_top_level();
        let name_attr = attributes.get("name").map(strip_prefix);
        let type_attr = attributes.get("type").map(|t| self.type_name(t));
        let ref_attr = attributes.get("ref").map(strip_prefix);

        if top_level && name_attr.is_none() && (kind == NodeKind::ComplexType || ref_attr.is_none())
        {
            return Err(XsdError::MissingAttribute {
                tag: tag.to_owned(),
                attribute: "name",
            });
        }

        let name = name_attr
            .map(str::to_owned)
            .or_else(|| type_attr.clone())
            .or_else(|| ref_attr.map(str::to_owned))
            .unwrap_or_default();
        let mut node = SchemaNode::new(kind, name);
        node.raw_type = type_attr
            .or_else(|| ref_attr.map(str::to_owned))
            .unwrap_or_default();
        node.reference = ref_attr.map(str::to_owned);
        node.is_explicitly_defined =
            attributes.get("type").is_none() && attributes.get("ref").is_none();
        node.is_top_level = top_level;
        node.default = attributes.get("default").map(str::to_owned);
        node.is_abstract = attributes.get("abstract").is_some_and(parse_bool);
        if let Some(mixed) = attributes.get("mixed") {
            node.mixed = parse_bool(mixed);
            node.mixed_declared = Some(node.mixed);
        }
        let (min, max) = self.occurs(tag, attributes, true)?;
        node.min_occurs = min;
        node.max_occurs = max;

        if let (Some(head), Some(member)) = (attributes.get("substitutionGroup"), name_attr) {
            self.model
                .tables
                .add_substitution(strip_prefix(head), member);
        }

        self.push_node(node);
        Ok(EndAction::PopNode)
    }

    /// An anonymous `complexType` lends its attributes to the enclosing element.
    fn start_anonymous_complex_type(&mut self, attributes: &Attributes) {
        let Some(id) = self.current_node() else {
            return;
        };
        let node = self.model.node_mut(id);
        if let Some(mixed) = attributes.get("mixed") {
            node.mixed = parse_bool(mixed);
            node.mixed_declared = Some(node.mixed);
        }
        if let Some(value) = attributes.get("abstract") {
            node.is_abstract = parse_bool(value);
        }
    }

    fn start_wildcard(&mut self, tag: &str, attributes: &Attributes) -> Result<EndAction, XsdError> {
        let mut node = SchemaNode::new(NodeKind::Wildcard, "");
        let (min, max) = self.occurs(tag, attributes, true)?;
        node.min_occurs = min;
        node.max_occurs = max;
        self.push_node(node);
        Ok(EndAction::PopNode)
    }

    fn start_group(&mut self, tag: &str, attributes: &Attributes) -> Result<EndAction, XsdError> {
        let top_level = self.at_top_level();
        let reference = attributes.get("ref").map(strip_prefix);
        let role = match (top_level, reference) {
            (true, None) => GroupRole::Definition,
            (false, Some(_)) => GroupRole::Reference,
            _ => GroupRole::Ignored,
        };

        let node = match role {
            GroupRole::Definition => {
                let name = attributes
                    .get("name")
                    .map(strip_prefix)
                    .ok_or_else(|| XsdError::MissingAttribute {
                        tag: tag.to_owned(),
                        attribute: "name",
                    })?;
                let mut node = SchemaNode::new(NodeKind::Group, name);
                node.is_top_level = true;
                node
            }
            GroupRole::Reference => {
                let reference = reference.unwrap_or_default();
                let mut node = SchemaNode::new(NodeKind::GroupRef, reference);
                node.group_ref = Some(reference.to_owned());
                let (min, max) = self.occurs(tag, attributes, true)?;
                node.min_occurs = min;
                node.max_occurs = max;
                node
            }
            GroupRole::Ignored => {
                debug!(tag, "ignoring group that is neither a definition nor a reference");
                SchemaNode::new(NodeKind::Group, attributes.get("name").unwrap_or_default())
            }
        };
        self.push_node(node);
        Ok(EndAction::PopGroup(role))
    }

    fn start_attribute(&mut self, tag: &str, attributes: &Attributes) -> Result<EndAction, XsdError> {
        let name = attributes
            .get("name")
            .map(str::to_owned)
            .or_else(|| attributes.get("ref").map(|r| strip_prefix(r).to_owned()))
            .unwrap_or_else(|| "no_attribute_name".to_owned());
        let declared_type = attributes
            .get("type")
            .map(str::to_owned)
            .unwrap_or_else(|| self.builtins().string_type());
        let mut def = AttributeDef::new(name.clone(), declared_type);
        def.use_ = match attributes.get("use") {
            Some("required") => AttributeUse::Required,
            _ => AttributeUse::Optional,
        };
        def.default = attributes.get("default").map(str::to_owned);

        let frame = self.frames.len().saturating_sub(1);
        match self.frames.last_mut() {
            Some(Frame::Node(id)) => {
                let id = *id;
                self.model.node_mut(id).attribute_defs.insert(name.clone(), def);
            }
            Some(Frame::AttributeGroup(group)) => group.attributes.insert(name.clone(), def),
            _ => {
                return Err(XsdError::MalformedNesting {
                    tag: tag.to_owned(),
                    reason: "is not inside an element, complex type or attribute group",
                })
            }
        }
        self.attribute = Some(AttributeSlot { frame, key: name });
        self.in_attribute += 1;
        Ok(EndAction::LeaveAttribute)
    }

    fn current_attribute(&mut self) -> Option<&mut AttributeDef> {
        let slot = self.attribute.as_ref()?;
        match self.frames.get_mut(slot.frame)? {
            Frame::Node(id) => {
                let id = *id;
                self.model.node_mut(id).attribute_defs.get_mut(&slot.key)
            }
            Frame::AttributeGroup(group) => group.attributes.get_mut(&slot.key),
            Frame::SimpleType(_) => None,
        }
    }

    fn start_attribute_group(
        &mut self,
        tag: &str,
        attributes: &Attributes,
    ) -> Result<EndAction, XsdError> {
        if let Some(name) = attributes.get("name") {
            let def = AttributeGroupDef {
                name: strip_prefix(name).to_owned(),
                ..AttributeGroupDef::default()
            };
            self.frames.push(Frame::AttributeGroup(def));
            return Ok(EndAction::PopAttributeGroup);
        }
        let Some(reference) = attributes.get("ref").map(strip_prefix) else {
            if self.at_top_level() {
                return Err(XsdError::MissingAttribute {
                    tag: tag.to_owned(),
                    attribute: "name",
                });
            }
            return Ok(EndAction::Nothing);
        };
        let root = self.model.root();
        match self.frames.last_mut() {
            Some(Frame::AttributeGroup(group)) => group.group_refs.push(reference.to_owned()),
            Some(Frame::Node(id)) if *id != root => {
                let id = *id;
                self.model
                    .node_mut(id)
                    .attribute_group_refs
                    .push(reference.to_owned());
            }
            _ => debug!(reference, "attribute group reference outside of a type"),
        }
        Ok(EndAction::Nothing)
    }

    fn start_extension(&mut self, attributes: &Attributes) {
        let (Some(base), Some(id)) = (attributes.get("base"), self.current_node()) else {
            return;
        };
        let is_builtin = self.builtins().primitive(base).is_some();
        let node = self.model.node_mut(id);
        if is_builtin {
            node.simple_bases.push(base.to_owned());
        } else {
            node.base = Some(strip_prefix(base).to_owned());
        }
    }

    fn start_simple_type(
        &mut self,
        tag: &str,
        attributes: &Attributes,
    ) -> Result<EndAction, XsdError> {
        if self.in_attribute > 0 || matches!(self.frames.last(), Some(Frame::SimpleType(_))) {
            // inline item/base types fold into whatever encloses them
            return Ok(EndAction::Nothing);
        }
        let parent = self.current_node();
        let name = match (attributes.get("name"), parent) {
            (Some(name), _) => cleanup_name(name),
            (None, Some(id)) => cleanup_name(&self.model.node(id).name),
            (None, None) => {
                if matches!(self.frames.last(), Some(Frame::AttributeGroup(_))) {
                    return Ok(EndAction::Nothing);
                }
                return Err(XsdError::MissingAttribute {
                    tag: tag.to_owned(),
                    attribute: "name",
                });
            }
        };
        if let Some(id) = parent {
            self.model.node_mut(id).simple_type_name = Some(name.clone());
        }
        self.frames.push(Frame::SimpleType(SimpleTypeDef::new(name)));
        Ok(EndAction::PopSimpleType)
    }

    fn start_restriction(&mut self, attributes: &Attributes) {
        let Some(base) = attributes.get("base") else {
            return;
        };
        if self.in_attribute > 0 {
            if let Some(attribute) = self.current_attribute() {
                attribute.declared_type = base.to_owned();
            }
            return;
        }
        if let Some(Frame::SimpleType(def)) = self.frames.last_mut() {
            def.base = Some(base.to_owned());
            return;
        }
        let Some(id) = self.current_node() else {
            return;
        };
        let in_simple_content = self.in_simple_content > 0;
        let is_builtin = self.builtins().primitive(base).is_some();
        let node = self.model.node_mut(id);
        match (in_simple_content, is_builtin) {
            (true, true) => node.simple_bases.push(base.to_owned()),
            (true, false) => node.base = Some(strip_prefix(base).to_owned()),
            (false, _) => node.restriction_base = Some(strip_prefix(base).to_owned()),
        }
    }

    fn add_facet(&mut self, tag: Tag, name: &str, attributes: &Attributes) -> Result<(), XsdError> {
        let Some(value) = attributes.get("value") else {
            return Ok(());
        };
        if tag == Tag::WhiteSpace {
            if self.in_restriction > 0 && value == "collapse" {
                match self.frames.last_mut() {
                    Some(Frame::SimpleType(def)) => def.collapse_white_space = true,
                    Some(Frame::Node(id)) => {
                        let id = *id;
                        self.model.node_mut(id).collapse_white_space = true;
                    }
                    _ => {}
                }
            }
            return Ok(());
        }

        let facets = if self.in_attribute > 0 {
            self.current_attribute().map(|a| &mut a.facets)
        } else {
            let root = self.model.root();
            match self.frames.last_mut() {
                Some(Frame::SimpleType(def)) => Some(&mut def.facets),
                Some(Frame::Node(id)) if *id != root => {
                    let id = *id;
                    Some(&mut self.model.node_mut(id).facets)
                }
                _ => None,
            }
        };
        let facets = facets.ok_or_else(|| XsdError::MalformedNesting {
            tag: name.to_owned(),
            reason: "is outside of any simple type, element or attribute",
        })?;
        match tag {
            Tag::Enumeration => facets.enumeration.push(value.to_owned()),
            Tag::MinInclusive => facets.minimum = Some(value.to_owned()),
            Tag::MaxInclusive => facets.maximum = Some(value.to_owned()),
            _ => {}
        }
        Ok(())
    }
}

fn parse_bool(value: &str) -> bool {
    let value = value.trim();
    value == "1" || value.eq_ignore_ascii_case("true")
}
