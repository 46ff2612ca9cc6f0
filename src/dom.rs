use std::collections::{HashMap, HashSet};

use crate::selector::parse_selector_groups;
use crate::{Error, Result};

/// Handle to a node in a page's DOM arena.
///
/// Handles stay valid after the node is detached, so a removed element can be
/// re-inserted and keep its identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) usize);

#[derive(Debug, Clone)]
pub(crate) enum NodeType {
    Document,
    Element(Element),
    Text(String),
}

#[derive(Debug, Clone)]
pub(crate) struct Node {
    pub(crate) parent: Option<NodeId>,
    pub(crate) children: Vec<NodeId>,
    pub(crate) node_type: NodeType,
}

#[derive(Debug, Clone)]
pub(crate) struct Element {
    pub(crate) tag_name: String,
    pub(crate) attrs: HashMap<String, String>,
    pub(crate) value: String,
    pub(crate) checked: bool,
    pub(crate) disabled: bool,
    pub(crate) readonly: bool,
}

#[derive(Debug, Clone)]
pub(crate) struct Dom {
    pub(crate) nodes: Vec<Node>,
    pub(crate) root: NodeId,
    id_index: HashMap<String, NodeId>,
}

impl Dom {
    pub(crate) fn new() -> Self {
        let root = Node {
            parent: None,
            children: Vec::new(),
            node_type: NodeType::Document,
        };
        Self {
            nodes: vec![root],
            root: NodeId(0),
            id_index: HashMap::new(),
        }
    }

    fn create_node(&mut self, parent: Option<NodeId>, node_type: NodeType) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            parent,
            children: Vec::new(),
            node_type,
        });
        if let Some(parent_id) = parent {
            self.nodes[parent_id.0].children.push(id);
        }
        id
    }

    pub(crate) fn create_element(
        &mut self,
        parent: NodeId,
        tag_name: String,
        attrs: HashMap<String, String>,
    ) -> NodeId {
        let element = Element {
            value: attrs.get("value").cloned().unwrap_or_default(),
            checked: attrs.contains_key("checked"),
            disabled: attrs.contains_key("disabled"),
            readonly: attrs.contains_key("readonly"),
            tag_name,
            attrs,
        };
        let id = self.create_node(Some(parent), NodeType::Element(element));
        if let Some(id_attr) = self.attr(id, "id") {
            self.id_index.insert(id_attr, id);
        }
        id
    }

    pub(crate) fn create_text(&mut self, parent: NodeId, text: String) -> NodeId {
        self.create_node(Some(parent), NodeType::Text(text))
    }

    pub(crate) fn element(&self, node_id: NodeId) -> Option<&Element> {
        match &self.nodes.get(node_id.0)?.node_type {
            NodeType::Element(element) => Some(element),
            _ => None,
        }
    }

    fn element_mut(&mut self, node_id: NodeId) -> Option<&mut Element> {
        match &mut self.nodes.get_mut(node_id.0)?.node_type {
            NodeType::Element(element) => Some(element),
            _ => None,
        }
    }

    fn element_mut_or_err(&mut self, node_id: NodeId, op: &str) -> Result<&mut Element> {
        self.element_mut(node_id)
            .ok_or_else(|| Error::InvalidArgument(format!("{op} target is not an element")))
    }

    pub(crate) fn tag_name(&self, node_id: NodeId) -> Option<&str> {
        self.element(node_id).map(|e| e.tag_name.as_str())
    }

    pub(crate) fn has_tag(&self, node_id: NodeId, tag: &str) -> bool {
        self.tag_name(node_id)
            .map(|name| name.eq_ignore_ascii_case(tag))
            .unwrap_or(false)
    }

    pub(crate) fn parent(&self, node_id: NodeId) -> Option<NodeId> {
        self.nodes.get(node_id.0).and_then(|node| node.parent)
    }

    pub(crate) fn is_descendant_of(&self, node_id: NodeId, ancestor: NodeId) -> bool {
        let mut cursor = self.parent(node_id);
        while let Some(current) = cursor {
            if current == ancestor {
                return true;
            }
            cursor = self.parent(current);
        }
        false
    }

    pub(crate) fn is_connected(&self, node_id: NodeId) -> bool {
        let mut cursor = Some(node_id);
        while let Some(node) = cursor {
            if node == self.root {
                return true;
            }
            cursor = self.parent(node);
        }
        false
    }

    pub(crate) fn by_id(&self, id: &str) -> Option<NodeId> {
        self.id_index.get(id).copied()
    }

    /// `<body>` when the page has one, the document otherwise.
    pub(crate) fn body(&self) -> NodeId {
        self.all_element_nodes()
            .into_iter()
            .find(|node| self.has_tag(*node, "body"))
            .unwrap_or(self.root)
    }

    pub(crate) fn text_content(&self, node_id: NodeId) -> String {
        match &self.nodes[node_id.0].node_type {
            NodeType::Document | NodeType::Element(_) => {
                let mut out = String::new();
                for child in &self.nodes[node_id.0].children {
                    out.push_str(&self.text_content(*child));
                }
                out
            }
            NodeType::Text(text) => text.clone(),
        }
    }

    pub(crate) fn value(&self, node_id: NodeId) -> String {
        self.element(node_id)
            .map(|element| element.value.clone())
            .unwrap_or_default()
    }

    pub(crate) fn set_value(&mut self, node_id: NodeId, value: &str) -> Result<()> {
        if self.has_tag(node_id, "select") {
            return self.set_select_value(node_id, value);
        }
        self.element_mut_or_err(node_id, "value")?.value = value.to_string();
        Ok(())
    }

    pub(crate) fn checked(&self, node_id: NodeId) -> bool {
        self.element(node_id).map(|e| e.checked).unwrap_or(false)
    }

    pub(crate) fn set_checked(&mut self, node_id: NodeId, checked: bool) -> Result<()> {
        self.element_mut_or_err(node_id, "checked")?.checked = checked;
        Ok(())
    }

    pub(crate) fn disabled(&self, node_id: NodeId) -> bool {
        self.element(node_id).map(|e| e.disabled).unwrap_or(false)
    }

    pub(crate) fn readonly(&self, node_id: NodeId) -> bool {
        self.element(node_id).map(|e| e.readonly).unwrap_or(false)
    }

    pub(crate) fn attr(&self, node_id: NodeId, name: &str) -> Option<String> {
        self.element(node_id)
            .and_then(|e| e.attrs.get(name).cloned())
    }

    pub(crate) fn has_attr(&self, node_id: NodeId, name: &str) -> bool {
        self.element(node_id)
            .map(|e| e.attrs.contains_key(&name.to_ascii_lowercase()))
            .unwrap_or(false)
    }

    pub(crate) fn set_attr(&mut self, node_id: NodeId, name: &str, value: &str) -> Result<()> {
        let lowered = name.to_ascii_lowercase();
        let old_id = self.attr(node_id, "id");
        let connected = self.is_connected(node_id);
        let is_option = {
            let element = self.element_mut_or_err(node_id, "setAttribute")?;
            element.attrs.insert(lowered.clone(), value.to_string());
            match lowered.as_str() {
                "value" => element.value = value.to_string(),
                "checked" => element.checked = true,
                "disabled" => element.disabled = true,
                "readonly" => element.readonly = true,
                _ => {}
            }
            element.tag_name.eq_ignore_ascii_case("option")
        };

        if lowered == "id" && connected {
            if let Some(old) = old_id {
                self.id_index.remove(&old);
            }
            if !value.is_empty() {
                self.id_index.insert(value.to_string(), node_id);
            }
        }
        if is_option && (lowered == "selected" || lowered == "value") {
            self.sync_select_value_for_option(node_id)?;
        }
        Ok(())
    }

    /// Sets (`"true"`) or removes a presentation-only flag attribute. A no-op
    /// on non-elements.
    pub(crate) fn toggle_flag_attr(&mut self, node_id: NodeId, name: &str, on: bool) {
        let Some(element) = self.element_mut(node_id) else {
            return;
        };
        if on {
            element.attrs.insert(name.to_string(), "true".to_string());
        } else {
            element.attrs.remove(name);
        }
    }

    pub(crate) fn remove_attr(&mut self, node_id: NodeId, name: &str) -> Result<()> {
        let lowered = name.to_ascii_lowercase();
        let old_id = self.attr(node_id, "id");
        let connected = self.is_connected(node_id);
        let is_option = {
            let element = self.element_mut_or_err(node_id, "removeAttribute")?;
            element.attrs.remove(&lowered);
            match lowered.as_str() {
                "value" => element.value.clear(),
                "checked" => element.checked = false,
                "disabled" => element.disabled = false,
                "readonly" => element.readonly = false,
                _ => {}
            }
            element.tag_name.eq_ignore_ascii_case("option")
        };

        if lowered == "id" && connected {
            if let Some(old) = old_id {
                self.id_index.remove(&old);
            }
        }
        if is_option && (lowered == "selected" || lowered == "value") {
            self.sync_select_value_for_option(node_id)?;
        }
        Ok(())
    }

    /// Moves every top-level node of `fragment` under `parent`, keeping
    /// document order. Returns the inserted top-level element ids.
    pub(crate) fn adopt_fragment(&mut self, parent: NodeId, fragment: &Dom) -> Result<Vec<NodeId>> {
        if self.element(parent).is_none() && parent != self.root {
            return Err(Error::InvalidArgument(
                "insertion target cannot have children".into(),
            ));
        }
        let mut inserted = Vec::new();
        for child in fragment.nodes[fragment.root.0].children.clone() {
            let node = self.clone_subtree_from_dom(fragment, child, parent);
            if self.element(node).is_some() {
                inserted.push(node);
            }
        }
        self.rebuild_id_index();
        Ok(inserted)
    }

    fn clone_subtree_from_dom(&mut self, source: &Dom, source_node: NodeId, parent: NodeId) -> NodeId {
        let node_type = source.nodes[source_node.0].node_type.clone();
        let node = self.create_node(Some(parent), node_type);
        for child in &source.nodes[source_node.0].children {
            self.clone_subtree_from_dom(source, *child, node);
        }
        node
    }

    pub(crate) fn append_child(&mut self, parent: NodeId, child: NodeId) -> Result<()> {
        if child == self.root || child == parent || child.0 >= self.nodes.len() {
            return Err(Error::InvalidArgument("invalid appendChild node".into()));
        }
        // Prevent cycles: parent must not be inside child's subtree.
        let mut cursor = Some(parent);
        while let Some(node) = cursor {
            if node == child {
                return Err(Error::InvalidArgument(
                    "appendChild would create a cycle".into(),
                ));
            }
            cursor = self.parent(node);
        }

        if let Some(old_parent) = self.parent(child) {
            self.nodes[old_parent.0].children.retain(|id| *id != child);
        }
        self.nodes[child.0].parent = Some(parent);
        self.nodes[parent.0].children.push(child);
        self.rebuild_id_index();
        Ok(())
    }

    pub(crate) fn remove_node(&mut self, node: NodeId) -> Result<()> {
        if node == self.root {
            return Err(Error::InvalidArgument("cannot remove document root".into()));
        }
        let Some(parent) = self.parent(node) else {
            return Ok(());
        };
        self.nodes[parent.0].children.retain(|id| *id != node);
        self.nodes[node.0].parent = None;
        self.rebuild_id_index();
        Ok(())
    }

    fn rebuild_id_index(&mut self) {
        let mut next = HashMap::new();
        for node in self.all_element_nodes() {
            if let Some(id) = self.attr(node, "id") {
                if !id.is_empty() {
                    next.entry(id).or_insert(node);
                }
            }
        }
        self.id_index = next;
    }

    pub(crate) fn query_selector(&self, selector: &str) -> Result<Option<NodeId>> {
        Ok(self.query_selector_all(selector)?.into_iter().next())
    }

    pub(crate) fn query_selector_all(&self, selector: &str) -> Result<Vec<NodeId>> {
        let groups = parse_selector_groups(selector)?;
        if groups.len() == 1 && groups[0].len() == 1 {
            if let Some(id) = groups[0][0].step.id_only() {
                return Ok(self.by_id(id).into_iter().collect());
            }
        }

        let mut seen = HashSet::new();
        Ok(self
            .all_element_nodes()
            .into_iter()
            .filter(|candidate| {
                groups
                    .iter()
                    .any(|steps| self.matches_selector_chain(*candidate, steps))
            })
            .filter(|candidate| seen.insert(*candidate))
            .collect())
    }

    pub(crate) fn matches_selector(&self, node_id: NodeId, selector: &str) -> Result<bool> {
        if self.element(node_id).is_none() {
            return Ok(false);
        }
        let groups = parse_selector_groups(selector)?;
        Ok(groups
            .iter()
            .any(|steps| self.matches_selector_chain(node_id, steps)))
    }

    pub(crate) fn closest(&self, node_id: NodeId, selector: &str) -> Result<Option<NodeId>> {
        if self.element(node_id).is_none() {
            return Ok(None);
        }
        let groups = parse_selector_groups(selector)?;
        let mut cursor = Some(node_id);
        while let Some(current) = cursor {
            if groups
                .iter()
                .any(|steps| self.matches_selector_chain(current, steps))
            {
                return Ok(Some(current));
            }
            cursor = self.parent(current);
        }
        Ok(None)
    }

    fn collect_elements_dfs(&self, node_id: NodeId, out: &mut Vec<NodeId>) {
        if matches!(self.nodes[node_id.0].node_type, NodeType::Element(_)) {
            out.push(node_id);
        }
        for child in &self.nodes[node_id.0].children {
            self.collect_elements_dfs(*child, out);
        }
    }

    /// `node` itself (when it is an element) followed by its element
    /// descendants, in document order.
    pub(crate) fn subtree_elements(&self, node: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        self.collect_elements_dfs(node, &mut out);
        out
    }

    pub(crate) fn all_element_nodes(&self) -> Vec<NodeId> {
        self.subtree_elements(self.root)
    }

    pub(crate) fn find_ancestor_by_tag(&self, node_id: NodeId, tag: &str) -> Option<NodeId> {
        let mut cursor = self.parent(node_id);
        while let Some(current) = cursor {
            if self.has_tag(current, tag) {
                return Some(current);
            }
            cursor = self.parent(current);
        }
        None
    }

    pub(crate) fn form_owner(&self, node_id: NodeId) -> Option<NodeId> {
        if self.has_tag(node_id, "form") {
            Some(node_id)
        } else {
            self.find_ancestor_by_tag(node_id, "form")
        }
    }

    pub(crate) fn input_type(&self, node_id: NodeId) -> Option<String> {
        if !self.has_tag(node_id, "input") {
            return None;
        }
        Some(
            self.attr(node_id, "type")
                .unwrap_or_else(|| "text".into())
                .to_ascii_lowercase(),
        )
    }

    pub(crate) fn is_checkbox_input(&self, node_id: NodeId) -> bool {
        self.input_type(node_id).as_deref() == Some("checkbox")
    }

    pub(crate) fn is_radio_input(&self, node_id: NodeId) -> bool {
        self.input_type(node_id).as_deref() == Some("radio")
    }

    pub(crate) fn is_reset_control(&self, node_id: NodeId) -> bool {
        if self.has_tag(node_id, "button") {
            return self
                .attr(node_id, "type")
                .map(|kind| kind.eq_ignore_ascii_case("reset"))
                .unwrap_or(false);
        }
        self.input_type(node_id).as_deref() == Some("reset")
    }

    pub(crate) fn uncheck_other_radios_in_group(&mut self, target: NodeId) -> Result<()> {
        let target_name = self.attr(target, "name").unwrap_or_default();
        if target_name.is_empty() {
            return Ok(());
        }
        let target_form = self.form_owner(target);
        for node in self.all_element_nodes() {
            if node == target
                || !self.is_radio_input(node)
                || self.attr(node, "name").unwrap_or_default() != target_name
                || self.form_owner(node) != target_form
            {
                continue;
            }
            self.set_checked(node, false)?;
        }
        Ok(())
    }

    /// Restores every control inside `form` to the state its markup
    /// describes.
    pub(crate) fn reset_form_controls(&mut self, form: NodeId) -> Result<()> {
        for node in self.subtree_elements(form) {
            let Some(tag) = self.tag_name(node).map(str::to_ascii_lowercase) else {
                continue;
            };
            match tag.as_str() {
                "input" => {
                    let default_value = self.attr(node, "value").unwrap_or_default();
                    let default_checked = self.has_attr(node, "checked");
                    let element = self.element_mut_or_err(node, "reset")?;
                    element.value = default_value;
                    element.checked = default_checked;
                }
                "textarea" => {
                    let text = self.text_content(node);
                    self.element_mut_or_err(node, "reset")?.value = text;
                }
                "select" => self.sync_select_value(node)?,
                _ => {}
            }
        }
        Ok(())
    }

    pub(crate) fn initialize_form_control_values(&mut self) -> Result<()> {
        for node in self.all_element_nodes() {
            if self.has_tag(node, "textarea") {
                let text = self.text_content(node);
                self.element_mut_or_err(node, "textarea")?.value = text;
            } else if self.has_tag(node, "select") {
                self.sync_select_value(node)?;
            }
        }
        Ok(())
    }

    fn sync_select_value_for_option(&mut self, option_node: NodeId) -> Result<()> {
        let Some(select_node) = self.find_ancestor_by_tag(option_node, "select") else {
            return Ok(());
        };
        self.sync_select_value(select_node)
    }

    fn set_select_value(&mut self, select_node: NodeId, requested: &str) -> Result<()> {
        let mut option_values = Vec::new();
        for option in self.select_options(select_node) {
            option_values.push((option, self.option_effective_value(option)));
        }
        let matched = option_values
            .iter()
            .find(|(_, value)| value == requested)
            .cloned();

        for (option, _) in &option_values {
            let element = self.element_mut_or_err(*option, "option")?;
            if Some(*option) == matched.as_ref().map(|(node, _)| *node) {
                element
                    .attrs
                    .insert("selected".to_string(), "true".to_string());
            } else {
                element.attrs.remove("selected");
            }
        }

        self.element_mut_or_err(select_node, "select")?.value =
            matched.map(|(_, value)| value).unwrap_or_default();
        Ok(())
    }

    fn sync_select_value(&mut self, select_node: NodeId) -> Result<()> {
        let options = self.select_options(select_node);
        let value = options
            .iter()
            .copied()
            .find(|option| self.has_attr(*option, "selected"))
            .or_else(|| options.first().copied())
            .map(|option| self.option_effective_value(option))
            .unwrap_or_default();
        self.element_mut_or_err(select_node, "select")?.value = value;
        Ok(())
    }

    fn select_options(&self, select_node: NodeId) -> Vec<NodeId> {
        self.subtree_elements(select_node)
            .into_iter()
            .filter(|node| self.has_tag(*node, "option"))
            .collect()
    }

    pub(crate) fn has_option_value(&self, select_node: NodeId, value: &str) -> bool {
        self.select_options(select_node)
            .into_iter()
            .any(|option| self.option_effective_value(option) == value)
    }

    fn option_effective_value(&self, option_node: NodeId) -> String {
        self.attr(option_node, "value")
            .unwrap_or_else(|| self.text_content(option_node))
    }

    pub(crate) fn dump_node(&self, node_id: NodeId) -> String {
        match &self.nodes[node_id.0].node_type {
            NodeType::Document => self.nodes[node_id.0]
                .children
                .iter()
                .map(|child| self.dump_node(*child))
                .collect(),
            NodeType::Text(text) => text.clone(),
            NodeType::Element(element) => {
                let mut attrs = element.attrs.iter().collect::<Vec<_>>();
                attrs.sort();
                let mut out = format!("<{}", element.tag_name);
                for (k, v) in attrs {
                    out.push_str(&format!(" {k}=\"{v}\""));
                }
                out.push('>');
                for child in &self.nodes[node_id.0].children {
                    out.push_str(&self.dump_node(*child));
                }
                out.push_str(&format!("</{}>", element.tag_name));
                out
            }
        }
    }
}

pub(crate) fn truncate_chars(value: &str, max_chars: usize) -> String {
    let mut it = value.chars();
    let mut out: String = it.by_ref().take(max_chars).collect();
    if it.next().is_some() {
        out.push_str("...");
    }
    out
}
