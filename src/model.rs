use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

static PREFIXED_ID_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[RrMm]_").unwrap());
static INTEGER_TOKEN_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[+-]?\d+$").unwrap());

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn midpoint(&self, other: &Point) -> Point {
        Point::new((self.x + other.x) / 2.0, (self.y + other.y) / 2.0)
    }

    pub fn distance(&self, other: &Point) -> f64 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2)).sqrt()
    }

    /// Moves the point by `by`.
    pub fn translate(&self, by: Point) -> Point {
        Point::new(self.x + by.x, self.y + by.y)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    Metabolite,
    Midmarker,
    Multimarker,
    Exchange,
}

impl NodeKind {
    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "metabolite" => Some(Self::Metabolite),
            "midmarker" => Some(Self::Midmarker),
            "multimarker" => Some(Self::Multimarker),
            "exchange" => Some(Self::Exchange),
            _ => None,
        }
    }

    pub fn as_token(&self) -> &'static str {
        match self {
            Self::Metabolite => "metabolite",
            Self::Midmarker => "midmarker",
            Self::Multimarker => "multimarker",
            Self::Exchange => "exchange",
        }
    }
}

/// A positioned vertex of the map. Coordinates denote the node centre.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub id: String,
    pub kind: NodeKind,
    pub x: f64,
    pub y: f64,
    pub width: Option<f64>,
    pub height: Option<f64>,
    pub label_x: Option<f64>,
    pub label_y: Option<f64>,
    pub name: Option<String>,
    pub external_id: Option<String>,
    pub is_primary: Option<bool>,
    connected_segments: BTreeMap<String, Vec<String>>,
}

impl Node {
    pub fn new(id: impl Into<String>, kind: NodeKind, x: f64, y: f64) -> Self {
        Self {
            id: id.into(),
            kind,
            x,
            y,
            width: None,
            height: None,
            label_x: None,
            label_y: None,
            name: None,
            external_id: None,
            is_primary: None,
            connected_segments: BTreeMap::new(),
        }
    }

    pub fn metabolite(id: impl Into<String>, external_id: impl Into<String>, x: f64, y: f64) -> Self {
        let mut node = Self::new(id, NodeKind::Metabolite, x, y);
        node.external_id = Some(external_id.into());
        node
    }

    pub fn position(&self) -> Point {
        Point::new(self.x, self.y)
    }

    pub fn is_metabolite(&self) -> bool {
        self.kind == NodeKind::Metabolite
    }

    pub fn is_midmarker(&self) -> bool {
        self.kind == NodeKind::Midmarker
    }

    pub fn is_multimarker(&self) -> bool {
        self.kind == NodeKind::Multimarker
    }

    /// Unset counts as primary; only an explicit `false` marks a side participant.
    pub fn is_primary(&self) -> bool {
        self.is_primary.unwrap_or(true)
    }

    /// Compartment code of a metabolite node, derived from its external id.
    pub fn compartment(&self) -> Option<String> {
        if !self.is_metabolite() {
            return None;
        }
        self.external_id.as_deref().and_then(compartment_code)
    }

    /// Ordered segment ids registered against this node for one reaction.
    pub fn connected_segments(&self, reaction_id: &str) -> &[String] {
        self.connected_segments
            .get(reaction_id)
            .map(|ids| ids.as_slice())
            .unwrap_or(&[])
    }

    pub fn connected_reactions(&self) -> impl Iterator<Item = &str> {
        self.connected_segments.keys().map(|id| id.as_str())
    }

    pub fn add_connected_segment(&mut self, reaction_id: &str, segment_id: &str) {
        let list = self
            .connected_segments
            .entry(reaction_id.to_string())
            .or_default();
        if !list.iter().any(|id| id == segment_id) {
            list.push(segment_id.to_string());
        }
    }

    pub(crate) fn set_connected_segments(&mut self, reaction_id: &str, segment_ids: Vec<String>) {
        self.connected_segments
            .insert(reaction_id.to_string(), segment_ids);
    }

    pub(crate) fn remove_connected_segments(&mut self, reaction_id: &str) {
        self.connected_segments.remove(reaction_id);
    }

    pub(crate) fn clear_connected_segments(&mut self) {
        self.connected_segments.clear();
    }
}

/// Compartment code of an external metabolite identifier.
///
/// Identifiers follow `[prefix_]abbreviation_compartment[_tissue]`. Double
/// underscores belong to the abbreviation. When the second token does not look
/// like a compartment code, numeric disambiguation tokens are skipped.
pub fn compartment_code(external_id: &str) -> Option<String> {
    let id = if PREFIXED_ID_RE.is_match(external_id) {
        &external_id[2..]
    } else {
        external_id
    };
    let joined = id.replace("__", "-");
    let parts: Vec<&str> = joined.split('_').collect();
    if parts.len() < 2 {
        return None;
    }
    let mut code = parts[1];
    if code.is_empty() {
        return None;
    }
    let starts_upper = code.chars().next().is_some_and(|c| c.is_uppercase());
    if parts.len() > 2 && (code.len() > 1 || is_integer_token(code) || starts_upper) {
        let mut idx = 2;
        while idx < parts.len() && is_integer_token(parts[idx]) {
            idx += 1;
        }
        code = parts.get(idx).copied()?;
    }
    if code.is_empty() {
        None
    } else {
        Some(code.to_string())
    }
}

fn is_integer_token(token: &str) -> bool {
    INTEGER_TOKEN_RE.is_match(token)
}

/// A directed edge between two nodes. Absent control points mean a straight line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    pub id: String,
    pub from_node_id: String,
    pub to_node_id: String,
    pub b1: Option<Point>,
    pub b2: Option<Point>,
}

impl Segment {
    pub fn new(id: impl Into<String>, from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            from_node_id: from.into(),
            to_node_id: to.into(),
            b1: None,
            b2: None,
        }
    }

    pub fn with_controls(mut self, b1: Point, b2: Point) -> Self {
        self.b1 = Some(b1);
        self.b2 = Some(b2);
        self
    }

    /// Swaps endpoints and control points in place. Applying it twice is a no-op.
    pub fn reverse(&mut self) {
        std::mem::swap(&mut self.from_node_id, &mut self.to_node_id);
        std::mem::swap(&mut self.b1, &mut self.b2);
    }

    pub fn reversed(&self) -> Segment {
        let mut segment = self.clone();
        segment.reverse();
        segment
    }

    pub fn is_curved(&self) -> bool {
        self.b1.is_some() && self.b2.is_some()
    }

    pub fn touches(&self, node_id: &str) -> bool {
        self.from_node_id == node_id || self.to_node_id == node_id
    }

    pub fn other_end(&self, node_id: &str) -> Option<&str> {
        if self.from_node_id == node_id {
            Some(&self.to_node_id)
        } else if self.to_node_id == node_id {
            Some(&self.from_node_id)
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Substrate,
    Product,
    Undefined,
}

impl Role {
    pub fn from_coefficient(coefficient: Option<f64>) -> Self {
        match coefficient {
            Some(value) if value > 0.0 => Role::Product,
            Some(value) if value < 0.0 => Role::Substrate,
            _ => Role::Undefined,
        }
    }

    /// Undefined participants are oriented like substrates.
    pub fn is_product(&self) -> bool {
        matches!(self, Role::Product)
    }
}

/// A reaction participant: an external metabolite id with its signed coefficient.
#[derive(Debug, Clone, PartialEq)]
pub struct Metabolite {
    pub external_id: String,
    pub coefficient: Option<f64>,
    pub node_ref_id: Option<String>,
}

impl Metabolite {
    pub fn new(external_id: impl Into<String>, coefficient: Option<f64>) -> Self {
        Self {
            external_id: external_id.into(),
            coefficient,
            node_ref_id: None,
        }
    }

    pub fn role(&self) -> Role {
        Role::from_coefficient(self.coefficient)
    }

    pub fn is_product(&self) -> bool {
        self.role().is_product()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Gene {
    pub id: String,
    pub name: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Reaction {
    pub id: String,
    pub name: Option<String>,
    pub external_id: Option<String>,
    pub label_x: Option<f64>,
    pub label_y: Option<f64>,
    pub reversibility: Option<bool>,
    pub gene_reaction_rule: Option<String>,
    pub genes: Vec<Gene>,
    pub midmarker: Option<String>,
    metabolites: BTreeMap<String, Metabolite>,
    segments: BTreeMap<String, Segment>,
    node_ids: BTreeSet<String>,
}

impl Reaction {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: None,
            external_id: None,
            label_x: None,
            label_y: None,
            reversibility: None,
            gene_reaction_rule: None,
            genes: Vec::new(),
            midmarker: None,
            metabolites: BTreeMap::new(),
            segments: BTreeMap::new(),
            node_ids: BTreeSet::new(),
        }
    }

    /// A copy carrying every scalar field but no segments, participants or midmarker.
    pub fn scalar_copy(&self, id: impl Into<String>) -> Reaction {
        let mut copy = Reaction::new(id);
        copy.name = self.name.clone();
        copy.external_id = self.external_id.clone();
        copy.label_x = self.label_x;
        copy.label_y = self.label_y;
        copy.reversibility = self.reversibility;
        copy.gene_reaction_rule = self.gene_reaction_rule.clone();
        copy.genes = self.genes.clone();
        copy
    }

    /// Adds a segment; a colliding id replaces the previous segment, which is returned.
    pub fn add_segment(&mut self, segment: Segment) -> Option<Segment> {
        self.node_ids.insert(segment.from_node_id.clone());
        self.node_ids.insert(segment.to_node_id.clone());
        let previous = self.segments.insert(segment.id.clone(), segment);
        if previous.is_some() {
            self.rebuild_node_ids();
        }
        previous
    }

    pub fn remove_segment(&mut self, id: &str) -> Option<Segment> {
        let removed = self.segments.remove(id);
        if removed.is_some() {
            self.rebuild_node_ids();
        }
        removed
    }

    fn rebuild_node_ids(&mut self) {
        self.node_ids = self
            .segments
            .values()
            .flat_map(|s| [s.from_node_id.clone(), s.to_node_id.clone()])
            .collect();
    }

    /// Adds a participant keyed by external id; a colliding id replaces the previous one.
    pub fn add_metabolite(&mut self, metabolite: Metabolite) -> Option<Metabolite> {
        self.metabolites
            .insert(metabolite.external_id.clone(), metabolite)
    }

    pub fn segment(&self, id: &str) -> Option<&Segment> {
        self.segments.get(id)
    }

    pub fn segment_mut(&mut self, id: &str) -> Option<&mut Segment> {
        self.segments.get_mut(id)
    }

    pub fn segments(&self) -> impl Iterator<Item = &Segment> {
        self.segments.values()
    }

    pub fn segment_ids(&self) -> impl Iterator<Item = &str> {
        self.segments.keys().map(|id| id.as_str())
    }

    pub fn segment_count(&self) -> usize {
        self.segments.len()
    }

    pub fn metabolite(&self, external_id: &str) -> Option<&Metabolite> {
        self.metabolites.get(external_id)
    }

    pub fn metabolite_mut(&mut self, external_id: &str) -> Option<&mut Metabolite> {
        self.metabolites.get_mut(external_id)
    }

    pub fn metabolites(&self) -> impl Iterator<Item = &Metabolite> {
        self.metabolites.values()
    }

    pub fn metabolites_mut(&mut self) -> impl Iterator<Item = &mut Metabolite> {
        self.metabolites.values_mut()
    }

    pub fn metabolite_count(&self) -> usize {
        self.metabolites.len()
    }

    /// Participant node ids: the union of all segment endpoints.
    pub fn node_ids(&self) -> &BTreeSet<String> {
        &self.node_ids
    }

    pub fn contains_node(&self, node_id: &str) -> bool {
        self.node_ids.contains(node_id)
    }

    pub fn display_id(&self) -> &str {
        self.external_id.as_deref().unwrap_or(&self.id)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TextLabel {
    pub id: String,
    pub text: String,
    pub x: f64,
    pub y: f64,
    pub width: Option<f64>,
    pub height: Option<f64>,
}

impl TextLabel {
    pub fn new(id: impl Into<String>, text: impl Into<String>, x: f64, y: f64) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
            x,
            y,
            width: None,
            height: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Compartment {
    pub id: String,
    pub name: Option<String>,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Canvas {
    pub x: f64,
    pub y: f64,
    pub width: Option<f64>,
    pub height: Option<f64>,
}

/// Root container. Entities reference each other by id only.
///
/// Node, reaction, text-label and compartment ids are independent namespaces.
/// Every `add_*` call with an id already present replaces the stored entity
/// (last write wins) and hands the replaced value back; nothing is merged.
#[derive(Debug, Clone, Default)]
pub struct Map {
    pub id: Option<String>,
    pub name: Option<String>,
    pub description: Option<String>,
    pub homepage: Option<String>,
    pub schema: Option<String>,
    pub canvas: Canvas,
    nodes: BTreeMap<String, Node>,
    reactions: BTreeMap<String, Reaction>,
    text_labels: BTreeMap<String, TextLabel>,
    compartments: BTreeMap<String, Compartment>,
    nodes_by_external_id: BTreeMap<String, BTreeSet<String>>,
    reactions_by_external_id: BTreeMap<String, BTreeSet<String>>,
}

impl Map {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_node(&mut self, node: Node) -> Option<Node> {
        if let Some(external_id) = node.external_id.clone() {
            self.nodes_by_external_id
                .entry(external_id)
                .or_default()
                .insert(node.id.clone());
        }
        let previous = self.nodes.insert(node.id.clone(), node);
        if let Some(old) = &previous {
            let current = self.nodes.get(&old.id).and_then(|n| n.external_id.as_deref());
            if let Some(old_external) = old.external_id.as_deref() {
                if current != Some(old_external) {
                    unindex(&mut self.nodes_by_external_id, old_external, &old.id);
                }
            }
        }
        previous
    }

    pub fn add_reaction(&mut self, reaction: Reaction) -> Option<Reaction> {
        if let Some(external_id) = reaction.external_id.clone() {
            self.reactions_by_external_id
                .entry(external_id)
                .or_default()
                .insert(reaction.id.clone());
        }
        let previous = self.reactions.insert(reaction.id.clone(), reaction);
        if let Some(old) = &previous {
            let current = self
                .reactions
                .get(&old.id)
                .and_then(|r| r.external_id.as_deref());
            if let Some(old_external) = old.external_id.as_deref() {
                if current != Some(old_external) {
                    unindex(&mut self.reactions_by_external_id, old_external, &old.id);
                }
            }
        }
        previous
    }

    pub fn remove_reaction(&mut self, id: &str) -> Option<Reaction> {
        let removed = self.reactions.remove(id)?;
        if let Some(external_id) = removed.external_id.as_deref() {
            unindex(&mut self.reactions_by_external_id, external_id, id);
        }
        Some(removed)
    }

    pub fn add_text_label(&mut self, label: TextLabel) -> Option<TextLabel> {
        self.text_labels.insert(label.id.clone(), label)
    }

    pub fn add_compartment(&mut self, compartment: Compartment) -> Option<Compartment> {
        self.compartments
            .insert(compartment.id.clone(), compartment)
    }

    pub fn node(&self, id: &str) -> Option<&Node> {
        self.nodes.get(id)
    }

    pub fn node_mut(&mut self, id: &str) -> Option<&mut Node> {
        self.nodes.get_mut(id)
    }

    pub fn reaction(&self, id: &str) -> Option<&Reaction> {
        self.reactions.get(id)
    }

    pub fn reaction_mut(&mut self, id: &str) -> Option<&mut Reaction> {
        self.reactions.get_mut(id)
    }

    pub fn compartment(&self, id: &str) -> Option<&Compartment> {
        self.compartments.get(id)
    }

    pub fn compartment_mut(&mut self, id: &str) -> Option<&mut Compartment> {
        self.compartments.get_mut(id)
    }

    pub fn text_label(&self, id: &str) -> Option<&TextLabel> {
        self.text_labels.get(id)
    }

    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    pub fn reactions(&self) -> impl Iterator<Item = &Reaction> {
        self.reactions.values()
    }

    pub fn reaction_ids(&self) -> Vec<String> {
        self.reactions.keys().cloned().collect()
    }

    pub fn text_labels(&self) -> impl Iterator<Item = &TextLabel> {
        self.text_labels.values()
    }

    pub fn compartments(&self) -> impl Iterator<Item = &Compartment> {
        self.compartments.values()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn reaction_count(&self) -> usize {
        self.reactions.len()
    }

    pub fn text_label_count(&self) -> usize {
        self.text_labels.len()
    }

    pub fn compartment_count(&self) -> usize {
        self.compartments.len()
    }

    /// Nodes carrying an external id; empty when none match.
    pub fn nodes_with_external_id(&self, external_id: &str) -> Vec<&Node> {
        self.nodes_by_external_id
            .get(external_id)
            .map(|ids| ids.iter().filter_map(|id| self.nodes.get(id)).collect())
            .unwrap_or_default()
    }

    pub fn reactions_with_external_id(&self, external_id: &str) -> Vec<&Reaction> {
        self.reactions_by_external_id
            .get(external_id)
            .map(|ids| ids.iter().filter_map(|id| self.reactions.get(id)).collect())
            .unwrap_or_default()
    }

    /// Map-wide segment lookup through the owning reaction.
    pub fn find_segment(&self, segment_id: &str) -> Option<(&Reaction, &Segment)> {
        self.reactions
            .values()
            .find_map(|r| r.segment(segment_id).map(|s| (r, s)))
    }

    /// Canvas origin; exported coordinates are relative to it.
    pub fn canvas_origin(&self) -> Point {
        Point::new(self.canvas.x, self.canvas.y)
    }

    /// Translation moving the canvas origin to (0, 0).
    pub fn origin_shift(&self) -> Point {
        Point::new(-self.canvas.x, -self.canvas.y)
    }

    pub(crate) fn graph_mut(
        &mut self,
    ) -> (&mut BTreeMap<String, Node>, &mut BTreeMap<String, Reaction>) {
        (&mut self.nodes, &mut self.reactions)
    }

    pub(crate) fn clear_connected_segments(&mut self) {
        for node in self.nodes.values_mut() {
            node.clear_connected_segments();
        }
    }
}

fn unindex(index: &mut BTreeMap<String, BTreeSet<String>>, key: &str, id: &str) {
    if let Some(ids) = index.get_mut(key) {
        ids.remove(id);
        if ids.is_empty() {
            index.remove(key);
        }
    }
}
