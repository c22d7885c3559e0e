use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::diagnostics::{ConvertError, Diagnostic, Diagnostics, StructuralError};
use crate::layout_doc::{BoundingBox, NUMERIC_LABEL_RE};
use crate::model::{Compartment, Map, Metabolite, Node, NodeKind, Point, Reaction, Role, TextLabel};
use crate::topology::boundary::reaction_boundary;
use crate::topology::compartments::infer_compartments;
use crate::topology::decomposer::{ParticipantCurve, decompose_curve, flow_oriented};
use crate::topology::linker::validate_reaction;
use crate::topology::stitcher::{curve_starts_at_metabolite, stitch_reaction};
use crate::topology::types::{Curve, CurveHop, StitchedCurve};

/// A process-description diagram of glyphs joined by arcs.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotationDocument {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub bbox: BoundingBox,
    #[serde(default)]
    pub glyphs: Vec<Glyph>,
    #[serde(default)]
    pub arcs: Vec<Arc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GlyphClass {
    SimpleChemical,
    Process,
    /// Empty set standing in for the missing side of a boundary reaction.
    SourceAndSink,
    Compartment,
    Annotation,
    Other(String),
}

impl GlyphClass {
    pub fn as_str(&self) -> &str {
        match self {
            Self::SimpleChemical => "simple chemical",
            Self::Process => "process",
            Self::SourceAndSink => "source and sink",
            Self::Compartment => "compartment",
            Self::Annotation => "annotation",
            Self::Other(class) => class,
        }
    }
}

impl From<String> for GlyphClass {
    fn from(class: String) -> Self {
        match class.as_str() {
            "simple chemical" => Self::SimpleChemical,
            "process" => Self::Process,
            "source and sink" => Self::SourceAndSink,
            "compartment" => Self::Compartment,
            "annotation" => Self::Annotation,
            _ => Self::Other(class),
        }
    }
}

impl Serialize for GlyphClass {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for GlyphClass {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        String::deserialize(deserializer).map(Self::from)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Glyph {
    pub id: String,
    pub class: GlyphClass,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    pub bbox: BoundingBox,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compartment_ref: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ports: Vec<Port>,
}

impl Glyph {
    fn new(id: String, class: GlyphClass, label: Option<String>, bbox: BoundingBox) -> Self {
        Self {
            id,
            class,
            label,
            bbox,
            compartment_ref: None,
            ports: Vec::new(),
        }
    }
}

/// Attachment point of an arc on a process glyph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Port {
    pub id: String,
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArcClass {
    Consumption,
    Production,
    Other(String),
}

impl ArcClass {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Consumption => "consumption",
            Self::Production => "production",
            Self::Other(class) => class,
        }
    }

    pub fn role(&self) -> Role {
        match self {
            Self::Consumption => Role::Substrate,
            Self::Production => Role::Product,
            Self::Other(_) => Role::Undefined,
        }
    }
}

impl Serialize for ArcClass {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for ArcClass {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let class = String::deserialize(deserializer)?;
        Ok(match class.as_str() {
            "consumption" => Self::Consumption,
            "production" => Self::Production,
            _ => Self::Other(class),
        })
    }
}

/// A point an arc passes through. Control points belong to the hop ending here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArcPoint {
    pub x: f64,
    pub y: f64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub controls: Vec<Point>,
}

impl ArcPoint {
    fn at(point: Point, hop: &CurveHop) -> Self {
        let controls = match (hop.b1, hop.b2) {
            (Some(b1), Some(b2)) => vec![b1, b2],
            _ => Vec::new(),
        };
        Self {
            x: point.x,
            y: point.y,
            controls,
        }
    }

    fn position(&self) -> Point {
        Point::new(self.x, self.y)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Arc {
    pub id: String,
    pub class: ArcClass,
    pub source: String,
    pub target: String,
    pub start: Point,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub next: Vec<ArcPoint>,
    pub end: ArcPoint,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cardinality: Option<f64>,
}

impl Arc {
    /// The arc geometry as a curve running from source to target.
    pub fn curve(&self) -> Curve {
        let mut hops = Vec::with_capacity(self.next.len() + 1);
        let mut from = self.start;
        for point in self.next.iter().chain(std::iter::once(&self.end)) {
            let to = point.position();
            let mut hop = CurveHop::line(from, to);
            if let [b1, b2] = point.controls.as_slice() {
                hop.b1 = Some(*b1);
                hop.b2 = Some(*b2);
            }
            hops.push(hop);
            from = to;
        }
        Curve::new(hops)
    }
}

fn chemical_glyph_id(node_id: &str) -> String {
    format!("sc_{node_id}")
}

fn process_glyph_id(reaction_id: &str) -> String {
    format!("pr_{reaction_id}")
}

fn port_id(process_id: &str, node_id: &str) -> String {
    format!("{process_id}_{node_id}")
}

/// Writes a linked map as a notation document.
///
/// Reactions failing validation are left out and reported. Arcs run in the
/// direction of flow whatever curve direction is configured.
pub fn export_notation(map: &Map, config: &Config, diagnostics: &mut Diagnostics) -> NotationDocument {
    let options = &config.export;
    let inferred;
    let map = if options.infer_compartment_bounds {
        let mut copy = map.clone();
        infer_compartments(&mut copy, &config.compartments, diagnostics);
        inferred = copy;
        &inferred
    } else {
        map
    };
    let shift = map.origin_shift();

    let mut document = NotationDocument {
        id: map.id.clone(),
        bbox: BoundingBox {
            x: 0.0,
            y: 0.0,
            width: map.canvas.width.unwrap_or(options.canvas_default_width),
            height: map.canvas.height.unwrap_or(options.canvas_default_height),
        },
        ..NotationDocument::default()
    };

    let mut compartment_glyphs = BTreeMap::new();
    if options.infer_compartment_bounds {
        for compartment in map.compartments() {
            if config.compartments.is_excluded(&compartment.id)
                || compartment.id.eq_ignore_ascii_case(&options.default_compartment_id)
            {
                continue;
            }
            let id = format!("co_{}", compartment.id);
            compartment_glyphs.insert(compartment.id.clone(), id.clone());
            document.glyphs.push(Glyph::new(
                id,
                GlyphClass::Compartment,
                compartment.name.clone(),
                BoundingBox {
                    x: compartment.x + shift.x,
                    y: compartment.y + shift.y,
                    width: compartment.width,
                    height: compartment.height,
                },
            ));
        }
    }

    for node in map.nodes() {
        match node.kind {
            NodeKind::Metabolite => {
                let (width, height) = options.node_size(node.is_primary());
                let mut glyph = Glyph::new(
                    chemical_glyph_id(&node.id),
                    GlyphClass::SimpleChemical,
                    node.name.clone().or_else(|| node.external_id.clone()),
                    BoundingBox::centred(
                        node.position().translate(shift),
                        node.width.unwrap_or(width),
                        node.height.unwrap_or(height),
                    ),
                );
                glyph.compartment_ref = node
                    .compartment()
                    .and_then(|code| compartment_glyphs.get(&code).cloned());
                document.glyphs.push(glyph);
            }
            NodeKind::Exchange => diagnostics.push(Diagnostic::UnsupportedNode {
                node: node.id.clone(),
                kind: "exchange",
            }),
            NodeKind::Midmarker | NodeKind::Multimarker => {}
        }
    }

    for reaction in map.reactions() {
        if let Err(err) = validate_reaction(map, &reaction.id) {
            diagnostics.push(err.into());
            continue;
        }
        match process(map, reaction, config, shift, diagnostics) {
            Ok((glyphs, arcs)) => {
                document.glyphs.extend(glyphs);
                document.arcs.extend(arcs);
            }
            Err(err) => diagnostics.push(err.into()),
        }
    }

    for label in map.text_labels() {
        if NUMERIC_LABEL_RE.is_match(&label.text) {
            continue;
        }
        document.glyphs.push(Glyph::new(
            format!("an_{}", label.id),
            GlyphClass::Annotation,
            Some(label.text.clone()),
            BoundingBox {
                x: label.x + shift.x,
                y: label.y + shift.y,
                width: label.width.unwrap_or(options.label_width),
                height: label.height.unwrap_or(options.label_height),
            },
        ));
    }
    document
}

/// The process glyph of a reaction, followed by the source or sink glyph a
/// single-participant reaction needs, and the reaction's arcs.
fn process(
    map: &Map,
    reaction: &Reaction,
    config: &Config,
    shift: Point,
    diagnostics: &mut Diagnostics,
) -> Result<(Vec<Glyph>, Vec<Arc>), StructuralError> {
    let midmarker = reaction
        .midmarker
        .as_deref()
        .and_then(|id| map.node(id))
        .ok_or_else(|| StructuralError::MissingMidmarker(reaction.id.clone()))?;
    let direction = config.export.curve_direction;
    let curves = stitch_reaction(map, &reaction.id, direction, diagnostics)?;
    let (width, height) = config.export.reaction_node_size();

    let glyph_id = process_glyph_id(&reaction.id);
    let mut glyph = Glyph::new(
        glyph_id.clone(),
        GlyphClass::Process,
        Some(reaction.display_id().to_string()),
        BoundingBox::centred(midmarker.position().translate(shift), width, height),
    );

    let mut ports: BTreeMap<String, Port> = BTreeMap::new();
    for segment_id in midmarker.connected_segments(&reaction.id) {
        let Some(neighbour) = reaction
            .segment(segment_id)
            .and_then(|s| s.other_end(&midmarker.id))
            .and_then(|id| map.node(id))
        else {
            continue;
        };
        if neighbour.is_multimarker() {
            let position = neighbour.position().translate(shift);
            ports.insert(
                neighbour.id.clone(),
                Port {
                    id: port_id(&glyph_id, &neighbour.id),
                    x: position.x,
                    y: position.y,
                },
            );
        }
    }

    let mut arcs = Vec::with_capacity(curves.curves.len());
    for stitched in &curves.curves {
        let class = match stitched.role {
            Role::Substrate => ArcClass::Consumption,
            Role::Product => ArcClass::Production,
            Role::Undefined => {
                diagnostics.push(Diagnostic::Skipped {
                    kind: "arc",
                    id: stitched.participant_id.clone(),
                    reason: "participant without a role".to_string(),
                });
                continue;
            }
        };
        let attachment = reaction_attachment(reaction, stitched, &midmarker.id)
            .and_then(|node_id| ports.get(node_id))
            .map(|port| port.id.clone())
            .unwrap_or_else(|| glyph_id.clone());
        let chemical = chemical_glyph_id(&stitched.metabolite_node_id);
        let (source, target) = match class {
            ArcClass::Production => (attachment, chemical),
            _ => (chemical, attachment),
        };

        let mut curve = stitched.curve.translated(shift);
        if curve_starts_at_metabolite(stitched.role, direction) == stitched.role.is_product() {
            curve.reverse();
        }
        let Some(arc) = arc_from_curve(
            format!("r{}_n{}", reaction.id, stitched.metabolite_node_id),
            class,
            source,
            target,
            &curve,
        ) else {
            continue;
        };
        let magnitude = reaction
            .metabolite(&stitched.participant_id)
            .and_then(|m| m.coefficient)
            .map(f64::abs);
        arcs.push(Arc {
            cardinality: magnitude.filter(|m| (m - 1.0).abs() > f64::EPSILON),
            ..arc
        });
    }

    glyph.ports = ports.into_values().collect();
    let mut glyphs = vec![glyph];
    if let Some((empty_set, arc)) = boundary_glyph(map, reaction, config, shift) {
        glyphs.push(empty_set);
        arcs.push(arc);
    }
    Ok((glyphs, arcs))
}

fn boundary_glyph(map: &Map, reaction: &Reaction, config: &Config, shift: Point) -> Option<(Glyph, Arc)> {
    let boundary = reaction_boundary(map, &reaction.id)?;
    let node = map.node(&boundary.metabolite_node_id)?;
    let (width, height) = config.export.node_size(node.is_primary());
    let process_id = process_glyph_id(&reaction.id);
    let glyph = Glyph::new(
        format!("{process_id}_{}", boundary.kind.suffix()),
        GlyphClass::SourceAndSink,
        None,
        BoundingBox::centred(
            boundary.anchor.translate(shift),
            node.width.unwrap_or(width),
            node.height.unwrap_or(height),
        ),
    );
    let (class, source, target) = if boundary.role.is_product() {
        (ArcClass::Production, process_id, glyph.id.clone())
    } else {
        (ArcClass::Consumption, glyph.id.clone(), process_id)
    };
    let arc = arc_from_curve(
        format!("r{}_n{}_{}", reaction.id, node.id, boundary.kind.suffix()),
        class,
        source,
        target,
        &boundary.curve().translated(shift),
    )?;
    let magnitude = reaction
        .metabolite(&boundary.participant_id)
        .and_then(|m| m.coefficient)
        .map(f64::abs);
    log::debug!("added {} glyph for reaction {}", boundary.kind.suffix(), reaction.id);
    Some((
        glyph,
        Arc {
            cardinality: magnitude.filter(|m| (m - 1.0).abs() > f64::EPSILON),
            ..arc
        },
    ))
}

/// The node next to the midmarker on a participant's curve.
fn reaction_attachment<'a>(
    reaction: &'a Reaction,
    stitched: &StitchedCurve,
    midmarker_id: &str,
) -> Option<&'a str> {
    if stitched.segment_ids.len() < 2 {
        return None;
    }
    stitched
        .segment_ids
        .iter()
        .filter_map(|id| reaction.segment(id))
        .find_map(|segment| segment.other_end(midmarker_id))
}

fn arc_from_curve(id: String, class: ArcClass, source: String, target: String, curve: &Curve) -> Option<Arc> {
    let (last, inner) = curve.hops.split_last()?;
    Some(Arc {
        id,
        class,
        source,
        target,
        start: curve.start()?,
        next: inner.iter().map(|hop| ArcPoint::at(hop.end, hop)).collect(),
        end: ArcPoint::at(last.end, last),
        cardinality: None,
    })
}

/// Reads a notation document into an unlinked map.
///
/// Simple chemicals become metabolite nodes labelled by their external id,
/// processes become midmarkers with one reaction each, and every arc is
/// decomposed into multimarkers and segments.
pub fn import_notation(
    document: &NotationDocument,
    diagnostics: &mut Diagnostics,
) -> Result<Map, ConvertError> {
    let mut map = Map::new();
    map.id = document.id.clone();
    map.canvas.width = Some(document.bbox.width);
    map.canvas.height = Some(document.bbox.height);

    let mut owners: BTreeMap<&str, &str> = BTreeMap::new();
    let mut boundaries: BTreeSet<&str> = BTreeSet::new();
    let mut unnamed = 0usize;
    for glyph in &document.glyphs {
        if glyph.id.is_empty() {
            return Err(ConvertError::MalformedDocument(format!(
                "{} glyph without id",
                glyph.class.as_str()
            )));
        }
        let centre = glyph.bbox.centre();
        match &glyph.class {
            GlyphClass::SimpleChemical => {
                let external_id = glyph.label.clone().unwrap_or_else(|| glyph.id.clone());
                let mut node = Node::metabolite(glyph.id.clone(), external_id, centre.x, centre.y);
                node.name = glyph.label.clone();
                node.width = Some(glyph.bbox.width);
                node.height = Some(glyph.bbox.height);
                replace_warning(map.add_node(node).is_some(), "node", &glyph.id, diagnostics);
            }
            GlyphClass::Process => {
                let node = Node::new(glyph.id.clone(), NodeKind::Midmarker, centre.x, centre.y);
                replace_warning(map.add_node(node).is_some(), "node", &glyph.id, diagnostics);
                let name = glyph.label.clone().unwrap_or_else(|| {
                    unnamed += 1;
                    format!("R{unnamed}")
                });
                let mut reaction = Reaction::new(glyph.id.clone());
                reaction.external_id = Some(name.clone());
                reaction.name = Some(name);
                reaction.label_x = Some(glyph.bbox.x);
                reaction.label_y = Some(glyph.bbox.y);
                reaction.midmarker = Some(glyph.id.clone());
                replace_warning(map.add_reaction(reaction).is_some(), "reaction", &glyph.id, diagnostics);
                for port in &glyph.ports {
                    owners.insert(&port.id, &glyph.id);
                }
            }
            GlyphClass::SourceAndSink => {
                boundaries.insert(&glyph.id);
            }
            GlyphClass::Compartment => {
                map.add_compartment(Compartment {
                    id: glyph.id.clone(),
                    name: glyph.label.clone(),
                    x: glyph.bbox.x,
                    y: glyph.bbox.y,
                    width: glyph.bbox.width,
                    height: glyph.bbox.height,
                });
            }
            GlyphClass::Annotation => {
                let mut label = TextLabel::new(
                    glyph.id.clone(),
                    glyph.label.clone().unwrap_or_default(),
                    glyph.bbox.x,
                    glyph.bbox.y,
                );
                label.width = Some(glyph.bbox.width);
                label.height = Some(glyph.bbox.height);
                map.add_text_label(label);
            }
            GlyphClass::Other(class) => diagnostics.push(Diagnostic::Skipped {
                kind: "glyph",
                id: glyph.id.clone(),
                reason: format!("unsupported class {class}"),
            }),
        }
    }

    for arc in &document.arcs {
        if boundaries.contains(arc.source.as_str()) || boundaries.contains(arc.target.as_str()) {
            log::debug!("arc {} ends at a source or sink", arc.id);
            continue;
        }
        import_arc(&mut map, arc, &owners, diagnostics);
    }
    Ok(map)
}

fn replace_warning(replaced: bool, kind: &'static str, id: &str, diagnostics: &mut Diagnostics) {
    if replaced {
        diagnostics.push(Diagnostic::ReplacedEntity {
            kind,
            id: id.to_string(),
        });
    }
}

fn import_arc(
    map: &mut Map,
    arc: &Arc,
    owners: &BTreeMap<&str, &str>,
    diagnostics: &mut Diagnostics,
) {
    let skip = |reason: String| Diagnostic::Skipped {
        kind: "arc",
        id: arc.id.clone(),
        reason,
    };
    let resolve = |id: &str| owners.get(id).copied().unwrap_or(id).to_string();
    let (chemical, process) = match arc.class {
        ArcClass::Consumption => (resolve(&arc.source), resolve(&arc.target)),
        ArcClass::Production => (resolve(&arc.target), resolve(&arc.source)),
        ArcClass::Other(ref class) => {
            diagnostics.push(skip(format!("unsupported class {class}")));
            return;
        }
    };
    let Some((external_id, metabolite_position)) = map
        .node(&chemical)
        .filter(|node| node.is_metabolite())
        .map(|node| (node.external_id.clone().unwrap_or_else(|| node.id.clone()), node.position()))
    else {
        diagnostics.push(skip(format!("{chemical} is not a simple chemical")));
        return;
    };
    let Some(process_position) = map.node(&process).filter(|node| node.is_midmarker()).map(Node::position)
    else {
        diagnostics.push(skip(format!("{process} is not a process")));
        return;
    };

    let role = arc.class.role();
    let magnitude = arc.cardinality.unwrap_or(1.0).abs();
    let coefficient = if role.is_product() { magnitude } else { -magnitude };
    let mut participant = Metabolite::new(external_id.clone(), Some(coefficient));
    participant.node_ref_id = Some(chemical.clone());
    if let Some(reaction) = map.reaction_mut(&process) {
        if reaction.add_metabolite(participant).is_some() {
            diagnostics.push(Diagnostic::ReplacedEntity {
                kind: "participant",
                id: external_id.clone(),
            });
        }
    }

    let curve = ParticipantCurve {
        id: arc.id.clone(),
        participant_id: external_id,
        metabolite_node_id: chemical,
        midmarker_id: process.clone(),
        role,
        curve: flow_oriented(&arc.curve(), metabolite_position, process_position, role),
    };
    if let Err(err) = decompose_curve(map, &process, &curve) {
        diagnostics.push(err.into());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Segment;
    use crate::topology::linker::link_map;

    fn linked_map() -> Map {
        let mut map = Map::new();
        map.add_node(Node::metabolite("S", "atp_c", 0.0, 0.0));
        map.add_node(Node::metabolite("P", "adp_c", 200.0, 0.0));
        map.add_node(Node::metabolite("H", "h_c", 100.0, 80.0));
        map.add_node(Node::new("M", NodeKind::Midmarker, 100.0, 0.0));
        map.add_node(Node::new("x", NodeKind::Multimarker, 150.0, 0.0));
        map.add_node(Node::new("E", NodeKind::Exchange, 400.0, 400.0));
        let mut reaction = Reaction::new("R");
        reaction.external_id = Some("ATPS".to_string());
        reaction.add_metabolite(Metabolite::new("atp_c", Some(-1.0)));
        reaction.add_metabolite(Metabolite::new("adp_c", Some(1.0)));
        reaction.add_metabolite(Metabolite::new("h_c", Some(2.0)));
        reaction.add_segment(Segment::new("0", "S", "M"));
        reaction.add_segment(Segment::new("1", "M", "x"));
        reaction.add_segment(
            Segment::new("2", "x", "P").with_controls(Point::new(170.0, 10.0), Point::new(190.0, 10.0)),
        );
        reaction.add_segment(Segment::new("3", "M", "H"));
        map.add_reaction(reaction);
        map.add_text_label(TextLabel::new("t1", "ATP synthase", 10.0, 10.0));
        map.add_text_label(TextLabel::new("t2", "3", 10.0, 10.0));
        link_map(&mut map, &mut Diagnostics::new());
        map
    }

    fn arc<'a>(document: &'a NotationDocument, id: &str) -> &'a Arc {
        document.arcs.iter().find(|a| a.id == id).unwrap()
    }

    #[test]
    fn exports_process_with_ports() {
        let mut diagnostics = Diagnostics::new();
        let document = export_notation(&linked_map(), &Config::default(), &mut diagnostics);
        assert!(matches!(
            diagnostics.iter().next(),
            Some(Diagnostic::UnsupportedNode { kind: "exchange", .. })
        ));
        let process = document.glyphs.iter().find(|g| g.class == GlyphClass::Process).unwrap();
        assert_eq!(process.id, "pr_R");
        assert_eq!(process.label.as_deref(), Some("ATPS"));
        assert_eq!(process.ports.len(), 1);
        assert_eq!(process.ports[0].id, "pr_R_x");
        assert_eq!(document.arcs.len(), 3);

        let annotations: Vec<_> = document
            .glyphs
            .iter()
            .filter(|g| g.class == GlyphClass::Annotation)
            .collect();
        assert_eq!(annotations.len(), 1);
    }

    #[test]
    fn arcs_follow_the_flow() {
        let document = export_notation(&linked_map(), &Config::default(), &mut Diagnostics::new());
        let consumption = arc(&document, "rR_nS");
        assert_eq!(consumption.class, ArcClass::Consumption);
        assert_eq!((consumption.source.as_str(), consumption.target.as_str()), ("sc_S", "pr_R"));
        assert_eq!(consumption.start, Point::new(0.0, 0.0));
        assert_eq!(consumption.cardinality, None);

        let production = arc(&document, "rR_nP");
        assert_eq!((production.source.as_str(), production.target.as_str()), ("pr_R_x", "sc_P"));
        assert_eq!(production.start, Point::new(100.0, 0.0));
        assert_eq!(production.next.len(), 1);
        assert_eq!(production.end.position(), Point::new(200.0, 0.0));
        assert_eq!(production.end.controls.len(), 2);

        assert_eq!(arc(&document, "rR_nH").cardinality, Some(2.0));
    }

    #[test]
    fn glyphs_and_annotations_share_the_canvas_frame() {
        let mut map = linked_map();
        map.canvas.x = -100.0;
        map.canvas.y = -50.0;
        let document = export_notation(&map, &Config::default(), &mut Diagnostics::new());
        let chemical = document.glyphs.iter().find(|g| g.id == "sc_S").unwrap();
        assert_eq!(chemical.bbox.centre(), Point::new(100.0, 50.0));
        let annotation = document.glyphs.iter().find(|g| g.id == "an_t1").unwrap();
        assert_eq!((annotation.bbox.x, annotation.bbox.y), (110.0, 60.0));
        let process = document.glyphs.iter().find(|g| g.id == "pr_R").unwrap();
        assert_eq!(process.bbox.centre(), Point::new(200.0, 50.0));
        assert_eq!((process.ports[0].x, process.ports[0].y), (250.0, 50.0));
        assert_eq!(arc(&document, "rR_nS").start, Point::new(100.0, 50.0));
    }

    #[test]
    fn configured_direction_does_not_change_arcs() {
        let mut config = Config::default();
        config.export.curve_direction = crate::topology::stitcher::CurveDirection::MetaboliteToReaction;
        let document = export_notation(&linked_map(), &config, &mut Diagnostics::new());
        let production = arc(&document, "rR_nP");
        assert_eq!(production.start, Point::new(100.0, 0.0));
        assert_eq!(production.end.position(), Point::new(200.0, 0.0));
    }

    #[test]
    fn round_trips_participants() {
        let original = linked_map();
        let document = export_notation(&original, &Config::default(), &mut Diagnostics::new());
        let mut diagnostics = Diagnostics::new();
        let map = import_notation(&document, &mut diagnostics).unwrap();
        assert!(diagnostics.is_empty(), "{diagnostics:?}");

        let reaction = map.reaction("pr_R").unwrap();
        assert_eq!(reaction.metabolite_count(), 3);
        assert_eq!(reaction.metabolite("atp_c").unwrap().coefficient, Some(-1.0));
        assert_eq!(reaction.metabolite("h_c").unwrap().coefficient, Some(2.0));
        assert_eq!(reaction.segment_count(), original.reaction("R").unwrap().segment_count());
        assert_eq!(map.node("sc_S").unwrap().external_id.as_deref(), Some("atp_c"));
    }

    fn boundary_map(coefficient: f64) -> Map {
        let mut map = Map::new();
        map.canvas.x = -10.0;
        map.add_node(Node::metabolite("G", "glc__D_e", 0.0, 0.0));
        map.add_node(Node::new("M", NodeKind::Midmarker, 60.0, 0.0));
        let mut reaction = Reaction::new("EX");
        reaction.external_id = Some("EX_glc__D_e".to_string());
        reaction.add_metabolite(Metabolite::new("glc__D_e", Some(coefficient)));
        reaction.add_segment(Segment::new("0", "G", "M"));
        map.add_reaction(reaction);
        link_map(&mut map, &mut Diagnostics::new());
        map
    }

    #[test]
    fn boundary_reaction_ends_in_source_or_sink() {
        let mut diagnostics = Diagnostics::new();
        let document = export_notation(&boundary_map(-1.0), &Config::default(), &mut diagnostics);
        assert!(diagnostics.is_empty(), "{diagnostics:?}");
        let sink = document
            .glyphs
            .iter()
            .find(|g| g.class == GlyphClass::SourceAndSink)
            .unwrap();
        assert_eq!(sink.id, "pr_EX_sink");
        assert_eq!(sink.bbox.centre(), Point::new(130.0, 0.0));
        let drain = arc(&document, "rEX_nG_sink");
        assert_eq!(drain.class, ArcClass::Production);
        assert_eq!((drain.source.as_str(), drain.target.as_str()), ("pr_EX", "pr_EX_sink"));
        assert_eq!(drain.start, Point::new(70.0, 0.0));
        assert_eq!(drain.end.position(), Point::new(130.0, 0.0));
        assert_eq!(arc(&document, "rEX_nG").class, ArcClass::Consumption);

        let source = export_notation(&boundary_map(2.0), &Config::default(), &mut Diagnostics::new());
        let feed = arc(&source, "rEX_nG_source");
        assert_eq!(feed.class, ArcClass::Consumption);
        assert_eq!((feed.source.as_str(), feed.target.as_str()), ("pr_EX_source", "pr_EX"));
        assert_eq!(feed.cardinality, Some(2.0));

        let mut diagnostics = Diagnostics::new();
        let map = import_notation(&document, &mut diagnostics).unwrap();
        assert!(diagnostics.is_empty(), "{diagnostics:?}");
        assert_eq!(map.reaction("pr_EX").unwrap().metabolite_count(), 1);
        assert_eq!(map.node_count(), 2);
    }

    #[test]
    fn names_unlabelled_processes() {
        let document = NotationDocument {
            glyphs: vec![
                Glyph::new("p1".into(), GlyphClass::Process, None, BoundingBox::default()),
                Glyph::new("p2".into(), GlyphClass::Process, None, BoundingBox::default()),
                Glyph::new("g".into(), GlyphClass::Other("macromolecule".into()), None, BoundingBox::default()),
            ],
            ..NotationDocument::default()
        };
        let mut diagnostics = Diagnostics::new();
        let map = import_notation(&document, &mut diagnostics).unwrap();
        assert_eq!(map.reaction("p1").unwrap().name.as_deref(), Some("R1"));
        assert_eq!(map.reaction("p2").unwrap().name.as_deref(), Some("R2"));
        assert!(matches!(diagnostics.iter().next(), Some(Diagnostic::Skipped { kind: "glyph", .. })));
    }

    #[test]
    fn parses_class_keywords() {
        let glyph: Glyph = serde_json::from_str(
            r#"{"id":"g1","class":"simple chemical","label":"glc__D_c","bbox":{"x":0,"y":0,"width":30,"height":30}}"#,
        )
        .unwrap();
        assert_eq!(glyph.class, GlyphClass::SimpleChemical);
        let value = serde_json::to_value(&glyph).unwrap();
        assert_eq!(value["class"], "simple chemical");
    }
}
