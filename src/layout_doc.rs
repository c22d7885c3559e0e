use std::collections::BTreeSet;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::diagnostics::{ConvertError, Diagnostic, Diagnostics, StructuralError};
use crate::model::{
    Canvas, Compartment, Map, Metabolite, Node, NodeKind, Point, Reaction, Role, TextLabel,
};
use crate::topology::boundary::{Boundary, reaction_boundary};
use crate::topology::compartments::infer_compartments;
use crate::topology::decomposer::{ParticipantCurve, decompose_curve, flow_oriented};
use crate::topology::linker::validate_reaction;
use crate::topology::stitcher::{curve_starts_at_metabolite, stitch_reaction};
use crate::topology::types::Curve;

/// Numeric-only text labels carry cardinalities and are not exported.
pub(crate) static NUMERIC_LABEL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*[+-]?\d+(\.\d+)?\s*$").unwrap());

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Dimensions {
    pub width: f64,
    pub height: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl BoundingBox {
    /// A box of the given size centred on `centre`.
    pub fn centred(centre: Point, width: f64, height: f64) -> Self {
        Self {
            x: centre.x - width / 2.0,
            y: centre.y - height / 2.0,
            width,
            height,
        }
    }

    pub fn centre(&self) -> Point {
        Point::new(self.x + self.width / 2.0, self.y + self.height / 2.0)
    }
}

/// A layout-annotated reaction network.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutDocument {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub dimensions: Dimensions,
    /// Compartments referenced by species glyphs.
    #[serde(default)]
    pub compartments: Vec<CompartmentEntry>,
    #[serde(default)]
    pub compartment_glyphs: Vec<CompartmentGlyph>,
    #[serde(default)]
    pub species_glyphs: Vec<SpeciesGlyph>,
    #[serde(default)]
    pub reaction_glyphs: Vec<ReactionGlyph>,
    #[serde(default)]
    pub text_glyphs: Vec<TextGlyph>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompartmentEntry {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompartmentGlyph {
    pub id: String,
    pub compartment: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub bounding_box: BoundingBox,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpeciesGlyph {
    pub id: String,
    pub species: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compartment: Option<String>,
    /// Empty set drawn for the missing side of a boundary reaction.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub boundary: bool,
    pub bounding_box: BoundingBox,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReactionGlyph {
    pub id: String,
    pub reaction: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reversible: Option<bool>,
    pub bounding_box: BoundingBox,
    #[serde(default)]
    pub species_reference_glyphs: Vec<SpeciesReferenceGlyph>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpeciesReferenceGlyph {
    pub id: String,
    pub species_glyph: String,
    pub species: String,
    pub role: SpeciesRole,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stoichiometry: Option<f64>,
    #[serde(default)]
    pub curve: Curve,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SpeciesRole {
    Substrate,
    Product,
    Sidesubstrate,
    Sideproduct,
    Undefined,
}

impl SpeciesRole {
    pub fn from_participant(role: Role, is_primary: bool) -> Self {
        match (role, is_primary) {
            (Role::Substrate, true) => Self::Substrate,
            (Role::Substrate, false) => Self::Sidesubstrate,
            (Role::Product, true) => Self::Product,
            (Role::Product, false) => Self::Sideproduct,
            (Role::Undefined, _) => Self::Undefined,
        }
    }

    pub fn role(&self) -> Role {
        match self {
            Self::Substrate | Self::Sidesubstrate => Role::Substrate,
            Self::Product | Self::Sideproduct => Role::Product,
            Self::Undefined => Role::Undefined,
        }
    }

    pub fn is_side(&self) -> bool {
        matches!(self, Self::Sidesubstrate | Self::Sideproduct)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextGlyph {
    pub id: String,
    pub text: String,
    /// Species or reaction glyph this text labels, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub graphical_object: Option<String>,
    pub bounding_box: BoundingBox,
}

/// Writes a linked map as a layout document.
///
/// Reactions failing validation are left out and reported. Coordinates are
/// shifted so the canvas origin becomes (0, 0).
pub fn export_layout(map: &Map, config: &Config, diagnostics: &mut Diagnostics) -> LayoutDocument {
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

    let mut document = LayoutDocument {
        id: options.layout_id.clone(),
        name: (!options.layout_name.is_empty()).then(|| options.layout_name.clone()),
        dimensions: Dimensions {
            width: map.canvas.width.unwrap_or(options.canvas_default_width),
            height: map.canvas.height.unwrap_or(options.canvas_default_height),
        },
        ..LayoutDocument::default()
    };

    if options.infer_compartment_bounds {
        for compartment in map.compartments() {
            if config.compartments.is_excluded(&compartment.id)
                || compartment.id.eq_ignore_ascii_case(&options.default_compartment_id)
            {
                continue;
            }
            document.compartment_glyphs.push(CompartmentGlyph {
                id: format!("cg_{}", compartment.id),
                compartment: compartment.id.clone(),
                name: compartment.name.clone(),
                bounding_box: BoundingBox {
                    x: compartment.x + shift.x,
                    y: compartment.y + shift.y,
                    width: compartment.width,
                    height: compartment.height,
                },
            });
        }
    }

    let mut used_compartments = BTreeSet::new();
    for node in map.nodes() {
        match node.kind {
            NodeKind::Metabolite => {
                let glyph = species_glyph(node, config, shift);
                if let Some(code) = &glyph.compartment {
                    used_compartments.insert(code.clone());
                }
                if let Some(text) = node_label(node, config, shift) {
                    document.text_glyphs.push(text);
                }
                document.species_glyphs.push(glyph);
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
        match reaction_glyph(map, reaction, config, shift, diagnostics) {
            Ok(mut glyph) => {
                let boundary = reaction_boundary(map, &reaction.id);
                let label_anchor = boundary
                    .as_ref()
                    .and_then(Boundary::label_anchor)
                    .or_else(|| reaction.label_x.zip(reaction.label_y).map(|(x, y)| Point::new(x, y)));
                if let Some(boundary) = &boundary {
                    if let Some((species, reference)) = boundary_species(map, reaction, boundary, config, shift) {
                        document.species_glyphs.push(species);
                        glyph.species_reference_glyphs.push(reference);
                    }
                }
                if let Some(text) = reaction_label(reaction, &glyph.id, label_anchor, config, shift) {
                    document.text_glyphs.push(text);
                }
                document.reaction_glyphs.push(glyph);
            }
            Err(err) => diagnostics.push(err.into()),
        }
    }

    document.compartments = used_compartments
        .into_iter()
        .map(|id| {
            let name = if id == options.default_compartment_id {
                Some(options.default_compartment_name.clone())
            } else {
                map.compartment(&id)
                    .and_then(|c| c.name.clone())
                    .or_else(|| config.compartments.name(&id).map(String::from))
            };
            CompartmentEntry { id, name }
        })
        .collect();

    for label in map.text_labels() {
        if NUMERIC_LABEL_RE.is_match(&label.text) {
            continue;
        }
        let height = label.height.unwrap_or(options.label_height);
        document.text_glyphs.push(TextGlyph {
            id: format!("tg_{}", label.id),
            text: label.text.clone(),
            graphical_object: None,
            bounding_box: BoundingBox {
                x: label.x + shift.x,
                y: label.y + shift.y - height,
                width: label.width.unwrap_or(options.label_width),
                height,
            },
        });
    }
    document
}

/// Text glyphs sit above their anchor: the anchor is the lower-left corner.
fn anchored_text(id: String, text: String, object: String, anchor: Point, width: f64, height: f64) -> TextGlyph {
    TextGlyph {
        id,
        text,
        graphical_object: Some(object),
        bounding_box: BoundingBox {
            x: anchor.x,
            y: anchor.y - height,
            width,
            height,
        },
    }
}

fn node_label(node: &Node, config: &Config, shift: Point) -> Option<TextGlyph> {
    let (Some(x), Some(y)) = (node.label_x, node.label_y) else {
        return None;
    };
    let text = node.name.clone().or_else(|| node.external_id.clone())?;
    Some(anchored_text(
        format!("tg_node_{}", node.id),
        text,
        species_glyph_id(&node.id),
        Point::new(x, y).translate(shift),
        config.export.label_width,
        config.export.node_label_height,
    ))
}

fn reaction_label(
    reaction: &Reaction,
    glyph_id: &str,
    anchor: Option<Point>,
    config: &Config,
    shift: Point,
) -> Option<TextGlyph> {
    let anchor = anchor?;
    let text = reaction.name.clone().unwrap_or_else(|| reaction.display_id().to_string());
    Some(anchored_text(
        format!("tg_reaction_{}", reaction.id),
        text,
        glyph_id.to_string(),
        anchor.translate(shift),
        config.export.label_width,
        config.export.reaction_label_height,
    ))
}

fn species_glyph_id(node_id: &str) -> String {
    format!("sg_{node_id}")
}

fn species_glyph(node: &Node, config: &Config, shift: Point) -> SpeciesGlyph {
    let (default_width, default_height) = config.export.node_size(node.is_primary());
    let width = node.width.unwrap_or(default_width);
    let height = node.height.unwrap_or(default_height);
    SpeciesGlyph {
        id: species_glyph_id(&node.id),
        species: node.external_id.clone().unwrap_or_else(|| node.id.clone()),
        name: node.name.clone(),
        compartment: node
            .compartment()
            .or_else(|| Some(config.export.default_compartment_id.clone())),
        boundary: false,
        bounding_box: BoundingBox::centred(node.position().translate(shift), width, height),
    }
}

/// Species glyph and reference standing in for the missing side of a
/// single-participant reaction.
fn boundary_species(
    map: &Map,
    reaction: &Reaction,
    boundary: &Boundary,
    config: &Config,
    shift: Point,
) -> Option<(SpeciesGlyph, SpeciesReferenceGlyph)> {
    let node = map.node(&boundary.metabolite_node_id)?;
    let (default_width, default_height) = config.export.node_size(node.is_primary());
    let suffix = boundary.kind.suffix();
    let species = SpeciesGlyph {
        id: format!("{}_{suffix}", species_glyph_id(&node.id)),
        species: format!("{}_{suffix}", boundary.participant_id),
        name: None,
        compartment: None,
        boundary: true,
        bounding_box: BoundingBox::centred(
            boundary.anchor.translate(shift),
            node.width.unwrap_or(default_width),
            node.height.unwrap_or(default_height),
        ),
    };
    let mut curve = boundary.curve().translated(shift);
    if curve_starts_at_metabolite(boundary.role, config.export.curve_direction) == boundary.role.is_product() {
        curve.reverse();
    }
    let reference = SpeciesReferenceGlyph {
        id: format!("srg_{}_{}_{suffix}", reaction.id, node.id),
        species_glyph: species.id.clone(),
        species: species.species.clone(),
        role: SpeciesRole::from_participant(boundary.role, true),
        stoichiometry: reaction
            .metabolite(&boundary.participant_id)
            .and_then(|m| m.coefficient)
            .map(f64::abs),
        curve,
    };
    log::debug!("added {suffix} species for reaction {}", reaction.id);
    Some((species, reference))
}

fn reaction_glyph(
    map: &Map,
    reaction: &Reaction,
    config: &Config,
    shift: Point,
    diagnostics: &mut Diagnostics,
) -> Result<ReactionGlyph, StructuralError> {
    let midmarker = reaction
        .midmarker
        .as_deref()
        .and_then(|id| map.node(id))
        .ok_or_else(|| StructuralError::MissingMidmarker(reaction.id.clone()))?;
    let curves = stitch_reaction(map, &reaction.id, config.export.curve_direction, diagnostics)?;
    let (width, height) = config.export.reaction_node_size();

    let mut references = Vec::with_capacity(curves.curves.len());
    for stitched in curves.curves {
        let Some(node) = map.node(&stitched.metabolite_node_id) else {
            continue;
        };
        let coefficient = reaction
            .metabolite(&stitched.participant_id)
            .and_then(|m| m.coefficient);
        references.push(SpeciesReferenceGlyph {
            id: format!("srg_{}_{}", reaction.id, node.id),
            species_glyph: species_glyph_id(&node.id),
            species: stitched.participant_id.clone(),
            role: SpeciesRole::from_participant(stitched.role, node.is_primary()),
            stoichiometry: coefficient.map(f64::abs),
            curve: stitched.curve.translated(shift),
        });
    }

    Ok(ReactionGlyph {
        id: format!("rg_{}", reaction.id),
        reaction: reaction.display_id().to_string(),
        name: reaction.name.clone(),
        reversible: reaction.reversibility,
        bounding_box: BoundingBox::centred(midmarker.position().translate(shift), width, height),
        species_reference_glyphs: references,
    })
}

/// Reads a layout document into an unlinked map.
///
/// Species glyphs become metabolite nodes and reaction glyphs become midmarker
/// nodes with their reactions. Every species reference curve is decomposed
/// into multimarkers and segments.
pub fn import_layout(
    document: &LayoutDocument,
    diagnostics: &mut Diagnostics,
) -> Result<Map, ConvertError> {
    if document.id.is_empty() {
        return Err(ConvertError::MalformedDocument("layout without id".to_string()));
    }
    let mut map = Map::new();
    map.id = Some(document.id.clone());
    map.name = document.name.clone();
    map.canvas = Canvas {
        x: 0.0,
        y: 0.0,
        width: Some(document.dimensions.width),
        height: Some(document.dimensions.height),
    };

    for glyph in &document.compartment_glyphs {
        map.add_compartment(Compartment {
            id: glyph.compartment.clone(),
            name: glyph.name.clone(),
            x: glyph.bounding_box.x,
            y: glyph.bounding_box.y,
            width: glyph.bounding_box.width,
            height: glyph.bounding_box.height,
        });
    }

    let mut boundaries = BTreeSet::new();
    for glyph in &document.species_glyphs {
        if glyph.boundary {
            boundaries.insert(glyph.id.as_str());
            continue;
        }
        let centre = glyph.bounding_box.centre();
        let mut node = Node::metabolite(glyph.id.clone(), glyph.species.clone(), centre.x, centre.y);
        node.name = glyph.name.clone();
        node.width = Some(glyph.bounding_box.width);
        node.height = Some(glyph.bounding_box.height);
        if map.add_node(node).is_some() {
            diagnostics.push(Diagnostic::ReplacedEntity {
                kind: "node",
                id: glyph.id.clone(),
            });
        }
    }

    for glyph in &document.reaction_glyphs {
        import_reaction_glyph(&mut map, glyph, &boundaries, diagnostics);
    }

    for glyph in &document.text_glyphs {
        let bbox = glyph.bounding_box;
        let anchor = Point::new(bbox.x, bbox.y + bbox.height);
        if let Some(object) = &glyph.graphical_object {
            // Reaction glyphs share their id with their midmarker node.
            if let Some(reaction) = map.reaction_mut(object) {
                reaction.label_x = Some(anchor.x);
                reaction.label_y = Some(anchor.y);
            } else if let Some(node) = map.node_mut(object) {
                node.label_x = Some(anchor.x);
                node.label_y = Some(anchor.y);
            } else {
                diagnostics.push(Diagnostic::Skipped {
                    kind: "text glyph",
                    id: glyph.id.clone(),
                    reason: format!("unknown graphical object {object}"),
                });
            }
            continue;
        }
        let mut label = TextLabel::new(glyph.id.clone(), glyph.text.clone(), anchor.x, anchor.y);
        label.width = Some(bbox.width);
        label.height = Some(bbox.height);
        map.add_text_label(label);
    }
    Ok(map)
}

fn import_reaction_glyph(
    map: &mut Map,
    glyph: &ReactionGlyph,
    boundaries: &BTreeSet<&str>,
    diagnostics: &mut Diagnostics,
) {
    let centre = glyph.bounding_box.centre();
    if map.node(&glyph.id).is_some() {
        diagnostics.push(Diagnostic::ReplacedEntity {
            kind: "node",
            id: glyph.id.clone(),
        });
    }
    map.add_node(Node::new(glyph.id.clone(), NodeKind::Midmarker, centre.x, centre.y));

    let mut reaction = Reaction::new(glyph.id.clone());
    reaction.external_id = Some(glyph.reaction.clone());
    reaction.name = glyph.name.clone();
    reaction.reversibility = glyph.reversible;
    reaction.midmarker = Some(glyph.id.clone());
    if map.add_reaction(reaction).is_some() {
        diagnostics.push(Diagnostic::ReplacedEntity {
            kind: "reaction",
            id: glyph.id.clone(),
        });
    }

    for reference in &glyph.species_reference_glyphs {
        if boundaries.contains(reference.species_glyph.as_str()) {
            log::debug!("species reference {} ends at a boundary", reference.id);
            continue;
        }
        let Some(metabolite_position) = map.node(&reference.species_glyph).map(Node::position) else {
            diagnostics.push(Diagnostic::Skipped {
                kind: "species reference",
                id: reference.id.clone(),
                reason: format!("unknown species glyph {}", reference.species_glyph),
            });
            continue;
        };
        if let Some(node) = map.node_mut(&reference.species_glyph) {
            node.is_primary = Some(!reference.role.is_side());
        }

        let role = reference.role.role();
        let magnitude = reference.stoichiometry.unwrap_or(1.0).abs();
        let coefficient = match role {
            Role::Substrate => Some(-magnitude),
            Role::Product => Some(magnitude),
            Role::Undefined => {
                diagnostics.push(Diagnostic::UndefinedCoefficient {
                    reaction: glyph.reaction.clone(),
                    participant: reference.species.clone(),
                });
                None
            }
        };
        let mut participant = Metabolite::new(reference.species.clone(), coefficient);
        participant.node_ref_id = Some(reference.species_glyph.clone());
        if let Some(reaction) = map.reaction_mut(&glyph.id) {
            if reaction.add_metabolite(participant).is_some() {
                diagnostics.push(Diagnostic::ReplacedEntity {
                    kind: "participant",
                    id: reference.species.clone(),
                });
            }
        }

        let curve = ParticipantCurve {
            id: reference.id.clone(),
            participant_id: reference.species.clone(),
            metabolite_node_id: reference.species_glyph.clone(),
            midmarker_id: glyph.id.clone(),
            role,
            curve: flow_oriented(&reference.curve, metabolite_position, centre, role),
        };
        if let Err(err) = decompose_curve(map, &glyph.id, &curve) {
            diagnostics.push(err.into());
        }
    }
}
