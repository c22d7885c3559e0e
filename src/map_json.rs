use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

use crate::diagnostics::{ConvertError, Diagnostic, Diagnostics};
use crate::model::{Canvas, Gene, Map, Metabolite, Node, NodeKind, Point, Reaction, Segment, TextLabel};
use crate::topology::splitter::split_reaction;

#[derive(Debug, Default, Serialize, Deserialize)]
struct MapMeta {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    map_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    map_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    map_description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    homepage: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    schema: Option<String>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct MapContent {
    #[serde(default)]
    reactions: Option<BTreeMap<String, RawReaction>>,
    #[serde(default)]
    nodes: Option<BTreeMap<String, RawNode>>,
    #[serde(default)]
    text_labels: Option<BTreeMap<String, RawTextLabel>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    canvas: Option<RawCanvas>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct RawNode {
    #[serde(default)]
    node_type: Option<String>,
    #[serde(default)]
    x: Option<f64>,
    #[serde(default)]
    y: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    label_x: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    label_y: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    width: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    height: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    bigg_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    node_is_primary: Option<bool>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct RawReaction {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    bigg_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    reversibility: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    label_x: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    label_y: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    gene_reaction_rule: Option<String>,
    #[serde(default)]
    genes: Option<Vec<RawGene>>,
    #[serde(default)]
    metabolites: Option<Vec<RawMetabolite>>,
    #[serde(default)]
    segments: Option<BTreeMap<String, RawSegment>>,
}

#[derive(Debug, Serialize, Deserialize)]
struct RawGene {
    bigg_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    name: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
struct RawMetabolite {
    bigg_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    coefficient: Option<f64>,
}

#[derive(Debug, Serialize, Deserialize)]
struct RawSegment {
    #[serde(default)]
    from_node_id: Option<String>,
    #[serde(default)]
    to_node_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    b1: Option<Point>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    b2: Option<Point>,
}

#[derive(Debug, Serialize, Deserialize)]
struct RawTextLabel {
    #[serde(default)]
    text: String,
    x: f64,
    y: f64,
}

#[derive(Debug, Serialize, Deserialize)]
struct RawCanvas {
    #[serde(default)]
    x: f64,
    #[serde(default)]
    y: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    width: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    height: Option<f64>,
}

/// Parses map JSON text. See [`map_from_value`].
pub fn parse_map(input: &str, diagnostics: &mut Diagnostics) -> Result<Map, ConvertError> {
    let value: Value = serde_json::from_str(input)?;
    map_from_value(value, diagnostics)
}

/// Builds an unlinked map from the two-element `[meta, content]` array.
///
/// Reactions spanning several midmarkers are split before they are added.
pub fn map_from_value(value: Value, diagnostics: &mut Diagnostics) -> Result<Map, ConvertError> {
    let Value::Array(parts) = value else {
        return Err(ConvertError::MalformedContainer(
            "expected a two-element array".to_string(),
        ));
    };
    let [meta, content]: [Value; 2] = parts.try_into().map_err(|parts: Vec<Value>| {
        ConvertError::MalformedContainer(format!(
            "expected a two-element array, found {} elements",
            parts.len()
        ))
    })?;
    let meta: MapMeta = serde_json::from_value(meta)
        .map_err(|err| ConvertError::MalformedContainer(format!("meta information: {err}")))?;
    let content: MapContent = serde_json::from_value(content)
        .map_err(|err| ConvertError::MalformedContainer(format!("map content: {err}")))?;

    let mut map = Map::new();
    map.name = meta.map_name;
    map.id = meta.map_id;
    map.description = meta.map_description;
    map.homepage = meta.homepage;
    map.schema = meta.schema;
    if let Some(canvas) = content.canvas {
        map.canvas = Canvas {
            x: canvas.x,
            y: canvas.y,
            width: canvas.width,
            height: canvas.height,
        };
    }

    for (id, raw) in content.nodes.unwrap_or_default() {
        if let Some(node) = read_node(&id, raw, diagnostics) {
            map.add_node(node);
        }
    }

    for (id, raw) in content.text_labels.unwrap_or_default() {
        map.add_text_label(TextLabel::new(id, raw.text, raw.x, raw.y));
    }

    for (id, raw) in content.reactions.unwrap_or_default() {
        let reaction = read_reaction(&id, raw, diagnostics);
        for part in split_reaction(&map, reaction, diagnostics) {
            let part_id = part.id.clone();
            if map.add_reaction(part).is_some() {
                diagnostics.push(Diagnostic::ReplacedEntity {
                    kind: "reaction",
                    id: part_id,
                });
            }
        }
    }
    Ok(map)
}

fn read_node(id: &str, raw: RawNode, diagnostics: &mut Diagnostics) -> Option<Node> {
    let token = raw.node_type.unwrap_or_default();
    let Some(kind) = NodeKind::from_token(&token) else {
        diagnostics.push(Diagnostic::Skipped {
            kind: "node",
            id: id.to_string(),
            reason: format!("unknown node type '{token}'"),
        });
        return None;
    };
    let (Some(x), Some(y)) = (raw.x, raw.y) else {
        diagnostics.push(Diagnostic::Skipped {
            kind: "node",
            id: id.to_string(),
            reason: "missing coordinates".to_string(),
        });
        return None;
    };
    let mut node = Node::new(id, kind, x, y);
    node.label_x = raw.label_x;
    node.label_y = raw.label_y;
    node.width = raw.width;
    node.height = raw.height;
    node.external_id = raw.bigg_id;
    node.name = raw.name;
    node.is_primary = raw.node_is_primary;
    Some(node)
}

fn read_reaction(id: &str, raw: RawReaction, diagnostics: &mut Diagnostics) -> Reaction {
    let mut reaction = Reaction::new(id);
    reaction.name = raw.name;
    reaction.external_id = raw.bigg_id;
    reaction.reversibility = raw.reversibility;
    reaction.label_x = raw.label_x;
    reaction.label_y = raw.label_y;
    reaction.gene_reaction_rule = raw.gene_reaction_rule;
    reaction.genes = raw
        .genes
        .unwrap_or_default()
        .into_iter()
        .map(|gene| Gene {
            id: gene.bigg_id,
            name: gene.name,
        })
        .collect();

    for raw_metabolite in raw.metabolites.unwrap_or_default() {
        let participant = raw_metabolite.bigg_id.clone();
        match raw_metabolite.coefficient {
            None => diagnostics.push(Diagnostic::UndefinedCoefficient {
                reaction: reaction.display_id().to_string(),
                participant: participant.clone(),
            }),
            Some(value) if value == 0.0 => diagnostics.push(Diagnostic::ZeroCoefficient {
                reaction: reaction.display_id().to_string(),
                participant: participant.clone(),
            }),
            Some(_) => {}
        }
        let metabolite = Metabolite::new(raw_metabolite.bigg_id, raw_metabolite.coefficient);
        if reaction.add_metabolite(metabolite).is_some() {
            diagnostics.push(Diagnostic::ReplacedEntity {
                kind: "participant",
                id: participant,
            });
        }
    }

    for (segment_id, raw_segment) in raw.segments.unwrap_or_default() {
        let (Some(from), Some(to)) = (raw_segment.from_node_id, raw_segment.to_node_id) else {
            diagnostics.push(Diagnostic::Skipped {
                kind: "segment",
                id: segment_id,
                reason: format!("missing endpoint in reaction {id}"),
            });
            continue;
        };
        let mut segment = Segment::new(segment_id, from, to);
        segment.b1 = raw_segment.b1;
        segment.b2 = raw_segment.b2;
        reaction.add_segment(segment);
    }
    reaction
}

/// Serialises a map back into the `[meta, content]` array. Absent fields are omitted.
pub fn map_to_value(map: &Map) -> Result<Value, ConvertError> {
    let meta = MapMeta {
        map_name: map.name.clone(),
        map_id: map.id.clone(),
        map_description: map.description.clone(),
        homepage: map.homepage.clone(),
        schema: map.schema.clone(),
    };

    let nodes = map
        .nodes()
        .map(|node| {
            let raw = RawNode {
                node_type: Some(node.kind.as_token().to_string()),
                x: Some(node.x),
                y: Some(node.y),
                label_x: node.label_x,
                label_y: node.label_y,
                width: node.width,
                height: node.height,
                bigg_id: node.external_id.clone(),
                name: node.name.clone(),
                node_is_primary: node.is_primary,
            };
            (node.id.clone(), raw)
        })
        .collect();

    let reactions = map
        .reactions()
        .map(|reaction| (reaction.id.clone(), write_reaction(reaction)))
        .collect();

    let text_labels = map
        .text_labels()
        .map(|label| {
            let raw = RawTextLabel {
                text: label.text.clone(),
                x: label.x,
                y: label.y,
            };
            (label.id.clone(), raw)
        })
        .collect();

    let content = MapContent {
        reactions: Some(reactions),
        nodes: Some(nodes),
        text_labels: Some(text_labels),
        canvas: Some(RawCanvas {
            x: map.canvas.x,
            y: map.canvas.y,
            width: map.canvas.width,
            height: map.canvas.height,
        }),
    };
    Ok(serde_json::to_value((meta, content))?)
}

fn write_reaction(reaction: &Reaction) -> RawReaction {
    RawReaction {
        name: reaction.name.clone(),
        bigg_id: reaction.external_id.clone(),
        reversibility: reaction.reversibility,
        label_x: reaction.label_x,
        label_y: reaction.label_y,
        gene_reaction_rule: reaction.gene_reaction_rule.clone(),
        genes: Some(
            reaction
                .genes
                .iter()
                .map(|gene| RawGene {
                    bigg_id: gene.id.clone(),
                    name: gene.name.clone(),
                })
                .collect(),
        ),
        metabolites: Some(
            reaction
                .metabolites()
                .map(|m| RawMetabolite {
                    bigg_id: m.external_id.clone(),
                    coefficient: m.coefficient,
                })
                .collect(),
        ),
        segments: Some(
            reaction
                .segments()
                .map(|s| {
                    let raw = RawSegment {
                        from_node_id: Some(s.from_node_id.clone()),
                        to_node_id: Some(s.to_node_id.clone()),
                        b1: s.b1,
                        b2: s.b2,
                    };
                    (s.id.clone(), raw)
                })
                .collect(),
        ),
    }
}
