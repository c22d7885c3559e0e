use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::diagnostics::{Diagnostic, Diagnostics, StructuralError};
use crate::model::{Map, Reaction};
use crate::topology::types::{Curve, CurveHop, ReactionCurves, Role, StitchedCurve};

/// Which way exported product curves run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CurveDirection {
    /// Every curve starts at its metabolite and ends at the midmarker.
    MetaboliteToReaction,
    /// Substrate curves run into the reaction, product curves out of it.
    #[default]
    Flow,
}

impl CurveDirection {
    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "metabolite_to_reaction" | "metabolite-to-reaction" => Some(Self::MetaboliteToReaction),
            "flow" => Some(Self::Flow),
            _ => None,
        }
    }
}

/// Result of attaching an unordered segment set to a start node.
#[derive(Debug, Clone, PartialEq)]
pub struct Stitch {
    pub curve: Curve,
    /// Segments in the order they were attached.
    pub segment_ids: Vec<String>,
    /// Segments that never touched the growing curve's terminal node.
    pub lost_segments: Vec<String>,
    pub terminal_node_id: String,
}

/// Grows a curve from `start_node_id` by repeatedly attaching the first
/// pending segment that touches the current terminal node.
///
/// Segments are oriented away from the start as they attach. A segment that
/// does not fit is set aside and retried after every successful attachment.
pub fn stitch_curve(
    map: &Map,
    reaction: &Reaction,
    start_node_id: &str,
    segment_ids: &[String],
) -> Result<Stitch, StructuralError> {
    let mut pending: Vec<&str> = Vec::with_capacity(segment_ids.len());
    let mut lost_segments = Vec::new();
    for id in segment_ids {
        if reaction.segment(id).is_some() && !pending.contains(&id.as_str()) {
            pending.push(id);
        } else {
            lost_segments.push(id.clone());
        }
    }

    let mut terminal = start_node_id.to_string();
    let mut hops = Vec::with_capacity(pending.len());
    let mut attached = Vec::with_capacity(pending.len());
    while let Some(position) = pending.iter().position(|id| {
        reaction
            .segment(id)
            .is_some_and(|segment| segment.touches(&terminal))
    }) {
        let segment_id = pending.remove(position);
        let Some(stored) = reaction.segment(segment_id) else {
            continue;
        };
        let segment = if stored.from_node_id == terminal {
            stored.clone()
        } else {
            stored.reversed()
        };
        let node_position = |id: &str| {
            map.node(id)
                .map(|node| node.position())
                .ok_or_else(|| StructuralError::MissingNode {
                    reaction: reaction.id.clone(),
                    segment: segment.id.clone(),
                    node: id.to_string(),
                })
        };
        hops.push(CurveHop {
            start: node_position(&segment.from_node_id)?,
            end: node_position(&segment.to_node_id)?,
            b1: segment.b1,
            b2: segment.b2,
        });
        attached.push(segment.id.clone());
        terminal = segment.to_node_id;
    }
    lost_segments.extend(pending.into_iter().map(String::from));

    Ok(Stitch {
        curve: Curve::new(hops),
        segment_ids: attached,
        lost_segments,
        terminal_node_id: terminal,
    })
}

/// Builds the curve of one participant from the chain stored by the linker.
///
/// The map must be linked. Lost segments are reported as a diagnostic and
/// listed on the result, never dropped silently.
pub fn stitch_participant(
    map: &Map,
    reaction_id: &str,
    participant_id: &str,
    direction: CurveDirection,
    diagnostics: &mut Diagnostics,
) -> Result<StitchedCurve, StructuralError> {
    let reaction = map
        .reaction(reaction_id)
        .ok_or_else(|| StructuralError::UnknownReaction(reaction_id.to_string()))?;
    let unknown = || StructuralError::UnknownParticipant {
        reaction: reaction_id.to_string(),
        participant: participant_id.to_string(),
    };
    let participant = reaction.metabolite(participant_id).ok_or_else(unknown)?;
    let node = participant
        .node_ref_id
        .as_deref()
        .and_then(|id| map.node(id))
        .ok_or_else(unknown)?;

    let role = participant.role();
    let mut order = node.connected_segments(reaction_id).to_vec();
    if role.is_product() {
        order.reverse();
    }

    let stitch = stitch_curve(map, reaction, &node.id, &order)?;
    if !stitch.lost_segments.is_empty() {
        diagnostics.push(Diagnostic::LostSegments {
            reaction: reaction_id.to_string(),
            segments: stitch.lost_segments.clone(),
        });
    }

    let mut curve = stitch.curve;
    let mut segment_ids = stitch.segment_ids;
    if direction == CurveDirection::Flow && role.is_product() {
        curve.reverse();
        segment_ids.reverse();
    }

    Ok(StitchedCurve {
        participant_id: participant_id.to_string(),
        metabolite_node_id: node.id.clone(),
        midmarker_id: reaction.midmarker.clone(),
        role,
        segment_ids,
        curve,
        lost_segments: stitch.lost_segments,
    })
}

/// Stitches every participant of a reaction that has a resolved node.
///
/// Segments of the reaction that no participant curve uses are reported as lost.
pub fn stitch_reaction(
    map: &Map,
    reaction_id: &str,
    direction: CurveDirection,
    diagnostics: &mut Diagnostics,
) -> Result<ReactionCurves, StructuralError> {
    let reaction = map
        .reaction(reaction_id)
        .ok_or_else(|| StructuralError::UnknownReaction(reaction_id.to_string()))?;

    let mut curves = Vec::new();
    let mut used: BTreeSet<&str> = BTreeSet::new();
    let mut reported: BTreeSet<String> = BTreeSet::new();
    for participant in reaction.metabolites() {
        if participant.node_ref_id.is_none() {
            continue;
        }
        match stitch_participant(map, reaction_id, &participant.external_id, direction, diagnostics) {
            Ok(curve) => {
                reported.extend(curve.lost_segments.iter().cloned());
                curves.push(curve);
            }
            Err(err) => diagnostics.push(err.into()),
        }
    }
    for curve in &curves {
        used.extend(curve.segment_ids.iter().map(String::as_str));
    }

    let lost_segments: Vec<String> = reaction
        .segment_ids()
        .filter(|id| !used.contains(id))
        .map(String::from)
        .collect();
    let unreported: Vec<String> = lost_segments
        .iter()
        .filter(|id| !reported.contains(*id))
        .cloned()
        .collect();
    if !unreported.is_empty() {
        diagnostics.push(Diagnostic::LostSegments {
            reaction: reaction_id.to_string(),
            segments: unreported,
        });
    }

    Ok(ReactionCurves {
        reaction_id: reaction_id.to_string(),
        curves,
        lost_segments,
    })
}

/// Role-appropriate start of an exported curve.
pub fn curve_starts_at_metabolite(role: Role, direction: CurveDirection) -> bool {
    direction == CurveDirection::MetaboliteToReaction || !role.is_product()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Metabolite, Node, NodeKind, Point, Segment};
    use crate::topology::linker::link_map;

    fn linked_bireaction() -> Map {
        let mut map = Map::new();
        map.add_node(Node::metabolite("S", "glc__D_c", 0.0, 0.0));
        map.add_node(Node::metabolite("P", "g6p_c", 200.0, 0.0));
        map.add_node(Node::new("M", NodeKind::Midmarker, 100.0, 0.0));
        let mut reaction = Reaction::new("R");
        reaction.add_metabolite(Metabolite::new("glc__D_c", Some(-1.0)));
        reaction.add_metabolite(Metabolite::new("g6p_c", Some(1.0)));
        reaction.add_segment(Segment::new("0", "S", "M"));
        reaction.add_segment(
            Segment::new("1", "M", "P").with_controls(Point::new(120.0, 10.0), Point::new(180.0, 10.0)),
        );
        map.add_reaction(reaction);
        link_map(&mut map, &mut Diagnostics::new());
        map
    }

    #[test]
    fn stitches_two_point_curves() {
        let map = linked_bireaction();
        let mut diagnostics = Diagnostics::new();
        let substrate =
            stitch_participant(&map, "R", "glc__D_c", CurveDirection::Flow, &mut diagnostics).unwrap();
        assert_eq!(substrate.curve.points(), vec![Point::new(0.0, 0.0), Point::new(100.0, 0.0)]);
        assert_eq!(substrate.role, Role::Substrate);

        let product =
            stitch_participant(&map, "R", "g6p_c", CurveDirection::Flow, &mut diagnostics).unwrap();
        assert_eq!(product.curve.points(), vec![Point::new(100.0, 0.0), Point::new(200.0, 0.0)]);
        assert_eq!(product.curve.hops[0].b1, Some(Point::new(120.0, 10.0)));
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn metabolite_first_direction_reverses_products() {
        let map = linked_bireaction();
        let product = stitch_participant(
            &map,
            "R",
            "g6p_c",
            CurveDirection::MetaboliteToReaction,
            &mut Diagnostics::new(),
        )
        .unwrap();
        assert_eq!(product.curve.start(), Some(Point::new(200.0, 0.0)));
        assert_eq!(product.curve.hops[0].b1, Some(Point::new(180.0, 10.0)));
    }

    #[test]
    fn attaches_unordered_segments() {
        let mut map = Map::new();
        for (id, x) in [("a", 0.0), ("m1", 10.0), ("m2", 20.0), ("mid", 30.0)] {
            map.add_node(Node::new(id, NodeKind::Multimarker, x, 0.0));
        }
        let mut reaction = Reaction::new("R");
        reaction.add_segment(Segment::new("x", "mid", "m2"));
        reaction.add_segment(Segment::new("y", "m1", "m2"));
        reaction.add_segment(Segment::new("z", "a", "m1"));
        let order = vec!["x".to_string(), "y".to_string(), "z".to_string()];
        let stitch = stitch_curve(&map, &reaction, "a", &order).unwrap();
        assert_eq!(stitch.segment_ids, ["z", "y", "x"]);
        assert_eq!(stitch.terminal_node_id, "mid");
        assert!(stitch.lost_segments.is_empty());
        assert_eq!(stitch.curve.end(), Some(Point::new(30.0, 0.0)));
    }

    #[test]
    fn reports_lost_segment() {
        let mut map = linked_bireaction();
        map.add_node(Node::new("u", NodeKind::Multimarker, 0.0, 90.0));
        map.add_node(Node::new("v", NodeKind::Multimarker, 0.0, 95.0));
        map.reaction_mut("R")
            .unwrap()
            .add_segment(Segment::new("stray", "u", "v"));
        map.node_mut("S").unwrap().add_connected_segment("R", "stray");

        let mut diagnostics = Diagnostics::new();
        let curves = stitch_reaction(&map, "R", CurveDirection::Flow, &mut diagnostics).unwrap();
        let substrate = curves
            .curves
            .iter()
            .find(|c| c.participant_id == "glc__D_c")
            .unwrap();
        assert_eq!(substrate.lost_segments, ["stray"]);
        assert!(!substrate.segment_ids.contains(&"stray".to_string()));
        assert_eq!(substrate.curve.len(), 1);
        assert_eq!(curves.lost_segments, ["stray"]);
        let reports = diagnostics
            .iter()
            .filter(|d| matches!(d, Diagnostic::LostSegments { .. }))
            .count();
        assert_eq!(reports, 1);
    }

    #[test]
    fn unknown_participant_is_structural() {
        let map = linked_bireaction();
        let err = stitch_participant(&map, "R", "nad_c", CurveDirection::Flow, &mut Diagnostics::new())
            .unwrap_err();
        assert!(matches!(err, StructuralError::UnknownParticipant { .. }));
    }
}
