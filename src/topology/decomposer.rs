use crate::diagnostics::StructuralError;
use crate::model::{Map, Node, NodeKind, Point, Segment};
use crate::topology::types::{Curve, Role};

/// Joints closer than this to an existing multimarker reuse that node.
pub const JOINT_TOLERANCE: f64 = 1e-3;

/// An already ordered curve of one participant, as read from a box-and-curve format.
///
/// Substrate curves run from the metabolite to the midmarker; product curves
/// run the other way.
#[derive(Debug, Clone, PartialEq)]
pub struct ParticipantCurve {
    /// Prefix of derived node and segment ids; unique per curve.
    pub id: String,
    pub participant_id: String,
    pub metabolite_node_id: String,
    pub midmarker_id: String,
    pub role: Role,
    pub curve: Curve,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Decomposition {
    pub created_nodes: Vec<String>,
    pub reused_nodes: Vec<String>,
    pub segment_ids: Vec<String>,
}

/// Turns an ordered curve into multimarker nodes and one segment per hop.
///
/// Interior joints sit at the midpoint of consecutive hop ends and get ids
/// `"{id}.M{n}"`; segments get ids `"{id}.S{n}"`. A joint reuses a node with
/// its derived id, or a multimarker of the same reaction at the same position, so decomposing the
/// same curve twice changes nothing. A hop joining two nodes the reaction
/// already connects is not added again.
pub fn decompose_curve(
    map: &mut Map,
    reaction_id: &str,
    participant: &ParticipantCurve,
) -> Result<Decomposition, StructuralError> {
    let missing = |node: &str| StructuralError::MissingNode {
        reaction: reaction_id.to_string(),
        segment: participant.id.clone(),
        node: node.to_string(),
    };
    if map.node(&participant.metabolite_node_id).is_none() {
        return Err(missing(&participant.metabolite_node_id));
    }
    match map.node(&participant.midmarker_id) {
        Some(node) if node.is_midmarker() => {}
        Some(_) => {
            return Err(StructuralError::NotAMidmarker {
                reaction: reaction_id.to_string(),
                node: participant.midmarker_id.clone(),
            });
        }
        None => return Err(missing(&participant.midmarker_id)),
    }
    if map.reaction(reaction_id).is_none() {
        return Err(StructuralError::UnknownReaction(reaction_id.to_string()));
    }

    let hops = if participant.role.is_product() {
        participant.curve.reversed()
    } else {
        participant.curve.clone()
    };

    let mut result = Decomposition::default();
    let mut path = vec![participant.metabolite_node_id.clone()];
    for (index, pair) in hops.hops.windows(2).enumerate() {
        let joint = pair[0].end.midpoint(&pair[1].start);
        let derived_id = format!("{}.M{}", participant.id, index + 1);
        let node_id = match find_joint(map, reaction_id, &derived_id, joint) {
            Some(existing) => {
                result.reused_nodes.push(existing.clone());
                existing
            }
            None => {
                map.add_node(Node::new(derived_id.clone(), NodeKind::Multimarker, joint.x, joint.y));
                result.created_nodes.push(derived_id.clone());
                derived_id
            }
        };
        path.push(node_id);
    }
    path.push(participant.midmarker_id.clone());

    let Some(reaction) = map.reaction_mut(reaction_id) else {
        return Err(StructuralError::UnknownReaction(reaction_id.to_string()));
    };
    for (index, ends) in path.windows(2).enumerate() {
        let (from, to) = (&ends[0], &ends[1]);
        let already_joined = reaction.segments().any(|s| {
            (&s.from_node_id == from && &s.to_node_id == to)
                || (&s.from_node_id == to && &s.to_node_id == from)
        });
        if already_joined {
            continue;
        }
        let mut segment = Segment::new(format!("{}.S{index}", participant.id), from, to);
        if let Some(hop) = hops.hops.get(index) {
            segment.b1 = hop.b1;
            segment.b2 = hop.b2;
        }
        if participant.role.is_product() {
            segment.reverse();
        }
        result.segment_ids.push(segment.id.clone());
        reaction.add_segment(segment);
    }
    Ok(result)
}

/// Orients a curve read from a document so it runs the way [`decompose_curve`]
/// expects for `role`, judging by which end lies closer to the metabolite.
pub fn flow_oriented(curve: &Curve, metabolite: Point, midmarker: Point, role: Role) -> Curve {
    let (Some(start), Some(end)) = (curve.start(), curve.end()) else {
        return curve.clone();
    };
    let starts_at_metabolite =
        start.distance(&metabolite) + end.distance(&midmarker)
            <= start.distance(&midmarker) + end.distance(&metabolite);
    if starts_at_metabolite == role.is_product() {
        curve.reversed()
    } else {
        curve.clone()
    }
}

/// Only multimarkers of the reaction being decomposed are candidates; curves of
/// other reactions meeting at the same spot keep their own joints.
fn find_joint(map: &Map, reaction_id: &str, derived_id: &str, joint: Point) -> Option<String> {
    if map.node(derived_id).is_some() {
        return Some(derived_id.to_string());
    }
    let reaction = map.reaction(reaction_id)?;
    reaction
        .node_ids()
        .iter()
        .filter_map(|id| map.node(id))
        .filter(|node| node.is_multimarker())
        .find(|node| node.position().distance(&joint) <= JOINT_TOLERANCE)
        .map(|node| node.id.clone())
}
