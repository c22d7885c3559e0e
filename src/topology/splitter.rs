use std::collections::{BTreeMap, BTreeSet};

use crate::diagnostics::{Diagnostic, Diagnostics};
use crate::model::{Map, Metabolite, Node, Reaction};

/// Splits a reaction that was visually merged across several midmarkers.
///
/// Every midmarker grows its own reachable set of segments; growth never
/// passes through another midmarker. A reaction touching at most one midmarker
/// is returned unchanged apart from having that midmarker assigned. Clones are
/// numbered in midmarker id order and get ids `"{id}_{n}"` starting at 1.
pub fn split_reaction(
    map: &Map,
    mut reaction: Reaction,
    diagnostics: &mut Diagnostics,
) -> Vec<Reaction> {
    let midmarkers = midmarkers_of(map, &reaction);
    match midmarkers.as_slice() {
        [] => return vec![reaction],
        [only] => {
            reaction.midmarker = Some(only.clone());
            return vec![reaction];
        }
        _ => {}
    }
    log::debug!(
        "splitting reaction {} across midmarkers {midmarkers:?}",
        reaction.id
    );

    let reachable: Vec<BTreeSet<String>> = midmarkers
        .iter()
        .map(|midmarker| grow(&reaction, midmarker, &midmarkers))
        .collect();

    let mut owners: BTreeMap<&str, Vec<usize>> = BTreeMap::new();
    for (index, segments) in reachable.iter().enumerate() {
        for segment_id in segments {
            owners.entry(segment_id.as_str()).or_default().push(index);
        }
    }

    let mut groups: Vec<Vec<String>> = vec![Vec::new(); midmarkers.len()];
    for segment_id in reaction.segment_ids() {
        match owners.get(segment_id).map(Vec::as_slice) {
            Some([owner]) => groups[*owner].push(segment_id.to_string()),
            Some(claimants) => diagnostics.push(Diagnostic::ConflictingSplit {
                reaction: reaction.id.clone(),
                segment: segment_id.to_string(),
                midmarkers: claimants.iter().map(|i| midmarkers[*i].clone()).collect(),
            }),
            None => diagnostics.push(Diagnostic::UnassignedSegment {
                reaction: reaction.id.clone(),
                segment: segment_id.to_string(),
            }),
        }
    }

    let mut placed: BTreeSet<String> = BTreeSet::new();
    let mut clones = Vec::with_capacity(midmarkers.len());
    for (index, (midmarker, segment_ids)) in midmarkers.iter().zip(groups).enumerate() {
        let mut clone = reaction.scalar_copy(format!("{}_{}", reaction.id, index + 1));
        clone.midmarker = Some(midmarker.clone());
        for segment_id in &segment_ids {
            if let Some(segment) = reaction.segment(segment_id) {
                clone.add_segment(segment.clone());
            }
        }
        let external_ids: BTreeSet<&str> = clone
            .node_ids()
            .iter()
            .filter_map(|id| map.node(id))
            .filter(|node| node.is_metabolite())
            .filter_map(|node| node.external_id.as_deref())
            .collect();
        let participants: Vec<Metabolite> = reaction
            .metabolites()
            .filter(|m| external_ids.contains(m.external_id.as_str()))
            .map(|m| Metabolite::new(m.external_id.clone(), m.coefficient))
            .collect();
        for participant in participants {
            placed.insert(participant.external_id.clone());
            clone.add_metabolite(participant);
        }
        clones.push(clone);
    }

    for metabolite in reaction.metabolites() {
        if !placed.contains(&metabolite.external_id) {
            diagnostics.push(Diagnostic::UnreachableParticipant {
                reaction: reaction.id.clone(),
                participant: metabolite.external_id.clone(),
            });
        }
    }
    clones
}

fn midmarkers_of(map: &Map, reaction: &Reaction) -> Vec<String> {
    reaction
        .node_ids()
        .iter()
        .filter(|id| map.node(id).is_some_and(Node::is_midmarker))
        .cloned()
        .collect()
}

/// Segment ids reachable from one midmarker by repeated frontier expansion.
fn grow(reaction: &Reaction, midmarker: &str, midmarkers: &[String]) -> BTreeSet<String> {
    let mut nodes = BTreeSet::from([midmarker.to_string()]);
    let mut segments = BTreeSet::new();
    loop {
        let mut progress = false;
        for segment in reaction.segments() {
            if segments.contains(&segment.id) {
                continue;
            }
            let reached = if nodes.contains(&segment.from_node_id) {
                Some(&segment.to_node_id)
            } else if nodes.contains(&segment.to_node_id) {
                Some(&segment.from_node_id)
            } else {
                None
            };
            let Some(other) = reached else {
                continue;
            };
            segments.insert(segment.id.clone());
            if !midmarkers.contains(other) {
                nodes.insert(other.clone());
            }
            progress = true;
        }
        if !progress {
            return segments;
        }
    }
}

/// Runs the splitter over every reaction of the map.
pub fn split_reactions(map: &mut Map, diagnostics: &mut Diagnostics) {
    for reaction_id in map.reaction_ids() {
        let midmarkers = map
            .reaction(&reaction_id)
            .map(|reaction| midmarkers_of(map, reaction))
            .unwrap_or_default();
        if midmarkers.len() < 2 {
            if let (Some(only), Some(reaction)) =
                (midmarkers.into_iter().next(), map.reaction_mut(&reaction_id))
            {
                reaction.midmarker = Some(only);
            }
            continue;
        }
        let Some(reaction) = map.remove_reaction(&reaction_id) else {
            continue;
        };
        for clone in split_reaction(map, reaction, diagnostics) {
            let id = clone.id.clone();
            if map.add_reaction(clone).is_some() {
                diagnostics.push(Diagnostic::ReplacedEntity { kind: "reaction", id });
            }
        }
    }
}
