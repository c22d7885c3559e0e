use std::collections::{BTreeMap, BTreeSet, VecDeque};

use crate::diagnostics::{Diagnostic, Diagnostics, StructuralError};
use crate::model::{Map, Metabolite, Node, Reaction};

type Adjacency = BTreeMap<String, Vec<String>>;

/// Links every reaction of the map.
///
/// Rebuilds the per-node segment indexes from scratch, so running it twice
/// yields the same indexes and segment orientations.
pub fn link_map(map: &mut Map, diagnostics: &mut Diagnostics) {
    map.clear_connected_segments();
    for reaction_id in map.reaction_ids() {
        if let Err(err) = link_reaction(map, &reaction_id, diagnostics) {
            diagnostics.push(err.into());
        }
    }
}

/// Resolves participants, orients the reaction's segments and stores one
/// ordered chain per participant on its metabolite node.
///
/// Substrate segments point away from the metabolite; product segments point
/// towards it. A substrate chain is stored metabolite first, a product chain
/// midmarker first.
pub fn link_reaction(
    map: &mut Map,
    reaction_id: &str,
    diagnostics: &mut Diagnostics,
) -> Result<(), StructuralError> {
    let (nodes, reactions) = map.graph_mut();
    let reaction = reactions
        .get_mut(reaction_id)
        .ok_or_else(|| StructuralError::UnknownReaction(reaction_id.to_string()))?;

    for node_id in reaction.node_ids() {
        if let Some(node) = nodes.get_mut(node_id) {
            node.remove_connected_segments(reaction_id);
        }
    }

    resolve_midmarker(reaction, nodes, diagnostics);
    resolve_participants(reaction, nodes, diagnostics);

    let participant_nodes: BTreeMap<String, String> = reaction
        .metabolites()
        .filter_map(|m| m.node_ref_id.clone().map(|node| (node, m.external_id.clone())))
        .collect();

    let mut direct: Adjacency = BTreeMap::new();
    let mut adjacency: Adjacency = BTreeMap::new();
    let segment_ids: Vec<String> = reaction.segment_ids().map(String::from).collect();
    for segment_id in &segment_ids {
        let Some((from, to)) = reaction
            .segment(segment_id)
            .map(|s| (s.from_node_id.clone(), s.to_node_id.clone()))
        else {
            continue;
        };
        let mut resolvable = true;
        for end in [&from, &to] {
            if !nodes.contains_key(end) {
                diagnostics.push(Diagnostic::MissingNode {
                    reaction: reaction_id.to_string(),
                    segment: segment_id.clone(),
                    node: end.clone(),
                });
                resolvable = false;
            }
        }
        if !resolvable {
            continue;
        }

        let from_is_metabolite = nodes.get(&from).is_some_and(Node::is_metabolite);
        let to_is_metabolite = nodes.get(&to).is_some_and(Node::is_metabolite);
        if !from_is_metabolite && !to_is_metabolite {
            for end in [&from, &to] {
                adjacency
                    .entry(end.clone())
                    .or_default()
                    .push(segment_id.clone());
                if let Some(node) = nodes.get_mut(end) {
                    node.add_connected_segment(reaction_id, segment_id);
                }
            }
            continue;
        }
        if from_is_metabolite && to_is_metabolite {
            diagnostics.push(Diagnostic::Skipped {
                kind: "segment",
                id: segment_id.clone(),
                reason: format!("joins metabolites {from} and {to} in reaction {reaction_id}"),
            });
            continue;
        }

        let (metabolite_end, other_end) = if from_is_metabolite {
            (from.clone(), to.clone())
        } else {
            (to.clone(), from.clone())
        };
        // Nodes without a usable participant record were reported while resolving.
        let Some(participant) = participant_nodes.get(&metabolite_end) else {
            log::debug!("skipping segment {segment_id} of reaction {reaction_id}");
            continue;
        };
        let product = reaction
            .metabolite(participant)
            .is_some_and(Metabolite::is_product);
        let points_away = from == metabolite_end;
        if product == points_away {
            if let Some(segment) = reaction.segment_mut(segment_id) {
                segment.reverse();
                log::debug!("reversed segment {segment_id} of reaction {reaction_id}");
            }
        }
        direct
            .entry(metabolite_end)
            .or_default()
            .push(segment_id.clone());
        if let Some(node) = nodes.get_mut(&other_end) {
            if !node.is_metabolite() {
                node.add_connected_segment(reaction_id, segment_id);
            }
        }
    }

    let participants: Vec<(String, String, bool)> = reaction
        .metabolites()
        .filter_map(|m| {
            m.node_ref_id
                .clone()
                .map(|node| (m.external_id.clone(), node, m.is_product()))
        })
        .collect();
    let midmarker = reaction.midmarker.clone();
    for (participant, node_id, product) in participants {
        let seeds = direct.get(&node_id).cloned().unwrap_or_default();
        let Some(first) = seeds.first() else {
            diagnostics.push(Diagnostic::IncompleteChain {
                reaction: reaction_id.to_string(),
                participant: participant.clone(),
                stopped_at: node_id.clone(),
            });
            continue;
        };
        if seeds.len() > 1 {
            diagnostics.push(Diagnostic::MultipleArcs {
                reaction: reaction_id.to_string(),
                node: node_id.clone(),
                count: seeds.len(),
                kept: first.clone(),
            });
        }
        let walk = ChainWalk {
            reaction: &*reaction,
            nodes: &*nodes,
            adjacency: &adjacency,
            midmarker: midmarker.as_deref(),
            participant: &participant,
        };
        let mut chain = walk.run(&node_id, first, diagnostics);
        orient_chain(reaction, &node_id, &chain, product);
        if product {
            chain.reverse();
        }
        log::trace!("chain of {participant} in {reaction_id}: {chain:?}");
        if let Some(node) = nodes.get_mut(&node_id) {
            node.set_connected_segments(reaction_id, chain);
        }
    }
    Ok(())
}

fn resolve_midmarker(
    reaction: &mut Reaction,
    nodes: &BTreeMap<String, Node>,
    diagnostics: &mut Diagnostics,
) {
    if let Some(id) = reaction.midmarker.clone() {
        match nodes.get(&id) {
            Some(node) if node.is_midmarker() => return,
            Some(_) => diagnostics.push(
                StructuralError::NotAMidmarker {
                    reaction: reaction.id.clone(),
                    node: id,
                }
                .into(),
            ),
            None => diagnostics.push(StructuralError::MissingMidmarker(reaction.id.clone()).into()),
        }
    }
    reaction.midmarker = reaction
        .node_ids()
        .iter()
        .find(|id| nodes.get(*id).is_some_and(Node::is_midmarker))
        .cloned();
}

fn resolve_participants(
    reaction: &mut Reaction,
    nodes: &BTreeMap<String, Node>,
    diagnostics: &mut Diagnostics,
) {
    let reaction_id = reaction.id.clone();
    let node_ids = reaction.node_ids().clone();
    for metabolite in reaction.metabolites_mut() {
        let still_valid = metabolite
            .node_ref_id
            .as_deref()
            .filter(|id| node_ids.contains(*id))
            .and_then(|id| nodes.get(id))
            .is_some_and(|node| {
                node.is_metabolite()
                    && node.external_id.as_deref() == Some(metabolite.external_id.as_str())
            });
        if !still_valid {
            metabolite.node_ref_id = None;
        }
    }

    for node_id in &node_ids {
        let Some(node) = nodes.get(node_id) else {
            continue;
        };
        if !node.is_metabolite() {
            continue;
        }
        let Some(external_id) = node.external_id.as_deref() else {
            diagnostics.push(Diagnostic::Skipped {
                kind: "node",
                id: node_id.clone(),
                reason: "metabolite node without external id".to_string(),
            });
            continue;
        };
        match reaction.metabolite_mut(external_id) {
            None => diagnostics.push(Diagnostic::MissingParticipant {
                reaction: reaction_id.clone(),
                node: node_id.clone(),
                external_id: external_id.to_string(),
            }),
            Some(metabolite) => match metabolite.node_ref_id.clone() {
                Some(kept) if &kept != node_id => diagnostics.push(Diagnostic::DuplicateParticipant {
                    reaction: reaction_id.clone(),
                    participant: external_id.to_string(),
                    kept,
                }),
                Some(_) => {}
                None => metabolite.node_ref_id = Some(node_id.clone()),
            },
        }
    }

    for metabolite in reaction.metabolites() {
        if metabolite.node_ref_id.is_none() {
            diagnostics.push(Diagnostic::ParticipantWithoutNode {
                reaction: reaction_id.clone(),
                participant: metabolite.external_id.clone(),
            });
        }
    }
}

struct ChainWalk<'a> {
    reaction: &'a Reaction,
    nodes: &'a BTreeMap<String, Node>,
    adjacency: &'a Adjacency,
    midmarker: Option<&'a str>,
    participant: &'a str,
}

impl ChainWalk<'_> {
    /// Segment ids from the metabolite outwards.
    fn run(&self, start: &str, first: &str, diagnostics: &mut Diagnostics) -> Vec<String> {
        let mut chain = vec![first.to_string()];
        let Some(mut current) = self
            .reaction
            .segment(first)
            .and_then(|s| s.other_end(start))
            .map(String::from)
        else {
            return chain;
        };
        if Some(current.as_str()) == self.midmarker {
            return chain;
        }
        if self.nodes.get(&current).is_some_and(Node::is_metabolite) {
            self.incomplete(&current, diagnostics);
            return chain;
        }
        if let Some(midmarker) = self.midmarker {
            if let Some(path) = self.shortest_path(&current, midmarker) {
                chain.extend(path);
                return chain;
            }
        }

        // The midmarker is unreachable: follow the first open branch until a dead end.
        let mut visited = BTreeSet::from([start.to_string(), current.clone()]);
        let mut used: BTreeSet<String> = chain.iter().cloned().collect();
        loop {
            let connected = self
                .adjacency
                .get(&current)
                .map(Vec::as_slice)
                .unwrap_or(&[]);
            let Some(segment_id) = connected.iter().find(|id| !used.contains(*id)) else {
                break;
            };
            let Some(next) = self
                .reaction
                .segment(segment_id)
                .and_then(|s| s.other_end(&current))
                .map(String::from)
            else {
                break;
            };
            used.insert(segment_id.clone());
            if !visited.insert(next.clone()) {
                diagnostics.push(Diagnostic::ChainCycle {
                    reaction: self.reaction.id.clone(),
                    participant: self.participant.to_string(),
                    node: next,
                });
                return chain;
            }
            chain.push(segment_id.clone());
            current = next;
        }
        if self.midmarker.is_some() {
            self.incomplete(&current, diagnostics);
        }
        chain
    }

    fn shortest_path(&self, start: &str, goal: &str) -> Option<Vec<String>> {
        let mut previous: BTreeMap<String, (String, String)> = BTreeMap::new();
        let mut seen = BTreeSet::from([start.to_string()]);
        let mut queue = VecDeque::from([start.to_string()]);
        while let Some(node) = queue.pop_front() {
            if node == goal {
                let mut path = Vec::new();
                let mut cursor = node;
                while let Some((prev, segment_id)) = previous.get(&cursor) {
                    path.push(segment_id.clone());
                    cursor = prev.clone();
                }
                path.reverse();
                return Some(path);
            }
            for segment_id in self.adjacency.get(&node).into_iter().flatten() {
                let Some(next) = self
                    .reaction
                    .segment(segment_id)
                    .and_then(|s| s.other_end(&node))
                else {
                    continue;
                };
                if seen.insert(next.to_string()) {
                    previous.insert(next.to_string(), (node.clone(), segment_id.clone()));
                    queue.push_back(next.to_string());
                }
            }
        }
        None
    }

    fn incomplete(&self, stopped_at: &str, diagnostics: &mut Diagnostics) {
        diagnostics.push(Diagnostic::IncompleteChain {
            reaction: self.reaction.id.clone(),
            participant: self.participant.to_string(),
            stopped_at: stopped_at.to_string(),
        });
    }
}

/// Reverses chain segments in place so the chain forms one directed path.
fn orient_chain(reaction: &mut Reaction, start: &str, chain: &[String], product: bool) {
    let mut previous = start.to_string();
    for segment_id in chain {
        let Some(segment) = reaction.segment_mut(segment_id) else {
            continue;
        };
        let misdirected = if product {
            segment.from_node_id == previous
        } else {
            segment.to_node_id == previous
        };
        if misdirected {
            segment.reverse();
        }
        previous = if product {
            segment.from_node_id.clone()
        } else {
            segment.to_node_id.clone()
        };
    }
}

/// Ordered chain of one participant, as stored by the last link pass.
pub fn participant_chain<'a>(
    map: &'a Map,
    reaction_id: &str,
    participant_id: &str,
) -> Result<&'a [String], StructuralError> {
    let reaction = map
        .reaction(reaction_id)
        .ok_or_else(|| StructuralError::UnknownReaction(reaction_id.to_string()))?;
    let participant = reaction
        .metabolite(participant_id)
        .ok_or_else(|| StructuralError::UnknownParticipant {
            reaction: reaction_id.to_string(),
            participant: participant_id.to_string(),
        })?;
    let node = participant
        .node_ref_id
        .as_deref()
        .and_then(|id| map.node(id))
        .ok_or_else(|| StructuralError::UnknownParticipant {
            reaction: reaction_id.to_string(),
            participant: participant_id.to_string(),
        })?;
    Ok(node.connected_segments(reaction_id))
}

/// Checks the relational invariants an exporter relies on.
pub fn validate_reaction(map: &Map, reaction_id: &str) -> Result<(), StructuralError> {
    let reaction = map
        .reaction(reaction_id)
        .ok_or_else(|| StructuralError::UnknownReaction(reaction_id.to_string()))?;
    for segment in reaction.segments() {
        for end in [&segment.from_node_id, &segment.to_node_id] {
            if map.node(end).is_none() {
                return Err(StructuralError::MissingNode {
                    reaction: reaction_id.to_string(),
                    segment: segment.id.clone(),
                    node: end.clone(),
                });
            }
        }
    }
    let midmarker = reaction
        .midmarker
        .as_deref()
        .ok_or_else(|| StructuralError::MissingMidmarker(reaction_id.to_string()))?;
    match map.node(midmarker) {
        Some(node) if node.is_midmarker() => {}
        Some(_) => {
            return Err(StructuralError::NotAMidmarker {
                reaction: reaction_id.to_string(),
                node: midmarker.to_string(),
            });
        }
        None => return Err(StructuralError::MissingMidmarker(reaction_id.to_string())),
    }
    let resolved = reaction
        .metabolites()
        .filter_map(|m| m.node_ref_id.as_deref())
        .any(|id| map.node(id).is_some());
    if !resolved {
        return Err(StructuralError::NoParticipants(reaction_id.to_string()));
    }
    Ok(())
}
