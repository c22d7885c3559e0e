use std::f64::consts::FRAC_PI_2;

use crate::model::{Map, Point, Role};
use crate::topology::types::{Curve, CurveHop};

/// Distance of a relocated reaction label from the midmarker.
pub const LABEL_DISTANCE: f64 = 20.0;

/// What the far side of a single-participant reaction stands for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoundaryKind {
    /// The participant is produced out of nothing.
    Source,
    /// The participant is consumed into nothing.
    Sink,
    /// Reversible: both at once.
    Exchange,
}

impl BoundaryKind {
    pub fn suffix(&self) -> &'static str {
        match self {
            Self::Source => "source",
            Self::Sink => "sink",
            Self::Exchange => "exchange",
        }
    }
}

/// The implied second participant of a reaction with a single metabolite.
#[derive(Debug, Clone, PartialEq)]
pub struct Boundary {
    pub kind: BoundaryKind,
    pub participant_id: String,
    pub metabolite_node_id: String,
    /// Role of the boundary itself, opposite to the participant's.
    pub role: Role,
    pub midmarker: Point,
    pub metabolite: Point,
    /// Where the boundary is drawn.
    pub anchor: Point,
    /// Every segment of the reaction is a straight line.
    pub straight: bool,
}

impl Boundary {
    /// Straight line between the midmarker and the anchor, running with the flow.
    pub fn curve(&self) -> Curve {
        let hop = if self.role.is_product() {
            CurveHop::line(self.midmarker, self.anchor)
        } else {
            CurveHop::line(self.anchor, self.midmarker)
        };
        Curve::new(vec![hop])
    }

    /// Label position for straight boundary reactions, beside the midmarker and
    /// turned away from the line: below a horizontal one, right of a vertical one.
    pub fn label_anchor(&self) -> Option<Point> {
        if !self.straight {
            return None;
        }
        let dx = (self.metabolite.x - self.midmarker.x).abs();
        let dy = (self.metabolite.y - self.midmarker.y).abs();
        let orientation = dy.atan2(dx) / FRAC_PI_2;
        Some(Point::new(
            self.midmarker.x + orientation * LABEL_DISTANCE,
            self.midmarker.y + (1.0 - orientation) * LABEL_DISTANCE,
        ))
    }
}

/// Finds the boundary of a reaction with exactly one resolved participant.
///
/// Straight reactions put the anchor at the metabolite mirrored through the
/// midmarker. Curved ones use the multimarker the drawing dangles from, and
/// fall back to the mirror point when there is none.
pub fn reaction_boundary(map: &Map, reaction_id: &str) -> Option<Boundary> {
    let reaction = map.reaction(reaction_id)?;
    if reaction.metabolite_count() != 1 {
        return None;
    }
    let participant = reaction.metabolites().next()?;
    let node = participant.node_ref_id.as_deref().and_then(|id| map.node(id))?;
    let midmarker = reaction.midmarker.as_deref().and_then(|id| map.node(id))?;

    let (metabolite, centre) = (node.position(), midmarker.position());
    let straight = !reaction.segments().any(|s| s.is_curved());
    let mirrored = Point::new(2.0 * centre.x - metabolite.x, 2.0 * centre.y - metabolite.y);
    let anchor = if straight {
        mirrored
    } else {
        reaction
            .node_ids()
            .iter()
            .filter_map(|id| map.node(id))
            .filter(|n| n.is_multimarker())
            .find(|n| reaction.segments().filter(|s| s.touches(&n.id)).count() == 1)
            .map(|n| n.position())
            .unwrap_or(mirrored)
    };

    let participant_role = participant.role();
    let kind = if reaction.reversibility == Some(true) {
        BoundaryKind::Exchange
    } else if participant_role.is_product() {
        BoundaryKind::Source
    } else {
        BoundaryKind::Sink
    };
    let role = if participant_role.is_product() {
        Role::Substrate
    } else {
        Role::Product
    };
    Some(Boundary {
        kind,
        participant_id: participant.external_id.clone(),
        metabolite_node_id: node.id.clone(),
        role,
        midmarker: centre,
        metabolite,
        anchor,
        straight,
    })
}
