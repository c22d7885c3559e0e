//! Graph reconstruction between loosely ordered node/segment maps and
//! per-participant curves.

pub mod boundary;
pub mod compartments;
pub mod decomposer;
pub mod linker;
pub mod splitter;
pub mod stitcher;
pub mod types;

pub use boundary::{Boundary, BoundaryKind, reaction_boundary};
pub use compartments::infer_compartments;
pub use decomposer::{Decomposition, ParticipantCurve, decompose_curve, flow_oriented};
pub use linker::{link_map, link_reaction, participant_chain, validate_reaction};
pub use splitter::{split_reaction, split_reactions};
pub use stitcher::{CurveDirection, Stitch, stitch_curve, stitch_participant, stitch_reaction};
pub use types::{Curve, CurveHop, ReactionCurves, Role, StitchedCurve};
