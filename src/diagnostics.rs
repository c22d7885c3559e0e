use thiserror::Error;

/// Failure of the whole conversion. No partial output is produced.
#[derive(Debug, Error)]
pub enum ConvertError {
    #[error("malformed map container: {0}")]
    MalformedContainer(String),
    #[error("malformed document: {0}")]
    MalformedDocument(String),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

/// A relational invariant that could not be established for one reaction.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StructuralError {
    #[error("segment {segment} of reaction {reaction} references missing node {node}")]
    MissingNode {
        reaction: String,
        segment: String,
        node: String,
    },
    #[error("reaction {0} has no resolvable participants")]
    NoParticipants(String),
    #[error("reaction {0} has no midmarker")]
    MissingMidmarker(String),
    #[error("node {node} referenced as midmarker of reaction {reaction} is not a midmarker")]
    NotAMidmarker { reaction: String, node: String },
    #[error("unknown reaction {0}")]
    UnknownReaction(String),
    #[error("reaction {reaction} has no participant {participant}")]
    UnknownParticipant {
        reaction: String,
        participant: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Warning,
    Error,
}

/// One non-fatal condition observed while converting.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Diagnostic {
    #[error("segment {segment} of reaction {reaction} references missing node {node}")]
    MissingNode {
        reaction: String,
        segment: String,
        node: String,
    },
    #[error("reaction {reaction} has no participant record for node {node} ({external_id})")]
    MissingParticipant {
        reaction: String,
        node: String,
        external_id: String,
    },
    #[error("participant {participant} of reaction {reaction} has no node")]
    ParticipantWithoutNode {
        reaction: String,
        participant: String,
    },
    #[error("reaction {reaction} has several nodes for participant {participant}; using {kept}")]
    DuplicateParticipant {
        reaction: String,
        participant: String,
        kept: String,
    },
    #[error("undefined coefficient for participant {participant} of reaction {reaction}")]
    UndefinedCoefficient {
        reaction: String,
        participant: String,
    },
    #[error("zero coefficient for participant {participant} of reaction {reaction}")]
    ZeroCoefficient {
        reaction: String,
        participant: String,
    },
    #[error("node {node} has {count} direct segments in reaction {reaction}; using {kept}")]
    MultipleArcs {
        reaction: String,
        node: String,
        count: usize,
        kept: String,
    },
    #[error("chain of participant {participant} in reaction {reaction} stops at {stopped_at}")]
    IncompleteChain {
        reaction: String,
        participant: String,
        stopped_at: String,
    },
    #[error("chain of participant {participant} in reaction {reaction} revisits node {node}")]
    ChainCycle {
        reaction: String,
        participant: String,
        node: String,
    },
    #[error("segment {segment} of reaction {reaction} is reachable from midmarkers {midmarkers:?}")]
    ConflictingSplit {
        reaction: String,
        segment: String,
        midmarkers: Vec<String>,
    },
    #[error("segment {segment} of reaction {reaction} is not reachable from any midmarker")]
    UnassignedSegment { reaction: String, segment: String },
    #[error("participant {participant} of reaction {reaction} is not reachable from any midmarker")]
    UnreachableParticipant {
        reaction: String,
        participant: String,
    },
    #[error("reaction {reaction} lost segments {segments:?}")]
    LostSegments {
        reaction: String,
        segments: Vec<String>,
    },
    #[error("invalid compartment id in {0}")]
    InvalidCompartmentId(String),
    #[error("{kind} {id} replaced by a later entry")]
    ReplacedEntity { kind: &'static str, id: String },
    #[error("{kind} node {node} is not supported by this format")]
    UnsupportedNode { node: String, kind: &'static str },
    #[error("skipped {kind} {id}: {reason}")]
    Skipped {
        kind: &'static str,
        id: String,
        reason: String,
    },
    #[error(transparent)]
    Structural(#[from] StructuralError),
}

impl Diagnostic {
    pub fn severity(&self) -> Severity {
        match self {
            Diagnostic::MissingNode { .. }
            | Diagnostic::MissingParticipant { .. }
            | Diagnostic::Structural(_) => Severity::Error,
            _ => Severity::Warning,
        }
    }

    pub fn is_error(&self) -> bool {
        self.severity() == Severity::Error
    }
}

/// Ordered accumulator threaded through linking, splitting and stitching.
#[derive(Debug, Clone, Default)]
pub struct Diagnostics {
    entries: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, diagnostic: Diagnostic) {
        match diagnostic.severity() {
            Severity::Error => log::error!("{diagnostic}"),
            Severity::Warning => log::warn!("{diagnostic}"),
        }
        self.entries.push(diagnostic);
    }

    pub fn extend(&mut self, other: Diagnostics) {
        self.entries.extend(other.entries);
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.entries.iter()
    }

    pub fn errors(&self) -> impl Iterator<Item = &Diagnostic> {
        self.entries.iter().filter(|d| d.is_error())
    }

    pub fn warnings(&self) -> impl Iterator<Item = &Diagnostic> {
        self.entries.iter().filter(|d| !d.is_error())
    }

    pub fn has_errors(&self) -> bool {
        self.entries.iter().any(Diagnostic::is_error)
    }

    pub fn into_vec(self) -> Vec<Diagnostic> {
        self.entries
    }
}

impl<'a> IntoIterator for &'a Diagnostics {
    type Item = &'a Diagnostic;
    type IntoIter = std::slice::Iter<'a, Diagnostic>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}
