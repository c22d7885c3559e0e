use serde::{Deserialize, Serialize};

use crate::model::Point;
pub use crate::model::Role;

/// One hop of a curve: a straight line, or a cubic curve when both control points are set.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CurveHop {
    pub start: Point,
    pub end: Point,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub b1: Option<Point>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub b2: Option<Point>,
}

impl CurveHop {
    pub fn line(start: Point, end: Point) -> Self {
        Self {
            start,
            end,
            b1: None,
            b2: None,
        }
    }

    pub fn reversed(&self) -> Self {
        Self {
            start: self.end,
            end: self.start,
            b1: self.b2,
            b2: self.b1,
        }
    }

    pub fn is_cubic(&self) -> bool {
        self.b1.is_some() && self.b2.is_some()
    }

    pub fn translated(&self, by: Point) -> Self {
        Self {
            start: self.start.translate(by),
            end: self.end.translate(by),
            b1: self.b1.map(|p| p.translate(by)),
            b2: self.b2.map(|p| p.translate(by)),
        }
    }
}

/// Ordered hops where each hop ends where the next one starts.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Curve {
    pub hops: Vec<CurveHop>,
}

impl Curve {
    pub fn new(hops: Vec<CurveHop>) -> Self {
        Self { hops }
    }

    pub fn is_empty(&self) -> bool {
        self.hops.is_empty()
    }

    pub fn len(&self) -> usize {
        self.hops.len()
    }

    pub fn start(&self) -> Option<Point> {
        self.hops.first().map(|hop| hop.start)
    }

    pub fn end(&self) -> Option<Point> {
        self.hops.last().map(|hop| hop.end)
    }

    /// Start point, every attachment point between hops, and the end point.
    pub fn points(&self) -> Vec<Point> {
        let mut points = Vec::with_capacity(self.hops.len() + 1);
        if let Some(first) = self.hops.first() {
            points.push(first.start);
        }
        points.extend(self.hops.iter().map(|hop| hop.end));
        points
    }

    /// Reverses hop order and every hop. Applying it twice is a no-op.
    pub fn reverse(&mut self) {
        self.hops.reverse();
        for hop in &mut self.hops {
            *hop = hop.reversed();
        }
    }

    pub fn reversed(&self) -> Curve {
        let mut curve = self.clone();
        curve.reverse();
        curve
    }

    pub fn translated(&self, by: Point) -> Curve {
        Curve::new(self.hops.iter().map(|hop| hop.translated(by)).collect())
    }
}

/// The curve of one reaction participant, with the segments it was built from.
#[derive(Debug, Clone, PartialEq)]
pub struct StitchedCurve {
    pub participant_id: String,
    pub metabolite_node_id: String,
    pub midmarker_id: Option<String>,
    pub role: Role,
    pub segment_ids: Vec<String>,
    pub curve: Curve,
    pub lost_segments: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReactionCurves {
    pub reaction_id: String,
    pub curves: Vec<StitchedCurve>,
    /// Segments of the reaction that ended up in no participant curve.
    pub lost_segments: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hop(x0: f64, x1: f64) -> CurveHop {
        CurveHop::line(Point::new(x0, 0.0), Point::new(x1, 0.0))
    }

    #[test]
    fn points_include_attachment_points() {
        let curve = Curve::new(vec![hop(0.0, 10.0), hop(10.0, 20.0)]);
        let xs: Vec<f64> = curve.points().iter().map(|p| p.x).collect();
        assert_eq!(xs, vec![0.0, 10.0, 20.0]);
    }

    #[test]
    fn reversing_swaps_controls() {
        let mut curve = Curve::new(vec![CurveHop {
            b1: Some(Point::new(1.0, 1.0)),
            b2: Some(Point::new(2.0, 2.0)),
            ..hop(0.0, 3.0)
        }]);
        let original = curve.clone();
        curve.reverse();
        assert_eq!(curve.start(), Some(Point::new(3.0, 0.0)));
        assert_eq!(curve.hops[0].b1, Some(Point::new(2.0, 2.0)));
        curve.reverse();
        assert_eq!(curve, original);
    }
}
