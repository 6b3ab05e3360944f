//! Checks which determine whether a candidate route is acceptable, based on
//! the incline of each of the segments it is made up of. Candidates are
//! always assessed in full rather than incrementally.

use petgraph::graph::NodeIndex;

use crate::common::config::{OverallInclineRule, SearchParameters};
use crate::common::geo_math::METRES_PER_MILE;
use crate::common::graph_data::RoadGraph;

/// The outcome of assessing a candidate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Valid,
    /// One of the nodes in the path has no elevation data
    MissingElevation,
    /// Two consecutive nodes in the path are not joined by an edge
    Disconnected,
    /// Too much of the path falls outside of the local incline band
    LocalToleranceExceeded,
    /// The average incline of the path is too far from the optimal incline,
    /// only returned when the overall rule is being enforced
    OverallInclineOutOfRange,
}

/// Container for the metrics calculated while assessing a candidate. The
/// overall incline is None until the path covers some distance
#[derive(Debug, Clone, PartialEq)]
pub struct PathAssessment {
    pub verdict: Verdict,
    pub distance: f64,
    pub out_of_tolerance: f64,
    pub overall_incline: Option<f64>,
}

impl PathAssessment {
    fn without_metrics(verdict: Verdict) -> PathAssessment {
        PathAssessment {
            verdict: verdict,
            distance: 0.0,
            out_of_tolerance: 0.0,
            overall_incline: None,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.verdict == Verdict::Valid
    }
}

/// Calculate the incline of a segment as a percentage, given the change in
/// elevation in metres and the length of the segment in miles. Segments with
/// no length have no incline
pub fn segment_incline(rise: f64, distance: f64) -> Option<f64> {
    let run = distance * METRES_PER_MILE;
    if run == 0.0 {
        None
    } else {
        Some(rise / run * 100.0)
    }
}

/// Check the provided path against the incline requirements set out in the
/// search parameters. Any segment whose incline falls outside of the local
/// band counts towards the out of tolerance distance, and the path is
/// rejected once that exceeds the permitted fraction of the target distance
pub fn assess_path(
    graph: &RoadGraph,
    config: &SearchParameters,
    path: &[NodeIndex],
) -> PathAssessment {
    if path.len() < 2 {
        return PathAssessment::without_metrics(Verdict::Valid);
    }

    let mut elevations = Vec::with_capacity(path.len());
    for inx in path {
        match graph.node_weight(*inx).and_then(|node| node.elevation) {
            Some(elevation) => elevations.push(elevation),
            None => {
                return PathAssessment::without_metrics(Verdict::MissingElevation);
            }
        }
    }

    let mut distance = 0.0;
    let mut out_of_tolerance = 0.0;

    for (pair, eles) in path.windows(2).zip(elevations.windows(2)) {
        let seg_dist = match graph.find_edge(pair[0], pair[1]) {
            Some(edge) => graph[edge].distance,
            None => {
                return PathAssessment::without_metrics(Verdict::Disconnected);
            }
        };

        // Zero length segments don't count towards either total
        let incline = match segment_incline(eles[1] - eles[0], seg_dist) {
            Some(incline) => incline,
            None => continue,
        };

        distance += seg_dist;
        if !config.local_band.contains(incline) {
            out_of_tolerance += seg_dist;
        }
    }

    let overall_incline = match (elevations.first(), elevations.last()) {
        (Some(first), Some(last)) => segment_incline(last - first, distance),
        _ => None,
    };

    let verdict = if out_of_tolerance > config.max_out_of_tolerance() {
        Verdict::LocalToleranceExceeded
    } else if config.overall_rule == OverallInclineRule::Enforce
        && overall_incline
            .is_some_and(|incline| !config.overall_band().contains(incline))
    {
        Verdict::OverallInclineOutOfRange
    } else {
        Verdict::Valid
    };

    PathAssessment {
        verdict: verdict,
        distance: distance,
        out_of_tolerance: out_of_tolerance,
        overall_incline: overall_incline,
    }
}
