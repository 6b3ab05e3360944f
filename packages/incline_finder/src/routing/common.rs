use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use petgraph::graph::NodeIndex;
use serde::Serialize;

use crate::common::config::SearchParameters;
use crate::common::geo_math::Coordinate;
use crate::common::graph_data::RoadGraph;
use crate::routing::validation::{
    PathAssessment, assess_path, segment_incline,
};

/// Container for a single candidate route. Points are tracked using their
/// index in the graph, alongside the cumulative distance travelled at each
/// point so that steps can be undone without recalculating anything
#[derive(Clone, Debug, PartialEq)]
pub struct Candidate {
    pub points: Vec<NodeIndex>,
    dists: Vec<f64>,
}

/// Defines the 3 possible outcome states of a candidate after a step has been
/// taken
#[derive(Debug, PartialEq)]
pub enum StepResult {
    /// The step was kept, but the candidate is still too short
    Valid,
    /// The step was kept, and the candidate now covers the target distance.
    /// Carries the assessment of the finished path
    Complete(PathAssessment),
    /// The step was rejected, the candidate is unchanged
    Invalid,
}

impl Candidate {
    /// Create a new Candidate route, starting at the provided start_inx
    pub fn new(start_inx: NodeIndex) -> Candidate {
        Candidate {
            points: vec![start_inx],
            dists: vec![0.0],
        }
    }

    /// The total distance travelled by this candidate so far
    pub fn distance(&self) -> f64 {
        self.dists.last().copied().unwrap_or(0.0)
    }

    pub fn cur_inx(&self) -> Option<NodeIndex> {
        self.points.last().copied()
    }

    /// The node visited immediately before the current one, if any
    pub fn prev_inx(&self) -> Option<NodeIndex> {
        self.points.len().checked_sub(2).map(|inx| self.points[inx])
    }

    /// Attempt to move along an edge of the provided length to the next
    /// node. The full path is checked after the step is taken, and the step
    /// is reverted if the path is no longer valid
    pub fn take_step(
        &mut self,
        graph: &RoadGraph,
        config: &SearchParameters,
        next_inx: NodeIndex,
        distance: f64,
    ) -> StepResult {
        if self.points.is_empty() || segment_incline(0.0, distance).is_none() {
            return StepResult::Invalid;
        }

        let new_dist = self.distance() + distance;
        self.points.push(next_inx);
        self.dists.push(new_dist);

        let assessment = assess_path(graph, config, &self.points);
        if !assessment.is_valid() {
            self.step_back();
            return StepResult::Invalid;
        }

        if new_dist >= config.path_distance {
            StepResult::Complete(assessment)
        } else {
            StepResult::Valid
        }
    }

    /// Undo the most recent step
    pub fn step_back(&mut self) {
        self.points.pop();
        self.dists.pop();
    }
}

/// Shared store for completed routes. Routes are only accepted until the
/// configured maximum is reached, this holds even when several searches are
/// running at once
#[derive(Debug)]
pub struct RouteCollector {
    max_routes: usize,
    count: AtomicUsize,
    accepted: Mutex<Vec<Vec<NodeIndex>>>,
}

impl RouteCollector {
    pub fn new(max_routes: usize) -> RouteCollector {
        RouteCollector {
            max_routes: max_routes,
            count: AtomicUsize::new(0),
            accepted: Mutex::new(Vec::new()),
        }
    }

    pub fn is_full(&self) -> bool {
        self.count.load(Ordering::SeqCst) >= self.max_routes
    }

    pub fn len(&self) -> usize {
        self.count.load(Ordering::SeqCst).min(self.max_routes)
    }

    /// Store a copy of the provided path, returning false if the maximum
    /// number of routes has already been reached. A slot is reserved before
    /// the path is stored
    pub fn try_accept(&self, path: &[NodeIndex]) -> bool {
        let reserved = self
            .count
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |count| {
                (count < self.max_routes).then_some(count + 1)
            })
            .is_ok();

        if reserved {
            self.accepted
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner())
                .push(path.to_vec());
        }
        reserved
    }

    /// Retrieve all accepted paths, in the order they were accepted
    pub fn into_paths(self) -> Vec<Vec<NodeIndex>> {
        self.accepted
            .into_inner()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Minimal container for a completed route. This holds only the information
/// required by the webapp in order to render it
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Route {
    pub id: usize,
    pub path: Vec<Coordinate>,
}

/// Convert accepted paths into routes, numbering them from 1 in the order
/// they were accepted
pub fn format_routes(
    graph: &RoadGraph,
    paths: Vec<Vec<NodeIndex>>,
) -> Vec<Route> {
    paths
        .into_iter()
        .enumerate()
        .map(|(inx, path)| Route {
            id: inx + 1,
            path: path.into_iter().map(|node| graph[node].coord()).collect(),
        })
        .collect()
}

#[cfg(test)]
mod tests {

    use std::sync::Arc;
    use std::thread;

    use approx::assert_abs_diff_eq;

    use super::*;
    use crate::test_utils::{get_test_parameters, line_graph, rise_for};

    #[test]
    fn test_new_candidate() {
        let result = Candidate::new(NodeIndex::new(3));

        assert_eq!(result.points, vec![NodeIndex::new(3)]);
        assert_eq!(result.distance(), 0.0);
        assert_eq!(result.cur_inx(), Some(NodeIndex::new(3)));
        assert_eq!(result.prev_inx(), None);
    }

    mod test_take_step {

        use super::*;

        /// Steps which keep the candidate below the target distance should
        /// return StepResult::Valid
        #[test]
        fn test_valid() {
            let (graph, nodes) = line_graph(&[0.0, 0.0, 0.0], 0.05);
            let config = get_test_parameters(1.0);
            let mut candidate = Candidate::new(nodes[0]);

            let result = candidate.take_step(&graph, &config, nodes[1], 0.05);

            assert_eq!(result, StepResult::Valid);
            assert_eq!(candidate.points, vec![nodes[0], nodes[1]]);
            assert_eq!(candidate.prev_inx(), Some(nodes[0]));
        }

        /// Reaching the target distance should return StepResult::Complete
        /// and leave the final node in place
        #[test]
        fn test_complete() {
            let (graph, nodes) = line_graph(&[0.0, 0.0, 0.0], 0.05);
            let config = get_test_parameters(0.05);
            let mut candidate = Candidate::new(nodes[0]);

            let result = candidate.take_step(&graph, &config, nodes[1], 0.05);

            assert!(matches!(result, StepResult::Complete(_)));
            assert_eq!(candidate.points.len(), 2);
        }

        /// Completed candidates should report the average incline of the
        /// whole path
        #[test]
        fn test_complete_reports_incline() {
            let rise = rise_for(1.0, 0.05);
            let (graph, nodes) = line_graph(&[0.0, rise, 2.0 * rise], 0.05);
            let config = get_test_parameters(0.1);
            let mut candidate = Candidate::new(nodes[0]);
            candidate.take_step(&graph, &config, nodes[1], 0.05);

            let result = candidate.take_step(&graph, &config, nodes[2], 0.05);

            let assessment = match result {
                StepResult::Complete(assessment) => assessment,
                other => panic!("expected a complete route, got {:?}", other),
            };
            assert_abs_diff_eq!(assessment.distance, 0.1, epsilon = 1e-9);
            assert_abs_diff_eq!(
                assessment.overall_incline.unwrap(),
                1.0,
                epsilon = 1e-6
            );
        }

        /// Rejected steps should leave the candidate as it was
        #[test]
        fn test_invalid() {
            let (graph, nodes) =
                line_graph(&[0.0, rise_for(10.0, 0.05)], 0.05);
            let config = get_test_parameters(1.0);
            let mut candidate = Candidate::new(nodes[0]);

            let result = candidate.take_step(&graph, &config, nodes[1], 0.05);

            assert_eq!(result, StepResult::Invalid);
            assert_eq!(candidate, Candidate::new(nodes[0]));
        }

        /// Steps along zero length edges are never taken
        #[test]
        fn test_zero_distance() {
            let (graph, nodes) = line_graph(&[0.0, 0.0], 0.05);
            let config = get_test_parameters(0.0);
            let mut candidate = Candidate::new(nodes[0]);

            let result = candidate.take_step(&graph, &config, nodes[1], 0.0);

            assert_eq!(result, StepResult::Invalid);
        }

        #[test]
        fn test_step_back() {
            let (graph, nodes) = line_graph(&[0.0, 0.0, 0.0], 0.05);
            let config = get_test_parameters(1.0);
            let mut candidate = Candidate::new(nodes[0]);
            candidate.take_step(&graph, &config, nodes[1], 0.05);

            candidate.step_back();

            assert_eq!(candidate, Candidate::new(nodes[0]));
        }
    }

    mod test_route_collector {

        use super::*;

        #[test]
        fn test_accept_until_full() {
            let collector = RouteCollector::new(2);
            let path = vec![NodeIndex::new(0), NodeIndex::new(1)];

            assert!(collector.try_accept(&path));
            assert!(!collector.is_full());
            assert!(collector.try_accept(&path));
            assert!(collector.is_full());
            assert!(!collector.try_accept(&path));

            assert_eq!(collector.len(), 2);
            assert_eq!(collector.into_paths().len(), 2);
        }

        /// Many threads competing for the last few slots should never push
        /// the collector over its maximum
        #[test]
        fn test_concurrent_accept() {
            let collector = Arc::new(RouteCollector::new(5));

            let handles: Vec<_> = (0..8)
                .map(|inx| {
                    let collector = Arc::clone(&collector);
                    thread::spawn(move || {
                        for _ in 0..10 {
                            collector.try_accept(&[NodeIndex::new(inx)]);
                        }
                    })
                })
                .collect();
            for handle in handles {
                handle.join().unwrap();
            }

            let collector = Arc::try_unwrap(collector).unwrap();
            assert_eq!(collector.into_paths().len(), 5);
        }
    }

    /// Routes should be numbered in acceptance order, with each node
    /// replaced by its coordinates
    #[test]
    fn test_format_routes() {
        let (graph, nodes) = line_graph(&[0.0, 0.0, 0.0], 0.05);
        let paths = vec![vec![nodes[0], nodes[1]], vec![nodes[2], nodes[1]]];

        let result = format_routes(&graph, paths);

        assert_eq!(result.len(), 2);
        assert_eq!(result[0].id, 1);
        assert_eq!(result[1].id, 2);
        assert_eq!(result[1].path[0], graph[nodes[2]].coord());
        assert_eq!(result[1].path[1], graph[nodes[1]].coord());
    }

    #[test]
    fn test_route_serialize() {
        let route = Route {
            id: 1,
            path: vec![Coordinate::new(1.0, 2.0)],
        };

        let result = serde_json::to_value(&route).unwrap();

        assert_eq!(
            result,
            serde_json::json!({"id": 1, "path": [{"lat": 1.0, "lng": 2.0}]})
        );
    }
}
