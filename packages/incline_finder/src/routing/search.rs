//! Depth-first search for routes which cover the target distance while
//! staying close to the optimal incline. Each start node is explored with an
//! explicit stack of frames, one frame per node in the current path, so that
//! long routes cannot overflow the call stack.

use indicatif::ProgressBar;
use petgraph::graph::NodeIndex;
use petgraph::visit::EdgeRef;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::seq::index::sample;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use tracing::{debug, info, warn};

use crate::common::config::{ExplorationMode, SearchParameters};
use crate::common::graph_data::RoadGraph;
use crate::routing::common::{
    Candidate, Route, RouteCollector, StepResult, format_routes,
};
use crate::routing::validation::segment_incline;

/// The neighbours of a single node in the path which are yet to be tried,
/// stored alongside the length of the edge leading to each one
struct Frame {
    pending: Vec<(NodeIndex, f64)>,
}

/// Determine which neighbours of the current node should be tried next.
/// The node the candidate has just come from is never offered. Neighbours
/// are popped from the end of the returned list
fn get_next_steps<R: Rng + ?Sized>(
    graph: &RoadGraph,
    config: &SearchParameters,
    candidate: &Candidate,
    rng: &mut R,
) -> Vec<(NodeIndex, f64)> {
    let cur_inx = match candidate.cur_inx() {
        Some(inx) => inx,
        None => return Vec::new(),
    };
    let prev_inx = candidate.prev_inx();

    let mut options: Vec<(NodeIndex, f64)> = graph
        .edges(cur_inx)
        .map(|eref| {
            let next = if eref.source() == cur_inx {
                eref.target()
            } else {
                eref.source()
            };
            (next, eref.weight().distance)
        })
        .filter(|(next, _)| Some(*next) != prev_inx)
        .collect();

    match config.exploration_mode {
        ExplorationMode::Exploratory => {
            options.shuffle(rng);
            options
        }
        ExplorationMode::Greedy => {
            get_best_step(graph, config, cur_inx, &options)
                .into_iter()
                .collect()
        }
    }
}

/// Pick the neighbour whose incline is closest to the optimal incline. On a
/// tie the first neighbour wins, neighbours without an elevation or with no
/// distance to them are never picked
fn get_best_step(
    graph: &RoadGraph,
    config: &SearchParameters,
    cur_inx: NodeIndex,
    options: &[(NodeIndex, f64)],
) -> Option<(NodeIndex, f64)> {
    let cur_ele = graph[cur_inx].elevation?;

    let mut best: Option<((NodeIndex, f64), f64)> = None;
    for (next, distance) in options {
        let cost = match graph[*next]
            .elevation
            .and_then(|ele| segment_incline(ele - cur_ele, *distance))
        {
            Some(incline) => (incline - config.optimal_incline).powi(2),
            None => continue,
        };

        let improves = match best {
            Some((_, best_cost)) => cost < best_cost,
            None => true,
        };
        if improves {
            best = Some(((*next, *distance), cost));
        }
    }

    best.map(|(step, _)| step)
}

/// Run the search from a single start node until every path from it has
/// been tried, the collector is full, or the step limit is reached. Returns
/// the number of steps which were attempted
fn traverse_from<R: Rng + ?Sized>(
    graph: &RoadGraph,
    config: &SearchParameters,
    start_inx: NodeIndex,
    collector: &RouteCollector,
    rng: &mut R,
) -> usize {
    let mut candidate = Candidate::new(start_inx);
    let mut frames = vec![Frame {
        pending: get_next_steps(graph, config, &candidate, rng),
    }];
    let mut steps: usize = 0;

    while let Some(frame) = frames.last_mut() {
        if collector.is_full() {
            break;
        }

        let (next_inx, distance) = match frame.pending.pop() {
            Some(step) => step,
            None => {
                frames.pop();
                candidate.step_back();
                continue;
            }
        };

        if config.max_steps_per_start.is_some_and(|limit| steps >= limit) {
            debug!("Step limit reached for start node {:?}", start_inx);
            break;
        }
        steps += 1;

        match candidate.take_step(graph, config, next_inx, distance) {
            StepResult::Invalid => {}
            StepResult::Complete(assessment) => {
                if collector.try_accept(&candidate.points) {
                    debug!(
                        "Accepted route {} of {:.2} miles at {:.2}% overall",
                        collector.len(),
                        candidate.distance(),
                        assessment.overall_incline.unwrap_or(0.0)
                    );
                }
                candidate.step_back();
            }
            StepResult::Valid => {
                let pending = get_next_steps(graph, config, &candidate, rng);
                frames.push(Frame { pending: pending });
            }
        }
    }

    steps
}

/// Pick up to the configured number of start nodes uniformly at random,
/// without replacement
fn sample_start_nodes<R: Rng + ?Sized>(
    graph: &RoadGraph,
    sample_size: usize,
    rng: &mut R,
) -> Vec<NodeIndex> {
    let amount = sample_size.min(graph.node_count());
    sample(rng, graph.node_count(), amount)
        .into_iter()
        .map(NodeIndex::new)
        .collect()
}

/// Search from each of the provided start nodes in turn, stopping as soon
/// as enough routes have been found. Returns the accepted paths in the order
/// they were found
fn search_paths<R: Rng + ?Sized>(
    graph: &RoadGraph,
    config: &SearchParameters,
    starts: &[NodeIndex],
    rng: &mut R,
) -> Vec<Vec<NodeIndex>> {
    info!(
        "Searching for up to {} routes from {} start nodes",
        config.max_routes,
        starts.len()
    );

    let collector = RouteCollector::new(config.max_routes);
    let bar = if config.show_progress {
        ProgressBar::new(starts.len() as u64)
    } else {
        ProgressBar::hidden()
    };

    if config.parallel {
        // Each start gets its own rng, seeded before any work is scheduled
        let seeded: Vec<(NodeIndex, u64)> =
            starts.iter().map(|start| (*start, rng.next_u64())).collect();

        seeded.par_iter().for_each(|(start_inx, seed)| {
            if collector.is_full() {
                return;
            }
            let mut start_rng = StdRng::seed_from_u64(*seed);
            let steps = traverse_from(
                graph,
                config,
                *start_inx,
                &collector,
                &mut start_rng,
            );
            debug!("Searched {} steps from {:?}", steps, start_inx);
            bar.inc(1);
        });
    } else {
        for start_inx in starts {
            if collector.is_full() {
                break;
            }
            let steps =
                traverse_from(graph, config, *start_inx, &collector, rng);
            debug!("Searched {} steps from {:?}", steps, start_inx);
            bar.inc(1);
        }
    }

    bar.finish();

    let paths = collector.into_paths();
    info!("Route search complete, found {} routes", paths.len());
    paths
}

/// Search for routes starting from the provided nodes, in the order they
/// are provided
pub fn search_from_starts<R: Rng + ?Sized>(
    graph: &RoadGraph,
    config: &SearchParameters,
    starts: &[NodeIndex],
    rng: &mut R,
) -> Vec<Route> {
    let paths = search_paths(graph, config, starts, rng);
    format_routes(graph, paths)
}

/// Crawl the provided graph for routes which meet all of the criteria
/// provided by the user, starting from a random sample of its nodes. The
/// same rng seed will always produce the same routes for a given graph
/// unless the search is running in parallel and the route limit is hit
pub fn generate_routes<R: Rng + ?Sized>(
    graph: &RoadGraph,
    config: &SearchParameters,
    rng: &mut R,
) -> Vec<Route> {
    if graph.node_count() == 0 {
        warn!("Graph has no nodes, no routes can be generated");
        return Vec::new();
    }

    let starts = sample_start_nodes(graph, config.start_sample_size, rng);
    search_from_starts(graph, config, &starts, rng)
}
