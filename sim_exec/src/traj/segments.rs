//! # Segment detection
//!
//! A trajectory is split into one segment per gate. Gate `g`'s segment ends
//! at the step where the reference tooltip passes closest to that gate's
//! planned position, and starts where the previous gate's segment ended. The
//! final gate's segment always ends on the last step of the trajectory.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use nalgebra::Vector3;
use serde::Serialize;

use super::Trajectory;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// The portion of a trajectory leading up to one gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Segment {
    /// Index of the gate this segment approaches
    pub gate_index: usize,

    /// First step of the segment
    pub start: usize,

    /// Step of closest approach to the gate. The segment covers
    /// `[start, end)`, although a step equal to `end` is still tracked
    /// against this segment's gate.
    pub end: usize,
}

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Find the end of every gate's segment from tooltip and gate positions.
///
/// For each gate in order the search window runs from the previous gate's
/// end to the final step, and the first step of minimum distance wins. The
/// last gate's end is always the final step. With no gates the result is
/// empty, and with no tooltip samples every end is 0.
pub fn closest_approach_ends(
    tooltip_m: &[Vector3<f64>],
    gate_refs_m: &[Vector3<f64>],
) -> Vec<usize> {
    let num_gates = gate_refs_m.len();

    if tooltip_m.is_empty() {
        return vec![0; num_gates];
    }

    let last = tooltip_m.len() - 1;
    let mut ends = Vec::with_capacity(num_gates);
    let mut window_start = 0;

    for (g, gate) in gate_refs_m.iter().enumerate() {
        let end = if g == num_gates - 1 {
            last
        } else {
            let mut best = window_start;
            let mut best_dist = std::f64::INFINITY;

            for (i, tooltip) in tooltip_m.iter().enumerate().skip(window_start) {
                let dist = (tooltip - gate).norm();
                if dist < best_dist {
                    best = i;
                    best_dist = dist;
                }
            }

            best
        };

        ends.push(end);
        window_start = end;
    }

    ends
}

/// Get the segment ends of a trajectory.
///
/// Gate reference positions are taken from the first sample, i.e. the gate
/// layout recorded by the planner rather than any live position.
pub fn detect_segment_ends(traj: &Trajectory) -> Vec<usize> {
    let tooltip_m: Vec<Vector3<f64>> = traj
        .samples()
        .iter()
        .map(|s| s.tooltip_position_m)
        .collect();

    let gate_refs_m = match traj.sample(0) {
        Some(s) => s.gate_positions_m.as_slice(),
        None => &[],
    };

    closest_approach_ends(&tooltip_m, gate_refs_m)
}

/// Build the contiguous list of segments from a set of segment ends.
pub fn segments_from_ends(ends: &[usize]) -> Vec<Segment> {
    let mut start = 0;

    ends.iter()
        .enumerate()
        .map(|(gate_index, &end)| {
            let seg = Segment {
                gate_index,
                start,
                end,
            };
            start = end;
            seg
        })
        .collect()
}

/// Detect the segments of a trajectory.
pub fn detect_segments(traj: &Trajectory) -> Vec<Segment> {
    segments_from_ends(&detect_segment_ends(traj))
}

/// Get the segment which is active at the given step: the first one whose end
/// is at or beyond the step.
///
/// Steps past the final end stay on the last segment. Returns `None` only if
/// there are no segments.
pub fn active_segment(segments: &[Segment], index: usize) -> Option<&Segment> {
    segments
        .iter()
        .find(|s| s.end >= index)
        .or_else(|| segments.last())
}
