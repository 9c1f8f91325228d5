//! Deep Sea Treasure: the classic two-objective gridworld.
//!
//! A submarine starts in the top-left corner. Treasures sit on the seafloor;
//! deeper treasures are worth more but take longer to reach. Objectives are
//! `[treasure, time]` where each step costs `-1` time. Every treasure is on
//! the convex hull except a few, so the CCS is a strict subset of the
//! Pareto front, which makes it a good fixture for linear-support search.

use super::{MoEnvironment, Observation, StepOutcome};
use crate::error::{MultiPolicyError, Result};

const SEAFLOOR: f64 = -10.0;
const ROWS: usize = 11;
const COLS: usize = 10;

#[rustfmt::skip]
const DEFAULT_MAP: [[f64; COLS]; ROWS] = [
    [0.0,   0.0,   0.0,   0.0,   0.0,   0.0,   0.0,   0.0,   0.0,   0.0],
    [0.7,   0.0,   0.0,   0.0,   0.0,   0.0,   0.0,   0.0,   0.0,   0.0],
    [-10.0, 8.2,   0.0,   0.0,   0.0,   0.0,   0.0,   0.0,   0.0,   0.0],
    [-10.0, -10.0, 11.5,  0.0,   0.0,   0.0,   0.0,   0.0,   0.0,   0.0],
    [-10.0, -10.0, -10.0, 14.0,  15.1,  16.1,  0.0,   0.0,   0.0,   0.0],
    [-10.0, -10.0, -10.0, -10.0, -10.0, -10.0, 0.0,   0.0,   0.0,   0.0],
    [-10.0, -10.0, -10.0, -10.0, -10.0, -10.0, 0.0,   0.0,   0.0,   0.0],
    [-10.0, -10.0, -10.0, -10.0, -10.0, -10.0, 19.6,  20.3,  0.0,   0.0],
    [-10.0, -10.0, -10.0, -10.0, -10.0, -10.0, -10.0, -10.0, 0.0,   0.0],
    [-10.0, -10.0, -10.0, -10.0, -10.0, -10.0, -10.0, -10.0, 22.4,  0.0],
    [-10.0, -10.0, -10.0, -10.0, -10.0, -10.0, -10.0, -10.0, -10.0, 23.7],
];

/// (treasure value, steps to reach it) for every treasure, shallowest first.
const TREASURE_PATHS: [(f64, u32); 10] = [
    (0.7, 1),
    (8.2, 3),
    (11.5, 5),
    (14.0, 7),
    (15.1, 8),
    (16.1, 9),
    (19.6, 13),
    (20.3, 14),
    (22.4, 17),
    (23.7, 19),
];

/// Up, down, left, right as (row, col) deltas.
const MOVES: [(i64, i64); 4] = [(-1, 0), (1, 0), (0, -1), (0, 1)];

/// Deep Sea Treasure environment.
#[derive(Debug, Clone)]
pub struct DeepSeaTreasure {
    position: (i64, i64),
    steps: usize,
    max_steps: usize,
}

impl DeepSeaTreasure {
    /// New environment with a 100-step episode limit.
    pub fn new() -> Self {
        Self::with_max_steps(100)
    }

    /// New environment truncating episodes after `max_steps` steps.
    pub fn with_max_steps(max_steps: usize) -> Self {
        Self {
            position: (0, 0),
            steps: 0,
            max_steps: max_steps.max(1),
        }
    }

    /// Undiscounted Pareto front as `[treasure, time]` points.
    pub fn pareto_front() -> Vec<Vec<f64>> {
        Self::discounted_pareto_front(1.0)
    }

    /// Pareto front of discounted returns under discount `gamma`.
    ///
    /// The treasure reward arrives on the last step, so it is discounted by
    /// `gamma^(t-1)`; the time penalty is the discounted sum of `t` steps.
    pub fn discounted_pareto_front(gamma: f64) -> Vec<Vec<f64>> {
        TREASURE_PATHS
            .iter()
            .map(|&(treasure, steps)| {
                let time = if (gamma - 1.0).abs() < f64::EPSILON {
                    -(steps as f64)
                } else {
                    -(1.0 - gamma.powi(steps as i32)) / (1.0 - gamma)
                };
                vec![treasure * gamma.powi(steps as i32 - 1), time]
            })
            .collect()
    }

    fn cell(row: i64, col: i64) -> Option<f64> {
        if row < 0 || col < 0 || row as usize >= ROWS || col as usize >= COLS {
            return None;
        }
        Some(DEFAULT_MAP[row as usize][col as usize])
    }

    fn observation(&self) -> Observation {
        Observation::new(vec![self.position.0, self.position.1])
    }
}

impl Default for DeepSeaTreasure {
    fn default() -> Self {
        Self::new()
    }
}

impl MoEnvironment for DeepSeaTreasure {
    fn reset(&mut self) -> Observation {
        self.position = (0, 0);
        self.steps = 0;
        self.observation()
    }

    fn step(&mut self, action: usize) -> Result<StepOutcome> {
        let (dr, dc) = *MOVES.get(action).ok_or_else(|| {
            MultiPolicyError::Environment(format!("action {action} outside 0..{}", MOVES.len()))
        })?;

        let (row, col) = (self.position.0 + dr, self.position.1 + dc);
        // Walls and seafloor block movement.
        if let Some(cell) = Self::cell(row, col) {
            if cell != SEAFLOOR {
                self.position = (row, col);
            }
        }
        self.steps += 1;

        let here = Self::cell(self.position.0, self.position.1).unwrap_or(0.0);
        let terminated = here > 0.0;
        let treasure = if terminated { here } else { 0.0 };

        Ok(StepOutcome {
            observation: self.observation(),
            reward: vec![treasure, -1.0],
            terminated,
            truncated: !terminated && self.steps >= self.max_steps,
        })
    }

    fn action_count(&self) -> usize {
        MOVES.len()
    }

    fn reward_dim(&self) -> usize {
        2
    }
}
