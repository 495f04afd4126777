//! Game phase and mover segmentation by move number

use crate::types::Side;
use serde::{Deserialize, Serialize};

/// Last move number of the opening
pub const OPENING_LAST_MOVE: usize = 60;
/// Last move number of the middle game
pub const MIDDLE_LAST_MOVE: usize = 150;

/// Coarse move-number range used to segment statistics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Opening,
    Middle,
    End,
}

impl Phase {
    pub const ALL: [Phase; 3] = [Phase::Opening, Phase::Middle, Phase::End];

    /// Phase of a 1-based move number; thresholds do not scale with board size
    pub fn of_move(move_number: usize) -> Self {
        if move_number <= OPENING_LAST_MOVE {
            Phase::Opening
        } else if move_number <= MIDDLE_LAST_MOVE {
            Phase::Middle
        } else {
            Phase::End
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Opening => "opening",
            Phase::Middle => "middle",
            Phase::End => "end",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Phase::Opening => "Opening (0-60)",
            Phase::Middle => "Middle (61-150)",
            Phase::End => "End (151+)",
        }
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Side that plays the 1-based `move_number`; moves alternate strictly
pub fn side_of_move(move_number: usize, initial_side: Side) -> Side {
    if move_number % 2 == 1 {
        initial_side
    } else {
        initial_side.opposite()
    }
}

/// One value for the whole game plus one per phase
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PhaseSet<T> {
    pub total: T,
    pub opening: T,
    pub middle: T,
    pub end: T,
}

impl<T> PhaseSet<T> {
    pub fn phase(&self, phase: Phase) -> &T {
        match phase {
            Phase::Opening => &self.opening,
            Phase::Middle => &self.middle,
            Phase::End => &self.end,
        }
    }

    pub fn phase_mut(&mut self, phase: Phase) -> &mut T {
        match phase {
            Phase::Opening => &mut self.opening,
            Phase::Middle => &mut self.middle,
            Phase::End => &mut self.end,
        }
    }

    pub fn map<U>(&self, mut f: impl FnMut(&T) -> U) -> PhaseSet<U> {
        PhaseSet {
            total: f(&self.total),
            opening: f(&self.opening),
            middle: f(&self.middle),
            end: f(&self.end),
        }
    }

    /// Visit the four slots pairwise with another set
    pub fn zip_mut<U>(&mut self, other: &PhaseSet<U>, mut f: impl FnMut(&mut T, &U)) {
        f(&mut self.total, &other.total);
        f(&mut self.opening, &other.opening);
        f(&mut self.middle, &other.middle);
        f(&mut self.end, &other.end);
    }

    /// Slots labelled "total", "opening", "middle", "end"
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &T)> {
        [
            ("total", &self.total),
            ("opening", &self.opening),
            ("middle", &self.middle),
            ("end", &self.end),
        ]
        .into_iter()
    }
}
