//! Packing strategies.
//!
//! Every strategy shares the same free-space tracker and split rule; they
//! differ in the order pieces are processed and in which candidate position
//! they prefer.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::guillotine::Candidate;
use crate::types::PieceInstance;

/// Lexicographic ranking key. Lower is better.
pub type Score = [u64; 5];

pub trait PackingStrategy: Send + Sync {
    fn kind(&self) -> StrategyKind;

    /// Reorders pending piece instances into processing order.
    fn order_pending_pieces(&self, pending: &mut [PieceInstance]);

    fn score(&self, candidate: &Candidate) -> Score;

    /// Whether free rectangles sharing a full edge are merged after a commit.
    fn merges_free_space(&self) -> bool {
        true
    }

    fn select_candidate(&self, candidates: &[Candidate]) -> Option<Candidate> {
        candidates.iter().copied().min_by_key(|c| self.score(c))
    }
}

/// Lowest, then left-most position; native orientation wins ties.
#[derive(Debug, Clone, Copy, Default)]
pub struct BottomLeftFill;

impl PackingStrategy for BottomLeftFill {
    fn kind(&self) -> StrategyKind {
        StrategyKind::BottomLeftFill
    }

    fn order_pending_pieces(&self, pending: &mut [PieceInstance]) {
        pending.sort_by(|a, b| b.rect.area().cmp(&a.rect.area()));
    }

    fn score(&self, c: &Candidate) -> Score {
        [c.free.y as u64, c.free.x as u64, c.rotated as u64, 0, 0]
    }
}

/// Largest pieces first, each into the region that leaves the least area.
#[derive(Debug, Clone, Copy, Default)]
pub struct BestFitDecreasing;

impl PackingStrategy for BestFitDecreasing {
    fn kind(&self) -> StrategyKind {
        StrategyKind::BestFitDecreasing
    }

    fn order_pending_pieces(&self, pending: &mut [PieceInstance]) {
        pending.sort_by(|a, b| {
            b.rect
                .area()
                .cmp(&a.rect.area())
                .then_with(|| max_side(b).cmp(&max_side(a)))
                .then_with(|| a.piece_id.cmp(&b.piece_id))
        });
    }

    fn score(&self, c: &Candidate) -> Score {
        [
            c.leftover_area(),
            c.leftover_width() as u64,
            c.free.y as u64,
            c.free.x as u64,
            c.rotated as u64,
        ]
    }
}

fn max_side(p: &PieceInstance) -> u32 {
    p.rect.w.max(p.rect.h)
}

/// First free region in raster order, pieces in input order.
///
/// Free space is never merged, so every remaining region is reachable with
/// straight through-cuts. Native orientation only wins a tie inside the
/// same region.
#[derive(Debug, Clone, Copy, Default)]
pub struct GuillotineSplit;

impl PackingStrategy for GuillotineSplit {
    fn kind(&self) -> StrategyKind {
        StrategyKind::GuillotineSplit
    }

    fn order_pending_pieces(&self, _pending: &mut [PieceInstance]) {}

    fn score(&self, c: &Candidate) -> Score {
        [c.free.y as u64, c.free.x as u64, c.rotated as u64, 0, 0]
    }

    fn merges_free_space(&self) -> bool {
        false
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    #[default]
    BottomLeftFill,
    BestFitDecreasing,
    GuillotineSplit,
}

impl StrategyKind {
    pub const ALL: [StrategyKind; 3] = [
        StrategyKind::BottomLeftFill,
        StrategyKind::BestFitDecreasing,
        StrategyKind::GuillotineSplit,
    ];

    pub fn strategy(self) -> &'static dyn PackingStrategy {
        match self {
            StrategyKind::BottomLeftFill => &BottomLeftFill,
            StrategyKind::BestFitDecreasing => &BestFitDecreasing,
            StrategyKind::GuillotineSplit => &GuillotineSplit,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            StrategyKind::BottomLeftFill => "bottom-left-fill",
            StrategyKind::BestFitDecreasing => "best-fit-decreasing",
            StrategyKind::GuillotineSplit => "guillotine-split",
        }
    }
}

impl std::fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for StrategyKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.replace('_', "-").as_str() {
            "bottom-left-fill" | "blf" => Ok(StrategyKind::BottomLeftFill),
            "best-fit-decreasing" | "bfd" => Ok(StrategyKind::BestFitDecreasing),
            "guillotine-split" | "guillotine" => Ok(StrategyKind::GuillotineSplit),
            _ => Err(format!(
                "invalid strategy '{}', expected: bottom-left-fill, best-fit-decreasing, or guillotine-split",
                s
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{FreeRect, Rect};

    fn instance(id: &str, w: u32, h: u32) -> PieceInstance {
        PieceInstance {
            piece_id: id.to_string(),
            source: 0,
            rect: Rect::new(w, h),
            allow_rotate: true,
            material: "m".to_string(),
        }
    }

    fn candidate(idx: usize, x: u32, y: u32, free: Rect, piece: Rect, rotated: bool) -> Candidate {
        Candidate {
            free_idx: idx,
            free: FreeRect::new(x, y, free),
            rect: piece,
            rotated,
        }
    }

    fn ids(pending: &[PieceInstance]) -> Vec<&str> {
        pending.iter().map(|p| p.piece_id.as_str()).collect()
    }

    #[test]
    fn test_bfd_order_ties() {
        // Same area; longer side first, then id.
        let mut pending = vec![
            instance("c", 20, 20),
            instance("b", 40, 10),
            instance("a", 10, 40),
            instance("big", 50, 50),
        ];
        BestFitDecreasing.order_pending_pieces(&mut pending);
        assert_eq!(ids(&pending), vec!["big", "a", "b", "c"]);
    }

    #[test]
    fn test_guillotine_keeps_input_order() {
        let mut pending = vec![instance("small", 1, 1), instance("large", 9, 9)];
        GuillotineSplit.order_pending_pieces(&mut pending);
        assert_eq!(ids(&pending), vec!["small", "large"]);
    }

    #[test]
    fn test_blf_prefers_lowest_then_leftmost() {
        let piece = Rect::new(10, 10);
        let cands = [
            candidate(0, 0, 50, Rect::new(100, 50), piece, false),
            candidate(1, 60, 0, Rect::new(40, 40), piece, false),
            candidate(2, 20, 0, Rect::new(30, 30), piece, false),
        ];
        let best = BottomLeftFill.select_candidate(&cands).unwrap();
        assert_eq!(best.free_idx, 2);
    }

    #[test]
    fn test_bfd_prefers_tightest_fit() {
        let piece = Rect::new(10, 20);
        let cands = [
            candidate(0, 0, 0, Rect::new(100, 100), piece, false),
            candidate(1, 0, 200, Rect::new(20, 20), piece, false),
            // Same leftover area as native, narrower leftover width wins.
            candidate(1, 0, 200, Rect::new(20, 20), piece.rotated(), true),
        ];
        let best = BestFitDecreasing.select_candidate(&cands).unwrap();
        assert_eq!(best.free_idx, 1);
        assert!(best.rotated);
    }

    #[test]
    fn test_guillotine_takes_first_region_in_raster_order() {
        let piece = Rect::new(60, 30);
        let cands = [
            candidate(0, 0, 60, Rect::new(100, 40), piece, false),
            candidate(1, 70, 0, Rect::new(30, 60), piece.rotated(), true),
        ];
        let best = GuillotineSplit.select_candidate(&cands).unwrap();
        assert_eq!(best.free_idx, 1);
        assert!(best.rotated);

        // Within one region the native orientation wins.
        let same_region = [
            candidate(0, 0, 0, Rect::new(80, 80), piece.rotated(), true),
            candidate(0, 0, 0, Rect::new(80, 80), piece, false),
        ];
        assert!(!GuillotineSplit.select_candidate(&same_region).unwrap().rotated);
    }

    #[test]
    fn test_parse_strategy() {
        assert_eq!("blf".parse::<StrategyKind>().unwrap(), StrategyKind::BottomLeftFill);
        assert_eq!(
            "best_fit_decreasing".parse::<StrategyKind>().unwrap(),
            StrategyKind::BestFitDecreasing
        );
        assert_eq!(
            "guillotine-split".parse::<StrategyKind>().unwrap(),
            StrategyKind::GuillotineSplit
        );
        assert!("random".parse::<StrategyKind>().is_err());
    }
}
