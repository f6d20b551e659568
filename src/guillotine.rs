//! Free-space tracking for a single sheet instance.
//!
//! Free regions live in a flat `Vec` and are addressed by index. Every
//! commit removes the chosen region and splits what is left with one
//! straight cut, so the pieces and free regions on a sheet always form a
//! guillotine partition.

use crate::strategy::PackingStrategy;
use crate::types::{FreeRect, Placement, Rect};

/// A feasible position for a piece: a free region plus an orientation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Candidate {
    pub free_idx: usize,
    pub free: FreeRect,
    /// Piece footprint in the chosen orientation.
    pub rect: Rect,
    pub rotated: bool,
}

impl Candidate {
    pub fn leftover_area(&self) -> u64 {
        self.free.rect.area() - self.rect.area()
    }

    pub fn leftover_width(&self) -> u32 {
        self.free.rect.w - self.rect.w
    }
}

#[derive(Debug, Clone)]
pub struct FreeSpace {
    sheet_index: usize,
    kerf: u32,
    merge: bool,
    free_rects: Vec<FreeRect>,
}

impl FreeSpace {
    pub fn new(sheet_index: usize, stock: Rect, kerf: u32, merge: bool) -> Self {
        Self {
            sheet_index,
            kerf,
            merge,
            free_rects: vec![FreeRect::new(0, 0, stock)],
        }
    }

    pub fn free_rects(&self) -> &[FreeRect] {
        &self.free_rects
    }

    pub fn into_free_rects(self) -> Vec<FreeRect> {
        self.free_rects
    }

    pub fn free_area(&self) -> u64 {
        self.free_rects.iter().map(|f| f.rect.area()).sum()
    }

    fn candidates(&self, piece: Rect, allow_rotate: bool) -> Vec<Candidate> {
        let turn = allow_rotate && piece.w != piece.h;
        let mut out = Vec::new();
        for (idx, free) in self.free_rects.iter().enumerate() {
            if piece.fits_in(&free.rect) {
                out.push(Candidate {
                    free_idx: idx,
                    free: *free,
                    rect: piece,
                    rotated: false,
                });
            }
            if turn && piece.rotated().fits_in(&free.rect) {
                out.push(Candidate {
                    free_idx: idx,
                    free: *free,
                    rect: piece.rotated(),
                    rotated: true,
                });
            }
        }
        out
    }

    /// All feasible positions, best first according to `strategy`.
    /// Empty when the piece does not fit anywhere on this sheet.
    pub fn query_candidates(
        &self,
        piece: Rect,
        allow_rotate: bool,
        strategy: &dyn PackingStrategy,
    ) -> Vec<Candidate> {
        let mut candidates = self.candidates(piece, allow_rotate);
        candidates.sort_by_key(|c| strategy.score(c));
        candidates
    }

    pub fn find(
        &self,
        piece: Rect,
        allow_rotate: bool,
        strategy: &dyn PackingStrategy,
    ) -> Option<Candidate> {
        strategy.select_candidate(&self.candidates(piece, allow_rotate))
    }

    /// Places a piece at `candidate`, which must come from this tracker's
    /// current state.
    pub fn commit(&mut self, candidate: Candidate, piece_id: &str) -> Placement {
        let free = self.free_rects.swap_remove(candidate.free_idx);
        debug_assert_eq!(free, candidate.free, "stale candidate");

        self.split(free, candidate.rect);
        if self.merge {
            self.merge_free_rects();
        }

        Placement {
            piece_id: piece_id.to_string(),
            sheet_index: self.sheet_index,
            x: free.x,
            y: free.y,
            rect: candidate.rect,
            rotated: candidate.rotated,
        }
    }

    fn split(&mut self, free: FreeRect, placed: Rect) {
        let kerf = self.kerf;
        let right_w = free.rect.w.saturating_sub(placed.w.saturating_add(kerf));
        let top_h = free.rect.h.saturating_sub(placed.h.saturating_add(kerf));
        // Only evaluated for non-empty remainders, which keeps them inside the sheet.
        let right_x = || free.x + placed.w + kerf;
        let top_y = || free.y + placed.h + kerf;

        match (right_w > 0, top_h > 0) {
            (true, true) => {
                // Cut across the shorter leftover first so the larger
                // remainder keeps its full span.
                if free.rect.w - placed.w < free.rect.h - placed.h {
                    self.free_rects
                        .push(FreeRect::new(right_x(), free.y, Rect::new(right_w, placed.h)));
                    self.free_rects
                        .push(FreeRect::new(free.x, top_y(), Rect::new(free.rect.w, top_h)));
                } else {
                    self.free_rects
                        .push(FreeRect::new(right_x(), free.y, Rect::new(right_w, free.rect.h)));
                    self.free_rects
                        .push(FreeRect::new(free.x, top_y(), Rect::new(placed.w, top_h)));
                }
            }
            (true, false) => {
                self.free_rects
                    .push(FreeRect::new(right_x(), free.y, Rect::new(right_w, free.rect.h)));
            }
            (false, true) => {
                self.free_rects
                    .push(FreeRect::new(free.x, top_y(), Rect::new(free.rect.w, top_h)));
            }
            (false, false) => {}
        }
    }

    fn merge_free_rects(&mut self) {
        let mut merged = true;
        while merged {
            merged = false;
            'outer: for i in 0..self.free_rects.len() {
                for j in (i + 1)..self.free_rects.len() {
                    if let Some(m) = try_merge(self.free_rects[i], self.free_rects[j]) {
                        self.free_rects[i] = m;
                        self.free_rects.swap_remove(j);
                        merged = true;
                        break 'outer;
                    }
                }
            }
        }
    }
}

/// Union of two free rects sharing a full edge, if it is itself a rect.
fn try_merge(a: FreeRect, b: FreeRect) -> Option<FreeRect> {
    if a.y == b.y && a.rect.h == b.rect.h {
        let (left, right) = if a.x <= b.x { (a, b) } else { (b, a) };
        if left.x + left.rect.w == right.x {
            return Some(FreeRect::new(
                left.x,
                left.y,
                Rect::new(left.rect.w + right.rect.w, left.rect.h),
            ));
        }
    }
    if a.x == b.x && a.rect.w == b.rect.w {
        let (low, high) = if a.y <= b.y { (a, b) } else { (b, a) };
        if low.y + low.rect.h == high.y {
            return Some(FreeRect::new(
                low.x,
                low.y,
                Rect::new(low.rect.w, low.rect.h + high.rect.h),
            ));
        }
    }
    None
}
