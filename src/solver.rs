//! Optimization driver.
//!
//! Expands piece quantities, orders them per strategy, and places each
//! instance on the first open sheet of its material that has room,
//! allocating a new sheet from the catalog when none does.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use rayon::prelude::*;
use serde::Serialize;
use tracing::{debug, info, trace, warn};

use crate::catalog::MaterialCatalog;
use crate::error::{Error, Result};
use crate::evaluate::{Metrics, evaluate, score};
use crate::guillotine::FreeSpace;
use crate::strategy::{PackingStrategy, StrategyKind};
use crate::types::{
    Job, Layout, Piece, PieceInstance, Placement, SheetLayout, SheetTemplate, Unplaced,
    UnplacedReason,
};

/// Shared flag checked before every piece placement.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    Pending,
    SheetAllocation,
    Placing,
    Done,
    DoneWithUnplaced,
}

fn advance(state: &mut RunState, next: RunState) {
    if *state != next {
        trace!(from = ?*state, to = ?next, "run state");
        *state = next;
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RunOutcome {
    pub strategy: StrategyKind,
    pub state: RunState,
    pub layout: Layout,
    pub metrics: Metrics,
    pub unplaced: Vec<Unplaced>,
}

impl RunOutcome {
    fn finish(strategy: StrategyKind, layout: Layout, unplaced: Vec<Unplaced>) -> Self {
        let state = if unplaced.is_empty() {
            RunState::Done
        } else {
            RunState::DoneWithUnplaced
        };
        Self {
            strategy,
            state,
            metrics: evaluate(&layout),
            layout,
            unplaced,
        }
    }

    pub fn unplaced_count(&self, piece_id: &str) -> usize {
        self.unplaced.iter().filter(|u| u.piece_id == piece_id).count()
    }

    pub fn score(&self) -> f64 {
        score(&self.metrics)
    }
}

/// Outcomes of every strategy on the same input.
#[derive(Debug, Clone, Serialize)]
pub struct Comparison {
    /// In [`StrategyKind::ALL`] order.
    pub runs: Vec<RunOutcome>,
    pub best: StrategyKind,
}

impl Comparison {
    pub fn best_run(&self) -> Option<&RunOutcome> {
        self.runs.iter().find(|r| r.strategy == self.best)
    }
}

struct OpenSheet<'a> {
    template: &'a SheetTemplate,
    space: FreeSpace,
    placements: Vec<Placement>,
}

impl<'a> OpenSheet<'a> {
    fn new(index: usize, template: &'a SheetTemplate, kerf: u32, merge: bool) -> Self {
        Self {
            template,
            space: FreeSpace::new(index, template.rect(), kerf, merge),
            placements: Vec::new(),
        }
    }

    /// Places `piece` at the strategy's preferred position, if any.
    fn try_place(&mut self, piece: &PieceInstance, strategy: &dyn PackingStrategy) -> bool {
        match self.space.find(piece.rect, piece.allow_rotate, strategy) {
            Some(candidate) => {
                let placement = self.space.commit(candidate, &piece.piece_id);
                self.placements.push(placement);
                true
            }
            None => false,
        }
    }

    fn into_layout(self, index: usize) -> SheetLayout {
        SheetLayout {
            index,
            template_id: self.template.id.clone(),
            material: self.template.material.clone(),
            stock: self.template.rect(),
            unit_cost: self.template.unit_cost,
            placements: self.placements,
            free_rects: self.space.into_free_rects(),
        }
    }
}

pub struct Solver {
    pieces: Vec<Piece>,
    catalog: MaterialCatalog,
    kerf: u32,
    strategy: StrategyKind,
    cancel: CancelToken,
}

impl Solver {
    pub fn new(
        pieces: Vec<Piece>,
        catalog: MaterialCatalog,
        kerf: u32,
        strategy: StrategyKind,
    ) -> Self {
        Self {
            pieces,
            catalog,
            kerf,
            strategy,
            cancel: CancelToken::new(),
        }
    }

    pub fn from_job(job: Job) -> Self {
        Self::new(
            job.pieces,
            MaterialCatalog::new(job.sheets),
            job.kerf,
            job.strategy,
        )
    }

    pub fn with_cancel_token(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Checks every input up front so no packing step can fail.
    pub fn validate(&self) -> Result<()> {
        self.catalog.validate()?;
        if self.pieces.is_empty() {
            return Err(Error::EmptyInput);
        }
        for p in &self.pieces {
            if p.rect().is_degenerate() {
                return Err(Error::InvalidDimension {
                    subject: format!("piece '{}'", p.id),
                    rect: p.rect(),
                });
            }
            if p.quantity == 0 {
                return Err(Error::InvalidQuantity(p.id.clone()));
            }
            if !self.catalog.contains(&p.material) {
                return Err(Error::MaterialNotFound(p.material.clone()));
            }
        }
        Ok(())
    }

    pub fn solve(&self) -> Result<RunOutcome> {
        match self.validate() {
            Ok(()) => self.run_validated(self.strategy),
            Err(Error::EmptyInput) => Ok(self.empty_run(self.strategy)),
            Err(e) => Err(e),
        }
    }

    /// Runs all strategies independently and picks the best outcome:
    /// fewest unplaced instances, then highest score, then fewest sheets.
    pub fn compare(&self) -> Result<Comparison> {
        let runs = match self.validate() {
            Ok(()) => StrategyKind::ALL
                .par_iter()
                .map(|&kind| self.run_validated(kind))
                .collect::<Result<Vec<_>>>()?,
            Err(Error::EmptyInput) => StrategyKind::ALL
                .iter()
                .map(|&kind| self.empty_run(kind))
                .collect(),
            Err(e) => return Err(e),
        };

        let best = runs
            .iter()
            .min_by(|a, b| {
                a.unplaced
                    .len()
                    .cmp(&b.unplaced.len())
                    .then_with(|| b.score().total_cmp(&a.score()))
                    .then_with(|| a.layout.sheet_count().cmp(&b.layout.sheet_count()))
            })
            .map(|r| r.strategy)
            .unwrap_or_default();

        info!(best = %best, "strategy comparison finished");
        Ok(Comparison { runs, best })
    }

    fn empty_run(&self, kind: StrategyKind) -> RunOutcome {
        debug!(strategy = %kind, "no pieces supplied, returning empty layout");
        RunOutcome::finish(kind, Layout::empty(self.kerf), Vec::new())
    }

    /// Packs with `kind`. Callers must have run [`Solver::validate`].
    fn run_validated(&self, kind: StrategyKind) -> Result<RunOutcome> {
        let strategy = kind.strategy();
        let mut pending = PieceInstance::expand(&self.pieces);
        strategy.order_pending_pieces(&mut pending);

        info!(
            strategy = %strategy.kind(),
            instances = pending.len(),
            kerf = self.kerf,
            "starting optimization run"
        );

        let mut state = RunState::Pending;
        let mut sheets: Vec<OpenSheet> = Vec::new();
        let mut unplaced = Vec::new();

        for piece in &pending {
            if self.cancel.is_cancelled() {
                warn!(strategy = %kind, "optimization cancelled");
                return Err(Error::Cancelled);
            }

            advance(&mut state, RunState::Placing);
            let placed = sheets
                .iter_mut()
                .filter(|s| s.template.material == piece.material)
                .any(|s| s.try_place(piece, strategy));
            if placed {
                continue;
            }

            advance(&mut state, RunState::SheetAllocation);
            let found = self
                .catalog
                .sheet_for(&piece.material, piece.rect, piece.allow_rotate)?;
            let Some(template) = found else {
                warn!(
                    piece = %piece.piece_id,
                    size = %piece.rect,
                    material = %piece.material,
                    "piece does not fit any sheet"
                );
                unplaced.push(Unplaced {
                    piece_id: piece.piece_id.clone(),
                    reason: UnplacedReason::PieceUnplaceable,
                });
                continue;
            };

            let index = sheets.len();
            debug!(sheet = index, template = %template.id, "allocating sheet");
            let mut sheet = OpenSheet::new(index, template, self.kerf, strategy.merges_free_space());
            advance(&mut state, RunState::Placing);
            // The template holds the piece, so an empty sheet always does.
            if sheet.try_place(piece, strategy) {
                sheets.push(sheet);
            } else {
                unplaced.push(Unplaced {
                    piece_id: piece.piece_id.clone(),
                    reason: UnplacedReason::PieceUnplaceable,
                });
            }
        }

        let layout = Layout {
            kerf: self.kerf,
            sheets: sheets
                .into_iter()
                .enumerate()
                .map(|(i, s)| s.into_layout(i))
                .collect(),
        };
        let outcome = RunOutcome::finish(kind, layout, unplaced);
        advance(&mut state, outcome.state);

        info!(
            strategy = %kind,
            sheets = outcome.layout.sheet_count(),
            unplaced = outcome.unplaced.len(),
            waste_percent = outcome.metrics.waste_percent,
            "optimization run finished"
        );
        Ok(outcome)
    }
}
