//! Reel motion state machine
//!
//! A reel is a ring of cells scrolling downward. Cells that pass
//! `-recycle_threshold` jump back above the top of the stack, so the ring
//! reads as an endless column. A stop request takes effect on the next
//! recycle: the reel freezes and snaps every cell to its rest offset.
//!
//! ```text
//!   Idle ──spin──▶ Ramping ──ramp done──▶ Cruising
//!                     │                      │
//!                     └────────stop──────────┴──▶ Stopping ──recycle──▶ Idle
//! ```

use log::{debug, warn};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::config::{MotionConfig, ReelGeometry, ReelLayout, VISIBLE_ROWS};
use crate::error::{ConfigError, ReelError, ReelResult};
use crate::symbols::{MAX_CATALOG_SIZE, SymbolCatalog, SymbolType, shuffled_symbols};

/// Motion state of a reel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReelState {
    /// Not moving, rows are readable
    Idle,
    /// Speed increasing toward max
    Ramping,
    /// At max speed, no stop requested
    Cruising,
    /// Waiting for the next recycle to snap to rest
    Stopping,
}

impl ReelState {
    #[inline]
    pub fn is_spinning(&self) -> bool {
        !matches!(self, ReelState::Idle)
    }
}

/// One symbol slot in a reel's ring
#[derive(Debug, Clone, PartialEq)]
pub struct Cell<H> {
    index: usize,
    symbol: SymbolType,
    handle: Option<H>,
    offset: f64,
    highlighted: bool,
}

impl<H> Cell<H> {
    /// Stable position in the ring
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn symbol(&self) -> SymbolType {
        self.symbol
    }

    /// Renderable handle from the catalog
    pub fn handle(&self) -> Option<&H> {
        self.handle.as_ref()
    }

    /// Vertical offset relative to the reel's middle row
    pub fn offset(&self) -> f64 {
        self.offset
    }

    /// Win highlight is showing
    pub fn is_highlighted(&self) -> bool {
        self.highlighted
    }
}

/// Linear speed ramp from standstill to max speed
#[derive(Debug, Clone, Copy, PartialEq)]
struct SpeedRamp {
    elapsed: f64,
    duration: f64,
    max_speed: f64,
}

impl SpeedRamp {
    fn new(duration: f64, max_speed: f64) -> Self {
        Self {
            elapsed: 0.0,
            duration,
            max_speed,
        }
    }

    fn is_complete(&self) -> bool {
        self.elapsed >= self.duration
    }

    /// Advance by `dt` and return the new speed
    fn advance(&mut self, dt: f64) -> f64 {
        self.elapsed += dt;
        if self.is_complete() {
            // pinned exactly, no lerp rounding
            return self.max_speed;
        }
        let t = (self.elapsed / self.duration).clamp(0.0, 1.0);
        self.max_speed * t
    }
}

/// What a single tick did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Reel was not moving
    Idle,
    /// Cells moved; `recycled` counts cells that wrapped to the top
    Moved { recycled: usize },
    /// Stop completed; `top` is the cell now on top of the stack
    Snapped { top: usize },
}

/// One vertical column of the display
#[derive(Debug, Clone)]
pub struct Reel<H> {
    index: usize,
    cells: Vec<Cell<H>>,
    layout: ReelLayout,
    motion: MotionConfig,
    state: ReelState,
    speed: f64,
    ramp: Option<SpeedRamp>,
    top_index: usize,
}

impl<H: Clone> Reel<H> {
    /// Build a reel and initialize it: shuffle the catalog across its cells
    /// and place them at rest.
    ///
    /// The catalog must hold exactly one symbol type per cell.
    pub fn new<C, R>(
        index: usize,
        geometry: &ReelGeometry,
        motion: MotionConfig,
        catalog: &C,
        rng: &mut R,
    ) -> ReelResult<Self>
    where
        C: SymbolCatalog<Handle = H>,
        R: Rng + ?Sized,
    {
        let layout = geometry.layout()?;
        motion.validate()?;

        let cell_count = geometry.cells_per_reel;
        if cell_count > MAX_CATALOG_SIZE {
            return Err(ConfigError::InvalidValue(format!(
                "cells_per_reel {} exceeds {}",
                cell_count, MAX_CATALOG_SIZE
            ))
            .into());
        }
        if catalog.len() != cell_count {
            return Err(ConfigError::CatalogMismatch {
                catalog: catalog.len(),
                cells: cell_count,
            }
            .into());
        }

        let cells = (0..cell_count)
            .map(|i| Cell {
                index: i,
                symbol: SymbolType(0),
                handle: None,
                offset: 0.0,
                highlighted: false,
            })
            .collect();

        let mut reel = Self {
            index,
            cells,
            layout,
            motion,
            state: ReelState::Idle,
            speed: 0.0,
            ramp: None,
            top_index: 0,
        };
        reel.assign_symbols(catalog, rng);
        reel.align_to(0);
        Ok(reel)
    }

    /// Stop all motion, clear highlights, re-align and re-shuffle
    pub fn reset<C, R>(&mut self, catalog: &C, rng: &mut R)
    where
        C: SymbolCatalog<Handle = H>,
        R: Rng + ?Sized,
    {
        self.speed = 0.0;
        self.ramp = None;
        self.state = ReelState::Idle;
        self.clear_highlights();
        self.align_to(0);
        self.assign_symbols(catalog, rng);
    }

    fn assign_symbols<C, R>(&mut self, catalog: &C, rng: &mut R)
    where
        C: SymbolCatalog<Handle = H>,
        R: Rng + ?Sized,
    {
        let symbols = shuffled_symbols(self.cells.len(), rng);
        for (cell, symbol) in self.cells.iter_mut().zip(symbols) {
            cell.symbol = symbol;
            cell.handle = catalog.lookup(symbol);
            if cell.handle.is_none() {
                warn!("[Reel {}] catalog has no handle for {}", self.index, symbol);
            }
        }
    }
}

impl<H> Reel<H> {
    /// Position of this reel on the machine, left to right
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn state(&self) -> ReelState {
        self.state
    }

    pub fn is_idle(&self) -> bool {
        self.state == ReelState::Idle
    }

    /// Current scroll speed (before the stop floor is applied)
    pub fn speed(&self) -> f64 {
        self.speed
    }

    pub fn layout(&self) -> &ReelLayout {
        &self.layout
    }

    /// Cells in ring order
    pub fn cells(&self) -> &[Cell<H>] {
        &self.cells
    }

    /// Cell currently on top of the rest stack
    pub fn top_index(&self) -> usize {
        self.top_index
    }

    /// Start spinning. Restarts the speed ramp from zero if already spinning.
    pub fn spin(&mut self) {
        if self.state.is_spinning() {
            debug!("[Reel {}] spin while {:?}, restarting ramp", self.index, self.state);
        } else {
            debug!("[Reel {}] spin", self.index);
        }
        self.speed = 0.0;
        self.ramp = Some(SpeedRamp::new(
            self.motion.ramp_duration_secs,
            self.motion.max_speed,
        ));
        self.state = ReelState::Ramping;
    }

    /// Request a stop. Motion continues until the next recycle.
    pub fn stop(&mut self) {
        match self.state {
            ReelState::Idle => warn!("[Reel {}] stop ignored, reel is idle", self.index),
            ReelState::Stopping => {}
            ReelState::Ramping | ReelState::Cruising => {
                debug!("[Reel {}] stop requested at speed {:.1}", self.index, self.speed);
                self.state = ReelState::Stopping;
            }
        }
    }

    /// Advance motion by `dt` seconds
    pub fn tick(&mut self, dt: f64) -> TickOutcome {
        if !self.state.is_spinning() {
            return TickOutcome::Idle;
        }
        if !dt.is_finite() || dt < 0.0 {
            warn!("[Reel {}] ignoring invalid tick delta {}", self.index, dt);
            return TickOutcome::Moved { recycled: 0 };
        }

        if let Some(ramp) = self.ramp.as_mut() {
            self.speed = ramp.advance(dt);
            if ramp.is_complete() {
                self.ramp = None;
                if self.state == ReelState::Ramping {
                    self.state = ReelState::Cruising;
                }
            }
        }

        let speed = if self.state == ReelState::Stopping {
            self.speed.max(self.motion.min_stop_speed())
        } else {
            self.speed
        };

        let displacement = self.wrap_displacement(speed * dt);
        for cell in &mut self.cells {
            cell.offset -= displacement;
        }

        let mut recycled = 0;
        let mut last_recycled = None;
        let steps = (displacement / self.layout.step()) as usize;
        let limit = self.cells.len().saturating_mul(steps.saturating_add(2));
        while recycled < limit {
            let Some(lowest) = self.lowest_cell() else { break };
            if self.cells[lowest].offset >= -self.layout.recycle_threshold {
                break;
            }
            self.recycle(lowest);
            recycled += 1;
            last_recycled = Some(lowest);
        }

        match last_recycled {
            Some(top) if self.state == ReelState::Stopping => {
                self.align_to(top);
                self.state = ReelState::Idle;
                self.speed = 0.0;
                self.ramp = None;
                debug!("[Reel {}] snapped to rest, top cell {}", self.index, top);
                TickOutcome::Snapped { top }
            }
            _ => TickOutcome::Moved { recycled },
        }
    }

    /// Fold travel longer than one revolution back into `(ring, 2 * ring]`.
    ///
    /// The ring repeats every revolution, so the resting layout is unchanged,
    /// and every cell still recycles at least once.
    fn wrap_displacement(&self, displacement: f64) -> f64 {
        let ring = self.layout.step() * self.cells.len() as f64;
        if !displacement.is_finite() {
            warn!("[Reel {}] non-finite travel, folding to one revolution", self.index);
            return ring;
        }
        if displacement <= ring {
            return displacement;
        }
        ring + displacement % ring
    }

    fn lowest_cell(&self) -> Option<usize> {
        self.cells
            .iter()
            .enumerate()
            .min_by(|a, b| a.1.offset.total_cmp(&b.1.offset))
            .map(|(i, _)| i)
    }

    /// Move a cell one step above its ring predecessor
    fn recycle(&mut self, index: usize) {
        let n = self.cells.len();
        let previous = (index + n - 1) % n;
        self.cells[index].offset = self.cells[previous].offset + self.layout.step();
    }

    /// Place every cell at its rest offset with `top` on top of the stack.
    ///
    /// Walking the ring from `top + 1`: first cell at `-step`, second at `0`,
    /// each following cell one step higher.
    fn align_to(&mut self, top: usize) {
        let n = self.cells.len();
        let step = self.layout.step();
        let mut idx = top % n;
        for position in 0..n {
            idx = (idx + 1) % n;
            self.cells[idx].offset = match position {
                0 => -step,
                1 => 0.0,
                p => step * (p - 1) as f64,
            };
        }
        self.top_index = top % n;
    }

    /// Row-readable view of an idle reel
    pub fn at_rest(&self) -> ReelResult<RestView<'_, H>> {
        if self.state.is_spinning() {
            return Err(ReelError::NotAtRest { state: self.state });
        }
        Ok(RestView { reel: self })
    }

    /// Highlight the cell on `row`. Returns whether a cell was highlighted.
    pub fn play_win_effect(&mut self, row: usize) -> ReelResult<bool> {
        let cell = self.at_rest()?.cell_index_at_row(row);
        match cell {
            Some(idx) => {
                self.cells[idx].highlighted = true;
                Ok(true)
            }
            None => {
                warn!("[Reel {}] no cell on row {}", self.index, row);
                Ok(false)
            }
        }
    }

    pub fn clear_highlights(&mut self) {
        for cell in &mut self.cells {
            cell.highlighted = false;
        }
    }
}

/// Borrowed view of a reel at rest
#[derive(Debug)]
pub struct RestView<'a, H> {
    reel: &'a Reel<H>,
}

impl<'a, H> RestView<'a, H> {
    /// Ring index of the `position`-th cell from the top of the stack
    fn cell_index_at(&self, position: usize) -> Option<usize> {
        let n = self.reel.cells.len();
        (position < n).then(|| (self.reel.top_index + 1 + position) % n)
    }

    /// Ring index of the cell on `row` (0 = offset `-step`, 1 = offset `0`, 2 = offset `step`)
    fn cell_index_at_row(&self, row: usize) -> Option<usize> {
        if row >= VISIBLE_ROWS {
            return None;
        }
        self.cell_index_at(row)
    }

    /// Off-screen cell `k` places below the bottom visible row.
    ///
    /// Only rings larger than the visible rows have queued cells.
    pub fn queued_cell(&self, k: usize) -> Option<&'a Cell<H>> {
        self.cell_index_at(VISIBLE_ROWS + k)
            .map(|idx| &self.reel.cells[idx])
    }

    pub fn cell_at_row(&self, row: usize) -> Option<&'a Cell<H>> {
        self.cell_index_at_row(row).map(|idx| &self.reel.cells[idx])
    }

    /// Symbol on `row`, `None` for rows outside the reel
    pub fn symbol_at_row(&self, row: usize) -> Option<SymbolType> {
        self.cell_at_row(row).map(Cell::symbol)
    }

    /// Symbols on the evaluated rows, top row first
    pub fn visible_symbols(&self) -> [Option<SymbolType>; VISIBLE_ROWS] {
        std::array::from_fn(|row| self.symbol_at_row(row))
    }
}
