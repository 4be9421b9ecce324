//! Machine: owns the reels and sequences spin rounds
//!
//! A round is a fixed list of timed steps advanced by `Machine::tick`:
//!
//! ```text
//! reset all reels
//!   → spin reel 0, wait, spin reel 1, wait, ... (staggered start)
//!   → pre-stop dwell
//!   → stop reel 0, wait, stop reel 1, wait, ... (staggered stop)
//!   → wait until every reel is at rest
//!   → evaluate; on win highlight cells and hold for the post-win dwell
//!   → report to the observer
//! ```
//!
//! Reel motion and sequencing share the same tick, so a machine is
//! single-threaded and fully deterministic for a given seed and tick size.

use log::{debug, info, warn};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::config::{MachineConfig, VISIBLE_ROWS};
use crate::error::{ConfigError, MachineError, MachineResult};
use crate::evaluator::{SymbolGrid, WinEvaluator, WinLine};
use crate::reel::Reel;
use crate::symbols::SymbolCatalog;
use crate::timing::Countdown;

/// Receiver for the machine's outward signals
pub trait RoundObserver {
    /// Play the win highlight on the cell at `reel`/`row`
    fn play_win_effect(&mut self, reel: usize, row: usize);

    /// Round finished; the host may re-enable its spin control
    fn on_round_complete(&mut self, won: bool);
}

/// Observer for hosts that poll `Machine::last_outcome` instead
#[derive(Debug, Clone, Copy, Default)]
pub struct NullObserver;

impl RoundObserver for NullObserver {
    fn play_win_effect(&mut self, _reel: usize, _row: usize) {}

    fn on_round_complete(&mut self, _won: bool) {}
}

/// Step the sequencer is on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RoundPhase {
    /// Nothing scheduled
    Idle,
    /// Issuing staggered spin commands; `next` is the next reel to start
    StartingReels { next: usize },
    /// All reels spinning, waiting for the pre-stop dwell
    Cruising,
    /// Issuing staggered stop commands; `next` is the next reel to stop
    StoppingReels { next: usize },
    /// Waiting for every reel to snap to rest
    Settling,
    /// Win highlight playing
    Celebrating,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SequenceKind {
    Round { test_mode: bool },
    StartCascade,
    StopCascade,
}

#[derive(Debug, Clone)]
struct Sequence {
    kind: SequenceKind,
    phase: RoundPhase,
    wait: Countdown,
}

impl Sequence {
    fn new(kind: SequenceKind, phase: RoundPhase) -> Self {
        Self {
            kind,
            phase,
            wait: Countdown::new(0.0),
        }
    }
}

/// Result of one spin round
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoundOutcome {
    /// 1-based round number
    pub round: u64,
    pub won: bool,
    /// Row per reel on the winning line, -1 for none
    pub winning_rows: Vec<i8>,
    pub line: Option<WinLine>,
    /// Resting symbols at evaluation time
    pub grid: SymbolGrid,
    /// Win was forced without evaluation
    pub test_mode: bool,
}

/// Session statistics
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionStats {
    pub rounds: u64,
    pub wins: u64,
    pub losses: u64,
    pub test_rounds: u64,
}

impl SessionStats {
    /// Percentage of evaluated (non-test) rounds that won
    pub fn hit_rate(&self) -> f64 {
        let evaluated = self.wins + self.losses;
        if evaluated > 0 {
            (self.wins as f64 / evaluated as f64) * 100.0
        } else {
            0.0
        }
    }

    fn record(&mut self, outcome: &RoundOutcome) {
        self.rounds += 1;
        if outcome.test_mode {
            self.test_rounds += 1;
        } else if outcome.won {
            self.wins += 1;
        } else {
            self.losses += 1;
        }
    }
}

/// Multi-reel slot machine
pub struct Machine<C: SymbolCatalog, O: RoundObserver> {
    config: MachineConfig,
    catalog: C,
    observer: O,
    reels: Vec<Reel<C::Handle>>,
    evaluator: WinEvaluator,
    rng: ChaCha8Rng,
    sequence: Option<Sequence>,
    round_count: u64,
    /// Outcome held through the post-win dwell
    pending: Option<RoundOutcome>,
    /// Outcome finished during the current tick
    completed: Option<RoundOutcome>,
    last_outcome: Option<RoundOutcome>,
    stats: SessionStats,
    /// Reels spun during the current tick, with the time left after their start
    started_mid_tick: Vec<(usize, f64)>,
}

impl<C: SymbolCatalog, O: RoundObserver> Machine<C, O> {
    /// Validate the config and build every reel at rest
    pub fn new(config: MachineConfig, catalog: C, observer: O) -> MachineResult<Self> {
        config.validate()?;
        if catalog.len() != config.catalog_size {
            return Err(ConfigError::CatalogMismatch {
                catalog: catalog.len(),
                cells: config.geometry.cells_per_reel,
            }
            .into());
        }

        let mut rng = match config.seed {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_os_rng(),
        };

        let reels = (0..config.reel_count)
            .map(|i| Reel::new(i, &config.geometry, config.motion, &catalog, &mut rng))
            .collect::<Result<Vec<_>, _>>()?;

        info!(
            "[Machine] {} reels × {} cells ready ({:?} timing)",
            config.reel_count, config.geometry.cells_per_reel, config.timing.profile
        );

        Ok(Self {
            evaluator: WinEvaluator::new(config.reel_count),
            config,
            catalog,
            observer,
            reels,
            rng,
            sequence: None,
            round_count: 0,
            pending: None,
            completed: None,
            last_outcome: None,
            stats: SessionStats::default(),
            started_mid_tick: Vec::new(),
        })
    }

    pub fn config(&self) -> &MachineConfig {
        &self.config
    }

    pub fn catalog(&self) -> &C {
        &self.catalog
    }

    pub fn observer(&self) -> &O {
        &self.observer
    }

    pub fn observer_mut(&mut self) -> &mut O {
        &mut self.observer
    }

    pub fn reels(&self) -> &[Reel<C::Handle>] {
        &self.reels
    }

    pub fn reel(&self, index: usize) -> Option<&Reel<C::Handle>> {
        self.reels.get(index)
    }

    pub fn stats(&self) -> &SessionStats {
        &self.stats
    }

    pub fn reset_stats(&mut self) {
        self.stats = SessionStats::default();
        self.round_count = 0;
    }

    /// Seed RNG for reproducible shuffles
    pub fn seed(&mut self, seed: u64) {
        self.rng = ChaCha8Rng::seed_from_u64(seed);
    }

    /// Current sequencer step
    pub fn phase(&self) -> RoundPhase {
        self.sequence
            .as_ref()
            .map(|seq| seq.phase)
            .unwrap_or(RoundPhase::Idle)
    }

    /// A round or cascade is being sequenced
    pub fn is_busy(&self) -> bool {
        self.sequence.is_some()
    }

    /// Every reel is at rest
    pub fn all_reels_idle(&self) -> bool {
        self.reels.iter().all(Reel::is_idle)
    }

    pub fn last_outcome(&self) -> Option<&RoundOutcome> {
        self.last_outcome.as_ref()
    }

    /// Row per reel from the most recent evaluation
    pub fn winning_rows(&self) -> &[i8] {
        self.evaluator.winning_rows()
    }

    /// Resting symbols of every reel; fails while any reel moves
    pub fn visible_grid(&self) -> MachineResult<SymbolGrid> {
        Ok(SymbolGrid::from_reels(&self.reels)?)
    }

    /// Evaluate the resting reels outside a round
    pub fn evaluate_win(&mut self) -> MachineResult<Option<WinLine>> {
        let grid = self.visible_grid()?;
        Ok(self.evaluator.evaluate(&grid))
    }

    /// Begin a full round. In test mode the win is forced on a random row.
    pub fn spin_round(&mut self, test_mode: bool) -> MachineResult<()> {
        self.ensure_free()?;

        for reel in &mut self.reels {
            reel.reset(&self.catalog, &mut self.rng);
        }
        self.round_count += 1;
        info!(
            "[Machine] round {} started{}",
            self.round_count,
            if test_mode { " (test mode)" } else { "" }
        );

        self.sequence = Some(Sequence::new(
            SequenceKind::Round { test_mode },
            RoundPhase::StartingReels { next: 0 },
        ));
        self.advance_sequence(0.0)
    }

    /// Start every reel in a staggered cascade without running a round
    pub fn start_cascade(&mut self) -> MachineResult<()> {
        self.ensure_free()?;
        debug!("[Machine] start cascade");
        self.sequence = Some(Sequence::new(
            SequenceKind::StartCascade,
            RoundPhase::StartingReels { next: 0 },
        ));
        self.advance_sequence(0.0)
    }

    /// Stop every reel in a staggered cascade
    pub fn stop_cascade(&mut self) -> MachineResult<()> {
        self.ensure_free()?;
        debug!("[Machine] stop cascade");
        self.sequence = Some(Sequence::new(
            SequenceKind::StopCascade,
            RoundPhase::StoppingReels { next: 0 },
        ));
        self.advance_sequence(0.0)
    }

    fn ensure_free(&self) -> MachineResult<()> {
        if self.is_busy() {
            warn!("[Machine] busy in {:?}, command rejected", self.phase());
            return Err(MachineError::RoundInProgress);
        }
        Ok(())
    }

    /// Advance sequencing and reel motion by `dt` seconds.
    ///
    /// A reel spun partway through `dt` moves only for the rest of the tick.
    /// Stop commands take effect on the next recycle, so stopping reels
    /// move for the whole tick.
    ///
    /// Returns the outcome on the tick a round completes.
    pub fn tick(&mut self, dt: f64) -> MachineResult<Option<RoundOutcome>> {
        if !dt.is_finite() || dt < 0.0 {
            warn!("[Machine] ignoring invalid tick delta {}", dt);
            return Ok(None);
        }

        self.started_mid_tick.clear();
        self.advance_sequence(dt)?;
        for (index, reel) in self.reels.iter_mut().enumerate() {
            let reel_dt = self
                .started_mid_tick
                .iter()
                .find(|(started, _)| *started == index)
                .map_or(dt, |&(_, left)| left);
            reel.tick(reel_dt);
        }
        // Reels that snapped this tick can release the settle wait now
        self.advance_sequence(0.0)?;

        Ok(self.completed.take())
    }

    fn advance_sequence(&mut self, dt: f64) -> MachineResult<()> {
        let delay = self.config.timing.inter_reel_delay_secs;
        let dwell = self.config.timing.pre_stop_dwell_secs;
        let reel_count = self.reels.len();
        let mut budget = dt;

        loop {
            let Some(seq) = self.sequence.as_mut() else {
                break;
            };

            if seq.phase == RoundPhase::Settling {
                if !self.reels.iter().all(Reel::is_idle) {
                    break;
                }
                let kind = seq.kind;
                match kind {
                    SequenceKind::Round { test_mode } => self.settle(test_mode)?,
                    _ => self.sequence = None,
                }
                continue;
            }

            let Some(left) = seq.wait.advance(budget) else {
                break;
            };
            budget = left;

            match seq.phase {
                RoundPhase::StartingReels { next } if next < reel_count => {
                    self.reels[next].spin();
                    self.started_mid_tick.push((next, budget));
                    seq.phase = RoundPhase::StartingReels { next: next + 1 };
                    seq.wait = Countdown::new(delay);
                }
                RoundPhase::StartingReels { .. } => {
                    if seq.kind == SequenceKind::StartCascade {
                        self.sequence = None;
                    } else {
                        seq.phase = RoundPhase::Cruising;
                        seq.wait = Countdown::new(dwell);
                    }
                }
                RoundPhase::Cruising => {
                    seq.phase = RoundPhase::StoppingReels { next: 0 };
                    seq.wait = Countdown::new(0.0);
                }
                RoundPhase::StoppingReels { next } if next < reel_count => {
                    self.reels[next].stop();
                    seq.phase = RoundPhase::StoppingReels { next: next + 1 };
                    seq.wait = Countdown::new(delay);
                }
                RoundPhase::StoppingReels { .. } => {
                    if seq.kind == SequenceKind::StopCascade {
                        self.sequence = None;
                    } else {
                        seq.phase = RoundPhase::Settling;
                    }
                }
                RoundPhase::Celebrating => self.finish_round(),
                RoundPhase::Settling | RoundPhase::Idle => break,
            }
        }
        Ok(())
    }

    /// All reels are at rest: evaluate and either celebrate or finish
    fn settle(&mut self, test_mode: bool) -> MachineResult<()> {
        let grid = self.visible_grid()?;
        let reel_count = self.reels.len();

        let line = if test_mode {
            let row = self.rng.random_range(0..VISIBLE_ROWS);
            Some(self.evaluator.force_row(reel_count, row))
        } else {
            self.evaluator.evaluate(&grid)
        };

        let outcome = RoundOutcome {
            round: self.round_count,
            won: line.is_some(),
            winning_rows: self.evaluator.winning_rows().to_vec(),
            line,
            grid,
            test_mode,
        };

        let Some(rows) = outcome.line.as_ref().map(|line| line.rows.clone()) else {
            info!("[Machine] round {} lost", outcome.round);
            self.pending = Some(outcome);
            self.finish_round();
            return Ok(());
        };

        info!("[Machine] round {} won on rows {:?}", outcome.round, rows);
        for (reel, row) in rows.into_iter().enumerate() {
            self.reels[reel].play_win_effect(row)?;
            self.observer.play_win_effect(reel, row);
        }

        self.pending = Some(outcome);
        let post_win = self.config.timing.post_win_dwell_secs;
        if let Some(seq) = self.sequence.as_mut() {
            seq.phase = RoundPhase::Celebrating;
            seq.wait = Countdown::new(post_win);
        }
        Ok(())
    }

    fn finish_round(&mut self) {
        self.sequence = None;
        let Some(outcome) = self.pending.take() else {
            return;
        };
        self.stats.record(&outcome);
        self.observer.on_round_complete(outcome.won);
        self.last_outcome = Some(outcome.clone());
        self.completed = Some(outcome);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reel::ReelState;
    use crate::symbols::NamedCatalog;
    use crate::timing::TimingConfig;

    const DT: f64 = 1.0 / 60.0;

    #[derive(Debug, Default)]
    struct Recorder {
        effects: Vec<(usize, usize)>,
        completions: Vec<bool>,
    }

    impl RoundObserver for Recorder {
        fn play_win_effect(&mut self, reel: usize, row: usize) {
            self.effects.push((reel, row));
        }

        fn on_round_complete(&mut self, won: bool) {
            self.completions.push(won);
        }
    }

    fn make_machine(seed: u64) -> Machine<NamedCatalog, Recorder> {
        let config = MachineConfig::studio().with_seed(seed);
        Machine::new(config, NamedCatalog::standard(3), Recorder::default()).unwrap()
    }

    fn run_round(machine: &mut Machine<NamedCatalog, Recorder>) -> RoundOutcome {
        for _ in 0..100_000 {
            if let Some(outcome) = machine.tick(DT).unwrap() {
                return outcome;
            }
        }
        panic!("round never completed");
    }

    #[test]
    fn test_machine_creation() {
        let machine = make_machine(1);
        assert_eq!(machine.reels().len(), 5);
        assert_eq!(machine.phase(), RoundPhase::Idle);
        assert!(machine.all_reels_idle());
        assert_eq!(machine.winning_rows(), &[-1; 5]);
    }

    #[test]
    fn test_catalog_must_match_config() {
        let result = Machine::new(
            MachineConfig::studio(),
            NamedCatalog::standard(4),
            NullObserver,
        );
        assert!(matches!(
            result,
            Err(MachineError::Config(ConfigError::CatalogMismatch { catalog: 4, .. }))
        ));
    }

    #[test]
    fn test_spin_round_starts_first_reel_immediately() {
        let mut machine = make_machine(2);
        machine.spin_round(false).unwrap();

        assert_eq!(machine.phase(), RoundPhase::StartingReels { next: 1 });
        assert_eq!(machine.reels()[0].state(), ReelState::Ramping);
        assert_eq!(machine.reels()[1].state(), ReelState::Idle);
    }

    #[test]
    fn test_reels_start_in_cascade() {
        let mut machine = make_machine(3);
        machine.spin_round(false).unwrap();

        // 0.05s delay per reel at studio timing
        machine.tick(0.06).unwrap();
        assert!(machine.reels()[1].state().is_spinning());
        assert!(!machine.reels()[2].state().is_spinning());

        machine.tick(0.05).unwrap();
        assert!(machine.reels()[2].state().is_spinning());
    }

    #[test]
    fn test_round_completes_and_reports() {
        let mut machine = make_machine(4);
        machine.spin_round(false).unwrap();
        let outcome = run_round(&mut machine);

        assert_eq!(outcome.round, 1);
        assert!(machine.all_reels_idle());
        assert!(!machine.is_busy());
        assert_eq!(machine.observer().completions, vec![outcome.won]);
        assert_eq!(machine.last_outcome(), Some(&outcome));
        assert_eq!(machine.stats().rounds, 1);
        assert_eq!(outcome.grid, machine.visible_grid().unwrap());

        if outcome.won {
            assert_eq!(machine.observer().effects.len(), 5);
        } else {
            assert!(machine.observer().effects.is_empty());
            assert_eq!(outcome.winning_rows, vec![-1; 5]);
        }
    }

    #[test]
    fn test_test_mode_always_wins() {
        let mut machine = make_machine(5);
        for _ in 0..5 {
            machine.spin_round(true).unwrap();
            let outcome = run_round(&mut machine);
            assert!(outcome.won);
            assert!(outcome.test_mode);

            let row = outcome.winning_rows[0];
            assert!((0..3).contains(&row));
            assert!(outcome.winning_rows.iter().all(|&r| r == row));
        }
        assert_eq!(machine.stats().test_rounds, 5);
        assert_eq!(machine.stats().wins, 0);
        assert_eq!(machine.observer().effects.len(), 25);
    }

    #[test]
    fn test_win_highlights_cells() {
        let mut machine = make_machine(6);
        machine.spin_round(true).unwrap();

        let mut celebrating = false;
        for _ in 0..100_000 {
            machine.tick(DT).unwrap();
            if machine.phase() == RoundPhase::Celebrating {
                celebrating = true;
                break;
            }
        }
        assert!(celebrating);
        for reel in machine.reels() {
            assert_eq!(reel.cells().iter().filter(|c| c.is_highlighted()).count(), 1);
        }

        // Completion waits for the post-win dwell
        assert!(machine.observer().completions.is_empty());
        run_round(&mut machine);
        assert_eq!(machine.observer().completions, vec![true]);
    }

    #[test]
    fn test_second_round_while_busy_rejected() {
        let mut machine = make_machine(7);
        machine.spin_round(false).unwrap();
        assert_eq!(machine.spin_round(false), Err(MachineError::RoundInProgress));
        assert_eq!(machine.start_cascade(), Err(MachineError::RoundInProgress));
    }

    #[test]
    fn test_evaluate_requires_rest() {
        let mut machine = make_machine(8);
        assert!(machine.evaluate_win().is_ok());

        machine.spin_round(false).unwrap();
        assert!(matches!(machine.evaluate_win(), Err(MachineError::Reel(_))));
    }

    #[test]
    fn test_manual_cascades() {
        let mut machine = make_machine(9);
        machine.start_cascade().unwrap();
        for _ in 0..60 {
            machine.tick(DT).unwrap();
        }
        assert!(!machine.is_busy());
        assert!(machine.reels().iter().all(|r| r.state().is_spinning()));

        machine.stop_cascade().unwrap();
        for _ in 0..600 {
            machine.tick(DT).unwrap();
        }
        assert!(!machine.is_busy());
        assert!(machine.all_reels_idle());
        assert!(machine.observer().completions.is_empty());
    }

    #[test]
    fn test_seeded_machines_agree() {
        let mut a = make_machine(42);
        let mut b = make_machine(42);
        for _ in 0..3 {
            a.spin_round(false).unwrap();
            b.spin_round(false).unwrap();
            assert_eq!(run_round(&mut a), run_round(&mut b));
        }
    }

    #[test]
    fn test_large_tick_carries_through_phases() {
        let config = MachineConfig {
            timing: TimingConfig {
                inter_reel_delay_secs: 0.1,
                pre_stop_dwell_secs: 0.2,
                post_win_dwell_secs: 0.0,
                ..TimingConfig::studio()
            },
            ..MachineConfig::studio().with_seed(10)
        };
        let mut machine = Machine::new(config, NamedCatalog::standard(3), NullObserver).unwrap();
        machine.spin_round(false).unwrap();

        // One tick covering every spin delay and the dwell
        machine.tick(0.5 + 0.2 + 1e-6).unwrap();
        assert_eq!(machine.phase(), RoundPhase::StoppingReels { next: 1 });
        assert_ne!(machine.reels()[0].state(), ReelState::Cruising);
        assert_eq!(machine.reels()[1].state(), ReelState::Cruising);
    }

    #[test]
    fn test_reels_started_mid_tick_move_for_remaining_time() {
        let config = MachineConfig {
            timing: TimingConfig {
                inter_reel_delay_secs: 0.1,
                pre_stop_dwell_secs: 5.0,
                ..TimingConfig::studio()
            },
            ..MachineConfig::studio().with_seed(12)
        };
        let max_speed = config.motion.max_speed;
        let ramp = config.motion.ramp_duration_secs;
        let mut machine = Machine::new(config, NamedCatalog::standard(3), NullObserver).unwrap();
        machine.spin_round(false).unwrap();

        // Reel k starts 0.1s * k into the tick
        let dt = 0.45;
        machine.tick(dt).unwrap();
        assert_eq!(machine.phase(), RoundPhase::StartingReels { next: 5 });

        for (k, reel) in machine.reels().iter().enumerate() {
            let moving_for = dt - 0.1 * k as f64;
            let expected = max_speed * moving_for / ramp;
            assert_eq!(reel.state(), ReelState::Ramping, "reel {}", k);
            assert!((reel.speed() - expected).abs() < 1e-6, "reel {}: {}", k, reel.speed());
        }
    }

    #[test]
    fn test_hit_rate() {
        let stats = SessionStats {
            rounds: 5,
            wins: 1,
            losses: 3,
            test_rounds: 1,
        };
        assert_eq!(stats.hit_rate(), 25.0);
        assert_eq!(SessionStats::default().hit_rate(), 0.0);
    }

    #[test]
    fn test_reset_stats() {
        let mut machine = make_machine(11);
        machine.spin_round(false).unwrap();
        run_round(&mut machine);
        machine.reset_stats();
        assert_eq!(machine.stats(), &SessionStats::default());

        machine.spin_round(false).unwrap();
        assert_eq!(run_round(&mut machine).round, 1);
    }
}
