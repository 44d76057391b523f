use itertools::Itertools;
use rand::Rng;
use rand::prelude::IndexedRandom;
use std::collections::{BTreeSet, HashSet, VecDeque};

/// Represents a 2D coordinate on the minesweeper board, row-major.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Point {
    pub row: usize,
    pub col: usize,
}

/// A logical statement about the board: exactly `count` of `cells` are mines.
///
/// Cells are kept in a sorted set, so equality and hashing see the same
/// canonical form regardless of the order facts arrived in.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Constraint {
    cells: BTreeSet<Point>,
    count: usize,
}

impl Constraint {
    pub fn new(cells: impl IntoIterator<Item = Point>, count: usize) -> Self {
        let cells: BTreeSet<Point> = cells.into_iter().collect();
        assert!(
            count <= cells.len(),
            "constraint claims {count} mines among {} cells",
            cells.len()
        );
        Self { cells, count }
    }

    /// The cells this constraint proves to be mines: all of them when the
    /// count covers every remaining cell, none otherwise.
    pub fn resolved_mines(&self) -> BTreeSet<Point> {
        if self.count == self.cells.len() {
            self.cells.clone()
        } else {
            BTreeSet::new()
        }
    }

    /// The cells this constraint proves to be safe: all of them when no
    /// mines remain among them, none otherwise.
    pub fn resolved_safes(&self) -> BTreeSet<Point> {
        if self.count == 0 {
            self.cells.clone()
        } else {
            BTreeSet::new()
        }
    }

    /// Fold in the fact that `cell` is a mine. No-op for cells the
    /// constraint does not mention.
    pub fn declare_mine(&mut self, cell: Point) {
        if self.cells.remove(&cell) {
            assert!(
                self.count > 0,
                "mine at {cell:?} contradicts a zero-count constraint"
            );
            self.count -= 1;
        }
    }

    /// Fold in the fact that `cell` is safe. No-op for cells the constraint
    /// does not mention.
    pub fn declare_safe(&mut self, cell: Point) {
        if self.cells.remove(&cell) {
            assert!(
                self.count <= self.cells.len(),
                "safe cell {cell:?} leaves {} mines among {} cells",
                self.count,
                self.cells.len()
            );
        }
    }

    /// A constraint over no cells says nothing and can be dropped.
    fn is_inert(&self) -> bool {
        self.cells.is_empty()
    }

    fn is_strict_subset_of(&self, other: &Self) -> bool {
        self.cells.len() < other.cells.len() && self.cells.is_subset(&other.cells)
    }

    /// Subset-difference derivation: what `self` says beyond `sub`. Only
    /// meaningful when `sub.cells` is a strict subset of `self.cells`.
    fn difference(&self, sub: &Self) -> Self {
        assert!(
            self.count >= sub.count,
            "sub-constraint claims more mines ({}) than its superset ({})",
            sub.count,
            self.count
        );
        Self::new(
            self.cells.difference(&sub.cells).copied(),
            self.count - sub.count,
        )
    }
}

// --- The Agent (knowledge base and inference engine) ---

/// The deducing player. Holds the facts established so far (moves made,
/// known mines, known safes) together with the live constraints relating
/// cells whose status is still open, and keeps the whole base closed under
/// its two deduction rules after every new piece of information.
pub struct Agent {
    height: usize,
    width: usize,
    moves_made: HashSet<Point>,
    mines: HashSet<Point>,
    safes: HashSet<Point>,
    /// Live constraints. Never contains duplicates or inert constraints
    /// once the worklist has drained.
    constraints: Vec<Constraint>,
    /// Worklist of constraints not yet reconciled with the rest of the
    /// base: fresh observations, derivations, and live constraints that a
    /// new fact has changed.
    dirty: VecDeque<Constraint>,
}

impl Agent {
    pub fn new(height: usize, width: usize) -> Self {
        Agent {
            height,
            width,
            moves_made: HashSet::new(),
            mines: HashSet::new(),
            safes: HashSet::new(),
            constraints: Vec::new(),
            dirty: VecDeque::new(),
        }
    }

    /// The sole inbound entry point: the board has revealed `cell` as safe
    /// with `count` mines among its neighbors. Records the move, folds the
    /// observation into the knowledge base, and runs deduction until
    /// nothing more follows.
    ///
    /// Observations that contradict the calling contract (out of bounds,
    /// repeated, a known mine, or an impossible count) are rejected without
    /// changing any state.
    pub fn observe(&mut self, cell: Point, count: usize) -> anyhow::Result<()> {
        if cell.row >= self.height || cell.col >= self.width {
            anyhow::bail!(
                "cell ({}, {}) is outside the {}x{} board",
                cell.row,
                cell.col,
                self.height,
                self.width
            );
        }
        if self.moves_made.contains(&cell) {
            anyhow::bail!("cell ({}, {}) was already revealed", cell.row, cell.col);
        }
        if self.mines.contains(&cell) {
            anyhow::bail!(
                "cell ({}, {}) is a known mine and cannot be revealed as safe",
                cell.row,
                cell.col
            );
        }
        let neighbors: Vec<Point> = neighbors(cell, self.height, self.width).collect();
        if count > neighbors.len() {
            anyhow::bail!(
                "cell ({}, {}) reports {count} mines but has only {} neighbors",
                cell.row,
                cell.col,
                neighbors.len()
            );
        }

        self.moves_made.insert(cell);
        self.record_safe(cell);

        // Fold existing knowledge into the fresh observation: known mines
        // lower the remaining count, already-settled cells carry no
        // information. Whatever is left becomes the new constraint.
        let mut remaining = count;
        let mut unknown = BTreeSet::new();
        for n in neighbors {
            if self.mines.contains(&n) {
                assert!(
                    remaining > 0,
                    "cell {cell:?} reports fewer mines than are already known around it"
                );
                remaining -= 1;
            } else if self.safes.contains(&n) || self.moves_made.contains(&n) {
                continue;
            } else {
                unknown.insert(n);
            }
        }
        self.dirty.push_back(Constraint::new(unknown, remaining));
        self.propagate();
        Ok(())
    }

    /// Record that `cell` is a mine and fold the fact through every live
    /// constraint, chasing any further conclusions. Idempotent.
    pub fn mark_mine(&mut self, cell: Point) {
        self.record_mine(cell);
        self.propagate();
    }

    /// Record that `cell` is safe and fold the fact through every live
    /// constraint, chasing any further conclusions. Idempotent.
    pub fn mark_safe(&mut self, cell: Point) {
        self.record_safe(cell);
        self.propagate();
    }

    /// A cell known to be safe that has not been played yet. Which of
    /// several candidates is returned is unspecified.
    pub fn safe_move(&self) -> Option<Point> {
        self.safes
            .iter()
            .find(|cell| !self.moves_made.contains(cell))
            .copied()
    }

    /// A uniformly random cell that is neither a known mine nor already
    /// played, or `None` once the board is fully determined or explored.
    pub fn random_move(&self, rng: &mut impl Rng) -> Option<Point> {
        let candidates: Vec<Point> = (0..self.height)
            .cartesian_product(0..self.width)
            .map(|(row, col)| Point { row, col })
            .filter(|cell| !self.mines.contains(cell) && !self.moves_made.contains(cell))
            .collect();
        candidates.choose(rng).copied()
    }

    /// Cells proven to be mines so far.
    pub fn known_mines(&self) -> &HashSet<Point> {
        &self.mines
    }

    /// Cells proven to be safe so far (played or not).
    pub fn known_safes(&self) -> &HashSet<Point> {
        &self.safes
    }

    /// Cells already played.
    pub fn moves_made(&self) -> &HashSet<Point> {
        &self.moves_made
    }

    fn record_mine(&mut self, cell: Point) {
        assert!(
            !self.safes.contains(&cell),
            "cell {cell:?} cannot be both a mine and safe"
        );
        if !self.mines.insert(cell) {
            return;
        }
        self.requeue_touching(cell, true);
    }

    fn record_safe(&mut self, cell: Point) {
        assert!(
            !self.mines.contains(&cell),
            "cell {cell:?} cannot be both safe and a mine"
        );
        if !self.safes.insert(cell) {
            return;
        }
        self.requeue_touching(cell, false);
    }

    /// Move every live constraint that mentions `cell` back onto the
    /// worklist, reduced by the new fact. A changed constraint must be
    /// re-examined against the whole base before it can count as live
    /// again.
    fn requeue_touching(&mut self, cell: Point, is_mine: bool) {
        let mut i = 0;
        while i < self.constraints.len() {
            if self.constraints[i].cells.contains(&cell) {
                let mut constraint = self.constraints.swap_remove(i);
                if is_mine {
                    constraint.declare_mine(cell);
                } else {
                    constraint.declare_safe(cell);
                }
                self.dirty.push_back(constraint);
            } else {
                i += 1;
            }
        }
    }

    /// Drain the worklist to a fixed point.
    ///
    /// Each queued constraint is reconciled with facts learned since it was
    /// queued, then either dropped (inert), fully resolved (every cell
    /// marked mine or safe, which requeues whatever those marks touch), or
    /// discarded as a duplicate. Anything still standing is matched against
    /// every live constraint for strict-subset relations, where each hit
    /// derives the superset minus the subset onto the worklist, and then
    /// goes live itself.
    ///
    /// Termination is structural: the fact sets only grow within a finite
    /// board, and every queued constraint either deduplicates away or is a
    /// distinct constraint over a finite cell universe.
    fn propagate(&mut self) {
        while let Some(mut constraint) = self.dirty.pop_front() {
            // Facts may have landed while this constraint sat in the queue.
            for cell in constraint.cells.iter().copied().collect_vec() {
                if self.mines.contains(&cell) {
                    constraint.declare_mine(cell);
                } else if self.safes.contains(&cell) {
                    constraint.declare_safe(cell);
                }
            }
            if constraint.is_inert() {
                continue;
            }

            let mined = constraint.resolved_mines();
            if !mined.is_empty() {
                for cell in mined {
                    self.record_mine(cell);
                }
                continue;
            }
            let safe = constraint.resolved_safes();
            if !safe.is_empty() {
                for cell in safe {
                    self.record_safe(cell);
                }
                continue;
            }

            if self.constraints.contains(&constraint) {
                continue;
            }

            for live in &self.constraints {
                if constraint.is_strict_subset_of(live) {
                    self.dirty.push_back(live.difference(&constraint));
                } else if live.is_strict_subset_of(&constraint) {
                    self.dirty.push_back(constraint.difference(live));
                }
            }
            self.constraints.push(constraint);
        }
    }
}

// --- The Field (minefield collaborator) ---

/// The hidden minefield the agent plays against. It knows where the mines
/// are; the agent never looks inside, it only receives neighbor counts for
/// the cells it reveals.
#[derive(Debug, Clone)]
pub struct Field {
    height: usize,
    width: usize,
    mines: HashSet<Point>,
}

impl Field {
    /// A field with `mine_count` mines placed uniformly at random.
    pub fn random(height: usize, width: usize, mine_count: usize, rng: &mut impl Rng) -> Self {
        assert!(
            mine_count < height * width,
            "Total mines must be less than the number of cells on the board."
        );
        let mines = rand::seq::index::sample(rng, height * width, mine_count)
            .into_iter()
            .map(|i| Point {
                row: i / width,
                col: i % width,
            })
            .collect();
        Field {
            height,
            width,
            mines,
        }
    }

    /// A field with mines at explicit positions.
    pub fn with_mines(
        height: usize,
        width: usize,
        mines: impl IntoIterator<Item = Point>,
    ) -> Self {
        let mines: HashSet<Point> = mines.into_iter().collect();
        assert!(
            mines
                .iter()
                .all(|cell| cell.row < height && cell.col < width),
            "mine placed outside the board"
        );
        assert!(
            mines.len() < height * width,
            "Total mines must be less than the number of cells on the board."
        );
        Field {
            height,
            width,
            mines,
        }
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn mine_count(&self) -> usize {
        self.mines.len()
    }

    /// How many cells a winning player has to reveal.
    pub fn safe_cell_count(&self) -> usize {
        self.height * self.width - self.mines.len()
    }

    pub fn is_mine(&self, cell: Point) -> bool {
        self.mines.contains(&cell)
    }

    /// The number of mines within one row and column of `cell`, the cell
    /// itself excluded.
    pub fn nearby_mines(&self, cell: Point) -> usize {
        neighbors(cell, self.height, self.width)
            .filter(|n| self.is_mine(*n))
            .count()
    }

    /// Whether `flagged` pinpoints every mine exactly.
    pub fn all_mines_flagged(&self, flagged: &HashSet<Point>) -> bool {
        *flagged == self.mines
    }
}

/// In-bounds 8-neighborhood of `cell` on a `height` x `width` board.
fn neighbors(cell: Point, height: usize, width: usize) -> impl Iterator<Item = Point> {
    (-1isize..=1)
        .cartesian_product(-1isize..=1)
        .filter(|&offset| offset != (0, 0))
        .filter_map(move |(dr, dc)| {
            let row = cell.row.checked_add_signed(dr)?;
            let col = cell.col.checked_add_signed(dc)?;
            (row < height && col < width).then_some(Point { row, col })
        })
}
