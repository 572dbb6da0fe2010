//! Toroidal grid abstraction.
//!
//! Every position is a `(row, col)` pair reduced modulo the grid dimensions.
//! Distances are the wraparound minimum per axis. Ring and disc enumeration
//! read from a flat offset table built once at construction, so queries do
//! not allocate for radii inside the cached range.

use std::borrow::Cow;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};

/// A cell on the toroidal grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct Position {
    /// Row index, `0..height`.
    pub row: usize,
    /// Column index, `0..width`.
    pub col: usize,
}

impl Position {
    /// Create a new position. The caller is responsible for it being in range.
    #[must_use]
    pub const fn new(row: usize, col: usize) -> Self {
        Self { row, col }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.row, self.col)
    }
}

/// One of the four orthogonal moves, or staying put.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    /// Row - 1.
    #[serde(rename = "n")]
    North,
    /// Col + 1.
    #[serde(rename = "e")]
    East,
    /// Row + 1.
    #[serde(rename = "s")]
    South,
    /// Col - 1.
    #[serde(rename = "w")]
    West,
    /// No movement.
    #[serde(rename = "o")]
    Still,
}

impl Direction {
    /// The four moving directions in neighbor enumeration order.
    pub const CARDINALS: [Self; 4] = [Self::North, Self::East, Self::South, Self::West];

    /// Row/column offset of this direction.
    #[must_use]
    pub const fn offset(self) -> (isize, isize) {
        match self {
            Self::North => (-1, 0),
            Self::East => (0, 1),
            Self::South => (1, 0),
            Self::West => (0, -1),
            Self::Still => (0, 0),
        }
    }

    /// Single-character command code.
    #[must_use]
    pub const fn as_char(self) -> char {
        match self {
            Self::North => 'n',
            Self::East => 'e',
            Self::South => 's',
            Self::West => 'w',
            Self::Still => 'o',
        }
    }
}

type Offset = (isize, isize);

/// Fixed-size toroidal index space.
#[derive(Debug, Clone)]
pub struct Grid {
    width: usize,
    height: usize,
    /// Ring offsets for radii `0..=cached_radius`, concatenated in radius order.
    offsets: Vec<Offset>,
    cached_radius: usize,
}

impl Grid {
    /// Create a grid and warm the ring/disc cache up to the largest
    /// wraparound Manhattan distance the grid can hold.
    ///
    /// # Panics
    ///
    /// Panics if `width` or `height` is zero.
    #[must_use]
    pub fn new(width: usize, height: usize) -> Self {
        assert!(width > 0, "Grid width must be positive");
        assert!(height > 0, "Grid height must be positive");

        let cached_radius = width / 2 + height / 2;
        let mut offsets = Vec::with_capacity(disc_area(cached_radius));
        for radius in 0..=cached_radius {
            push_ring_offsets(&mut offsets, radius);
        }

        Self {
            width,
            height,
            offsets,
            cached_radius,
        }
    }

    /// Grid width in cells.
    #[must_use]
    pub const fn width(&self) -> usize {
        self.width
    }

    /// Grid height in cells.
    #[must_use]
    pub const fn height(&self) -> usize {
        self.height
    }

    /// Total number of cells.
    #[must_use]
    pub const fn cell_count(&self) -> usize {
        self.width * self.height
    }

    /// Whether a position is already reduced into range.
    #[must_use]
    pub const fn contains(&self, pos: Position) -> bool {
        pos.row < self.height && pos.col < self.width
    }

    /// Validate that a position is in range.
    pub fn check(&self, pos: Position) -> Result<Position> {
        if self.contains(pos) {
            Ok(pos)
        } else {
            Err(EngineError::OutOfBounds {
                position: pos,
                width: self.width,
                height: self.height,
            })
        }
    }

    /// Row-major dense index of a position.
    #[inline]
    #[must_use]
    pub const fn index(&self, pos: Position) -> usize {
        pos.row * self.width + pos.col
    }

    /// Position of a row-major dense index.
    #[inline]
    #[must_use]
    pub const fn position(&self, index: usize) -> Position {
        Position::new(index / self.width, index % self.width)
    }

    /// Reduce signed coordinates modulo the grid dimensions.
    #[inline]
    #[must_use]
    pub fn wrap(&self, row: isize, col: isize) -> Position {
        Position::new(
            row.rem_euclid(self.height as isize) as usize,
            col.rem_euclid(self.width as isize) as usize,
        )
    }

    /// Translate a position by a signed offset with wraparound.
    #[inline]
    #[must_use]
    pub fn offset(&self, pos: Position, (dr, dc): Offset) -> Position {
        self.wrap(pos.row as isize + dr, pos.col as isize + dc)
    }

    /// The cell reached by moving one step in `dir`.
    #[inline]
    #[must_use]
    pub fn step(&self, pos: Position, dir: Direction) -> Position {
        self.offset(pos, dir.offset())
    }

    /// Per-axis wraparound deltas `(rows, cols)`.
    #[inline]
    #[must_use]
    pub fn axis_deltas(&self, a: Position, b: Position) -> (usize, usize) {
        let dr = a.row.abs_diff(b.row);
        let dc = a.col.abs_diff(b.col);
        (dr.min(self.height - dr), dc.min(self.width - dc))
    }

    /// Wraparound Manhattan distance.
    #[inline]
    #[must_use]
    pub fn distance(&self, a: Position, b: Position) -> usize {
        let (dr, dc) = self.axis_deltas(a, b);
        dr + dc
    }

    /// Wraparound Chebyshev distance.
    #[inline]
    #[must_use]
    pub fn chebyshev(&self, a: Position, b: Position) -> usize {
        let (dr, dc) = self.axis_deltas(a, b);
        dr.max(dc)
    }

    /// The four orthogonal neighbors in N, E, S, W order.
    #[inline]
    #[must_use]
    pub fn neighbors(&self, pos: Position) -> [Position; 4] {
        Direction::CARDINALS.map(|dir| self.step(pos, dir))
    }

    /// Direction of a single orthogonal step from `from` to `to`.
    ///
    /// Returns `Still` when the positions coincide and `None` when they are
    /// not adjacent.
    #[must_use]
    pub fn direction_between(&self, from: Position, to: Position) -> Option<Direction> {
        if from == to {
            return Some(Direction::Still);
        }
        Direction::CARDINALS
            .into_iter()
            .find(|&dir| self.step(from, dir) == to)
    }

    /// Cells at exactly Manhattan radius `radius` (offset order, `4r` cells,
    /// one when `r == 0`). On grids smaller than `2r + 1` a cell can repeat.
    #[must_use]
    pub fn ring(&self, center: Position, radius: usize) -> Cells<'_> {
        let offsets = if radius <= self.cached_radius {
            Cow::Borrowed(&self.offsets[disc_area_before(radius)..disc_area(radius)])
        } else {
            let mut owned = Vec::with_capacity(ring_size(radius));
            push_ring_offsets(&mut owned, radius);
            Cow::Owned(owned)
        };
        Cells::new(self, center, offsets)
    }

    /// Cells within Manhattan radius `radius` (`2r(r+1)+1` cells), ordered
    /// by increasing radius.
    #[must_use]
    pub fn disc(&self, center: Position, radius: usize) -> Cells<'_> {
        let offsets = if radius <= self.cached_radius {
            Cow::Borrowed(&self.offsets[..disc_area(radius)])
        } else {
            let mut owned = Vec::with_capacity(disc_area(radius));
            for r in 0..=radius {
                push_ring_offsets(&mut owned, r);
            }
            Cow::Owned(owned)
        };
        Cells::new(self, center, offsets)
    }

    /// Iterate every position in row-major order.
    pub fn positions(&self) -> impl Iterator<Item = Position> + '_ {
        (0..self.cell_count()).map(|i| self.position(i))
    }
}

/// Iterator over the cells of a cached ring or disc.
#[derive(Debug, Clone)]
pub struct Cells<'a> {
    grid: &'a Grid,
    center: Position,
    offsets: Cow<'a, [Offset]>,
    next: usize,
}

impl<'a> Cells<'a> {
    fn new(grid: &'a Grid, center: Position, offsets: Cow<'a, [Offset]>) -> Self {
        Self {
            grid,
            center,
            offsets,
            next: 0,
        }
    }
}

impl Iterator for Cells<'_> {
    type Item = Position;

    fn next(&mut self) -> Option<Self::Item> {
        let offset = *self.offsets.get(self.next)?;
        self.next += 1;
        Some(self.grid.offset(self.center, offset))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.offsets.len() - self.next;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for Cells<'_> {}

/// Number of cells at exactly radius `r`.
#[must_use]
pub const fn ring_size(radius: usize) -> usize {
    if radius == 0 {
        1
    } else {
        4 * radius
    }
}

/// Number of cells within radius `r`: `2r(r+1)+1`.
#[must_use]
pub const fn disc_area(radius: usize) -> usize {
    2 * radius * (radius + 1) + 1
}

const fn disc_area_before(radius: usize) -> usize {
    if radius == 0 {
        0
    } else {
        disc_area(radius - 1)
    }
}

/// Append the ring offsets for `radius`, walking the four diamond edges
/// clockwise from due north. Each edge is half-open so corners appear once.
fn push_ring_offsets(out: &mut Vec<Offset>, radius: usize) {
    if radius == 0 {
        out.push((0, 0));
        return;
    }
    let r = radius as isize;
    for i in 0..r {
        out.push((-r + i, i));
    }
    for i in 0..r {
        out.push((i, r - i));
    }
    for i in 0..r {
        out.push((r - i, -i));
    }
    for i in 0..r {
        out.push((-i, -r + i));
    }
}

/// Dense per-cell bitset used for forbidden and finalized markers.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CellSet {
    words: Vec<u64>,
    len: usize,
}

impl CellSet {
    /// Empty set sized for `len` cells.
    #[must_use]
    pub fn new(len: usize) -> Self {
        Self {
            words: vec![0; len.div_ceil(64)],
            len,
        }
    }

    /// Number of addressable cells.
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.len
    }

    /// Mark a cell. Returns `true` if it was not already marked.
    pub fn insert(&mut self, index: usize) -> bool {
        let (word, bit) = (index / 64, 1u64 << (index % 64));
        let fresh = self.words[word] & bit == 0;
        self.words[word] |= bit;
        fresh
    }

    /// Unmark a cell.
    pub fn remove(&mut self, index: usize) {
        self.words[index / 64] &= !(1u64 << (index % 64));
    }

    /// Whether a cell is marked.
    #[must_use]
    pub fn contains(&self, index: usize) -> bool {
        self.words[index / 64] & (1u64 << (index % 64)) != 0
    }

    /// Unmark every cell.
    pub fn clear(&mut self) {
        self.words.fill(0);
    }

    /// Number of marked cells.
    #[must_use]
    pub fn count(&self) -> usize {
        self.words.iter().map(|w| w.count_ones() as usize).sum()
    }
}
