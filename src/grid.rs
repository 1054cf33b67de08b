//! Two-dimensional grid used as the board's backing store.
//!
//! Cells are stored in a flat vector in row-major order, so a cell at
//! `(column, row)` lives at `row * columns + column`. Every cell always holds a
//! value; the board uses `Option<Card>` so an empty cell is simply `None`.

use rand::Rng;

/// A cell coordinate as `(column, row)`.
pub type Position = (usize, usize);

/// Converts a `(column, row)` position to a flat index.
#[inline(always)]
pub const fn position_to_idx(columns: usize, (column, row): Position) -> usize {
    row * columns + column
}

/// Converts a flat index to a `(column, row)` position.
#[inline(always)]
pub const fn idx_to_position(columns: usize, index: usize) -> Position {
    (index % columns, index / columns)
}

/// Dense `columns x rows` storage.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Grid<T> {
    columns: usize,
    rows: usize,
    cells: Vec<T>,
}

impl<T> Grid<T> {
    /// Builds a grid by calling `generator(column, row, flat_index)` for every
    /// cell, row by row.
    pub fn from_fn(
        columns: usize,
        rows: usize,
        mut generator: impl FnMut(usize, usize, usize) -> T,
    ) -> Self {
        let cells = (0..columns * rows)
            .map(|index| {
                let (column, row) = idx_to_position(columns, index);
                generator(column, row, index)
            })
            .collect();

        Self {
            columns,
            rows,
            cells,
        }
    }

    /// Discards every cell and regenerates the grid with new dimensions.
    ///
    /// The result is indistinguishable from `Grid::from_fn(columns, rows, generator)`.
    pub fn rebuild(
        &mut self,
        columns: usize,
        rows: usize,
        generator: impl FnMut(usize, usize, usize) -> T,
    ) {
        *self = Self::from_fn(columns, rows, generator);
    }

    #[inline]
    pub fn columns(&self) -> usize {
        self.columns
    }

    #[inline]
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Total number of cells (`columns * rows`).
    #[inline]
    pub fn capacity(&self) -> usize {
        self.cells.len()
    }

    #[inline]
    pub fn position_of(&self, index: usize) -> Position {
        idx_to_position(self.columns, index)
    }

    /// Flat index of a position. Panics when the position is outside the grid.
    #[inline]
    pub fn index_of(&self, position: Position) -> usize {
        assert!(
            position.0 < self.columns && position.1 < self.rows,
            "position {position:?} outside {}x{} grid",
            self.columns,
            self.rows
        );
        position_to_idx(self.columns, position)
    }

    #[inline]
    pub fn get(&self, position: Position) -> &T {
        &self.cells[self.index_of(position)]
    }

    #[inline]
    pub fn get_mut(&mut self, position: Position) -> &mut T {
        let index = self.index_of(position);
        &mut self.cells[index]
    }

    #[inline]
    pub fn set(&mut self, position: Position, value: T) {
        *self.get_mut(position) = value;
    }

    #[inline]
    pub fn get_index(&self, index: usize) -> &T {
        &self.cells[index]
    }

    #[inline]
    pub fn set_index(&mut self, index: usize, value: T) {
        self.cells[index] = value;
    }

    /// Exchanges the values of two cells.
    pub fn swap(&mut self, a: Position, b: Position) {
        let (a, b) = (self.index_of(a), self.index_of(b));
        self.cells.swap(a, b);
    }

    /// Uniformly permutes the cells in place (Fisher-Yates over flat indices).
    pub fn shuffle<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        let capacity = self.capacity();
        for i in 0..capacity {
            let j = rng.random_range(i..capacity);
            self.cells.swap(i, j);
        }
    }

    /// All positions whose cell satisfies `predicate`, in row-major order.
    pub fn find_all(&self, mut predicate: impl FnMut(Position, &T) -> bool) -> Vec<Position> {
        self.iter()
            .filter(|&(position, value)| predicate(position, value))
            .map(|(position, _)| position)
            .collect()
    }

    /// First position (row-major) whose cell satisfies `predicate`.
    pub fn find_first(&self, mut predicate: impl FnMut(Position, &T) -> bool) -> Option<Position> {
        self.iter()
            .find(|&(position, value)| predicate(position, value))
            .map(|(position, _)| position)
    }

    /// Left to right, top to bottom.
    pub fn iter(&self) -> impl Iterator<Item = (Position, &T)> + '_ {
        self.cells
            .iter()
            .enumerate()
            .map(|(index, value)| (idx_to_position(self.columns, index), value))
    }

    /// Top to bottom, left to right: column by column.
    pub fn iter_column_major(&self) -> impl Iterator<Item = (Position, &T)> + '_ {
        (0..self.columns).flat_map(move |column| {
            (0..self.rows).map(move |row| ((column, row), self.get((column, row))))
        })
    }

    /// The cells of one row, left to right.
    pub fn row(&self, row: usize) -> &[T] {
        let start = self.index_of((0, row));
        &self.cells[start..start + self.columns]
    }

    pub fn cells(&self) -> &[T] {
        &self.cells
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn numbered(columns: usize, rows: usize) -> Grid<usize> {
        Grid::from_fn(columns, rows, |_, _, index| index)
    }

    #[test]
    fn test_position_conversion_roundtrip() {
        for index in 0..52 {
            let position = idx_to_position(13, index);
            assert!(position.0 < 13 && position.1 < 4, "{position:?} out of range");
            assert_eq!(position_to_idx(13, position), index, "Roundtrip failed for {index}");
        }
    }

    #[test]
    fn test_generator_receives_coordinates() {
        let grid = Grid::from_fn(4, 3, |column, row, index| (column, row, index));
        for (position, &(column, row, index)) in grid.iter() {
            assert_eq!(position, (column, row));
            assert_eq!(grid.index_of(position), index);
        }
        assert_eq!(*grid.get((3, 2)), (3, 2, 11));
    }

    #[test]
    fn test_get_and_set_by_index_and_position_agree() {
        let mut grid = numbered(5, 2);
        grid.set((1, 1), 100);
        assert_eq!(*grid.get_index(6), 100);

        grid.set_index(9, 42);
        assert_eq!(*grid.get((4, 1)), 42);
    }

    #[test]
    #[should_panic]
    fn test_out_of_range_access_panics() {
        let grid = numbered(3, 3);
        grid.get((3, 0));
    }

    #[test]
    fn test_shuffle_is_permutation() {
        let mut grid = numbered(13, 4);
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        grid.shuffle(&mut rng);

        let mut values = grid.cells().to_vec();
        values.sort_unstable();
        assert_eq!(values, (0..52).collect::<Vec<_>>());
        assert_ne!(grid, numbered(13, 4), "a 52-cell shuffle left everything in place");
    }

    #[test]
    fn test_shuffle_is_reproducible_with_seeded_rng() {
        let mut a = numbered(6, 3);
        let mut b = numbered(6, 3);
        a.shuffle(&mut ChaCha8Rng::seed_from_u64(99));
        b.shuffle(&mut ChaCha8Rng::seed_from_u64(99));
        assert_eq!(a, b);
    }

    #[test]
    fn test_find_scans_row_major() {
        let grid = Grid::from_fn(3, 3, |column, _, _| column == 1);
        assert_eq!(grid.find_first(|_, &v| v), Some((1, 0)));
        assert_eq!(grid.find_all(|_, &v| v), vec![(1, 0), (1, 1), (1, 2)]);
        assert_eq!(grid.find_first(|(column, _), _| column > 5), None);
    }

    #[test]
    fn test_column_major_iteration_order() {
        let grid = numbered(3, 2);
        let order: Vec<usize> = grid.iter_column_major().map(|(_, &v)| v).collect();
        assert_eq!(order, vec![0, 3, 1, 4, 2, 5]);
    }

    #[test]
    fn test_rebuild_matches_fresh_grid() {
        let mut grid = numbered(3, 2);
        grid.set((0, 0), 77);
        grid.rebuild(5, 4, |_, _, index| index);
        assert_eq!(grid, numbered(5, 4));
    }

    #[test]
    fn test_swap_and_row() {
        let mut grid = numbered(4, 2);
        grid.swap((0, 0), (3, 1));
        assert_eq!(grid.row(0), &[7, 1, 2, 3]);
        assert_eq!(grid.row(1), &[4, 5, 6, 0]);
    }
}
