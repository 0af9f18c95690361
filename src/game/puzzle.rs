//! Word-search grid construction
//!
//! Words are packed longest first along the eight compass lines. Words may
//! cross where they share a letter. A build that strands a word is thrown
//! away and retried from an empty grid; running out of attempts is an error
//! rather than a degraded puzzle.

use log::debug;
use rand::seq::SliceRandom;
use rand::Rng;

use crate::error::{Result, WordRushError};
use crate::game::session::Cell;

/// Row/column steps of the eight line directions
const DIRECTIONS: [(i64, i64); 8] = [
    (0, 1),
    (1, 0),
    (1, 1),
    (-1, 1),
    (0, -1),
    (-1, 0),
    (-1, -1),
    (1, -1),
];

/// Where one word landed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Placement {
    pub word: String,
    pub cells: Vec<Cell>,
}

/// A filled grid plus the hidden words
#[derive(Debug, Clone)]
pub struct Puzzle {
    pub grid: Vec<Vec<char>>,
    pub placements: Vec<Placement>,
}

/// Builds square letter grids
#[derive(Debug, Clone, Copy)]
pub struct PuzzleGenerator {
    size: usize,
    max_attempts: usize,
}

impl PuzzleGenerator {
    pub fn new(size: usize, max_attempts: usize) -> Self {
        Self { size, max_attempts }
    }

    /// Place every word and fill the gaps with random letters
    pub fn generate<R: Rng + ?Sized>(&self, words: &[String], rng: &mut R) -> Result<Puzzle> {
        let mut sorted: Vec<&String> = words.iter().collect();
        sorted.sort_by(|a, b| b.chars().count().cmp(&a.chars().count()));

        for attempt in 1..=self.max_attempts {
            if let Some((mut grid, placements)) = self.try_build(&sorted, rng) {
                for cell in grid.iter_mut().flatten() {
                    if cell.is_none() {
                        *cell = Some(rng.gen_range(b'A'..=b'Z') as char);
                    }
                }
                let grid = grid
                    .into_iter()
                    .map(|row| row.into_iter().map(|c| c.unwrap_or('A')).collect())
                    .collect();
                debug!("Generated {}x{} puzzle on attempt {}", self.size, self.size, attempt);
                return Ok(Puzzle { grid, placements });
            }
        }

        Err(WordRushError::PuzzleGeneration {
            attempts: self.max_attempts,
        })
    }

    fn try_build<R: Rng + ?Sized>(
        &self,
        words: &[&String],
        rng: &mut R,
    ) -> Option<(Vec<Vec<Option<char>>>, Vec<Placement>)> {
        let mut grid = vec![vec![None; self.size]; self.size];
        let mut placements = Vec::with_capacity(words.len());

        for word in words {
            let letters: Vec<char> = word.chars().collect();
            let mut directions = DIRECTIONS;
            directions.shuffle(rng);

            let placed = directions.iter().find_map(|&dir| {
                let origins = self.valid_origins(&grid, &letters, dir);
                origins.choose(rng).map(|&origin| (origin, dir))
            });

            let ((row, col), (dr, dc)) = placed?;
            let mut cells = Vec::with_capacity(letters.len());
            for (i, letter) in letters.iter().enumerate() {
                let r = (row + i as i64 * dr) as usize;
                let c = (col + i as i64 * dc) as usize;
                grid[r][c] = Some(*letter);
                cells.push(Cell::new(r, c));
            }
            placements.push(Placement {
                word: (*word).clone(),
                cells,
            });
        }

        Some((grid, placements))
    }

    fn valid_origins(
        &self,
        grid: &[Vec<Option<char>>],
        letters: &[char],
        (dr, dc): (i64, i64),
    ) -> Vec<(i64, i64)> {
        let size = self.size as i64;
        let mut origins = Vec::new();
        for row in 0..size {
            for col in 0..size {
                let fits = letters.iter().enumerate().all(|(i, letter)| {
                    let r = row + i as i64 * dr;
                    let c = col + i as i64 * dc;
                    if r < 0 || r >= size || c < 0 || c >= size {
                        return false;
                    }
                    match grid[r as usize][c as usize] {
                        None => true,
                        Some(existing) => existing == *letter,
                    }
                });
                if fits {
                    origins.push((row, col));
                }
            }
        }
        origins
    }
}
