//! World layouts loaded from a JSON worlds file.
//!
//! A worlds file maps each world name to `[[height, width], [[x, y, code], ...]]`.
//! Triples are addressed column first (`x` is the column, `y` the row) and
//! cells not listed are empty.

use belief_core::{Coord, GridShape};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

use crate::error::SimError;

/// Initial content of one cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CellCode {
    #[default]
    Empty,
    Particle,
    Rock,
    Visible,
}

impl CellCode {
    pub fn from_code(code: u64) -> Option<Self> {
        match code {
            0 => Some(CellCode::Empty),
            1 => Some(CellCode::Particle),
            2 => Some(CellCode::Rock),
            3 => Some(CellCode::Visible),
            _ => None,
        }
    }

    pub fn code(self) -> u64 {
        match self {
            CellCode::Empty => 0,
            CellCode::Particle => 1,
            CellCode::Rock => 2,
            CellCode::Visible => 3,
        }
    }
}

/// On-disk form of a single world.
type RawWorld = ([usize; 2], Vec<[u64; 3]>);

/// A decoded world: its shape and one code per cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorldLayout {
    pub name: String,
    pub shape: GridShape,

    /// Cell codes, row-major
    codes: Vec<CellCode>,
}

impl WorldLayout {
    /// An all-empty layout.
    pub fn empty(name: &str, shape: GridShape) -> Self {
        Self {
            name: name.to_string(),
            shape,
            codes: vec![CellCode::Empty; shape.len()],
        }
    }

    /// Sets the code of one cell; later writes win.
    pub fn with_cell(mut self, cell: Coord, code: CellCode) -> Self {
        if self.shape.contains(cell) {
            let index = cell.row * self.shape.width + cell.col;
            self.codes[index] = code;
        }
        self
    }

    pub fn code_at(&self, cell: Coord) -> CellCode {
        if self.shape.contains(cell) {
            self.codes[cell.row * self.shape.width + cell.col]
        } else {
            CellCode::Empty
        }
    }

    /// Reads world `name` from the worlds file at `path`.
    pub fn load(path: impl AsRef<Path>, name: &str) -> Result<Self, SimError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json(&raw, name)
    }

    /// Reads every world in the worlds file at `path`, sorted by name.
    pub fn load_all(path: impl AsRef<Path>) -> Result<Vec<Self>, SimError> {
        let raw = std::fs::read_to_string(path)?;
        Self::world_names(&raw)?
            .iter()
            .map(|name| Self::from_json(&raw, name))
            .collect()
    }

    /// Decodes world `name` from worlds-file JSON.
    pub fn from_json(json: &str, name: &str) -> Result<Self, SimError> {
        let mut worlds: BTreeMap<String, RawWorld> = serde_json::from_str(json)?;
        let ([height, width], triples) = worlds
            .remove(name)
            .ok_or_else(|| SimError::UnknownWorld(name.to_string()))?;

        if height == 0 || width == 0 {
            return Err(SimError::EmptyLayout(name.to_string()));
        }

        let mut layout = Self::empty(name, GridShape::new(height, width));
        for [x, y, code] in triples {
            let cell = match (usize::try_from(y), usize::try_from(x)) {
                (Ok(row), Ok(col)) if row < height && col < width => Coord::new(row, col),
                _ => return Err(SimError::LayoutOutOfBounds { x, y, height, width }),
            };
            let code = CellCode::from_code(code).ok_or(SimError::InvalidCellCode { x, y, code })?;
            layout = layout.with_cell(cell, code);
        }
        Ok(layout)
    }

    /// Names of every world in worlds-file JSON, sorted.
    pub fn world_names(json: &str) -> Result<Vec<String>, SimError> {
        let worlds: BTreeMap<String, serde_json::Value> = serde_json::from_str(json)?;
        Ok(worlds.into_keys().collect())
    }
}
