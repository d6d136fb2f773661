//! The word table rendered by the viewer: the built-in demo set, or one read
//! from a JSON file.

use super::types::{LabeledPoint, Rgb};
use std::{fs, path::Path};

#[derive(Debug, thiserror::Error)]
pub enum DatasetError {
    #[error("failed to read dataset {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed dataset: {0}")]
    Json(#[from] serde_json::Error),
}

/// An immutable, ordered list of labeled points.
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    points: Vec<LabeledPoint>,
}

impl Dataset {
    pub fn new(points: Vec<LabeledPoint>) -> Self {
        Self { points }
    }

    /// The demo table.
    ///
    /// Axes: X = scope of authority, Y = source/nature of power,
    /// Z = sentiment/connotation. The two "Apple" entries are the same word in
    /// different senses and are kept apart only by position.
    pub fn builtin() -> Self {
        let p = LabeledPoint::new;
        Self::new(vec![
            // Leadership roles
            p("King", 4.0, 4.0, 1.0, Rgb(0xffd700)),
            p("Queen", 3.8, 3.9, 1.0, Rgb(0xffd700)),
            p("President", 4.0, -2.0, 0.8, Rgb(0x007bff)),
            p("CEO", -2.0, -3.0, 0.0, Rgb(0x28a745)),
            p("Manager", -3.0, -3.5, 0.0, Rgb(0x17a2b8)),
            p("Leader", 0.0, 0.0, 2.0, Rgb(0xffffff)),
            p("Boss", -2.5, -3.2, -1.0, Rgb(0x6c757d)),
            p("Tyrant", 3.5, 3.0, -4.0, Rgb(0xdc3545)),
            // Animals and the adjectives near them
            p("Dog", -5.0, 5.0, 3.0, Rgb(0x8b4513)),
            p("Cat", -4.5, 4.5, 2.5, Rgb(0xa9a9a9)),
            p("Loyal", -5.2, 5.2, 3.5, Rgb(0x00ff00)),
            p("Fierce", -4.3, 4.3, -2.0, Rgb(0xff0000)),
            // Homonyms
            p("Apple (Fruit)", 5.0, -5.0, 2.0, Rgb(0x90ee90)),
            p("Apple (Tech)", 5.5, -5.5, 1.0, Rgb(0xd3d3d3)),
        ])
    }

    pub fn from_json_str(json: &str) -> Result<Self, DatasetError> {
        let points: Vec<LabeledPoint> = serde_json::from_str(json)?;
        Ok(Self::new(points))
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, DatasetError> {
        let path = path.as_ref();
        let json = fs::read_to_string(path).map_err(|source| DatasetError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let dataset = Self::from_json_str(&json)?;
        log::info!(
            "Loaded {} labeled points from {}",
            dataset.len(),
            path.display()
        );
        Ok(dataset)
    }

    #[inline]
    pub fn points(&self) -> &[LabeledPoint] {
        &self.points
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

impl Default for Dataset {
    fn default() -> Self {
        Self::builtin()
    }
}
