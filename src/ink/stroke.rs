//! Stroke model produced by the assembler.

use serde::Serialize;

/// Stable identifier of a stroke, unique within its collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct StrokeId(u64);

impl StrokeId {
    pub fn value(&self) -> u64 {
        self.0
    }
}

/// One normalized point. `pressure` is always within `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
    pub pressure: f32,
}

/// One pen-down to pen-up sequence of points.
///
/// Append-only while open; once closed it never changes again.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Stroke {
    id: StrokeId,
    points: Vec<Point>,
    closed: bool,
}

impl Stroke {
    fn open(id: StrokeId, first: Point) -> Self {
        Self {
            id,
            points: vec![first],
            closed: false,
        }
    }

    pub fn id(&self) -> StrokeId {
        self.id
    }

    pub fn points(&self) -> &[Point] {
        &self.points
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

/// Change notifications for observers of a [`StrokeCollection`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StrokeChange {
    /// A new open stroke was added with its first point
    Started(StrokeId),
    /// A point was appended at `index`
    Appended { id: StrokeId, index: usize },
    /// The stroke was closed
    Closed(StrokeId),
    /// Every stroke was removed
    Cleared,
}

/// Ordered collection of strokes with at most one open stroke, always last.
#[derive(Debug, Default)]
pub struct StrokeCollection {
    strokes: Vec<Stroke>,
    next_id: u64,
}

impl StrokeCollection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Stroke> {
        self.strokes.iter()
    }

    pub fn len(&self) -> usize {
        self.strokes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strokes.is_empty()
    }

    pub fn get(&self, id: StrokeId) -> Option<&Stroke> {
        self.strokes.iter().find(|stroke| stroke.id == id)
    }

    /// The stroke currently receiving points, if any.
    pub fn open_stroke(&self) -> Option<&Stroke> {
        self.strokes.last().filter(|stroke| !stroke.closed)
    }

    /// Total number of points across all strokes.
    pub fn point_count(&self) -> usize {
        self.strokes.iter().map(Stroke::len).sum()
    }

    /// Starts a new open stroke. Any stroke still open is closed first.
    pub(crate) fn begin(&mut self, first: Point) -> StrokeId {
        self.close();
        let id = StrokeId(self.next_id);
        self.next_id += 1;
        self.strokes.push(Stroke::open(id, first));
        id
    }

    /// Appends to the open stroke. Returns `None` if no stroke is open.
    pub(crate) fn append(&mut self, point: Point) -> Option<(StrokeId, usize)> {
        let stroke = self.strokes.last_mut().filter(|stroke| !stroke.closed)?;
        stroke.points.push(point);
        Some((stroke.id, stroke.points.len() - 1))
    }

    /// Closes the open stroke, if any.
    pub(crate) fn close(&mut self) -> Option<StrokeId> {
        let stroke = self.strokes.last_mut().filter(|stroke| !stroke.closed)?;
        stroke.closed = true;
        Some(stroke.id)
    }

    pub(crate) fn clear(&mut self) {
        self.strokes.clear();
    }
}

impl<'a> IntoIterator for &'a StrokeCollection {
    type Item = &'a Stroke;
    type IntoIter = std::slice::Iter<'a, Stroke>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
