//! Path quantization
//!
//! Conveyor lanes are continuous paths (straight rows and cubic bezier merge
//! curves). The conveyor only ever moves tokens between discrete slots, so
//! each lane is quantized once into a table of points evenly spaced by arc
//! length.

use glam::Vec2;

/// One piece of a path, continuing from the previous end point
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Segment {
    Line { to: Vec2 },
    Cubic { c1: Vec2, c2: Vec2, to: Vec2 },
}

impl Segment {
    pub fn end(&self) -> Vec2 {
        match *self {
            Segment::Line { to } | Segment::Cubic { to, .. } => to,
        }
    }

    /// Point at parameter `t` in [0, 1], starting from `from`
    pub fn point_at(&self, from: Vec2, t: f32) -> Vec2 {
        match *self {
            Segment::Line { to } => from.lerp(to, t),
            Segment::Cubic { c1, c2, to } => {
                let u = 1.0 - t;
                from * (u * u * u) + c1 * (3.0 * u * u * t) + c2 * (3.0 * u * t * t) + to * (t * t * t)
            }
        }
    }
}

/// A chain of segments from a start point
#[derive(Debug, Clone, PartialEq)]
pub struct Path {
    start: Vec2,
    segments: Vec<Segment>,
}

impl Path {
    pub fn new(start: Vec2) -> Self {
        Self {
            start,
            segments: Vec::new(),
        }
    }

    pub fn line(from: Vec2, to: Vec2) -> Self {
        Self::new(from).line_to(to)
    }

    pub fn cubic(from: Vec2, c1: Vec2, c2: Vec2, to: Vec2) -> Self {
        Self::new(from).cubic_to(c1, c2, to)
    }

    pub fn line_to(mut self, to: Vec2) -> Self {
        self.segments.push(Segment::Line { to });
        self
    }

    pub fn cubic_to(mut self, c1: Vec2, c2: Vec2, to: Vec2) -> Self {
        self.segments.push(Segment::Cubic { c1, c2, to });
        self
    }

    pub fn start(&self) -> Vec2 {
        self.start
    }

    pub fn end(&self) -> Vec2 {
        self.segments.last().map_or(self.start, |s| s.end())
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }
}

/// Samples paths into evenly spaced point tables
#[derive(Debug, Clone, Copy)]
pub struct PathQuantizer {
    /// Chords used to approximate each curved segment's arc length
    pub curve_resolution: usize,
}

impl Default for PathQuantizer {
    fn default() -> Self {
        Self {
            curve_resolution: 256,
        }
    }
}

impl PathQuantizer {
    pub fn new(curve_resolution: usize) -> Self {
        Self {
            curve_resolution: curve_resolution.max(1),
        }
    }

    /// Dense polyline approximation with cumulative arc length per vertex
    fn arc_table(&self, path: &Path) -> Vec<(f32, Vec2)> {
        let mut table = vec![(0.0, path.start)];
        let mut from = path.start;
        let mut length = 0.0;

        for segment in &path.segments {
            let chords = match segment {
                Segment::Line { .. } => 1,
                Segment::Cubic { .. } => self.curve_resolution.max(1),
            };
            let mut prev = from;
            for i in 1..=chords {
                let p = segment.point_at(from, i as f32 / chords as f32);
                length += prev.distance(p);
                table.push((length, p));
                prev = p;
            }
            from = segment.end();
        }

        table
    }

    /// Total arc length of a path
    pub fn length(&self, path: &Path) -> f32 {
        self.arc_table(path).last().map_or(0.0, |(len, _)| *len)
    }

    /// `n` points evenly spaced by arc length, both ends included
    ///
    /// A single point is the path start. A zero-length path yields `n`
    /// copies of its start point. `n == 0` yields nothing.
    pub fn quantize(&self, path: &Path, n: usize) -> Vec<Vec2> {
        if n == 0 {
            log::warn!("Quantizing a path into zero points");
            return Vec::new();
        }
        let table = self.arc_table(path);
        let total = table.last().map_or(0.0, |(len, _)| *len);
        if n == 1 || total <= f32::EPSILON {
            return vec![path.start; n];
        }

        let mut points = Vec::with_capacity(n);
        let mut cursor = 0;
        for k in 0..n {
            let distance = total * k as f32 / (n - 1) as f32;
            // Distances are increasing, so the cursor only moves forward
            while cursor + 1 < table.len() - 1 && table[cursor + 1].0 < distance {
                cursor += 1;
            }
            let (d0, p0) = table[cursor];
            let (d1, p1) = table[cursor + 1];
            let span = d1 - d0;
            let t = if span > 0.0 {
                ((distance - d0) / span).clamp(0.0, 1.0)
            } else {
                0.0
            };
            points.push(p0.lerp(p1, t));
        }
        // Land exactly on the end despite accumulated rounding
        if let Some(last) = points.last_mut() {
            *last = path.end();
        }
        points
    }
}
