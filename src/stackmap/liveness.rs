//! Program-counter ordered liveness histories
//!
//! A [`LivenessStream`] is what the scan of one function's instructions
//! yields: for each annotated program point, the bitmap of live slots (or
//! `None` for a region where no map applies). The transforms here never
//! persist anything; they feed the histograms and size models.

use crate::entropy::FrequencyTable;
use crate::error::{Result, StackMapError};
use crate::stackmap::{Bitmap, BitmapTable};

/// One annotated program point
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LivePoint {
    /// Offset of the instruction from the function entry
    pub pc: u64,
    /// Live slots from this point on; `None` marks a dead region
    pub bitmap: Option<Bitmap>,
}

impl LivePoint {
    /// Point with a live map
    pub fn live(pc: u64, bitmap: Bitmap) -> Self {
        Self {
            pc,
            bitmap: Some(bitmap),
        }
    }

    /// Point with no live map
    pub fn dead(pc: u64) -> Self {
        Self { pc, bitmap: None }
    }
}

/// `(pc delta, bitmap delta)` step of a [`LivenessStream`].
///
/// The bitmap delta is the xor against the previous live bitmap; `None`
/// passes the dead-region sentinel through.
pub type LivenessDelta = (u64, Option<Bitmap>);

/// Ordered liveness history of one function.
///
/// PCs are non-decreasing; several points may share a pc.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LivenessStream {
    points: Vec<LivePoint>,
}

impl LivenessStream {
    /// Create an empty stream
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a stream from points, checking pc order
    pub fn from_points(points: Vec<LivePoint>) -> Result<Self> {
        let mut stream = Self::new();
        for point in points {
            stream.push(point)?;
        }
        Ok(stream)
    }

    /// Append a point; its pc must not precede the last one
    pub fn push(&mut self, point: LivePoint) -> Result<()> {
        if let Some(last) = self.points.last() {
            if point.pc < last.pc {
                return Err(StackMapError::malformed(format!(
                    "liveness point at pc {:#x} precedes previous point at {:#x}",
                    point.pc, last.pc
                )));
            }
        }
        self.points.push(point);
        Ok(())
    }

    /// Number of points
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// True if there are no points
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// All points in pc order
    pub fn points(&self) -> &[LivePoint] {
        &self.points
    }

    /// Lazily walk the stream as `(pc delta, bitmap delta)` pairs.
    ///
    /// Starts from pc 0 and the empty bitmap. A dead point yields a `None`
    /// delta and resets the tracked bitmap, so liveness after a dead region
    /// is measured against nothing.
    pub fn iter_deltas(&self) -> DeltaIter<'_> {
        DeltaIter {
            points: self.points.iter(),
            prev_pc: 0,
            prev_bitmap: Bitmap::new(),
        }
    }

    /// Keep only points where some slot becomes newly live.
    ///
    /// A live point survives when it sets a bit absent from the last kept
    /// live bitmap. Dead points always survive and reset the comparison
    /// base to the empty bitmap.
    pub fn filter_live_to_dead(&self) -> LivenessStream {
        let mut kept = Vec::with_capacity(self.points.len());
        let mut prev = Bitmap::new();
        for point in &self.points {
            match &point.bitmap {
                None => {
                    kept.push(point.clone());
                    prev = Bitmap::new();
                }
                Some(bitmap) => {
                    if !bitmap.is_subset_of(&prev) {
                        kept.push(point.clone());
                        prev = bitmap.clone();
                    }
                }
            }
        }
        LivenessStream { points: kept }
    }

    /// Add this stream's deltas to the pc-delta and bitmap-delta histograms
    pub fn count_deltas(
        &self,
        pc_deltas: &mut FrequencyTable<u64>,
        bitmap_deltas: &mut FrequencyTable<Option<Bitmap>>,
    ) {
        for (pc_delta, bitmap_delta) in self.iter_deltas() {
            pc_deltas.record(pc_delta);
            bitmap_deltas.record(bitmap_delta);
        }
    }

    /// Distinct live bitmaps with their counts, most frequent first.
    ///
    /// Ties keep the order in which the bitmaps first appear in the stream.
    pub fn bitmaps_by_frequency(&self) -> Vec<(Bitmap, u64)> {
        let mut first_seen = BitmapTable::new();
        let mut counts: Vec<u64> = Vec::new();
        for bitmap in self.points.iter().filter_map(|p| p.bitmap.as_ref()) {
            let index = first_seen.add(bitmap.clone());
            if index == counts.len() {
                counts.push(0);
            }
            counts[index] += 1;
        }

        let mut ranked: Vec<(Bitmap, u64)> =
            first_seen.bitmaps().iter().cloned().zip(counts).collect();
        // Stable: equal counts stay in first-occurrence order
        ranked.sort_by(|a, b| b.1.cmp(&a.1));
        ranked
    }

    /// Add this stream's live bitmaps to `maps`
    pub fn count_maps(&self, maps: &mut FrequencyTable<Bitmap>) {
        for bitmap in self.points.iter().filter_map(|p| p.bitmap.as_ref()) {
            maps.record(bitmap.clone());
        }
    }
}

/// Iterator returned by [`LivenessStream::iter_deltas`]
#[derive(Debug, Clone)]
pub struct DeltaIter<'a> {
    points: std::slice::Iter<'a, LivePoint>,
    prev_pc: u64,
    prev_bitmap: Bitmap,
}

impl<'a> Iterator for DeltaIter<'a> {
    type Item = LivenessDelta;

    fn next(&mut self) -> Option<Self::Item> {
        let point = self.points.next()?;
        let pc_delta = point.pc - self.prev_pc;
        self.prev_pc = point.pc;

        let bitmap_delta = match &point.bitmap {
            None => {
                self.prev_bitmap = Bitmap::new();
                None
            }
            Some(bitmap) => {
                let delta = bitmap.xor(&self.prev_bitmap);
                self.prev_bitmap = bitmap.clone();
                Some(delta)
            }
        };
        Some((pc_delta, bitmap_delta))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.points.size_hint()
    }
}

impl<'a> ExactSizeIterator for DeltaIter<'a> {}
