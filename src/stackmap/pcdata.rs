//! PC-indexed liveness records
//!
//! [`PcData`] is a function's liveness history expressed as indices into its
//! [`BitmapTable`]. The byte encoding is a delta stream: for each record an
//! unsigned varint pc delta followed by a zigzag varint index delta, both
//! against the previous record (starting from pc 0, index 0), then a single
//! zero terminator byte.
//!
//! A record always takes at least two bytes, so within one stream's extent a
//! lone trailing byte can only be the terminator. A zero byte anywhere else is
//! an ordinary zero pc delta.

use crate::entropy::FrequencyTable;
use crate::error::{Result, StackMapError};
use crate::io::{DataInput, DataOutput, SliceDataInput, VarInt, VecDataOutput};
use crate::stackmap::{BitmapTable, LivenessStream};

/// Index value written for "no live map"
pub const NO_MAP: i64 = -1;

/// `(pc, table index)` pair; `index == None` marks a dead region
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LivenessRecord {
    /// Offset of the instruction from the function entry
    pub pc: u64,
    /// Table entry active from `pc` on
    pub index: Option<usize>,
}

impl LivenessRecord {
    /// Record pointing at table entry `index`
    pub fn new(pc: u64, index: usize) -> Self {
        Self {
            pc,
            index: Some(index),
        }
    }

    /// Record for a dead region
    pub fn dead(pc: u64) -> Self {
        Self { pc, index: None }
    }

    /// Index as written to the stream, [`NO_MAP`] for dead regions
    #[inline]
    pub fn value(&self) -> i64 {
        self.index.map_or(NO_MAP, |i| i as i64)
    }

    fn from_value(pc: u64, value: i64) -> Result<Self> {
        match value {
            NO_MAP => Ok(Self::dead(pc)),
            v if v >= 0 => Ok(Self::new(pc, v as usize)),
            v => Err(StackMapError::malformed(format!(
                "table index {} at pc {:#x} is below the no-map sentinel",
                v, pc
            ))),
        }
    }
}

/// PC-ordered liveness records of one function
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PcData {
    records: Vec<LivenessRecord>,
}

impl PcData {
    /// Create empty pcdata
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap existing records
    pub fn from_records(records: Vec<LivenessRecord>) -> Self {
        Self { records }
    }

    /// Index every live bitmap of `stream` through `table`
    pub fn build(stream: &LivenessStream, table: &mut BitmapTable) -> Self {
        let records = stream
            .points()
            .iter()
            .map(|point| match &point.bitmap {
                Some(bitmap) => LivenessRecord::new(point.pc, table.add(bitmap.clone())),
                None => LivenessRecord::dead(point.pc),
            })
            .collect();
        Self { records }
    }

    /// All records in pc order
    pub fn records(&self) -> &[LivenessRecord] {
        &self.records
    }

    /// Number of records
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// True if there are no records
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Rewrite every index through `remap[old] == new`
    pub fn remap(&mut self, remap: &[usize]) -> Result<()> {
        for record in &mut self.records {
            if let Some(index) = record.index {
                let new_index = remap.get(index).copied().ok_or_else(|| {
                    StackMapError::invalid_argument(format!(
                        "index {} outside {}-entry permutation",
                        index,
                        remap.len()
                    ))
                })?;
                record.index = Some(new_index);
            }
        }
        Ok(())
    }

    /// Record in effect at `pc`: the last one whose pc is not after it
    pub fn lookup(&self, pc: u64) -> Option<&LivenessRecord> {
        let end = self.records.partition_point(|r| r.pc <= pc);
        end.checked_sub(1).map(|i| &self.records[i])
    }

    /// Successive `(pc delta, index delta)` pairs as written to the stream
    pub fn deltas(&self) -> impl Iterator<Item = (u64, i64)> + '_ {
        let mut prev_pc = 0u64;
        let mut prev_value = 0i64;
        self.records.iter().map(move |record| {
            let pc_delta = record.pc.wrapping_sub(prev_pc);
            let value_delta = record.value() - prev_value;
            prev_pc = record.pc;
            prev_value = record.value();
            (pc_delta, value_delta)
        })
    }

    /// Histogram of index values ([`NO_MAP`] for dead regions)
    pub fn count_indices(&self, hist: &mut FrequencyTable<i64>) {
        for record in &self.records {
            hist.record(record.value());
        }
    }

    /// Histogram of pc deltas
    pub fn count_pc_deltas(&self, hist: &mut FrequencyTable<u64>) {
        for (pc_delta, _) in self.deltas() {
            hist.record(pc_delta);
        }
    }

    /// Write the delta stream and terminator to `out`
    pub fn write_to<O: DataOutput + ?Sized>(&self, out: &mut O) -> Result<()> {
        let mut prev_pc = 0u64;
        let mut prev_value = 0i64;
        for record in &self.records {
            let pc_delta = i64::try_from(record.pc as i128 - prev_pc as i128).map_err(|_| {
                StackMapError::invalid_argument(format!(
                    "pc delta from {:#x} to {:#x} does not fit 64 bits",
                    prev_pc, record.pc
                ))
            })?;
            out.write_var_int_checked(pc_delta)?;
            out.write_svar_int(record.value() - prev_value)?;
            prev_pc = record.pc;
            prev_value = record.value();
        }
        out.write_u8(0)
    }

    /// Encode to a byte vector
    pub fn encode(&self) -> Result<Vec<u8>> {
        let mut out = VecDataOutput::with_capacity(self.records.len() * 2 + 1);
        self.write_to(&mut out)?;
        Ok(out.into_vec())
    }

    /// Encoded size in bytes
    pub fn encoded_len(&self) -> usize {
        1 + self
            .deltas()
            .map(|(pc_delta, value_delta)| {
                VarInt::encoded_len(pc_delta) + VarInt::encoded_len(crate::io::zigzag(value_delta))
            })
            .sum::<usize>()
    }

    /// Decode exactly one stream occupying all of `data`
    pub fn decode(data: &[u8]) -> Result<Self> {
        let mut input = SliceDataInput::new(data);
        let mut records = Vec::new();
        let mut prev_pc = 0u64;
        let mut prev_value = 0i64;

        while input.remaining() > 1 {
            let pc_delta = input.read_var_int()?;
            let value_delta = input.read_svar_int()?;
            let pc = prev_pc.checked_add(pc_delta).ok_or_else(|| {
                StackMapError::malformed(format!("pc overflows after {:#x}", prev_pc))
            })?;
            let value = prev_value.checked_add(value_delta).ok_or_else(|| {
                StackMapError::malformed("table index delta overflows".to_string())
            })?;
            records.push(LivenessRecord::from_value(pc, value)?);
            prev_pc = pc;
            prev_value = value;
        }

        match input.remaining() {
            1 => match input.read_u8()? {
                0 => Ok(Self { records }),
                b => Err(StackMapError::malformed(format!(
                    "expected zero terminator, found {:#04x}",
                    b
                ))),
            },
            _ => Err(StackMapError::malformed("pcdata stream has no terminator")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stackmap::{Bitmap, LivePoint};

    fn pcdata(records: &[(u64, usize)]) -> PcData {
        PcData::from_records(records.iter().map(|&(pc, i)| LivenessRecord::new(pc, i)).collect())
    }

    #[test]
    fn test_delta_stream_scenario() {
        let data = pcdata(&[(0, 0), (5, 1), (5, 1), (12, 0)]);
        assert_eq!(
            data.deltas().collect::<Vec<_>>(),
            vec![(0, 0), (5, 1), (0, 0), (7, -1)]
        );

        let bytes = data.encode().unwrap();
        assert_eq!(bytes, vec![0, 0, 5, 2, 0, 0, 7, 1, 0]);
        assert_eq!(bytes.len(), data.encoded_len());
        assert_eq!(PcData::decode(&bytes).unwrap(), data);
    }

    #[test]
    fn test_empty_stream() {
        let data = PcData::new();
        let bytes = data.encode().unwrap();
        assert_eq!(bytes, vec![0]);
        assert_eq!(PcData::decode(&bytes).unwrap(), data);
    }

    #[test]
    fn test_missing_or_bad_terminator() {
        let bytes = pcdata(&[(3, 1)]).encode().unwrap();
        assert_eq!(bytes, vec![3, 2, 0]);

        let err = PcData::decode(&bytes[..2]).unwrap_err();
        assert_eq!(err.category(), "malformed");
        assert!(PcData::decode(&[3, 2, 9]).is_err());
        assert!(PcData::decode(&[]).is_err());
        assert!(PcData::decode(&[3, 2, 0, 0]).is_err());
    }

    #[test]
    fn test_dead_records() {
        let data = PcData::from_records(vec![
            LivenessRecord::new(0, 2),
            LivenessRecord::dead(8),
            LivenessRecord::new(16, 0),
        ]);
        assert_eq!(data.deltas().collect::<Vec<_>>(), vec![(0, 2), (8, -3), (8, 1)]);
        assert_eq!(PcData::decode(&data.encode().unwrap()).unwrap(), data);

        // An index below the sentinel cannot be produced by a valid encoder
        assert!(PcData::decode(&[0, 3, 0]).is_err());
    }

    #[test]
    fn test_backwards_pc_rejected() {
        let data = pcdata(&[(8, 0), (4, 0)]);
        let err = data.encode().unwrap_err();
        assert_eq!(err.category(), "argument");
    }

    #[test]
    fn test_multi_byte_deltas() {
        let data = pcdata(&[(200, 300), (20_000, 0), (20_000, 70)]);
        let bytes = data.encode().unwrap();
        assert_eq!(bytes.len(), data.encoded_len());
        assert_eq!(PcData::decode(&bytes).unwrap(), data);
    }

    #[test]
    fn test_build_and_remap() {
        let stream = LivenessStream::from_points(vec![
            LivePoint::live(0, Bitmap::from(0b100u64)),
            LivePoint::live(4, Bitmap::from(0b001u64)),
            LivePoint::dead(6),
            LivePoint::live(8, Bitmap::from(0b100u64)),
        ])
        .unwrap();
        let mut table = BitmapTable::new();
        let mut data = PcData::build(&stream, &mut table);
        assert_eq!(table.len(), 2);
        let indices: Vec<Option<usize>> = data.records().iter().map(|r| r.index).collect();
        assert_eq!(indices, vec![Some(0), Some(1), None, Some(0)]);

        let remap = table.sort();
        data.remap(&remap).unwrap();
        for (record, point) in data.records().iter().zip(stream.points()) {
            let resolved = record.index.map(|i| table.get(i).unwrap().clone());
            assert_eq!(resolved, point.bitmap);
        }
        assert!(data.remap(&[]).is_err());
    }

    #[test]
    fn test_lookup() {
        let data = pcdata(&[(4, 0), (10, 1), (10, 2), (20, 0)]);
        assert_eq!(data.lookup(0), None);
        assert_eq!(data.lookup(4).unwrap().index, Some(0));
        assert_eq!(data.lookup(9).unwrap().index, Some(0));
        assert_eq!(data.lookup(10).unwrap().index, Some(2));
        assert_eq!(data.lookup(1000).unwrap().index, Some(0));
    }

    #[test]
    fn test_histograms() {
        let mut data = pcdata(&[(0, 0), (4, 1), (8, 1)]);
        data.records.push(LivenessRecord::dead(12));
        let mut indices = FrequencyTable::new();
        data.count_indices(&mut indices);
        assert_eq!(indices.get(&1), 2);
        assert_eq!(indices.get(&NO_MAP), 1);

        let mut pcs = FrequencyTable::new();
        data.count_pc_deltas(&mut pcs);
        assert_eq!(pcs.get(&4), 3);
        assert_eq!(pcs.get(&0), 1);
    }
}
