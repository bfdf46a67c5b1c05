//! Function records handed over by the listing parser
//!
//! A [`Function`] is an instruction stream with inline liveness annotations
//! plus the named byte blobs those annotations point at. Two markers matter:
//! a table reference naming a blob that holds an expanded-layout
//! [`BitmapTable`], and an index into the most recently referenced table.

use crate::error::{Result, StackMapError};
use crate::io::SliceDataInput;
use crate::stackmap::{BitmapTable, LivePoint, LivenessStream, TableLayout};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Liveness annotation attached to an instruction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Marker {
    /// Subsequent indices resolve against the table stored in this blob
    TableRef(String),
    /// Entry of the active table that applies from this pc on; negative means no live map
    Index(i64),
}

/// One instruction of a function's listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Instruction {
    /// Offset from the function entry
    pub pc: u64,
    /// Liveness annotation, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub marker: Option<Marker>,
}

impl Instruction {
    /// Instruction without an annotation
    pub fn plain(pc: u64) -> Self {
        Self { pc, marker: None }
    }

    /// Table reference marker
    pub fn table_ref(pc: u64, blob: impl Into<String>) -> Self {
        Self {
            pc,
            marker: Some(Marker::TableRef(blob.into())),
        }
    }

    /// Index marker
    pub fn index(pc: u64, index: i64) -> Self {
        Self {
            pc,
            marker: Some(Marker::Index(index)),
        }
    }
}

/// A compiled function as recovered from the listing
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Function {
    /// Symbol name
    pub name: String,
    /// Instructions in address order
    pub instructions: Vec<Instruction>,
    /// Data objects referenced by table markers, by symbol name
    #[serde(default)]
    pub blobs: BTreeMap<String, Vec<u8>>,
}

impl Function {
    /// Create a function with no instructions
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Append an instruction
    pub fn push(&mut self, instruction: Instruction) -> &mut Self {
        self.instructions.push(instruction);
        self
    }

    /// Register a data blob
    pub fn add_blob(&mut self, name: impl Into<String>, data: Vec<u8>) -> &mut Self {
        self.blobs.insert(name.into(), data);
        self
    }

    /// Register a blob holding `table` in the expanded layout
    pub fn add_table(&mut self, name: impl Into<String>, table: &BitmapTable) -> Result<&mut Self> {
        let data = table.encode(TableLayout::Expanded)?;
        Ok(self.add_blob(name, data))
    }

    /// Scan the markers and recover the function's liveness history.
    ///
    /// Each index marker resolves against the table named by the closest
    /// preceding table reference; references may repeat and switch tables
    /// mid-function.
    pub fn liveness(&self) -> Result<LivenessStream> {
        let mut stream = LivenessStream::new();
        let mut active: Option<(&str, BitmapTable)> = None;

        for inst in &self.instructions {
            match &inst.marker {
                None => {}
                Some(Marker::TableRef(blob)) => {
                    active = Some((blob.as_str(), self.load_table(blob)?));
                }
                Some(Marker::Index(index)) => {
                    let (blob, table) = active.as_ref().ok_or_else(|| {
                        StackMapError::malformed(format!(
                            "{}: index marker at pc {:#x} before any table reference",
                            self.name, inst.pc
                        ))
                    })?;
                    let point = if *index < 0 {
                        LivePoint::dead(inst.pc)
                    } else {
                        let bitmap = table.get(*index as usize).ok_or_else(|| {
                            StackMapError::malformed(format!(
                                "{}: index {} at pc {:#x} outside {}-entry table {}",
                                self.name,
                                index,
                                inst.pc,
                                table.len(),
                                blob
                            ))
                        })?;
                        LivePoint::live(inst.pc, bitmap.clone())
                    };
                    stream.push(point)?;
                }
            }
        }

        if stream.is_empty() {
            log::debug!("{}: no liveness annotations", self.name);
        }
        Ok(stream)
    }

    fn load_table(&self, blob: &str) -> Result<BitmapTable> {
        let data = self.blobs.get(blob).ok_or_else(|| {
            StackMapError::malformed(format!("{}: unknown table blob {}", self.name, blob))
        })?;
        // Symbol data may carry alignment padding after the table.
        BitmapTable::read_from(&mut SliceDataInput::new(data), TableLayout::Expanded)
    }
}

/// Read a JSON array of functions as dumped by the listing parser
pub fn read_functions<R: std::io::Read>(reader: R) -> Result<Vec<Function>> {
    serde_json::from_reader(reader)
        .map_err(|e| StackMapError::malformed(format!("function dump is not valid JSON: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stackmap::Bitmap;

    fn table(values: &[u64]) -> BitmapTable {
        let mut t = BitmapTable::new();
        for &v in values {
            t.add(Bitmap::from(v));
        }
        t
    }

    #[test]
    fn test_ref_index_index_ref_index() {
        let mut f = Function::new("main.f");
        f.add_table("t1", &table(&[0b01, 0b11])).unwrap();
        f.add_table("t2", &table(&[0b100])).unwrap();
        f.push(Instruction::table_ref(0, "t1"))
            .push(Instruction::index(0, 1))
            .push(Instruction::plain(2))
            .push(Instruction::index(4, 0))
            .push(Instruction::table_ref(6, "t2"))
            .push(Instruction::index(8, 0));

        let stream = f.liveness().unwrap();
        let points: Vec<(u64, u64)> = stream
            .points()
            .iter()
            .map(|p| (p.pc, p.bitmap.as_ref().unwrap().to_u64().unwrap()))
            .collect();
        assert_eq!(points, vec![(0, 0b11), (4, 0b01), (8, 0b100)]);
    }

    #[test]
    fn test_negative_index_is_dead() {
        let mut f = Function::new("g");
        f.add_table("t", &table(&[1])).unwrap();
        f.push(Instruction::table_ref(0, "t"))
            .push(Instruction::index(0, 0))
            .push(Instruction::index(4, -1));
        let stream = f.liveness().unwrap();
        assert_eq!(stream.points()[1], LivePoint::dead(4));
    }

    #[test]
    fn test_index_before_table_is_malformed() {
        let mut f = Function::new("h");
        f.push(Instruction::index(0, 0));
        let err = f.liveness().unwrap_err();
        assert_eq!(err.category(), "malformed");
        assert!(format!("{}", err).contains("before any table reference"));
    }

    #[test]
    fn test_bad_references() {
        let mut f = Function::new("k");
        f.push(Instruction::table_ref(0, "missing"));
        assert!(f.liveness().is_err());

        let mut f = Function::new("k");
        f.add_table("t", &table(&[1, 2])).unwrap();
        f.push(Instruction::table_ref(0, "t")).push(Instruction::index(0, 2));
        assert!(f.liveness().is_err());

        let mut f = Function::new("k");
        f.add_blob("t", vec![1, 0, 0]);
        f.push(Instruction::table_ref(0, "t"));
        assert!(f.liveness().is_err());
    }

    #[test]
    fn test_padded_blob_accepted() {
        let mut data = table(&[5]).encode(TableLayout::Expanded).unwrap();
        data.extend_from_slice(&[0, 0, 0]);
        let mut f = Function::new("p");
        f.add_blob("t", data);
        f.push(Instruction::table_ref(0, "t")).push(Instruction::index(2, 0));
        assert_eq!(f.liveness().unwrap().len(), 1);
    }

    #[test]
    fn test_no_annotations() {
        let mut f = Function::new("leaf");
        f.push(Instruction::plain(0)).push(Instruction::plain(4));
        assert!(f.liveness().unwrap().is_empty());
    }

    #[test]
    fn test_json_shape() {
        let json = r#"{
            "name": "main.main",
            "instructions": [
                {"pc": 0, "marker": {"TableRef": "gclocals.1"}},
                {"pc": 0, "marker": {"Index": 0}},
                {"pc": 3}
            ],
            "blobs": {"gclocals.1": [1, 0, 0, 0, 3, 0, 0, 0, 5]}
        }"#;
        let f: Function = serde_json::from_str(json).unwrap();
        let stream = f.liveness().unwrap();
        assert_eq!(stream.points()[0].bitmap, Some(Bitmap::from(5u64)));

        let list = format!("[{}]", json);
        let functions = read_functions(list.as_bytes()).unwrap();
        assert_eq!(functions, vec![f]);
        assert!(read_functions(&b"{\"name\": 1}"[..]).is_err());
    }
}
