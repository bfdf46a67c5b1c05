//! Compression experiment harness
//!
//! Every [`EncodingScheme`] is a pure function from the same intermediate
//! form (one [`LivenessStream`] per function) to a [`SizeReport`]. Table
//! sharing across functions goes through a [`TableArena`] created fresh for
//! each run, so schemes never see each other's state.
//!
//! ```rust
//! use stackmap_compress::config::ExperimentConfig;
//! use stackmap_compress::experiment::{run_scheme, EncodingScheme, FunctionLiveness};
//! use stackmap_compress::stackmap::{Bitmap, LivePoint, LivenessStream};
//! # fn main() -> stackmap_compress::Result<()> {
//! let stream = LivenessStream::from_points(vec![
//!     LivePoint::live(0, Bitmap::from(0b01u64)),
//!     LivePoint::live(4, Bitmap::from(0b11u64)),
//! ])?;
//! let functions = vec![FunctionLiveness::new("main.main", stream)];
//! let config = ExperimentConfig::default();
//! let report = run_scheme(&functions, EncodingScheme::Deduplicated, &config)?;
//! assert_eq!(report.total(), 10 + 5 + 12);
//! # Ok(())
//! # }
//! ```

pub mod arena;
pub mod report;
pub mod scheme;

pub use arena::{TableArena, TableId};
pub use report::{SchemeReport, SizeReport, EXTRA_BYTES, PCDATA_BYTES, TABLE_BYTES};
pub use scheme::{BitmapOrder, EncodingScheme};

use crate::config::{Config, ExperimentConfig};
use crate::entropy::{bits_to_bytes, CodeTable, FrequencyTable, GolombRice, HuffmanBuilder};
use crate::error::Result;
use crate::stackmap::{Bitmap, BitmapTable, Function, LivenessStream, PcData, TableLayout};

/// Per-function overhead of the table-free delta scheme: one pcdata offset
pub const DELTA_EXTRA_BYTES: u64 = 4;

/// Liveness history of one named function
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionLiveness {
    /// Symbol name
    pub name: String,
    /// Annotated program points
    pub stream: LivenessStream,
}

impl FunctionLiveness {
    /// Pair a name with its stream
    pub fn new(name: impl Into<String>, stream: LivenessStream) -> Self {
        Self {
            name: name.into(),
            stream,
        }
    }

    /// Scan `function`'s markers
    pub fn from_function(function: &Function) -> Result<Self> {
        Ok(Self::new(function.name.clone(), function.liveness()?))
    }
}

/// A function's table and the pcdata indexing into it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreparedFunction {
    /// Distinct bitmaps in index order
    pub table: BitmapTable,
    /// Records referencing `table`
    pub pcdata: PcData,
}

impl PreparedFunction {
    /// Build the table and pcdata for `stream`, assigning indices in `order`
    pub fn build(stream: &LivenessStream, order: BitmapOrder) -> Result<Self> {
        let mut table = BitmapTable::new();
        if order == BitmapOrder::Frequency {
            for (bitmap, _) in stream.bitmaps_by_frequency() {
                table.add(bitmap);
            }
        }

        let mut pcdata = PcData::build(stream, &mut table);
        if order == BitmapOrder::Value {
            let remap = table.sort();
            pcdata.remap(&remap)?;
        }
        Ok(Self { table, pcdata })
    }
}

/// Every function prepared, with its encoded table interned in one arena
#[derive(Debug, Clone)]
pub struct PreparedProgram {
    functions: Vec<PreparedFunction>,
    tables: Vec<TableId>,
    arena: TableArena,
}

impl PreparedProgram {
    /// Build each function's table and pcdata, encoding tables in `layout`
    pub fn prepare(
        functions: &[FunctionLiveness],
        layout: TableLayout,
        order: BitmapOrder,
    ) -> Result<Self> {
        let mut arena = TableArena::new();
        let mut prepared = Vec::with_capacity(functions.len());
        let mut tables = Vec::with_capacity(functions.len());
        for f in functions {
            let p = PreparedFunction::build(&f.stream, order)?;
            let (id, inserted) = arena.intern(&p.table.encode(layout)?, &f.name);
            if !inserted {
                log::debug!(
                    "{}: shares table {} owned by {}",
                    f.name,
                    id.index(),
                    arena.owner(id).unwrap_or_default()
                );
            }
            prepared.push(p);
            tables.push(id);
        }
        log::debug!(
            "{} functions, {} distinct tables, {} shared",
            functions.len(),
            arena.len(),
            arena.hits()
        );
        Ok(Self {
            functions: prepared,
            tables,
            arena,
        })
    }

    /// Prepared functions in input order
    pub fn functions(&self) -> &[PreparedFunction] {
        &self.functions
    }

    /// Table id of the function at `index`
    pub fn table_id(&self, index: usize) -> Option<TableId> {
        self.tables.get(index).copied()
    }

    /// Canonical encoded table of the function at `index`
    pub fn table_bytes(&self, index: usize) -> Option<&[u8]> {
        self.table_id(index).and_then(|id| self.arena.get(id))
    }

    /// Name of the function whose table the one at `index` resolves to
    pub fn table_owner(&self, index: usize) -> Option<&str> {
        self.table_id(index).and_then(|id| self.arena.owner(id))
    }

    /// Distinct tables
    pub fn arena(&self) -> &TableArena {
        &self.arena
    }

    /// Table bytes with every function carrying its own copy
    pub fn expanded_table_bytes(&self) -> u64 {
        self.tables
            .iter()
            .filter_map(|&id| self.arena.get(id))
            .map(|t| t.len() as u64)
            .sum()
    }
}

/// Bitmap occurrence counts across all functions
pub fn count_maps(functions: &[FunctionLiveness]) -> FrequencyTable<Bitmap> {
    let mut maps = FrequencyTable::new();
    for f in functions {
        f.stream.count_maps(&mut maps);
    }
    maps
}

/// pc-delta and bitmap-delta histograms across all functions
pub fn count_deltas(
    functions: &[FunctionLiveness],
) -> (FrequencyTable<u64>, FrequencyTable<Option<Bitmap>>) {
    let mut pc_deltas = FrequencyTable::new();
    let mut bitmap_deltas = FrequencyTable::new();
    for f in functions {
        f.stream.count_deltas(&mut pc_deltas, &mut bitmap_deltas);
    }
    (pc_deltas, bitmap_deltas)
}

/// Measure `functions` under one scheme
pub fn run_scheme(
    functions: &[FunctionLiveness],
    scheme: EncodingScheme,
    config: &ExperimentConfig,
) -> Result<SizeReport> {
    scheme.validate()?;
    let report = match scheme {
        EncodingScheme::DeltaHuffman { stream_align } => delta_huffman(functions, stream_align)?,
        _ => with_tables(functions, scheme, config)?,
    };
    log::info!("{}: {}", scheme, report);
    Ok(report)
}

/// Measure `functions` under every configured scheme, in order
pub fn run_all(
    functions: &[FunctionLiveness],
    config: &ExperimentConfig,
) -> Result<Vec<SchemeReport>> {
    config.validate()?;
    config
        .schemes
        .iter()
        .map(|&scheme| -> Result<SchemeReport> {
            Ok(SchemeReport {
                scheme: scheme.to_string(),
                sizes: run_scheme(functions, scheme, config)?,
            })
        })
        .collect()
}

fn with_tables(
    functions: &[FunctionLiveness],
    scheme: EncodingScheme,
    config: &ExperimentConfig,
) -> Result<SizeReport> {
    let layout = match scheme {
        EncodingScheme::Expanded => TableLayout::Expanded,
        EncodingScheme::Compact => TableLayout::Compact,
        _ => config.layout,
    };

    let program = PreparedProgram::prepare(functions, layout, config.bitmap_order)?;
    let table_bytes = if scheme.deduplicates() {
        program.arena().stored_bytes() as u64
    } else {
        program.expanded_table_bytes()
    };
    let prepared = program.functions();

    let pcdata_bytes = match scheme {
        EncodingScheme::Huffman { stream_align } => huffman_pcdata(prepared, stream_align)?,
        EncodingScheme::GolombRice { n } => golomb_rice_pcdata(prepared, n)?,
        _ => {
            let mut bytes = 0u64;
            for p in prepared {
                bytes += p.pcdata.encode()?.len() as u64;
            }
            bytes
        }
    };

    let extra = config.extra_bytes_per_function * functions.len() as u64;
    Ok(SizeReport::with_segments(table_bytes, pcdata_bytes, extra))
}

fn pc_delta_code(prepared: &[PreparedFunction], builder: HuffmanBuilder) -> Result<CodeTable<u64>> {
    let mut hist = FrequencyTable::new();
    for p in prepared {
        p.pcdata.count_pc_deltas(&mut hist);
    }
    builder.build(&hist)
}

fn huffman_pcdata(prepared: &[PreparedFunction], stream_align: u32) -> Result<u64> {
    let builder = HuffmanBuilder::new(stream_align)?;
    let pc_code = pc_delta_code(prepared, builder)?;
    let mut index_hist = FrequencyTable::new();
    for p in prepared {
        p.pcdata.count_indices(&mut index_hist);
    }
    let index_code = builder.build(&index_hist)?;

    let mut bytes = 0u64;
    for p in prepared {
        let mut bits = 0u64;
        for (record, (pc_delta, _)) in p.pcdata.records().iter().zip(p.pcdata.deltas()) {
            bits += pc_code.require_len(&pc_delta)? as u64;
            bits += index_code.require_len(&record.value())? as u64;
        }
        bytes += bits_to_bytes(bits);
    }
    Ok(bytes)
}

fn golomb_rice_pcdata(prepared: &[PreparedFunction], n: u32) -> Result<u64> {
    let pc_code = pc_delta_code(prepared, HuffmanBuilder::binary())?;
    let model = GolombRice::new(n)?;

    let mut bytes = 0u64;
    for p in prepared {
        let mut bits = 0u64;
        for (record, (pc_delta, _)) in p.pcdata.records().iter().zip(p.pcdata.deltas()) {
            bits += pc_code.require_len(&pc_delta)? as u64;
            bits += model.cost_offset(record.value())?;
        }
        bytes += bits_to_bytes(bits);
    }
    Ok(bytes)
}

fn delta_huffman(functions: &[FunctionLiveness], stream_align: u32) -> Result<SizeReport> {
    let builder = HuffmanBuilder::new(stream_align)?;
    let (pc_hist, bitmap_hist) = count_deltas(functions);
    let pc_code = builder.build(&pc_hist)?;
    let bitmap_code = builder.build(&bitmap_hist)?;
    log::debug!(
        "delta codes: {} pc symbols (max {} bits), {} bitmap symbols (max {} bits)",
        pc_code.len(),
        pc_code.max_code_len(),
        bitmap_code.len(),
        bitmap_code.max_code_len()
    );

    let mut bits = 0u64;
    for f in functions {
        for (pc_delta, bitmap_delta) in f.stream.iter_deltas() {
            bits += pc_code.require_len(&pc_delta)? as u64;
            bits += bitmap_code.require_len(&bitmap_delta)? as u64;
        }
        // Each function's pcdata starts on a byte boundary.
        bits = bits_to_bytes(bits) * 8;
    }

    Ok(SizeReport::with_segments(
        0,
        bits_to_bytes(bits),
        DELTA_EXTRA_BYTES * functions.len() as u64,
    ))
}

/// A set of functions measured under one configuration
#[derive(Debug, Clone)]
pub struct Experiment {
    functions: Vec<FunctionLiveness>,
    config: ExperimentConfig,
}

impl Experiment {
    /// Validate `config` and apply its stream filter to `functions`
    pub fn new(functions: Vec<FunctionLiveness>, config: ExperimentConfig) -> Result<Self> {
        config.validate()?;
        let silent = functions.iter().filter(|f| f.stream.is_empty()).count();
        if silent > 0 {
            log::warn!("{} of {} functions have no liveness annotations", silent, functions.len());
        }

        let functions = if config.filter_live_to_dead {
            let before: usize = functions.iter().map(|f| f.stream.len()).sum();
            let filtered: Vec<FunctionLiveness> = functions
                .into_iter()
                .map(|f| FunctionLiveness::new(f.name, f.stream.filter_live_to_dead()))
                .collect();
            let after: usize = filtered.iter().map(|f| f.stream.len()).sum();
            log::info!("live-to-dead filter kept {} of {} points", after, before);
            filtered
        } else {
            functions
        };
        Ok(Self { functions, config })
    }

    /// Scan every function's markers, then as [`new`](Self::new)
    pub fn from_functions(functions: &[Function], config: ExperimentConfig) -> Result<Self> {
        let liveness = functions
            .iter()
            .map(FunctionLiveness::from_function)
            .collect::<Result<Vec<_>>>()?;
        Self::new(liveness, config)
    }

    /// Functions as measured, after filtering
    pub fn functions(&self) -> &[FunctionLiveness] {
        &self.functions
    }

    /// Active configuration
    pub fn config(&self) -> &ExperimentConfig {
        &self.config
    }

    /// Measure under one scheme
    pub fn run(&self, scheme: EncodingScheme) -> Result<SizeReport> {
        run_scheme(&self.functions, scheme, &self.config)
    }

    /// Measure under every configured scheme
    pub fn run_all(&self) -> Result<Vec<SchemeReport>> {
        run_all(&self.functions, &self.config)
    }

    /// Bitmap occurrence counts
    pub fn bitmap_histogram(&self) -> FrequencyTable<Bitmap> {
        count_maps(&self.functions)
    }

    /// pc-delta and bitmap-delta histograms
    pub fn delta_histograms(&self) -> (FrequencyTable<u64>, FrequencyTable<Option<Bitmap>>) {
        count_deltas(&self.functions)
    }
}
