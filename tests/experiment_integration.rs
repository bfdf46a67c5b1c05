//! End-to-end tests: annotated functions through marker scanning, table
//! construction, the record codec and every encoding scheme.

use stackmap_compress::config::{Config, ExperimentConfig};
use stackmap_compress::experiment::{
    run_all, run_scheme, BitmapOrder, EncodingScheme, Experiment, FunctionLiveness,
    PreparedProgram, EXTRA_BYTES, PCDATA_BYTES, TABLE_BYTES,
};
use stackmap_compress::stackmap::{
    read_functions, Bitmap, BitmapTable, Function, Instruction, LivePoint, LivenessRecord,
    LivenessStream, PcData, TableLayout,
};
use stackmap_compress::StackMapError;

fn table(values: &[u64]) -> BitmapTable {
    let mut t = BitmapTable::new();
    for &v in values {
        t.add(Bitmap::from(v));
    }
    t
}

fn points(stream: &LivenessStream) -> Vec<(u64, Option<u64>)> {
    stream
        .points()
        .iter()
        .map(|p| (p.pc, p.bitmap.as_ref().and_then(Bitmap::to_u64)))
        .collect()
}

/// Two functions sharing a table plus one with a table switch and a dead region
fn program() -> Vec<Function> {
    let shared = table(&[0b001, 0b011, 0b111]);

    let mut f1 = Function::new("pkg.f1");
    f1.add_table("gclocals.a", &shared).unwrap();
    f1.push(Instruction::table_ref(0, "gclocals.a"))
        .push(Instruction::index(0, 0))
        .push(Instruction::plain(1))
        .push(Instruction::index(6, 1))
        .push(Instruction::index(14, 2))
        .push(Instruction::index(20, 0));

    let mut f2 = Function::new("pkg.f2");
    f2.add_table("gclocals.a", &shared).unwrap();
    f2.push(Instruction::table_ref(0, "gclocals.a"))
        .push(Instruction::index(0, 0))
        .push(Instruction::index(6, 1))
        .push(Instruction::index(9, 2));

    let mut f3 = Function::new("pkg.f3");
    f3.add_table("gclocals.b", &table(&[0b1000, 0b0001])).unwrap();
    f3.add_table("gclocals.c", &table(&[0b0110])).unwrap();
    f3.push(Instruction::table_ref(0, "gclocals.b"))
        .push(Instruction::index(0, 1))
        .push(Instruction::index(4, -1))
        .push(Instruction::table_ref(7, "gclocals.c"))
        .push(Instruction::index(8, 0))
        .push(Instruction::table_ref(9, "gclocals.b"))
        .push(Instruction::index(12, 0));

    vec![f1, f2, f3]
}

#[test]
fn test_scenario_a_expanded_table() {
    let t = table(&[0b01, 0b10, 0b11]);
    assert_eq!(t.width(), 2);
    let bytes = t.encode(TableLayout::Expanded).unwrap();
    assert_eq!(bytes, vec![3, 0, 0, 0, 2, 0, 0, 0, 1, 2, 3]);
    let decoded = BitmapTable::decode(&bytes, TableLayout::Expanded).unwrap();
    let values: Vec<u64> = decoded.bitmaps().iter().filter_map(Bitmap::to_u64).collect();
    assert_eq!(values, vec![1, 2, 3]);
}

#[test]
fn test_scenario_b_live_to_dead_filter() {
    let stream = LivenessStream::from_points(vec![
        LivePoint::live(0, Bitmap::from(0b001u64)),
        LivePoint::live(4, Bitmap::from(0b011u64)),
        LivePoint::live(8, Bitmap::from(0b010u64)),
    ])
    .unwrap();
    let filtered = stream.filter_live_to_dead();
    assert_eq!(points(&filtered), vec![(0, Some(0b001)), (4, Some(0b011))]);
}

#[test]
fn test_scenario_c_pc_indexed_stream() {
    let records = vec![
        LivenessRecord::new(0, 0),
        LivenessRecord::new(5, 1),
        LivenessRecord::new(5, 1),
        LivenessRecord::new(12, 0),
    ];
    let data = PcData::from_records(records.clone());
    assert_eq!(data.deltas().collect::<Vec<_>>(), vec![(0, 0), (5, 1), (0, 0), (7, -1)]);
    let bytes = data.encode().unwrap();
    assert_eq!(bytes, vec![0x00, 0x00, 0x05, 0x02, 0x00, 0x00, 0x07, 0x01, 0x00]);
    assert_eq!(PcData::decode(&bytes).unwrap().records(), records.as_slice());
}

#[test]
fn test_marker_scanning_across_tables() {
    let functions = program();
    let f3 = FunctionLiveness::from_function(&functions[2]).unwrap();
    assert_eq!(
        points(&f3.stream),
        vec![(0, Some(0b0001)), (4, None), (8, Some(0b0110)), (12, Some(0b1000))]
    );
}

#[test]
fn test_index_before_reference_aborts_run() {
    let mut f = Function::new("broken");
    f.push(Instruction::index(0, 0));
    let err = Experiment::from_functions(&[f], ExperimentConfig::default()).unwrap_err();
    assert!(matches!(err, StackMapError::MalformedInput { .. }));
    assert!(err.is_data_error());
}

#[test]
fn test_raw_schemes_byte_counts() {
    let functions = program();
    let experiment = Experiment::from_functions(&functions, ExperimentConfig::default()).unwrap();

    // f1, f2: [1, 3, 7] at width 3 -> 8 + 3 = 11 bytes, identical
    // f3: [1, 6, 8] at width 4 -> 11 bytes, different content
    let expanded = experiment.run(EncodingScheme::Expanded).unwrap();
    assert_eq!(expanded.get(TABLE_BYTES), 33);
    let dedup = experiment.run(EncodingScheme::Deduplicated).unwrap();
    assert_eq!(dedup.get(TABLE_BYTES), 22);
    // Compact: 5 + ceil(9 / 8) and 5 + ceil(12 / 8)
    let compact = experiment.run(EncodingScheme::Compact).unwrap();
    assert_eq!(compact.get(TABLE_BYTES), 7 + 7 + 7);

    // f1: 00 00 06 02 08 02 06 03 00       -> 9
    // f2: 00 00 06 02 03 02 00             -> 7
    // f3: 00 00 04 01 04 04 04 02 00       -> 9
    assert_eq!(dedup.get(PCDATA_BYTES), 25);
    assert_eq!(expanded.get(PCDATA_BYTES), 25);
    assert_eq!(dedup.get(EXTRA_BYTES), 36);
    assert_eq!(dedup.total(), 22 + 25 + 36);
}

#[test]
fn test_shared_tables_resolve_to_first_owner() {
    let functions = program();
    let experiment = Experiment::from_functions(&functions, ExperimentConfig::default()).unwrap();
    let prepared = PreparedProgram::prepare(
        experiment.functions(),
        TableLayout::Expanded,
        BitmapOrder::Insertion,
    )
    .unwrap();

    assert_eq!(prepared.table_id(0), prepared.table_id(1));
    assert_ne!(prepared.table_id(0), prepared.table_id(2));
    assert_eq!(prepared.table_owner(0), Some("pkg.f1"));
    assert_eq!(prepared.table_owner(1), Some("pkg.f1"));
    assert_eq!(prepared.table_owner(2), Some("pkg.f3"));
    assert_eq!(prepared.table_id(3), None);

    let canonical = vec![3, 0, 0, 0, 3, 0, 0, 0, 1, 3, 7];
    assert_eq!(prepared.table_bytes(0), Some(&canonical[..]));
    assert_eq!(prepared.table_bytes(1), Some(&canonical[..]));
    assert_eq!(prepared.arena().len(), 2);
    assert_eq!(prepared.arena().stored_bytes(), 22);
    assert_eq!(prepared.expanded_table_bytes(), 33);
}

#[test]
fn test_frequency_ties_keep_stream_order_across_functions() {
    // Same bitmaps, same counts, opposite first occurrence
    let a = LivenessStream::from_points(vec![
        LivePoint::live(0, Bitmap::from(0b100u64)),
        LivePoint::live(2, Bitmap::from(0b001u64)),
    ])
    .unwrap();
    let b = LivenessStream::from_points(vec![
        LivePoint::live(0, Bitmap::from(0b001u64)),
        LivePoint::live(2, Bitmap::from(0b100u64)),
    ])
    .unwrap();
    let functions = vec![FunctionLiveness::new("pkg.a", a), FunctionLiveness::new("pkg.b", b)];

    let mut config = ExperimentConfig::default();
    config.bitmap_order = BitmapOrder::Frequency;
    let prepared =
        PreparedProgram::prepare(&functions, TableLayout::Expanded, config.bitmap_order).unwrap();
    assert_eq!(prepared.table_bytes(0), Some(&[2, 0, 0, 0, 3, 0, 0, 0, 4, 1][..]));
    assert_eq!(prepared.table_bytes(1), Some(&[2, 0, 0, 0, 3, 0, 0, 0, 1, 4][..]));
    let by_frequency = run_scheme(&functions, EncodingScheme::Deduplicated, &config).unwrap();
    assert_eq!(by_frequency.get(TABLE_BYTES), 20);

    // Sorting by value makes the two tables identical again
    config.bitmap_order = BitmapOrder::Value;
    let by_value = run_scheme(&functions, EncodingScheme::Deduplicated, &config).unwrap();
    assert_eq!(by_value.get(TABLE_BYTES), 10);
}

#[test]
fn test_run_all_follows_configured_order() {
    let functions = program();
    let experiment = Experiment::from_functions(&functions, ExperimentConfig::default()).unwrap();
    let reports = experiment.run_all().unwrap();
    let names: Vec<String> = reports.iter().map(|r| r.scheme.clone()).collect();
    let expected: Vec<String> =
        EncodingScheme::default_set().iter().map(|s| s.to_string()).collect();
    assert_eq!(names, expected);

    assert_eq!(reports[0].to_string(), "dedup: table=22 pcdata=25 extra=36 total=83");
    for report in &reports {
        assert_eq!(report.sizes.total(), report.sizes.segments().map(|(_, b)| b).sum::<u64>());
    }
}

#[test]
fn test_delta_huffman_byte_aligned() {
    let functions = program();
    let liveness: Vec<FunctionLiveness> = functions
        .iter()
        .map(FunctionLiveness::from_function)
        .collect::<Result<_, _>>()
        .unwrap();
    let config = ExperimentConfig::default();

    // With 8-bit digits every symbol costs a whole number of bytes: two per point
    let scheme = EncodingScheme::DeltaHuffman { stream_align: 8 };
    let report = run_scheme(&liveness, scheme, &config).unwrap();
    assert_eq!(report.get(TABLE_BYTES), 0);
    assert_eq!(report.get(PCDATA_BYTES), 2 * (4 + 3 + 4));
    assert_eq!(report.get(EXTRA_BYTES), 12);

    let scheme = EncodingScheme::DeltaHuffman { stream_align: 1 };
    let binary = run_scheme(&liveness, scheme, &config).unwrap();
    assert!(binary.get(PCDATA_BYTES) < report.get(PCDATA_BYTES));
}

#[test]
fn test_huffman_and_golomb_rice_estimates() {
    let functions = program();
    let experiment = Experiment::from_functions(&functions, ExperimentConfig::default()).unwrap();
    let raw = experiment.run(EncodingScheme::Deduplicated).unwrap();

    let huffman = experiment.run(EncodingScheme::Huffman { stream_align: 1 }).unwrap();
    assert_eq!(huffman.get(TABLE_BYTES), raw.get(TABLE_BYTES));
    assert!(huffman.get(PCDATA_BYTES) < raw.get(PCDATA_BYTES));

    // Bytes are rounded per function, so at least one byte each
    for n in 0..8 {
        let gr = experiment.run(EncodingScheme::GolombRice { n }).unwrap();
        assert!(gr.get(PCDATA_BYTES) >= 3, "n = {}", n);
        assert_eq!(gr.get(EXTRA_BYTES), 36);
    }
}

#[test]
fn test_bitmap_orders_keep_table_bytes_for_raw_pcdata_round_trip() {
    let functions = program();
    for order in [BitmapOrder::Insertion, BitmapOrder::Frequency, BitmapOrder::Value] {
        let config = ExperimentConfig {
            bitmap_order: order,
            ..ExperimentConfig::default()
        }
        .with_schemes(vec![EncodingScheme::Expanded]);
        let experiment = Experiment::from_functions(&functions, config).unwrap();
        let report = experiment.run(EncodingScheme::Expanded).unwrap();
        // Reordering never changes table sizes
        assert_eq!(report.get(TABLE_BYTES), 33, "{}", order);
    }
}

#[test]
fn test_compact_layout_config_applies_to_dedup() {
    let functions = program();
    let config = ExperimentConfig {
        layout: TableLayout::Compact,
        ..ExperimentConfig::default()
    };
    assert!(config.validate().is_ok());
    let experiment = Experiment::from_functions(&functions, config).unwrap();
    assert_eq!(experiment.run(EncodingScheme::Deduplicated).unwrap().get(TABLE_BYTES), 14);
}

#[test]
fn test_json_dump_end_to_end() {
    let json = serde_json::to_string(&program()).unwrap();
    let functions = read_functions(json.as_bytes()).unwrap();
    assert_eq!(functions.len(), 3);

    let config = ExperimentConfig::realtime_preset();
    let liveness: Vec<FunctionLiveness> = functions
        .iter()
        .map(FunctionLiveness::from_function)
        .collect::<Result<_, _>>()
        .unwrap();
    let reports = run_all(&liveness, &config).unwrap();
    let lines: Vec<String> = reports.iter().map(ToString::to_string).collect();
    assert_eq!(
        lines,
        vec![
            "expanded: table=33 pcdata=25 extra=36 total=94",
            "compact: table=21 pcdata=25 extra=36 total=82",
            "dedup: table=22 pcdata=25 extra=36 total=83",
        ]
    );
}
