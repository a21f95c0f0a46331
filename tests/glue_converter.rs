//! File-level workflows of the converter.

use gluewave::*;
use std::fs;
use tempfile::TempDir;

const IOSPEC: &str = "\
// test iospec
HARDWARE PXI1Slot5/NI6583/se_io BEGIN
A,I,0
B,I,1
C,I,2
END
";

const ASCII: &str = "A:\t01010101\nB:\t11000011\nC:\t00011111\n";

const VECTOR: [u64; 8] = [2, 3, 0, 5, 4, 5, 6, 7];

fn bits(v: &[u8]) -> Vec<bool> {
    v.iter().map(|b| *b == 1).collect()
}

fn setup() -> (TempDir, GlueConverter) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("test_iospec.txt");
    fs::write(&path, IOSPEC).unwrap();
    let gc = GlueConverter::from_iospec_file(&path).unwrap();
    (dir, gc)
}

fn example_wave(gc: &GlueConverter) -> GlueWave {
    let a = bits(&[0, 1, 0, 1, 0, 1, 0, 1]);
    let b = bits(&[1, 1, 0, 0, 0, 0, 1, 1]);
    let c = bits(&[0, 0, 0, 1, 1, 1, 1, 1]);
    gc.dict2glue([("A", &a[..]), ("B", &b[..]), ("C", &c[..])], 5000.0)
        .unwrap()
}

#[test]
fn dict2glue_vector() {
    let (_dir, gc) = setup();
    assert_eq!(example_wave(&gc).vector, VECTOR);
}

#[test]
fn readback() {
    let (dir, gc) = setup();
    let wave = example_wave(&gc);
    let path = dir.path().join("test.glue");
    gc.write_glue(&wave, &path).unwrap();
    assert_eq!(fs::read_to_string(&path).unwrap(),
               "2,3,0,5,4,5,6,7\n\
                //STROBE_PICOSECONDS:5000.0\n\
                //HARDWARE:PXI1Slot5/NI6583/se_io\n");
    assert_eq!(gc.read_glue(&path), Some(wave));
}

#[test]
fn ascii_file_to_glue() {
    let (dir, gc) = setup();
    let path = dir.path().join("test_ascii.txt");
    fs::write(&path, ASCII).unwrap();
    let wave = gc.ascii2glue_file(&path, 1, 5000.0).unwrap();
    assert_eq!(wave, example_wave(&gc));
}

#[test]
fn glue_to_ascii_file() {
    let (dir, gc) = setup();
    let path = dir.path().join("genpattern.txt");
    gc.glue2ascii(&example_wave(&gc)).write(&path).unwrap();
    assert_eq!(fs::read_to_string(&path).unwrap(), ASCII);
}

#[test]
fn bitstreams() {
    let (dir, gc) = setup();
    let wave = example_wave(&gc);
    assert_eq!(gc.get_bitstream(&wave, "B").unwrap(),
               bits(&[1, 1, 0, 0, 0, 0, 1, 1]));
    assert_eq!(gc.get_clocked_bitstream(&wave, "A", "B").unwrap(),
               bits(&[1, 0, 0, 1]));
    let path = dir.path().join("bits.txt");
    gc.export_clocked_bitstream(&wave, "A", "B", &path).unwrap();
    assert_eq!(fs::read_to_string(&path).unwrap(), "1,0,0,1");
}

#[test]
fn set_bit_sequence() {
    let (_dir, gc) = setup();
    let mut wave = example_wave(&gc);
    wave.set_bit(4, 0, true).unwrap();
    wave.set_bit(5, 0, false).unwrap();
    assert_eq!(wave.vector, [2, 3, 0, 5, 5, 4, 6, 7]);
}

#[test]
fn compare_self() {
    let (_dir, gc) = setup();
    let wave = example_wave(&gc);
    let report = gc.compare(&wave, &wave);
    assert_eq!(report.signals.len(), 3);
    assert!(report.signals.iter().all(|s| s.passthrough));

    let mut buf = Vec::new();
    ciborium::into_writer(&report, &mut buf).unwrap();
    let back: CompareReport = ciborium::from_reader(&buf[..]).unwrap();
    assert_eq!(back, report);
}

#[test]
fn bad_files_yield_none() {
    let (dir, gc) = setup();
    assert_eq!(gc.read_glue(dir.path().join("missing.glue")), None);
    let bad = dir.path().join("bad.glue");
    fs::write(&bad, "1,2,three\n//STROBE_PICOSECONDS:1.0\n").unwrap();
    assert_eq!(gc.read_glue(&bad), None);
    let empty = dir.path().join("empty.glue");
    fs::write(&empty, "").unwrap();
    assert_eq!(gc.read_glue(&empty), None);
}

#[test]
fn missing_strobe_is_not_written_back() {
    let (dir, gc) = setup();
    let path = dir.path().join("nostrobe.glue");
    fs::write(&path, "1,@,2\n//HARDWARE:PXI1Slot5/NI6583/se_io\n").unwrap();
    let wave = gc.read_glue(&path).unwrap();
    let out = dir.path().join("out.glue");
    assert!(matches!(gc.write_glue(&wave, &out),
                     Err(GlueError::InvalidStrobe(_))));
    assert!(!out.exists());
}

#[test]
fn write_waves_reports_progress() {
    let (dir, gc) = setup();
    let mut wave = example_wave(&gc);
    wave.vector = vec![1; 25000];
    let hw = wave.hardware.clone().unwrap();
    let waves: indexmap::IndexMap<_, _> = [(hw, wave)].into_iter().collect();
    let tag = dir.path().join("long");
    let mut calls = Vec::new();
    let written = gc.write_waves_with_progress(
        &waves, tag.to_str().unwrap(),
        |h, done, total| calls.push((h.innermost().to_string(), done, total))
    ).unwrap();
    assert_eq!(calls.last(), Some(&("se_io".to_string(), 25000, 25000)));
    let back = gc.read_glue(&written[0]).unwrap();
    assert_eq!(back.vector.len(), 25000);
}

const VCD: &str = "\
$timescale 1ns $end
$scope module tb $end
$var wire 1 ! A $end
$var wire 1 \" B $end
$var wire 2 # bus $end
$upscope $end
$enddefinitions $end
#0
$dumpvars
0!
1\"
b00 #
$end
#10
1!
#20
0!
0\"
b10 #
#30
1!
#40
";

const VCD_IOSPEC: &str = "\
HARDWARE PXI1Slot5/NI6583/se_io BEGIN
A,I,0
B,I,1
bus[1],I,2
MISSING,I,3,1
END
HARDWARE PXI1Slot2/NI6583/lvds BEGIN
B_OUT,O,0
END
";

#[test]
fn vcd_to_glue_files() {
    let dir = tempfile::tempdir().unwrap();
    let gc = GlueConverter::new(IoSpec::parse(VCD_IOSPEC).unwrap());
    let trace = VcdTrace::from_bytes(VCD.as_bytes()).unwrap();
    assert_eq!(trace.timebase_ps(), 1000.0);
    assert_eq!(trace.top_scope(), Some("tb"));
    assert_eq!((trace.start_tick(), trace.end_tick()), (0, 40));

    let waves = gc.vcd2glue(&trace, &VcdImportOptions::new(10000.0)).unwrap();
    let se = &waves[0];
    assert_eq!(se.vector, [10, 11, 12, 13]);
    assert_eq!(se.metadata[VCD_TIMEBASE_KEY], "1000.0");
    assert_eq!(waves[1].vector, [0, 0, 0, 0]);

    let tag = dir.path().join("out");
    let written = gc.write_waves(&waves, tag.to_str().unwrap()).unwrap();
    assert_eq!(written.len(), 2);
    assert!(written[0].ends_with("out_se_io.glue"));
    assert!(written[1].ends_with("out_lvds.glue"));
    let back = gc.read_glue(&written[0]).unwrap();
    assert_eq!(&back, se);
    assert_eq!(back.metadata[TIMESTEPS_KEY], "4");
}
