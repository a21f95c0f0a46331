//! Glue wave comparison.
//!
//! This program reads two Glue files and prints, for every signal of
//! the first file's hardware group, the duty cycle in each file and
//! whether they agree bit for bit.
//!
//! With `--diff`, it also prints the named signals of both files and
//! where they differ.

use gluewave::GlueConverter;
use ciborium::into_writer;
use std::fs::File;
use itertools::Itertools;

#[derive(clap::Parser, Debug)]
struct GlueCmpArgs {
    /// The IOSpec file path
    iospec: String,
    /// The glue file 1
    glue1: String,
    /// The glue file 2
    glue2: String,
    /// Comma-separated signals to diff.
    #[clap(long)]
    diff: Option<String>,
    /// The optional report output path (CBOR).
    #[clap(long)]
    report: Option<String>,
}

fn trace_str(t: &[bool]) -> String {
    t.iter().map(|&b| if b { '1' } else { '0' }).collect()
}

fn main() {
    clilog::init_stderr_color_debug();
    let args = <GlueCmpArgs as clap::Parser>::parse();
    clilog::info!("args: {:?}", args);
    let gc = GlueConverter::from_iospec_file(&args.iospec).unwrap();
    let (Some(wave1), Some(wave2)) = (
        gc.read_glue(&args.glue1), gc.read_glue(&args.glue2)
    ) else {
        clilog::error!("cannot compare without both glue files");
        std::process::exit(1);
    };

    let report = gc.compare(&wave1, &wave2);
    print!("{}", report);
    if let Some(path) = &args.report {
        into_writer(&report, File::create(path).unwrap()).unwrap();
    }

    if let Some(diff) = &args.diff {
        let names = diff.split(',').map(|s| s.trim()).collect_vec();
        for d in gc.diff(&wave1, &wave2, &names).unwrap() {
            println!("{}(1)    \t{}", d.name, trace_str(&d.first));
            println!("{}(2)    \t{}", d.name, trace_str(&d.second));
            println!("diff({})\t{}", d.name, trace_str(&d.xor));
        }
    }
}
