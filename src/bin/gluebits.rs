//! Clocked bitstream export.
//!
//! This program samples a data signal of a Glue file on every rising
//! edge of a clock signal (the value just before the edge) and writes
//! the bits comma-separated.

use gluewave::GlueConverter;

#[derive(clap::Parser, Debug)]
struct GlueBitsArgs {
    /// The IOSpec file path
    iospec: String,
    /// The glue file path
    glue: String,
    /// The clock signal name
    clock: String,
    /// The data signal name
    data: String,
    /// The bitstream output file path.
    output: String,
}

fn main() {
    clilog::init_stderr_color_debug();
    let args = <GlueBitsArgs as clap::Parser>::parse();
    clilog::info!("args: {:?}", args);
    let gc = GlueConverter::from_iospec_file(&args.iospec).unwrap();
    let Some(wave) = gc.read_glue(&args.glue) else {
        std::process::exit(1);
    };
    gc.export_clocked_bitstream(&wave, &args.clock, &args.data, &args.output)
        .unwrap();
}
