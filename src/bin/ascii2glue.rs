//! ASCII wave to Glue conversion.
//!
//! This program reads a `name:\tbitstring` file and packs it into one
//! Glue file, each character lasting `--ticks-per-bit` strobes.

use gluewave::GlueConverter;

#[derive(clap::Parser, Debug)]
struct Ascii2GlueArgs {
    /// The IOSpec file path
    iospec: String,
    /// The ASCII wave file path
    ascii: String,
    /// The strobe period (in picoseconds)
    strobe_ps: f64,
    /// The Glue output file path.
    glue_output: String,
    /// Strobes per ASCII character.
    #[clap(long, default_value_t = 1)]
    ticks_per_bit: usize,
}

fn main() {
    clilog::init_stderr_color_debug();
    let args = <Ascii2GlueArgs as clap::Parser>::parse();
    clilog::info!("args: {:?}", args);
    let gc = GlueConverter::from_iospec_file(&args.iospec).unwrap();
    let wave = gc.ascii2glue_file(
        &args.ascii, args.ticks_per_bit, args.strobe_ps
    ).unwrap();
    gc.write_glue(&wave, &args.glue_output).unwrap();
    clilog::info!("wrote {} timesteps to {}", wave.len(), args.glue_output);
}
