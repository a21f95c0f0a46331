//! Glue wave editing.
//!
//! This program reads a Glue file, applies one edit, and writes the
//! result. It can force a signal to a constant across the whole wave,
//! or set a single bit at one timestep.

use gluewave::GlueConverter;

#[derive(clap::Subcommand, Debug)]
enum Edit {
    /// Force a signal high or low throughout the wave.
    Force {
        /// The signal name
        signal: String,
        /// The value (0 or 1)
        #[clap(value_parser = clap::value_parser!(u8).range(0..=1))]
        value: u8,
    },
    /// Set a single bit at timestep t.
    Bit {
        /// The timestep
        t: usize,
        /// The bit position
        bit_pos: u32,
        /// The value (0 or 1)
        #[clap(value_parser = clap::value_parser!(u8).range(0..=1))]
        value: u8,
    },
}

#[derive(clap::Parser, Debug)]
struct GlueEditArgs {
    /// The IOSpec file path
    iospec: String,
    /// The glue file path
    glue: String,
    /// The edited glue output path.
    output: String,
    #[clap(subcommand)]
    edit: Edit,
}

fn main() {
    clilog::init_stderr_color_debug();
    let args = <GlueEditArgs as clap::Parser>::parse();
    clilog::info!("args: {:?}", args);
    let gc = GlueConverter::from_iospec_file(&args.iospec).unwrap();
    let Some(mut wave) = gc.read_glue(&args.glue) else {
        std::process::exit(1);
    };
    match &args.edit {
        Edit::Force { signal, value } => {
            gc.force_signal(&mut wave, signal, *value == 1).unwrap();
        }
        Edit::Bit { t, bit_pos, value } => {
            wave.set_bit(*t, *bit_pos, *value == 1).unwrap();
            clilog::info!("set bit {} at time {} to {}", bit_pos, t, value);
        }
    }
    gc.write_glue(&wave, &args.output).unwrap();
}
