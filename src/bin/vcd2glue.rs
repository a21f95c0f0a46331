//! VCD to Glue conversion.
//!
//! This program reads one VCD file and an IOSpec, resamples every
//! IOSpec signal onto the strobe timebase, and writes one Glue file per
//! hardware group, named `{tag}_{interface}.glue`.
//!
//! By default only inputs are converted (an input pattern). With
//! `--golden`, outputs are included too, giving the expected response.

use gluewave::{ GlueConverter, VcdImportOptions, VcdTrace };
use indexmap::IndexMap;
use indicatif::{ ProgressBar, ProgressStyle };

#[derive(clap::Parser, Debug)]
struct Vcd2GlueArgs {
    /// The IOSpec file path
    iospec: String,
    /// The input vcd file path
    vcd: String,
    /// The strobe period (in picoseconds)
    strobe_ps: f64,
    /// The output file tag.
    ///
    /// Files are written as `{tag}_{interface}.glue`.
    output_tag: String,
    /// Include outputs (golden pattern) instead of inputs only.
    #[clap(long)]
    golden: bool,
    /// The testbench scope name, if not the outermost VCD scope.
    #[clap(long)]
    tb_name: Option<String>,
    /// The VCD timebase in picoseconds, if not from `$timescale`.
    #[clap(long)]
    vcd_timebase_ps: Option<f64>,
}

fn main() {
    clilog::init_stderr_color_debug();
    let args = <Vcd2GlueArgs as clap::Parser>::parse();
    clilog::info!("args: {:?}", args);
    let gc = GlueConverter::from_iospec_file(&args.iospec).unwrap();
    let timer_load = clilog::stimer!("load vcd");
    let trace = VcdTrace::load(&args.vcd).unwrap();
    clilog::finish!(timer_load);

    let mut opts = VcdImportOptions::new(args.strobe_ps);
    opts.inputs_only = !args.golden;
    opts.tb_name = args.tb_name.clone();
    opts.vcd_timebase_ps = args.vcd_timebase_ps;
    let waves = gc.vcd2glue(&trace, &opts).unwrap();

    let bars = waves.keys().map(|hw| {
        let bar = ProgressBar::new(waves[hw].len() as u64);
        bar.set_style(ProgressStyle::default_bar()
                      .template("{msg} {bar:40} {pos}/{len}").unwrap());
        bar.set_message(hw.innermost().to_string());
        (hw.clone(), bar)
    }).collect::<IndexMap<_, _>>();
    let written = gc.write_waves_with_progress(
        &waves, &args.output_tag,
        |hw, done, _| bars[hw].set_position(done as u64)
    ).unwrap();
    for bar in bars.values() {
        bar.finish_and_clear();
    }
    clilog::info!("total of {} file(s) written", written.len());
}
