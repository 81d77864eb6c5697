use clap::Parser;
use hybrid_screen::{
    console::Args,
    error::HyResult,
    hybrid::{HybridOutcome, HybridScreen},
    tracer::{GeometricTracer, RayTracer},
};
use log::info;

/// number of the traced optical element
const OE_NUMBER: usize = 1;

fn main() -> HyResult<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();
    let beam = args.load_beam()?;
    let element = args.load_element()?;
    let params = args.load_parameters()?;

    let tracer = GeometricTracer;
    let traced = tracer.trace(&beam, &element, OE_NUMBER)?;
    traced.write_csv(&args.output_file("geometric.csv")?)?;

    match HybridScreen::new(&tracer).run(&traced, OE_NUMBER, &params)? {
        HybridOutcome::Corrected(result) => {
            result
                .far_field_beam()
                .write_csv(&args.output_file("hybrid_ff.csv")?)?;
            if let Some(near_field) = result.near_field_beam() {
                near_field.write_csv(&args.output_file("hybrid_nf.csv")?)?;
            }
        }
        HybridOutcome::NotNecessary { beam, reason } => {
            info!("no diffraction correction: {reason}");
            beam.write_csv(&args.output_file("hybrid_ff.csv")?)?;
        }
    }
    Ok(())
}
