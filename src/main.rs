//! Spiro's main application entry point.
//! Parses arguments, loads the spec and drives the tree transformation.

use log::info;
use spiro::{
    cli::{get_args, Args},
    constants::BUILD_VERSION,
    context::TemplateContext,
    error::{default_error_handler, Result},
    logger::init_logger,
    processor::{ensure_input_path, ensure_output_dir, Processor},
    renderer::MiniJinjaRenderer,
    spec::load_spec,
    version::check_version,
};

/// Main application entry point.
fn main() {
    let args = get_args();
    init_logger(args.verbose);

    if let Err(err) = run(args) {
        default_error_handler(err);
    }
}

/// Main application logic execution.
///
/// # Flow
/// 1. Validates the input, spec and output paths
/// 2. Loads and normalises the spec
/// 3. Checks the spec's minimum version against this build
/// 4. Builds the template context and renderer
/// 5. Transforms the input tree into the output directory
fn run(args: Args) -> Result<()> {
    let input = ensure_input_path(&args.input)?;
    let output_root = ensure_output_dir(&args.output_dir)?;

    let spec = load_spec(&args.spec_source())?;
    check_version(&spec, BUILD_VERSION)?;

    let context = TemplateContext::new(spec)?;
    let renderer = MiniJinjaRenderer::new(&context)?;
    Processor::new(&renderer).process(&input, &output_root)?;

    info!("Template generation completed successfully in {}.", output_root.display());
    Ok(())
}
