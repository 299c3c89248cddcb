//! Command-line interface implementation for Spiro.
//! Provides argument parsing and help text formatting using clap.

use clap::{error::ErrorKind, CommandFactory, Parser};
use std::path::PathBuf;

use crate::constants::BUILD_VERSION;
use crate::spec::{SpecFormat, SpecSource};

/// Command-line arguments structure for Spiro.
#[derive(Parser, Debug)]
#[command(
    version = BUILD_VERSION,
    about = "Spiro: render a template file or directory tree from a JSON or YAML spec",
    long_about = "Spiro renders the placeholders found in file names, directory names and \
                  '.templated' file contents using the values of a spec document. Files whose \
                  name renders to nothing are left out of the output."
)]
pub struct Args {
    /// Template file or directory
    #[arg(value_name = "INPUT")]
    pub input: PathBuf,

    /// Spec document (JSON or YAML), or '-' to read it from stdin
    #[arg(value_name = "SPEC")]
    pub spec: String,

    /// Existing directory the output is written into
    #[arg(value_name = "OUTPUT_DIR")]
    pub output_dir: PathBuf,

    /// Spec format; inferred from the file extension when omitted, JSON for stdin
    #[arg(short, long, value_enum)]
    pub format: Option<SpecFormat>,

    /// Enable verbose logging output
    #[arg(short, long)]
    pub verbose: bool,
}

impl Args {
    pub fn spec_source(&self) -> SpecSource {
        SpecSource::from_arg(&self.spec, self.format)
    }
}

/// Parses command line arguments and returns the Args structure.
///
/// # Exits
/// * With status code 1 if required arguments are missing
/// * With clap's default error handling for other argument errors
pub fn get_args() -> Args {
    match Args::try_parse() {
        Ok(args) => args,
        Err(e) => {
            if e.kind() == ErrorKind::MissingRequiredArgument {
                let _ = Args::command()
                    .help_template(
                        r#"{about-section}
{usage-heading} {usage}

{all-args}
{after-help}
"#,
                    )
                    .print_help();
                std::process::exit(1);
            } else {
                e.exit();
            }
        }
    }
}
