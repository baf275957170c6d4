mod cli;

use clap::Parser;

use cli::{Cli, Commands};

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Validate {
            file,
            source,
            metadata,
            config_dir,
            output,
        } => cli::validate::run(
            &file,
            source.as_deref(),
            metadata.as_deref(),
            &config_dir,
            output.as_deref(),
        ),
        Commands::Transform {
            file,
            source,
            config_dir,
            out_dir,
        } => cli::transform::run(&file, &source, &config_dir, &out_dir),
        Commands::Detect { file, config_dir } => cli::detect::run(&file, &config_dir),
        Commands::Sources { config_dir } => cli::sources::run(&config_dir),
    };

    match result {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            eprintln!("Error: {e:#}");
            std::process::exit(2);
        }
    }
}
