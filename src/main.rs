use anyhow::{Context, Result};
use clap::{App, Arg};
use reprise::build::build_site;
use reprise::config::Config;
use reprise::markup::Markup;
use tracing_subscriber::EnvFilter;

fn main() {
    let matches = App::new("reprise")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Publishes a directory of dated, tagged entries as a static site")
        .arg(
            Arg::with_name("markup")
                .short("m")
                .long("markup")
                .takes_value(true)
                .possible_values(&Markup::NAMES)
                .case_insensitive(true)
                .default_value("Markdown")
                .help("The markup language entries are written in"),
        )
        .get_matches();

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    if let Err(err) = run(matches.value_of("markup").unwrap_or("Markdown")) {
        eprintln!("Error: {:#}", err);
        std::process::exit(1);
    }
}

fn run(markup: &str) -> Result<()> {
    let markup: Markup = markup.parse()?;
    let cwd = std::env::current_dir().context("Locating the current directory")?;
    let config = Config::from_directory(&cwd)?;
    build_site(&config, markup)?;
    Ok(())
}
