use barmatch::{normalize_args, read_abc_file, usage, Args, Scanner, Template, TEMPLATE_FILENAME, VERSION};
use clap::Parser;
use log::{error, LevelFilter};
use std::io::Write;
use std::path::Path;

fn main() {
    let args = match Args::try_parse_from(normalize_args(std::env::args())) {
        Ok(args) => args,
        Err(e) => {
            print!("{e}");
            return;
        }
    };
    env_logger::Builder::new()
        .filter_level(if args.verbose { LevelFilter::Debug } else { LevelFilter::Warn })
        .parse_default_env()
        .init();

    if args.version {
        println!("{VERSION}");
        return;
    }
    let corpus = match &args.corpus {
        Some(corpus) if !args.help => corpus.clone(),
        _ => {
            println!("{}", usage());
            return;
        }
    };
    if let Err(e) = run(&args, &corpus) {
        error!("{e:#}");
        println!("{e}");
    }
}

fn run(args: &Args, corpus: &str) -> anyhow::Result<()> {
    let config = args.to_config();
    let template = if config.needs_template() {
        let text = read_abc_file(Path::new(TEMPLATE_FILENAME))?;
        Some(Template::from_abc(&text, TEMPLATE_FILENAME, &config.settings)?)
    } else {
        None
    };
    let text = read_abc_file(Path::new(corpus))?;
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    Scanner::new(config, template).scan(&text, &mut out)?;
    out.flush()?;
    Ok(())
}
