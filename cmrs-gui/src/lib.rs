pub mod file_lock;
pub mod style;
pub mod ui;

use std::io::Write;

use clap::{ArgAction, Parser};
use gtk::Application;
use gtk::prelude::*;
use log::LevelFilter;

use crate::file_lock::acquire_app_lock;
use crate::style::load_css;
use crate::ui::build_ui;

#[derive(Parser, Debug)]
#[command(name = "cmrs")]
#[command(about = "GTK front-end for the ConnMan network daemon")]
#[command(disable_version_flag = true)]
#[command(version)]
struct Args {
    #[arg(short = 'V', long = "version", action = ArgAction::SetTrue)]
    version: bool,

    /// Log more; repeat for trace output
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count)]
    verbose: u8,
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    env_logger::Builder::from_default_env()
        .format(|buf, record| {
            writeln!(
                buf,
                "[{}] [{}] {}",
                record.level(),
                record.target(),
                record.args()
            )
        })
        .filter_level(level)
        .try_init()
        .ok();
}

pub fn run() -> anyhow::Result<()> {
    let args = Args::parse();

    if args.version {
        println!("{}", env!("CMRS_VERSION"));
        return Ok(());
    }

    init_logging(args.verbose);

    let _lock = acquire_app_lock()?;

    let app = Application::builder()
        .application_id("org.cmrs.ui")
        .build();

    app.connect_activate(|app| {
        load_css();
        build_ui(app);
    });

    // GTK must not see our own flags.
    app.run_with_args::<&str>(&[]);
    Ok(())
}

#[cfg(test)]
mod tests {
    #[test]
    fn version_names_package_and_commit() {
        let version = env!("CMRS_VERSION");
        assert!(version.starts_with(&format!("cmrs {} (", env!("CARGO_PKG_VERSION"))));
        assert!(version.ends_with(')'));
    }
}
