//TODO: update clap to remove the need for this
#![allow(dangerous_implicit_autorefs)]

use std::path::Path;

use clap::{
    crate_authors, crate_description, crate_name, crate_version, App, AppSettings, Arg, SubCommand,
};
use pyxtract::{extract, list};

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let arg_archive = Arg::with_name("archive")
        .help("PyInstaller executable")
        .short("a")
        .long("archive")
        .required(true)
        .takes_value(true)
        .value_name("FILE");

    let matches = App::new(crate_name!())
        .author(crate_authors!(", "))
        .about(crate_description!())
        .version(crate_version!())
        .setting(AppSettings::SubcommandRequiredElseHelp)
        .subcommand(
            SubCommand::with_name("extract")
                .about("Extract archive")
                .arg(&arg_archive)
                .arg(
                    Arg::with_name("output")
                        .help("Directory to create '<archive>_extracted' in (defaults to '.')")
                        .short("o")
                        .long("output")
                        .takes_value(true)
                        .value_name("DIR"),
                )
                .arg(
                    Arg::with_name("pyz")
                        .help("Also extract the modules of nested PYZ archives")
                        .short("z")
                        .long("pyz"),
                ),
        )
        .subcommand(
            SubCommand::with_name("list")
                .about("List archive")
                .arg(&arg_archive),
        )
        .get_matches();

    if let Some(matches) = matches.subcommand_matches("extract") {
        // Required argument
        let archive = matches.value_of("archive").unwrap_or_default();
        extract(
            archive,
            matches.value_of("output").map(Path::new),
            matches.is_present("pyz"),
        )?;
        Ok(())
    } else if let Some(matches) = matches.subcommand_matches("list") {
        list(matches.value_of("archive").unwrap_or_default()).map_err(anyhow::Error::new)
    } else {
        Ok(())
    }
}
