use std::env;
use std::path::PathBuf;
use std::process;
use tinybas::{hosted_configuration, Basic};

fn main() {
    let mut with_screen = false;
    let mut eeprom_path: Option<PathBuf> = None;
    let mut program: Option<String> = None;

    let mut args = env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--display" => with_screen = true,
            "--eeprom" => match args.next() {
                Some(path) => eeprom_path = Some(PathBuf::from(path)),
                None => usage(),
            },
            "--help" | "-h" => usage(),
            _ if arg.starts_with('-') => usage(),
            _ => program = Some(arg),
        }
    }

    let mut basic = Basic::new(hosted_configuration(with_screen, eeprom_path));
    if let Some(file) = program {
        basic.execute(&format!("LOAD \"{}\"", file));
        basic.execute("RUN");
    }
    basic.run();
}

fn usage() -> ! {
    eprintln!("usage: mybasic [--display] [--eeprom <file>] [program.bas]");
    process::exit(1);
}
