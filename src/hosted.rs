// The hosted machine description. A raw mode terminal when we have one,
// plain stdio otherwise, an EEPROM file when asked for, no printer and
// stub pins. The display window is opt in since it needs a windowing
// system.

use crate::devices::{Console, Printer, StdioConsole, Term, ISERIAL, OSERIAL};
use crate::eeprom::{Eeprom, FileEeprom, NoEeprom};
use crate::pins::NullPins;
use crate::Configuration;
use std::path::PathBuf;

const MEMSIZE: usize = 60000;
const EEPROMSIZE: usize = 4096;

const DSP_ROWS: usize = 16;
const DSP_COLUMNS: usize = 40;

pub fn configuration(with_screen: bool, eeprom_path: Option<PathBuf>) -> Configuration {
    let console: Box<dyn Console> = match Term::new() {
        Ok(term) => Box::new(term),
        Err(_) => Box::new(StdioConsole::new()),
    };
    let eeprom: Box<dyn Eeprom> = match eeprom_path {
        Some(path) => Box::new(FileEeprom::new(path, EEPROMSIZE)),
        None => Box::new(NoEeprom),
    };
    let (rows, cols) = if with_screen { (DSP_ROWS, DSP_COLUMNS) } else { (0, 0) };

    Configuration {
        memsize: MEMSIZE,
        console,
        eeprom,
        printer: Printer::none(),
        pins: Box::new(NullPins),
        display_rows: rows,
        display_cols: cols,
        display_screen: with_screen,
        sound: true,
        default_input: ISERIAL,
        default_output: OSERIAL,
    }
}
