// The filesystem wrapper behind SAVE, LOAD, CATALOG, DELETE, OPEN and
// CLOSE. One input and one output file at most are open at a time; a failed
// operation reports through the trappable error, never through the
// non trappable one.

use std::fs::{self, File, OpenOptions};
use std::io::{Read, Write};

pub struct FileSys {
    infile: Option<File>,
    outfile: Option<File>,
}

impl FileSys {
    pub fn new() -> FileSys {
        FileSys { infile: None, outfile: None }
    }

    pub fn open_in(&mut self, name: &str) -> bool {
        self.infile = None;
        match File::open(name) {
            Ok(f) => {
                self.infile = Some(f);
                true
            }
            Err(_) => false,
        }
    }

    pub fn open_out(&mut self, name: &str) -> bool {
        self.outfile = None;
        match OpenOptions::new().write(true).create(true).truncate(true).open(name) {
            Ok(f) => {
                self.outfile = Some(f);
                true
            }
            Err(_) => false,
        }
    }

    pub fn close_in(&mut self) {
        self.infile = None;
    }

    pub fn close_out(&mut self) {
        self.outfile = None;
    }

    pub fn has_out(&self) -> bool {
        self.outfile.is_some()
    }

    // one byte from the open input file, None at end of file or with no
    // file open
    pub fn read_byte(&mut self) -> Option<u8> {
        let f = self.infile.as_mut()?;
        let mut b = [0u8; 1];
        match f.read(&mut b) {
            Ok(1) => Some(b[0]),
            _ => None,
        }
    }

    pub fn write_byte(&mut self, c: u8) -> bool {
        match self.outfile.as_mut() {
            Some(f) => f.write_all(&[c]).is_ok(),
            None => false,
        }
    }

    pub fn remove(&mut self, name: &str) -> bool {
        fs::remove_file(name).is_ok()
    }

    // plain files in the working directory whose names start like the
    // pattern, an empty pattern matches everything
    pub fn catalog(&self, pattern: &str) -> Vec<String> {
        let mut names = Vec::new();
        if let Ok(dir) = fs::read_dir(".") {
            for entry in dir.flatten() {
                if entry.file_type().map(|t| t.is_file()).unwrap_or(false) {
                    let name = entry.file_name().to_string_lossy().into_owned();
                    if name_matches(&name, pattern) && !name.starts_with('_') {
                        names.push(name);
                    }
                }
            }
        }
        names.sort();
        names
    }
}

// equal over the overlap of the two, so a pattern is a prefix match
fn name_matches(name: &str, pattern: &str) -> bool {
    for (a, b) in name.bytes().zip(pattern.bytes()) {
        if a != b {
            return false;
        }
    }
    true
}
