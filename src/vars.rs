// Variable handling. Single letter scalars live in a static table, all
// other objects in the packed heap, created on first reference. The @
// pseudo variables expose interpreter and device state, and the special
// arrays map the free region, the EEPROM and the display buffer.

use crate::error::{Error, Result};
use crate::interp::{Interpreter, BUFSIZE};
use crate::num::{from_i, from_le, to_i, Num, MAXNUM, NUMSIZE, STRINDEXSIZE, ZERO};
use crate::tokens::{Name, ARRAYVAR, STRINGVAR, VARIABLE};

// a run of bytes in one of the two byte stores
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Bytes {
    Ibuf(usize),
    Mem(usize),
}

impl Interpreter {
    pub fn getvar(&mut self, n: Name) -> Result<Num> {
        if n.is_static() {
            return Ok(self.vars[(n.c - b'A') as usize]);
        }

        if n.c == b'@' {
            match n.d {
                b'S' => return Ok(self.ert),
                b'I' => return Ok(from_i(self.id as i64)),
                b'O' => return Ok(from_i(self.od as i64)),
                b'C' => {
                    return Ok(if self.checkch().is_some() {
                        from_i(self.inch() as i64)
                    } else {
                        ZERO
                    });
                }
                b'R' => return Ok(from_i(self.rd as i64)),
                b'X' => return Ok(from_i(self.display.col as i64)),
                b'Y' => return Ok(from_i(self.display.row as i64)),
                _ => {}
            }
        }

        match self.arena.find(VARIABLE, n) {
            Some(obj) => Ok(self.arena.read_num(obj.addr)),
            None => {
                let a = self.arena.alloc(VARIABLE, n, 0)?;
                self.arena.write_num(a, ZERO);
                Ok(ZERO)
            }
        }
    }

    pub fn setvar(&mut self, n: Name, v: Num) -> Result<()> {
        if n.is_static() {
            self.vars[(n.c - b'A') as usize] = v;
            return Ok(());
        }

        if n.c == b'@' {
            match n.d {
                b'S' => {
                    self.ert = v;
                    return Ok(());
                }
                b'I' => {
                    self.id = to_i(v) as u8;
                    return Ok(());
                }
                b'O' => {
                    self.od = to_i(v) as u8;
                    return Ok(());
                }
                b'C' => {
                    self.outch(to_i(v) as u8);
                    return Ok(());
                }
                b'R' => {
                    self.rd = to_i(v) as u16;
                    return Ok(());
                }
                b'X' => {
                    let row = self.display.row;
                    self.display.set_cursor(to_i(v).max(0) as usize, row);
                    return Ok(());
                }
                b'Y' => {
                    let col = self.display.col;
                    self.display.set_cursor(col, to_i(v).max(0) as usize);
                    return Ok(());
                }
                _ => {}
            }
        }

        let a = match self.arena.find(VARIABLE, n) {
            Some(obj) => obj.addr,
            None => self.arena.alloc(VARIABLE, n, 0)?,
        };
        self.arena.write_num(a, v);
        Ok(())
    }

    pub fn create_array(&mut self, n: Name, size: usize) -> Result<()> {
        if self.arena.find(ARRAYVAR, n).is_some() {
            return Err(Error::Variable);
        }
        let a = self.arena.alloc(ARRAYVAR, n, size)?;
        for i in 0..size {
            self.arena.write_num(a + i * NUMSIZE, ZERO);
        }
        Ok(())
    }

    pub fn array_get(&mut self, n: Name, i: Num) -> Result<Num> {
        let idx = to_i(i);

        if n.c == b'@' {
            match n.d {
                b'E' => {
                    let h = self.eeprom.len() / NUMSIZE;
                    if idx < 1 || idx > h as i64 {
                        return Err(Error::Range);
                    }
                    let a = self.eeprom.len() - NUMSIZE * idx as usize;
                    let mut raw = [0u8; NUMSIZE];
                    for (j, b) in raw.iter_mut().enumerate() {
                        *b = self.eeprom.read(a + j);
                    }
                    return Ok(from_le(&raw));
                }
                b'D' => {
                    if !self.display.active_size() {
                        return Ok(ZERO);
                    }
                    let cells = self.display.rows * self.display.cols;
                    if idx < 1 || idx > cells as i64 {
                        return Ok(ZERO);
                    }
                    return Ok(from_i(self.display.get_cell(idx as usize - 1) as i64));
                }
                0 => {
                    // Dr. Wang's end of memory array over the free region
                    let h = (self.arena.himem - self.arena.top) / NUMSIZE;
                    if idx < 1 || idx > h as i64 {
                        return Err(Error::Range);
                    }
                    let a = self.arena.himem - NUMSIZE * idx as usize + 1;
                    return Ok(self.arena.read_num(a));
                }
                _ => {}
            }
        }

        let obj = self.arena.find(ARRAYVAR, n).ok_or(Error::Variable)?;
        let h = obj.len / NUMSIZE;
        if idx < 1 || idx > h as i64 {
            return Err(Error::Range);
        }
        Ok(self.arena.read_num(obj.addr + (idx as usize - 1) * NUMSIZE))
    }

    pub fn array_set(&mut self, n: Name, i: Num, v: Num) -> Result<()> {
        let idx = to_i(i);

        if n.c == b'@' {
            match n.d {
                b'E' => {
                    let h = self.eeprom.len() / NUMSIZE;
                    if idx < 1 || idx > h as i64 {
                        return Err(Error::Range);
                    }
                    let a = self.eeprom.len() - NUMSIZE * idx as usize;
                    let raw = crate::num::to_le(v);
                    for (j, &b) in raw.iter().enumerate() {
                        self.eeprom.update(a + j, b);
                    }
                    return Ok(());
                }
                b'D' => {
                    if !self.display.active_size() {
                        return Ok(());
                    }
                    let cells = self.display.rows * self.display.cols;
                    if idx < 1 || idx > cells as i64 {
                        return Ok(());
                    }
                    self.display.set_cell(idx as usize - 1, to_i(v) as u8);
                    return Ok(());
                }
                0 => {
                    let h = (self.arena.himem - self.arena.top) / NUMSIZE;
                    if idx < 1 || idx > h as i64 {
                        return Err(Error::Range);
                    }
                    let a = self.arena.himem - NUMSIZE * idx as usize + 1;
                    self.arena.write_num(a, v);
                    return Ok(());
                }
                _ => {}
            }
        }

        let obj = self.arena.find(ARRAYVAR, n).ok_or(Error::Variable)?;
        let h = obj.len / NUMSIZE;
        if idx < 1 || idx > h as i64 {
            return Err(Error::Range);
        }
        self.arena.write_num(obj.addr + (idx as usize - 1) * NUMSIZE, v);
        Ok(())
    }

    pub fn create_string(&mut self, n: Name, size: usize) -> Result<()> {
        if self.arena.find(STRINGVAR, n).is_some() {
            return Err(Error::Variable);
        }
        let a = self.arena.alloc(STRINGVAR, n, size + STRINDEXSIZE)?;
        self.arena.write_addr(a, 0);
        Ok(())
    }

    // capacity in characters
    pub fn string_dim(&self, n: Name) -> usize {
        if n.c == b'@' {
            return BUFSIZE - 1;
        }
        let l = self.arena.length(STRINGVAR, n);
        l.saturating_sub(STRINDEXSIZE)
    }

    // current length, the prefix field for heap strings, byte 0 of the
    // input buffer for @
    pub fn len_string(&self, n: Name) -> Result<usize> {
        if n.c == b'@' {
            return Ok(self.ibuffer[0] as usize);
        }
        let obj = self.arena.find(STRINGVAR, n).ok_or(Error::Variable)?;
        Ok(self.arena.read_addr(obj.addr))
    }

    pub fn set_string_length(&mut self, n: Name, l: usize) -> Result<()> {
        if n.c == b'@' {
            self.ibuffer[0] = l as u8;
            return Ok(());
        }
        let obj = self.arena.find(STRINGVAR, n).ok_or(Error::Variable)?;
        if l > obj.len.saturating_sub(STRINDEXSIZE) {
            return Err(Error::Range);
        }
        self.arena.write_addr(obj.addr, l);
        Ok(())
    }

    // the address of character position b, one based
    pub fn string_ptr(&self, n: Name, b: usize) -> Result<Bytes> {
        if n.c == b'@' {
            if b > BUFSIZE - 1 {
                return Err(Error::Range);
            }
            return Ok(Bytes::Ibuf(b));
        }
        let obj = self.arena.find(STRINGVAR, n).ok_or(Error::Variable)?;
        if b < 1 || b > obj.len.saturating_sub(STRINDEXSIZE) {
            return Err(Error::Range);
        }
        Ok(Bytes::Mem(obj.addr + b - 1 + STRINDEXSIZE))
    }

    pub fn read_byte_at(&self, b: Bytes, off: usize) -> u8 {
        match b {
            Bytes::Ibuf(i) => self.ibuffer[(i + off).min(BUFSIZE - 1)],
            Bytes::Mem(a) => self.arena.read((a + off).min(self.arena.memsize)),
        }
    }

    pub fn write_byte_at(&mut self, b: Bytes, off: usize, v: u8) {
        match b {
            Bytes::Ibuf(i) => self.ibuffer[i + off] = v,
            Bytes::Mem(a) => self.arena.write(a + off, v),
        }
    }

    // overlap safe copy between any two byte runs
    pub fn copy_string_bytes(&mut self, src: Bytes, dst: Bytes, n: usize) {
        match (src, dst) {
            (Bytes::Mem(s), Bytes::Mem(d)) => self.arena.copy_bytes(s, d, n),
            (Bytes::Ibuf(s), Bytes::Ibuf(d)) => self.ibuffer.copy_within(s..s + n, d),
            (Bytes::Ibuf(s), Bytes::Mem(d)) => {
                for j in 0..n {
                    let b = self.ibuffer[s + j];
                    self.arena.write(d + j, b);
                }
            }
            (Bytes::Mem(s), Bytes::Ibuf(d)) => {
                for j in 0..n {
                    self.ibuffer[d + j] = self.arena.read(s + j);
                }
            }
        }
    }

    // peek and poke clip against the number range, not only the arena, so
    // narrow number types keep their historic window
    fn peek_limit(&self) -> i64 {
        (self.arena.memsize as i64).min(to_i(MAXNUM))
    }

    pub fn peek(&mut self, a: Num) -> Result<Num> {
        let addr = to_i(a);
        if addr >= 0 && addr < self.peek_limit() {
            Ok(from_i(self.arena.read(addr as usize) as i8 as i64))
        } else if addr < 0 && (-addr as usize) < self.eeprom.len() {
            Ok(from_i(self.eeprom.read((-addr - 1) as usize) as i8 as i64))
        } else {
            Err(Error::Range)
        }
    }

    pub fn poke(&mut self, a: Num, v: Num) -> Result<()> {
        let addr = to_i(a);
        if addr >= 0 && addr < self.peek_limit() {
            self.arena.write(addr as usize, to_i(v) as u8);
            Ok(())
        } else if addr < 0 && (-addr as usize) <= self.eeprom.len() {
            self.eeprom.update((-addr - 1) as usize, to_i(v) as u8);
            self.eeprom.flush();
            Ok(())
        } else {
            Err(Error::Range)
        }
    }
}
