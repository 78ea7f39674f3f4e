// The statement layer. One dispatch loop consumes tokens until the end of
// the line; each statement either leaves the cursor on a fresh token or
// returns because the interpreter state changed. The break character is
// polled once per statement.

use crate::devices::{IFILE, IKEYBOARD, ISERIAL, ODSP, OFILE, OSERIAL};
use crate::error::{Error, Result};
use crate::interp::{ForFrame, Interpreter, State, BUFSIZE, SBUFSIZE};
use crate::io::InNum;
use crate::num::{
    from_i, nadd, to_i, Addr, Num, ADDRSIZE, EHEADERSIZE, ONE, STRINDEXSIZE, ZERO,
};
use crate::tokens::{Name, Token};

impl Interpreter {
    pub fn statement(&mut self) -> Result<()> {
        while self.token != Token::Eol {
            match self.token {
                Token::LineNumber(_) => self.nexttoken()?,
                // Palo Alto BASIC language set plus BREAK
                Token::Print => self.xprint()?,
                Token::Let => {
                    self.nexttoken()?;
                    match self.token {
                        Token::Var(_) | Token::ArrayVar(_) | Token::StringVar(_) => {
                            self.assignment()?
                        }
                        _ => return Err(Error::Unknown),
                    }
                }
                Token::Var(_) | Token::ArrayVar(_) | Token::StringVar(_) => {
                    self.assignment()?
                }
                Token::Input => self.xinput()?,
                Token::Return => self.xreturn()?,
                Token::Gosub => self.xgoto(true)?,
                Token::Goto => self.xgoto(false)?,
                Token::If => self.xif()?,
                Token::For => self.xfor()?,
                Token::Next => self.xnext()?,
                Token::Break => self.xbreak()?,
                Token::Stop | Token::End => {
                    // new input is needed after this
                    self.ibuffer[0] = 0;
                    self.st = State::Interactive;
                    return Ok(());
                }
                Token::List => self.xlist()?,
                Token::New => {
                    self.xnew();
                    return Ok(());
                }
                Token::Cont => {
                    self.xrun(true)?;
                    return Ok(());
                }
                Token::Run => {
                    self.xrun(false)?;
                    return Ok(());
                }
                Token::Rem => self.xrem()?,
                // Apple 1 language set
                Token::Dim => self.xdim()?,
                Token::Clr => self.xclr()?,
                Token::Tab => self.xtab()?,
                Token::Poke => self.xpoke()?,
                // interpreter extensions
                Token::Dump => self.xdump()?,
                Token::Save => self.xsave()?,
                Token::Load => {
                    // the input buffer is recycled while loading
                    self.xload()?;
                    return Ok(());
                }
                Token::Get => self.xget()?,
                Token::Put => self.xput()?,
                Token::Set => self.xset()?,
                Token::Cls => {
                    self.outch(12);
                    self.nexttoken()?;
                }
                // host IO
                Token::Dwrite => self.xdwrite()?,
                Token::Awrite => self.xawrite()?,
                Token::Pinm => self.xpinm()?,
                Token::Delay => self.xdelay()?,
                Token::Atone => self.xtone()?,
                // mass storage
                Token::Catalog => self.xcatalog()?,
                Token::Delete => self.xdelete()?,
                Token::Open => self.xopen()?,
                Token::Close => self.xclose()?,
                // reserved
                Token::Call => self.nexttoken()?,
                Token::Chr(b':') => self.nexttoken()?,
                // very tolerant, tokens are just skipped
                _ => self.nexttoken()?,
            }
            if self.break_pending() {
                self.st = State::Interactive;
                return Ok(());
            }
        }
        Ok(())
    }

    fn xprint(&mut self) -> Result<()> {
        let mut semicolon = false;
        let mut modifier = false;
        self.form = ZERO;
        let oldod = self.od;

        self.nexttoken()?;
        loop {
            if self.termsymbol() {
                if !semicolon {
                    self.outcr();
                }
                self.nexttoken()?;
                self.od = oldod;
                return Ok(());
            }
            semicolon = false;

            if let Some(s) = self.stringvalue()? {
                let v: Vec<u8> = (0..s.len).map(|j| self.read_byte_at(s.src, j)).collect();
                self.out_bytes(&v);
                self.nexttoken()?;
            } else if self.token == Token::Chr(b'#') || self.token == Token::Chr(b'&') {
                // format and routing modifiers
                let m = self.token;
                self.nexttoken()?;
                self.expression()?;
                let v = self.pop()?;
                if m == Token::Chr(b'#') {
                    self.form = v;
                } else {
                    self.od = to_i(v) as u8;
                }
                modifier = true;
                continue;
            } else if self.token != Token::Chr(b',') && self.token != Token::Chr(b';') {
                self.expression()?;
                let v = self.pop()?;
                self.outnumber(v);
            }

            if self.token == Token::Chr(b',') {
                if !modifier {
                    self.outspc();
                }
                self.nexttoken()?;
            }
            if self.token == Token::Chr(b';') {
                semicolon = true;
                self.nexttoken()?;
            }
            modifier = false;
        }
    }

    // determine where an assignment goes: the subscript and whether the
    // target is a pure, subscriptless string
    fn lefthandside(&mut self, t: Token) -> Result<(Num, bool)> {
        match t {
            Token::Var(_) => {
                self.nexttoken()?;
                Ok((ONE, true))
            }
            Token::ArrayVar(_) => {
                self.nexttoken()?;
                let args = self.parsesubscripts()?;
                self.nexttoken()?;
                if args != 1 {
                    return Err(Error::Args);
                }
                Ok((self.pop()?, false))
            }
            Token::StringVar(_) => {
                self.nexttoken()?;
                let args = self.parsesubscripts()?;
                match args {
                    0 => Ok((ONE, true)),
                    1 => {
                        self.nexttoken()?;
                        Ok((self.pop()?, false))
                    }
                    _ => Err(Error::Args),
                }
            }
            _ => Err(Error::Unknown),
        }
    }

    // store the top of stack into the left hand side
    fn assignnumber(&mut self, t: Token, n: Name, i: Num, ps: bool) -> Result<()> {
        match t {
            Token::Var(_) => {
                let v = self.pop()?;
                self.setvar(n, v)
            }
            Token::ArrayVar(_) => {
                let v = self.pop()?;
                self.array_set(n, i, v)
            }
            Token::StringVar(_) => {
                let idx = to_i(i);
                if idx < 1 {
                    return Err(Error::Range);
                }
                let idx = idx as usize;
                let ptr = self.string_ptr(n, idx)?;
                let v = self.pop()?;
                self.write_byte_at(ptr, 0, to_i(v) as u8);
                if ps {
                    self.set_string_length(n, 1)
                } else {
                    let len = self.len_string(n)?;
                    let dim = self.string_dim(n);
                    if len < idx && idx < dim {
                        self.set_string_length(n, idx)?;
                    }
                    Ok(())
                }
            }
            _ => Ok(()),
        }
    }

    fn assignment(&mut self) -> Result<()> {
        let t = self.token;
        let name = match t {
            Token::Var(n) | Token::ArrayVar(n) | Token::StringVar(n) => n,
            _ => return Err(Error::Unknown),
        };

        let (i, ps) = self.lefthandside(t)?;
        if self.token != Token::Chr(b'=') {
            return Err(Error::Unknown);
        }
        self.nexttoken()?;

        match t {
            Token::Var(_) | Token::ArrayVar(_) => {
                self.expression()?;
                self.assignnumber(t, name, i, ps)?;
            }
            Token::StringVar(_) => match self.stringvalue()? {
                None => {
                    // a number on the right stores its low byte
                    self.expression()?;
                    self.assignnumber(t, name, i, ps)?;
                }
                Some(src) => {
                    let lensource = src.len;
                    let idx = to_i(i);
                    if idx < 1 {
                        return Err(Error::Range);
                    }
                    let idx = idx as usize;
                    let dim = self.string_dim(name);
                    if idx - 1 + lensource > dim {
                        return Err(Error::Range);
                    }
                    let dst = self.string_ptr(name, idx)?;
                    let lendest = self.len_string(name)?;
                    self.copy_string_bytes(src.src, dst, lensource);
                    let newlength = if ps {
                        lensource
                    } else if idx + lensource > lendest {
                        idx + lensource - 1
                    } else {
                        lendest
                    };
                    self.set_string_length(name, newlength)?;
                }
            },
            _ => {}
        }
        self.nexttoken()?;
        Ok(())
    }

    fn xinput(&mut self) -> Result<()> {
        self.nexttoken()?;

        let mut oldid: Option<u8> = None;
        if self.token == Token::Chr(b'&') {
            self.nexttoken()?;
            self.expression()?;
            oldid = Some(self.id);
            self.id = to_i(self.pop()?) as u8;
            if self.token != Token::Chr(b',') {
                return Err(Error::Unknown);
            }
            self.nexttoken()?;
        }

        loop {
            if let Token::Str(sv) = self.token {
                if self.id != IFILE {
                    let v = self.str_bytes(sv).to_vec();
                    self.out_bytes(&v);
                }
                self.nexttoken()?;
                if self.token != Token::Chr(b',') && self.token != Token::Chr(b';') {
                    return Err(Error::Unknown);
                }
                self.nexttoken()?;
            }

            match self.token {
                Token::Var(n) => {
                    if self.id != IFILE {
                        self.outsc("? ");
                    }
                    match self.innumber() {
                        InNum::Break => {
                            self.setvar(n, ZERO)?;
                            self.st = State::Interactive;
                            self.nexttoken()?;
                            if let Some(x) = oldid {
                                self.id = x;
                            }
                            return Ok(());
                        }
                        InNum::Value(v) => self.setvar(n, v)?,
                        InNum::Empty => self.setvar(n, ZERO)?,
                    }
                }
                Token::ArrayVar(n) => {
                    self.nexttoken()?;
                    if self.parsesubscripts()? != 1 {
                        return Err(Error::Args);
                    }
                    let idx = self.pop()?;
                    if self.id != IFILE {
                        self.outsc("? ");
                    }
                    match self.innumber() {
                        InNum::Break => {
                            self.array_set(n, idx, ZERO)?;
                            self.st = State::Interactive;
                            self.nexttoken()?;
                            if let Some(x) = oldid {
                                self.id = x;
                            }
                            return Ok(());
                        }
                        InNum::Value(v) => self.array_set(n, idx, v)?,
                        InNum::Empty => self.array_set(n, idx, ZERO)?,
                    }
                }
                Token::StringVar(n) => {
                    if self.id != IFILE {
                        self.outsc("? ");
                    }
                    let mut buf = [0u8; BUFSIZE];
                    self.read_line_buf(&mut buf);
                    let mut len = buf[0] as usize;
                    let dim = self.string_dim(n);
                    if len > dim {
                        len = dim;
                    }
                    if n.c == b'@' {
                        self.ibuffer = buf;
                    } else {
                        let dst = self.string_ptr(n, 1)?;
                        for j in 0..len {
                            self.write_byte_at(dst, j, buf[1 + j]);
                        }
                        self.set_string_length(n, len)?;
                    }
                }
                _ => {}
            }

            self.nexttoken()?;
            if self.token == Token::Chr(b',') || self.token == Token::Chr(b';') {
                self.nexttoken()?;
                continue;
            }
            break;
        }

        if let Some(x) = oldid {
            self.id = x;
        }
        Ok(())
    }

    fn xgoto(&mut self, gosub: bool) -> Result<()> {
        self.nexttoken()?;
        self.expression()?;
        if gosub {
            self.push_gosub()?;
        }
        let target = self.pop()?;
        self.find_line(to_i(target) as Addr)?;
        if self.st == State::Interactive {
            self.st = State::Run;
        }
        self.nexttoken()?;
        Ok(())
    }

    fn xreturn(&mut self) -> Result<()> {
        self.pop_gosub()?;
        self.nexttoken()?;
        Ok(())
    }

    fn xif(&mut self) -> Result<()> {
        self.nexttoken()?;
        self.expression()?;
        let x = self.pop()?;
        if !crate::num::truthy(x) {
            // on a false condition skip the entire line
            loop {
                self.nexttoken()?;
                match self.token {
                    Token::LineNumber(_) | Token::Eol => break,
                    _ => {}
                }
                if self.st != State::Interactive && self.here >= self.arena.top {
                    break;
                }
            }
        }
        if self.token == Token::Then {
            self.nexttoken()?;
            if let Token::Number(n) = self.token {
                self.find_line(to_i(n) as Addr)?;
            }
        }
        Ok(())
    }

    // find the matching NEXT, counting nested loops
    fn find_next(&mut self) -> Result<()> {
        loop {
            if self.token == Token::Next {
                if self.fnc == 0 {
                    return Ok(());
                }
                self.fnc -= 1;
            }
            if self.token == Token::For {
                self.fnc += 1;
            }
            if self.st == State::Interactive {
                if self.token == Token::Eol {
                    return Err(Error::For);
                }
            } else if self.here >= self.arena.top {
                return Err(Error::For);
            }
            self.nexttoken()?;
        }
    }

    fn xfor(&mut self) -> Result<()> {
        self.nexttoken()?;
        let name = match self.token {
            Token::Var(n) => n,
            _ => return Err(Error::Unknown),
        };

        self.nexttoken()?;
        if self.token != Token::Chr(b'=') {
            return Err(Error::Unknown);
        }
        self.nexttoken()?;
        self.expression()?;
        let initial = self.pop()?;
        self.setvar(name, initial)?;

        if self.token != Token::To {
            return Err(Error::Unknown);
        }
        self.nexttoken()?;
        self.expression()?;

        let step = if self.token == Token::Step {
            self.nexttoken()?;
            self.expression()?;
            self.pop()?
        } else {
            ONE
        };
        if !self.termsymbol() {
            return Err(Error::Unknown);
        }
        let to = self.pop()?;

        let back = if self.st == State::Interactive { self.bi } else { self.here };
        self.push_for(ForFrame { var: name, here: back, to, step })?;

        // a failed initial test skips ahead to the matching NEXT; a step
        // of zero is a deliberate infinite loop
        let v = self.getvar(name)?;
        if (step > ZERO && v > to) || (step < ZERO && v < to) {
            self.drop_for()?;
            self.find_next()?;
            self.nexttoken()?;
        }
        Ok(())
    }

    fn xbreak(&mut self) -> Result<()> {
        self.drop_for()?;
        self.find_next()?;
        self.nexttoken()?;
        Ok(())
    }

    fn loop_back(&mut self, frame: ForFrame) -> Result<()> {
        if self.st == State::Interactive {
            self.bi = frame.here;
        } else {
            self.here = frame.here;
        }
        self.push_for(frame)?;
        self.nexttoken()?;
        Ok(())
    }

    fn xnext(&mut self) -> Result<()> {
        self.nexttoken()?;
        let mut named: Option<Name> = None;
        if !self.termsymbol() {
            if let Token::Var(n) = self.token {
                named = Some(n);
                self.nexttoken()?;
                if !self.termsymbol() {
                    return Err(Error::Unknown);
                }
            }
        }

        let frame = self.pop_for()?;
        if let Some(n) = named {
            if n != frame.var {
                return Err(Error::For);
            }
        }
        if frame.step == ZERO {
            return self.loop_back(frame);
        }
        let t = nadd(self.getvar(frame.var)?, frame.step);
        self.setvar(frame.var, t)?;
        if frame.step > ZERO && t <= frame.to {
            return self.loop_back(frame);
        }
        if frame.step < ZERO && t >= frame.to {
            return self.loop_back(frame);
        }
        // last iteration completed
        self.nexttoken()?;
        Ok(())
    }

    // de-tokenize one token
    fn outputtoken(&mut self) -> Result<()> {
        match self.token {
            Token::Number(x) => self.outnumber(x),
            Token::LineNumber(l) => {
                self.outnumber(from_i(l as i64));
                self.outspc();
            }
            Token::Var(n) | Token::ArrayVar(n) | Token::StringVar(n) => {
                self.outch(n.c);
                if n.d != 0 {
                    self.outch(n.d);
                }
                if matches!(self.token, Token::StringVar(_)) {
                    self.outch(b'$');
                }
            }
            Token::Str(sv) => {
                self.outch(b'"');
                let v = self.str_bytes(sv).to_vec();
                self.out_bytes(&v);
                self.outch(b'"');
            }
            Token::Chr(c) => self.outch(c),
            Token::Eol => {}
            t => {
                if t == Token::Then || t == Token::To || t == Token::Step {
                    self.outspc();
                }
                if let Some(text) = t.keyword_text() {
                    self.outsc(text);
                }
                if !t.is_digraph() {
                    self.outspc();
                }
            }
        }
        Ok(())
    }

    fn xlist(&mut self) -> Result<()> {
        self.nexttoken()?;
        let args = self.parsearguments()?;
        let (b, e): (i64, i64) = match args {
            0 => (0, 32767),
            1 => {
                let x = to_i(self.pop()?);
                (x, x)
            }
            2 => {
                let e = to_i(self.pop()?);
                let b = to_i(self.pop()?);
                (b, e)
            }
            _ => return Err(Error::Args),
        };

        if self.arena.top == 0 {
            self.nexttoken()?;
            return Ok(());
        }

        self.here = 0;
        let mut oflag = false;
        self.gettoken()?;
        while self.here < self.arena.top {
            if let Token::LineNumber(l) = self.token {
                if l as i64 >= b {
                    oflag = true;
                }
                if l as i64 > e {
                    oflag = false;
                }
            }
            if oflag {
                self.outputtoken()?;
            }
            self.gettoken()?;
            if matches!(self.token, Token::LineNumber(_)) && oflag {
                self.outcr();
                // wait after a full page on small displays
                if self.od == ODSP && self.display.at_scroll_stop() {
                    let c = self.inch();
                    if c == b' ' {
                        self.outch(12);
                    }
                    if c == 27 {
                        break;
                    }
                }
            }
        }
        if self.here == self.arena.top && oflag {
            self.outputtoken()?;
        }
        // suppress the newline when a single line was asked for
        if e == 32767 || b != e {
            self.outcr();
        }

        self.nexttoken()?;
        Ok(())
    }

    pub fn xrun(&mut self, cont: bool) -> Result<()> {
        if cont {
            self.st = State::Run;
            self.nexttoken()?;
        } else {
            self.nexttoken()?;
            let args = self.parsearguments()?;
            if args > 1 {
                return Err(Error::Args);
            }
            if args == 0 {
                self.here = 0;
            } else {
                let l = self.pop()?;
                self.find_line(to_i(l) as Addr)?;
            }
            if self.st == State::Interactive {
                self.st = State::Run;
            }
            self.clear_vars();
            self.clear_gosub();
            self.clear_for();
            self.nexttoken()?;
        }

        while self.here < self.arena.top
            && (self.st == State::Run || self.st == State::EepromRun)
        {
            self.statement()?;
        }
        self.st = State::Interactive;
        Ok(())
    }

    // the general cleanup
    pub fn xnew(&mut self) {
        self.clear_stack();
        self.arena.top = 0;
        self.arena.clear_heap();
        let himem = self.arena.himem;
        self.arena.zero_block(0, himem);
        for v in self.vars.iter_mut() {
            *v = ZERO;
        }
        self.here = 0;
        self.st = State::Interactive;
        self.clear_gosub();
        self.clear_for();
    }

    fn xrem(&mut self) -> Result<()> {
        loop {
            match self.token {
                Token::LineNumber(_) | Token::Eol => return Ok(()),
                _ => {}
            }
            if self.st != State::Interactive && self.here > self.arena.top {
                return Ok(());
            }
            self.nexttoken()?;
        }
    }

    fn xclr(&mut self) -> Result<()> {
        self.clear_vars();
        self.clear_gosub();
        self.clear_for();
        self.nexttoken()?;
        Ok(())
    }

    fn xdim(&mut self) -> Result<()> {
        self.nexttoken()?;
        loop {
            let (string, name) = match self.token {
                Token::ArrayVar(n) => (false, n),
                Token::StringVar(n) => (true, n),
                _ => return Err(Error::Unknown),
            };
            self.nexttoken()?;
            if self.parsesubscripts()? != 1 {
                return Err(Error::Args);
            }
            let x = to_i(self.pop()?);
            if x <= 0 {
                return Err(Error::Range);
            }
            let size = x as usize;
            if string {
                if size > 255 && STRINDEXSIZE == 1 {
                    return Err(Error::Range);
                }
                self.create_string(name, size)?;
            } else {
                self.create_array(name, size)?;
            }
            self.nexttoken()?;
            if self.token == Token::Chr(b',') {
                self.nexttoken()?;
                continue;
            }
            break;
        }
        self.nexttoken()?;
        Ok(())
    }

    fn xpoke(&mut self) -> Result<()> {
        self.nexttoken()?;
        self.parse_n_arguments(2)?;
        let v = self.pop()?;
        let a = self.pop()?;
        self.poke(a, v)
    }

    fn xtab(&mut self) -> Result<()> {
        self.nexttoken()?;
        self.parse_n_arguments(1)?;
        let x = to_i(self.pop()?);
        for _ in 0..x.max(0) {
            self.outspc();
        }
        Ok(())
    }

    fn xdump(&mut self) -> Result<()> {
        self.form = ZERO;
        self.nexttoken()?;
        let args = self.parsearguments()?;
        let (start, end) = match args {
            0 => (0usize, self.arena.memsize),
            1 => (to_i(self.pop()?).max(0) as usize, self.arena.memsize),
            2 => {
                let e = to_i(self.pop()?).max(0) as usize;
                let s = to_i(self.pop()?).max(0) as usize;
                (s, e)
            }
            _ => return Err(Error::Args),
        };

        let rows = end / 8 + 1;
        self.dump_arena(start, rows);
        if self.eeprom.len() > 0 {
            self.outsc("EEPROM");
            self.outcr();
            self.dump_eeprom(rows);
        }
        let top = self.arena.top;
        let himem = self.arena.himem;
        self.outsc("top: ");
        self.outnumber(from_i(top as i64));
        self.outcr();
        self.outsc("himem: ");
        self.outnumber(from_i(himem as i64));
        self.outcr();

        self.nexttoken()?;
        Ok(())
    }

    fn dump_arena(&mut self, start: usize, rows: usize) {
        let mut k = start;
        for _ in 0..rows {
            let head = format!("{:04x}: ", k);
            self.outsc(&head);
            for _ in 0..8 {
                let cell = format!("{:02x} ", self.arena.read(k));
                self.outsc(&cell);
                k += 1;
                if k > self.arena.memsize {
                    break;
                }
            }
            self.outcr();
            if k > self.arena.memsize {
                break;
            }
        }
    }

    fn dump_eeprom(&mut self, rows: usize) {
        let mut k = 0;
        for _ in 0..rows {
            let head = format!("{:04x}: ", k);
            self.outsc(&head);
            for _ in 0..8 {
                let cell = format!("{:02x} ", self.eeprom.read(k));
                self.outsc(&cell);
                k += 1;
                if k >= self.eeprom.len() {
                    break;
                }
            }
            self.outcr();
            if k >= self.eeprom.len() {
                break;
            }
        }
    }

    // a file name argument, the default when the statement has none
    fn getfilename(&mut self, with_default: bool) -> Result<String> {
        self.nexttoken()?;
        match self.stringvalue()? {
            Some(s) => {
                let v: Vec<u8> =
                    (0..s.len).map(|j| self.read_byte_at(s.src, j)).collect();
                Ok(String::from_utf8_lossy(&v).into_owned())
            }
            None => {
                if self.termsymbol() {
                    Ok(if with_default { String::from("file.bas") } else { String::new() })
                } else {
                    Err(Error::Unknown)
                }
            }
        }
    }

    // the EEPROM image, status byte, length, program
    fn esave(&mut self) -> Result<()> {
        if self.eeprom.len() == 0 {
            return Err(Error::Eeprom);
        }
        let top = self.arena.top;
        if top + EHEADERSIZE >= self.eeprom.len() {
            return Err(Error::OutOfMemory);
        }
        self.eeprom.update(0, 0);
        let len = (top as Addr).to_le_bytes();
        for i in 0..ADDRSIZE {
            self.eeprom.update(1 + i, len[i]);
        }
        for a in 0..top {
            let b = self.arena.read(a);
            self.eeprom.update(a + EHEADERSIZE, b);
        }
        self.eeprom.update(top + EHEADERSIZE, 0);
        self.eeprom.flush();
        Ok(())
    }

    fn eload(&mut self) -> Result<()> {
        if self.eeprom.len() == 0 || self.eeprom.read(0) > 1 {
            return Err(Error::Eeprom);
        }
        let len =
            Addr::from_le_bytes([self.eeprom.read(1), self.eeprom.read(2)]) as usize;
        if len > self.arena.himem {
            return Err(Error::OutOfMemory);
        }
        for a in 0..len {
            let b = self.eeprom.read(a + EHEADERSIZE);
            self.arena.write(a, b);
        }
        self.arena.top = len;
        Ok(())
    }

    fn xsave(&mut self) -> Result<()> {
        let filename = self.getfilename(true)?;
        if filename == "!" {
            self.esave()?;
            self.nexttoken()?;
            return Ok(());
        }

        if !self.files.open_out(&filename) {
            self.nexttoken()?;
            return Err(Error::File);
        }
        let oldod = self.od;
        self.od = OFILE;

        // the core list function
        let here2 = self.here;
        self.here = 0;
        self.gettoken()?;
        while self.here < self.arena.top {
            self.outputtoken()?;
            self.gettoken()?;
            if matches!(self.token, Token::LineNumber(_)) {
                self.outcr();
            }
        }
        if self.here == self.arena.top {
            self.outputtoken()?;
        }
        self.outcr();
        self.here = here2;

        self.files.close_out();
        self.od = oldod;
        self.nexttoken()?;
        Ok(())
    }

    fn xload(&mut self) -> Result<()> {
        let filename = self.getfilename(true)?;
        if filename == "!" {
            self.eload()?;
            self.nexttoken()?;
            return Ok(());
        }

        // during a run LOAD chains: the program is replaced, the
        // variables survive, the control stacks do not
        let mut chain = false;
        if self.st == State::Run {
            chain = true;
            self.st = State::Interactive;
            self.arena.top = 0;
            self.clear_gosub();
            self.clear_for();
        }

        let text = std::fs::read_to_string(&filename).map_err(|_| Error::File)?;
        for line in text.lines() {
            self.set_input_line(line);
            self.bi = 0;
            self.nexttoken()?;
            if let Token::Number(n) = self.token {
                self.store_line(to_i(n) as Addr)?;
            }
        }

        if chain {
            self.st = State::Run;
            self.here = 0;
        }
        self.nexttoken()?;
        Ok(())
    }

    pub fn set_input_line(&mut self, line: &str) {
        let bytes = line.as_bytes();
        let n = bytes.len().min(BUFSIZE - 2);
        self.ibuffer = [0; BUFSIZE];
        self.ibuffer[0] = n as u8;
        self.ibuffer[1..1 + n].copy_from_slice(&bytes[..n]);
    }

    fn xget(&mut self) -> Result<()> {
        self.nexttoken()?;
        let oldid = self.id;

        if self.token == Token::Chr(b'&') {
            self.nexttoken()?;
            self.expression()?;
            self.id = to_i(self.pop()?) as u8;
            if self.token != Token::Chr(b',') {
                return Err(Error::Unknown);
            }
            self.nexttoken()?;
        }

        let t = self.token;
        let name = match t {
            Token::Var(n) | Token::ArrayVar(n) | Token::StringVar(n) => n,
            _ => return Err(Error::Unknown),
        };
        let (i, ps) = self.lefthandside(t)?;

        // non blocking, a missing byte reads as zero
        let c = if self.checkch().is_some() { self.inch() } else { 0 };
        self.push(from_i(c as i64))?;
        self.assignnumber(t, name, i, ps)?;

        self.nexttoken()?;
        self.id = oldid;
        Ok(())
    }

    fn xput(&mut self) -> Result<()> {
        self.nexttoken()?;
        let oldod = self.od;

        if self.token == Token::Chr(b'&') {
            self.nexttoken()?;
            self.expression()?;
            self.od = to_i(self.pop()?) as u8;
            if self.token != Token::Chr(b',') {
                return Err(Error::Unknown);
            }
            self.nexttoken()?;
        }

        let args = self.parsearguments()?;
        let mut buf = [0u8; SBUFSIZE];
        for i in (0..args as usize).rev() {
            buf[i] = to_i(self.pop()?) as u8;
        }
        for i in 0..args as usize {
            self.outch(buf[i]);
        }

        self.od = oldod;
        Ok(())
    }

    fn xset(&mut self) -> Result<()> {
        self.nexttoken()?;
        self.parse_n_arguments(2)?;
        let arg = to_i(self.pop()?);
        let fun = to_i(self.pop()?);
        match fun {
            // autorun flag of the EEPROM, 255 clears, 0 program, 1 autorun
            1 => {
                self.eeprom.update(0, arg as u8);
                self.eeprom.flush();
            }
            2 => match arg {
                0 => self.od = OSERIAL,
                1 => self.od = ODSP,
                _ => {}
            },
            3 => match arg {
                0 => {
                    self.odd = OSERIAL;
                    self.od = OSERIAL;
                }
                1 => {
                    self.odd = ODSP;
                    self.od = ODSP;
                }
                _ => {}
            },
            4 => match arg {
                0 => self.id = ISERIAL,
                1 => self.id = IKEYBOARD,
                _ => {}
            },
            5 => match arg {
                0 => {
                    self.idd = ISERIAL;
                    self.id = ISERIAL;
                }
                1 => {
                    self.idd = IKEYBOARD;
                    self.id = IKEYBOARD;
                }
                _ => {}
            },
            _ => {}
        }
        Ok(())
    }

    fn xcatalog(&mut self) -> Result<()> {
        let pattern = self.getfilename(false)?;
        let names = self.files.catalog(&pattern);
        for name in names {
            self.outsc(&name);
            self.outcr();
        }
        self.nexttoken()?;
        Ok(())
    }

    fn xdelete(&mut self) -> Result<()> {
        let name = self.getfilename(false)?;
        if !self.files.remove(&name) {
            self.ert = ONE;
        }
        self.nexttoken()?;
        Ok(())
    }

    fn xopen(&mut self) -> Result<()> {
        let filename = self.getfilename(false)?;
        self.nexttoken()?;
        let mut args = 0;
        if self.token == Token::Chr(b',') {
            self.nexttoken()?;
            args = self.parsearguments()?;
        }
        let mode = match args {
            0 => 0,
            1 => to_i(self.pop()?),
            _ => return Err(Error::Args),
        };
        let ok = if mode == 1 {
            self.files.open_out(&filename)
        } else {
            self.files.open_in(&filename)
        };
        self.ert = if ok { ZERO } else { ONE };
        self.nexttoken()?;
        Ok(())
    }

    fn xclose(&mut self) -> Result<()> {
        self.nexttoken()?;
        self.parse_n_arguments(1)?;
        let mode = to_i(self.pop()?);
        if mode == 1 {
            self.files.close_out();
        } else {
            self.files.close_in();
        }
        self.nexttoken()?;
        Ok(())
    }

    fn xdwrite(&mut self) -> Result<()> {
        self.nexttoken()?;
        self.parse_n_arguments(2)?;
        let v = self.pop()?;
        let p = self.pop()?;
        match to_i(v) {
            0 => self.pins.dwrite(p, false),
            1 => self.pins.dwrite(p, true),
            _ => return Err(Error::Range),
        }
        Ok(())
    }

    fn xawrite(&mut self) -> Result<()> {
        self.nexttoken()?;
        self.parse_n_arguments(2)?;
        let v = to_i(self.pop()?);
        let p = self.pop()?;
        if (0..256).contains(&v) {
            self.pins.awrite(p, v as u8);
            Ok(())
        } else {
            Err(Error::Range)
        }
    }

    fn xpinm(&mut self) -> Result<()> {
        self.nexttoken()?;
        self.parse_n_arguments(2)?;
        let m = to_i(self.pop()?);
        let p = self.pop()?;
        if (0..=2).contains(&m) {
            self.pins.pinm(p, from_i(m));
            Ok(())
        } else {
            Err(Error::Range)
        }
    }

    fn xdelay(&mut self) -> Result<()> {
        self.nexttoken()?;
        self.parse_n_arguments(1)?;
        let t = self.pop()?;
        self.pins.delay(t);
        Ok(())
    }

    fn xtone(&mut self) -> Result<()> {
        self.nexttoken()?;
        let args = self.parsearguments()?;
        if !(2..=3).contains(&args) {
            return Err(Error::Args);
        }
        let (freq, duration) = if args == 3 {
            let d = self.pop()?;
            let f = self.pop()?;
            let _pin = self.pop()?;
            (f, Some(d))
        } else {
            let f = self.pop()?;
            let _pin = self.pop()?;
            (f, None)
        };
        if let Some(speaker) = self.speaker.as_mut() {
            speaker.tone(freq, duration);
        }
        Ok(())
    }
}
