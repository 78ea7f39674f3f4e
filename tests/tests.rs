use std::cell::RefCell;
use std::env;
use std::fs;
use std::rc::Rc;
use tinybas::devices::{BufConsole, Printer, ISERIAL, OSERIAL};
use tinybas::display::Display;
use tinybas::eeprom::MemEeprom;
use tinybas::memory::Arena;
use tinybas::num::{parse_number, write_number};
use tinybas::pins::NullPins;
use tinybas::tokens::{Name, ARRAYVAR, STRINGVAR, VARIABLE};
use tinybas::{Basic, Configuration};

const MEMSIZE: usize = 60000;
const EEPROMSIZE: usize = 2048;

fn machine_with(script: &str, rows: usize, cols: usize) -> (Basic, Rc<RefCell<Vec<u8>>>) {
    let (console, output) = BufConsole::new(script);
    let config = Configuration {
        memsize: MEMSIZE,
        console: Box::new(console),
        eeprom: Box::new(MemEeprom::new(EEPROMSIZE)),
        printer: Printer::none(),
        pins: Box::new(NullPins),
        display_rows: rows,
        display_cols: cols,
        display_screen: false,
        sound: false,
        default_input: ISERIAL,
        default_output: OSERIAL,
    };
    (Basic::new(config), output)
}

fn run_script(script: &str) -> String {
    let (mut basic, output) = machine_with(script, 0, 0);
    basic.run();
    let captured = output.borrow().clone();
    String::from_utf8_lossy(&captured).into_owned()
}

fn run_script_with_display(script: &str) -> String {
    let (mut basic, output) = machine_with(script, 4, 10);
    basic.run();
    let captured = output.borrow().clone();
    String::from_utf8_lossy(&captured).into_owned()
}

// everything after the prompt for the n-th typed line
fn reply(out: &str, n: usize) -> String {
    let body = match out.find("> ") {
        Some(i) => &out[i..],
        None => out,
    };
    let parts: Vec<&str> = body.split("> ").collect();
    parts.get(n + 1).copied().unwrap_or("").to_string()
}

#[test]
fn greets_and_reports_memory() {
    let out = run_script("");
    assert!(out.starts_with("Tinybas 0.1 60000 2048\n"));
}

#[test]
fn counts_with_for_next() {
    let out = run_script("10 FOR I=1 TO 3\n20 PRINT I\n30 NEXT I\nRUN\n");
    assert!(out.contains("1\n2\n3\n"));
}

#[test]
fn gosub_returns() {
    let out = run_script(
        "10 A=5\n20 GOSUB 100\n30 PRINT A\n40 END\n100 A=A*2\n110 RETURN\nRUN\n",
    );
    assert!(out.contains("10\n"));
}

#[test]
fn dim_array_squares() {
    let out = run_script(
        "10 DIM A(5)\n20 FOR I=1 TO 5\n30 A(I)=I*I\n40 NEXT I\n50 PRINT A(3)\nRUN\n",
    );
    assert!(out.contains("9\n"));
}

#[test]
fn string_splice() {
    let out = run_script(
        "10 DIM S$(20)\n20 S$=\"HELLO\"\n30 S$(6)=\" WORLD\"\n40 PRINT S$\nRUN\n",
    );
    assert!(out.contains("HELLO WORLD\n"));
}

#[test]
fn if_then_jumps() {
    let out = run_script(
        "10 IF 3>2 THEN 40\n20 PRINT \"NO\"\n30 END\n40 PRINT \"YES\"\nRUN\n",
    );
    assert!(out.contains("YES\n"));
    assert!(!out.contains("NO\n"));
}

#[test]
fn conditional_loop() {
    let out = run_script("10 A=0\n20 A=A+1\n30 IF A<3 THEN 20\n40 PRINT A\nRUN\n");
    assert!(out.contains("3\n"));
}

#[test]
fn input_reads_numbers() {
    let out = run_script("10 INPUT A\n20 PRINT A*2\nRUN\n21\n");
    assert!(out.contains("? "));
    assert!(out.contains("42\n"));
}

#[test]
fn input_reprompts_on_bad_number() {
    let out = run_script("10 INPUT A\n20 PRINT A\nRUN\nXY\n7\n");
    assert!(out.contains("Number Error\n"));
    assert!(out.contains("7\n"));
}

#[test]
fn editor_keeps_lines_sorted() {
    let out = run_script("30 PRINT 3\n10 PRINT 1\n20 PRINT 2\nLIST\n");
    assert!(out.contains("10 PRINT 1\n20 PRINT 2\n30 PRINT 3\n"));
}

#[test]
fn editor_replaces_and_deletes() {
    let out =
        run_script("10 PRINT 1\n20 PRINT 2\n30 PRINT 3\n20 PRINT 5\n10\nLIST\n");
    assert!(out.contains("20 PRINT 5\n30 PRINT 3\n"));
    assert!(!out.contains("10 PRINT 1"));
    assert!(!out.contains("20 PRINT 2"));
}

#[test]
fn editor_grows_and_shrinks_lines() {
    let out = run_script(
        "10 PRINT 1\n20 PRINT 2\n10 PRINT 111+222+333\n10 PRINT 9\nLIST\n",
    );
    assert!(out.contains("10 PRINT 9\n20 PRINT 2\n"));
}

#[test]
fn list_single_line_without_blank() {
    let out = run_script("10 PRINT 1\n20 PRINT 2\n30 PRINT 3\nLIST 20\n");
    let listing = reply(&out, 3);
    assert_eq!(listing, "20 PRINT 2\n");
}

#[test]
fn listing_normalizes_case_and_digraphs() {
    let out = run_script("10 if a<=3 then 20\nLIST\n");
    assert!(out.contains("10 IF A<=3 THEN 20"));
}

#[test]
fn new_is_idempotent() {
    let probe = "PRINT SIZE, USR(1,0), USR(1,2), USR(1,3)\n";
    let script = format!(
        "10 DIM A(5)\n20 B=1\nRUN\nNEW\n{}NEW\n{}",
        probe, probe
    );
    let out = run_script(&script);
    let first = reply(&out, 4);
    let second = reply(&out, 6);
    assert!(!first.is_empty());
    assert_eq!(first, second);
}

#[test]
fn assignment_is_idempotent() {
    let out = run_script(
        "10 A=5\n20 A=A\n30 PRINT A\n40 DIM S$(10)\n50 S$=\"AB\"\n60 S$=S$\n70 PRINT S$\nRUN\n",
    );
    assert!(out.contains("5\nAB\n"));
}

#[test]
fn string_overlap_copies_are_safe() {
    let out = run_script(
        "10 DIM S$(20)\n20 S$=\"ABCDEF\"\n30 S$(2)=S$(1,5)\n40 PRINT S$\nRUN\n",
    );
    assert!(out.contains("AABCDE\n"));

    let out = run_script(
        "10 DIM S$(20)\n20 S$=\"ABCDEF\"\n30 S$(1)=S$(2)\n40 PRINT S$\nRUN\n",
    );
    assert!(out.contains("BCDEFF\n"));
}

#[test]
fn operand_stack_balances_at_statement_end() {
    let out = run_script("10 A=1+2*3\n20 PRINT USR(1,9)\nRUN\n");
    assert!(out.contains("0\n"));
}

#[test]
fn memory_conservation_after_statements() {
    let out = run_script(
        "10 DIM A(10)\n20 DIM S$(10)\n30 C1=1\n40 PRINT USR(1,2)-USR(1,0)\n50 PRINT USR(1,3)\nRUN\n",
    );
    // top stays below himem and three objects live on the heap
    let free = reply(&out, 5);
    let mut lines = free.lines();
    let gap: i64 = lines.next().unwrap_or("0").trim().parse().unwrap_or(-1);
    let nvars: i64 = lines.next().unwrap_or("0").trim().parse().unwrap_or(-1);
    assert!(gap > 0);
    assert_eq!(nvars, 3);
}

#[test]
fn precedence_and_logic() {
    let out = run_script(
        "PRINT 2+3*4\nPRINT (2+3)*4\nPRINT 10%3\nPRINT -5+10\nPRINT NOT 0\nPRINT 1 AND 0\nPRINT 1 OR 0\nPRINT 3>=3\nPRINT 2<>2\n",
    );
    assert_eq!(reply(&out, 0), "14\n");
    assert_eq!(reply(&out, 1), "20\n");
    assert_eq!(reply(&out, 2), "1\n");
    assert_eq!(reply(&out, 3), "5\n");
    assert_eq!(reply(&out, 4), "1\n");
    assert_eq!(reply(&out, 5), "0\n");
    assert_eq!(reply(&out, 6), "1\n");
    assert_eq!(reply(&out, 7), "1\n");
    assert_eq!(reply(&out, 8), "0\n");
}

#[test]
fn string_comparison() {
    let out = run_script(
        "10 DIM A$(10)\n20 A$=\"AB\"\n30 IF A$=\"AB\" THEN PRINT \"EQ\"\n40 IF A$<>\"CD\" THEN PRINT \"NE\"\nRUN\n",
    );
    assert!(out.contains("EQ\n"));
    assert!(out.contains("NE\n"));
}

#[test]
fn builtin_functions() {
    let out = run_script(
        "PRINT ABS(0-5)\nPRINT SGN(0-3)\nPRINT SQR(16)\nPRINT LEN(\"HELLO\")\nPRINT FRE(0-1)\nPRINT LOMEM\n",
    );
    assert_eq!(reply(&out, 0), "5\n");
    assert_eq!(reply(&out, 1), "-1\n");
    assert_eq!(reply(&out, 2), "4\n");
    assert_eq!(reply(&out, 3), "5\n");
    assert_eq!(reply(&out, 4), "2048\n");
    assert_eq!(reply(&out, 5), "0\n");
}

#[test]
fn random_generator_is_reproducible() {
    let out = run_script("PRINT RND(10)\nPRINT RND(10)\n");
    assert_eq!(reply(&out, 0), "1\n");
    assert_eq!(reply(&out, 1), "2\n");

    let out = run_script("PRINT RND(0-10)\n");
    assert_eq!(reply(&out, 0), "0\n");
}

#[test]
fn print_field_width() {
    let out = run_script("PRINT #5, 42\n");
    assert_eq!(reply(&out, 0), "   42\n");
}

#[test]
fn tab_emits_spaces() {
    let out = run_script("TAB 3: PRINT \"X\"\n");
    assert_eq!(reply(&out, 0), "   X\n");
}

#[test]
fn peek_and_poke() {
    let out = run_script("POKE 100, 65\nPRINT PEEK(100)\nPOKE 0-1, 7\nPRINT PEEK(0-1)\n");
    assert_eq!(reply(&out, 1), "65\n");
    assert_eq!(reply(&out, 3), "7\n");
}

#[test]
fn special_variables() {
    let out = run_script("PRINT @I, @O\n@R=99\nPRINT @R\n");
    assert_eq!(reply(&out, 0), "1 1\n");
    assert_eq!(reply(&out, 2), "99\n");
}

#[test]
fn trappable_error_on_failed_open() {
    let out = run_script("OPEN \"no-such-file-here\", 0\nPRINT @S\n");
    assert_eq!(reply(&out, 1), "1\n");
}

#[test]
fn display_buffer_and_cursor() {
    let out = run_script_with_display(
        "SET 2,1: PRINT \"HI\";: SET 2,0\nPRINT @D(1), @D(2), @X, @Y\n",
    );
    assert!(out.contains("72 73 2 0\n"));
}

#[test]
fn divide_by_zero_reports() {
    let out = run_script("PRINT 1/0\n");
    assert!(out.contains("Div by 0 Error\n"));
}

#[test]
fn goto_missing_line_reports() {
    let out = run_script("10 GOTO 100\nRUN\n");
    assert!(out.contains("Unknown Line Error\n"));
}

#[test]
fn return_underflow_reports() {
    let out = run_script("RETURN\n");
    assert!(out.contains("Return Error\n"));
}

#[test]
fn next_underflow_reports() {
    let out = run_script("NEXT\n");
    assert!(out.contains("FOR Error\n"));
}

#[test]
fn array_bounds_report_range() {
    let out = run_script("10 DIM A(5)\n20 A(0)=1\nRUN\n");
    assert!(out.contains("Range Error\n"));

    let out = run_script("10 DIM A(5)\n20 A(6)=1\nRUN\n");
    assert!(out.contains("Range Error\n"));
}

#[test]
fn dim_beyond_memory_reports() {
    let out = run_script("10 DIM A(60000)\nRUN\n");
    assert!(out.contains("Memory Error\n"));
}

#[test]
fn string_capacity_overflow_reports() {
    let out = run_script("10 DIM S$(5)\n20 S$=\"TOOLONG\"\nRUN\n");
    assert!(out.contains("Range Error\n"));
}

#[test]
fn error_reports_carry_the_line_number() {
    let out = run_script("10 A=1\n20 PRINT 1/0\nRUN\n");
    assert!(out.contains("20: Div by 0 Error\n"));
}

#[test]
fn gosub_depth_is_bounded() {
    let out = run_script("10 GOSUB 10\nRUN\n");
    assert!(out.contains("GOSUB Error\n"));
}

#[test]
fn break_character_stops_a_run() {
    let out = run_script("10 A=0\n20 A=A+1\n30 GOTO 20\nRUN\n#\n");
    assert!(out.starts_with("Tinybas"));
}

#[test]
fn step_loops_and_break_statement() {
    let out = run_script(
        "10 FOR I=10 TO 1 STEP 0-3\n20 PRINT I\n30 NEXT\nRUN\n",
    );
    assert!(out.contains("10\n7\n4\n1\n"));

    let out = run_script(
        "10 FOR I=1 TO 5\n20 IF I=3 THEN BREAK\n30 PRINT I\n40 NEXT\n50 PRINT \"DONE\"\nRUN\n",
    );
    assert!(out.contains("1\n2\n"));
    assert!(out.contains("DONE\n"));
    assert!(!out.contains("3\n4\n"));
}

#[test]
fn for_skips_when_initially_false() {
    let out = run_script("10 FOR I=5 TO 1\n20 PRINT I\n30 NEXT\n40 PRINT \"OUT\"\nRUN\n");
    assert!(out.contains("OUT\n"));
    assert!(!out.contains("5\n"));
}

#[test]
fn get_and_put_move_raw_bytes() {
    let out = run_script("PUT 65, 66\n");
    assert!(reply(&out, 0).starts_with("AB"));

    let out = run_script("GET A: PRINT A\nX\n");
    assert!(out.contains("88\n"));
}

#[test]
fn usr_exposes_interpreter_constants() {
    let out = run_script(
        "PRINT USR(0,0)\nPRINT USR(0,4)\nPRINT USR(0,5)\nPRINT USR(0,6)\nPRINT USR(0,9)\nPRINT USR(9,0)\n",
    );
    assert_eq!(reply(&out, 0), "4\n");
    assert_eq!(reply(&out, 1), "2\n");
    assert_eq!(reply(&out, 2), "60000\n");
    assert_eq!(reply(&out, 3), "2048\n");
    assert_eq!(reply(&out, 4), "15\n");
    assert_eq!(reply(&out, 5), "0\n");
}

#[test]
fn save_and_load_roundtrip() {
    let path = env::temp_dir().join("tinybas_roundtrip.bas");
    let path_str = path.to_string_lossy().into_owned();
    let _ = fs::remove_file(&path);

    let program = "10 DIM S$(10)\n20 S$=\"HI\"\n30 FOR I=1 TO 2\n40 PRINT S$, I\n50 NEXT I\n";
    let first = run_script(&format!("{}LIST\n", program));
    let listing = reply(&first, 5);

    let second = run_script(&format!(
        "{}SAVE \"{}\"\nNEW\nLOAD \"{}\"\nLIST\n",
        program, path_str, path_str
    ));
    let reloaded = reply(&second, 8);

    assert!(!listing.is_empty());
    assert_eq!(listing, reloaded);
    let _ = fs::remove_file(&path);
}

#[test]
fn eeprom_image_roundtrip() {
    let out = run_script(
        "10 PRINT 7\nSAVE \"!\"\nNEW\nLOAD \"!\"\nLIST\nRUN\n",
    );
    assert!(out.contains("10 PRINT 7"));
    assert!(out.contains("7\n"));
}

#[test]
fn load_chains_during_a_run() {
    let path = env::temp_dir().join("tinybas_chain.bas");
    let path_str = path.to_string_lossy().into_owned();
    fs::write(&path, "10 PRINT B\n").unwrap();

    let out = run_script(&format!(
        "10 B=42\n20 LOAD \"{}\"\nRUN\n",
        path_str
    ));
    // the chained program runs with the old variables intact
    assert!(out.contains("42\n"));
    let _ = fs::remove_file(&path);
}

#[test]
fn stopped_programs_continue() {
    let out = run_script("10 PRINT 1\n20 STOP\n30 PRINT 2\nRUN\nCONT\n");
    assert!(out.contains("1\n"));
    assert!(out.contains("2\n"));
}

#[test]
fn arena_heap_layout() {
    let mut arena = Arena::new(1000);
    let a = arena.alloc(VARIABLE, Name::new(b'A', b'1'), 0).unwrap();
    arena.write_num(a, 7 as tinybas::num::Num);

    // trailer: name bytes then the tag at the high end
    assert_eq!(arena.read(999), b'A');
    assert_eq!(arena.read(998), b'1');
    assert_eq!(arena.read(997) as i8, VARIABLE);

    let obj = arena.find(VARIABLE, Name::new(b'A', b'1')).unwrap();
    assert_eq!(obj.addr, a);
    assert_eq!(obj.len, tinybas::num::NUMSIZE);
    assert_eq!(arena.read_num(obj.addr), 7 as tinybas::num::Num);

    arena.alloc(ARRAYVAR, Name::new(b'B', 0), 3).unwrap();
    arena.alloc(STRINGVAR, Name::new(b'C', 0), 12).unwrap();
    assert_eq!(arena.length(ARRAYVAR, Name::new(b'B', 0)), 3 * tinybas::num::NUMSIZE);
    assert_eq!(arena.length(STRINGVAR, Name::new(b'C', 0)), 12);

    assert_eq!(arena.nvars, 3);
    assert_eq!(arena.walk_objects(), arena.nvars);
    assert!(arena.find(VARIABLE, Name::new(b'Z', 0)).is_none());

    // redefinition is refused
    assert!(arena.alloc(ARRAYVAR, Name::new(b'B', 0), 3).is_err());
}

#[test]
fn arena_block_moves() {
    let mut arena = Arena::new(100);
    for i in 0..10 {
        arena.write(i, i as u8);
    }
    arena.top = 10;
    arena.move_block(0, 10, 5).unwrap();
    for i in 0..10 {
        assert_eq!(arena.read(5 + i), i as u8);
    }
    assert!(arena.move_block(0, 10, 95).is_err());
}

#[test]
fn display_vt52_cursor_motion() {
    let mut d = Display::new(4, 10, false);
    for &c in b"HELLO" {
        d.write(c);
    }
    assert_eq!((d.col, d.row), (5, 0));
    assert_eq!(d.get_cell(0), b'H');

    // ESC Y row col addresses the cursor
    d.write(27);
    d.write(b'Y');
    d.write(31 + 2);
    d.write(31 + 3);
    assert_eq!((d.col, d.row), (3, 2));

    // cursor down wraps
    d.write(27);
    d.write(b'B');
    assert_eq!(d.row, 3);
    d.write(27);
    d.write(b'B');
    assert_eq!(d.row, 0);

    d.write(12);
    assert_eq!((d.col, d.row), (0, 0));
    assert_eq!(d.get_cell(0), 0);
}

#[test]
fn display_scrolls_off_the_top() {
    let mut d = Display::new(2, 4, false);
    for &c in b"AAAA" {
        d.write(c);
    }
    for &c in b"BBBB" {
        d.write(c);
    }
    // the second row is full, the next character scrolls
    for &c in b"C" {
        d.write(c);
    }
    assert_eq!(d.get_cell(0), b'B');
    assert_eq!(d.get_cell(4), b'C');
}

#[test]
fn number_formatting() {
    assert_eq!(write_number(0 as tinybas::num::Num), "0");
    assert_eq!(write_number(12345 as tinybas::num::Num), "12345");
    assert_eq!(write_number(-7 as tinybas::num::Num), "-7");
    assert_eq!(parse_number(b"123A"), (123 as tinybas::num::Num, 3));
    assert_eq!(parse_number(b""), (0 as tinybas::num::Num, 0));
}
