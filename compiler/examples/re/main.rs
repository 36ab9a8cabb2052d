use std::io::{self, BufRead, Write};

use regexpr_compiler::compile_with_dialect;
use regexpr_compiler::syntax::{Dialect, SyntaxFlags};
use regexpr_runtime::syntax::casefold_table;
use regexpr_runtime::{search, CompiledPattern};

mod logger;

const USAGE: &str = "re [--debug] [--ignore-case] [--syntax emacs|awk|egrep|grep|BITS] PATTERN";

struct Args {
    debug: bool,
    ignore_case: bool,
    syntax: SyntaxFlags,
    pattern: String,
}

fn parse_syntax(name: &str) -> Result<SyntaxFlags, String> {
    match name {
        "emacs" => Ok(SyntaxFlags::EMACS),
        "awk" => Ok(SyntaxFlags::AWK),
        "egrep" => Ok(SyntaxFlags::EGREP),
        "grep" => Ok(SyntaxFlags::GREP),
        bits => bits
            .parse::<u32>()
            .map(SyntaxFlags::from_bits)
            .map_err(|_| format!("unknown syntax: {}\n{}", bits, USAGE)),
    }
}

fn parse_args() -> Result<Args, String> {
    let mut debug = false;
    let mut ignore_case = false;
    let mut syntax = SyntaxFlags::EGREP;
    let mut positional = vec![];

    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--debug" | "-d" => debug = true,
            "--ignore-case" | "-i" => ignore_case = true,
            "--syntax" | "-s" => {
                let name = args.next().ok_or_else(|| USAGE.to_string())?;
                syntax = parse_syntax(&name)?;
            }
            _ => positional.push(arg),
        }
    }

    match positional.as_slice() {
        [pattern] => Ok(Args {
            debug,
            ignore_case,
            syntax,
            pattern: pattern.clone(),
        }),
        _ => Err(USAGE.to_string()),
    }
}

fn main() -> Result<(), String> {
    let args = parse_args()?;

    if args.debug {
        logger::Logger::init().map_err(|e| e.to_string())?;
        log::set_max_level(log::LevelFilter::Debug);
    }

    let mut pattern = CompiledPattern::new();
    if args.ignore_case {
        pattern.set_translate(Some(casefold_table()));
    }
    compile_with_dialect(
        args.pattern.as_bytes(),
        &Dialect::new(args.syntax),
        &mut pattern,
    )
    .map_err(|e| e.to_string())?;

    if args.debug {
        eprintln!(
            "DEBUG
--------
{}--------
",
            pattern.disassemble()
        )
    }

    let stdout = io::stdout();
    let mut out = stdout.lock();
    for line in io::stdin().lock().split(b'\n') {
        let line = line.map_err(|e| e.to_string())?;
        let found = search(&pattern, &line, 0, line.len() as isize, None)
            .map_err(|e| e.to_string())?;

        if found.is_some() {
            out.write_all(&line)
                .and_then(|_| out.write_all(b"\n"))
                .map_err(|e| e.to_string())?;
        }
    }

    Ok(())
}
