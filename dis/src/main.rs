use std::{
    fs::File,
    io::{self, BufRead, BufReader, BufWriter, Read, Write},
    path::{Path, PathBuf},
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
};

use clap::Parser;
use dis6502::{
    symbols::parse_sym_file, Format, FormatQueue, FormatRequest, Line, Listing, QueueConfig,
    QueueState, Symbols,
};
use signal_hook::{consts, flag};
use termion::color::{Fg, LightBlue, LightMagenta, LightRed, LightYellow, Reset};
use tracing::Level;

#[derive(Parser)]
#[command(version, about, long_about = None)]
struct Args {
    /// Program image, a `.prg` with a load address header unless `--raw`
    input: PathBuf,

    /// Image has no load address header
    #[arg(long)]
    raw: bool,

    /// Load address of a raw image, in hex
    #[arg(long, value_parser = parse_hex, default_value = "0")]
    load_address: u16,

    /// Extra symbol file of `LABEL:ADDR` lines
    #[arg(short, long)]
    sym: Option<PathBuf>,

    /// Reformat before printing, `ADDR:KIND[:LEN]` where KIND is one of
    /// `code`, `byte`, `word`, `bytes` or `text`
    #[arg(short, long = "format", value_parser = parse_request)]
    formats: Vec<FormatRequest>,

    /// Write assembler source here instead of printing the listing
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Start the interactive prompt
    #[arg(short, long)]
    debug: bool,

    /// One of `TRACE`, `DEBUG`, `INFO`, `WARN`, or `ERROR`
    #[arg(short, long, default_value_t = Level::INFO)]
    log_level: Level,
}

fn main() -> Result<(), ()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_max_level(args.log_level)
        .with_writer(io::stderr)
        .init();

    let mut data = Vec::new();
    File::open(&args.input)
        .map_err(|e| tracing::error!("failed to open input file: {e}"))?
        .read_to_end(&mut data)
        .map_err(|e| tracing::error!("failed to read input file: {e}"))?;

    let mut symbols = Symbols::c64();
    if let Some(sym) = &args.sym {
        let sym_file =
            File::open(sym).map_err(|e| tracing::error!("failed to open SYM file: {e}"))?;
        let extra = parse_sym_file(BufReader::new(sym_file)).map_err(|e| {
            tracing::error!("failed to parse SYM file: {}:{e}", sym.display())
        })?;
        symbols.extend_builtins(extra);
    }

    let mut listing = Listing::new(symbols);
    listing
        .load(data, args.raw, args.load_address)
        .map_err(|e| tracing::error!("{}: {e}", args.input.display()))?;

    let mut queue = FormatQueue::new(listing, QueueConfig::default());
    if !args.formats.is_empty() {
        queue.enqueue_all(args.formats.iter().copied());
        queue.flush();
        report_faults(&queue);
    }

    let name = args
        .input
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| args.input.display().to_string());

    if args.debug {
        queue.start();
        prompt(&mut queue, &name)?;
        queue.stop();
    }

    match &args.output {
        Some(path) => write_source(&queue, path, &name)?,
        None if !args.debug => {
            let engine = queue.lock();
            let listing = engine.listing();
            for line in listing.visible_lines() {
                print_line(line);
            }
            print_violation(listing);
        }
        None => {}
    }

    Ok(())
}

fn prompt(queue: &mut FormatQueue, name: &str) -> Result<(), ()> {
    let quit = Arc::new(AtomicBool::new(false));
    for signal in [consts::SIGINT, consts::SIGTERM] {
        // a second signal while the first is pending exits right away
        flag::register_conditional_shutdown(signal, 1, quit.clone())
            .and_then(|_| flag::register(signal, quit.clone()))
            .map_err(|e| tracing::warn!("failed to install signal handler: {e}"))
            .ok();
    }

    let stdin = io::stdin();
    let mut cached_parts = Vec::new();
    let mut cursor = 0;
    list(queue, &mut cursor, None, None);
    while !quit.load(Ordering::Relaxed) {
        report_faults(queue);
        print!("dis>");
        io::stdout()
            .flush()
            .map_err(|e| tracing::error!("failed to write prompt: {e}"))?;

        let mut line = String::new();
        match stdin.lock().read_line(&mut line) {
            Ok(0) => break,
            Ok(_) => {}
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => {
                tracing::error!("failed to read command: {e}");
                return Err(());
            }
        }

        let parts = line
            .split_whitespace()
            .map(String::from)
            .collect::<Vec<String>>();
        let parts = if parts.is_empty() {
            cached_parts.clone()
        } else {
            cached_parts = parts.clone();
            parts
        };
        if parts.is_empty() {
            continue;
        }
        let args = parts[1..].iter().map(String::as_str).collect::<Vec<_>>();
        match parts[0].as_str() {
            "q" => break,
            "l" => list(queue, &mut cursor, args.first().copied(), args.get(1).copied()),
            "f" => format_one(queue, &args),
            "s" => format_selection(queue, &args),
            "g" => goto(queue, &mut cursor, args.first().copied()),
            "y" => print_symbols(queue),
            "p" => {
                queue.pause();
                println!("worker paused");
            }
            "r" => {
                queue.start();
                println!("worker running");
            }
            "w" => match args.first() {
                Some(path) => match write_source(queue, Path::new(path), name) {
                    Ok(()) => println!("wrote {path}"),
                    Err(()) => println!("failed to write {path}"),
                },
                None => println!("missing file name"),
            },
            "?" => print_help(),
            _ => println!("unknown command: `{}`. type `?` for help", parts[0]),
        }
    }
    if quit.load(Ordering::Relaxed) {
        println!();
        tracing::info!("interrupted");
    }
    Ok(())
}

fn list(queue: &FormatQueue, cursor: &mut usize, start: Option<&str>, count: Option<&str>) {
    let engine = queue.lock();
    let listing = engine.listing();
    if let Some(arg) = start {
        match parse_addr(listing, arg) {
            Ok(addr) => match listing.row_containing(addr) {
                Some(row) => *cursor = row,
                None => {
                    println!("${addr:04X} is outside the image");
                    return;
                }
            },
            Err(e) => {
                println!("error parsing start address: {e}");
                return;
            }
        }
    }
    let count = match count.map(str::parse::<usize>) {
        Some(Ok(count)) => count,
        Some(Err(e)) => {
            println!("error parsing line count: {e}");
            return;
        }
        None => 20,
    };
    let lines = listing.visible_lines();
    if *cursor >= lines.len() {
        *cursor = 0;
    }
    let end = (*cursor + count).min(lines.len());
    for line in &lines[*cursor..end] {
        print_line(line);
    }
    *cursor = end;
    print_violation(listing);
}

fn print_violation(listing: &Listing) {
    if let Some(err) = listing.violation() {
        println!("{}listing hidden: {err}{}", Fg(LightRed), Fg(Reset));
    }
}

fn format_one(queue: &FormatQueue, args: &[&str]) {
    let (Some(addr), Some(kind)) = (args.first(), args.get(1)) else {
        println!("usage: f ADDR KIND [LEN]");
        return;
    };
    let address = match parse_addr(queue.lock().listing(), addr) {
        Ok(address) => address,
        Err(e) => {
            println!("error parsing address: {e}");
            return;
        }
    };
    let format = match parse_format(kind, args.get(2).copied()) {
        Ok(format) => format,
        Err(e) => {
            println!("{e}");
            return;
        }
    };
    queue.enqueue(FormatRequest { address, format });
    wait(queue);
}

fn format_selection(queue: &FormatQueue, args: &[&str]) {
    let (Some(from), Some(to), Some(kind)) = (args.first(), args.get(1), args.get(2)) else {
        println!("usage: s FROM TO KIND [LEN]");
        return;
    };
    let format = match parse_format(kind, args.get(3).copied()) {
        Ok(format) => format,
        Err(e) => {
            println!("{e}");
            return;
        }
    };
    let requests = {
        let engine = queue.lock();
        let listing = engine.listing();
        let rows = [from, to].map(|arg| {
            parse_addr(listing, arg)
                .ok()
                .and_then(|addr| listing.row_containing(addr))
        });
        let [Some(first), Some(last)] = rows else {
            println!("selection must lie inside the image");
            return;
        };
        let rows = (first.min(last)..=first.max(last)).collect::<Vec<_>>();
        listing.plan_selection(&rows, format)
    };
    println!("{} requests queued", requests.len());
    queue.enqueue_all(requests);
    wait(queue);
}

fn wait(queue: &FormatQueue) {
    if queue.state() == QueueState::Paused {
        println!("{} requests pending", queue.pending());
    } else {
        queue.flush();
    }
}

fn goto(queue: &FormatQueue, cursor: &mut usize, arg: Option<&str>) {
    let Some(arg) = arg else {
        println!("usage: g ADDR | g #LINE");
        return;
    };
    let engine = queue.lock();
    let listing = engine.listing();
    let row = match arg.strip_prefix('#') {
        Some(number) => match number.parse::<usize>() {
            Ok(number) if (1..=listing.len()).contains(&number) => Some(number - 1),
            Ok(number) => {
                println!("line {number} is out of range");
                None
            }
            Err(e) => {
                println!("error parsing line number: {e}");
                None
            }
        },
        None => match parse_addr(listing, arg) {
            Ok(addr) => listing.row_containing(addr).or_else(|| {
                println!("${addr:04X} is outside the image");
                None
            }),
            Err(e) => {
                println!("error parsing address: {e}");
                None
            }
        },
    };
    if let Some(row) = row {
        *cursor = row;
        if let Some(line) = listing.visible_lines().get(row) {
            print_line(line);
        }
    }
}

fn print_symbols(queue: &FormatQueue) {
    let engine = queue.lock();
    for line in engine.listing().external_symbols() {
        println!("{}{line}{}", Fg(LightBlue), Fg(Reset));
    }
}

fn report_faults(queue: &FormatQueue) {
    for fault in queue.take_faults() {
        println!("{}error: {fault}{}", Fg(LightRed), Fg(Reset));
    }
}

fn write_source(queue: &FormatQueue, path: &Path, name: &str) -> Result<(), ()> {
    let file = File::create(path)
        .map_err(|e| tracing::error!("failed to create {}: {e}", path.display()))?;
    let mut out = BufWriter::new(file);
    queue
        .lock()
        .listing()
        .write_source(&mut out, name)
        .map_err(|e| tracing::error!("failed to write {}: {e}", path.display()))?;
    out.flush()
        .map_err(|e| tracing::error!("failed to write {}: {e}", path.display()))?;
    tracing::info!("wrote {}", path.display());
    Ok(())
}

fn print_line(line: &Line) {
    if !line.label.is_empty() {
        println!("{}{}:{}", Fg(LightBlue), line.label, Fg(Reset));
    }
    let operand = if line.unresolved {
        Fg(LightRed).to_string()
    } else {
        Fg(LightMagenta).to_string()
    };
    println!(
        "{:>5}  {}{:04X}{}  {:<9} {operand}{}{}",
        line.row + 1,
        Fg(LightYellow),
        line.address,
        Fg(Reset),
        line.bytes,
        line.operand,
        Fg(Reset),
    );
}

fn print_help() {
    println!("commands:");
    println!("`l [addr] [n]`: list n lines (default 20)");
    println!("`f addr kind [len]`: reformat the line at addr");
    println!("`s from to kind [len]`: reformat every line from..to");
    println!("`g addr` or `g #line`: go to an address or line number");
    println!("`y`: show referenced symbols");
    println!("`p`: pause the format worker");
    println!("`r`: resume the format worker");
    println!("`w file`: write assembler source");
    println!("`?`: show this help info");
    println!("`q`: quit");
    println!("kinds: `code`, `byte`, `word`, `bytes`, `text`");
}

fn parse_hex(arg: &str) -> Result<u16, String> {
    u16::from_str_radix(arg.trim_start_matches('$'), 16).map_err(|e| format!("{arg}: {e}"))
}

fn parse_addr(listing: &Listing, arg: &str) -> Result<u16, String> {
    match parse_hex(arg) {
        Ok(addr) => Ok(addr),
        Err(e) => listing.symbols().address_of(arg).ok_or(e),
    }
}

fn parse_format(kind: &str, len: Option<&str>) -> Result<Format, String> {
    let len = match len {
        Some(len) => len
            .parse::<usize>()
            .map_err(|e| format!("error parsing length: {e}"))?,
        None => 1,
    };
    match kind {
        "c" | "code" | "opcode" => Ok(Format::Opcode),
        "b" | "byte" => Ok(Format::Byte),
        "w" | "word" => Ok(Format::Word),
        "m" | "bytes" => Ok(Format::MultiByte(len)),
        "t" | "text" => Ok(Format::Text(len)),
        _ => Err(format!("unknown format `{kind}`")),
    }
}

fn parse_request(arg: &str) -> Result<FormatRequest, String> {
    let mut parts = arg.splitn(3, ':');
    let (Some(addr), Some(kind)) = (parts.next(), parts.next()) else {
        return Err(format!("{arg}: expected ADDR:KIND[:LEN]"));
    };
    Ok(FormatRequest {
        address: parse_hex(addr)?,
        format: parse_format(kind, parts.next())?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_requests() {
        assert_eq!(
            parse_request("0810:text:12"),
            Ok(FormatRequest {
                address: 0x0810,
                format: Format::Text(12)
            })
        );
        assert_eq!(
            parse_request("$C000:w"),
            Ok(FormatRequest {
                address: 0xC000,
                format: Format::Word
            })
        );
        assert!(parse_request("0810").is_err());
        assert!(parse_request("0810:float").is_err());
        assert!(parse_request("0810:bytes:x").is_err());
    }
}
