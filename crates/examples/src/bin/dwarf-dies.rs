// Allow clippy lints when building without clippy.
#![allow(unknown_lints)]

use dwarf_dies::loader::{ObjectSession, SessionArenas};
use dwarf_dies::symtab::{select_quick_symbols, SymbolDomain};
use dwarf_dies::units::{DwarfContext, QueueItem, UnitProcessor};
use dwarf_dies::{DieId, DieTree, Options, Reader};
use std::env;
use std::io::{self, BufWriter, Write};
use std::path::Path;
use std::process;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Default)]
struct Flags {
    units: bool,
    dies: bool,
    psymtabs: bool,
    symbols: Vec<String>,
    matching: Vec<String>,
    complete: bool,
    addresses: Vec<u64>,
}

/// Prints each unit as it is expanded, with its dies if asked.
struct Printer<W: Write> {
    w: W,
    dies: bool,
}

impl<W: Write, R: Reader> UnitProcessor<R> for Printer<W> {
    fn process_unit(
        &mut self,
        ctx: &mut DwarfContext<'_, R>,
        item: QueueItem,
    ) -> dwarf_dies::Result<()> {
        let state = match ctx.state(item.unit) {
            Some(state) => state,
            None => return Ok(()),
        };
        writeln!(
            self.w,
            "expanded unit {} at {:?}: {} ({})",
            item.unit.0,
            state.header().offset(),
            state.name().unwrap_or("<unnamed>"),
            state.language(),
        )?;
        if self.dies {
            if let Some(tree) = state.dies() {
                if let Some(root) = tree.root() {
                    print_die(&mut self.w, tree, root, 1)?;
                }
            }
        }
        Ok(())
    }
}

fn print_die<W: Write, R: Reader>(
    w: &mut W,
    tree: &DieTree<R>,
    id: DieId,
    depth: usize,
) -> io::Result<()> {
    let die = tree.get(id);
    writeln!(
        w,
        "{:indent$}<0x{:08x}> {}",
        "",
        die.offset().0,
        die.tag(),
        indent = depth * 2
    )?;
    for attr in die.attrs() {
        writeln!(
            w,
            "{:indent$}{}: {:?}",
            "",
            attr.name(),
            attr.value(),
            indent = depth * 2 + 4
        )?;
    }
    for (child, _) in tree.children(id) {
        print_die(w, tree, child, depth + 1)?;
    }
    Ok(())
}

fn print_usage(opts: &getopts::Options) -> ! {
    let brief = format!(
        "Usage: {} <options> <file>",
        env::args().next().unwrap_or_else(|| "dwarf-dies".into())
    );
    write!(&mut io::stderr(), "{}", opts.usage(&brief)).ok();
    process::exit(1);
}

fn parse_address(s: &str) -> Option<u64> {
    match s.strip_prefix("0x") {
        Some(hex) => u64::from_str_radix(hex, 16).ok(),
        None => s.parse().ok(),
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let mut opts = getopts::Options::new();
    opts.optflag("u", "units", "list every unit and whether it is loaded");
    opts.optflag("d", "dies", "print the dies of each expanded unit");
    opts.optflag("p", "psymtabs", "print the partial symbol tables");
    opts.optmulti("s", "symbol", "expand the unit defining a symbol", "NAME");
    opts.optmulti(
        "m",
        "match",
        "expand every unit with a symbol matching a name",
        "NAME",
    );
    opts.optflag("", "complete", "treat --match names as prefixes");
    opts.optmulti("a", "address", "expand the unit covering an address", "ADDR");
    opts.optflag("", "read-now", "expand every unit up front");
    opts.optopt(
        "",
        "cache-age",
        "sweeps an unused unit survives, 0 disables caching",
        "N",
    );
    opts.optmulti("", "dwo-dir", "directory to search for .dwo files", "DIR");
    opts.optmulti(
        "",
        "debug-dir",
        "directory to search for separate debug files",
        "DIR",
    );
    opts.optflag(
        "",
        "deprecated-index",
        "accept .gdb_index versions older than 6",
    );
    opts.optflag("", "dump-dies", "log every die as it is read");

    let matches = match opts.parse(env::args().skip(1)) {
        Ok(m) => m,
        Err(e) => {
            writeln!(&mut io::stderr(), "{:?}\n", e).ok();
            print_usage(&opts);
        }
    };
    if matches.free.len() != 1 {
        print_usage(&opts);
    }

    let mut flags = Flags {
        units: matches.opt_present("u"),
        dies: matches.opt_present("d"),
        psymtabs: matches.opt_present("p"),
        symbols: matches.opt_strs("s"),
        matching: matches.opt_strs("m"),
        complete: matches.opt_present("complete"),
        addresses: Vec::new(),
    };
    for a in matches.opt_strs("a") {
        match parse_address(&a) {
            Some(address) => flags.addresses.push(address),
            None => {
                eprintln!("Invalid address {}", a);
                process::exit(1);
            }
        }
    }

    let mut options = Options::default()
        .read_now(matches.opt_present("read-now"))
        .use_deprecated_index_sections(matches.opt_present("deprecated-index"))
        .dump_dies(matches.opt_present("dump-dies"));
    if let Some(age) = matches.opt_str("cache-age") {
        match age.parse() {
            Ok(age) => options = options.max_cache_age(age),
            Err(e) => {
                eprintln!("Invalid cache age {}: {}", age, e);
                process::exit(1);
            }
        }
    }
    for dir in matches.opt_strs("dwo-dir") {
        options = options.dwo_search_dir(dir);
    }
    for dir in matches.opt_strs("debug-dir") {
        options = options.debug_file_directory(dir);
    }

    let path = Path::new(&matches.free[0]);
    if let Err(err) = run(path, options, &flags) {
        eprintln!("{}: {}", path.display(), err);
        process::exit(1);
    }
}

fn run(path: &Path, options: Options, flags: &Flags) -> dwarf_dies::Result<()> {
    let arenas = SessionArenas::new();
    let session = ObjectSession::new(&arenas);
    let sections = match session.open_file(path)? {
        Some(sections) => sections,
        None => {
            return Err(dwarf_dies::Error::Io(format!(
                "cannot read {} as an object file",
                path.display()
            )))
        }
    };
    let mut ctx = DwarfContext::open(&session, &sections, options)?;

    let stdout = io::stdout();
    let mut printer = Printer {
        w: BufWriter::new(stdout.lock()),
        dies: flags.dies,
    };
    let mut quick = select_quick_symbols(&mut ctx, &mut printer)?;
    tracing::info!(lookups = quick.describe(), units = ctx.unit_count(), "opened");

    for name in &flags.symbols {
        match quick.lookup_symbol(&mut ctx, name, SymbolDomain::Var, &mut printer)? {
            Some(unit) => writeln!(printer.w, "{}: unit {}", name, unit.0)?,
            None => writeln!(printer.w, "{}: not found", name)?,
        }
    }
    for name in &flags.matching {
        let units = quick.expand_symtabs_matching(&mut ctx, name, flags.complete, &mut printer)?;
        writeln!(printer.w, "{}: {} units", name, units.len())?;
    }
    for &address in &flags.addresses {
        match quick.find_pc_compunit(&mut ctx, address, &mut printer)? {
            Some(unit) => writeln!(printer.w, "0x{:x}: unit {}", address, unit.0)?,
            None => writeln!(printer.w, "0x{:x}: no unit", address)?,
        }
    }

    if flags.psymtabs {
        for symtab in ctx.psymtabs() {
            writeln!(
                printer.w,
                "psymtab for unit {} ({}) pc {:x?}",
                symtab.unit.0,
                symtab.filename.as_deref().unwrap_or("<unnamed>"),
                symtab.pc_range,
            )?;
            for symbol in &symtab.global_symbols {
                writeln!(printer.w, "    global {} {:?}", symbol.name, symbol.domain)?;
            }
            for symbol in &symtab.static_symbols {
                writeln!(printer.w, "    static {} {:?}", symbol.name, symbol.domain)?;
            }
            for import in &symtab.imported_units {
                writeln!(printer.w, "    imports unit {}", import.0)?;
            }
        }
    }

    if flags.units {
        let units: Vec<_> = ctx.comp_units().chain(ctx.type_units()).collect();
        for id in units {
            let unit = ctx.unit(id)?;
            writeln!(
                printer.w,
                "unit {}: {:?} {:?} at {:?} v{}{}{}",
                id.0,
                unit.kind(),
                unit.source(),
                unit.offset(),
                unit.version(),
                if unit.is_expanded() { " expanded" } else { "" },
                if ctx.is_loaded(id) { " loaded" } else { "" },
            )?;
        }
        let complaints = ctx.complaints().total();
        if complaints != 0 {
            writeln!(printer.w, "{} complaints", complaints)?;
        }
    }
    printer.w.flush()?;
    Ok(())
}
