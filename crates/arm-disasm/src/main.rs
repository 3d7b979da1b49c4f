//! `arm-dis` command-line front end: disassembles a flat binary image to
//! text (§6 Disassembler CLI surface).

use std::path::PathBuf;
use std::process;

use arm_disasm::{Line, Options, disassemble_stream};

struct CliArgs {
    input: Option<PathBuf>,
    output: Option<PathBuf>,
    instruction_set: Option<String>,
    extensions: Vec<String>,
    base: Option<u32>,
}

fn usage_error(message: &str) -> ! {
    eprintln!("{message}");
    print_help();
    process::exit(2);
}

fn print_help() {
    eprintln!("Usage: arm-dis [OPTIONS] <input>");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  -o, --output <file>          Write disassembly to <file> [default: stdout]");
    eprintln!("  -s, --instructionset <name>  Target instruction set");
    eprintln!("  -x, --extension <name>       Enable an extension: FPA, VFPv1, Thumb (repeatable)");
    eprintln!("  -b, --base <hex-addr>        Base address for labels [default: position-independent]");
    eprintln!("  -?, --help                   Print this message");
}

fn parse_hex_addr(text: &str) -> Option<u32> {
    let digits = text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")).or_else(|| text.strip_prefix('&')).unwrap_or(text);
    u32::from_str_radix(digits, 16).ok()
}

fn parse_args() -> CliArgs {
    let args: Vec<String> = std::env::args().collect();
    let mut cli = CliArgs { input: None, output: None, instruction_set: None, extensions: Vec::new(), base: None };

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "-o" | "--output" => {
                i += 1;
                cli.output = args.get(i).map(PathBuf::from);
            }
            "-s" | "--instructionset" => {
                i += 1;
                cli.instruction_set = args.get(i).cloned();
            }
            "-x" | "--extension" => {
                i += 1;
                match args.get(i) {
                    Some(ext) => cli.extensions.push(ext.clone()),
                    None => usage_error("-x requires an extension name"),
                }
            }
            "-b" | "--base" => {
                i += 1;
                match args.get(i).and_then(|s| parse_hex_addr(s)) {
                    Some(addr) => cli.base = Some(addr),
                    None => usage_error("-b requires a hex address"),
                }
            }
            "-?" | "--help" => {
                print_help();
                process::exit(0);
            }
            other if !other.starts_with('-') && cli.input.is_none() => {
                cli.input = Some(PathBuf::from(other));
            }
            other => usage_error(&format!("unrecognised argument: {other}")),
        }
        i += 1;
    }

    cli
}

fn options_from(cli: &CliArgs) -> Options {
    let mut options = Options::default();
    options.allow_fpa = cli.extensions.iter().any(|e| e.eq_ignore_ascii_case("FPA"));
    options.allow_thumb = cli.extensions.iter().any(|e| e.eq_ignore_ascii_case("Thumb"));
    if let Some(name) = &cli.instruction_set {
        options.variant = match name.to_ascii_lowercase().as_str() {
            "armv2" => arm_disasm::ArchVariant::Armv2,
            "armv2a" => arm_disasm::ArchVariant::Armv2a,
            "armv3" => arm_disasm::ArchVariant::Armv3,
            "armv3g" => arm_disasm::ArchVariant::Armv3g,
            "armv4" => arm_disasm::ArchVariant::Armv4,
            other => usage_error(&format!("unrecognised instruction set: {other}")),
        };
    }
    options
}

fn main() {
    let cli = parse_args();

    let Some(input_path) = cli.input else {
        usage_error("missing input file");
    };

    let code = match std::fs::read(&input_path) {
        Ok(bytes) => bytes,
        Err(e) => {
            eprintln!("{}: {e}", input_path.display());
            process::exit(1);
        }
    };

    let base = cli.base.unwrap_or(0);
    let options = options_from(&cli);
    let lines = disassemble_stream(&code, base, &options);

    let mut text = String::new();
    for line in lines {
        match line {
            Line::Instruction { address, text: rendered, .. } => text.push_str(&format!("{address:08X}  {rendered}\n")),
            Line::Miss { address, word } => text.push_str(&format!("{address:08X}  ; undefined {word:08X}\n")),
        }
    }

    match cli.output {
        Some(path) => {
            if let Err(e) = std::fs::write(&path, text) {
                eprintln!("{}: {e}", path.display());
                process::exit(1);
            }
        }
        None => print!("{text}"),
    }
}
