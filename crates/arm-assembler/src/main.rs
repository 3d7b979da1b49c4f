//! `arm-as` command-line front end: assembles one source file into a flat
//! object code image (§6 Assembler CLI surface).

use std::path::PathBuf;
use std::process;

use arm_assembler::{FsIncludeLoader, Options, assemble_with_loader};

// ---------------------------------------------------------------------------
// CLI argument parsing
// ---------------------------------------------------------------------------

struct CliArgs {
    input: Option<PathBuf>,
    output: Option<PathBuf>,
    include_dirs: Vec<PathBuf>,
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
    eprintln!("Usage: arm-as [OPTIONS] <input>");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  -o, --output <file>          Write object code to <file> [default: a.bin]");
    eprintln!("  -i <dir>                     Add a directory to the %INCLUDE search path (repeatable)");
    eprintln!("  -s, --instructionset <name>  Target instruction set");
    eprintln!("  -x, --extension <name>       Enable an extension: FPA, VFPv1, Thumb (repeatable)");
    eprintln!("  -b, --base <hex-addr>        Load address [default: position-independent]");
    eprintln!("  -?, --help                   Print this message");
}

fn parse_hex_addr(text: &str) -> Option<u32> {
    let digits = text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")).or_else(|| text.strip_prefix('&')).unwrap_or(text);
    u32::from_str_radix(digits, 16).ok()
}

fn parse_args() -> CliArgs {
    let args: Vec<String> = std::env::args().collect();
    let mut cli = CliArgs { input: None, output: None, include_dirs: Vec::new(), instruction_set: None, extensions: Vec::new(), base: None };

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "-o" | "--output" => {
                i += 1;
                cli.output = args.get(i).map(PathBuf::from);
            }
            "-i" => {
                i += 1;
                match args.get(i) {
                    Some(dir) => cli.include_dirs.push(PathBuf::from(dir)),
                    None => usage_error("-i requires a directory argument"),
                }
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

fn main() {
    let cli = parse_args();

    let Some(input_path) = cli.input else {
        usage_error("missing input file");
    };

    let source = match std::fs::read_to_string(&input_path) {
        Ok(text) => text,
        Err(e) => {
            eprintln!("{}: {e}", input_path.display());
            process::exit(1);
        }
    };

    let mut include_dirs = cli.include_dirs;
    if let Some(parent) = input_path.parent() {
        include_dirs.push(parent.to_path_buf());
    }
    let loader = FsIncludeLoader { dirs: include_dirs };
    let options = Options { load_address: cli.base };

    let object_code = match assemble_with_loader(&source, &options, &loader) {
        Ok(object_code) => object_code,
        Err(diagnostics) => {
            eprintln!("{diagnostics}");
            process::exit(1);
        }
    };

    let output_path = cli.output.unwrap_or_else(|| PathBuf::from("a.bin"));
    if let Err(e) = std::fs::write(&output_path, object_code.code()) {
        eprintln!("{}: {e}", output_path.display());
        process::exit(1);
    }
}
