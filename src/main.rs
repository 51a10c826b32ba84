//! CGRA Schedule Assembler CLI
//!
//! Usage:
//!   cgra-asm kernel0.asm kernel1.asm
//!   cgra-asm -c fabric.json --strict kernel.asm --listing
//!   cgra-asm kernel.asm --json

use clap::Parser as ClapParser;
use colored::Colorize;
use std::fs;
use tracing_subscriber::EnvFilter;

use cgra_asm::{AssembledProgram, Assembler, ColumnMaskEncoding, DecodeMode, FabricConfig};

#[derive(ClapParser, Debug)]
#[command(name = "cgra-asm")]
#[command(author = "FPGA Team")]
#[command(version = "0.1.0")]
#[command(about = "Assembles per-PE pseudo-assembly schedules into CGRA instruction memory")]
struct Args {
    /// Kernel sources, assembled in order
    #[arg(value_name = "KERNEL", required = true)]
    kernels: Vec<String>,

    /// Fabric configuration (JSON); defaults to the 4x4 fabric
    #[arg(short = 'c', long = "config")]
    config_file: Option<String>,

    /// Reject mnemonics the fabric does not implement
    #[arg(long = "strict")]
    strict: bool,

    /// Encode the column mask as the leading active-column count
    #[arg(long = "packed-mask")]
    packed_mask: bool,

    /// Output as JSON
    #[arg(short = 'j', long = "json")]
    json_output: bool,

    /// Output configuration words and the instruction-memory table
    #[arg(short = 'l', long = "listing")]
    listing_output: bool,

    /// Verbose output
    #[arg(short = 'v', long = "verbose")]
    verbose: bool,
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    let args = Args::parse();
    init_tracing(args.verbose);

    let mut config = match &args.config_file {
        Some(path) => FabricConfig::from_json_file(path).unwrap_or_else(|e| {
            eprintln!("{}: {}", "Config error".red(), e);
            std::process::exit(1);
        }),
        None => FabricConfig::default_4x4(),
    };
    if args.strict {
        config.decode_mode = DecodeMode::Strict;
    }
    if args.packed_mask {
        config.column_mask_encoding = ColumnMaskEncoding::Packed;
    }

    if args.verbose {
        println!("{}", "CGRA Schedule Assembler".bold().blue());
        println!("{}", "=".repeat(35));
        println!();
        println!(
            "{}: {}x{} ({} PEs, {}-word instruction memory)",
            "Target fabric".green(),
            config.n_row,
            config.n_col,
            config.pe_count(),
            config.imem_depth
        );
        println!("{}: {}", "Kernels".green(), args.kernels.join(", "));
        println!();
    }

    let mut assembler = match Assembler::new(config) {
        Ok(a) => a,
        Err(e) => {
            eprintln!("{}: {}", "Config error".red(), e);
            std::process::exit(1);
        }
    };

    let mut kernels = Vec::new();
    for path in &args.kernels {
        let source = fs::read_to_string(path).unwrap_or_else(|e| {
            eprintln!("{}: Failed to read file '{}': {}", "Error".red(), path, e);
            std::process::exit(1);
        });

        match assembler.assemble_kernel(&source) {
            Ok(kernel) => kernels.push(kernel),
            Err(e) => {
                eprintln!("{}: {}: {}", "Assembly error".red(), path, e);
                std::process::exit(1);
            }
        }
    }

    let program = assembler.finish(kernels);

    if args.json_output {
        match program.to_json() {
            Ok(json) => println!("{}", json),
            Err(e) => {
                eprintln!("{}: Failed to serialize to JSON: {}", "Error".red(), e);
                std::process::exit(1);
            }
        }
    } else if args.listing_output {
        print!("{}", program.to_listing());
    } else {
        print_program(&program, &args.kernels);
    }
}

fn print_program(program: &AssembledProgram, paths: &[String]) {
    println!("{}", "Assembly Results".bold().green());
    println!("{}", "=".repeat(50));
    println!();

    println!(
        "{}: {}x{} CGRA",
        "Target".cyan(),
        program.config.n_row,
        program.config.n_col
    );
    println!("{}: {}", "Kernels".cyan(), program.kernels.len());
    println!(
        "{}: {} of {} words",
        "Memory used".cyan(),
        program.memory.used_depth(),
        program.config.imem_depth
    );
    println!();

    for (kernel, path) in program.kernels.iter().zip(paths) {
        println!("{} {} ({})", "Kernel".bold(), kernel.id.to_string().bold(), path);
        println!("  {}: {}", "Start address".cyan(), kernel.start_address);
        println!("  {}: {}", "Instructions".cyan(), kernel.instruction_count);
        println!(
            "  {}: {:0width$b} ({} active)",
            "Columns".cyan(),
            kernel.active_columns.0,
            kernel.active_column_count,
            width = program.config.n_col
        );
        println!("  {}: {}", "Config word".cyan(), kernel.config_word);
        for diagnostic in &kernel.diagnostics {
            println!("  {}: {}", "warning".yellow(), diagnostic);
        }
        println!();
    }
}
