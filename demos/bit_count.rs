//! Example: Bit Count Kernel
//!
//! Assembles a four-step bit counting schedule for the 4x4 fabric and prints
//! the translated instructions of every PE.
//!
//! Run with: cargo run --example bit_count

use cgra_asm::{Assembler, FabricConfig};

const BIT_COUNT: &str = include_str!("bit_count.asm");

fn main() {
    println!("=== Bit Count Kernel ===\n");

    let config = FabricConfig::default_4x4();
    let mut assembler = Assembler::new(config).unwrap();
    let kernel = assembler.assemble_kernel(BIT_COUNT).unwrap();

    println!("Kernel {} at address {}", kernel.id, kernel.start_address);
    println!("Instructions per PE: {}", kernel.instruction_count);
    println!(
        "Active columns: {:04b} ({})",
        kernel.active_columns.0, kernel.active_column_count
    );
    println!("Configuration word: {}\n", kernel.config_word);

    for (pe, row) in kernel.schedule.rows().enumerate() {
        if row.iter().all(|instr| instr.is_nop()) {
            continue;
        }
        println!("PE {}:", pe);
        for (step, instr) in row.iter().enumerate() {
            println!("  t{}: {}", step, instr);
        }
    }

    if !kernel.diagnostics.is_empty() {
        println!("\nSubstitutions:");
        for diagnostic in &kernel.diagnostics {
            println!("  {}", diagnostic);
        }
    }
}
