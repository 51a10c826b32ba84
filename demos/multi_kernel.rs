//! Example: Several Kernels in One Instruction Memory
//!
//! Each kernel starts where the previous one's footprint ends, and its
//! configuration word records that address.
//!
//! Run with: cargo run --example multi_kernel

use cgra_asm::{assemble, FabricConfig};

/// One step in which only the listed PEs do work
fn step(busy: &[(usize, &str)]) -> String {
    let mut text = String::new();
    for pe in 0..16 {
        let line = busy.iter().find(|(p, _)| *p == pe).map_or("NOP", |(_, l)| *l);
        text.push_str(line);
        text.push('\n');
    }
    text.push('\n');
    text
}

fn main() {
    println!("=== Multi-Kernel Layout ===\n");

    let scale = [
        step(&[(0, "LWD R0"), (1, "LWD R0")]),
        step(&[(0, "MUL R0, 3 -> R1"), (1, "MUL R0, 3 -> R1")]),
        step(&[(0, "SWD R1"), (1, "SWD R1")]),
    ]
    .concat();
    let accumulate = [
        step(&[(0, "ADD R0, RCB -> R0"), (4, "ADD R0, RCT -> R0"), (8, "MV RCL -> R2")]),
        step(&[(8, "SWD R2")]),
    ]
    .concat();
    let idle = step(&[]);

    let program = assemble(&[scale, accumulate, idle], FabricConfig::default_4x4()).unwrap();

    for kernel in &program.kernels {
        println!(
            "Kernel {}: start {:3}, {} instructions, {} column(s), word {}",
            kernel.id,
            kernel.start_address,
            kernel.instruction_count,
            kernel.active_column_count,
            kernel.config_word
        );
    }

    println!("\nListing:");
    println!("{}", program.to_listing());
}
