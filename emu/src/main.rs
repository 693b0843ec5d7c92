use std::collections::HashMap;

use arch::reg::Reg;
use color_print::{cformat, cprintln};
use rvemu::dump::dump;
use rvemu::engine::Engine;

const HELP_TEMPLATE: &str = "\
{before-help}{bin} {version}
  {about}

{usage-heading}
{tab}{usage}

{all-args}{after-help}";

#[derive(Debug, clap::Parser)]
#[clap(version, about = "Instruction-level emulator for the RV32 subset", help_template = HELP_TEMPLATE)]
struct Args {
    /// Input file
    #[clap(default_value = "main.s")]
    input: String,

    /// Stop after this many cycles
    #[clap(short, long)]
    tmax: Option<u64>,

    /// YAML file of initial register values, keyed by register name
    #[clap(short, long)]
    regs: Option<String>,

    /// Write a "v2.0 raw" memory image to this file after the run
    #[clap(short, long)]
    dump: Option<String>,
}

fn main() {
    use clap::Parser;

    let args: Args = Args::parse();

    let src = std::fs::read_to_string(&args.input)
        .expect(&cformat!("<r,s>Failed to open file</>: {}", args.input));

    let mut engine = Engine::new();
    if let Some(path) = &args.regs {
        engine.init_registers(&read_init_regs(path));
    }
    engine.load(&src);

    match args.tmax {
        Some(tmax) => {
            for _ in 0..tmax {
                if !engine.step() {
                    break;
                }
            }
        }
        None => engine.run(),
    }

    cprintln!(
        "<green>{}</>: halted at pc {:#06x} after {} cycles",
        args.input,
        engine.pc(),
        engine.cycles()
    );

    for row in 0..8 {
        let cells = (0..4)
            .map(|col| {
                let i = row + col * 8;
                cformat!(
                    "<blue>{:>4}</> <green>{:08x}</>",
                    Reg::from(i as u8).to_string(),
                    engine.registers()[i] as u32
                )
            })
            .collect::<Vec<_>>()
            .join(" | ");
        println!("| {} |", cells);
    }

    for diag in engine.diags() {
        println!("{}", diag.cformat());
    }

    if let Some(path) = &args.dump {
        std::fs::write(path, dump(engine.memory()))
            .expect(&cformat!("<r,s>Failed to write file</>: {}", path));
    }
}

/// Initial register file from a YAML map like `{sp: 4096, a0: 3}`.
/// `x0`/`zero` entries are ignored.
fn read_init_regs(path: &str) -> [i32; 31] {
    let text = std::fs::read_to_string(path)
        .expect(&cformat!("<r,s>Failed to open file</>: {}", path));
    let map: HashMap<String, i32> =
        serde_yaml::from_str(&text).expect(&cformat!("<r,s>Failed to parse file</>: {}", path));
    let mut init = [0i32; 31];
    for (name, value) in map {
        let reg = Reg::parse(&name).expect(&cformat!("<r,s>Invalid register</>: {}", name));
        if reg.index() != 0 {
            init[reg.index() - 1] = value;
        }
    }
    init
}
