use arch::diag::Diags;
use color_print::{cformat, cprintln};
use rvasm::parser::Program;

const HELP_TEMPLATE: &str = "\
{before-help}{bin} {version}
  {about}

{usage-heading}
{tab}{usage}

{all-args}{after-help}";

#[derive(Debug, clap::Parser)]
#[clap(version, about = "Label resolver for the RV32 subset simulator", help_template = HELP_TEMPLATE)]
struct Args {
    /// Input file
    #[clap(default_value = "main.s")]
    input: String,

    /// Dump the resolved listing
    #[clap(short, long)]
    dump: bool,
}

fn main() {
    use clap::Parser;

    let args: Args = Args::parse();

    let src = std::fs::read_to_string(&args.input)
        .expect(&cformat!("<r,s>Failed to open file</>: {}", args.input));

    let mut diags = Diags::new();
    let program = Program::parse(&src, &mut diags);

    cprintln!("<green>{}</>: {} instructions", args.input, program.len());

    if args.dump {
        for (index, line) in program.lines.iter().enumerate() {
            cprintln!(
                "| <blue>{:>4}</> | <green>{:0>4X}</> | {:<32} | {}",
                line.no,
                index * 4,
                line.text,
                line.raw
            );
        }
        for (name, index) in program.labels.iter() {
            cprintln!("<green>{}:{:04X}</>", name, index * 4);
        }
    }

    for diag in &diags {
        println!("{}", diag.cformat());
    }
}
