use std::{fs, path::Path, path::PathBuf, process};

use clap::Parser;
use linewise::analysis::ResourceTable;
use linewise::emit::listing::print_listing;
use linewise::emit::{Analysis, CompileError, CompileOptions, Compiler, EchoTranslator, EmittedProgram};
use linewise::frontend::LineDumper;
use linewise::lang::LineNumber;
use linewise::runtime::{Machine, ShapeExecutor};
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, fmt};

#[derive(Parser, Debug)]
#[command(name = "linewise")]
#[command(about = "Compile a line-numbered program into line blocks")]
struct Cli {
    /// Program source (.nlb)
    file: PathBuf,

    /// Dump parsed lines with their control shapes
    #[arg(long)]
    lines: bool,

    /// Print the control-flow graph and the selected mode
    #[arg(long)]
    cfg: bool,

    /// Print the emitted program
    #[arg(long)]
    listing: bool,

    /// Run the emitted program on shapes alone
    #[arg(long)]
    simulate: bool,

    /// Conditional lines whose jump is taken while simulating
    #[arg(long, value_delimiter = ',')]
    take: Vec<LineNumber>,

    /// JSON resource table merged over the built-in one
    #[arg(long)]
    resources: Option<PathBuf>,

    /// Write the emitted program as a binary artifact
    #[arg(long)]
    out: Option<PathBuf>,

    /// Translate one line at a time
    #[arg(long)]
    sequential: bool,

    #[arg(long)]
    no_color: bool,
}

fn main() {
    init_logging();

    let cli = Cli::parse();

    ensure_extension(&cli.file);

    let source = match fs::read_to_string(&cli.file) {
        Ok(source) => source,
        Err(e) => {
            eprintln!("Failed to read '{}': {}", cli.file.display(), e);
            process::exit(1);
        }
    };

    let options = match compile_options(&cli) {
        Ok(options) => options,
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    };
    let compiler = Compiler::with_options(options);

    let analysis = compiler.analyze(&source).unwrap_or_else(|e| fail(e));
    for warning in &analysis.warnings {
        eprintln!("{}", warning);
    }

    if cli.lines {
        let mut dumper = LineDumper::new();
        if cli.no_color {
            dumper = dumper.no_color();
        }
        dumper.dump(&analysis.program, &analysis.classified);
    }
    if cli.cfg {
        print_cfg(&analysis);
    }

    let compilation = compiler
        .compile_analysis(analysis, &EchoTranslator)
        .unwrap_or_else(|e| fail(e));
    let program = compilation.program;

    let other_output = cli.lines || cli.cfg || cli.simulate || cli.out.is_some();
    if cli.listing || !other_output {
        print_listing(&program);
    }

    if let Some(path) = &cli.out {
        if let Err(e) = write_artifact(&program, path) {
            eprintln!("Failed to write '{}': {}", path.display(), e);
            process::exit(1);
        }
        info!(path = %path.display(), "artifact written");
    }

    if cli.simulate {
        simulate(&program, &cli.take);
    }
}

fn init_logging() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("linewise=info"));

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn ensure_extension(path: &Path) {
    if path.extension().and_then(|e| e.to_str()) != Some("nlb") {
        eprintln!("Error: expected a .nlb file, got {}", path.display());
        process::exit(1);
    }
}

fn compile_options(cli: &Cli) -> Result<CompileOptions, Box<dyn std::error::Error>> {
    let mut resource_table = ResourceTable::builtin();

    if let Some(path) = &cli.resources {
        let json = fs::read_to_string(path)?;
        resource_table.extend(ResourceTable::from_json(&json)?);
    }

    Ok(CompileOptions {
        parallel: !cli.sequential,
        resource_table,
        cancel: None,
    })
}

fn fail(e: CompileError) -> ! {
    error!("compilation failed");
    eprintln!("{}", e);
    process::exit(1);
}

fn print_cfg(analysis: &Analysis) {
    println!("mode: {}", analysis.mode);
    if analysis.graph.is_empty() {
        println!("  (no edges)");
    }
    for edge in analysis.graph.edges() {
        println!("  {:>5} -> {:<5} {}", edge.from, edge.to, edge.kind);
    }
}

fn write_artifact(program: &EmittedProgram, path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let bytes = program.to_bytes().map_err(|e| e.to_string())?;
    fs::write(path, bytes)?;
    Ok(())
}

fn simulate(program: &EmittedProgram, take: &[LineNumber]) {
    let mut executor = ShapeExecutor::taking(take.iter().copied());

    match Machine::new().run(program, &mut executor) {
        Ok(trace) => {
            let path: Vec<String> = trace.visited.iter().map(|n| n.to_string()).collect();
            println!("visited: {}", path.join(" -> "));
            println!("steps: {}", trace.steps);
        }
        Err(failure) => {
            eprintln!("{}", failure);
            process::exit(1);
        }
    }
}
