use std::fs;
use std::io::{self, Read};
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, ValueEnum};
use log::info;
use microc::{CompileOptions, Compilation, Error, Result, compile, token_dump};
use microc_compiler::x64::Optimisations;
use microc_compiler::StdRuntime;
use microc_parser::ast::TreeStyle;

/// Batch compiler for Micro-C targeting x86-64 assembly.
#[derive(Debug, Parser)]
#[command(name = "microc", version, about)]
struct Cli {
    /// Source file; standard input when omitted or `-`
    #[arg(default_value = "-")]
    input: String,

    /// Write the assembly to FILE instead of standard output
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Print one line per token after lexing
    #[arg(long)]
    dump_tokens: bool,

    /// Print the syntax tree after parsing
    #[arg(long)]
    dump_ast: bool,

    /// Draw the syntax tree with ASCII instead of Unicode
    #[arg(long, requires = "dump_ast")]
    ascii: bool,

    /// Print the function table after semantic analysis
    #[arg(long)]
    dump_function_table: bool,

    /// Print the symbol table after semantic analysis
    #[arg(long)]
    dump_symbol_table: bool,

    /// Print the type table after semantic analysis
    #[arg(long)]
    dump_type_table: bool,

    /// Skip the peephole optimiser
    #[arg(long)]
    no_optimise: bool,

    /// Disable one optimiser rewrite (repeatable)
    #[arg(long, value_enum, value_name = "REWRITE")]
    disable: Vec<Rewrite>,

    /// Execute the program with the built-in interpreter
    #[arg(long)]
    run: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Rewrite {
    NopElimination,
    PushPop,
    ConstantFolding,
    SelfMove,
}

impl From<Rewrite> for Optimisations {
    fn from(rewrite: Rewrite) -> Self {
        match rewrite {
            Rewrite::NopElimination => Optimisations::NOP_ELIMINATION,
            Rewrite::PushPop => Optimisations::PUSH_POP,
            Rewrite::ConstantFolding => Optimisations::CONSTANT_FOLDING,
            Rewrite::SelfMove => Optimisations::SELF_MOVE,
        }
    }
}

impl Cli {
    fn options(&self) -> CompileOptions {
        let mut optimisations = Optimisations::all();
        for rewrite in &self.disable {
            optimisations.remove((*rewrite).into());
        }

        let style = if self.ascii { TreeStyle::Ascii } else { TreeStyle::Unicode };
        CompileOptions {
            optimise: !self.no_optimise,
            optimisations,
            ast_style: self.dump_ast.then_some(style),
        }
    }

    /// Whether any dump was requested; dumps replace the assembly on stdout.
    fn dumps(&self) -> bool {
        self.dump_tokens
            || self.dump_ast
            || self.dump_function_table
            || self.dump_symbol_table
            || self.dump_type_table
    }
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();
    let source = match read_source(&cli.input) {
        Ok(source) => source,
        Err(error) => {
            eprintln!("{}: {error}", cli.input);
            return ExitCode::FAILURE;
        }
    };

    match run(&cli, &source) {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            eprint!("{}", error.render(&source));
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli, source: &str) -> Result<()> {
    if cli.dump_tokens {
        print!("{}", token_dump(source));
    }

    let compilation = compile(source, &cli.options())?;
    print_dumps(cli, &compilation);

    if let Some(stats) = compilation.stats {
        info!(
            "optimiser: {} rewrites in {} iterations",
            stats.total(),
            stats.iterations
        );
    }

    match &cli.output {
        Some(path) => fs::write(path, compilation.assembly())?,
        None if !cli.dumps() && !cli.run => print!("{}", compilation.assembly()),
        None => {}
    }

    if cli.run {
        let (value, _) = compilation.run(StdRuntime).map_err(Error::from)?;
        info!("main returned {value}");
    }
    Ok(())
}

fn print_dumps(cli: &Cli, compilation: &Compilation) {
    if let Some(ast) = &compilation.ast {
        print!("{ast}");
    }
    let tables = &compilation.analysis;
    if cli.dump_function_table {
        print!("{}", tables.functions);
    }
    if cli.dump_symbol_table {
        print!("{}", tables.symbols);
    }
    if cli.dump_type_table {
        print!("{}", tables.types);
    }
}

fn read_source(input: &str) -> io::Result<String> {
    if input == "-" {
        let mut source = String::new();
        io::stdin().read_to_string(&mut source)?;
        Ok(source)
    } else {
        fs::read_to_string(input)
    }
}
