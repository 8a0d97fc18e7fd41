use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use irflow_core::{ir_persist, Instruction, InstructionId, Program};
use irflow_dataflow::{BarrierGuard, DataFlowGraph, FlowConfig, GuardCondition, Node};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;
use walkdir::WalkDir;

#[derive(Parser)]
#[command(name = "irflow")]
#[command(about = "irflow - local data-flow queries over SSA programs")]
#[command(version)]
struct Cli {
    /// Flow configuration as a JSON file.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print a program in text form.
    Dump { input: PathBuf },

    /// List the data-flow nodes of a program.
    Nodes {
        input: PathBuf,

        #[arg(short, long)]
        function: Option<String>,
    },

    /// Ask whether data flows locally from one instruction to another.
    Flow {
        input: PathBuf,

        #[arg(long)]
        from: String,

        #[arg(long)]
        to: String,
    },

    /// List every node an instruction flows to.
    Reach {
        input: PathBuf,

        #[arg(long)]
        from: String,
    },

    /// List the nodes a branch on an instruction guards.
    Guards {
        input: PathBuf,

        #[arg(long)]
        checked: String,

        /// Branch outcome that validates the checked value.
        #[arg(long, default_value_t = true, action = clap::ArgAction::Set)]
        when: bool,
    },

    /// Load and validate one program or every `.json` program under a directory.
    Validate { input: PathBuf },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Dump { input } => cmd_dump(&input),
        Commands::Nodes { input, function } => cmd_nodes(&input, function.as_deref(), config),
        Commands::Flow { input, from, to } => cmd_flow(&input, &from, &to, config),
        Commands::Reach { input, from } => cmd_reach(&input, &from, config),
        Commands::Guards {
            input,
            checked,
            when,
        } => cmd_guards(&input, &checked, when, config),
        Commands::Validate { input } => cmd_validate(&input, cli.verbose),
    }
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(path: Option<&Path>) -> Result<FlowConfig> {
    let Some(path) = path else {
        return Ok(FlowConfig::default());
    };
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config {}", path.display()))?;
    FlowConfig::from_json(&json).with_context(|| format!("invalid config {}", path.display()))
}

fn load_program(path: &Path) -> Result<Program> {
    let program = ir_persist::load_program(path)
        .with_context(|| format!("failed to load {}", path.display()))?;
    program
        .validate()
        .with_context(|| format!("{} is not a well-formed program", path.display()))?;
    Ok(program)
}

fn parse_node(graph: &DataFlowGraph<'_>, text: &str) -> Result<Node> {
    graph
        .parse_node(text)
        .with_context(|| format!("no instruction named {:?}", text))
}

fn cmd_dump(input: &Path) -> Result<()> {
    let program = load_program(input)?;
    print!("{}", irflow_core::format::format_program(&program));
    Ok(())
}

fn cmd_nodes(input: &Path, function: Option<&str>, config: FlowConfig) -> Result<()> {
    use colored::*;

    let program = load_program(input)?;
    let graph = DataFlowGraph::with_config(&program, config);

    let functions = match function {
        Some(name) => vec![graph.function_named(name)?],
        None => program.functions.values().collect(),
    };

    for f in functions {
        println!("{}", format!("function {}", f.name()).bright_green().bold());
        for node in graph.nodes(f.id) {
            let kind = graph
                .kind(node)
                .map(|k| k.to_string())
                .unwrap_or_default();
            println!(
                "  {:>6}  {:<12} {}",
                node.as_instruction().to_string().bright_yellow(),
                kind.cyan(),
                graph.display(node)
            );
        }
    }

    Ok(())
}

fn cmd_flow(input: &Path, from: &str, to: &str, config: FlowConfig) -> Result<()> {
    use colored::*;

    let program = load_program(input)?;
    let graph = DataFlowGraph::with_config(&program, config);
    let source = parse_node(&graph, from)?;
    let sink = parse_node(&graph, to)?;

    if graph.local_flow(source, sink) {
        println!(
            "{} {} -> {}",
            "FLOWS".bright_green().bold(),
            graph.display(source),
            graph.display(sink)
        );
    } else {
        println!(
            "{} {} -> {}",
            "NO FLOW".bright_red().bold(),
            graph.display(source),
            graph.display(sink)
        );
    }

    tracing::debug!(cache = ?graph.cache_statistics(), "flow query done");
    Ok(())
}

fn cmd_reach(input: &Path, from: &str, config: FlowConfig) -> Result<()> {
    use colored::*;

    let program = load_program(input)?;
    let graph = DataFlowGraph::with_config(&program, config);
    let source = parse_node(&graph, from)?;

    let reachable = graph.reachable_from(source);
    let mut nodes: Vec<Node> = reachable.iter().copied().collect();
    nodes.sort_by_key(|n| n.as_instruction());

    println!(
        "{}",
        format!("{} reaches {} node(s)", graph.display(source), nodes.len())
            .bright_cyan()
            .bold()
    );
    for node in nodes {
        println!("  {:>6}  {}", node.as_instruction(), graph.display(node));
    }

    Ok(())
}

/// A branch validates `checked` when the condition is `checked` itself or a
/// comparison with `checked` as an operand.
struct BranchOnValue {
    checked: InstructionId,
    when: bool,
}

impl BarrierGuard for BranchOnValue {
    fn checks(&self, condition: &GuardCondition<'_>, instruction: &Instruction, outcome: bool) -> bool {
        if outcome != self.when || instruction.id != self.checked {
            return false;
        }
        let tested = condition.instruction();
        tested.id == self.checked
            || (tested.opcode() == irflow_core::Opcode::Compare
                && tested.operands().iter().any(|op| op.def == self.checked))
    }

    fn name(&self) -> &str {
        "branch-on-value"
    }
}

fn cmd_guards(input: &Path, checked: &str, when: bool, config: FlowConfig) -> Result<()> {
    use colored::*;

    let program = load_program(input)?;
    let graph = DataFlowGraph::with_config(&program, config);
    let checked = parse_node(&graph, checked)?;

    let guard = BranchOnValue {
        checked: checked.as_instruction(),
        when,
    };
    let mut guarded: Vec<Node> = graph.guarded_nodes(&guard).into_iter().collect();
    guarded.sort_by_key(|n| n.as_instruction());

    if guarded.is_empty() {
        println!("{}", "no guarded nodes".yellow());
        return Ok(());
    }
    println!(
        "{}",
        format!("{} guarded node(s)", guarded.len()).bright_cyan().bold()
    );
    for node in guarded {
        let location = graph
            .location(node)
            .map(|l| l.to_string())
            .unwrap_or_default();
        println!(
            "  {:>6}  {}  {}",
            node.as_instruction(),
            graph.display(node),
            location.dimmed()
        );
    }

    Ok(())
}

fn program_files(root: &Path) -> Result<Vec<PathBuf>> {
    if root.is_file() {
        return Ok(vec![root.to_path_buf()]);
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(root).follow_links(false).sort_by_file_name() {
        let entry = entry.with_context(|| format!("failed to walk {}", root.display()))?;
        if entry.file_type().is_file()
            && entry.path().extension().and_then(|e| e.to_str()) == Some("json")
        {
            files.push(entry.into_path());
        }
    }
    Ok(files)
}

fn cmd_validate(input: &Path, verbose: bool) -> Result<()> {
    use colored::*;

    let files = program_files(input)?;
    if files.is_empty() {
        bail!("no .json programs under {}", input.display());
    }

    let mut failures = 0;
    for file in &files {
        match load_program(file) {
            Ok(program) => {
                println!("{} {}", " VALID".bright_green().bold(), file.display());
                if verbose {
                    let stats = program.stats();
                    println!(
                        "   {} function(s), {} block(s), {} instruction(s)",
                        stats.functions, stats.blocks, stats.instructions
                    );
                }
            }
            Err(e) => {
                failures += 1;
                println!("{} {}", " INVALID".bright_red().bold(), file.display());
                println!("   {:#}", e);
            }
        }
    }

    if failures > 0 {
        bail!("{} of {} program(s) failed validation", failures, files.len());
    }
    Ok(())
}
