use std::io::{self, IsTerminal, Read};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{anyhow, bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use crossterm::event::{self, Event as CEvent, KeyEventKind};
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use crossterm::{execute, ExecutableCommand};
use ratatui::backend::CrosstermBackend;
use ratatui::Terminal;
use tracing::{debug, info};

use yam::app::{App, Screen};
use yam::config::{self, Config};
use yam::diff;
use yam::diff_app::DiffApp;
use yam::diff_render;
use yam::format::{self, FormatOptions};
use yam::logging::{self, LogTarget};
use yam::parse::{self, Format};
use yam::path::get_by_path;
use yam::render::{plain_text, RenderOptions, TreeRenderer, TreeStyle};
use yam::tree::Tree;

#[derive(Debug, Parser)]
#[command(
    name = "yam",
    version,
    about = "Explore, edit, format and diff YAML/JSON documents",
    args_conflicts_with_subcommands = true
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    #[command(flatten)]
    view: ViewArgs,

    /// Config file path (default: <config dir>/yam/config.toml).
    #[arg(long, global = true, env = "YAM_CONFIG", value_name = "PATH")]
    config: Option<PathBuf>,
}

#[derive(Debug, Args)]
struct ViewArgs {
    /// Path query such as '.server.port', or the file when given alone.
    #[arg(value_name = "QUERY")]
    first: Option<String>,

    /// Document file. Use '-' or omit to read from stdin.
    #[arg(value_name = "FILE")]
    second: Option<String>,

    /// Open the interactive viewer.
    #[arg(short, long)]
    interactive: bool,

    /// Tree drawing style.
    #[arg(short, long, value_enum)]
    style: Option<TreeStyle>,

    /// Show value type labels.
    #[arg(short = 't', long)]
    types: bool,

    /// Print the selected node as JSON.
    #[arg(long, conflicts_with = "interactive")]
    json: bool,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Compare two documents structurally.
    Diff(DiffArgs),
    /// Reformat a document with normalized indentation and quoting.
    Fmt(FmtArgs),
}

#[derive(Debug, Args)]
struct DiffArgs {
    file1: PathBuf,
    file2: PathBuf,

    /// Print only the summary line.
    #[arg(short, long)]
    summary: bool,

    /// Open the side-by-side diff viewer.
    #[arg(short, long, conflicts_with = "summary")]
    interactive: bool,
}

#[derive(Debug, Args)]
struct FmtArgs {
    /// Document file; stdin when omitted.
    file: Option<PathBuf>,

    /// Write the result back to the file.
    #[arg(short, long)]
    write: bool,

    /// Indentation width.
    #[arg(short, long, value_name = "N")]
    indent: Option<usize>,

    /// Sort mapping keys recursively.
    #[arg(short, long)]
    sort_keys: bool,
}

enum InputSource {
    File(PathBuf),
    Stdin,
}

impl InputSource {
    fn path(&self) -> Option<PathBuf> {
        match self {
            InputSource::File(path) => Some(path.clone()),
            InputSource::Stdin => None,
        }
    }
}

/// Two arguments are query then file; a lone argument is a query when it
/// starts with '.' and does not name an existing file.
fn split_view_args(first: Option<String>, second: Option<String>) -> (Option<String>, Option<String>) {
    match (first, second) {
        (Some(query), Some(file)) => (Some(query), Some(file)),
        (Some(arg), None) if arg.starts_with('.') && !Path::new(&arg).is_file() => {
            (Some(arg), None)
        }
        (Some(file), None) => (None, Some(file)),
        (None, _) => (None, None),
    }
}

fn detect_input(file: Option<&str>) -> Result<InputSource> {
    match file {
        Some("-") => Ok(InputSource::Stdin),
        Some(path) => Ok(InputSource::File(PathBuf::from(path))),
        None => {
            if io::stdin().is_terminal() {
                Err(anyhow!(
                    "No input provided. Pass a YAML/JSON file or pipe content into stdin."
                ))
            } else {
                Ok(InputSource::Stdin)
            }
        }
    }
}

fn read_stdin() -> Result<String> {
    let mut buf = String::new();
    io::stdin()
        .read_to_string(&mut buf)
        .context("Failed to read document from stdin")?;
    Ok(buf)
}

fn read_input(source: &InputSource) -> Result<(Tree, Format)> {
    match source {
        InputSource::File(path) => parse::parse_file(path)
            .with_context(|| format!("Failed to load {}", path.display())),
        InputSource::Stdin => {
            let text = read_stdin()?;
            let tree = parse::parse_yaml(&text).context("Failed to parse stdin")?;
            Ok((tree, Format::Yaml))
        }
    }
}

fn is_tty_stdout() -> bool {
    io::stdout().is_terminal()
}

fn run_view(args: ViewArgs, config: &Config) -> Result<()> {
    let (query, file) = split_view_args(args.first, args.second);
    let input = detect_input(file.as_deref())?;
    let (tree, format) = read_input(&input)?;

    let from = match query.as_deref() {
        Some(query) => get_by_path(&tree, query).context("path query failed")?,
        None => tree.root(),
    };

    if args.json {
        println!("{}", format::to_json(&tree, from, true));
        return Ok(());
    }

    let options = RenderOptions {
        tree_style: args.style.or(config.tree_style).unwrap_or_default(),
        show_types: args.types || config.show_types,
        interactive: args.interactive,
    };

    if !args.interactive {
        let mut lines = TreeRenderer::new(options).render(&tree, from, false);
        // keyless top-level containers have nothing to show without fold markers
        lines.retain(|line| !line.plain.is_empty());
        print!("{}", plain_text(&lines));
        return Ok(());
    }

    let mut app = App::new(tree, input.path(), format, options);
    if query.is_some() {
        app.focus(from);
    }
    run_interactive(&mut app)
}

fn run_diff(args: DiffArgs) -> Result<u8> {
    let (left, left_format) = parse::parse_file(&args.file1)
        .with_context(|| format!("Failed to load {}", args.file1.display()))?;
    let (right, right_format) = parse::parse_file(&args.file2)
        .with_context(|| format!("Failed to load {}", args.file2.display()))?;
    debug!(target: "runtime", %left_format, %right_format, "diff_inputs_loaded");

    let result = diff::compare(Some(&left), Some(&right));
    let left_name = args.file1.display().to_string();
    let right_name = args.file2.display().to_string();

    if args.interactive {
        let mut app = DiffApp::new(&result, &left_name, &right_name);
        run_interactive(&mut app)?;
    } else if args.summary {
        println!("{}", diff_render::render_summary(&result.summary, is_tty_stdout()));
    } else if !result.summary.has_changes() {
        println!("No differences found.");
    } else {
        print!(
            "{}",
            diff_render::render(&result, &left_name, &right_name, is_tty_stdout())
        );
    }

    Ok(result.summary.exit_status())
}

fn run_fmt(args: FmtArgs, config: &Config) -> Result<()> {
    let mut options = FormatOptions::from(config.fmt);
    if let Some(indent) = args.indent {
        options.indent = indent;
    }
    options.sort_keys |= args.sort_keys;

    let Some(path) = args.file else {
        if args.write {
            bail!("cannot use -w with stdin input");
        }
        let text = read_stdin()?;
        let tree = parse::parse_yaml(&text).context("Failed to parse stdin")?;
        print!("{}", format::to_yaml(&tree, &options));
        return Ok(());
    };

    let (tree, format) =
        parse::parse_file(&path).with_context(|| format!("Failed to load {}", path.display()))?;
    let text = format::serialize(&tree, format, &options);
    if args.write {
        format::write_atomic(&path, &text)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        info!(target: "io", file = %path.display(), bytes = text.len(), "formatted_in_place");
    } else {
        print!("{text}");
    }
    Ok(())
}

struct TerminalGuard;

impl TerminalGuard {
    fn enter() -> Result<Self> {
        enable_raw_mode()?;
        io::stdout().execute(EnterAlternateScreen)?;
        Ok(Self)
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen);
    }
}

fn run_interactive<S: Screen>(screen: &mut S) -> Result<()> {
    let _guard = TerminalGuard::enter()?;

    let stdout = io::stdout();
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;
    info!(target: "runtime", "interactive_session_started");

    loop {
        terminal.draw(|frame| screen.draw(frame))?;

        match event::read()? {
            CEvent::Key(key) if key.kind == KeyEventKind::Press => {
                if screen.handle_key(key) {
                    break;
                }
            }
            // The next draw re-measures the frame and re-clamps the viewport.
            CEvent::Resize(..) => {}
            _ => {}
        }
    }

    info!(target: "runtime", "interactive_session_ended");
    Ok(())
}

fn wants_terminal(cli: &Cli) -> bool {
    match &cli.command {
        Some(Command::Diff(args)) => args.interactive,
        Some(Command::Fmt(_)) => false,
        None => cli.view.interactive,
    }
}

fn run(cli: Cli) -> Result<u8> {
    let config = config::load(cli.config.as_deref())?;
    match cli.command {
        Some(Command::Diff(args)) => run_diff(args),
        Some(Command::Fmt(args)) => run_fmt(args, &config).map(|()| 0),
        None => run_view(cli.view, &config).map(|()| 0),
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let target = if wants_terminal(&cli) {
        LogTarget::File
    } else {
        LogTarget::Stderr
    };
    let _log_guard = logging::init(target);

    let is_diff = matches!(cli.command, Some(Command::Diff(_)));
    match run(cli) {
        Ok(status) => ExitCode::from(status),
        Err(err) => {
            eprintln!("Error: {err:#}");
            ExitCode::from(if is_diff { 2 } else { 1 })
        }
    }
}
