// ============================================================================
// LogoPaint CLI - headless editing via command-line arguments
// ============================================================================
//
// Usage examples:
//   logopaint new --width 32 --height 32 -o logo.json
//   logopaint replay logo.json strokes.txt
//   logopaint export logo.json -o logo.png
//   logopaint export "logos/*.json" --output-dir png/
//   logopaint import badge.png -o badge.json
//
// Everything runs synchronously on the current thread.

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Instant;

use clap::{Parser, Subcommand};

use crate::canvas::{PixelBuffer, Point, clamp_dimension};
use crate::io::{self, SessionDocument};
use crate::project::Project;
use crate::settings::AppSettings;

// ============================================================================
// CLI argument definition (clap Derive)
// ============================================================================

/// LogoPaint headless logo editor.
#[derive(Parser, Debug)]
#[command(
    name = "logopaint",
    about = "Pixel-accurate logo editor, headless",
    long_about = "Create logo sessions, replay pointer-event scripts against them and\n\
                  convert between session documents, portable bitmap JSON and PNG.\n\n\
                  Example:\n  \
                  logopaint new -o logo.json\n  \
                  logopaint replay logo.json strokes.txt\n  \
                  logopaint export logo.json -o logo.png"
)]
pub struct CliArgs {
    #[command(subcommand)]
    pub command: Command,

    /// Print per-file timing and progress.
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Create an empty session document.
    New {
        /// Canvas width (clamped to 1..=4096). Defaults to the configured size.
        #[arg(long)]
        width: Option<f64>,
        /// Canvas height (clamped to 1..=4096).
        #[arg(long)]
        height: Option<f64>,
        #[arg(short, long, value_name = "FILE")]
        output: PathBuf,
    },
    /// Render session documents or portable bitmaps to PNG.
    Export {
        /// Input file(s). Glob patterns accepted (e.g. "logos/*.json").
        #[arg(required = true, num_args = 1..)]
        input: Vec<String>,
        /// Output PNG path. Only valid for single-file input.
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,
        /// Output directory for batch export.
        #[arg(long, value_name = "DIR")]
        output_dir: Option<PathBuf>,
    },
    /// Convert a PNG to portable bitmap JSON.
    Import {
        input: PathBuf,
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,
    },
    /// Apply a pointer-event script to a session document.
    Replay {
        session: PathBuf,
        script: PathBuf,
        /// Write the result here instead of overwriting the session.
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,
    },
}

// ============================================================================
// Public entry point
// ============================================================================

/// Run the requested command and return an OS exit code.
/// `0` = success, `1` = one or more failures.
pub fn run(args: CliArgs) -> ExitCode {
    let settings = AppSettings::load();
    let result = match args.command {
        Command::New {
            width,
            height,
            output,
        } => run_new(&settings, width, height, &output),
        Command::Export {
            input,
            output,
            output_dir,
        } => return run_export(&input, output.as_deref(), output_dir.as_deref(), args.verbose),
        Command::Import { input, output } => run_import(&input, output.as_deref()),
        Command::Replay {
            session,
            script,
            output,
        } => run_replay(&settings, &session, &script, output.as_deref(), args.verbose),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log_err!("{}", e);
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

// ============================================================================
// Commands
// ============================================================================

fn run_new(
    settings: &AppSettings,
    width: Option<f64>,
    height: Option<f64>,
    output: &Path,
) -> Result<(), String> {
    let mut project = Project::from_settings(&AppSettings {
        canvas_width: width.map(clamp_dimension).unwrap_or(settings.canvas_width),
        canvas_height: height.map(clamp_dimension).unwrap_or(settings.canvas_height),
        ..settings.clone()
    });
    project
        .save(output)
        .map_err(|e| format!("could not write '{}': {}", output.display(), e))?;
    println!(
        "{} ({}×{})",
        output.display(),
        project.logo().width(),
        project.logo().height()
    );
    Ok(())
}

fn run_export(
    patterns: &[String],
    output: Option<&Path>,
    output_dir: Option<&Path>,
    verbose: bool,
) -> ExitCode {
    let inputs = resolve_inputs(patterns);
    if inputs.is_empty() {
        eprintln!("error: no input files matched the given pattern(s).");
        return ExitCode::FAILURE;
    }

    if inputs.len() > 1 && output.is_some() && output_dir.is_none() {
        eprintln!(
            "error: {} input files given but --output only accepts a single file path.\n\
             Use --output-dir to specify a destination directory for batch export.",
            inputs.len()
        );
        return ExitCode::FAILURE;
    }

    if let Some(dir) = output_dir
        && let Err(e) = std::fs::create_dir_all(dir)
    {
        eprintln!(
            "error: could not create output directory '{}': {}",
            dir.display(),
            e
        );
        return ExitCode::FAILURE;
    }

    let total = inputs.len();
    let multi = total > 1;
    let mut any_failure = false;

    for (idx, input_path) in inputs.iter().enumerate() {
        if multi || verbose {
            println!("[{}/{}] {}", idx + 1, total, input_path.display());
        }
        let file_start = Instant::now();

        let Some(output_path) = build_output_path(input_path, output, output_dir, "png") else {
            eprintln!(
                "  error: cannot determine output path for '{}'.",
                input_path.display()
            );
            any_failure = true;
            continue;
        };

        match export_one(input_path, &output_path) {
            Ok(()) => {
                if verbose || multi {
                    println!(
                        "  → {} ({:.0}ms)",
                        output_path.display(),
                        file_start.elapsed().as_secs_f64() * 1000.0
                    );
                }
            }
            Err(e) => {
                log_err!("export of {} failed: {}", input_path.display(), e);
                eprintln!("  error: {}", e);
                any_failure = true;
            }
        }
    }

    if any_failure { ExitCode::FAILURE } else { ExitCode::SUCCESS }
}

fn export_one(input: &Path, output: &Path) -> Result<(), String> {
    let logo = load_logo(input)?;
    io::export_png(&logo, output).map_err(|e| format!("save failed: {}", e))
}

fn run_import(input: &Path, output: Option<&Path>) -> Result<(), String> {
    let logo = io::import_png(input).map_err(|e| format!("load failed: {}", e))?;
    let output = match output {
        Some(p) => p.to_path_buf(),
        None => build_output_path(input, None, None, "json")
            .ok_or_else(|| format!("cannot determine output path for '{}'", input.display()))?,
    };
    std::fs::write(&output, logo.to_json())
        .map_err(|e| format!("could not write '{}': {}", output.display(), e))?;
    println!("{}", output.display());
    Ok(())
}

fn run_replay(
    settings: &AppSettings,
    session: &Path,
    script: &Path,
    output: Option<&Path>,
    verbose: bool,
) -> Result<(), String> {
    let mut project = Project::open(session, settings)
        .map_err(|e| format!("could not open session '{}': {}", session.display(), e))?;
    let source = std::fs::read_to_string(script)
        .map_err(|e| format!("could not read script '{}': {}", script.display(), e))?;

    let steps = replay_script(&mut project, &source)?;
    if verbose {
        println!(
            "  {} commands, {} undo steps",
            steps,
            project.history().undo_count()
        );
    }

    let target = output.unwrap_or(session);
    project
        .save(target)
        .map_err(|e| format!("could not write '{}': {}", target.display(), e))?;
    println!("{}", target.display());
    Ok(())
}

// ============================================================================
// Replay scripts
// ============================================================================

/// One line of a replay script.
#[derive(Clone, Debug, PartialEq)]
pub enum ReplayCommand {
    Tool(i64),
    Color(String),
    Size(u32),
    Down(Point),
    Move(Point),
    Up(Point),
    Cancel,
    Undo,
    Redo,
    Clear,
}

/// Parse one script line. Blank lines and lines starting with `#` yield `None`.
pub fn parse_command(line: &str) -> Result<Option<ReplayCommand>, String> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return Ok(None);
    }
    let (verb, rest) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
    let rest = rest.trim();

    let point = |rest: &str| -> Result<Point, String> {
        let mut parts = rest.split_whitespace();
        let (Some(x), Some(y), None) = (parts.next(), parts.next(), parts.next()) else {
            return Err(format!("expected 'X Y', got '{}'", rest));
        };
        let x = x.parse::<i32>().map_err(|e| format!("bad x '{}': {}", x, e))?;
        let y = y.parse::<i32>().map_err(|e| format!("bad y '{}': {}", y, e))?;
        Ok(Point::new(x, y))
    };

    let cmd = match verb.to_lowercase().as_str() {
        "tool" => ReplayCommand::Tool(
            rest.parse()
                .map_err(|e| format!("bad tool index '{}': {}", rest, e))?,
        ),
        "color" if !rest.is_empty() => ReplayCommand::Color(rest.to_string()),
        "size" => ReplayCommand::Size(
            rest.parse()
                .map_err(|e| format!("bad brush size '{}': {}", rest, e))?,
        ),
        "down" => ReplayCommand::Down(point(rest)?),
        "move" => ReplayCommand::Move(point(rest)?),
        "up" => ReplayCommand::Up(point(rest)?),
        "cancel" => ReplayCommand::Cancel,
        "undo" => ReplayCommand::Undo,
        "redo" => ReplayCommand::Redo,
        "clear" => ReplayCommand::Clear,
        _ => return Err(format!("unknown command '{}'", line)),
    };
    Ok(Some(cmd))
}

pub fn apply_command(project: &mut Project, cmd: ReplayCommand) {
    match cmd {
        ReplayCommand::Tool(index) => project.select_tool(index),
        ReplayCommand::Color(css) => project.set_color(css),
        ReplayCommand::Size(size) => project.set_brush_size(size),
        ReplayCommand::Down(p) => project.pointer_down(p),
        ReplayCommand::Move(p) => project.pointer_move(p),
        ReplayCommand::Up(p) => {
            project.pointer_up(p);
        }
        ReplayCommand::Cancel => project.cancel(),
        ReplayCommand::Undo => {
            project.undo();
        }
        ReplayCommand::Redo => {
            project.redo();
        }
        ReplayCommand::Clear => {
            project.clear();
        }
    }
}

/// Parse and apply a whole script. The script is validated up front so a
/// typo on the last line leaves the project untouched.
pub fn replay_script(project: &mut Project, source: &str) -> Result<usize, String> {
    let mut commands = Vec::new();
    for (n, line) in source.lines().enumerate() {
        if let Some(cmd) = parse_command(line).map_err(|e| format!("line {}: {}", n + 1, e))? {
            commands.push(cmd);
        }
    }
    let count = commands.len();
    for cmd in commands {
        apply_command(project, cmd);
    }
    Ok(count)
}

// ============================================================================
// Helpers
// ============================================================================

/// Read a logo from either a session document or a portable bitmap file.
fn load_logo(path: &Path) -> Result<PixelBuffer, String> {
    let text = std::fs::read_to_string(path).map_err(|e| format!("load failed: {}", e))?;
    let portable = match serde_json::from_str::<SessionDocument>(&text) {
        Ok(doc) => doc.logo,
        Err(_) => serde_json::from_str(&text).map_err(|e| format!("not a logo file: {}", e))?,
    };
    PixelBuffer::decode_portable(&portable).map_err(|e| format!("invalid logo: {}", e))
}

/// Expand glob patterns and literal paths into a deduplicated, ordered list.
fn resolve_inputs(patterns: &[String]) -> Vec<PathBuf> {
    let mut result: Vec<PathBuf> = Vec::new();

    for pattern in patterns {
        let as_path = Path::new(pattern);

        if as_path.exists() {
            if !result.iter().any(|p| p.as_path() == as_path) {
                result.push(as_path.to_path_buf());
            }
            continue;
        }

        match glob::glob(pattern) {
            Ok(entries) => {
                let mut matched = false;
                for entry in entries.flatten() {
                    if !result.contains(&entry) {
                        result.push(entry);
                    }
                    matched = true;
                }
                if !matched {
                    eprintln!("warning: pattern '{}' matched no files.", pattern);
                }
            }
            Err(e) => {
                eprintln!("warning: invalid glob '{}': {}", pattern, e);
            }
        }
    }

    result
}

/// Compute the output path for a single input file.
///
/// Priority:
/// 1. `--output` (explicit path, used for single-file input)
/// 2. `--output-dir` (batch directory, derives filename from input stem)
/// 3. Fallback: next to the input with the new extension
///    (appends `_out` to the stem if it would collide with the input path)
fn build_output_path(
    input: &Path,
    output: Option<&Path>,
    output_dir: Option<&Path>,
    ext: &str,
) -> Option<PathBuf> {
    if let Some(out) = output {
        return Some(out.to_path_buf());
    }

    let stem = input.file_stem()?.to_string_lossy().into_owned();

    if let Some(dir) = output_dir {
        return Some(dir.join(format!("{}.{}", stem, ext)));
    }

    let parent = input.parent().unwrap_or(Path::new(""));
    let candidate = parent.join(format!("{}.{}", stem, ext));
    if candidate == input {
        Some(parent.join(format!("{}_out.{}", stem, ext)))
    } else {
        Some(candidate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canvas::Color;

    #[test]
    fn parses_commands_and_comments() {
        assert_eq!(parse_command("  # just a note").unwrap(), None);
        assert_eq!(parse_command("").unwrap(), None);
        assert_eq!(
            parse_command("down 3 -4").unwrap(),
            Some(ReplayCommand::Down(Point::new(3, -4)))
        );
        assert_eq!(
            parse_command("color rgb(1, 2, 3)").unwrap(),
            Some(ReplayCommand::Color("rgb(1, 2, 3)".to_string()))
        );
        assert_eq!(
            parse_command("color #ff0000").unwrap(),
            Some(ReplayCommand::Color("#ff0000".to_string()))
        );
        assert_eq!(parse_command("TOOL 7").unwrap(), Some(ReplayCommand::Tool(7)));
        assert_eq!(parse_command("undo").unwrap(), Some(ReplayCommand::Undo));
    }

    #[test]
    fn rejects_malformed_lines() {
        for line in ["down 1", "move a b", "size -2", "paint 1 1", "color", "up 1 2 3"] {
            assert!(parse_command(line).is_err(), "{line}");
        }
    }

    #[test]
    fn replay_draws_a_line() {
        let mut project = Project::new(10, 10);
        let script = "tool 0\ncolor #0000ff\ndown 1 1\nmove 4 1\nup 8 1\n";
        assert_eq!(replay_script(&mut project, script).unwrap(), 5);
        for x in 1..=8 {
            assert_eq!(project.logo().get(x, 1), Color::rgb(0, 0, 255));
        }
        assert_eq!(project.logo().get(9, 1), Color::TRANSPARENT);
        assert_eq!(project.history().undo_count(), 1);
    }

    #[test]
    fn replay_survives_far_off_canvas_pointers() {
        let mut project = Project::new(16, 16);
        let script = "tool 2\ndown 0 0\nup 2000000 2000000\n\
                      tool 0\ndown 0 0\nup -2000000 2000000\n\
                      tool 3\ndown 8 8\nmove 2000000000 0\nup -2000000000 0\n";
        assert_eq!(replay_script(&mut project, script).unwrap(), 9);
        // The oversized ellipse draws nothing and the line leaves at once.
        assert_eq!(project.logo().get(0, 0), Color::BLACK);
        assert_eq!(project.logo().get(1, 1), Color::TRANSPARENT);
        assert_eq!(project.logo().get(8, 8), Color::BLACK);
        assert_eq!(project.history().undo_count(), 2);
    }

    #[test]
    fn bad_script_leaves_project_untouched() {
        let mut project = Project::new(4, 4);
        let err = replay_script(&mut project, "down 0 0\nup 0 0\nbogus\n").unwrap_err();
        assert!(err.starts_with("line 3"));
        assert_eq!(project.history().undo_count(), 0);
    }

    #[test]
    fn output_path_fallbacks() {
        let input = Path::new("dir/logo.json");
        assert_eq!(
            build_output_path(input, None, Some(Path::new("out")), "png"),
            Some(PathBuf::from("out/logo.png"))
        );
        assert_eq!(
            build_output_path(input, None, None, "png"),
            Some(PathBuf::from("dir/logo.png"))
        );
        assert_eq!(
            build_output_path(input, None, None, "json"),
            Some(PathBuf::from("dir/logo_out.json"))
        );
    }
}
