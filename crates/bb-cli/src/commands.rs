use std::io::{self, BufRead, Write};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use anyhow::Context;
use bb_action::{ActionReport, ActionStatus, Loader};
use bb_memory::Store;
use bb_system::{System, SystemConfig};
use colored::Colorize;

use crate::cli::*;
use crate::workers;

pub fn run_command(cli: Cli) -> anyhow::Result<()> {
    let config = load_config(&cli)?;
    let loader = Arc::new(workers::registry()?);
    let system = System::open(config, Arc::clone(&loader) as Arc<dyn Loader>)
        .context("failed to open the blackboard")?;

    match cli.command {
        Command::Run(args) => cmd_run(&system, args, &cli.format)?,
        Command::Action(args) => cmd_action(&system, loader.as_ref(), args, &cli.format)?,
        Command::Node(args) => cmd_node(&system, args, &cli.format)?,
        Command::Status(_) => cmd_status(&system, loader.as_ref(), &cli.format)?,
    }

    system.shutdown().context("failed to save the blackboard")?;
    Ok(())
}

fn load_config(cli: &Cli) -> anyhow::Result<SystemConfig> {
    let mut config = match &cli.config {
        Some(path) => SystemConfig::load(path)
            .with_context(|| format!("failed to load {}", path.display()))?,
        None => SystemConfig::default(),
    };
    if let Some(dir) = &cli.data_dir {
        config.data_dir = dir.clone();
    }
    Ok(config)
}

/// Ask a yes/no question. Only an answer starting with `y` is a yes.
fn confirm(question: &str, input: &mut impl BufRead, output: &mut impl Write) -> io::Result<bool> {
    write!(output, "{question} (y/n) ")?;
    output.flush()?;
    let mut answer = String::new();
    input.read_line(&mut answer)?;
    Ok(answer.trim_start().to_ascii_lowercase().starts_with('y'))
}

fn cmd_run(system: &System, args: RunArgs, format: &OutputFormat) -> anyhow::Result<()> {
    if !args.yes {
        let stdin = io::stdin();
        if !confirm("Run system?", &mut stdin.lock(), &mut io::stdout())? {
            println!("Not started.");
            return Ok(());
        }
    }

    let running = system.run_all();
    println!(
        "{} {} of {} actions running",
        "✓".green().bold(),
        running.to_string().bold(),
        system.actions().len()
    );

    match args.duration {
        Some(secs) => thread::sleep(Duration::from_secs(secs)),
        None => {
            println!("Press Enter to stop.");
            let mut line = String::new();
            io::stdin().lock().read_line(&mut line)?;
        }
    }

    system.stop_all();
    print_reports(&system.reports(), format)
}

fn cmd_action(
    system: &System,
    loader: &dyn Loader,
    args: ActionArgs,
    format: &OutputFormat,
) -> anyhow::Result<()> {
    match args.action {
        ActionCommand::Add { path, name } => {
            if let Err(e) = loader.load(&path, &name) {
                println!("{} {}", "warning:".yellow().bold(), e);
            }
            system.append_action(&path, &name)?;
            println!("{} Added action {} ({})", "✓".green(), name.bold(), path.display());
        }
        ActionCommand::Remove { name } => {
            system.remove_action(&name)?;
            println!("{} Removed action {}", "✓".green(), name.bold());
        }
        ActionCommand::List => print_reports(&system.reports(), format)?,
    }
    Ok(())
}

fn cmd_node(system: &System, args: NodeArgs, format: &OutputFormat) -> anyhow::Result<()> {
    let memory = system.memory();
    match args.action {
        NodeCommand::Add { words } => {
            for word in &words {
                memory.append_node(word)?;
                println!("{} Added node {}", "✓".green(), word.bold());
            }
        }
        NodeCommand::Remove { word } => {
            memory.remove_node(&word)?;
            println!("{} Removed node {}", "✓".green(), word.bold());
        }
        NodeCommand::List => match format {
            OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&memory.words())?),
            OutputFormat::Text => {
                let words = memory.words();
                if words.is_empty() {
                    println!("No nodes registered.");
                }
                for word in words {
                    println!("  {word}");
                }
            }
        },
    }
    Ok(())
}

fn cmd_status(system: &System, loader: &dyn Loader, format: &OutputFormat) -> anyhow::Result<()> {
    let config = system.config();
    if let OutputFormat::Json = format {
        let actions: Vec<_> = system
            .actions()
            .iter()
            .map(|a| {
                serde_json::json!({
                    "name": a.name(),
                    "path": a.path(),
                    "resolved": loader.load(a.path(), a.name()).is_ok(),
                })
            })
            .collect();
        let status = serde_json::json!({
            "nodes_file": config.nodes_path(),
            "actions_file": config.actions_path(),
            "nodes": system.memory().len(),
            "actions": actions,
        });
        println!("{}", serde_json::to_string_pretty(&status)?);
        return Ok(());
    }

    println!("Node list: {}", config.nodes_path().display().to_string().cyan());
    println!("Roster:    {}", config.actions_path().display().to_string().cyan());
    println!("Nodes: {}", system.memory().len().to_string().bold());
    println!("Actions: {}", system.actions().len().to_string().bold());
    for action in system.actions() {
        let resolved = match loader.load(action.path(), action.name()) {
            Ok(_) => "resolved".green(),
            Err(_) => "unresolved".red(),
        };
        println!("  {} ({}) {}", action.name().bold(), action.path().display(), resolved);
    }
    Ok(())
}

fn paint(status: ActionStatus) -> colored::ColoredString {
    match status {
        ActionStatus::Running => status.to_string().green(),
        ActionStatus::Stopped => status.to_string().yellow(),
        ActionStatus::Failed => status.to_string().red().bold(),
    }
}

fn print_reports(reports: &[(String, ActionReport)], format: &OutputFormat) -> anyhow::Result<()> {
    if let OutputFormat::Json = format {
        let mut map = serde_json::Map::new();
        for (name, report) in reports {
            map.insert(name.clone(), serde_json::to_value(report)?);
        }
        println!("{}", serde_json::to_string_pretty(&map)?);
        return Ok(());
    }

    if reports.is_empty() {
        println!("No actions in the roster.");
    }
    for (name, report) in reports {
        println!(
            "  {:<16} {:<8} invocations {:<8} errors {}",
            name.bold(),
            paint(report.status),
            report.invocations,
            report.total_errors
        );
        if let (Some(error), Some(at)) = (&report.last_error, report.last_error_at) {
            println!("    last error at {}: {}", at.to_rfc3339().dimmed(), error);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use std::io::Cursor;

    fn answer(text: &str) -> bool {
        let mut out = Vec::new();
        let yes = confirm("Run system?", &mut Cursor::new(text.as_bytes()), &mut out).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "Run system? (y/n) ");
        yes
    }

    #[test]
    fn confirmation_gate() {
        assert!(answer("y\n"));
        assert!(answer("Yes\n"));
        assert!(!answer("n\n"));
        assert!(!answer("\n"));
        assert!(!answer(""));
    }

    #[test]
    fn data_dir_overrides_default() {
        let cli = Cli::try_parse_from(["blackboard", "--data-dir", "/srv/bb", "status"]).unwrap();
        let config = load_config(&cli).unwrap();
        assert_eq!(config.nodes_path(), std::path::PathBuf::from("/srv/bb/memory/data/nodes.data"));
    }

    #[test]
    fn data_dir_overrides_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bb.toml");
        std::fs::write(&path, "data_dir = \"/from/file\"\n[supervisor]\ncritical_errors = 5\n").unwrap();

        let from_file = Cli::try_parse_from(["blackboard", "-c", path.to_str().unwrap(), "status"]).unwrap();
        let config = load_config(&from_file).unwrap();
        assert_eq!(config.data_dir, std::path::PathBuf::from("/from/file"));
        assert_eq!(config.supervisor.critical_errors, 5);

        let overridden = Cli::try_parse_from([
            "blackboard", "-c", path.to_str().unwrap(), "--data-dir", "/cli", "status",
        ])
        .unwrap();
        assert_eq!(load_config(&overridden).unwrap().data_dir, std::path::PathBuf::from("/cli"));
    }

    #[test]
    fn commands_persist_between_runs() {
        let dir = tempfile::tempdir().unwrap();
        let data = dir.path().to_str().unwrap();
        let run = |args: &[&str]| {
            let mut argv = vec!["blackboard", "--data-dir", data];
            argv.extend_from_slice(args);
            run_command(Cli::try_parse_from(argv).unwrap())
        };

        run(&["node", "add", "GAZP", "M1"]).unwrap();
        run(&["action", "add", "builtin", "heartbeat"]).unwrap();
        run(&["run", "--yes", "--duration", "0"]).unwrap();

        let system = System::open(
            SystemConfig::with_data_dir(dir.path()),
            Arc::new(workers::registry().unwrap()),
        )
        .unwrap();
        let words = system.memory().words();
        assert!(words.contains(&"GAZP".to_string()));
        assert_eq!(system.actions()[0].name(), "heartbeat");

        assert!(run(&["action", "add", "builtin", "heartbeat"]).is_err());
        assert!(run(&["node", "remove", "nowhere"]).is_err());
    }
}
