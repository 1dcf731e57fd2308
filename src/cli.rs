use crate::config::Config;
use crate::ident::ModIdent;
use crate::logfile;
use crate::manager::Manager;
use crate::save::SaveFile;
use anyhow::{bail, Context, Result};
use std::path::PathBuf;

struct GlobalOptions {
    game_dir: Option<PathBuf>,
    mods_dir: Option<PathBuf>,
    portal_url: Option<String>,
    offline: bool,
}

enum CliCommand {
    List,
    Enable(Vec<ModIdent>),
    Disable(Vec<String>),
    DisableAll,
    Sync(PathBuf),
    SyncLog(PathBuf),
    Help,
    Version,
}

pub fn run() -> Result<()> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let (global, tokens) = parse_global_options(&args);
    let command = parse_command(&tokens)?;

    match command {
        CliCommand::Help => {
            print_help();
            return Ok(());
        }
        CliCommand::Version => {
            println!("gearsmith v{}", env!("CARGO_PKG_VERSION"));
            return Ok(());
        }
        _ => {}
    }

    let mut config = Config::load_or_create()?;
    if let Some(game_dir) = global.game_dir {
        config.game_dir = game_dir;
    }
    if let Some(mods_dir) = global.mods_dir {
        config.mods_dir = Some(mods_dir);
    }
    if let Some(portal_url) = global.portal_url {
        config.portal_url = portal_url;
    }
    if config.game_dir.as_os_str().is_empty() {
        bail!("No game directory configured; pass --game-dir <path>");
    }

    let mut manager = Manager::new(crate::manager::ManagerOptions {
        game_dir: config.game_dir.clone(),
        mods_dir: config.mods_dir(),
        portal_url: config.portal_url.clone(),
        persist: true,
    })
    .context("open mods directory")?;

    run_command(&mut manager, command, !global.offline)
}

fn run_command(manager: &mut Manager, command: CliCommand, use_portal: bool) -> Result<()> {
    match command {
        CliCommand::List => {
            list_mods(manager);
            Ok(())
        }
        CliCommand::Enable(idents) => {
            enable_set(manager, &idents, use_portal);
            manager.save().context("write mod state")
        }
        CliCommand::Disable(names) => {
            for name in &names {
                match manager.disable(name) {
                    Ok(()) => println!("Disabled {name}"),
                    Err(err) => eprintln!("{err}"),
                }
            }
            manager.save().context("write mod state")
        }
        CliCommand::DisableAll => {
            manager.disable_all();
            println!("Disabled all mods");
            manager.save().context("write mod state")
        }
        CliCommand::Sync(path) => {
            let save = SaveFile::read(&path)
                .with_context(|| format!("read save file {}", path.display()))?;
            manager.disable_all();
            manager.merge_startup_settings(&save.startup_settings)?;
            enable_set(manager, &save.mods, use_portal);
            manager.save().context("write mod state")
        }
        CliCommand::SyncLog(path) => {
            let mods = logfile::parse(&path)
                .with_context(|| format!("read log file {}", path.display()))?;
            manager.disable_all();
            enable_set(manager, &mods, use_portal);
            manager.save().context("write mod state")
        }
        CliCommand::Help | CliCommand::Version => Ok(()),
    }
}

fn list_mods(manager: &Manager) {
    for entry in manager.mods() {
        match &entry.enabled {
            Some(version) => println!("[x] {} {version}", entry.name),
            None => println!("[ ] {} {}", entry.name, entry.latest_release().version),
        }
    }
}

/// Expands the requested set through the dependency resolver and enables
/// every resolved release. Per-mod failures are reported and the rest of the
/// batch continues.
fn enable_set(manager: &mut Manager, seeds: &[ModIdent], use_portal: bool) {
    let resolution = manager.expand_dependencies(seeds, use_portal);
    for ident in &resolution.unresolved {
        eprintln!("Could not resolve {ident}");
    }
    for ident in &resolution.mods {
        match manager.enable(ident) {
            Ok(Some(version)) => println!("Enabled {} {version}", ident.name),
            Ok(None) => {}
            Err(err) => eprintln!("{err}"),
        }
    }
}

fn parse_global_options(args: &[String]) -> (GlobalOptions, Vec<String>) {
    let mut global = GlobalOptions {
        game_dir: None,
        mods_dir: None,
        portal_url: None,
        offline: false,
    };
    let mut tokens = Vec::new();
    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        if let Some(value) = arg.strip_prefix("--game-dir=") {
            global.game_dir = Some(PathBuf::from(value));
            continue;
        }
        if arg == "--game-dir" {
            if let Some(value) = iter.next() {
                global.game_dir = Some(PathBuf::from(value));
            }
            continue;
        }
        if let Some(value) = arg.strip_prefix("--mods-dir=") {
            global.mods_dir = Some(PathBuf::from(value));
            continue;
        }
        if arg == "--mods-dir" {
            if let Some(value) = iter.next() {
                global.mods_dir = Some(PathBuf::from(value));
            }
            continue;
        }
        if let Some(value) = arg.strip_prefix("--portal=") {
            global.portal_url = Some(value.to_string());
            continue;
        }
        if arg == "--portal" {
            if let Some(value) = iter.next() {
                global.portal_url = Some(value.to_string());
            }
            continue;
        }
        if arg == "--offline" {
            global.offline = true;
            continue;
        }
        tokens.push(arg.to_string());
    }
    (global, tokens)
}

fn parse_command(tokens: &[String]) -> Result<CliCommand> {
    let Some(head) = tokens.first() else {
        return Ok(CliCommand::Help);
    };
    match head.as_str() {
        "list" => Ok(CliCommand::List),
        "enable" => {
            let idents: Vec<ModIdent> = tokens[1..]
                .iter()
                .map(|token| ModIdent::parse(token))
                .collect();
            if idents.is_empty() {
                bail!("enable requires one or more mods");
            }
            Ok(CliCommand::Enable(idents))
        }
        "disable" => {
            let names: Vec<String> = tokens[1..].to_vec();
            if names.is_empty() {
                bail!("disable requires one or more mods");
            }
            Ok(CliCommand::Disable(names))
        }
        "disable-all" => Ok(CliCommand::DisableAll),
        "sync" => {
            let path = tokens
                .get(1)
                .ok_or_else(|| anyhow::anyhow!("sync requires a save file"))?;
            Ok(CliCommand::Sync(PathBuf::from(path)))
        }
        "sync-log" => {
            let path = tokens
                .get(1)
                .ok_or_else(|| anyhow::anyhow!("sync-log requires a log file"))?;
            Ok(CliCommand::SyncLog(PathBuf::from(path)))
        }
        "help" | "--help" | "-h" => Ok(CliCommand::Help),
        "version" | "--version" | "-V" => Ok(CliCommand::Version),
        _ => bail!("Unknown command: {head} (run 'gearsmith help')"),
    }
}

fn print_help() {
    println!("gearsmith v{}", env!("CARGO_PKG_VERSION"));
    println!("Usage:");
    println!("  gearsmith list                    List installed mods");
    println!("  gearsmith enable <mods...>        Enable mods (name or name_version)");
    println!("  gearsmith disable <mods...>       Disable mods");
    println!("  gearsmith disable-all             Disable all non-built-in mods");
    println!("  gearsmith sync <save-file>        Match the mod set of a save file");
    println!("  gearsmith sync-log <log-file>     Match the mod set of a game log");
    println!();
    println!("Global options:");
    println!("  --game-dir <path>                 Game installation directory");
    println!("  --mods-dir <path>                 Mods directory (default <game-dir>/mods)");
    println!("  --portal <url>                    Mod registry URL");
    println!("  --offline                         Never consult the registry");
    println!("  -h, --help                        Show help");
    println!("  -V, --version                     Show version");
}
