//! umbra - inspect and change the stored theme preference.
//!
//! Run with: cargo run --features clap --bin umbra -- <command>

use std::io::BufRead;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use console::Style;
use umbra::{
    ColorMode, JsonFileStorage, OsRefresher, OsWatcher, Preference, ThemeConfig, ThemeStore,
};

/// Inspect and change the light/dark theme preference.
#[derive(Parser)]
#[command(name = "umbra", version, about)]
struct Cli {
    /// YAML config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// JSON settings file holding the preference (overrides the config)
    #[arg(long, global = true)]
    store: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the preference and the resolved mode
    Get,
    /// Set the preference: light, dark or system
    Set { preference: String },
    /// Move to the next preference (light -> dark -> system)
    Cycle,
    /// Print a footer styled for the resolved mode
    Footer,
    /// Re-read the system mode each time Enter is pressed; Ctrl-D to quit
    Watch,
}

fn mode_style(mode: ColorMode) -> Style {
    mode.select(
        Style::new().black().on_white(),
        Style::new().white().on_black(),
    )
}

fn print_state(store: &ThemeStore) {
    let resolved = store.resolved_theme();
    println!(
        "preference: {}\nresolved:   {}",
        store.preference(),
        mode_style(resolved).apply_to(resolved)
    );
}

fn footer(mode: ColorMode) -> String {
    let muted = mode.select(Style::new().color256(244), Style::new().color256(240));
    muted
        .apply_to("umbra - follows your system theme unless told otherwise")
        .to_string()
}

fn build_store(cli: &Cli) -> Result<(ThemeStore, OsRefresher)> {
    let config = match &cli.config {
        Some(path) => ThemeConfig::from_yaml_file(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => ThemeConfig::default(),
    };

    let watcher = OsWatcher::new();
    let refresher = watcher.refresher();

    let mut builder = ThemeStore::builder().config(&config).watcher(watcher);
    if let Some(path) = &cli.store {
        builder = builder.storage(JsonFileStorage::with_key(
            path,
            config.storage_key.clone(),
        ));
    }
    Ok((builder.build()?, refresher))
}

fn watch(store: &ThemeStore, refresher: &OsRefresher) -> Result<()> {
    let sub = store.subscribe(|mode| {
        println!("{}", mode_style(mode).apply_to(format!("now {mode}")));
    });
    print_state(store);

    for line in std::io::stdin().lock().lines() {
        line?;
        refresher.refresh();
    }
    sub.unsubscribe();
    Ok(())
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();
    let (store, refresher) = build_store(&cli)?;

    match &cli.command {
        Command::Get => print_state(&store),
        Command::Set { preference } => {
            let preference: Preference = preference.parse()?;
            store.set_preference(preference)?;
            print_state(&store);
        }
        Command::Cycle => {
            store.cycle_preference()?;
            print_state(&store);
        }
        Command::Footer => println!("{}", footer(store.resolved_theme())),
        Command::Watch => watch(&store, &refresher)?,
    }

    store.shutdown();
    Ok(())
}
