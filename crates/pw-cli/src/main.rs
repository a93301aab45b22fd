//! PageWidth CLI
//!
//! Drives the PageWidth engine against a JSON state file: manage site rules,
//! inspect precedence for a URL and preview what open tabs would receive.

mod state_file;
mod tabs;

use clap::{Parser, Subcommand};

use pw_core::dispatch::decide;
use pw_core::{normalize, Request, Response, Router, StateStore, StyleMap};

use state_file::JsonFileStore;
use tabs::PrintedTabs;

#[derive(Parser)]
#[command(name = "pw-cli")]
#[command(about = "PageWidth site rules and style preview")]
struct Cli {
    /// State file
    #[arg(long, global = true, env = "PAGEWIDTH_STATE", default_value = "pagewidth.json")]
    state: String,

    /// Open tab URL (repeatable, first is active); mutations re-style these
    #[arg(long = "tab", global = true)]
    tabs: Vec<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write the install defaults
    Init {
        /// Overwrite an existing state file
        #[arg(short, long)]
        force: bool,
    },

    /// Register a URL pattern
    Add {
        url: String,

        /// Register the sibling pattern instead
        #[arg(short, long)]
        siblings: bool,
    },

    /// Remove a registered pattern
    Remove { url: String },

    /// List registered patterns
    List,

    /// Show matching rules and the resulting styles for a URL
    Match { url: String },

    /// Set the global styles
    Styles {
        #[arg(long)]
        max_width: Option<String>,

        #[arg(long)]
        margin_left: Option<String>,
    },

    /// Set inverse mode
    Inverse {
        #[arg(value_parser = ["true", "false"])]
        value: String,
    },

    /// Enable or disable the rule matching a URL
    Toggle {
        url: String,

        #[arg(long, conflicts_with = "enable")]
        disable: bool,

        #[arg(long)]
        enable: bool,
    },

    /// Show the active tab and its matching rule
    Info,

    /// Re-style every --tab and print the messages
    Sweep,

    /// Send a raw JSON message to the router
    Send { json: String },
}

fn main() {
    pretty_env_logger::init();
    let cli = Cli::parse();

    let mut store = JsonFileStore::new(&cli.state);
    let mut tabs = PrintedTabs::new(&cli.tabs, true);

    let result = match cli.command {
        Commands::Init { force } => cmd_init(&mut store, force),
        Commands::Add { url, siblings } => run(
            &mut store,
            &mut tabs,
            &Request::AddSite {
                url,
                include_siblings: siblings,
            },
        ),
        Commands::Remove { url } => run(&mut store, &mut tabs, &Request::Remove { url }),
        Commands::List => cmd_list(&store),
        Commands::Match { url } => cmd_match(&store, &url),
        Commands::Styles {
            max_width,
            margin_left,
        } => cmd_styles(&mut store, &mut tabs, max_width, margin_left),
        Commands::Inverse { value } => run(&mut store, &mut tabs, &Request::ToggleInverse { value }),
        Commands::Toggle { url, disable, .. } => run(
            &mut store,
            &mut tabs,
            &Request::ToggleSite {
                url,
                checked: !disable,
            },
        ),
        Commands::Info => run(&mut store, &mut tabs, &Request::Info),
        Commands::Sweep => cmd_sweep(&mut store, &mut tabs),
        Commands::Send { json } => cmd_send(&mut store, &mut tabs, &json),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

fn cmd_init(store: &mut JsonFileStore, force: bool) -> Result<(), String> {
    if store.path().exists() && !force {
        return Err(format!(
            "'{}' already exists (use --force to overwrite)",
            store.path().display()
        ));
    }

    let mut no_tabs = PrintedTabs::new(&[], false);
    Router::new(store, &mut no_tabs)
        .on_installed("install")
        .map_err(|e| e.to_string())?;

    println!("Wrote install defaults to '{}'", store.path().display());
    Ok(())
}

fn run(store: &mut JsonFileStore, tabs: &mut PrintedTabs, request: &Request) -> Result<(), String> {
    let response = Router::new(store, tabs).handle(request);
    print_response(&response)
}

fn print_response(response: &Response) -> Result<(), String> {
    match response {
        Response::Done { status } => {
            println!("{status}");
            Ok(())
        }
        Response::Info(reply) => {
            println!("Tab:      {}", reply.tab_url);
            match &reply.matching_site {
                Some(site) => println!(
                    "Match:    {} ({})",
                    site.url,
                    if site.enabled { "enabled" } else { "disabled" }
                ),
                None => println!("Match:    none"),
            }
            println!("Inverse:  {}", reply.storage.inverse);
            println!("Sites:    {}", reply.storage.sites.len());
            Ok(())
        }
        Response::Styles(message) => {
            let json = serde_json::to_string(message).map_err(|e| e.to_string())?;
            println!("{json}");
            Ok(())
        }
        Response::Error { error, .. } => Err(format!("{}: {}", error.name, error.message)),
    }
}

fn cmd_list(store: &JsonFileStore) -> Result<(), String> {
    let state = store.load().map_err(|e| e.to_string())?;

    println!("Inverse:  {}", state.inverse);
    println!("Styles:   {}", format_styles(&state.global_styles));
    println!("Sites:    {}", state.sites.len());

    let sites = state.sites.sites();
    for site in sites {
        let mut notes = Vec::new();
        if !site.enabled {
            notes.push("disabled".to_string());
        }
        if site.use_own_styles {
            notes.push(format!("own styles {}", format_styles(&site.styles)));
        }
        if site.covers_disabled_site(sites) {
            notes.push("covers a disabled rule".to_string());
        }

        if notes.is_empty() {
            println!("  {}", site.url);
        } else {
            println!("  {} ({})", site.url, notes.join(", "));
        }
    }
    Ok(())
}

fn cmd_match(store: &JsonFileStore, url: &str) -> Result<(), String> {
    let state = store.load().map_err(|e| e.to_string())?;
    let url = normalize(url).map_err(|e| e.to_string())?;

    println!("URL:      {url}");
    let candidates = state.sites.search(&url);
    if candidates.is_empty() {
        println!("Matches:  none");
    } else {
        println!("Matches:");
        for site in &candidates {
            println!("  {} ({} chars)", site.url, site.url.len());
        }
    }

    match state.sites.best_match(&url) {
        Some(site) => println!("Best:     {}", site.url),
        None => println!("Best:     none"),
    }

    match decide(&state, &url) {
        Some(styles) => println!("Result:   {}", format_styles(styles)),
        None => println!("Result:   cleared"),
    }
    Ok(())
}

fn cmd_styles(
    store: &mut JsonFileStore,
    tabs: &mut PrintedTabs,
    max_width: Option<String>,
    margin_left: Option<String>,
) -> Result<(), String> {
    let mut styles = store.load().map_err(|e| e.to_string())?.global_styles;
    if let Some(value) = max_width {
        styles.insert("maxWidth".to_string(), value);
    }
    if let Some(value) = margin_left {
        styles.insert("marginLeft".to_string(), value);
    }

    run(store, tabs, &Request::UpdateStyles { styles })
}

fn cmd_sweep(store: &mut JsonFileStore, tabs: &mut PrintedTabs) -> Result<(), String> {
    if tabs.is_empty() {
        return Err("No tabs given (use --tab <url>)".to_string());
    }

    let report = Router::new(store, tabs).sweep();
    println!(
        "Swept {} tabs: {} styled, {} cleared, {} skipped, {} unreachable",
        report.total(),
        report.styled,
        report.cleared,
        report.skipped,
        report.unreachable
    );
    Ok(())
}

fn cmd_send(store: &mut JsonFileStore, tabs: &mut PrintedTabs, json: &str) -> Result<(), String> {
    let response = Router::new(store, tabs).handle_json(json);
    println!("{}", response.to_json());
    if response.is_error() {
        return Err("request failed".to_string());
    }
    Ok(())
}

fn format_styles(styles: &StyleMap) -> String {
    styles
        .iter()
        .map(|(property, value)| format!("{property}={value}"))
        .collect::<Vec<_>>()
        .join(" ")
}
