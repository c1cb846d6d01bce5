use std::path::PathBuf;

use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use colored::Colorize;
use codeforge::{
    ctx::AppContext,
    notify::ConsoleNotifier,
    tree::format_tree,
    utils::{parse_json_arg, parse_object_arg},
};
use env_logger::Env;
use forge_ui::{
    Action, ActionExecutor, ComputeRegistry, DataStore, EvalContext, Map, PageSchema, Renderer,
    TreeLibrary, Value, evaluate_expression,
};
use log::{LevelFilter, info};

/// Render and drive CodeForge JSON pages from the terminal.
#[derive(Debug, Parser)]
#[command(name = "codeforge", version, about)]
struct Cli {
    /// Workspace directory, defaults to the current directory.
    #[arg(short, long, global = true)]
    workspace: Option<PathBuf>,
    /// Configuration file, defaults to `<workspace>/.codeforge.toml`.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
    /// Increase log verbosity (-v info, -vv debug, -vvv trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
    #[command(subcommand)]
    command: SubCommands,
}

#[derive(Debug, Subcommand)]
enum SubCommands {
    /// Render a page and print the node tree.
    Render {
        page: PathBuf,
        /// Print the rendered nodes as JSON.
        #[arg(long)]
        json: bool,
    },
    /// Fire a component event and print the resulting data.
    Fire {
        page: PathBuf,
        /// Rendered node key, e.g. `add` or `row-0`.
        #[arg(long)]
        component: String,
        #[arg(long, default_value = "click")]
        event: String,
        /// Event payload as JSON.
        #[arg(long)]
        payload: Option<String>,
    },
    /// Run a JSON list of actions against a page's data.
    Run {
        page: PathBuf,
        actions: PathBuf,
        /// Event payload as JSON.
        #[arg(long)]
        payload: Option<String>,
    },
    /// Evaluate an expression or condition.
    Eval {
        expression: String,
        /// Data context as a JSON object.
        #[arg(long)]
        data: Option<String>,
        /// Event payload as JSON.
        #[arg(long)]
        event: Option<String>,
        /// Evaluate as a condition instead of an expression. A bare name runs
    /// the builtin compute function of that name.
        #[arg(long)]
        condition: bool,
    },
    /// Validate a page schema or component tree file.
    Check { file: PathBuf },
    /// Print a page schema in normalised form.
    Export {
        page: PathBuf,
        #[arg(short, long)]
        out: Option<PathBuf>,
    },
    /// Print the JSON Schema of page documents.
    Schema,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    env_logger::Builder::from_env(Env::default().default_filter_or(level.as_str())).init();

    let mut ctx = AppContext::new(cli.workspace, cli.config)?;
    ctx.prepare_config().await?;

    match cli.command {
        SubCommands::Render { page, json } => {
            let page = ctx.load_page(&page).await?;
            let store = ctx.open_store(&page).await;
            let registry = ctx.registry();
            let rendered = Renderer::new(&registry)
                .with_computes(store.computes())
                .render_page(&page, store.data());
            if json {
                println!("{}", serde_json::to_string_pretty(&rendered)?);
            } else {
                println!("{}", format!("{} ({})", page.name, page.id).bold().purple());
                print!("{}", format_tree(&rendered.nodes));
            }
        }
        SubCommands::Fire {
            page,
            component,
            event,
            payload,
        } => {
            let payload = payload.map(|p| parse_json_arg("payload", &p)).transpose()?;
            let page = ctx.load_page(&page).await?;
            let mut store = ctx.open_store(&page).await;
            let registry = ctx.registry();
            let rendered = Renderer::new(&registry)
                .with_computes(store.computes())
                .render_page(&page, store.data());

            let Some(node) = rendered.find(&component) else {
                bail!("no rendered component `{component}` in page `{}`", page.id);
            };
            let Some(handler) = node.handler(&event).cloned() else {
                bail!("component `{component}` has no `{event}` handler");
            };

            let services = ctx.services();
            let ran = ActionExecutor::new(&mut store, &services)
                .execute_handler(&handler, payload.as_ref())
                .await;
            if !ran {
                info!("handler condition not met, nothing ran");
            }
            print_outcome(&ctx, &store)?;
        }
        SubCommands::Run {
            page,
            actions,
            payload,
        } => {
            let payload = payload.map(|p| parse_json_arg("payload", &p)).transpose()?;
            let page = ctx.load_page(&page).await?;
            let path = ctx.resolve(&actions);
            let content = tokio::fs::read_to_string(&path)
                .await
                .with_context(|| format!("Failed to read {}", path.display()))?;
            let actions: Vec<Action> = serde_json::from_str(&content)
                .with_context(|| format!("{} is not a JSON list of actions", path.display()))?;

            let mut store = ctx.open_store(&page).await;
            let services = ctx.services();
            ActionExecutor::new(&mut store, &services)
                .execute_actions(&actions, payload.as_ref())
                .await;
            print_outcome(&ctx, &store)?;
        }
        SubCommands::Eval {
            expression,
            data,
            event,
            condition,
        } => {
            let data = match data {
                Some(d) => parse_object_arg("data", &d)?,
                None => Map::new(),
            };
            let event = event.map(|e| parse_json_arg("event", &e)).transpose()?;
            let eval_ctx = EvalContext::new(&data).with_event(event.as_ref());
            if condition {
                let computes = ComputeRegistry::builtin();
                println!("{}", computes.check_condition(&expression, &eval_ctx));
            } else {
                match evaluate_expression(&expression, &eval_ctx) {
                    Some(v) => println!("{}", serde_json::to_string_pretty(&v)?),
                    None => println!("undefined"),
                }
            }
        }
        SubCommands::Check { file } => {
            let path = ctx.resolve(&file);
            let content = tokio::fs::read_to_string(&path)
                .await
                .with_context(|| format!("Failed to read {}", path.display()))?;
            let value: Value = serde_json::from_str(&content)
                .with_context(|| format!("{} is not valid JSON", path.display()))?;

            if value.get("rootNodes").is_some() {
                let mut library = TreeLibrary::default();
                if !library.import_or_notify(&content, &ConsoleNotifier) {
                    bail!("{} is not a valid component tree", path.display());
                }
            } else {
                let page = PageSchema::from_value(value)
                    .with_context(|| format!("Invalid page schema {}", path.display()))?;
                check_page(&ctx, &page);
            }
        }
        SubCommands::Export { page, out } => {
            let page = ctx.load_page(&page).await?;
            let json = page.to_json_pretty()?;
            match out {
                Some(out) => {
                    let out = ctx.resolve(&out);
                    tokio::fs::write(&out, json)
                        .await
                        .with_context(|| format!("Failed to write {}", out.display()))?;
                    println!("{}", format!("Exported to {}", out.display()).green());
                }
                None => println!("{json}"),
            }
        }
        SubCommands::Schema => {
            let schema = schemars::schema_for!(PageSchema);
            println!("{}", serde_json::to_string_pretty(&schema)?);
        }
    }

    Ok(())
}

fn print_outcome(ctx: &AppContext, store: &DataStore) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(store.data())?);
    if let Some(hash) = ctx.navigator.current() {
        println!("{} {hash}", "navigated to".bold().cyan());
    }
    Ok(())
}

fn check_page(ctx: &AppContext, page: &PageSchema) {
    let registry = ctx.registry();
    let mut unknown = Vec::new();
    let mut count = 0;
    let mut stack: Vec<_> = page.components.iter().collect();
    while let Some(c) = stack.pop() {
        count += 1;
        if !registry.contains(&c.kind) {
            unknown.push(format!("{} ({})", c.kind, c.id));
        }
        stack.extend(c.children.iter());
    }

    println!(
        "{}",
        format!(
            "page `{}`: {} data sources, {count} components",
            page.id,
            page.data_sources.len()
        )
        .green()
    );
    for u in unknown {
        println!("{} unknown component type {u}", "warning:".yellow().bold());
    }
}
