use std::cmp;
use std::error::Error;

use atty::Stream;
#[cfg(feature = "web")]
use clap::Args;
use clap::{Parser, Subcommand};
use guide_site::{
    Catalog, CategoryCode, Entry, GlossaryTerm, Listing, ListingConfig, Template, evaluate,
};
use serde::Serialize;
use serde_json::json;
use termimad::{FmtText, MadSkin, terminal_size};
use tracing_subscriber::EnvFilter;

const DEFAULT_RELATED_LIMIT: usize = 3;
const SUGGESTION_LIMIT: usize = 5;

#[derive(Parser, Debug)]
#[command(name = "guide-site", about = "Browse the guide's templates and glossary", version)]
pub struct Cli {
    /// Emit JSON instead of human-readable tables.
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Post templates.
    #[command(subcommand)]
    Templates(CatalogCommand),
    /// Glossary terms.
    #[command(subcommand)]
    Glossary(CatalogCommand),
    /// Serve the listing pages over HTTP.
    #[cfg(feature = "web")]
    Serve(ServeArgs),
}

#[derive(Subcommand, Debug)]
enum CatalogCommand {
    /// Filter, sort and page the catalog with a listing query string.
    List {
        /// Query string as used in listing URLs, e.g. `category=viral,thread&page=2`.
        #[arg(default_value = "")]
        query: String,
        /// Entries per page.
        #[arg(long, default_value_t = guide_site::DEFAULT_ITEMS_PER_PAGE)]
        per_page: usize,
    },
    /// Show a single entry.
    Show {
        /// Entry id.
        id: String,
    },
    /// List entries related to an entry.
    Related {
        /// Entry id.
        id: String,
        /// Maximum number of related entries.
        #[arg(short, long, default_value_t = DEFAULT_RELATED_LIMIT)]
        limit: usize,
    },
}

#[cfg(feature = "web")]
#[derive(Args, Debug)]
struct ServeArgs {
    /// Address to bind.
    #[arg(long, default_value = "127.0.0.1:8080")]
    addr: std::net::SocketAddr,
    /// Absolute base URL used in canonical links.
    #[arg(long)]
    base_url: Option<String>,
    /// Entries per listing page.
    #[arg(long, default_value_t = guide_site::DEFAULT_ITEMS_PER_PAGE)]
    per_page: usize,
}

pub fn run() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    match cli.command {
        Command::Templates(command) => {
            init_tracing("warn");
            run_catalog(guide_site::templates(), command, cli.json, print_template)
        }
        Command::Glossary(command) => {
            init_tracing("warn");
            run_catalog(guide_site::glossary(), command, cli.json, print_term)
        }
        #[cfg(feature = "web")]
        Command::Serve(args) => {
            init_tracing("info");
            handle_serve(args)
        }
    }
}

fn init_tracing(default_directive: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

#[cfg(feature = "web")]
fn handle_serve(args: ServeArgs) -> Result<(), Box<dyn Error>> {
    let config = guide_site::web::WebConfig {
        addr: args.addr,
        base_url: args
            .base_url
            .unwrap_or_else(|| format!("http://{}", args.addr)),
        listing: ListingConfig {
            items_per_page: cmp::max(1, args.per_page),
        },
    };
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    runtime.block_on(guide_site::web::serve(config))?;
    Ok(())
}

fn run_catalog<E>(
    catalog: &Catalog<E>,
    command: CatalogCommand,
    as_json: bool,
    print_entry: fn(&E, &Catalog<E>),
) -> Result<(), Box<dyn Error>>
where
    E: Entry + Serialize,
{
    match command {
        CatalogCommand::List { query, per_page } => {
            let config = ListingConfig {
                items_per_page: cmp::max(1, per_page),
            };
            handle_list(catalog, &query, &config, as_json)
        }
        CatalogCommand::Show { id } => {
            let entry = lookup(catalog, &id)?;
            if as_json {
                println!("{}", serde_json::to_string_pretty(entry)?);
            } else {
                print_entry(entry, catalog);
            }
            Ok(())
        }
        CatalogCommand::Related { id, limit } => {
            lookup(catalog, &id)?;
            let related = catalog.get_related(&id, cmp::max(1, limit));
            if as_json {
                let payload = json!({ "id": id, "limit": limit, "results": related });
                println!("{}", serde_json::to_string_pretty(&payload)?);
            } else if related.is_empty() {
                println!("No entries related to \"{id}\".");
            } else {
                println!("Related to \"{id}\":");
                print_entry_table(&related);
            }
            Ok(())
        }
    }
}

fn lookup<'a, E: Entry>(catalog: &'a Catalog<E>, id: &str) -> Result<&'a E, Box<dyn Error>> {
    catalog.get_by_id(id).ok_or_else(|| {
        let prefix: String = id.chars().take(3).collect();
        let suggestions = catalog.suggest_ids(&prefix, SUGGESTION_LIMIT);
        if suggestions.is_empty() {
            format!("No entry found for id {id:?}").into()
        } else {
            format!(
                "No entry found for id {id:?} (did you mean: {})",
                suggestions.join(", ")
            )
            .into()
        }
    })
}

fn handle_list<E>(
    catalog: &Catalog<E>,
    query: &str,
    config: &ListingConfig,
    as_json: bool,
) -> Result<(), Box<dyn Error>>
where
    E: Entry + Serialize,
{
    let listing = evaluate(catalog, query, config);
    if as_json {
        let payload = json!({
            "query": listing.state.to_query(),
            "state": listing.state,
            "page": listing.page.info,
            "catalog_size": listing.catalog_size,
            "results": listing.page.items,
        });
        println!("{}", serde_json::to_string_pretty(&payload)?);
    } else {
        print_listing(&listing);
    }
    Ok(())
}

fn print_listing<E: Entry>(listing: &Listing<'_, E>) {
    let info = listing.page.info;
    let canonical = listing.state.to_query();
    if listing.is_empty() {
        println!(
            "No matching entries for \"{canonical}\" ({} in catalog).",
            listing.catalog_size
        );
        return;
    }
    println!(
        "Entries {}-{} of {} (page {} of {}, query \"{}\"):",
        info.first_item(),
        info.last_item(),
        info.total_items,
        info.current_page,
        info.total_pages,
        canonical
    );
    print_entry_table(&listing.page.items);
}

fn print_entry_table<E: Entry>(rows: &[&E]) {
    let id_width = rows
        .iter()
        .map(|entry| entry.id().len())
        .max()
        .unwrap_or(2)
        .max("ID".len());
    let category_width = rows
        .iter()
        .map(|entry| entry.category().code().len())
        .max()
        .unwrap_or(8)
        .max("CATEGORY".len());
    if E::Category::FILTERS_DIFFICULTY {
        println!(
            "{:<id_width$}  {:<category_width$}  {:<12}  TITLE",
            "ID", "CATEGORY", "DIFFICULTY"
        );
    } else {
        println!("{:<id_width$}  {:<category_width$}  TITLE", "ID", "CATEGORY");
    }
    println!("{:-<id_width$}  {:-<category_width$}  -----", "", "");
    for entry in rows {
        let category = entry.category().code();
        match entry.difficulty() {
            Some(difficulty) if E::Category::FILTERS_DIFFICULTY => println!(
                "{:<id_width$}  {:<category_width$}  {:<12}  {}",
                entry.id(),
                category,
                difficulty.code(),
                entry.title()
            ),
            _ => println!(
                "{:<id_width$}  {:<category_width$}  {}",
                entry.id(),
                category,
                entry.title()
            ),
        }
    }
}

fn print_template(template: &Template, catalog: &Catalog<Template>) {
    println!("{} ({})", template.title, template.id);
    println!(
        "Category: {} [{}]",
        template.category.label(),
        template.category.code()
    );
    println!(
        "Difficulty: {} [{}]",
        template.difficulty.label(),
        template.difficulty.code()
    );
    println!(
        "Expected engagement: likes {}, replies {}, reposts {} (score {})",
        template.engagement.likes.code(),
        template.engagement.replies.code(),
        template.engagement.reposts.code(),
        template.engagement.score()
    );
    println!("\n{}", template.description);
    if let Some(effects) = format_list(&template.effects, 6) {
        println!("\nEffects: {effects}");
    }
    render_markdown_block("Template", &template.body);
    print_related(catalog, &template.id);
}

fn print_term(term: &GlossaryTerm, catalog: &Catalog<GlossaryTerm>) {
    match term.english.as_deref() {
        Some(english) => println!("{} / {} ({})", term.term, english, term.id),
        None => println!("{} ({})", term.term, term.id),
    }
    println!("Category: {} [{}]", term.category.label(), term.category.code());
    println!("\n{}", term.short_description);
    render_markdown_block("Description", &term.description);
    print_related(catalog, &term.id);
}

fn print_related<E: Entry>(catalog: &Catalog<E>, id: &str) {
    let related = catalog.get_related(id, DEFAULT_RELATED_LIMIT);
    if related.is_empty() {
        return;
    }
    let labels: Vec<String> = related
        .iter()
        .map(|entry| format!("{} ({})", entry.title(), entry.id()))
        .collect();
    println!("\nRelated: {}", labels.join(", "));
}

fn format_list(items: &[String], limit: usize) -> Option<String> {
    if items.is_empty() {
        return None;
    }
    let truncated = items.len() > limit;
    let display = if truncated { &items[..limit] } else { items };
    let mut text = display.join(", ");
    if truncated {
        text.push_str(", …");
    }
    Some(text)
}

fn stdout_is_tty() -> bool {
    atty::is(Stream::Stdout)
}

fn markdown_width() -> usize {
    let (width, _) = terminal_size();
    width.max(60) as usize
}

fn render_markdown_block(title: &str, body: &str) {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return;
    }
    println!("\n{title}:");
    if stdout_is_tty() {
        let skin = MadSkin::default();
        let formatted = FmtText::from(&skin, trimmed, Some(markdown_width()));
        println!("{formatted}");
    } else {
        println!("{trimmed}");
    }
}
