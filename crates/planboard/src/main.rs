use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::{info, Level};
use tracing_subscriber::{fmt, EnvFilter};

mod board;
mod calendar;
mod config;
mod error;
mod html;
mod server;
mod source;
mod tooltip;
mod types;

use board::TimelineBoard;
use calendar::YearView;
use config::{Overrides, Settings};
use html::{LinkStyle, PageContext};
use source::PlanSource;
use tooltip::{Anchor, TooltipBody};

#[derive(Parser, Debug)]
#[command(name = "planboard")]
#[command(about = "ISO-week timeline board for training plans")]
#[command(version)]
struct Args {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Base URL of the plan API (overrides PLANBOARD_API_URL)
    #[arg(long, global = true)]
    api_url: Option<String>,

    /// Read plans from a JSON file instead of the API (overrides PLANBOARD_PLANS_FILE)
    #[arg(long, global = true)]
    plans_file: Option<PathBuf>,

    /// Prefix for admin links (overrides PLANBOARD_ADMIN_URL)
    #[arg(long, global = true)]
    admin_url: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info", global = true)]
    log_level: String,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the board server (default)
    Serve {
        /// Port to listen on
        #[arg(short, long, default_value = "8080")]
        port: u16,
    },

    /// Write the board of one year as a static HTML file
    Render {
        /// Year to render (default: current year)
        #[arg(short, long)]
        year: Option<String>,

        /// Output directory
        #[arg(short, long, default_value = ".")]
        output: PathBuf,
    },

    /// Show the ISO weeks covered by each month of a year
    Weeks {
        #[arg(short, long)]
        year: Option<String>,
    },

    /// Count plans per start month
    Summary {
        #[arg(short, long)]
        year: Option<String>,
    },

    /// Find plans by title or code
    Search {
        /// Text to look for
        query: String,
    },

    /// Show the tooltip a plan bar would display
    Tooltip {
        /// Plan id
        id: i64,

        #[arg(short, long)]
        year: Option<String>,

        /// Bar position as LEFT,BOTTOM,VIEWPORT_WIDTH in pixels
        #[arg(long)]
        anchor: Option<Anchor>,

        /// Move the pointer off the bar and report the tooltip MS later
        #[arg(long, value_name = "MS")]
        leave_after: Option<u64>,

        /// With --leave-after, pass through the tooltip before leaving it
        #[arg(long, requires = "leave_after")]
        via_tooltip: bool,
    },
}

fn init_tracing(log_level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(log_level))
        .add_directive("hyper=warn".parse().unwrap())
        .add_directive("tower_http=warn".parse().unwrap());

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_max_level(Level::TRACE)
        .init();
}

fn year_arg(raw: Option<&str>) -> i32 {
    board::resolve_year(raw, board::current_year())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    init_tracing(&args.log_level);

    let overrides = Overrides {
        api_url: args.api_url,
        plans_file: args.plans_file,
        admin_url: args.admin_url,
    };

    match args.command {
        // Default to serve if no command specified
        None => {
            let settings = load_settings(overrides)?;
            server::serve(8080, server::AppState::from_settings(&settings)?).await?;
        }
        Some(Commands::Serve { port }) => {
            let settings = load_settings(overrides)?;
            server::serve(port, server::AppState::from_settings(&settings)?).await?;
        }
        Some(Commands::Weeks { year }) => {
            // Pure calendar math, no plan source needed
            weeks_command(year_arg(year.as_deref()));
        }
        Some(Commands::Render { year, output }) => {
            let (source, admin_base) = load_source(overrides)?;
            render_command(source, &admin_base, year_arg(year.as_deref()), &output).await?;
        }
        Some(Commands::Summary { year }) => {
            let (source, _) = load_source(overrides)?;
            summary_command(source, year_arg(year.as_deref())).await?;
        }
        Some(Commands::Search { query }) => {
            let (source, _) = load_source(overrides)?;
            search_command(source, &query).await?;
        }
        Some(Commands::Tooltip {
            id,
            year,
            anchor,
            leave_after,
            via_tooltip,
        }) => {
            let (source, admin_base) = load_source(overrides)?;
            let pointer = PointerPath {
                anchor,
                leave_after: leave_after.map(Duration::from_millis),
                via_tooltip,
            };
            tooltip_command(source, &admin_base, id, year.as_deref(), pointer).await?;
        }
    }

    Ok(())
}

fn load_settings(overrides: Overrides) -> Result<Settings> {
    Settings::load(overrides).context("Failed to load settings")
}

fn load_source(overrides: Overrides) -> Result<(PlanSource, String)> {
    let settings = load_settings(overrides)?;
    let source =
        PlanSource::from_settings(&settings.source).context("Failed to set up plan source")?;
    Ok((source, settings.admin_base))
}

async fn render_command(
    source: PlanSource,
    admin_base: &str,
    year: i32,
    output: &Path,
) -> Result<()> {
    if !output.exists() {
        std::fs::create_dir_all(output).context("Failed to create output directory")?;
    }
    let mut board = TimelineBoard::new(source, admin_base, year);
    let view = board.load().await;
    let bodies = board.detail_bodies().await;
    let ctx = PageContext {
        current_year: board::current_year(),
        links: LinkStyle::Static,
    };
    let path = html::generate_html(&view, ctx, &bodies, output)?;
    info!(path = %path.display(), rows = view.rows.len(), "HTML saved");
    Ok(())
}

async fn summary_command(source: PlanSource, year: i32) -> Result<()> {
    let plans = source.list_plans().await.context("Failed to fetch plans")?;
    let summary = board::year_summary(plans, year);
    for (month, plans) in &summary.months {
        info!(
            month = calendar::MONTH_NAMES[(*month - 1) as usize],
            count = plans.len(),
            "Month"
        );
    }
    info!(year = summary.year, total = summary.total, "Summary");
    Ok(())
}

async fn search_command(source: PlanSource, query: &str) -> Result<()> {
    let plans = source.list_plans().await.context("Failed to fetch plans")?;
    let found = board::search_plans(plans, query);
    info!(count = found.len(), query = %query, "Found plans");
    for plan in &found {
        info!(
            id = plan.id,
            code = %plan.code,
            start = %plan.start,
            end = %plan.end_date(),
            title = %plan.title,
            "Plan"
        );
    }
    Ok(())
}

/// Simulated pointer movement for the `tooltip` command
struct PointerPath {
    anchor: Option<Anchor>,
    leave_after: Option<Duration>,
    via_tooltip: bool,
}

async fn tooltip_command(
    source: PlanSource,
    admin_base: &str,
    id: i64,
    year: Option<&str>,
    pointer: PointerPath,
) -> Result<()> {
    let current = board::current_year();
    let mut board = TimelineBoard::new(source, admin_base, current);
    board.set_year(year, current);
    board.load().await;

    let row = board
        .rows()
        .iter()
        .find(|r| r.plan.id == id)
        .with_context(|| format!("Plan {} is not on the {} board", id, board.year()))?;
    info!(
        start_week = row.bar.start_week,
        end_week = row.bar.end_week(),
        "Bar"
    );

    if let Some(token) = board.hover_start(id, pointer.anchor) {
        board.fetch_detail(token).await;
    }
    log_tooltip(&board);

    if let Some(after) = pointer.leave_after {
        let left = Instant::now();
        let at = left + after;
        board.hover_end(left);
        if pointer.via_tooltip {
            board.enter_tooltip();
            board.tick(at);
            board.leave_tooltip(at);
        }
        board.tick(at);
        info!(
            after_ms = after.as_millis() as u64,
            visible = board.tooltip().is_visible(),
            hide_pending = board.tooltip().hide_pending(),
            "Pointer left"
        );
    }
    Ok(())
}

fn log_tooltip(board: &TimelineBoard) {
    if let Some(tip) = board.tooltip().active() {
        info!(title = %tip.title, details = %tip.subtitle, admin = %tip.admin_url, "Tooltip");
        if let Some(pos) = tip.position {
            info!(left = pos.left, top = pos.top, "Position");
        }
        match &tip.body {
            TooltipBody::Attendees(names) => {
                for name in names {
                    info!(attendee = %name, "Attendee");
                }
            }
            TooltipBody::NoAttendees => info!("No attendees"),
            TooltipBody::Unavailable => info!("Details unavailable"),
            TooltipBody::Loading => info!("Loading"),
        }
    }
}

fn weeks_command(year: i32) {
    let view = YearView::new(year);
    info!(year = view.year, weeks = view.weeks_in_year, "Year");
    for span in &view.month_spans {
        match (span.weeks.first(), span.weeks.last()) {
            (Some(first), Some(last)) => info!(
                month = span.label(),
                first = first,
                last = last,
                count = span.count(),
                "Month"
            ),
            _ => info!(month = span.label(), "Month has no weeks in this ISO year"),
        }
    }
}
