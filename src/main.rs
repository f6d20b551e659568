use std::path::PathBuf;

use clap::Parser;
use cutlist_optimizer::render;
use cutlist_optimizer::solver::{RunOutcome, Solver};
use cutlist_optimizer::strategy::StrategyKind;
use cutlist_optimizer::types::{DEFAULT_KERF, Job, Piece, Rect, SheetTemplate};
use tracing::Level;

#[derive(Parser)]
#[command(
    name = "cutlist_optimizer",
    about = "Panel cutting-layout optimizer with saw-kerf clearance"
)]
struct Cli {
    /// JSON job file with sheets, pieces, kerf and strategy
    #[arg(long, conflicts_with_all = ["sheets", "cuts"])]
    job: Option<PathBuf>,

    /// Stock sheets as MATERIAL:WxH[:cost] (e.g. ply18:2440x1220:48.5)
    #[arg(long = "sheet", num_args = 1..)]
    sheets: Vec<String>,

    /// Cut pieces as ID:WxH:qty[:material][:grain] (e.g. side:800x400:2:ply18:grain)
    #[arg(long = "cuts", num_args = 1..)]
    cuts: Vec<String>,

    /// Blade kerf width in mm (default: 3, or the job file's value)
    #[arg(long)]
    kerf: Option<u32>,

    /// Packing strategy: bottom-left-fill, best-fit-decreasing, or guillotine-split
    #[arg(long, value_parser = parse_strategy)]
    strategy: Option<StrategyKind>,

    /// Run every strategy and report the best
    #[arg(long)]
    compare: bool,

    /// Show ASCII layout of each sheet
    #[arg(long)]
    layout: bool,

    /// Print the outcome as JSON
    #[arg(long)]
    json: bool,

    /// Log to stderr (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn parse_strategy(s: &str) -> Result<StrategyKind, String> {
    s.parse()
}

fn parse_dimensions(s: &str) -> Result<Rect, String> {
    let parts: Vec<&str> = s.split('x').collect();
    if parts.len() != 2 {
        return Err(format!("invalid dimensions '{}', expected WxH", s));
    }
    let w = parts[0]
        .parse::<u32>()
        .map_err(|_| format!("invalid width in '{}'", s))?;
    let h = parts[1]
        .parse::<u32>()
        .map_err(|_| format!("invalid height in '{}'", s))?;
    Ok(Rect::new(w, h))
}

fn parse_sheet(s: &str) -> Result<SheetTemplate, String> {
    let parts: Vec<&str> = s.split(':').collect();
    if !(2..=3).contains(&parts.len()) {
        return Err(format!("invalid sheet '{}', expected MATERIAL:WxH[:cost]", s));
    }
    let rect = parse_dimensions(parts[1])?;
    let cost = match parts.get(2) {
        Some(c) => c
            .parse::<f64>()
            .map_err(|_| format!("invalid cost in '{}'", s))?,
        None => 0.0,
    };
    Ok(SheetTemplate::new(
        &format!("{}-{}", parts[0], rect),
        parts[0],
        rect.w,
        rect.h,
        cost,
    ))
}

fn parse_cut(s: &str, default_material: &str) -> Result<Piece, String> {
    let parts: Vec<&str> = s.split(':').collect();
    if !(3..=5).contains(&parts.len()) {
        return Err(format!(
            "invalid cut '{}', expected ID:WxH:qty[:material][:grain]",
            s
        ));
    }
    let rect = parse_dimensions(parts[1])?;
    let qty = parts[2]
        .parse::<u32>()
        .map_err(|_| format!("invalid quantity in '{}'", s))?;
    let material = parts
        .get(3)
        .filter(|m| !m.is_empty())
        .copied()
        .unwrap_or(default_material);
    let grain_locked = match parts.get(4) {
        Some(&"grain") => true,
        Some(other) => return Err(format!("invalid flag '{}' in '{}', expected grain", other, s)),
        None => false,
    };
    Ok(Piece::new(parts[0], rect.w, rect.h, qty, material).with_grain_locked(grain_locked))
}

fn load_job(cli: &Cli) -> Result<Job, String> {
    let mut job = match &cli.job {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .map_err(|e| format!("cannot read {}: {}", path.display(), e))?;
            serde_json::from_str::<Job>(&text)
                .map_err(|e| format!("invalid job file {}: {}", path.display(), e))?
        }
        None => {
            let sheets = cli
                .sheets
                .iter()
                .map(|s| parse_sheet(s))
                .collect::<Result<Vec<_>, _>>()?;
            let default_material = sheets
                .first()
                .map(|t| t.material.clone())
                .ok_or("at least one --sheet is required")?;
            let pieces = cli
                .cuts
                .iter()
                .map(|c| parse_cut(c, &default_material))
                .collect::<Result<Vec<_>, _>>()?;
            Job {
                sheets,
                pieces,
                kerf: DEFAULT_KERF,
                strategy: StrategyKind::default(),
            }
        }
    };
    if let Some(kerf) = cli.kerf {
        job.kerf = kerf;
    }
    if let Some(strategy) = cli.strategy {
        job.strategy = strategy;
    }
    Ok(job)
}

fn init_logging(verbose: u8) {
    if verbose == 0 {
        return;
    }
    let level = match verbose {
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_max_level(level)
        .init();
}

fn fail(msg: impl std::fmt::Display) -> ! {
    eprintln!("Error: {}", msg);
    std::process::exit(1);
}

fn print_outcome(outcome: &RunOutcome, show_layout: bool) {
    for (sheet, metrics) in outcome.layout.sheets.iter().zip(&outcome.metrics.sheets) {
        println!(
            "Sheet {} ({} {}, {:.1}% waste):",
            sheet.index + 1,
            sheet.material,
            sheet.stock,
            metrics.waste_percent
        );
        for p in &sheet.placements {
            let rot = if p.rotated { " [rotated]" } else { "" };
            println!("  {} {} @ ({}, {}){}", p.piece_id, p.rect, p.x, p.y, rot);
        }
        if show_layout {
            print!("{}", render::render_sheet(sheet));
        }
        println!();
    }

    for u in &outcome.unplaced {
        println!("Unplaced: {} ({})", u.piece_id, u.reason);
    }

    let m = &outcome.metrics;
    println!(
        "Summary [{}]: {} sheet{} used, {:.1}% waste, cost {:.2}",
        outcome.strategy,
        m.sheet_count,
        if m.sheet_count == 1 { "" } else { "s" },
        m.waste_percent,
        m.total_cost,
    );
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let job = load_job(&cli).unwrap_or_else(|e| fail(e));
    let solver = Solver::from_job(job);

    if cli.compare {
        let comparison = solver.compare().unwrap_or_else(|e| fail(e));
        if cli.json {
            match serde_json::to_string_pretty(&comparison) {
                Ok(s) => println!("{}", s),
                Err(e) => fail(e),
            }
            return;
        }
        for run in &comparison.runs {
            println!(
                "{:<20} {} sheet(s), {:.1}% waste, {} unplaced, score {:.1}",
                run.strategy.name(),
                run.metrics.sheet_count,
                run.metrics.waste_percent,
                run.unplaced.len(),
                run.score()
            );
        }
        println!("Best: {}\n", comparison.best);
        if let Some(best) = comparison.best_run() {
            print_outcome(best, cli.layout);
        }
        return;
    }

    let outcome = solver.solve().unwrap_or_else(|e| fail(e));
    if cli.json {
        match serde_json::to_string_pretty(&outcome) {
            Ok(s) => println!("{}", s),
            Err(e) => fail(e),
        }
    } else {
        print_outcome(&outcome, cli.layout);
    }
}
