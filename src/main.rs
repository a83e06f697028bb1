use clap::Parser;
use load_planner::manifest::Vehicle;
use load_planner::solver::Solver;
use load_planner::types::{
    DEFAULT_FLEET_CAP, Dims, Orientation, PackOptions, PackingResult, Unit, UnplacedReason,
};
use tracing::Level;

#[derive(Parser)]
#[command(
    name = "load_planner",
    about = "3D load planner: how many containers an order needs and where every unit goes"
)]
struct Cli {
    /// Container interior and payload (LxWxH:kg in mm, e.g. 13600x2450x2700:24000)
    #[arg(long)]
    container: String,

    /// Name used for container instances (numbered from 1)
    #[arg(long, default_value = "Container")]
    name: String,

    /// Units as LxWxH:kg or LxWxH:kg:qty (e.g. 1200x800x1500:450:10)
    #[arg(long = "units", num_args = 1..)]
    units: Vec<String>,

    /// Maximum number of containers to open
    #[arg(long, default_value_t = DEFAULT_FLEET_CAP)]
    fleet_cap: usize,

    /// Safety margin in percent taken off every container dimension
    #[arg(long, default_value_t = 0.0)]
    margin: f64,

    /// Keep every unit in its given length/width orientation
    #[arg(long)]
    no_rotate: bool,

    /// Allow units to rest on partial support
    #[arg(long)]
    allow_floating: bool,

    /// Stop after this many placement checks
    #[arg(long)]
    max_checks: Option<u64>,

    /// Print the result as JSON
    #[arg(long)]
    json: bool,

    /// Log planner progress to stderr
    #[arg(long)]
    verbose: bool,
}

fn parse_dimensions(s: &str) -> Result<Dims, String> {
    let parts: Vec<&str> = s.split('x').collect();
    if parts.len() != 3 {
        return Err(format!("invalid dimensions '{}', expected LxWxH", s));
    }
    let mut values = [0u32; 3];
    for (value, (part, axis)) in values
        .iter_mut()
        .zip(parts.iter().zip(["length", "width", "height"]))
    {
        *value = part
            .parse::<u32>()
            .map_err(|_| format!("invalid {} in '{}'", axis, s))?;
        if *value == 0 {
            return Err(format!("dimensions must be non-zero in '{}'", s));
        }
    }
    Ok(Dims::new(values[0], values[1], values[2]))
}

fn parse_weight(s: &str, context: &str) -> Result<f64, String> {
    let kg = s
        .parse::<f64>()
        .map_err(|_| format!("invalid weight in '{}'", context))?;
    if !kg.is_finite() || kg < 0.0 {
        return Err(format!("weight must be non-negative in '{}'", context));
    }
    Ok(kg)
}

fn parse_vehicle(s: &str, name: &str) -> Result<Vehicle, String> {
    let (dims, kg) = s
        .split_once(':')
        .ok_or_else(|| format!("invalid container '{}', expected LxWxH:kg", s))?;
    let dims = parse_dimensions(dims)?;
    Ok(Vehicle {
        name: name.to_string(),
        length: dims.length,
        width: dims.width,
        height: dims.height,
        max_weight: parse_weight(kg, s)?,
    })
}

fn parse_units(s: &str, line: usize, allow_rotate: bool) -> Result<Vec<Unit>, String> {
    let parts: Vec<&str> = s.split(':').collect();
    if parts.len() != 2 && parts.len() != 3 {
        return Err(format!("invalid units '{}', expected LxWxH:kg[:qty]", s));
    }
    let dims = parse_dimensions(parts[0])?;
    let weight = parse_weight(parts[1], s)?;
    let qty = match parts.get(2) {
        Some(q) => q
            .parse::<u32>()
            .map_err(|_| format!("invalid quantity in '{}'", s))?,
        None => 1,
    };
    if qty == 0 {
        return Err(format!("quantity must be non-zero in '{}'", s));
    }
    Ok((1..=qty)
        .map(|i| {
            Unit::new(format!("U{}-{}", line + 1, i), dims, weight).with_rotation(allow_rotate)
        })
        .collect())
}

fn print_result(result: &PackingResult) {
    for load in &result.loads {
        println!(
            "{}: {} unit{}, {:.1}% volume, {:.1} / {} kg",
            load.container.id,
            load.placements.len(),
            if load.placements.len() == 1 { "" } else { "s" },
            load.volume_utilization_percent(),
            load.occupied_weight(),
            load.container.max_weight,
        );
        for p in &load.placements {
            let rot = if p.orientation == Orientation::Swapped {
                " [rotated]"
            } else {
                ""
            };
            println!(
                "  {} {} @ ({}, {}, {}){}",
                p.unit_id, p.extent, p.origin.x, p.origin.y, p.origin.z, rot
            );
        }
        println!();
    }

    println!(
        "Summary: {} container{} used, {} unit{} unplaced",
        result.container_count(),
        if result.container_count() == 1 { "" } else { "s" },
        result.unplaced_count(),
        if result.unplaced_count() == 1 { "" } else { "s" },
    );
    for u in &result.unplaced {
        let reason = match u.reason {
            UnplacedReason::TooLarge => "larger than the container",
            UnplacedReason::TooHeavy => "heavier than the payload",
            UnplacedReason::FleetExhausted => "no room left in the fleet",
            UnplacedReason::BudgetExceeded => "not attempted, budget exceeded",
        };
        println!("  {}: {}", u.unit_id, reason);
    }
    if result.fleet_exhausted_count() > 0 {
        println!("Raise --fleet-cap to load the remaining units.");
    }
}

fn main() {
    let cli = Cli::parse();

    if cli.verbose {
        tracing_subscriber::fmt()
            .with_writer(std::io::stderr)
            .with_target(false)
            .with_max_level(Level::DEBUG)
            .init();
    }

    let vehicle = parse_vehicle(&cli.container, &cli.name).unwrap_or_else(|e| {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    });

    let container = vehicle.usable(cli.margin / 100.0).unwrap_or_else(|e| {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    });

    let units: Vec<Unit> = cli
        .units
        .iter()
        .enumerate()
        .map(|(line, s)| parse_units(s, line, !cli.no_rotate))
        .collect::<Result<Vec<_>, _>>()
        .unwrap_or_else(|e| {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        })
        .into_iter()
        .flatten()
        .collect();

    let mut options = PackOptions::default()
        .with_fleet_cap(cli.fleet_cap)
        .with_support(!cli.allow_floating);
    if let Some(max_checks) = cli.max_checks {
        options = options.with_max_checks(max_checks);
    }

    let result = Solver::new(container, options)
        .solve(&units)
        .unwrap_or_else(|e| {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        });

    if cli.json {
        match serde_json::to_string_pretty(&result) {
            Ok(json) => println!("{}", json),
            Err(e) => {
                eprintln!("Error: {}", e);
                std::process::exit(1);
            }
        }
    } else {
        print_result(&result);
    }
}
