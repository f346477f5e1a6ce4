#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Command-line adapter that runs one movement order through a scripted world.

mod scenario;

use std::{fs, path::Path, path::PathBuf, time::Duration};

use anyhow::{bail, Context, Result};
use clap::{Parser, ValueEnum};
use glam::Vec3;
use log::info;
use simplelog::{ColorChoice, ConfigBuilder, LevelFilter, TermLogger, TerminalMode};
use waypoint_core::{
    Command, Config, Event, GotoOrder, GotoOutcome, LocomotionClass, ObjectId, ObjectRole,
    ObjectSpec, Terrain,
};
use waypoint_system_movement::Movement;
use waypoint_world::{self as world, query, World};

use crate::scenario::Scenario;

/// Runs a vehicle from the origin to a goal cell and reports how it went.
#[derive(Debug, Parser)]
#[command(name = "waypoint", version)]
struct Cli {
    /// Layout between the start and the goal.
    #[arg(long, value_enum, default_value_t = Scenario::Open)]
    scenario: Scenario,
    /// Locomotion class of the vehicle.
    #[arg(long, value_enum, default_value_t = Class::Wheels)]
    class: Class,
    /// Goal cell as column and row offsets from the start.
    #[arg(
        long,
        num_args = 2,
        value_names = ["COLUMN", "ROW"],
        default_values_t = [20, 0],
        allow_negative_numbers = true
    )]
    goal: Vec<i32>,
    /// Cruise altitude for flyers, zero to stay on the ground.
    #[arg(long, default_value_t = 0.0)]
    altitude: f32,
    /// Simulated seconds per frame.
    #[arg(long, default_value_t = 0.02)]
    dt: f32,
    /// Frames to run before giving up.
    #[arg(long, default_value_t = 5000)]
    frames: u32,
    /// TOML file overriding the default tuning.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Most verbose log level written to stderr.
    #[arg(long, default_value = "info")]
    log_level: LevelFilter,
}

/// Locomotion classes selectable from the command line.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum Class {
    Wheels,
    Tracks,
    HeavyTracks,
    Legs,
    Flying,
    Submersible,
    Walker,
    Insect,
    FlyingInsect,
    Burrower,
}

impl From<Class> for LocomotionClass {
    fn from(class: Class) -> Self {
        match class {
            Class::Wheels => Self::Wheels,
            Class::Tracks => Self::Tracks,
            Class::HeavyTracks => Self::HeavyTracks,
            Class::Legs => Self::Legs,
            Class::Flying => Self::Flying,
            Class::Submersible => Self::Submersible,
            Class::Walker => Self::Walker,
            Class::Insect => Self::Insect,
            Class::FlyingInsect => Self::FlyingInsect,
            Class::Burrower => Self::Burrower,
        }
    }
}

struct Report {
    outcome: Option<GotoOutcome>,
    frames: u32,
    waypoints: Vec<Vec3>,
    position: Option<Vec3>,
}

/// Entry point for the waypoint command-line interface.
fn main() -> Result<()> {
    let cli = Cli::parse();
    TermLogger::init(
        cli.log_level,
        ConfigBuilder::new()
            .set_target_level(LevelFilter::Off)
            .set_location_level(LevelFilter::Off)
            .build(),
        TerminalMode::Stderr,
        ColorChoice::Auto,
    )
    .context("failed to install the terminal logger")?;

    let config = load_config(cli.config.as_deref())?;
    if !(cli.dt > 0.0) {
        bail!("frame delta must be positive, got {}", cli.dt);
    }

    let report = run(&cli, config)?;
    print_report(&cli, &report);
    Ok(())
}

fn load_config(path: Option<&Path>) -> Result<Config> {
    let Some(path) = path else {
        return Ok(Config::default());
    };
    let document = fs::read_to_string(path)
        .with_context(|| format!("failed to read configuration {}", path.display()))?;
    Config::from_toml_str(&document)
        .with_context(|| format!("invalid configuration in {}", path.display()))
}

fn run(cli: &Cli, config: Config) -> Result<Report> {
    let &[column, row] = cli.goal.as_slice() else {
        bail!("expected a goal column and row, got {:?}", cli.goal);
    };
    let cell = config.grid.cell_size;
    let mut world = World::new();
    let mut movement = Movement::new(config);

    let start = Vec3::ZERO;
    let goal = Vec3::new(column as f32 * cell, 0.0, row as f32 * cell);
    info!(
        "running {:?} for {:?} towards cell ({column}, {row})",
        cli.scenario, cli.class
    );
    for command in cli.scenario.setup(start, goal, cell) {
        let _ = submit(&mut world, &mut movement, command);
    }

    let terrain = query::terrain(&world);
    let start = Vec3::new(start.x, terrain.floor_level(start), start.z);
    let goal = Vec3::new(goal.x, terrain.floor_level(goal), goal.z);
    let spec = ObjectSpec::new(ObjectRole::Vehicle(cli.class.into()), start, 2.0);
    let Some(id) = submit(&mut world, &mut movement, Command::SpawnObject { spec })
        .iter()
        .find_map(|event| match event {
            Event::ObjectSpawned { id } => Some(*id),
            _ => None,
        })
    else {
        bail!("the world did not spawn the vehicle");
    };

    let order = GotoOrder::to(goal).with_altitude(cli.altitude);
    let mut outcome = finished(
        id,
        &submit(&mut world, &mut movement, Command::IssueGoto { id, order }),
    );
    let dt = Duration::from_secs_f32(cli.dt);
    let mut frames = 0;
    let mut waypoints = Vec::new();
    while outcome.is_none() && frames < cli.frames {
        let events = submit(&mut world, &mut movement, Command::Tick { dt });
        frames += 1;
        outcome = finished(id, &events);
        if let Some(path) = movement.task(id).and_then(|task| task.path()) {
            if path.points() != waypoints.as_slice() {
                waypoints = path.points().to_vec();
            }
        }
    }

    Ok(Report {
        outcome,
        frames,
        waypoints,
        position: query::object(&world, id).map(|snapshot| snapshot.position),
    })
}

fn finished(id: ObjectId, events: &[Event]) -> Option<GotoOutcome> {
    events.iter().find_map(|event| match event {
        Event::GotoFinished {
            id: finished,
            outcome,
        } if *finished == id => Some(*outcome),
        _ => None,
    })
}

/// Applies a command and feeds the resulting events through the movement
/// system until it settles. Returns every event observed.
fn submit(world: &mut World, movement: &mut Movement, command: Command) -> Vec<Event> {
    let mut events = Vec::new();
    world::apply(world, command, &mut events);

    let mut observed = Vec::new();
    while !events.is_empty() {
        let mut commands = Vec::new();
        movement.handle(&events, &*world, &*world, &mut commands);
        observed.append(&mut events);
        for command in commands {
            world::apply(world, command, &mut events);
        }
    }
    observed
}

fn print_report(cli: &Cli, report: &Report) {
    match report.outcome {
        Some(GotoOutcome::Arrived) => println!("outcome: arrived"),
        Some(GotoOutcome::Failed(error)) => println!("outcome: failed ({error})"),
        Some(GotoOutcome::Aborted) => println!("outcome: aborted"),
        None => println!("outcome: unfinished"),
    }
    println!(
        "frames: {} ({:.2} s)",
        report.frames,
        report.frames as f32 * cli.dt
    );
    println!("waypoints: {}", report.waypoints.len());
    for point in &report.waypoints {
        println!("  ({:.1}, {:.1}, {:.1})", point.x, point.y, point.z);
    }
    match report.position {
        Some(position) => println!(
            "final position: ({:.1}, {:.1}, {:.1})",
            position.x, position.y, position.z
        ),
        None => println!("final position: destroyed"),
    }
}
