use std::f32::consts::{FRAC_PI_2, PI};

use glam::Vec3;
use log::{debug, info, trace};
use waypoint_core::{
    geometry::{direction, distance_projected, heading_of, heading_towards, local_to_world, planar},
    Config, CrashMode, GoalMode, GotoError, GotoOrder, LocomotionClass, Movable, ObjectId,
    ObjectRole, SearchStatus, TaskStatus, FLY_DEF_HEIGHT, FLY_DIST_GROUND, TAKE_DIST,
};
use waypoint_system_navigation::{ObstacleScan, OccupancyGrid, PathSearch, Plane, WaypointPath};

use crate::{
    avoid::{self, Leak},
    target::{self, Approach},
    Surroundings,
};

/// Goals closer than this are approached directly even in beam mode.
const CLOSE_GOAL: f32 = 10.0;
/// Distance left in front of a targeted object for the final move.
const FINAL_APPROACH: f32 = 4.0;
/// Goal radius when the cargo object is a station.
const STATION_RADIUS: f32 = 12.0;
/// Multiple of the cell size cleared around the mover before searching.
const START_CLEARING: f32 = 1.8;
/// Seconds without progress before the search restarts.
const WATCHDOG_DELAY: f32 = 1.0;
/// Displacement that counts as progress for the watchdog.
const WATCHDOG_PROGRESS: f32 = 1.0;
/// Distance looked ahead at full speed when holding altitude.
const LOOKAHEAD: f32 = 20.0;
/// Pause after a collision before sidestepping.
const CRASH_PAUSE: f32 = 1.0;
/// Length of the first sidestep.
const CRASH_STEP: f32 = 5.0;
/// Length of the second sidestep.
const RETRY_STEP: f32 = 10.0;
/// Reactor charge below which a cruising flyer goes down to cool off.
const LOW_REACTOR: f32 = 0.1;

/// Phase of a [`GotoTask`].
///
/// Beam orders run `Leak`, `Search`, `WaitCool`, `Up`, `Goto` and `Down`.
/// Direct orders run `Advance` and `Land`, with the crash and retry phases
/// inserted after collisions. Both end with `Turn` and `Move` when the goal
/// is an object.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Phase {
    /// Backing away from an obstacle the mover starts against.
    Leak,
    /// Running the incremental grid search.
    Search,
    /// Waiting on the ground for the reactor to cool down.
    WaitCool,
    /// Climbing to cruise altitude.
    Up,
    /// Following waypoints.
    Goto,
    /// Descending at the end of the path.
    Down,
    /// Heading straight for the goal.
    Advance,
    /// Touching down on the goal.
    Land,
    /// Turning in place towards the target.
    Turn,
    /// Final straight move towards the target.
    Move,
    /// Pausing after a collision.
    CrashWait,
    /// Turning aside after a collision.
    CrashTurn,
    /// Sidestepping after a collision.
    CrashAdvance,
    /// Pausing after a collision during a sidestep.
    RetryWait,
    /// Turning to the other side.
    RetryTurn,
    /// Sidestepping to the other side.
    RetryAdvance,
}

/// Movement order being executed by one mover.
///
/// The task never moves the mover itself. Each [`GotoTask::step`] only
/// writes motor speeds, which the physics integrator turns into motion.
#[derive(Clone, Debug)]
pub struct GotoTask {
    phase: Phase,
    outcome: Option<TaskStatus>,

    goal: Vec3,
    goal_object: Vec3,
    altitude: f32,
    goal_mode: GoalMode,
    crash_mode: CrashMode,
    take: bool,
    target: Option<ObjectId>,
    cargo: Option<ObjectId>,
    goal_radius: f32,

    ignored: Vec<LocomotionClass>,
    iterations: u32,
    max_points: usize,
    rescan: f32,

    final_move: f32,
    final_start: Vec3,
    final_dist: f32,
    time_limit: f32,
    angle: f32,
    time: f32,
    pos_mark: Vec3,
    last_distance: f32,

    leak: Option<Leak>,
    search: PathSearch,
    search_begun: bool,
    path: Option<WaypointPath>,

    watchdog_position: Vec3,
    watchdog_time: f32,
}

impl GotoTask {
    /// Accepts an order and plans the first phase.
    ///
    /// Fails with [`GotoError::Busy`] when a beam order targets a blocked cell.
    pub fn start(
        order: GotoOrder,
        config: &Config,
        body: &mut dyn Movable,
        grid: &mut OccupancyGrid,
        env: Surroundings<'_>,
    ) -> Result<Self, GotoError> {
        let profile = body.profile();
        let position = body.position();

        let goal_mode = match order.goal_mode {
            GoalMode::Default => profile.default_goal_mode,
            mode => mode,
        };
        let mut crash_mode = match order.crash_mode {
            CrashMode::Default => profile.default_crash_mode,
            mode => mode,
        };
        if crash_mode == CrashMode::Beam && distance_projected(position, order.goal) < CLOSE_GOAL {
            crash_mode = CrashMode::RightLeft;
        }

        let ignored = config
            .locomotion
            .iter()
            .filter(|(_, profile)| profile.ignored_by_others)
            .map(|(class, _)| class)
            .collect();

        let mut task = Self {
            phase: Phase::Advance,
            outcome: None,
            goal: order.goal,
            goal_object: order.goal,
            altitude: order.altitude,
            goal_mode,
            crash_mode,
            take: false,
            target: None,
            cargo: None,
            goal_radius: 0.0,
            ignored,
            iterations: config.grid.iterations_per_step,
            max_points: config.grid.max_points,
            rescan: config.grid.rescan_margin as f32 * config.grid.cell_size,
            final_move: 0.0,
            final_start: position,
            final_dist: 0.0,
            time_limit: 0.0,
            angle: 0.0,
            time: 0.0,
            pos_mark: position,
            last_distance: 1000.0,
            leak: None,
            search: PathSearch::default(),
            search_begun: false,
            path: None,
            watchdog_position: position,
            watchdog_time: 0.0,
        };
        debug!(
            "{:?} goto {} in {goal_mode:?}/{crash_mode:?} mode",
            body.id(),
            order.goal
        );

        body.set_collided(false);
        if crash_mode == CrashMode::Beam {
            task.start_beam(body, grid, env)?;
        } else {
            task.start_direct(body, env);
        }
        Ok(task)
    }

    /// Current phase.
    #[must_use]
    pub const fn phase(&self) -> Phase {
        self.phase
    }

    /// Goal the mover is driving to, after target adjustment.
    #[must_use]
    pub const fn goal(&self) -> Vec3 {
        self.goal
    }

    /// Path being followed, once a search found one.
    #[must_use]
    pub const fn path(&self) -> Option<&WaypointPath> {
        self.path.as_ref()
    }

    /// Runs one frame of the task and writes the resulting motor speeds.
    ///
    /// Once the task has finished, the same status is returned again.
    pub fn step(
        &mut self,
        dt: f32,
        body: &mut dyn Movable,
        grid: &mut OccupancyGrid,
        env: Surroundings<'_>,
    ) -> TaskStatus {
        if let Some(status) = self.outcome {
            return status;
        }
        if !(dt > 0.0) {
            return TaskStatus::Continue;
        }
        if let Some(target) = self.target {
            if env.objects.object(target).is_none() {
                return self.finish(body, TaskStatus::Failed(GotoError::TargetInvalidated));
            }
        }

        let mut status = self.drive(dt, body, grid, env);
        if status == TaskStatus::Continue {
            status = self.advance(body, grid, env);
        }
        if status == TaskStatus::Continue {
            status
        } else {
            self.finish(body, status)
        }
    }

    /// Stops the mover. The task should be dropped afterwards.
    pub fn abort(&mut self, body: &mut dyn Movable) {
        debug!("{:?} goto aborted in {:?}", body.id(), self.phase);
        body.set_motor_speed(Vec3::ZERO);
    }

    fn finish(&mut self, body: &mut dyn Movable, status: TaskStatus) -> TaskStatus {
        body.set_motor_speed(Vec3::ZERO);
        match status {
            TaskStatus::Done => info!("{:?} reached {}", body.id(), self.goal),
            TaskStatus::Failed(error) => info!("{:?} goto failed: {error}", body.id()),
            TaskStatus::Continue => {}
        }
        self.outcome = Some(status);
        status
    }

    fn enter(&mut self, id: ObjectId, phase: Phase) {
        debug!("{id:?} goto {:?} -> {phase:?}", self.phase);
        self.phase = phase;
        self.time = 0.0;
    }

    fn start_direct(&mut self, body: &mut dyn Movable, env: Surroundings<'_>) {
        if body.profile().approximate_arrival {
            return;
        }
        let Some(object) = target::search_target(env.objects, body.id(), self.goal, 1.0) else {
            return;
        };
        self.goal = object.position;
        self.goal_object = object.position;
        self.target = Some(object.id);
        if target::adjust_building(env.objects, &mut self.goal, 1.0, 0.0).is_none() {
            let _ = target::adjust_target(
                body.class(),
                body.position(),
                object,
                &mut self.goal,
                0.0,
            );
        }
        self.take = true;
    }

    fn start_beam(
        &mut self,
        body: &mut dyn Movable,
        grid: &mut OccupancyGrid,
        env: Surroundings<'_>,
    ) -> Result<(), GotoError> {
        if let Some(object) = target::search_target(env.objects, body.id(), self.goal, 1.0) {
            self.goal = object.position;
            self.goal_object = object.position;
            self.target = Some(object.id);
            if let Some(remaining) =
                target::adjust_building(env.objects, &mut self.goal, 1.0, FINAL_APPROACH)
            {
                self.final_move = remaining;
            } else {
                match target::adjust_target(
                    body.class(),
                    body.position(),
                    object,
                    &mut self.goal,
                    FINAL_APPROACH,
                ) {
                    Approach::AnySide => {
                        self.cargo = Some(object.id);
                        self.goal_radius = if matches!(object.role, ObjectRole::Station) {
                            STATION_RADIUS
                        } else {
                            TAKE_DIST + 2.0
                        };
                    }
                    Approach::Single { remaining } => self.final_move = remaining,
                }
            }
            self.take = true;
        }

        if body.profile().flies
            && self.altitude == 0.0
            && distance_projected(body.position(), self.goal) > FLY_DIST_GROUND
        {
            self.altitude = FLY_DEF_HEIGHT;
        }

        self.plan(body, grid, env);

        if self.cargo.is_none() {
            let (x, y) = grid.geometry().cell(self.goal);
            if grid.test(env.terrain, Plane::Blocked, x, y) {
                debug!("{:?} goal {} is occupied", body.id(), self.goal);
                return Err(GotoError::Busy);
            }
        }
        Ok(())
    }

    fn search_goal(&self) -> Vec3 {
        if self.cargo.is_some() {
            self.goal_object
        } else {
            self.goal
        }
    }

    /// Rasterises the surroundings and starts over from the search.
    fn plan(&mut self, body: &mut dyn Movable, grid: &mut OccupancyGrid, env: Surroundings<'_>) {
        let position = body.position();
        let goal = self.search_goal();

        grid.open();
        grid.compute_objects_region(
            env.terrain,
            env.objects,
            &ObstacleScan {
                mover: body.id(),
                cargo: self.cargo,
                radius: body.radius(),
                altitude: self.altitude,
                flies: body.profile().flies,
            },
        );
        let margin = Vec3::splat(self.rescan);
        grid.compute_terrain_between(
            env.terrain,
            position.min(goal) - margin,
            position.max(goal) + margin,
        );
        self.path = None;
        self.search_begun = false;

        self.leak = avoid::leak_search(body, env.objects);
        if self.leak.is_some() {
            self.enter(body.id(), Phase::Leak);
        } else {
            body.set_motor_speed(Vec3::ZERO);
            self.enter(body.id(), Phase::Search);
        }
    }

    fn reset_watchdog(&mut self, position: Vec3) {
        self.watchdog_position = position;
        self.watchdog_time = 0.0;
    }

    fn turn_towards(&self, body: &mut dyn Movable) -> f32 {
        let turn = direction(body.heading(), self.angle);
        body.set_motor_speed_z(turn.clamp(-1.0, 1.0));
        turn
    }

    /// Altitude hold used on direct approaches.
    fn hold_altitude(&self, body: &mut dyn Movable, env: Surroundings<'_>) {
        if !body.profile().flies || self.altitude <= 0.0 {
            return;
        }
        let position = body.position();
        let factor = ((distance_projected(position, self.goal) - 20.0) / 20.0).clamp(0.0, 1.0);
        let height = env.terrain.height_to_floor(position);

        let mut climb = 0.0;
        if height < (self.altitude - 0.5) * factor && factor == 1.0 {
            climb = 0.1;
        }
        if height > self.altitude * factor {
            climb = -0.2;
        }
        climb += avoid::flying_repulse(body, env.objects, &self.ignored) * 0.2;
        body.set_motor_speed_y(climb);
    }

    /// Writes the motor speeds of the current phase.
    fn drive(
        &mut self,
        dt: f32,
        body: &mut dyn Movable,
        grid: &mut OccupancyGrid,
        env: Surroundings<'_>,
    ) -> TaskStatus {
        let position = body.position();
        let flies = body.profile().flies;

        match self.phase {
            Phase::Leak => {
                let Some(leak) = self.leak else {
                    return TaskStatus::Continue;
                };
                if leak.recede {
                    body.set_motor_speed(Vec3::new(-1.0, 0.0, 0.0));
                } else {
                    let towards = heading_towards(position, leak.from);
                    let ahead = direction(body.heading(), towards);
                    if ahead.abs() > FRAC_PI_2 {
                        let turn = direction(body.heading(), towards + PI);
                        body.set_motor_speed(Vec3::new(1.0, 0.0, turn.clamp(-1.0, 1.0)));
                    } else {
                        body.set_motor_speed(Vec3::new(-1.0, 0.0, ahead.clamp(-1.0, 1.0)));
                    }
                }
                self.time += dt;
            }

            Phase::Search => {
                if !self.search_begun {
                    let clearing = grid.geometry().cell_size() * START_CLEARING;
                    grid.clear_circle(position, clearing);
                    let goal = self.search_goal();
                    self.search.begin(grid, position, goal, self.goal_radius);
                    self.search_begun = true;
                }
                match self
                    .search
                    .step(grid, env.terrain, self.iterations, self.max_points)
                {
                    SearchStatus::Continue => {}
                    SearchStatus::Found => {
                        let Some(mut path) = self.search.take_path() else {
                            return TaskStatus::Failed(GotoError::SearchInconsistency);
                        };
                        let first = path.shortcut(grid, env.terrain);
                        path.set_index(first);
                        self.path = Some(path);
                        self.reset_watchdog(position);
                        let next = if body.is_landed() {
                            Phase::WaitCool
                        } else {
                            Phase::Goto
                        };
                        self.enter(body.id(), next);
                    }
                    SearchStatus::Unreachable => {
                        return TaskStatus::Failed(GotoError::Unreachable);
                    }
                    SearchStatus::Inconsistent => {
                        return TaskStatus::Failed(GotoError::SearchInconsistency);
                    }
                }
            }

            Phase::WaitCool => {}

            Phase::Up => {
                if flies {
                    body.set_motor_speed_y(1.0);
                }
            }

            Phase::Goto => return self.follow_path(dt, body, grid, env),

            Phase::Down | Phase::Land => {
                body.set_motor_speed_x(0.0);
                body.set_motor_speed_z(0.0);
                if flies && self.altitude > 0.0 {
                    body.set_motor_speed_y(-0.5);
                }
            }

            Phase::Advance if self.goal_mode == GoalMode::Express => {
                if self.crash_mode == CrashMode::Halt && body.collided() {
                    body.set_collided(false);
                    return TaskStatus::Failed(GotoError::Halted);
                }
                if flies && self.altitude > 0.0 {
                    let height = env.terrain.height_to_floor(position);
                    if height < self.altitude - 1.0 {
                        body.set_motor_speed_y(0.1);
                    } else if height > self.altitude + 1.0 {
                        body.set_motor_speed_y(-0.2);
                    } else {
                        body.set_motor_speed_y(0.0);
                    }
                }
                let turn = direction(body.heading(), heading_towards(position, self.goal));
                body.set_motor_speed_z(turn.clamp(-1.0, 1.0));
                body.set_motor_speed_x(1.0);
            }

            Phase::Advance => {
                self.hold_altitude(body, env);
                if body.collided() {
                    body.set_collided(false);
                    body.set_motor_speed_x(0.0);
                    body.set_motor_speed_z(0.0);
                    self.enter(body.id(), Phase::CrashWait);
                    return TaskStatus::Continue;
                }

                let dist = distance_projected(position, self.goal);
                let push = avoid::repulse(body, self.goal, env.objects, &self.ignored);
                let wanted = (planar(self.goal) - planar(position)).normalize_or_zero() + push * 2.0;
                let turn = direction(body.heading(), heading_of(wanted)).clamp(-1.0, 1.0);

                let mut speed = (dist / (body.lin_stop_length() * 1.5)).min(1.0);
                speed *= 1.0 - 0.7 * turn.abs();
                if dist < 20.0 && turn.abs() >= 0.5 {
                    speed = 0.0;
                }
                body.set_motor_speed_x(speed);
                body.set_motor_speed_z(turn);
            }

            Phase::Turn => {
                body.set_motor_speed_x(0.0);
                let _ = self.turn_towards(body);
            }

            Phase::CrashTurn | Phase::RetryTurn => {
                self.hold_altitude(body, env);
                body.set_motor_speed_x(0.0);
                let _ = self.turn_towards(body);
            }

            Phase::CrashWait | Phase::RetryWait => {
                self.hold_altitude(body, env);
                self.time += dt;
                body.set_motor_speed_x(0.0);
                body.set_motor_speed_z(0.0);
            }

            Phase::CrashAdvance | Phase::RetryAdvance => {
                self.hold_altitude(body, env);
                if body.collided() {
                    body.set_collided(false);
                    body.set_motor_speed_x(0.0);
                    let next = if self.phase == Phase::CrashAdvance {
                        Phase::RetryWait
                    } else {
                        Phase::CrashWait
                    };
                    self.enter(body.id(), next);
                    return TaskStatus::Continue;
                }
                body.set_motor_speed_x(0.5);
                body.set_motor_speed_z(0.0);
            }

            Phase::Move => {
                self.time_limit -= dt;
                body.set_motor_speed_x(1.0);
                body.set_motor_speed_z(0.0);
            }
        }
        TaskStatus::Continue
    }

    /// Steering, altitude hold and watchdog while following waypoints.
    fn follow_path(
        &mut self,
        dt: f32,
        body: &mut dyn Movable,
        grid: &mut OccupancyGrid,
        env: Surroundings<'_>,
    ) -> TaskStatus {
        let Some(path) = self.path.as_ref() else {
            return TaskStatus::Failed(GotoError::SearchInconsistency);
        };
        let Some(point) = path.current() else {
            return TaskStatus::Continue;
        };
        let at_last = path.at_last();
        let position = body.position();

        body.set_collided(false);

        if body.profile().flies {
            if self.altitude == 0.0 {
                body.set_motor_speed_y(if body.is_landed() { 0.0 } else { -1.0 });
            } else {
                let full = body.profile().linear.advance_speed.x;
                let reach = if full > 0.0 {
                    body.linear_real_speed().x / full * LOOKAHEAD
                } else {
                    0.0
                };
                let ahead = position + local_to_world(body.heading(), Vec3::new(reach, 0.0, 0.0));
                let height = env
                    .terrain
                    .height_to_floor(position)
                    .min(env.terrain.height_to_floor(ahead));

                let mut climb = 0.0;
                if height < self.altitude - 1.0 {
                    climb = (0.2 + ((self.altitude - 1.0) - height) * 0.1).min(1.0);
                }
                if height > self.altitude + 1.0 {
                    climb = -0.2;
                }
                body.set_motor_speed_y(climb);
            }
        }

        let dist = distance_projected(position, point);
        let mut turn = (direction(body.heading(), heading_towards(position, point)) * 2.0)
            .clamp(-1.0, 1.0);
        if dist < 4.0 {
            turn *= dist / 4.0;
        }

        let mut speed = if at_last {
            (dist / (body.lin_stop_length() * 1.5)).min(1.0)
        } else {
            1.0
        };
        speed *= 1.0 - 0.7 * turn.abs();
        if turn.abs() >= 0.2 {
            speed = 0.0;
        }
        body.set_motor_speed_x(speed);
        body.set_motor_speed_z(turn);

        let progress = distance_projected(position, self.watchdog_position);
        if speed != 0.0 && progress < WATCHDOG_PROGRESS {
            self.watchdog_time += dt;
            if self.watchdog_time >= WATCHDOG_DELAY {
                debug!("{:?} stuck near {position}, searching again", body.id());
                body.set_motor_speed(Vec3::ZERO);
                self.reset_watchdog(position);
                self.plan(body, grid, env);
            }
        } else {
            trace!("{:?} watchdog reset at {position}", body.id());
            self.reset_watchdog(position);
        }
        TaskStatus::Continue
    }

    /// Checks the end condition of the current phase and moves on.
    ///
    /// Phases are checked in order so that a transition can complete the
    /// following phase within the same frame.
    fn advance(
        &mut self,
        body: &mut dyn Movable,
        grid: &mut OccupancyGrid,
        env: Surroundings<'_>,
    ) -> TaskStatus {
        let id = body.id();
        let position = body.position();
        let flies = body.profile().flies;
        let approximate = body.profile().approximate_arrival;

        if self.phase == Phase::Leak {
            let delay = self.leak.map_or(0.0, |leak| leak.delay);
            if self.time < delay {
                return TaskStatus::Continue;
            }
            body.set_motor_speed(Vec3::ZERO);
            self.search_begun = false;
            self.enter(id, Phase::Search);
            return TaskStatus::Continue;
        }

        if self.phase == Phase::WaitCool {
            let hot = body.reactor_charge().map_or(false, |charge| charge < 1.0);
            if self.altitude != 0.0 && hot {
                return TaskStatus::Continue;
            }
            self.enter(id, Phase::Up);
        }

        if self.phase == Phase::Up {
            if flies && self.altitude > 0.0 {
                let cruise = (env.terrain.floor_level(position) + self.altitude - 20.0)
                    .min(env.terrain.flying_max_height());
                if position.y < cruise - 1.0 {
                    return TaskStatus::Continue;
                }
                body.set_motor_speed_y(0.0);
            }
            self.enter(id, Phase::Goto);
            return TaskStatus::Continue;
        }

        if self.phase == Phase::Goto {
            let cold = body.reactor_charge().map_or(false, |charge| charge < LOW_REACTOR);
            if self.altitude != 0.0 && cold {
                body.set_motor_speed(Vec3::new(0.0, -1.0, 0.0));
                self.enter(id, Phase::WaitCool);
                return TaskStatus::Continue;
            }

            let landed = body.is_landed();
            let arrived = match self.path.as_mut() {
                Some(path) => {
                    let Some(point) = path.current() else {
                        return TaskStatus::Continue;
                    };
                    let limit = if approximate {
                        2.0
                    } else if landed {
                        1.0
                    } else if path.at_last() {
                        2.0
                    } else {
                        4.0
                    };
                    if distance_projected(position, point) > limit {
                        return TaskStatus::Continue;
                    }
                    let next = path.shortcut(grid, env.terrain);
                    path.set_index(next);
                    next > path.total()
                }
                None => return TaskStatus::Continue,
            };

            body.set_motor_speed(Vec3::ZERO);
            self.reset_watchdog(position);
            if !arrived {
                return TaskStatus::Continue;
            }
            self.enter(id, Phase::Down);
            return TaskStatus::Continue;
        }

        if self.phase == Phase::Down {
            if flies && self.altitude > 0.0 {
                if !body.is_landed() {
                    return TaskStatus::Continue;
                }
                body.set_motor_speed_y(0.0);
                self.altitude = 0.0;
                if let Some(path) = self.path.as_mut() {
                    let last = path.total();
                    path.set_index(last);
                }
                self.enter(id, Phase::Goto);
                return TaskStatus::Continue;
            }
            if !self.take {
                return TaskStatus::Done;
            }
            self.angle = heading_towards(position, self.goal_object);
            self.enter(id, Phase::Turn);
            return TaskStatus::Continue;
        }

        if self.phase == Phase::Advance {
            let dist = distance_projected(position, self.goal);
            if self.goal_mode == GoalMode::Express {
                let near = if flies { 20.0 } else { 10.0 };
                if dist < near && dist > self.last_distance {
                    return TaskStatus::Done;
                }
                self.last_distance = dist;
            }

            let limit = if approximate {
                2.0
            } else if body.is_landed() {
                0.1
            } else {
                1.0
            };
            if dist > limit {
                return TaskStatus::Continue;
            }
            body.set_motor_speed_x(0.0);
            body.set_motor_speed_z(0.0);
            self.enter(id, Phase::Land);
        }

        if self.phase == Phase::Land {
            if flies && self.altitude > 0.0 {
                if !body.is_landed() {
                    return TaskStatus::Continue;
                }
                body.set_motor_speed_y(0.0);
            }
            if !self.take {
                return TaskStatus::Done;
            }
            self.angle = heading_towards(position, self.goal_object);
            self.enter(id, Phase::Turn);
            return TaskStatus::Continue;
        }

        if self.phase == Phase::Turn {
            let limit = if approximate { 0.10 } else { 0.02 };
            if direction(body.heading(), self.angle).abs() > limit {
                return TaskStatus::Continue;
            }
            body.set_motor_speed_z(0.0);
            if self.final_move == 0.0 {
                return TaskStatus::Done;
            }
            self.final_start = position;
            self.final_dist = body.lin_length(self.final_move);
            self.time_limit = (body.lin_time_length(self.final_move.abs()) * 1.5).max(0.5);
            self.enter(id, Phase::Move);
            return TaskStatus::Continue;
        }

        if self.phase == Phase::CrashWait {
            if self.crash_mode == CrashMode::Halt {
                return TaskStatus::Failed(GotoError::Halted);
            }
            if self.time < CRASH_PAUSE {
                return TaskStatus::Continue;
            }
            let side = if matches!(self.crash_mode, CrashMode::RightLeft | CrashMode::Right) {
                FRAC_PI_2
            } else {
                -FRAC_PI_2
            };
            self.angle = body.heading() + side;
            self.enter(id, Phase::CrashTurn);
            return TaskStatus::Continue;
        }

        if matches!(self.phase, Phase::CrashTurn | Phase::RetryTurn) {
            if direction(body.heading(), self.angle).abs() >= 0.1 {
                return TaskStatus::Continue;
            }
            self.pos_mark = position;
            let next = if self.phase == Phase::CrashTurn {
                Phase::CrashAdvance
            } else {
                Phase::RetryAdvance
            };
            self.enter(id, next);
            return TaskStatus::Continue;
        }

        if self.phase == Phase::CrashAdvance {
            if distance_projected(position, self.pos_mark) >= CRASH_STEP {
                self.enter(id, Phase::Advance);
            }
            return TaskStatus::Continue;
        }

        if self.phase == Phase::RetryWait {
            if self.time < CRASH_PAUSE {
                return TaskStatus::Continue;
            }
            let offset = match self.crash_mode {
                CrashMode::LeftRight => PI,
                CrashMode::Right => FRAC_PI_2,
                CrashMode::Left => -FRAC_PI_2,
                _ => -PI,
            };
            self.angle = body.heading() + offset;
            self.enter(id, Phase::RetryTurn);
            return TaskStatus::Continue;
        }

        if self.phase == Phase::RetryAdvance {
            if distance_projected(position, self.pos_mark) >= RETRY_STEP {
                self.enter(id, Phase::Advance);
            }
            return TaskStatus::Continue;
        }

        if self.phase == Phase::Move {
            if self.time_limit <= 0.0 {
                return TaskStatus::Done;
            }
            if distance_projected(position, self.final_start) >= self.final_dist {
                body.set_motor_speed_x(0.0);
                return TaskStatus::Done;
            }
        }

        TaskStatus::Continue
    }
}
