//! Demo scene: couriers routing across a grid of lockable gates
//!
//! Builds a gated walkway grid, spawns courier actors that route through it
//! with the state queue, and slams a gate shut mid-run so everyone has to
//! replan. Headless; run with `RUST_LOG=info` to watch it unfold.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use rand::SeedableRng;
use rand::rngs::StdRng;
use waypath::prelude::*;

/// Grid side length in nodes and node spacing in meters.
const GRID_SIDE: usize = 4;
const GRID_SPACING: f32 = 2.0;

/// Chance that any gate starts out locked.
const LOCK_CHANCE: f32 = 0.15;

/// Walk speed in meters per second.
const WALK_SPEED: FloatDistribution = FloatDistribution::new(1.2, 2.4);

/// How many couriers to spawn.
const COURIER_COUNT: IntDistribution = IntDistribution::new(2, 4);

/// Seconds the watcher stays on alert after a gate closes.
const ALERT_HOLD: f32 = 3.0;

const DRAW_STEP: f32 = 1.0 / 60.0;
const FIXED_STEP: f32 = 0.02;
const FRAMES: u32 = 900;

/// An actor that works through graph waypoints one at a time.
struct Courier {
    queue: StateQueue<Vec3>,
    body: CourierBody,
}

struct CourierBody {
    name: String,
    /// Last node position reached.
    at: Vec3,
    /// Where this courier is ultimately trying to go.
    destination: Option<Vec3>,
    walk_speed: f32,
    clock: TickClock,
    /// Back-reference so travel countdowns can advance the queue.
    me: Weak<RefCell<Courier>>,
}

impl Courier {
    fn spawn(name: String, at: Vec3, clock: &TickClock, rng: &mut StdRng) -> Rc<RefCell<Self>> {
        let walk_speed = WALK_SPEED.sample(rng);
        log::info!("{name} spawns at {at} walking {walk_speed:.1} m/s");
        let courier = Rc::new(RefCell::new(Self {
            queue: StateQueue::new(),
            body: CourierBody {
                name,
                at,
                destination: None,
                walk_speed,
                clock: clock.clone(),
                me: Weak::new(),
            },
        }));
        courier.borrow_mut().body.me = Rc::downgrade(&courier);
        courier
    }
}

impl StateActor<Vec3> for CourierBody {
    fn enter_state(&mut self, waypoint: Vec3) -> StateFlow {
        // Travel is modeled as elapsed time; the courier lands on the
        // waypoint when the countdown runs out.
        let mut remaining = (waypoint - self.at).length() / self.walk_speed;
        log::info!("{} heads for {waypoint} ({remaining:.1}s away)", self.name);
        let me = self.me.clone();
        self.clock.subscribe_draw(move |delta_time| {
            remaining -= delta_time;
            if remaining > 0.0 {
                return TickFlow::Continue;
            }
            if let Some(courier) = me.upgrade() {
                let courier = &mut *courier.borrow_mut();
                courier.body.at = waypoint;
                courier.queue.state_exited(&mut courier.body);
            }
            TickFlow::Stop
        });
        StateFlow::InProgress
    }

    fn on_states_exhausted(&mut self) -> Option<Vec<Vec3>> {
        log::info!("{} has nowhere left to go", self.name);
        None
    }
}

/// Recompute a courier's route and queue the waypoints.
fn route(courier: &Rc<RefCell<Courier>>, graph: &SpatialGraph<Vec3>, destination: Vec3) {
    let courier = &mut *courier.borrow_mut();
    let Some(start) = graph.nearest_node(courier.body.at) else {
        return;
    };
    let Some(end) = graph.nearest_node(destination) else {
        return;
    };
    match graph.find_path(start, end) {
        Ok(Some(path)) => {
            log::info!("{} routed through {} waypoints", courier.body.name, path.len());
            // The leg in flight still finishes; everything stale behind it
            // is dropped in favor of the fresh route.
            courier.queue.enqueue_interrupt(&mut courier.body, path);
        }
        Ok(None) => {
            log::info!("{} finds no open route", courier.body.name);
            courier.queue.enqueue_interrupt(&mut courier.body, Vec::new());
        }
        Err(error) => log::error!("{} routing failed: {error}", courier.body.name),
    }
}

/// Coarse mood of the scene's watcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum WatchMode {
    Calm,
    Alert,
}

struct CalmState;

impl MachineState<WatchMode> for CalmState {}

struct AlertState {
    hold: f32,
    remaining: f32,
}

impl MachineState<WatchMode> for AlertState {
    fn entered(&mut self) {
        self.remaining = self.hold;
    }

    fn tick(&mut self, delta_time: f32) -> Option<WatchMode> {
        self.remaining -= delta_time;
        (self.remaining <= 0.0).then_some(WatchMode::Calm)
    }
}

/// Wire up the walkway grid, sharing one latch per gate across both
/// directions.
fn build_gate_grid(rng: &mut StdRng) -> (SpatialGraph<Vec3>, Vec<LockHandle>) {
    let mut graph = SpatialGraph::new();
    for z in 0..GRID_SIDE {
        for x in 0..GRID_SIDE {
            graph.add_node(Vec3::new(
                x as f32 * GRID_SPACING,
                0.0,
                z as f32 * GRID_SPACING,
            ));
        }
    }

    let chance = FloatDistribution::default();
    let mut gates = Vec::new();
    for z in 0..GRID_SIDE {
        for x in 0..GRID_SIDE {
            let here = z * GRID_SIDE + x;
            if x < GRID_SIDE - 1 {
                gates.push(spawn_gate(&mut graph, here, here + 1, &chance, rng));
            }
            if z < GRID_SIDE - 1 {
                gates.push(spawn_gate(&mut graph, here, here + GRID_SIDE, &chance, rng));
            }
        }
    }
    (graph, gates)
}

fn spawn_gate(
    graph: &mut SpatialGraph<Vec3>,
    a: usize,
    b: usize,
    chance: &FloatDistribution,
    rng: &mut StdRng,
) -> LockHandle {
    let lock = LockHandle::new(chance.sample(rng) < LOCK_CHANCE);
    graph
        .link_two_way(a, b, &lock)
        .expect("grid wiring uses valid indices");
    lock
}

fn main() {
    env_logger::init();
    log::info!("building a {GRID_SIDE}x{GRID_SIDE} gate grid");

    let mut rng = StdRng::seed_from_u64(0x57A7E);
    let clock = TickClock::new();
    let (mut graph, gates) = build_gate_grid(&mut rng);

    // Spawn couriers on random nodes and have them replan whenever the
    // graph announces a change.
    let node_pick = IntDistribution::new(0, (graph.node_count() - 1) as i32);
    let mut couriers = Vec::new();
    for index in 0..COURIER_COUNT.sample(&mut rng) {
        let home = node_pick.sample(&mut rng) as usize;
        let at = *graph.value(home).expect("home node exists");
        let courier = Courier::spawn(format!("courier-{index}"), at, &clock, &mut rng);

        let watched = courier.clone();
        graph.subscribe_changed(move |graph| {
            let destination = watched.borrow().body.destination;
            if let Some(destination) = destination {
                route(&watched, graph, destination);
            }
        });
        couriers.push(courier);
    }

    // A watcher that goes on alert whenever a gate slams.
    let mut watcher = StateMachine::new(
        [
            (
                WatchMode::Calm,
                Box::new(CalmState) as Box<dyn MachineState<WatchMode>>,
            ),
            (
                WatchMode::Alert,
                Box::new(AlertState {
                    hold: ALERT_HOLD,
                    remaining: 0.0,
                }),
            ),
        ],
        WatchMode::Calm,
    );
    watcher.subscribe(|mode| log::info!("watcher is now {mode:?}"));

    // Everyone heads for the far corner.
    let far_corner = *graph
        .value(graph.node_count() - 1)
        .expect("grid has nodes");
    for courier in &couriers {
        courier.borrow_mut().body.destination = Some(far_corner);
        route(courier, &graph, far_corner);
    }

    let toggled = IntDistribution::new(0, (gates.len() - 1) as i32).sample(&mut rng) as usize;
    for frame in 0..FRAMES {
        clock.tick_draw(DRAW_STEP);
        clock.tick_fixed(FIXED_STEP);
        watcher.tick(FIXED_STEP);

        // Slam one gate shut partway through, reopen it later.
        if frame == FRAMES / 3 {
            log::info!("gate {toggled} slams shut");
            gates[toggled].set_locked(true);
            watcher.set_current(WatchMode::Alert);
            graph.notify_changed();
        }
        if frame == 2 * FRAMES / 3 {
            log::info!("gate {toggled} reopens");
            gates[toggled].set_locked(false);
            graph.notify_changed();
        }
    }

    log::info!("demo complete");
}
