//! Persisted job definition
//!
//! The configuration-plus-progress record for the vehicle's current job.
//! Decoded once at startup from the host's storage blob, mutated by the job
//! state machines and configuration commands, re-encoded on every host save
//! callback.
//!
//! Every field decodes defensively: missing or malformed values (including
//! out-of-range enum codes) fall back to their defaults, so a corrupted
//! blob yields a paused default job, never a crash or an undefined stage.

use nalgebra::Vector3;

use crate::parameters::store::SettingsStore;
use crate::platform::traits::TimerTrigger;
use crate::subsystems::navigation::types::Waypoint;

/// Kind of long-running job this vehicle performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum JobKind {
    #[default]
    None,
    MiningGrinding,
    Shuttle,
}

impl JobKind {
    pub fn code(self) -> i32 {
        match self {
            JobKind::None => 0,
            JobKind::MiningGrinding => 1,
            JobKind::Shuttle => 2,
        }
    }

    pub fn from_code(code: i32) -> Self {
        match code {
            1 => JobKind::MiningGrinding,
            2 => JobKind::Shuttle,
            _ => JobKind::None,
        }
    }
}

/// How deep each mining shaft goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DepthMode {
    /// Dig until the vein stops yielding ore.
    Auto,
    /// Dig to the configured work depth.
    #[default]
    Depth,
}

impl DepthMode {
    pub fn code(self) -> i32 {
        match self {
            DepthMode::Auto => 0,
            DepthMode::Depth => 1,
        }
    }

    pub fn from_code(code: i32) -> Self {
        match code {
            0 => DepthMode::Auto,
            _ => DepthMode::Depth,
        }
    }
}

/// Where the shaft route begins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StartPosition {
    /// Raster from the far row's first column.
    #[default]
    TopLeft,
    /// Spiral outward from the center cell.
    Center,
}

impl StartPosition {
    pub fn code(self) -> i32 {
        match self {
            StartPosition::TopLeft => 0,
            StartPosition::Center => 1,
        }
    }

    pub fn from_code(code: i32) -> Self {
        match code {
            1 => StartPosition::Center,
            _ => StartPosition::TopLeft,
        }
    }
}

/// Condition releasing the vehicle from a connector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReleaseCondition {
    /// Wait for an explicit `undock` command.
    #[default]
    UndockCommand,
    ShipIsFull,
    ShipIsEmpty,
}

impl ReleaseCondition {
    pub fn code(self) -> i32 {
        match self {
            ReleaseCondition::UndockCommand => 0,
            ReleaseCondition::ShipIsFull => 1,
            ReleaseCondition::ShipIsEmpty => 2,
        }
    }

    pub fn from_code(code: i32) -> Self {
        match code {
            1 => ReleaseCondition::ShipIsFull,
            2 => ReleaseCondition::ShipIsEmpty,
            _ => ReleaseCondition::UndockCommand,
        }
    }
}

/// Persisted stage of the mining state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MiningStage {
    #[default]
    None,
    TransitionToWork,
    TransitionToWorkLocation,
    TransitionToShaftStart,
    DigShaft,
    TransitionToHome,
    ThrowGarbage,
    Done,
}

impl MiningStage {
    pub fn code(self) -> i32 {
        match self {
            MiningStage::None => 0,
            MiningStage::TransitionToWork => 1,
            MiningStage::TransitionToWorkLocation => 2,
            MiningStage::TransitionToShaftStart => 3,
            MiningStage::DigShaft => 4,
            MiningStage::TransitionToHome => 5,
            MiningStage::ThrowGarbage => 6,
            MiningStage::Done => 7,
        }
    }

    pub fn from_code(code: i32) -> Self {
        match code {
            1 => MiningStage::TransitionToWork,
            2 => MiningStage::TransitionToWorkLocation,
            3 => MiningStage::TransitionToShaftStart,
            4 => MiningStage::DigShaft,
            5 => MiningStage::TransitionToHome,
            6 => MiningStage::ThrowGarbage,
            7 => MiningStage::Done,
            _ => MiningStage::None,
        }
    }
}

/// Persisted stage of the home/work transit machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransitStage {
    #[default]
    None,
    TransitionToHome,
    AtHome,
    TransitionToWork,
    AtWork,
}

impl TransitStage {
    pub fn code(self) -> i32 {
        match self {
            TransitStage::None => 0,
            TransitStage::TransitionToHome => 1,
            TransitStage::AtHome => 2,
            TransitStage::TransitionToWork => 3,
            TransitStage::AtWork => 4,
        }
    }

    pub fn from_code(code: i32) -> Self {
        match code {
            1 => TransitStage::TransitionToHome,
            2 => TransitStage::AtHome,
            3 => TransitStage::TransitionToWork,
            4 => TransitStage::AtWork,
            _ => TransitStage::None,
        }
    }
}

/// One end of the recorded path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    Home,
    Work,
}

impl Endpoint {
    pub fn name(self) -> &'static str {
        match self {
            Endpoint::Home => "Home",
            Endpoint::Work => "Work",
        }
    }
}

/// A named timer block fired on a dock/undock event. `timer: None`
/// disables the binding (persisted as the sentinel name `None`).
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TimerBinding {
    pub timer: Option<String>,
    pub trigger: TimerTrigger,
}

/// The persisted configuration and progress record for the current job.
#[derive(Debug, Clone, PartialEq)]
pub struct JobDefinition {
    /// Storage section this job persists under.
    pub name: String,
    pub paused: bool,
    /// Recorded path, Home first, Work last.
    pub path: Vec<Waypoint>,
    /// Named reference grid the path is relative to, if any.
    pub relative_grid: Option<String>,
    pub kind: JobKind,
    /// Transit cruise speed, m/s.
    pub speed: f64,
    /// Speed while digging a shaft, m/s.
    pub work_speed: f64,
    /// Minimum altitude over terrain the host enforces, m.
    pub min_altitude: f64,
    /// Work volume (width, height, depth), m.
    pub dimensions: Vector3<f64>,
    pub depth_mode: DepthMode,
    pub start_position: StartPosition,
    pub work_location: Option<Waypoint>,
    pub mining_stage: MiningStage,
    /// Index of the current shaft in the generated route.
    pub mining_progress: usize,
    /// Last observed distance to the work origin, for resume safety.
    pub work_distance: f64,
    pub terrain_clear: bool,
    pub balance_drills: bool,
    pub transit_stage: TransitStage,
    pub leave_home: ReleaseCondition,
    pub leave_work: ReleaseCondition,
    pub timer_docking_home: TimerBinding,
    pub timer_leaving_home: TimerBinding,
    pub timer_docking_work: TimerBinding,
    pub timer_leaving_work: TimerBinding,
}

impl JobDefinition {
    /// Default job persisting under `name`.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            paused: true,
            path: Vec::new(),
            relative_grid: None,
            kind: JobKind::None,
            speed: 30.0,
            work_speed: 2.0,
            min_altitude: 10.0,
            dimensions: Vector3::zeros(),
            depth_mode: DepthMode::Depth,
            start_position: StartPosition::TopLeft,
            work_location: None,
            mining_stage: MiningStage::None,
            mining_progress: 0,
            work_distance: 0.0,
            terrain_clear: false,
            balance_drills: true,
            transit_stage: TransitStage::None,
            leave_home: ReleaseCondition::UndockCommand,
            leave_work: ReleaseCondition::UndockCommand,
            timer_docking_home: TimerBinding::default(),
            timer_leaving_home: TimerBinding::default(),
            timer_docking_work: TimerBinding::default(),
            timer_leaving_work: TimerBinding::default(),
        }
    }

    /// Decode from the host's storage blob. Never fails: unreadable fields
    /// keep their defaults.
    pub fn decode(name: impl Into<String>, blob: &str) -> Self {
        let name = name.into();
        let store = SettingsStore::parse(blob);
        let mut job = JobDefinition::new(name);
        job.load(&store);
        job
    }

    /// Encode to the host's storage blob.
    pub fn encode(&self) -> String {
        let mut store = SettingsStore::new();
        self.save(&mut store);
        store.encode()
    }

    pub fn has_path(&self) -> bool {
        !self.path.is_empty()
    }

    /// Where the shuttle is headed, derived from the persisted transit
    /// stage: a vehicle at (or en route to) Home is headed for Work and
    /// vice versa. Keeping this derived means a completed leg flips the
    /// destination with no extra persisted field.
    pub fn current_destination(&self) -> Endpoint {
        match self.transit_stage {
            TransitStage::AtWork | TransitStage::TransitionToHome => Endpoint::Home,
            _ => Endpoint::Work,
        }
    }

    /// Restore every field to its default (the path and work location
    /// included).
    pub fn reset(&mut self) {
        *self = JobDefinition::new(std::mem::take(&mut self.name));
    }

    fn load(&mut self, store: &SettingsStore) {
        let s = self.name.clone();
        let s = s.as_str();

        self.paused = store.get_or(s, "Paused", true);
        self.path = Waypoint::decode_path(&store.get_string(s, "Path", ""));
        self.relative_grid = optional_name(store.get_string(s, "RelativeGrid", "None"));
        self.kind = JobKind::from_code(store.get_or(s, "Type", JobKind::None.code()));
        self.speed = store.get_or(s, "Speed", 30.0);
        self.work_speed = store.get_or(s, "WorkSpeed", 2.0);
        self.min_altitude = store.get_or(s, "MinAltitude", 10.0);
        self.dimensions = decode_vector(&store.get_string(s, "Dimensions", ""));
        self.depth_mode = DepthMode::from_code(store.get_or(s, "DepthMode", DepthMode::Depth.code()));
        self.start_position =
            StartPosition::from_code(store.get_or(s, "StartPosition", StartPosition::TopLeft.code()));
        self.work_location = Waypoint::decode(&store.get_string(s, "WorkLocation", ""));
        self.mining_stage =
            MiningStage::from_code(store.get_or(s, "MiningJobStage", MiningStage::None.code()));
        self.mining_progress = store.get_or(s, "MiningJobProgress", 0usize);
        self.work_distance = store.get_or(s, "WorkDistance", 0.0);
        self.terrain_clear = store.get_or(s, "TerrainClear", false);
        self.balance_drills = store.get_or(s, "BalanceDrills", true);
        self.transit_stage =
            TransitStage::from_code(store.get_or(s, "ShuttleStage", TransitStage::None.code()));
        self.leave_home =
            ReleaseCondition::from_code(store.get_or(s, "LeaveHome", ReleaseCondition::UndockCommand.code()));
        self.leave_work =
            ReleaseCondition::from_code(store.get_or(s, "LeaveWork", ReleaseCondition::UndockCommand.code()));
        self.timer_docking_home = load_timer(store, s, "TimerDockingHome");
        self.timer_leaving_home = load_timer(store, s, "TimerLeavingHome");
        self.timer_docking_work = load_timer(store, s, "TimerDockingWork");
        self.timer_leaving_work = load_timer(store, s, "TimerLeavingWork");
    }

    fn save(&self, store: &mut SettingsStore) {
        let s = self.name.as_str();

        store.set(s, "Paused", self.paused);
        store.set(s, "Path", Waypoint::encode_path(&self.path));
        store.set(
            s,
            "RelativeGrid",
            self.relative_grid.as_deref().unwrap_or("None"),
        );
        store.set(s, "Type", self.kind.code());
        store.set(s, "Speed", self.speed);
        store.set(s, "WorkSpeed", self.work_speed);
        store.set(s, "MinAltitude", self.min_altitude);
        store.set(s, "Dimensions", encode_vector(self.dimensions));
        store.set(s, "DepthMode", self.depth_mode.code());
        store.set(s, "StartPosition", self.start_position.code());
        store.set(
            s,
            "WorkLocation",
            self.work_location
                .as_ref()
                .map(Waypoint::encode)
                .unwrap_or_default(),
        );
        store.set(s, "MiningJobStage", self.mining_stage.code());
        store.set(s, "MiningJobProgress", self.mining_progress);
        store.set(s, "WorkDistance", self.work_distance);
        store.set(s, "TerrainClear", self.terrain_clear);
        store.set(s, "BalanceDrills", self.balance_drills);
        store.set(s, "ShuttleStage", self.transit_stage.code());
        store.set(s, "LeaveHome", self.leave_home.code());
        store.set(s, "LeaveWork", self.leave_work.code());
        save_timer(store, s, "TimerDockingHome", &self.timer_docking_home);
        save_timer(store, s, "TimerLeavingHome", &self.timer_leaving_home);
        save_timer(store, s, "TimerDockingWork", &self.timer_docking_work);
        save_timer(store, s, "TimerLeavingWork", &self.timer_leaving_work);
    }
}

fn optional_name(value: String) -> Option<String> {
    if value.is_empty() || value == "None" {
        None
    } else {
        Some(value)
    }
}

fn load_timer(store: &SettingsStore, section: &str, key: &str) -> TimerBinding {
    let trigger = match store.get_or(section, &format!("{}Action", key), 0) {
        1 => TimerTrigger::Countdown,
        _ => TimerTrigger::Now,
    };
    TimerBinding {
        timer: optional_name(store.get_string(section, key, "None")),
        trigger,
    }
}

fn save_timer(store: &mut SettingsStore, section: &str, key: &str, binding: &TimerBinding) {
    store.set(section, key, binding.timer.as_deref().unwrap_or("None"));
    let code = match binding.trigger {
        TimerTrigger::Now => 0,
        TimerTrigger::Countdown => 1,
    };
    store.set(section, &format!("{}Action", key), code);
}

fn encode_vector(v: Vector3<f64>) -> String {
    format!("{} {} {}", v.x, v.y, v.z)
}

fn decode_vector(text: &str) -> Vector3<f64> {
    let mut parts = text.split_whitespace().map(str::parse::<f64>);
    match (parts.next(), parts.next(), parts.next()) {
        (Some(Ok(x)), Some(Ok(y)), Some(Ok(z))) => Vector3::new(x, y, z),
        _ => Vector3::zeros(),
    }
}
