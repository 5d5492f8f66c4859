//! Collaborator interfaces the pipeline calls into.
//!
//! The extension never touches hardware directly: port I/O, motion
//! synchronization, settings overrides, and the output stream are all owned
//! by the host firmware and reached through these traits. `SystemContext`
//! bundles them so every pipeline call receives its collaborators explicitly
//! instead of reaching for globals.

use crate::gcode::MAX_AXES;

/// How an analog read should wait for a conversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitMode {
    /// Return the latest value without blocking.
    Immediate,
    /// Block until a fresh conversion completes.
    Blocking,
}

/// Port signal kind, for capability queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PortKind {
    Digital,
    Analog,
}

/// Port direction, for capability queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PortDirection {
    Input,
    Output,
}

/// The I/O-port subsystem: owns physical port enumeration and transfer.
pub trait IoPorts {
    /// Drive digital output `port` high (`true`) or low (`false`).
    fn digital_out(&mut self, port: u8, on: bool);

    /// Read analog input `port`. `Immediate` must not block.
    fn analog_in(&mut self, port: u8, mode: WaitMode) -> f64;

    /// Number of ports of the given kind/direction not yet claimed by
    /// another extension.
    fn unclaimed(&self, kind: PortKind, direction: PortDirection) -> u8;
}

/// The motion planner/stepper subsystem.
pub trait MotionPlanner {
    /// Block until every queued move has physically completed.
    fn synchronize(&mut self);

    /// Current machine position in step counts, per axis.
    fn step_position(&self) -> [i64; MAX_AXES];

    /// Convert step counts to machine position in mm.
    fn steps_to_machine(&self, steps: &[i64; MAX_AXES]) -> [f64; MAX_AXES];

    /// The interpreter's last commanded position in mm.
    fn commanded_position(&self) -> [f64; MAX_AXES];

    /// Active work-coordinate offset for `axis`, in mm.
    fn work_offset(&self, axis: usize) -> f64;
}

/// The settings store owning per-axis overrides.
///
/// An override value of 0.0 means "revert to the configured default".
pub trait SettingsStore {
    fn override_acceleration(&mut self, axis: usize, value: f64);
    fn override_jerk(&mut self, axis: usize, value: f64);
}

/// The host's output stream.
pub trait CommandStream {
    fn write(&mut self, text: &str);
}

/// Everything a pipeline stage may need, threaded through each call.
pub struct SystemContext {
    pub io: Box<dyn IoPorts>,
    pub motion: Box<dyn MotionPlanner>,
    pub settings: Box<dyn SettingsStore>,
    pub stream: Box<dyn CommandStream>,
    /// Number of axes the machine actually drives, at most [`MAX_AXES`].
    pub n_axis: usize,
}

impl SystemContext {
    pub fn new(
        io: Box<dyn IoPorts>,
        motion: Box<dyn MotionPlanner>,
        settings: Box<dyn SettingsStore>,
        stream: Box<dyn CommandStream>,
        n_axis: usize,
    ) -> Self {
        SystemContext {
            io,
            motion,
            settings,
            stream,
            n_axis: n_axis.min(MAX_AXES),
        }
    }
}
