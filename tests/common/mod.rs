//! Shared test doubles: a recording machine the pipeline runs against.

use std::cell::RefCell;
use std::rc::Rc;

use pnp_mcodes::config::ExtensionConfig;
use pnp_mcodes::gcode::MAX_AXES;
use pnp_mcodes::hal::{
    CommandStream, IoPorts, MotionPlanner, PortDirection, PortKind, SettingsStore, SystemContext,
    WaitMode,
};
use pnp_mcodes::{Dispatcher, OpenPnpCodes};

/// Everything the machine observed, in call order.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    DigitalWrite(u8, bool),
    AnalogRead(u8, WaitMode),
    Synchronize,
    AccelOverride(usize, f64),
    JerkOverride(usize, f64),
}

#[derive(Default)]
pub struct MachineLog {
    pub events: Vec<Event>,
    pub output: String,
}

impl MachineLog {
    pub fn accel_overrides(&self) -> Vec<(usize, f64)> {
        self.events
            .iter()
            .filter_map(|e| match e {
                Event::AccelOverride(axis, value) => Some((*axis, *value)),
                _ => None,
            })
            .collect()
    }

    pub fn jerk_overrides(&self) -> Vec<(usize, f64)> {
        self.events
            .iter()
            .filter_map(|e| match e {
                Event::JerkOverride(axis, value) => Some((*axis, *value)),
                _ => None,
            })
            .collect()
    }
}

pub struct MockIo {
    log: Rc<RefCell<MachineLog>>,
    pub analog: [f64; MAX_AXES],
    pub digital_outs: u8,
    pub analog_ins: u8,
}

impl IoPorts for MockIo {
    fn digital_out(&mut self, port: u8, on: bool) {
        self.log
            .borrow_mut()
            .events
            .push(Event::DigitalWrite(port, on));
    }

    fn analog_in(&mut self, port: u8, mode: WaitMode) -> f64 {
        self.log
            .borrow_mut()
            .events
            .push(Event::AnalogRead(port, mode));
        self.analog[port as usize % MAX_AXES]
    }

    fn unclaimed(&self, kind: PortKind, direction: PortDirection) -> u8 {
        match (kind, direction) {
            (PortKind::Digital, PortDirection::Output) => self.digital_outs,
            (PortKind::Analog, PortDirection::Input) => self.analog_ins,
            _ => 0,
        }
    }
}

pub struct MockMotion {
    log: Rc<RefCell<MachineLog>>,
    pub steps: [i64; MAX_AXES],
    pub steps_per_mm: f64,
    pub commanded: [f64; MAX_AXES],
    pub offsets: [f64; MAX_AXES],
}

impl MotionPlanner for MockMotion {
    fn synchronize(&mut self) {
        self.log.borrow_mut().events.push(Event::Synchronize);
    }

    fn step_position(&self) -> [i64; MAX_AXES] {
        self.steps
    }

    fn steps_to_machine(&self, steps: &[i64; MAX_AXES]) -> [f64; MAX_AXES] {
        let mut position = [0.0; MAX_AXES];
        for (out, steps) in position.iter_mut().zip(steps) {
            *out = *steps as f64 / self.steps_per_mm;
        }
        position
    }

    fn commanded_position(&self) -> [f64; MAX_AXES] {
        self.commanded
    }

    fn work_offset(&self, axis: usize) -> f64 {
        self.offsets[axis]
    }
}

pub struct MockSettings {
    log: Rc<RefCell<MachineLog>>,
}

impl SettingsStore for MockSettings {
    fn override_acceleration(&mut self, axis: usize, value: f64) {
        self.log
            .borrow_mut()
            .events
            .push(Event::AccelOverride(axis, value));
    }

    fn override_jerk(&mut self, axis: usize, value: f64) {
        self.log
            .borrow_mut()
            .events
            .push(Event::JerkOverride(axis, value));
    }
}

pub struct MockStream {
    log: Rc<RefCell<MachineLog>>,
}

impl CommandStream for MockStream {
    fn write(&mut self, text: &str) {
        self.log.borrow_mut().output.push_str(text);
    }
}

/// A machine with 3 axes, 4 digital outputs, 2 analog inputs reading 10.0,
/// commanded position (10, 5, 0) and zero work offsets.
pub fn machine() -> (Rc<RefCell<MachineLog>>, SystemContext) {
    machine_with(3, 4, 2)
}

pub fn machine_with(
    n_axis: usize,
    digital_outs: u8,
    analog_ins: u8,
) -> (Rc<RefCell<MachineLog>>, SystemContext) {
    machine_full(n_axis, digital_outs, analog_ins, [0.0; MAX_AXES])
}

pub fn machine_full(
    n_axis: usize,
    digital_outs: u8,
    analog_ins: u8,
    offsets: [f64; MAX_AXES],
) -> (Rc<RefCell<MachineLog>>, SystemContext) {
    let log = Rc::new(RefCell::new(MachineLog::default()));

    let io = MockIo {
        log: log.clone(),
        analog: [10.0; MAX_AXES],
        digital_outs,
        analog_ins,
    };
    let motion = MockMotion {
        log: log.clone(),
        steps: [800, 400, 0, 0, 0, 0, 0, 0],
        steps_per_mm: 80.0,
        commanded: [10.0, 5.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0],
        offsets,
    };
    let settings = MockSettings { log: log.clone() };
    let stream = MockStream { log: log.clone() };

    let ctx = SystemContext::new(
        Box::new(io),
        Box::new(motion),
        Box::new(settings),
        Box::new(stream),
        n_axis,
    );
    (log, ctx)
}

/// A dispatcher with the extension installed and activated against `ctx`.
pub fn installed(config: ExtensionConfig, ctx: &SystemContext) -> Dispatcher {
    let mut dispatcher = Dispatcher::new(config.unhandled);
    dispatcher.install(|next| Box::new(OpenPnpCodes::new(next, config)));
    dispatcher.activate(ctx);
    dispatcher
}
