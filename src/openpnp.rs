//! The pick-and-place vendor M-code extension.
//!
//! Implements the recognize/validate/execute stages for the fixed command
//! set an OpenPNP-style host drives the machine with: pin I/O, analog
//! reads with optional scaling, position and firmware reports, acceleration
//! and jerk overrides, motion-buffer drain, and settings reset. Anything it
//! does not recognize is forwarded to whatever handler was installed before
//! it.

use crate::chain::{Claim, McodeHandler};
use crate::config::ExtensionConfig;
use crate::gcode::{Mcode, ParsedBlock, RunState, Status, Word, MAX_AXES};
use crate::hal::{PortDirection, PortKind, SystemContext, WaitMode};
use crate::report;

/// Capacity of the analog scaling table, independent of how many analog
/// inputs the hardware actually exposes.
pub const MAX_ADC_PORTS: usize = 8;

/// Per-input scaling applied to analog readings.
#[derive(Debug, Clone, Copy, PartialEq)]
struct AdcScaling {
    factor: f64,
    offset: f64,
}

impl Default for AdcScaling {
    fn default() -> Self {
        AdcScaling {
            factor: 1.0,
            offset: 0.0,
        }
    }
}

impl AdcScaling {
    fn apply(&self, raw: f64) -> f64 {
        (raw + self.offset) * self.factor
    }
}

/// The extension: one link in the dispatch chain plus its private state.
pub struct OpenPnpCodes {
    config: ExtensionConfig,
    scaling: [AdcScaling; MAX_ADC_PORTS],
    /// Claimable digital outputs, cached at activation.
    digital_outs: u8,
    /// Claimable analog inputs, cached at activation and clamped to the
    /// scaling-table capacity.
    analog_ins: u8,
    next: Box<dyn McodeHandler>,
}

impl OpenPnpCodes {
    /// Wire the extension in front of the previously installed handler.
    ///
    /// Capability counts stay at zero until [`McodeHandler::activate`] runs;
    /// port-addressed commands are rejected as out of range until then.
    pub fn new(next: Box<dyn McodeHandler>, config: ExtensionConfig) -> Self {
        OpenPnpCodes {
            config,
            scaling: [AdcScaling::default(); MAX_ADC_PORTS],
            digital_outs: 0,
            analog_ins: 0,
            next,
        }
    }

    fn claims(&self, mcode: Mcode) -> bool {
        matches!(
            mcode,
            Mcode::SET_PIN_STATE
                | Mcode::GET_ADC_RAW
                | Mcode::GET_ADC_SCALED
                | Mcode::SET_ADC_SCALING
                | Mcode::GET_POSITION
                | Mcode::FIRMWARE_INFO
                | Mcode::SET_ACCELERATION
                | Mcode::FINISH_MOVES
                | Mcode::SETTINGS_RESET
        ) || (self.config.jerk_override && mcode == Mcode::SET_JERK)
    }

    fn validate_pin_state(&self, block: &mut ParsedBlock) -> Status {
        // Malformed numbers win over missing words.
        if (block.words.contains(Word::P) && block.values.p.is_nan())
            || (block.words.contains(Word::S) && block.values.s.is_nan())
        {
            return Status::BadNumberFormat;
        }
        if !(block.words.contains(Word::P) && block.words.contains(Word::S)) {
            return Status::ValueWordMissing;
        }
        let p = block.values.p;
        if p >= 0.0 && p <= 255.0 && (p as u8) < self.digital_outs {
            block.consume(Word::P);
            block.consume(Word::S);
            Status::Ok
        } else {
            Status::InvalidStatement
        }
    }

    fn validate_adc_port(&self, block: &mut ParsedBlock) -> Status {
        if block.words.contains(Word::P) && block.values.p.is_nan() {
            return Status::BadNumberFormat;
        }
        if !block.words.contains(Word::P) {
            return Status::ValueWordMissing;
        }
        let p = block.values.p;
        if p >= 0.0 && p < self.analog_ins as f64 {
            block.consume(Word::P);
            Status::Ok
        } else {
            Status::InvalidStatement
        }
    }

    fn validate_adc_scaling(&self, block: &mut ParsedBlock) -> Status {
        if (block.words.contains(Word::P) && block.values.p.is_nan())
            || (block.words.contains(Word::Q) && block.values.q.is_nan())
            || (block.words.contains(Word::S) && block.values.s.is_nan())
        {
            return Status::BadNumberFormat;
        }
        if !(block.words.contains(Word::P)
            && block.words.contains(Word::Q)
            && block.words.contains(Word::S))
        {
            return Status::ValueWordMissing;
        }
        let p = block.values.p;
        if p >= 0.0 && p < self.analog_ins as f64 {
            block.consume(Word::P);
            block.consume(Word::Q);
            block.consume(Word::S);
            Status::Ok
        } else {
            Status::InvalidStatement
        }
    }

    fn validate_acceleration(&self, block: &mut ParsedBlock) -> Status {
        if (block.words.contains(Word::P) && block.values.p.is_nan())
            || (block.words.contains(Word::R) && block.values.r.is_nan())
            || (block.words.contains(Word::S) && block.values.s.is_nan())
        {
            return Status::BadNumberFormat;
        }
        block.consume(Word::P);
        block.consume(Word::R);
        block.consume(Word::S);
        block.consume(Word::T);
        // Range checking of the override values is a known gap; report it
        // as such instead of claiming full validation.
        Status::Unvalidated
    }

    fn validate_jerk(&self, ctx: &SystemContext, block: &mut ParsedBlock) -> Status {
        let mut matched = false;
        for idx in 0..ctx.n_axis {
            let word = match Word::for_axis(idx) {
                Some(word) => word,
                None => break,
            };
            if !block.words.contains(word) {
                continue;
            }
            if block.values.axis[idx].is_nan() {
                return Status::BadNumberFormat;
            }
            block.consume(word);
            matched = true;
        }
        if matched {
            Status::Ok
        } else {
            Status::ValueWordMissing
        }
    }

    fn execute_acceleration(&self, ctx: &mut SystemContext, block: &ParsedBlock) {
        ctx.motion.synchronize();
        let mut idx = ctx.n_axis;
        while idx > 0 {
            idx -= 1;
            let value = if block.consumed.contains(Word::S) {
                block.values.s
            } else if idx < 2 {
                block.values.t
            } else {
                block.values.p
            };
            // An absent word reads as the reset sentinel.
            let value = if value.is_nan() { 0.0 } else { value };
            ctx.settings.override_acceleration(idx, value);
        }
    }

    fn execute_jerk(&self, ctx: &mut SystemContext, block: &ParsedBlock) {
        ctx.motion.synchronize();
        let mut idx = ctx.n_axis;
        while idx > 0 {
            idx -= 1;
            if let Some(word) = Word::for_axis(idx) {
                if block.consumed.contains(word) {
                    ctx.settings.override_jerk(idx, block.values.axis[idx]);
                }
            }
        }
    }

    fn execute_settings_reset(&self, ctx: &mut SystemContext) {
        ctx.motion.synchronize();
        let mut idx = ctx.n_axis;
        while idx > 0 {
            idx -= 1;
            ctx.settings.override_acceleration(idx, 0.0);
        }
    }

    fn report_position(&self, ctx: &mut SystemContext, machine: bool, detailed: bool) {
        let n = ctx.n_axis;
        let steps = ctx.motion.step_position();

        let mut print: [f64; MAX_AXES] = if machine {
            ctx.motion.steps_to_machine(&steps)
        } else {
            ctx.motion.commanded_position()
        };
        for (idx, value) in print.iter_mut().enumerate().take(n) {
            *value -= ctx.motion.work_offset(idx);
        }

        ctx.stream.write(&report::position_line(&print[..n]));
        if detailed {
            ctx.stream.write(&report::count_line(&steps[..n]));
        }
    }

    fn report_adc(&self, ctx: &mut SystemContext, port: u8, scaled: bool) {
        let raw = ctx.io.analog_in(port, WaitMode::Immediate);
        let value = if scaled {
            self.scaling[port as usize].apply(raw)
        } else {
            raw
        };
        ctx.stream.write(&report::adc_line(port, value));
    }
}

impl McodeHandler for OpenPnpCodes {
    fn activate(&mut self, ctx: &SystemContext) {
        self.digital_outs = ctx.io.unclaimed(PortKind::Digital, PortDirection::Output);
        self.analog_ins = ctx
            .io
            .unclaimed(PortKind::Analog, PortDirection::Input)
            .min(MAX_ADC_PORTS as u8);
        log::info!(
            "pnp m-codes active: {} digital outputs, {} analog inputs",
            self.digital_outs,
            self.analog_ins
        );
        self.next.activate(ctx);
    }

    fn check(&self, mcode: Mcode) -> Claim {
        if self.claims(mcode) {
            Claim::Claimed
        } else {
            self.next.check(mcode)
        }
    }

    fn validate(&self, ctx: &mut SystemContext, block: &mut ParsedBlock) -> Status {
        let status = match block.mcode {
            Mcode::SET_PIN_STATE => self.validate_pin_state(block),
            Mcode::GET_ADC_RAW | Mcode::GET_ADC_SCALED => self.validate_adc_port(block),
            Mcode::SET_ADC_SCALING => self.validate_adc_scaling(block),
            Mcode::GET_POSITION => {
                block.consume(Word::R);
                block.consume(Word::D);
                Status::Ok
            }
            Mcode::SET_ACCELERATION => self.validate_acceleration(block),
            Mcode::SET_JERK if self.config.jerk_override => self.validate_jerk(ctx, block),
            Mcode::FIRMWARE_INFO | Mcode::FINISH_MOVES | Mcode::SETTINGS_RESET => Status::Ok,
            _ => Status::Unhandled,
        };

        if status == Status::Unhandled {
            self.next.validate(ctx, block)
        } else {
            status
        }
    }

    fn execute(&mut self, ctx: &mut SystemContext, state: RunState, block: &ParsedBlock) -> bool {
        if state == RunState::CheckMode {
            // Dry run: no effects, but the command stays accounted for.
            return true;
        }

        let mut handled = true;
        match block.mcode {
            Mcode::SET_PIN_STATE => {
                ctx.io
                    .digital_out(block.values.p as u8, block.values.s != 0.0);
            }
            Mcode::GET_ADC_RAW => self.report_adc(ctx, block.values.p as u8, false),
            Mcode::GET_ADC_SCALED => self.report_adc(ctx, block.values.p as u8, true),
            Mcode::SET_ADC_SCALING => {
                self.scaling[block.values.p as usize] = AdcScaling {
                    factor: block.values.s,
                    offset: block.values.q,
                };
            }
            Mcode::GET_POSITION => {
                self.report_position(
                    ctx,
                    block.consumed.contains(Word::R),
                    block.consumed.contains(Word::D),
                );
            }
            Mcode::FIRMWARE_INFO => {
                let line = report::firmware_info_line(&self.config.firmware);
                ctx.stream.write(&line);
            }
            Mcode::SET_ACCELERATION => self.execute_acceleration(ctx, block),
            Mcode::SET_JERK if self.config.jerk_override => self.execute_jerk(ctx, block),
            Mcode::FINISH_MOVES => ctx.motion.synchronize(),
            Mcode::SETTINGS_RESET => self.execute_settings_reset(ctx),
            _ => handled = false,
        }

        if handled {
            true
        } else {
            log::debug!("{} not ours, forwarding to previous executor", block.mcode);
            self.next.execute(ctx, state, block)
        }
    }

    fn report_options(&self, ctx: &mut SystemContext, newopt: bool) {
        self.next.report_options(ctx, newopt);
        if !newopt {
            let line =
                report::plugin_ident_line(&self.config.plugin_name, &self.config.plugin_version);
            ctx.stream.write(&line);
        }
    }
}
