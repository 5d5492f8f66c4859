//! Handler chain and dispatch.
//!
//! Extensions share a single dispatch slot through a decorator chain: each
//! installed handler owns whatever handler was installed before it and
//! forwards anything it does not claim. Installation is capture-and-replace
//! on the chain head, so composition order is explicit and two extensions
//! loaded independently never need to know about each other.

use crate::config::UnhandledPolicy;
use crate::gcode::{Mcode, ParsedBlock, RunState, Status};
use crate::hal::SystemContext;

/// Recognizer verdict for a single identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Claim {
    /// This chain handles the command as a normal user M-code.
    Claimed,
    /// Nobody in the chain so far wants it.
    Deferred,
}

/// One link in the dispatch chain.
///
/// Implementations hold the previously installed handler and call into it
/// for anything they do not recognize, at every stage. A claimed identifier
/// must be either handled or forwarded with identical semantics - never
/// dropped.
pub trait McodeHandler {
    /// Second lifecycle phase, run once after system startup when hardware
    /// enumeration is final. Links refresh cached capability state here and
    /// must forward to their fallback so the whole chain activates.
    fn activate(&mut self, ctx: &SystemContext);

    /// Recognize: does anyone in this chain claim `mcode`? Pure, no side
    /// effects.
    fn check(&self, mcode: Mcode) -> Claim;

    /// Validate parameters, consuming accepted words from the block.
    fn validate(&self, ctx: &mut SystemContext, block: &mut ParsedBlock) -> Status;

    /// Perform the command's effect. Returns whether anyone in the chain
    /// handled it.
    fn execute(&mut self, ctx: &mut SystemContext, state: RunState, block: &ParsedBlock) -> bool;

    /// Option-report hook: earlier links report first, then this one
    /// appends its own identification.
    fn report_options(&self, ctx: &mut SystemContext, newopt: bool);
}

/// Terminal link installed at the bottom of every chain.
struct TailHandler;

impl McodeHandler for TailHandler {
    fn activate(&mut self, _ctx: &SystemContext) {}

    fn check(&self, _mcode: Mcode) -> Claim {
        Claim::Deferred
    }

    fn validate(&self, _ctx: &mut SystemContext, _block: &mut ParsedBlock) -> Status {
        Status::Unhandled
    }

    fn execute(&mut self, _ctx: &mut SystemContext, _state: RunState, block: &ParsedBlock) -> bool {
        log::debug!("{} reached end of handler chain unexecuted", block.mcode);
        false
    }

    fn report_options(&self, _ctx: &mut SystemContext, _newopt: bool) {}
}

/// Owns the chain head and runs the three-stage pipeline over it.
pub struct Dispatcher {
    head: Option<Box<dyn McodeHandler>>,
    unhandled: UnhandledPolicy,
}

impl Dispatcher {
    pub fn new(unhandled: UnhandledPolicy) -> Self {
        Dispatcher {
            head: Some(Box::new(TailHandler)),
            unhandled,
        }
    }

    /// Install a new handler at the front of the chain.
    ///
    /// The constructor receives the current head and must keep it as its
    /// fallback; the value it returns becomes the new head.
    pub fn install<F>(&mut self, build: F)
    where
        F: FnOnce(Box<dyn McodeHandler>) -> Box<dyn McodeHandler>,
    {
        let previous = self.head.take().unwrap_or_else(|| Box::new(TailHandler));
        self.head = Some(build(previous));
    }

    /// Activate every link in the chain. Call once, after the host knows
    /// dependent subsystems are ready.
    pub fn activate(&mut self, ctx: &SystemContext) {
        if let Some(head) = self.head.as_mut() {
            head.activate(ctx);
        }
    }

    /// Run recognize, validate, and execute for one block.
    ///
    /// Unrecognized identifiers return [`Status::Unhandled`] without touching
    /// the block. Validation failures abort before execution. A command that
    /// validates but falls off the end of the execute chain is resolved by
    /// the configured [`UnhandledPolicy`].
    pub fn dispatch(
        &mut self,
        ctx: &mut SystemContext,
        state: RunState,
        block: &mut ParsedBlock,
    ) -> Status {
        let head = match self.head.as_mut() {
            Some(head) => head,
            None => return Status::Unhandled,
        };

        if head.check(block.mcode) == Claim::Deferred {
            return Status::Unhandled;
        }

        let status = head.validate(ctx, block);
        if !status.passes() {
            return status;
        }

        if head.execute(ctx, state, block) {
            status
        } else {
            match self.unhandled {
                UnhandledPolicy::Ignore => {
                    log::warn!("{} validated but not executed, ignoring", block.mcode);
                    status
                }
                UnhandledPolicy::Surface => Status::Unhandled,
            }
        }
    }

    /// Forward the host's option-report notification through the chain.
    pub fn report_options(&self, ctx: &mut SystemContext, newopt: bool) {
        if let Some(head) = self.head.as_ref() {
            head.report_options(ctx, newopt);
        }
    }
}
