//! Suspendable execution of statement sequences and loops.
//!
//! Adds the `impl Engine` frame runner. Execution state is an explicit stack
//! of [`Frame`]s rather than the Rust call stack, so a run can stop at any
//! suspension point (`delay`, a loop yield) and resume later from exactly the
//! same place. Stopping the run is simply dropping the frames.
//!
//! Yield policy: `loop()` yields [`LOOP_YIELD`] after every pass, a `for` loop
//! yields after every iteration and a `while` loop every
//! [`WHILE_YIELD_EVERY`] iterations. Every unbounded path through a sketch
//! therefore reaches a suspension point.

use crate::interpreter::constants::{BODY_YIELD, LOOP_YIELD, WHILE_YIELD_EVERY};
use crate::interpreter::engine::{Engine, Phase};
use crate::interpreter::errors::RuntimeError;
use crate::interpreter::statements::Flow;
use crate::parser::ast::{Block, ForLoop, WhileLoop};
use std::rc::Rc;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ForPhase {
    /// Evaluate the condition next
    Check,
    /// The body just finished; run the step clause next
    AfterBody,
}

/// One level of suspended execution
#[derive(Debug, Clone)]
pub(crate) enum Frame {
    Sequence { body: Block, pc: usize },
    For { lp: Rc<ForLoop>, phase: ForPhase },
    While { lp: Rc<WhileLoop>, iterations: u64 },
    /// Marks a user function call; its local scope ends when this is reached
    Call,
}

impl Frame {
    pub(crate) fn sequence(body: &Block) -> Self {
        Frame::Sequence {
            body: Rc::clone(body),
            pc: 0,
        }
    }
}

impl Engine {
    /// Execute frames until the sketch suspends. Returns how long to pause.
    pub(crate) fn run_frames(&mut self) -> Result<Duration, RuntimeError> {
        loop {
            let Some(frame) = self.frames.pop() else {
                // Top level finished: setup hands over to loop, loop repeats
                self.frames.push(Frame::sequence(&self.state.loop_body));
                match self.phase {
                    Phase::Setup => {
                        self.phase = Phase::Loop;
                        continue;
                    }
                    Phase::Loop => return Ok(LOOP_YIELD),
                }
            };

            match frame {
                Frame::Sequence { body, pc } => {
                    let Some(stmt) = body.get(pc) else { continue };
                    self.frames.push(Frame::Sequence {
                        body: Rc::clone(&body),
                        pc: pc + 1,
                    });
                    self.current_location = stmt.location;
                    if let Flow::Suspend(pause) = self.execute_statement(stmt)? {
                        return Ok(pause);
                    }
                }
                Frame::For {
                    lp,
                    phase: ForPhase::AfterBody,
                } => {
                    self.frames.push(Frame::For {
                        lp: Rc::clone(&lp),
                        phase: ForPhase::Check,
                    });
                    if let Some(step) = &lp.step {
                        if let Flow::Suspend(pause) = self.execute_statement(step)? {
                            return Ok(pause);
                        }
                    }
                    return Ok(BODY_YIELD);
                }
                Frame::For {
                    lp,
                    phase: ForPhase::Check,
                } => {
                    if self.evaluate_condition(&lp.cond) {
                        let body = Frame::sequence(&lp.body);
                        self.frames.push(Frame::For {
                            lp,
                            phase: ForPhase::AfterBody,
                        });
                        self.frames.push(body);
                    }
                }
                Frame::While { lp, iterations } => {
                    if self.evaluate_condition(&lp.cond) {
                        let iterations = iterations + 1;
                        let body = Frame::sequence(&lp.body);
                        self.frames.push(Frame::While { lp, iterations });
                        self.frames.push(body);
                        if iterations % WHILE_YIELD_EVERY == 0 {
                            return Ok(BODY_YIELD);
                        }
                    }
                }
                Frame::Call => self.state.scopes.exit_call(),
            }
        }
    }
}
