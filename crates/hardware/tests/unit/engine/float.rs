//! Floating-point instructions: arithmetic, compare, conversions, and
//! the exception dispatch they can trigger.

use pretty_assertions::assert_eq;

use mxsim_core::common::{signal, StopResult};
use mxsim_core::core::{fpsw, psw};

use crate::common::{Asm, Op, TestContext, CODE_BASE};

const SNAN: u32 = 0x7F80_0001;
const QNAN: u32 = 0x7FC0_0000;

#[test]
fn fadd_adds_register_operands() {
    let mut asm = Asm::new();
    asm.fadd(Op::r(1), Op::r(2));
    let mut t = TestContext::new().load(&asm);
    t.set_reg(1, 1.5f32.to_bits());
    t.set_reg(2, 2.25f32.to_bits());
    t.step_ok();
    assert_eq!(t.reg(1), 3.75f32.to_bits());
    assert!(!t.flag(psw::S));
    assert!(!t.flag(psw::Z));
}

#[test]
fn fsub_to_zero_sets_z() {
    let mut asm = Asm::new();
    asm.fsub(Op::r(1), Op::r(2));
    let mut t = TestContext::new().load(&asm);
    t.set_reg(1, 1.0f32.to_bits());
    t.set_reg(2, 1.0f32.to_bits());
    t.step_ok();
    assert!(t.flag(psw::Z));
}

#[test]
fn negative_result_sets_s() {
    let mut asm = Asm::new();
    asm.fmul(Op::r(1), Op::r(2));
    let mut t = TestContext::new().load(&asm);
    t.set_reg(1, 2.0f32.to_bits());
    t.set_reg(2, (-3.0f32).to_bits());
    t.step_ok();
    assert_eq!(t.reg(1), (-6.0f32).to_bits());
    assert!(t.flag(psw::S));
}

#[test]
fn fcmp_maps_the_three_outcomes_onto_flags() {
    let mut asm = Asm::new();
    asm.fcmp(Op::r(1), Op::r(1)); // equal
    asm.fcmp(Op::r(1), Op::r(2)); // less
    asm.fcmp(Op::r(1), Op::r(3)); // unordered
    let mut t = TestContext::new().load(&asm);
    t.set_reg(1, 1.0f32.to_bits());
    t.set_reg(2, 2.0f32.to_bits());
    t.set_reg(3, QNAN);
    t.step_ok();
    assert!(t.flag(psw::Z));
    assert!(!t.flag(psw::S));
    assert!(!t.flag(psw::O));
    t.step_ok();
    assert!(t.flag(psw::S));
    assert!(!t.flag(psw::Z));
    t.step_ok();
    assert!(t.flag(psw::O));
    assert!(!t.flag(psw::Z));
    assert!(!t.flag(psw::S));
}

#[test]
fn ftoi_truncates_toward_zero() {
    let mut asm = Asm::new();
    asm.ftoi(Op::r(2), Op::r(1));
    let mut t = TestContext::new().load(&asm);
    t.set_reg(1, (-1.75f32).to_bits());
    t.step_ok();
    assert_eq!(t.reg(2) as i32, -1);
    assert!(t.flag(psw::S));
}

#[test]
fn round_honors_the_rounding_mode_field() {
    let mut asm = Asm::new();
    asm.round(Op::r(2), Op::r(1));
    asm.round(Op::r(3), Op::r(1));
    let mut t = TestContext::new().load(&asm);
    t.set_reg(1, (-1.75f32).to_bits());
    t.step_ok(); // nearest
    assert_eq!(t.reg(2) as i32, -2);
    t.cpu_mut().regs.fpsw = 1; // truncate
    t.step_ok();
    assert_eq!(t.reg(3) as i32, -1);
}

#[test]
fn itof_converts_and_flags_the_source_sign() {
    let mut asm = Asm::new();
    asm.itof(Op::r(2), Op::r(1));
    let mut t = TestContext::new().load(&asm);
    t.set_reg(1, (-2i32) as u32);
    t.step_ok();
    assert_eq!(t.reg(2), (-2.0f32).to_bits());
    assert!(t.flag(psw::S), "flags describe the integer source");
}

#[test]
fn masked_invalid_operation_yields_the_canonical_nan() {
    let mut asm = Asm::new();
    asm.fadd(Op::r(1), Op::r(2));
    let mut t = TestContext::new().load(&asm);
    t.set_reg(1, 1.0f32.to_bits());
    t.set_reg(2, SNAN);
    t.step_ok();
    assert_eq!(t.reg(1), QNAN);
    let st = t.cpu().regs.fpsw;
    assert_ne!(st & fpsw::CV, 0, "cause recorded");
    assert_ne!(st & fpsw::FV, 0, "sticky accumulated");
}

#[test]
fn enabled_invalid_operation_raises_before_the_store() {
    let mut asm = Asm::new();
    asm.fadd(Op::r(1), Op::r(2));
    let mut t = TestContext::new().load(&asm);
    t.sim.set_debugger(true);
    t.cpu_mut().regs.fpsw = fpsw::EV;
    t.set_reg(1, 1.0f32.to_bits());
    t.set_reg(2, SNAN);
    assert_eq!(t.step(), StopResult::Stopped(signal::SIGFPE));
    assert_eq!(t.pc(), CODE_BASE, "resumes at the faulting instruction");
    assert_eq!(t.reg(1), 1.0f32.to_bits(), "destination left untouched");
}

#[test]
fn causes_clear_between_instructions_but_sticky_bits_persist() {
    let mut asm = Asm::new();
    asm.fadd(Op::r(1), Op::r(2)); // raises invalid
    asm.fadd(Op::r(3), Op::r(4)); // clean
    let mut t = TestContext::new().load(&asm);
    t.set_reg(1, SNAN);
    t.set_reg(3, 1.0f32.to_bits());
    t.set_reg(4, 1.0f32.to_bits());
    t.steps(2);
    let st = t.cpu().regs.fpsw;
    assert_eq!(st & fpsw::CAUSE_MASK, 0);
    assert_ne!(st & fpsw::FV, 0);
}
