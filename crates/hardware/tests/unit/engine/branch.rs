//! Branches, calls, returns, and the block push/pop operations.

use pretty_assertions::assert_eq;
use rstest::rstest;

use mxsim_core::common::{signal, StopResult};
use mxsim_core::core::psw;

use crate::common::{Asm, Op, TestContext, CODE_BASE};

#[test]
fn bra_is_relative_to_its_own_address() {
    let mut asm = Asm::new();
    asm.bra(4); // lands on the instruction after the nops
    asm.nop();
    asm.nop();
    asm.mov_l(Op::r(1), Op::imm(1));
    let mut t = TestContext::new().load(&asm);
    t.step_ok();
    assert_eq!(t.pc(), CODE_BASE + 4);
    t.step_ok();
    assert_eq!(t.reg(1), 1);
}

#[test]
fn backward_branch_loops() {
    let mut asm = Asm::new();
    asm.add(Op::r(1), Op::imm(1));
    asm.cmp(Op::r(1), Op::imm(3));
    asm.bcnd(1, -8); // NE: back to the add (both insns are 4 bytes)
    let mut t = TestContext::new().load(&asm);
    t.set_reg(1, 0);
    // Three trips through the loop, exiting when r1 hits 3.
    for _ in 0..3 {
        t.steps(3);
    }
    assert_eq!(t.reg(1), 3);
    assert_eq!(t.pc(), CODE_BASE + 11);
}

#[rstest]
#[case(0, true)] // EQ taken when Z set
#[case(1, false)] // NE not taken
#[case(14, true)] // unconditional nibble
#[case(15, false)] // never
fn conditional_branch_follows_flags(#[case] cc: u8, #[case] taken: bool) {
    let mut asm = Asm::new();
    asm.bcnd(cc, 0x10);
    let mut t = TestContext::new().load(&asm);
    t.cpu_mut().regs.set_flag(psw::Z, true);
    t.step_ok();
    let expected = if taken { CODE_BASE + 0x10 } else { CODE_BASE + 3 };
    assert_eq!(t.pc(), expected);
}

#[test]
fn signed_and_unsigned_comparisons_diverge() {
    // -1 vs 1: LTU (unsigned below) is false, LT (signed less) is true.
    let mut asm = Asm::new();
    asm.cmp(Op::r(1), Op::r(2));
    asm.sccnd(Op::r(3), Op::cond(3)); // LTU
    asm.sccnd(Op::r(4), Op::cond(9)); // LT
    let mut t = TestContext::new().load(&asm);
    t.set_reg(1, 0xFFFF_FFFF);
    t.set_reg(2, 1);
    t.set_reg(3, 9);
    t.set_reg(4, 9);
    t.steps(3);
    assert_eq!(t.reg(3), 0);
    assert_eq!(t.reg(4), 1);
}

#[test]
fn jmp_goes_through_a_register() {
    let mut asm = Asm::new();
    asm.jmp(Op::r(5));
    let mut t = TestContext::new().load(&asm);
    t.set_reg(5, 0x4000);
    t.step_ok();
    assert_eq!(t.pc(), 0x4000);
}

#[test]
fn jsr_rts_round_trip() {
    let mut asm = Asm::new();
    asm.jsr(Op::r(5)); // 2 bytes: returns to CODE_BASE+2
    let mut t = TestContext::new().load(&asm);
    let mut sub = Asm::new();
    sub.rts();
    t.poke(0x4000, &sub.bytes);
    t.set_reg(5, 0x4000);

    let sp = t.reg(0);
    t.step_ok();
    assert_eq!(t.pc(), 0x4000);
    assert_eq!(t.reg(0), sp - 4, "return address pushed");
    t.step_ok();
    assert_eq!(t.pc(), CODE_BASE + 2);
    assert_eq!(t.reg(0), sp);
    assert_eq!(t.cpu().stats.fast_returns, 1);
}

#[test]
fn bsr_pushes_and_branches_relative() {
    let mut asm = Asm::new();
    asm.bsr(0x100);
    let mut t = TestContext::new().load(&asm);
    t.step_ok();
    assert_eq!(t.pc(), CODE_BASE + 0x100);
    assert_eq!(t.peek_u32(t.reg(0)), CODE_BASE + 3);
}

#[test]
fn rts_without_matching_push_is_stack_corruption() {
    let mut asm = Asm::new();
    asm.rts();
    let mut t = TestContext::new().load(&asm);
    // Plant plain data where the return address should be.
    let sp = t.reg(0) - 4;
    t.poke(sp, &[0, 0x40, 0, 0]);
    t.set_reg(0, sp);
    assert_eq!(t.step(), StopResult::Exited(1));
}

#[test]
fn pushm_popm_round_trip() {
    let mut asm = Asm::new();
    asm.pushm(1, 3);
    asm.mov_l(Op::r(1), Op::imm(0));
    asm.mov_l(Op::r(2), Op::imm(0));
    asm.mov_l(Op::r(3), Op::imm(0));
    asm.popm(1, 3);
    let mut t = TestContext::new().load(&asm);
    t.set_reg(1, 11);
    t.set_reg(2, 22);
    t.set_reg(3, 33);
    let sp = t.reg(0);
    t.steps(5);
    assert_eq!(t.reg(0), sp);
    assert_eq!((t.reg(1), t.reg(2), t.reg(3)), (11, 22, 33));
}

#[test]
fn pushm_highest_register_lands_highest_on_the_stack() {
    let mut asm = Asm::new();
    asm.pushm(1, 2);
    let mut t = TestContext::new().load(&asm);
    t.set_reg(1, 0xAAAA);
    t.set_reg(2, 0xBBBB);
    t.step_ok();
    let sp = t.reg(0);
    assert_eq!(t.peek_u32(sp), 0xAAAA);
    assert_eq!(t.peek_u32(sp + 4), 0xBBBB);
}

#[test]
fn pushm_rejects_the_stack_pointer() {
    let mut asm = Asm::new();
    asm.pushm(0, 3);
    let mut t = TestContext::new().load(&asm);
    t.sim.set_debugger(true);
    assert_eq!(t.step(), StopResult::Stopped(signal::SIGILL));
}

#[test]
fn inverted_register_range_stops_the_run() {
    let mut asm = Asm::new();
    asm.pushm(3, 2);
    let mut t = TestContext::new().load(&asm);
    assert_eq!(t.step(), StopResult::Stopped(signal::SIGILL));
    assert_eq!(t.pc(), CODE_BASE, "pc rewound to the faulting instruction");
}

#[test]
fn rtsd_releases_a_frame_and_returns() {
    // Simulate a prologue: push the return address, reserve 8 bytes.
    let mut asm = Asm::new();
    asm.rtsd(8);
    let mut t = TestContext::new().load(&asm);
    let sp = t.reg(0);
    t.cpu_mut()
        .mem
        .push_return_address(sp - 12, 0x4000)
        .unwrap();
    t.set_reg(0, sp - 20); // release 8 bytes of locals to reach the frame
    t.step_ok();
    assert_eq!(t.pc(), 0x4000);
    assert_eq!(t.reg(0), sp - 8);
}

#[test]
fn rtsd_with_registers_pops_them_before_returning() {
    let mut asm = Asm::new();
    asm.rtsd_regs(16, 1, 2);
    let mut t = TestContext::new().load(&asm);
    let sp = t.reg(0);
    // Frame, low to high: locals, saved r1, saved r2, return pc.
    t.poke(sp - 12, &0x1111u32.to_le_bytes());
    t.poke(sp - 8, &0x2222u32.to_le_bytes());
    t.cpu_mut().mem.push_return_address(sp - 4, 0x4000).unwrap();
    t.set_reg(0, sp - 20);
    t.step_ok();
    assert_eq!(t.reg(1), 0x1111);
    assert_eq!(t.reg(2), 0x2222);
    assert_eq!(t.pc(), 0x4000);
    assert_eq!(t.reg(0), sp);
}

#[test]
fn rtsd_with_a_zero_first_register_is_undefined() {
    let mut asm = Asm::new();
    asm.rtsd_regs(8, 0, 2);
    let mut t = TestContext::new().load(&asm);
    t.sim.set_debugger(true);
    assert_eq!(t.step(), StopResult::Stopped(signal::SIGILL));
}
