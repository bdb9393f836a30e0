//! Data movement: widths, extension rules, addressing modes, and the
//! status-word transfer restrictions.

use pretty_assertions::assert_eq;

use mxsim_core::common::StopResult;
use mxsim_core::core::{creg, psw};

use crate::common::{Asm, Op, TestContext, DATA_BASE};

#[test]
fn immediate_to_register() {
    let mut asm = Asm::new();
    asm.mov_l(Op::r(1), Op::imm(0x1234_5678));
    let mut t = TestContext::new().load(&asm);
    t.step_ok();
    assert_eq!(t.reg(1), 0x1234_5678);
}

#[test]
fn byte_moves_sign_extend_into_registers() {
    let mut asm = Asm::new();
    asm.mov_b(Op::r(1), Op::disp8(2, 0));
    let mut t = TestContext::new().load(&asm);
    t.poke(DATA_BASE, &[0x80]);
    t.set_reg(2, DATA_BASE);
    t.step_ok();
    assert_eq!(t.reg(1), 0xFFFF_FF80);
}

#[test]
fn movu_zero_extends() {
    let mut asm = Asm::new();
    asm.movu_b(Op::r(1), Op::ind(2));
    asm.movu_w(Op::r(3), Op::ind(2));
    let mut t = TestContext::new().load(&asm);
    t.poke(DATA_BASE, &[0x80, 0x80]);
    t.set_reg(2, DATA_BASE);
    t.steps(2);
    assert_eq!(t.reg(1), 0x0000_0080);
    assert_eq!(t.reg(3), 0x0000_8080);
}

#[test]
fn store_masks_to_operand_width() {
    let mut asm = Asm::new();
    asm.mov_b(Op::ind(2), Op::r(1));
    let mut t = TestContext::new().load(&asm);
    t.poke(DATA_BASE, &[0xAA, 0xBB]);
    t.set_reg(1, 0x1234_5678);
    t.set_reg(2, DATA_BASE);
    t.step_ok();
    let mut buf = [0u8; 2];
    t.sim.read_memory(DATA_BASE, &mut buf);
    assert_eq!(buf, [0x78, 0xBB]);
}

#[test]
fn postincrement_walks_forward() {
    let mut asm = Asm::new();
    asm.mov_l(Op::r(3), Op::postinc(1));
    asm.mov_l(Op::r(4), Op::postinc(1));
    let mut t = TestContext::new().load(&asm);
    t.poke(DATA_BASE, &[1, 0, 0, 0, 2, 0, 0, 0]);
    t.set_reg(1, DATA_BASE);
    t.steps(2);
    assert_eq!(t.reg(3), 1);
    assert_eq!(t.reg(4), 2);
    assert_eq!(t.reg(1), DATA_BASE + 8);
}

#[test]
fn predecrement_stores_below_the_pointer() {
    let mut asm = Asm::new();
    asm.mov_l(Op::predec(1), Op::r(2));
    let mut t = TestContext::new().load(&asm);
    t.set_reg(1, DATA_BASE + 8);
    t.set_reg(2, 0xDEAD_BEEF);
    t.step_ok();
    assert_eq!(t.reg(1), DATA_BASE + 4);
    assert_eq!(t.peek_u32(DATA_BASE + 4), 0xDEAD_BEEF);
}

#[test]
fn indexed_addressing_scales_by_width() {
    let mut asm = Asm::new();
    asm.mov_l(Op::r(3), Op::indexed(1, 2));
    let mut t = TestContext::new().load(&asm);
    t.poke(DATA_BASE + 8, &[0x2A, 0, 0, 0]);
    t.set_reg(1, DATA_BASE);
    t.set_reg(2, 2); // element index, scaled by 4 for word access
    t.step_ok();
    assert_eq!(t.reg(3), 0x2A);
}

#[test]
fn pc_reads_observe_the_instruction_address() {
    let mut asm = Asm::new();
    asm.nop();
    asm.mov_l(Op::r(1), Op::cr(creg::PC));
    let mut t = TestContext::new().load(&asm);
    t.steps(2);
    assert_eq!(t.reg(1), crate::common::CODE_BASE + 1);
}

#[test]
fn mov_sets_sign_and_zero() {
    let mut asm = Asm::new();
    asm.mov_l(Op::r(1), Op::imm(0));
    asm.mov_l(Op::r(2), Op::imm(-1));
    let mut t = TestContext::new().load(&asm);
    t.step_ok();
    assert!(t.flag(psw::Z));
    t.step_ok();
    assert!(t.flag(psw::S));
    assert!(!t.flag(psw::Z));
}

#[test]
fn psw_writes_cannot_set_processor_mode() {
    let mut asm = Asm::new();
    asm.mov_l(Op::cr(creg::PSW), Op::imm((psw::PM | psw::C) as i32));
    let mut t = TestContext::new().load(&asm);
    t.step_ok();
    assert!(t.flag(psw::C));
    assert!(!t.flag(psw::PM));
}

#[test]
fn user_mode_keeps_privileged_psw_fields() {
    let mut asm = Asm::new();
    asm.mov_l(Op::cr(creg::PSW), Op::imm(psw::C as i32));
    let mut t = TestContext::new().load(&asm);
    // Enter user mode with interrupts enabled.
    t.cpu_mut().regs.set_psw(psw::PM | psw::U | psw::I);
    t.step_ok();
    assert!(t.flag(psw::C));
    assert!(t.flag(psw::I), "user mode cannot clear I");
    assert!(t.flag(psw::U), "user mode cannot clear U");
    assert!(t.flag(psw::PM));
}

#[test]
fn user_mode_writes_to_privileged_control_registers_are_dropped() {
    let mut asm = Asm::new();
    asm.mov_l(Op::cr(creg::INTB), Op::imm(0x4000));
    let mut t = TestContext::new().load(&asm);
    t.cpu_mut().regs.intb = 0x1111;
    t.cpu_mut().regs.set_psw(psw::PM | psw::U);
    t.step_ok();
    assert_eq!(t.cpu().regs.intb, 0x1111);
}

#[test]
fn stack_bank_swaps_with_the_u_bit() {
    let mut asm = Asm::new();
    asm.setpsw(Op::flag(5)); // set U
    asm.clrpsw(Op::flag(5));
    let mut t = TestContext::new().load(&asm);
    let isp = t.reg(0);
    t.cpu_mut().regs.put(creg::USP, 0x4000);
    t.step_ok();
    assert_eq!(t.reg(0), 0x4000, "active stack is now the user bank");
    t.step_ok();
    assert_eq!(t.reg(0), isp);
}

#[test]
fn xchg_swaps_register_and_memory() {
    let mut asm = Asm::new();
    asm.xchg(Op::r(1), Op::ind(2));
    let mut t = TestContext::new().load(&asm);
    t.poke(DATA_BASE, &[0x11, 0, 0, 0]);
    t.set_reg(1, 0x22);
    t.set_reg(2, DATA_BASE);
    t.step_ok();
    assert_eq!(t.reg(1), 0x11);
    assert_eq!(t.peek_u32(DATA_BASE), 0x22);
}

#[test]
fn sccnd_materializes_a_condition() {
    let mut asm = Asm::new();
    asm.cmp(Op::r(1), Op::r(1)); // equal: Z set
    asm.sccnd(Op::r(2), Op::cond(0)); // EQ
    asm.sccnd(Op::r(3), Op::cond(1)); // NE
    let mut t = TestContext::new().load(&asm);
    t.set_reg(1, 5);
    t.set_reg(2, 9);
    t.set_reg(3, 9);
    t.steps(3);
    assert_eq!(t.reg(2), 1);
    assert_eq!(t.reg(3), 0);
}

#[test]
fn stcc_stores_only_when_the_condition_holds() {
    let mut asm = Asm::new();
    asm.cmp(Op::r(1), Op::r(1));
    asm.stcc(Op::r(2), Op::imm(7), Op::cond(0)); // EQ holds
    asm.stcc(Op::r(3), Op::imm(7), Op::cond(1)); // NE does not
    let mut t = TestContext::new().load(&asm);
    t.set_reg(2, 100);
    t.set_reg(3, 100);
    t.steps(3);
    assert_eq!(t.reg(2), 7);
    assert_eq!(t.reg(3), 100);
}

#[test]
fn mvtipl_sets_the_priority_field() {
    let mut asm = Asm::new();
    asm.mvtipl(9);
    let mut t = TestContext::new().load(&asm);
    t.step_ok();
    assert_eq!(t.cpu().regs.ipl(), 9);
}

#[test]
fn memory_to_memory_move_counts_a_stall() {
    let mut asm = Asm::new();
    asm.mov_l(Op::ind(1), Op::r(3)); // store
    asm.mov_l(Op::r(4), Op::ind(1)); // immediately load back
    let mut t = TestContext::new().load(&asm);
    t.set_reg(1, DATA_BASE);
    t.set_reg(3, 5);
    t.steps(2);
    assert_eq!(t.cpu().stats.memory_stalls, 1);
    assert_eq!(t.reg(4), 5);
}

#[test]
fn push_via_predecrement_does_not_stall_next_load() {
    let mut asm = Asm::new();
    asm.mov_l(Op::predec(0), Op::r(3)); // push r3
    asm.mov_l(Op::r(4), Op::ind(1));
    let mut t = TestContext::new().load(&asm);
    t.poke(DATA_BASE, &[1, 0, 0, 0]);
    t.set_reg(1, DATA_BASE);
    t.steps(2);
    assert_eq!(t.cpu().stats.memory_stalls, 0);
}

#[test]
fn wait_stops_and_enables_interrupts() {
    let mut asm = Asm::new();
    asm.wait();
    let mut t = TestContext::new().load(&asm);
    assert_eq!(t.step(), StopResult::Stopped(0));
    assert!(t.flag(psw::I));
}
