//! String operations: compare, copy, fill, scan, repeat-accumulate.
//!
//! All of these consume pointers in r1/r2 and a count in r3, leaving the
//! registers advanced past the processed elements.

use pretty_assertions::assert_eq;

use mxsim_core::core::psw;

use crate::common::{Asm, Op, TestContext, DATA_BASE};

const SRC: u32 = DATA_BASE;
const DST: u32 = DATA_BASE + 0x100;

fn context(asm: &Asm) -> TestContext {
    TestContext::new().load(asm)
}

#[test]
fn scmpu_equal_strings_end_with_z_and_c() {
    let mut asm = Asm::new();
    asm.scmpu();
    let mut t = context(&asm);
    t.poke(SRC, b"abc\0");
    t.poke(DST, b"abc\0");
    t.set_reg(1, SRC);
    t.set_reg(2, DST);
    t.set_reg(3, 16);
    t.step_ok();
    assert!(t.flag(psw::Z));
    assert!(t.flag(psw::C));
    // Stopped at the NUL, not after 16 bytes.
    assert_eq!(t.reg(1), SRC + 4);
    assert_eq!(t.reg(3), 12);
}

#[test]
fn scmpu_mismatch_orders_by_byte_value() {
    let mut asm = Asm::new();
    asm.scmpu();
    let mut t = context(&asm);
    t.poke(SRC, b"abd\0");
    t.poke(DST, b"abc\0");
    t.set_reg(1, SRC);
    t.set_reg(2, DST);
    t.set_reg(3, 16);
    t.step_ok();
    assert!(!t.flag(psw::Z));
    assert!(t.flag(psw::C), "first string is the larger");
}

#[test]
fn scmpu_respects_the_count_limit() {
    let mut asm = Asm::new();
    asm.scmpu();
    let mut t = context(&asm);
    t.poke(SRC, b"ax");
    t.poke(DST, b"ay");
    t.set_reg(1, SRC);
    t.set_reg(2, DST);
    t.set_reg(3, 1); // only the equal first byte is in range
    t.step_ok();
    assert!(t.flag(psw::Z));
    assert_eq!(t.reg(3), 0);
}

#[test]
fn smovu_stops_after_copying_the_nul() {
    let mut asm = Asm::new();
    asm.smovu();
    let mut t = context(&asm);
    t.poke(SRC, b"hi\0junk");
    t.set_reg(1, DST);
    t.set_reg(2, SRC);
    t.set_reg(3, 16);
    t.step_ok();
    let mut buf = [0u8; 3];
    t.sim.read_memory(DST, &mut buf);
    assert_eq!(&buf, b"hi\0");
    assert_eq!(t.reg(3), 13, "three bytes consumed");
    assert_eq!(t.reg(1), DST + 3);
}

#[test]
fn smovf_copies_the_exact_count() {
    let mut asm = Asm::new();
    asm.smovf();
    let mut t = context(&asm);
    t.poke(SRC, b"ab\0cd");
    t.set_reg(1, DST);
    t.set_reg(2, SRC);
    t.set_reg(3, 5);
    t.step_ok();
    let mut buf = [0u8; 5];
    t.sim.read_memory(DST, &mut buf);
    assert_eq!(&buf, b"ab\0cd", "the NUL does not stop an exact copy");
    assert_eq!(t.reg(3), 0);
}

#[test]
fn smovb_copies_backward_for_overlap() {
    let mut asm = Asm::new();
    asm.smovb();
    let mut t = context(&asm);
    t.poke(SRC, b"abcde");
    // Shift "abcde" up by two, copying from the top down.
    t.set_reg(1, SRC + 6); // last destination byte
    t.set_reg(2, SRC + 4); // last source byte
    t.set_reg(3, 5);
    t.step_ok();
    let mut buf = [0u8; 7];
    t.sim.read_memory(SRC, &mut buf);
    assert_eq!(&buf, b"ababcde");
}

#[test]
fn sstr_fills_with_sized_elements() {
    let mut asm = Asm::new();
    asm.sstr_w();
    let mut t = context(&asm);
    t.set_reg(1, DST);
    t.set_reg(2, 0xABCD);
    t.set_reg(3, 2);
    t.step_ok();
    let mut buf = [0u8; 4];
    t.sim.read_memory(DST, &mut buf);
    assert_eq!(buf, [0xCD, 0xAB, 0xCD, 0xAB]);
    assert_eq!(t.reg(1), DST + 4);
}

#[test]
fn suntil_stops_on_the_first_match() {
    let mut asm = Asm::new();
    asm.suntil_b();
    let mut t = context(&asm);
    t.poke(SRC, &[1, 2, 3, 4]);
    t.set_reg(1, SRC);
    t.set_reg(2, 3);
    t.set_reg(3, 16);
    t.step_ok();
    assert!(t.flag(psw::Z), "found");
    assert_eq!(t.reg(1), SRC + 3, "pointer passes the match");
    assert_eq!(t.reg(3), 13);
}

#[test]
fn suntil_without_a_match_runs_out_the_count() {
    let mut asm = Asm::new();
    asm.suntil_b();
    let mut t = context(&asm);
    t.poke(SRC, &[1, 2]);
    t.set_reg(1, SRC);
    t.set_reg(2, 9);
    t.set_reg(3, 2);
    t.step_ok();
    assert!(!t.flag(psw::Z));
    assert_eq!(t.reg(3), 0);
}

#[test]
fn suntil_word_comparison_wraps_at_the_sign_boundary() {
    // The final C flag is a wrapped signed difference; operands a full
    // i32 range apart must not blow up the subtraction.
    let mut asm = Asm::new();
    asm.suntil_l();
    let mut t = context(&asm);
    t.poke(SRC, &0x7FFF_FFFFu32.to_le_bytes());
    t.set_reg(1, SRC);
    t.set_reg(2, 0x8000_0000);
    t.set_reg(3, 1);
    t.step_ok();
    assert!(!t.flag(psw::Z));
    assert!(!t.flag(psw::C), "MAX - MIN wraps negative");
    assert_eq!(t.reg(1), SRC + 4);
    assert_eq!(t.reg(3), 0);

    let mut asm = Asm::new();
    asm.suntil_l();
    let mut t = context(&asm);
    t.poke(SRC, &0x8000_0000u32.to_le_bytes());
    t.set_reg(1, SRC);
    t.set_reg(2, 0x7FFF_FFFF);
    t.set_reg(3, 1);
    t.step_ok();
    assert!(!t.flag(psw::Z));
    assert!(t.flag(psw::C), "MIN - MAX wraps positive");
}

#[test]
fn swhile_stops_on_the_first_difference() {
    let mut asm = Asm::new();
    asm.swhile_b();
    let mut t = context(&asm);
    t.poke(SRC, &[7, 7, 5]);
    t.set_reg(1, SRC);
    t.set_reg(2, 7);
    t.set_reg(3, 16);
    t.step_ok();
    assert!(!t.flag(psw::Z));
    assert_eq!(t.reg(1), SRC + 3);
    assert_eq!(t.reg(3), 13);
}

#[test]
fn scan_with_a_zero_count_leaves_flags_alone() {
    let mut asm = Asm::new();
    asm.cmp(Op::r(5), Op::r(5)); // Z set
    asm.suntil_b();
    let mut t = context(&asm);
    t.set_reg(3, 0);
    t.steps(2);
    assert!(t.flag(psw::Z), "zero-length scan must not disturb flags");
}

#[test]
fn rmpa_accumulates_signed_products() {
    let mut asm = Asm::new();
    asm.rmpa_w();
    let mut t = context(&asm);
    // (2 * 3) + (-1 * 100) = -94
    t.poke(SRC, &[2u8, 0, 0xFF, 0xFF]);
    t.poke(DST, &[3u8, 0, 100, 0]);
    t.set_reg(1, SRC);
    t.set_reg(2, DST);
    t.set_reg(3, 2);
    t.set_reg(4, 0);
    t.set_reg(5, 0);
    t.set_reg(6, 0);
    t.step_ok();
    assert_eq!(t.reg(4) as i32, -94);
    assert_eq!(t.reg(5), 0xFFFF_FFFF);
    assert_eq!(t.reg(6), 0xFFFF_FFFF);
    assert!(t.flag(psw::S));
    assert!(!t.flag(psw::O), "a sign-extension-only r6 is not overflow");
}

#[test]
fn rmpa_positive_sum_clears_the_flags() {
    let mut asm = Asm::new();
    asm.rmpa_b();
    let mut t = context(&asm);
    t.poke(SRC, &[10, 10]);
    t.poke(DST, &[10, 10]);
    t.set_reg(1, SRC);
    t.set_reg(2, DST);
    t.set_reg(3, 2);
    t.set_reg(4, 0);
    t.set_reg(5, 0);
    t.set_reg(6, 0);
    t.step_ok();
    assert_eq!(t.reg(4), 200);
    assert_eq!(t.reg(5), 0);
    assert_eq!(t.reg(6), 0);
    assert!(!t.flag(psw::S));
    assert!(!t.flag(psw::O));
}
