//! Opcode identities.

/// Broad instruction classification, used by the statistics layer to
/// aggregate retirement counts.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum OpClass {
    /// Register/memory moves and exchanges.
    Move,
    /// Integer arithmetic.
    Arith,
    /// Boolean logic, comparisons, and tests.
    Logic,
    /// Shifts and rotates.
    Shift,
    /// Single-bit set/clear/invert/test.
    Bit,
    /// Branches, calls, and returns.
    Branch,
    /// Software floating point.
    Float,
    /// Accumulator multiply-accumulate family.
    Acc,
    /// Pointer-walking string operations.
    String,
    /// Control, exception, and processor-state instructions.
    System,
}

impl OpClass {
    /// Stable display name for reports.
    pub fn name(self) -> &'static str {
        match self {
            OpClass::Move => "move",
            OpClass::Arith => "arith",
            OpClass::Logic => "logic",
            OpClass::Shift => "shift",
            OpClass::Bit => "bit",
            OpClass::Branch => "branch",
            OpClass::Float => "float",
            OpClass::Acc => "acc",
            OpClass::String => "string",
            OpClass::System => "system",
        }
    }
}

/// Every executable MX32 operation.
///
/// Three-operand encodings share the identity of their two-operand form;
/// the decoder distinguishes them purely by operand presence. `Illegal`
/// is the decode of any byte sequence outside the encoding table and
/// always raises the undefined-opcode exception.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Opcode {
    Nop,
    Brk,
    Rts,
    Rtsd,
    Rte,
    Rtfi,
    Wait,
    Stop,
    Int,
    Mvtipl,
    SetPsw,
    ClrPsw,
    Mov,
    Movu,
    Xchg,
    Sccnd,
    Stcc,
    Bmcc,
    PushM,
    PopM,
    Add,
    Adc,
    Sub,
    Sbb,
    Cmp,
    Mul,
    Div,
    Divu,
    Emul,
    Emulu,
    Abs,
    Max,
    Min,
    And,
    Or,
    Xor,
    Tst,
    Shll,
    Shar,
    Shlr,
    Rolc,
    Rorc,
    Rotl,
    Rotr,
    Revw,
    Revl,
    Sat,
    Satr,
    Bset,
    Bclr,
    Bnot,
    Btst,
    Bra,
    Bcnd,
    Bsr,
    Jmp,
    Jsr,
    Scmpu,
    Smovu,
    Smovb,
    Smovf,
    Sstr,
    Suntil,
    Swhile,
    Rmpa,
    Mulhi,
    Mullo,
    Machi,
    Maclo,
    Mvtachi,
    Mvtaclo,
    Mvfachi,
    Mvfacmi,
    Mvfaclo,
    Racw,
    Fadd,
    Fsub,
    Fmul,
    Fdiv,
    Fcmp,
    Ftoi,
    Round,
    Itof,
    Illegal,
}

impl Opcode {
    /// The statistics class this operation belongs to.
    pub fn class(self) -> OpClass {
        use Opcode::*;
        match self {
            Mov | Movu | Xchg | Sccnd | Stcc | PushM | PopM => OpClass::Move,
            Add | Adc | Sub | Sbb | Cmp | Mul | Div | Divu | Emul | Emulu | Abs | Max | Min
            | Sat | Satr => OpClass::Arith,
            And | Or | Xor | Tst => OpClass::Logic,
            Shll | Shar | Shlr | Rolc | Rorc | Rotl | Rotr | Revw | Revl => OpClass::Shift,
            Bset | Bclr | Bnot | Btst | Bmcc => OpClass::Bit,
            Bra | Bcnd | Bsr | Jmp | Jsr | Rts | Rtsd => OpClass::Branch,
            Fadd | Fsub | Fmul | Fdiv | Fcmp | Ftoi | Round | Itof => OpClass::Float,
            Mulhi | Mullo | Machi | Maclo | Mvtachi | Mvtaclo | Mvfachi | Mvfacmi | Mvfaclo
            | Racw => OpClass::Acc,
            Scmpu | Smovu | Smovb | Smovf | Sstr | Suntil | Swhile | Rmpa => OpClass::String,
            Nop | Brk | Rte | Rtfi | Wait | Stop | Int | Mvtipl | SetPsw | ClrPsw | Illegal => {
                OpClass::System
            }
        }
    }

    /// Assembly mnemonic, used by tracing output.
    pub fn mnemonic(self) -> &'static str {
        use Opcode::*;
        match self {
            Nop => "nop",
            Brk => "brk",
            Rts => "rts",
            Rtsd => "rtsd",
            Rte => "rte",
            Rtfi => "rtfi",
            Wait => "wait",
            Stop => "stop",
            Int => "int",
            Mvtipl => "mvtipl",
            SetPsw => "setpsw",
            ClrPsw => "clrpsw",
            Mov => "mov",
            Movu => "movu",
            Xchg => "xchg",
            Sccnd => "sccnd",
            Stcc => "stcc",
            Bmcc => "bmcc",
            PushM => "pushm",
            PopM => "popm",
            Add => "add",
            Adc => "adc",
            Sub => "sub",
            Sbb => "sbb",
            Cmp => "cmp",
            Mul => "mul",
            Div => "div",
            Divu => "divu",
            Emul => "emul",
            Emulu => "emulu",
            Abs => "abs",
            Max => "max",
            Min => "min",
            And => "and",
            Or => "or",
            Xor => "xor",
            Tst => "tst",
            Shll => "shll",
            Shar => "shar",
            Shlr => "shlr",
            Rolc => "rolc",
            Rorc => "rorc",
            Rotl => "rotl",
            Rotr => "rotr",
            Revw => "revw",
            Revl => "revl",
            Sat => "sat",
            Satr => "satr",
            Bset => "bset",
            Bclr => "bclr",
            Bnot => "bnot",
            Btst => "btst",
            Bra => "bra",
            Bcnd => "bcnd",
            Bsr => "bsr",
            Jmp => "jmp",
            Jsr => "jsr",
            Scmpu => "scmpu",
            Smovu => "smovu",
            Smovb => "smovb",
            Smovf => "smovf",
            Sstr => "sstr",
            Suntil => "suntil",
            Swhile => "swhile",
            Rmpa => "rmpa",
            Mulhi => "mulhi",
            Mullo => "mullo",
            Machi => "machi",
            Maclo => "maclo",
            Mvtachi => "mvtachi",
            Mvtaclo => "mvtaclo",
            Mvfachi => "mvfachi",
            Mvfacmi => "mvfacmi",
            Mvfaclo => "mvfaclo",
            Racw => "racw",
            Fadd => "fadd",
            Fsub => "fsub",
            Fmul => "fmul",
            Fdiv => "fdiv",
            Fcmp => "fcmp",
            Ftoi => "ftoi",
            Round => "round",
            Itof => "itof",
            Illegal => "(illegal)",
        }
    }
}
