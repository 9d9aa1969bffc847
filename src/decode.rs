// Instruction decoder: a static trie of 16-way tables keyed on successive
// opcode nibbles. Each leaf is a production that renders the mnemonic and
// reports how many nibbles the encoding consumes.

use std::fmt;

use crate::error::Result;
use crate::fetch::OpcodeWindow;
use crate::memory::NibbleSource;
use crate::operand::{goyes, hex, immediate, sign_extend, signed};
use crate::types::*;

// Relative jump biases: where the PC sits, relative to the instruction start,
// when the displacement is applied.
const GOTO_BIAS: i32 = 1;
const GOSUB_BIAS: i32 = 4;
const GOLONG_BIAS: i32 = 2;
const GOSUBL_BIAS: i32 = 6;
// GOC / GONC print their 2-nibble field unsigned, plus one.
const CARRY_BRANCH_BIAS: u64 = 1;

pub const ILLEGAL: &str = "Illegal";

/// Text and length of one decoded instruction.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct DecodedInstruction {
    /// Nibbles consumed, `1..=MAX_INSTRUCTION_NIBBLES`.
    pub length: usize,
    pub text: String,
}

impl DecodedInstruction {
    fn new(text: String, length: usize) -> Self {
        Self { length, text }
    }

    pub fn illegal() -> Self {
        Self::new(ILLEGAL.to_string(), 1)
    }

    pub fn is_illegal(&self) -> bool {
        self.text == ILLEGAL
    }
}

impl fmt::Display for DecodedInstruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

// ================================================================
//  Productions
// ================================================================

#[derive(Clone, Copy, Debug)]
enum FieldSel {
    Fixed(Field),
    /// Encoded field code held in the nibble at this offset.
    Code(usize),
    /// Low three bits of the nibble at this offset.
    LowBits(usize),
}

impl FieldSel {
    fn resolve(self, w: &OpcodeWindow) -> Option<Field> {
        match self {
            FieldSel::Fixed(f) => Some(f),
            FieldSel::Code(at) => Field::from_code(w.nibble(at)),
            FieldSel::LowBits(at) => Some(Field::from_low_bits(w.nibble(at))),
        }
    }
}

#[derive(Clone, Copy, Debug)]
enum Width {
    Fixed(usize),
    /// The nibble at this offset holds the width minus one.
    Counted(usize),
}

#[derive(Clone, Copy, Debug)]
enum TestOperand {
    None,
    Field(FieldSel),
    Index(usize),
}

#[derive(Clone, Copy, Debug)]
enum Production {
    Illegal,
    Bare(&'static str, usize),
    Field(&'static str, FieldSel, usize),
    /// Decimal operand: the nibble at the offset, plus one.
    Count(&'static str, usize, usize),
    /// Decimal operand: the nibble at the offset.
    Index(&'static str, usize, usize),
    /// Hex immediate closing the instruction.
    Hex {
        mnemonic: &'static str,
        at: usize,
        width: Width,
        bias: u64,
    },
    /// Signed displacement of `nibbles` nibbles closing the instruction.
    Jump {
        mnemonic: &'static str,
        at: usize,
        nibbles: usize,
        bias: i32,
    },
    /// Test whose last two nibbles are the GOYES / RTNYES field.
    Test {
        mnemonic: &'static str,
        operand: TestOperand,
        len: usize,
    },
}

impl Production {
    fn render(self, w: &OpcodeWindow) -> DecodedInstruction {
        match self {
            Production::Illegal => DecodedInstruction::illegal(),
            Production::Bare(m, len) => DecodedInstruction::new(m.to_string(), len),
            Production::Field(m, sel, len) => match sel.resolve(w) {
                Some(field) => DecodedInstruction::new(format!("{} {}", m, field), len),
                None => DecodedInstruction::illegal(),
            },
            Production::Count(m, at, len) => {
                DecodedInstruction::new(format!("{} {}", m, w.nibble(at) as u32 + 1), len)
            }
            Production::Index(m, at, len) => {
                DecodedInstruction::new(format!("{} {}", m, w.nibble(at)), len)
            }
            Production::Hex {
                mnemonic,
                at,
                width,
                bias,
            } => {
                let width = match width {
                    Width::Fixed(n) => n,
                    Width::Counted(n) => w.nibble(n) as usize + 1,
                };
                let value = immediate(w, at, width) + bias;
                DecodedInstruction::new(format!("{} {}", mnemonic, hex(value, width)), at + width)
            }
            Production::Jump {
                mnemonic,
                at,
                nibbles,
                bias,
            } => {
                let offset = sign_extend(immediate(w, at, nibbles), nibbles) + bias;
                DecodedInstruction::new(format!("{} {}", mnemonic, signed(offset)), at + nibbles)
            }
            Production::Test {
                mnemonic,
                operand,
                len,
            } => {
                let at = len - 2;
                let target = goyes(immediate(w, at, 2) as u8, at as i32);
                let text = match operand {
                    TestOperand::None => format!("{} {}", mnemonic, target),
                    TestOperand::Field(sel) => match sel.resolve(w) {
                        Some(field) => format!("{} {} {}", mnemonic, field, target),
                        None => return DecodedInstruction::illegal(),
                    },
                    TestOperand::Index(i) => format!("{} {} {}", mnemonic, w.nibble(i), target),
                };
                DecodedInstruction::new(text, len)
            }
        }
    }
}

// ================================================================
//  Dispatch nodes
// ================================================================

#[derive(Clone, Copy, Debug)]
enum ArithForm {
    /// Ax / Bx: operation in nibble 2, field in the low bits of nibble 1,
    /// nibble 1 bit 3 picks the secondary table.
    Selected,
    /// Cx / Ex: primary table, A field.
    Primary,
    /// Dx / Fx: secondary table, A field.
    Secondary,
}

struct OpTables {
    primary: [&'static str; 16],
    secondary: [&'static str; 16],
}

#[derive(Clone, Copy)]
enum Node {
    /// Dispatch on the nibble at this offset.
    Branch(usize, &'static [Node; 16]),
    Leaf(Production),
    /// `zero` when nibbles `from..to` are all zero.
    IfZero {
        from: usize,
        to: usize,
        zero: Production,
        other: Production,
    },
    /// 8A / 8B / 9x register comparisons.
    RegisterTest,
    /// Ax .. Fx register arithmetic.
    Arith(&'static OpTables, ArithForm),
    /// 14x / 15x memory transfers through D0 / D1.
    DataTransfer,
}

const ILLEGAL_OP: Node = Node::Leaf(Production::Illegal);

const fn bare(m: &'static str, len: usize) -> Node {
    Node::Leaf(Production::Bare(m, len))
}

const fn logic(m: &'static str) -> Node {
    Node::Leaf(Production::Field(m, FieldSel::Code(2), 4))
}

const fn count(m: &'static str, at: usize, len: usize) -> Node {
    Node::Leaf(Production::Count(m, at, len))
}

const fn index(m: &'static str, at: usize, len: usize) -> Node {
    Node::Leaf(Production::Index(m, at, len))
}

const fn imm(mnemonic: &'static str, at: usize, width: usize) -> Node {
    Node::Leaf(Production::Hex {
        mnemonic,
        at,
        width: Width::Fixed(width),
        bias: 0,
    })
}

const fn imm_counted(mnemonic: &'static str, at: usize, count_at: usize) -> Node {
    Node::Leaf(Production::Hex {
        mnemonic,
        at,
        width: Width::Counted(count_at),
        bias: 0,
    })
}

const fn carry_branch(ret: &'static str, go: &'static str) -> Node {
    Node::IfZero {
        from: 1,
        to: 3,
        zero: Production::Bare(ret, 3),
        other: Production::Hex {
            mnemonic: go,
            at: 1,
            width: Width::Fixed(2),
            bias: CARRY_BRANCH_BIAS,
        },
    }
}

const fn jump(mnemonic: &'static str, at: usize, nibbles: usize, bias: i32) -> Node {
    Node::Leaf(Production::Jump {
        mnemonic,
        at,
        nibbles,
        bias,
    })
}

const fn test(mnemonic: &'static str, len: usize) -> Node {
    Node::Leaf(Production::Test {
        mnemonic,
        operand: TestOperand::None,
        len,
    })
}

const fn test_index(mnemonic: &'static str, at: usize, len: usize) -> Node {
    Node::Leaf(Production::Test {
        mnemonic,
        operand: TestOperand::Index(at),
        len,
    })
}

// ================================================================
//  Opcode tables
// ================================================================

static ROOT: [Node; 16] = [
    Node::Branch(1, &GROUP_0),
    Node::Branch(1, &GROUP_1),
    index("P=", 1, 2),
    imm_counted("LCHEX", 2, 1),
    carry_branch("RTNC", "GOC"),
    carry_branch("RTNNC", "GONC"),
    jump("GOTO", 1, 3, GOTO_BIAS),
    jump("GOSUB", 1, 3, GOSUB_BIAS),
    Node::Branch(1, &GROUP_8),
    Node::RegisterTest,
    Node::Arith(&ADD_COPY, ArithForm::Selected),
    Node::Arith(&SUB_SHIFT, ArithForm::Selected),
    Node::Arith(&ADD_COPY, ArithForm::Primary),
    Node::Arith(&ADD_COPY, ArithForm::Secondary),
    Node::Arith(&SUB_SHIFT, ArithForm::Primary),
    Node::Arith(&SUB_SHIFT, ArithForm::Secondary),
];

// ----------------------------------------------------------
// 0x - returns, mode and status
// ----------------------------------------------------------
static GROUP_0: [Node; 16] = [
    bare("RTNSXM", 2),
    bare("RTN", 2),
    bare("RTNSC", 2),
    bare("RTNCC", 2),
    bare("SETHEX", 2),
    bare("SETDEC", 2),
    bare("RSTK=C", 2),
    bare("C=RSTK", 2),
    bare("CLRST", 2),
    bare("C=ST", 2),
    bare("ST=C", 2),
    bare("CSTEX", 2),
    bare("P=P+1", 2),
    bare("P=P-1", 2),
    Node::Branch(3, &GROUP_0E),
    bare("RTI", 2),
];

// 0Efx: AND / OR, field in nibble 2
static GROUP_0E: [Node; 16] = [
    logic("A=A&B"),
    logic("B=B&C"),
    logic("C=C&A"),
    logic("D=D&C"),
    logic("B=B&A"),
    logic("C=C&B"),
    logic("A=A&C"),
    logic("C=C&D"),
    logic("A=A!B"),
    logic("B=B!C"),
    logic("C=C!A"),
    logic("D=D!C"),
    logic("B=B!A"),
    logic("C=C!B"),
    logic("A=A!C"),
    logic("C=C!D"),
];

// ----------------------------------------------------------
// 1x - scratch registers, pointers, memory
// ----------------------------------------------------------
static GROUP_1: [Node; 16] = [
    Node::Branch(2, &GROUP_10),
    Node::Branch(2, &GROUP_11),
    Node::Branch(2, &GROUP_12),
    Node::Branch(2, &GROUP_13),
    Node::DataTransfer,
    Node::DataTransfer,
    count("D0=D0+", 2, 3),
    count("D1=D1+", 2, 3),
    count("D0=D0-", 2, 3),
    imm("D0=HEX", 2, 2),
    imm("D0=HEX", 2, 4),
    imm("D0=HEX", 2, 5),
    count("D1=D1-", 2, 3),
    imm("D1=HEX", 2, 2),
    imm("D1=HEX", 2, 4),
    imm("D1=HEX", 2, 5),
];

static GROUP_10: [Node; 16] = [
    bare("R0=A", 3),
    bare("R1=A", 3),
    bare("R2=A", 3),
    bare("R3=A", 3),
    bare("R4=A", 3),
    ILLEGAL_OP,
    ILLEGAL_OP,
    ILLEGAL_OP,
    bare("R0=C", 3),
    bare("R1=C", 3),
    bare("R2=C", 3),
    bare("R3=C", 3),
    bare("R4=C", 3),
    ILLEGAL_OP,
    ILLEGAL_OP,
    ILLEGAL_OP,
];

static GROUP_11: [Node; 16] = [
    bare("A=R0", 3),
    bare("A=R1", 3),
    bare("A=R2", 3),
    bare("A=R3", 3),
    bare("A=R4", 3),
    ILLEGAL_OP,
    ILLEGAL_OP,
    ILLEGAL_OP,
    bare("C=R0", 3),
    bare("C=R1", 3),
    bare("C=R2", 3),
    bare("C=R3", 3),
    bare("C=R4", 3),
    ILLEGAL_OP,
    ILLEGAL_OP,
    ILLEGAL_OP,
];

static GROUP_12: [Node; 16] = [
    bare("AR0EX", 3),
    bare("AR1EX", 3),
    bare("AR2EX", 3),
    bare("AR3EX", 3),
    bare("AR4EX", 3),
    ILLEGAL_OP,
    ILLEGAL_OP,
    ILLEGAL_OP,
    bare("CR0EX", 3),
    bare("CR1EX", 3),
    bare("CR2EX", 3),
    bare("CR3EX", 3),
    bare("CR4EX", 3),
    ILLEGAL_OP,
    ILLEGAL_OP,
    ILLEGAL_OP,
];

static GROUP_13: [Node; 16] = [
    bare("D0=A", 3),
    bare("D1=A", 3),
    bare("AD0EX", 3),
    bare("AD1EX", 3),
    bare("D0=C", 3),
    bare("D1=C", 3),
    bare("CD0EX", 3),
    bare("CD1EX", 3),
    bare("D0=AS", 3),
    bare("D1=AS", 3),
    bare("AD0XS", 3),
    bare("AD1XS", 3),
    bare("D0=CS", 3),
    bare("D1=CS", 3),
    bare("CD0XS", 3),
    bare("CD1XS", 3),
];

static DATA_TRANSFERS: [&str; 8] = [
    "DAT0=A", "DAT1=A", "A=DAT0", "A=DAT1", "DAT0=C", "DAT1=C", "C=DAT0", "C=DAT1",
];

// ----------------------------------------------------------
// 8x - system, status, P tests, long jumps
// ----------------------------------------------------------
static GROUP_8: [Node; 16] = [
    Node::Branch(2, &GROUP_80),
    Node::Branch(2, &GROUP_81),
    Node::Branch(2, &GROUP_82),
    Node::Branch(2, &GROUP_83),
    index("ST=0", 2, 3),
    index("ST=1", 2, 3),
    test_index("?ST=0", 2, 5),
    test_index("?ST=1", 2, 5),
    test_index("?P#", 2, 5),
    test_index("?P=", 2, 5),
    Node::RegisterTest,
    Node::RegisterTest,
    jump("GOLONG", 2, 4, GOLONG_BIAS),
    imm("GOVLNG", 2, 5),
    jump("GOSUBL", 2, 4, GOSUBL_BIAS),
    imm("GOSBVL", 2, 5),
];

static GROUP_80: [Node; 16] = [
    bare("OUT=CS", 3),
    bare("OUT=C", 3),
    bare("A=IN", 3),
    bare("C=IN", 3),
    bare("UNCNFG", 3),
    bare("CONFIG", 3),
    bare("C=ID", 3),
    bare("SHUTDN", 3),
    Node::Branch(3, &GROUP_808),
    bare("C+P+1", 3),
    bare("RESET", 3),
    bare("BUSCC", 3),
    index("C=P", 3, 4),
    index("P=C", 3, 4),
    bare("SREQ", 3),
    index("CPEX", 3, 4),
];

static GROUP_808: [Node; 16] = [
    bare("INTON", 4),
    Node::IfZero {
        from: 4,
        to: 5,
        zero: Production::Bare("RSI", 5),
        other: Production::Illegal,
    },
    imm_counted("LAHEX", 5, 4),
    // Bus control, not expected in ROM code
    bare("BUSCB", 4),
    index("ABIT=0", 4, 5),
    index("ABIT=1", 4, 5),
    test_index("?ABIT=0", 4, 7),
    test_index("?ABIT=1", 4, 7),
    index("CBIT=0", 4, 5),
    index("CBIT=1", 4, 5),
    test_index("?CBIT=0", 4, 7),
    test_index("?CBIT=1", 4, 7),
    bare("PC=(A)", 4),
    bare("BUSCD", 4),
    ILLEGAL_OP,
    bare("INTOFF", 4),
];

static GROUP_81: [Node; 16] = [
    bare("ASLC", 3),
    bare("BSLC", 3),
    bare("CSLC", 3),
    bare("DSLC", 3),
    bare("ASRC", 3),
    bare("BSRC", 3),
    bare("CSRC", 3),
    bare("DSRC", 3),
    ILLEGAL_OP,
    ILLEGAL_OP,
    ILLEGAL_OP,
    ILLEGAL_OP,
    bare("ASRB", 3),
    bare("BSRB", 3),
    bare("CSRB", 3),
    bare("DSRB", 3),
];

// 82x: named single-bit forms, the rest print the mask
static GROUP_82: [Node; 16] = [
    index("CLRHSTBM", 2, 3),
    bare("XM=0", 3),
    bare("SB=0", 3),
    index("CLRHSTBM", 2, 3),
    bare("SR=0", 3),
    index("CLRHSTBM", 2, 3),
    index("CLRHSTBM", 2, 3),
    index("CLRHSTBM", 2, 3),
    bare("MP=0", 3),
    index("CLRHSTBM", 2, 3),
    index("CLRHSTBM", 2, 3),
    index("CLRHSTBM", 2, 3),
    index("CLRHSTBM", 2, 3),
    index("CLRHSTBM", 2, 3),
    index("CLRHSTBM", 2, 3),
    bare("CLRHST", 3),
];

static GROUP_83: [Node; 16] = [
    ILLEGAL_OP,
    test("?XM=0", 5),
    test("?SB=0", 5),
    ILLEGAL_OP,
    test("?SR=0", 5),
    ILLEGAL_OP,
    ILLEGAL_OP,
    ILLEGAL_OP,
    test("?MP=0", 5),
    ILLEGAL_OP,
    ILLEGAL_OP,
    ILLEGAL_OP,
    ILLEGAL_OP,
    ILLEGAL_OP,
    ILLEGAL_OP,
    ILLEGAL_OP,
];

// ----------------------------------------------------------
// Register tests (8A, 8B, 9x)
// ----------------------------------------------------------
static EQUALITY_TESTS: [&str; 16] = [
    "?A=B", "?B=C", "?A=C", "?C=D", "?A#B", "?B#C", "?A#C", "?C#D",
    "?A=0", "?B=0", "?C=0", "?D=0", "?A#0", "?B#0", "?C#0", "?D#0",
];

static ORDER_TESTS: [&str; 16] = [
    "?A>B", "?B>C", "?C>A", "?D>C", "?A<B", "?B<C", "?C<A", "?D<C",
    "?A>=B", "?B>=C", "?C>=A", "?D>=C", "?A<=B", "?B<=C", "?C<=A", "?D<=C",
];

// ----------------------------------------------------------
// Register arithmetic (Ax .. Fx)
// ----------------------------------------------------------
static ADD_COPY: OpTables = OpTables {
    primary: [
        "A=A+B", "B=B+C", "C=C+A", "D=D+C", "A=A+A", "B=B+B", "C=C+C", "D=D+D",
        "B=B+A", "C=C+B", "A=A+C", "C=C+D", "A=A-1", "B=B-1", "C=C-1", "D=D-1",
    ],
    secondary: [
        "A=0", "B=0", "C=0", "D=0", "A=B", "B=C", "C=A", "D=C",
        "B=A", "C=B", "A=C", "C=D", "ABEX", "BCEX", "ACEX", "CDEX",
    ],
};

static SUB_SHIFT: OpTables = OpTables {
    primary: [
        "A=A-B", "B=B-C", "C=C-A", "D=D-C", "A=A+1", "B=B+1", "C=C+1", "D=D+1",
        "B=B-A", "C=C-B", "A=A-C", "C=C-D", "A=B-A", "B=C-B", "C=A-C", "D=C-D",
    ],
    secondary: [
        "ASL", "BSL", "CSL", "DSL", "ASR", "BSR", "CSR", "DSR",
        "A=-A", "B=-B", "C=-C", "D=-D", "A=-A-1", "B=-B-1", "C=-C-1", "D=-D-1",
    ],
};

// ================================================================
//  Family dispatchers
// ================================================================

fn register_test(w: &OpcodeWindow) -> Production {
    let op0 = w.nibble(0);
    let op1 = w.nibble(1);
    // 8A and 9x with bit 3 clear compare for (in)equality, 8B and the
    // remaining 9x forms compare for order.
    let equality = (op0 == 0x8 && op1 == 0xa) || (op0 == 0x9 && op1 & 0x8 == 0);
    let table = if equality { &EQUALITY_TESTS } else { &ORDER_TESTS };
    let field = if op0 == 0x8 {
        FieldSel::Fixed(Field::A)
    } else {
        FieldSel::LowBits(1)
    };
    Production::Test {
        mnemonic: table[w.nibble(2) as usize],
        operand: TestOperand::Field(field),
        len: 5,
    }
}

fn arith(w: &OpcodeWindow, tables: &OpTables, form: ArithForm) -> Production {
    match form {
        ArithForm::Selected => {
            let op1 = w.nibble(1);
            let table = if op1 & 0x8 == 0 {
                &tables.primary
            } else {
                &tables.secondary
            };
            Production::Field(table[w.nibble(2) as usize], FieldSel::LowBits(1), 3)
        }
        ArithForm::Primary => {
            Production::Field(tables.primary[w.nibble(1) as usize], FieldSel::Fixed(Field::A), 2)
        }
        ArithForm::Secondary => Production::Field(
            tables.secondary[w.nibble(1) as usize],
            FieldSel::Fixed(Field::A),
            2,
        ),
    }
}

fn data_transfer(w: &OpcodeWindow) -> Production {
    let op2 = w.nibble(2);
    let mnemonic = DATA_TRANSFERS[(op2 & 0x7) as usize];
    let by_count = op2 & 0x8 != 0;
    match (w.nibble(1), by_count) {
        (0x4, false) => Production::Field(mnemonic, FieldSel::Fixed(Field::A), 3),
        (0x4, true) => Production::Field(mnemonic, FieldSel::Fixed(Field::B), 3),
        (_, false) => Production::Field(mnemonic, FieldSel::Code(3), 4),
        (_, true) => Production::Count(mnemonic, 3, 4),
    }
}

// ================================================================
//  Entry points
// ================================================================

/// Decode the instruction at the start of `window`. Encodings with no
/// assigned meaning decode as a 1-nibble `Illegal`.
pub fn decode(window: &OpcodeWindow) -> DecodedInstruction {
    let mut table: &'static [Node; 16] = &ROOT;
    let mut at = 0;
    let production = loop {
        match table[window.nibble(at) as usize] {
            Node::Branch(next_at, next) => {
                at = next_at;
                table = next;
            }
            Node::Leaf(p) => break p,
            Node::IfZero {
                from,
                to,
                zero,
                other,
            } => {
                let all_zero = (from..to).all(|i| window.nibble(i) == 0);
                break if all_zero { zero } else { other };
            }
            Node::RegisterTest => break register_test(window),
            Node::Arith(tables, form) => break arith(window, tables, form),
            Node::DataTransfer => break data_transfer(window),
        }
    };
    production.render(window)
}

/// Fetch and decode the instruction at `pc`.
pub fn decode_at<M: NibbleSource + ?Sized>(mem: &M, pc: Word20) -> Result<DecodedInstruction> {
    let window = OpcodeWindow::fetch(mem, pc)?;
    Ok(decode(&window))
}
