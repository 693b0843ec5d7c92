use strum::{Display, EnumString};

/// Operand classification produced by the tokenizer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Reg,
    Imm,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumString, Display)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum OpKind {
    ADD,
    SUB,
    MULT,
    AND,
    OR,
    XOR,
    SLT,
    SLTU,
    ADDI,
    ANDI,
    ORI,
    XORI,
    SLTI,
    SLTIU,
    SLL,
    SRL,
    SRA,
    SLLI,
    SRLI,
    SRAI,
    LW,
    SW,
    LB,
    SB,
    BEQ,
    BNE,
    BLT,
    BGE,
    BLTU,
    BGEU,
    JAL,
    JALR,
    LUI,
    AUIPC,
}

const RRR: &[TokenKind] = &[TokenKind::Reg, TokenKind::Reg, TokenKind::Reg];
const RRI: &[TokenKind] = &[TokenKind::Reg, TokenKind::Reg, TokenKind::Imm];
const RIR: &[TokenKind] = &[TokenKind::Reg, TokenKind::Imm, TokenKind::Reg];
const RI: &[TokenKind] = &[TokenKind::Reg, TokenKind::Imm];

impl OpKind {
    pub fn parse(s: &str) -> Result<Self, String> {
        match s.parse::<Self>() {
            Ok(a) => Ok(a),
            Err(_) => Err(format!("Unsupported op: `{s}`")),
        }
    }

    /// Expected operand types, in source order. Memory ops take the
    /// `rd, imm(rs1)` form, which the tokenizer flattens to reg, imm, reg.
    pub fn sig(&self) -> &'static [TokenKind] {
        use OpKind::*;
        match self {
            ADD | SUB | MULT | AND | OR | XOR | SLT | SLTU | SLL | SRL | SRA => RRR,
            ADDI | ANDI | ORI | XORI | SLTI | SLTIU | SLLI | SRLI | SRAI => RRI,
            LW | SW | LB | SB => RIR,
            BEQ | BNE | BLT | BGE | BLTU | BGEU => RRI,
            JAL | LUI | AUIPC => RI,
            JALR => RRI,
        }
    }

    /// Human readable operand shape, used in argument diagnostics.
    pub fn format(&self) -> &'static str {
        use OpKind::*;
        match self {
            ADD => "add rd, rs1, rs2",
            SUB => "sub rd, rs1, rs2",
            MULT => "mult rd, rs1, rs2",
            AND => "and rd, rs1, rs2",
            OR => "or rd, rs1, rs2",
            XOR => "xor rd, rs1, rs2",
            SLT => "slt rd, rs1, rs2",
            SLTU => "sltu rd, rs1, rs2",
            ADDI => "addi rd, rs1, imm",
            ANDI => "andi rd, rs1, imm",
            ORI => "ori rd, rs1, imm",
            XORI => "xori rd, rs1, imm",
            SLTI => "slti rd, rs1, imm",
            SLTIU => "sltiu rd, rs1, imm",
            SLL => "sll rd, rs1, rs2",
            SRL => "srl rd, rs1, rs2",
            SRA => "sra rd, rs1, rs2",
            SLLI => "slli rd, rs1, imm",
            SRLI => "srli rd, rs1, imm",
            SRAI => "srai rd, rs1, imm",
            LW => "lw rd, imm(rs1)",
            SW => "sw rs2, imm(rs1)",
            LB => "lb rd, imm(rs1)",
            SB => "sb rs2, imm(rs1)",
            BEQ => "beq rs1, rs2, imm",
            BNE => "bne rs1, rs2, imm",
            BLT => "blt rs1, rs2, imm",
            BGE => "bge rs1, rs2, imm",
            BLTU => "bltu rs1, rs2, imm",
            BGEU => "bgeu rs1, rs2, imm",
            JAL => "jal rd, imm",
            JALR => "jalr rd, rs1, imm",
            LUI => "lui rd, imm",
            AUIPC => "auipc rd, imm",
        }
    }

    /// Ops whose last operand the linker treats as a label reference.
    pub fn is_jump_imm(&self) -> bool {
        matches!(self, OpKind::JAL | OpKind::JALR)
    }

    pub fn is_branch(&self) -> bool {
        use OpKind::*;
        matches!(self, BEQ | BNE | BLT | BGE | BLTU | BGEU)
    }
}
