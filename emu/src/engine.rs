use crate::error::ExecError;
use crate::mem::Memory;
use arch::diag::Diags;
use arch::imm::{overflows, sext, trunc};
use arch::op::OpKind;
use rvasm::error::AsmError;
use rvasm::parser::Program;
use rvasm::token::{self, Token};

/// The instruction-level simulator. One engine exclusively owns its
/// register file, memory, resolved program and diagnostics; `step` runs
/// to completion before returning and is non-reentrant by construction
/// (`&mut self`).
///
/// The pc is always a multiple of 4 and addresses instruction records by
/// `pc / 4`. It is advanced *before* a handler runs, so handlers that
/// compute return addresses or relative targets subtract 4 to recover
/// the instruction's own slot.
#[derive(Debug, Default)]
pub struct Engine {
    program: Program,
    regs: [i32; 32],
    init_regs: [i32; 32],
    mem: Memory,
    pc: u32,
    line: usize,
    cycles: u64,
    diags: Diags,
}

impl Engine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve `src` into a fresh program and restart from a clean
    /// machine state. Resolution never fails; its anomalies land in the
    /// diagnostics log. Loading identical text twice gives the same
    /// observable state.
    pub fn load(&mut self, src: &str) {
        self.diags.clear();
        self.program = Program::parse(src, &mut self.diags);
        self.pc = 0;
        self.cycles = 0;
        self.mem.clear();
        self.regs = self.init_regs;
    }

    /// Initial values for x1..=x31; x0 stays zero no matter what.
    pub fn init_registers(&mut self, values: &[i32; 31]) {
        self.init_regs[0] = 0;
        self.init_regs[1..].copy_from_slice(values);
        self.regs = self.init_regs;
    }

    /// Restore pc, registers and memory, and drop all diagnostics. The
    /// resolved program is kept as-is.
    pub fn reset(&mut self) {
        self.pc = 0;
        self.cycles = 0;
        self.diags.clear();
        self.mem.clear();
        self.regs = self.init_regs;
    }

    /// Execute one instruction. Returns `false` without touching any
    /// state when the pc is terminal (misaligned or past the end).
    pub fn step(&mut self) -> bool {
        if self.is_halted() {
            return false;
        }
        let slot = (self.pc / 4) as usize;
        let line = &self.program.lines[slot];
        self.line = line.no;
        let text = line.text.clone();
        self.pc += 4;
        self.cycles += 1;
        self.exec(&text);
        true
    }

    /// Step until terminal. Interactive callers drive `step` themselves
    /// on their own cadence instead.
    pub fn run(&mut self) {
        while self.step() {}
    }

    pub fn is_halted(&self) -> bool {
        self.pc % 4 != 0 || (self.pc / 4) as usize >= self.program.len()
    }

    pub fn registers(&self) -> &[i32; 32] {
        &self.regs
    }

    pub fn diags(&self) -> &Diags {
        &self.diags
    }

    pub fn pc(&self) -> u32 {
        self.pc
    }

    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    pub fn program(&self) -> &Program {
        &self.program
    }

    pub fn memory(&self) -> &Memory {
        &self.mem
    }

    pub fn mem_get(&self, addr: u32) -> u8 {
        self.mem.get(addr)
    }

    pub fn is_valid_address(&self, addr: u32) -> bool {
        self.mem.is_valid(addr)
    }
}

// Decode and dispatch.
impl Engine {
    fn exec(&mut self, text: &str) {
        // A line with no whitespace never decodes and is skipped
        // silently.
        let Some((op, rest)) = text.split_once(char::is_whitespace) else {
            return;
        };
        let kind = match OpKind::parse(op) {
            Ok(kind) => kind,
            Err(_) => {
                self.diags.error(self.line, AsmError::UnknownOp(op.to_string()));
                return;
            }
        };
        let tokens = token::tokenize(rest, self.line, &mut self.diags);
        self.check_args(kind, &tokens);
        self.dispatch(kind, &tokens);
    }

    /// Arity and type validation. Mismatches are reported but never
    /// abort dispatch; the handler still runs on whatever was parsed.
    fn check_args(&mut self, kind: OpKind, tokens: &[Token]) {
        let sig = kind.sig();
        if tokens.len() < sig.len() {
            self.diags.error(self.line, AsmError::TooFewArgs(kind.format()));
        }
        if tokens.len() > sig.len() {
            let extra = tokens[sig.len()..]
                .iter()
                .map(|t| t.to_string())
                .collect::<Vec<_>>()
                .join(", ");
            self.diags.error(self.line, AsmError::ExtraArgs(kind.format(), extra));
        }
        for (token, want) in tokens.iter().zip(sig) {
            if token.kind() != *want {
                self.diags.error(self.line, AsmError::BadArgType(kind.format()));
            }
        }
    }

    fn dispatch(&mut self, kind: OpKind, t: &[Token]) {
        use OpKind::*;
        match kind {
            ADD => self.alu3(t, |a, b| a.wrapping_add(b)),
            SUB => self.alu3(t, |a, b| a.wrapping_sub(b)),
            MULT => self.alu3(t, |a, b| a.wrapping_mul(b)),
            AND => self.alu3(t, |a, b| a & b),
            OR => self.alu3(t, |a, b| a | b),
            XOR => self.alu3(t, |a, b| a ^ b),
            SLT => self.alu3(t, |a, b| (a < b) as i32),
            SLTU => self.alu3(t, |a, b| ((a as u32) < (b as u32)) as i32),
            SLL => self.alu3(t, |a, b| a.wrapping_shl(b as u32 & 0x1f)),
            SRL => self.alu3(t, |a, b| ((a as u32) >> (b as u32 & 0x1f)) as i32),
            SRA => self.alu3(t, |a, b| a >> (b as u32 & 0x1f)),

            ADDI => self.alui(t, |a, b| a.wrapping_add(b)),
            ANDI => self.alui(t, |a, b| a & b),
            ORI => self.alui(t, |a, b| a | b),
            XORI => self.alui(t, |a, b| a ^ b),
            SLTI => self.alui(t, |a, b| (a < b) as i32),
            SLTIU => self.alui(t, |a, b| ((a as u32) < (b as u32)) as i32),

            SLLI => self.shifti(t, |a, sh| a.wrapping_shl(sh)),
            SRLI => self.shifti(t, |a, sh| ((a as u32) >> sh) as i32),
            SRAI => self.shifti(t, |a, sh| a >> sh),

            LW => self.lw(t),
            SW => self.sw(t),
            LB => self.lb(t),
            SB => self.sb(t),

            BEQ => self.branch(t, |a, b| a == b),
            BNE => self.branch(t, |a, b| a != b),
            BLT => self.branch(t, |a, b| a < b),
            BGE => self.branch(t, |a, b| a >= b),
            BGEU => self.branch(t, |a, b| (a as u32) >= (b as u32)),
            BLTU => self.bltu(t),

            JAL => self.jal(t),
            JALR => self.jalr(t),
            LUI => self.lui(t),
            AUIPC => self.auipc(t),
        }
    }
}

// Operand access. A token that failed register classification (or a
// position that was never supplied) reads as zero and swallows writes.
fn reg_at(tokens: &[Token], i: usize) -> Option<u8> {
    match tokens.get(i) {
        Some(Token::Reg(Some(r))) => Some(r.index() as u8),
        Some(Token::Reg(None)) | None => None,
        // A type-mismatched immediate is used as a register number when
        // it names one; the mismatch was already reported.
        Some(Token::Imm(v)) => u8::try_from(*v).ok().filter(|n| *n < 32),
    }
}

fn imm_at(tokens: &[Token], i: usize) -> i32 {
    match tokens.get(i) {
        Some(Token::Imm(v)) => *v,
        Some(Token::Reg(Some(r))) => r.index() as i32,
        Some(Token::Reg(None)) | None => 0,
    }
}

// Instruction semantics.
impl Engine {
    fn rr(&self, r: Option<u8>) -> i32 {
        r.map_or(0, |r| self.regs[r as usize])
    }

    fn wr(&mut self, r: Option<u8>, value: i32) {
        if let Some(r) = r {
            if r != 0 {
                self.regs[r as usize] = value;
            }
        }
    }

    /// Truncate to the field width and sign-extend back. A value that
    /// does not survive the round trip is flagged, then used truncated.
    fn field(&mut self, imm: i32, bits: u32) -> i32 {
        if overflows(imm, bits) {
            self.diags.warn(self.line, ExecError::ImmTruncated(imm, bits));
        }
        sext(trunc(imm, bits), bits)
    }

    /// Shift amounts are masked to 5 bits, never sign-extended.
    fn shamt(&mut self, imm: i32) -> u32 {
        if trunc(imm, 5) != imm {
            self.diags.warn(self.line, ExecError::ImmTruncated(imm, 5));
        }
        trunc(imm, 5) as u32
    }

    fn alu3(&mut self, t: &[Token], f: impl Fn(i32, i32) -> i32) {
        let rd = reg_at(t, 0);
        let a = self.rr(reg_at(t, 1));
        let b = self.rr(reg_at(t, 2));
        self.wr(rd, f(a, b));
    }

    fn alui(&mut self, t: &[Token], f: impl Fn(i32, i32) -> i32) {
        let rd = reg_at(t, 0);
        let a = self.rr(reg_at(t, 1));
        let imm = self.field(imm_at(t, 2), 12);
        self.wr(rd, f(a, imm));
    }

    fn shifti(&mut self, t: &[Token], f: impl Fn(i32, u32) -> i32) {
        let rd = reg_at(t, 0);
        let a = self.rr(reg_at(t, 1));
        let sh = self.shamt(imm_at(t, 2));
        self.wr(rd, f(a, sh));
    }

    /// `base + sext12(offset)` for the `imm(rs1)` memory form.
    fn effective_addr(&mut self, t: &[Token]) -> i32 {
        let imm = self.field(imm_at(t, 1), 12);
        self.rr(reg_at(t, 2)).wrapping_add(imm)
    }

    fn check_word_range(&mut self, loc: i32) {
        let lo = loc as u32;
        let hi = lo.wrapping_add(3);
        if !self.mem.is_valid(lo) || !self.mem.is_valid(hi) {
            self.diags.error(self.line, ExecError::InvalidRange(lo, hi));
        }
    }

    fn lw(&mut self, t: &[Token]) {
        let rd = reg_at(t, 0);
        let loc = self.effective_addr(t);
        if loc % 4 != 0 {
            self.diags.error(self.line, ExecError::MisalignedLoad(loc));
        }
        self.check_word_range(loc);
        // The access proceeds byte by byte even when misaligned.
        let word = self.mem.word(loc as u32);
        self.wr(rd, word as i32);
    }

    fn sw(&mut self, t: &[Token]) {
        let value = self.rr(reg_at(t, 0));
        let loc = self.effective_addr(t);
        if loc % 4 != 0 {
            self.diags.error(self.line, ExecError::MisalignedStore(loc));
        }
        self.check_word_range(loc);
        for (i, byte) in value.to_le_bytes().into_iter().enumerate() {
            self.mem.set((loc as u32).wrapping_add(i as u32), byte);
        }
    }

    fn lb(&mut self, t: &[Token]) {
        let rd = reg_at(t, 0);
        let loc = self.effective_addr(t);
        let addr = loc as u32;
        if !self.mem.is_valid(addr) {
            self.diags.error(self.line, ExecError::InvalidAddress(addr));
        }
        self.wr(rd, sext(self.mem.get(addr) as i32, 8));
    }

    fn sb(&mut self, t: &[Token]) {
        let value = self.rr(reg_at(t, 0));
        let loc = self.effective_addr(t);
        let addr = loc as u32;
        if !self.mem.is_valid(addr) {
            self.diags.error(self.line, ExecError::InvalidAddress(addr));
        }
        self.mem.set(addr, value as u8);
    }

    /// Valid control-flow targets are aligned and within `0..=4*len`;
    /// landing exactly on the end address is a normal halt.
    fn target_valid(&self, target: i64) -> bool {
        target >= 0 && target % 4 == 0 && (target / 4) as usize <= self.program.len()
    }

    fn branch(&mut self, t: &[Token], pred: impl Fn(i32, i32) -> bool) {
        let rs1 = reg_at(t, 0);
        let rs2 = reg_at(t, 1);
        let offset = self.field(imm_at(t, 2), 13);
        self.take_branch(rs1, rs2, offset, pred);
    }

    /// `bltu` is `bgeu` with the operands swapped, except that equal
    /// operands short-circuit to "never taken".
    fn bltu(&mut self, t: &[Token]) {
        let rs1 = reg_at(t, 0);
        let rs2 = reg_at(t, 1);
        let offset = self.field(imm_at(t, 2), 13);
        if self.rr(rs1) == self.rr(rs2) {
            self.take_branch(rs1, rs2, offset, |_, _| false);
        } else {
            self.take_branch(rs2, rs1, offset, |a, b| (a as u32) >= (b as u32));
        }
    }

    fn take_branch(
        &mut self,
        rs1: Option<u8>,
        rs2: Option<u8>,
        offset: i32,
        pred: impl Fn(i32, i32) -> bool,
    ) {
        if offset % 4 != 0 {
            self.diags
                .error(self.line, ExecError::MisalignedBranchOffset(offset));
            return;
        }
        // pc already points past this instruction.
        let target = self.pc as i64 - 4 + offset as i64;
        if !self.target_valid(target) {
            self.diags.error(self.line, ExecError::BadBranchTarget(target));
            return;
        }
        if pred(self.rr(rs1), self.rr(rs2)) {
            self.pc = target as u32;
        }
    }

    fn jal(&mut self, t: &[Token]) {
        let rd = reg_at(t, 0);
        let return_pc = self.pc as i32;
        let imm = self.field(imm_at(t, 1), 21);
        let target = self.pc as i64 - 4 + imm as i64;
        if self.target_valid(target) {
            self.pc = target as u32;
        } else {
            self.diags.error(self.line, ExecError::BadJumpTarget(target));
        }
        // The link register is written whether or not the jump lands.
        self.wr(rd, return_pc);
    }

    fn jalr(&mut self, t: &[Token]) {
        let rd = reg_at(t, 0);
        let return_pc = self.pc as i32;
        let imm = self.field(imm_at(t, 2), 21);
        let target = (self.rr(reg_at(t, 1)).wrapping_add(imm) & !1) as i64;
        if self.target_valid(target) {
            self.pc = target as u32;
        } else {
            self.diags.error(self.line, ExecError::BadJumpTarget(target));
        }
        self.wr(rd, return_pc);
    }

    fn lui(&mut self, t: &[Token]) {
        let rd = reg_at(t, 0);
        let imm = imm_at(t, 1);
        // 20-bit field, not sign-extended.
        if trunc(imm, 20) != imm {
            self.diags.warn(self.line, ExecError::ImmTruncated(imm, 20));
        }
        self.wr(rd, ((trunc(imm, 20) as u32) << 12) as i32);
    }

    fn auipc(&mut self, t: &[Token]) {
        let rd = reg_at(t, 0);
        let imm = self.field(imm_at(t, 1), 20);
        let value = (self.pc as i32 - 4).wrapping_add(imm.wrapping_shl(12));
        self.wr(rd, value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine_with(src: &str) -> Engine {
        let mut engine = Engine::new();
        engine.load(src);
        engine
    }

    #[test]
    fn x0_writes_are_discarded() {
        let mut engine = engine_with("addi x0, x0, 5\nadd x0, x1, x1\nlui x0, 1\n");
        engine.run();
        assert_eq!(engine.registers()[0], 0);
        assert!(engine.diags().is_empty());
    }

    #[test]
    fn unknown_op_is_reported_and_skipped() {
        let mut engine = engine_with("frobnicate x1, x2\naddi x1, x0, 3\n");
        engine.run();
        assert!(engine.diags().mentions("Unsupported op"));
        assert_eq!(engine.registers()[1], 3);
    }

    #[test]
    fn opcode_without_operands_is_a_silent_no_op() {
        let mut engine = engine_with("nop\naddi x1, x0, 1\n");
        engine.run();
        assert!(engine.diags().is_empty());
        assert_eq!(engine.registers()[1], 1);
        assert_eq!(engine.cycles(), 2);
    }

    #[test]
    fn too_few_arguments_reported_but_execution_continues() {
        let mut engine = engine_with("add x1, x2\naddi x3, x0, 9\n");
        engine.run();
        assert!(engine.diags().mentions("Too few arguments"));
        assert_eq!(engine.registers()[3], 9);
    }

    #[test]
    fn extra_arguments_are_listed() {
        let mut engine = engine_with("jal x1, 4, 8\n");
        engine.run();
        assert!(engine.diags().mentions("Extra arguments"));
    }

    #[test]
    fn type_mismatch_still_dispatches_with_parsed_values() {
        // The immediate 5 in a register slot reads register x5.
        let mut engine = engine_with("addi x5, x0, 11\nadd x1, x0, 5\n");
        engine.run();
        assert!(engine.diags().mentions("Incorrect argument type"));
        assert_eq!(engine.registers()[1], 11);
    }

    #[test]
    fn terminal_step_is_a_no_op() {
        let mut engine = engine_with("addi x1, x0, 1\n");
        assert!(engine.step());
        assert!(!engine.step());
        assert_eq!(engine.cycles(), 1);
        assert_eq!(engine.pc(), 4);
    }

    #[test]
    fn empty_program_is_immediately_terminal() {
        let mut engine = engine_with("");
        assert!(engine.is_halted());
        assert!(!engine.step());
    }

    #[test]
    fn shift_amounts_mask_to_five_bits() {
        let mut engine = engine_with(
            "addi x1, x0, 1\naddi x2, x0, 33\nsll x3, x1, x2\nsrl x4, x1, x2\n",
        );
        engine.run();
        // 33 & 0x1f == 1
        assert_eq!(engine.registers()[3], 2);
        assert_eq!(engine.registers()[4], 0);
    }

    #[test]
    fn oversized_immediate_warns_and_truncates() {
        let mut engine = engine_with("addi x1, x0, 5000\nslli x2, x1, 33\n");
        engine.run();
        assert!(engine.diags().mentions("exceeds 12-bit field"));
        assert!(engine.diags().mentions("exceeds 5-bit field"));
        // Warnings only, and the truncated values are still used:
        // 5000 & 0xfff == 904 with the field's sign bit clear, and the
        // shift amount 33 masks to 1.
        assert!(!engine.diags().has_error());
        assert_eq!(engine.registers()[1], 904);
        assert_eq!(engine.registers()[2], 1808);
    }

    #[test]
    fn sra_keeps_the_sign() {
        let mut engine = engine_with("addi x1, x0, -8\nsrai x2, x1, 1\nsrli x3, x1, 1\n");
        engine.run();
        assert_eq!(engine.registers()[2], -4);
        assert_eq!(engine.registers()[3], ((-8i32 as u32) >> 1) as i32);
    }

    #[test]
    fn sltu_compares_unsigned() {
        let mut engine = engine_with("addi x1, x0, -1\naddi x2, x0, 1\nsltu x3, x2, x1\nslt x4, x2, x1\n");
        engine.run();
        // -1 is 0xffffffff unsigned, so unsigned 1 < -1 but signed 1 > -1.
        assert_eq!(engine.registers()[3], 1);
        assert_eq!(engine.registers()[4], 0);
    }

    #[test]
    fn jalr_clears_the_low_bit() {
        let mut engine = engine_with("addi x2, x0, 9\njalr x1, x2, 0\naddi x3, x0, 1\n");
        engine.step();
        engine.step();
        // target (9 + 0) & !1 == 8: the third instruction's slot.
        assert_eq!(engine.pc(), 8);
        assert_eq!(engine.registers()[1], 8);
    }

    #[test]
    fn lb_sign_extends_the_loaded_byte() {
        let mut engine = engine_with("addi x1, x0, -1\nsb x1, 0(x0)\nlb x2, 0(x0)\n");
        engine.run();
        assert_eq!(engine.mem_get(0), 0xff);
        assert_eq!(engine.registers()[2], -1);
    }

    #[test]
    fn sw_stores_little_endian_bytes() {
        let mut engine = engine_with("addi x1, x0, 258\nsw x1, 4(x0)\n");
        engine.run();
        assert_eq!(engine.mem_get(4), 0x02);
        assert_eq!(engine.mem_get(5), 0x01);
        assert_eq!(engine.mem_get(6), 0x00);
        assert_eq!(engine.mem_get(7), 0x00);
        assert!(engine.diags().is_empty());
    }

    #[test]
    fn reset_restores_initial_state_but_keeps_the_program() {
        let mut engine = Engine::new();
        let mut init = [0i32; 31];
        init[0] = 7; // x1
        engine.init_registers(&init);
        engine.load("addi x1, x1, 1\nsw x1, 0(x0)\nbadop x, y\n");
        engine.run();
        assert_eq!(engine.registers()[1], 8);
        assert!(!engine.diags().is_empty());
        engine.reset();
        assert_eq!(engine.pc(), 0);
        assert_eq!(engine.cycles(), 0);
        assert!(engine.diags().is_empty());
        assert_eq!(engine.registers()[1], 7);
        assert_eq!(engine.registers()[0], 0);
        assert_eq!(engine.mem_get(0), 0);
        assert_eq!(engine.program().len(), 3);
    }

    #[test]
    fn branch_to_misaligned_offset_is_not_taken() {
        let mut engine = engine_with("addi x1, x0, 1\nbeq x0, x0, 6\naddi x2, x0, 5\n");
        engine.run();
        assert!(engine.diags().mentions("Misaligned branch offset"));
        // Fell through to the next instruction.
        assert_eq!(engine.registers()[2], 5);
    }

    #[test]
    fn branch_outside_program_range_leaves_pc_alone() {
        let mut engine = engine_with("beq x0, x0, -8\naddi x1, x0, 2\n");
        engine.run();
        assert!(engine.diags().mentions("Bad branch target"));
        assert_eq!(engine.registers()[1], 2);
    }

    #[test]
    fn jump_to_program_end_halts_cleanly() {
        let mut engine = engine_with("jal x0, 8\naddi x1, x0, 1\n");
        engine.run();
        // Target 8 is exactly the end address: allowed, halts, skips line 2.
        assert!(engine.diags().is_empty());
        assert_eq!(engine.registers()[1], 0);
        assert_eq!(engine.cycles(), 1);
    }

    #[test]
    fn unresolvable_register_reads_zero_and_swallows_writes() {
        let mut engine = engine_with("addi x1, x0, 3\nadd foo, x1, x1\nadd x2, foo, x1\n");
        engine.run();
        assert!(engine.diags().mentions("Invalid register"));
        assert_eq!(engine.registers()[2], 3);
    }
}
