//! Immediate field arithmetic. Values live in 32-bit signed registers;
//! each instruction constrains its immediate to a field width before use.

/// Mask `imm` down to its low `bits` bits.
pub fn trunc(imm: i32, bits: u32) -> i32 {
    imm & ((1 << bits) - 1)
}

/// Replicate the field's sign bit into the upper bits of the word.
pub fn sext(imm: i32, bits: u32) -> i32 {
    let msb = 1 << (bits - 1);
    if imm & msb != 0 {
        imm | !((1 << bits) - 1)
    } else {
        imm
    }
}

/// True when truncation to `bits` loses information, i.e. the value does
/// not round trip through `sext(trunc(v))`.
pub fn overflows(imm: i32, bits: u32) -> bool {
    sext(trunc(imm, bits), bits) != imm
}
