use crate::mem::Memory;

/// Bytes scanned for a dump. Sparse memory beyond this window is not
/// representable in the image format and is left out.
const SCAN_BYTES: u32 = 1 << 20;

/// Render memory as a "v2.0 raw" image: little-endian words in hex with
/// leading zeros stripped, eight per line, and zero runs longer than
/// three collapsed to `N*0`. A trailing zero run is dropped entirely,
/// and an all-zero memory dumps as a single `0`.
pub fn dump(mem: &Memory) -> String {
    let mut tokens: Vec<String> = Vec::new();
    let mut zeros = 0usize;
    for addr in (0..SCAN_BYTES).step_by(4) {
        let word = mem.word(addr);
        if word == 0 {
            zeros += 1;
            continue;
        }
        if zeros > 3 {
            tokens.push(format!("{}*0", zeros));
        } else {
            for _ in 0..zeros {
                tokens.push("0".to_string());
            }
        }
        zeros = 0;
        tokens.push(format!("{:x}", word));
    }
    let mut out = String::from("v2.0 raw\n");
    for (i, token) in tokens.iter().enumerate() {
        out.push_str(token);
        out.push(' ');
        if i % 8 == 7 {
            out.push('\n');
        }
    }
    if out == "v2.0 raw\n" {
        out.push('0');
    }
    out.trim().to_string()
}
