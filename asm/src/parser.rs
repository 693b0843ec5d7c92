use crate::error::AsmError;
use crate::label::Labels;
use arch::diag::Diags;
use arch::op::OpKind;

/// Branch offsets with a missing label get an offset that lands far past
/// the end of any program, so a run falls through instead of looping.
const JUMP_SENTINEL: i64 = 0x2ffffff << 2;
const BRANCH_SENTINEL: i64 = 0x7fff << 2;

/// One filtered instruction. Record `i` occupies pc `4 * i`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Line {
    /// Normalized text with label references replaced by offsets.
    pub text: String,
    /// 1-based source line number, for diagnostics.
    pub no: usize,
    /// The comment-stripped source text, for display.
    pub raw: String,
}

/// A resolved program: labels collected, references linked. Immutable
/// once built; any source edit means building a fresh one.
#[derive(Debug, Default, Clone)]
pub struct Program {
    pub lines: Vec<Line>,
    pub labels: Labels,
}

impl Program {
    /// Resolution is total: anomalies become diagnostics and the result
    /// is always executable, possibly with sentinel offsets.
    pub fn parse(src: &str, diags: &mut Diags) -> Program {
        let (lines, labels) = filter(src, diags);
        let lines = link(lines, &labels, diags);
        Program { lines, labels }
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

/// Filter pass: strip comments and blanks, collect label declarations,
/// keep instruction lines with their 1-based source line numbers.
fn filter(src: &str, diags: &mut Diags) -> (Vec<Line>, Labels) {
    let mut lines = Vec::new();
    let mut labels = Labels::new();
    for (idx, raw) in src.lines().enumerate() {
        let no = idx + 1;
        let code = match raw.split_once('#') {
            Some((code, _)) => code,
            None => raw,
        };
        let code = code.trim();
        if let Some(name) = code.strip_suffix(':') {
            if name.chars().next().is_some_and(|c| c.is_ascii_digit()) {
                diags.error(no, AsmError::DigitLabel(name.to_string()));
                continue;
            }
            if !labels.define(name, lines.len()) {
                diags.error(no, AsmError::DuplicateLabel(name.to_string()));
            }
        } else if !code.is_empty() {
            lines.push(Line {
                text: code.to_string(),
                no,
                raw: code.to_string(),
            });
        }
    }
    (lines, labels)
}

/// Link pass: for branch and jump-immediate ops the last operand is a
/// label reference; replace it with a pc-relative byte offset, scaled by
/// 4 since each record is one 4-byte slot. Also normalizes every spaced
/// instruction to `op arg, arg` form with a lowercased mnemonic.
fn link(mut lines: Vec<Line>, labels: &Labels, diags: &mut Diags) -> Vec<Line> {
    for (index, line) in lines.iter_mut().enumerate() {
        let Some((op, rest)) = line.text.split_once(char::is_whitespace) else {
            continue;
        };
        let op = op.trim().to_ascii_lowercase();
        let mut args: Vec<String> = rest.split(',').map(|t| t.trim().to_string()).collect();
        if let Ok(kind) = OpKind::parse(&op) {
            if kind.is_jump_imm() || kind.is_branch() {
                let last = args.len() - 1;
                let target = args[last].clone();
                match labels.get(&target) {
                    Some(target_index) => {
                        args[last] = ((target_index as i64 - index as i64) << 2).to_string();
                    }
                    None if !is_int_literal(&target) => {
                        diags.error(line.no, AsmError::MissingLabel(target));
                        let sentinel = if kind.is_jump_imm() {
                            JUMP_SENTINEL
                        } else {
                            BRANCH_SENTINEL
                        };
                        args[last] = sentinel.to_string();
                    }
                    None => {}
                }
            }
        }
        line.text = format!("{} {}", op, args.join(", "));
    }
    lines
}

/// "Already numeric" means an optional sign followed by at least one
/// digit; such operands pass through the linker untouched.
fn is_int_literal(s: &str) -> bool {
    let rest = s.strip_prefix(['+', '-']).unwrap_or(s);
    rest.chars().next().is_some_and(|c| c.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(src: &str) -> (Program, Diags) {
        let mut diags = Diags::new();
        let program = Program::parse(src, &mut diags);
        (program, diags)
    }

    #[test]
    fn empty_source_is_an_empty_program() {
        let (program, diags) = parse("");
        assert!(program.is_empty());
        assert!(diags.is_empty());
        let (program, _) = parse("\n  \n# only a comment\n");
        assert!(program.is_empty());
    }

    #[test]
    fn comments_and_blanks_are_dropped() {
        let (program, diags) = parse("addi x1, x0, 5 # set up\n\n# nothing\naddi x2, x1, 10\n");
        assert_eq!(program.len(), 2);
        assert_eq!(program.lines[0].no, 1);
        assert_eq!(program.lines[1].no, 4);
        assert!(diags.is_empty());
    }

    #[test]
    fn label_points_at_the_following_instruction() {
        let (program, diags) = parse("loop:\naddi x1, x1, 1\nbne x1, x0, loop\n");
        assert_eq!(program.labels.get("loop"), Some(0));
        assert_eq!(program.len(), 2);
        // bne at index 1 branches back to index 0: offset (0 - 1) << 2.
        assert_eq!(program.lines[1].text, "bne x1, x0, -4");
        assert!(diags.is_empty());
    }

    #[test]
    fn forward_reference_links_too() {
        let (program, _) = parse("jal x1, end\naddi x1, x0, 1\nend:\naddi x2, x0, 2\n");
        assert_eq!(program.labels.get("end"), Some(2));
        assert_eq!(program.lines[0].text, "jal x1, 8");
    }

    #[test]
    fn numeric_offsets_pass_through_unchanged() {
        let (program, diags) = parse("beq x1, x2, 8\njal x0, -4\n");
        assert_eq!(program.lines[0].text, "beq x1, x2, 8");
        assert_eq!(program.lines[1].text, "jal x0, -4");
        assert!(diags.is_empty());
    }

    #[test]
    fn missing_label_gets_the_sentinel() {
        let (program, diags) = parse("jal x1, missing\n");
        assert!(diags.mentions("Could not find label"));
        assert_eq!(program.lines[0].text, format!("jal x1, {}", 0x2ffffff << 2));

        let (program, diags) = parse("bne x1, x0, missing\n");
        assert!(diags.mentions("Could not find label"));
        assert_eq!(program.lines[0].text, format!("bne x1, x0, {}", 0x7fff << 2));
    }

    #[test]
    fn duplicate_label_keeps_first_index() {
        let (program, diags) = parse("a:\naddi x1, x0, 1\na:\naddi x2, x0, 2\n");
        assert_eq!(program.labels.get("a"), Some(0));
        assert!(diags.mentions("multiple instances"));
    }

    #[test]
    fn digit_led_label_is_rejected() {
        let (program, diags) = parse("1st:\naddi x1, x0, 1\n");
        assert!(diags.mentions("cannot start with a number"));
        assert!(!program.labels.contains("1st"));
        assert_eq!(program.len(), 1);
    }

    #[test]
    fn spaced_lines_are_normalized() {
        let (program, _) = parse("ADDI  x1,x0,  5\n");
        assert_eq!(program.lines[0].text, "addi x1, x0, 5");
    }

    #[test]
    fn label_and_code_share_a_line_only_when_colon_ends_it() {
        // "foo: addi ..." does not end with ':' so it stays an instruction.
        let (program, _) = parse("foo: addi x1, x0, 1\n");
        assert!(!program.labels.contains("foo"));
        assert_eq!(program.len(), 1);
    }
}
