use crate::error::AsmError;
use arch::diag::Diags;
use arch::op::TokenKind;
use arch::reg::Reg;
use std::fmt;

/// One classified operand. An unresolvable register name still
/// classifies as a register, but carries no index; handlers treat it as
/// reading zero and discard writes through it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Token {
    Reg(Option<Reg>),
    Imm(i32),
}

impl Token {
    pub fn kind(&self) -> TokenKind {
        match self {
            Token::Reg(_) => TokenKind::Reg,
            Token::Imm(_) => TokenKind::Imm,
        }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Reg(Some(r)) => write!(f, "{r}"),
            Token::Reg(None) => write!(f, "?"),
            Token::Imm(v) => write!(f, "{v}"),
        }
    }
}

/// Split one instruction's operand substring on commas and classify each
/// atom. The load/store form `imm(reg)` yields two tokens, immediate
/// first. A `#` starts a trailing comment.
pub fn tokenize(args: &str, line: usize, diags: &mut Diags) -> Vec<Token> {
    let mut tokens = Vec::new();
    for raw in args.split(',') {
        let trimmed = raw.trim();
        if let Some((before, _)) = trimmed.split_once('#') {
            tokens.push(classify(before.trim(), line, diags));
            break;
        }
        if let (Some(open), Some(close)) = (trimmed.find('('), trimmed.find(')')) {
            if open < close {
                tokens.push(classify(trimmed[..open].trim(), line, diags));
                tokens.push(classify(trimmed[open + 1..close].trim(), line, diags));
                continue;
            }
        }
        tokens.push(classify(trimmed, line, diags));
    }
    tokens
}

fn classify(tok: &str, line: usize, diags: &mut Diags) -> Token {
    if tok.chars().next().is_some_and(|c| c.is_ascii_alphabetic()) {
        return match Reg::parse(tok) {
            Ok(reg) => Token::Reg(Some(reg)),
            Err(_) => {
                diags.error(line, AsmError::BadRegister(tok.to_string()));
                Token::Reg(None)
            }
        };
    }
    Token::Imm(parse_imm(tok, line, diags))
}

/// Signed decimal parse with `parseInt` semantics: the longest leading
/// `[+-]?digits` prefix counts, anything after it is ignored. No digits
/// at all is a diagnostic and reads as zero.
fn parse_imm(tok: &str, line: usize, diags: &mut Diags) -> i32 {
    let (neg, rest) = match tok.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, tok.strip_prefix('+').unwrap_or(tok)),
    };
    let digits: String = rest.chars().take_while(|c| c.is_ascii_digit()).collect();
    if digits.is_empty() {
        diags.error(line, AsmError::UnknownValue(tok.to_string()));
        return 0;
    }
    let mut value: i64 = 0;
    for c in digits.chars() {
        value = value.saturating_mul(10).saturating_add((c as u8 - b'0') as i64);
    }
    if neg {
        value = -value;
    }
    value as i32
}
