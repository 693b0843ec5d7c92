use color_print::cformat;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagKind {
    Error,
    Warn,
}

/// One recorded anomaly, tagged with the 1-based source line it came from.
#[derive(Debug, Clone)]
pub struct Diag {
    pub kind: DiagKind,
    pub line: usize,
    pub msg: String,
}

impl fmt::Display for Diag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [line {}]", self.msg, self.line)
    }
}

impl Diag {
    pub fn cformat(&self) -> String {
        match self.kind {
            DiagKind::Error => {
                cformat!("<red,bold>error</>: {} <blue>[line {}]</>", self.msg, self.line)
            }
            DiagKind::Warn => {
                cformat!("<yellow,bold>warn</>: {} <blue>[line {}]</>", self.msg, self.line)
            }
        }
    }
}

/// Append-only diagnostics log. Execution never stops on an anomaly;
/// everything lands here and is cleared only on reset or reload.
#[derive(Debug, Default)]
pub struct Diags {
    list: Vec<Diag>,
}

impl Diags {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn error(&mut self, line: usize, msg: impl fmt::Display) {
        self.list.push(Diag {
            kind: DiagKind::Error,
            line,
            msg: msg.to_string(),
        });
    }

    pub fn warn(&mut self, line: usize, msg: impl fmt::Display) {
        self.list.push(Diag {
            kind: DiagKind::Warn,
            line,
            msg: msg.to_string(),
        });
    }

    pub fn clear(&mut self) {
        self.list.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.list.is_empty()
    }

    pub fn len(&self) -> usize {
        self.list.len()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Diag> {
        self.list.iter()
    }

    pub fn has_error(&self) -> bool {
        self.list.iter().any(|d| d.kind == DiagKind::Error)
    }

    /// True if any entry's message contains `pat`. Convenience for tests
    /// and callers that match on message text.
    pub fn mentions(&self, pat: &str) -> bool {
        self.list.iter().any(|d| d.msg.contains(pat))
    }
}

impl<'a> IntoIterator for &'a Diags {
    type Item = &'a Diag;
    type IntoIter = std::slice::Iter<'a, Diag>;
    fn into_iter(self) -> Self::IntoIter {
        self.list.iter()
    }
}
