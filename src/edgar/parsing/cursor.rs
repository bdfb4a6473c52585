/// Forward cursor over an immutable line sequence with bounded lookahead.
#[derive(Debug, Clone)]
pub struct LineCursor<'a> {
    lines: &'a [String],
    pos: usize,
}

impl<'a> LineCursor<'a> {
    pub fn new(lines: &'a [String]) -> Self {
        Self { lines, pos: 0 }
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn is_done(&self) -> bool {
        self.pos >= self.lines.len()
    }

    pub fn current(&self) -> Option<&'a str> {
        self.peek(0)
    }

    /// Line `n` positions ahead of the current one (`0` is the current line).
    pub fn peek(&self, n: usize) -> Option<&'a str> {
        self.lines.get(self.pos + n).map(String::as_str)
    }

    /// First non-blank line strictly after `offset`, as `(offset, line)`.
    pub fn next_non_blank(&self, offset: usize) -> Option<(usize, &'a str)> {
        (offset + 1..)
            .map_while(|n| self.peek(n).map(|line| (n, line)))
            .find(|(_, line)| !line.trim().is_empty())
    }

    /// Moves past `k` lines.
    pub fn consume(&mut self, k: usize) {
        self.pos = (self.pos + k).min(self.lines.len());
    }

    pub fn remaining(&self) -> &'a [String] {
        &self.lines[self.pos.min(self.lines.len())..]
    }
}
