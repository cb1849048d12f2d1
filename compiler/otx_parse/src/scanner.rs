//! Byte-level scanning over template source.
//!
//! Text between markers is copied verbatim, so the scanner's job is to jump
//! from one marker opener to the next as fast as possible (`memchr` for `<`)
//! and to find where a marker body ends.

use memchr::memchr;

/// Kinds of marker opener. Any other `<` is plain text.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) enum Opener {
    /// `<&`
    Variable,
    /// `<:`
    Directive,
    /// `<.`
    Closer,
}

impl Opener {
    fn from_byte(b: u8) -> Option<Self> {
        match b {
            b'&' => Some(Opener::Variable),
            b':' => Some(Opener::Directive),
            b'.' => Some(Opener::Closer),
            _ => None,
        }
    }
}

pub(crate) struct Scanner<'a> {
    src: &'a str,
    pos: usize,
}

impl<'a> Scanner<'a> {
    pub(crate) fn new(src: &'a str) -> Self {
        Scanner { src, pos: 0 }
    }

    #[cfg(test)]
    pub(crate) fn pos(&self) -> usize {
        self.pos
    }

    #[inline]
    pub(crate) fn is_eof(&self) -> bool {
        self.pos >= self.src.len()
    }

    /// Advance to the next marker opener.
    ///
    /// Returns the text skipped over and, if an opener was found, its kind and
    /// position (the cursor is left on the `<`). A `<` not followed by an
    /// opener byte is part of the returned text.
    pub(crate) fn next_opener(&mut self) -> (&'a str, Option<(Opener, usize)>) {
        let bytes = self.src.as_bytes();
        let start = self.pos;
        let mut search = start;
        while let Some(off) = memchr(b'<', &bytes[search..]) {
            let lt = search + off;
            if let Some(opener) = bytes.get(lt + 1).copied().and_then(Opener::from_byte) {
                self.pos = lt;
                return (&self.src[start..lt], Some((opener, lt)));
            }
            search = lt + 1;
        }
        self.pos = self.src.len();
        (&self.src[start..], None)
    }

    /// Find the `>` ending the marker that starts at the cursor.
    ///
    /// A `>` inside a quoted string or inside parentheses/brackets does not end
    /// the marker. Comments (`<:--`) end at the first `>` regardless.
    pub(crate) fn marker_end(&self) -> Option<usize> {
        let bytes = self.src.as_bytes();
        let body = self.pos + 2;
        if bytes.get(body..body + 2) == Some(b"--".as_slice()) {
            return memchr(b'>', &bytes[body..]).map(|off| body + off);
        }
        let mut depth = 0usize;
        let mut quote: Option<u8> = None;
        let mut i = body;
        while i < bytes.len() {
            let b = bytes[i];
            match quote {
                Some(q) => {
                    if b == b'\\' {
                        i += 1;
                    } else if b == q {
                        quote = None;
                    }
                }
                None => match b {
                    b'"' | b'\'' => quote = Some(b),
                    b'(' | b'[' => depth += 1,
                    b')' | b']' => depth = depth.saturating_sub(1),
                    b'>' if depth == 0 => return Some(i),
                    _ => {}
                },
            }
            i += 1;
        }
        None
    }

    /// Move the cursor to `pos`.
    pub(crate) fn seek(&mut self, pos: usize) {
        self.pos = pos.min(self.src.len());
    }

    /// Skip all whitespace, newlines included.
    pub(crate) fn skip_whitespace(&mut self) {
        let rest = &self.src[self.pos..];
        self.pos += rest.len() - rest.trim_start().len();
    }

    /// Skip spaces and tabs only.
    pub(crate) fn skip_blanks(&mut self) {
        let bytes = self.src.as_bytes();
        while matches!(bytes.get(self.pos), Some(b' ' | b'\t')) {
            self.pos += 1;
        }
    }

    /// Skip a single `\n` or `\r\n`, if one is next.
    pub(crate) fn skip_newline(&mut self) {
        let rest = &self.src.as_bytes()[self.pos..];
        if rest.starts_with(b"\r\n") {
            self.pos += 2;
        } else if rest.starts_with(b"\n") {
            self.pos += 1;
        }
    }
}
