//! FIQL lexer: separates the reserved structural characters from the text
//! runs between them.

use crate::token::{Span, Token, TokenKind};

pub struct Lexer<'a> {
    input: &'a str,
    /// 输入字符串中的当前位置（字节索引）
    position: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Self {
        Lexer { input, position: 0 }
    }

    /// 返回当前位置的字符，不推进位置
    fn peek(&self) -> Option<char> {
        self.input[self.position..].chars().next()
    }

    /// 推进位置一个字符并返回该字符
    fn bump(&mut self) -> Option<char> {
        let c = self.peek();
        if let Some(c) = c {
            self.position += c.len_utf8();
        }
        c
    }

    /// Reads everything up to the next reserved character. Whitespace is part
    /// of the text; the grammar does not trim.
    fn read_text(&mut self, start: usize) -> Token<'a> {
        while let Some(c) = self.peek() {
            if is_reserved(c) {
                break;
            }
            self.bump();
        }
        Token {
            kind: TokenKind::Text(&self.input[start..self.position]),
            span: Span::new(start, self.position),
        }
    }
}

fn is_reserved(c: char) -> bool {
    matches!(c, '(' | ')' | ';' | ',')
}

impl<'a> Iterator for Lexer<'a> {
    type Item = Token<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let start = self.position;

        let c = self.peek()?;

        let kind = match c {
            '(' => TokenKind::LParen,
            ')' => TokenKind::RParen,
            ';' => TokenKind::Semicolon,
            ',' => TokenKind::Comma,
            _ => return Some(self.read_text(start)),
        };
        self.bump();
        Some(Token { kind, span: Span::new(start, self.position) })
    }
}
