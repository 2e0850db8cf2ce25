use std::ops::Range;

use logos::Logos;

use crate::tokens::Token;
use crate::tokens::TokenKind;

/// Flat tokens produced by logos. The [`Scanner`] classifies these further
/// using one or two tokens of lookahead.
#[derive(Logos, Debug, Clone, Copy, PartialEq)]
enum RawToken {
	#[regex(r"[ \t\r\n]+")]
	Whitespace,
	#[regex(r"[A-Za-z0-9-]+")]
	Ident,
	#[token("<")]
	LeftAngle,
	#[token("/>")]
	SelfClosing,
	#[token("/")]
	Slash,
	#[token(">")]
	RightAngle,
	#[token("=")]
	Assign,
	#[token("'")]
	SingleQuote,
	#[token("\"")]
	DoubleQuote,
	#[token("`")]
	Backtick,
	#[token("\\'")]
	EscSingleQuote,
	#[token("\\\"")]
	EscDoubleQuote,
	#[token("\\")]
	BackSlash,
	#[regex(r#"[^ \t\r\nA-Za-z0-9<>/='"`\\-]"#)]
	Other,
}

/// Saved [`Scanner`] state, see [`Scanner::checkpoint`].
#[derive(Debug, Clone, Copy)]
pub struct Checkpoint<'a> {
	cursor: usize,
	offset: usize,
	line: usize,
	pushback: Option<Token<'a>>,
}

/// Pulls [`Token`]s out of a source buffer one at a time.
///
/// Supports a single token of pushback through [`Scanner::unread`], which also
/// restores the line and offset bookkeeping.
pub struct Scanner<'a> {
	source: &'a str,
	raw_tokens: Vec<(RawToken, Range<usize>)>,
	/// Index of the next raw token to classify.
	cursor: usize,
	/// Byte offset just past the last token handed out.
	offset: usize,
	/// Line of the byte at `offset`.
	line: usize,
	pushback: Option<Token<'a>>,
}

impl<'a> Scanner<'a> {
	pub fn new(source: &'a str) -> Self {
		let raw_tokens = RawToken::lexer(source)
			.spanned()
			.map(|(token, span)| (token.unwrap_or(RawToken::Other), span))
			.collect();

		Self {
			source,
			raw_tokens,
			cursor: 0,
			offset: 0,
			line: 1,
			pushback: None,
		}
	}

	/// The current byte offset.
	pub fn offset(&self) -> usize {
		self.offset
	}

	/// The current 1-indexed line.
	pub fn line(&self) -> usize {
		self.line
	}

	pub fn source(&self) -> &'a str {
		self.source
	}

	/// Return the next token. Once the input is exhausted this keeps returning
	/// a [`TokenKind::Eof`] token.
	pub fn scan(&mut self) -> Token<'a> {
		let token = match self.pushback.take() {
			Some(token) => token,
			None => self.classify(),
		};

		self.offset = token.end;
		self.line = token.line + token.newlines();
		token
	}

	/// Push `token` back so the next [`Scanner::scan`] returns it again.
	pub fn unread(&mut self, token: Token<'a>) {
		debug_assert!(self.pushback.is_none(), "only one token can be unread");
		self.offset = token.start;
		self.line = token.line;
		self.pushback = Some(token);
	}

	/// Look at the next token without consuming it.
	pub fn peek(&mut self) -> Token<'a> {
		let token = self.scan();
		self.unread(token);
		token
	}

	/// Save the full scanner state so a speculative parse can be abandoned.
	pub fn checkpoint(&self) -> Checkpoint<'a> {
		Checkpoint {
			cursor: self.cursor,
			offset: self.offset,
			line: self.line,
			pushback: self.pushback,
		}
	}

	pub fn rewind(&mut self, checkpoint: Checkpoint<'a>) {
		self.cursor = checkpoint.cursor;
		self.offset = checkpoint.offset;
		self.line = checkpoint.line;
		self.pushback = checkpoint.pushback;
	}

	fn raw(&self, index: usize) -> Option<(RawToken, Range<usize>)> {
		self.raw_tokens.get(index).cloned()
	}

	fn is_uppercase_ident(&self, index: usize) -> bool {
		matches!(
			self.raw(index),
			Some((RawToken::Ident, span)) if self.source[span.clone()].starts_with(|c: char| c.is_ascii_uppercase())
		)
	}

	fn classify(&mut self) -> Token<'a> {
		let Some((raw, span)) = self.raw(self.cursor) else {
			let end = self.source.len();
			return Token {
				kind: TokenKind::Eof,
				literal: "",
				start: end,
				end,
				line: self.line,
			};
		};

		let mut end = span.end;
		let mut consumed = 1;
		let kind = match raw {
			RawToken::Whitespace => TokenKind::Whitespace,
			RawToken::Ident => TokenKind::Identifier,
			RawToken::LeftAngle if self.is_uppercase_ident(self.cursor + 1) => TokenKind::TagStart,
			RawToken::LeftAngle
				if matches!(self.raw(self.cursor + 1), Some((RawToken::Slash, _)))
					&& self.is_uppercase_ident(self.cursor + 2) =>
			{
				if let Some((_, slash)) = self.raw(self.cursor + 1) {
					end = slash.end;
				}
				consumed = 2;
				TokenKind::ClosingTagStart
			}
			RawToken::LeftAngle => TokenKind::LeftAngleBracket,
			RawToken::SelfClosing => TokenKind::SelfClosing,
			RawToken::Slash => TokenKind::Slash,
			RawToken::RightAngle => TokenKind::RightAngleBracket,
			RawToken::Assign => TokenKind::Assign,
			RawToken::SingleQuote => TokenKind::SingleQuote,
			RawToken::DoubleQuote => TokenKind::DoubleQuote,
			RawToken::Backtick => TokenKind::TripleQuote,
			RawToken::EscSingleQuote => TokenKind::EscSingleQuote,
			RawToken::EscDoubleQuote => TokenKind::EscDoubleQuote,
			RawToken::BackSlash => TokenKind::BackSlash,
			RawToken::Other => TokenKind::Other,
		};

		self.cursor += consumed;

		Token {
			kind,
			literal: &self.source[span.start..end],
			start: span.start,
			end,
			line: self.line,
		}
	}
}

/// Collect every token of `source`, excluding the final
/// [`TokenKind::Eof`].
pub fn tokenize(source: &str) -> Vec<Token<'_>> {
	let mut scanner = Scanner::new(source);
	let mut tokens = vec![];

	loop {
		let token = scanner.scan();

		if token.is(TokenKind::Eof) {
			break;
		}

		tokens.push(token);
	}

	tokens
}
