use std::fmt::Display;
use std::ops::Range;

use serde::Deserialize;
use serde::Serialize;

/// The kinds of token produced by the [`Scanner`](crate::lexer::Scanner).
///
/// Only the characters that matter for recognizing component tags get their
/// own kind, everything else is [`TokenKind::Other`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
	/// The end of the input. Returned repeatedly once reached.
	Eof,
	/// A run of ` `, `\t`, `\r` or `\n`.
	Whitespace,
	/// A run of letters, digits and `-`, e.g. `gen-der` or `InputField`.
	Identifier,
	/// `<` directly followed by an uppercase letter.
	TagStart,
	/// `</` directly followed by an uppercase letter.
	ClosingTagStart,
	/// `/>`
	SelfClosing,
	/// `<` that does not start a tag.
	LeftAngleBracket,
	/// `>`
	RightAngleBracket,
	/// `/` that does not end a tag.
	Slash,
	/// `=`
	Assign,
	/// `'`
	SingleQuote,
	/// `"`
	DoubleQuote,
	/// `` ` ``
	TripleQuote,
	/// `\'`
	EscSingleQuote,
	/// `\"`
	EscDoubleQuote,
	/// `\`
	BackSlash,
	/// Any other character.
	Other,
}

impl TokenKind {
	pub fn is_quote(self) -> bool {
		matches!(self, Self::SingleQuote | Self::DoubleQuote)
	}
}

impl Display for TokenKind {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		let name = match self {
			Self::Eof => "EOF",
			Self::Whitespace => "WhiteSpace",
			Self::Identifier => "Identifier",
			Self::TagStart => "TagStart",
			Self::ClosingTagStart => "ClosingTagStart",
			Self::SelfClosing => "TagSelfClosing",
			Self::LeftAngleBracket => "LeftAngleBracket",
			Self::RightAngleBracket => "RightAngleBracket",
			Self::Slash => "Slash",
			Self::Assign => "Assign",
			Self::SingleQuote => "SingleQuote",
			Self::DoubleQuote => "DoubleQuote",
			Self::TripleQuote => "TripleQuote",
			Self::EscSingleQuote => "EscSingleQuote",
			Self::EscDoubleQuote => "EscDoubleQuote",
			Self::BackSlash => "BackSlash",
			Self::Other => "Other",
		};

		write!(f, "{name}")
	}
}

/// A single token borrowed from the scanned source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token<'a> {
	pub kind: TokenKind,
	/// The exact source text of the token.
	pub literal: &'a str,
	/// Byte offset of the first byte of the token.
	pub start: usize,
	/// Byte offset one past the last byte of the token.
	pub end: usize,
	/// 1-indexed line the token starts on.
	pub line: usize,
}

impl Token<'_> {
	pub fn is(&self, kind: TokenKind) -> bool {
		self.kind == kind
	}

	pub fn is_whitespace(&self) -> bool {
		self.kind == TokenKind::Whitespace
	}

	/// Number of line breaks contained in the token.
	pub fn newlines(&self) -> usize {
		self.literal.bytes().filter(|byte| *byte == b'\n').count()
	}

	pub fn span(&self) -> Span {
		Span::new(self.start, self.end)
	}
}

/// A half-open byte range into a source buffer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Span {
	pub start: usize,
	pub stop: usize,
}

impl Span {
	pub const fn new(start: usize, stop: usize) -> Self {
		Self { start, stop }
	}

	pub const fn len(&self) -> usize {
		self.stop - self.start
	}

	pub const fn is_empty(&self) -> bool {
		self.start == self.stop
	}

	/// Whether `other` lies entirely inside this span.
	pub const fn contains(&self, other: &Span) -> bool {
		self.start <= other.start && other.stop <= self.stop
	}

	pub fn range(&self) -> Range<usize> {
		self.start..self.stop
	}
}

impl From<Range<usize>> for Span {
	fn from(range: Range<usize>) -> Self {
		Self::new(range.start, range.end)
	}
}

impl Display for Span {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "{}..{}", self.start, self.stop)
	}
}
