use std::collections::BTreeMap;

use derive_more::Deref;
use derive_more::DerefMut;
use serde::Deserialize;
use serde::Serialize;

use crate::TagplateError;
use crate::TagplateResult;
use crate::lexer::Scanner;
use crate::tokens::Span;
use crate::tokens::Token;
use crate::tokens::TokenKind;

/// Attribute name to raw attribute value, exactly as written between the
/// quotes. When a tag repeats an attribute the last occurrence wins.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deref, DerefMut, Serialize, Deserialize)]
pub struct ArgMap(BTreeMap<String, String>);

impl ArgMap {
	pub fn new() -> Self {
		Self::default()
	}
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for ArgMap {
	fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
		Self(
			iter.into_iter()
				.map(|(key, value)| (key.into(), value.into()))
				.collect(),
		)
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TagKind {
	/// `<Name ...>`
	Start,
	/// `</Name>`
	End,
	/// `<Name ... />`
	SelfClosing,
}

/// A single component tag found in a source buffer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
	/// The tag name with its case preserved.
	pub name: String,
	pub kind: TagKind,
	/// Always empty for end tags.
	pub args: ArgMap,
	/// The bytes from `<` up to and including the closing `>` or `/>`.
	pub span: Span,
	pub line: usize,
}

impl Tag {
	pub fn is_self_closing(&self) -> bool {
		self.kind == TagKind::SelfClosing
	}

	pub fn is_end(&self) -> bool {
		self.kind == TagKind::End
	}

	pub fn is_start(&self) -> bool {
		self.kind == TagKind::Start
	}

	/// Tag names are compared case-insensitively.
	pub fn same_name(&self, other: &Tag) -> bool {
		self.name.eq_ignore_ascii_case(&other.name)
	}
}

/// Parse the first opening tag (`<Name ...>` or `<Name ... />`) found in
/// `content`.
///
/// Returns `Ok(None)` when there is no tag to parse, which is different from a
/// malformed tag.
pub fn parse_tag_head(content: &str) -> TagplateResult<Option<Tag>> {
	let mut parser = TagParser::new(content);

	while let Some(tag) = parser.next_tag()? {
		if !tag.is_end() {
			return Ok(Some(tag));
		}
	}

	Ok(None)
}

/// Collect every start, end and self-closing tag in `content` in source order.
pub fn scan_tags(content: &str) -> TagplateResult<Vec<Tag>> {
	let mut parser = TagParser::new(content);
	let mut tags = vec![];

	while let Some(tag) = parser.next_tag()? {
		tags.push(tag);
	}

	Ok(tags)
}

struct TagParser<'a> {
	scanner: Scanner<'a>,
}

impl<'a> TagParser<'a> {
	fn new(content: &'a str) -> Self {
		Self {
			scanner: Scanner::new(content),
		}
	}

	fn next_tag(&mut self) -> TagplateResult<Option<Tag>> {
		loop {
			let token = self.scanner.scan();

			match token.kind {
				TokenKind::Eof => return Ok(None),
				TokenKind::TagStart => {
					let name = self.scanner.scan();
					return self.parse_head(token, name).map(Some);
				}
				TokenKind::ClosingTagStart => {
					let name = self.scanner.scan();
					return self.parse_closing(token, name).map(Some);
				}
				TokenKind::LeftAngleBracket => {
					if let Some(tag) = self.try_spaced_head(token) {
						return Ok(Some(tag));
					}
				}
				_ => {}
			}
		}
	}

	/// `< Name ...>` is accepted as a tag as long as the rest of the head is
	/// well formed. Anything else is left as plain text.
	fn try_spaced_head(&mut self, start: Token<'a>) -> Option<Tag> {
		let checkpoint = self.scanner.checkpoint();

		if !self.scanner.scan().is_whitespace() {
			self.scanner.rewind(checkpoint);
			return None;
		}

		let name = self.scanner.scan();

		if !is_tag_name(&name) {
			self.scanner.rewind(checkpoint);
			return None;
		}

		match self.parse_head(start, name) {
			Ok(tag) => Some(tag),
			Err(_) => {
				self.scanner.rewind(checkpoint);
				None
			}
		}
	}

	fn parse_head(&mut self, start: Token<'a>, name: Token<'a>) -> TagplateResult<Tag> {
		let tag_name = name.literal.to_string();
		let mut head = vec![];
		// The quote that opened the current attribute value and how many of
		// them have been seen since. An odd count means the value is still open.
		let mut quote: Option<TokenKind> = None;
		let mut quotes = 0usize;

		let terminator = loop {
			let token = self.scanner.scan();
			let inside_value = quote.is_some() && quotes % 2 == 1;

			match token.kind {
				TokenKind::Eof if inside_value => {
					return Err(TagplateError::UnterminatedString {
						tag: tag_name,
						line: start.line,
					});
				}
				TokenKind::Eof => {
					return Err(TagplateError::MissingClosingBracket {
						tag: tag_name,
						line: start.line,
					});
				}
				TokenKind::RightAngleBracket | TokenKind::SelfClosing if !inside_value => {
					break token;
				}
				kind if kind.is_quote() => {
					if !inside_value && follows_assign(&head) {
						quote = Some(kind);
						quotes = 1;
					} else if quote == Some(kind) {
						quotes += 1;
					}
				}
				_ => {}
			}

			head.push(token);
		};

		let args = parse_attributes(self.scanner.source(), &head, &tag_name)?;
		let kind = if terminator.is(TokenKind::SelfClosing) {
			TagKind::SelfClosing
		} else {
			TagKind::Start
		};

		Ok(Tag {
			name: tag_name,
			kind,
			args,
			span: Span::new(start.start, terminator.end),
			line: start.line,
		})
	}

	fn parse_closing(&mut self, start: Token<'a>, name: Token<'a>) -> TagplateResult<Tag> {
		let mut token = self.scanner.scan();

		if token.is_whitespace() {
			token = self.scanner.scan();
		}

		if token.kind == TokenKind::Eof {
			return Err(TagplateError::MissingClosingBracket {
				tag: format!("/{}", name.literal),
				line: start.line,
			});
		}

		if !token.is(TokenKind::RightAngleBracket) {
			return Err(TagplateError::UnexpectedToken {
				tag: format!("/{}", name.literal),
				expected: "`>`".into(),
				found: token.literal.into(),
				line: token.line,
			});
		}

		Ok(Tag {
			name: name.literal.to_string(),
			kind: TagKind::End,
			args: ArgMap::new(),
			span: Span::new(start.start, token.end),
			line: start.line,
		})
	}
}

fn is_tag_name(token: &Token<'_>) -> bool {
	token.is(TokenKind::Identifier) && token.literal.starts_with(|c: char| c.is_ascii_uppercase())
}

/// Whether the last non-whitespace token is `=`.
fn follows_assign(tokens: &[Token<'_>]) -> bool {
	tokens
		.iter()
		.rev()
		.find(|token| !token.is_whitespace())
		.is_some_and(|token| token.is(TokenKind::Assign))
}

fn skip_whitespace(tokens: &[Token<'_>], mut index: usize) -> usize {
	while tokens.get(index).is_some_and(Token::is_whitespace) {
		index += 1;
	}

	index
}

/// Whether `identifier [ws] = [ws] quote` starts at `index`.
fn is_attribute_start(tokens: &[Token<'_>], index: usize) -> bool {
	if !tokens.get(index).is_some_and(|token| token.is(TokenKind::Identifier)) {
		return false;
	}

	let assign = skip_whitespace(tokens, index + 1);

	if !tokens.get(assign).is_some_and(|token| token.is(TokenKind::Assign)) {
		return false;
	}

	let quote = skip_whitespace(tokens, assign + 1);
	tokens.get(quote).is_some_and(|token| token.kind.is_quote())
}

/// Index of the next attribute that starts after `from`, or the end of the
/// tokens. Whitespace between attributes is optional.
fn next_attribute_boundary(tokens: &[Token<'_>], from: usize) -> usize {
	(from..tokens.len())
		.find(|&index| is_attribute_start(tokens, index))
		.unwrap_or(tokens.len())
}

fn parse_attributes(source: &str, tokens: &[Token<'_>], tag: &str) -> TagplateResult<ArgMap> {
	let unexpected = |expected: &str, token: &Token<'_>| {
		TagplateError::UnexpectedToken {
			tag: tag.to_string(),
			expected: expected.to_string(),
			found: token.literal.to_string(),
			line: token.line,
		}
	};
	let mut args = ArgMap::new();
	let mut index = skip_whitespace(tokens, 0);

	while let Some(key) = tokens.get(index) {
		if !key.is(TokenKind::Identifier) {
			return Err(unexpected("an attribute name", key));
		}

		index = skip_whitespace(tokens, index + 1);
		match tokens.get(index) {
			Some(token) if token.is(TokenKind::Assign) => {}
			Some(token) => return Err(unexpected("`=`", token)),
			None => return Err(unexpected("`=`", key)),
		}

		index = skip_whitespace(tokens, index + 1);
		let open = match tokens.get(index) {
			Some(token) if token.kind.is_quote() => *token,
			Some(token) => return Err(unexpected("a quoted value", token)),
			None => return Err(unexpected("a quoted value", key)),
		};

		let value_start = index + 1;
		let boundary = next_attribute_boundary(tokens, value_start);
		let unterminated = || {
			TagplateError::UnterminatedString {
				tag: tag.to_string(),
				line: open.line,
			}
		};

		let terminator = (value_start..boundary)
			.rev()
			.find(|&position| tokens[position].is(open.kind))
			.ok_or_else(unterminated)?;

		let inner_quotes = tokens[value_start..terminator]
			.iter()
			.filter(|token| token.is(open.kind))
			.count();

		if inner_quotes % 2 == 1 {
			return Err(unterminated());
		}

		if let Some(stray) = tokens[terminator + 1..boundary]
			.iter()
			.find(|token| !token.is_whitespace())
		{
			return Err(unexpected("another attribute", stray));
		}

		let value = &source[open.end..tokens[terminator].start];
		args.insert(key.literal.to_string(), value.to_string());
		index = boundary;
	}

	Ok(args)
}
