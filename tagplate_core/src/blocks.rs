use serde::Deserialize;
use serde::Serialize;

use crate::TagplateError;
use crate::TagplateResult;
use crate::parser::ArgMap;
use crate::parser::Tag;
use crate::parser::scan_tags;
use crate::tokens::Span;

/// A component tag resolved together with its body and closing tag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
	pub name: String,
	pub args: ArgMap,
	/// The raw text between the opening and closing tag. Empty for
	/// self-closing blocks.
	pub body: String,
	pub self_closing: bool,
	/// The span of the opening tag.
	pub head: Span,
	/// The span from the opening tag to the end of the closing tag. Equal to
	/// `head` for self-closing blocks.
	pub full: Span,
	pub line: usize,
}

impl Block {
	/// Whether the block was closed by an explicit end tag.
	pub fn is_end(&self) -> bool {
		!self.self_closing
	}

	fn from_self_closing(tag: &Tag) -> Self {
		Self {
			name: tag.name.clone(),
			args: tag.args.clone(),
			body: String::new(),
			self_closing: true,
			head: tag.span,
			full: tag.span,
			line: tag.line,
		}
	}

	fn from_pair(content: &str, start: &Tag, end: &Tag) -> Self {
		Self {
			name: start.name.clone(),
			args: start.args.clone(),
			body: content[start.span.stop..end.span.start].to_string(),
			self_closing: false,
			head: start.span,
			full: Span::new(start.span.start, end.span.stop),
			line: start.line,
		}
	}
}

/// Locate the innermost block that has not been resolved yet.
///
/// A self-closing first tag is returned as is. Otherwise the rightmost opening
/// tag is closed by the first end tag after it, which must carry the same
/// name.
pub fn find_inner_block(content: &str) -> TagplateResult<Option<Block>> {
	let tags = scan_tags(content)?;

	let Some(first) = tags.iter().find(|tag| !tag.is_end()) else {
		return match tags.first() {
			Some(end) => {
				Err(TagplateError::UnmatchedClosingTag {
					tag: end.name.clone(),
					line: end.line,
				})
			}
			None => Ok(None),
		};
	};

	if first.is_self_closing() {
		return Ok(Some(Block::from_self_closing(first)));
	}

	let Some(position) = tags.iter().rposition(|tag| !tag.is_end()) else {
		return Ok(None);
	};
	let candidate = &tags[position];

	if candidate.is_self_closing() {
		return Ok(Some(Block::from_self_closing(candidate)));
	}

	let Some(end) = tags[position + 1..].iter().find(|tag| tag.is_end()) else {
		return Err(TagplateError::MissingClosingTag {
			tag: candidate.name.clone(),
			line: candidate.line,
		});
	};

	if !end.same_name(candidate) {
		return Err(TagplateError::MismatchedClosingTag {
			expected: candidate.name.clone(),
			found: end.name.clone(),
			line: end.line,
		});
	}

	Ok(Some(Block::from_pair(content, candidate, end)))
}

/// Find the index of the opening tag in `preceding` that `end` closes.
///
/// Walks backward over same-name tags: every end tag seen adds a pending pair
/// and every start tag either settles one of those or is the match.
pub fn find_start_tag(end: &Tag, preceding: &[Tag]) -> Option<usize> {
	let mut pending = 0usize;

	for (index, tag) in preceding.iter().enumerate().rev() {
		if !tag.same_name(end) || tag.is_self_closing() {
			continue;
		}

		if tag.is_end() {
			pending += 1;
		} else if pending == 0 {
			return Some(index);
		} else {
			pending -= 1;
		}
	}

	None
}

/// Pair every end tag with its opening tag, returning `(start, end)` indexes
/// into `tags` ordered by end tag.
pub fn pair_blocks(tags: &[Tag]) -> TagplateResult<Vec<(usize, usize)>> {
	let mut paired = vec![false; tags.len()];
	let mut pairs = vec![];

	for (end_index, end) in tags.iter().enumerate() {
		if !end.is_end() {
			continue;
		}

		let Some(start_index) = find_start_tag(end, &tags[..end_index]) else {
			return Err(TagplateError::UnmatchedClosingTag {
				tag: end.name.clone(),
				line: end.line,
			});
		};

		let unclosed = (start_index + 1..end_index)
			.find(|&index| tags[index].is_start() && !paired[index]);

		if let Some(index) = unclosed {
			return Err(TagplateError::MismatchedClosingTag {
				expected: tags[index].name.clone(),
				found: end.name.clone(),
				line: end.line,
			});
		}

		paired[start_index] = true;
		paired[end_index] = true;
		pairs.push((start_index, end_index));
	}

	if let Some(index) = (0..tags.len()).find(|&index| tags[index].is_start() && !paired[index]) {
		return Err(TagplateError::MissingClosingTag {
			tag: tags[index].name.clone(),
			line: tags[index].line,
		});
	}

	Ok(pairs)
}

/// Every block in `content` that contains no other tag, in source order.
/// Leaf blocks never overlap so they can all be replaced in one pass. The
/// block [`find_inner_block`] resolves is always one of them.
pub fn find_leaf_blocks(content: &str) -> TagplateResult<Vec<Block>> {
	let tags = scan_tags(content)?;
	let pairs = pair_blocks(&tags)?;

	let mut blocks: Vec<Block> = tags
		.iter()
		.filter(|tag| tag.is_self_closing())
		.map(Block::from_self_closing)
		.collect();

	blocks.extend(
		pairs
			.iter()
			.filter(|(start, end)| start + 1 == *end)
			.map(|&(start, end)| Block::from_pair(content, &tags[start], &tags[end])),
	);

	blocks.sort_by_key(|block| block.full.start);
	Ok(blocks)
}
