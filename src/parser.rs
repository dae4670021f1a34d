//! Readers for bracketed parse trees and word-alignment lines.
//!
//! Trees use the Penn Treebank bracket notation:
//!
//! ```rust
//! use ghkm_extract::parser::parse_tree;
//!
//! let tree = parse_tree("(S (NP (DT the) (NN dog)) (VP (VBZ barks)))").unwrap();
//! assert_eq!(tree.yield_words(), vec!["the", "dog", "barks"]);
//! ```
//!
//! Alignments are whitespace separated `i-j` pairs, source index first unless
//! [`AlignmentFormat::reversed`] is set.

use crate::alignment::{AlignmentError, SymmetricAlignment};
use crate::tree::ParseTree;
use std::iter::Peekable;
use std::str::Chars;
use thiserror::Error;

/// Label given to an unlabeled outer bracket that wraps several trees.
pub const WRAPPER_LABEL: &str = "ROOT";

/// Parser error type.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParseError {
    #[error("unexpected end of input")]
    UnexpectedEof,
    #[error("unexpected character: {0}")]
    UnexpectedChar(char),
    #[error("expected {expected}, found {found}")]
    Expected { expected: String, found: String },
    #[error("empty tree")]
    EmptyTree,
    #[error("malformed alignment pair: {0:?}")]
    MalformedPair(String),
    #[error(transparent)]
    Alignment(#[from] AlignmentError),
}

/// Result type for parsing operations.
pub type ParseResult<T> = Result<T, ParseError>;

#[derive(Debug, Clone, PartialEq)]
enum Token {
    LParen,
    RParen,
    Atom(String),
    Eof,
}

struct Lexer<'a> {
    input: Peekable<Chars<'a>>,
}

impl<'a> Lexer<'a> {
    fn new(input: &'a str) -> Self {
        Lexer {
            input: input.chars().peekable(),
        }
    }

    fn peek(&mut self) -> Option<char> {
        self.input.peek().copied()
    }

    fn skip_whitespace(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.input.next();
        }
    }

    fn next_token(&mut self) -> Token {
        self.skip_whitespace();
        match self.peek() {
            None => Token::Eof,
            Some('(') => {
                self.input.next();
                Token::LParen
            }
            Some(')') => {
                self.input.next();
                Token::RParen
            }
            Some(_) => {
                let mut atom = String::new();
                while let Some(c) = self.peek() {
                    if c.is_whitespace() || c == '(' || c == ')' {
                        break;
                    }
                    atom.push(c);
                    self.input.next();
                }
                Token::Atom(atom)
            }
        }
    }
}

/// Recursive-descent reader for one bracketed tree.
pub struct TreeParser<'a> {
    lexer: Lexer<'a>,
    current: Token,
}

impl<'a> TreeParser<'a> {
    pub fn new(input: &'a str) -> Self {
        let mut lexer = Lexer::new(input);
        let current = lexer.next_token();
        TreeParser { lexer, current }
    }

    fn advance(&mut self) -> Token {
        let next = self.lexer.next_token();
        std::mem::replace(&mut self.current, next)
    }

    fn expect(&mut self, expected: Token) -> ParseResult<()> {
        if self.current == expected {
            self.advance();
            Ok(())
        } else if self.current == Token::Eof {
            Err(ParseError::UnexpectedEof)
        } else {
            Err(ParseError::Expected {
                expected: format!("{:?}", expected),
                found: format!("{:?}", self.current),
            })
        }
    }

    /// Parse the whole input as exactly one tree.
    pub fn parse(mut self) -> ParseResult<ParseTree> {
        if self.current == Token::Eof {
            return Err(ParseError::EmptyTree);
        }
        let tree = self.parse_subtree()?;
        match self.current {
            Token::Eof => Ok(tree),
            Token::RParen => Err(ParseError::UnexpectedChar(')')),
            _ => Err(ParseError::Expected {
                expected: "end of input".to_string(),
                found: format!("{:?}", self.current),
            }),
        }
    }

    fn parse_subtree(&mut self) -> ParseResult<ParseTree> {
        match self.advance() {
            Token::Atom(word) => Ok(ParseTree::leaf(word)),
            Token::LParen => {
                let label = match &self.current {
                    Token::Atom(label) => {
                        let label = label.clone();
                        self.advance();
                        Some(label)
                    }
                    _ => None,
                };

                let mut children = Vec::new();
                loop {
                    match self.current {
                        Token::RParen => break,
                        Token::Eof => return Err(ParseError::UnexpectedEof),
                        _ => children.push(self.parse_subtree()?),
                    }
                }
                self.expect(Token::RParen)?;

                match label {
                    Some(label) if children.is_empty() => Ok(ParseTree::leaf(label)),
                    Some(label) => Ok(ParseTree::node(label, children)),
                    None => match children.len() {
                        0 => Err(ParseError::EmptyTree),
                        1 => Ok(children.remove(0)),
                        _ => Ok(ParseTree::node(WRAPPER_LABEL, children)),
                    },
                }
            }
            Token::RParen => Err(ParseError::UnexpectedChar(')')),
            Token::Eof => Err(ParseError::UnexpectedEof),
        }
    }
}

/// Parse a bracketed tree such as `(S (NP (DT the) (NN dog)) (VP (VBZ barks)))`.
pub fn parse_tree(input: &str) -> ParseResult<ParseTree> {
    TreeParser::new(input).parse()
}

// ============================================================================
// Alignment lines
// ============================================================================

/// How alignment points are written.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct AlignmentFormat {
    /// Indices start at 1 instead of 0.
    pub one_indexed: bool,
    /// Points are written `e-f` instead of `f-e`.
    pub reversed: bool,
}

/// Parse an alignment line like `0-0 1-2 2-1` for a sentence pair with
/// `f_len` source and `e_len` target words.
pub fn parse_alignment(
    line: &str,
    f_len: usize,
    e_len: usize,
    format: AlignmentFormat,
) -> ParseResult<SymmetricAlignment> {
    let mut alignment = SymmetricAlignment::new(f_len, e_len);

    for pair in line.split_whitespace() {
        let malformed = || ParseError::MalformedPair(pair.to_string());

        let (left, right) = pair.split_once('-').ok_or_else(malformed)?;
        let mut left: usize = left.parse().map_err(|_| malformed())?;
        let mut right: usize = right.parse().map_err(|_| malformed())?;

        if format.one_indexed {
            left = left.checked_sub(1).ok_or_else(malformed)?;
            right = right.checked_sub(1).ok_or_else(malformed)?;
        }

        let (f, e) = if format.reversed {
            (right, left)
        } else {
            (left, right)
        };
        alignment.add(f, e)?;
    }

    Ok(alignment)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alignment::WordAlignment;

    #[test]
    fn test_parse_simple_tree() {
        let tree = parse_tree("(NP (DT the) (NN dog))").unwrap();
        assert_eq!(tree.label(0), "NP");
        assert_eq!(tree.yield_words(), vec!["the", "dog"]);
        assert_eq!(tree.to_string(), "(NP (DT the) (NN dog))");
    }

    #[test]
    fn test_parse_nested_tree() {
        let tree = parse_tree("(S (NP (DT the) (NN dog)) (VP (VBZ barks)))").unwrap();
        assert_eq!(tree.children(0).len(), 2);
        assert_eq!(tree.leaf_count(), 3);
    }

    #[test]
    fn test_unwraps_unlabeled_root() {
        let tree = parse_tree("( (S (NP (NN dogs)) (VP (VBP bark))) )").unwrap();
        assert_eq!(tree.label(0), "S");
    }

    #[test]
    fn test_names_multi_child_wrapper() {
        let tree = parse_tree("((NP (NN a)) (NP (NN b)))").unwrap();
        assert_eq!(tree.label(0), WRAPPER_LABEL);
        assert_eq!(tree.children(0).len(), 2);
    }

    #[test]
    fn test_parse_tree_whitespace() {
        let tree = parse_tree("  (NP\n  (DT the)\t(NN dog) )  ").unwrap();
        assert_eq!(tree.to_string(), "(NP (DT the) (NN dog))");
    }

    #[test]
    fn test_parse_tree_errors() {
        assert_eq!(parse_tree(""), Err(ParseError::EmptyTree));
        assert_eq!(parse_tree("()"), Err(ParseError::EmptyTree));
        assert_eq!(parse_tree("(NP (DT the)"), Err(ParseError::UnexpectedEof));
        assert_eq!(parse_tree("(NP (DT the)))"), Err(ParseError::UnexpectedChar(')')));
        assert!(matches!(
            parse_tree("(NP a) (NP b)"),
            Err(ParseError::Expected { .. })
        ));
    }

    #[test]
    fn test_parse_alignment_default_format() {
        let a = parse_alignment("0-1 1-0 1-1", 2, 2, AlignmentFormat::default()).unwrap();
        assert_eq!(a.f2e(0), &[1]);
        assert_eq!(a.f2e(1), &[0, 1]);
        assert_eq!(a.e2f(1), &[0, 1]);
    }

    #[test]
    fn test_parse_alignment_one_indexed_reversed() {
        let format = AlignmentFormat {
            one_indexed: true,
            reversed: true,
        };
        // e-f pairs, starting at 1.
        let a = parse_alignment("1-2 3-1", 2, 3, format).unwrap();
        assert_eq!(a.e2f(0), &[1]);
        assert_eq!(a.e2f(2), &[0]);
        assert!(a.e2f(1).is_empty());
    }

    #[test]
    fn test_parse_alignment_errors() {
        let fmt = AlignmentFormat::default();
        assert_eq!(
            parse_alignment("0-0 01", 2, 2, fmt),
            Err(ParseError::MalformedPair("01".to_string()))
        );
        assert_eq!(
            parse_alignment("x-1", 2, 2, fmt),
            Err(ParseError::MalformedPair("x-1".to_string()))
        );
        assert!(matches!(
            parse_alignment("0-5", 2, 2, fmt),
            Err(ParseError::Alignment(AlignmentError::OutOfRange { .. }))
        ));

        let one = AlignmentFormat {
            one_indexed: true,
            ..fmt
        };
        assert!(parse_alignment("0-1", 2, 2, one).is_err());
    }

    #[test]
    fn test_parse_empty_alignment() {
        let a = parse_alignment("   ", 3, 2, AlignmentFormat::default()).unwrap();
        assert_eq!(a.link_count(), 0);
        assert_eq!(a.source_len(), 3);
    }
}
