//! Selector parsing and matching.
//!
//! Supported grammar (a practical subset of CSS selectors):
//!
//! ```text
//! list      := complex ( "," complex )*
//! complex   := compound ( combinator compound )*
//! combinator:= whitespace | ">"
//! compound  := ( ident | "*" )? simple*
//! simple    := "#" ident | "." ident | attribute | ":not(" compound-list ")"
//! attribute := "[" ident ( op value )? "]"      op: = ~= ^= $= *=
//! ```

use nom::{
    IResult,
    branch::alt,
    bytes::complete::{tag, take_while, take_while1},
    character::complete::{char, multispace0, multispace1},
    combinator::{all_consuming, map, opt, value},
    multi::{many0, separated_list1},
    sequence::{delimited, pair, preceded, tuple},
};

use super::tree::{NodeData, NodeId, Tree};
use crate::error::SelectorError;

// =============================================================================
// AST
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AttrOp {
    Equals,
    Includes,
    Prefix,
    Suffix,
    Substring,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Simple {
    Id(String),
    Class(String),
    Attribute {
        name: String,
        matcher: Option<(AttrOp, String)>,
    },
    Not(Vec<Compound>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Compound {
    tag: Option<String>,
    filters: Vec<Simple>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Combinator {
    Descendant,
    Child,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Complex {
    head: Compound,
    tail: Vec<(Combinator, Compound)>,
}

/// A parsed, comma-separated selector list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selector {
    source: String,
    alternatives: Vec<Complex>,
}

impl Selector {
    /// Parse a selector list.
    pub fn parse(input: &str) -> Result<Self, SelectorError> {
        match all_consuming(delimited(multispace0, selector_list, multispace0))(input) {
            Ok((_, alternatives)) => Ok(Self {
                source: input.to_string(),
                alternatives,
            }),
            Err(_) => Err(SelectorError::new(input)),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Test an element against any alternative in the list.
    pub(crate) fn matches_in(&self, tree: &Tree, node: NodeId) -> bool {
        self.alternatives.iter().any(|c| c.matches(tree, node))
    }
}

// =============================================================================
// Parser
// =============================================================================

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '-' || c == '_'
}

fn ident(input: &str) -> IResult<&str, &str> {
    take_while1(is_ident_char)(input)
}

fn quoted(input: &str) -> IResult<&str, &str> {
    alt((
        delimited(char('"'), take_while(|c: char| c != '"'), char('"')),
        delimited(char('\''), take_while(|c: char| c != '\''), char('\'')),
    ))(input)
}

fn attr_op(input: &str) -> IResult<&str, AttrOp> {
    alt((
        value(AttrOp::Equals, tag("=")),
        value(AttrOp::Includes, tag("~=")),
        value(AttrOp::Prefix, tag("^=")),
        value(AttrOp::Suffix, tag("$=")),
        value(AttrOp::Substring, tag("*=")),
    ))(input)
}

fn attribute(input: &str) -> IResult<&str, Simple> {
    let matcher = tuple((
        attr_op,
        multispace0,
        alt((quoted, ident)),
        multispace0,
    ));
    map(
        delimited(
            char('['),
            tuple((multispace0, ident, multispace0, opt(matcher))),
            char(']'),
        ),
        |(_, name, _, matcher)| Simple::Attribute {
            name: name.to_ascii_lowercase(),
            matcher: matcher.map(|(op, _, v, _)| (op, v.to_string())),
        },
    )(input)
}

fn compound_list(input: &str) -> IResult<&str, Vec<Compound>> {
    separated_list1(delimited(multispace0, char(','), multispace0), compound)(input)
}

fn negation(input: &str) -> IResult<&str, Simple> {
    map(
        delimited(
            tag(":not("),
            delimited(multispace0, compound_list, multispace0),
            char(')'),
        ),
        Simple::Not,
    )(input)
}

fn simple(input: &str) -> IResult<&str, Simple> {
    alt((
        map(preceded(char('#'), ident), |s| Simple::Id(s.to_string())),
        map(preceded(char('.'), ident), |s| Simple::Class(s.to_string())),
        attribute,
        negation,
    ))(input)
}

fn compound(input: &str) -> IResult<&str, Compound> {
    let type_selector = alt((
        map(ident, |s: &str| Some(s.to_ascii_lowercase())),
        value(None, char('*')),
    ));
    let (rest, (tag, filters)) = pair(opt(type_selector), many0(simple))(input)?;
    if tag.is_none() && filters.is_empty() {
        return Err(nom::Err::Error(nom::error::Error::new(
            input,
            nom::error::ErrorKind::Verify,
        )));
    }
    Ok((
        rest,
        Compound {
            tag: tag.flatten(),
            filters,
        },
    ))
}

fn combinator(input: &str) -> IResult<&str, Combinator> {
    alt((
        value(
            Combinator::Child,
            delimited(multispace0, char('>'), multispace0),
        ),
        value(Combinator::Descendant, multispace1),
    ))(input)
}

fn complex(input: &str) -> IResult<&str, Complex> {
    map(
        pair(compound, many0(pair(combinator, compound))),
        |(head, tail)| Complex { head, tail },
    )(input)
}

fn selector_list(input: &str) -> IResult<&str, Vec<Complex>> {
    separated_list1(delimited(multispace0, char(','), multispace0), complex)(input)
}

// =============================================================================
// Matching
// =============================================================================

impl Simple {
    fn matches(&self, tree: &Tree, data: &NodeData) -> bool {
        match self {
            Simple::Id(id) => data.attr("id") == Some(id.as_str()),
            Simple::Class(class) => data
                .attr("class")
                .is_some_and(|v| v.split_whitespace().any(|c| c == class)),
            Simple::Attribute { name, matcher } => {
                let Some(actual) = data.attr(name) else {
                    return false;
                };
                match matcher {
                    None => true,
                    Some((AttrOp::Equals, v)) => actual == v,
                    Some((AttrOp::Includes, v)) => actual.split_whitespace().any(|w| w == v),
                    Some((AttrOp::Prefix, v)) => !v.is_empty() && actual.starts_with(v.as_str()),
                    Some((AttrOp::Suffix, v)) => !v.is_empty() && actual.ends_with(v.as_str()),
                    Some((AttrOp::Substring, v)) => !v.is_empty() && actual.contains(v.as_str()),
                }
            }
            Simple::Not(inner) => !inner.iter().any(|c| c.matches_data(tree, data)),
        }
    }
}

impl Compound {
    fn matches(&self, tree: &Tree, node: NodeId) -> bool {
        tree.get(node)
            .is_some_and(|data| data.is_element() && self.matches_data(tree, data))
    }

    fn matches_data(&self, tree: &Tree, data: &NodeData) -> bool {
        if let Some(tag) = &self.tag {
            if data.tag() != Some(tag.as_str()) {
                return false;
            }
        }
        self.filters.iter().all(|f| f.matches(tree, data))
    }
}

impl Complex {
    fn matches(&self, tree: &Tree, node: NodeId) -> bool {
        // Right-most compound is the subject; walk leftwards through ancestors.
        let mut parts: Vec<&Compound> = Vec::with_capacity(self.tail.len() + 1);
        let mut combinators: Vec<Combinator> = Vec::with_capacity(self.tail.len());
        parts.push(&self.head);
        for (comb, part) in &self.tail {
            combinators.push(*comb);
            parts.push(part);
        }
        match_from(tree, &parts, &combinators, parts.len() - 1, node)
    }
}

fn match_from(
    tree: &Tree,
    parts: &[&Compound],
    combinators: &[Combinator],
    at: usize,
    node: NodeId,
) -> bool {
    if !parts[at].matches(tree, node) {
        return false;
    }
    if at == 0 {
        return true;
    }
    match combinators[at - 1] {
        Combinator::Child => tree
            .parent_element(node)
            .is_some_and(|p| match_from(tree, parts, combinators, at - 1, p)),
        Combinator::Descendant => {
            let mut current = tree.parent_element(node);
            while let Some(ancestor) = current {
                if match_from(tree, parts, combinators, at - 1, ancestor) {
                    return true;
                }
                current = tree.parent_element(ancestor);
            }
            false
        }
    }
}
