//! A small CSS selector engine covering what the image loader and the
//! renderers query for: tag, `#id`, `.class`, `[attr]`, `[attr="value"]`,
//! `*`, descendant and child combinators, and comma-separated lists.

use std::fmt;
use std::str::FromStr;

use inkwell_model::ElementId;
use thiserror::Error;

use super::Page;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SelectorError {
    #[error("empty selector")]
    Empty,

    #[error("unexpected `{found}` at offset {offset} in `{selector}`")]
    Unexpected {
        selector: String,
        found: char,
        offset: usize,
    },

    #[error("unterminated attribute selector in `{0}`")]
    UnterminatedAttribute(String),

    #[error("combinator `{0}` is not supported")]
    UnsupportedCombinator(char),
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum AttributeMatch {
    Present,
    Equals(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
struct Compound {
    tag: Option<String>,
    id: Option<String>,
    classes: Vec<String>,
    attributes: Vec<(String, AttributeMatch)>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Combinator {
    Descendant,
    Child,
}

/// One complex selector, stored left to right. `steps[i].0` relates
/// `steps[i]` to `steps[i - 1]`; the first combinator is unused.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Complex {
    steps: Vec<(Combinator, Compound)>,
}

/// A parsed, comma-separated selector list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectorList {
    source: String,
    selectors: Vec<Complex>,
}

impl SelectorList {
    pub fn parse(raw: &str) -> Result<Self, SelectorError> {
        let selectors = raw
            .split(',')
            .map(|part| Parser::new(part, raw).complex())
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            source: raw.trim().to_string(),
            selectors,
        })
    }

    /// Parse several selector strings into one list.
    pub fn parse_all<S: AsRef<str>>(
        raws: &[S],
    ) -> Result<Self, SelectorError> {
        let joined = raws
            .iter()
            .map(|raw| raw.as_ref().trim())
            .collect::<Vec<_>>()
            .join(", ");
        Self::parse(&joined)
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    pub fn matches(&self, page: &Page, id: ElementId) -> bool {
        self.selectors.iter().any(|complex| complex.matches(page, id))
    }
}

impl FromStr for SelectorList {
    type Err = SelectorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for SelectorList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

impl Compound {
    fn matches(&self, page: &Page, id: ElementId) -> bool {
        let Some(element) = page.get(id) else {
            return false;
        };
        if let Some(tag) = &self.tag
            && !element.tag().eq_ignore_ascii_case(tag)
        {
            return false;
        }
        if let Some(wanted) = &self.id
            && element.attribute("id") != Some(wanted.as_str())
        {
            return false;
        }
        if !self.classes.iter().all(|class| element.has_class(class)) {
            return false;
        }
        self.attributes.iter().all(|(name, rule)| {
            match (element.attribute(name), rule) {
                (None, _) => false,
                (Some(_), AttributeMatch::Present) => true,
                (Some(actual), AttributeMatch::Equals(expected)) => {
                    actual == expected
                }
            }
        })
    }
}

impl Complex {
    fn matches(&self, page: &Page, id: ElementId) -> bool {
        self.matches_step(page, id, self.steps.len() - 1)
    }

    fn matches_step(&self, page: &Page, id: ElementId, index: usize) -> bool {
        let (combinator, compound) = &self.steps[index];
        if !compound.matches(page, id) {
            return false;
        }
        if index == 0 {
            return true;
        }
        match combinator {
            Combinator::Child => page
                .parent(id)
                .is_some_and(|parent| self.matches_step(page, parent, index - 1)),
            Combinator::Descendant => page
                .ancestors(id)
                .any(|ancestor| self.matches_step(page, ancestor, index - 1)),
        }
    }
}

struct Parser<'a> {
    whole: &'a str,
    chars: Vec<(usize, char)>,
    pos: usize,
}

fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '-' || c == '_'
}

impl<'a> Parser<'a> {
    fn new(part: &'a str, whole: &'a str) -> Self {
        Self {
            whole,
            chars: part.char_indices().collect(),
            pos: 0,
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).map(|(_, c)| *c)
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += 1;
        Some(c)
    }

    fn unexpected(&self) -> SelectorError {
        match self.chars.get(self.pos) {
            Some((offset, found)) => SelectorError::Unexpected {
                selector: self.whole.to_string(),
                found: *found,
                offset: *offset,
            },
            None => SelectorError::Empty,
        }
    }

    fn skip_whitespace(&mut self) -> bool {
        let start = self.pos;
        while self.peek().is_some_and(char::is_whitespace) {
            self.pos += 1;
        }
        self.pos > start
    }

    fn ident(&mut self) -> Result<String, SelectorError> {
        let mut out = String::new();
        while let Some(c) = self.peek().filter(|c| is_ident_char(*c)) {
            out.push(c);
            self.pos += 1;
        }
        if out.is_empty() {
            return Err(self.unexpected());
        }
        Ok(out)
    }

    fn complex(mut self) -> Result<Complex, SelectorError> {
        self.skip_whitespace();
        if self.peek().is_none() {
            return Err(SelectorError::Empty);
        }

        let mut steps = vec![(Combinator::Descendant, self.compound()?)];
        loop {
            let had_space = self.skip_whitespace();
            let combinator = match self.peek() {
                None => break,
                Some('>') => {
                    self.bump();
                    self.skip_whitespace();
                    Combinator::Child
                }
                Some(c @ ('+' | '~')) => {
                    return Err(SelectorError::UnsupportedCombinator(c));
                }
                Some(_) if had_space => Combinator::Descendant,
                Some(_) => return Err(self.unexpected()),
            };
            steps.push((combinator, self.compound()?));
        }
        Ok(Complex { steps })
    }

    fn compound(&mut self) -> Result<Compound, SelectorError> {
        let mut compound = Compound::default();
        let mut saw_any = false;

        match self.peek() {
            Some('*') => {
                self.bump();
                saw_any = true;
            }
            Some(c) if is_ident_char(c) => {
                compound.tag = Some(self.ident()?.to_ascii_lowercase());
                saw_any = true;
            }
            _ => {}
        }

        loop {
            match self.peek() {
                Some('#') => {
                    self.bump();
                    compound.id = Some(self.ident()?);
                }
                Some('.') => {
                    self.bump();
                    compound.classes.push(self.ident()?);
                }
                Some('[') => {
                    self.bump();
                    compound.attributes.push(self.attribute()?);
                }
                _ => break,
            }
            saw_any = true;
        }

        if !saw_any {
            return Err(self.unexpected());
        }
        Ok(compound)
    }

    fn attribute(&mut self) -> Result<(String, AttributeMatch), SelectorError> {
        self.skip_whitespace();
        let name = self.ident()?;
        self.skip_whitespace();
        let rule = match self.bump() {
            Some(']') => return Ok((name, AttributeMatch::Present)),
            Some('=') => {
                self.skip_whitespace();
                AttributeMatch::Equals(self.attribute_value()?)
            }
            Some(_) => {
                self.pos -= 1;
                return Err(self.unexpected());
            }
            None => {
                return Err(SelectorError::UnterminatedAttribute(
                    self.whole.to_string(),
                ));
            }
        };
        self.skip_whitespace();
        match self.bump() {
            Some(']') => Ok((name, rule)),
            _ => Err(SelectorError::UnterminatedAttribute(
                self.whole.to_string(),
            )),
        }
    }

    fn attribute_value(&mut self) -> Result<String, SelectorError> {
        match self.peek() {
            Some(quote @ ('"' | '\'')) => {
                self.bump();
                let mut out = String::new();
                loop {
                    match self.bump() {
                        Some(c) if c == quote => return Ok(out),
                        Some(c) => out.push(c),
                        None => {
                            return Err(SelectorError::UnterminatedAttribute(
                                self.whole.to_string(),
                            ));
                        }
                    }
                }
            }
            _ => self.ident(),
        }
    }
}
