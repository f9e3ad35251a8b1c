//! XPath subset.
//!
//! Supported: absolute (`/a/b`), descendant (`//a`) and scoped (`.//a`)
//! location paths; `*` and tag name tests; positional `[n]`, `[@attr]`,
//! `[@attr='v']`, `[contains(@attr, 'v')]`, `[contains(., 'v')]` and
//! `[contains(normalize-space(.), 'v')]` predicates; and one outer
//! `(path)[n]` position filter. String values of elements are their
//! whitespace-collapsed text.

use std::collections::BTreeSet;

/// Read-only view of the element tree an expression is evaluated against.
pub(crate) trait NodeTree {
    /// Top-level elements (the document element).
    fn roots(&self) -> Vec<usize>;
    fn children(&self, node: usize) -> Vec<usize>;
    fn tag(&self, node: usize) -> &str;
    fn attr(&self, node: usize, name: &str) -> Option<&str>;
    fn text(&self, node: usize) -> &str;
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct XPathExpr {
    path: Path,
    position: Option<usize>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
struct Path {
    scoped: bool,
    steps: Vec<Step>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Axis {
    Child,
    Descendant,
}

#[derive(Clone, Debug, PartialEq, Eq)]
struct Step {
    axis: Axis,
    name: Option<String>,
    predicates: Vec<Predicate>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
enum Operand {
    Text,
    Attr(String),
}

#[derive(Clone, Debug, PartialEq, Eq)]
enum Predicate {
    Position(usize),
    AttrExists(String),
    AttrEquals(String, String),
    Contains(Operand, String),
}

pub fn parse_xpath(input: &str) -> Result<XPathExpr, String> {
    let mut cursor = Cursor::new(input.trim());
    let expr = if cursor.eat('(') {
        let path = cursor.path()?;
        cursor.expect(')')?;
        cursor.expect('[')?;
        let position = cursor.number()?;
        cursor.expect(']')?;
        XPathExpr {
            path,
            position: Some(position),
        }
    } else {
        XPathExpr {
            path: cursor.path()?,
            position: None,
        }
    };
    cursor.skip_ws();
    if !cursor.at_end() {
        return Err(format!("unexpected input at offset {}", cursor.pos));
    }
    Ok(expr)
}

impl XPathExpr {
    /// Matching nodes in document order. `scope` is the context node for
    /// `.//` paths; absolute paths ignore it.
    pub(crate) fn evaluate<T: NodeTree>(&self, tree: &T, scope: Option<usize>) -> Vec<usize> {
        let mut context: Vec<Option<usize>> = if self.path.scoped { vec![scope] } else { vec![None] };

        for step in &self.path.steps {
            let mut next = BTreeSet::new();
            for node in &context {
                let parents = match step.axis {
                    Axis::Child => vec![*node],
                    Axis::Descendant => descendants_or_self(tree, *node),
                };
                for parent in parents {
                    let kids = match parent {
                        Some(parent) => tree.children(parent),
                        None => tree.roots(),
                    };
                    let mut matched: Vec<usize> = kids
                        .into_iter()
                        .filter(|kid| step.name.as_deref().map_or(true, |name| tree.tag(*kid) == name))
                        .collect();
                    for predicate in &step.predicates {
                        matched = apply(tree, predicate, matched);
                    }
                    next.extend(matched);
                }
            }
            context = next.into_iter().map(Some).collect();
        }

        let nodes: Vec<usize> = context.into_iter().flatten().collect();
        match self.position {
            Some(position) => nodes.get(position.wrapping_sub(1)).copied().into_iter().collect(),
            None => nodes,
        }
    }
}

fn descendants_or_self<T: NodeTree>(tree: &T, node: Option<usize>) -> Vec<Option<usize>> {
    let mut out = vec![node];
    let mut stack: Vec<usize> = match node {
        Some(node) => tree.children(node),
        None => tree.roots(),
    };
    stack.reverse();
    while let Some(current) = stack.pop() {
        out.push(Some(current));
        let mut kids = tree.children(current);
        kids.reverse();
        stack.extend(kids);
    }
    out
}

fn apply<T: NodeTree>(tree: &T, predicate: &Predicate, nodes: Vec<usize>) -> Vec<usize> {
    match predicate {
        Predicate::Position(position) => nodes
            .get(position.wrapping_sub(1))
            .copied()
            .into_iter()
            .collect(),
        Predicate::AttrExists(name) => nodes
            .into_iter()
            .filter(|node| tree.attr(*node, name).is_some())
            .collect(),
        Predicate::AttrEquals(name, value) => nodes
            .into_iter()
            .filter(|node| tree.attr(*node, name) == Some(value.as_str()))
            .collect(),
        Predicate::Contains(Operand::Text, needle) => nodes
            .into_iter()
            .filter(|node| tree.text(*node).contains(needle.as_str()))
            .collect(),
        Predicate::Contains(Operand::Attr(name), needle) => nodes
            .into_iter()
            .filter(|node| {
                tree.attr(*node, name)
                    .is_some_and(|value| value.contains(needle.as_str()))
            })
            .collect(),
    }
}

struct Cursor {
    chars: Vec<char>,
    pos: usize,
}

impl Cursor {
    fn new(input: &str) -> Self {
        Self {
            chars: input.chars().collect(),
            pos: 0,
        }
    }

    fn at_end(&self) -> bool {
        self.pos >= self.chars.len()
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn starts_with(&self, text: &str) -> bool {
        let mut pos = self.pos;
        for expected in text.chars() {
            if self.chars.get(pos) != Some(&expected) {
                return false;
            }
            pos += 1;
        }
        true
    }

    fn eat_str(&mut self, text: &str) -> bool {
        if self.starts_with(text) {
            self.pos += text.chars().count();
            true
        } else {
            false
        }
    }

    fn skip_ws(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.pos += 1;
        }
    }

    fn eat(&mut self, expected: char) -> bool {
        self.skip_ws();
        if self.peek() == Some(expected) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, expected: char) -> Result<(), String> {
        if self.eat(expected) {
            Ok(())
        } else {
            Err(format!("expected '{expected}' at offset {}", self.pos))
        }
    }

    fn path(&mut self) -> Result<Path, String> {
        self.skip_ws();
        let scoped = self.eat_str(".");
        let mut steps = Vec::new();
        loop {
            let axis = if self.eat_str("//") {
                Axis::Descendant
            } else if self.eat_str("/") {
                Axis::Child
            } else {
                break;
            };
            steps.push(self.step(axis)?);
        }
        if steps.is_empty() {
            return Err(format!("expected location step at offset {}", self.pos));
        }
        Ok(Path { scoped, steps })
    }

    fn step(&mut self, axis: Axis) -> Result<Step, String> {
        let name = if self.eat_str("*") {
            None
        } else {
            Some(self.name()?.to_ascii_lowercase())
        };
        let mut predicates = Vec::new();
        while self.peek() == Some('[') {
            self.pos += 1;
            predicates.push(self.predicate()?);
            self.expect(']')?;
        }
        Ok(Step {
            axis,
            name,
            predicates,
        })
    }

    fn predicate(&mut self) -> Result<Predicate, String> {
        self.skip_ws();
        if self.peek().is_some_and(|c| c.is_ascii_digit()) {
            return Ok(Predicate::Position(self.number()?));
        }
        if self.eat_str("@") {
            let name = self.name()?;
            if self.eat('=') {
                self.skip_ws();
                let value = self.literal()?;
                return Ok(Predicate::AttrEquals(name, value));
            }
            return Ok(Predicate::AttrExists(name));
        }
        if self.eat_str("contains") {
            self.expect('(')?;
            self.skip_ws();
            let operand = self.operand()?;
            self.expect(',')?;
            self.skip_ws();
            let needle = self.literal()?;
            self.expect(')')?;
            return Ok(Predicate::Contains(operand, needle));
        }
        Err(format!("unsupported predicate at offset {}", self.pos))
    }

    fn operand(&mut self) -> Result<Operand, String> {
        if self.eat_str("normalize-space") {
            self.expect('(')?;
            self.expect('.')?;
            self.expect(')')?;
            return Ok(Operand::Text);
        }
        if self.eat_str(".") {
            return Ok(Operand::Text);
        }
        if self.eat_str("@") {
            return Ok(Operand::Attr(self.name()?));
        }
        Err(format!("unsupported operand at offset {}", self.pos))
    }

    fn name(&mut self) -> Result<String, String> {
        let start = self.pos;
        while self
            .peek()
            .is_some_and(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | ':'))
        {
            self.pos += 1;
        }
        if self.pos == start {
            return Err(format!("expected name at offset {start}"));
        }
        Ok(self.chars[start..self.pos].iter().collect())
    }

    fn number(&mut self) -> Result<usize, String> {
        self.skip_ws();
        let start = self.pos;
        while self.peek().is_some_and(|c| c.is_ascii_digit()) {
            self.pos += 1;
        }
        let digits: String = self.chars[start..self.pos].iter().collect();
        digits
            .parse()
            .map_err(|_| format!("expected number at offset {start}"))
    }

    fn literal(&mut self) -> Result<String, String> {
        let quote = match self.peek() {
            Some(q @ ('\'' | '"')) => q,
            _ => return Err(format!("expected string literal at offset {}", self.pos)),
        };
        self.pos += 1;
        let start = self.pos;
        while self.peek().is_some_and(|c| c != quote) {
            self.pos += 1;
        }
        if self.at_end() {
            return Err("unterminated string literal".to_string());
        }
        let value = self.chars[start..self.pos].iter().collect();
        self.pos += 1;
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_resolver_expressions() {
        for expr in [
            "/html/body/div[2]/a[@class='nav item']",
            "//a[@id=\"it's\"]",
            "(//li[@id='dup'])[2]",
            "//input[contains(@href, '/x')]",
            "/html/body/ul/li[contains(normalize-space(.), 'Two')]",
            ".//img",
            "//*[@id='main']",
        ] {
            assert!(parse_xpath(expr).is_ok(), "{expr}");
        }
    }

    #[test]
    fn rejects_unsupported_syntax() {
        assert!(parse_xpath("a/b").is_err());
        assert!(parse_xpath("//a[last()]").is_err());
        assert!(parse_xpath("//a[@id='x'").is_err());
        assert!(parse_xpath("//a[@id='x]").is_err());
    }

    #[test]
    fn outer_position_is_recorded() {
        let expr = parse_xpath("(//a)[3]").unwrap();
        assert_eq!(expr.position, Some(3));
        assert_eq!(expr.path.steps.len(), 1);
        assert_eq!(expr.path.steps[0].axis, Axis::Descendant);
    }
}
