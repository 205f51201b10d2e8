//! XPath Parser
//!
//! Recursive descent parser for XPath 1.0 expressions. Abbreviations are
//! expanded while parsing: `.` is `self::node()`, `..` is `parent::node()`,
//! `@` is `attribute::` and `//` is `/descendant-or-self::node()/`.

use super::lexer::{Lexer, Token};
use crate::error::XPathError;

/// Deepest `(`, `[` or argument list nesting accepted
pub const MAX_NESTING: usize = 128;

/// Most operator, step and predicate nodes one expression may build
pub const MAX_NODES: usize = 1024;

/// XPath expression AST node
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Root path (/)
    Root,
    /// Union of two expressions (|)
    Union(Box<Expr>, Box<Expr>),
    /// Path expression (expr/step)
    Path(Box<Expr>, Box<Step>),
    /// Filter expression with predicate
    Filter(Box<Expr>, Box<Expr>),
    /// Function call
    Function(String, Vec<Expr>),
    /// Binary operation
    Binary(Box<Expr>, BinaryOp, Box<Expr>),
    /// Unary negation
    Negate(Box<Expr>),
    /// Literal number
    Number(f64),
    /// Literal string
    String(String),
    /// Variable reference
    Variable(String),
    /// Location step relative to the context node
    Step(Box<Step>),
}

/// Binary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Or,
    And,
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    Add,
    Sub,
    Mul,
    Div,
    Mod,
}

/// Location step in a path
#[derive(Debug, Clone, PartialEq)]
pub struct Step {
    pub axis: Axis,
    pub node_test: NodeTest,
    pub predicates: Vec<Expr>,
}

impl Step {
    fn bare(axis: Axis, node_test: NodeTest) -> Self {
        Step {
            axis,
            node_test,
            predicates: Vec::new(),
        }
    }
}

/// XPath axes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    Child,
    Descendant,
    DescendantOrSelf,
    Parent,
    Ancestor,
    AncestorOrSelf,
    FollowingSibling,
    PrecedingSibling,
    Following,
    Preceding,
    Self_,
    Attribute,
    Namespace,
}

impl Axis {
    pub fn from_name(s: &str) -> Option<Self> {
        match s {
            "child" => Some(Axis::Child),
            "descendant" => Some(Axis::Descendant),
            "descendant-or-self" => Some(Axis::DescendantOrSelf),
            "parent" => Some(Axis::Parent),
            "ancestor" => Some(Axis::Ancestor),
            "ancestor-or-self" => Some(Axis::AncestorOrSelf),
            "following-sibling" => Some(Axis::FollowingSibling),
            "preceding-sibling" => Some(Axis::PrecedingSibling),
            "following" => Some(Axis::Following),
            "preceding" => Some(Axis::Preceding),
            "self" => Some(Axis::Self_),
            "attribute" => Some(Axis::Attribute),
            "namespace" => Some(Axis::Namespace),
            _ => None,
        }
    }
}

/// Node test in a location step
#[derive(Debug, Clone, PartialEq)]
pub enum NodeTest {
    /// Matches any node of the axis' principal type (*)
    Any,
    /// Unprefixed name: principal node type in no namespace
    Name(String),
    /// prefix:localname
    QName(String, String),
    /// prefix:*
    NamespaceWildcard(String),
    /// node() - matches any node
    Node,
    /// text() - matches text and CDATA nodes
    Text,
    /// comment() - matches comments
    Comment,
    /// processing-instruction() - matches PIs, optionally by target
    ProcessingInstruction(Option<String>),
}

/// XPath parser
pub struct Parser<'a> {
    lexer: Lexer<'a>,
    current: Token,
    depth: usize,
    nodes: usize,
}

impl<'a> Parser<'a> {
    /// Create a new parser positioned on the first token
    pub fn new(input: &'a str) -> Result<Self, XPathError> {
        let mut lexer = Lexer::new(input);
        let current = lexer.next_token()?;
        Ok(Parser {
            lexer,
            current,
            depth: 0,
            nodes: 0,
        })
    }

    /// Parse a complete XPath expression
    pub fn parse(&mut self) -> Result<Expr, XPathError> {
        if self.current == Token::Eof {
            return Err(syntax("Empty expression"));
        }
        let expr = self.parse_expr()?;
        if self.current != Token::Eof {
            return Err(syntax(format!("Unexpected {} after expression", self.current)));
        }
        Ok(expr)
    }

    /// Advance to next token
    fn advance(&mut self) -> Result<(), XPathError> {
        self.current = self.lexer.next_token()?;
        Ok(())
    }

    fn expect(&mut self, expected: Token) -> Result<(), XPathError> {
        if self.current != expected {
            return Err(syntax(format!("Expected {}, found {}", expected, self.current)));
        }
        self.advance()
    }

    fn parse_expr(&mut self) -> Result<Expr, XPathError> {
        self.depth += 1;
        if self.depth > MAX_NESTING {
            return Err(syntax("Expression nested too deeply"));
        }
        let expr = self.parse_or_expr();
        self.depth -= 1;
        expr
    }

    /// Count one more composite node against the expression budget
    fn grow(&mut self) -> Result<(), XPathError> {
        self.nodes += 1;
        if self.nodes > MAX_NODES {
            return Err(syntax("Expression too complex"));
        }
        Ok(())
    }

    fn parse_or_expr(&mut self) -> Result<Expr, XPathError> {
        let mut left = self.parse_and_expr()?;

        while self.current == Token::Or {
            self.advance()?;
            self.grow()?;
            let right = self.parse_and_expr()?;
            left = Expr::Binary(Box::new(left), BinaryOp::Or, Box::new(right));
        }

        Ok(left)
    }

    fn parse_and_expr(&mut self) -> Result<Expr, XPathError> {
        let mut left = self.parse_equality_expr()?;

        while self.current == Token::And {
            self.advance()?;
            self.grow()?;
            let right = self.parse_equality_expr()?;
            left = Expr::Binary(Box::new(left), BinaryOp::And, Box::new(right));
        }

        Ok(left)
    }

    fn parse_equality_expr(&mut self) -> Result<Expr, XPathError> {
        let mut left = self.parse_relational_expr()?;

        loop {
            let op = match &self.current {
                Token::Eq => BinaryOp::Eq,
                Token::NotEq => BinaryOp::NotEq,
                _ => break,
            };
            self.advance()?;
            self.grow()?;
            let right = self.parse_relational_expr()?;
            left = Expr::Binary(Box::new(left), op, Box::new(right));
        }

        Ok(left)
    }

    fn parse_relational_expr(&mut self) -> Result<Expr, XPathError> {
        let mut left = self.parse_additive_expr()?;

        loop {
            let op = match &self.current {
                Token::Lt => BinaryOp::Lt,
                Token::LtEq => BinaryOp::LtEq,
                Token::Gt => BinaryOp::Gt,
                Token::GtEq => BinaryOp::GtEq,
                _ => break,
            };
            self.advance()?;
            self.grow()?;
            let right = self.parse_additive_expr()?;
            left = Expr::Binary(Box::new(left), op, Box::new(right));
        }

        Ok(left)
    }

    fn parse_additive_expr(&mut self) -> Result<Expr, XPathError> {
        let mut left = self.parse_multiplicative_expr()?;

        loop {
            let op = match &self.current {
                Token::Plus => BinaryOp::Add,
                Token::Minus => BinaryOp::Sub,
                _ => break,
            };
            self.advance()?;
            self.grow()?;
            let right = self.parse_multiplicative_expr()?;
            left = Expr::Binary(Box::new(left), op, Box::new(right));
        }

        Ok(left)
    }

    fn parse_multiplicative_expr(&mut self) -> Result<Expr, XPathError> {
        let mut left = self.parse_unary_expr()?;

        loop {
            let op = match &self.current {
                Token::Star => BinaryOp::Mul,
                Token::Div => BinaryOp::Div,
                Token::Mod => BinaryOp::Mod,
                _ => break,
            };
            self.advance()?;
            self.grow()?;
            let right = self.parse_unary_expr()?;
            left = Expr::Binary(Box::new(left), op, Box::new(right));
        }

        Ok(left)
    }

    fn parse_unary_expr(&mut self) -> Result<Expr, XPathError> {
        let mut negations = 0;
        while self.current == Token::Minus {
            self.advance()?;
            self.grow()?;
            negations += 1;
        }

        let mut expr = self.parse_union_expr()?;
        for _ in 0..negations {
            expr = Expr::Negate(Box::new(expr));
        }
        Ok(expr)
    }

    fn parse_union_expr(&mut self) -> Result<Expr, XPathError> {
        let mut left = self.parse_path_expr()?;

        while self.current == Token::Pipe {
            self.advance()?;
            self.grow()?;
            let right = self.parse_path_expr()?;
            left = Expr::Union(Box::new(left), Box::new(right));
        }

        Ok(left)
    }

    /// True if the current token can begin a location step
    fn at_step_start(&self) -> bool {
        matches!(
            self.current,
            Token::Name(_)
                | Token::NameTest(_)
                | Token::Star
                | Token::At
                | Token::Axis(_)
                | Token::NodeType(_)
                | Token::Dot
                | Token::DoubleDot
        )
    }

    fn parse_path_expr(&mut self) -> Result<Expr, XPathError> {
        let expr = match &self.current {
            Token::Slash => {
                self.advance()?;
                if !self.at_step_start() {
                    return Ok(Expr::Root);
                }
                let step = self.parse_step()?;
                Expr::Path(Box::new(Expr::Root), Box::new(step))
            }
            Token::DoubleSlash => {
                self.advance()?;
                let step = self.parse_step()?;
                descendant_path(Expr::Root, step)
            }
            _ if self.at_step_start() => {
                let step = self.parse_step()?;
                Expr::Step(Box::new(step))
            }
            _ => self.parse_filter_expr()?,
        };

        self.parse_path_continuation(expr)
    }

    /// Trailing `/step` and `//step` segments
    fn parse_path_continuation(&mut self, mut expr: Expr) -> Result<Expr, XPathError> {
        loop {
            match &self.current {
                Token::Slash => {
                    self.advance()?;
                    let step = self.parse_step()?;
                    expr = Expr::Path(Box::new(expr), Box::new(step));
                }
                Token::DoubleSlash => {
                    self.advance()?;
                    let step = self.parse_step()?;
                    expr = descendant_path(expr, step);
                }
                _ => break,
            }
        }
        Ok(expr)
    }

    /// Primary expression followed by predicates
    fn parse_filter_expr(&mut self) -> Result<Expr, XPathError> {
        let mut expr = self.parse_primary_expr()?;

        while self.current == Token::LeftBracket {
            self.grow()?;
            let pred = self.parse_predicate()?;
            expr = Expr::Filter(Box::new(expr), Box::new(pred));
        }

        Ok(expr)
    }

    fn parse_primary_expr(&mut self) -> Result<Expr, XPathError> {
        match &self.current {
            Token::Number(n) => {
                let n = *n;
                self.advance()?;
                Ok(Expr::Number(n))
            }
            Token::String(s) => {
                let s = s.clone();
                self.advance()?;
                Ok(Expr::String(s))
            }
            Token::Dollar => {
                self.advance()?;
                let name = match &self.current {
                    Token::Name(name) | Token::NameTest(name) => name.clone(),
                    other => return Err(syntax(format!("Expected variable name, found {}", other))),
                };
                self.advance()?;
                Ok(Expr::Variable(name))
            }
            Token::LeftParen => {
                self.advance()?;
                let expr = self.parse_expr()?;
                self.expect(Token::RightParen)?;
                Ok(expr)
            }
            Token::FunctionName(name) => {
                let name = name.clone();
                self.advance()?;
                self.expect(Token::LeftParen)?;
                self.grow()?;
                let args = self.parse_function_args()?;
                Ok(Expr::Function(name, args))
            }
            other => Err(syntax(format!("Unexpected {}", other))),
        }
    }

    /// Parse a location step, abbreviated forms included
    fn parse_step(&mut self) -> Result<Step, XPathError> {
        self.grow()?;
        let axis = match &self.current {
            Token::Dot => {
                self.advance()?;
                return Ok(Step::bare(Axis::Self_, NodeTest::Node));
            }
            Token::DoubleDot => {
                self.advance()?;
                return Ok(Step::bare(Axis::Parent, NodeTest::Node));
            }
            Token::At => {
                self.advance()?;
                Axis::Attribute
            }
            Token::Axis(name) => {
                let axis = Axis::from_name(name)
                    .ok_or_else(|| syntax(format!("Unknown axis '{}'", name)))?;
                self.advance()?;
                self.expect(Token::DoubleColon)?;
                axis
            }
            _ => Axis::Child,
        };

        let node_test = self.parse_node_test()?;

        let mut predicates = Vec::new();
        while self.current == Token::LeftBracket {
            self.grow()?;
            predicates.push(self.parse_predicate()?);
        }

        Ok(Step {
            axis,
            node_test,
            predicates,
        })
    }

    fn parse_node_test(&mut self) -> Result<NodeTest, XPathError> {
        let node_test = match &self.current {
            Token::Star => NodeTest::Any,
            Token::Name(name) => NodeTest::Name(name.clone()),
            Token::NameTest(qname) => match qname.split_once(':') {
                Some((prefix, "*")) => NodeTest::NamespaceWildcard(prefix.to_string()),
                Some((prefix, local)) => NodeTest::QName(prefix.to_string(), local.to_string()),
                None => NodeTest::Name(qname.clone()),
            },
            Token::NodeType(name) => {
                let name = name.clone();
                self.advance()?;
                self.expect(Token::LeftParen)?;
                let target = match &self.current {
                    Token::String(s) if name == "processing-instruction" => {
                        let s = s.clone();
                        self.advance()?;
                        Some(s)
                    }
                    _ => None,
                };
                self.expect(Token::RightParen)?;

                return Ok(match name.as_str() {
                    "node" => NodeTest::Node,
                    "text" => NodeTest::Text,
                    "comment" => NodeTest::Comment,
                    _ => NodeTest::ProcessingInstruction(target),
                });
            }
            other => return Err(syntax(format!("Expected node test, found {}", other))),
        };
        self.advance()?;
        Ok(node_test)
    }

    fn parse_predicate(&mut self) -> Result<Expr, XPathError> {
        self.expect(Token::LeftBracket)?;
        let pred = self.parse_expr()?;
        self.expect(Token::RightBracket)?;
        Ok(pred)
    }

    /// Arguments after the opening parenthesis, closing one included
    fn parse_function_args(&mut self) -> Result<Vec<Expr>, XPathError> {
        let mut args = Vec::new();

        if self.current != Token::RightParen {
            args.push(self.parse_expr()?);

            while self.current == Token::Comma {
                self.advance()?;
                args.push(self.parse_expr()?);
            }
        }

        self.expect(Token::RightParen)?;
        Ok(args)
    }
}

/// `base//step`, i.e. `base/descendant-or-self::node()/step`
fn descendant_path(base: Expr, step: Step) -> Expr {
    let desc = Step::bare(Axis::DescendantOrSelf, NodeTest::Node);
    Expr::Path(
        Box::new(Expr::Path(Box::new(base), Box::new(desc))),
        Box::new(step),
    )
}

fn syntax(message: impl Into<String>) -> XPathError {
    XPathError::Syntax(message.into())
}

/// Parse an XPath expression string
pub fn parse(input: &str) -> Result<Expr, XPathError> {
    Parser::new(input)?.parse()
}
