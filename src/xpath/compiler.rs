//! XPath Expression Compiler
//!
//! Compiles parsed XPath expressions into a flat stack program. Compiled
//! expressions hold no document or namespace state, so one compilation can
//! be shared by every request that uses the same expression text.

use super::parser::{Axis, BinaryOp, Expr, NodeTest, Step};
use crate::error::XPathError;

/// Compiled XPath expression
#[derive(Debug, Clone)]
pub struct CompiledExpr {
    pub ops: Vec<Op>,
}

/// Compiled operation
#[derive(Debug, Clone)]
pub enum Op {
    /// Push the document node
    Root,
    /// Push the context node
    Context,
    /// Replace the node-set on top of the stack with a step's result
    Step(CompiledStep),
    /// Apply a predicate to the node-set on top of the stack, in document order
    Filter(Box<CompiledExpr>),
    /// Union two node sets
    Union,
    /// Push literal number
    Number(f64),
    /// Push literal string
    String(String),
    /// Call function
    Call(String, usize), // name, arg count
    /// Binary operation
    Binary(BinaryOp),
    /// Negate
    Negate,
    /// Variable reference
    Variable(String),
}

/// A location step with its predicates, evaluated per context node
#[derive(Debug, Clone)]
pub struct CompiledStep {
    pub axis: Axis,
    pub node_test: CompiledNodeTest,
    pub predicates: Vec<CompiledExpr>,
}

/// Compiled node test
#[derive(Debug, Clone, PartialEq)]
pub enum CompiledNodeTest {
    Any,
    Name(String),
    QName(String, String),
    NamespaceWildcard(String),
    Node,
    Text,
    Comment,
    ProcessingInstruction(Option<String>),
}

impl CompiledNodeTest {
    /// Namespace prefix the test refers to, if any
    pub fn prefix(&self) -> Option<&str> {
        match self {
            CompiledNodeTest::QName(prefix, _) | CompiledNodeTest::NamespaceWildcard(prefix) => {
                Some(prefix)
            }
            _ => None,
        }
    }
}

impl CompiledExpr {
    /// Compile an XPath expression
    pub fn compile(expr: &Expr) -> Self {
        let mut ops = Vec::new();
        Self::compile_expr(expr, &mut ops);
        CompiledExpr { ops }
    }

    fn compile_expr(expr: &Expr, ops: &mut Vec<Op>) {
        match expr {
            Expr::Root => ops.push(Op::Root),
            Expr::Number(n) => ops.push(Op::Number(*n)),
            Expr::String(s) => ops.push(Op::String(s.clone())),
            Expr::Variable(name) => ops.push(Op::Variable(name.clone())),
            Expr::Negate(inner) => {
                Self::compile_expr(inner, ops);
                ops.push(Op::Negate);
            }
            Expr::Binary(left, op, right) => {
                Self::compile_expr(left, ops);
                Self::compile_expr(right, ops);
                ops.push(Op::Binary(*op));
            }
            Expr::Union(left, right) => {
                Self::compile_expr(left, ops);
                Self::compile_expr(right, ops);
                ops.push(Op::Union);
            }
            Expr::Path(base, step) => {
                Self::compile_expr(base, ops);
                ops.push(Op::Step(Self::compile_step(step)));
            }
            Expr::Filter(base, pred) => {
                Self::compile_expr(base, ops);
                ops.push(Op::Filter(Box::new(CompiledExpr::compile(pred))));
            }
            Expr::Step(step) => {
                ops.push(Op::Context);
                ops.push(Op::Step(Self::compile_step(step)));
            }
            Expr::Function(name, args) => {
                for arg in args {
                    Self::compile_expr(arg, ops);
                }
                ops.push(Op::Call(name.clone(), args.len()));
            }
        }
    }

    fn compile_step(step: &Step) -> CompiledStep {
        let node_test = match &step.node_test {
            NodeTest::Any => CompiledNodeTest::Any,
            NodeTest::Name(n) => CompiledNodeTest::Name(n.clone()),
            NodeTest::QName(ns, local) => CompiledNodeTest::QName(ns.clone(), local.clone()),
            NodeTest::NamespaceWildcard(ns) => CompiledNodeTest::NamespaceWildcard(ns.clone()),
            NodeTest::Node => CompiledNodeTest::Node,
            NodeTest::Text => CompiledNodeTest::Text,
            NodeTest::Comment => CompiledNodeTest::Comment,
            NodeTest::ProcessingInstruction(arg) => {
                CompiledNodeTest::ProcessingInstruction(arg.clone())
            }
        };

        CompiledStep {
            axis: step.axis,
            node_test,
            predicates: step.predicates.iter().map(CompiledExpr::compile).collect(),
        }
    }

    /// Every namespace prefix used by a node test, predicates included,
    /// sorted and deduplicated
    pub fn prefixes(&self) -> Vec<&str> {
        let mut out = Vec::new();
        self.collect_prefixes(&mut out);
        out.sort_unstable();
        out.dedup();
        out
    }

    fn collect_prefixes<'a>(&'a self, out: &mut Vec<&'a str>) {
        for op in &self.ops {
            match op {
                Op::Step(step) => {
                    out.extend(step.node_test.prefix());
                    for pred in &step.predicates {
                        pred.collect_prefixes(out);
                    }
                }
                Op::Filter(pred) => pred.collect_prefixes(out),
                _ => {}
            }
        }
    }
}

/// Compile an XPath expression string
pub fn compile(xpath: &str) -> Result<CompiledExpr, XPathError> {
    let expr = super::parser::parse(xpath)?;
    Ok(CompiledExpr::compile(&expr))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compile_simple() {
        let compiled = compile("/root").unwrap();
        assert_eq!(compiled.ops.len(), 2);
        assert!(matches!(compiled.ops[0], Op::Root));
        assert!(matches!(
            &compiled.ops[1],
            Op::Step(step) if step.node_test == CompiledNodeTest::Name("root".to_string())
        ));
    }

    #[test]
    fn test_compile_relative_step_starts_at_context() {
        let compiled = compile("item").unwrap();
        assert!(matches!(compiled.ops[0], Op::Context));
    }

    #[test]
    fn test_predicates_stay_on_their_step() {
        let compiled = compile("//item[1]").unwrap();
        let Some(Op::Step(step)) = compiled.ops.last() else {
            panic!("expected a trailing step");
        };
        assert_eq!(step.predicates.len(), 1);
    }

    #[test]
    fn test_prefixes_collected() {
        let compiled = compile("/rdf:RDF/default:item[dc:subject = 'x' and @rdf:about] | //rdf:*").unwrap();
        assert_eq!(compiled.prefixes(), vec!["dc", "default", "rdf"]);
    }

    #[test]
    fn test_prefixes_inside_filter_and_function_args() {
        let compiled = compile("count((//a)[foo:b])").unwrap();
        assert_eq!(compiled.prefixes(), vec!["foo"]);
    }

    #[test]
    fn test_compile_error() {
        assert!(matches!(compile("["), Err(XPathError::Syntax(_))));
    }
}
