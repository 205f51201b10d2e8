//! XPath Evaluation Engine
//!
//! Evaluates compiled XPath expressions against a document. Name test
//! prefixes are resolved through an explicit [`NamespaceContext`]; every
//! prefix an expression uses must be bound before evaluation starts.

use super::axes::{matches_node_test, navigate, principal_node_kind};
use super::compiler::{CompiledExpr, CompiledStep, Op};
use super::functions;
use super::namespaces::NamespaceContext;
use super::parser::BinaryOp;
use super::value::XPathValue;
use crate::dom::{node_string_value, DocumentAccess, NodeId};
use crate::error::XPathError;

/// Evaluation context - generic over document type
pub struct EvalContext<'a, D: DocumentAccess> {
    pub doc: &'a D,
    pub namespaces: &'a NamespaceContext,
    pub context_node: NodeId,
    pub context_position: usize,
    pub context_size: usize,
}

impl<'a, D: DocumentAccess> EvalContext<'a, D> {
    /// Context rooted at the document node
    pub fn new(doc: &'a D, namespaces: &'a NamespaceContext) -> Self {
        Self::at_node(doc, namespaces, doc.document_node_id())
    }

    fn at_node(doc: &'a D, namespaces: &'a NamespaceContext, context_node: NodeId) -> Self {
        EvalContext {
            doc,
            namespaces,
            context_node,
            context_position: 1,
            context_size: 1,
        }
    }

    fn with_focus(&self, context_node: NodeId, position: usize, size: usize) -> Self {
        EvalContext {
            doc: self.doc,
            namespaces: self.namespaces,
            context_node,
            context_position: position,
            context_size: size,
        }
    }
}

/// Compile and evaluate an expression with the document node as context
#[must_use = "XPath evaluation result should be used"]
pub fn evaluate<D: DocumentAccess>(
    doc: &D,
    xpath: &str,
    namespaces: &NamespaceContext,
) -> Result<XPathValue, XPathError> {
    let compiled = super::compiler::compile(xpath)?;
    evaluate_checked(&compiled, &EvalContext::new(doc, namespaces))
}

/// Evaluate a compiled expression that must yield a node-set, with the
/// document node as context. Nodes come back in document order.
pub fn select_nodes<D: DocumentAccess>(
    doc: &D,
    expr: &CompiledExpr,
    namespaces: &NamespaceContext,
) -> Result<Vec<NodeId>, XPathError> {
    let value = evaluate_checked(expr, &EvalContext::new(doc, namespaces))?;
    match value {
        XPathValue::NodeSet(nodes) => Ok(nodes),
        other => Err(XPathError::NotANodeSet(other.type_name())),
    }
}

/// Fail with `UndefinedPrefix` if the expression uses a prefix the context
/// does not bind
pub fn check_prefixes(expr: &CompiledExpr, namespaces: &NamespaceContext) -> Result<(), XPathError> {
    match expr.prefixes().into_iter().find(|p| !namespaces.contains(p)) {
        Some(prefix) => Err(XPathError::UndefinedPrefix(prefix.to_string())),
        None => Ok(()),
    }
}

fn evaluate_checked<D: DocumentAccess>(
    expr: &CompiledExpr,
    ctx: &EvalContext<'_, D>,
) -> Result<XPathValue, XPathError> {
    check_prefixes(expr, ctx.namespaces)?;
    evaluate_compiled(expr, ctx)
}

/// Evaluate a compiled expression
pub fn evaluate_compiled<D: DocumentAccess>(
    expr: &CompiledExpr,
    ctx: &EvalContext<'_, D>,
) -> Result<XPathValue, XPathError> {
    let mut stack: Vec<XPathValue> = Vec::new();

    for op in &expr.ops {
        match op {
            Op::Root => stack.push(XPathValue::single_node(ctx.doc.document_node_id())),

            Op::Context => stack.push(XPathValue::single_node(ctx.context_node)),

            Op::Step(step) => {
                let nodes = pop_nodeset(&mut stack, "a location step")?;
                stack.push(XPathValue::NodeSet(evaluate_step(ctx, step, &nodes)?));
            }

            Op::Filter(pred) => {
                let nodes = pop_nodeset(&mut stack, "a predicate")?;
                stack.push(XPathValue::NodeSet(apply_predicate(ctx, pred, nodes)?));
            }

            Op::Union => {
                let right = pop_nodeset(&mut stack, "'|'")?;
                let mut result = pop_nodeset(&mut stack, "'|'")?;
                result.extend(right);
                // Node ids follow document order
                result.sort_unstable();
                result.dedup();
                stack.push(XPathValue::NodeSet(result));
            }

            Op::Number(n) => stack.push(XPathValue::Number(*n)),

            Op::String(s) => stack.push(XPathValue::String(s.clone())),

            Op::Variable(name) => {
                return Err(XPathError::Evaluation(format!("Undefined variable ${}", name)));
            }

            Op::Negate => {
                let val = pop(&mut stack)?;
                stack.push(XPathValue::Number(-val.to_number(ctx.doc)));
            }

            Op::Binary(op) => {
                let right = pop(&mut stack)?;
                let left = pop(&mut stack)?;
                stack.push(binary(ctx.doc, *op, &left, &right));
            }

            Op::Call(name, arg_count) => {
                if stack.len() < *arg_count {
                    return Err(underflow());
                }
                let args = stack.split_off(stack.len() - arg_count);

                let result = functions::call(
                    name,
                    args,
                    ctx.doc,
                    ctx.context_node,
                    ctx.context_position,
                    ctx.context_size,
                )?;

                stack.push(result);
            }
        }
    }

    pop(&mut stack)
}

/// Apply one step to every node of the input set. Predicates see each
/// context node's candidates in axis order; the merged result is in
/// document order without duplicates.
fn evaluate_step<D: DocumentAccess>(
    ctx: &EvalContext<'_, D>,
    step: &CompiledStep,
    input: &[NodeId],
) -> Result<Vec<NodeId>, XPathError> {
    let principal = principal_node_kind(step.axis);
    let mut result = Vec::with_capacity(input.len());

    for &node in input {
        let mut selected: Vec<NodeId> = navigate(ctx.doc, node, step.axis)
            .into_iter()
            .filter(|&candidate| {
                matches_node_test(ctx.doc, candidate, &step.node_test, principal, ctx.namespaces)
            })
            .collect();

        for pred in &step.predicates {
            selected = apply_predicate(ctx, pred, selected)?;
        }
        result.extend(selected);
    }

    result.sort_unstable();
    result.dedup();
    Ok(result)
}

/// Keep the nodes for which the predicate holds. A numeric result is
/// compared against the node's position in `nodes`.
fn apply_predicate<D: DocumentAccess>(
    ctx: &EvalContext<'_, D>,
    pred: &CompiledExpr,
    nodes: Vec<NodeId>,
) -> Result<Vec<NodeId>, XPathError> {
    let size = nodes.len();
    let mut filtered = Vec::with_capacity(size);

    for (i, node) in nodes.into_iter().enumerate() {
        let position = i + 1;
        let pred_ctx = ctx.with_focus(node, position, size);

        let include = match evaluate_compiled(pred, &pred_ctx)? {
            XPathValue::Number(n) => position as f64 == n,
            other => other.to_boolean(),
        };

        if include {
            filtered.push(node);
        }
    }

    Ok(filtered)
}

fn underflow() -> XPathError {
    XPathError::Evaluation("Malformed expression: operand stack underflow".to_string())
}

fn pop(stack: &mut Vec<XPathValue>) -> Result<XPathValue, XPathError> {
    stack.pop().ok_or_else(underflow)
}

fn pop_nodeset(stack: &mut Vec<XPathValue>, what: &str) -> Result<Vec<NodeId>, XPathError> {
    match pop(stack)? {
        XPathValue::NodeSet(nodes) => Ok(nodes),
        other => Err(XPathError::Evaluation(format!(
            "Operand of {} must be a node-set, got a {}",
            what,
            other.type_name()
        ))),
    }
}

fn binary<D: DocumentAccess>(doc: &D, op: BinaryOp, left: &XPathValue, right: &XPathValue) -> XPathValue {
    let num = |v: &XPathValue| v.to_number(doc);
    match op {
        BinaryOp::Or => XPathValue::Boolean(left.to_boolean() || right.to_boolean()),
        BinaryOp::And => XPathValue::Boolean(left.to_boolean() && right.to_boolean()),
        BinaryOp::Add => XPathValue::Number(num(left) + num(right)),
        BinaryOp::Sub => XPathValue::Number(num(left) - num(right)),
        BinaryOp::Mul => XPathValue::Number(num(left) * num(right)),
        BinaryOp::Div => XPathValue::Number(num(left) / num(right)),
        // f64 remainder truncates like XPath mod
        BinaryOp::Mod => XPathValue::Number(num(left) % num(right)),
        BinaryOp::Eq
        | BinaryOp::NotEq
        | BinaryOp::Lt
        | BinaryOp::LtEq
        | BinaryOp::Gt
        | BinaryOp::GtEq => XPathValue::Boolean(compare(doc, op, left, right)),
    }
}

/// XPath 1.0 comparison. A node-set compares true if any of its nodes does;
/// against a boolean it is first converted with boolean().
fn compare<D: DocumentAccess>(doc: &D, op: BinaryOp, left: &XPathValue, right: &XPathValue) -> bool {
    match (left, right) {
        (XPathValue::NodeSet(ln), XPathValue::NodeSet(rn)) => {
            let right_values: Vec<XPathValue> = string_values(doc, rn).collect();
            string_values(doc, ln)
                .any(|l| right_values.iter().any(|r| compare_atomic(doc, op, &l, r)))
        }
        (XPathValue::NodeSet(nodes), other) => compare_node_set(doc, op, nodes, other),
        (other, XPathValue::NodeSet(nodes)) => compare_node_set(doc, swapped(op), nodes, other),
        _ => compare_atomic(doc, op, left, right),
    }
}

fn compare_node_set<D: DocumentAccess>(
    doc: &D,
    op: BinaryOp,
    nodes: &[NodeId],
    other: &XPathValue,
) -> bool {
    if let XPathValue::Boolean(_) = other {
        return compare_atomic(doc, op, &XPathValue::Boolean(!nodes.is_empty()), other);
    }
    string_values(doc, nodes).any(|value| compare_atomic(doc, op, &value, other))
}

fn string_values<'a, D: DocumentAccess>(
    doc: &'a D,
    nodes: &'a [NodeId],
) -> impl Iterator<Item = XPathValue> + 'a {
    nodes
        .iter()
        .map(move |&n| XPathValue::String(node_string_value(doc, n)))
}

/// Comparison of two values that are not node-sets
fn compare_atomic<D: DocumentAccess>(doc: &D, op: BinaryOp, left: &XPathValue, right: &XPathValue) -> bool {
    let equal = || match (left, right) {
        (XPathValue::Boolean(_), _) | (_, XPathValue::Boolean(_)) => {
            left.to_boolean() == right.to_boolean()
        }
        (XPathValue::Number(_), _) | (_, XPathValue::Number(_)) => {
            left.to_number(doc) == right.to_number(doc)
        }
        _ => left.to_string_value(doc) == right.to_string_value(doc),
    };

    let (l, r) = match op {
        BinaryOp::Eq => return equal(),
        BinaryOp::NotEq => return !equal(),
        _ => (left.to_number(doc), right.to_number(doc)),
    };
    match op {
        BinaryOp::Lt => l < r,
        BinaryOp::LtEq => l <= r,
        BinaryOp::Gt => l > r,
        BinaryOp::GtEq => l >= r,
        _ => false,
    }
}

/// The operator that gives the same answer with its operands exchanged
fn swapped(op: BinaryOp) -> BinaryOp {
    match op {
        BinaryOp::Lt => BinaryOp::Gt,
        BinaryOp::LtEq => BinaryOp::GtEq,
        BinaryOp::Gt => BinaryOp::Lt,
        BinaryOp::GtEq => BinaryOp::LtEq,
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::XmlDocument;

    fn doc(xml: &str) -> XmlDocument {
        XmlDocument::parse_str(xml).unwrap()
    }

    fn no_ns() -> NamespaceContext {
        NamespaceContext::new()
    }

    fn eval(d: &XmlDocument, xpath: &str) -> XPathValue {
        evaluate(d, xpath, &no_ns()).unwrap()
    }

    fn select(d: &XmlDocument, xpath: &str, ns: &NamespaceContext) -> Vec<String> {
        let compiled = super::super::compiler::compile(xpath).unwrap();
        select_nodes(d, &compiled, ns)
            .unwrap()
            .into_iter()
            .map(|n| node_string_value(d, n))
            .collect()
    }

    #[test]
    fn test_simple_path() {
        let d = doc("<root><child/></root>");
        let result = eval(&d, "/root/child");
        assert_eq!(result.as_nodeset().unwrap().len(), 1);
    }

    #[test]
    fn test_relative_path_from_document_node() {
        let d = doc("<root><child/></root>");
        assert_eq!(eval(&d, "root/child").as_nodeset().unwrap().len(), 1);
        assert_eq!(eval(&d, "child").as_nodeset().unwrap().len(), 0);
    }

    #[test]
    fn test_descendant() {
        let d = doc("<root><a><b/></a><b/></root>");
        assert_eq!(eval(&d, "//b").as_nodeset().unwrap().len(), 2);
    }

    #[test]
    fn test_positional_predicates_per_context_node() {
        let d = doc("<r><p><i>a</i><i>b</i></p><p><i>c</i><i>d</i></p></r>");
        assert_eq!(select(&d, "//i[1]", &no_ns()), ["a", "c"]);
        assert_eq!(select(&d, "(//i)[1]", &no_ns()), ["a"]);
        assert_eq!(select(&d, "//i[last()]", &no_ns()), ["b", "d"]);
        assert_eq!(select(&d, "/r/p/i[position() > 1]", &no_ns()), ["b", "d"]);
    }

    #[test]
    fn test_reverse_axis_positions() {
        let d = doc("<r><a>1</a><a>2</a><a>3</a></r>");
        assert_eq!(select(&d, "/r/a[3]/preceding-sibling::a[1]", &no_ns()), ["2"]);
        assert_eq!(select(&d, "/r/a[1]/following-sibling::a[1]", &no_ns()), ["2"]);
    }

    #[test]
    fn test_attribute_predicates() {
        let d = doc(r#"<rss><channel><item id="1">x</item><item id="2">y</item></channel></rss>"#);
        assert_eq!(select(&d, "/rss/channel/item[@id='1']", &no_ns()), ["x"]);
        assert_eq!(select(&d, "//item[@id > 1]", &no_ns()), ["y"]);
        assert_eq!(select(&d, "//item/@id", &no_ns()), ["1", "2"]);
        assert_eq!(eval(&d, "name(//item[2]/@*)"), XPathValue::from("id"));
    }

    #[test]
    fn test_abbreviated_steps() {
        let d = doc("<r><a><b>t</b></a></r>");
        assert_eq!(select(&d, "//b/..", &no_ns()), ["t"]);
        assert_eq!(eval(&d, "name(//b/..)"), XPathValue::from("a"));
        assert_eq!(select(&d, "//b/.", &no_ns()), ["t"]);
    }

    #[test]
    fn test_namespaced_selection() {
        let d = doc(r#"<rdf:RDF xmlns:rdf="urn:rdf" xmlns="urn:rss"><item rdf:about="a">1</item><rdf:li>2</rdf:li></rdf:RDF>"#);
        let ns: NamespaceContext = [("rdf", "urn:rdf"), ("default", "urn:rss")].into_iter().collect();
        assert_eq!(select(&d, "/rdf:RDF/default:item", &ns), ["1"]);
        assert_eq!(select(&d, "/rdf:RDF/item", &ns), Vec::<String>::new());
        assert_eq!(select(&d, "//rdf:*", &ns), ["12", "2"]);
        assert_eq!(select(&d, "//default:item[@rdf:about='a']", &ns), ["1"]);
    }

    #[test]
    fn test_undefined_prefix() {
        let d = doc("<r/>");
        let err = evaluate(&d, "//foo:item", &no_ns()).unwrap_err();
        assert_eq!(err, XPathError::UndefinedPrefix("foo".to_string()));
        let err = evaluate(&d, "/r[foo:x]", &no_ns()).unwrap_err();
        assert_eq!(err, XPathError::UndefinedPrefix("foo".to_string()));
    }

    #[test]
    fn test_xml_prefix_always_bound() {
        let d = doc(r#"<r xml:lang="en"/>"#);
        assert_eq!(eval(&d, "string(/r/@xml:lang)"), XPathValue::from("en"));
    }

    #[test]
    fn test_select_requires_node_set() {
        let d = doc("<r/>");
        let compiled = super::super::compiler::compile("count(//r)").unwrap();
        assert!(matches!(
            select_nodes(&d, &compiled, &no_ns()),
            Err(XPathError::NotANodeSet(_))
        ));
    }

    #[test]
    fn test_comparisons() {
        let d = doc("<r><a>1</a><a>2</a><b>2</b><c>x</c></r>");
        let truth = |xpath: &str| eval(&d, xpath).to_boolean();
        assert!(truth("//a = //b"));
        assert!(truth("//a != //b"));
        assert!(truth("//a = 1"));
        assert!(truth("//a > 1"));
        assert!(truth("1 < //a"));
        assert!(!truth("//a > 2"));
        assert!(truth("//c = 'x'"));
        assert!(truth("//a = true()"));
        assert!(truth("//missing = false()"));
        assert!(!truth("//missing = ''"));
        assert!(truth("'1.0' = 1"));
        assert!(!truth("'1.0' = '1'"));
        assert!(truth("true() = 'x'"));
    }

    #[test]
    fn test_arithmetic() {
        let d = doc("<r/>");
        assert_eq!(eval(&d, "1 + 2 * 3"), XPathValue::Number(7.0));
        assert_eq!(eval(&d, "7 mod 3"), XPathValue::Number(1.0));
        assert_eq!(eval(&d, "-7 mod 3"), XPathValue::Number(-1.0));
        assert_eq!(eval(&d, "6 div 4"), XPathValue::Number(1.5));
        assert_eq!(eval(&d, "--2"), XPathValue::Number(2.0));
        assert!(eval(&d, "1 div 0").to_number(&d).is_infinite());
    }

    #[test]
    fn test_union_document_order() {
        let d = doc("<r><a>1</a><b>2</b><a>3</a></r>");
        assert_eq!(select(&d, "//b | //a", &no_ns()), ["1", "2", "3"]);
        assert!(evaluate(&d, "//a | 1", &no_ns()).is_err());
    }

    #[test]
    fn test_node_type_tests() {
        let d = doc("<r>t<!--c--><?pi d?><![CDATA[cd]]></r>");
        assert_eq!(eval(&d, "count(/r/node())"), XPathValue::Number(4.0));
        assert_eq!(eval(&d, "count(/r/text())"), XPathValue::Number(2.0));
        assert_eq!(eval(&d, "string(/r/comment())"), XPathValue::from("c"));
        assert_eq!(eval(&d, "count(/r/processing-instruction('pi'))"), XPathValue::Number(1.0));
        assert_eq!(eval(&d, "count(/r/processing-instruction('other'))"), XPathValue::Number(0.0));
    }

    #[test]
    fn test_variables_rejected() {
        let d = doc("<r/>");
        assert!(matches!(evaluate(&d, "$x", &no_ns()), Err(XPathError::Evaluation(_))));
    }

    #[test]
    fn test_string_functions_through_paths() {
        let d = doc("<r><t>  Hello   World </t></r>");
        assert_eq!(eval(&d, "normalize-space(//t)"), XPathValue::from("Hello World"));
        assert_eq!(eval(&d, "string-length(normalize-space(//t))"), XPathValue::Number(11.0));
        assert!(eval(&d, "contains(//t, 'World')").to_boolean());
    }
}
