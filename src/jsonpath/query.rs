use super::location::{Location, Step};
use super::parser::{CompareOp, FilterExpr, FilterQuery, Operand, Segment, Selector};
use serde_json::Value;
use std::cmp::Ordering;

type Node<'a> = (Location, &'a Value);

/// Evaluate `segments` starting at `start`; `root` is what `$` refers to inside filters.
pub(crate) fn evaluate<'a>(
    segments: &[Segment],
    root: &'a Value,
    start: &'a Value,
    start_location: Location,
) -> Vec<Node<'a>> {
    let mut nodes = vec![(start_location, start)];
    for segment in segments {
        let mut next = Vec::new();
        for (location, value) in &nodes {
            match segment {
                Segment::Child(selectors) => {
                    for selector in selectors {
                        select(selector, root, location, *value, &mut next);
                    }
                }
                Segment::Descendant(selectors) => {
                    descend(selectors, root, location, *value, &mut next);
                }
            }
        }
        nodes = next;
    }
    nodes
}

fn descend<'a>(
    selectors: &[Selector],
    root: &'a Value,
    location: &Location,
    value: &'a Value,
    out: &mut Vec<Node<'a>>,
) {
    for selector in selectors {
        select(selector, root, location, value, out);
    }
    for (child_location, child) in children(location, value) {
        descend(selectors, root, &child_location, child, out);
    }
}

fn children<'a>(location: &Location, value: &'a Value) -> Vec<Node<'a>> {
    match value {
        Value::Object(map) => map
            .iter()
            .map(|(key, child)| (location.child(Step::Key(key.clone())), child))
            .collect(),
        Value::Array(items) => items
            .iter()
            .enumerate()
            .map(|(index, child)| (location.child(Step::Index(index)), child))
            .collect(),
        _ => Vec::new(),
    }
}

fn select<'a>(
    selector: &Selector,
    root: &'a Value,
    location: &Location,
    value: &'a Value,
    out: &mut Vec<Node<'a>>,
) {
    match selector {
        Selector::Name(name) => {
            if let Some(child) = value.as_object().and_then(|map| map.get(name)) {
                out.push((location.child(Step::Key(name.clone())), child));
            }
        }
        Selector::Wildcard => out.extend(children(location, value)),
        Selector::Index(index) => {
            if let Some(items) = value.as_array() {
                if let Some(resolved) = normalize_index(*index, items.len()) {
                    out.push((location.child(Step::Index(resolved)), &items[resolved]));
                }
            }
        }
        Selector::Slice { start, end, step } => {
            if let Some(items) = value.as_array() {
                for index in slice_indices(items.len(), *start, *end, *step) {
                    out.push((location.child(Step::Index(index)), &items[index]));
                }
            }
        }
        Selector::Filter(expr) => {
            for (child_location, child) in children(location, value) {
                if test(expr, root, child) {
                    out.push((child_location, child));
                }
            }
        }
    }
}

fn normalize_index(index: i64, len: usize) -> Option<usize> {
    let len = i64::try_from(len).ok()?;
    let resolved = if index < 0 { len + index } else { index };
    if (0..len).contains(&resolved) {
        usize::try_from(resolved).ok()
    } else {
        None
    }
}

fn slice_indices(len: usize, start: Option<i64>, end: Option<i64>, step: Option<i64>) -> Vec<usize> {
    let Ok(len) = i64::try_from(len) else {
        return Vec::new();
    };
    let step = step.unwrap_or(1);
    if step == 0 {
        return Vec::new();
    }
    let normalize = |i: i64| if i >= 0 { i } else { len + i };

    let mut indices = Vec::new();
    if step > 0 {
        let lower = normalize(start.unwrap_or(0)).clamp(0, len);
        let upper = normalize(end.unwrap_or(len)).clamp(0, len);
        let mut i = lower;
        while i < upper {
            indices.push(i as usize);
            i = match i.checked_add(step) {
                Some(next) => next,
                None => break,
            };
        }
    } else {
        let upper = start.map(normalize).unwrap_or(len - 1).clamp(-1, len - 1);
        let lower = end.map(normalize).unwrap_or(-1).clamp(-1, len - 1);
        let mut i = upper;
        while lower < i {
            indices.push(i as usize);
            i = match i.checked_add(step) {
                Some(next) => next,
                None => break,
            };
        }
    }
    indices
}

fn test(expr: &FilterExpr, root: &Value, current: &Value) -> bool {
    match expr {
        FilterExpr::Or(left, right) => test(left, root, current) || test(right, root, current),
        FilterExpr::And(left, right) => test(left, root, current) && test(right, root, current),
        FilterExpr::Not(inner) => !test(inner, root, current),
        FilterExpr::Exists(query) => !run_filter_query(query, root, current).is_empty(),
        FilterExpr::Compare { left, op, right } => {
            let left = operand_value(left, root, current);
            let right = operand_value(right, root, current);
            compare(left, *op, right)
        }
    }
}

fn run_filter_query<'a>(query: &FilterQuery, root: &'a Value, current: &'a Value) -> Vec<Node<'a>> {
    let start = if query.rooted { root } else { current };
    evaluate(&query.segments, root, start, Location::root())
}

fn operand_value<'a>(operand: &'a Operand, root: &'a Value, current: &'a Value) -> Option<&'a Value> {
    match operand {
        Operand::Literal(value) => Some(value),
        Operand::Query(query) => run_filter_query(query, root, current)
            .into_iter()
            .next()
            .map(|(_, value)| value),
    }
}

fn compare(left: Option<&Value>, op: CompareOp, right: Option<&Value>) -> bool {
    let (left, right) = match (left, right) {
        (Some(left), Some(right)) => (left, right),
        (None, None) => return matches!(op, CompareOp::Eq | CompareOp::Le | CompareOp::Ge),
        _ => return op == CompareOp::Ne,
    };
    match op {
        CompareOp::Eq => values_equal(left, right),
        CompareOp::Ne => !values_equal(left, right),
        CompareOp::Lt => ordering(left, right) == Some(Ordering::Less),
        CompareOp::Gt => ordering(left, right) == Some(Ordering::Greater),
        CompareOp::Le => matches!(ordering(left, right), Some(Ordering::Less | Ordering::Equal)),
        CompareOp::Ge => {
            matches!(ordering(left, right), Some(Ordering::Greater | Ordering::Equal))
        }
    }
}

fn values_equal(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Number(a), Value::Number(b)) => a.as_f64() == b.as_f64(),
        _ => left == right,
    }
}

fn ordering(left: &Value, right: &Value) -> Option<Ordering> {
    match (left, right) {
        (Value::Number(a), Value::Number(b)) => a.as_f64()?.partial_cmp(&b.as_f64()?),
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        _ => None,
    }
}
