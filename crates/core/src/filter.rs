//! Query-filter construction from request arguments.
//!
//! A filter key is `field` (equality) or `field.operator`. Every filter list
//! starts with `active = TRUE`, so soft-deleted rows never match. Predicates
//! are plain data here; the db crate renders them to SQL and
//! [`Predicate::matches`] evaluates them in memory.

use std::cmp::Ordering;
use std::marker::PhantomData;

use regex::RegexBuilder;
use serde_json::Value;

use crate::entity::Serializable;
use crate::error::CoreError;
use crate::field::{ColumnKind, FieldValue};

// ---------------------------------------------------------------------------
// Arguments
// ---------------------------------------------------------------------------

/// Ordered, possibly multi-valued string arguments (as from a URL query).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryArgs {
    pairs: Vec<(String, String)>,
}

impl QueryArgs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a value; repeated keys accumulate.
    pub fn push(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.pairs.push((key.into(), value.into()));
    }

    /// First value supplied for `key`.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Every value supplied for `key`, in order.
    pub fn get_all(&self, key: &str) -> Vec<&str> {
        self.pairs
            .iter()
            .filter(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
            .collect()
    }

    /// Distinct keys in first-appearance order.
    pub fn keys(&self) -> Vec<&str> {
        let mut keys: Vec<&str> = Vec::new();
        for (k, _) in &self.pairs {
            if !keys.contains(&k.as_str()) {
                keys.push(k);
            }
        }
        keys
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for QueryArgs {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            pairs: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

// ---------------------------------------------------------------------------
// Predicates
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmpOp {
    Eq,
    Gt,
    Ge,
    Lt,
    Le,
}

impl CmpOp {
    /// Map a filter-key operator name to a comparison.
    pub fn from_operator(op: &str) -> Option<Self> {
        match op {
            "greaterthanorequal" => Some(CmpOp::Ge),
            "greaterthan" => Some(CmpOp::Gt),
            "lessthanorequal" => Some(CmpOp::Le),
            "lessthan" => Some(CmpOp::Lt),
            _ => None,
        }
    }

    pub fn sql(self) -> &'static str {
        match self {
            CmpOp::Eq => "=",
            CmpOp::Gt => ">",
            CmpOp::Ge => ">=",
            CmpOp::Lt => "<",
            CmpOp::Le => "<=",
        }
    }

    fn holds(self, ord: Ordering) -> bool {
        match self {
            CmpOp::Eq => ord == Ordering::Equal,
            CmpOp::Gt => ord == Ordering::Greater,
            CmpOp::Ge => ord != Ordering::Less,
            CmpOp::Lt => ord == Ordering::Less,
            CmpOp::Le => ord != Ordering::Greater,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatternOp {
    Like,
    ILike,
}

impl PatternOp {
    pub fn sql(self) -> &'static str {
        match self {
            PatternOp::Like => "LIKE",
            PatternOp::ILike => "ILIKE",
        }
    }
}

/// Right-hand side of a comparison.
///
/// Only boolean literals are interpreted; everything else stays raw text and
/// is cast to the column type where it is used.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterValue {
    Bool(bool),
    Text(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    Compare {
        column: &'static str,
        kind: ColumnKind,
        op: CmpOp,
        value: FilterValue,
    },
    Pattern {
        column: &'static str,
        op: PatternOp,
        pattern: String,
    },
    In {
        column: &'static str,
        kind: ColumnKind,
        values: Vec<String>,
    },
}

impl Predicate {
    /// `active = TRUE`.
    pub fn active() -> Self {
        Predicate::Compare {
            column: "active",
            kind: ColumnKind::Boolean,
            op: CmpOp::Eq,
            value: FilterValue::Bool(true),
        }
    }

    pub fn column(&self) -> &'static str {
        match self {
            Predicate::Compare { column, .. }
            | Predicate::Pattern { column, .. }
            | Predicate::In { column, .. } => column,
        }
    }

    /// Evaluate against the current value of [`column`](Self::column).
    ///
    /// Follows SQL semantics: `NULL` never matches, and text that cannot be
    /// read as the column type never matches.
    pub fn matches(&self, value: &FieldValue) -> bool {
        if value.is_null() {
            return false;
        }
        match self {
            Predicate::Compare {
                kind, op, value: rhs, ..
            } => {
                let rhs = match rhs {
                    FilterValue::Bool(b) => FieldValue::Bool(*b),
                    FilterValue::Text(s) => match text_as(*kind, s) {
                        Some(v) => v,
                        None => return false,
                    },
                };
                compare(value, &rhs).is_some_and(|ord| op.holds(ord))
            }
            Predicate::Pattern { op, pattern, .. } => match value {
                FieldValue::Text(s) => like(*op, pattern, s),
                _ => false,
            },
            Predicate::In { kind, values, .. } => values.iter().any(|s| {
                text_as(*kind, s).is_some_and(|rhs| compare(value, &rhs) == Some(Ordering::Equal))
            }),
        }
    }
}

fn text_as(kind: ColumnKind, text: &str) -> Option<FieldValue> {
    let raw = match kind {
        ColumnKind::Json => serde_json::from_str(text).ok()?,
        _ => Value::String(text.to_string()),
    };
    FieldValue::coerce("filter", kind, &raw).ok()
}

fn compare(a: &FieldValue, b: &FieldValue) -> Option<Ordering> {
    match (a, b) {
        (FieldValue::Bool(x), FieldValue::Bool(y)) => Some(x.cmp(y)),
        (FieldValue::Int(x), FieldValue::Int(y)) => Some(x.cmp(y)),
        (FieldValue::Float(x), FieldValue::Float(y)) => x.partial_cmp(y),
        (FieldValue::Int(x), FieldValue::Float(y)) => (*x as f64).partial_cmp(y),
        (FieldValue::Float(x), FieldValue::Int(y)) => x.partial_cmp(&(*y as f64)),
        (FieldValue::Text(x), FieldValue::Text(y)) => Some(x.cmp(y)),
        (FieldValue::DateTime(x), FieldValue::DateTime(y)) => Some(x.cmp(y)),
        (FieldValue::Json(x), FieldValue::Json(y)) => (x == y).then_some(Ordering::Equal),
        _ => None,
    }
}

/// SQL `LIKE` / `ILIKE` with `%` and `_` wildcards and `\` escapes.
fn like(op: PatternOp, pattern: &str, text: &str) -> bool {
    let mut re = String::from("^");
    let mut chars = pattern.chars();
    while let Some(c) = chars.next() {
        match c {
            '%' => re.push_str("(?s:.*)"),
            '_' => re.push_str("(?s:.)"),
            '\\' => {
                if let Some(next) = chars.next() {
                    re.push_str(&regex::escape(&next.to_string()));
                }
            }
            other => re.push_str(&regex::escape(&other.to_string())),
        }
    }
    re.push('$');
    RegexBuilder::new(&re)
        .case_insensitive(op == PatternOp::ILike)
        .build()
        .is_ok_and(|r| r.is_match(text))
}

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

fn unknown(key: &str) -> CoreError {
    CoreError::UnknownFilter(key.to_string())
}

/// Translate request arguments into predicates over `E`.
///
/// - `field`: equality; boolean columns read `"true"` / `"false"`.
/// - `field.like`, `field.ilike`: pattern match, skipped when empty.
/// - `field.in`: membership over every value given for the key, skipped when
///   none are given.
/// - `field.greaterthan` and friends: comparison, skipped when empty.
///
/// Single-segment keys naming no field are ignored so unrelated parameters
/// can share the query string. Any other unrecognized key fails with
/// [`CoreError::UnknownFilter`].
pub fn args_to_filter_params<E: Serializable>(args: &QueryArgs) -> Result<Vec<Predicate>, CoreError> {
    let spec = E::spec();
    let mut filters = vec![Predicate::active()];

    for key in args.keys() {
        let bits: Vec<&str> = key.split('.').collect();
        let field = spec.field(bits[0]);

        match (field, bits.as_slice()) {
            (_, [_, _, _, ..]) => return Err(unknown(key)),
            (None, [_]) => continue,
            (None, _) => return Err(unknown(key)),
            (Some(field), [_]) => {
                let raw = args.get(key).unwrap_or_default();
                let value = match (field.kind, raw) {
                    (ColumnKind::Boolean, "true") => FilterValue::Bool(true),
                    (ColumnKind::Boolean, "false") => FilterValue::Bool(false),
                    _ => FilterValue::Text(raw.to_string()),
                };
                filters.push(Predicate::Compare {
                    column: field.name,
                    kind: field.kind,
                    op: CmpOp::Eq,
                    value,
                });
            }
            (Some(field), [_, op]) => {
                let raw = args.get(key).unwrap_or_default();
                match *op {
                    "like" | "ilike" => {
                        if !raw.is_empty() {
                            filters.push(Predicate::Pattern {
                                column: field.name,
                                op: if *op == "like" {
                                    PatternOp::Like
                                } else {
                                    PatternOp::ILike
                                },
                                pattern: raw.to_string(),
                            });
                        }
                    }
                    "in" => {
                        let values = args.get_all(key);
                        if !values.is_empty() {
                            filters.push(Predicate::In {
                                column: field.name,
                                kind: field.kind,
                                values: values.into_iter().map(str::to_string).collect(),
                            });
                        }
                    }
                    other => {
                        let cmp = CmpOp::from_operator(other).ok_or_else(|| unknown(key))?;
                        if !raw.is_empty() {
                            filters.push(Predicate::Compare {
                                column: field.name,
                                kind: field.kind,
                                op: cmp,
                                value: FilterValue::Text(raw.to_string()),
                            });
                        }
                    }
                }
            }
            (Some(_), _) => return Err(unknown(key)),
        }
    }

    Ok(filters)
}

/// Predicates over one entity type, restricted to active rows.
#[derive(Debug, Clone)]
pub struct EntityQuery<E> {
    filters: Vec<Predicate>,
    _entity: PhantomData<fn() -> E>,
}

impl<E: Serializable> EntityQuery<E> {
    /// Wrap `filters`, prepending `active = TRUE` if it is missing.
    pub fn new(mut filters: Vec<Predicate>) -> Self {
        if !filters.contains(&Predicate::active()) {
            filters.insert(0, Predicate::active());
        }
        Self {
            filters,
            _entity: PhantomData,
        }
    }

    pub fn table(&self) -> &'static str {
        E::spec().table
    }

    pub fn filters(&self) -> &[Predicate] {
        &self.filters
    }

    /// Add a predicate (e.g. a requester-specific restriction).
    pub fn and(mut self, predicate: Predicate) -> Self {
        self.filters.push(predicate);
        self
    }

    /// Whether `entity` satisfies every predicate.
    pub fn matches(&self, entity: &E) -> bool {
        let spec = E::spec();
        self.filters.iter().all(|p| {
            spec.field(p.column())
                .is_some_and(|f| p.matches(&(f.get)(entity)))
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;
    use crate::test_support::Widget;

    fn args(pairs: &[(&str, &str)]) -> QueryArgs {
        pairs.iter().copied().collect()
    }

    fn build(pairs: &[(&str, &str)]) -> Result<Vec<Predicate>, CoreError> {
        Widget::args_to_filter_params(&args(pairs))
    }

    // -- QueryArgs -----------------------------------------------------------

    #[test]
    fn args_keep_first_and_all_values() {
        let a = args(&[("name.in", "a"), ("x", "1"), ("name.in", "b")]);
        assert_eq!(a.get("name.in"), Some("a"));
        assert_eq!(a.get_all("name.in"), vec!["a", "b"]);
        assert_eq!(a.keys(), vec!["name.in", "x"]);
        assert_eq!(a.get("missing"), None);
    }

    // -- builder -------------------------------------------------------------

    #[test]
    fn empty_args_yield_only_active() {
        assert_eq!(build(&[]).unwrap(), vec![Predicate::active()]);
    }

    #[test]
    fn greaterthan_builds_comparison() {
        let f = build(&[("count.greaterthan", "18")]).unwrap();
        assert_eq!(
            f[1],
            Predicate::Compare {
                column: "count",
                kind: ColumnKind::Integer,
                op: CmpOp::Gt,
                value: FilterValue::Text("18".into()),
            }
        );
    }

    #[test]
    fn in_uses_every_value() {
        let f = build(&[("name.in", "a"), ("name.in", "b")]).unwrap();
        assert_eq!(f.len(), 2);
        assert_matches!(&f[1], Predicate::In { column: "name", values, .. } if values == &["a", "b"]);
    }

    #[test]
    fn filtering_ignores_read_tier() {
        // `secret` is admin-readable only, yet still filterable.
        let f = build(&[("secret.like", "hun%")]).unwrap();
        assert_matches!(&f[1], Predicate::Pattern { column: "secret", .. });
    }

    #[test]
    fn boolean_equality_coerces_literals() {
        let f = build(&[("enabled", "true")]).unwrap();
        assert_matches!(
            &f[1],
            Predicate::Compare { column: "enabled", value: FilterValue::Bool(true), .. }
        );
        let f = build(&[("enabled", "1")]).unwrap();
        assert_matches!(&f[1], Predicate::Compare { value: FilterValue::Text(v), .. } if v == "1");
    }

    #[test]
    fn text_equality_stays_raw() {
        let f = build(&[("name", "true")]).unwrap();
        assert_matches!(&f[1], Predicate::Compare { value: FilterValue::Text(v), .. } if v == "true");
    }

    #[test]
    fn empty_values_skip_optional_filters() {
        let f = build(&[("name.like", ""), ("count.lessthan", "")]).unwrap();
        assert_eq!(f, vec![Predicate::active()]);
    }

    #[test]
    fn like_and_ilike() {
        let f = build(&[("name.like", "gi%"), ("label.ilike", "%RE%")]).unwrap();
        assert_matches!(&f[1], Predicate::Pattern { op: PatternOp::Like, .. });
        assert_matches!(&f[2], Predicate::Pattern { op: PatternOp::ILike, .. });
    }

    #[test]
    fn three_segments_are_rejected() {
        assert_matches!(build(&[("foo.bar.baz", "x")]), Err(CoreError::UnknownFilter(k)) if k == "foo.bar.baz");
        assert_matches!(build(&[("name.in.x", "x")]), Err(CoreError::UnknownFilter(_)));
    }

    #[test]
    fn unknown_operator_is_rejected() {
        assert_matches!(build(&[("count.between", "1")]), Err(CoreError::UnknownFilter(_)));
    }

    #[test]
    fn unknown_single_key_is_ignored_but_dotted_is_not() {
        assert_eq!(build(&[("page", "2")]).unwrap(), vec![Predicate::active()]);
        assert_matches!(build(&[("page.size", "2")]), Err(CoreError::UnknownFilter(_)));
    }

    // -- evaluation ----------------------------------------------------------

    #[test]
    fn comparison_matches_like_sql() {
        let gt = Predicate::Compare {
            column: "count",
            kind: ColumnKind::Integer,
            op: CmpOp::Gt,
            value: FilterValue::Text("18".into()),
        };
        assert!(gt.matches(&FieldValue::Int(19)));
        assert!(!gt.matches(&FieldValue::Int(18)));
        assert!(!gt.matches(&FieldValue::Null));
    }

    #[test]
    fn uncastable_text_never_matches() {
        let eq = Predicate::Compare {
            column: "count",
            kind: ColumnKind::Integer,
            op: CmpOp::Eq,
            value: FilterValue::Text("abc".into()),
        };
        assert!(!eq.matches(&FieldValue::Int(0)));
    }

    #[test]
    fn like_wildcards_and_case() {
        assert!(like(PatternOp::Like, "gi%o", "gizmo"));
        assert!(like(PatternOp::Like, "g_zmo", "gizmo"));
        assert!(!like(PatternOp::Like, "GI%", "gizmo"));
        assert!(like(PatternOp::ILike, "GI%", "gizmo"));
        assert!(like(PatternOp::Like, "100\\%", "100%"));
        assert!(!like(PatternOp::Like, "a.c", "abc"));
    }

    #[test]
    fn membership_casts_each_value() {
        let p = Predicate::In {
            column: "count",
            kind: ColumnKind::Integer,
            values: vec!["1".into(), "3".into()],
        };
        assert!(p.matches(&FieldValue::Int(3)));
        assert!(!p.matches(&FieldValue::Int(2)));
    }

    #[test]
    fn query_excludes_inactive_entities() {
        let query = Widget::args_to_query(&args(&[("count.greaterthanorequal", "3")]), None).unwrap();
        let mut w = Widget::sample();
        assert!(query.matches(&w));
        w.active = false;
        assert!(!query.matches(&w));
        assert_eq!(query.table(), "widgets");
    }

    #[test]
    fn query_new_prepends_active_once() {
        let q = EntityQuery::<Widget>::new(vec![]);
        assert_eq!(q.filters(), &[Predicate::active()]);
        let q = EntityQuery::<Widget>::new(vec![Predicate::active()]);
        assert_eq!(q.filters().len(), 1);
    }
}
