//! Translation of filter expressions into index predicates.
//!
//! The translator is a recursive evaluator over the two node kinds of a
//! [`FilterExpr`]. Six comparators and two boolean operators reach the index;
//! everything else is rejected here, before search.

use dcpr_core::error::FilterRejection;
use dcpr_core::models::{Comparator, Comparison, FilterExpr, Operation, Operator, Predicate, PredicateOp};
use dcpr_core::schema::MetadataSchema;

/// Compiles filter expressions against a metadata schema
#[derive(Debug, Clone)]
pub struct QueryTranslator {
    schema: MetadataSchema,
}

impl QueryTranslator {
    pub fn new(schema: MetadataSchema) -> Self {
        Self { schema }
    }

    pub fn schema(&self) -> &MetadataSchema {
        &self.schema
    }

    /// Translate an expression into a predicate.
    ///
    /// `None` translates to [`Predicate::Always`]. The first rejected fragment
    /// (unsupported comparator or operator, undeclared attribute, value of the
    /// wrong type, operation without arguments) fails the whole translation;
    /// use [`sanitize`](Self::sanitize) first to keep the valid remainder.
    pub fn translate(&self, expr: Option<&FilterExpr>) -> Result<Predicate, FilterRejection> {
        match expr {
            None => Ok(Predicate::Always),
            Some(expr) => self.translate_expr(expr),
        }
    }

    fn translate_expr(&self, expr: &FilterExpr) -> Result<Predicate, FilterRejection> {
        match expr {
            FilterExpr::Comparison(comparison) => {
                let op = self.check_comparison(comparison)?;
                Ok(Predicate::Compare {
                    attribute: comparison.attribute.clone(),
                    op,
                    value: comparison.value.clone(),
                })
            }
            FilterExpr::Operation(Operation { operator, arguments }) => {
                if arguments.is_empty() {
                    return Err(empty_operation(*operator));
                }

                let children = arguments
                    .iter()
                    .map(|arg| self.translate_expr(arg))
                    .collect::<Result<Vec<_>, _>>()?;

                match operator {
                    Operator::And => Ok(Predicate::All(children)),
                    Operator::Or => Ok(Predicate::Any(children)),
                    Operator::Not => Err(FilterRejection::UnsupportedOperator(*operator)),
                }
            }
        }
    }

    /// Prune the fragments of `expr` that [`translate`](Self::translate)
    /// would reject, returning the remaining filter and what was removed.
    ///
    /// Every removal widens the filter, never narrows it:
    /// - an invalid child of AND is dropped;
    /// - an OR containing an invalid fragment is dropped as a whole;
    /// - operations given without arguments are rejected as malformed;
    /// - operations left without arguments disappear;
    /// - single-argument operations collapse to their argument.
    pub fn sanitize(&self, expr: Option<FilterExpr>) -> (Option<FilterExpr>, Vec<FilterRejection>) {
        let mut rejected = Vec::new();
        let kept = expr.and_then(|expr| self.prune(expr, &mut rejected));
        (kept, rejected)
    }

    fn prune(&self, expr: FilterExpr, rejected: &mut Vec<FilterRejection>) -> Option<FilterExpr> {
        match expr {
            FilterExpr::Comparison(comparison) => match self.check_comparison(&comparison) {
                Ok(_) => Some(FilterExpr::Comparison(comparison)),
                Err(rejection) => {
                    rejected.push(rejection);
                    None
                }
            },
            FilterExpr::Operation(Operation { operator, arguments }) if arguments.is_empty() => {
                rejected.push(empty_operation(operator));
                None
            }
            FilterExpr::Operation(Operation { operator, arguments }) => match operator {
                Operator::And => {
                    let kept: Vec<FilterExpr> =
                        arguments.into_iter().filter_map(|arg| self.prune(arg, rejected)).collect();
                    collapse(Operator::And, kept)
                }
                Operator::Or => {
                    let before = rejected.len();
                    let kept: Vec<FilterExpr> =
                        arguments.into_iter().filter_map(|arg| self.prune(arg, rejected)).collect();
                    if rejected.len() > before {
                        None
                    } else {
                        collapse(Operator::Or, kept)
                    }
                }
                Operator::Not => {
                    rejected.push(FilterRejection::UnsupportedOperator(operator));
                    None
                }
            },
        }
    }

    fn check_comparison(&self, comparison: &Comparison) -> Result<PredicateOp, FilterRejection> {
        let Some(info) = self.schema.get(&comparison.attribute) else {
            return Err(FilterRejection::UndeclaredAttribute(comparison.attribute.clone()));
        };

        if !info.attribute_type.accepts(&comparison.value) {
            return Err(FilterRejection::TypeMismatch {
                attribute: comparison.attribute.clone(),
                expected: info.attribute_type,
            });
        }

        predicate_op(comparison.comparator).ok_or_else(|| FilterRejection::UnsupportedComparator {
            attribute: comparison.attribute.clone(),
            comparator: comparison.comparator,
        })
    }
}

fn predicate_op(comparator: Comparator) -> Option<PredicateOp> {
    match comparator {
        Comparator::Eq => Some(PredicateOp::Eq),
        Comparator::Ne => Some(PredicateOp::Ne),
        Comparator::Gt => Some(PredicateOp::Gt),
        Comparator::Gte => Some(PredicateOp::Gte),
        Comparator::Lt => Some(PredicateOp::Lt),
        Comparator::Lte => Some(PredicateOp::Lte),
        Comparator::Contain | Comparator::Like | Comparator::In | Comparator::Nin => None,
    }
}

fn empty_operation(operator: Operator) -> FilterRejection {
    FilterRejection::Malformed(format!("'{}' without arguments", operator))
}

fn collapse(operator: Operator, mut arguments: Vec<FilterExpr>) -> Option<FilterExpr> {
    match arguments.len() {
        0 => None,
        1 => arguments.pop(),
        _ => Some(FilterExpr::Operation(Operation { operator, arguments })),
    }
}
