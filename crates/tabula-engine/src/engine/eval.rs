//! Expression evaluation and result-type inference.
//!
//! Evaluation is stateless and side-effect free: slot values are pulled
//! through a [`SlotValues`] provider *at invocation time*, so repeated
//! passes observe updated upstream values without any re-binding. Faults
//! are reported as [`EngineError`]; nothing here panics or performs I/O.

use super::parser::{BinaryOp, Expr, UnaryOp, parse};
use super::{EngineError, SlotRef, Value, ValueKind};

/// Deferred accessor for referenced slot values.
pub trait SlotValues {
    /// Current value of a referenced slot, fetched each time it is needed.
    fn value_of(&self, slot: SlotRef) -> Result<Value, EngineError>;
}

/// Declared/static result kinds of referenced slots, for inference.
pub trait SlotTypes {
    fn kind_of(&self, slot: SlotRef) -> Result<ValueKind, EngineError>;
}

/// Parse and evaluate formula text against a value provider.
pub fn evaluate(text: &str, values: &dyn SlotValues) -> Result<Value, EngineError> {
    let expr = parse(text)?;
    eval_expr(&expr, values)
}

/// Parse formula text and infer the kind of value it produces, without
/// evaluating anything. Used by the type-compatibility validation rule.
pub fn infer_result_kind(text: &str, types: &dyn SlotTypes) -> Result<ValueKind, EngineError> {
    let expr = parse(text)?;
    infer_expr(&expr, types)
}

fn eval_expr(expr: &Expr, values: &dyn SlotValues) -> Result<Value, EngineError> {
    match expr {
        Expr::Literal(value) => Ok(value.clone()),
        Expr::Reference(slot) => values.value_of(*slot),
        Expr::Unary { op, operand } => {
            let value = eval_expr(operand, values)?;
            apply_unary(*op, value)
        }
        Expr::Binary { op, left, right } => match op {
            // Logical operators short-circuit; the right side is only
            // evaluated when it can affect the result.
            BinaryOp::And | BinaryOp::Or => {
                let lhs = eval_expr(left, values)?;
                let Value::Boolean(l) = lhs else {
                    return Err(EngineError::IncompatibleOperand {
                        op: op.symbol(),
                        operand: lhs.kind(),
                    });
                };
                if (*op == BinaryOp::And && !l) || (*op == BinaryOp::Or && l) {
                    return Ok(Value::Boolean(l));
                }
                let rhs = eval_expr(right, values)?;
                match rhs {
                    Value::Boolean(r) => Ok(Value::Boolean(r)),
                    other => Err(EngineError::IncompatibleOperand {
                        op: op.symbol(),
                        operand: other.kind(),
                    }),
                }
            }
            _ => {
                let lhs = eval_expr(left, values)?;
                let rhs = eval_expr(right, values)?;
                apply_binary(*op, lhs, rhs)
            }
        },
    }
}

fn apply_unary(op: UnaryOp, value: Value) -> Result<Value, EngineError> {
    match (op, value) {
        (UnaryOp::Neg, Value::Integer(i)) => i
            .checked_neg()
            .map(Value::Integer)
            .ok_or(EngineError::Overflow { op: "-" }),
        (UnaryOp::Neg, Value::Float(n)) => Ok(Value::Float(-n)),
        (UnaryOp::Not, Value::Boolean(b)) => Ok(Value::Boolean(!b)),
        (op, value) => Err(EngineError::IncompatibleOperand {
            op: op.symbol(),
            operand: value.kind(),
        }),
    }
}

fn apply_binary(op: BinaryOp, lhs: Value, rhs: Value) -> Result<Value, EngineError> {
    match op {
        BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div | BinaryOp::Rem => {
            arithmetic(op, lhs, rhs)
        }
        BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge => {
            let (l, r) = numeric_pair(op, &lhs, &rhs)?;
            let ordered = match op {
                BinaryOp::Lt => l < r,
                BinaryOp::Le => l <= r,
                BinaryOp::Gt => l > r,
                _ => l >= r,
            };
            Ok(Value::Boolean(ordered))
        }
        BinaryOp::Eq | BinaryOp::Ne => {
            let equal = values_equal(op, &lhs, &rhs)?;
            Ok(Value::Boolean(if op == BinaryOp::Eq { equal } else { !equal }))
        }
        // Short-circuiting forms are handled in eval_expr.
        BinaryOp::And | BinaryOp::Or => match (lhs, rhs) {
            (Value::Boolean(l), Value::Boolean(r)) => Ok(Value::Boolean(if op == BinaryOp::And {
                l && r
            } else {
                l || r
            })),
            (l, r) => Err(EngineError::IncompatibleOperands {
                op: op.symbol(),
                left: l.kind(),
                right: r.kind(),
            }),
        },
    }
}

fn arithmetic(op: BinaryOp, lhs: Value, rhs: Value) -> Result<Value, EngineError> {
    match (&lhs, &rhs) {
        (Value::Integer(l), Value::Integer(r)) => {
            let (l, r) = (*l, *r);
            match op {
                BinaryOp::Add => l.checked_add(r).map(Value::Integer),
                BinaryOp::Sub => l.checked_sub(r).map(Value::Integer),
                BinaryOp::Mul => l.checked_mul(r).map(Value::Integer),
                BinaryOp::Div => {
                    if r == 0 {
                        return Err(EngineError::DivisionByZero);
                    }
                    l.checked_div(r).map(Value::Integer)
                }
                BinaryOp::Rem => {
                    if r == 0 {
                        return Err(EngineError::DivisionByZero);
                    }
                    l.checked_rem(r).map(Value::Integer)
                }
                _ => unreachable!("arithmetic called with non-arithmetic operator"),
            }
            .ok_or(EngineError::Overflow { op: op.symbol() })
        }
        _ => {
            let (l, r) = numeric_pair(op, &lhs, &rhs)?;
            match op {
                BinaryOp::Add => Ok(Value::Float(l + r)),
                BinaryOp::Sub => Ok(Value::Float(l - r)),
                BinaryOp::Mul => Ok(Value::Float(l * r)),
                BinaryOp::Div => {
                    if r == 0.0 {
                        return Err(EngineError::DivisionByZero);
                    }
                    Ok(Value::Float(l / r))
                }
                BinaryOp::Rem => {
                    if r == 0.0 {
                        return Err(EngineError::DivisionByZero);
                    }
                    Ok(Value::Float(l % r))
                }
                _ => unreachable!("arithmetic called with non-arithmetic operator"),
            }
        }
    }
}

fn numeric_pair(op: BinaryOp, lhs: &Value, rhs: &Value) -> Result<(f64, f64), EngineError> {
    match (lhs.as_number(), rhs.as_number()) {
        (Some(l), Some(r)) => Ok((l, r)),
        _ => Err(EngineError::IncompatibleOperands {
            op: op.symbol(),
            left: lhs.kind(),
            right: rhs.kind(),
        }),
    }
}

fn values_equal(op: BinaryOp, lhs: &Value, rhs: &Value) -> Result<bool, EngineError> {
    match (lhs, rhs) {
        (Value::Boolean(l), Value::Boolean(r)) => Ok(l == r),
        (Value::Text(l), Value::Text(r)) => Ok(l == r),
        (Value::ObjectRef(l), Value::ObjectRef(r)) => Ok(l == r),
        _ => {
            // Numerics compare across Integer/Float.
            let (l, r) = numeric_pair(op, lhs, rhs)?;
            Ok(l == r)
        }
    }
}

fn infer_expr(expr: &Expr, types: &dyn SlotTypes) -> Result<ValueKind, EngineError> {
    match expr {
        Expr::Literal(value) => Ok(value.kind()),
        Expr::Reference(slot) => types.kind_of(*slot),
        Expr::Unary { op, operand } => {
            let kind = infer_expr(operand, types)?;
            match (op, kind) {
                (UnaryOp::Neg, ValueKind::Integer | ValueKind::Float) => Ok(kind),
                (UnaryOp::Not, ValueKind::Boolean) => Ok(ValueKind::Boolean),
                (op, kind) => Err(EngineError::IncompatibleOperand {
                    op: op.symbol(),
                    operand: kind,
                }),
            }
        }
        Expr::Binary { op, left, right } => {
            let l = infer_expr(left, types)?;
            let r = infer_expr(right, types)?;
            match op {
                BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div | BinaryOp::Rem => {
                    if !(l.is_numeric() && r.is_numeric()) {
                        return Err(EngineError::IncompatibleOperands {
                            op: op.symbol(),
                            left: l,
                            right: r,
                        });
                    }
                    if l == ValueKind::Integer && r == ValueKind::Integer {
                        Ok(ValueKind::Integer)
                    } else {
                        Ok(ValueKind::Float)
                    }
                }
                BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge => {
                    if l.is_numeric() && r.is_numeric() {
                        Ok(ValueKind::Boolean)
                    } else {
                        Err(EngineError::IncompatibleOperands {
                            op: op.symbol(),
                            left: l,
                            right: r,
                        })
                    }
                }
                BinaryOp::Eq | BinaryOp::Ne => {
                    if l == r || (l.is_numeric() && r.is_numeric()) {
                        Ok(ValueKind::Boolean)
                    } else {
                        Err(EngineError::IncompatibleOperands {
                            op: op.symbol(),
                            left: l,
                            right: r,
                        })
                    }
                }
                BinaryOp::And | BinaryOp::Or => {
                    if l == ValueKind::Boolean && r == ValueKind::Boolean {
                        Ok(ValueKind::Boolean)
                    } else {
                        Err(EngineError::IncompatibleOperands {
                            op: op.symbol(),
                            left: l,
                            right: r,
                        })
                    }
                }
            }
        }
    }
}
