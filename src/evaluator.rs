//! Evaluator: kind dispatch over arena values.
//!
//! Empty lists, booleans, integers and strings evaluate to themselves and
//! symbols are looked up in the [`SymbolTable`]. A pair must be a call of one
//! of the special forms in [`crate::forms`]; nothing else is applicable.
//! [`BindingMode`] decides whether `define` and `set!` bind their right-hand
//! side as read or evaluate it first.

use tracing::trace;

use crate::arena::{Arena, Value, ValueRef};
use crate::forms::find_special_form;
use crate::symbols::SymbolTable;
use crate::{Error, MAX_EVAL_DEPTH};

/// What `define` and `set!` bind their name to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BindingMode {
    /// The right-hand side exactly as read, unevaluated
    #[default]
    Literal,
    /// The result of evaluating the right-hand side
    Evaluated,
}

/// Evaluation state shared by the special form handlers
pub struct Evaluator<'a> {
    arena: &'a Arena,
    symbols: &'a mut dyn SymbolTable,
    mode: BindingMode,
}

/// Evaluate an expression (public API)
pub fn eval(expr: ValueRef, arena: &Arena, symbols: &mut dyn SymbolTable) -> Result<ValueRef, Error> {
    eval_with_mode(expr, arena, symbols, BindingMode::default())
}

pub fn eval_with_mode(
    expr: ValueRef,
    arena: &Arena,
    symbols: &mut dyn SymbolTable,
    mode: BindingMode,
) -> Result<ValueRef, Error> {
    let mut evaluator = Evaluator {
        arena,
        symbols,
        mode,
    };
    evaluator.eval_with_depth_tracking(expr, 0)
}

fn lossy(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).into_owned()
}

impl Evaluator<'_> {
    /// Evaluate an expression with depth tracking to prevent stack overflow
    fn eval_with_depth_tracking(&mut self, expr: ValueRef, depth: usize) -> Result<ValueRef, Error> {
        if depth >= MAX_EVAL_DEPTH {
            return Err(Error::EvalError(format!(
                "Evaluation depth limit exceeded (max: {MAX_EVAL_DEPTH})"
            )));
        }
        match self.arena.get(expr)? {
            // Self-evaluating forms
            Value::Empty | Value::Boolean(_) | Value::Integer(_) | Value::String(_) => Ok(expr),

            // Variable lookup
            Value::Symbol(name) => self
                .symbols
                .lookup(&name)
                .ok_or_else(|| Error::UndefinedSymbol(lossy(&name))),

            Value::Pair { car, cdr } => self.eval_special_form(car, cdr, depth),
        }
    }

    fn eval_special_form(
        &mut self,
        head: ValueRef,
        operand_list: ValueRef,
        depth: usize,
    ) -> Result<ValueRef, Error> {
        let Some(name) = self.arena.symbol_name(head)? else {
            return Err(Error::StructuralTypeError(format!(
                "car not a symbol: {} in operator position",
                self.arena.kind(head)?.name()
            )));
        };
        if self.arena.pair(operand_list)?.is_none() {
            return Err(Error::StructuralTypeError(format!(
                "cdr not a pair: {} follows {}",
                self.arena.kind(operand_list)?.name(),
                lossy(&name)
            )));
        }
        let form = find_special_form(&name).ok_or_else(|| Error::UnsupportedForm(lossy(&name)))?;

        let operands = self.operands(form.scheme_id, operand_list)?;
        form.arity.validate(form.scheme_id, operands.len())?;
        trace!(form = form.scheme_id, depth, "special form");
        (form.handler)(self, &operands, depth)
    }

    /// Elements of a proper operand list
    fn operands(&self, form: &str, operand_list: ValueRef) -> Result<Vec<ValueRef>, Error> {
        let mut operands = Vec::new();
        let mut cursor = operand_list;
        while let Some((car, cdr)) = self.arena.pair(cursor)? {
            operands.push(car);
            cursor = cdr;
        }
        match self.arena.get(cursor)? {
            Value::Empty => Ok(operands),
            other => Err(Error::malformed(
                form,
                format!("operand list ends in {} instead of ()", other.kind().name()),
            )),
        }
    }

    /// Name operand of `define` / `set!`
    fn binding_name(&self, form: &str, operand: ValueRef) -> Result<Vec<u8>, Error> {
        self.arena.symbol_name(operand)?.ok_or_else(|| {
            let kind = self.arena.kind(operand).map_or("invalid value", |kind| kind.name());
            Error::malformed(form, format!("name must be a symbol, got {kind}"))
        })
    }

    /// Value operand of `define` / `set!`, according to the binding mode
    fn binding_value(&mut self, expr: ValueRef, depth: usize) -> Result<ValueRef, Error> {
        match self.mode {
            BindingMode::Literal => Ok(expr),
            BindingMode::Evaluated => self.eval_with_depth_tracking(expr, depth + 1),
        }
    }
}

/// Evaluate define special form
pub(crate) fn eval_define(
    evaluator: &mut Evaluator<'_>,
    operands: &[ValueRef],
    depth: usize,
) -> Result<ValueRef, Error> {
    let [name, expr] = *operands else {
        unreachable!("define arity is validated by the form registry")
    };
    let name = evaluator.binding_name("define", name)?;
    let value = evaluator.binding_value(expr, depth)?;
    trace!(name = %lossy(&name), "define");
    evaluator.symbols.bind(&name, value);
    Ok(value)
}

/// Evaluate set! special form; the name must already be bound
pub(crate) fn eval_set(
    evaluator: &mut Evaluator<'_>,
    operands: &[ValueRef],
    depth: usize,
) -> Result<ValueRef, Error> {
    let [name, expr] = *operands else {
        unreachable!("set! arity is validated by the form registry")
    };
    let name = evaluator.binding_name("set!", name)?;
    if evaluator.symbols.lookup(&name).is_none() {
        return Err(Error::UndefinedSymbol(lossy(&name)));
    }
    let value = evaluator.binding_value(expr, depth)?;
    trace!(name = %lossy(&name), "set!");
    evaluator.symbols.bind(&name, value);
    Ok(value)
}

/// Evaluate quote special form
pub(crate) fn eval_quote(
    _evaluator: &mut Evaluator<'_>,
    operands: &[ValueRef],
    _depth: usize,
) -> Result<ValueRef, Error> {
    let [expr] = *operands else {
        unreachable!("quote arity is validated by the form registry")
    };
    Ok(expr)
}
