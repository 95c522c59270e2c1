//! Special form registry.
//!
//! A pair is evaluated only when its car names one of the forms below:
//!
//! ```scheme
//! (define name value)   ; bind name, whether or not it was bound before
//! (set! name value)     ; rebind a name that is already bound
//! (quote value)         ; value, unevaluated
//! ```
//!
//! Forms are found by their exact name. Operand counts are checked against
//! each form's [`Arity`] before its handler runs; a handler never sees a
//! slice of the wrong length.

use std::collections::HashMap;
use std::sync::LazyLock;

use crate::Error;
use crate::arena::ValueRef;
use crate::evaluator::{Evaluator, eval_define, eval_quote, eval_set};

/// Number of operands a special form accepts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    Exact(usize),
}

fn operands(n: usize) -> &'static str {
    if n == 1 { "operand" } else { "operands" }
}

impl Arity {
    /// Fails with a malformed-form error unless `got` operands are accepted
    pub fn validate(self, form: &str, got: usize) -> Result<(), Error> {
        let Arity::Exact(n) = self;
        if got == n {
            return Ok(());
        }
        Err(Error::malformed(
            form,
            format!("expected exactly {n} {}, got {got}", operands(n)),
        ))
    }
}

/// Handler of a special form: the evaluator, the unevaluated operands and
/// the current evaluation depth
pub(crate) type SpecialFormFn =
    fn(&mut Evaluator<'_>, &[ValueRef], usize) -> Result<ValueRef, Error>;

/// Definition of a special form
pub struct SpecialForm {
    /// Name the form is invoked by
    pub scheme_id: &'static str,
    pub arity: Arity,
    pub(crate) handler: SpecialFormFn,
}

impl std::fmt::Debug for SpecialForm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpecialForm")
            .field("scheme_id", &self.scheme_id)
            .field("arity", &self.arity)
            .finish_non_exhaustive()
    }
}

static SPECIAL_FORMS: [SpecialForm; 3] = [
    SpecialForm {
        scheme_id: "define",
        arity: Arity::Exact(2),
        handler: eval_define,
    },
    SpecialForm {
        scheme_id: "set!",
        arity: Arity::Exact(2),
        handler: eval_set,
    },
    SpecialForm {
        scheme_id: "quote",
        arity: Arity::Exact(1),
        handler: eval_quote,
    },
];

static SPECIAL_FORMS_BY_NAME: LazyLock<HashMap<&'static [u8], &'static SpecialForm>> =
    LazyLock::new(|| {
        SPECIAL_FORMS
            .iter()
            .map(|form| (form.scheme_id.as_bytes(), form))
            .collect()
    });

/// All special forms, in registry order
pub fn special_forms() -> &'static [SpecialForm] {
    &SPECIAL_FORMS
}

/// Find a special form by the exact bytes of its name
pub fn find_special_form(name: &[u8]) -> Option<&'static SpecialForm> {
    SPECIAL_FORMS_BY_NAME.get(name).copied()
}
