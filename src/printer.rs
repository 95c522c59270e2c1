//! Printer: arena values to text.
//!
//! The output is the reader's canonical form. The spine of a list is walked
//! in a loop, so right-nested pairs come out as `(a b c)` and an improper
//! tail as `(a b . c)`. Strings and symbols are written byte for byte with
//! no escaping.

use crate::Error;
use crate::arena::{Arena, Value, ValueRef};

/// Render the value rooted at `value`
pub fn print(arena: &Arena, value: ValueRef) -> Result<String, Error> {
    let mut out = String::new();
    write_value(arena, value, &mut out)?;
    Ok(out)
}

fn write_value(arena: &Arena, value: ValueRef, out: &mut String) -> Result<(), Error> {
    match arena.get(value)? {
        Value::Empty => out.push_str("()"),
        Value::Boolean(b) => out.push_str(if b { "#t" } else { "#f" }),
        Value::Integer(n) => out.push_str(&n.to_string()),
        Value::String(bytes) => {
            out.push('"');
            out.push_str(&String::from_utf8_lossy(&bytes));
            out.push('"');
        }
        Value::Symbol(bytes) => out.push_str(&String::from_utf8_lossy(&bytes)),
        Value::Pair { car, cdr } => {
            out.push('(');
            write_value(arena, car, out)?;
            let mut tail = cdr;
            loop {
                match arena.get(tail)? {
                    Value::Pair { car, cdr } => {
                        out.push(' ');
                        write_value(arena, car, out)?;
                        tail = cdr;
                    }
                    Value::Empty => {
                        out.push(')');
                        break;
                    }
                    _ => {
                        out.push_str(" . ");
                        write_value(arena, tail, out)?;
                        out.push(')');
                        break;
                    }
                }
            }
        }
    }
    Ok(())
}
