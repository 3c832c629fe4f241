// File: src/modules/math.rs
//
// The math builtin module: unary float functions, pow/min/max, and the usual
// constants. Invalid arguments read as none rather than erroring, so math
// code can probe freely.

use crate::interpreter::{Interpreter, Value};

fn unary(args: &[Value], f: fn(f64) -> f64) -> Value {
    match args {
        [v] if v.is_numeric() => Value::Number(f(v.to_f64())),
        _ => Value::None,
    }
}

pub fn register(interp: &mut Interpreter) {
    interp.register_module("math", |m| {
        m.func("sin", Box::new(|_, a, _, _| Ok(unary(&a, f64::sin))));
        m.func("cos", Box::new(|_, a, _, _| Ok(unary(&a, f64::cos))));
        m.func("tan", Box::new(|_, a, _, _| Ok(unary(&a, f64::tan))));
        m.func("asin", Box::new(|_, a, _, _| Ok(unary(&a, f64::asin))));
        m.func("acos", Box::new(|_, a, _, _| Ok(unary(&a, f64::acos))));
        m.func("atan", Box::new(|_, a, _, _| Ok(unary(&a, f64::atan))));
        m.func("sinh", Box::new(|_, a, _, _| Ok(unary(&a, f64::sinh))));
        m.func("cosh", Box::new(|_, a, _, _| Ok(unary(&a, f64::cosh))));
        m.func("tanh", Box::new(|_, a, _, _| Ok(unary(&a, f64::tanh))));
        m.func("exp", Box::new(|_, a, _, _| Ok(unary(&a, f64::exp))));
        m.func("log", Box::new(|_, a, _, _| Ok(unary(&a, f64::ln))));
        m.func("log10", Box::new(|_, a, _, _| Ok(unary(&a, f64::log10))));
        m.func("sqrt", Box::new(|_, a, _, _| Ok(unary(&a, f64::sqrt))));
        m.func("ceil", Box::new(|_, a, _, _| Ok(unary(&a, f64::ceil))));
        m.func("floor", Box::new(|_, a, _, _| Ok(unary(&a, f64::floor))));
        m.func("round", Box::new(|_, a, _, _| Ok(unary(&a, f64::round))));
        m.func("abs", Box::new(|_, a, _, _| Ok(unary(&a, f64::abs))));
        m.func(
            "pow",
            Box::new(|_, a, _, _| match a.as_slice() {
                [base, exp] if base.is_numeric() && exp.is_numeric() => {
                    Ok(Value::Number(base.to_f64().powf(exp.to_f64())))
                }
                _ => Ok(Value::None),
            }),
        );
        m.func(
            "min",
            Box::new(|_, a, _, _| {
                let mut result = match a.first() {
                    Some(v) if v.is_numeric() => v.to_f64(),
                    _ => return Ok(Value::None),
                };
                for v in &a[1..] {
                    if v.is_numeric() {
                        result = result.min(v.to_f64());
                    }
                }
                Ok(Value::Number(result))
            }),
        );
        m.func(
            "max",
            Box::new(|_, a, _, _| {
                let mut result = match a.first() {
                    Some(v) if v.is_numeric() => v.to_f64(),
                    _ => return Ok(Value::None),
                };
                for v in &a[1..] {
                    if v.is_numeric() {
                        result = result.max(v.to_f64());
                    }
                }
                Ok(Value::Number(result))
            }),
        );
        m.val("pi", Value::Number(std::f64::consts::PI));
        m.val("e", Value::Number(std::f64::consts::E));
    });
}
