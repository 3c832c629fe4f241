// File: src/modules/random.rs
//
// Seedable PRNG module. One generator is shared by all the module's
// functions so seed() affects subsequent random()/randint()/choice() calls.

use crate::interpreter::{Interpreter, Value};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::cell::RefCell;
use std::rc::Rc;

pub fn register(interp: &mut Interpreter) {
    interp.register_module("random", |m| {
        let rng: Rc<RefCell<StdRng>> = Rc::new(RefCell::new(StdRng::from_entropy()));

        let seed_rng = Rc::clone(&rng);
        m.func(
            "seed",
            Box::new(move |_, args, _, _| {
                if let Some(value) = args.first() {
                    if value.is_numeric() {
                        *seed_rng.borrow_mut() = StdRng::seed_from_u64(value.to_f64() as u64);
                    }
                }
                Ok(Value::None)
            }),
        );

        let random_rng = Rc::clone(&rng);
        m.func(
            "random",
            Box::new(move |_, _, _, _| Ok(Value::Number(random_rng.borrow_mut().gen::<f64>()))),
        );

        let randint_rng = Rc::clone(&rng);
        m.func(
            "randint",
            Box::new(move |_, args, _, _| match args.as_slice() {
                [lo, hi] if lo.is_numeric() && hi.is_numeric() => {
                    let mut lo = lo.to_f64() as i64;
                    let mut hi = hi.to_f64() as i64;
                    if hi < lo {
                        std::mem::swap(&mut lo, &mut hi);
                    }
                    Ok(Value::Integer(randint_rng.borrow_mut().gen_range(lo..=hi)))
                }
                _ => Ok(Value::None),
            }),
        );

        let choice_rng = Rc::clone(&rng);
        m.func(
            "choice",
            Box::new(move |_, args, _, _| {
                let Some(Value::Array(array)) = args.first() else { return Ok(Value::None) };
                let array = array.borrow();
                if array.is_empty() {
                    return Ok(Value::None);
                }
                let index = choice_rng.borrow_mut().gen_range(0..array.len());
                Ok(array[index].clone())
            }),
        );
    });
}
