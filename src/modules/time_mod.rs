// File: src/modules/time_mod.rs
//
// Wall-clock and monotonic time in microseconds, sleep, and ISO-8601
// formatting of a microsecond timestamp.

use crate::interpreter::{Interpreter, Value};
use chrono::{TimeZone, Utc};
use once_cell::sync::Lazy;
use std::time::{Instant, SystemTime, UNIX_EPOCH};

static MONOTONIC_START: Lazy<Instant> = Lazy::new(Instant::now);

pub fn register(interp: &mut Interpreter) {
    interp.register_module("time", |m| {
        m.func(
            "now",
            Box::new(|_, _, _, _| {
                let micros = SystemTime::now()
                    .duration_since(UNIX_EPOCH)
                    .map(|d| d.as_micros() as f64)
                    .unwrap_or(0.0);
                Ok(Value::Number(micros))
            }),
        );
        m.func(
            "monotonic",
            Box::new(|_, _, _, _| {
                Ok(Value::Number(MONOTONIC_START.elapsed().as_micros() as f64))
            }),
        );
        m.func(
            "sleep",
            Box::new(|_, args, _, _| {
                let Some(seconds) = args.first().filter(|v| v.is_numeric()) else {
                    return Ok(Value::None);
                };
                let seconds = seconds.to_f64();
                if seconds < 0.0 {
                    return Ok(Value::None);
                }
                std::thread::sleep(std::time::Duration::from_millis((seconds * 1000.0) as u64));
                Ok(Value::None)
            }),
        );
        // format(us_since_epoch) -> RFC 3339 string in UTC
        m.func(
            "format",
            Box::new(|_, args, _, _| {
                let Some(stamp) = args.first().filter(|v| v.is_numeric()) else {
                    return Ok(Value::None);
                };
                let micros = stamp.to_f64() as i64;
                match Utc.timestamp_micros(micros) {
                    chrono::LocalResult::Single(datetime) => {
                        Ok(Value::str(datetime.to_rfc3339()))
                    }
                    _ => Ok(Value::None),
                }
            }),
        );
    });
}
