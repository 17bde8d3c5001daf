use super::{environment::LoxVars, error::LoxResult, function::*, value::*};
use std::time::{SystemTime, UNIX_EPOCH};

pub fn get_builtins() -> LoxVars {
    let mut constants = LoxVars::new();

    constants.insert(
        "clock".into(),
        LoxFunction::native("clock", 0, clock).into(),
    );

    constants
}

/// Seconds since the Unix epoch.
fn clock(_: &[LoxValue]) -> LoxResult<LoxValue> {
    let now = SystemTime::now();
    let elapsed = now.duration_since(UNIX_EPOCH)?;
    Ok(LoxValue::Number(elapsed.as_secs_f64()))
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn clock_is_native() {
        let builtins = get_builtins();
        let clock = match builtins.get("clock") {
            Some(LoxValue::Function(clock)) => clock.clone(),
            _ => panic!("clock should be a function"),
        };
        assert_eq!(clock.arity(), 0);
        assert_eq!(clock.to_string(), "<native fn>");
        match &clock.body {
            FunctionBody::Native { fun, .. } => {
                let now = fun(&[]).unwrap().get_number().unwrap();
                assert!(now > 0.0);
            }
            FunctionBody::Block { .. } => panic!("clock should be native"),
        }
    }
}
